use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::thread;

use crate::candidate::{CandidateRecord, Position};
use crate::level::{LevelConfig, LevelRegistry};
use crate::rng::GameRng;
use crate::selector::select;
use crate::{PlacementError, Result};

/// A successful placement for one iteration of the outer RNG sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    /// Number of outer RNG calls after the preincrement.
    pub iteration: usize,
    /// RNG state the placement routine started from.
    pub seed: u32,
    pub locations: Vec<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SequenceSummary {
    pub iterations: usize,
    pub placed: usize,
    pub failed: usize,
}

impl SequenceSummary {
    pub fn new(iterations: usize, outcomes: &[PlacementOutcome]) -> Self {
        Self {
            iterations,
            placed: outcomes.len(),
            failed: iterations.saturating_sub(outcomes.len()),
        }
    }
}

/// RNG states the game would start placement from, one per iteration.
///
/// Produced lazily, so the iteration count only bounds how far the
/// sequence runs.
#[derive(Debug, Clone)]
pub struct SeedSequence {
    rng: GameRng,
    remaining: usize,
}

impl Iterator for SeedSequence {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let seed = self.rng.state();
        self.rng.next32();
        Some(seed)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SeedSequence {}

pub fn seed_sequence(starting_seed: u32, preincrement: u32, iterations: usize) -> SeedSequence {
    let mut rng = GameRng::new(starting_seed);
    for _ in 0..preincrement {
        rng.next32();
    }
    SeedSequence {
        rng,
        remaining: iterations,
    }
}

fn place_one(
    iteration: usize,
    seed: u32,
    candidates: &[CandidateRecord],
    number_to_place: usize,
) -> Option<PlacementOutcome> {
    match select(seed, candidates, number_to_place, 0) {
        Ok(locations) => Some(PlacementOutcome {
            iteration,
            seed,
            locations,
        }),
        Err(err) => {
            log::debug!("iteration {iteration}: {err}");
            None
        }
    }
}

/// Runs the placement routine once per outer RNG state.
///
/// Iterations whose placement runs out of attempts are left out of the
/// result, but still advance the outer sequence by one call.
pub fn generate(
    candidates: &[CandidateRecord],
    number_to_place: usize,
    iterations: usize,
    starting_seed: u32,
    preincrement: u32,
) -> Vec<PlacementOutcome> {
    seed_sequence(starting_seed, preincrement, iterations)
        .enumerate()
        .filter_map(|(iteration, seed)| place_one(iteration, seed, candidates, number_to_place))
        .collect()
}

/// A contiguous run of iterations handed to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chunk {
    first_iteration: usize,
    seed: u32,
    len: usize,
}

/// Splits `iterations` into at most `threads` chunks, recording only the
/// seed each chunk starts from.
fn split_chunks(
    starting_seed: u32,
    preincrement: u32,
    iterations: usize,
    threads: NonZeroUsize,
) -> Vec<Chunk> {
    let chunk_len = iterations.div_ceil(threads.get());
    let mut chunks = Vec::new();
    let mut seeds = seed_sequence(starting_seed, preincrement, iterations);
    let mut first_iteration = 0;
    while let Some(seed) = seeds.next() {
        let len = chunk_len.min(iterations - first_iteration);
        chunks.push(Chunk {
            first_iteration,
            seed,
            len,
        });
        first_iteration += len;
        if len > 1 {
            seeds.nth(len - 2);
        }
    }
    chunks
}

/// Same result as [`generate`], with the placements spread over `threads`
/// scoped workers. Each worker walks its own stretch of the seed sequence.
pub fn generate_parallel(
    candidates: &[CandidateRecord],
    number_to_place: usize,
    iterations: usize,
    starting_seed: u32,
    preincrement: u32,
    threads: NonZeroUsize,
) -> Vec<PlacementOutcome> {
    let chunks = split_chunks(starting_seed, preincrement, iterations, threads);

    let mut outcomes: Vec<PlacementOutcome> = thread::scope(|scope| {
        let workers: Vec<_> = chunks
            .iter()
            .map(|&chunk| {
                scope.spawn(move || {
                    seed_sequence(chunk.seed, 0, chunk.len)
                        .enumerate()
                        .filter_map(|(offset, seed)| {
                            place_one(
                                chunk.first_iteration + offset,
                                seed,
                                candidates,
                                number_to_place,
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| match worker.join() {
                Ok(found) => found,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    outcomes.sort_by_key(|outcome| outcome.iteration);
    outcomes
}

/// Runs placement searches against an explicit set of levels.
#[derive(Debug, Clone)]
pub struct PlacementSearch {
    levels: LevelRegistry,
    threads: NonZeroUsize,
}

impl PlacementSearch {
    pub fn new(levels: LevelRegistry) -> Self {
        Self {
            levels,
            threads: NonZeroUsize::MIN,
        }
    }

    pub fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = threads;
        self
    }

    pub fn levels(&self) -> &LevelRegistry {
        &self.levels
    }

    pub fn level(&self, name: &str) -> Result<&LevelConfig> {
        let level = self.levels.get(name)?;
        level.validate()?;
        Ok(level)
    }

    pub fn search(
        &self,
        level_name: &str,
        candidates: &[CandidateRecord],
        iterations: usize,
        starting_seed: u32,
    ) -> Result<Vec<PlacementOutcome>> {
        let level = self.level(level_name)?;
        if candidates.is_empty() {
            return Err(PlacementError::Config(format!(
                "level '{}' has an empty candidate table",
                level.name
            )));
        }

        let outcomes = if self.threads.get() > 1 {
            generate_parallel(
                candidates,
                level.num_objects,
                iterations,
                starting_seed,
                level.preincrement,
                self.threads,
            )
        } else {
            generate(
                candidates,
                level.num_objects,
                iterations,
                starting_seed,
                level.preincrement,
            )
        };

        let summary = SequenceSummary::new(iterations, &outcomes);
        log::info!(
            "{}: {} of {} iterations placed every {} ({} failed)",
            level.name,
            summary.placed,
            summary.iterations,
            level.object_name,
            summary.failed
        );
        Ok(outcomes)
    }
}

use thiserror::Error;

use crate::candidate::{CandidateRecord, Position};
use crate::rng::GameRng;

/// Scans allowed per object before the whole placement is abandoned.
pub const MAX_ATTEMPTS: u32 = 5;

/// The game ran out of attempts while placing one of the objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("object {object} could not be placed within {attempts} attempts (seed 0x{seed:08X})")]
pub struct SelectionExhausted {
    pub seed: u32,
    pub object: usize,
    pub attempts: u32,
}

/// Replays the game's placement routine for one RNG seed.
///
/// Each object rolls once (`next8() % 100`) and claims the first unused
/// candidate at or after `start_offset` whose chance is above the roll. A
/// scan that reaches the end of the table forces the roll to 0 for the next
/// attempt, so the retry takes the first unused candidate with a nonzero
/// chance. If an object is still unplaced after `MAX_ATTEMPTS` scans the
/// whole request fails and nothing is returned.
///
/// Usage state lives only for the duration of this call; `candidates` is
/// never modified, so the same table can be shared across runs and threads.
pub fn select(
    seed: u32,
    candidates: &[CandidateRecord],
    number_to_place: usize,
    start_offset: usize,
) -> Result<Vec<Position>, SelectionExhausted> {
    let mut rng = GameRng::new(seed);
    let mut used = vec![false; candidates.len()];
    let mut placed = Vec::with_capacity(number_to_place);

    for object in 0..number_to_place {
        let mut roll = rng.next8() % 100;
        let mut attempts_left = MAX_ATTEMPTS;

        let index = loop {
            if attempts_left == 0 {
                return Err(SelectionExhausted {
                    seed,
                    object,
                    attempts: MAX_ATTEMPTS,
                });
            }
            attempts_left -= 1;

            if let Some(index) = claim_first(candidates, &mut used, start_offset, roll) {
                break index;
            }
            roll = 0;
        };

        placed.push(candidates[index].position);
    }

    Ok(placed)
}

fn claim_first(
    candidates: &[CandidateRecord],
    used: &mut [bool],
    start_offset: usize,
    roll: u8,
) -> Option<usize> {
    let index = candidates
        .iter()
        .enumerate()
        .skip(start_offset)
        .find(|(i, candidate)| !used[*i] && roll < candidate.chance)
        .map(|(i, _)| i)?;
    used[index] = true;
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::lookup8;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    // First two rolls for seed 85 are 60 and 46; for seed 242, 60 and 93.
    const SEED_ROLL_60: u32 = 85;
    const SEED_ROLLS_60_93: u32 = 242;

    fn table(chances: &[u8]) -> Vec<CandidateRecord> {
        chances
            .iter()
            .enumerate()
            .map(|(i, &chance)| CandidateRecord::new(Position::new(i as i32, 0, 0), chance))
            .collect()
    }

    fn first_roll(seed: u32) -> u8 {
        lookup8(seed) % 100
    }

    #[test]
    fn fixture_seeds_roll_as_expected() {
        assert_eq!(first_roll(SEED_ROLL_60), 60);
        assert_eq!(first_roll(SEED_ROLLS_60_93), 60);
        assert_eq!(lookup8(crate::rng::lookup32(SEED_ROLLS_60_93)) % 100, 93);
    }

    #[test]
    fn skips_candidates_at_or_below_roll() {
        let candidates = table(&[50, 100, 0]);
        let placed = select(SEED_ROLL_60, &candidates, 1, 0).unwrap();
        assert_eq!(placed, vec![Position::new(1, 0, 0)]);
    }

    #[test]
    fn retry_forces_roll_to_zero() {
        // Second object rolls 93: candidate 0 fails the roll, 1 is taken,
        // 2 has no chance. The forced retry lands on candidate 0.
        let candidates = table(&[50, 100, 0]);
        let placed = select(SEED_ROLLS_60_93, &candidates, 2, 0).unwrap();
        assert_eq!(placed, vec![Position::new(1, 0, 0), Position::new(0, 0, 0)]);
    }

    #[test]
    fn full_chance_never_needs_a_retry() {
        let candidates = table(&[100; 8]);
        let mut picker = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let seed: u32 = picker.gen();
            let placed = select(seed, &candidates, 8, 0).unwrap();
            let expected: Vec<Position> =
                (0..8).map(|i| Position::new(i, 0, 0)).collect();
            assert_eq!(placed, expected);
        }
    }

    #[test]
    fn zero_chance_always_exhausts() {
        let candidates = table(&[0; 6]);
        let mut picker = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let seed: u32 = picker.gen();
            let err = select(seed, &candidates, 1, 0).unwrap_err();
            assert_eq!(err.object, 0);
            assert_eq!(err.attempts, MAX_ATTEMPTS);
            assert_eq!(err.seed, seed);
        }
    }

    #[test]
    fn failure_discards_earlier_objects() {
        // Only one usable candidate for two objects.
        let candidates = table(&[100, 0]);
        let err = select(SEED_ROLL_60, &candidates, 2, 0).unwrap_err();
        assert_eq!(err.object, 1);
    }

    #[test]
    fn scans_start_at_offset() {
        let candidates = table(&[100, 100, 100]);
        let placed = select(SEED_ROLL_60, &candidates, 2, 1).unwrap();
        assert_eq!(placed, vec![Position::new(1, 0, 0), Position::new(2, 0, 0)]);

        assert!(select(SEED_ROLL_60, &candidates, 1, 3).is_err());
    }

    #[test]
    fn table_is_reusable_between_calls() {
        let candidates = table(&[50, 100, 0]);
        let first = select(SEED_ROLL_60, &candidates, 1, 0).unwrap();
        let second = select(SEED_ROLL_60, &candidates, 1, 0).unwrap();
        assert_eq!(first, second);
        assert!(candidates.iter().all(|c| !c.in_use));
    }

    #[test]
    fn retries_do_not_consume_draws() {
        // Seed 16 rolls 90, 38, 21. The first object misses every candidate
        // and retries onto candidate 0. The second object must use 38
        // (candidate 2); an extra draw would give 21 (candidate 1).
        let candidates = table(&[50, 30, 80]);
        let placed = select(16, &candidates, 2, 0).unwrap();
        assert_eq!(placed, vec![Position::new(0, 0, 0), Position::new(2, 0, 0)]);
    }
}

use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod candidate;
pub mod dump;
pub mod level;
pub mod rng;
pub mod scoring;
pub mod selector;
pub mod sequence;

pub use candidate::{CandidateRecord, Position};
pub use dump::{load_dump, parse_dump, DumpError};
pub use level::{LevelConfig, LevelRegistry, SpatialFilter};
pub use rng::{GameRng, DEFAULT_SEED};
pub use scoring::{Ranking, ScoredOutcome};
pub use selector::{select, SelectionExhausted};
pub use sequence::{generate, PlacementOutcome, PlacementSearch, SequenceSummary};

/// How far past the power-on seed to look when reporting where a start
/// seed sits in the game's RNG sequence.
const POWER_ON_SEARCH_LIMIT: u64 = 10_000_000;

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub level: String,
    pub start_seed: u32,
    pub iterations: usize,
    pub apply_filter: bool,
    pub ranking: Option<Ranking>,
    pub threads: usize,
    pub debug: bool,
    /// Directory the level's dump file is looked up in.
    pub data_dir: PathBuf,
    /// Explicit dump file, overriding the level's own.
    pub dump_path: Option<PathBuf>,
    /// JSON level file layered over the built-in levels.
    pub levels_path: Option<PathBuf>,
    /// Where the text report is written in debug mode.
    pub report_path: Option<PathBuf>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            level: String::new(),
            start_seed: DEFAULT_SEED,
            iterations: 1,
            apply_filter: false,
            ranking: None,
            threads: 1,
            debug: false,
            data_dir: PathBuf::from("."),
            dump_path: None,
            levels_path: None,
            report_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("level file error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dump error: {0}")]
    Dump(#[from] DumpError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown level '{name}' (known levels: {known})")]
    UnknownLevel { name: String, known: String },
}

pub type Result<T> = std::result::Result<T, PlacementError>;

/// Result of a full search, ready for printing.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub level: LevelConfig,
    pub start_seed: u32,
    pub candidates: usize,
    pub summary: SequenceSummary,
    pub filtered_out: usize,
    pub outcomes: Vec<ScoredOutcome>,
    #[serde(skip)]
    pub log: String,
}

fn join_candidate(base: &Path, candidate: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for part in candidate.split(['/', '\\']) {
        if !part.is_empty() {
            path.push(part);
        }
    }
    path
}

fn find_first_existing(base: &Path, candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|candidate| join_candidate(base, candidate))
        .find(|path| path.exists())
}

fn locate_dump(settings: &SearchSettings, level: &LevelConfig) -> Result<PathBuf> {
    if let Some(path) = &settings.dump_path {
        if !path.exists() {
            return Err(PlacementError::Config(format!(
                "Dump file does not exist: {}",
                path.display()
            )));
        }
        return Ok(path.clone());
    }

    let candidates = [
        level.dump.clone(),
        format!("dumps/{}", level.dump),
        format!("data/{}", level.dump),
    ];
    find_first_existing(&settings.data_dir, &candidates).ok_or_else(|| {
        PlacementError::Config(format!(
            "Could not find {} under {}",
            level.dump,
            settings.data_dir.display()
        ))
    })
}

fn build_registry(settings: &SearchSettings) -> Result<LevelRegistry> {
    let mut registry = LevelRegistry::builtin();
    if let Some(path) = &settings.levels_path {
        registry.extend(LevelRegistry::load(path)?);
    }
    Ok(registry)
}

/// Search for placements with an already-loaded candidate table.
pub fn search_with_candidates(
    settings: &SearchSettings,
    candidates: &[CandidateRecord],
) -> Result<SearchReport> {
    search_in(build_registry(settings)?, settings, candidates)
}

fn search_in(
    registry: LevelRegistry,
    settings: &SearchSettings,
    candidates: &[CandidateRecord],
) -> Result<SearchReport> {
    let threads = NonZeroUsize::new(settings.threads).unwrap_or(NonZeroUsize::MIN);
    let search = PlacementSearch::new(registry).with_threads(threads);
    let level = search.level(&settings.level)?.clone();

    let generated = search.search(
        &level.name,
        candidates,
        settings.iterations,
        settings.start_seed,
    )?;
    let summary = SequenceSummary::new(settings.iterations, &generated);

    let kept = if settings.apply_filter {
        scoring::filter_outcomes(generated, &level.filter)
    } else {
        generated
    };
    let filtered_out = summary.placed - kept.len();

    let outcomes = match settings.ranking {
        Some(ranking) => scoring::rank(kept, level.spawn, ranking),
        None => kept
            .into_iter()
            .map(|outcome| ScoredOutcome {
                score: scoring::score(&outcome, level.spawn),
                outcome,
            })
            .collect(),
    };

    let mut report = SearchReport {
        level,
        start_seed: settings.start_seed,
        candidates: candidates.len(),
        summary,
        filtered_out,
        outcomes,
        log: String::new(),
    };
    report.log = build_log(settings, &report);
    Ok(report)
}

fn build_log(settings: &SearchSettings, report: &SearchReport) -> String {
    let level = &report.level;
    let mut log = format!(
        "Level: {} ({}, {} to place)\n",
        level.name, level.object_name, level.num_objects
    );
    let _ = writeln!(log, "Start seed: 0x{:08X}", report.start_seed);
    match rng::calls_between(DEFAULT_SEED, report.start_seed, POWER_ON_SEARCH_LIMIT) {
        Some(calls) => {
            let _ = writeln!(log, "Calls after power-on seed: {}", calls);
        }
        None => {
            let _ = writeln!(
                log,
                "Calls after power-on seed: more than {}",
                POWER_ON_SEARCH_LIMIT
            );
        }
    }
    let _ = writeln!(log, "Preincrement: {}", level.preincrement);
    let _ = writeln!(log, "Candidates: {}", report.candidates);
    let _ = writeln!(
        log,
        "Iterations: {} (placed: {}, failed: {})",
        report.summary.iterations, report.summary.placed, report.summary.failed
    );
    if settings.apply_filter {
        let _ = writeln!(log, "Rejected by filter: {}", report.filtered_out);
    }
    match settings.ranking {
        Some(Ranking::All) => log.push_str("Sorted by distance from spawn\n"),
        Some(Ranking::Top(k)) => {
            let _ = writeln!(log, "Sorted by distance from spawn, best {}", k);
        }
        None => {}
    }
    log.push('\n');

    for scored in &report.outcomes {
        let outcome = &scored.outcome;
        let _ = writeln!(
            log,
            "#{:<6} seed 0x{:08X}  calls to reach: {}  score: {:.1}",
            outcome.iteration,
            outcome.seed,
            outcome.iteration,
            scored.score
        );
        if settings.debug {
            let mut rng = GameRng::new(outcome.seed);
            let rolls: Vec<u8> = (0..level.num_objects).map(|_| rng.next8() % 100).collect();
            let _ = writeln!(log, "    rolls: {:?}", rolls);
        }
        for location in &outcome.locations {
            let _ = writeln!(log, "    {} {}", level.object_name, location);
        }
    }

    log
}

pub fn run(settings: SearchSettings) -> Result<SearchReport> {
    let registry = build_registry(&settings)?;
    let level = registry.get(&settings.level)?;
    level.validate()?;

    let dump_path = locate_dump(&settings, level)?;
    let candidates = load_dump(&dump_path)?;
    log::info!(
        "{}: {} candidates from {}",
        level.name,
        candidates.len(),
        dump_path.display()
    );

    let report = search_in(registry, &settings, &candidates)?;

    if settings.debug {
        if let Some(path) = &settings.report_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, &report.log)?;
            log::info!("wrote report to {}", path.display());
        }
    }

    Ok(report)
}

use clap::Parser;
use std::path::PathBuf;

use placement_core::{
    run, LevelRegistry, PlacementError, Ranking, SearchReport, SearchSettings, DEFAULT_SEED,
};

#[derive(Debug, Parser)]
#[command(
    name = "placement-cli",
    version,
    about = "Predict hidden object placements from the game's RNG state"
)]
struct Args {
    /// Level to generate placements for.
    #[arg(short, long, required_unless_present = "list_levels")]
    level: Option<String>,

    /// Seed to start with. Overridden by --hex-start-seed.
    #[arg(short = 'e', long, default_value_t = DEFAULT_SEED)]
    start_seed: u32,

    /// Seed to start with, as hex. Overrides --start-seed.
    #[arg(short = 'x', long)]
    hex_start_seed: Option<String>,

    /// Start from a random seed instead.
    #[arg(long, conflicts_with_all = ["start_seed", "hex_start_seed"])]
    random_seed: bool,

    /// Number of placements to generate.
    #[arg(short, long, default_value_t = 1)]
    iterations: usize,

    /// Sort by distance from the player spawn and keep the best N
    /// (no value, 0 or negative keeps all).
    #[arg(
        short,
        long,
        num_args = 0..=1,
        default_missing_value = "-1",
        allow_negative_numbers = true
    )]
    sort: Option<i64>,

    /// Apply the level's spatial filter.
    #[arg(long)]
    filter: bool,

    /// Candidate dump to use instead of the level's own.
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Directory the level dumps are looked up in.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// JSON file with extra level definitions.
    #[arg(long)]
    levels: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Also write the text report to this file. Only honoured with --debug.
    #[arg(long)]
    report: Option<PathBuf>,

    #[arg(long)]
    debug: bool,

    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// List the available levels and exit.
    #[arg(long)]
    list_levels: bool,
}

fn setup_logging(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn parse_hex_seed(text: &str) -> Result<u32, String> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex seed '{text}': {e}"))
}

fn level_listing(levels: Option<&PathBuf>) -> Result<String, PlacementError> {
    let mut registry = LevelRegistry::builtin();
    if let Some(path) = levels {
        registry.extend(LevelRegistry::load(path)?);
    }
    let mut listing = String::new();
    for level in registry.iter() {
        listing.push_str(&format!(
            "{:<12} {} x{} (dump: {}, preincrement: {})\n",
            level.name, level.object_name, level.num_objects, level.dump, level.preincrement
        ));
    }
    Ok(listing)
}

fn render_report(report: &SearchReport, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(report).map(|text| text + "\n")
    } else {
        Ok(report.log.clone())
    }
}

fn main() {
    let args = Args::parse();

    let log_level = if args.debug {
        log::LevelFilter::Debug
    } else if args.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = setup_logging(log_level) {
        eprintln!("Failed to set up logging: {e}");
    }

    if args.list_levels {
        match level_listing(args.levels.as_ref()) {
            Ok(listing) => print!("{listing}"),
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    let start_seed = if args.random_seed {
        rand::random::<u32>()
    } else if let Some(hex) = args.hex_start_seed.as_deref() {
        match parse_hex_seed(hex) {
            Ok(seed) => seed,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        args.start_seed
    };

    let settings = SearchSettings {
        // clap enforces --level unless --list-levels, which returned above.
        level: args.level.unwrap_or_default(),
        start_seed,
        iterations: args.iterations,
        apply_filter: args.filter,
        ranking: args.sort.map(Ranking::from_limit),
        threads: args.threads,
        debug: args.debug,
        data_dir: args.data_dir,
        dump_path: args.dump,
        levels_path: args.levels,
        report_path: args.report,
    };

    let report = match run(settings) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    match render_report(&report, args.json) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("Failed to serialise report: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_hex_seeds() {
        assert_eq!(parse_hex_seed("0x02DCF1A5"), Ok(DEFAULT_SEED));
        assert_eq!(parse_hex_seed("02dcf1a5"), Ok(DEFAULT_SEED));
        assert_eq!(parse_hex_seed("0X02DCF1A5"), Ok(DEFAULT_SEED));
        assert!(parse_hex_seed("0x0x02DCF1A5").is_err());
        assert!(parse_hex_seed("xyz").is_err());
        assert!(parse_hex_seed("1FFFFFFFF").is_err());
    }

    #[test]
    fn sort_flag_without_value_keeps_all() {
        let args = Args::parse_from(["placement-cli", "-l", "spike", "--sort"]);
        assert_eq!(args.sort.map(Ranking::from_limit), Some(Ranking::All));

        let args = Args::parse_from(["placement-cli", "-l", "spike", "--sort", "5"]);
        assert_eq!(args.sort.map(Ranking::from_limit), Some(Ranking::Top(5)));

        let args = Args::parse_from(["placement-cli", "-l", "spike"]);
        assert_eq!(args.sort, None);
    }

    #[test]
    fn level_is_required_unless_listing() {
        assert!(Args::try_parse_from(["placement-cli"]).is_err());
        assert!(Args::try_parse_from(["placement-cli", "--list-levels"]).is_ok());
    }

    const SPIKE_DUMP: &str = "x,y,z,info\n\
        10270000,30f8ffff,9cffffff,00320000\n\
        f4010000,30f8ffff,9cffffff,00640000\n";

    fn spike_report() -> SearchReport {
        let candidates = placement_core::parse_dump(SPIKE_DUMP).unwrap();
        let settings = SearchSettings {
            level: "spike".to_string(),
            iterations: 4,
            ranking: Some(Ranking::Top(2)),
            ..SearchSettings::default()
        };
        placement_core::search_with_candidates(&settings, &candidates).unwrap()
    }

    #[test]
    fn lists_builtin_and_file_levels() {
        let listing = level_listing(None).unwrap();
        assert!(listing.lines().any(|l| l.starts_with("glasses")));
        assert!(listing.lines().any(|l| l.starts_with("spike")));

        let path = std::env::temp_dir().join(format!("placement-cli-levels-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"levels": [{
                "name": "reptar",
                "object_name": "Bar",
                "dump": "reptar.dmp",
                "num_objects": 2,
                "spawn": {"x": 0, "y": 0, "z": 0},
                "preincrement": 1
            }]}"#,
        )
        .unwrap();
        let listing = level_listing(Some(&path)).unwrap();
        let _ = std::fs::remove_file(&path);
        let reptar = listing.lines().find(|l| l.starts_with("reptar")).unwrap();
        assert!(reptar.contains("Bar x2"));
        assert!(reptar.contains("dump: reptar.dmp"));
        assert!(listing.lines().any(|l| l.starts_with("glasses")));

        let missing = std::env::temp_dir().join("placement-cli-no-such-levels.json");
        assert!(level_listing(Some(&missing)).is_err());
    }

    #[test]
    fn json_report_flattens_scored_outcomes() {
        let report = spike_report();
        let text = render_report(&report, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        let outcomes = value["outcomes"].as_array().unwrap();
        assert_eq!(outcomes.len(), 2);
        let best = &outcomes[0];
        let score = best["score"].as_f64().unwrap();
        assert!((score - report.outcomes[0].score).abs() < 1e-9);
        assert_eq!(
            best["iteration"].as_u64(),
            Some(report.outcomes[0].outcome.iteration as u64)
        );
        assert_eq!(best["seed"].as_u64(), Some(u64::from(report.outcomes[0].outcome.seed)));
        let location = &best["locations"][0];
        let expected = report.outcomes[0].outcome.locations[0];
        assert_eq!(location["x"].as_i64(), Some(i64::from(expected.x)));
        assert_eq!(location["y"].as_i64(), Some(i64::from(expected.y)));
        assert_eq!(location["z"].as_i64(), Some(i64::from(expected.z)));
        assert!(best.get("outcome").is_none());
        assert!(value.get("log").is_none());
        assert_eq!(value["summary"]["iterations"].as_u64(), Some(4));
    }

    #[test]
    fn text_report_is_the_log() {
        let report = spike_report();
        assert_eq!(render_report(&report, false).unwrap(), report.log);
    }
}

mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use pdoom_core::{ChallengeExport, EconomicConfig, GameEngine, JsonConfig, StaticConfig};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::reports::{self, TesterReport};
use logic::{
    GameplayStrategy, ReplayCheck, RunSummary, SeedInfo, SimulationConfig, replay_check,
    resolve_seed_inputs, run_game, split_csv,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "pdoom-tester", version = "0.1.0")]
#[command(about = "Headless QA harness for P(Doom) - plays seeded games and checks replays")]
struct Args {
    /// Seeds to run (comma-separated; `weekly` is this week's challenge seed)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Strategy the automated player follows
    #[arg(long, value_enum, default_value_t = GameplayStrategy::Balanced)]
    strategy: GameplayStrategy,

    /// Maximum turns per game
    #[arg(long, default_value_t = 100)]
    turns: u32,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Economic configuration JSON to use instead of the bundled one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every game's challenge export to this path as a JSON array
    #[arg(long)]
    export_challenge: Option<PathBuf>,

    /// Play each seed twice and compare challenge signatures
    #[arg(long)]
    replay_check: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    announce_banner();

    let start_time = Instant::now();
    let economy = load_economy(args.config.as_deref())?;
    let seed_tokens = split_csv(&args.seeds);
    let today = chrono::Local::now().date_naive();
    let seeds = resolve_seed_inputs(&seed_tokens, today)?;

    let (runs, exports) = play_seeds(&args, &seeds, &economy)?;
    let checks = run_replay_checks(&args, &seeds, &economy)?;

    if let Some(path) = args.export_challenge.as_deref() {
        write_exports(path, &exports)?;
    }

    write_reports(&args, &runs, &checks, start_time)?;

    if checks.iter().any(|check| !check.passed()) {
        eprintln!("{}", "❌ Replay check failed".red().bold());
        std::process::exit(1);
    }

    Ok(())
}

fn announce_banner() {
    println!("{}", "🎮 P(Doom) Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn load_economy(path: Option<&Path>) -> Result<EconomicConfig> {
    let Some(path) = path else {
        return GameEngine::new(StaticConfig)
            .config()
            .context("bundled economy config is invalid");
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    GameEngine::new(JsonConfig::new(json))
        .config()
        .with_context(|| format!("invalid economy config in {}", path.display()))
}

fn simulation_config(args: &Args, seed: &SeedInfo) -> SimulationConfig {
    SimulationConfig::new(seed.seed.clone(), args.strategy).with_max_turns(args.turns)
}

fn play_seeds(
    args: &Args,
    seeds: &[SeedInfo],
    economy: &EconomicConfig,
) -> Result<(Vec<RunSummary>, Vec<ChallengeExport>)> {
    println!("{}", "🧠 Playing seeded games".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut runs = Vec::with_capacity(seeds.len());
    let mut exports = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let game_start = Instant::now();
        let outcome = run_game(simulation_config(args, seed), economy.clone())?;
        if args.verbose {
            let weekly = if seed.is_weekly() { " (weekly)" } else { "" };
            println!(
                "🧪 {}{} [{}] - {} turns, {} rng calls - {:?}",
                seed.seed.bright_white(),
                weekly,
                args.strategy,
                outcome.summary.turns_played,
                outcome.summary.total_rng_calls,
                game_start.elapsed()
            );
        }
        runs.push(outcome.summary);
        exports.push(outcome.export);
    }
    Ok((runs, exports))
}

fn run_replay_checks(
    args: &Args,
    seeds: &[SeedInfo],
    economy: &EconomicConfig,
) -> Result<Vec<ReplayCheck>> {
    if !args.replay_check {
        return Ok(Vec::new());
    }
    println!("{}", "🔁 Running replay checks".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());
    seeds
        .iter()
        .map(|seed| replay_check(&simulation_config(args, seed), economy))
        .collect()
}

fn write_exports(path: &Path, exports: &[ChallengeExport]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, exports)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn write_reports(
    args: &Args,
    runs: &[RunSummary],
    checks: &[ReplayCheck],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let report = TesterReport {
        runs,
        replay_checks: checks,
    };

    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, &report)?,
        ReportFormat::Markdown => reports::generate_markdown_report(&mut output_target, &report)?,
        ReportFormat::Console => {
            reports::generate_console_report(&mut output_target, &report, start_time.elapsed())?;
            let duration = start_time.elapsed();
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            seeds: "1337".to_string(),
            strategy: GameplayStrategy::Balanced,
            turns: 6,
            report: ReportFormat::Json,
            output: None,
            config: None,
            export_challenge: None,
            replay_check: false,
            verbose: false,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pdoom-tester-{}-{name}", std::process::id()))
    }

    #[test]
    fn parses_cli_flags() {
        let args = Args::try_parse_from([
            "pdoom-tester",
            "--seeds",
            "weekly,alpha",
            "--strategy",
            "safety-first",
            "--turns",
            "30",
            "--report",
            "markdown",
            "--replay-check",
        ])
        .unwrap();
        assert_eq!(args.strategy, GameplayStrategy::SafetyFirst);
        assert_eq!(args.turns, 30);
        assert_eq!(args.report, ReportFormat::Markdown);
        assert!(args.replay_check);
        assert!(Args::try_parse_from(["pdoom-tester", "--strategy", "reckless"]).is_err());
    }

    #[test]
    fn load_economy_defaults_and_rejects_bad_files() {
        let cfg = load_economy(None).unwrap();
        assert!(cfg.validate().is_ok());

        let bad = temp_file("bad-economy.json");
        std::fs::write(&bad, r#"{"max_doom": 0}"#).unwrap();
        assert!(load_economy(Some(bad.as_path())).is_err());
        assert!(load_economy(Some(temp_file("missing.json").as_path())).is_err());
    }

    #[test]
    fn replay_checks_skip_when_disabled() {
        let args = base_args();
        let today = chrono::Local::now().date_naive();
        let seeds = resolve_seed_inputs(&split_csv(&args.seeds), today).unwrap();
        let checks = run_replay_checks(&args, &seeds, &EconomicConfig::default()).unwrap();
        assert!(checks.is_empty());
    }

    #[test]
    fn exports_and_reports_are_written() {
        let args = Args {
            output: Some(temp_file("report.json")),
            replay_check: true,
            ..base_args()
        };
        let economy = EconomicConfig::default();
        let today = chrono::Local::now().date_naive();
        let seeds = resolve_seed_inputs(&split_csv("alpha,beta"), today).unwrap();
        let (runs, exports) = play_seeds(&args, &seeds, &economy).unwrap();
        let checks = run_replay_checks(&args, &seeds, &economy).unwrap();
        assert!(checks.iter().all(ReplayCheck::passed));

        let export_path = temp_file("exports.json");
        write_exports(&export_path, &exports).unwrap();
        let parsed: Vec<ChallengeExport> =
            serde_json::from_str(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(|export| export.verify().is_ok()));

        write_reports(&args, &runs, &checks, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp_file("report.json")).unwrap();
        assert!(content.contains("\"replay_checks\""));
        assert!(content.contains("alpha"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}

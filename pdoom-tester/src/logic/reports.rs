use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::{ReplayCheck, RunSummary};

/// Everything a tester invocation produced.
#[derive(Debug, Serialize)]
pub struct TesterReport<'a> {
    pub runs: &'a [RunSummary],
    pub replay_checks: &'a [ReplayCheck],
}

fn victory_rate(runs: &[RunSummary]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    let victories = runs.iter().filter(|run| run.victory).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = victories as f64 / runs.len() as f64 * 100.0;
    rate
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    report: &TesterReport<'_>,
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;
    writeln!(out, "Games played: {}", report.runs.len())?;
    writeln!(out, "Victory rate: {:.1}%", victory_rate(report.runs))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for run in report.runs {
        let status = if run.victory {
            "✅ WIN ".green()
        } else if run.ending.is_some() {
            "❌ LOSS".red()
        } else {
            "⏸  OPEN".yellow()
        };
        writeln!(out, "{} {} [{}]", status, run.seed.bold(), run.strategy)?;
        writeln!(
            out,
            "   Turns: {}  Ending: {}",
            run.turns_played,
            run.ending.as_deref().unwrap_or("turn limit")
        )?;
        writeln!(
            out,
            "   Money: {}  Staff: {}  Reputation: {}  Doom: {}/{}",
            run.money, run.staff, run.reputation, run.doom, run.max_doom
        )?;
        writeln!(
            out,
            "   Actions: {} executed, {} skipped  Papers: {}",
            run.actions_executed, run.actions_skipped, run.papers_published
        )?;
        writeln!(out, "   RNG calls: {}", run.total_rng_calls)?;
        writeln!(out)?;
    }

    if !report.replay_checks.is_empty() {
        writeln!(out, "{}", "🔁 Replay Checks".bright_yellow().bold())?;
        writeln!(out, "{}", "================".yellow())?;
        for check in report.replay_checks {
            if check.passed() {
                writeln!(out, "✅ {} {}", check.seed.green(), check.first_signature)?;
            } else {
                writeln!(
                    out,
                    "❌ {} {} != {}",
                    check.seed.red(),
                    check.first_signature,
                    check.second_signature
                )?;
            }
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    out: &mut W,
    report: &TesterReport<'_>,
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    report: &TesterReport<'_>,
) -> Result<()> {
    writeln!(out, "# P(Doom) Simulation Results\n")?;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Games played**: {}", report.runs.len())?;
    writeln!(out, "- **Victory rate**: {:.1}%\n", victory_rate(report.runs))?;

    if report.runs.is_empty() {
        writeln!(out, "_No games played._")?;
        return Ok(());
    }

    writeln!(out, "## Runs\n")?;
    writeln!(
        out,
        "| Seed | Strategy | Turns | Ending | Money | Doom | RNG calls |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|")?;
    for run in report.runs {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {}/{} | {} |",
            run.seed,
            run.strategy,
            run.turns_played,
            run.ending.as_deref().unwrap_or("turn limit"),
            run.money,
            run.doom,
            run.max_doom,
            run.total_rng_calls
        )?;
    }

    if !report.replay_checks.is_empty() {
        writeln!(out, "\n## Replay Checks\n")?;
        for check in report.replay_checks {
            let status = if check.passed() { "✅" } else { "❌" };
            writeln!(out, "- {status} `{}`", check.seed)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameplayStrategy;

    fn sample_run(victory: bool) -> RunSummary {
        RunSummary {
            seed: "REPORT-SEED".to_string(),
            strategy: GameplayStrategy::Balanced,
            turns_played: 14,
            ending: victory.then(|| "doom_averted".to_string()),
            victory,
            money: 42_000,
            staff: 6,
            reputation: 30,
            doom: 0,
            max_doom: 100,
            papers_published: 2,
            actions_executed: 30,
            actions_skipped: 4,
            blocked_attempts: 1,
            decisions: Vec::new(),
            total_rng_calls: 120,
            signature: "abc123".to_string(),
        }
    }

    fn failed_check() -> ReplayCheck {
        ReplayCheck {
            seed: "REPORT-SEED".to_string(),
            first_signature: "aa".to_string(),
            second_signature: "bb".to_string(),
            states_match: true,
        }
    }

    #[test]
    fn markdown_lists_runs_and_checks() {
        let runs = [sample_run(true), sample_run(false)];
        let checks = [failed_check()];
        let report = TesterReport {
            runs: &runs,
            replay_checks: &checks,
        };
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# P(Doom) Simulation Results"));
        assert!(text.contains("**Victory rate**: 50.0%"));
        assert!(text.contains("| REPORT-SEED | Balanced | 14 | doom_averted |"));
        assert!(text.contains("❌ `REPORT-SEED`"));
    }

    #[test]
    fn json_report_round_trips_fields() {
        let runs = [sample_run(false)];
        let report = TesterReport {
            runs: &runs,
            replay_checks: &[],
        };
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["runs"][0]["strategy"], "balanced");
        assert_eq!(value["runs"][0]["total_rng_calls"], 120);
        assert!(value["replay_checks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn console_report_flags_mismatched_replays() {
        colored::control::set_override(false);
        let runs = [sample_run(true)];
        let checks = [failed_check()];
        let report = TesterReport {
            runs: &runs,
            replay_checks: &checks,
        };
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &report, Duration::from_millis(5)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Victory rate: 100.0%"));
        assert!(text.contains("aa != bb"));
    }
}

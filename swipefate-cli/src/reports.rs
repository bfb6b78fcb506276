use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use crate::simulation::{RunRecord, SimulationReport};

pub fn generate_console_report(
    writer: &mut dyn Write,
    report: &SimulationReport,
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        format!("📊 {} Simulation Summary", report.scenario)
            .bright_cyan()
            .bold()
    )?;
    writeln!(writer, "{}", "==============================".cyan())?;

    let total = report.runs.len();
    let wins = report.runs.iter().filter(|r| r.won).count();
    let unfinished = report.runs.iter().filter(|r| !r.finished).count();
    writeln!(writer, "Total games: {total}")?;
    writeln!(writer, "Won: {}", wins.to_string().green())?;
    writeln!(writer, "Lost: {}", (total - wins - unfinished).to_string().red())?;
    if unfinished > 0 {
        writeln!(writer, "Unfinished: {}", unfinished.to_string().yellow())?;
    }
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for summary in &report.summaries {
        let status = if summary.wins > 0 {
            "✅".green()
        } else {
            "❌".red()
        };
        writeln!(writer, "{} {}", status, summary.policy.bold())?;
        writeln!(
            writer,
            "   Wins: {}/{} ({:.1}%)",
            summary.wins, summary.games, summary.win_rate
        )?;
        writeln!(writer, "   Average turns: {:.1}", summary.average_turns)?;
        writeln!(
            writer,
            "   Average popularity: {:.1}",
            summary.average_popularity
        )?;
        writeln!(writer)?;
    }

    let endings = ending_counts(&report.runs);
    if !endings.is_empty() {
        writeln!(writer, "{}", "⚰️  Endings".bright_yellow().bold())?;
        writeln!(writer, "{}", "==========".yellow())?;
        for (message, count) in endings {
            writeln!(writer, "  {count:>4} × {message}")?;
        }
        writeln!(writer)?;
    }

    if let Some(history) = &report.history {
        writeln!(writer, "{}", "🏆 History".bright_magenta().bold())?;
        writeln!(writer, "{}", "==========".magenta())?;
        writeln!(
            writer,
            "Games recorded: {} ({:.1}% won)",
            history.total_games, history.win_percentage
        )?;
        writeln!(
            writer,
            "Achievements: {}/{}",
            history.achievements_unlocked, history.total_achievements
        )?;
        for run in report.runs.iter().filter(|r| !r.new_achievements.is_empty()) {
            writeln!(
                writer,
                "  • [{} seed {}] {}",
                run.policy,
                run.seed,
                run.new_achievements.join(", ").green()
            )?;
        }
    }
    Ok(())
}

pub fn generate_json_report(writer: &mut dyn Write, report: &SimulationReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(writer: &mut dyn Write, report: &SimulationReport) -> Result<()> {
    writeln!(writer, "# {} Simulation Results\n", report.scenario)?;

    writeln!(writer, "## Summary\n")?;
    writeln!(
        writer,
        "| Policy | Games | Wins | Win rate | Avg turns | Avg popularity |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|")?;
    for summary in &report.summaries {
        writeln!(
            writer,
            "| {} | {} | {} | {:.1}% | {:.1} | {:.1} |",
            summary.policy,
            summary.games,
            summary.wins,
            summary.win_rate,
            summary.average_turns,
            summary.average_popularity
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "## Runs\n")?;
    for run in &report.runs {
        let status = match (run.finished, run.won) {
            (true, true) => "✅",
            (true, false) => "❌",
            (false, _) => "⏸️",
        };
        writeln!(writer, "### {} {} (seed {})\n", status, run.policy, run.seed)?;
        writeln!(writer, "- **Turns**: {}", run.turns)?;
        writeln!(writer, "- **Outcome**: {}", run.message)?;
        writeln!(writer, "- **Popularity**: {}", run.popularity)?;
        let resources: Vec<String> = run
            .resources
            .iter()
            .map(|(id, value)| format!("{id} {value}"))
            .collect();
        writeln!(writer, "- **Resources**: {}", resources.join(", "))?;
        if !run.new_achievements.is_empty() {
            writeln!(
                writer,
                "- **Achievements**: {}",
                run.new_achievements.join(", ")
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// End messages by frequency, most common first.
fn ending_counts(runs: &[RunRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for run in runs {
        match counts.iter_mut().find(|(message, _)| *message == run.message) {
            Some((_, count)) => *count += 1,
            None => counts.push((run.message.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{PolicySummary, summarize};
    use std::collections::BTreeMap;

    fn run(policy: &str, seed: u64, won: bool, message: &str) -> RunRecord {
        RunRecord {
            policy: policy.to_string(),
            seed,
            turns: if won { 30 } else { 12 },
            finished: true,
            won,
            message: message.to_string(),
            popularity: 50,
            progress: if won { 100 } else { 40 },
            resources: BTreeMap::from([("treasury".to_string(), 40)]),
            new_achievements: if won {
                vec!["Veteran".to_string()]
            } else {
                Vec::new()
            },
            decisions: Vec::new(),
        }
    }

    fn sample_report() -> SimulationReport {
        let runs = vec![
            run("greedy", 1, true, "You ruled for 30 years!"),
            run("greedy", 2, false, "Your Treasury is too low!"),
            run("random", 1, false, "Your Treasury is too low!"),
        ];
        let summaries: Vec<PolicySummary> = summarize(&runs);
        SimulationReport {
            scenario: "Kingdom".to_string(),
            runs,
            summaries,
            history: None,
        }
    }

    #[test]
    fn console_report_lists_policies_and_endings() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        generate_console_report(&mut out, &sample_report(), Duration::from_millis(5)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Kingdom Simulation Summary"));
        assert!(text.contains("Total games: 3"));
        assert!(text.contains("greedy"));
        assert!(text.contains("Wins: 1/2 (50.0%)"));
        assert!(text.contains("   2 × Your Treasury is too low!"));
    }

    #[test]
    fn json_report_is_parseable() {
        let mut out = Vec::new();
        generate_json_report(&mut out, &sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["scenario"], "Kingdom");
        assert_eq!(value["runs"].as_array().unwrap().len(), 3);
        assert!(value.get("history").is_none());
        assert!(value["runs"][0].get("decisions").is_none());
    }

    #[test]
    fn markdown_report_has_a_summary_table() {
        let mut out = Vec::new();
        generate_markdown_report(&mut out, &sample_report()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("# Kingdom Simulation Results"));
        assert!(text.contains("| greedy | 2 | 1 | 50.0% |"));
        assert!(text.contains("### ✅ greedy (seed 1)"));
        assert!(text.contains("- **Achievements**: Veteran"));
    }

    #[test]
    fn endings_sort_by_frequency() {
        let endings = ending_counts(&sample_report().runs);
        assert_eq!(endings[0], ("Your Treasury is too low!".to_string(), 2));
        assert_eq!(endings[1].1, 1);
    }
}

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    if results.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len() as f64) * 100.0;
    rate
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Battle Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "===============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    // Overall stats
    writeln!(out, "Total scenario runs: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Runs: {}/{} successful",
            result.successful_runs(),
            result.runs.len()
        )?;
        writeln!(out, "   Outcomes: {}", result.outcome_tally())?;
        writeln!(
            out,
            "   Rage strikes: {} | Invariant breaches: {}",
            result.rage_attacks(),
            result.invariant_violations()
        )?;
        writeln!(out, "   Average time: {}ms", result.average_wall_ms())?;

        let failures = result.failures();
        if !failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_wall_ms());
    let slowest = results.iter().max_by_key(|r| r.average_wall_ms());
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({}ms)",
            fastest.scenario_name.green(),
            fastest.average_wall_ms()
        )?;
        writeln!(
            out,
            "Slowest: {} ({}ms)",
            slowest.scenario_name.yellow(),
            slowest.average_wall_ms()
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# StatSmart Battle Test Results\n")?;
    writeln!(out, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M UTC"))?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenario runs**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(
            out,
            "### {} {} (seed {})\n",
            status, result.scenario_name, result.seed
        )?;
        writeln!(
            out,
            "- **Runs**: {}/{} successful",
            result.successful_runs(),
            result.runs.len()
        )?;
        writeln!(out, "- **Outcomes**: {}", result.outcome_tally())?;
        writeln!(out, "- **Rage strikes**: {}", result.rage_attacks())?;
        writeln!(
            out,
            "- **Invariant breaches**: {}",
            result.invariant_violations()
        )?;
        writeln!(out, "- **Average time**: {}ms", result.average_wall_ms())?;

        let failures = result.failures();
        if !failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(
        out,
        "scenario,seed,passed,runs,successful,outcomes,rage_attacks,invariant_violations,average_ms,first_failure"
    )?;
    for result in results {
        let first_failure = result
            .failures()
            .first()
            .map(|failure| csv_field(failure))
            .unwrap_or_default();
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            csv_field(&result.scenario_name),
            result.seed,
            result.passed,
            result.runs.len(),
            result.successful_runs(),
            result.outcome_tally(),
            result.rage_attacks(),
            result.invariant_violations(),
            result.average_wall_ms(),
            first_failure
        )?;
    }
    Ok(())
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

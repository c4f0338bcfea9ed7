//! Colored console output for interactive runs

use crate::proxy::{DistributionResult, DistributionStatus, ValidationReport};
use crossterm::style::Stylize;
use std::io::{self, Write};

const RULE_WIDTH: usize = 40;

pub fn header(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("{}", rule.as_str().green());
    println!("{}", format!("{:^width$}", title, width = RULE_WIDTH).green().bold());
    println!("{}", rule.as_str().green());
    println!();
}

pub fn rule() {
    println!("{}", "-".repeat(RULE_WIDTH));
}

pub fn step(message: &str) {
    println!("{}", message.cyan().bold());
}

pub fn info(message: &str) {
    println!("{}", message);
}

pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

pub fn warn(message: &str) {
    println!("{}", message.yellow());
}

pub fn error(message: &str) {
    println!("{}", message.red().bold());
}

/// Rewrite the current line with check progress
pub fn progress(checked: usize, total: usize, good: usize, bad: usize) {
    let percent = if total > 0 { checked * 100 / total } else { 100 };
    print!(
        "\r{} {:>3}% ({}/{}) | {} {} | {} {}",
        "Checking".cyan(),
        percent,
        checked,
        total,
        "good".green(),
        good,
        "bad".red(),
        bad
    );
    let _ = io::stdout().flush();
    if checked == total {
        println!();
    }
}

/// Table of the first failures with their reasons
pub fn diagnostics(report: &ValidationReport, limit: usize) {
    let rows = report.diagnostics(limit);
    if rows.is_empty() {
        return;
    }

    let width = rows
        .iter()
        .map(|(address, _)| address.len())
        .max()
        .unwrap_or(0)
        .max("Proxy (host:port)".len());

    println!();
    println!("{}", "Failure diagnostics (sample)".bold());
    println!("{:<width$}  {}", "Proxy (host:port)", "Reason", width = width);
    for (address, reason) in rows {
        println!(
            "{}  {}",
            format!("{:<width$}", address, width = width).cyan(),
            reason.to_string().red()
        );
    }
}

pub fn distribution(results: &[DistributionResult]) {
    for result in results {
        match &result.status {
            DistributionStatus::Written { file, count } => println!(
                "  {} wrote {} proxies to {}",
                "✔".green(),
                count,
                file.display().to_string().bold()
            ),
            DistributionStatus::NotADirectory => println!(
                "  {} skipped invalid path {}",
                "!".yellow(),
                result.target.display()
            ),
            DistributionStatus::WriteFailed { file, error } => println!(
                "  {} failed to write {}: {}",
                "✖".red(),
                file.display().to_string().bold(),
                error
            ),
        }
    }
}

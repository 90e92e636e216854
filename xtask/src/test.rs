//! xtask test - host test suites for the workspace.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Host-testable crates; the firmware needs `std` for its mocks.
const HOST_PACKAGES: &[&str] = &["-p", "platform", "-p", "playback", "-p", "firmware", "-p", "xtask"];

/// Host features; `playback/std` gates the `loader_properties` suite.
const HOST_FEATURES: &str = "firmware/std,platform/std,playback/std";

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        suite("unit tests", &["--lib", "--bins"], true)?;
    }
    if !unit_only {
        suite("integration tests", &["--tests"], true)?;
    }
    suite("doc tests", &["--doc"], false)?;

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn suite(label: &str, selector: &[&str], required: bool) -> Result<()> {
    println!("{}", format!("  Running {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .arg("test")
        .args(HOST_PACKAGES)
        .args(["--features", HOST_FEATURES])
        .args(selector)
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {label} passed {} in {:.2}s",
                extract_test_summary(&stdout),
                start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else if required {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {line}");
        }
        anyhow::bail!("{label} failed");
    } else {
        eprintln!("{}", format!("  ⚠ {label} failed").yellow().bold());
    }
    println!();
    Ok(())
}

/// Sum every `test result:` line of a cargo test run.
pub fn extract_test_summary(output: &str) -> String {
    let mut passed = 0u64;
    let mut failed = 0u64;
    let mut seen = false;
    for line in output.lines().filter(|l| l.contains("test result:")) {
        seen = true;
        for part in line.split(';') {
            let mut words = part.split_whitespace().rev();
            let (Some(kind), Some(count)) = (words.next(), words.next()) else {
                continue;
            };
            let Ok(n) = count.parse::<u64>() else { continue };
            match kind {
                "passed" => passed = passed.saturating_add(n),
                "failed" => failed = failed.saturating_add(n),
                _ => {}
            }
        }
    }
    if seen {
        format!("({passed} passed, {failed} failed)")
    } else {
        "(summary not available)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_up_all_binaries() {
        let out = "\
test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out
running 3 tests
test result: ok. 3 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out";
        assert_eq!(extract_test_summary(out), "(8 passed, 0 failed)");
    }

    #[test]
    fn host_features_enable_std_gated_suites() {
        for feature in ["platform/std", "playback/std"] {
            assert!(HOST_FEATURES.split(',').any(|f| f == feature), "{feature}");
        }
    }

    #[test]
    fn summary_missing() {
        assert_eq!(extract_test_summary("error: no such target"), "(summary not available)");
    }
}

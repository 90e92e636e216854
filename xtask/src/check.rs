//! xtask check - every build the project must keep compiling.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::flash::TARGET;

/// One `cargo` invocation in the check suite.
pub struct Step {
    pub label: &'static str,
    pub args: &'static [&'static str],
    /// Failing a required step fails the whole check.
    pub required: bool,
}

/// The check suite, in run order.
pub const STEPS: &[Step] = &[
    Step {
        label: "firmware (STM32H7, hardware)",
        args: &["check", "-p", "firmware", "--target", TARGET, "--features", "hardware"],
        required: true,
    },
    Step {
        label: "platform (no_std)",
        args: &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
        required: true,
    },
    Step {
        label: "playback (no_std)",
        args: &["check", "-p", "playback", "--target", TARGET, "--no-default-features"],
        required: true,
    },
    Step {
        label: "host crates",
        args: &["check", "-p", "platform", "-p", "playback", "-p", "firmware", "-p", "xtask", "--all-targets"],
        required: true,
    },
    Step {
        label: "clippy",
        args: &["clippy", "--workspace", "--exclude", "firmware", "--all-targets", "--", "-D", "warnings"],
        required: false,
    },
    Step {
        label: "formatting",
        args: &["fmt", "--all", "--check"],
        required: false,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();
        let output = Command::new("cargo")
            .args(step.args)
            .output()
            .with_context(|| format!("Failed to run cargo for {}", step.label))?;

        if output.status.success() {
            println!(
                "{}",
                format!(
                    "  ✓ {} passed in {:.2}s",
                    step.label,
                    start.elapsed().as_secs_f64()
                )
                .green()
            );
        } else if step.required {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", step.label);
        } else {
            eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        }
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

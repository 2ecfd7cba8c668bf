use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "chunk-arena workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the arena and list benchmarks and summarize them
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,

        /// Criterion baseline to save and report on
        #[arg(long, default_value = "current")]
        baseline: String,

        /// Build the library without the `tracing` feature
        #[arg(long, default_value_t = false)]
        no_tracing: bool,
    },
}

const BENCHES: &[&str] = &["arena_benchmark", "linked_list_benchmark"];

#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench {
            quick,
            report_only,
            baseline,
            no_tracing,
        } => {
            if !report_only {
                run_benchmarks(quick, &baseline, no_tracing)?;
            }
            generate_report(&baseline)?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool, baseline: &str, no_tracing: bool) -> Result<()> {
    for bench in BENCHES {
        println!("\n>>> Running {bench}");
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.env("CARGO_INCREMENTAL", "0");
        cmd.arg("bench").arg("-p").arg("chunk-arena").arg("--bench").arg(bench);
        if no_tracing {
            cmd.arg("--no-default-features");
        }

        // Args for the test runner (Criterion) go after --
        cmd.arg("--").arg("--save-baseline").arg(baseline);
        if quick {
            cmd.arg("--measurement-time").arg("0.1");
            cmd.arg("--noplot");
            cmd.arg("--sample-size").arg("10");
        }

        let status = cmd.status().with_context(|| format!("failed to run bench {bench}"))?;
        if status.success() {
            println!("Finished {bench} in {:.2?}", start.elapsed());
        } else {
            eprintln!("Warning: benchmark {bench} failed");
        }
    }

    Ok(())
}

fn generate_report(baseline: &str) -> Result<()> {
    println!("\n>>> Generating report for baseline '{baseline}'...");

    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    // group -> benchmark id -> mean time (ns)
    let mut results: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    collect_results(criterion_dir, criterion_dir, baseline, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)
        .with_context(|| format!("cannot create {}", report_path.display()))?;

    writeln!(file, "# Benchmark Report ({baseline})")?;
    for (group, entries) in &results {
        let fastest = entries.values().copied().fold(f64::INFINITY, f64::min);

        writeln!(file, "\n## {group}\n")?;
        writeln!(file, "| Benchmark | Mean | Ops/s | vs fastest |")?;
        writeln!(file, "|---|---|---|---|")?;
        for (id, &time_ns) in entries {
            writeln!(
                file,
                "| {id} | {} | {} | **{:.2}x** |",
                format_time(time_ns),
                format_ops(1e9 / time_ns),
                time_ns / fastest
            )?;
        }
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

/// Walks `dir` for `<benchmark>/<baseline>/estimates.json`.
fn collect_results(
    root: &Path,
    dir: &Path,
    baseline: &str,
    results: &mut BTreeMap<String, BTreeMap<String, f64>>,
) -> Result<()> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || path.file_name().is_some_and(|name| name == "report") {
            continue;
        }
        let estimates = path.join(baseline).join("estimates.json");
        if estimates.is_file() {
            let content = fs::read_to_string(&estimates)
                .with_context(|| format!("cannot read {}", estimates.display()))?;
            let parsed: Estimates = serde_json::from_str(&content)
                .with_context(|| format!("malformed {}", estimates.display()))?;
            if parsed.mean.point_estimate > 0.0 {
                let (group, id) = split_id(root, &path);
                results.entry(group).or_default().insert(id, parsed.mean.point_estimate);
            }
        } else {
            collect_results(root, &path, baseline, results)?;
        }
    }

    Ok(())
}

/// `target/criterion/group/function/param` -> (`group`, `function/param`).
fn split_id(root: &Path, path: &Path) -> (String, String) {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let mut parts = relative.iter().map(|part| part.to_string_lossy().into_owned());
    let group = parts.next().unwrap_or_default();
    let id: Vec<String> = parts.collect();
    if id.is_empty() {
        (group.clone(), group)
    } else {
        (group, id.join("/"))
    }
}

fn format_time(ns: f64) -> String {
    if ns > 1_000_000.0 {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else if ns > 1_000.0 {
        format!("{:.2} µs", ns / 1_000.0)
    } else {
        format!("{ns:.1} ns")
    }
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

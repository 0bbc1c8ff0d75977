//! CapTable simulator CLI
//!
//! Run preset or file-based cap-table scenarios through the deterministic
//! engine, with optional Monte Carlo sweeps over valuations.

use std::path::PathBuf;

use anyhow::Context;
use captable_core::{fmt, run, validate_scenario, RunOptions, Scenario, ScenarioResult};
use captable_sim::{sweep, PresetId, SweepConfig, SweepSummary};
use clap::Parser;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// CapTable deterministic scenario simulator
#[derive(Parser, Debug)]
#[command(name = "captable-sim")]
#[command(about = "Run cap-table timeline simulations", long_about = None)]
struct Args {
    /// Preset scenario (founding_only, safe_stack, bridge_note,
    /// seed_to_exit, degenerate, all)
    #[arg(short, long, default_value = "seed_to_exit")]
    preset: String,

    /// Path to a scenario JSON document (overrides --preset)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Stop after (inclusive of) this stage id
    #[arg(long)]
    until: Option<String>,

    /// Monte Carlo runs (0 = single deterministic run)
    #[arg(long, default_value = "0")]
    runs: u32,

    /// Master seed for Monte Carlo sampling
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Relative valuation noise for Monte Carlo sampling
    #[arg(long, default_value = "0.2")]
    noise: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let scenarios = resolve_scenarios(&args)?;

    if args.runs > 0 {
        let config = SweepConfig {
            runs: args.runs,
            seed: args.seed,
            valuation_noise: args.noise,
        };
        let mut summaries = Vec::new();
        for scenario in &scenarios {
            info!("Monte Carlo: {} ({} runs, seed={})", scenario.name, config.runs, config.seed);
            let summary = sweep(scenario, &config);
            if !args.json {
                render_sweep(&summary);
            }
            summaries.push((scenario.id.clone(), summary));
        }
        if args.json {
            let payload = serde_json::json!({
                "mode": "monte_carlo",
                "sweeps": summaries
                    .iter()
                    .map(|(id, summary)| serde_json::json!({"scenarioId": id, "summary": summary}))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        return Ok(());
    }

    let options = RunOptions {
        until_stage_id: args.until.clone(),
    };
    let mut results: Vec<ScenarioResult> = Vec::new();
    for scenario in &scenarios {
        for issue in validate_scenario(scenario) {
            warn!("[{}] lint: {}", scenario.name, issue.message);
        }
        let result = run(scenario, &options);
        if !args.json {
            render_result(&result);
        }
        results.push(result);
    }

    if args.json {
        let payload = serde_json::json!({
            "mode": "run",
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    Ok(())
}

fn resolve_scenarios(args: &Args) -> anyhow::Result<Vec<Scenario>> {
    if let Some(path) = &args.scenario {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario document {}", path.display()))?;
        let scenario = Scenario::from_json(&document)
            .with_context(|| format!("decoding scenario document {}", path.display()))?;
        return Ok(vec![scenario]);
    }

    if args.preset == "all" {
        return Ok(PresetId::all().iter().map(PresetId::build).collect());
    }

    let preset: PresetId = args
        .preset
        .parse()
        .map_err(|message: String| anyhow::anyhow!(message))
        .with_context(|| {
            format!(
                "available presets: {}, all",
                PresetId::all()
                    .iter()
                    .map(|preset| preset.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;
    Ok(vec![preset.build()])
}

fn render_result(result: &ScenarioResult) {
    info!("Scenario: {} ({} stages)", result.scenario_name, result.stage_results.len());

    for stage in &result.stage_results {
        let table_sum: u64 = stage.cap_table.iter().map(|row| row.shares).sum();
        info!(
            "  [{}] {} -> {} holders, {} shares",
            stage.kind,
            stage.name,
            stage.cap_table.len(),
            fmt::shares(table_sum),
        );
        for line in &stage.math {
            debug!("      {line}");
        }
    }

    for warning in &result.warnings {
        warn!("  {warning}");
    }

    info!("Final cap table ({} shares):", fmt::shares(result.total_shares));
    for row in &result.cap_table {
        info!(
            "  {:<24} {:<16} {:>14}  {}",
            row.label,
            row.share_class,
            fmt::shares(row.shares),
            fmt::percent(row.percent, 2),
        );
    }

    if let Some(waterfall) = &result.exit_waterfall {
        info!("Exit waterfall:");
        for row in waterfall {
            info!(
                "  {:<24} {:>14} shares -> {}",
                row.stakeholder,
                fmt::shares(row.shares),
                fmt::money(row.payout),
            );
        }
    }
}

fn render_sweep(summary: &SweepSummary) {
    info!(
        "  Founder ownership: mean {} (p05 {}, p95 {})",
        fmt::percent(summary.founder_ownership.mean, 2),
        fmt::percent(summary.founder_ownership.p05, 2),
        fmt::percent(summary.founder_ownership.p95, 2),
    );
    info!(
        "  Exit proceeds: mean {} (min {}, max {})",
        fmt::money(summary.exit_proceeds.mean),
        fmt::money(summary.exit_proceeds.min),
        fmt::money(summary.exit_proceeds.max),
    );
    if summary.runs_with_warnings > 0 {
        warn!(
            "  {}/{} runs produced warnings",
            summary.runs_with_warnings, summary.runs
        );
    }
}

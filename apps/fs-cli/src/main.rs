use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use fs_app::plan_service::{self, PlanOptions};
use fs_app::{AppResult, SweepOverrides, config_service, sweep_service};
use fs_results::RunStatus;
use fs_sweep::{CancelToken, SweepProgressEvent, SweepTiming};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fs-cli")]
#[command(
    about = "fieldsweep CLI - parametric position sweeps against a field-simulation engine",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a sweep configuration
    Validate {
        /// Path to the sweep YAML file
        config_path: PathBuf,
    },
    /// List the cases a configuration expands to
    Cases {
        /// Path to the sweep YAML file
        config_path: PathBuf,
    },
    /// List the sampled positions of a configuration
    Positions {
        /// Path to the sweep YAML file
        config_path: PathBuf,
    },
    /// Run a sweep
    Sweep {
        /// Path to the sweep YAML file
        config_path: PathBuf,
        /// Write the result table here instead of the configured path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Do not store the run
        #[arg(long)]
        no_store: bool,
    },
    /// Execute a geometry action plan
    Plan {
        /// Path to the action-plan JSON file
        plan_path: PathBuf,
        /// Sweep YAML supplying the engine definition
        #[arg(long)]
        config: Option<PathBuf>,
        /// Validate and list the actions without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored runs for a configuration
    Runs {
        /// Path to the sweep YAML file
        config_path: PathBuf,
    },
    /// Show a stored run
    ShowRun {
        /// Path to the sweep YAML file
        config_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Print the table as CSV
        #[arg(long)]
        csv: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Cases { config_path } => cmd_cases(&config_path),
        Commands::Positions { config_path } => cmd_positions(&config_path),
        Commands::Sweep {
            config_path,
            csv,
            no_store,
        } => cmd_sweep(&config_path, SweepOverrides { csv, no_store }),
        Commands::Plan {
            plan_path,
            config,
            dry_run,
        } => cmd_plan(&plan_path, PlanOptions { config, dry_run }),
        Commands::Runs { config_path } => cmd_runs(&config_path),
        Commands::ShowRun {
            config_path,
            run_id,
            csv,
        } => cmd_show_run(&config_path, &run_id, csv),
    };

    match result {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(e.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn cmd_validate(config_path: &Path) -> AppResult<i32> {
    println!("Validating sweep: {}", config_path.display());
    let loaded = config_service::load_config(config_path)?;
    let plan = config_service::build_plan(&loaded.config)?;
    println!("✓ Configuration is valid");
    println!("  Cases: {}", plan.cases.len());
    println!("  Positions: {}", plan.positions.len());
    println!(
        "  Outputs: {}",
        plan.outputs
            .iter()
            .map(|o| format!("{} ({})", o.name, o.integral_id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(0)
}

fn cmd_cases(config_path: &Path) -> AppResult<i32> {
    let loaded = config_service::load_config(config_path)?;
    let cases = config_service::build_cases(&loaded.config)?;
    println!("{} cases ({}):", cases.len(), loaded.config.sweep.field);
    for case in cases {
        println!("  {:>3}  {}", case.index, case.label());
    }
    Ok(0)
}

fn cmd_positions(config_path: &Path) -> AppResult<i32> {
    let loaded = config_service::load_config(config_path)?;
    let positions = config_service::build_positions(&loaded.config)?;
    println!("{} positions:", positions.len());
    for (i, p) in positions.iter().enumerate() {
        println!("  {:>3}  {}", i, p);
    }
    Ok(0)
}

fn cmd_sweep(config_path: &Path, overrides: SweepOverrides) -> AppResult<i32> {
    println!("Running sweep: {}", config_path.display());

    let cancel = CancelToken::new();
    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    let response = sweep_service::run_sweep_file(
        config_path,
        &overrides,
        &cancel,
        Some(&mut |event| {
            let stage_key = event.stage.name().to_string();
            let emit_now = stage_key != last_stage || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = stage_key;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let report = &response.report;
    match response.error() {
        None => println!("✓ Sweep completed: {}", response.run_id),
        Some(e) => println!("✗ Sweep stopped: {e}"),
    }
    for warning in &report.restore_warnings {
        println!("  Restore warning: {warning}");
    }
    print_timing_summary(&report.timing);

    println!(
        "  Rows: {} of {}  Columns: {}",
        report.table.row_count(),
        report.table.positions().len(),
        report.table.column_headers().len()
    );
    if let Some(path) = &response.csv_path {
        println!("  CSV: {}", path.display());
    }
    if let Some(dir) = &response.run_dir {
        println!("  Stored: {}", dir.display());
    }

    Ok(response.exit_code())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &SweepProgressEvent) {
    let width = 28usize;
    let fraction = event.fraction_complete();
    let filled = ((fraction * width as f64).round() as usize).min(width);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(width.saturating_sub(filled)));
    let mut line = format!(
        "\r[{}] {:>6.2}%  {}",
        bar,
        fraction * 100.0,
        event.stage.name()
    );
    if let Some(case) = event.case_index {
        line.push_str(&format!("  case={}/{}", case + 1, event.cases_total));
    }
    if let Some(p) = &event.position {
        line.push_str(&format!("  at={}", p));
    }
    line.push_str(&format!("  elapsed={:.1}s", event.elapsed_wall_s));
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &SweepTiming) {
    let total = timing.total_s.max(1.0e-12);
    let pct = |t: f64| 100.0 * t / total;

    println!("\nTiming summary:");
    println!("  Move:    {:.3}s ({:.1}%)", timing.move_s, pct(timing.move_s));
    println!("  Mesh:    {:.3}s ({:.1}%)", timing.mesh_s, pct(timing.mesh_s));
    println!("  Solve:   {:.3}s ({:.1}%)", timing.solve_s, pct(timing.solve_s));
    println!("  Extract: {:.3}s ({:.1}%)", timing.extract_s, pct(timing.extract_s));
    if timing.settle_s > 0.0 {
        println!("  Settle:  {:.3}s", timing.settle_s);
    }
    println!("  Total:   {:.3}s", timing.total_s);
    println!("  Positions recorded: {}", timing.positions_recorded);
    if timing.solve_retries > 0 || timing.solve_warnings > 0 {
        println!(
            "  Solve retries: {}  warnings: {}",
            timing.solve_retries, timing.solve_warnings
        );
    }
}

fn cmd_plan(plan_path: &Path, options: PlanOptions) -> AppResult<i32> {
    println!("Action plan: {}", plan_path.display());
    let (plan, report) = plan_service::run_plan_file(plan_path, &options)?;

    if options.dry_run {
        for (i, action) in plan.actions.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, plan_service::describe_action(action));
        }
        println!("✓ Plan is valid ({} actions)", plan.actions.len());
        return Ok(0);
    }

    for (outcome, action) in report.actions.iter().zip(&plan.actions) {
        let total = outcome.total.map(|t| format!(" of {t}")).unwrap_or_default();
        println!(
            "  {:>2}. {}  moved {}{}",
            outcome.index + 1,
            plan_service::describe_action(action),
            outcome.moved,
            total
        );
    }
    println!("✓ Plan applied ({} rebuilds)", report.rebuilds);
    if let Some(path) = &report.saved_as {
        println!("  Saved model: {}", path.display());
    }
    Ok(0)
}

fn cmd_runs(config_path: &Path) -> AppResult<i32> {
    let runs = sweep_service::list_runs(config_path)?;

    if runs.is_empty() {
        println!("No stored runs for: {}", config_path.display());
    } else {
        println!("Stored runs:");
        for manifest in runs {
            println!(
                "  {} ({})  {}",
                manifest.run_id,
                manifest.timestamp,
                status_text(&manifest.status)
            );
        }
    }
    Ok(0)
}

fn status_text(status: &RunStatus) -> String {
    match status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Cancelled {
            case_index,
            position_index: Some(p),
        } => format!("cancelled at case {case_index}, position {p}"),
        RunStatus::Cancelled { case_index, .. } => format!("cancelled at case {case_index}"),
        RunStatus::Failed { stage, .. } => format!("failed while {stage}"),
    }
}

fn cmd_show_run(config_path: &Path, run_id: &str, csv: bool) -> AppResult<i32> {
    let (manifest, table) = sweep_service::load_run(config_path, run_id)?;

    if csv {
        print!("{}", table.to_csv_string());
        return Ok(0);
    }

    println!("Run: {} ({})", manifest.run_id, manifest.name);
    println!("  Timestamp: {}", manifest.timestamp);
    println!("  Tool version: {}", manifest.tool_version);
    println!("  Status: {}", status_text(&manifest.status));
    if let RunStatus::Failed { message, .. } = &manifest.status {
        println!("  Error: {message}");
    }
    println!("  Elapsed: {:.3}s", manifest.elapsed_s);
    println!("  Cells: {}", manifest.cell_count);
    for warning in &manifest.restore_warnings {
        println!("  Restore warning: {warning}");
    }
    println!();
    print!("{}", table.render_text());
    Ok(0)
}

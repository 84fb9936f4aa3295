use clap::{Parser, Subcommand};
use hx_results::{RunOptions, RunStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Case(#[from] hx_case::CaseError),

    #[error(transparent)]
    Results(#[from] hx_results::ResultsError),

    #[error(transparent)]
    Registry(#[from] hx_models::RegistryError),
}

type AppResult<T> = Result<T, AppError>;

#[derive(Parser)]
#[command(name = "hx-cli")]
#[command(about = "HELYX chemistry - homogeneous reacting-gas time integration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate case file syntax and structure
    Validate {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
    /// List the selectable model types
    Models,
    /// Run a case
    Run {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Run store directory (defaults to .helyx/runs next to the case)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs of a case
    Runs {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Run store directory (defaults to .helyx/runs next to the case)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the records of a cached run
    ShowRun {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Run ID to display
        run_id: String,
        /// Run store directory (defaults to .helyx/runs next to the case)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = dispatch(cli.command);
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}

fn dispatch(command: Commands) -> AppResult<()> {
    match command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Models => cmd_models(),
        Commands::Run {
            case_path,
            output,
            no_cache,
        } => cmd_run(&case_path, output, !no_cache),
        Commands::Runs { case_path, output } => cmd_runs(&case_path, output),
        Commands::ShowRun {
            case_path,
            run_id,
            output,
        } => cmd_show_run(&case_path, &run_id, output),
    }
}

fn cmd_validate(case_path: &Path) -> AppResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = hx_case::load(case_path)?;
    // building resolves every model selection
    case.build_time_loop()?;
    println!("✓ Case '{}' is valid", case.name);
    Ok(())
}

fn cmd_models() -> AppResult<()> {
    let chemistry = hx_chemistry::chemistry_solvers()?;
    let ode = hx_chemistry::ode_solvers()?;
    let objects = hx_sim::solver_objects()?;
    for (interface, names) in [
        (chemistry.interface(), chemistry.names()),
        (ode.interface(), ode.names()),
        (objects.interface(), objects.names()),
    ] {
        println!("{}:", interface);
        for name in names {
            println!("  {}", name);
        }
    }
    Ok(())
}

fn open_store(case_path: &Path, output: Option<PathBuf>) -> AppResult<RunStore> {
    Ok(match output {
        Some(dir) => RunStore::new(dir)?,
        None => RunStore::for_case(case_path)?,
    })
}

fn cmd_run(case_path: &Path, output: Option<PathBuf>, use_cache: bool) -> AppResult<()> {
    let case = hx_case::load(case_path)?;
    let store = open_store(case_path, output)?;
    tracing::debug!(store = %store.root_dir().display(), use_cache, "opened run store");
    println!("Running case: {}", case.name);

    let options = RunOptions {
        use_cache,
        ..RunOptions::default()
    };
    let response = hx_results::ensure_run(&case, Some(case_path), &store, &options)?;

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }
    let summary = &response.manifest.summary;
    println!("  Time steps: {}", summary.steps);
    println!("  End time:   {:.6e} s", summary.end_time_s);
    println!("  Last dt:    {:.6e} s", summary.last_delta_t_s);
    println!("  Writes:     {}", summary.writes);
    println!("  Elapsed:    {:.3} s", summary.elapsed_s);
    println!("  Output:     {}", store.run_dir(&response.run_id).display());
    Ok(())
}

fn cmd_runs(case_path: &Path, output: Option<PathBuf>) -> AppResult<()> {
    let case = hx_case::load(case_path)?;
    let store = open_store(case_path, output)?;
    let runs = store.list_runs(&case.name)?;

    if runs.is_empty() {
        println!("No cached runs found for case: {}", case.name);
    } else {
        println!("Cached runs for case '{}':", case.name);
        for manifest in runs {
            println!(
                "  {} - {} ({} steps to t = {:.6e} s)",
                manifest.run_id, manifest.timestamp, manifest.summary.steps, manifest.summary.end_time_s
            );
        }
    }
    Ok(())
}

fn cmd_show_run(case_path: &Path, run_id: &str, output: Option<PathBuf>) -> AppResult<()> {
    let store = open_store(case_path, output)?;
    let (manifest, records) = hx_results::load_run(&store, run_id)?;

    println!("Run: {}", manifest.run_id);
    println!("  Case:      {}", manifest.case_name);
    println!("  Timestamp: {}", manifest.timestamp);
    println!("  Version:   {}", manifest.solver_version);
    println!("  Records:   {}", records.len());
    println!();
    println!("{:>14} {:>12} {:>14} {:>14}", "time [s]", "T [K]", "p [Pa]", "Qdot [W/m3]");
    for record in &records {
        println!(
            "{:>14.6e} {:>12.3} {:>14.6e} {:>14.6e}",
            record.time_s,
            record.t_k,
            record.p_pa,
            record.qdot_w_m3.unwrap_or(0.0)
        );
    }
    Ok(())
}

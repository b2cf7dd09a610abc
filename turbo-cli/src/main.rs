//! turbo-paths - select the sources compiled in the fast unit of a turbo build
//!
//! Usage:
//!   turbo-paths --enable                      Print active paths, one per line
//!   turbo-paths --enable --format json        Print `{"paths": [...], "reason": "..."}`
//!   turbo-paths                               Turbo disabled, prints nothing
//!
//! Every option can also be set through the environment (`TURBO_*`). Relative
//! paths are taken relative to `--repo`.

use clap::{Parser, ValueEnum, crate_version};
use convenient_git::SystemGit;
use convenient_turbo::{
    ActivePathStore, DEFAULT_EXTENSION, DEFAULT_MAX_ACTIVE_PATHS, DEFAULT_MERGE_BASE,
    DEFAULT_MIN_FRESH_PATHS, DEFAULT_PATH_PREFIX, FileStore, TurboConfig, TurboLimits, TurboMode,
    TurboResolver, TurboState,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for the resolved paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One path per line.
    Text,
    /// The full state as JSON.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "turbo-paths", version = crate_version!())]
#[command(about = "Select the active path set for a turbo build", long_about = None)]
struct Cli {
    /// Enable turbo builds
    #[arg(long, env = "TURBO_ENABLED")]
    enable: bool,

    /// Repository working directory
    #[arg(short, long, default_value = ".", env = "TURBO_REPO")]
    repo: PathBuf,

    /// Output directory of the last full build
    #[arg(long, default_value = "build/classes/java/main", env = "TURBO_BASELINE_DIR")]
    baseline_dir: PathBuf,

    /// Tracking state file (delete it to reset the active set)
    #[arg(long, default_value = "build/turbo-paths.txt", env = "TURBO_STATE_FILE")]
    state_file: PathBuf,

    /// Source root prefix, relative to the repository
    #[arg(long, default_value = DEFAULT_PATH_PREFIX, env = "TURBO_PATH_PREFIX")]
    path_prefix: String,

    /// Source file extension
    #[arg(long, default_value = DEFAULT_EXTENSION, env = "TURBO_EXTENSION")]
    extension: String,

    /// Reference diffed against until an epoch is pinned
    #[arg(long, default_value = DEFAULT_MERGE_BASE, env = "TURBO_MERGE_BASE")]
    merge_base: String,

    /// Extra paths or globs to add to this build only (comma separated)
    #[arg(long, value_delimiter = ',', env = "TURBO_EXTRA_PATHS")]
    extra_paths: Vec<String>,

    /// Active set size above which a stagnating set is reset
    #[arg(long, default_value_t = DEFAULT_MAX_ACTIVE_PATHS, env = "TURBO_MAX_ACTIVE_PATHS")]
    max_active_paths: usize,

    /// Probe size below which growth counts as stagnating
    #[arg(long, default_value_t = DEFAULT_MIN_FRESH_PATHS, env = "TURBO_MIN_FRESH_PATHS")]
    min_fresh_paths: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> TurboMode {
        TurboMode::from_flag(self.enable)
    }

    fn config(&self) -> TurboConfig {
        TurboConfig::new(
            anchor(&self.repo, &self.baseline_dir),
            anchor(&self.repo, &self.state_file),
        )
        .with_path_prefix(self.path_prefix.clone())
        .with_extension(self.extension.clone())
        .with_default_merge_base(self.merge_base.clone())
        .with_extra_paths(self.extra_paths.iter().filter(|p| !p.trim().is_empty()).cloned())
        .with_limits(TurboLimits {
            max_active_paths: self.max_active_paths,
            min_fresh_paths: self.min_fresh_paths,
        })
    }
}

/// Resolve `path` against `base` unless it is already absolute.
fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "turbo_paths=debug,convenient_turbo=debug,convenient_git=debug"
    } else {
        "turbo_paths=info,convenient_turbo=info,convenient_git=info"
    };

    // stdout carries the path list; logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Run one resolution and log its summary.
fn execute(cli: &Cli) -> Result<Option<TurboState>, Box<dyn std::error::Error>> {
    let config = cli.config();
    let probe = SystemGit::new(&cli.repo, config.path_filter());
    let store = FileStore::new(&config.state_file);
    let state_name = store.name();

    let mut resolver = TurboResolver::new(config, probe, store);
    let state = resolver.resolve(cli.mode())?;

    match &state {
        Some(state) => warn!("Turbo: {}", state.summary(&state_name)),
        None => warn!("Turbo: turbo builds disabled"),
    }
    Ok(state)
}

fn render(state: Option<&TurboState>, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&state),
        OutputFormat::Text => Ok(state
            .map(|state| {
                state
                    .paths
                    .iter()
                    .map(|path| format!("{path}\n"))
                    .collect::<String>()
            })
            .unwrap_or_default()),
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let state = execute(cli)?;
    print!("{}", render(state.as_ref(), cli.format)?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

//! pyghx - run a Python package straight from its GitHub repository.
//!
//! ```text
//! pyghx https://github.com/acme/tool/tree/main/packages/cli --help
//! ```
//!
//! Everything after the URL is handed to the package untouched. Log output goes
//! to stderr so the package owns stdout.

use anyhow::{Context, Result};
use clap::Parser;
use pyghx_core::config::AppConfig;
use pyghx_core::{InstallMode, Pyghx, PyghxConfig, PyghxError, RunContext};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pyghx", version)]
#[command(about = "Run Python packages directly from GitHub repositories")]
struct Args {
    /// GitHub URL of the repository or of a package directory inside it
    repo_url: String,

    /// Run from the working copy without installing dependencies
    #[arg(long)]
    no_install: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory holding cached working copies
    #[arg(long, env = AppConfig::CACHE_DIR_ENV)]
    cache_dir: Option<PathBuf>,

    /// Interpreter used when the package has no virtual environment
    #[arg(long, env = AppConfig::PYTHON_ENV)]
    python: Option<PathBuf>,

    /// Config file (defaults to the per-user pyghx/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Warn when a metadata file is skipped while describing the package
    #[arg(long)]
    warn_fallbacks: bool,

    /// Arguments passed through to the package
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    package_args: Vec<OsString>,
}

impl Args {
    fn install_mode(&self) -> InstallMode {
        if self.no_install {
            InstallMode::Skip
        } else {
            InstallMode::Install
        }
    }

    /// Layer flags and environment over the file-based config.
    fn load_config(&self) -> Result<PyghxConfig> {
        let mut config = match &self.config {
            Some(path) => PyghxConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => PyghxConfig::load_default().context("Failed to load config")?,
        };

        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_root(dir);
        }
        if let Some(python) = &self.python {
            config = config.with_python(python);
        }
        if self.warn_fallbacks {
            config.warn_on_descriptor_fallback = true;
        }
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = args.load_config()?;
    debug!("Cache root: {}", config.cache_root.display());

    let ctx = RunContext::from_current_dir(config).context("Failed to read working directory")?;
    let pyghx = Pyghx::new(ctx).context("Failed to initialize")?;

    pyghx.run(&args.repo_url, args.install_mode(), &args.package_args)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PyghxError>() {
                Some(err) => error!(stage = err.stage(), "{:#}", e),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

use clap::Parser;
use color_eyre::Result;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use folio::commands::{self, Command};
use folio::config::Config;
use folio::portfolio::Portfolio;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Browse a UX research portfolio stored in Airtable")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./folio.yaml or $XDG_CONFIG_HOME/folio/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Fall back to built-in fixture projects when Airtable is unavailable
  #[arg(long)]
  fixtures: bool,

  /// Retry a failed fetch this many times
  #[arg(long, default_value_t = 0)]
  retry: u32,

  /// Write logs to this file instead of stderr
  #[arg(long)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing(args.log_file.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Command line flag only ever enables fixtures
  let config = if args.fixtures {
    Config {
      fixtures: true,
      ..config
    }
  } else {
    config
  };

  let portfolio = Portfolio::from_config(&config)?;
  commands::run(args.command, &portfolio, args.retry).await;

  Ok(())
}

/// Log to stderr, or to `log_file` through a background writer.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info"));

  match log_file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      let name = path
        .file_name()
        .ok_or_else(|| color_eyre::eyre::eyre!("Invalid log file path: {}", path.display()))?;

      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      Ok(None)
    }
  }
}

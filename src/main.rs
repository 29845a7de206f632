use clap::{Args, Parser, Subcommand};
use go_affected::commands::{self, DetectArgs};
use go_affected::core::cancel::CancelToken;
use go_affected::core::config::ModuleSources;
use go_affected::core::context::RepoContext;
use go_affected::core::error::{AffectedError, AffectedResult, print_error};
use go_affected::graph::Propagation;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Find the Go packages affected by changes since a git revision
#[derive(Parser)]
#[command(name = "go-affected")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Debug logging on stderr (default level comes from GO_AFFECTED_LOG, else warn)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Where the repository and its modules are
#[derive(Args)]
struct RepoArgs {
  /// Repository root (default: located with git from the current directory)
  #[arg(long, value_name = "DIR")]
  repo_root: Option<PathBuf>,
  /// Module root relative to the repository root (repeatable)
  #[arg(long = "module", value_name = "DIR")]
  modules: Vec<PathBuf>,
  /// Workspace file listing module roots (default: <repo>/go.work if present)
  #[arg(long, value_name = "FILE")]
  go_work: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
  /// Show which packages are affected by changes since BASE
  Detect {
    /// Git revision to compare the working tree against (default: config base, else HEAD~)
    base: Option<String>,
    #[command(flatten)]
    repo: RepoArgs,
    /// Output format: text (default), json, names
    #[arg(long)]
    format: Option<String>,
    /// Propagation through imports: transitive (default) or single-pass
    #[arg(long)]
    propagation: Option<String>,
    /// Kill git / go subprocesses after this many seconds; 0 disables
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Print changed files and module roots without listing packages
    #[arg(long)]
    dry_run: bool,
  },

  /// List the module roots a detect run would scan
  Modules {
    #[command(flatten)]
    repo: RepoArgs,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Cyan))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  // stdout carries results; logs go to stderr
  let filter = if verbose {
    EnvFilter::new("go_affected=debug")
  } else {
    EnvFilter::try_from_env("GO_AFFECTED_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let cancel = CancelToken::new();
  let handler_token = cancel.clone();
  if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
    warn!(error = %e, "could not install Ctrl-C handler");
  }

  if let Err(err) = run(cli.command, cancel) {
    handle_error(err);
  }
}

fn run(command: Commands, cancel: CancelToken) -> AffectedResult<()> {
  match command {
    Commands::Detect {
      base,
      repo,
      format,
      propagation,
      timeout,
      dry_run,
    } => {
      let propagation = propagation.map(|p| p.parse::<Propagation>()).transpose()?;
      let ctx = RepoContext::build(repo.repo_root.as_deref(), timeout.map(Duration::from_secs), cancel)?;
      commands::run_detect(
        &ctx,
        DetectArgs {
          base,
          modules: ModuleSources {
            explicit: repo.modules,
            go_work: repo.go_work,
          },
          format,
          propagation,
          dry_run,
        },
      )
    }
    Commands::Modules { repo, json } => {
      let ctx = RepoContext::build(repo.repo_root.as_deref(), None, cancel)?;
      commands::run_modules(
        &ctx,
        ModuleSources {
          explicit: repo.modules,
          go_work: repo.go_work,
        },
        json,
      )
    }
  }
}

fn handle_error(err: AffectedError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

//! mmterm - CLI entry point
//!
//! Runs startup with terminal prompts, then drains the event queue until
//! Ctrl+C, saving the last-run state and input history on the way out.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mmterm::bootstrap::{self, Collaborators};
use mmterm::config::loader::ConfigLoader;
use mmterm::config::schema::Config;
use mmterm::config::{default, xdg};
use mmterm::events::AppEvent;
use mmterm::logging;
use mmterm::persist::{self, FileHistoryStore, FileLastRunStore, HistoryStore, LastRunStore};
use mmterm::prompt::LinePrompt;
use mmterm::server::HttpConnector;
use mmterm::snapshot::ApplicationSnapshot;
use mmterm::theme::FileThemeLoader;
use mmterm::timezone::SystemTimezone;
use tracing::{debug, info, warn};

/// Terminal client for Mattermost
#[derive(Parser)]
#[command(name = "mmterm")]
#[command(version, about = "Terminal client for Mattermost servers")]
struct Cli {
    /// Configuration file (default: XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not reopen the channel from the previous run
    #[arg(long)]
    ignore_last_run_state: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file (at --config when given)
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { action }) => run_config_command(action, cli.config.as_deref()),
        None => run_client(cli.config.as_deref(), cli.log_file, cli.ignore_last_run_state),
    }
}

fn run_config_command(action: ConfigAction, config_path: Option<&Path>) -> ExitCode {
    let result = match action {
        ConfigAction::Init { force } => default::create_default_config(config_path, force).map(|path| {
            println!("Created configuration at {}", path.display());
        }),
        ConfigAction::Path => {
            let path = config_path.map_or_else(xdg::config_path, Path::to_path_buf);
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Validate => return validate_config(config_path),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_config(config_path: Option<&Path>) -> ExitCode {
    let config = match ConfigLoader::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.timing.parse() {
        eprintln!("Config error: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = bootstrap::load_theme(&config, &FileThemeLoader) {
        eprintln!("Theme error: {e}");
        return ExitCode::FAILURE;
    }
    println!("Configuration is valid");
    println!("{config:#?}");
    ExitCode::SUCCESS
}

fn run_client(
    config_path: Option<&Path>,
    log_file: Option<PathBuf>,
    ignore_last_run_state: bool,
) -> ExitCode {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(message) => {
            println!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let log_file = log_file.or_else(|| config.logging.file.as_deref().map(xdg::expand_tilde));
    if let Err(e) = logging::init(config.logging.level, log_file.as_deref()) {
        println!("Error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("Error: failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state_dir = persist::state_dir();
    let last_run = FileLastRunStore::new(&state_dir);
    let history = FileHistoryStore::in_dir(&state_dir);
    let mut credential_prompt = LinePrompt::terminal();
    let mut team_chooser = LinePrompt::terminal();

    let deps = Collaborators {
        connector: &HttpConnector,
        credential_prompt: &mut credential_prompt,
        team_chooser: &mut team_chooser,
        last_run: (!ignore_last_run_state).then_some(&last_run as &dyn LastRunStore),
        history: &history,
        theme_loader: &FileThemeLoader,
        timezone: Arc::new(SystemTimezone),
        state_dir: state_dir.clone(),
    };

    let mut snapshot = match bootstrap::initialize(&mut config, runtime.handle().clone(), deps) {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_user_abort() => {
            info!("startup cancelled by user");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Connected to {} as {}, in {}. Press Ctrl+C to exit.",
        snapshot.team.display_name, snapshot.me.username, snapshot.current_channel.display_name
    );
    runtime.block_on(drain_events(&mut snapshot));

    if let Err(e) = last_run.save(&snapshot.last_run_state()) {
        warn!(error = %e, "could not save last-run state");
    }
    if let Err(e) = history.save(&snapshot.history) {
        warn!(error = %e, "could not save input history");
    }

    // The blocking HTTP client must be dropped outside the runtime.
    drop(snapshot);
    runtime.shutdown_background();
    ExitCode::SUCCESS
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let mut config = ConfigLoader::load(path).map_err(|e| format!("Error: {e}"))?;
    ConfigLoader::resolve_password_command(&mut config).map_err(|e| format!("Error: {e}"))?;
    Ok(config)
}

/// Logs events until Ctrl+C or until every producer is gone.
async fn drain_events(snapshot: &mut ApplicationSnapshot) {
    let mut exits = snapshot.workers.supervisor.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted, shutting down");
                break;
            }
            Ok(exit) = exits.recv() => {
                warn!(worker = %exit.kind, reason = ?exit.reason, "background worker stopped");
            }
            event = snapshot.events.recv() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
        }
    }
}

fn log_event(event: &AppEvent) {
    match event {
        AppEvent::RefreshWebsocket => info!("realtime connection requested"),
        AppEvent::PresenceUpdated(statuses) => debug!(count = statuses.len(), "presence updated"),
        AppEvent::ExpireTypingIndicators { .. } => debug!("typing indicators expired"),
        AppEvent::TimezoneChanged(tz) => info!(timezone = %tz, "timezone changed"),
        AppEvent::SubprocessFailed {
            program,
            code,
            log_path,
        } => warn!(program = %program, code = ?code, log = %log_path, "external program failed"),
        AppEvent::SpellCheckResult(found) => debug!(misspelled = found.len(), "spell check"),
        AppEvent::AsyncError(message) => warn!(error = %message, "background request failed"),
        AppEvent::Notice(message) => info!("{message}"),
    }
}

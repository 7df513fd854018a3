//! purpose-dash - census and discharge reporting client
//!
//! Signs in against the backend's auth service with a magic link, reads
//! the census and discharge reporting views, and renders Markdown or JSON
//! reports with optional CSV export.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (configuration, sign-in failure, not signed in, export refused)

mod analysis;
mod backend;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod views;

use analysis::window::{self, Preset};
use anyhow::{Context, Result};
use backend::{AuthClient, RestClient, SessionStore};
use chrono::NaiveDate;
use cli::{Args, Command, OutputFormat, RangeArgs};
use config::{Config, CONFIG_FILE};
use error::BackendError;
use models::ProgramCategory;
use report::{Exportable, MarkdownReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use views::discharges::DischargeFilter;
use views::{View, ViewContext, ViewLoader};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Configuration decides the default verbosity, so it loads first
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("purpose-dash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", args.command);

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .purpose-dash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the backend URL, API key, view names and more.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the level when set.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set up logging: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}

/// Dispatch a subcommand. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let store = SessionStore::open(&config.auth.session_file);

    match &args.command {
        Command::Login { email, callback } => {
            handle_login(&config, &store, email.as_deref(), callback.as_deref()).await
        }
        Command::Logout => handle_logout(&config, &store).await,
        Command::Session => Ok(handle_session(&store)),
        Command::Open { path } => {
            let requested = View::from_path(path);
            open_view(&args, &config, &store, requested, ViewOptions::default()).await
        }
        Command::InitConfig => Ok(0), // handled before logging starts
        command => match ViewOptions::from_command(command) {
            Some((requested, options)) => {
                open_view(&args, &config, &store, requested, options).await
            }
            None => Ok(0),
        },
    }
}

async fn handle_login(
    config: &Config,
    store: &SessionStore,
    email: Option<&str>,
    callback: Option<&str>,
) -> Result<i32> {
    config.validate_backend()?;
    let auth = AuthClient::new(&config.backend, &config.auth)?;

    if let Some(callback) = callback {
        return match views::login::complete_sign_in(&auth, store, callback).await {
            Ok(session) => {
                println!(
                    "✅ Signed in{}",
                    session
                        .email
                        .as_deref()
                        .map(|e| format!(" as {}", e))
                        .unwrap_or_default()
                );
                println!("   Session saved to {}", store.path().display());
                Ok(0)
            }
            Err(e) => {
                eprintln!("{}", e);
                Ok(1)
            }
        };
    }

    let Some(email) = email else {
        anyhow::bail!("Pass --email to request a sign-in link or --callback to finish signing in");
    };

    match views::login::request_link(&auth, email).await {
        Ok(()) => {
            println!("📧 Check your email for the login link!");
            println!("   After following it, copy the address your browser opened and run:");
            println!("   purpose-dash login --callback '<URL>'");
            Ok(0)
        }
        Err(e) => {
            // Raw backend message, as the auth service wrote it
            eprintln!("{}", e);
            Ok(1)
        }
    }
}

async fn handle_logout(config: &Config, store: &SessionStore) -> Result<i32> {
    if store.current().is_none() {
        println!("Not signed in.");
        return Ok(0);
    }

    config.validate_backend()?;
    let auth = AuthClient::new(&config.backend, &config.auth)?;
    views::login::sign_out(&auth, store).await?;

    println!("👋 Signed out.");
    Ok(0)
}

fn handle_session(store: &SessionStore) -> i32 {
    let Some(session) = store.current() else {
        println!("🔒 {}", BackendError::NoSession);
        return 0;
    };

    let now = backend::auth::now_unix();
    println!("👤 Signed in as {}", session.email.as_deref().unwrap_or("(unknown user)"));
    if session.is_expired(now) {
        println!("   Access token expired; it is refreshed on the next report.");
    } else {
        println!("   Access token valid for {} more minutes.", session.remaining_secs(now) / 60);
    }
    println!("   Session file: {}", store.path().display());
    0
}

/// Filters and export settings for a report view.
#[derive(Debug, Clone)]
struct ViewOptions {
    date: Option<NaiveDate>,
    range: RangeArgs,
    programs: Vec<String>,
    page: usize,
    page_size: Option<usize>,
    export: Option<Option<PathBuf>>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            date: None,
            range: RangeArgs::default(),
            programs: Vec::new(),
            page: 1,
            page_size: None,
            export: None,
        }
    }
}

impl ViewOptions {
    fn from_command(command: &Command) -> Option<(View, Self)> {
        match command.clone() {
            Command::Daily { date, export } => Some((
                View::Daily,
                Self {
                    date,
                    export,
                    ..Self::default()
                },
            )),
            Command::Census { range, export } => Some((
                View::Census,
                Self {
                    range,
                    export,
                    ..Self::default()
                },
            )),
            Command::Discharges {
                range,
                programs,
                page,
                page_size,
                export,
            } => Some((
                View::Discharges,
                Self {
                    date: None,
                    range,
                    programs,
                    page,
                    page_size,
                    export,
                },
            )),
            _ => None,
        }
    }
}

/// Navigate to a view, redirecting on the session, and render it.
async fn open_view(
    args: &Args,
    config: &Config,
    store: &SessionStore,
    requested: View,
    options: ViewOptions,
) -> Result<i32> {
    config.validate_backend()?;
    let auth = AuthClient::new(&config.backend, &config.auth)?;

    let changes = store.subscribe();
    let session = store.refresh(&auth).await;
    if changes.has_changed().unwrap_or(false) {
        info!("Session changed while opening {}", requested);
    }
    let target = views::resolve(requested, session.is_some());
    if target != requested {
        info!("Redirecting {} -> {}", requested.path(), target.path());
    }

    let Some(session) = session else {
        eprintln!("🔒 {}.", BackendError::NoSession);
        eprintln!("   Sign in with: purpose-dash login --email you@example.com");
        return Ok(if requested == View::Login { 0 } else { 1 });
    };

    let rest = RestClient::new(&config.backend)?;
    let loader = ViewLoader::new();
    let ctx = ViewContext {
        config,
        rest: &rest,
        session: &session,
        loader: &loader,
        show_progress: !args.quiet,
    };

    let today = window::today();

    match target {
        View::Daily => {
            let date = options.date.unwrap_or_else(|| window::yesterday(today));
            let loaded = views::daily::load(&ctx, date).await;
            emit(args, &loaded.report)?;
            Ok(export(config, options.export, &loaded.rows))
        }
        View::Census => {
            let range = resolve_range(today, &options.range)?;
            let loaded = views::census::load(&ctx, range).await;
            emit(args, &loaded.report)?;
            Ok(export(config, options.export, &loaded.rows))
        }
        View::Discharges => {
            let filter = DischargeFilter {
                range: resolve_range(today, &options.range)?,
                programs: options
                    .programs
                    .iter()
                    .map(|p| ProgramCategory::from(p.as_str()))
                    .collect(),
                page: options.page,
                page_size: options.page_size.unwrap_or(config.report.page_size),
            };
            let loaded = views::discharges::load(&ctx, &filter).await;
            emit(args, &loaded.report)?;
            Ok(export(config, options.export, &loaded.rows))
        }
        // A session is present, so the router never lands here
        View::Login => Ok(0),
    }
}

fn resolve_range(today: NaiveDate, range: &RangeArgs) -> Result<models::DateRange> {
    let resolved = window::resolve_range(today, range.preset, range.start, range.end);
    if !resolved.is_ordered() {
        anyhow::bail!(
            "Start date {} is after end date {}{}",
            resolved.start,
            resolved.end,
            match range.preset {
                Some(Preset::MonthToDate) => " (month-to-date)",
                Some(Preset::Last7Days) => " (last-7-days)",
                None => "",
            }
        );
    }
    Ok(resolved)
}

/// Render a report to stdout or the --output file.
fn emit<R: MarkdownReport + Serialize>(args: &Args, report: &R) -> Result<()> {
    let content = match args.format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Markdown => report.to_markdown(),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("✅ Report saved to: {}", path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

/// Export rows when --export was given. Returns the exit code.
fn export<T: Exportable>(config: &Config, target: Option<Option<PathBuf>>, rows: &[T]) -> i32 {
    let Some(target) = target else {
        return 0;
    };
    let path = target.unwrap_or_else(|| config.report.export_file.clone());

    match report::write_csv(rows, &path) {
        Ok(count) => {
            eprintln!("📁 Exported {} rows to {}", count, path.display());
            0
        }
        Err(e) => {
            eprintln!("⚠️  {:#}", e);
            1
        }
    }
}

//! Surveyboard - survey intake with live result dashboards
//!
//! A CLI tool that collects short survey responses into a document store
//! and renders the aggregate results, live or once.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (invalid input, sign-in refused, store or config failure, etc.)

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use surveyboard::analysis::compute_stats_with_precision;
use surveyboard::auth::{AuthGate, IdentityToolkitClient};
use surveyboard::cli::{Args, Command, LoginArgs, OutputFormat};
use surveyboard::config::{Config, CONFIG_FILE};
use surveyboard::feed::LiveStats;
use surveyboard::models::{AggregateStats, CategorySet, ResponseRecord};
use surveyboard::report;
use surveyboard::store::{DocumentStore, FileStore, SnapshotOrder};
use surveyboard::submission::{self, SubmissionForm};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Clears the terminal before each live re-render.
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

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

    // Initialize logging
    init_logging(&args);

    info!("Surveyboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .surveyboard.toml.
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
    println!("   Edit it to set the categories, data directory and identity API key.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Everything a command needs after configuration is resolved.
struct App {
    config: Config,
    categories: CategorySet,
    store: FileStore,
    format: OutputFormat,
    quiet: bool,
}

/// Resolve configuration and dispatch the subcommand.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let categories = config
        .category_set()
        .context("Invalid [survey] categories in configuration")?;
    let store = FileStore::new(config.store.data_dir.clone())
        .with_poll_interval(config.store.poll_interval());

    info!(
        "Using collection '{}' in {}",
        config.survey.collection,
        config.store.data_dir.display()
    );

    let app = App {
        config,
        categories,
        store,
        format: args.format,
        quiet: args.quiet,
    };

    match args.command {
        Command::Submit {
            name,
            group,
            contact,
            category,
        } => {
            let form = SubmissionForm {
                display_name: name,
                group,
                contact,
                category,
            };
            handle_submit(&app, form).await
        }
        Command::Results { watch } => handle_results(&app, watch).await,
        Command::Dashboard {
            login,
            search,
            watch,
        } => handle_dashboard(&app, &login, &search, watch).await,
        Command::Export { login, output } => handle_export(&app, &login, output).await,
        Command::InitConfig => handle_init_config(),
    }
}

/// Validate and store one response, then show the public results.
async fn handle_submit(app: &App, form: SubmissionForm) -> Result<()> {
    let collection = &app.config.survey.collection;

    let id = submission::submit(&app.store, collection, &form, &app.categories)
        .await
        .map_err(|e| {
            if e.is_retryable() {
                anyhow!("{}. Please try again.", e)
            } else {
                anyhow::Error::new(e)
            }
        })?;

    let snapshot = app
        .store
        .snapshot(collection, SnapshotOrder::Unordered)
        .await?;
    let decimals = app.config.report.public_decimals;
    let stats = compute_stats_with_precision(&snapshot.records, &app.categories, decimals);

    match app.format {
        OutputFormat::Json => {
            let value = json!({ "id": id, "stats": stats });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("{}", report::render_confirmation());
            println!("{}", report::render_public_view(&stats, decimals));
        }
    }

    Ok(())
}

/// Public results, once or live.
async fn handle_results(app: &App, watch: bool) -> Result<()> {
    let collection = &app.config.survey.collection;
    let decimals = app.config.report.public_decimals;

    if !watch {
        let snapshot = app
            .store
            .snapshot(collection, SnapshotOrder::Unordered)
            .await?;
        let stats = compute_stats_with_precision(&snapshot.records, &app.categories, decimals);
        return print_public(&stats, decimals, app.format, false);
    }

    let subscription = app
        .store
        .subscribe(collection, SnapshotOrder::Unordered)
        .await?;
    let mut live = LiveStats::new(app.categories.clone(), decimals);

    tokio::select! {
        processed = live.drive(subscription.into_stream(), |_, stats| {
            if let Err(e) = print_public(stats, decimals, app.format, true) {
                warn!("Failed to render results: {}", e);
            }
        }) => {
            info!("Response feed closed after {} updates", processed);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping live results");
        }
    }

    Ok(())
}

/// Detail dashboard behind the administrator sign-in.
async fn handle_dashboard(
    app: &App,
    login: &LoginArgs,
    search: &str,
    watch: bool,
) -> Result<()> {
    let gate = sign_in_admin(app, login).await?;
    let collection = &app.config.survey.collection;
    let decimals = app.config.report.admin_decimals;

    if !watch {
        let snapshot = app
            .store
            .snapshot(collection, SnapshotOrder::NewestFirst)
            .await?;
        let stats = compute_stats_with_precision(&snapshot.records, &app.categories, decimals);
        print_admin(&snapshot.records, &stats, search, decimals, app.format, false)?;
        gate.sign_out();
        return Ok(());
    }

    let subscription = app
        .store
        .subscribe(collection, SnapshotOrder::NewestFirst)
        .await?;
    let mut live = LiveStats::new(app.categories.clone(), decimals);

    tokio::select! {
        processed = live.drive(subscription.into_stream(), |snapshot, stats| {
            let rendered =
                print_admin(&snapshot.records, stats, search, decimals, app.format, true);
            if let Err(e) = rendered {
                warn!("Failed to render dashboard: {}", e);
            }
        }) => {
            info!("Response feed closed after {} updates", processed);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping live dashboard");
        }
    }

    gate.sign_out();
    Ok(())
}

/// CSV export behind the administrator sign-in.
async fn handle_export(app: &App, login: &LoginArgs, output: Option<PathBuf>) -> Result<()> {
    let gate = sign_in_admin(app, login).await?;

    let snapshot = app
        .store
        .snapshot(&app.config.survey.collection, SnapshotOrder::NewestFirst)
        .await?;
    let path = output.unwrap_or_else(|| app.config.report.csv_file.clone());

    report::write_csv(&snapshot.records, &path)?;
    info!("Exported {} responses to {}", snapshot.len(), path.display());

    match app.format {
        OutputFormat::Json => {
            let value = json!({ "exported": snapshot.len(), "path": path });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!(
                "✅ Exported {} responses to {}",
                snapshot.len(),
                path.display()
            );
        }
    }

    gate.sign_out();
    Ok(())
}

/// Sign in through the identity provider, showing a spinner meanwhile.
async fn sign_in_admin(
    app: &App,
    login: &LoginArgs,
) -> Result<AuthGate<IdentityToolkitClient>> {
    let auth = &app.config.auth;
    if auth.api_key.trim().is_empty() {
        bail!("No identity API key configured. Set [auth] api_key or pass --api-key.");
    }

    let client = IdentityToolkitClient::new(
        auth.endpoint.clone(),
        auth.api_key.clone(),
        Duration::from_secs(auth.timeout_seconds),
    )
    .context("Failed to create identity client")?;
    let gate = AuthGate::new(client);

    let spinner = if app.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Signing in...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let result = gate.sign_in(&login.email, &login.password).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let session = result.map_err(|e| anyhow!("{}", e.user_message()))?;
    gate.require_admin()
        .map_err(|e| anyhow!("{}", e.user_message()))?;

    if !app.quiet {
        eprintln!(
            "🔓 Signed in as {}",
            session.email.as_deref().unwrap_or(&session.user_id)
        );
    }

    Ok(gate)
}

fn print_public(
    stats: &AggregateStats,
    decimals: u32,
    format: OutputFormat,
    live: bool,
) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_stats_json(stats)?,
        OutputFormat::Text => report::render_public_view(stats, decimals),
    };

    if live && format == OutputFormat::Text {
        print!("{}", CLEAR_SCREEN);
    }
    println!("{}", output);
    Ok(())
}

fn print_admin(
    records: &[ResponseRecord],
    stats: &AggregateStats,
    search: &str,
    decimals: u32,
    format: OutputFormat,
    live: bool,
) -> Result<()> {
    let output = match format {
        OutputFormat::Json => report::generate_admin_json(records, stats, search)?,
        OutputFormat::Text => report::render_admin_view(records, stats, search, decimals),
    };

    if live && format == OutputFormat::Text {
        print!("{}", CLEAR_SCREEN);
    }
    println!("{}", output);
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::json;

use license_dash::config::{Config, ENV_API_BASE, ENV_EXPORT_DIR, ENV_STATE_DIR, ENV_TIMEOUT};
use license_dash::dashboard::Dashboard;
use license_dash::dates::default_range_now;
use license_dash::models::LicenseFilters;
use license_dash::repl::{parse_command, Input, HELP_TEXT};
use license_dash::shell::{BannerKind, Event, View};
use license_dash::storage::SessionStore;
use license_dash::table;
use license_dash::telemetry::{self, LogFormat};

const NOT_LOGGED_IN: &str = "Not logged in. Run `license-dash login` first.";

#[derive(Parser)]
#[command(name = "license-dash", version)]
#[command(about = "Browse, ingest and export license grants from the license API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL.
    #[arg(long, env = ENV_API_BASE, global = true)]
    api_base: Option<String>,

    /// Directory holding the persisted session.
    #[arg(long, env = ENV_STATE_DIR, global = true)]
    state_dir: Option<PathBuf>,

    /// Directory exports are written to.
    #[arg(long, env = ENV_EXPORT_DIR, global = true)]
    export_dir: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, env = ENV_TIMEOUT, global = true)]
    timeout: Option<u64>,

    /// Output format of one-shot commands.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[arg(long, value_enum, env = "LICENSE_DASH_LOG_FORMAT", default_value_t, global = true)]
    log_format: LogFormat,

    /// Write logs to daily files in this directory instead of stderr.
    #[arg(long, env = "LICENSE_DASH_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "LICENSE_DASH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show who is signed in and until when.
    Status,
    /// Search license grants.
    Search(FilterArgs),
    /// Export every matching grant to a CSV file.
    Export(FilterArgs),
    /// Pull new licenses from the source system.
    Ingest,
    /// List customer names.
    Customers,
    /// List product titles, optionally for one customer.
    Products {
        #[arg(short, long)]
        customer: Option<String>,
    },
    /// Interactive dashboard.
    Dashboard,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Start date (YYYY-MM-DD). Defaults to 30 days ago; pass "" for no bound.
    #[arg(long)]
    from: Option<String>,
    /// End date (YYYY-MM-DD). Defaults to today; pass "" for no bound.
    #[arg(long)]
    to: Option<String>,
    #[arg(short, long)]
    customer: Option<String>,
    #[arg(short, long)]
    product: Option<String>,
    #[arg(long)]
    page: Option<u32>,
}

impl FilterArgs {
    fn into_filters(self) -> LicenseFilters {
        let range = default_range_now();
        LicenseFilters {
            date_from: Some(self.from.unwrap_or_else(|| range.from_param())),
            date_to: Some(self.to.unwrap_or_else(|| range.to_param())),
            customer_name: self.customer,
            product_title: self.product,
            page: self.page,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        if let Some(dir) = &self.export_dir {
            config.export_dir = dir.clone();
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let _guard = telemetry::init(cli.log_format, cli.log_dir.as_deref());
    let config = cli.config();

    let store = match SessionStore::open(config.state_dir.join("session")) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Cannot open session store in {}: {}", config.state_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = match Dashboard::open(&config, store) {
        Ok(dashboard) => run(&config, dashboard, cli.command, cli.format).await,
        Err(e) => Err(e.to_string()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            match cli.format {
                OutputFormat::Text => eprintln!("ERROR: {}", message),
                OutputFormat::Json => println!("{}", json!({ "ok": false, "error": message })),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, mut dashboard: Dashboard, command: Commands, format: OutputFormat) -> Result<(), String> {
    let logged_in = dashboard.state().view == View::Data;

    match command {
        Commands::Dashboard => return interactive(config, dashboard).await,
        Commands::Login { username, password } => {
            if logged_in {
                dashboard.dispatch(Event::LogoutRequested).await;
            }
            dashboard.dispatch(Event::LoginSubmitted { username, password }).await;
            outcome(&dashboard)?;
            let state = dashboard.state();
            let session = state.session.session().ok_or(NOT_LOGGED_IN)?;
            match format {
                OutputFormat::Text => println!("Logged in as {} until {}", session.username, session.expires_at),
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "ok": true, "username": session.username, "expiresAt": session.expires_at })
                ),
            }
        }
        Commands::Logout => {
            if logged_in {
                dashboard.dispatch(Event::LogoutRequested).await;
            }
            print_message(format, "Logged out.");
        }
        Commands::Status => {
            let session = dashboard.state().session.session();
            match (format, session) {
                (OutputFormat::Text, Some(s)) => {
                    println!("Signed in as {} until {} ({})", s.username, s.expires_at, dashboard.client().base_url())
                }
                (OutputFormat::Text, None) => println!("Not logged in ({})", dashboard.client().base_url()),
                (OutputFormat::Json, session) => println!(
                    "{}",
                    json!({
                        "ok": true,
                        "apiBase": dashboard.client().base_url(),
                        "username": session.map(|s| &s.username),
                        "expiresAt": session.map(|s| s.expires_at),
                    })
                ),
            }
        }
        _ if !logged_in => return Err(NOT_LOGGED_IN.to_string()),
        Commands::Search(args) => {
            dashboard.dispatch(Event::FiltersApplied(args.into_filters())).await;
            dashboard.dispatch(Event::SearchRequested).await;
            outcome(&dashboard)?;
            let state = dashboard.state();
            match format {
                OutputFormat::Text => {
                    println!("{}", table::render(&table::license_columns(), &state.rows));
                    println!("Showing {} of {} licenses", state.rows.len(), state.total);
                }
                OutputFormat::Json => {
                    println!("{}", json!({ "ok": true, "license": state.rows, "total": state.total }))
                }
            }
        }
        Commands::Export(args) => {
            dashboard.dispatch(Event::FiltersApplied(args.into_filters())).await;
            dashboard.dispatch(Event::ExportRequested).await;
            outcome(&dashboard)?;
            print_banner(&dashboard, format);
        }
        Commands::Ingest => {
            dashboard.dispatch(Event::IngestRequested).await;
            outcome(&dashboard)?;
            match format {
                OutputFormat::Text => print_banner(&dashboard, format),
                OutputFormat::Json => {
                    println!("{}", json!({ "ok": true, "report": dashboard.state().last_ingest }))
                }
            }
        }
        Commands::Customers => {
            dashboard.dispatch(Event::CustomersRequested).await;
            outcome(&dashboard)?;
            print_names(format, "customers", &dashboard.state().customers);
        }
        Commands::Products { customer } => {
            dashboard.dispatch(Event::CustomerSelected(customer)).await;
            outcome(&dashboard)?;
            print_names(format, "products", &dashboard.state().products);
        }
    }
    Ok(())
}

/// Error message if the last dispatch failed or ended the session.
fn outcome(dashboard: &Dashboard) -> Result<(), String> {
    let state = dashboard.state();
    match &state.banner {
        Some(banner) if banner.kind == BannerKind::Error => Err(banner.message.clone()),
        Some(banner) if state.view == View::Login => Err(banner.message.clone()),
        _ if state.view == View::Login => Err(NOT_LOGGED_IN.to_string()),
        _ => Ok(()),
    }
}

fn print_banner(dashboard: &Dashboard, format: OutputFormat) {
    let message = dashboard
        .state()
        .banner
        .as_ref()
        .map(|b| b.message.as_str())
        .unwrap_or_default();
    print_message(format, message);
}

fn print_message(format: OutputFormat, message: &str) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => println!("{}", json!({ "ok": true, "message": message })),
    }
}

fn print_names(format: OutputFormat, key: &str, names: &[String]) {
    match format {
        OutputFormat::Text => names.iter().for_each(|n| println!("{}", n)),
        OutputFormat::Json => println!("{}", json!({ "ok": true, key: names })),
    }
}

async fn interactive(config: &Config, mut dashboard: Dashboard) -> Result<(), String> {
    println!(
        "license-dash ({}) on {}. Type \"help\" for help. Use Ctrl-D to exit.",
        env!("CARGO_PKG_VERSION"),
        config.api_base()
    );
    dashboard.resume().await;
    let mut rl = DefaultEditor::new().map_err(|e| format!("Failed to create line editor: {}", e))?;
    println!("{}", dashboard.render());

    loop {
        let prompt = match dashboard.state().username() {
            Some(username) => format!("{}> ", username),
            None => "login> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let parsed = parse_command(&line);
                // Keep passwords out of the history.
                if !matches!(parsed, Ok(None) | Ok(Some(Input::Event(Event::LoginSubmitted { .. })))) {
                    let _ = rl.add_history_entry(line.trim());
                }
                match parsed {
                    Ok(None) => {}
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(Input::Help)) => println!("{}", HELP_TEXT),
                    Ok(Some(Input::Show)) => println!("{}", dashboard.render()),
                    Ok(Some(Input::Event(event))) => {
                        dashboard.dispatch(event).await;
                        println!("{}", dashboard.render());
                    }
                    Err(message) => println!("{}", message),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(format!("Failed to read input: {}", e)),
        }
    }
    Ok(())
}

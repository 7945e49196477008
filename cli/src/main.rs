use std::path::PathBuf;
use std::sync::Arc;

use campscout::api::HEALTH_PATH;
use campscout::{
    AlertUpdate, ApiRequest, AuthFailure, AuthorizedClient, AvailabilityQuery, CampScoutApi, FileTokenStore,
    HttpTransport, Method, NewAlert, RegisterProfile, ReqwestTransport, SearchRequest, SessionConfig, SessionError,
    SessionManager, User,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Auth(#[from] AuthFailure),
    #[error("not logged in")]
    NotLoggedIn,
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("nothing to update")]
    NothingToUpdate,
}

#[derive(Parser, Debug)]
#[command(name = "campscout-cli", about = "CampScout session and API CLI")]
struct Cli {
    #[arg(long, env = "CAMPSCOUT_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "CAMPSCOUT_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check `GET /api/health`.
    Ping,
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAMPSCOUT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAMPSCOUT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Exchange a Google ID token for a CampScout session.
    Google {
        credential: String,
    },
    Logout,
    /// Validate the persisted session and print the user.
    Whoami,
    /// Print the persisted access token.
    Token,
    Refresh,
    /// Authorized call; a 401 refreshes the token and retries once.
    Api {
        method: String,
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Search campgrounds by location or recreation area.
    Search {
        location: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long, default_value_t = 1)]
        nights: u32,
        #[arg(long, default_value_t = false)]
        weekend_only: bool,
        #[arg(long, default_value_t = campscout::models::DEFAULT_SEARCH_LIMIT)]
        limit: u32,
        #[arg(long = "rec-area")]
        rec_area_id: Vec<String>,
    },
    Availability {
        campground_id: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
        #[arg(long, default_value_t = 1)]
        nights: u32,
    },
    Alerts(AlertsCommand),
    /// Public service statistics.
    Stats,
}

#[derive(Args, Debug)]
struct AlertsCommand {
    #[command(subcommand)]
    command: AlertsSubcommand,
}

#[derive(Subcommand, Debug)]
enum AlertsSubcommand {
    List,
    Create {
        campground_id: String,
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
        #[arg(long, default_value = campscout::models::DEFAULT_SITE_TYPE)]
        site_type: String,
        #[arg(long, default_value_t = 1)]
        party_size: u32,
    },
    Update {
        alert_id: String,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long)]
        site_type: Option<String>,
        #[arg(long)]
        party_size: Option<u32>,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        alert_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.api_url, config.timeouts)?);
    let store = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let session = Arc::new(SessionManager::new(transport, store));

    match cli.command {
        Command::Ping => run_ping(&session).await,
        Command::Register { first_name, last_name, email, password } => {
            let profile = RegisterProfile { first_name, last_name, email, password };
            let user = session.register(&profile).await?;
            print_user(&user)
        }
        Command::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            print_user(&user)
        }
        Command::Google { credential } => {
            let user = session.google_auth(&credential).await?;
            print_user(&user)
        }
        Command::Logout => {
            session.logout();
            eprintln!("logged out");
            Ok(())
        }
        Command::Whoami => run_whoami(&session).await,
        Command::Token => {
            let token = session.get_auth_token().ok_or(CliError::NotLoggedIn)?;
            println!("{token}");
            Ok(())
        }
        Command::Refresh => {
            session.refresh().await?;
            match session.current_user() {
                Some(user) => print_user(&user),
                None => {
                    eprintln!("access token refreshed");
                    Ok(())
                }
            }
        }
        Command::Api { method, path, data } => run_api(session, &method, &path, data.as_deref()).await,
        Command::Search { location, start_date, end_date, nights, weekend_only, limit, rec_area_id } => {
            let request = SearchRequest {
                location,
                start_date,
                end_date,
                nights,
                weekend_only,
                limit,
                rec_area_id,
                ..SearchRequest::default()
            };
            print_json(&typed_api(session).search(&request).await?)
        }
        Command::Availability { campground_id, start_date, end_date, nights } => {
            let query = AvailabilityQuery::new(start_date, end_date, nights);
            print_json(&typed_api(session).availability(&campground_id, &query).await?)
        }
        Command::Alerts(alerts) => run_alerts(&typed_api(session), alerts.command).await,
        Command::Stats => print_json(&typed_api(session).dashboard_stats().await?),
    }
}

fn typed_api(session: Arc<SessionManager>) -> CampScoutApi {
    CampScoutApi::new(AuthorizedClient::new(session))
}

fn load_config(cli: &Cli) -> Result<SessionConfig, CliError> {
    let mut config = SessionConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(path) = &cli.token_file {
        config.token_file.clone_from(path);
    }
    tracing::debug!(api_url = %config.api_url, token_file = %config.token_file.display(), "config loaded");
    Ok(config)
}

async fn run_ping(session: &SessionManager) -> Result<(), CliError> {
    let response = session.transport().send(ApiRequest::get(HEALTH_PATH)).await?;
    if !response.is_success() {
        return Err(CliError::Unhealthy(response.status));
    }
    println!("ok");
    Ok(())
}

async fn run_whoami(session: &SessionManager) -> Result<(), CliError> {
    session.initialize().await;
    let user = session.current_user().ok_or(CliError::NotLoggedIn)?;
    print_user(&user)
}

async fn run_api(session: Arc<SessionManager>, method: &str, path: &str, data: Option<&str>) -> Result<(), CliError> {
    let method = parse_method(method)?;
    let body = data.map(serde_json::from_str::<Value>).transpose()?;
    let json = AuthorizedClient::new(session).call_retrying(method, path, body).await?;
    print_json(&json)
}

async fn run_alerts(api: &CampScoutApi, command: AlertsSubcommand) -> Result<(), CliError> {
    match command {
        AlertsSubcommand::List => print_json(&api.list_alerts().await?),
        AlertsSubcommand::Create { campground_id, start_date, end_date, site_type, party_size } => {
            let alert = NewAlert { site_type, party_size, ..NewAlert::new(start_date, end_date) };
            print_json(&api.create_alert(&campground_id, &alert).await?)
        }
        AlertsSubcommand::Update { alert_id, start_date, end_date, site_type, party_size, active } => {
            let update = AlertUpdate { start_date, end_date, site_type, party_size, is_active: active };
            if update.is_empty() {
                return Err(CliError::NothingToUpdate);
            }
            print_json(&api.update_alert(&alert_id, &update).await?)
        }
        AlertsSubcommand::Delete { alert_id } => {
            api.delete_alert(&alert_id).await?;
            eprintln!("alert {alert_id} deleted");
            Ok(())
        }
    }
}

fn parse_method(raw: &str) -> Result<Method, CliError> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|_| CliError::InvalidMethod(raw.to_owned()))
}

fn print_user(user: &User) -> Result<(), CliError> {
    print_json(user)
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

use anyhow::{bail, Context, Result};
use auth_session::auth::{AuthTransport, RegisterCredentials};
use auth_session::{AppState, Settings};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn cli() -> Command {
    Command::new("auth-session")
        .about("Sign in, sign out and manage tokens against a remote auth API")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Auth API base URL, example: http://localhost:3001/api")
                .env("AUTH_SESSION_BASE_URL")
                .global(true),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("password").long("password").env("AUTH_SESSION_PASSWORD").required(true))
                .arg(
                    Arg::new("remember")
                        .long("remember")
                        .help("Keep tokens in durable storage")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out and forget stored tokens"))
        .subcommand(Command::new("refresh").about("Exchange the refresh token for a new access token"))
        .subcommand(Command::new("whoami").about("Restore the stored session and print the auth state"))
        .subcommand(
            Command::new("register")
                .about("Create a new account")
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("username").long("username").required(true))
                .arg(Arg::new("first-name").long("first-name").required(true))
                .arg(Arg::new("last-name").long("last-name").required(true))
                .arg(Arg::new("password").long("password").required(true))
                .arg(Arg::new("password-confirm").long("password-confirm").required(true)),
        )
        .subcommand(
            Command::new("check-email")
                .about("Check whether an email address is still available")
                .arg(Arg::new("email").required(true)),
        )
        .subcommand(
            Command::new("check-username")
                .about("Check whether a username is still available")
                .arg(Arg::new("username").required(true)),
        )
}

fn arg(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

fn print_state(state: &AppState) -> Result<()> {
    let json = serde_json::to_string_pretty(&state.session.state()).context("Failed to serialize auth state")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let matches = cli().get_matches();

    // Load configuration
    let mut config = Settings::new().context("Failed to load configuration")?;
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.api.base_url = base_url.clone();
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Using auth API at {}", config.api.base_url);

    let state = AppState::new(config).context("Failed to initialize auth session")?;

    match matches.subcommand() {
        Some(("login", sub)) => {
            let email = arg(sub, "email");
            let remember = sub.get_flag("remember");
            if !state.session.login(&email, &arg(sub, "password"), remember).await {
                let message = state.session.state().error.map(|e| e.message).unwrap_or_default();
                bail!("Login failed: {}", message);
            }
            if !remember {
                info!("Tokens were kept in session storage and end with this process");
            }
            print_state(&state)?;
        }
        Some(("logout", _)) => {
            state.session.logout().await;
            print_state(&state)?;
        }
        Some(("refresh", _)) => match state.transport.refresh_token().await {
            Some(_) => println!("Access token refreshed"),
            None => bail!("No valid refresh token, sign in again"),
        },
        Some(("whoami", _)) => {
            state.session.restore().await;
            print_state(&state)?;
        }
        Some(("register", sub)) => {
            let credentials = RegisterCredentials {
                email: arg(sub, "email"),
                username: arg(sub, "username"),
                first_name: arg(sub, "first-name"),
                last_name: arg(sub, "last-name"),
                password: arg(sub, "password"),
                password_confirm: arg(sub, "password-confirm"),
            };
            credentials.validate()?;
            let created = state.transport.register(&credentials).await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        Some(("check-email", sub)) => {
            let available = state.transport.check_email_availability(&arg(sub, "email")).await;
            println!("{}", if available { "available" } else { "taken" });
        }
        Some(("check-username", sub)) => {
            let available = state.transport.check_username_availability(&arg(sub, "username")).await;
            println!("{}", if available { "available" } else { "taken" });
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use member_session::config::ConfigError;
use member_session::net::api::build_http_client;
use member_session::{
    AuthError, AuthStore, Credentials, FileStorage, HttpAuthApi, MemberApi, MemberError, PasswordChange,
    ProfileUpdate, Session, SessionConfig, StoreError,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

type Store = AuthStore<FileStorage, HttpAuthApi>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Member(#[from] MemberError),
    #[error("not logged in; run `member-cli login` first")]
    NotLoggedIn,
    #[error("stored session is unreadable ({0}); run `member-cli logout` to reset it")]
    CorruptSession(String),
    #[error("write {path}: {message}")]
    Output { path: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "member-cli", about = "Member login session CLI")]
struct Cli {
    /// Backend origin (overrides `MEMBER_BASE_URL`).
    #[arg(long, env = "MEMBER_BASE_URL")]
    base_url: Option<String>,

    /// Session storage file (overrides `MEMBER_STORAGE_PATH`).
    #[arg(long, env = "MEMBER_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "MEMBER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the session and wipe session storage.
    Logout,
    /// Show the current session (never the token).
    Whoami,
    /// Print the bearer token, empty when logged out.
    Token,
    /// Update email (and optionally the avatar image) on the server, then locally.
    Profile {
        #[arg(long)]
        email: String,
        /// Current password, required by the server to confirm the change.
        #[arg(long, env = "MEMBER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Change the account password.
    Password {
        #[arg(long, env = "MEMBER_OLD_PASSWORD", hide_env_values = true)]
        old: String,
        #[arg(long, env = "MEMBER_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },
    /// Sign up a new member. Does not log in.
    Join {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEMBER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Print the avatar URL with its cache-buster.
    AvatarUrl,
    /// Download the current avatar image.
    AvatarFetch {
        #[arg(long)]
        output: PathBuf,
    },
    /// Check whether a username is already taken.
    CheckUsername { username: String },
}

impl Command {
    fn tolerates_corrupt_storage(&self) -> bool {
        matches!(self, Self::Logout | Self::Join { .. } | Self::CheckUsername { .. })
    }
}

struct AppContext {
    config: SessionConfig,
    store: Store,
    member: MemberApi,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(cli.base_url.as_deref(), cli.storage_path)?;
    let ctx = build_context(config, cli.command.tolerates_corrupt_storage())?;

    match cli.command {
        Command::Login { username, password } => run_login(&ctx, username, password).await,
        Command::Logout => {
            ctx.store.logout()?;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => print_json(&session_view(&ctx.store.snapshot(), &ctx.config.avatar_base)),
        Command::Token => {
            println!("{}", ctx.store.token());
            Ok(())
        }
        Command::Profile { email, password, avatar } => run_profile(&ctx, email, password, avatar).await,
        Command::Password { old, new } => {
            require_login(&ctx.store)?;
            let change = PasswordChange { username: ctx.store.username(), old_password: old, new_password: new };
            ctx.member.change_password(&ctx.store.token(), &change).await?;
            println!("password changed");
            Ok(())
        }
        Command::AvatarUrl => {
            if let Some(url) = ctx.store.snapshot().avatar_url(&ctx.config.absolute_avatar_base()) {
                println!("{url}");
            }
            Ok(())
        }
        Command::AvatarFetch { output } => run_avatar_fetch(&ctx, output).await,
        Command::Join { username, email, password, avatar } => {
            let profile = ctx.member.join(&username, &password, &email, avatar.as_deref()).await?;
            tracing::info!(username = %profile.username, "joined");
            print_json(&serde_json::to_value(&profile)?)
        }
        Command::CheckUsername { username } => {
            let taken = ctx.member.check_username(&username).await?;
            println!("{}", if taken { "taken" } else { "available" });
            Ok(())
        }
    }
}

fn resolve_config(base_url: Option<&str>, storage_path: Option<PathBuf>) -> Result<SessionConfig, CliError> {
    let mut config = SessionConfig::from_env()?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(path) = storage_path {
        config = config.with_storage_path(path);
    }
    Ok(config)
}

fn build_context(config: SessionConfig, tolerate_corrupt: bool) -> Result<AppContext, CliError> {
    let http = build_http_client(config.timeouts).map_err(AuthError::HttpClientBuild)?;
    let auth = HttpAuthApi::with_client(http.clone(), &config);
    let member = MemberApi::with_client(http, &config);
    let store = AuthStore::empty(FileStorage::new(&config.storage_path), auth, config.avatar_base.clone());

    match store.load() {
        Ok(_) => {}
        Err(StoreError::CorruptSession(e)) if tolerate_corrupt => {
            tracing::warn!(error = %e, "ignoring unreadable stored session");
        }
        Err(StoreError::CorruptSession(e)) => return Err(CliError::CorruptSession(e.to_string())),
        Err(e) => return Err(e.into()),
    }

    Ok(AppContext { config, store, member })
}

async fn run_login(ctx: &AppContext, username: String, password: String) -> Result<(), CliError> {
    ctx.store.login(&Credentials { username, password }).await?;
    println!("logged in as {}", ctx.store.username());
    Ok(())
}

async fn run_profile(
    ctx: &AppContext,
    email: String,
    password: String,
    avatar: Option<PathBuf>,
) -> Result<(), CliError> {
    require_login(&ctx.store)?;
    let profile = ctx
        .member
        .update_profile(&ctx.store.token(), &ctx.store.username(), &password, &email, avatar.as_deref())
        .await?;

    let confirmed = if profile.email.is_empty() { email } else { profile.email };
    ctx.store.change_profile(&ProfileUpdate { email: confirmed })?;
    if avatar.is_some() {
        ctx.store.update_avatar()?;
    }
    print_json(&session_view(&ctx.store.snapshot(), &ctx.config.avatar_base))
}

async fn run_avatar_fetch(ctx: &AppContext, output: PathBuf) -> Result<(), CliError> {
    let url = ctx
        .store
        .snapshot()
        .avatar_url(&ctx.config.absolute_avatar_base())
        .ok_or(CliError::NotLoggedIn)?;
    let bytes = ctx.member.fetch_avatar(&url).await?;
    tokio::fs::write(&output, &bytes).await.map_err(|e| CliError::Output {
        path: output.display().to_string(),
        message: e.to_string(),
    })?;
    eprintln!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

fn require_login(store: &Store) -> Result<(), CliError> {
    if store.is_login() { Ok(()) } else { Err(CliError::NotLoggedIn) }
}

fn session_view(session: &Session, avatar_base: &str) -> Value {
    json!({
        "isLogin": session.is_login(),
        "username": session.username(),
        "email": session.email(),
        "roles": session.roles(),
        "avatarUrl": session.avatar_url(avatar_base),
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

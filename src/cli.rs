//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::error;

use crate::config::{AuthConfig, DEFAULT_COOKIE_NAME, DEFAULT_COOKIE_PATH};

const MIN_SECRET_LENGTH: usize = 32;

const GENERATED_SECRET_BYTES: usize = 48;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "jot", about = "Issue and verify JWT access and refresh tokens")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Token issuer. Also the default audience and cookie domain
    #[arg(long, env = "JOT_ISSUER", default_value = "localhost", global = true)]
    pub issuer: String,

    /// Token audience (defaults to the issuer)
    #[arg(long, env = "JOT_AUDIENCE", global = true)]
    pub audience: Option<String>,

    /// Refresh cookie domain (defaults to the issuer)
    #[arg(long, env = "JOT_COOKIE_DOMAIN", global = true)]
    pub cookie_domain: Option<String>,

    /// Refresh cookie path
    #[arg(long, env = "JOT_COOKIE_PATH", default_value = DEFAULT_COOKIE_PATH, global = true)]
    pub cookie_path: String,

    /// Refresh cookie name
    #[arg(long, env = "JOT_COOKIE_NAME", default_value = DEFAULT_COOKIE_NAME, global = true)]
    pub cookie_name: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "JOT_ACCESS_TTL", default_value_t = 15 * 60, global = true)]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "JOT_REFRESH_TTL", default_value_t = 24 * 60 * 60, global = true)]
    pub refresh_ttl: u64,

    /// Path to file containing the signing secret. Prefer using JOT_SECRET env var instead
    #[arg(long, global = true)]
    pub secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty", global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Issue an access/refresh token pair and print it with its refresh cookie
    Issue {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Verify an access token and print its claims
    Verify { token: String },
    /// Print the Set-Cookie value that deletes the refresh cookie
    LogoutCookie,
    /// Print a random secret suitable for JOT_SECRET
    GenerateSecret,
}

impl Command {
    /// Whether the command signs or verifies tokens.
    pub fn needs_secret(&self) -> bool {
        matches!(self, Command::Issue { .. } | Command::Verify { .. })
    }
}

/// Initialize logging based on the specified format.
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Load the signing secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JOT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JOT_SECRET") };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "Signing secret is required. Set JOT_SECRET environment variable (recommended) or use --secret-file"
        );
        return None;
    };

    check_secret(secret)
}

fn check_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "Signing secret is shorter than {} characters. Use a longer secret",
            MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build the token configuration from validated arguments.
pub fn build_config(args: &Args, secret: Option<String>) -> AuthConfig {
    let defaults = AuthConfig::new(&args.issuer);

    AuthConfig {
        audience: args.audience.clone().unwrap_or(defaults.audience.clone()),
        cookie_domain: args
            .cookie_domain
            .clone()
            .unwrap_or(defaults.cookie_domain.clone()),
        cookie_path: args.cookie_path.clone(),
        cookie_name: args.cookie_name.clone(),
        secret: secret.map(String::into_bytes).unwrap_or_default(),
        token_expiry: Duration::from_secs(args.access_ttl),
        refresh_expiry: Duration::from_secs(args.refresh_ttl),
        ..defaults
    }
}

/// Random URL-safe secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

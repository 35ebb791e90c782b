use clap::Parser;
use jot::auth::{Auth, User};
use jot::cli::{Args, Command, build_config, generate_secret, init_logging, load_secret};
use jot::jwt::{HmacSigner, unix_now, verify_access_token};
use serde::Serialize;
use tracing::{error, info};

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!(error = %e, "Failed to serialize output");
            std::process::exit(1);
        }
    }
}

fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let secret = if args.command.needs_secret() {
        let Some(secret) = load_secret(args.secret_file.as_deref()) else {
            std::process::exit(1);
        };
        Some(secret)
    } else {
        None
    };

    let auth = Auth::new(build_config(&args, secret));

    match args.command {
        Command::Issue {
            id,
            first_name,
            last_name,
        } => {
            let user = User {
                id,
                first_name,
                last_name,
            };
            let pair = auth.generate_token_pair(&user).unwrap_or_else(|e| {
                error!(error = %e, "Failed to issue tokens");
                std::process::exit(1);
            });

            info!(sub = id, issuer = %auth.config.issuer, "Issued token pair");
            print_json(&pair);
            println!(
                "Set-Cookie: {}",
                auth.get_refresh_cookie(&pair.refresh_token)
            );
        }
        Command::Verify { token } => {
            let claims = verify_access_token(&HmacSigner, &token, &auth.config, unix_now())
                .unwrap_or_else(|e| {
                    error!(error = %e, "Token rejected");
                    std::process::exit(1);
                });

            print_json(&claims);
        }
        Command::LogoutCookie => {
            println!("Set-Cookie: {}", auth.get_expired_refresh_cookie());
        }
        Command::GenerateSecret => {
            println!("{}", generate_secret());
        }
    }
}

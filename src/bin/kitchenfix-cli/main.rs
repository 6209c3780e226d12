use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use kitchenfix::auth::{AuthStore, ClientSession, GuardDriver, PathRouter};
use kitchenfix::backend::{AuthError, BackendError, BaasClient};
use kitchenfix::config::BackendConfig;
use kitchenfix::guard;
use kitchenfix::model::{AuthSnapshot, Credentials, Identity, Profile, Role, ValidationError};
use uuid::Uuid;

/// Redirect chains longer than this mean the guard is oscillating.
const MAX_HOPS: usize = 8;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing backend setting; pass --{0} or set the matching env var")]
    MissingSetting(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("sign-in failed: {0}")]
    Auth(#[from] AuthError),
    #[error("guard did not settle after {0} redirects")]
    Unsettled(usize),
}

#[derive(Parser, Debug)]
#[command(name = "kitchenfix-cli", about = "KitchenFix navigation guard CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the guard offline for a hand-built auth state.
    Decide(DecideArgs),
    /// Sign in against the backend and follow the guard to its final page.
    Login(LoginArgs),
}

#[derive(Args, Debug)]
struct DecideArgs {
    #[arg(long)]
    path: String,
    #[arg(long)]
    signed_in: bool,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    phone: Option<String>,
    /// Explicit onboarding flag; falls back to the phone when omitted.
    #[arg(long)]
    complete: Option<bool>,
    #[arg(long)]
    loading: bool,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long, env = "BAAS_URL")]
    baas_url: Option<String>,
    #[arg(long, env = "BAAS_ANON_KEY")]
    baas_anon_key: Option<String>,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Page the user is on when signing in.
    #[arg(long, default_value = guard::SIGN_IN_PATH)]
    path: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match Cli::parse().command {
        Command::Decide(args) => {
            println!("{}", run_decide(&args));
            Ok(())
        }
        Command::Login(args) => run_login(args).await,
    }
}

// =============================================================================
// DECIDE
// =============================================================================

fn snapshot_from(args: &DecideArgs) -> AuthSnapshot {
    if args.loading {
        return AuthSnapshot::loading();
    }
    if !args.signed_in {
        return AuthSnapshot::signed_out();
    }
    let id = Uuid::nil();
    let mut profile = Profile::new(id);
    profile.role = args.role;
    profile.phone.clone_from(&args.phone);
    profile.onboarding_complete = args.complete;
    AuthSnapshot::signed_in(Identity { id, email: None }, Some(profile))
}

fn run_decide(args: &DecideArgs) -> &'static str {
    guard::decide(&args.path, &snapshot_from(args)).map_or("stay", guard::Destination::path)
}

// =============================================================================
// LOGIN
// =============================================================================

async fn run_login(args: LoginArgs) -> Result<(), CliError> {
    let url = args.baas_url.ok_or(CliError::MissingSetting("baas-url"))?;
    let anon_key = args.baas_anon_key.ok_or(CliError::MissingSetting("baas-anon-key"))?;
    let credentials = Credentials::new(&args.email, &args.password)?;

    let backend = Arc::new(BaasClient::new(&BackendConfig::new(&url, &anon_key))?);
    let session = Arc::new(ClientSession::new(backend.clone(), backend));
    let store = AuthStore::new(session.clone(), session);
    store.initialize().await;

    let router = PathRouter::new(&args.path);
    let mut driver = GuardDriver::new(router.clone());
    settle(&mut driver, &router, &store.snapshot())?;

    store.sign_in(&credentials).await?;
    settle(&mut driver, &router, &store.snapshot())?;

    let history = router.history();
    for hop in history.windows(2) {
        println!("{} -> {}", hop[0], hop[1]);
    }
    println!("{}", router.current());
    Ok(())
}

/// Evaluate until the guard stays put on the current path.
fn settle(driver: &mut GuardDriver<PathRouter>, router: &PathRouter, snapshot: &AuthSnapshot) -> Result<(), CliError> {
    for _ in 0..MAX_HOPS {
        if driver.evaluate(&router.current(), snapshot).is_none() {
            return Ok(());
        }
    }
    Err(CliError::Unsettled(MAX_HOPS))
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

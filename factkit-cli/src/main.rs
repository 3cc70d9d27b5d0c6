//! Developer CLI for FactKit.
//!
//! Drives the SDK against a real backend: log in, inspect the session,
//! work the correction-review queue. Credentials persist under the user's
//! data directory, so the session survives between invocations exactly as
//! it does in the real client.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use factkit_core::{Client, Config, Environment, Role, UserUpdate};
use factkit_store::{CredentialStore, FileStore};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "factkit", version, about = "FactKit developer CLI")]
struct Cli {
    /// Backend environment to talk to.
    #[arg(long, env = "FACTKIT_ENV", default_value = "staging")]
    environment: String,

    /// Explicit backend base URL (overrides --environment).
    #[arg(long, env = "FACTKIT_BASE_URL")]
    base_url: Option<String>,

    /// Credential store directory (defaults to the platform data dir).
    #[arg(long, env = "FACTKIT_STORE_DIR")]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session.
    Login {
        /// Account email.
        email: String,
        /// Account password.
        #[arg(env = "FACTKIT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Register a new account.
    Register {
        /// Account email.
        email: String,
        /// Account password.
        #[arg(env = "FACTKIT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the current session.
    Whoami,
    /// End the session and clear persisted credentials.
    Logout,
    /// Correction-review queue operations (Admin+).
    Corrections {
        #[command(subcommand)]
        action: CorrectionsAction,
    },
    /// User management (Admin+).
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand)]
enum CorrectionsAction {
    /// List the pending queue with overdue classification.
    Pending,
    /// Accept a pending correction.
    Accept {
        /// Correction id.
        id: Uuid,
    },
    /// Reject a pending correction.
    Reject {
        /// Correction id.
        id: Uuid,
    },
    /// Apply an accepted correction.
    Apply {
        /// Correction id.
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List all users.
    List,
    /// Change a user's role.
    SetRole {
        /// User id.
        id: Uuid,
        /// New role (e.g. REVIEWER, ADMIN).
        role: Role,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.base_url {
        Some(url) => Config::with_base_url(url),
        None => {
            let environment: Environment = cli
                .environment
                .parse()
                .map_err(|_| eyre!("unknown environment '{}'", cli.environment))?;
            Config::from_environment(&environment)
        }
    };

    let store_dir = cli.store_dir.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("factkit")
    });
    let store = Arc::new(
        FileStore::open(&store_dir)
            .wrap_err_with(|| format!("cannot open store at {}", store_dir.display()))?,
    );

    let client = Client::new(config, store as Arc<dyn CredentialStore>);
    client.session().bootstrap().wrap_err("session bootstrap failed")?;

    run(&cli.command, &client).await
}

async fn run(command: &Command, client: &Client) -> eyre::Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = client.login(email, password).await?;
            println!("logged in as {} ({})", user.email, user.role);
        }
        Command::Register { email, password } => {
            let user = client.register(email, password, password).await?;
            println!("registered {} ({})", user.email, user.role);
        }
        Command::Whoami => match client.session().current_user() {
            Some(user) => {
                println!("{} ({})", user.email, user.role);
                println!("admin: {}", client.session().is_admin());
            }
            None => println!("not logged in"),
        },
        Command::Logout => {
            client.logout().await?;
            println!("logged out");
        }
        Command::Corrections { action } => run_corrections(action, client).await?,
        Command::Users { action } => run_users(action, client).await?,
    }
    Ok(())
}

async fn run_corrections(action: &CorrectionsAction, client: &Client) -> eyre::Result<()> {
    match action {
        CorrectionsAction::Pending => {
            let queue = client.list_pending_corrections().await?;
            if queue.is_empty() {
                println!("no pending corrections");
                return Ok(());
            }
            println!(
                "{} pending, {} overdue",
                queue.total_count(),
                queue.overdue_count()
            );
            for correction in queue.corrections() {
                println!(
                    "{}  {}  sla {}  {}",
                    correction.id,
                    correction.status,
                    correction.sla_deadline.format("%Y-%m-%d %H:%M"),
                    correction.request_details
                );
            }
        }
        CorrectionsAction::Accept { id }
        | CorrectionsAction::Reject { id }
        | CorrectionsAction::Apply { id } => {
            let queue = client.list_pending_corrections().await?;
            let target = queue
                .corrections()
                .iter()
                .find(|c| c.id == *id)
                .ok_or_else(|| eyre!("correction {id} is not in the pending queue"))?;
            let updated = match action {
                CorrectionsAction::Accept { .. } => client.accept_correction(target).await?,
                CorrectionsAction::Reject { .. } => client.reject_correction(target).await?,
                // A pending record must be accepted first; the state
                // machine rejects a straight pending -> applied.
                CorrectionsAction::Apply { .. } => {
                    let accepted = client.accept_correction(target).await?;
                    client.apply_correction(&accepted).await?
                }
                CorrectionsAction::Pending => unreachable!(),
            };
            println!("{} -> {}", updated.id, updated.status);
        }
    }
    Ok(())
}

async fn run_users(action: &UsersAction, client: &Client) -> eyre::Result<()> {
    match action {
        UsersAction::List => {
            for user in client.list_users().await? {
                println!(
                    "{}  {}  {}  {}",
                    user.id,
                    user.email,
                    user.role,
                    if user.is_active { "active" } else { "inactive" }
                );
            }
        }
        UsersAction::SetRole { id, role } => {
            let updated = client
                .update_user(
                    *id,
                    &UserUpdate {
                        role: Some(*role),
                        ..UserUpdate::default()
                    },
                )
                .await?;
            println!("{} is now {}", updated.email, updated.role);
        }
    }
    Ok(())
}

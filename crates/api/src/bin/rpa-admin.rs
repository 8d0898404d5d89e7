//! Operator tasks that must work without a running server or an existing
//! admin account.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rpa_api::auth::password::hash_password;
use rpa_core::roles::ROLE_ADMIN_ID;
use rpa_core::validation::{normalize_email, validate_email, validate_password};
use rpa_db::models::user::{CreateUser, UpdateUser};
use rpa_db::repositories::{SessionRepo, UserRepo};

#[derive(Parser)]
#[command(name = "rpa-admin", about = "RPA portal administration", version)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the first admin, or promote and reactivate an existing account
    CreateAdmin {
        #[arg(long, env = "ADMIN_EMAIL")]
        email: String,

        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, env = "ADMIN_NAME")]
        name: Option<String>,
    },

    /// Set a new password and clear any lockout
    ResetPassword {
        #[arg(long)]
        email: String,

        #[arg(long, env = "NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Apply pending database migrations
    Migrate,

    /// Delete expired and revoked sessions
    CleanupSessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rpa_api=info")),
        )
        .init();

    let cli = Cli::parse();
    let pool = rpa_db::create_pool(&cli.database_url)
        .await
        .context("connecting to the database")?;

    match cli.command {
        Commands::CreateAdmin {
            email,
            password,
            name,
        } => create_admin(&pool, &email, &password, name).await?,
        Commands::ResetPassword { email, password } => {
            reset_password(&pool, &email, &password).await?
        }
        Commands::Migrate => {
            rpa_db::run_migrations(&pool)
                .await
                .context("running migrations")?;
            println!("Migrations applied");
        }
        Commands::CleanupSessions => {
            let removed = SessionRepo::purge_dead(&pool).await?;
            println!("Removed {removed} sessions");
        }
    }

    Ok(())
}

async fn create_admin(
    pool: &rpa_db::DbPool,
    email: &str,
    password: &str,
    name: Option<String>,
) -> Result<()> {
    let email = normalize_email(email);
    validate_email(&email).map_err(anyhow::Error::msg)?;

    if let Some(existing) = UserRepo::find_by_email(pool, &email).await? {
        UserRepo::update(
            pool,
            existing.id,
            &UpdateUser {
                role_id: Some(ROLE_ADMIN_ID),
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await?;
        println!("{email} already exists; granted admin role");
        return Ok(());
    }

    validate_password(password).map_err(anyhow::Error::msg)?;
    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.clone(),
            name: name.filter(|n| !n.trim().is_empty()),
            password_hash,
            role_id: ROLE_ADMIN_ID,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, "Admin account created");
    println!("Created admin {email} (id {})", user.id);
    Ok(())
}

async fn reset_password(pool: &rpa_db::DbPool, email: &str, password: &str) -> Result<()> {
    let email = normalize_email(email);
    validate_password(password).map_err(anyhow::Error::msg)?;

    let Some(user) = UserRepo::find_by_email(pool, &email).await? else {
        bail!("no user with email {email}");
    };

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    UserRepo::update_password(pool, user.id, &password_hash).await?;
    SessionRepo::revoke_all_for_user(pool, user.id).await?;
    println!("Password reset for {email}");
    Ok(())
}

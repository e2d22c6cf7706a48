use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::models::user::{self, NewUser, Role};

pub type DbPool = SqlitePool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the initial `admin` account when the users table is empty.
pub async fn seed_admin(pool: &DbPool, admin_password_hash: &str) -> Result<(), sqlx::Error> {
    let count = user::count(pool).await?;
    if count > 0 {
        log::info!("Database already has {count} users, skipping admin seed");
        return Ok(());
    }

    let admin = NewUser {
        username: "admin".to_string(),
        email: "admin@localhost".to_string(),
        password: admin_password_hash.to_string(),
        role: Role::Admin,
    };
    let id = user::create(pool, &admin).await?;
    log::info!("Seeded admin user (id {id})");
    Ok(())
}

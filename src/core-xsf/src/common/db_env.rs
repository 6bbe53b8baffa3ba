use std::env::VarError;

use data_model_xsf::db::{ConnectionPoolError, DEFAULT_POOL_SIZE, DbPool, establish_connection_pool};

/// Retrieves the value for the env var DATABASE_URL.
pub fn get_database_url() -> Result<String, VarError> {
    std::env::var("DATABASE_URL")
}

/// Pool size from XSF_DB_POOL_SIZE, or the default when unset or not a number.
pub fn get_pool_size() -> usize {
    std::env::var("XSF_DB_POOL_SIZE")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_POOL_SIZE)
}

#[derive(Debug, thiserror::Error)]
pub enum DbEnvError {
    #[error("DATABASE_URL must be set in .env file or present as an env var: {0}")]
    MissingUrl(#[from] VarError),
    #[error("Couldn't connect to the options database: {0}")]
    Connection(#[from] ConnectionPoolError),
}

/// Uses the env var DATABASE_URL to establish the option store's connection pool.
pub async fn get_db_pool() -> Result<DbPool, DbEnvError> {
    let database_url = get_database_url()?;
    let pool = establish_connection_pool(&database_url, get_pool_size()).await?;
    Ok(pool)
}

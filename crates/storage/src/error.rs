use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("dex id out of range: {0}")]
    DexIdOutOfRange(i64),

    #[error("{0}")]
    Other(String),
}

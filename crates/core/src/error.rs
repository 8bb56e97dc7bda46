use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DexError {
    #[error("region is required")]
    MissingRegion,

    #[error("invalid region identifier: {0:?}")]
    InvalidRegion(String),
}

pub mod config;
pub mod error;
pub mod region;

pub use config::Config;
pub use error::*;
pub use region::*;

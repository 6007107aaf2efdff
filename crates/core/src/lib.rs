// Stinger Core - Data-access logic & Ports
// NO infrastructure dependencies: drivers live behind the port traits

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

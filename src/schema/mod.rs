//! Schema module - Configuration, seeding and file-format types.

mod config;
mod evolution;
mod experiment;
mod seed;

pub use config::*;
pub use evolution::*;
pub use experiment::*;
pub use seed::*;

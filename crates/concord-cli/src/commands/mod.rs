//! Command implementations.

pub mod config;
pub mod run;
pub mod validate;

pub use self::config::{execute_config, load_config};
pub use self::run::execute_run;
pub use self::validate::execute_validate;

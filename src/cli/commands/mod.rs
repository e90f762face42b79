//! One module per subcommand.

pub mod aggregate;
pub mod completions;
pub mod config;
pub mod history;
pub mod monitor;
pub mod run;
pub mod version;

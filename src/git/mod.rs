pub mod command;
pub mod executor;
pub mod parser;
pub mod version;

pub use command::CommandIntent;
pub use executor::{CommandExecutor, CommandResult};
pub use version::GitVersion;

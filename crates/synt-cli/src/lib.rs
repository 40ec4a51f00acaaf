pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Commands, SynthesisArgs};
pub use settings::Settings;

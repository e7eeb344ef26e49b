//! Chat front ends for the docent agent.

pub mod cli;

pub use cli::CliChannel;

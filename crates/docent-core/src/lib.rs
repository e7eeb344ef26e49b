//! Agent loop, chat channel abstraction, and configuration loading.

pub mod agent;
pub mod channel;
pub mod config;

pub use agent::{Agent, AgentError, EMPTY_INPUT_MESSAGE, FAILURE_MESSAGE, NO_RESPONSE_MESSAGE};
pub use channel::{Channel, ChannelError, ChannelMessage};
pub use config::Config;

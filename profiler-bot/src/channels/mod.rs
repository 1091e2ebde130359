pub mod discord;
pub mod reconnect;

pub use discord::{start_discord_listener, ProfilerHandler};

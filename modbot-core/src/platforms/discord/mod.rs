pub mod gateway;
pub mod runtime;

pub use gateway::{INTENTS, run_gateway, to_inbound};
pub use runtime::DiscordPlatform;

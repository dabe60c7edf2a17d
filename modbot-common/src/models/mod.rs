// File: modbot-common/src/models/mod.rs
pub mod auto_response;
pub mod cleanup;
pub mod duration;
pub mod message;
pub mod motd;
pub mod word_group;

pub use auto_response::{AutoResponse, Filter, Response};
pub use cleanup::{CleanupDefinition, WorkItem};
pub use message::{InboundMessage, PostedMessage};
pub use motd::{ChannelMotd, MotdField, MotdMessage};
pub use word_group::WordGroupFilter;

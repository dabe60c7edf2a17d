// File: modbot-common/src/models/auto_response.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::duration::compact;
use crate::models::word_group::WordGroupFilter;

/// A named moderation rule: when every filter passes for a message, every
/// response is carried out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoResponse {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub responses: Vec<Response>,
}

/// Condition an inbound message must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Filter {
    /// Message was posted in one of these channels.
    AnyChannel(Vec<u64>),
    /// Author joined the guild no longer ago than this.
    UserJoinAge(#[serde(with = "compact")] Duration),
    /// Some sentence of the message contains one of these word orders.
    MessageWordOrder(WordGroupFilter),
}

/// What to do once a message matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Response {
    /// DM every member holding any of these roles.
    MessageRoles(Vec<u64>),
    /// DM these users.
    MessageUsers(Vec<u64>),
}

impl Filter {
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::AnyChannel(_) => "any_channel",
            Filter::UserJoinAge(_) => "user_join_age",
            Filter::MessageWordOrder(_) => "message_word_order",
        }
    }
}

impl AutoResponse {
    /// Structural checks. Word patterns are validated separately, when the
    /// matcher compiles them.
    pub fn validate(&self) -> Result<(), Error> {
        let len = self.name.chars().count();
        if !(3..=255).contains(&len) {
            return Err(Error::InvalidDefinition(format!(
                "auto response name `{}` must be between 3 and 255 characters",
                self.name
            )));
        }
        for filter in &self.filters {
            let empty = match filter {
                Filter::AnyChannel(ids) => ids.is_empty(),
                Filter::UserJoinAge(_) => false,
                Filter::MessageWordOrder(groups) => groups.is_empty(),
            };
            if empty {
                return Err(Error::InvalidDefinition(format!(
                    "filter `{}` of auto response `{}` must not be empty",
                    filter.kind(),
                    self.name
                )));
            }
        }
        Ok(())
    }
}

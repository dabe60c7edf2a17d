// File: modbot-common/src/models/motd.rs

use serde::{Deserialize, Serialize};

use crate::error::Error;

fn default_color() -> String {
    "#00FFFF".to_string()
}

/// Pinned-style embeds the bot keeps at the top of a channel. Message `i` of
/// `messages` lives in the channel's `i`-th oldest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMotd {
    pub channel_id: u64,
    #[serde(default)]
    pub messages: Vec<MotdMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotdMessage {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub footer: String,
    pub footer_icon_url: String,
    /// `#RRGGBB`.
    pub color: String,
    pub fields: Vec<MotdField>,
}

impl Default for MotdMessage {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            url: String::new(),
            image_url: String::new(),
            thumbnail_url: String::new(),
            footer: String::new(),
            footer_icon_url: String::new(),
            color: default_color(),
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotdField {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub inline: bool,
}

impl MotdMessage {
    /// Embed color as `0xRRGGBB`.
    pub fn color_value(&self) -> Result<u32, Error> {
        let hex = self.color.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(Error::InvalidDefinition(format!("MOTD color `{}` is not #RRGGBB", self.color)));
        }
        u32::from_str_radix(hex, 16)
            .map_err(|_| Error::InvalidDefinition(format!("MOTD color `{}` is not #RRGGBB", self.color)))
    }
}

impl ChannelMotd {
    pub fn validate(&self) -> Result<(), Error> {
        for (index, message) in self.messages.iter().enumerate() {
            message.color_value()?;
            if message.title.is_empty() && message.description.is_empty() && message.fields.is_empty() {
                return Err(Error::InvalidDefinition(format!(
                    "MOTD {index} of channel {} has no title, description or fields",
                    self.channel_id
                )));
            }
            if message.fields.iter().any(|f| f.name.is_empty() || f.content.is_empty()) {
                return Err(Error::InvalidDefinition(format!(
                    "MOTD {index} of channel {} has a field without name or content",
                    self.channel_id
                )));
            }
        }
        Ok(())
    }
}

// modbot-core/src/repositories/json_store.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use modbot_common::error::Error;
use modbot_common::models::{AutoResponse, ChannelMotd, CleanupDefinition, Filter};
use modbot_common::traits::DefinitionStore;

use crate::matching::pattern;

/// On-disk layout of the definitions file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionsFile {
    #[serde(default)]
    pub cleanups: Vec<CleanupDefinition>,
    #[serde(default)]
    pub auto_responses: Vec<AutoResponse>,
    #[serde(default)]
    pub motds: Vec<ChannelMotd>,
}

struct Snapshot {
    modified: Option<SystemTime>,
    definitions: Arc<DefinitionsFile>,
}

/// Definitions read from a JSON file. The file is parsed again whenever its
/// modification time changes; if a new version fails to parse, the last good
/// one keeps being served.
pub struct JsonDefinitionStore {
    path: PathBuf,
    snapshot: Mutex<Option<Snapshot>>,
}

impl JsonDefinitionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current definitions, re-reading the file if it changed.
    pub async fn definitions(&self) -> Result<Arc<DefinitionsFile>, Error> {
        let mut snapshot = self.snapshot.lock().await;

        let modified = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified().ok(),
            Err(e) => {
                return match snapshot.as_ref() {
                    Some(last) => {
                        warn!("Definitions file {} unavailable ({e}), using last loaded version", self.path.display());
                        Ok(Arc::clone(&last.definitions))
                    }
                    None => Err(e.into()),
                };
            }
        };

        if let Some(last) = snapshot.as_ref() {
            if modified.is_some() && last.modified == modified {
                return Ok(Arc::clone(&last.definitions));
            }
        }

        match self.load().await {
            Ok(definitions) => {
                info!(
                    "Loaded {} cleanup definition(s), {} auto response(s) and {} MOTD channel(s) from {}",
                    definitions.cleanups.len(),
                    definitions.auto_responses.len(),
                    definitions.motds.len(),
                    self.path.display()
                );
                let definitions = Arc::new(definitions);
                *snapshot = Some(Snapshot {
                    modified,
                    definitions: Arc::clone(&definitions),
                });
                Ok(definitions)
            }
            Err(e) => match snapshot.as_mut() {
                Some(last) => {
                    error!("Failed to reload {}, keeping previous definitions: {e}", self.path.display());
                    // Remember the broken version so it is reported once.
                    last.modified = modified;
                    Ok(Arc::clone(&last.definitions))
                }
                None => Err(e),
            },
        }
    }

    async fn load(&self) -> Result<DefinitionsFile, Error> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut file: DefinitionsFile = serde_json::from_str(&raw)?;
        file.auto_responses.retain(|ar| match validate_auto_response(ar) {
            Ok(()) => true,
            Err(e) => {
                error!("Skipping auto response `{}`: {e}", ar.name);
                false
            }
        });
        file.motds.retain(|motd| match motd.validate() {
            Ok(()) => true,
            Err(e) => {
                error!("Skipping MOTDs of channel {}: {e}", motd.channel_id);
                false
            }
        });
        Ok(file)
    }
}

fn validate_auto_response(auto_response: &AutoResponse) -> Result<(), Error> {
    auto_response.validate()?;
    for filter in &auto_response.filters {
        if let Filter::MessageWordOrder(word_groups) = filter {
            pattern::validate(word_groups)?;
        }
    }
    Ok(())
}

#[async_trait]
impl DefinitionStore for JsonDefinitionStore {
    async fn cleanup_definitions(&self) -> Result<Vec<CleanupDefinition>, Error> {
        Ok(self.definitions().await?.cleanups.clone())
    }

    async fn auto_responses(&self) -> Result<Vec<AutoResponse>, Error> {
        Ok(self.definitions().await?.auto_responses.clone())
    }

    async fn motds(&self) -> Result<Vec<ChannelMotd>, Error> {
        Ok(self.definitions().await?.motds.clone())
    }
}

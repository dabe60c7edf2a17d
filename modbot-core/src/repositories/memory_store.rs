// modbot-core/src/repositories/memory_store.rs

use async_trait::async_trait;
use parking_lot::RwLock;

use modbot_common::error::Error;
use modbot_common::models::{AutoResponse, ChannelMotd, CleanupDefinition};
use modbot_common::traits::DefinitionStore;

/// Definitions held in memory and replaced wholesale through the setters.
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    cleanups: RwLock<Vec<CleanupDefinition>>,
    auto_responses: RwLock<Vec<AutoResponse>>,
    motds: RwLock<Vec<ChannelMotd>>,
}

impl InMemoryDefinitionStore {
    pub fn new(cleanups: Vec<CleanupDefinition>, auto_responses: Vec<AutoResponse>) -> Self {
        Self {
            cleanups: RwLock::new(cleanups),
            auto_responses: RwLock::new(auto_responses),
            motds: RwLock::new(Vec::new()),
        }
    }

    pub fn set_cleanup_definitions(&self, cleanups: Vec<CleanupDefinition>) {
        *self.cleanups.write() = cleanups;
    }

    pub fn set_auto_responses(&self, auto_responses: Vec<AutoResponse>) {
        *self.auto_responses.write() = auto_responses;
    }

    pub fn set_motds(&self, motds: Vec<ChannelMotd>) {
        *self.motds.write() = motds;
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn cleanup_definitions(&self) -> Result<Vec<CleanupDefinition>, Error> {
        Ok(self.cleanups.read().clone())
    }

    async fn auto_responses(&self) -> Result<Vec<AutoResponse>, Error> {
        Ok(self.auto_responses.read().clone())
    }

    async fn motds(&self) -> Result<Vec<ChannelMotd>, Error> {
        Ok(self.motds.read().clone())
    }
}

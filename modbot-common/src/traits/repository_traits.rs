use async_trait::async_trait;

use crate::error::Error;
use crate::models::{AutoResponse, ChannelMotd, CleanupDefinition};

/// Read access to the administrator-maintained definitions. Implementations
/// should reflect edits without a restart.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn cleanup_definitions(&self) -> Result<Vec<CleanupDefinition>, Error>;

    async fn auto_responses(&self) -> Result<Vec<AutoResponse>, Error>;

    async fn motds(&self) -> Result<Vec<ChannelMotd>, Error>;
}

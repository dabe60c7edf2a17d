pub mod platform_traits;
pub mod repository_traits;
pub mod schedule_traits;

pub use platform_traits::ChatPlatform;
pub use repository_traits::DefinitionStore;
pub use schedule_traits::CronParser;

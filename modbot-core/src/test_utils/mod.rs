pub mod fake_platform;
pub mod helpers;

pub use fake_platform::{BOT_USER_ID, FakePlatform};
pub use helpers::*;

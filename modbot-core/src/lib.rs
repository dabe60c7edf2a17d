// src/lib.rs

pub mod matching;
pub mod platforms;
pub mod repositories;
pub mod resilience;
pub mod services;
pub mod tasks;
pub mod test_utils;
pub mod utils;

pub use modbot_common::error::Error;

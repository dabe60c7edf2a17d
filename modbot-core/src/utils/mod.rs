pub mod cron;

pub use self::cron::{CronCrateParser, normalize_cron};

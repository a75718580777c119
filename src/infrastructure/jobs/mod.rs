pub mod background_scheduler;

pub use background_scheduler::{BackgroundScheduler, ScheduleConfig};

pub mod worker;

pub use worker::{refresh_loop, refresh_once, RefreshOutcome, RefreshSchedule};

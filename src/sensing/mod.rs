pub mod controller;
pub mod intensity;
pub mod loop_worker;

pub use controller::SensorController;
pub use intensity::intensity_for;
pub use loop_worker::{evaluate, is_active, system_clock, Clock, SensorConfig};

// Core alerting engine

pub mod config;
pub mod descriptor;
pub mod hysteresis;
pub mod natives;
pub mod notify;
pub mod poll;
pub mod registry;
pub mod resolver;
pub mod sensor;
pub mod shell;

// Re-export commonly used items
pub use config::{Config, GlobalConfig, SensorConfig};
pub use descriptor::Descriptor;
pub use hysteresis::Threshold;
pub use notify::{DesktopNotifier, LogNotifier, Notifier};
pub use poll::PollLoop;
pub use registry::AlertRegistry;
pub use resolver::{Resolver, SearchPath, SharedResolver};
pub use sensor::{AlertMessage, ProbeResult, Reading, Sensor};

// Library interface for gensum
// Integration tests and embedding build tools use these modules directly

pub mod checksum;
pub mod config;
pub mod config_discovery;
pub mod error;
pub mod generation;
pub mod logging;
pub mod normalize;

// Re-export commonly used types
pub use checksum::{ChecksumComputer, ChecksumStore, FingerprintMap, InputProperty, PropertyValue};
pub use config::GensumConfig;
pub use config_discovery::{discover_config, load_config_with_discovery};
pub use error::{DriftReport, GensumError, Result};
pub use generation::{Generator, Project, Settings, Task, TaskOutcome, WrapperOptions};

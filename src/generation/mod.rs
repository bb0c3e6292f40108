/// Checksum-gated generation
///
/// Wraps generators with load/save/check units and runs them as one ordered
/// pipeline per generator.
pub mod command;
pub mod project;
pub mod task;
pub mod wrapper;

pub use command::{CommandGenerator, CommandSpec, CommandTask};
pub use project::{Project, RegenerateReport, Settings, Target, CHECK_PHASE, DEFAULT_CHECKSUMS_DIR};
pub use task::{Generator, Task, TaskOutcome, TaskRef, WrapperOptions};
pub use wrapper::{base_name, LoadOutcome, TaskNames, WrappedGenerator, GENERATOR_SUFFIX};

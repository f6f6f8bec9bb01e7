pub mod counters;
pub mod error;
pub mod logging;
pub mod notifiers;
pub mod processor;
pub mod queue;
pub mod signal;

pub use counters::{CounterSnapshot, EventCounters};
pub use error::{ProcessorError, Result};
pub use logging::init_logging;
pub use notifiers::build_notify_manager;
pub use processor::{Processor, ProcessorExit};
pub use queue::{EventQueue, StopHandle};
pub use signal::{stop_on, wait_for_shutdown, ShutdownSignal};

pub mod global;
pub mod loader;

pub use global::{
    FilterConfig, LoggingConfig, NotificationConfig, NotifiersConfig, ProcessorConfig, StoreConfig,
    VigilConfig,
};
pub use loader::ConfigLoader;

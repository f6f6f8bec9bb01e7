use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;
use vigil_config::LoggingConfig;

/// `RUST_LOG` 优先，否则使用配置的级别
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| anyhow!("invalid log level {:?}: {}", config.level, e)),
    }
}

/// 初始化日志
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .try_init()
    };

    result.map_err(|e| anyhow!("failed to initialize logging: {}", e))
}

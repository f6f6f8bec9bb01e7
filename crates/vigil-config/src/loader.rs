use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::VigilConfig;

/// 环境变量前缀，如 `VIGIL__PROCESSOR__QUEUE`
const ENV_PREFIX: &str = "VIGIL";

/// 配置加载器
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// 加载配置：TOML 文件（可缺省）叠加环境变量
    pub fn load(&self) -> Result<VigilConfig> {
        let path = self
            .config_path
            .to_str()
            .ok_or_else(|| anyhow!("Invalid config path"))?;

        let config = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: VigilConfig = config.try_deserialize()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(config: &VigilConfig) -> Result<()> {
        if config.processor.queue.trim().is_empty() {
            return Err(anyhow!("processor.queue must not be empty"));
        }
        if config.processor.instance_ttl_secs == 0 {
            return Err(anyhow!("processor.instance_ttl_secs must be greater than 0"));
        }
        if config.filters.initial_failure_delay_secs < 0 {
            return Err(anyhow!(
                "filters.initial_failure_delay_secs must not be negative: {}",
                config.filters.initial_failure_delay_secs
            ));
        }
        if config.filters.default_acknowledgement_secs <= 0 {
            return Err(anyhow!("filters.default_acknowledgement_secs must be greater than 0"));
        }
        if config.notifications.default_offset().is_none() {
            return Err(anyhow!(
                "notifications.default_timezone is not a UTC offset: {}",
                config.notifications.default_timezone
            ));
        }
        if config.store.url.trim().is_empty() {
            return Err(anyhow!("store.url must not be empty"));
        }
        Ok(())
    }

    /// 默认配置的 TOML 文本
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&VigilConfig::default())?)
    }
}

use thiserror::Error;
use vigil_core::StoreError;

/// 事件处理器错误类型
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// 存储错误，对实例是致命的
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 事件处理器结果类型
pub type Result<T> = std::result::Result<T, ProcessorError>;

impl ProcessorError {
    pub fn config(msg: impl Into<String>) -> Self {
        ProcessorError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_convert() {
        let err: ProcessorError = StoreError::WrongType("check:web:HTTP".to_string()).into();
        assert!(matches!(err, ProcessorError::Store(_)));
        assert_eq!(err.to_string(), "Store error: Wrong type for key: check:web:HTTP");
        assert_eq!(
            ProcessorError::config("bad queue").to_string(),
            "Configuration error: bad queue"
        );
    }
}

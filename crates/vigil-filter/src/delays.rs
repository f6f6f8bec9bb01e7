use crate::context::FilterContext;
use crate::filter::Filter;
use async_trait::async_trait;
use tracing::debug;
use vigil_core::Result;

/// 默认首次故障延迟（秒）
pub const DEFAULT_INITIAL_FAILURE_DELAY: i64 = 30;

/// 故障持续时间不足延迟时拦截，避免抖动告警
#[derive(Debug)]
pub struct DelaysFilter {
    initial_failure_delay: i64,
}

impl DelaysFilter {
    pub fn new(initial_failure_delay: i64) -> Self {
        Self { initial_failure_delay }
    }
}

impl Default for DelaysFilter {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_FAILURE_DELAY)
    }
}

#[async_trait]
impl Filter for DelaysFilter {
    async fn block(&self, ctx: &FilterContext<'_>) -> Result<bool> {
        if !ctx.event.is_failure() {
            return Ok(false);
        }

        let delay = ctx
            .event
            .initial_failure_delay
            .unwrap_or(self.initial_failure_delay);
        let current = &ctx.update.current;
        let elapsed = ctx.event.time - current.timestamp;

        let blocked = elapsed < delay;
        if blocked {
            debug!(
                check = %ctx.check_id,
                state = %current.status,
                elapsed,
                delay,
                "Failure has not lasted long enough"
            );
        }
        Ok(blocked)
    }

    fn name(&self) -> &'static str {
        "delays"
    }
}

use crate::context::FilterContext;
use crate::filter::Filter;
use async_trait::async_trait;
use tracing::debug;
use vigil_core::Result;
use vigil_types::CheckStatus;

/// 确认相关的拦截
///
/// - 对 ok 状态的确认动作没有意义，拦截；
/// - 当前故障状态有未过期的确认时，拦截该状态的故障事件。
#[derive(Debug, Default)]
pub struct AcknowledgementFilter;

#[async_trait]
impl Filter for AcknowledgementFilter {
    async fn block(&self, ctx: &FilterContext<'_>) -> Result<bool> {
        if ctx.event.is_acknowledgement() {
            let blocked = ctx.update.current.status == CheckStatus::Ok;
            if blocked {
                debug!(check = %ctx.check_id, "Nothing to acknowledge, check is ok");
            }
            return Ok(blocked);
        }

        if !ctx.event.is_failure() {
            return Ok(false);
        }

        let blocked = ctx.checks.is_acknowledged(&ctx.check_id, ctx.event.time).await?;
        if blocked {
            debug!(check = %ctx.check_id, "Failure is acknowledged");
        }
        Ok(blocked)
    }

    fn name(&self) -> &'static str {
        "acknowledgement"
    }
}

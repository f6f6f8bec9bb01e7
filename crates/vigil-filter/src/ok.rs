use crate::context::FilterContext;
use crate::filter::Filter;
use async_trait::async_trait;
use tracing::debug;
use vigil_core::Result;
use vigil_types::CheckStatus;

/// 状态与最近一次通知的状态相同时拦截
///
/// 从未通知过的检查视为最近通知状态为 ok。动作事件不拦截。
#[derive(Debug, Default)]
pub struct OkFilter;

#[async_trait]
impl Filter for OkFilter {
    async fn block(&self, ctx: &FilterContext<'_>) -> Result<bool> {
        let status = match ctx.event.status() {
            Some(status) => status,
            None => return Ok(false),
        };

        let last_notified = ctx
            .checks
            .last_notified(&ctx.check_id)
            .await?
            .unwrap_or(CheckStatus::Ok);

        let blocked = status == last_notified;
        if blocked {
            debug!(check = %ctx.check_id, state = %status, "Already notified for this state");
        }
        Ok(blocked)
    }

    fn name(&self) -> &'static str {
        "ok"
    }
}

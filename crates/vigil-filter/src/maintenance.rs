use crate::context::FilterContext;
use crate::filter::Filter;
use async_trait::async_trait;
use tracing::debug;
use vigil_core::Result;

/// 计划维护期间拦截全部事件
#[derive(Debug, Default)]
pub struct ScheduledMaintenanceFilter;

#[async_trait]
impl Filter for ScheduledMaintenanceFilter {
    async fn block(&self, ctx: &FilterContext<'_>) -> Result<bool> {
        let blocked = ctx
            .checks
            .in_scheduled_maintenance(&ctx.check_id, ctx.event.time)
            .await?;
        if blocked {
            debug!(check = %ctx.check_id, "Check is in scheduled maintenance");
        }
        Ok(blocked)
    }

    fn name(&self) -> &'static str {
        "scheduled_maintenance"
    }
}

/// 非计划维护期间拦截全部事件
#[derive(Debug, Default)]
pub struct UnscheduledMaintenanceFilter;

#[async_trait]
impl Filter for UnscheduledMaintenanceFilter {
    async fn block(&self, ctx: &FilterContext<'_>) -> Result<bool> {
        let blocked = ctx
            .checks
            .in_unscheduled_maintenance(&ctx.check_id, ctx.event.time)
            .await?;
        if blocked {
            debug!(check = %ctx.check_id, "Check is in unscheduled maintenance");
        }
        Ok(blocked)
    }

    fn name(&self) -> &'static str {
        "unscheduled_maintenance"
    }
}

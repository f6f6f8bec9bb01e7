use crate::acknowledgement::AcknowledgementFilter;
use crate::context::FilterContext;
use crate::delays::DelaysFilter;
use crate::filter::Filter;
use crate::maintenance::{ScheduledMaintenanceFilter, UnscheduledMaintenanceFilter};
use crate::ok::OkFilter;
use tracing::debug;
use vigil_core::Result;

/// 有序过滤链，遇到第一个拦截即停止
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// 固定顺序：Ok → 计划维护 → 非计划维护 → 延迟 → 确认
    pub fn new(initial_failure_delay: i64) -> Self {
        Self {
            filters: vec![
                Box::new(OkFilter),
                Box::new(ScheduledMaintenanceFilter),
                Box::new(UnscheduledMaintenanceFilter),
                Box::new(DelaysFilter::new(initial_failure_delay)),
                Box::new(AcknowledgementFilter),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// 返回拦截该事件的过滤器名称，全部通过时返回 None
    pub async fn evaluate(&self, ctx: &FilterContext<'_>) -> Result<Option<&'static str>> {
        for filter in &self.filters {
            if filter.block(ctx).await? {
                return Ok(Some(filter.name()));
            }
            debug!(check = %ctx.check_id, filter = filter.name(), "Filter passed");
        }
        Ok(None)
    }
}

use vigil_data::{CheckRepository, StateUpdate};
use vigil_types::{CheckId, Event};

/// 过滤器执行上下文
pub struct FilterContext<'a> {
    pub event: &'a Event,
    pub check_id: CheckId,
    /// 本次事件带来的状态更新
    pub update: &'a StateUpdate,
    pub checks: &'a CheckRepository,
}

impl<'a> FilterContext<'a> {
    pub fn new(event: &'a Event, update: &'a StateUpdate, checks: &'a CheckRepository) -> Self {
        Self {
            event,
            check_id: event.check_id(),
            update,
            checks,
        }
    }
}

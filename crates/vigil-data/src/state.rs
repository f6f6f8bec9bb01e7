use tracing::{debug, info};
use vigil_core::Result;
use vigil_types::{CheckState, CheckStatus, Event, EventState};

use crate::check::CheckRepository;

/// 一次状态更新的结果
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    /// 状态是否变化；动作事件总是视为变化
    pub changed: bool,
    pub previous: Option<CheckState>,
    pub current: CheckState,
}

/// 检查状态机
#[derive(Clone)]
pub struct StateMachine {
    checks: CheckRepository,
}

impl StateMachine {
    pub fn new(checks: CheckRepository) -> Self {
        Self { checks }
    }

    /// 记录事件对检查状态的影响
    ///
    /// 服务事件：状态不同（或尚无状态）时追加新记录、清除确认，恢复为 ok 时
    /// 结束进行中的非计划维护；状态相同时只刷新当前记录的摘要与更新时间。
    /// 动作事件不改动状态历史。
    pub async fn update(&self, event: &Event) -> Result<StateUpdate> {
        let id = event.check_id();
        let previous = self.checks.current_state(&id).await?;

        let status = match event.state {
            EventState::Service(status) => status,
            EventState::Action(kind) => {
                let current = previous
                    .clone()
                    .unwrap_or_else(|| CheckState::new(CheckStatus::Ok, "", None, event.time));
                debug!(check = %id, action = kind.as_str(), "Action event against check");
                return Ok(StateUpdate {
                    changed: true,
                    previous,
                    current,
                });
            }
        };

        match &previous {
            Some(prev) if prev.status == status => {
                let mut current = prev.clone();
                current.observe(&event.summary, event.details.clone(), event.time);
                self.checks.save_current(&id, &current).await?;
                Ok(StateUpdate {
                    changed: false,
                    previous,
                    current,
                })
            }
            _ => {
                let current =
                    CheckState::new(status, event.summary.clone(), event.details.clone(), event.time);
                self.checks.append_state(&id, &current).await?;
                self.checks.clear_acknowledgement(&id).await?;
                if status == CheckStatus::Ok {
                    self.checks.end_unscheduled_maintenance(&id, event.time).await?;
                }

                info!(
                    check = %id,
                    from = %previous.as_ref().map(|p| p.status.as_str()).unwrap_or("none"),
                    to = %status,
                    "Check state changed"
                );
                Ok(StateUpdate {
                    changed: true,
                    previous,
                    current,
                })
            }
        }
    }
}

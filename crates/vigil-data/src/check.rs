use std::str::FromStr;

use tracing::debug;
use vigil_core::store::{get_json, set_json};
use vigil_core::{keys, Result, SharedStore, StoreError, StoreOp};
use vigil_types::{Acknowledgement, CheckId, CheckState, CheckStatus, MaintenanceWindow};

const FIELD_ENTITY: &str = "entity";
const FIELD_CHECK: &str = "check";
const FIELD_STATE_SEQ: &str = "state_seq";
const FIELD_CURRENT_STATE: &str = "current_state";
const FIELD_STATE: &str = "state";
const FIELD_LAST_NOTIFIED: &str = "last_notified_state";

/// 检查数据访问
///
/// `check:<id>` hash 保存检查元数据与当前状态指针，状态历史保存在
/// `check:<id>:states`（按进入时间排序）和 `check:<id>:state:<seq>`。
#[derive(Clone)]
pub struct CheckRepository {
    store: SharedStore,
}

#[derive(Debug, Clone, Copy)]
enum MaintenanceKind {
    Scheduled,
    Unscheduled,
}

impl MaintenanceKind {
    fn key(&self, id: &CheckId) -> String {
        match self {
            MaintenanceKind::Scheduled => keys::scheduled_maintenances(id),
            MaintenanceKind::Unscheduled => keys::unscheduled_maintenances(id),
        }
    }
}

impl CheckRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// 首次见到检查时登记实体名和检查名
    pub async fn ensure(&self, id: &CheckId) -> Result<()> {
        let key = keys::check(id);
        self.store
            .transaction(vec![
                StoreOp::hsetnx(key.clone(), FIELD_ENTITY, id.entity.clone()),
                StoreOp::hsetnx(key, FIELD_CHECK, id.check.clone()),
            ])
            .await
    }

    pub async fn exists(&self, id: &CheckId) -> Result<bool> {
        self.store.exists(&keys::check(id)).await
    }

    async fn current_seq(&self, id: &CheckId) -> Result<Option<i64>> {
        match self.store.hget(&keys::check(id), FIELD_CURRENT_STATE).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StoreError::invalid_data(format!("bad state pointer for {}", id))),
            None => Ok(None),
        }
    }

    /// 当前状态，尚无记录时返回 None
    pub async fn current_state(&self, id: &CheckId) -> Result<Option<CheckState>> {
        match self.current_seq(id).await? {
            Some(seq) => get_json(self.store.as_ref(), &keys::check_state(id, seq)).await,
            None => Ok(None),
        }
    }

    /// 追加一条状态记录并设为当前状态
    pub async fn append_state(&self, id: &CheckId, state: &CheckState) -> Result<i64> {
        let check_key = keys::check(id);
        let seq = self.store.hincrby(&check_key, FIELD_STATE_SEQ, 1).await?;
        let raw = serde_json::to_string(state)?;

        self.store
            .transaction(vec![
                StoreOp::set(keys::check_state(id, seq), raw),
                StoreOp::zadd(keys::check_states(id), state.timestamp as f64, seq.to_string()),
                StoreOp::hset(check_key.clone(), FIELD_CURRENT_STATE, seq.to_string()),
                StoreOp::hset(check_key, FIELD_STATE, state.status.as_str()),
            ])
            .await?;

        debug!(check = %id, seq, state = %state.status, "Check state appended");
        Ok(seq)
    }

    /// 覆盖当前状态记录（摘要、更新时间、通知标记）
    pub async fn save_current(&self, id: &CheckId, state: &CheckState) -> Result<()> {
        match self.current_seq(id).await? {
            Some(seq) => set_json(self.store.as_ref(), &keys::check_state(id, seq), state).await,
            None => self.append_state(id, state).await.map(|_| ()),
        }
    }

    /// 全部状态历史，按进入时间升序
    pub async fn states(&self, id: &CheckId) -> Result<Vec<CheckState>> {
        let mut states = Vec::new();
        for (member, _) in self.store.zrange_with_scores(&keys::check_states(id)).await? {
            let seq = member
                .parse::<i64>()
                .map_err(|_| StoreError::invalid_data(format!("bad state seq for {}", id)))?;
            if let Some(state) = get_json(self.store.as_ref(), &keys::check_state(id, seq)).await? {
                states.push(state);
            }
        }
        Ok(states)
    }

    pub async fn last_notified(&self, id: &CheckId) -> Result<Option<CheckStatus>> {
        match self.store.hget(&keys::check(id), FIELD_LAST_NOTIFIED).await? {
            Some(raw) => CheckStatus::from_str(&raw)
                .map(Some)
                .map_err(StoreError::InvalidData),
            None => Ok(None),
        }
    }

    /// 标记当前状态已通知，并记录最近通知的状态
    pub async fn mark_notified(&self, id: &CheckId, alert_count: u32) -> Result<()> {
        let mut state = match self.current_state(id).await? {
            Some(state) => state,
            None => return Ok(()),
        };
        state.notified = true;
        state.last_notification_count = alert_count;
        self.save_current(id, &state).await?;
        self.store
            .hset(&keys::check(id), FIELD_LAST_NOTIFIED, state.status.as_str())
            .await
    }

    async fn add_maintenance(
        &self,
        kind: MaintenanceKind,
        id: &CheckId,
        window: &MaintenanceWindow,
    ) -> Result<()> {
        let raw = serde_json::to_string(window)?;
        self.store.zadd(&kind.key(id), window.start as f64, &raw).await
    }

    async fn maintenances(
        &self,
        kind: MaintenanceKind,
        id: &CheckId,
    ) -> Result<Vec<(String, MaintenanceWindow)>> {
        let mut windows = Vec::new();
        for (member, _) in self.store.zrange_with_scores(&kind.key(id)).await? {
            let window: MaintenanceWindow = serde_json::from_str(&member)?;
            windows.push((member, window));
        }
        Ok(windows)
    }

    async fn in_maintenance_of(&self, kind: MaintenanceKind, id: &CheckId, time: i64) -> Result<bool> {
        // 只需要开始时间不晚于 time 的窗口
        let started = self.store.zrange_by_score(&kind.key(id), f64::MIN, time as f64).await?;
        for member in started {
            let window: MaintenanceWindow = serde_json::from_str(&member)?;
            if window.covers(time) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn add_scheduled_maintenance(&self, id: &CheckId, window: &MaintenanceWindow) -> Result<()> {
        self.add_maintenance(MaintenanceKind::Scheduled, id, window).await
    }

    pub async fn add_unscheduled_maintenance(&self, id: &CheckId, window: &MaintenanceWindow) -> Result<()> {
        self.add_maintenance(MaintenanceKind::Unscheduled, id, window).await
    }

    pub async fn scheduled_maintenances(&self, id: &CheckId) -> Result<Vec<MaintenanceWindow>> {
        Ok(self
            .maintenances(MaintenanceKind::Scheduled, id)
            .await?
            .into_iter()
            .map(|(_, w)| w)
            .collect())
    }

    pub async fn unscheduled_maintenances(&self, id: &CheckId) -> Result<Vec<MaintenanceWindow>> {
        Ok(self
            .maintenances(MaintenanceKind::Unscheduled, id)
            .await?
            .into_iter()
            .map(|(_, w)| w)
            .collect())
    }

    pub async fn in_scheduled_maintenance(&self, id: &CheckId, time: i64) -> Result<bool> {
        self.in_maintenance_of(MaintenanceKind::Scheduled, id, time).await
    }

    pub async fn in_unscheduled_maintenance(&self, id: &CheckId, time: i64) -> Result<bool> {
        self.in_maintenance_of(MaintenanceKind::Unscheduled, id, time).await
    }

    pub async fn in_maintenance(&self, id: &CheckId, time: i64) -> Result<bool> {
        Ok(self.in_scheduled_maintenance(id, time).await?
            || self.in_unscheduled_maintenance(id, time).await?)
    }

    /// 将覆盖 `time` 的非计划维护窗口截止到 `time`
    pub async fn end_unscheduled_maintenance(&self, id: &CheckId, time: i64) -> Result<usize> {
        let key = MaintenanceKind::Unscheduled.key(id);
        let mut ops = Vec::new();
        for (member, mut window) in self.maintenances(MaintenanceKind::Unscheduled, id).await? {
            if !window.covers(time) {
                continue;
            }
            window.end = time;
            ops.push(StoreOp::zrem(key.clone(), member));
            ops.push(StoreOp::zadd(key.clone(), window.start as f64, serde_json::to_string(&window)?));
        }

        let ended = ops.len() / 2;
        if ended > 0 {
            self.store.transaction(ops).await?;
            debug!(check = %id, time, ended, "Unscheduled maintenance ended");
        }
        Ok(ended)
    }

    pub async fn acknowledgement(&self, id: &CheckId) -> Result<Option<Acknowledgement>> {
        get_json(self.store.as_ref(), &keys::check_acknowledgement(id)).await
    }

    pub async fn set_acknowledgement(&self, id: &CheckId, ack: &Acknowledgement) -> Result<()> {
        set_json(self.store.as_ref(), &keys::check_acknowledgement(id), ack).await
    }

    pub async fn clear_acknowledgement(&self, id: &CheckId) -> Result<()> {
        self.store.del(&keys::check_acknowledgement(id)).await
    }

    /// 当前状态在 `time` 时是否处于有效确认期
    pub async fn is_acknowledged(&self, id: &CheckId, time: i64) -> Result<bool> {
        let ack = match self.acknowledgement(id).await? {
            Some(ack) => ack,
            None => return Ok(false),
        };
        let current = self.current_state(id).await?;
        Ok(ack.is_active(time) && current.map(|s| s.status == ack.status).unwrap_or(false))
    }

    /// 检查上生成过的告警 ID
    pub async fn alerts(&self, id: &CheckId) -> Result<Vec<String>> {
        self.store.lrange(&keys::check_alerts(id), 0, -1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_core::MemoryStore;

    fn repo() -> CheckRepository {
        CheckRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_state_history() {
        let repo = repo();
        let id = CheckId::new("web-01", "HTTP");
        repo.ensure(&id).await.unwrap();
        assert!(repo.exists(&id).await.unwrap());
        assert!(repo.current_state(&id).await.unwrap().is_none());

        let seq1 = repo
            .append_state(&id, &CheckState::new(CheckStatus::Ok, "fine", None, 100))
            .await
            .unwrap();
        let seq2 = repo
            .append_state(&id, &CheckState::new(CheckStatus::Critical, "down", None, 200))
            .await
            .unwrap();
        assert_eq!((seq1, seq2), (1, 2));

        let current = repo.current_state(&id).await.unwrap().unwrap();
        assert_eq!(current.status, CheckStatus::Critical);

        let history = repo.states(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, CheckStatus::Ok);
    }

    #[tokio::test]
    async fn test_mark_notified() {
        let repo = repo();
        let id = CheckId::new("db", "LOAD");
        assert!(repo.last_notified(&id).await.unwrap().is_none());

        repo.append_state(&id, &CheckState::new(CheckStatus::Warning, "high", None, 10))
            .await
            .unwrap();
        repo.mark_notified(&id, 3).await.unwrap();

        let current = repo.current_state(&id).await.unwrap().unwrap();
        assert!(current.notified);
        assert_eq!(current.last_notification_count, 3);
        assert_eq!(repo.last_notified(&id).await.unwrap(), Some(CheckStatus::Warning));
    }

    #[tokio::test]
    async fn test_maintenance_windows() {
        let repo = repo();
        let id = CheckId::new("web-01", "HTTP");
        repo.add_scheduled_maintenance(&id, &MaintenanceWindow::new(100, 200, "patching"))
            .await
            .unwrap();

        assert!(repo.in_scheduled_maintenance(&id, 150).await.unwrap());
        assert!(!repo.in_scheduled_maintenance(&id, 200).await.unwrap());
        assert!(!repo.in_unscheduled_maintenance(&id, 150).await.unwrap());
        assert!(repo.in_maintenance(&id, 150).await.unwrap());
    }

    #[tokio::test]
    async fn test_end_unscheduled_maintenance() {
        let repo = repo();
        let id = CheckId::new("web-01", "HTTP");
        repo.add_unscheduled_maintenance(&id, &MaintenanceWindow::new(100, 1000, "investigating"))
            .await
            .unwrap();
        repo.add_unscheduled_maintenance(&id, &MaintenanceWindow::new(2000, 3000, "later"))
            .await
            .unwrap();

        assert_eq!(repo.end_unscheduled_maintenance(&id, 400).await.unwrap(), 1);
        assert!(!repo.in_unscheduled_maintenance(&id, 500).await.unwrap());

        let windows = repo.unscheduled_maintenances(&id).await.unwrap();
        assert_eq!(windows[0].end, 400);
        assert_eq!(windows[1].end, 3000);
    }

    #[tokio::test]
    async fn test_acknowledgement_follows_current_state() {
        let repo = repo();
        let id = CheckId::new("web-01", "HTTP");
        repo.append_state(&id, &CheckState::new(CheckStatus::Critical, "down", None, 100))
            .await
            .unwrap();
        repo.set_acknowledgement(
            &id,
            &Acknowledgement {
                status: CheckStatus::Critical,
                expires_at: 500,
                summary: "on it".to_string(),
                acknowledgement_id: None,
            },
        )
        .await
        .unwrap();

        assert!(repo.is_acknowledged(&id, 200).await.unwrap());
        // 过期后不再生效
        assert!(!repo.is_acknowledged(&id, 500).await.unwrap());

        repo.clear_acknowledgement(&id).await.unwrap();
        assert!(!repo.is_acknowledged(&id, 200).await.unwrap());
    }
}

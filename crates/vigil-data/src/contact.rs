use std::collections::HashSet;
use std::str::FromStr;

use tracing::{debug, warn};
use vigil_core::store::{get_json, set_json};
use vigil_core::{keys, Result, SharedStore};
use vigil_types::{CheckId, Contact, MediumType};

/// 联系人数据访问
///
/// 联系人由外部 API 写入，这里负责读取、关联以及维护每个媒介的告警检查集合。
#[derive(Clone)]
pub struct ContactRepository {
    store: SharedStore,
}

impl ContactRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn save(&self, contact: &Contact) -> Result<()> {
        set_json(self.store.as_ref(), &keys::contact(&contact.id), contact).await?;
        debug!(contact_id = %contact.id, media = contact.media.len(), "Contact saved");
        Ok(())
    }

    pub async fn get(&self, contact_id: &str) -> Result<Option<Contact>> {
        get_json(self.store.as_ref(), &keys::contact(contact_id)).await
    }

    async fn link(&self, key: &str, contact_id: &str) -> Result<()> {
        let linked = self.store.lrange(key, 0, -1).await?;
        if !linked.iter().any(|c| c == contact_id) {
            self.store.rpush(key, contact_id).await?;
        }
        Ok(())
    }

    /// 关联到单个检查
    pub async fn link_check(&self, id: &CheckId, contact_id: &str) -> Result<()> {
        self.link(&keys::check_contacts(id), contact_id).await
    }

    /// 关联到实体下的全部检查
    pub async fn link_entity(&self, entity: &str, contact_id: &str) -> Result<()> {
        self.link(&keys::entity_contacts(entity), contact_id).await
    }

    /// 检查的联系人：先检查级再实体级，按关联顺序去重
    pub async fn contacts_for(&self, id: &CheckId) -> Result<Vec<Contact>> {
        let mut ids = self.store.lrange(&keys::check_contacts(id), 0, -1).await?;
        ids.extend(self.store.lrange(&keys::entity_contacts(&id.entity), 0, -1).await?);

        let mut seen = HashSet::new();
        let mut contacts = Vec::new();
        for contact_id in ids {
            if !seen.insert(contact_id.clone()) {
                continue;
            }
            match self.get(&contact_id).await? {
                Some(contact) => contacts.push(contact),
                None => warn!(check = %id, contact_id = %contact_id, "Linked contact not found"),
            }
        }
        Ok(contacts)
    }

    /// 媒介上当前告警中的检查
    pub async fn alerting_checks(&self, contact_id: &str, medium: MediumType) -> Result<Vec<CheckId>> {
        let members = self
            .store
            .smembers(&keys::medium_alerting_checks(contact_id, medium))
            .await?;

        let mut checks = Vec::with_capacity(members.len());
        for member in members {
            match CheckId::from_str(&member) {
                Ok(id) => checks.push(id),
                Err(e) => warn!(contact_id = %contact_id, medium = %medium, "Skipping {}", e),
            }
        }
        Ok(checks)
    }

    pub async fn add_alerting_check(&self, contact_id: &str, medium: MediumType, id: &CheckId) -> Result<bool> {
        self.store
            .sadd(&keys::medium_alerting_checks(contact_id, medium), &id.to_string())
            .await
    }

    pub async fn remove_alerting_check(&self, contact_id: &str, medium: MediumType, id: &CheckId) -> Result<bool> {
        self.store
            .srem(&keys::medium_alerting_checks(contact_id, medium), &id.to_string())
            .await
    }

    /// 媒介上生成过的告警 ID
    pub async fn medium_alerts(&self, contact_id: &str, medium: MediumType) -> Result<Vec<String>> {
        self.store
            .lrange(&keys::medium_alerts(contact_id, medium), 0, -1)
            .await
    }
}

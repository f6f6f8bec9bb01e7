use std::sync::Arc;
use vigil_core::MemoryStore;
use vigil_data::{CheckRepository, StateMachine, StateUpdate};
use vigil_types::Event;

pub fn repo() -> CheckRepository {
    CheckRepository::new(Arc::new(MemoryStore::new()))
}

pub fn service(state: &str, time: i64) -> Event {
    Event::parse(&format!(
        r#"{{"entity":"web","check":"HTTP","type":"service","state":"{}","summary":"s","time":{}}}"#,
        state, time
    ))
    .unwrap()
}

pub fn action(state: &str, time: i64) -> Event {
    Event::parse(&format!(
        r#"{{"entity":"web","check":"HTTP","type":"action","state":"{}","time":{},"duration":600}}"#,
        state, time
    ))
    .unwrap()
}

/// 按顺序喂入事件，返回最后一个事件的状态更新
pub async fn feed(checks: &CheckRepository, events: &[Event]) -> StateUpdate {
    let machine = StateMachine::new(checks.clone());
    let mut last = None;
    for event in events {
        last = Some(machine.update(event).await.unwrap());
    }
    last.expect("at least one event")
}

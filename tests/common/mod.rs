#![allow(dead_code)]

use acme_console::domain::model::{Notice, UnauthorizedPolicy, View};
use acme_console::domain::ports::{Navigator, Notifier};
use acme_console::{ApiClient, ApiSettings, MemoryTokenStore, SessionService};
use std::sync::{Arc, Mutex};

/// Records notices and navigations in the order they happen.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Navigator for EventLog {
    fn navigate(&self, view: View) {
        self.push(format!("navigate:{}", view));
    }
}

impl Notifier for EventLog {
    fn notify(&self, notice: &Notice) {
        self.push(format!("notice:{}", notice.title()));
    }
}

pub struct Harness {
    pub store: Arc<MemoryTokenStore>,
    pub log: Arc<EventLog>,
    pub session: Arc<SessionService>,
    pub api: Arc<ApiClient>,
}

pub fn harness(base_url: &str, policy: UnauthorizedPolicy) -> Harness {
    let store = Arc::new(MemoryTokenStore::new());
    let log = Arc::new(EventLog::default());
    let session = Arc::new(SessionService::new(store.clone(), log.clone(), log.clone()));
    let api = Arc::new(
        ApiClient::new(ApiSettings::new(base_url).with_policy(policy), session.clone()).unwrap(),
    );

    Harness {
        store,
        log,
        session,
        api,
    }
}

//! Scripted collaborators shared by the engine and worker tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pinpost_publisher::{PublishOutcome, Publisher};
use pinpost_store::{NewPin, PinStore, ScheduledPin, SqlitePinStore, StoreError};

/// A pin that became due a minute ago.
pub fn due_pin(image_url: &str) -> NewPin {
    NewPin::new(
        "pina_token",
        "b1",
        image_url,
        Utc::now() - chrono::Duration::minutes(1),
    )
    .unwrap()
}

/// Succeeds unless the pin's image URL is in `fail_urls`; records every call.
pub struct ScriptedPublisher {
    fail_urls: HashSet<String>,
    reason: String,
    delay: Option<Duration>,
    calls: Mutex<Vec<i64>>,
}

impl ScriptedPublisher {
    pub fn succeeding() -> Self {
        Self::failing_on(&[], "")
    }

    pub fn failing_on(urls: &[&str], reason: &str) -> Self {
        Self {
            fail_urls: urls.iter().map(|u| u.to_string()).collect(),
            reason: reason.to_string(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn publish(&self, pin: &ScheduledPin) -> PublishOutcome {
        self.calls.lock().unwrap().push(pin.id);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_urls.contains(&pin.image_url) {
            PublishOutcome::Failed {
                reason: self.reason.clone(),
            }
        } else {
            PublishOutcome::Published {
                external_id: format!("ext-{}", pin.id),
            }
        }
    }
}

/// Records a violation whenever it is asked to publish while an earlier
/// publish has not yet been marked posted.
pub struct OrderCheckingPublisher {
    store: Arc<SqlitePinStore>,
    published: Mutex<Vec<i64>>,
    violations: Mutex<Vec<String>>,
}

impl OrderCheckingPublisher {
    pub fn new(store: Arc<SqlitePinStore>) -> Self {
        Self {
            store,
            published: Mutex::new(Vec::new()),
            violations: Mutex::new(Vec::new()),
        }
    }

    pub fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for OrderCheckingPublisher {
    fn name(&self) -> &str {
        "order-checking"
    }

    async fn publish(&self, pin: &ScheduledPin) -> PublishOutcome {
        let earlier = self.published.lock().unwrap().clone();
        for id in earlier {
            let posted = matches!(self.store.get(id).await, Ok(Some(p)) if p.posted);
            if !posted {
                self.violations
                    .lock()
                    .unwrap()
                    .push(format!("pin {} published before pin {id} was persisted", pin.id));
            }
        }
        self.published.lock().unwrap().push(pin.id);
        PublishOutcome::Published {
            external_id: format!("ext-{}", pin.id),
        }
    }
}

/// In-memory SQLite store with switchable failures.
pub struct FlakyStore {
    inner: SqlitePinStore,
    fail_fetch: bool,
    fail_mark: Mutex<HashSet<i64>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqlitePinStore::open_in_memory().unwrap(),
            fail_fetch: false,
            fail_mark: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn fail_mark_for(&self, id: i64) {
        self.fail_mark.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl PinStore for FlakyStore {
    async fn insert(&self, pin: &NewPin) -> pinpost_store::Result<i64> {
        self.inner.insert(pin).await
    }

    async fn get(&self, id: i64) -> pinpost_store::Result<Option<ScheduledPin>> {
        self.inner.get(id).await
    }

    async fn fetch_due(&self, now: DateTime<Utc>) -> pinpost_store::Result<Vec<ScheduledPin>> {
        if self.fail_fetch {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.fetch_due(now).await
    }

    async fn mark_posted(&self, id: i64) -> pinpost_store::Result<bool> {
        if self.fail_mark.lock().unwrap().contains(&id) {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.mark_posted(id).await
    }
}

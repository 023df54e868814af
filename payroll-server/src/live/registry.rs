//! Connection registry
//!
//! Sole owner of live WebSocket connections. Every mutation goes through one
//! mutex; each connection is served by its own task, which drains an mpsc
//! channel fed by the registry. Sends never block: a full or closed channel
//! is reported as a [`DeliveryFailure`] and never affects other recipients.
//!
//! ```text
//! HTTP handler ── Notifier ── broadcast(predicate) ──┐
//!                                                     ▼
//!                 ConnectionRegistry { connections, by_user }
//!                    │ mpsc::Sender<Outbound> per connection
//!                    ▼
//!                 ws session task ── sink ── client
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use shared::NotificationEvent;
use shared::models::Role;
use shared::util::now_millis;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

pub type ConnectionId = u64;

/// Frames queued for a connection's session task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Pre-serialized JSON event
    Event(Arc<str>),
    /// Keepalive ping
    Ping,
    /// Close the socket (evicted)
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("connection {0} is not open")]
    NotConnected(ConnectionId),

    #[error("connection {0} outbound buffer is full")]
    BufferFull(ConnectionId),

    #[error("no tracked connection for user {0}")]
    UserOffline(i64),

    #[error("event encoding failed: {0}")]
    Encode(String),
}

/// Snapshot of a connection's attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub user_id: Option<i64>,
    pub role: Option<Role>,
    pub opened_at: i64,
    pub last_pong_at: i64,
}

impl ConnectionInfo {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Returned by [`ConnectionRegistry::register`]; the session task owns `rx`
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    pub rx: mpsc::Receiver<Outbound>,
    /// Connection previously tracked for the same user, now superseded
    pub superseded: Option<ConnectionId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<ConnectionId>,
    pub failed: Vec<(ConnectionId, DeliveryFailure)>,
}

impl BroadcastReport {
    pub fn matched(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub pinged: usize,
    pub evicted: Vec<ConnectionId>,
}

struct Entry {
    info: ConnectionInfo,
    tx: mpsc::Sender<Outbound>,
    missed_pongs: u32,
    /// False once a newer connection registered for the same user
    tracked: bool,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Entry>,
    /// user_id → newest connection (last write wins)
    by_user: HashMap<i64, ConnectionId>,
}

impl Inner {
    fn remove(&mut self, id: ConnectionId) -> Option<Entry> {
        let entry = self.connections.remove(&id)?;
        if let Some(user_id) = entry.info.user_id
            && self.by_user.get(&user_id) == Some(&id)
        {
            self.by_user.remove(&user_id);
        }
        Some(entry)
    }
}

pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
    buffer: usize,
}

impl ConnectionRegistry {
    /// `buffer` is the per-connection outbound queue length
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Track a freshly upgraded connection.
    ///
    /// An authenticated user's newest connection replaces the previous map
    /// entry. The superseded connection stays open but stops receiving
    /// user-targeted and broadcast events, and its later deregistration
    /// leaves the newer entry in place.
    pub fn register(&self, user_id: Option<i64>, role: Option<Role>) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        let now = now_millis();
        let entry = Entry {
            info: ConnectionInfo {
                id,
                user_id,
                role,
                opened_at: now,
                last_pong_at: now,
            },
            tx,
            missed_pongs: 0,
            tracked: true,
        };

        let mut inner = self.inner.lock();
        let superseded = user_id.and_then(|uid| inner.by_user.insert(uid, id));
        if let Some(old) = superseded
            && let Some(old_entry) = inner.connections.get_mut(&old)
        {
            old_entry.tracked = false;
        }
        inner.connections.insert(id, entry);
        drop(inner);

        if let Some(old) = superseded {
            tracing::debug!(
                connection_id = id,
                superseded = old,
                user_id = ?user_id,
                "Newer connection replaces tracked entry"
            );
        }
        tracing::info!(connection_id = id, user_id = ?user_id, role = ?role, "Connection registered");

        Registration { id, rx, superseded }
    }

    /// Forget a connection; returns its info if it was still registered
    pub fn deregister(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        let entry = self.inner.lock().remove(id)?;
        tracing::info!(connection_id = id, user_id = ?entry.info.user_id, "Connection deregistered");
        Some(entry.info)
    }

    /// The tracked connection of a user
    pub fn lookup(&self, user_id: i64) -> Option<ConnectionInfo> {
        let inner = self.inner.lock();
        let id = inner.by_user.get(&user_id)?;
        inner.connections.get(id).map(|e| e.info.clone())
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.inner.lock().connections.get(&id).map(|e| e.info.clone())
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.inner.lock().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue an event for one connection
    pub fn send(&self, id: ConnectionId, event: &NotificationEvent) -> Result<(), DeliveryFailure> {
        let payload = encode(event)?;
        let tx = self
            .inner
            .lock()
            .connections
            .get(&id)
            .map(|e| e.tx.clone())
            .ok_or(DeliveryFailure::NotConnected(id))?;
        deliver(id, &tx, Outbound::Event(payload))
    }

    /// Queue an event for a user's tracked connection
    pub fn send_to_user(
        &self,
        user_id: i64,
        event: &NotificationEvent,
    ) -> Result<ConnectionId, DeliveryFailure> {
        let payload = encode(event)?;
        let (id, tx) = {
            let inner = self.inner.lock();
            let id = *inner
                .by_user
                .get(&user_id)
                .ok_or(DeliveryFailure::UserOffline(user_id))?;
            let tx = inner
                .connections
                .get(&id)
                .map(|e| e.tx.clone())
                .ok_or(DeliveryFailure::NotConnected(id))?;
            (id, tx)
        };
        deliver(id, &tx, Outbound::Event(payload))?;
        Ok(id)
    }

    /// Queue an event for every tracked connection matching `predicate`.
    ///
    /// Targets are snapshotted under the lock and delivered after it is
    /// released; each delivery is independent of the others.
    pub fn broadcast<F>(&self, predicate: F, event: &NotificationEvent) -> BroadcastReport
    where
        F: Fn(&ConnectionInfo) -> bool,
    {
        let mut report = BroadcastReport::default();
        let payload = match encode(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(kind = event.kind(), error = %e, "Broadcast aborted");
                return report;
            }
        };

        let targets: Vec<(ConnectionId, mpsc::Sender<Outbound>)> = {
            let inner = self.inner.lock();
            inner
                .connections
                .values()
                .filter(|e| e.tracked && predicate(&e.info))
                .map(|e| (e.info.id, e.tx.clone()))
                .collect()
        };

        for (id, tx) in targets {
            match deliver(id, &tx, Outbound::Event(payload.clone())) {
                Ok(()) => report.delivered.push(id),
                Err(failure) => {
                    tracing::warn!(connection_id = id, kind = event.kind(), error = %failure, "Delivery failed");
                    report.failed.push((id, failure));
                }
            }
        }

        tracing::debug!(
            kind = event.kind(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Broadcast complete"
        );
        report
    }

    /// Liveness acknowledgement (pong frame or heartbeat message)
    pub fn record_pong(&self, id: ConnectionId) {
        if let Some(entry) = self.inner.lock().connections.get_mut(&id) {
            entry.missed_pongs = 0;
            entry.info.last_pong_at = now_millis();
        }
    }

    /// One keepalive cycle: ping every connection and evict those that
    /// left `max_missed` pings unanswered (0 disables eviction). Connections
    /// whose session task is gone are dropped as well.
    pub fn sweep(&self, max_missed: u32) -> SweepReport {
        let mut report = SweepReport::default();
        let mut inner = self.inner.lock();

        let ids: Vec<ConnectionId> = inner.connections.keys().copied().collect();
        for id in ids {
            let Some(entry) = inner.connections.get_mut(&id) else {
                continue;
            };
            if max_missed > 0 && entry.missed_pongs >= max_missed {
                let _ = entry.tx.try_send(Outbound::Close);
                inner.remove(id);
                report.evicted.push(id);
                continue;
            }
            match entry.tx.try_send(Outbound::Ping) {
                Ok(()) => {
                    entry.missed_pongs += 1;
                    report.pinged += 1;
                }
                // A saturated queue is not proof of death; count the miss
                Err(TrySendError::Full(_)) => entry.missed_pongs += 1,
                Err(TrySendError::Closed(_)) => {
                    inner.remove(id);
                    report.evicted.push(id);
                }
            }
        }
        drop(inner);

        for id in &report.evicted {
            tracing::warn!(connection_id = *id, "Connection evicted after missed keepalives");
        }
        report
    }

    /// Run [`sweep`](Self::sweep) every `interval`
    pub fn spawn_keepalive(self: &Arc<Self>, interval: Duration, max_missed: u32) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip immediate
            loop {
                ticker.tick().await;
                registry.sweep(max_missed);
            }
        })
    }
}

fn encode(event: &NotificationEvent) -> Result<Arc<str>, DeliveryFailure> {
    serde_json::to_string(event)
        .map(Arc::from)
        .map_err(|e| DeliveryFailure::Encode(e.to_string()))
}

fn deliver(
    id: ConnectionId,
    tx: &mpsc::Sender<Outbound>,
    frame: Outbound,
) -> Result<(), DeliveryFailure> {
    tx.try_send(frame).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryFailure::BufferFull(id),
        TrySendError::Closed(_) => DeliveryFailure::NotConnected(id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NotificationEvent {
        NotificationEvent::ComplaintDeleted { complaint_id: 1 }
    }

    fn is_admin(c: &ConnectionInfo) -> bool {
        c.role == Some(Role::Admin)
    }

    #[tokio::test]
    async fn register_lookup_deregister() {
        let registry = ConnectionRegistry::new(8);
        let reg = registry.register(Some(7), Some(Role::Employee));
        assert_eq!(registry.lookup(7).unwrap().id, reg.id);
        assert_eq!(registry.len(), 1);

        let info = registry.deregister(reg.id).unwrap();
        assert_eq!(info.user_id, Some(7));
        assert!(registry.lookup(7).is_none());
        assert!(registry.is_empty());
        assert!(registry.deregister(reg.id).is_none());
    }

    #[tokio::test]
    async fn send_to_closed_connection_reports_failure() {
        let registry = ConnectionRegistry::new(8);
        let reg = registry.register(None, None);
        drop(reg.rx);
        assert_eq!(
            registry.send(reg.id, &event()),
            Err(DeliveryFailure::NotConnected(reg.id))
        );
        assert_eq!(
            registry.send(999, &event()),
            Err(DeliveryFailure::NotConnected(999))
        );
    }

    #[tokio::test]
    async fn broadcast_skips_failed_connection() {
        let registry = ConnectionRegistry::new(8);
        let mut a = registry.register(Some(1), Some(Role::Admin));
        let b = registry.register(Some(2), Some(Role::Admin));
        let mut c = registry.register(Some(3), Some(Role::Admin));
        let mut emp = registry.register(Some(4), Some(Role::Employee));
        drop(b.rx);

        let report = registry.broadcast(is_admin, &event());
        assert_eq!(report.matched(), 3);
        assert_eq!(report.failed, vec![(b.id, DeliveryFailure::NotConnected(b.id))]);
        assert!(report.delivered.contains(&a.id));
        assert!(report.delivered.contains(&c.id));

        let expected = Outbound::Event(Arc::from(r#"{"type":"COMPLAINT_DELETED","complaintId":1}"#));
        assert_eq!(a.rx.try_recv().unwrap(), expected);
        assert_eq!(c.rx.try_recv().unwrap(), expected);
        assert!(emp.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_buffer_does_not_block_others() {
        let registry = ConnectionRegistry::new(1);
        let slow = registry.register(Some(1), Some(Role::Admin));
        let mut fast = registry.register(Some(2), Some(Role::Admin));

        registry.broadcast(is_admin, &event());
        fast.rx.try_recv().unwrap();
        let report = registry.broadcast(is_admin, &event());
        assert_eq!(report.failed, vec![(slow.id, DeliveryFailure::BufferFull(slow.id))]);
        assert_eq!(report.delivered, vec![fast.id]);
    }

    #[tokio::test]
    async fn last_write_wins_per_user() {
        let registry = ConnectionRegistry::new(8);
        let mut first = registry.register(Some(5), Some(Role::Admin));
        let mut second = registry.register(Some(5), Some(Role::Admin));
        assert_eq!(second.superseded, Some(first.id));
        assert_eq!(registry.lookup(5).unwrap().id, second.id);

        assert_eq!(registry.send_to_user(5, &event()), Ok(second.id));
        assert!(second.rx.try_recv().is_ok());
        assert!(first.rx.try_recv().is_err());

        // Superseded connection is excluded from broadcasts
        let report = registry.broadcast(is_admin, &event());
        assert_eq!(report.delivered, vec![second.id]);
        assert!(first.rx.try_recv().is_err());

        // Closing the stale socket keeps the newer entry
        registry.deregister(first.id);
        assert_eq!(registry.lookup(5).unwrap().id, second.id);
    }

    #[tokio::test]
    async fn anonymous_connections_never_match_role_predicates() {
        let registry = ConnectionRegistry::new(8);
        let mut anon = registry.register(None, None);
        let report = registry.broadcast(is_admin, &event());
        assert_eq!(report.matched(), 0);
        assert!(anon.rx.try_recv().is_err());
        assert!(!registry.get(anon.id).unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn sweep_evicts_after_missed_pongs() {
        let registry = ConnectionRegistry::new(8);
        let mut alive = registry.register(Some(1), Some(Role::Admin));
        let mut dead = registry.register(Some(2), Some(Role::Admin));

        for _ in 0..2 {
            let report = registry.sweep(2);
            assert_eq!(report.pinged, 2);
            assert!(report.evicted.is_empty());
            assert_eq!(alive.rx.try_recv().unwrap(), Outbound::Ping);
            assert_eq!(dead.rx.try_recv().unwrap(), Outbound::Ping);
            registry.record_pong(alive.id);
        }

        let report = registry.sweep(2);
        assert_eq!(report.evicted, vec![dead.id]);
        assert_eq!(dead.rx.try_recv().unwrap(), Outbound::Close);
        assert!(registry.lookup(2).is_none());
        assert!(registry.lookup(1).is_some());
    }

    #[tokio::test]
    async fn sweep_without_limit_never_evicts() {
        let registry = ConnectionRegistry::new(64);
        let reg = registry.register(Some(1), None);
        for _ in 0..10 {
            assert!(registry.sweep(0).evicted.is_empty());
        }
        assert!(registry.get(reg.id).is_some());
    }

    #[tokio::test]
    async fn sweep_drops_connections_whose_task_is_gone() {
        let registry = ConnectionRegistry::new(8);
        let reg = registry.register(Some(1), None);
        drop(reg.rx);
        assert_eq!(registry.sweep(0).evicted, vec![reg.id]);
        assert!(registry.is_empty());
    }
}

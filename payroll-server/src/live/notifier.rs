//! Complaint notifications for admin connections
//!
//! Routes call these methods after the mutation is persisted, passing the
//! hydrated complaint. Delivery is fire-and-forget: failures are logged by
//! the registry and never reach the originating request.

use std::collections::HashSet;
use std::sync::Arc;

use shared::NotificationEvent;
use shared::models::{ComplaintWithEmployee, Role};

use super::registry::{BroadcastReport, ConnectionRegistry};
use crate::db::PayrollStore;

#[derive(Clone)]
pub struct Notifier {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn PayrollStore>,
}

impl Notifier {
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn PayrollStore>) -> Self {
        Self { registry, store }
    }

    /// Broadcast to every live connection of an active admin account.
    ///
    /// The audience comes from storage; if it cannot be read, the role
    /// captured in each connection's session is used instead.
    pub async fn notify_admins(&self, event: &NotificationEvent) -> BroadcastReport {
        match self.store.admin_user_ids().await {
            Ok(ids) => {
                let admins: HashSet<i64> = ids.into_iter().collect();
                self.registry
                    .broadcast(|c| c.user_id.is_some_and(|id| admins.contains(&id)), event)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Admin lookup failed, using session roles");
                self.registry
                    .broadcast(|c| c.is_authenticated() && c.role == Some(Role::Admin), event)
            }
        }
    }

    pub async fn complaint_created(&self, complaint: ComplaintWithEmployee) -> BroadcastReport {
        tracing::info!(complaint_id = complaint.complaint.id, "Notifying admins of new complaint");
        self.notify_admins(&NotificationEvent::NewComplaint {
            complaint: Box::new(complaint),
            user_role: Role::Admin,
        })
        .await
    }

    pub async fn complaint_updated(&self, complaint: ComplaintWithEmployee) -> BroadcastReport {
        self.notify_admins(&NotificationEvent::ComplaintUpdated {
            complaint: Box::new(complaint),
        })
        .await
    }

    pub async fn complaint_deleted(&self, complaint_id: i64) -> BroadcastReport {
        self.notify_admins(&NotificationEvent::ComplaintDeleted { complaint_id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewUser};
    use crate::live::Outbound;

    async fn user(store: &MemoryStore, matricule: &str, role: Role) -> i64 {
        store
            .create_user(NewUser {
                matricule: matricule.into(),
                password_hash: String::new(),
                role,
                first_name: "F".into(),
                last_name: "L".into(),
                phone: None,
                email: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn only_admin_accounts_are_notified() {
        let store = Arc::new(MemoryStore::new());
        let admin = user(&store, "ADM1", Role::Admin).await;
        let employee = user(&store, "EMP1", Role::Employee).await;

        let registry = Arc::new(ConnectionRegistry::new(8));
        let notifier = Notifier::new(registry.clone(), store);

        let mut admin_conn = registry.register(Some(admin), Some(Role::Admin));
        let mut employee_conn = registry.register(Some(employee), Some(Role::Employee));
        let mut anonymous = registry.register(None, None);

        let report = notifier.complaint_deleted(12).await;
        assert_eq!(report.delivered, vec![admin_conn.id]);

        match admin_conn.rx.try_recv().unwrap() {
            Outbound::Event(json) => {
                assert_eq!(&*json, r#"{"type":"COMPLAINT_DELETED","complaintId":12}"#)
            }
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(employee_conn.rx.try_recv().is_err());
        assert!(anonymous.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn no_admin_online_is_not_an_error() {
        let store = Arc::new(MemoryStore::new());
        user(&store, "ADM1", Role::Admin).await;
        let registry = Arc::new(ConnectionRegistry::new(8));
        let notifier = Notifier::new(registry, store);
        assert_eq!(notifier.complaint_deleted(1).await.matched(), 0);
    }
}

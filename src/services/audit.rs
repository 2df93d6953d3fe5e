use crate::db::Store;
use crate::domain::events::AuditEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

/// Consumes audit events from the broadcast bus and appends them to the
/// audit trail. Runs off the request path; the primary request never waits
/// for, or fails on, an audit write.
pub struct AuditService {
    store: Store,
    event_bus: broadcast::Sender<AuditEvent>,
}

impl AuditService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<AuditEvent>) -> Self {
        Self { store, event_bus }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle_event(event).await {
                            error!(error = %e, "Failed to persist audit event");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        error!(count, "Audit listener lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Audit listener event bus closed");
                        break;
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: AuditEvent) -> anyhow::Result<()> {
        let metadata = serde_json::to_string(&event).ok();

        self.store
            .append_audit_log(
                event.organization_id(),
                event.user_id(),
                event.action(),
                event.severity().as_str(),
                metadata,
            )
            .await?;

        Ok(())
    }
}

/// Publish an event on the bus, swallowing the error when no listener is
/// subscribed. Callers must never fail because auditing is unavailable.
pub fn publish(event_bus: &broadcast::Sender<AuditEvent>, event: AuditEvent) {
    if event_bus.send(event).is_err() {
        tracing::debug!("Audit event dropped: no active listener");
    }
}

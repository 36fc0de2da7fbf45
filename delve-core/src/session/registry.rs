//! The research service: session spawning, lookup, and cancellation.
//!
//! Each session runs on its own tokio task and publishes snapshots through a
//! watch channel. The registry keeps handles for terminal sessions too, so a
//! completed session's final snapshot (including its report) stays queryable.

use super::events::SessionEvent;
use super::orchestrator::{SessionContext, SessionRunner};
use super::state::SessionSnapshot;
use crate::error::SessionError;
use crate::types::ReportFormat;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct SessionHandle {
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    cancel: CancellationToken,
}

/// Owns all research sessions and the components they share.
pub struct ResearchService {
    ctx: Arc<SessionContext>,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ResearchService {
    pub fn new(ctx: SessionContext) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ctx: Arc::new(ctx),
            sessions: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Spawn a new session task and return its id immediately.
    pub async fn start_session(
        &self,
        query: impl Into<String>,
        format: ReportFormat,
    ) -> Uuid {
        let query = query.into();
        let id = Uuid::new_v4();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::new(id, &query));
        let cancel = CancellationToken::new();

        let runner = SessionRunner::new(
            id,
            query.clone(),
            format,
            Arc::clone(&self.ctx),
            snapshot_tx,
            self.events.clone(),
            cancel.clone(),
        );
        tokio::spawn(runner.run().instrument(tracing::info_span!("session", %id)));

        self.sessions
            .write()
            .await
            .insert(id, SessionHandle { snapshot_rx, cancel });
        info!(session = %id, %query, "session started");
        id
    }

    /// Current snapshot of a session, terminal or not.
    pub async fn get_session(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(&id)
            .ok_or(SessionError::NotFound { id })?;
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok(snapshot)
    }

    /// Request cancellation. The session finishes its current await point and
    /// lands in `Stopped`; already-terminal sessions are unaffected.
    pub async fn stop_session(&self, id: Uuid) -> Result<(), SessionError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(&id)
            .ok_or(SessionError::NotFound { id })?;
        handle.cancel.cancel();
        Ok(())
    }

    /// Subscribe to lifecycle events from all sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshots of every known session.
    pub async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        self.sessions
            .read()
            .await
            .values()
            .map(|handle| handle.snapshot_rx.borrow().clone())
            .collect()
    }

    /// Wait until the session reaches a terminal state and return its final
    /// snapshot.
    pub async fn wait_for_terminal(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let mut rx = {
            let sessions = self.sessions.read().await;
            sessions
                .get(&id)
                .ok_or(SessionError::NotFound { id })?
                .snapshot_rx
                .clone()
        };
        loop {
            {
                let snapshot = rx.borrow();
                if snapshot.status.is_terminal() {
                    return Ok(snapshot.clone());
                }
            }
            rx.changed().await.map_err(|_| SessionError::Fatal {
                message: "session task ended without a terminal snapshot".into(),
            })?;
        }
    }

    /// Drop handles of terminal sessions; their knowledge and episodes remain
    /// in the shared stores. Returns the number removed.
    pub async fn prune_terminal(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| !handle.snapshot_rx.borrow().status.is_terminal());
        before - sessions.len()
    }
}

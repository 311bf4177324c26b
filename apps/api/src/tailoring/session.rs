//! Session state for the analyze → accept / reject workflow.
//!
//! Transitions:
//! - `start_analysis`: any phase → `Proposed` (a fresh analysis replaces the old one)
//! - `accept`: `Proposed` | `Accepted` → `Accepted` (re-accepting re-renders)
//! - `reject`: `Proposed` | `Accepted` → `Idle`, attempt + 1

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::artifacts::ArtifactPair;
use crate::tailoring::analyzer::Proposal;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No proposal to act on; run an analysis first")]
    NoProposal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Proposed {
        proposal: Proposal,
    },
    Accepted {
        proposal: Proposal,
        artifacts: ArtifactPair,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    /// Number of rejected proposals so far.
    pub attempt: u32,
    #[serde(flatten)]
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    /// Last time a request took hold of the session. Drives idle eviction.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            attempt: 0,
            phase: Phase::Idle,
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn start_analysis(&mut self, proposal: Proposal) {
        self.phase = Phase::Proposed { proposal };
    }

    /// The proposal awaiting (or already given) acceptance.
    pub fn pending_proposal(&self) -> Result<&Proposal, SessionError> {
        match &self.phase {
            Phase::Proposed { proposal } | Phase::Accepted { proposal, .. } => Ok(proposal),
            Phase::Idle => Err(SessionError::NoProposal),
        }
    }

    pub fn accept(&mut self, artifacts: ArtifactPair) -> Result<(), SessionError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        match phase {
            Phase::Proposed { proposal } | Phase::Accepted { proposal, .. } => {
                self.phase = Phase::Accepted {
                    proposal,
                    artifacts,
                };
                Ok(())
            }
            Phase::Idle => Err(SessionError::NoProposal),
        }
    }

    pub fn reject(&mut self) -> Result<u32, SessionError> {
        match self.phase {
            Phase::Idle => Err(SessionError::NoProposal),
            _ => {
                self.phase = Phase::Idle;
                self.attempt += 1;
                Ok(self.attempt)
            }
        }
    }

    pub fn artifacts(&self) -> Option<&ArtifactPair> {
        match &self.phase {
            Phase::Accepted { artifacts, .. } => Some(artifacts),
            _ => None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a session for polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: Session,
    /// An operation is in flight; `session` is the state before it started.
    pub busy: bool,
}

#[derive(Debug)]
struct SessionSlot {
    live: Arc<Mutex<Session>>,
    /// Copy of `live` as of the last released guard.
    published: StdRwLock<Session>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            live: Arc::new(Mutex::new(session.clone())),
            published: StdRwLock::new(session),
        }
    }

    fn published(&self) -> Session {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_busy(&self) -> bool {
        self.live.try_lock().is_err()
    }
}

/// Exclusive hold on a session. Dropping it publishes the session's state to readers.
#[derive(Debug)]
pub struct SessionGuard {
    session: OwnedMutexGuard<Session>,
    slot: Arc<SessionSlot>,
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        *self
            .slot
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = self.session.clone();
    }
}

/// In-memory sessions, each behind its own lock.
///
/// A session is held for the whole of an operation (including generation and
/// compiler calls), so a second mutating request against a busy session is
/// refused with `Conflict` rather than queued behind the first. Reads go through
/// `snapshot` and never wait.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionSlot>>>>,
}

impl SessionStore {
    pub async fn create(&self) -> Session {
        let session = Session::new();
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(SessionSlot::new(session.clone())));
        session
    }

    async fn slot(&self, id: Uuid) -> Result<Arc<SessionSlot>, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Exclusive access to a session, failing fast if another request holds it.
    pub async fn lock(&self, id: Uuid) -> Result<SessionGuard, AppError> {
        let slot = self.slot(id).await?;
        let mut session = slot.live.clone().try_lock_owned().map_err(|_| {
            AppError::Conflict(format!("Session {id} is busy with another operation"))
        })?;
        session.last_active_at = Utc::now();
        Ok(SessionGuard { session, slot })
    }

    /// Last published state of a session, without waiting on an in-flight operation.
    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, AppError> {
        let slot = self.slot(id).await?;
        Ok(SessionSnapshot {
            session: slot.published(),
            busy: slot.is_busy(),
        })
    }

    /// Forgets a session. Its artifact files stay on disk.
    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        if slot.is_busy() {
            return Err(AppError::Conflict(format!(
                "Session {id} is busy with another operation"
            )));
        }
        sessions.remove(&id);
        Ok(())
    }

    /// Drops every session not used for longer than `max_idle`. Busy sessions are kept.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|d| Utc::now().checked_sub_signed(d))
        else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| slot.is_busy() || slot.published().last_active_at > cutoff);
        before - sessions.len()
    }
}

/// Periodically evicts sessions idle for longer than `max_idle`.
pub fn spawn_idle_sweeper(store: SessionStore, max_idle: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let evicted = store.evict_idle(max_idle).await;
            if evicted > 0 {
                info!("Evicted {evicted} idle session(s)");
            } else {
                debug!("No idle sessions to evict");
            }
        }
    })
}

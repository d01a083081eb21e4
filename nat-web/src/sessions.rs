//! In-memory session registry with idle and finished-session eviction
//!
//! Sessions are created by an unauthenticated endpoint, so the registry
//! must not grow without bound:
//! - production services drop a session right after its submission is spawned
//! - otherwise finished sessions stay for `finished_ttl` so they can be exported
//! - unfinished sessions untouched for `idle_timeout` are dropped
//!
//! A background reaper applies the timeouts every sweep interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nat_common::config::RetentionConfig;
use nat_common::AnnotationSession;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared handle to the registry
pub type SessionMap = Arc<RwLock<SessionStore>>;

/// Timeouts applied by [`SessionStore::evict_expired`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub idle_timeout: Duration,
    pub finished_ttl: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&RetentionConfig::default())
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            finished_ttl: config.finished_ttl(),
        }
    }
}

struct Entry {
    session: AnnotationSession,
    last_touched: Instant,
}

#[derive(Default)]
pub struct SessionStore {
    entries: HashMap<Uuid, Entry>,
    evicted: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: AnnotationSession) {
        self.insert_at(session, Instant::now());
    }

    fn insert_at(&mut self, session: AnnotationSession, now: Instant) {
        self.entries.insert(
            session.id(),
            Entry {
                session,
                last_touched: now,
            },
        );
    }

    /// Read access; does not count as activity
    pub fn get(&self, id: &Uuid) -> Option<&AnnotationSession> {
        self.entries.get(id).map(|e| &e.session)
    }

    /// Mutable access for a command; refreshes the idle clock
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut AnnotationSession> {
        self.entries.get_mut(id).map(|e| {
            e.last_touched = Instant::now();
            &mut e.session
        })
    }

    /// Drop one session, counting it as evicted
    pub fn evict(&mut self, id: &Uuid) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.evicted += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finished_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.session.state().is_finished())
            .count()
    }

    /// Sessions evicted since startup
    pub fn evicted_total(&self) -> u64 {
        self.evicted
    }

    /// Drop idle and expired finished sessions as of `now`; returns how many
    pub fn evict_expired(&mut self, now: Instant, policy: &RetentionPolicy) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.last_touched);
            let limit = if entry.session.state().is_finished() {
                policy.finished_ttl
            } else {
                policy.idle_timeout
            };
            let keep = idle < limit;
            if !keep {
                debug!(session_id = %id, idle_secs = idle.as_secs(), "Evicting session");
            }
            keep
        });
        let evicted = before - self.entries.len();
        self.evicted += evicted as u64;
        evicted
    }
}

/// Periodically evict expired sessions until the runtime shuts down
pub fn spawn_session_reaper(
    sessions: SessionMap,
    policy: RetentionPolicy,
    sweep_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick.tick().await;

            let mut store = sessions.write().await;
            let evicted = store.evict_expired(Instant::now(), &policy);
            if evicted > 0 {
                info!(
                    evicted,
                    remaining = store.len(),
                    "Evicted idle or expired sessions"
                );
            }
        }
    })
}

//! Registry of external processes that are currently running.
//!
//! Every child launched by [`ProcessRunner`](super::ProcessRunner) is
//! registered here for its lifetime. The registry is the one place that can
//! stop all of them at once (application shutdown, Ctrl-C).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

static GLOBAL: Lazy<ProcessRegistry> = Lazy::new(ProcessRegistry::new);

/// Book-keeping for one live process.
#[derive(Debug)]
struct LiveProcess {
    program: String,
    pid: Option<u32>,
    started_at: Instant,
    kill: CancellationToken,
}

/// Point-in-time view of a live process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub id: u64,
    pub program: String,
    pub pid: Option<u32>,
    pub running_for: Duration,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, LiveProcess>>,
}

/// Lock-protected map of live processes. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<RegistryInner>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by default runners.
    pub fn global() -> &'static ProcessRegistry {
        &GLOBAL
    }

    /// Register a freshly spawned process.
    ///
    /// The returned guard removes the entry when dropped and exposes the
    /// token that [`terminate_all`](Self::terminate_all) cancels.
    pub fn register(&self, program: impl Into<String>, pid: Option<u32>) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let kill = CancellationToken::new();
        let program = program.into();

        tracing::trace!("Registering process #{} ({}, pid {:?})", id, program, pid);
        self.inner.live.lock().insert(
            id,
            LiveProcess {
                program,
                pid,
                started_at: Instant::now(),
                kill: kill.clone(),
            },
        );

        Registration {
            registry: self.clone(),
            id,
            kill,
        }
    }

    /// Number of live processes.
    pub fn len(&self) -> usize {
        self.inner.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of live processes, ordered by registration.
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        let live = self.inner.live.lock();
        let mut infos: Vec<ProcessInfo> = live
            .iter()
            .map(|(id, p)| ProcessInfo {
                id: *id,
                program: p.program.clone(),
                pid: p.pid,
                running_for: p.started_at.elapsed(),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Ask every live process to be killed. Returns how many were signalled.
    ///
    /// Entries stay registered until their runner has reaped the child.
    pub fn terminate_all(&self) -> usize {
        let live = self.inner.live.lock();
        for (id, process) in live.iter() {
            tracing::debug!("Terminating process #{} ({})", id, process.program);
            process.kill.cancel();
        }
        live.len()
    }

    fn unregister(&self, id: u64) {
        if self.inner.live.lock().remove(&id).is_some() {
            tracing::trace!("Unregistered process #{}", id);
        }
    }
}

/// Registration of one live process; deregisters on drop.
#[derive(Debug)]
pub struct Registration {
    registry: ProcessRegistry,
    id: u64,
    kill: CancellationToken,
}

impl Registration {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token cancelled by [`ProcessRegistry::terminate_all`].
    pub fn kill_token(&self) -> &CancellationToken {
        &self.kill
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

//! In-memory remote authority for simulation
//!
//! Issues `srv-N` ids, applies writes after a seeded latency, and fails a
//! seeded fraction of calls. Deleting a task cascades into its completions,
//! as the real store does.

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tally_cache::EntityId;
use tally_domain::{Task, TaskCompletion, TaskDefaults, TaskDraft, TaskPatch};
use tally_mutation::{Draft, Patch, RemoteError, RemoteOperation};

/// Remote store double
#[derive(Debug)]
pub struct SimBackend {
    tasks: Mutex<Vec<Task>>,
    completions: Mutex<Vec<TaskCompletion>>,
    next_id: AtomicU64,
    rng: Mutex<StdRng>,
    failure_rate: f64,
    latency: Duration,
    calls: AtomicU64,
    failures: AtomicU64,
}

impl SimBackend {
    /// Empty backend with no latency and no failures
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            failure_rate: 0.0,
            latency: Duration::ZERO,
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// With failure probability, clamped to `0.0..=1.0`
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    /// With base latency; each call adds up to half of it again as jitter
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn issue_id(&self) -> EntityId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        EntityId::server(format!("srv-{n}"))
    }

    /// Wait out the call's latency, then decide whether it fails
    async fn roll(&self, operation: &str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let (fail, rejected, jitter_ms) = {
            let mut rng = self.rng.lock();
            let max_jitter = u64::try_from(self.latency.as_millis() / 2).unwrap_or(u64::MAX);
            (
                rng.random_bool(self.failure_rate),
                rng.random_bool(0.5),
                rng.random_range(0..=max_jitter),
            )
        };

        let wait = self.latency + Duration::from_millis(jitter_ms);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        if fail {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Simulated failure of {}", operation);
            if rejected {
                return Err(RemoteError::rejected(409, format!("{operation} refused")));
            }
            return Err(RemoteError::Network(format!("{operation} lost")));
        }
        Ok(())
    }

    /// Store a task without latency or failure
    pub fn insert_task(&self, draft: &TaskDraft) -> Task {
        let task = Task {
            created_at: Some(Utc::now()),
            ..draft.build(self.issue_id(), &TaskDefaults::default())
        };
        self.tasks.lock().insert(0, task.clone());
        task
    }

    /// Record a completion of `task` without latency or failure
    pub fn complete(&self, task: &Task) -> TaskCompletion {
        let completion = TaskCompletion {
            id: self.issue_id(),
            task_id: task.id.clone(),
            points: task.points,
            completed_at: Utc::now(),
        };
        self.completions.lock().insert(0, completion.clone());
        completion
    }

    /// Authoritative task list, newest first
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Authoritative completion list, newest first
    #[must_use]
    pub fn completions(&self) -> Vec<TaskCompletion> {
        self.completions.lock().clone()
    }

    /// Remote calls served
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Remote calls that failed
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl RemoteOperation<TaskDraft, Task> for SimBackend {
    async fn call(&self, draft: TaskDraft) -> Result<Task, RemoteError> {
        self.roll("create task").await?;
        Ok(self.insert_task(&draft))
    }
}

#[async_trait::async_trait]
impl RemoteOperation<TaskPatch, Task> for SimBackend {
    async fn call(&self, patch: TaskPatch) -> Result<Task, RemoteError> {
        self.roll("update task").await?;
        let mut tasks = self.tasks.lock();
        let slot = tasks
            .iter_mut()
            .find(|task| task.id == patch.id)
            .ok_or_else(|| RemoteError::NotFound(patch.id.clone()))?;
        *slot = patch.merge(slot);
        Ok(slot.clone())
    }
}

#[async_trait::async_trait]
impl RemoteOperation<EntityId, ()> for SimBackend {
    async fn call(&self, id: EntityId) -> Result<(), RemoteError> {
        self.roll("delete task").await?;
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            return Err(RemoteError::NotFound(id));
        }
        drop(tasks);
        self.completions.lock().retain(|c| c.task_id != id);
        Ok(())
    }
}

//! Mixed-workload simulator
//!
//! Runs seeded batches of concurrent task creates, updates and deletes
//! (deletes prune completion history) through the mutation layer against a
//! [`SimBackend`], checking after every batch that:
//! - every attempt settled and was reported exactly once
//! - every touched key was invalidated
//! - with per-key serialization, no placeholder outlives its attempt
//!
//! It finishes with an authoritative refetch and checks that the cache
//! converged to the backend.

use crate::backend::SimBackend;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tally_cache::{CacheStore, Collection, EntityId};
use tally_domain::{history, keys, Frequency, Task, TaskCompletion, TaskDraft, TaskPatch};
use tally_mutation::{
    MutationConfig, MutationError, Mutations, Notification, Notifier, RemoteError, TracingNotifier,
};

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total mutation attempts
    pub operations: u64,
    /// Attempts started together in one batch
    pub batch_size: usize,
    /// Probability that a remote call fails
    pub failure_rate: f64,
    /// Base remote latency in milliseconds
    pub latency_ms: u64,
    /// Tasks the backend starts with
    pub initial_tasks: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            operations: 200,
            batch_size: 4,
            failure_rate: 0.2,
            latency_ms: 5,
            initial_tasks: 8,
        }
    }
}

/// Planned mutation
#[derive(Debug, Clone)]
enum Operation {
    Create(TaskDraft),
    Update(TaskPatch),
    Delete(EntityId),
}

/// Something the mutation layer got wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Notifications did not match settled attempts
    NotificationMismatch { batch: u64, expected: u64, actual: u64 },
    /// A touched key was not left stale after its batch
    MissingInvalidation { batch: u64, key: String },
    /// An optimistic id survived its attempt while attempts were serialized
    OrphanedPlaceholder { batch: u64, id: String },
    /// Cache differs from the backend after the final refetch
    Diverged { key: String },
}

/// Attempt counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulatorStats {
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
    pub remote_calls: u64,
    /// Task entries that differed from the backend just before the final refetch
    pub drift: u64,
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub mutation: MutationConfig,
    pub stats: SimulatorStats,
    pub violations: Vec<Violation>,
    pub elapsed_ms: u64,
}

impl SimulatorReport {
    /// Check if the run passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Tally Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Operations: {}\n", self.config.operations));
        report.push_str(&format!("Failure Rate: {:.2}\n", self.config.failure_rate));
        report.push_str(&format!("Serialized Per Key: {}\n", self.mutation.serialize_per_key));
        report.push_str(&format!("Creates: {}\n", self.stats.creates));
        report.push_str(&format!("Updates: {}\n", self.stats.updates));
        report.push_str(&format!("Deletes: {}\n", self.stats.deletes));
        report.push_str(&format!("Succeeded: {}\n", self.stats.succeeded));
        report.push_str(&format!("Failed (rolled back): {}\n", self.stats.failed));
        report.push_str(&format!("Rejected (validation): {}\n", self.stats.rejected));
        report.push_str(&format!("Remote Calls: {}\n", self.stats.remote_calls));
        report.push_str(&format!("Drift Before Refetch: {}\n", self.stats.drift));
        report.push_str(&format!("Elapsed: {}ms\n", self.elapsed_ms));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

/// Counts notifications and forwards them to the log
#[derive(Debug, Default)]
struct CountingNotifier {
    seen: AtomicU64,
    inner: TracingNotifier,
}

impl Notifier for CountingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.fetch_add(1, Ordering::Relaxed);
        self.inner.notify(notification);
    }
}

/// Run the simulator
///
/// # Errors
/// Fails only if the initial or final authoritative read fails.
pub async fn run_simulator(
    config: SimulatorConfig,
    mutation: MutationConfig,
) -> Result<SimulatorReport, RemoteError> {
    let started = Instant::now();
    let backend = Arc::new(
        SimBackend::new(config.seed)
            .with_failure_rate(config.failure_rate)
            .with_latency(Duration::from_millis(config.latency_ms)),
    );
    seed_backend(&backend, config.initial_tasks);

    let store = CacheStore::new();
    let notifier = Arc::new(CountingNotifier::default());
    let mutations = Mutations::new(store.clone())
        .with_notifier(notifier.clone())
        .with_config(mutation.clone());
    refetch(&store, &backend).await?;

    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();
    let batch_size = config.batch_size.max(1) as u64;
    let mut remaining = config.operations;
    let mut batch = 0;

    while remaining > 0 {
        batch += 1;
        let size = remaining.min(batch_size);
        remaining -= size;

        let visible = store.get::<Task>(&keys::tasks()).unwrap_or_default();
        let plan: Vec<Operation> = (0..size).map(|_| plan_operation(&mut rng, &visible)).collect();
        let notified_before = notifier.seen.load(Ordering::Relaxed);

        let outcomes = join_all(
            plan.into_iter()
                .map(|op| run_operation(&mutations, &backend, op, &mut stats)),
        )
        .await;

        let (mut succeeded, mut failed, mut rejected) = (0, 0, 0);
        for outcome in outcomes {
            match outcome {
                Ok(()) => succeeded += 1,
                Err(MutationError::Validation(_)) => rejected += 1,
                Err(_) => failed += 1,
            }
        }
        stats.succeeded += succeeded;
        stats.failed += failed;
        stats.rejected += rejected;

        let expected = failed + rejected + if mutation.notify_success { succeeded } else { 0 };
        let notified = notifier.seen.load(Ordering::Relaxed) - notified_before;
        if notified != expected {
            violations.push(Violation::NotificationMismatch {
                batch,
                expected,
                actual: notified,
            });
        }
        check_batch(&store, &mutation, batch, succeeded + failed > 0, &mut violations);
    }

    stats.drift = drift(&store, &backend);
    refetch(&store, &backend).await?;
    check_converged(&store, &backend, &mut violations);
    stats.remote_calls = backend.call_count();

    let report = SimulatorReport {
        config,
        mutation,
        stats,
        violations,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    tracing::info!(
        "Simulation finished: {} succeeded, {} failed, {} rejected, {} violations",
        report.stats.succeeded,
        report.stats.failed,
        report.stats.rejected,
        report.violations.len()
    );
    Ok(report)
}

fn seed_backend(backend: &SimBackend, count: usize) {
    for n in 0..count {
        let task = backend.insert_task(&TaskDraft::new(format!("chore {n}")).with_points(1));
        if n % 2 == 0 {
            backend.complete(&task);
        }
    }
}

/// Authoritative read of both collections
async fn refetch(store: &CacheStore, backend: &SimBackend) -> Result<(), RemoteError> {
    store
        .fetch(&keys::tasks(), || async {
            Ok::<Collection<Task>, RemoteError>(backend.tasks().into_iter().collect())
        })
        .await?;
    store
        .fetch(&keys::task_completions(), || async {
            Ok::<Collection<TaskCompletion>, RemoteError>(backend.completions().into_iter().collect())
        })
        .await?;
    Ok(())
}

fn plan_operation(rng: &mut StdRng, visible: &Collection<Task>) -> Operation {
    let target = if visible.is_empty() {
        None
    } else {
        visible.get(rng.random_range(0..visible.len())).map(|t| t.id.clone())
    };

    match (rng.random_range(0..10u8), target) {
        (0..=3, _) | (_, None) => {
            // Roughly one draft in twenty is blank and must be rejected up front.
            let title = if rng.random_bool(0.05) {
                String::new()
            } else {
                format!("chore {}", rng.random_range(0..1000u32))
            };
            let frequency = if rng.random_bool(0.5) {
                Frequency::Daily
            } else {
                Frequency::Weekly
            };
            Operation::Create(
                TaskDraft::new(title)
                    .with_points(rng.random_range(0..20))
                    .with_frequency(frequency),
            )
        }
        (4..=7, Some(id)) => Operation::Update(
            TaskPatch::new(id)
                .with_points(rng.random_range(0..20))
                .with_completed(rng.random_bool(0.5)),
        ),
        (_, Some(id)) => Operation::Delete(id),
    }
}

fn run_operation<'a>(
    mutations: &'a Mutations,
    backend: &'a SimBackend,
    op: Operation,
    stats: &mut SimulatorStats,
) -> impl std::future::Future<Output = Result<(), MutationError>> + 'a {
    let key = keys::tasks();
    match &op {
        Operation::Create(_) => stats.creates += 1,
        Operation::Update(_) => stats.updates += 1,
        Operation::Delete(_) => stats.deletes += 1,
    }

    async move {
        match op {
            Operation::Create(draft) => mutations.create_draft::<Task, _, _>(&key, backend, draft).await.map(drop),
            Operation::Update(patch) => mutations.update::<Task, _, _>(&key, backend, patch).await.map(drop),
            Operation::Delete(id) => {
                mutations
                    .delete_with_related::<Task, _, _>(&key, backend, id, &history::task_completions())
                    .await
            }
        }
    }
}

fn check_batch(
    store: &CacheStore,
    mutation: &MutationConfig,
    batch: u64,
    reached_remote: bool,
    violations: &mut Vec<Violation>,
) {
    let key = keys::tasks();
    if reached_remote && !store.is_stale(&key) {
        violations.push(Violation::MissingInvalidation {
            batch,
            key: key.to_string(),
        });
    }

    if mutation.serialize_per_key {
        for task in store.get::<Task>(&key).unwrap_or_default() {
            if task.id.is_optimistic() {
                violations.push(Violation::OrphanedPlaceholder {
                    batch,
                    id: task.id.to_string(),
                });
            }
        }
    }
}

/// Cached task entries with no identical counterpart in the backend
fn drift(store: &CacheStore, backend: &SimBackend) -> u64 {
    let authoritative = backend.tasks();
    let cached = store.get::<Task>(&keys::tasks()).unwrap_or_default();
    let stray = cached.iter().filter(|t| !authoritative.contains(t)).count();
    let missing = authoritative
        .iter()
        .filter(|t| !cached.iter().any(|c| c == *t))
        .count();
    (stray + missing) as u64
}

fn check_converged(store: &CacheStore, backend: &SimBackend, violations: &mut Vec<Violation>) {
    let tasks: Vec<Task> = store
        .get::<Task>(&keys::tasks())
        .map(|c| c.into_iter().collect())
        .unwrap_or_default();
    if tasks != backend.tasks() {
        violations.push(Violation::Diverged {
            key: keys::tasks().to_string(),
        });
    }

    let completions: Vec<TaskCompletion> = store
        .get::<TaskCompletion>(&keys::task_completions())
        .map(|c| c.into_iter().collect())
        .unwrap_or_default();
    if completions != backend.completions() {
        violations.push(Violation::Diverged {
            key: keys::task_completions().to_string(),
        });
    }
}

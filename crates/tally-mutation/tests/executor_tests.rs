//! Executor integration tests
//!
//! End-to-end create, update and delete runs against gated and scripted
//! remotes, checking what the cache shows mid-flight and after settlement.

use pretty_assertions::assert_eq;
use std::time::Duration;
use tally_cache::{CacheStore, Collection, EntityId, QueryKey};
use tally_domain::{history, keys, Task, TaskCompletion, TaskDefaults, TaskDraft, TaskPatch};
use tally_mutation::{
    DraftSynthesizer, MutationConfig, MutationError, MutationKind, NotificationKind, RemoteError,
    ValidationError,
};
use tally_test_utils::{completion, gated, saved_task, task, Harness, StubRemote};

fn tasks_in(store: &CacheStore) -> Vec<Task> {
    store
        .get::<Task>(&keys::tasks())
        .map(|c| c.into_iter().collect())
        .unwrap_or_default()
}

fn completions_in(store: &CacheStore) -> Vec<TaskCompletion> {
    store
        .get::<TaskCompletion>(&keys::task_completions())
        .map(|c| c.into_iter().collect())
        .unwrap_or_default()
}

fn with_points(mut task: Task, points: i32) -> Task {
    task.points = points;
    task
}

#[tokio::test]
async fn create_shows_placeholder_then_server_entity() {
    let h = Harness::new();
    h.seed::<Task>(&keys::tasks(), []);
    let (remote, mut gate) = gated::<TaskDraft, Task>();
    let synthesizer = DraftSynthesizer::<TaskDefaults, Task>::default();
    let key = keys::tasks();

    let (result, ()) = futures::join!(
        h.mutations.create(&key, &remote, TaskDraft::new("A"), &synthesizer),
        async {
            let draft = gate.entered().await.expect("remote called");
            let visible = tasks_in(&h.store);
            assert_eq!(visible.len(), 1);
            assert!(visible[0].id.is_optimistic());
            assert_eq!(visible[0].title, "A");
            assert_eq!(h.invalidator.total(), 0);

            gate.release(Ok(saved_task(&draft, EntityId::server("srv-1"))));
        }
    );

    let created = result.unwrap();
    assert_eq!(created.id, EntityId::server("srv-1"));
    assert_eq!(tasks_in(&h.store), vec![created]);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
    assert!(h.store.is_stale(&keys::tasks()));

    let successes = h.notifier.successes();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].title(), "Task created");
    assert_eq!(successes[0].detail, "srv-1");
}

#[tokio::test]
async fn create_keeps_placeholder_position() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("t1", "old")]);
    let (remote, mut gate) = gated::<TaskDraft, Task>();
    let synthesizer = DraftSynthesizer::<TaskDefaults, Task>::default();
    let key = keys::tasks();

    let (result, ()) = futures::join!(
        h.mutations.create(&key, &remote, TaskDraft::new("new"), &synthesizer),
        async {
            let draft = gate.entered().await.expect("remote called");
            // A second create lands in front while the first is in flight.
            h.store.set::<Task, _>(&keys::tasks(), |current| {
                let mut next = current.clone();
                next.push_front(task("t2", "newer"));
                next
            });
            gate.release(Ok(saved_task(&draft, EntityId::server("srv-1"))));
        }
    );

    result.unwrap();
    let ids: Vec<String> = tasks_in(&h.store).iter().map(|t| t.id.to_string()).collect();
    assert_eq!(ids, ["t2", "srv-1", "t1"]);
}

#[tokio::test]
async fn failed_create_removes_placeholder() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("t1", "old")]);
    let before = tasks_in(&h.store);
    let remote = StubRemote::<TaskDraft, Task>::new().then_err(RemoteError::Network("offline".into()));

    let err = h
        .mutations
        .create_draft(&keys::tasks(), &remote, TaskDraft::new("A"))
        .await
        .unwrap_err();

    assert_eq!(err.remote(), Some(&RemoteError::Network("offline".into())));
    assert!(err.is_retryable());
    assert_eq!(tasks_in(&h.store), before);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title(), "Failed to create task");
}

#[tokio::test]
async fn update_failure_rolls_back() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [with_points(task("1", "Dishes"), 5)]);
    let before = tasks_in(&h.store);
    let (remote, mut gate) = gated::<TaskPatch, Task>();
    let key = keys::tasks();

    let (result, ()) = futures::join!(
        h.mutations.update(
            &key,
            &remote,
            TaskPatch::new(EntityId::server("1")).with_points(10)
        ),
        async {
            gate.entered().await.expect("remote called");
            assert_eq!(tasks_in(&h.store)[0].points, 10);
            gate.release(Err(RemoteError::rejected(422, "points locked")));
        }
    );

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        MutationError::Remote {
            kind: MutationKind::Update,
            ..
        }
    ));
    assert_eq!(tasks_in(&h.store), before);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);

    let notifications = h.notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert_eq!(notifications[0].action, MutationKind::Update);
}

#[tokio::test]
async fn update_success_takes_server_value() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("1", "Dishes"), task("2", "Laundry")]);
    let server = with_points(task("1", "Dishes"), 7);
    let remote = StubRemote::<TaskPatch, Task>::new().then_ok(server.clone());

    let updated = h
        .mutations
        .update(&keys::tasks(), &remote, TaskPatch::new(EntityId::server("1")).with_points(6))
        .await
        .unwrap();

    assert_eq!(updated, server);
    assert_eq!(tasks_in(&h.store), vec![server, task("2", "Laundry")]);
    assert_eq!(remote.calls()[0].points, Some(6));
}

#[tokio::test]
async fn update_of_absent_id_changes_nothing() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("1", "Dishes")]);
    let before = tasks_in(&h.store);
    let remote = StubRemote::<TaskPatch, Task>::new().then_ok(task("9", "Elsewhere"));

    h.mutations
        .update(&keys::tasks(), &remote, TaskPatch::new(EntityId::server("9")).with_points(1))
        .await
        .unwrap();

    assert_eq!(tasks_in(&h.store), before);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
}

#[tokio::test]
async fn delete_with_related_prunes_history() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("p1", "Dishes")]);
    h.seed(&keys::task_completions(), [completion("h1", "p1"), completion("h2", "p2")]);
    let remote = StubRemote::<EntityId, ()>::new().then_ok(());

    h.mutations
        .delete_with_related::<Task, _, _>(
            &keys::tasks(),
            &remote,
            EntityId::server("p1"),
            &history::task_completions(),
        )
        .await
        .unwrap();

    assert_eq!(tasks_in(&h.store), vec![]);
    assert_eq!(completions_in(&h.store), vec![completion("h2", "p2")]);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
    assert_eq!(h.invalidator.count(&keys::task_completions()), 1);
}

#[tokio::test]
async fn delete_failure_restores_primary_and_history() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("p1", "Dishes")]);
    h.seed(&keys::task_completions(), [completion("h1", "p1"), completion("h2", "p2")]);
    let (remote, mut gate) = gated::<EntityId, ()>();
    let key = keys::tasks();
    let related = history::task_completions();

    let (result, ()) = futures::join!(
        h.mutations
            .delete_with_related::<Task, _, _>(&key, &remote, EntityId::server("p1"), &related),
        async {
            gate.entered().await.expect("remote called");
            assert_eq!(tasks_in(&h.store), vec![]);
            assert_eq!(completions_in(&h.store), vec![completion("h2", "p2")]);
            gate.release(Err(RemoteError::Conflict("task has pending rewards".into())));
        }
    );

    assert!(result.is_err());
    assert_eq!(tasks_in(&h.store), vec![task("p1", "Dishes")]);
    assert_eq!(
        completions_in(&h.store),
        vec![completion("h1", "p1"), completion("h2", "p2")]
    );
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
    assert_eq!(h.invalidator.count(&keys::task_completions()), 1);
}

#[tokio::test]
async fn failed_delete_lets_history_written_mid_flight_be_refetched() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("p1", "Dishes")]);
    h.seed(&keys::task_completions(), [completion("h1", "p1")]);
    let (remote, mut gate) = gated::<EntityId, ()>();
    let key = keys::tasks();
    let related = history::task_completions();

    let (result, ()) = futures::join!(
        h.mutations
            .delete_with_related::<Task, _, _>(&key, &remote, EntityId::server("p1"), &related),
        async {
            gate.entered().await.expect("remote called");
            h.store.set::<TaskCompletion, _>(&keys::task_completions(), |current| {
                tally_cache::collection::prepend(current, completion("h9", "p2"))
            });
            gate.release(Err(RemoteError::Network("connection reset".into())));
        }
    );

    assert!(result.is_err());
    assert!(h.store.is_stale(&keys::task_completions()));
    assert_eq!(h.invalidator.count(&keys::task_completions()), 1);

    let authoritative = vec![completion("h9", "p2"), completion("h1", "p1")];
    h.store
        .fetch(&keys::task_completions(), || async {
            Ok::<Collection<TaskCompletion>, RemoteError>(authoritative.iter().cloned().collect())
        })
        .await
        .unwrap();
    assert_eq!(completions_in(&h.store), authoritative);
}

#[tokio::test]
async fn delete_twice_is_quiet() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("p1", "Dishes"), task("p2", "Laundry")]);
    let remote = StubRemote::<EntityId, ()>::new().then_ok(()).then_ok(());

    for _ in 0..2 {
        h.mutations
            .delete::<Task, _>(&keys::tasks(), &remote, EntityId::server("p1"))
            .await
            .unwrap();
        assert_eq!(tasks_in(&h.store), vec![task("p2", "Laundry")]);
    }
    assert_eq!(h.invalidator.count(&keys::tasks()), 2);
}

#[tokio::test]
async fn invalid_variables_never_touch_cache() {
    let h = Harness::new();
    let remote = StubRemote::<TaskDraft, Task>::new();

    let err = h
        .mutations
        .create_draft(&keys::tasks(), &remote, TaskDraft::new("   "))
        .await
        .unwrap_err();

    assert_eq!(err, MutationError::Validation(ValidationError::MissingField("title")));
    assert!(!h.store.contains(&keys::tasks()));
    assert_eq!(remote.call_count(), 0);
    assert_eq!(h.invalidator.total(), 0);
    assert_eq!(h.notifier.errors().len(), 1);
}

#[tokio::test]
async fn placeholder_ids_cannot_be_sent_remotely() {
    let h = Harness::new();
    let placeholder = EntityId::optimistic();
    let update = StubRemote::<TaskPatch, Task>::new();
    let delete = StubRemote::<EntityId, ()>::new();

    let err = h
        .mutations
        .update(&keys::tasks(), &update, TaskPatch::new(placeholder.clone()).with_points(1))
        .await
        .unwrap_err();
    assert_eq!(err, MutationError::Validation(ValidationError::Unsaved(placeholder.clone())));

    let err = h
        .mutations
        .delete::<Task, _>(&keys::tasks(), &delete, placeholder)
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Validation(ValidationError::Unsaved(_))));
    assert_eq!(update.call_count() + delete.call_count(), 0);
}

#[tokio::test]
async fn mutation_discards_inflight_read() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("t1", "old")]);
    let ticket = h.store.begin_fetch(&keys::tasks());
    let remote = StubRemote::<TaskPatch, Task>::new().then_ok(with_points(task("t1", "old"), 3));

    h.mutations
        .update(&keys::tasks(), &remote, TaskPatch::new(EntityId::server("t1")).with_points(3))
        .await
        .unwrap();

    let stale_read = [task("t1", "old")].into_iter().collect();
    assert!(!h.store.complete_fetch::<Task>(ticket, stale_read));
    assert_eq!(tasks_in(&h.store)[0].points, 3);
}

#[tokio::test(start_paused = true)]
async fn slow_remote_times_out_and_rolls_back() {
    let h = Harness::with_config(MutationConfig::new().with_remote_timeout(Duration::from_millis(50)));
    h.seed(&keys::tasks(), [task("1", "Dishes")]);
    let before = tasks_in(&h.store);
    let (remote, _gate) = gated::<TaskPatch, Task>();

    let err = h
        .mutations
        .update(&keys::tasks(), &remote, TaskPatch::new(EntityId::server("1")).with_points(4))
        .await
        .unwrap_err();

    assert_eq!(err.remote(), Some(&RemoteError::Timeout { elapsed_ms: 50 }));
    assert_eq!(tasks_in(&h.store), before);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_update_rolls_back_and_settles() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("1", "Dishes")]);
    let before = tasks_in(&h.store);
    let (remote, mut gate) = gated::<TaskPatch, Task>();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        h.mutations.update(
            &keys::tasks(),
            &remote,
            TaskPatch::new(EntityId::server("1")).with_points(99),
        ),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(gate.entered().await.and_then(|patch| patch.points), Some(99));
    assert_eq!(tasks_in(&h.store), before);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
    assert!(h.store.is_stale(&keys::tasks()));

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].action, MutationKind::Update);
}

#[tokio::test(start_paused = true)]
async fn dropped_create_removes_placeholder() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("t1", "old")]);
    let (remote, _gate) = gated::<TaskDraft, Task>();
    let synthesizer = DraftSynthesizer::<TaskDefaults, Task>::default();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        h.mutations
            .create(&keys::tasks(), &remote, TaskDraft::new("new"), &synthesizer),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(tasks_in(&h.store), vec![task("t1", "old")]);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_delete_restores_both_collections() {
    let h = Harness::new();
    h.seed(&keys::tasks(), [task("p1", "Dishes")]);
    h.seed(&keys::task_completions(), [completion("h1", "p1")]);
    let (remote, _gate) = gated::<EntityId, ()>();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        h.mutations.delete_with_related::<Task, _, _>(
            &keys::tasks(),
            &remote,
            EntityId::server("p1"),
            &history::task_completions(),
        ),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(tasks_in(&h.store), vec![task("p1", "Dishes")]);
    assert_eq!(completions_in(&h.store), vec![completion("h1", "p1")]);
    assert_eq!(h.invalidator.count(&keys::tasks()), 1);
    assert_eq!(h.invalidator.count(&keys::task_completions()), 1);
}

#[tokio::test]
async fn serialized_key_runs_attempts_in_turn() {
    let h = Harness::with_config(MutationConfig::new().with_serialize_per_key(true));
    h.seed(&keys::tasks(), [task("1", "Dishes")]);
    let (first, mut first_gate) = gated::<TaskPatch, Task>();
    let (second, mut second_gate) = gated::<TaskPatch, Task>();
    let key = keys::tasks();

    let (a, b, ()) = futures::join!(
        h.mutations
            .update(&key, &first, TaskPatch::new(EntityId::server("1")).with_points(1)),
        h.mutations
            .update(&key, &second, TaskPatch::new(EntityId::server("1")).with_points(2)),
        async {
            first_gate.entered().await.expect("first remote called");
            tokio::task::yield_now().await;
            assert_eq!(tasks_in(&h.store)[0].points, 1);

            first_gate.release(Ok(with_points(task("1", "Dishes"), 1)));
            second_gate.entered().await.expect("second remote called");
            assert_eq!(tasks_in(&h.store)[0].points, 2);
            second_gate.release(Ok(with_points(task("1", "Dishes"), 2)));
        }
    );

    assert_eq!(a.unwrap().points, 1);
    assert_eq!(b.unwrap().points, 2);
    assert_eq!(tasks_in(&h.store)[0].points, 2);
    assert_eq!(h.invalidator.count(&key), 2);
}

#[tokio::test]
async fn related_key_left_alone_when_disabled() {
    let h = Harness::with_config(MutationConfig::new().with_invalidate_related(false));
    h.seed(&keys::tasks(), [task("p1", "Dishes")]);
    h.seed(&keys::task_completions(), [completion("h1", "p1")]);
    let remote = StubRemote::<EntityId, ()>::new().then_ok(());

    h.mutations
        .delete_with_related::<Task, _, _>(
            &keys::tasks(),
            &remote,
            EntityId::server("p1"),
            &history::task_completions(),
        )
        .await
        .unwrap();

    assert_eq!(completions_in(&h.store), vec![]);
    assert_eq!(h.invalidator.count(&keys::task_completions()), 0);
    assert!(!h.store.is_stale(&keys::task_completions()));
}

#[test]
fn keys_are_distinct() {
    assert_ne!(keys::tasks(), QueryKey::new("rewards"));
}

//! Integration tests for the update path: decision table, storage context,
//! conflicts and cancellation.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use persisted_rust::{
    FetchRequest, InMemoryPersistentStore, PersistentStoreUpdate, Predicate, RecordId,
    RequestsExt, StoreError, UpdateRequest,
};
use serde::{Deserialize, Serialize, Serializer};
use support::people::{names, AuditEntry, Person};

/// Store with Alice(20), Bob(30), Carol(25); returns their ids in order.
fn trio() -> (InMemoryPersistentStore, [RecordId; 3]) {
    support::init_tracing();
    let store = InMemoryPersistentStore::new();
    let alice = store.insert(&Person::new("Alice", 20)).unwrap();
    let bob = store.insert(&Person::new("Bob", 30)).unwrap();
    let carol = store.insert(&Person::new("Carol", 25)).unwrap();
    (store, [alice, bob, carol])
}

fn ages(store: &InMemoryPersistentStore) -> Vec<u32> {
    store
        .fetch::<Person>()
        .perform()
        .unwrap()
        .into_iter()
        .map(|p| p.age)
        .collect()
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&calls), calls)
}

// ============================================================================
// Decision table
// ============================================================================

#[test]
fn create_runs_modifier_once_on_a_new_entity() {
    let (store, _) = trio();
    let (calls, seen) = counter();

    let outcome = store
        .create::<Person>()
        .such_that(Predicate::field("name").eq("Dana"))
        .modify_entity(move |p| {
            calls.fetch_add(1, Ordering::SeqCst);
            *p = Person::new("Dana", 41);
        })
        .perform()
        .wait()
        .unwrap();

    let PersistentStoreUpdate::Created { id } = outcome else {
        panic!("expected a created outcome, got {:?}", outcome);
    };
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    let dana = store.record::<Person>(id).unwrap().unwrap();
    assert_eq!(dana.data.name, "Dana");
    assert_eq!(dana.version, 1);
    assert_eq!(store.len::<Person>().unwrap(), 4);
}

#[test]
fn update_runs_modifier_once_per_match() {
    let (store, [_, bob, carol]) = trio();
    let (calls, seen) = counter();

    let outcome = store
        .update::<Person>()
        .such_that(Predicate::field("age").ge(21))
        .modify_entity(move |p| {
            calls.fetch_add(1, Ordering::SeqCst);
            p.age += 1;
        })
        .perform()
        .wait()
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Updated { ids: vec![bob, carol] });
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(ages(&store), [20, 31, 26]);
    assert_eq!(store.len::<Person>().unwrap(), 3);
}

#[test]
fn neither_flag_leaves_matches_untouched() {
    let (store, _) = trio();
    let (calls, seen) = counter();

    let outcome = store
        .updating(
            UpdateRequest::new(FetchRequest::all(), false, false).modify_entity(move |p: &mut Person| {
                calls.fetch_add(1, Ordering::SeqCst);
                p.age = 0;
            }),
        )
        .perform()
        .wait()
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Unchanged { matched: 3 });
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    assert_eq!(ages(&store), [20, 30, 25]);
}

#[test]
fn create_with_existing_match_is_unchanged() {
    let (store, _) = trio();
    let (calls, seen) = counter();

    let outcome = store
        .create::<Person>()
        .such_that(Predicate::field("name").eq("Bob"))
        .modify_entity(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .perform()
        .wait()
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Unchanged { matched: 1 });
    assert_eq!(seen.load(Ordering::SeqCst), 0);
    assert_eq!(store.len::<Person>().unwrap(), 3);
}

#[test]
fn update_without_match_creates_nothing() {
    let (store, _) = trio();

    let outcome = store
        .update::<Person>()
        .such_that(Predicate::field("age").gt(90))
        .modify_entity(|p| p.age = 0)
        .perform()
        .wait()
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Unchanged { matched: 0 });
    assert_eq!(store.len::<Person>().unwrap(), 3);
}

#[test]
fn create_or_update_picks_the_right_branch() {
    let (store, [alice, ..]) = trio();

    let upsert = |name: &'static str, age: u32| {
        store
            .create_or_update::<Person>()
            .such_that(Predicate::field("name").eq(name))
            .modify_entity(move |p| {
                if p.name.is_empty() {
                    *p = Person::new(name, 0);
                }
                p.age = age;
            })
            .perform()
            .wait()
            .unwrap()
    };

    assert_eq!(
        upsert("Alice", 21),
        PersistentStoreUpdate::Updated { ids: vec![alice] }
    );
    assert!(matches!(upsert("Eve", 33), PersistentStoreUpdate::Created { .. }));

    let eve = store
        .fetch::<Person>()
        .such_that(Predicate::field("name").eq("Eve"))
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(eve.age, 33);
    assert_eq!(ages(&store), [21, 30, 25, 33]);
}

#[test]
fn update_honours_sort_and_limit() {
    let (store, [_, bob, _]) = trio();

    let outcome = store
        .update::<Person>()
        .sorted(Person::age_key(), false)
        .limit(1)
        .modify_entity(|p| p.age = 99)
        .perform()
        .wait()
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Updated { ids: vec![bob] });
    assert_eq!(ages(&store), [20, 99, 25]);
}

// ============================================================================
// Storage context
// ============================================================================

#[test]
fn modifier_can_insert_other_entities() {
    let (store, _) = trio();

    store
        .update::<Person>()
        .such_that(Predicate::field("age").lt(26))
        .modify(|p, ctx| {
            let entry = AuditEntry {
                message: format!("touched {} as {}", p.name, ctx.record_id()),
            };
            ctx.insert(&entry).unwrap();
        })
        .perform()
        .wait()
        .unwrap();

    let log = store.fetch::<AuditEntry>().perform().unwrap();
    assert_eq!(log.len(), 2);
    assert!(log[0].message.starts_with("touched Alice"));
}

#[test]
fn modifier_can_delete_current_and_others() {
    let (store, [alice, bob, carol]) = trio();

    let outcome = store
        .update::<Person>()
        .such_that(Predicate::field("name").eq("Alice"))
        .modify(move |_, ctx| {
            ctx.delete_current();
            ctx.delete::<Person>(carol).unwrap();
        })
        .perform()
        .wait()
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Updated { ids: vec![alice] });
    let left = store.fetch::<Person>().perform().unwrap();
    assert_eq!(names(&left), ["Bob"]);
    assert!(store.record::<Person>(bob).unwrap().is_some());
}

#[test]
fn records_deleted_earlier_in_the_update_are_skipped() {
    let (store, [alice, bob, carol]) = trio();
    let (calls, seen) = counter();

    let outcome = store
        .update::<Person>()
        .modify(move |p, ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            if p.name == "Alice" {
                ctx.delete::<Person>(bob).unwrap();
            }
        })
        .perform()
        .wait()
        .unwrap();

    assert_eq!(
        outcome,
        PersistentStoreUpdate::Updated { ids: vec![alice, carol] }
    );
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(store.len::<Person>().unwrap(), 2);
}

#[derive(Clone, Debug, Default, Deserialize, persisted_rust::Entity)]
struct Unwritable {
    note: String,
}

impl Serialize for Unwritable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("refuses to serialize"))
    }
}

#[test]
fn poisoned_context_commits_nothing() {
    let (store, _) = trio();

    let result = store
        .update::<Person>()
        .modify(|p, ctx| {
            // error deliberately ignored
            let _ = ctx.insert(&Unwritable::default());
            assert!(ctx.is_poisoned());
            assert!(ctx.insert(&AuditEntry::default()).is_err());
            p.age = 0;
        })
        .perform()
        .wait();

    assert!(matches!(result, Err(StoreError::Serde(_))));
    assert_eq!(ages(&store), [20, 30, 25]);
    assert_eq!(store.len::<AuditEntry>().unwrap(), 0);
}

// ============================================================================
// Unique keys
// ============================================================================

#[test]
fn unique_conflict_aborts_the_whole_update() {
    let (store, _) = trio();

    let result = store
        .update::<Person>()
        .modify_entity(|p| {
            p.age += 1;
            if p.name == "Carol" {
                p.email = "alice@example.com".into();
            }
        })
        .perform()
        .wait();

    assert!(matches!(result, Err(StoreError::Conflict { .. })));
    assert_eq!(ages(&store), [20, 30, 25]);
}

#[test]
fn create_with_taken_key_conflicts() {
    let (store, _) = trio();

    let result = store
        .create::<Person>()
        .such_that(Predicate::field("name").eq("Alicia"))
        .modify_entity(|p| {
            p.name = "Alicia".into();
            p.email = "alice@example.com".into();
        })
        .perform()
        .wait();

    assert!(matches!(result, Err(StoreError::Conflict { .. })));
    assert_eq!(store.len::<Person>().unwrap(), 3);
}

// ============================================================================
// Panicking modifiers
// ============================================================================

#[test]
fn panicking_modifier_fails_only_its_own_update() {
    let (store, _) = trio();

    let result = store
        .update::<Person>()
        .such_that(Predicate::field("name").eq("Bob"))
        .modify_entity(|p| {
            p.age = 0;
            panic!("boom");
        })
        .perform()
        .wait();

    match result {
        Err(StoreError::ModifierPanicked(message)) => assert!(message.contains("boom")),
        other => panic!("expected a panicked modifier, got {:?}", other),
    }
    assert_eq!(ages(&store), [20, 30, 25]);

    let next = store
        .update::<Person>()
        .such_that(Predicate::field("name").eq("Bob"))
        .modify_entity(|p| p.age = 31)
        .perform()
        .wait();
    assert!(next.is_ok());
    store.insert(&Person::new("Dana", 41)).unwrap();
    assert_eq!(ages(&store), [20, 31, 25, 41]);

    let stats = store.close().unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.committed, 5);
}

// ============================================================================
// Cancellation
// ============================================================================

/// A modifier that reports when it starts and then waits for a go signal.
fn gated() -> (
    impl Fn(&mut Person) + Send + Sync + 'static,
    mpsc::Receiver<()>,
    mpsc::Sender<()>,
) {
    let (started_tx, started_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let go_rx = Mutex::new(go_rx);
    let modifier = move |p: &mut Person| {
        let _ = started_tx.lock().unwrap().send(());
        let _ = go_rx.lock().unwrap().recv();
        p.age = 99;
    };
    (modifier, started_rx, go_tx)
}

/// Waits for every update queued so far to finish.
fn drain(store: &InMemoryPersistentStore) {
    store
        .update::<Person>()
        .such_that(Predicate::field("age").gt(1000))
        .perform()
        .wait()
        .unwrap();
}

#[test]
fn cancel_in_flight_update_persists_nothing() {
    let (store, _) = seeded_one();
    let (modifier, started, go) = gated();

    let task = store.update::<Person>().modify_entity(modifier).perform();
    started.recv().unwrap();
    task.cancel();
    go.send(()).unwrap();

    assert_eq!(task.wait(), Err(StoreError::Cancelled));
    assert_eq!(ages(&store), [40]);
}

#[test]
fn dropping_a_task_cancels_it() {
    let (store, _) = seeded_one();
    let (modifier, started, go) = gated();

    let task = store.update::<Person>().modify_entity(modifier).perform();
    started.recv().unwrap();
    drop(task);
    go.send(()).unwrap();
    drain(&store);

    assert_eq!(ages(&store), [40]);
    let stats = store.close().unwrap();
    assert_eq!(stats.cancelled, 1);
}

#[test]
fn detached_task_still_commits() {
    let (store, _) = seeded_one();
    let (modifier, started, go) = gated();

    store.update::<Person>().modify_entity(modifier).perform().detach();
    started.recv().unwrap();
    go.send(()).unwrap();
    drain(&store);

    assert_eq!(ages(&store), [99]);
}

#[test]
fn cancel_before_start_never_runs_modifier() {
    let (store, _) = seeded_one();
    let (modifier, started, go) = gated();
    let (calls, seen) = counter();

    // occupy the writer so the next update stays queued
    let blocker = store.update::<Person>().modify_entity(modifier).perform();
    started.recv().unwrap();

    let queued = store
        .update::<Person>()
        .modify_entity(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .perform();
    queued.cancel();
    go.send(()).unwrap();

    assert!(blocker.wait().is_ok());
    assert_eq!(queued.wait(), Err(StoreError::Cancelled));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[test]
fn reads_during_a_write_see_the_last_commit() {
    let (store, _) = seeded_one();
    let (modifier, started, go) = gated();

    let task = store.update::<Person>().modify_entity(modifier).perform();
    started.recv().unwrap();

    assert_eq!(ages(&store), [40]);
    assert_eq!(store.len::<Person>().unwrap(), 1);

    go.send(()).unwrap();
    assert!(task.wait().is_ok());
    assert_eq!(ages(&store), [99]);
}

fn seeded_one() -> (InMemoryPersistentStore, RecordId) {
    support::init_tracing();
    let store = InMemoryPersistentStore::new();
    let id = store.insert(&Person::new("Solo", 40)).unwrap();
    (store, id)
}

// ============================================================================
// Async
// ============================================================================

#[tokio::test]
async fn awaiting_an_update() {
    let (store, [alice, ..]) = trio();

    let outcome = store
        .update::<Person>()
        .such_that(Predicate::field("name").eq("Alice"))
        .modify_entity(|p| p.age = 21)
        .perform()
        .await
        .unwrap();

    assert_eq!(outcome, PersistentStoreUpdate::Updated { ids: vec![alice] });
}

#[tokio::test]
async fn updates_apply_in_submission_order() {
    let (store, _) = trio();

    let first = store
        .update::<Person>()
        .such_that(Predicate::field("name").eq("Bob"))
        .modify_entity(|p| p.age *= 2)
        .perform();
    let second = store
        .update::<Person>()
        .such_that(Predicate::field("name").eq("Bob"))
        .modify_entity(|p| p.age += 1)
        .perform();

    second.await.unwrap();
    first.await.unwrap();

    assert_eq!(ages(&store), [20, 61, 25]);
}

#[tokio::test]
async fn closed_store_rejects_updates() {
    let (store, _) = trio();
    store.close();

    let result = store.update::<Person>().modify_entity(|p| p.age = 0).perform().await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}

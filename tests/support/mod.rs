//! Shared fixtures for the integration suites.

#![allow(dead_code)]

pub mod people;

use std::sync::Once;

use persisted_rust::InMemoryPersistentStore;

static TRACING: Once = Once::new();

/// Route store logs to the test harness output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// A fresh store seeded with `people`, in order.
pub fn seeded(people: &[people::Person]) -> InMemoryPersistentStore {
    init_tracing();
    let store = InMemoryPersistentStore::new();
    for person in people {
        store.insert(person).unwrap();
    }
    store
}

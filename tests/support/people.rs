//! Person entity used across the suites.

use persisted_rust::Entity;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Entity)]
#[entity(collection = "people")]
pub struct Person {
    #[entity(sort)]
    pub name: String,
    #[entity(sort)]
    pub age: u32,
    #[entity(unique)]
    pub email: String,
    #[entity(sort)]
    pub group: i64,
}

impl Person {
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.to_string(),
            age,
            email: format!("{}@example.com", name.to_lowercase()),
            group: 0,
        }
    }

    pub fn in_group(mut self, group: i64) -> Self {
        self.group = group;
        self
    }
}

/// Audit trail entries written from inside modifiers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Entity)]
pub struct AuditEntry {
    pub message: String,
}

pub fn names(people: &[Person]) -> Vec<&str> {
    people.iter().map(|p| p.name.as_str()).collect()
}

//! Metadata carried by every stored record

use crate::ids::{ObjectKey, Uid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Common record metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Record name, unique within the namespace
    pub name: String,

    /// Namespace the record lives in
    pub namespace: String,

    /// Store-assigned unique id
    pub uid: Uid,

    /// Bumped by the store on every write; updates must carry the current value
    #[serde(default)]
    pub resource_version: u64,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Controlling parent, if any. Deleting the parent deletes this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerReference>,

    pub created_at: DateTime<Utc>,
}

impl ObjectMeta {
    /// Create metadata for a record that has not been stored yet
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: Uid::generate(),
            resource_version: 0,
            labels: BTreeMap::new(),
            owner: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Key of the owning record. Owners always share the child's namespace.
    pub fn owner_key(&self) -> Option<ObjectKey> {
        self.owner
            .as_ref()
            .map(|owner| ObjectKey::new(self.namespace.clone(), owner.name.clone()))
    }

    /// Whether this record is controlled by the record with the given uid
    pub fn is_owned_by(&self, uid: &Uid) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.controller && &owner.uid == uid)
    }
}

/// Link from a child record to the parent that controls it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: Uid,
    /// Only controller references take part in cascading deletion
    pub controller: bool,
}

impl OwnerReference {
    /// Build a controller reference pointing at `parent`
    pub fn controller_of(kind: impl Into<String>, parent: &ObjectMeta) -> Self {
        Self {
            kind: kind.into(),
            name: parent.name.clone(),
            uid: parent.uid,
            controller: true,
        }
    }
}

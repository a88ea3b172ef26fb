//! Live workload records
//!
//! A [`Workload`] is the replica set that runs a detector: a replica count,
//! a pod selector and a single container template.

use crate::detector::SecretKeyRef;
use crate::ids::ObjectKey;
use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replica set running one detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub metadata: ObjectMeta,
    pub spec: WorkloadSpec,
}

impl Workload {
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn replicas(&self) -> u32 {
        self.spec.replicas
    }

    pub fn image(&self) -> &str {
        &self.spec.container.image
    }

    pub fn env(&self) -> &[EnvVar] {
        &self.spec.container.env
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpec {
    pub replicas: u32,

    /// Labels a pod must carry to count as a replica
    pub selector: BTreeMap<String, String>,

    /// Labels stamped onto every pod
    pub template_labels: BTreeMap<String, String>,

    pub container: Container,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    /// Environment in start-up order
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub name: String,
    pub container_port: u16,
}

/// One environment entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(flatten)]
    pub value: EnvValue,
}

impl EnvVar {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::Literal(value.into()),
        }
    }

    pub fn from_secret(name: impl Into<String>, secret: SecretKeyRef) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::SecretKeyRef(secret),
        }
    }
}

/// Where an environment entry gets its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvValue {
    #[serde(rename = "value")]
    Literal(String),
    SecretKeyRef(SecretKeyRef),
}

impl EnvValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            EnvValue::Literal(value) => Some(value),
            EnvValue::SecretKeyRef(_) => None,
        }
    }
}

//! State comparator
//!
//! [`diff`] compares a detector with its live workload and reports only the
//! fields that disagree. Applying the resulting [`WorkloadPatch`] and diffing
//! again yields [`MutationPlan::NoChange`].

use crate::projection::project;
use pad_types::{AnomalyDetector, EnvVar, Workload};

/// Outcome of comparing desired and live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationPlan {
    /// Live state already matches
    NoChange,
    /// Fields to overwrite on the live workload
    Patch(WorkloadPatch),
}

impl MutationPlan {
    pub fn is_no_change(&self) -> bool {
        matches!(self, MutationPlan::NoChange)
    }
}

/// Diverged workload fields with their corrected values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadPatch {
    pub replicas: Option<u32>,
    pub image: Option<String>,
    pub env: Option<Vec<EnvVar>>,
}

impl WorkloadPatch {
    pub fn is_empty(&self) -> bool {
        self.replicas.is_none() && self.image.is_none() && self.env.is_none()
    }

    /// Names of the fields this patch overwrites
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.replicas.is_some() {
            fields.push("replicas");
        }
        if self.image.is_some() {
            fields.push("image");
        }
        if self.env.is_some() {
            fields.push("env");
        }
        fields
    }

    /// Overwrite the carried fields on `workload`, leaving everything else as is
    pub fn apply_to(self, workload: &mut Workload) {
        if let Some(replicas) = self.replicas {
            workload.spec.replicas = replicas;
        }
        if let Some(image) = self.image {
            workload.spec.container.image = image;
        }
        if let Some(env) = self.env {
            workload.spec.container.env = env;
        }
    }
}

/// Compare a detector with its live workload
pub fn diff(desired: &AnomalyDetector, live: &Workload) -> MutationPlan {
    let mut patch = WorkloadPatch::default();

    if live.replicas() != desired.spec.replica_count {
        patch.replicas = Some(desired.spec.replica_count);
    }

    if live.image() != desired.spec.image {
        patch.image = Some(desired.spec.image.clone());
    }

    let env = project(&desired.spec);
    if !env.matches(live.env()) {
        patch.env = Some(env.into_vec());
    }

    if patch.is_empty() {
        MutationPlan::NoChange
    } else {
        MutationPlan::Patch(patch)
    }
}

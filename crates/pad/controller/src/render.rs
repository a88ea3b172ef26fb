//! Full workload rendering for detectors that have no workload yet

use crate::projection::project;
use pad_types::{
    AnomalyDetector, Container, ContainerPort, ObjectMeta, OwnerReference, Workload, WorkloadSpec,
    DETECTOR_KIND,
};
use std::collections::BTreeMap;

pub const CONTAINER_NAME: &str = "prometheus-anomaly-detector";
pub const CONTAINER_PORT: u16 = 8080;
pub const CONTAINER_PORT_NAME: &str = "pad";

pub const APP_LABEL: &str = "app";
pub const APP_LABEL_VALUE: &str = "pad";
pub const DETECTOR_LABEL: &str = "pad_cr";

/// Labels identifying pods of one detector
pub fn detector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
        (DETECTOR_LABEL.to_string(), name.to_string()),
    ])
}

/// Build the workload a detector should have, owned by that detector.
///
/// Everything is derived from the detector alone, so rendering the same
/// detector twice yields workloads the comparator treats as equal.
pub fn render_workload(detector: &AnomalyDetector) -> Workload {
    let labels = detector_labels(detector.name());

    let metadata = ObjectMeta::new(
        detector.metadata.namespace.clone(),
        detector.metadata.name.clone(),
    )
    .with_labels(labels.clone())
    .with_owner(OwnerReference::controller_of(DETECTOR_KIND, &detector.metadata));

    Workload {
        metadata,
        spec: WorkloadSpec {
            replicas: detector.spec.replica_count,
            selector: labels.clone(),
            template_labels: labels,
            container: Container {
                name: CONTAINER_NAME.to_string(),
                image: detector.spec.image.clone(),
                ports: vec![ContainerPort {
                    name: CONTAINER_PORT_NAME.to_string(),
                    container_port: CONTAINER_PORT,
                }],
                env: project(&detector.spec).into_vec(),
            },
        },
    }
}

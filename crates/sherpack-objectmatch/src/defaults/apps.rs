//! `apps/v1` workload defaulting

use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetUpdateStrategy, Deployment, DeploymentStrategy, RollingUpdateDaemonSet,
    RollingUpdateDeployment, RollingUpdateStatefulSetStrategy, StatefulSet,
    StatefulSetPersistentVolumeClaimRetentionPolicy, StatefulSetUpdateStrategy,
};
use k8s_openapi::api::core::v1::PersistentVolumeClaimStatus;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::pod::default_pod_template;
use super::quantity::canonicalize_quantities;

const ROLLING_UPDATE: &str = "RollingUpdate";
const DEFAULT_REVISION_HISTORY_LIMIT: i32 = 10;
const DEFAULT_PROGRESS_DEADLINE_SECONDS: i32 = 600;

/// Apply the defaults the API server sets on an admitted Deployment
pub fn default_deployment(deployment: &mut Deployment) {
    let Some(spec) = deployment.spec.as_mut() else {
        return;
    };

    spec.replicas.get_or_insert(1);

    let strategy = spec.strategy.get_or_insert_with(DeploymentStrategy::default);
    let strategy_type = strategy
        .type_
        .get_or_insert_with(|| ROLLING_UPDATE.to_string());
    if strategy_type.as_str() == ROLLING_UPDATE {
        let rolling = strategy
            .rolling_update
            .get_or_insert_with(RollingUpdateDeployment::default);
        rolling
            .max_unavailable
            .get_or_insert_with(|| IntOrString::String("25%".to_string()));
        rolling
            .max_surge
            .get_or_insert_with(|| IntOrString::String("25%".to_string()));
    }

    spec.revision_history_limit.get_or_insert(DEFAULT_REVISION_HISTORY_LIMIT);
    spec.progress_deadline_seconds.get_or_insert(DEFAULT_PROGRESS_DEADLINE_SECONDS);

    default_pod_template(&mut spec.template);
}

/// Apply the defaults the API server sets on an admitted StatefulSet
pub fn default_stateful_set(stateful_set: &mut StatefulSet) {
    let Some(spec) = stateful_set.spec.as_mut() else {
        return;
    };

    spec.replicas.get_or_insert(1);
    spec.pod_management_policy.get_or_insert_with(|| "OrderedReady".to_string());

    // An explicit RollingUpdate type without parameters stays without them;
    // only an unset type brings the rollingUpdate block along.
    let strategy = spec
        .update_strategy
        .get_or_insert_with(StatefulSetUpdateStrategy::default);
    if strategy.type_.is_none() {
        strategy.type_ = Some(ROLLING_UPDATE.to_string());
        strategy
            .rolling_update
            .get_or_insert_with(RollingUpdateStatefulSetStrategy::default);
    }
    if strategy.type_.as_deref() == Some(ROLLING_UPDATE)
        && let Some(rolling) = strategy.rolling_update.as_mut()
    {
        rolling.partition.get_or_insert(0);
    }

    spec.revision_history_limit.get_or_insert(DEFAULT_REVISION_HISTORY_LIMIT);

    let retention = spec
        .persistent_volume_claim_retention_policy
        .get_or_insert_with(StatefulSetPersistentVolumeClaimRetentionPolicy::default);
    retention
        .when_deleted
        .get_or_insert_with(|| "Retain".to_string());
    retention
        .when_scaled
        .get_or_insert_with(|| "Retain".to_string());

    for claim in spec.volume_claim_templates.iter_mut().flatten() {
        if let Some(claim_spec) = claim.spec.as_mut() {
            claim_spec.volume_mode.get_or_insert_with(|| "Filesystem".to_string());
            if let Some(resources) = claim_spec.resources.as_mut() {
                for quantities in [resources.requests.as_mut(), resources.limits.as_mut()]
                    .into_iter()
                    .flatten()
                {
                    canonicalize_quantities(quantities);
                }
            }
        }
        claim
            .status
            .get_or_insert_with(PersistentVolumeClaimStatus::default)
            .phase
            .get_or_insert_with(|| "Pending".to_string());
    }

    default_pod_template(&mut spec.template);
}

/// Apply the defaults the API server sets on an admitted DaemonSet
pub fn default_daemon_set(daemon_set: &mut DaemonSet) {
    let Some(spec) = daemon_set.spec.as_mut() else {
        return;
    };

    let strategy = spec
        .update_strategy
        .get_or_insert_with(DaemonSetUpdateStrategy::default);
    let strategy_type = strategy
        .type_
        .get_or_insert_with(|| ROLLING_UPDATE.to_string());
    if strategy_type.as_str() == ROLLING_UPDATE {
        let rolling = strategy
            .rolling_update
            .get_or_insert_with(RollingUpdateDaemonSet::default);
        rolling.max_unavailable.get_or_insert(IntOrString::Int(1));
        rolling.max_surge.get_or_insert(IntOrString::Int(0));
    }

    spec.revision_history_limit.get_or_insert(DEFAULT_REVISION_HISTORY_LIMIT);

    default_pod_template(&mut spec.template);
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DaemonSetSpec, DeploymentSpec, StatefulSetSpec};
    use k8s_openapi::api::core::v1::{
        Container, PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec,
        VolumeResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn template() -> PodTemplateSpec {
        PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "app".to_string(),
                    image: Some("app:1.0".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_deployment_defaults() {
        let mut deployment = Deployment {
            spec: Some(DeploymentSpec {
                template: template(),
                ..Default::default()
            }),
            ..Default::default()
        };
        default_deployment(&mut deployment);

        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.revision_history_limit, Some(10));
        assert_eq!(spec.progress_deadline_seconds, Some(600));

        let strategy = spec.strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
        let rolling = strategy.rolling_update.unwrap();
        assert_eq!(
            rolling.max_unavailable,
            Some(IntOrString::String("25%".to_string()))
        );
        assert_eq!(rolling.max_surge, Some(IntOrString::String("25%".to_string())));

        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Always"));
    }

    #[test]
    fn test_recreate_strategy_has_no_rolling_update() {
        let mut deployment = Deployment {
            spec: Some(DeploymentSpec {
                strategy: Some(DeploymentStrategy {
                    type_: Some("Recreate".to_string()),
                    rolling_update: None,
                }),
                replicas: Some(4),
                template: template(),
                ..Default::default()
            }),
            ..Default::default()
        };
        default_deployment(&mut deployment);

        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(4));
        assert!(spec.strategy.unwrap().rolling_update.is_none());
    }

    #[test]
    fn test_deployment_without_spec() {
        let mut deployment = Deployment::default();
        default_deployment(&mut deployment);
        assert!(deployment.spec.is_none());
    }

    #[test]
    fn test_stateful_set_defaults() {
        let mut stateful_set = StatefulSet {
            metadata: ObjectMeta::default(),
            spec: Some(StatefulSetSpec {
                template: template(),
                volume_claim_templates: Some(vec![PersistentVolumeClaim {
                    metadata: ObjectMeta {
                        name: Some("data".to_string()),
                        ..Default::default()
                    },
                    spec: Some(PersistentVolumeClaimSpec {
                        resources: Some(VolumeResourceRequirements {
                            requests: Some(BTreeMap::from([(
                                "storage".to_string(),
                                Quantity("10240Mi".to_string()),
                            )])),
                            limits: None,
                        }),
                        ..Default::default()
                    }),
                    status: None,
                }]),
                ..Default::default()
            }),
            status: None,
        };
        default_stateful_set(&mut stateful_set);

        let spec = stateful_set.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.pod_management_policy.as_deref(), Some("OrderedReady"));
        assert_eq!(spec.revision_history_limit, Some(10));

        let strategy = spec.update_strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
        assert_eq!(strategy.rolling_update.unwrap().partition, Some(0));

        let retention = spec.persistent_volume_claim_retention_policy.unwrap();
        assert_eq!(retention.when_deleted.as_deref(), Some("Retain"));
        assert_eq!(retention.when_scaled.as_deref(), Some("Retain"));

        let claim = &spec.volume_claim_templates.unwrap()[0];
        let claim_spec = claim.spec.as_ref().unwrap();
        assert_eq!(claim_spec.volume_mode.as_deref(), Some("Filesystem"));
        let requests = claim_spec.resources.as_ref().unwrap().requests.as_ref().unwrap();
        assert_eq!(requests["storage"], Quantity("10Gi".to_string()));
        assert_eq!(
            claim.status.as_ref().unwrap().phase.as_deref(),
            Some("Pending")
        );
    }

    fn stateful_set_with_strategy(strategy: StatefulSetUpdateStrategy) -> StatefulSet {
        StatefulSet {
            spec: Some(StatefulSetSpec {
                update_strategy: Some(strategy),
                template: template(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_rolling_update_without_parameters() {
        let mut stateful_set = stateful_set_with_strategy(StatefulSetUpdateStrategy {
            type_: Some("RollingUpdate".to_string()),
            rolling_update: None,
        });
        default_stateful_set(&mut stateful_set);

        let strategy = stateful_set.spec.unwrap().update_strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
        assert!(strategy.rolling_update.is_none());
    }

    #[test]
    fn test_explicit_rolling_update_gets_partition() {
        let mut stateful_set = stateful_set_with_strategy(StatefulSetUpdateStrategy {
            type_: Some("RollingUpdate".to_string()),
            rolling_update: Some(RollingUpdateStatefulSetStrategy {
                max_unavailable: None,
                partition: None,
            }),
        });
        default_stateful_set(&mut stateful_set);

        let strategy = stateful_set.spec.unwrap().update_strategy.unwrap();
        assert_eq!(strategy.rolling_update.unwrap().partition, Some(0));
    }

    #[test]
    fn test_on_delete_stateful_set() {
        let mut stateful_set = stateful_set_with_strategy(StatefulSetUpdateStrategy {
            type_: Some("OnDelete".to_string()),
            rolling_update: None,
        });
        default_stateful_set(&mut stateful_set);

        let strategy = stateful_set.spec.unwrap().update_strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("OnDelete"));
        assert!(strategy.rolling_update.is_none());
    }

    #[test]
    fn test_daemon_set_defaults() {
        let mut daemon_set = DaemonSet {
            spec: Some(DaemonSetSpec {
                template: template(),
                ..Default::default()
            }),
            ..Default::default()
        };
        default_daemon_set(&mut daemon_set);

        let spec = daemon_set.spec.unwrap();
        assert_eq!(spec.revision_history_limit, Some(10));
        let strategy = spec.update_strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
        let rolling = strategy.rolling_update.unwrap();
        assert_eq!(rolling.max_unavailable, Some(IntOrString::Int(1)));
        assert_eq!(rolling.max_surge, Some(IntOrString::Int(0)));
    }

    #[test]
    fn test_on_delete_daemon_set() {
        let mut daemon_set = DaemonSet {
            spec: Some(DaemonSetSpec {
                update_strategy: Some(DaemonSetUpdateStrategy {
                    type_: Some("OnDelete".to_string()),
                    rolling_update: None,
                }),
                template: template(),
                ..Default::default()
            }),
            ..Default::default()
        };
        default_daemon_set(&mut daemon_set);

        let strategy = daemon_set.spec.unwrap().update_strategy.unwrap();
        assert_eq!(strategy.type_.as_deref(), Some("OnDelete"));
        assert!(strategy.rolling_update.is_none());
    }
}

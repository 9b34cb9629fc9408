//! Pod template defaulting
//!
//! Mirrors what the API server fills in for `spec.template.spec` of every
//! workload kind. Pod-only defaults (e.g. `enableServiceLinks`, copying
//! resource limits into requests) are not applied to templates and are left
//! out here as well.

use k8s_openapi::api::core::v1::{
    Container, DownwardAPIVolumeFile, EmptyDirVolumeSource, ObjectFieldSelector,
    PodSecurityContext, PodSpec, PodTemplateSpec, Probe, Volume,
};

use super::quantity::{canonicalize_quantity, canonicalize_resources};

/// File mode the API server assigns to projected files when none is given (0644)
pub const DEFAULT_FILE_MODE: i32 = 0o644;

const DEFAULT_TOKEN_EXPIRATION_SECONDS: i64 = 3600;

/// Apply defaults to a pod template
pub fn default_pod_template(template: &mut PodTemplateSpec) {
    if let Some(spec) = template.spec.as_mut() {
        default_pod_spec(spec);
    }
}

/// Apply defaults to a pod spec
pub fn default_pod_spec(spec: &mut PodSpec) {
    spec.dns_policy.get_or_insert_with(|| "ClusterFirst".to_string());
    spec.restart_policy.get_or_insert_with(|| "Always".to_string());
    spec.termination_grace_period_seconds.get_or_insert(30);
    spec.security_context.get_or_insert_with(PodSecurityContext::default);
    spec.scheduler_name.get_or_insert_with(|| "default-scheduler".to_string());

    let host_network = spec.host_network.unwrap_or(false);

    for container in spec
        .containers
        .iter_mut()
        .chain(spec.init_containers.iter_mut().flatten())
    {
        default_container(container);
        if host_network {
            default_host_network_ports(container);
        }
    }

    for volume in spec.volumes.iter_mut().flatten() {
        default_volume(volume);
    }
}

/// Apply defaults to a single container
pub fn default_container(container: &mut Container) {
    container
        .termination_message_path
        .get_or_insert_with(|| "/dev/termination-log".to_string());
    container
        .termination_message_policy
        .get_or_insert_with(|| "File".to_string());

    if container.image_pull_policy.is_none() {
        let policy = image_pull_policy(container.image.as_deref().unwrap_or_default());
        container.image_pull_policy = Some(policy.to_string());
    }

    for port in container.ports.iter_mut().flatten() {
        port.protocol.get_or_insert_with(|| "TCP".to_string());
    }

    for env in container.env.iter_mut().flatten() {
        if let Some(field_ref) = env.value_from.as_mut().and_then(|v| v.field_ref.as_mut()) {
            default_field_ref(field_ref);
        }
    }

    if let Some(resources) = container.resources.as_mut() {
        canonicalize_resources(resources);
    }

    for check in [
        container.liveness_probe.as_mut(),
        container.readiness_probe.as_mut(),
        container.startup_probe.as_mut(),
    ]
    .into_iter()
    .flatten()
    {
        default_health_check(check);
    }
}

/// Pull policy the API server picks for an image reference
///
/// `Always` when the reference resolves to the `latest` tag, `IfNotPresent`
/// otherwise. A reference with neither tag nor digest means `latest`; a digest
/// without a tag means no tag at all. An empty reference does not parse and
/// gets `IfNotPresent`.
pub fn image_pull_policy(image: &str) -> &'static str {
    if image.is_empty() {
        return "IfNotPresent";
    }

    let (name, digest) = match image.split_once('@') {
        Some((name, digest)) => (name, Some(digest)),
        None => (image, None),
    };

    // A ':' before the last '/' belongs to a registry port, not a tag
    let last_segment = name.rsplit('/').next().unwrap_or(name);
    let tag = last_segment.split_once(':').map(|(_, tag)| tag);

    match (tag, digest) {
        (Some("latest"), _) | (None, None) => "Always",
        _ => "IfNotPresent",
    }
}

fn default_field_ref(field_ref: &mut ObjectFieldSelector) {
    field_ref.api_version.get_or_insert_with(|| "v1".to_string());
}

fn default_downward_api_items(items: Option<&mut Vec<DownwardAPIVolumeFile>>) {
    for item in items.into_iter().flatten() {
        if let Some(field_ref) = item.field_ref.as_mut() {
            default_field_ref(field_ref);
        }
    }
}

fn default_health_check(check: &mut Probe) {
    check.timeout_seconds.get_or_insert(1);
    check.period_seconds.get_or_insert(10);
    check.success_threshold.get_or_insert(1);
    check.failure_threshold.get_or_insert(3);

    if let Some(http_get) = check.http_get.as_mut() {
        http_get.path.get_or_insert_with(|| "/".to_string());
        http_get.scheme.get_or_insert_with(|| "HTTP".to_string());
    }
}

fn default_host_network_ports(container: &mut Container) {
    for port in container.ports.iter_mut().flatten() {
        port.host_port.get_or_insert(port.container_port);
    }
}

fn default_volume(volume: &mut Volume) {
    if !has_volume_source(volume) {
        volume.empty_dir = Some(EmptyDirVolumeSource::default());
    }

    if let Some(config_map) = volume.config_map.as_mut() {
        config_map.default_mode.get_or_insert(DEFAULT_FILE_MODE);
    }
    if let Some(secret) = volume.secret.as_mut() {
        secret.default_mode.get_or_insert(DEFAULT_FILE_MODE);
    }
    if let Some(downward_api) = volume.downward_api.as_mut() {
        downward_api.default_mode.get_or_insert(DEFAULT_FILE_MODE);
        default_downward_api_items(downward_api.items.as_mut());
    }
    if let Some(projected) = volume.projected.as_mut() {
        projected.default_mode.get_or_insert(DEFAULT_FILE_MODE);
        for source in projected.sources.iter_mut().flatten() {
            if let Some(downward_api) = source.downward_api.as_mut() {
                default_downward_api_items(downward_api.items.as_mut());
            }
            if let Some(token) = source.service_account_token.as_mut() {
                token.expiration_seconds.get_or_insert(DEFAULT_TOKEN_EXPIRATION_SECONDS);
            }
        }
    }
    if let Some(size_limit) = volume.empty_dir.as_mut().and_then(|e| e.size_limit.as_mut()) {
        canonicalize_quantity(size_limit);
    }
    if let Some(host_path) = volume.host_path.as_mut() {
        host_path.type_.get_or_insert_with(String::new);
    }
}

/// Whether any volume source field is set
///
/// `Volume` has one optional field per source type; anything other than
/// `name` in its serialized form is a source.
fn has_volume_source(volume: &Volume) -> bool {
    match serde_json::to_value(volume) {
        Ok(serde_json::Value::Object(fields)) => fields.keys().any(|key| key != "name"),
        _ => true,
    }
}

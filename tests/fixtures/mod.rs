//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::json;

/// A legacy-format payload nesting the plan under a `plan` key, next to
/// unrelated sibling keys.
pub fn legacy_payload(cluster_name: &str) -> serde_json::Value {
    json!({
        "service_id": "aosb-cluster-service-template",
        "plan_id": "aosb-cluster-plan-template-dedicated",
        "dashboard_url": format!("https://cloud.example.com/v2/proj-1#clusters/detail/{cluster_name}"),
        "parameters": {
            "plan": {
                "name": "dedicated",
                "project": { "id": "proj-1", "orgId": "org-1" },
                "cluster": { "name": cluster_name },
            },
            "leftover_request_context": { "ignored": true },
        },
    })
}

/// A payload whose parameters are already in the canonical string form.
pub fn canonical_payload(encoded: &str) -> serde_json::Value {
    json!({
        "service_id": "aosb-cluster-service-template",
        "plan_id": "aosb-cluster-plan-template-dedicated",
        "dashboard_url": "https://cloud.example.com/v2/proj-1#clusters/detail/c",
        "parameters": encoded,
    })
}

/// Write one instance record and its plan record into an archive layout.
pub fn write_archive_record(
    archive_dir: &Path,
    value_name: &str,
    instance_name: &str,
    dashboard_url: &str,
    plan_guid: &str,
    template: &str,
) {
    write_instance_record(archive_dir, value_name, instance_name, dashboard_url, plan_guid);
    let extra = serde_json::to_string(&json!({ "template": template })).expect("serialize extra");
    write_plan_record(archive_dir, plan_guid, &extra);
}

/// Write one instance record into the archive layout.
pub fn write_instance_record(
    archive_dir: &Path,
    value_name: &str,
    instance_name: &str,
    dashboard_url: &str,
    plan_guid: &str,
) {
    let instances = archive_dir.join("service_instances");
    fs::create_dir_all(&instances).expect("create service_instances");
    let instance = json!({
        "entity": {
            "name": instance_name,
            "dashboard_url": dashboard_url,
            "service_plan_guid": plan_guid,
        },
    });
    fs::write(
        instances.join(format!("{value_name}.json")),
        serde_json::to_vec_pretty(&instance).expect("serialize instance"),
    )
    .expect("write instance record");
}

/// Write one plan record with `extra_raw` taken verbatim as `entity.extra`.
pub fn write_plan_record(archive_dir: &Path, plan_guid: &str, extra_raw: &str) {
    let plans = archive_dir.join("service_plans");
    fs::create_dir_all(&plans).expect("create service_plans");
    let plan = json!({
        "entity": {
            "name": "dedicated",
            "extra": extra_raw,
        },
    });
    fs::write(
        plans.join(format!("{plan_guid}.json")),
        serde_json::to_vec_pretty(&plan).expect("serialize plan"),
    )
    .expect("write plan record");
}

/// Write an instance record carrying an upstream error status.
pub fn write_missing_instance(archive_dir: &Path, value_name: &str) {
    let instances = archive_dir.join("service_instances");
    fs::create_dir_all(&instances).expect("create service_instances");
    let record = json!({
        "error_code": "CF-ServiceInstanceNotFound",
        "description": "The service instance could not be found",
    });
    fs::write(
        instances.join(format!("{value_name}.json")),
        serde_json::to_vec_pretty(&record).expect("serialize record"),
    )
    .expect("write instance record");
}

//! Archival inventory replay: rebuild instance data for lost values.
//!
//! The inventory is a read-only directory of per-instance and per-plan
//! records dumped from the upstream platform:
//!
//! ```text
//! <archive>/service_instances/<value name>.json
//! <archive>/service_plans/<plan guid>.json
//! ```
//!
//! Instance records carry `entity.name`, `entity.dashboard_url` and
//! `entity.service_plan_guid`; plan records nest a serialized document with
//! a `template` field inside `entity.extra`. An `error_code` field marks an
//! instance that no longer exists upstream.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::backup::Snapshot;
use crate::plan::{Plan, Project};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot read archive record {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("archive record {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("archive record {path} has no entity body")]
    MissingEntity { path: PathBuf },

    #[error("plan record {path} has no template in entity.extra")]
    MissingTemplate { path: PathBuf },

    #[error("instance `{name}` dashboard url `{url}` has no project path segment")]
    MissingProjectSegment { name: String, url: String },

    #[error("instance `{name}` has an unparseable dashboard url `{url}`: {source}")]
    DashboardUrl {
        name: String,
        url: String,
        source: url::ParseError,
    },

    #[error("cannot render plan template for instance `{name}`: {source}")]
    Render { name: String, source: tera::Error },

    #[error("rendered plan for instance `{name}` is not valid YAML: {source}")]
    PlanYaml {
        name: String,
        source: serde_yaml::Error,
    },
}

/// Reconstructed in-memory record for one instance whose live value was
/// lost. Held for the duration of a repair run only.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceData {
    pub name: String,
    pub dashboard_url: String,
    pub plan: Plan,
}

/// Summary of a rebuild pass.
#[derive(Debug, Default, Clone)]
pub struct RebuildReport {
    /// Instances fully rebuilt.
    pub total: usize,
    /// Instances whose archival record reports an upstream error.
    pub missing: usize,
}

#[derive(Debug, Deserialize)]
struct InstanceRecord {
    #[serde(default)]
    error_code: Option<serde_json::Value>,
    #[serde(default)]
    entity: Option<InstanceEntity>,
}

#[derive(Debug, Deserialize)]
struct InstanceEntity {
    name: String,
    dashboard_url: String,
    service_plan_guid: String,
    #[serde(default)]
    cluster_tier: Option<String>,
    #[serde(default)]
    disk_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanRecord {
    #[serde(default)]
    entity: Option<PlanEntity>,
}

#[derive(Debug, Deserialize)]
struct PlanEntity {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    extra: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlanExtra {
    #[serde(default)]
    template: Option<String>,
}

/// Rebuild [`InstanceData`] for every archived value name.
///
/// `skip_shard` names the original/legacy shard in the snapshot, which is
/// never replayed. Records with an explicit `error_code` are counted as
/// missing and skipped; any other read or parse failure is fatal to the
/// whole run.
pub fn rebuild_instances(
    snapshot: &Snapshot,
    archive_dir: &Path,
    org_id: &str,
    skip_shard: Option<&str>,
) -> Result<(BTreeMap<String, InstanceData>, RebuildReport), ArchiveError> {
    let mut result = BTreeMap::new();
    let mut report = RebuildReport::default();

    tracing::info!("rebuilding instance data from archive");

    for (shard_id, values) in &snapshot.0 {
        if skip_shard == Some(shard_id.as_str()) {
            tracing::info!(shard = %shard_id, "skipping legacy shard");
            continue;
        }

        for name in values.keys() {
            let inst_path = archive_dir
                .join("service_instances")
                .join(format!("{name}.json"));
            let record: InstanceRecord = read_json(&inst_path)?;

            if let Some(code) = &record.error_code {
                tracing::error!(
                    instance = %name,
                    error_code = %code,
                    "instance query returned an error, skipping"
                );
                report.missing += 1;
                continue;
            }

            let entity = record.entity.ok_or(ArchiveError::MissingEntity {
                path: inst_path.clone(),
            })?;

            let plan_path = archive_dir
                .join("service_plans")
                .join(format!("{}.json", entity.service_plan_guid));
            let plan_record: PlanRecord = read_json(&plan_path)?;
            let plan_entity = plan_record.entity.ok_or(ArchiveError::MissingEntity {
                path: plan_path.clone(),
            })?;
            let raw_extra = plan_entity
                .extra
                .as_deref()
                .ok_or(ArchiveError::MissingTemplate {
                    path: plan_path.clone(),
                })?;
            let extra: PlanExtra =
                serde_json::from_str(raw_extra).map_err(|source| ArchiveError::Parse {
                    path: plan_path.clone(),
                    source,
                })?;
            let template = extra.template.ok_or(ArchiveError::MissingTemplate {
                path: plan_path.clone(),
            })?;

            // dashboard URL shape: https://host/v2/<projectId>#clusters/detail/<cluster>
            let project_id = project_from_dashboard(&entity.dashboard_url).map_err(|source| {
                ArchiveError::DashboardUrl {
                    name: entity.name.clone(),
                    url: entity.dashboard_url.clone(),
                    source,
                }
            })?;
            if project_id.is_empty() {
                return Err(ArchiveError::MissingProjectSegment {
                    name: entity.name.clone(),
                    url: entity.dashboard_url.clone(),
                });
            }

            let plan = render_plan(&entity, plan_entity.name.as_deref(), &template, &project_id, org_id)?;

            tracing::info!(instance = %name, plan = ?plan.name, "built instance data");
            result.insert(
                name.clone(),
                InstanceData {
                    name: entity.name,
                    dashboard_url: entity.dashboard_url,
                    plan,
                },
            );
            report.total += 1;
        }
    }

    tracing::info!(
        total = report.total,
        missing = report.missing,
        "rebuilt instance data"
    );

    Ok((result, report))
}

fn render_plan(
    entity: &InstanceEntity,
    plan_name: Option<&str>,
    template: &str,
    project_id: &str,
    org_id: &str,
) -> Result<Plan, ArchiveError> {
    let mut context = tera::Context::new();
    context.insert("instance_name", &entity.name);
    context.insert("project_id", project_id);
    context.insert("org_id", org_id);
    if let Some(tier) = &entity.cluster_tier {
        context.insert("cluster_tier", tier);
    }
    if let Some(disk) = &entity.disk_type {
        context.insert("disk_type", disk);
    }
    if let Some(plan_name) = plan_name {
        context.insert("plan_name", plan_name);
    }

    let rendered =
        tera::Tera::one_off(template, &context, false).map_err(|source| ArchiveError::Render {
            name: entity.name.clone(),
            source,
        })?;

    let mut plan: Plan =
        serde_yaml::from_str(&rendered).map_err(|source| ArchiveError::PlanYaml {
            name: entity.name.clone(),
            source,
        })?;

    let project = plan.project.get_or_insert_with(Project::default);
    project.id = project_id.to_string();
    project.org_id = org_id.to_string();
    // Credentials must never be persisted forward.
    plan.api_key = None;

    Ok(plan)
}

/// Last path segment of the dashboard URL, ignoring the fragment.
fn project_from_dashboard(raw: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(raw)?;
    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default();
    Ok(segment.to_string())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArchiveError> {
    let data = fs::read(path).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| ArchiveError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_is_the_last_dashboard_path_segment() {
        let id = project_from_dashboard("https://cloud.example.com/v2/proj-9#clusters/detail/foo")
            .expect("parse");
        assert_eq!(id, "proj-9");
    }

    #[test]
    fn trailing_slash_does_not_hide_the_segment() {
        let id = project_from_dashboard("https://cloud.example.com/v2/proj-9/").expect("parse");
        assert_eq!(id, "proj-9");
    }

    #[test]
    fn rendered_template_becomes_a_plan_with_resolved_project() {
        let entity = InstanceEntity {
            name: "inst-1".to_string(),
            dashboard_url: "https://cloud.example.com/v2/proj-1#clusters/detail/c".to_string(),
            service_plan_guid: "guid-1".to_string(),
            cluster_tier: Some("M20".to_string()),
            disk_type: None,
        };
        let template = "\
name: restored-{{ instance_name }}
apiKey:
  publicKey: leaked
cluster:
  name: {{ instance_name }}
  providerSettings:
    instanceSizeName: {{ cluster_tier | default(value=\"M10\") }}
";
        let plan = render_plan(&entity, Some("dedicated"), template, "proj-1", "org-1")
            .expect("render");
        assert_eq!(plan.name.as_deref(), Some("restored-inst-1"));
        assert_eq!(plan.api_key, None, "credentials must be stripped");
        let project = plan.project.expect("project");
        assert_eq!(project.id, "proj-1");
        assert_eq!(project.org_id, "org-1");
        let cluster = plan.cluster.expect("cluster");
        assert_eq!(cluster["providerSettings"]["instanceSizeName"], "M20");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::record::{
    dedup_labels, non_blank, or_generated_id, Extensions, Record, RecordKind, SCHEMA_VERSION,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    pub role: String,
    /// External profile handle; `null` when not given.
    pub github: Option<String>,
    #[serde(flatten)]
    pub extra: Extensions,
}

/// Stored description of a project submitted to a hackathon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub team_name: String,
    pub team_members: Vec<TeamMember>,
    pub hackathon_id: String,
    pub category: String,
    pub tags: Vec<String>,
    pub tech_stack: Vec<String>,
    pub github_repo: String,
    pub live_demo: Option<String>,
    pub video_demo: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub version: String,
    #[serde(flatten)]
    pub extra: Extensions,
}

/// Raw input from the submit-project form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectForm {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub team_name: String,
    pub team_members: Vec<TeamMember>,
    pub hackathon_id: String,
    pub category: String,
    pub tags: Vec<String>,
    pub tech_stack: Vec<String>,
    pub github_repo: String,
    pub live_demo: Option<String>,
    pub video_demo: Option<String>,
}

impl ProjectRecord {
    pub fn from_form(form: ProjectForm) -> Result<Self, TypeError> {
        Self::from_form_at(form, Utc::now())
    }

    pub fn from_form_at(form: ProjectForm, now: DateTime<Utc>) -> Result<Self, TypeError> {
        if form.hackathon_id.trim().is_empty() {
            return Err(TypeError::InvalidField {
                field: "hackathonId",
                reason: "a project must belong to a hackathon".into(),
            });
        }

        let team_members = form
            .team_members
            .into_iter()
            .filter(|m| !m.name.trim().is_empty())
            .map(|m| TeamMember {
                github: non_blank(m.github),
                ..m
            })
            .collect();

        Ok(Self {
            id: or_generated_id(form.id, RecordKind::Project),
            title: form.title,
            description: form.description,
            team_name: form.team_name,
            team_members,
            hackathon_id: form.hackathon_id.trim().to_string(),
            category: form.category,
            tags: dedup_labels(form.tags),
            tech_stack: dedup_labels(form.tech_stack),
            github_repo: form.github_repo,
            live_demo: non_blank(form.live_demo),
            video_demo: non_blank(form.video_demo),
            submitted_at: now,
            version: SCHEMA_VERSION.to_string(),
            extra: Extensions::new(),
        })
    }
}

impl Record for ProjectRecord {
    const KIND: RecordKind = RecordKind::Project;

    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn version(&self) -> &str {
        &self.version
    }
}

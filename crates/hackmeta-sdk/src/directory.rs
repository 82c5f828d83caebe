use std::collections::BTreeSet;

use hackmeta_store::FileEntry;
use hackmeta_types::{HackathonRecord, JudgeScoreRecord, ProjectRecord, Record};

use crate::error::{SdkError, SdkResult};

/// A hackathon with its submissions and scores, uploaded as one directory:
///
/// ```text
/// hackathon-<id>/metadata.json
/// hackathon-<id>/projects/project-<project id>.json
/// hackathon-<id>/scores/score-<project id>-<judge id>.json
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct HackathonBundle {
    pub metadata: HackathonRecord,
    pub projects: Vec<ProjectRecord>,
    pub scores: Vec<JudgeScoreRecord>,
}

impl HackathonBundle {
    pub fn new(metadata: HackathonRecord) -> Self {
        Self {
            metadata,
            projects: Vec::new(),
            scores: Vec::new(),
        }
    }

    pub fn with_project(mut self, project: ProjectRecord) -> Self {
        self.projects.push(project);
        self
    }

    pub fn with_score(mut self, score: JudgeScoreRecord) -> Self {
        self.scores.push(score);
        self
    }

    /// Path of the directory entry everything else lives under.
    pub fn root_path(&self) -> String {
        format!("hackathon-{}", path_segment(&self.metadata.id))
    }

    /// Serialize every record into its path. Two records landing on the same
    /// path is an error rather than a silent overwrite.
    pub fn entries(&self) -> SdkResult<Vec<FileEntry>> {
        let root = self.root_path();
        let mut entries = Vec::with_capacity(1 + self.projects.len() + self.scores.len());
        entries.push(entry(format!("{root}/metadata.json"), &self.metadata)?);
        for project in &self.projects {
            entries.push(entry(format!("{root}/projects/project-{}.json", path_segment(&project.id)), project)?);
        }
        for score in &self.scores {
            entries.push(entry(format!("{root}/scores/score-{}.json", path_segment(&score.record_id())), score)?);
        }

        let mut seen = BTreeSet::new();
        for e in &entries {
            if !seen.insert(e.path.as_str()) {
                return Err(SdkError::InvalidBundle(format!("two records map to {}", e.path)));
            }
        }
        Ok(entries)
    }
}

/// Record ids are free text; separators would nest the file one level down.
pub(crate) fn path_segment(id: &str) -> String {
    id.replace(['/', '\\'], "_")
}

fn entry<R: Record>(path: String, record: &R) -> SdkResult<FileEntry> {
    let json = record.to_pretty_json().map_err(|e| SdkError::Serialize {
        kind: R::KIND,
        id: record.record_id(),
        reason: e.to_string(),
    })?;
    Ok(FileEntry::text(path, &json))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hackmeta_types::{CriteriaWeights, HackathonForm, ProjectForm};
    use std::collections::BTreeMap;

    pub(crate) fn hackathon(id: &str) -> HackathonRecord {
        let form = HackathonForm {
            id: Some(id.into()),
            title: "ETHGlobal Lisbon".into(),
            organizer_name: "ETHGlobal".into(),
            start_date: "2024-03-15T09:00".into(),
            end_date: "2024-03-17T18:00".into(),
            location: "Lisbon".into(),
            max_participants: "300".into(),
            ..HackathonForm::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        HackathonRecord::from_form_at(form, now).unwrap()
    }

    pub(crate) fn project(id: &str, hackathon_id: &str) -> ProjectRecord {
        let form = ProjectForm {
            id: Some(id.into()),
            title: "ZK Voting".into(),
            team_name: "Provers".into(),
            hackathon_id: hackathon_id.into(),
            github_repo: "https://github.com/provers/zk-voting".into(),
            ..ProjectForm::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 17, 10, 0, 0).unwrap();
        ProjectRecord::from_form_at(form, now).unwrap()
    }

    pub(crate) fn score(project_id: &str, judge_id: &str, hackathon_id: &str) -> JudgeScoreRecord {
        let scores: BTreeMap<String, f64> = [
            ("innovation", 9.0),
            ("technical", 8.0),
            ("impact", 9.0),
            ("presentation", 8.0),
            ("completion", 7.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        JudgeScoreRecord::new(project_id, judge_id, hackathon_id, scores, "solid", &CriteriaWeights::standard())
            .unwrap()
    }

    #[test]
    fn entry_paths() {
        let bundle = HackathonBundle::new(hackathon("h1"))
            .with_project(project("p1", "h1"))
            .with_score(score("p1", "j1", "h1"));
        let paths: Vec<String> = bundle.entries().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                "hackathon-h1/metadata.json",
                "hackathon-h1/projects/project-p1.json",
                "hackathon-h1/scores/score-p1-j1.json",
            ]
        );
        assert_eq!(bundle.root_path(), "hackathon-h1");
    }

    #[test]
    fn entries_are_pretty_json() {
        let bundle = HackathonBundle::new(hackathon("h1"));
        let entries = bundle.entries().unwrap();
        let text = std::str::from_utf8(&entries[0].content).unwrap();
        assert!(text.starts_with("{\n  \"id\": \"h1\""));
    }

    #[test]
    fn duplicate_paths_rejected() {
        let bundle = HackathonBundle::new(hackathon("h1"))
            .with_project(project("p1", "h1"))
            .with_project(project("p1", "h1"));
        assert!(matches!(bundle.entries(), Err(SdkError::InvalidBundle(_))));
    }
}

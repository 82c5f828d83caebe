use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::record::{Extensions, Record, RecordKind, SCHEMA_VERSION};

/// Tolerance used when comparing a recorded overall score to a recomputed one.
const SCORE_EPSILON: f64 = 1e-9;

/// One axis a judge rates a project on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringCriterion {
    pub id: String,
    pub name: String,
    pub description: String,
    pub max_score: f64,
    pub weight: f64,
}

impl ScoringCriterion {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        max_score: f64,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            max_score,
            weight,
        }
    }

    /// The platform's default judging rubric. Weights sum to 1.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new("innovation", "Innovation & Creativity", "How novel and creative is the solution?", 10.0, 0.25),
            Self::new("technical", "Technical Implementation", "Quality of code, architecture, and technical execution", 10.0, 0.25),
            Self::new("impact", "Impact & Usefulness", "Potential real-world impact and practical value", 10.0, 0.25),
            Self::new("presentation", "Presentation & Demo", "Quality of presentation and demonstration", 10.0, 0.15),
            Self::new("completion", "Completeness", "How complete and polished is the project?", 10.0, 0.10),
        ]
    }
}

/// Criterion id to weight. Not persisted with scores; supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaWeights(BTreeMap<String, f64>);

impl CriteriaWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, w)| (k.into(), w)).collect())
    }

    pub fn from_criteria(criteria: &[ScoringCriterion]) -> Self {
        Self::from_pairs(criteria.iter().map(|c| (c.id.clone(), c.weight)))
    }

    /// Weights of [`ScoringCriterion::standard`].
    pub fn standard() -> Self {
        Self::from_criteria(&ScoringCriterion::standard())
    }

    pub fn weight(&self, criterion: &str) -> Option<f64> {
        self.0.get(criterion).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weighted sum of `scores`. Criteria without a score contribute zero.
    pub fn overall(&self, scores: &BTreeMap<String, f64>) -> f64 {
        self.0
            .iter()
            .map(|(id, weight)| scores.get(id).copied().unwrap_or(0.0) * weight)
            .sum()
    }

    /// Every weight must be finite and non-negative, or the overall score
    /// would not survive a JSON round trip.
    pub fn validate(&self) -> Result<(), TypeError> {
        match self.0.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            Some((criterion, weight)) => Err(TypeError::InvalidWeight {
                criterion: criterion.clone(),
                weight: *weight,
            }),
            None => Ok(()),
        }
    }

    fn check_known(&self, scores: &BTreeMap<String, f64>) -> Result<(), TypeError> {
        self.validate()?;
        for (criterion, score) in scores {
            if !self.0.contains_key(criterion) {
                return Err(TypeError::UnknownCriterion(criterion.clone()));
            }
            if !score.is_finite() || *score < 0.0 {
                return Err(TypeError::ScoreOutOfRange {
                    criterion: criterion.clone(),
                    score: *score,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }
}

/// One judge's evaluation of one project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeScoreRecord {
    pub project_id: String,
    pub judge_id: String,
    pub hackathon_id: String,
    pub scores: BTreeMap<String, f64>,
    pub comments: String,
    pub overall_score: f64,
    pub submitted_at: DateTime<Utc>,
    /// Reserved for a judge signature over the record; not populated yet.
    pub signature: Option<String>,
    /// Older score documents were written without a version.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(flatten)]
    pub extra: Extensions,
}

impl JudgeScoreRecord {
    /// Build a score record, computing `overall_score` from `weights`.
    ///
    /// Fails if any scored criterion has no weight, a weight or score is
    /// negative or not finite.
    pub fn new(
        project_id: impl Into<String>,
        judge_id: impl Into<String>,
        hackathon_id: impl Into<String>,
        scores: BTreeMap<String, f64>,
        comments: impl Into<String>,
        weights: &CriteriaWeights,
    ) -> Result<Self, TypeError> {
        weights.check_known(&scores)?;
        let overall_score = weights.overall(&scores);
        Ok(Self {
            project_id: project_id.into(),
            judge_id: judge_id.into(),
            hackathon_id: hackathon_id.into(),
            scores,
            comments: comments.into(),
            overall_score,
            submitted_at: Utc::now(),
            signature: None,
            version: SCHEMA_VERSION.to_string(),
            extra: Extensions::new(),
        })
    }

    /// Like [`JudgeScoreRecord::new`], additionally bounding each score by
    /// its criterion's `max_score`.
    pub fn with_criteria(
        project_id: impl Into<String>,
        judge_id: impl Into<String>,
        hackathon_id: impl Into<String>,
        scores: BTreeMap<String, f64>,
        comments: impl Into<String>,
        criteria: &[ScoringCriterion],
    ) -> Result<Self, TypeError> {
        for criterion in criteria {
            if let Some(score) = scores.get(&criterion.id) {
                if *score > criterion.max_score {
                    return Err(TypeError::ScoreOutOfRange {
                        criterion: criterion.id.clone(),
                        score: *score,
                        max: criterion.max_score,
                    });
                }
            }
        }
        let weights = CriteriaWeights::from_criteria(criteria);
        Self::new(project_id, judge_id, hackathon_id, scores, comments, &weights)
    }

    /// Check a decoded record against the weights it was scored under.
    pub fn verify_overall(&self, weights: &CriteriaWeights) -> Result<(), TypeError> {
        weights.check_known(&self.scores)?;
        let expected = weights.overall(&self.scores);
        if (expected - self.overall_score).abs() > SCORE_EPSILON {
            return Err(TypeError::ScoreMismatch {
                expected,
                recorded: self.overall_score,
            });
        }
        Ok(())
    }
}

impl Record for JudgeScoreRecord {
    const KIND: RecordKind = RecordKind::Score;

    fn record_id(&self) -> String {
        format!("{}-{}", self.project_id, self.judge_id)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Mean overall score across several judges' records, `None` if empty.
pub fn average_overall(records: &[JudgeScoreRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.overall_score).sum();
    Some(total / records.len() as f64)
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::record::{non_blank, or_generated_id, Extensions, Record, RecordKind, SCHEMA_VERSION};

/// Who runs the event. Optional fields serialize as `null`, never omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extensions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub description: String,
    /// Display token chosen by the organizer (usually an emoji).
    pub icon: String,
    #[serde(flatten)]
    pub extra: Extensions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    /// Place label, e.g. "1st Place".
    pub place: String,
    /// Amount label as entered, e.g. "$10,000".
    pub amount: String,
    pub description: String,
    #[serde(flatten)]
    pub extra: Extensions,
}

/// Stored description of a hackathon event.
///
/// `start_date` and `end_date` keep the organizer's local schedule text
/// (`YYYY-MM-DDTHH:MM`, as entered); `created_at` and `updated_at` are UTC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub organizer: Organizer,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub max_participants: u32,
    pub tracks: Vec<Track>,
    pub prizes: Vec<Prize>,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
    #[serde(flatten)]
    pub extra: Extensions,
}

/// Raw input from the create-hackathon form.
///
/// Every field is textual or defaulted, the way the form collected it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HackathonForm {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub organizer_name: String,
    pub organizer_website: Option<String>,
    pub organizer_description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub max_participants: String,
    pub tracks: Vec<Track>,
    pub prizes: Vec<Prize>,
    pub requirements: Vec<String>,
}

impl HackathonRecord {
    /// Build a record from form input, stamped with the current time.
    pub fn from_form(form: HackathonForm) -> Result<Self, TypeError> {
        Self::from_form_at(form, Utc::now())
    }

    /// Build a record from form input with an explicit creation time.
    pub fn from_form_at(form: HackathonForm, now: DateTime<Utc>) -> Result<Self, TypeError> {
        let max_participants = form.max_participants.trim().parse::<u32>().map_err(|e| {
            TypeError::InvalidField {
                field: "maxParticipants",
                reason: format!("{:?}: {e}", form.max_participants),
            }
        })?;

        let start = parse_schedule("startDate", &form.start_date)?;
        let end = parse_schedule("endDate", &form.end_date)?;
        if end < start {
            return Err(TypeError::InvalidField {
                field: "endDate",
                reason: format!("{} is before start {}", form.end_date, form.start_date),
            });
        }

        Ok(Self {
            id: or_generated_id(form.id, RecordKind::Hackathon),
            title: form.title,
            description: form.description,
            organizer: Organizer {
                name: form.organizer_name,
                website: non_blank(form.organizer_website),
                description: non_blank(form.organizer_description),
                extra: Extensions::new(),
            },
            start_date: form.start_date.trim().to_string(),
            end_date: form.end_date.trim().to_string(),
            location: form.location,
            max_participants,
            tracks: form.tracks,
            prizes: form.prizes,
            requirements: form
                .requirements
                .into_iter()
                .filter(|r| !r.trim().is_empty())
                .collect(),
            created_at: now,
            updated_at: now,
            version: SCHEMA_VERSION.to_string(),
            extra: Extensions::new(),
        })
    }

    /// Derive an edited copy. The result is a new document with a new
    /// identifier once uploaded; the original stays as it was.
    pub fn revised(&self, now: DateTime<Utc>, edit: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        edit(&mut next);
        next.updated_at = now;
        next
    }
}

impl Record for HackathonRecord {
    const KIND: RecordKind = RecordKind::Hackathon;

    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Accepts what a `datetime-local` input produces, with or without seconds,
/// plus bare dates and RFC 3339.
fn parse_schedule(field: &'static str, value: &str) -> Result<NaiveDateTime, TypeError> {
    let value = value.trim();
    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    Err(TypeError::InvalidField {
        field,
        reason: format!("unrecognised date {value:?}"),
    })
}

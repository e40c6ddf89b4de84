use chrono::{DateTime, Utc};
use serde::Serialize;

/// Separator used to persist a teacher's subjects in a single column.
pub const SUBJECT_SEPARATOR: char = ',';

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: i64,
    pub name: String,
    pub subjects: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of the teachers dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherOverview {
    pub id: i64,
    pub name: String,
    pub subjects: Vec<String>,
    pub subject_count: usize,
    pub practice_count: i64,
}

/// The five free-text fields of a practice, in report order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveFields {
    pub objective: String,
    pub introduction: String,
    pub summary: String,
    pub development: String,
    pub goals: String,
}

impl DescriptiveFields {
    pub fn uniform(text: &str) -> Self {
        Self {
            objective: text.to_string(),
            introduction: text.to_string(),
            summary: text.to_string(),
            development: text.to_string(),
            goals: text.to_string(),
        }
    }

    /// Label/value pairs in the fixed order used by reports.
    pub fn labelled(&self) -> [(&'static str, &str); 5] {
        [
            ("Objective", self.objective.as_str()),
            ("Introduction", self.introduction.as_str()),
            ("Summary", self.summary.as_str()),
            ("Development", self.development.as_str()),
            ("Goals", self.goals.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Practice {
    pub id: i64,
    pub teacher_id: i64,
    /// Joined from `teachers` on read.
    pub teacher_name: String,
    pub subject: String,
    pub title: String,
    #[serde(flatten)]
    pub fields: DescriptiveFields,
    pub upload_date: DateTime<Utc>,
    pub num_pages: i64,
    pub file_path: String,
}

/// Row to be inserted by `submit_practice`.
#[derive(Debug, Clone)]
pub struct NewPractice {
    pub teacher_id: i64,
    pub subject: String,
    pub title: String,
    pub fields: DescriptiveFields,
    pub upload_date: DateTime<Utc>,
    pub num_pages: i64,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSummary {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub teacher_name: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub practice_count: i64,
    pub teacher_count: i64,
}

pub fn join_subjects(subjects: &[String]) -> String {
    subjects.join(&SUBJECT_SEPARATOR.to_string())
}

pub fn split_subjects(raw: &str) -> Vec<String> {
    raw.split(SUBJECT_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

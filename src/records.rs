//! Record service: teacher and practice operations over a [`Session`].
//!
//! Operations that touch both the filesystem and the database run in two
//! phases. The filesystem side effect happens first; if the row insert then
//! fails, the side effect is undone before the error is returned.

use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use crate::auth::CredentialVerifier;
use crate::db;
use crate::error::{validation, ServiceError};
use crate::extract::{DocumentExtractor, ExtractionResult};
use crate::files::validate_path_component;
use crate::models::{
    NewPractice, Practice, PracticeSummary, Statistics, Teacher, TeacherOverview,
    SUBJECT_SEPARATOR,
};
use crate::session::Session;

/// Raw form values for a practice upload.
#[derive(Debug, Clone, Default)]
pub struct PracticeSubmission {
    pub teacher_name: String,
    pub subject: String,
    pub title: String,
    /// Optional; replaces the objective placeholder when not blank.
    pub objective: String,
    pub source_path: String,
}

pub fn list_teacher_names(session: &Session) -> Result<Vec<String>, ServiceError> {
    Ok(db::teacher_names(&session.conn)?)
}

pub fn list_teacher_overviews(session: &Session) -> Result<Vec<TeacherOverview>, ServiceError> {
    Ok(db::teacher_overviews(&session.conn)?)
}

/// Subjects of `name`, or an empty list when the teacher is unknown.
pub fn get_subjects_for_teacher(session: &Session, name: &str) -> Result<Vec<String>, ServiceError> {
    Ok(db::find_teacher_by_name(&session.conn, name.trim())?
        .map(|t| t.subjects)
        .unwrap_or_default())
}

/// Trims, validates and de-duplicates subjects, keeping first-seen order.
fn normalize_subjects(subjects: &[String]) -> Result<Vec<String>, ServiceError> {
    let mut out: Vec<String> = Vec::new();
    for raw in subjects {
        let subject = raw.trim();
        validate_path_component("subject", subject)?;
        if subject.contains(SUBJECT_SEPARATOR) {
            return Err(validation(format!(
                "subject must not contain '{}': {}",
                SUBJECT_SEPARATOR, subject
            )));
        }
        if !out.iter().any(|s| s == subject) {
            out.push(subject.to_string());
        }
    }
    Ok(out)
}

pub fn add_teacher(
    session: &Session,
    verifier: &dyn CredentialVerifier,
    name: &str,
    subjects: &[String],
    credential: &str,
) -> Result<Teacher, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(validation("teacher name is required"));
    }
    if subjects.is_empty() {
        return Err(validation("at least one subject is required"));
    }
    validate_path_component("teacher name", name)?;
    let subjects = normalize_subjects(subjects)?;

    if !verifier.verify(credential) {
        warn!("rejected teacher creation for {}: bad admin password", name);
        return Err(ServiceError::Auth);
    }

    if db::find_teacher_by_name(&session.conn, name)?.is_some() {
        return Err(validation(format!("teacher already exists: {}", name)));
    }

    let created = session.organizer.ensure_teacher_directories(name, &subjects)?;
    let created_at = Utc::now();
    match db::insert_teacher(&session.conn, name, &subjects, created_at) {
        Ok(id) => {
            info!("added teacher {} (id {}) with {} subjects", name, id, subjects.len());
            Ok(Teacher {
                id,
                name: name.to_string(),
                subjects,
                created_at,
            })
        }
        Err(e) => {
            warn!(
                "teacher insert failed for {}, removing {} new directories",
                name,
                created.len()
            );
            session.organizer.remove_created_directories(&created);
            Err(e.into())
        }
    }
}

pub fn submit_practice(
    session: &Session,
    extractor: &dyn DocumentExtractor,
    submission: &PracticeSubmission,
) -> Result<i64, ServiceError> {
    let teacher_name = submission.teacher_name.trim();
    let subject = submission.subject.trim();
    let title = submission.title.trim();
    let source = submission.source_path.trim();
    if teacher_name.is_empty() {
        return Err(validation("please select a teacher"));
    }
    if subject.is_empty() {
        return Err(validation("subject is required"));
    }
    if title.is_empty() {
        return Err(validation("title is required"));
    }
    if source.is_empty() {
        return Err(validation("please select a practice file"));
    }

    let teacher = db::find_teacher_by_name(&session.conn, teacher_name)?
        .ok_or_else(|| ServiceError::NotFound(format!("teacher not found: {}", teacher_name)))?;
    if !teacher.subjects.iter().any(|s| s == subject) {
        return Err(validation(format!(
            "{} does not teach {}",
            teacher.name, subject
        )));
    }

    let source = Path::new(source);
    let stored = session
        .organizer
        .store_practice_file(&teacher.name, subject, title, teacher.id, source)?;

    let extraction = extractor.extract(source).unwrap_or_else(|e| {
        warn!("could not extract {:?}, using placeholders: {}", source, e);
        ExtractionResult::failed()
    });
    let mut fields = extraction.fields;
    let objective = submission.objective.trim();
    if !objective.is_empty() {
        fields.objective = objective.to_string();
    }

    let row = NewPractice {
        teacher_id: teacher.id,
        subject: subject.to_string(),
        title: title.to_string(),
        fields,
        upload_date: Utc::now(),
        num_pages: extraction.num_pages,
        file_path: stored.to_string_lossy().to_string(),
    };
    match db::insert_practice(&session.conn, &row) {
        Ok(id) => {
            info!("added practice {} (id {}) for {}", title, id, teacher.name);
            Ok(id)
        }
        Err(e) => {
            warn!("practice insert failed, removing {:?}", stored);
            session.organizer.remove_practice_file(&stored);
            Err(e.into())
        }
    }
}

/// Case-insensitive substring match on title, subject or teacher name.
pub fn search_practices(session: &Session, term: &str) -> Result<Vec<PracticeSummary>, ServiceError> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Err(validation("please enter a search term"));
    }
    // Matched in Rust: SQLite's LIKE only folds ASCII case.
    let matches = db::practice_summaries(&session.conn)?
        .into_iter()
        .filter(|p| {
            [&p.title, &p.subject, &p.teacher_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect();
    Ok(matches)
}

pub fn get_practice_by_id(session: &Session, id: i64) -> Result<Practice, ServiceError> {
    db::practice_by_id(&session.conn, id)?
        .ok_or_else(|| ServiceError::NotFound(format!("no practice found with id {}", id)))
}

pub fn get_practices_by_teacher(session: &Session, name: &str) -> Result<Vec<Practice>, ServiceError> {
    Ok(db::practices_by_teacher(&session.conn, name.trim())?)
}

pub fn compute_statistics(session: &Session) -> Result<Statistics, ServiceError> {
    Ok(Statistics {
        practice_count: db::count_practices(&session.conn)?,
        teacher_count: db::count_teachers(&session.conn)?,
    })
}

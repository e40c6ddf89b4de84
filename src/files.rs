//! On-disk layout for uploaded practice files.
//!
//! Files live under `base/<teacher>/<subject>/` with names derived from the
//! practice title, subject, teacher id and upload second.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{validation, ServiceError};

pub const UPLOAD_DIR_NAME: &str = "uploads";

const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', ' '];
const MAX_FILENAME_CHARS: usize = 200;
// NAME_MAX on common filesystems, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// Replaces characters that are unsafe in file names and caps the length,
/// keeping the extension intact.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if cleaned.chars().count() <= MAX_FILENAME_CHARS {
        return cleaned;
    }

    if let Some(dot) = cleaned.rfind('.') {
        let ext = &cleaned[dot..];
        let ext_len = ext.chars().count();
        if dot > 0 && ext_len < MAX_FILENAME_CHARS {
            let stem: String = cleaned[..dot]
                .chars()
                .take(MAX_FILENAME_CHARS - ext_len)
                .collect();
            return format!("{stem}{ext}");
        }
    }
    cleaned.chars().take(MAX_FILENAME_CHARS).collect()
}

/// Teacher names and subjects become directory names verbatim, so they must
/// stay a single path component.
pub fn validate_path_component(kind: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(validation(format!("{kind} must not be empty")));
    }
    if value == "." || value == ".." || value.contains(&['/', '\\', '\0'][..]) {
        return Err(validation(format!(
            "{kind} cannot be used as a folder name: {value}"
        )));
    }
    Ok(())
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `title_subject_teacherN_YYYYmmdd_HHMMSS.pdf`, capped at
/// `MAX_FILENAME_BYTES`. Title and subject are shortened so the teacher id,
/// timestamp and extension always survive.
pub fn practice_file_name(
    title: &str,
    subject: &str,
    teacher_id: i64,
    at: DateTime<Local>,
) -> String {
    let tail = format!("_teacher{}_{}.pdf", teacher_id, at.format("%Y%m%d_%H%M%S"));
    let budget = MAX_FILENAME_BYTES.saturating_sub(tail.len() + 1);

    let subject = sanitize_filename(subject);
    let subject = truncate_bytes(&subject, budget / 2);
    let title = sanitize_filename(title);
    let title = truncate_bytes(&title, budget - subject.len());
    format!("{title}_{subject}{tail}")
}

#[derive(Debug, Clone)]
pub struct FileOrganizer {
    base: PathBuf,
}

impl FileOrganizer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn ensure_base(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base)
    }

    pub fn teacher_dir(&self, teacher_name: &str) -> PathBuf {
        self.base.join(teacher_name)
    }

    pub fn subject_dir(&self, teacher_name: &str, subject: &str) -> PathBuf {
        self.teacher_dir(teacher_name).join(subject)
    }

    /// Creates the teacher folder and one folder per subject.
    ///
    /// Returns the directories that did not exist before the call, parents
    /// first, so a failed follow-up step can undo exactly those. On error the
    /// directories created so far are removed again.
    pub fn ensure_teacher_directories(
        &self,
        teacher_name: &str,
        subjects: &[String],
    ) -> Result<Vec<PathBuf>, ServiceError> {
        let mut created = Vec::new();
        let mut targets = vec![self.teacher_dir(teacher_name)];
        targets.extend(subjects.iter().map(|s| self.subject_dir(teacher_name, s)));

        for dir in &targets {
            if let Err(e) = create_missing(dir, &mut created) {
                self.remove_created_directories(&created);
                return Err(ServiceError::Io(format!(
                    "failed to create directory {}: {}",
                    dir.to_string_lossy(),
                    e
                )));
            }
        }
        debug!(
            "ensured directories for {} ({} new)",
            teacher_name,
            created.len()
        );
        Ok(created)
    }

    /// Compensating action for `ensure_teacher_directories`. Only empty
    /// directories are removed.
    pub fn remove_created_directories(&self, created: &[PathBuf]) {
        for dir in created.iter().rev() {
            if let Err(e) = fs::remove_dir(dir) {
                warn!("could not remove directory {:?}: {}", dir, e);
            }
        }
    }

    pub fn store_practice_file(
        &self,
        teacher_name: &str,
        subject: &str,
        title: &str,
        teacher_id: i64,
        source: &Path,
    ) -> Result<PathBuf, ServiceError> {
        self.store_practice_file_at(teacher_name, subject, title, teacher_id, source, Local::now())
    }

    /// Copies `source` into the teacher/subject folder.
    ///
    /// The bytes are written to a temporary sibling and renamed into place;
    /// an existing destination is never overwritten.
    pub fn store_practice_file_at(
        &self,
        teacher_name: &str,
        subject: &str,
        title: &str,
        teacher_id: i64,
        source: &Path,
        at: DateTime<Local>,
    ) -> Result<PathBuf, ServiceError> {
        let bytes = fs::read(source).map_err(|e| {
            ServiceError::Io(format!(
                "failed to read {}: {}",
                source.to_string_lossy(),
                e
            ))
        })?;

        let dir = self.subject_dir(teacher_name, subject);
        fs::create_dir_all(&dir).map_err(|e| {
            ServiceError::Io(format!(
                "failed to create directory {}: {}",
                dir.to_string_lossy(),
                e
            ))
        })?;

        let dest = dir.join(practice_file_name(title, subject, teacher_id, at));
        if dest.exists() {
            return Err(ServiceError::Io(format!(
                "destination already exists: {}",
                dest.to_string_lossy()
            )));
        }

        let tmp = dir.join(format!(".{}.partial", Uuid::new_v4()));
        let written = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, &dest));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(ServiceError::Io(format!(
                "failed to write {}: {}",
                dest.to_string_lossy(),
                e
            )));
        }

        info!("stored practice file {:?} ({} bytes)", dest, bytes.len());
        Ok(dest)
    }

    /// Compensating action for `store_practice_file`.
    pub fn remove_practice_file(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove stored file {:?}: {}", path, e);
        }
    }
}

fn create_missing(dir: &Path, created: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if let Some(parent) = dir.parent() {
        if !parent.as_os_str().is_empty() {
            create_missing(parent, created)?;
        }
    }
    fs::create_dir(dir)?;
    created.push(dir.to_path_buf());
    Ok(())
}

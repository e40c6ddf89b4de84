use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

use crate::auth::CredentialVerifier;
use crate::extract::DocumentExtractor;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

const ACTIVITY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub at: DateTime<Local>,
    pub message: String,
}

/// Recent successful mutations, newest first. Not persisted.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: VecDeque<Activity>,
}

impl ActivityLog {
    pub fn record(&mut self, message: impl Into<String>) {
        self.entries.push_front(Activity {
            at: Local::now(),
            message: message.into(),
        });
        self.entries.truncate(ACTIVITY_CAPACITY);
    }

    pub fn recent(&self, limit: usize) -> Vec<Activity> {
        self.entries.iter().take(limit).cloned().collect()
    }
}

pub struct AppState {
    pub session: Option<Session>,
    pub verifier: Box<dyn CredentialVerifier>,
    pub extractor: Box<dyn DocumentExtractor>,
    pub activity: ActivityLog,
}

impl AppState {
    pub fn new(verifier: Box<dyn CredentialVerifier>, extractor: Box<dyn DocumentExtractor>) -> Self {
        Self {
            session: None,
            verifier,
            extractor,
            activity: ActivityLog::default(),
        }
    }

    pub fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close() {
                warn!("{e:#}");
            }
        }
    }
}

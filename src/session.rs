use anyhow::Context;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::db;
use crate::files::{FileOrganizer, UPLOAD_DIR_NAME};

/// Storage opened for one workspace: the database connection plus the upload
/// tree. Every record-service call receives it explicitly.
pub struct Session {
    workspace: PathBuf,
    pub conn: Connection,
    pub organizer: FileOrganizer,
}

impl Session {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace).with_context(|| {
            format!("failed to open database in {}", workspace.to_string_lossy())
        })?;
        let organizer = FileOrganizer::new(workspace.join(UPLOAD_DIR_NAME));
        organizer.ensure_base().with_context(|| {
            format!(
                "failed to create upload directory {}",
                organizer.base().to_string_lossy()
            )
        })?;
        info!("opened workspace {:?}", workspace);
        Ok(Self {
            workspace: workspace.to_path_buf(),
            conn,
            organizer,
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn close(self) -> anyhow::Result<()> {
        let workspace = self.workspace;
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("failed to close database")?;
        info!("closed workspace {:?}", workspace);
        Ok(())
    }
}

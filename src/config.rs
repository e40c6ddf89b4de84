use clap::Parser;
use std::path::PathBuf;

use crate::auth::DEFAULT_ADMIN_SECRET;

/// Sidecar configuration, from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "labdocsd", version, about = "Laboratory practice tracking sidecar")]
pub struct Config {
    /// Workspace to open at startup. Without it the UI must send `workspace.select`.
    #[arg(long, env = "LABDOCSD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Secret required to add teachers.
    #[arg(
        long,
        env = "LABDOCSD_ADMIN_SECRET",
        default_value = DEFAULT_ADMIN_SECRET,
        hide_env_values = true
    )]
    pub admin_secret: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "LABDOCSD_LOG", default_value = "info")]
    pub log_level: String,
}

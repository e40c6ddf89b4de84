mod auth;
mod config;
mod db;
mod error;
mod extract;
mod files;
mod ipc;
mod models;
mod records;
mod report;
mod session;

use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(default_level: &str) {
    // stdout is the IPC channel; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let config = config::Config::parse();
    init_logging(&config.log_level);

    let mut state = ipc::AppState::new(
        Box::new(auth::AdminSecret::new(&config.admin_secret)),
        Box::new(extract::PdfExtractor),
    );

    if let Some(workspace) = &config.workspace {
        match session::Session::open(workspace) {
            Ok(s) => state.session = Some(s),
            Err(e) => {
                error!("{e:#}");
                std::process::exit(1);
            }
        }
    }
    info!("labdocsd {} ready", env!("CARGO_PKG_VERSION"));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let _ = writeln!(stdout, "{}", ipc::err("", "bad_json", e.to_string(), None));
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    state.close_session();
}

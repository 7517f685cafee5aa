//! Input sources for the interactive front end.
//!
//! A watched SQL file produces the edited text; stdin carries short
//! commands such as `:dialect postgres`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur while reading or watching the SQL file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to create file watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    #[error("Path '{0}' does not name a file")]
    NoFileName(PathBuf),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A command typed on stdin during `watch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch dialect and re-submit the current text.
    Dialect(String),
    Quit,
    Help,
    Unknown(String),
}

/// Parse one stdin line. Blank lines are ignored.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    let command = match head {
        ":q" | ":quit" | ":exit" => Command::Quit,
        ":h" | ":help" => Command::Help,
        ":d" | ":dialect" => match parts.next() {
            Some(name) => Command::Dialect(name.to_ascii_lowercase()),
            None => Command::Unknown(line.to_string()),
        },
        _ => Command::Unknown(line.to_string()),
    };
    Some(command)
}

/// Read the SQL file.
pub fn read_source(path: &Path) -> Result<String, InputError> {
    fs::read_to_string(path).map_err(|e| InputError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Watches one file and signals every change.
///
/// The watcher only reports that the file changed; the receiver re-reads
/// it. Bursts are not collapsed here, the coordinator debounces.
pub struct FileWatcher {
    // Dropping the watcher stops notifications.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn start(path: &Path, changes: mpsc::UnboundedSender<()>) -> Result<Self, InputError> {
        let file_name = path
            .file_name()
            .map(|s| s.to_os_string())
            .ok_or_else(|| InputError::NoFileName(path.to_path_buf()))?;
        let watch_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) if is_target_event(&event, &file_name) => {
                    let _ = changes.send(());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "File watch error"),
            },
            notify::Config::default(),
        )?;

        // Watch the parent directory (editors often replace the file)
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %watch_dir.display(), "Watching for changes");

        Ok(Self { _watcher: watcher })
    }
}

/// Check if a notify event touches the watched file.
fn is_target_event(event: &Event, file_name: &OsString) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    );

    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|name| name == file_name))
}

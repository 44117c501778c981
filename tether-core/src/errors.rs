use std::fmt;

use crate::repo::Strategy;

/// Collapse libgit2's multi-line messages into a single line.
fn sanitize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug)]
pub enum SyncError {
    /// The requested remote is not configured in the repository.
    UnknownRemote {
        remote: String,
        configured: Vec<String>,
    },
    /// A plain push was rejected because the remote has commits we lack.
    PushRejected { remote: String, branch: String },
    /// A force-with-lease push found the remote moved since the last fetch.
    StaleLease { remote: String, branch: String },
    /// Integration stopped on conflicts; never auto-resolved.
    Conflict {
        operation: Strategy,
        files: Vec<String>,
    },
    /// The user declined to continue at an interactive prompt.
    Cancelled,
    /// The repository is in a shape the engine cannot work with.
    Repo(String),
    /// An underlying libgit2 operation failed.
    Git {
        context: String,
        source: Box<git2::Error>,
    },
    /// A filesystem operation failed.
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl SyncError {
    pub(crate) fn git<S: Into<String>>(context: S, source: git2::Error) -> Self {
        SyncError::Git {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        SyncError::Io {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::UnknownRemote { remote, configured } => {
                if configured.is_empty() {
                    write!(f, "unknown remote `{remote}`; no remotes are configured")
                } else {
                    write!(
                        f,
                        "unknown remote `{remote}`; configured remotes: {}",
                        configured.join(", ")
                    )
                }
            }
            SyncError::PushRejected { remote, branch } => write!(
                f,
                "push to {remote}/{branch} was rejected as non-fast-forward; \
                 the remote has new commits, rerun the sync to integrate them"
            ),
            SyncError::StaleLease { remote, branch } => write!(
                f,
                "force-with-lease push to {remote}/{branch} was rejected; \
                 someone else pushed while this sync ran, fetch and review their work before retrying"
            ),
            SyncError::Conflict { operation, files } => write!(
                f,
                "{} stopped on conflicts in: {}; resolve the listed files, \
                 then finish or abort the {} manually",
                operation.label(),
                files.join(", "),
                operation.label()
            ),
            SyncError::Cancelled => write!(f, "sync cancelled at user request"),
            SyncError::Repo(message) => write!(f, "{message}"),
            SyncError::Git { context, source } => {
                write!(f, "{context}: {}", sanitize_text(source.message()))
            }
            SyncError::Io { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Git { source, .. } => Some(source.as_ref()),
            SyncError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Non-fatal report that the auto-created stash could not be restored.
///
/// Always surfaced alongside the primary result, never instead of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreWarning {
    pub label: String,
    pub detail: String,
}

impl fmt::Display for RestoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not restore auto-stash `{}`: {}; once the working tree is settled, \
             run `git stash pop` to recover your uncommitted changes",
            self.label, self.detail
        )
    }
}

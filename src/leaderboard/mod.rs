/// Leaderboard: the ranked list shown on the prompt overlay.
///
/// The list starts from a built-in seed and is replaced whole by each
/// successful fetch. A failed fetch is logged and leaves the list alone;
/// it never reaches the session.

pub mod source;

use std::path::PathBuf;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use source::{source_from_location, LeaderboardSource};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
}

impl LeaderboardEntry {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        LeaderboardEntry { name: name.into(), score }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("invalid leaderboard URL {0}")]
    InvalidUrl(String),
    #[error("unsupported URL scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("could not set up TLS: {0}")]
    Tls(String),
    #[error("could not build request: {0}")]
    Request(String),
    #[error("leaderboard request failed: {0}")]
    Transport(String),
    #[error("leaderboard request timed out")]
    Timeout,
    #[error("leaderboard server answered {0}")]
    Status(u16),
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed leaderboard: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type FetchFuture = LocalBoxFuture<'static, Result<Vec<LeaderboardEntry>, LeaderboardError>>;

/// One best-effort fetch. Nothing happens until the future is polled.
pub fn fetch(source: Rc<dyn LeaderboardSource>) -> FetchFuture {
    async move { source.fetch().await }.boxed_local()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// The list shown before any fetch has succeeded.
    pub fn seeded() -> Self {
        Leaderboard {
            entries: vec![
                LeaderboardEntry::new("Peter", 100),
                LeaderboardEntry::new("Steve", 80),
            ],
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Entries with their 1-based rank.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &LeaderboardEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (i + 1, e))
    }

    /// Take a fetch result: replace on success, keep the current list on
    /// failure.
    pub fn apply(&mut self, result: Result<Vec<LeaderboardEntry>, LeaderboardError>) {
        match result {
            Ok(entries) => {
                info!(count = entries.len(), "leaderboard updated");
                self.entries = entries;
            }
            Err(e) => warn!(error = %e, "failed to fetch leaderboard"),
        }
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Leaderboard::seeded()
    }
}

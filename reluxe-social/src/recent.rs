//! Recently searched terms, persisted as a JSON array by the host shell.
//! A corrupted cache deserializes to the empty list rather than failing.

use serde::{Deserialize, Serialize};

const DEFAULT_CAP: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentSearches {
    entries: Vec<String>,
}

impl RecentSearches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted cache. Malformed JSON is swallowed into the
    /// empty list.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(mut entries) => {
                entries.truncate(DEFAULT_CAP);
                Self { entries }
            }
            Err(e) => {
                tracing::debug!(error = %e, "recent-search cache unreadable, starting empty");
                Self::new()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".into())
    }

    /// Record a search: most recent first, deduplicated, bounded.
    pub fn push(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        self.entries
            .retain(|existing| !existing.eq_ignore_ascii_case(term));
        self.entries.insert(0, term.to_string());
        self.entries.truncate(DEFAULT_CAP);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

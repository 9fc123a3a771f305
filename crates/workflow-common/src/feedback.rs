use std::fs;
use std::path::PathBuf;

use alfred_core::{Feedback, Item};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::storage::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackFormat {
    Xml,
    Json,
}

impl FeedbackFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "xml" => Some(Self::Xml),
            "json" | "alfred-json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Collects items during the feedback phase. [`FeedbackBuilder::to_alfred`]
/// consumes the builder, so a run serializes its items exactly once.
#[derive(Debug)]
pub struct FeedbackBuilder {
    format: FeedbackFormat,
    items: Vec<Item>,
}

impl FeedbackBuilder {
    pub fn new(format: FeedbackFormat) -> Self {
        Self {
            format,
            items: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: Item) -> &mut Self {
        self.items.push(item);
        self
    }

    pub fn extend<I>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = Item>,
    {
        self.items.extend(items);
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_alfred(self, query: &str) -> Result<String, WorkflowError> {
        let feedback = Feedback::new(self.items);
        match self.format {
            FeedbackFormat::Xml => Ok(feedback.to_xml(query)),
            FeedbackFormat::Json => feedback.to_json().map_err(|error| {
                WorkflowError::invalid_format(format!("failed to serialize feedback: {error}"))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub query: String,
    pub fetched_at: String,
    pub items: Vec<Item>,
}

/// Last computed feedback for a query, kept in the volatile directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackCache {
    path: PathBuf,
    ttl_secs: u64,
}

impl FeedbackCache {
    pub fn new(path: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self {
            path: path.into(),
            ttl_secs,
        }
    }

    /// Items cached for `query` when the record is younger than the TTL.
    /// Missing, corrupt, stale, or foreign-query records are misses.
    pub fn load(&self, query: &str, now: DateTime<Utc>) -> Option<Vec<Item>> {
        let payload = fs::read_to_string(&self.path).ok()?;
        let record = match serde_json::from_str::<CacheRecord>(&payload) {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!(path = %self.path.display(), %error, "ignoring corrupt feedback cache");
                return None;
            }
        };

        if record.query != query {
            return None;
        }

        let fetched_at = DateTime::parse_from_rfc3339(&record.fetched_at)
            .ok()?
            .with_timezone(&Utc);
        let age_secs = now.signed_duration_since(fetched_at).num_seconds().max(0);
        let age_secs = u64::try_from(age_secs).unwrap_or(u64::MAX);
        if age_secs > self.ttl_secs {
            tracing::debug!(age_secs, ttl_secs = self.ttl_secs, "feedback cache is stale");
            return None;
        }

        Some(record.items)
    }

    pub fn store(&self, query: &str, items: &[Item], now: DateTime<Utc>) -> Result<(), WorkflowError> {
        let record = CacheRecord {
            query: query.to_string(),
            fetched_at: now.to_rfc3339(),
            items: items.to_vec(),
        };
        let payload = serde_json::to_vec(&record).map_err(|error| {
            WorkflowError::invalid_format(format!("failed to serialize feedback cache: {error}"))
        })?;
        write_atomic(&self.path, &payload).map_err(|source| WorkflowError::path(&self.path, source))
    }
}

//! Purpose: Define the catalog record, its draft form, and timestamp handling.
//! Exports: `Record`, `RecordDraft`, `parse_timestamp`, `format_timestamp`, `now_timestamp`.
//! Role: Shared data model for the store, derivation engine, and remote client.
//! Invariants: `id` is the identity; every other field is replaceable by update.
//! Invariants: Wire names follow the remote API (`userId`, `createdAt`).
use crate::core::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub title: String,
    pub body: String,
    #[serde(rename = "userId", alias = "ownerId")]
    pub owner_id: u64,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

/// A record the server has not assigned an id to yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub title: String,
    pub body: String,
    #[serde(rename = "userId", alias = "ownerId")]
    pub owner_id: u64,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl Record {
    pub fn from_draft(id: u64, draft: RecordDraft) -> Self {
        Self {
            id,
            title: draft.title,
            body: draft.body,
            owner_id: draft.owner_id,
            created_at: draft.created_at,
        }
    }

    /// Parsed `created_at`; `None` when absent or unparseable.
    pub fn timestamp(&self) -> Option<OffsetDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

impl RecordDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>, owner_id: u64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            owner_id,
            created_at: None,
        }
    }
}

/// Accepts RFC 3339 instants and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ts) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(ts);
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String, Error> {
    ts.format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to format timestamp")
            .with_source(err)
    })
}

pub fn now_timestamp() -> Result<String, Error> {
    format_timestamp(OffsetDateTime::now_utc())
}

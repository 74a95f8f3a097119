//! Purpose: Define the notification events emitted for each catalog operation.
//! Exports: `Notice`, `NoticeKind`, `Op`, `notice_json`, `page_notice`.
//! Role: Shared contract between the record store (producer) and any sink (board, CLI).
//! Invariants: Notices describe outcomes; they never carry control flow.
//! Invariants: JSON schema is additive-only; `kind`, `op`, `time`, `message` always present.
use crate::core::derive::Page;
use crate::core::record::now_timestamp;
use serde_json::{Map, Value, json};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
            NoticeKind::Info => "info",
        }
    }
}

/// The operation a notice reports on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Load,
    Create,
    Update,
    Delete,
    View,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Load => "load",
            Op::Create => "create",
            Op::Update => "update",
            Op::Delete => "delete",
            Op::View => "view",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub op: Op,
    pub time: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn new(kind: NoticeKind, op: Op, message: impl Into<String>) -> Self {
        Self {
            kind,
            op,
            time: now_timestamp().unwrap_or_default(),
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn success(op: Op, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, op, message)
    }

    pub fn error(op: Op, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, op, message)
    }

    pub fn info(op: Op, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, op, message)
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Informs when the requested page lies past the last page of a non-empty result.
pub fn page_notice(page: &Page) -> Option<Notice> {
    let pages = page.page_count();
    if page.total == 0 || page.page <= pages {
        return None;
    }
    Some(
        Notice::info(Op::View, "page is past the last page")
            .with_detail("page", page.page)
            .with_detail("pages", pages),
    )
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind.as_str()));
    inner.insert("op".to_string(), json!(notice.op.as_str()));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

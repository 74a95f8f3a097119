//! Purpose: Line-driven interactive session over a `Catalog`.
//! Exports: `run_browse`, `parse_line`, `BrowseCommand`.
//! Role: Reads one command per input line, submits remote work in the background,
//!       and prints the derived page plus notices as they arrive.
//! Invariants: View parameter changes apply immediately, even with mutations in flight.
//! Invariants: Every applied completion is posted to the notice board and echoed once.
//! Invariants: Output lines are compact JSON; malformed commands never end the session.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::debug;

use catalog::api::{
    Applied, Catalog, DateRange, Error, ErrorKind, FilterPatch, NoticeBoard, NoticeId,
    PaginationPatch, RecordDraft, Request, SortBy, SortOrder, parse_timestamp,
};

use catalog::notice::page_notice;

use crate::{encode_json, error_json, filters_json, page_json, write_notice};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum BrowseCommand {
    Search(String),
    Range {
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    },
    Sort {
        sort_by: SortBy,
        sort_order: Option<SortOrder>,
    },
    Page(usize),
    Limit(usize),
    Reset,
    Create(RecordDraft),
    Update {
        id: u64,
        title: Option<String>,
        body: Option<String>,
        owner: Option<u64>,
    },
    Delete(u64),
    Reload,
    Show,
    Notices,
    Dismiss(NoticeId),
    Wait,
    Quit,
    Blank,
}

pub(crate) fn parse_line(line: &str) -> Result<BrowseCommand, Error> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match verb {
        "" => Ok(BrowseCommand::Blank),
        "search" => Ok(BrowseCommand::Search(rest.to_string())),
        "range" => {
            let mut bounds = rest.split_whitespace();
            let start = bounds.next().map(parse_bound).transpose()?;
            let end = bounds.next().map(parse_bound).transpose()?;
            if bounds.next().is_some() {
                return Err(usage("range takes at most two dates"));
            }
            Ok(BrowseCommand::Range { start, end })
        }
        "sort" => {
            let mut parts = rest.split_whitespace();
            let sort_by = match parts.next() {
                Some("title") => SortBy::Title,
                Some("date") => SortBy::Date,
                _ => return Err(usage("sort needs `title` or `date`")),
            };
            let sort_order = match parts.next() {
                None => None,
                Some("asc") => Some(SortOrder::Asc),
                Some("desc") => Some(SortOrder::Desc),
                Some(other) => return Err(usage(format!("unknown sort order: {other}"))),
            };
            Ok(BrowseCommand::Sort {
                sort_by,
                sort_order,
            })
        }
        "page" => Ok(BrowseCommand::Page(parse_number(rest, "page")?)),
        "limit" => Ok(BrowseCommand::Limit(parse_number(rest, "limit")?)),
        "reset" => Ok(BrowseCommand::Reset),
        "create" => {
            let (owner, text) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| usage("create needs `<owner> <title> | <body>`"))?;
            let owner = parse_number(owner, "owner")?;
            let (title, body) = match text.split_once('|') {
                Some((title, body)) => (title.trim(), body.trim()),
                None => (text.trim(), ""),
            };
            if title.is_empty() {
                return Err(usage("create needs a title"));
            }
            Ok(BrowseCommand::Create(RecordDraft::new(title, body, owner)))
        }
        "update" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let id = parse_number(parts.next().unwrap_or(""), "id")?;
            let mut update = (None, None, None);
            for field in split_fields(parts.next().unwrap_or("")) {
                match field.split_once('=') {
                    Some(("title", value)) => update.0 = Some(value.to_string()),
                    Some(("body", value)) => update.1 = Some(value.to_string()),
                    Some(("owner", value)) => update.2 = Some(parse_number(value, "owner")?),
                    _ => return Err(usage(format!("unknown update field: {field}"))),
                }
            }
            if update == (None, None, None) {
                return Err(usage("update needs title=, body=, or owner="));
            }
            Ok(BrowseCommand::Update {
                id,
                title: update.0,
                body: update.1,
                owner: update.2,
            })
        }
        "delete" => Ok(BrowseCommand::Delete(parse_number(rest, "id")?)),
        "reload" => Ok(BrowseCommand::Reload),
        "show" => Ok(BrowseCommand::Show),
        "notices" => Ok(BrowseCommand::Notices),
        "dismiss" => Ok(BrowseCommand::Dismiss(parse_number(rest, "notice id")?)),
        "wait" => Ok(BrowseCommand::Wait),
        "quit" | "exit" => Ok(BrowseCommand::Quit),
        other => Err(usage(format!("unknown command: {other}"))
            .with_hint("Commands: search range sort page limit reset create update delete reload show notices dismiss wait quit")),
    }
}

/// Splits `key=value` fields; values run until the next ` key=` so titles may contain spaces.
fn split_fields(raw: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for token in raw.split_whitespace() {
        let starts_field = token
            .split_once('=')
            .is_some_and(|(key, _)| matches!(key, "title" | "body" | "owner"));
        match fields.last_mut() {
            Some(last) if !starts_field => {
                last.push(' ');
                last.push_str(token);
            }
            _ => fields.push(token.to_string()),
        }
    }
    fields
}

fn parse_bound(raw: &str) -> Result<OffsetDateTime, Error> {
    parse_timestamp(raw).ok_or_else(|| {
        usage(format!("invalid date: {raw}"))
            .with_hint("Use RFC 3339 (2024-01-31T12:00:00Z) or a plain date (2024-01-31).")
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, Error> {
    raw.trim()
        .parse()
        .map_err(|_| usage(format!("invalid {what}: {:?}", raw.trim())))
}

fn usage(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Usage).with_message(message)
}

fn io_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write browse output")
        .with_source(err)
}

struct Session<'a, W, E> {
    catalog: &'a mut Catalog,
    board: &'a mut NoticeBoard,
    out: W,
    notices: E,
}

impl<W: Write, E: Write> Session<'_, W, E> {
    fn show(&mut self) -> Result<(), Error> {
        let store = self.catalog.store();
        let value = json!({
            "page": page_json(store.page()),
            "filters": filters_json(store.filters()),
            "loading": store.is_loading(),
            "error": store.error(),
            "in_flight": self.catalog.in_flight(),
        });
        self.line(&value)
    }

    fn line(&mut self, value: &Value) -> Result<(), Error> {
        writeln!(self.out, "{}", encode_json(value, false)).map_err(io_error)?;
        self.out.flush().map_err(io_error)
    }

    fn report(&mut self, err: &Error) -> Result<(), Error> {
        writeln!(self.notices, "{}", encode_json(&error_json(err), false)).map_err(io_error)
    }

    /// Posts applied completions; returns whether the page may have changed.
    fn post(&mut self, applied: Vec<Applied>) -> Result<bool, Error> {
        let changed = !applied.is_empty();
        let now = Instant::now();
        for Applied { ticket, notice } in applied {
            write_notice(&mut self.notices, &notice).map_err(io_error)?;
            let id = self.board.post(notice, now);
            debug!(ticket, notice = id, "notice posted");
        }
        Ok(changed)
    }

    /// Shows the page, then informs if it lies past the last page.
    fn show_paged(&mut self) -> Result<(), Error> {
        self.show()?;
        if let Some(notice) = page_notice(self.catalog.page()) {
            write_notice(&mut self.notices, &notice).map_err(io_error)?;
            let id = self.board.post(notice, Instant::now());
            debug!(notice = id, "view notice posted");
        }
        Ok(())
    }

    fn expire(&mut self) {
        let now = Instant::now();
        if self.board.next_deadline().is_none_or(|deadline| deadline > now) {
            return;
        }
        for posted in self.board.expire(now) {
            debug!(notice = posted.id, "notice expired");
        }
    }

    fn settle(&mut self) -> Result<bool, Error> {
        let applied = self.catalog.settle(SETTLE_TIMEOUT);
        self.post(applied)
    }

    fn list_notices(&mut self) -> Result<(), Error> {
        let now = Instant::now();
        let notices = self
            .board
            .active()
            .iter()
            .map(|posted| {
                json!({
                    "id": posted.id,
                    "expires_in_ms": posted.expires_at.saturating_duration_since(now).as_millis() as u64,
                    "notice": catalog::notice::notice_json(&posted.notice)["notice"],
                })
            })
            .collect::<Vec<_>>();
        self.line(&json!({ "notices": notices }))
    }

    fn update(
        &mut self,
        id: u64,
        title: Option<String>,
        body: Option<String>,
        owner: Option<u64>,
    ) -> Result<(), Error> {
        let cached = self.catalog.store().get(id).cloned();
        let mut record = match cached {
            Some(record) => record,
            None => self.catalog.fetch_one(id)?,
        };
        if let Some(title) = title {
            record.title = title;
        }
        if let Some(body) = body {
            record.body = body;
        }
        if let Some(owner) = owner {
            record.owner_id = owner;
        }
        self.catalog.submit(Request::Update(record));
        Ok(())
    }

    /// Runs one command; returns `Ok(false)` when the session should end.
    fn handle(&mut self, command: BrowseCommand) -> Result<bool, Error> {
        match command {
            BrowseCommand::Blank => {}
            BrowseCommand::Search(text) => {
                self.catalog.set_filters(FilterPatch::search(text));
                self.show()?;
            }
            BrowseCommand::Range { start, end } => {
                self.catalog
                    .set_filters(FilterPatch::date_range(DateRange::new(start, end)));
                self.show()?;
            }
            BrowseCommand::Sort {
                sort_by,
                sort_order,
            } => {
                let sort_order = sort_order.unwrap_or(self.catalog.store().filters().sort_order);
                self.catalog
                    .set_filters(FilterPatch::sort(sort_by, sort_order));
                self.show()?;
            }
            BrowseCommand::Page(page) => {
                self.catalog.set_pagination(PaginationPatch::page(page))?;
                self.show_paged()?;
            }
            BrowseCommand::Limit(limit) => {
                self.catalog.set_pagination(PaginationPatch::limit(limit))?;
                self.show_paged()?;
            }
            BrowseCommand::Reset => {
                self.catalog.reset_filters();
                self.show()?;
            }
            BrowseCommand::Create(draft) => {
                self.catalog.submit(Request::Create(draft));
            }
            BrowseCommand::Update {
                id,
                title,
                body,
                owner,
            } => self.update(id, title, body, owner)?,
            BrowseCommand::Delete(id) => {
                self.catalog.submit(Request::Delete(id));
            }
            BrowseCommand::Reload => {
                self.catalog.submit(Request::Load);
                self.show()?;
            }
            BrowseCommand::Show => self.show()?,
            BrowseCommand::Notices => self.list_notices()?,
            BrowseCommand::Dismiss(id) => {
                let found = self.board.dismiss(id);
                self.line(&json!({ "dismissed": id, "found": found }))?;
            }
            BrowseCommand::Wait => {
                self.settle()?;
                self.show()?;
            }
            BrowseCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

/// Drives a session until `quit` or end of input, then waits for in-flight work.
pub(crate) fn run_browse<R, W, E>(
    catalog: &mut Catalog,
    board: &mut NoticeBoard,
    input: R,
    out: W,
    notices: E,
) -> Result<(), Error>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut session = Session {
        catalog,
        board,
        out,
        notices,
    };
    session.catalog.submit(Request::Load);
    session.settle()?;
    session.show()?;

    for line in input.lines() {
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read browse input")
                .with_source(err)
        })?;
        session.expire();
        let keep_going = match parse_line(&line).and_then(|command| session.handle(command)) {
            Ok(keep_going) => keep_going,
            Err(err) if err.kind() == ErrorKind::Io => return Err(err),
            Err(err) => {
                session.report(&err)?;
                true
            }
        };
        let applied = session.catalog.pump();
        if session.post(applied)? {
            session.show()?;
        }
        if !keep_going {
            break;
        }
    }

    if session.settle()? {
        session.show()?;
    }
    Ok(())
}

//! Purpose: `catalog` CLI entry point.
//! Role: Binary crate root; parses args, resolves config, runs commands, emits JSON.
//! Invariants: Results go to stdout; notices and errors go to stderr as JSON lines.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every store mutation goes through `api::Catalog`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};

mod browse;
mod command_dispatch;
mod serve;

use catalog::api::{
    Catalog, DateRange, Error, ErrorKind, FilterPatch, FilterState, NoticeBoard, Page,
    PaginationPatch, Record, RecordApi, RecordDraft, RemoteClient, SortBy, SortOrder,
    parse_timestamp, to_exit_code,
};
use catalog::config::CatalogConfig;
use catalog::notice::{Notice, notice_json, page_notice};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint(clap_error_hint(&err)));
            }
        },
    };

    let default_filter = match cli.command {
        Command::Serve(_) => "info",
        _ => "warn",
    };
    init_tracing(default_filter);

    command_dispatch::dispatch_command(cli.command, cli.remote)
        .map_err(add_network_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
}

#[derive(Parser)]
#[command(
    name = "catalog",
    version,
    about = "Browse, filter, and edit a remote record collection",
    long_about = None,
    after_help = r#"EXAMPLES
  $ catalog list --search apple --sort title --order asc
  $ catalog list --from 2024-01-01 --to 2024-01-31 --page 2 --json
  $ catalog create --title "Hello" --body "First post" --owner 1
  $ catalog serve --seed 25                 # local mock of the remote API
  $ CATALOG_BASE_URL=http://127.0.0.1:9800 catalog browse

ENVIRONMENT
  CATALOG_BASE_URL, CATALOG_RESOURCE, CATALOG_TIMEOUT_MS, CATALOG_FETCH_LIMIT,
  CATALOG_PAGE_LIMIT; flags take precedence. RUST_LOG controls diagnostics."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    remote: RemoteArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Debug, Default)]
struct RemoteArgs {
    #[arg(long, global = true, help = "Remote API base URL (http or https)")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Collection name under the base URL (default: posts)")]
    resource: Option<String>,
    #[arg(long, global = true, help = "Per-request timeout in milliseconds")]
    timeout_ms: Option<u64>,
    #[arg(long, global = true, help = "Records fetched by the initial load (default: 100)")]
    fetch_limit: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SortArg {
    Title,
    Date,
}

impl From<SortArg> for SortBy {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Title => SortBy::Title,
            SortArg::Date => SortBy::Date,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Load all records, then filter, sort, and print one page")]
    List(ListArgs),
    #[command(about = "Fetch one record by id")]
    Get {
        #[arg(help = "Record id")]
        id: u64,
    },
    #[command(about = "Create a record")]
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long, help = "Owning user id")]
        owner: u64,
    },
    #[command(about = "Update a record; unspecified fields keep their current values")]
    Update {
        #[arg(help = "Record id")]
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long, help = "Owning user id")]
        owner: Option<u64>,
    },
    #[command(about = "Delete a record (an already-absent id still succeeds)")]
    Delete {
        #[arg(help = "Record id")]
        id: u64,
    },
    #[command(
        about = "Interactive session driven by one command per stdin line",
        after_help = r#"COMMANDS
  search <text>          filter by title/body substring (empty clears)
  range <from> <to>      inclusive date range; `range` alone clears
  sort title|date [asc|desc]
  page <n> | limit <n>
  reset                  clear filters and return to page 1
  create <owner> <title> | <body>
  update <id> [title=<t>] [body=<b>] [owner=<n>]
  delete <id>
  reload | show | notices | dismiss <id> | wait | quit"#
    )]
    Browse,
    #[command(about = "Serve an in-memory mock of the remote API on loopback")]
    Serve(ServeArgs),
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, help = "Case-insensitive substring of title or body")]
    search: Option<String>,
    #[arg(long, help = "Range start (RFC 3339 or YYYY-MM-DD); needs --to")]
    from: Option<String>,
    #[arg(long, help = "Range end (RFC 3339 or YYYY-MM-DD); needs --from")]
    to: Option<String>,
    #[arg(long, value_enum, default_value = "date")]
    sort: SortArg,
    #[arg(long, value_enum, default_value = "desc")]
    order: OrderArg,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, help = "Records per page (default: 10)")]
    limit: Option<usize>,
    #[arg(long, help = "Emit the page as JSON instead of a table")]
    json: bool,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:9800", help = "Loopback address to bind")]
    bind: String,
    #[arg(long, help = "JSON array of records to start with", conflicts_with = "seed")]
    seed_file: Option<PathBuf>,
    #[arg(long, help = "Generate N sample records", default_value_t = 0)]
    seed: usize,
}

fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_config(remote: &RemoteArgs) -> Result<CatalogConfig, Error> {
    let mut config = CatalogConfig::from_env()?;
    if let Some(base_url) = &remote.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(resource) = &remote.resource {
        config.resource = resource.clone();
    }
    if let Some(timeout_ms) = remote.timeout_ms {
        config.timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(fetch_limit) = remote.fetch_limit {
        config.fetch_limit = fetch_limit;
    }
    config.validate()?;
    Ok(config)
}

fn open_catalog(config: &CatalogConfig) -> Result<Catalog, Error> {
    let client: Arc<dyn RecordApi> = Arc::new(RemoteClient::from_config(config)?);
    Catalog::from_config(client, config)
}

fn parse_date_arg(flag: &str, raw: &str) -> Result<time::OffsetDateTime, Error> {
    parse_timestamp(raw).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid {flag} date: {raw}"))
            .with_hint("Use RFC 3339 (2024-01-31T12:00:00Z) or a plain date (2024-01-31).")
    })
}

fn list_patch(args: &ListArgs) -> Result<FilterPatch, Error> {
    let start = args
        .from
        .as_deref()
        .map(|raw| parse_date_arg("--from", raw))
        .transpose()?;
    let end = args
        .to
        .as_deref()
        .map(|raw| parse_date_arg("--to", raw))
        .transpose()?;
    if start.is_some() != end.is_some() {
        tracing::warn!("a date range needs both --from and --to; the lone bound is ignored");
    }
    Ok(FilterPatch {
        search: Some(args.search.clone().unwrap_or_default()),
        date_range: Some(DateRange::new(start, end)),
        sort_by: Some(args.sort.into()),
        sort_order: Some(args.order.into()),
    })
}

fn list_pagination(args: &ListArgs) -> PaginationPatch {
    PaginationPatch {
        page: Some(args.page),
        limit: args.limit,
    }
}

fn record_json(record: &Record) -> Value {
    serde_json::to_value(record).unwrap_or_else(|_| json!({ "id": record.id }))
}

fn page_json(page: &Page) -> Value {
    json!({
        "items": page.items.iter().map(record_json).collect::<Vec<_>>(),
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "pages": page.page_count(),
        "has_next": page.has_next(),
        "has_prev": page.has_prev(),
    })
}

fn filters_json(filters: &FilterState) -> Value {
    let bound = |value: Option<time::OffsetDateTime>| {
        value.and_then(|ts| catalog::core::record::format_timestamp(ts).ok())
    };
    json!({
        "search": filters.search,
        "from": bound(filters.date_range.start),
        "to": bound(filters.date_range.end),
        "sort": match filters.sort_by {
            SortBy::Title => "title",
            SortBy::Date => "date",
        },
        "order": match filters.sort_order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        },
    })
}

fn emit_page_table(page: &Page) {
    let rows = page
        .items
        .iter()
        .map(|record| {
            vec![
                record.id.to_string(),
                record.title.clone(),
                record.owner_id.to_string(),
                record.created_at.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    println!("{}", render_table(&["ID", "TITLE", "OWNER", "CREATED"], &rows));
    println!(
        "page {}/{} ({} matching)",
        page.page,
        page.page_count().max(1),
        page.total
    );
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| {
            widths
                .iter_mut()
                .enumerate()
                .map(|(idx, width)| {
                    let cell = row
                        .get(idx)
                        .map(|value| value.replace('\n', "\\n").replace('\r', "\\r"))
                        .unwrap_or_default();
                    *width = (*width).max(cell.chars().count());
                    cell
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    lines.push(format_table_line(&header_cells, &widths));
    for row in &rows {
        lines.push(format_table_line(row, &widths));
    }
    lines.join("\n")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if idx + 1 < widths.len() && *width > cell_len {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line
}

fn encode_json(value: &Value, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
}

fn emit_json(value: Value) {
    println!("{}", encode_json(&value, io::stdout().is_terminal()));
}

fn write_notice<W: Write>(out: &mut W, notice: &Notice) -> io::Result<()> {
    writeln!(out, "{}", encode_json(&notice_json(notice), false))
}

fn emit_notice(notice: &Notice) {
    let _ = write_notice(&mut io::stderr().lock(), notice);
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    eprintln!("{}", encode_json(&error_json(err), false));
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(id) = err.id() {
        inner.insert("id".to_string(), json!(id));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn add_network_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Network || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "The remote API was unreachable or answered badly. Check --base-url and --timeout-ms.",
    )
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path, permissions, and that the address is free.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share the command if it persists.",
    )
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let subcommand = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .and_then(|usage| {
            let mut tokens = usage.split_whitespace();
            tokens.find(|token| *token == "catalog")?;
            tokens
                .next()
                .filter(|token| !token.starts_with(['-', '<', '[']))
        });
    match subcommand {
        Some(name) => format!("Try `catalog {name} --help`."),
        None => "Try `catalog --help`.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cli, Command, ListArgs, OrderArg, RemoteArgs, SortArg, error_json, list_pagination,
        list_patch, page_json, render_table, resolve_config,
    };
    use catalog::api::{Error, ErrorKind, Page, Pagination, SortBy, SortOrder};
    use clap::Parser;

    fn list_args() -> ListArgs {
        ListArgs {
            search: None,
            from: None,
            to: None,
            sort: SortArg::Date,
            order: OrderArg::Desc,
            page: 1,
            limit: None,
            json: false,
        }
    }

    #[test]
    fn list_flags_become_a_full_filter_patch() {
        let mut args = list_args();
        args.search = Some("apple".to_string());
        args.from = Some("2024-01-01".to_string());
        args.to = Some("2024-01-31T23:59:59Z".to_string());
        args.sort = SortArg::Title;
        args.order = OrderArg::Asc;
        let patch = list_patch(&args).expect("patch");
        assert_eq!(patch.search.as_deref(), Some("apple"));
        assert!(patch.date_range.expect("range").is_active());
        assert_eq!(patch.sort_by, Some(SortBy::Title));
        assert_eq!(patch.sort_order, Some(SortOrder::Asc));
    }

    #[test]
    fn invalid_date_is_usage_error() {
        let mut args = list_args();
        args.from = Some("last tuesday".to_string());
        let err = list_patch(&args).expect_err("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.hint().is_some());
    }

    #[test]
    fn list_pagination_keeps_default_limit_when_unset() {
        let mut args = list_args();
        args.page = 3;
        let patch = list_pagination(&args);
        assert_eq!(patch.page, Some(3));
        assert_eq!(patch.limit, None);
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "catalog",
            "list",
            "--base-url",
            "http://127.0.0.1:1",
            "--sort",
            "title",
        ])
        .expect("parse");
        assert_eq!(cli.remote.base_url.as_deref(), Some("http://127.0.0.1:1"));
        assert!(matches!(cli.command, Command::List(ListArgs { sort: SortArg::Title, .. })));
    }

    #[test]
    fn flags_override_defaults() {
        let remote = RemoteArgs {
            base_url: Some("http://127.0.0.1:9".to_string()),
            resource: Some("articles".to_string()),
            timeout_ms: Some(250),
            fetch_limit: Some(7),
        };
        let config = resolve_config(&remote).expect("config");
        assert_eq!(config.base_url, "http://127.0.0.1:9");
        assert_eq!(config.resource, "articles");
        assert_eq!(config.timeout.as_millis(), 250);
        assert_eq!(config.fetch_limit, 7);
    }

    #[test]
    fn zero_fetch_limit_is_rejected() {
        let remote = RemoteArgs {
            fetch_limit: Some(0),
            ..RemoteArgs::default()
        };
        let err = resolve_config(&remote).expect_err("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn error_json_carries_kind_hint_and_id() {
        let err = Error::new(ErrorKind::NotFound)
            .with_message("record not found")
            .with_hint("check the id")
            .with_id(9);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "NotFound");
        assert_eq!(value["error"]["hint"], "check the id");
        assert_eq!(value["error"]["id"], 9);
    }

    #[test]
    fn page_json_reports_page_count() {
        let mut page = Page::empty(Pagination::default());
        page.total = 25;
        let value = page_json(&page);
        assert_eq!(value["pages"], 3);
        assert_eq!(value["items"].as_array().map(Vec::len), Some(0));
        assert_eq!(value["has_next"], true);
        assert_eq!(value["has_prev"], false);

        page.page = 3;
        let last = page_json(&page);
        assert_eq!(last["has_next"], false);
        assert_eq!(last["has_prev"], true);
    }

    #[test]
    fn table_escapes_newlines() {
        let rendered = render_table(&["ID", "TITLE"], &[vec!["1".to_string(), "a\nb".to_string()]]);
        assert!(rendered.contains("a\\nb"));
        assert!(rendered.lines().count() == 2);
    }
}

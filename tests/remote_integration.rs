//! Purpose: End-to-end tests for the HTTP client and catalog against `catalog serve`.
//! Exports: None (integration test module).
//! Role: Validate CRUD, error mapping, and derivation over real TCP round-trips.
//! Invariants: Uses a loopback-only server seeded from a temp file.
//! Invariants: Server processes are cleaned up on drop.

mod common;

use catalog::api::{
    Catalog, ErrorKind, FilterPatch, PaginationPatch, RecordApi, RecordDraft, RemoteClient,
    Request, SortBy, SortOrder,
};
use catalog::notice::{NoticeKind, Op};
use common::{TestResult, TestServer, closed_base_url};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn ids(catalog: &Catalog) -> Vec<u64> {
    catalog.page().items.iter().map(|record| record.id).collect()
}

#[test]
fn remote_list_windows_and_get() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = RemoteClient::new(server.base_url.clone())?;

    let window = client.list(1, 2)?;
    assert_eq!(window.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);

    let record = client.get(3)?;
    assert_eq!(record.title, "Cherry tart");
    assert_eq!(record.owner_id, 2);

    let err = client.get(99).expect_err("missing record");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.id(), Some(99));
    Ok(())
}

#[test]
fn remote_create_update_delete() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = RemoteClient::new(server.base_url.clone())?;

    let created = client.create(&RecordDraft::new("Elderflower", "cordial", 3))?;
    assert_eq!(created.id, 5);
    assert!(created.timestamp().is_some());

    let mut edited = created.clone();
    edited.title = "Elderflower fizz".to_string();
    edited.created_at = None;
    let updated = client.update(&edited)?;
    assert_eq!(updated.title, "Elderflower fizz");
    assert_eq!(updated.created_at, created.created_at);

    client.delete(5)?;
    let err = client.delete(5).expect_err("already deleted");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(client.get(5).expect_err("gone").kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn remote_strips_query_and_maps_unknown_collection() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = RemoteClient::new(format!("{}/?debug=1#top", server.base_url))?
        .with_resource("articles")?;
    let err = client.list(0, 10).expect_err("unknown collection");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn catalog_loads_and_derives_pages() -> TestResult<()> {
    let server = TestServer::start()?;
    let mut catalog = Catalog::new(Arc::new(RemoteClient::new(server.base_url.clone())?));

    let loaded = catalog.load_all();
    assert_eq!(loaded.result?, 4);
    assert_eq!(loaded.notice.kind, NoticeKind::Success);
    assert_eq!(loaded.notice.op, Op::Load);
    // Record 4 has no createdAt, so it carries the load time and sorts newest.
    assert_eq!(ids(&catalog), vec![4, 3, 1, 2]);

    catalog.set_filters(FilterPatch::sort(SortBy::Title, SortOrder::Asc));
    assert_eq!(ids(&catalog), vec![2, 1, 3, 4]);

    catalog.set_filters(FilterPatch::search("AN"));
    assert_eq!(ids(&catalog), vec![1]);

    catalog.reset_filters();
    catalog.set_pagination(PaginationPatch::limit(3))?;
    catalog.set_pagination(PaginationPatch::page(2))?;
    assert_eq!(ids(&catalog), vec![2]);
    assert_eq!(catalog.page().page_count(), 2);
    Ok(())
}

#[test]
fn catalog_background_mutations_settle() -> TestResult<()> {
    let server = TestServer::start()?;
    let mut catalog = Catalog::new(Arc::new(RemoteClient::new(server.base_url.clone())?));
    catalog.load_all().result?;

    catalog.submit(Request::Create(RecordDraft::new("Fig roll", "sticky", 4)));
    catalog.submit(Request::Delete(2));
    let applied = catalog.settle(Duration::from_secs(10));

    assert_eq!(applied.len(), 2);
    assert!(applied.iter().all(|a| a.notice.kind == NoticeKind::Success));
    assert_eq!(catalog.in_flight(), 0);

    let all = catalog.store().all_items();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|record| record.id != 2));
    assert!(all.iter().any(|record| record.title == "Fig roll"));
    assert_eq!(ids(&catalog)[0], 5);
    Ok(())
}

#[test]
fn deleting_absent_id_reports_success() -> TestResult<()> {
    let server = TestServer::start_with(&json!([]))?;
    let mut catalog = Catalog::new(Arc::new(RemoteClient::new(server.base_url.clone())?));
    catalog.load_all().result?;

    let outcome = catalog.delete(42);
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.notice.kind, NoticeKind::Success);
    assert!(catalog.store().all_items().is_empty());
    Ok(())
}

#[test]
fn unreachable_remote_sets_page_error() -> TestResult<()> {
    let client = RemoteClient::new(closed_base_url()?)?.with_timeout(Duration::from_millis(500));
    let mut catalog = Catalog::new(Arc::new(client));

    let outcome = catalog.load_all();
    let err = outcome.result.expect_err("network failure");
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(outcome.notice.kind, NoticeKind::Error);
    assert!(catalog.store().error().is_some());
    assert!(!catalog.store().is_loading());
    assert!(catalog.store().all_items().is_empty());

    let created = catalog.create(&RecordDraft::new("x", "y", 1));
    assert_eq!(created.notice.kind, NoticeKind::Error);
    assert!(catalog.store().all_items().is_empty());
    Ok(())
}

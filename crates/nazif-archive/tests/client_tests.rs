// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use nazif_app::{QuoteDraft, QuoteId};
use nazif_archive::{ArchiveConfig, ArchiveError, Client, ListFilters};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn test_config(base_url: &str) -> ArchiveConfig {
    let mut config = ArchiveConfig::new(base_url, "anon-key", "cleaning-co");
    config.retry_base_delay = Duration::from_millis(10);
    config
}

fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body).with_status_code(200).with_header(
        Header::from_bytes("Content-Type", "application/json").expect("valid content type header"),
    )
}

fn header_value(request: &tiny_http::Request, field: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(field))
        .map(|header| header.value.as_str().to_owned())
}

#[test]
fn list_sends_tenant_scope_filters_and_auth_headers() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let url = request.url().to_owned();
        assert!(url.starts_with("/rest/v1/quotes_archive?"));
        assert!(url.contains("tenant=eq.cleaning-co"));
        assert!(url.contains("order=id.desc"));
        assert!(url.contains("date=eq.2026-03-14"));
        assert!(url.contains("client.ilike.*villa*"));
        assert!(url.contains("place.ilike.*villa*"));
        assert!(url.contains("unit_type.ilike.*villa*"));
        assert!(url.contains("limit=20"));
        assert!(url.contains("offset=40"));

        assert_eq!(header_value(&request, "apikey").as_deref(), Some("anon-key"));
        assert_eq!(
            header_value(&request, "Authorization").as_deref(),
            Some("Bearer anon-key")
        );
        assert_eq!(
            header_value(&request, "Prefer").as_deref(),
            Some("return=representation")
        );

        request
            .respond(json_response(r#"[{"id":7,"client":"Acme"},{"id":3,"client":"Borg"}]"#))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let rows = client
        .list(&ListFilters {
            eq_date: Some("2026-03-14".to_owned()),
            like_text: Some("villa".to_owned()),
            limit: Some(20),
            offset: Some(40),
            ..ListFilters::default()
        })
        .expect("list should succeed");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, Some(QuoteId::new(7)));
    assert_eq!(rows[1].client.as_deref(), Some("Borg"));

    handle.join().expect("server thread should join");
}

#[test]
fn month_filter_expands_to_a_date_range() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let url = request.url().to_owned();
        assert!(url.contains("date=gte.2026-12-01"));
        assert!(url.contains("date=lt.2027-01-01"));
        request
            .respond(json_response("[]"))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let rows = client
        .list(&ListFilters {
            eq_month: Some("2026-12".to_owned()),
            ..ListFilters::default()
        })
        .expect("list should succeed");
    assert!(rows.is_empty());

    handle.join().expect("server thread should join");
}

#[test]
fn insert_stamps_the_tenant_and_returns_assigned_id() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method().as_str(), "POST");
        assert_eq!(request.url(), "/rest/v1/quotes_archive");

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("body should read");
        assert!(body.contains(r#""tenant":"cleaning-co""#));
        assert!(body.contains(r#""client":"Acme""#));
        assert!(!body.contains(r#""id""#));

        request
            .respond(json_response(
                r#"[{"id":42,"created_at":"2026-03-14T08:00:00Z","client":"Acme","tenant":"cleaning-co"}]"#,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let draft = QuoteDraft {
        client: "Acme".to_owned(),
        place: "Riyadh".to_owned(),
        subtotal: 1000.0,
        ..QuoteDraft::default()
    };
    let stored = client
        .insert(&draft.to_archive_record(1138.5))
        .expect("insert should succeed");

    assert_eq!(stored.id, Some(QuoteId::new(42)));
    assert_eq!(stored.created_at.as_deref(), Some("2026-03-14T08:00:00Z"));

    handle.join().expect("server thread should join");
}

#[test]
fn update_targets_one_row_within_the_tenant() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method().as_str(), "PATCH");
        let url = request.url().to_owned();
        assert!(url.contains("id=eq.42"));
        assert!(url.contains("tenant=eq.cleaning-co"));
        request
            .respond(json_response(r#"[{"id":42,"client":"Acme (updated)"}]"#))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let record = QuoteDraft::default().to_archive_record(0.0);
    let updated = client
        .update(QuoteId::new(42), &record)
        .expect("update should succeed");
    assert_eq!(updated.client.as_deref(), Some("Acme (updated)"));

    handle.join().expect("server thread should join");
}

#[test]
fn updating_a_missing_row_is_not_found() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response("[]"))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let record = QuoteDraft::default().to_archive_record(0.0);
    let error = client
        .update(QuoteId::new(404), &record)
        .expect_err("update should fail");
    assert!(matches!(error, ArchiveError::NotFound(_)));

    handle.join().expect("server thread should join");
}

#[test]
fn delete_of_a_missing_row_is_not_found() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method().as_str(), "DELETE");
        request
            .respond(json_response("[]"))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let error = client
        .delete(QuoteId::new(404))
        .expect_err("delete should fail");
    assert!(matches!(error, ArchiveError::NotFound(_)));

    handle.join().expect("server thread should join");
}

#[test]
fn get_by_id_returns_none_for_an_empty_result() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let url = request.url().to_owned();
        assert!(url.contains("id=eq.9"));
        assert!(url.contains("limit=1"));
        request
            .respond(json_response("[]"))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let row = client
        .get_by_id(QuoteId::new(9))
        .expect("lookup should succeed");
    assert!(row.is_none());

    handle.join().expect("server thread should join");
}

#[test]
fn server_errors_are_retried_until_success() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let first = server.recv().expect("first request expected");
        first
            .respond(Response::from_string("oops").with_status_code(503))
            .expect("response should succeed");

        let second = server.recv().expect("retry expected");
        second
            .respond(json_response(r#"[{"id":1}]"#))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let rows = client
        .list(&ListFilters::default())
        .expect("list should eventually succeed");
    assert_eq!(rows.len(), 1);

    handle.join().expect("server thread should join");
}

#[test]
fn transient_failures_surface_after_the_attempt_budget() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        // One request per configured attempt; if the client gives up early
        // a recv here hangs and the join below never completes.
        for _ in 0..3 {
            let request = server.recv().expect("request expected");
            request
                .respond(Response::from_string("still down").with_status_code(503))
                .expect("response should succeed");
        }
    });

    let config = test_config(&addr);
    assert_eq!(config.max_retries, 3);
    let client = Client::new(config).expect("client should initialize");
    let error = client
        .list(&ListFilters::default())
        .expect_err("list should fail once attempts run out");
    assert_eq!(error, ArchiveError::ServerError { status: 503 });

    handle.join().expect("server thread should join");
}

#[test]
fn invalid_data_fails_without_a_retry() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        // Exactly one request; a retry would hang on a second recv and the
        // join below would never complete.
        let request = server.recv().expect("request expected");
        request
            .respond(Response::from_string("bad column").with_status_code(422))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let record = QuoteDraft::default().to_archive_record(0.0);
    let error = client.insert(&record).expect_err("insert should fail");
    assert!(matches!(error, ArchiveError::InvalidData(_)));

    handle.join().expect("server thread should join");
}

#[test]
fn unauthorized_is_reported_as_such() {
    let server = Server::http("127.0.0.1:0").expect("start mock server");
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(Response::from_string("").with_status_code(401))
            .expect("response should succeed");
    });

    let client = Client::new(test_config(&addr)).expect("client should initialize");
    let error = client
        .list(&ListFilters::default())
        .expect_err("list should fail");
    assert_eq!(error, ArchiveError::Unauthorized);
    assert!(error.to_string().contains("api key"));

    handle.join().expect("server thread should join");
}

#[test]
fn unreachable_archive_surfaces_a_network_error() {
    let client = Client::new(test_config("http://127.0.0.1:1")).expect("client should initialize");
    let error = client
        .list(&ListFilters::default())
        .expect_err("list should fail");
    assert!(error.is_transient());
    assert!(matches!(
        error,
        ArchiveError::Network(_) | ArchiveError::Timeout(_)
    ));
}

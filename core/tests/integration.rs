//! End-to-end tests against the scripted mock origin.
//!
//! # Design
//! Each test starts a `MockOrigin` on a random port and talks to it over real
//! HTTP through `UreqTransport`, so the wires are exercised together with an
//! actual byte-level round-trip.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use mock_server::{Answer, MockOrigin};
use wire_core::wires::{CachingWire, ContentDecodingWire, RetryWire};
use wire_core::{Client, ClientConfig, UreqTransport, WireError};

const STAMP: &str = "Wed, 15 Nov 1995 04:58:08 GMT";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn caches_get_request() {
    init_tracing();
    let container = MockOrigin::new()
        .next(
            Answer::new(200)
                .with_header("Last-Modified", STAMP)
                .with_body("Test body"),
        )
        .next_times(Answer::new(304), 9)
        .start()
        .unwrap();

    let client = Client::builder(&container.home())
        .through(CachingWire::last_modified)
        .build(UreqTransport::new());

    for _ in 0..10 {
        let response = client
            .fetch(&client.get("/"))
            .unwrap()
            .expect_status(200)
            .unwrap();
        assert_eq!(response.body_text(), "Test body");
    }

    let queries = container.queries();
    assert_eq!(queries.len(), 10);
    assert!(queries[0].header("if-modified-since").is_none());
    assert!(queries[1..]
        .iter()
        .all(|q| q.header("if-modified-since") == Some(STAMP)));
}

#[test]
fn unzips_gzip_body_stream() {
    init_tracing();
    let container = MockOrigin::new()
        .next(
            Answer::new(200)
                .with_header("Content-Encoding", "gzip")
                .with_body(gzip(b"Test body")),
        )
        .start()
        .unwrap();

    let client = Client::builder(&container.home())
        .through(ContentDecodingWire::new)
        .build(UreqTransport::new());

    let response = client.fetch(&client.get("/")).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body_text(), "Test body");
    assert!(response.header("content-encoding").is_none());
    assert_eq!(
        container.queries()[0].header("accept-encoding"),
        Some("gzip, deflate")
    );
}

#[test]
fn binary_body_survives_the_pipeline() {
    init_tracing();
    let all: Vec<u8> = (0..=255u8).collect();
    let container = MockOrigin::new()
        .next(Answer::new(200).with_body(all.clone()))
        .start()
        .unwrap();

    let config = ClientConfig::new(&container.home());
    let client = Client::with_ureq(&config).unwrap();

    let response = client.fetch(&client.get("/bytes")).unwrap();
    assert_eq!(response.body().as_ref(), all.as_slice());
}

#[test]
fn configured_chain_retries_decodes_and_caches() {
    init_tracing();
    let container = MockOrigin::new()
        .next(Answer::new(503))
        .next(
            Answer::new(200)
                .with_header("Content-Encoding", "gzip")
                .with_header("Last-Modified", STAMP)
                .with_body(gzip(b"compressed and cached")),
        )
        .next(Answer::new(304))
        .start()
        .unwrap();

    let config = ClientConfig::from_toml_str(&format!(
        r#"
        base_uri = "{}"
        timeout_ms = 5000
        [default_headers]
        x-client = "wire-core-it"
        [retry]
        attempts = 2
        [cache]
        "#,
        container.home()
    ))
    .unwrap();
    let client = Client::with_ureq(&config).unwrap();

    for _ in 0..2 {
        let response = client.fetch(&client.get("/report")).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body_text(), "compressed and cached");
    }

    let queries = container.queries();
    assert_eq!(queries.len(), 3);
    assert!(queries.iter().all(|q| q.uri == "/report"));
    assert!(queries.iter().all(|q| q.header("x-client") == Some("wire-core-it")));
    assert_eq!(queries[2].header("if-modified-since"), Some(STAMP));
}

#[test]
fn changed_resource_replaces_cached_body() {
    init_tracing();
    let container = MockOrigin::new()
        .next(Answer::new(200).with_header("Last-Modified", STAMP).with_body("v1"))
        .next(
            Answer::new(200)
                .with_header("Last-Modified", "Thu, 16 Nov 1995 09:00:00 GMT")
                .with_body("v2"),
        )
        .next(Answer::new(304))
        .start()
        .unwrap();

    let client = Client::builder(&container.home())
        .through(CachingWire::last_modified)
        .build(UreqTransport::new());

    let bodies: Vec<String> = (0..3)
        .map(|_| client.fetch(&client.get("/doc")).unwrap().body_text())
        .collect();
    assert_eq!(bodies, vec!["v1", "v2", "v2"]);
    assert_eq!(
        container.queries()[2].header("if-modified-since"),
        Some("Thu, 16 Nov 1995 09:00:00 GMT")
    );
}

#[test]
fn unreachable_origin_exhausts_retries() {
    init_tracing();
    let container = MockOrigin::new().start().unwrap();
    let home = container.home();
    container.stop();

    let client = Client::builder(&home)
        .through(|next| RetryWire::new(next).attempts(2))
        .build(UreqTransport::new());

    let err = client.fetch(&client.get("/")).unwrap_err();
    assert!(matches!(err, WireError::Transport(_)), "{err}");
}

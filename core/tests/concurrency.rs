//! One client shared across threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use wire_core::mock::ScriptedTransport;
use wire_core::wires::CachingWire;
use wire_core::{Client, HttpRequest, HttpResponse, Transport, WireError};

const STAMP: &str = "Wed, 15 Nov 1995 04:58:08 GMT";

/// Origin whose resources never change: full body on a plain GET, 304 on a
/// conditional one. Counts full transfers.
#[derive(Default)]
struct StaticOrigin {
    full: AtomicUsize,
    conditional: AtomicUsize,
}

impl Transport for StaticOrigin {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, WireError> {
        if request.header("if-modified-since") == Some(STAMP) {
            self.conditional.fetch_add(1, Ordering::SeqCst);
            return Ok(HttpResponse::new(304));
        }
        self.full.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::new(200)
            .with_header("Last-Modified", STAMP)
            .with_body(request.uri().to_string()))
    }
}

#[test]
fn warm_cache_serves_every_thread() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .answer(
                HttpResponse::new(200)
                    .with_header("Last-Modified", STAMP)
                    .with_body("Test body"),
            )
            .answer_times(HttpResponse::new(304), 8 * 25),
    );
    let client = Client::builder("http://localhost")
        .through(CachingWire::last_modified)
        .build(Arc::clone(&transport));

    client.fetch(&client.get("/shared")).unwrap();

    thread::scope(|s| {
        for _ in 0..8 {
            let client = client.clone();
            s.spawn(move || {
                for _ in 0..25 {
                    let response = client.fetch(&client.get("/shared")).unwrap();
                    assert_eq!(response.status(), 200);
                    assert_eq!(response.body_text(), "Test body");
                }
            });
        }
    });

    assert_eq!(transport.request_count(), 1 + 8 * 25);
    assert_eq!(transport.remaining(), 0);
}

#[test]
fn distinct_keys_never_mix_bodies() {
    let origin = Arc::new(StaticOrigin::default());
    let client = Client::builder("http://localhost")
        .through(CachingWire::last_modified)
        .build(Arc::clone(&origin));
    let paths = ["/a", "/b", "/c", "/d"];

    thread::scope(|s| {
        for t in 0..8 {
            let client = client.clone();
            s.spawn(move || {
                for i in 0..50 {
                    let path = paths[(t + i) % paths.len()];
                    let request = client.get(path);
                    let response = client.fetch(&request).unwrap();
                    assert_eq!(response.status(), 200);
                    assert_eq!(response.body_text(), request.uri());
                }
            });
        }
    });

    let full = origin.full.load(Ordering::SeqCst);
    let conditional = origin.conditional.load(Ordering::SeqCst);
    // Racing first fetches may each go to the origin, but never more than
    // one per thread per key.
    assert!((paths.len()..=paths.len() * 8).contains(&full), "{full}");
    assert_eq!(full + conditional, 8 * 50);
}

//! Shared fixtures: a wiremock server speaking the book API

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::{json, Value};
use typed_rest::{Converter, RestClient, RestClientConfig, TypeKey};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Author {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Book {
    pub id: u32,
    pub title: String,
    #[serde(deserialize_with = "typed_rest::converted")]
    pub author: Author,
    pub year: i32,
}

pub fn books_json() -> Value {
    json!([
        {"id": 1, "title": "Dune", "author": {"first": "Frank", "last": "Herbert"}, "year": 1965},
        {"id": 2, "title": "Emma", "author": {"first": "Jane", "last": "Austen"}, "year": 1815},
        {"id": 3, "title": "Beloved", "author": {"first": "Toni", "last": "Morrison"}, "year": 1987},
        {"id": 4, "title": "Ulysses", "author": {"first": "James", "last": "Joyce"}, "year": 1922},
        {"id": 5, "title": "Kindred", "author": {"first": "Octavia", "last": "Butler"}, "year": 1979}
    ])
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Start a server with the book routes mounted
pub async fn start_book_server() -> MockServer {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(books_json()))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/books"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/books/truncated"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"[{"id": 1, "title": "Du"#, "application/json"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/notsuccess/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/notsuccess/internalservererror"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "An error has occurred."})),
        )
        .mount(&server)
        .await;

    server
}

pub fn config_for(server: &MockServer) -> RestClientConfig {
    RestClientConfig::new().base_url(server.uri())
}

pub fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(config_for(server)).expect("client builds")
}

/// Pass-through converter for `Author` that counts its invocations
#[derive(Debug, Default)]
pub struct CountingAuthorConverter {
    calls: AtomicUsize,
}

impl CountingAuthorConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Converter for CountingAuthorConverter {
    fn can_convert(&self, target: TypeKey) -> bool {
        target.is::<Author>()
    }

    fn convert(&self, _target: TypeKey, raw: Value) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(raw)
    }
}

//! Test doubles: a scripted fetcher and a local stand-in for both upstream sites.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use axum::{
    Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::Html,
    routing::get,
};
use tokio::net::TcpListener;

use crate::config::Lookup as LookupConfig;

use super::{FetchResult, Fetcher, FieldMap, Source, fetch::FetchFailure};

pub const IPSHUDI_PAGE: &str = r#"<html><body><div class="ft"><table>
    <tr><td>IP地址</td><td>8.8.8.8</td></tr>
    <tr><td>归属地</td><td><span>美国</span></td></tr>
</table></div></body></html>"#;

pub const IP138_PAGE: &str = r#"<html><body><div class="table-box"><table>
    <tr><td>ASN归属地</td><td><span>Google LLC</span></td></tr>
</table></div></body></html>"#;

pub fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Answers each source with a fixed elapsed time and field map, or failure when
/// no fields are scripted.
#[derive(Default)]
pub struct MockFetcher {
    replies: HashMap<Source, (Duration, Option<FieldMap>)>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, source: Source, millis: u64, fields: FieldMap) -> Self {
        self.replies
            .insert(source, (Duration::from_millis(millis), Some(fields)));
        self
    }

    pub fn fail(mut self, source: Source, millis: u64) -> Self {
        self.replies
            .insert(source, (Duration::from_millis(millis), None));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, source: Source, _subject: &str) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (elapsed, fields) = self
            .replies
            .get(&source)
            .cloned()
            .unwrap_or((Duration::ZERO, None));
        FetchResult {
            source,
            elapsed,
            outcome: fields.ok_or(FetchFailure::Status(500)),
        }
    }
}

/// Serves both source pages on an ephemeral port, delaying each source's
/// response as given. Only `8.8.8.8` is known; `1.1.1.1` gets a page without a
/// results table from ipshudi; anything else is a non-200.
pub async fn serve_upstream(ipshudi_delay: Duration, ip138_delay: Duration) -> LookupConfig {
    let app = Router::new()
        .route(
            "/ipshudi/{file}",
            get(move |Path(file): Path<String>, headers: HeaderMap| async move {
                tokio::time::sleep(ipshudi_delay).await;
                if !headers.contains_key(header::USER_AGENT) {
                    return (StatusCode::FORBIDDEN, Html(String::new()));
                }
                match file.as_str() {
                    "8.8.8.8.htm" => (StatusCode::OK, Html(IPSHUDI_PAGE.to_string())),
                    "1.1.1.1.htm" => (StatusCode::OK, Html("<p>busy</p>".to_string())),
                    _ => (StatusCode::NOT_FOUND, Html(String::new())),
                }
            }),
        )
        .route(
            "/ip138/iplookup.php",
            get(move |Query(query): Query<HashMap<String, String>>| async move {
                tokio::time::sleep(ip138_delay).await;
                match query.get("ip").map(String::as_str) {
                    Some("8.8.8.8") => (StatusCode::OK, Html(IP138_PAGE.to_string())),
                    _ => (StatusCode::BAD_GATEWAY, Html(String::new())),
                }
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    LookupConfig {
        ipshudi_url: format!("http://{addr}/ipshudi/{{ip}}.htm"),
        ip138_url: format!("http://{addr}/ip138/iplookup.php?ip={{ip}}"),
        ..LookupConfig::default()
    }
}

mod extract;
mod fetch;
mod history;
mod http_client;
mod pool;
mod race;
mod service;
mod source;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::BTreeMap;

pub use extract::{FieldExtractor, TableExtractor};
pub(crate) use fetch::FetchResult;
pub use fetch::{Fetcher, HttpFetcher};
pub use history::HistoryStore;
pub use http_client::HttpClient;
pub use pool::WorkerPool;
pub use race::race;
pub use service::LookupService;
pub use source::{Source, SourceKey};

/// Field name to field value, as extracted from one source's results table.
pub type FieldMap = BTreeMap<String, String>;

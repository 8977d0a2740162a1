use std::{
    future::Future,
    time::{Duration, Instant},
};

use isahc::prelude::AsyncReadResponseExt;

use crate::{Error, config::Lookup as LookupConfig};

use super::{FieldExtractor, FieldMap, HttpClient, Source, TableExtractor};

/// Why a fetch produced no field map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
}

/// Outcome of one request to one source.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source: Source,
    pub elapsed: Duration,
    pub outcome: Result<FieldMap, FetchFailure>,
}

pub trait Fetcher: Send + Sync {
    fn fetch(&self, source: Source, subject: &str) -> impl Future<Output = FetchResult> + Send;
}

pub struct HttpFetcher {
    client: HttpClient,
    config: LookupConfig,
    ipshudi: TableExtractor,
    ip138: TableExtractor,
}

impl HttpFetcher {
    pub fn new(config: LookupConfig) -> Result<Self, Error> {
        Ok(Self {
            client: HttpClient::new(&config)?,
            ipshudi: TableExtractor::for_source(Source::Ipshudi)?,
            ip138: TableExtractor::for_source(Source::Ip138)?,
            config,
        })
    }

    fn extractor(&self, source: Source) -> &TableExtractor {
        match source {
            Source::Ipshudi => &self.ipshudi,
            Source::Ip138 => &self.ip138,
        }
    }

    pub async fn fetch_url<E>(&self, url: &str, source: Source, extractor: &E) -> FetchResult
    where
        E: FieldExtractor,
    {
        let start = Instant::now();
        let body = self.get_body(url).await;
        let elapsed = start.elapsed();

        let outcome = body.map(|body| match extractor.extract(&body) {
            Some(fields) => {
                if fields.is_empty() {
                    debug!("{} returned no fields for {}", source, url);
                }
                fields
            }
            None => {
                warn!("{} page has no results table: {}", source, url);
                FieldMap::new()
            }
        });

        FetchResult {
            source,
            elapsed,
            outcome,
        }
    }

    async fn get_body(&self, url: &str) -> Result<String, FetchFailure> {
        let mut response = self
            .client
            .get(url)
            .await
            .map_err(|err| FetchFailure::Transport(err.to_string()))?;
        let status = response.status();
        if status.as_u16() != 200 {
            return Err(FetchFailure::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|err| FetchFailure::Transport(err.to_string()))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: Source, subject: &str) -> FetchResult {
        let url = source.url(&self.config, subject);
        self.fetch_url(&url, source, self.extractor(source)).await
    }
}

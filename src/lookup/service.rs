use std::sync::Arc;

use crate::Error;

use super::{Fetcher, FieldMap, HistoryStore, HttpFetcher, Source, SourceKey, WorkerPool, race};

/// Cache-first lookups over the configured sources.
///
/// Only successful results are written to the history; a failed lookup is
/// attempted again from scratch on the next request.
pub struct LookupService<F = HttpFetcher> {
    fetcher: Arc<F>,
    history: HistoryStore,
    pool: WorkerPool,
    sources: Vec<Source>,
}

impl<F> LookupService<F>
where
    F: Fetcher + 'static,
{
    pub fn new(fetcher: F, history: HistoryStore, workers: usize) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            history,
            pool: WorkerPool::new(workers),
            sources: Source::ALL.to_vec(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn lookup_source(&self, subject: &str, source: Source) -> Result<FieldMap, Error> {
        let key = SourceKey::from(source);
        if let Some(fields) = self.cached(subject, key).await? {
            debug!("{} from {}: cache hit", subject, source);
            return Ok(fields);
        }

        let fetcher = Arc::clone(&self.fetcher);
        let owned = subject.to_owned();
        let result = self
            .pool
            .spawn(async move { fetcher.fetch(source, &owned).await })
            .await??;

        let fields = result.outcome.map_err(|failure| {
            warn!(
                "{} from {} failed after {:?}: {}",
                subject, source, result.elapsed, failure
            );
            Error::upstream(source, failure)
        })?;
        info!("{} from {} in {:?}", subject, source, result.elapsed);

        self.record(subject, key, &fields).await?;
        Ok(fields)
    }

    pub async fn lookup_fastest(&self, subject: &str) -> Result<FieldMap, Error> {
        if let Some(fields) = self.cached(subject, SourceKey::Fastest).await? {
            debug!("{} fastest: cache hit", subject);
            return Ok(fields);
        }

        let (source, fields) = race(&self.pool, &self.fetcher, subject, &self.sources).await?;
        info!("{} fastest source: {}", subject, source);

        self.record(subject, SourceKey::Fastest, &fields).await?;
        Ok(fields)
    }

    async fn cached(&self, subject: &str, key: SourceKey) -> Result<Option<FieldMap>, Error> {
        if !HistoryStore::is_storable(subject) {
            return Ok(None);
        }
        self.history.get(subject, key).await
    }

    /// Subjects the log cannot hold are still answered, just never cached.
    async fn record(
        &self,
        subject: &str,
        key: SourceKey,
        fields: &FieldMap,
    ) -> Result<(), Error> {
        if !HistoryStore::is_storable(subject) {
            warn!("{:?} cannot be recorded in the history, not caching {}", subject, key);
            return Ok(());
        }
        self.history.append(subject, key, fields).await
    }

    /// Lets in-flight fetches finish, then refuses new ones.
    pub async fn shutdown(&self) {
        self.pool.drain().await;
    }
}

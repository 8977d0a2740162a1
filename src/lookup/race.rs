use std::sync::Arc;

use futures_util::{StreamExt, stream::FuturesUnordered};

use crate::Error;

use super::{FetchResult, Fetcher, FieldMap, Source, WorkerPool};

/// Fetches `subject` from every source on the pool and returns the successful
/// result with the smallest elapsed time.
///
/// Every dispatched fetch runs to completion before the winner is chosen.
/// Failed fetches never win; if none succeeds the race fails with
/// [`Error::AllSourcesFailed`].
pub async fn race<F>(
    pool: &WorkerPool,
    fetcher: &Arc<F>,
    subject: &str,
    sources: &[Source],
) -> Result<(Source, FieldMap), Error>
where
    F: Fetcher + 'static,
{
    let mut pending: FuturesUnordered<_> = sources
        .iter()
        .map(|&source| {
            let fetcher = Arc::clone(fetcher);
            let subject = subject.to_owned();
            pool.spawn(async move { fetcher.fetch(source, &subject).await })
        })
        .collect();

    let mut fastest: Option<FetchResult> = None;
    while let Some(joined) = pending.next().await {
        let result = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!("{} fetch not run: {}", subject, err);
                continue;
            }
            Err(err) => {
                error!("{} fetch task failed: {}", subject, err);
                continue;
            }
        };

        match &result.outcome {
            Ok(fields) => debug!(
                "{} from {} in {:?}: {:?}",
                subject, result.source, result.elapsed, fields
            ),
            Err(failure) => {
                warn!(
                    "{} from {} failed after {:?}: {}",
                    subject, result.source, result.elapsed, failure
                );
                continue;
            }
        }

        if fastest
            .as_ref()
            .is_none_or(|current| result.elapsed < current.elapsed)
        {
            fastest = Some(result);
        }
    }

    match fastest {
        Some(FetchResult {
            source,
            outcome: Ok(fields),
            ..
        }) => Ok((source, fields)),
        _ => Err(Error::AllSourcesFailed),
    }
}

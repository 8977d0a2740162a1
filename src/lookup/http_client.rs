use std::time::Duration;

use isahc::{AsyncBody, Request, Response, config::Configurable};

use crate::{Error, config::Lookup as LookupConfig};

/// Upstream client. Every request carries the configured browser user agent,
/// since some sources reject clients without one.
#[derive(Clone)]
pub struct HttpClient {
    inner: isahc::HttpClient,
}

impl HttpClient {
    pub fn new(config: &LookupConfig) -> Result<Self, Error> {
        let inner = isahc::HttpClient::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_header("user-agent", config.user_agent.as_str())
            .build()?;

        Ok(Self { inner })
    }

    pub async fn get(&self, url: &str) -> Result<Response<AsyncBody>, Error> {
        let request = Request::get(url).body(())?;
        self.inner.send_async(request).await.map_err(|err| {
            debug!("GET {} failed: {}", url, err);
            err.into()
        })
    }
}

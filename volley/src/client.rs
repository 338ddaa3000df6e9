//! client module performs the single GET request behind every job

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;

/// What the server answered, and how long the full response took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub elapsed: Duration,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// send one GET request to `url`, any received response is `Ok`
    /// whatever its status, only transport faults and timeouts are `Err`
    async fn get(&self, url: &str) -> crate::error::Result<Reply>;
}

/// [Fetcher] backed by a reqwest [Client]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> crate::error::Result<Self> {
        Ok(Self {
            client: Self::build_client(timeout)?,
        })
    }

    fn build_client(timeout: Duration) -> crate::error::Result<Client> {
        let builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout);

        match builder.build() {
            Ok(client) => Ok(client),
            Err(e) => Err(Box::new(e)),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> crate::error::Result<Reply> {
        let req_at = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        // the request is over once the whole body has arrived
        response.bytes().await?;

        Ok(Reply {
            status,
            elapsed: req_at.elapsed(),
        })
    }
}

//! Access to the native REST API of the sensor platform.
//!
//! Only two calls are needed: one box by id, and the full box collection.
//! Failures are reported to the caller as [`FacadeError::Upstream`] and never
//! retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{FacadeError, Result};
use crate::native::SenseBox;

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch_box(&self, id: &str) -> Result<SenseBox>;
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>>;
}

pub struct HttpUpstream {
    client: Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(%url, "upstream request");
        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(%url, error = %e, "upstream unreachable");
            FacadeError::from(e)
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "upstream refused request");
            return Err(FacadeError::Upstream {
                status: Some(status.as_u16()),
                message: format!("{url} answered {status}"),
            });
        }
        response.json::<T>().await.map_err(|e| FacadeError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch_box(&self, id: &str) -> Result<SenseBox> {
        // pushed as a segment so that ids can not escape the box collection
        let mut url = reqwest::Url::parse(&format!("{}/boxes", self.base_url))
            .map_err(|e| FacadeError::Config(format!("upstream url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FacadeError::Config("upstream url can not carry a path".to_string()))?
            .push(id);
        self.get(url.to_string()).await
    }
    async fn fetch_boxes(&self) -> Result<Vec<SenseBox>> {
        self.get(format!("{}/boxes", self.base_url)).await
    }
}

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::error::ImportError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RecipeScraper/1.0)";

/// A page body and the status it was served with
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub html: String,
    pub status: u16,
}

#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ImportError>;
}

pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(timeout: Option<Duration>, user_agent: Option<&str>) -> Result<Self, ImportError> {
        let timeout = timeout.unwrap_or(Duration::from_secs(30));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HtmlFetcher for RequestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ImportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("RequestFetcher: {} answered {}", url, status);
        if !status.is_success() {
            return Err(ImportError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let html = response.text().await?;
        Ok(FetchedPage {
            html,
            status: status.as_u16(),
        })
    }
}

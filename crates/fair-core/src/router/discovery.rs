//! OAI-PMH endpoint discovery through the public registry.
//!
//! The registry's `ListFriends` document lists known base URLs as
//! `<baseURL>` elements. The list is fetched on first use and kept for the
//! lifetime of the process; a failed fetch is not cached.

use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::http::HttpFetcher;

/// Public OAI-PMH registry.
pub const DEFAULT_OAI_REGISTRY: &str = "https://www.openarchives.org/pmh/registry/ListFriends";

/// Finds OAI-PMH base URLs for a domain.
pub struct OaiDiscovery {
    fetcher: Arc<dyn HttpFetcher>,
    registry_url: String,
    base_urls: OnceCell<Vec<String>>,
}

impl OaiDiscovery {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, registry_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            registry_url: registry_url.into(),
            base_urls: OnceCell::new(),
        }
    }

    /// First registered base URL containing `domain`, if any.
    ///
    /// Registry failures are logged and reported as no match.
    pub async fn discover(&self, domain: &str) -> Option<String> {
        let base_urls = match self
            .base_urls
            .get_or_try_init(|| self.fetch_base_urls())
            .await
        {
            Ok(urls) => urls,
            Err(e) => {
                warn!(registry = %self.registry_url, error = %e, "OAI-PMH registry unavailable");
                return None;
            }
        };

        let needle = domain.to_ascii_lowercase();
        let found = base_urls
            .iter()
            .find(|url| url.to_ascii_lowercase().contains(&needle))
            .cloned();
        debug!(domain = %domain, found = ?found, "OAI-PMH discovery");
        found
    }

    async fn fetch_base_urls(&self) -> Result<Vec<String>, String> {
        let xml = self
            .fetcher
            .get_text(&self.registry_url)
            .await
            .map_err(|e| e.to_string())?;
        parse_base_urls(&xml)
    }
}

/// Text of every `baseURL` element, in document order.
pub fn parse_base_urls(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut in_base_url = false;
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.local_name().as_ref() == b"baseURL" => in_base_url = true,
            Event::End(e) if e.local_name().as_ref() == b"baseURL" => in_base_url = false,
            Event::Text(t) if in_base_url => {
                let url = t.unescape().map_err(|e| e.to_string())?;
                let url = url.trim();
                if !url.is_empty() {
                    urls.push(url.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(urls)
}

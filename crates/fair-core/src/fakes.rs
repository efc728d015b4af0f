//! In-memory fakes for the network and connector seams (testing only)
//!
//! `MemoryFetcher` serves canned responses by exact URL and records every
//! request; `StaticConnector` returns a fixed record (or a fixed failure)
//! and can carry its own indicator overrides.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::connector::{Connector, IndicatorHandler, IndicatorTable};
use crate::domain::{CanonicalMetadataRecord, ConnectorError, FetchError, ItemIdentifier};
use crate::http::HttpFetcher;

// ---------------------------------------------------------------------------
// MemoryFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Canned {
    Json(Value),
    Text(String),
    Status(u16),
    Transport(String),
}

enum Body {
    Json(Value),
    Text(String),
}

/// Fetcher answering from a `HashMap<url, response>`.
///
/// Unknown URLs answer HTTP 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: HashMap<String, Canned>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: impl Into<String>, body: Value) -> Self {
        self.responses.insert(url.into(), Canned::Json(body));
        self
    }

    pub fn with_text(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), Canned::Text(body.into()));
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.responses.insert(url.into(), Canned::Status(status));
        self
    }

    /// Make `url` fail as if the connection was refused.
    pub fn with_transport_error(mut self, url: impl Into<String>, detail: impl Into<String>) -> Self {
        self.responses
            .insert(url.into(), Canned::Transport(detail.into()));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<Body, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            Some(Canned::Transport(detail)) => Err(FetchError::Transport {
                url: url.to_string(),
                detail: detail.clone(),
            }),
            Some(Canned::Json(body)) => Ok(Body::Json(body.clone())),
            Some(Canned::Text(body)) => Ok(Body::Text(body.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[async_trait]
impl HttpFetcher for MemoryFetcher {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        match self.lookup(url)? {
            Body::Json(body) => Ok(body),
            Body::Text(body) => serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                url: url.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        match self.lookup(url)? {
            Body::Json(body) => Ok(body.to_string()),
            Body::Text(body) => Ok(body),
        }
    }

    async fn resolves(&self, url: &str) -> Result<bool, FetchError> {
        match self.lookup(url) {
            Ok(_) => Ok(true),
            Err(e) if e.is_transient() => Err(e),
            Err(_) => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticConnector
// ---------------------------------------------------------------------------

/// Connector returning a fixed record, or failing with a fixed detail.
#[derive(Debug, Default)]
pub struct StaticConnector {
    name: String,
    record: CanonicalMetadataRecord,
    failure: Option<String>,
    overrides: IndicatorTable,
    initializations: AtomicUsize,
}

impl StaticConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_record(mut self, record: CanonicalMetadataRecord) -> Self {
        self.record = record;
        self
    }

    /// Fail every `initialize` with `MetadataUnavailable`.
    pub fn failing(mut self, detail: impl Into<String>) -> Self {
        self.failure = Some(detail.into());
        self
    }

    pub fn with_indicator(mut self, code: impl Into<String>, handler: IndicatorHandler) -> Self {
        self.overrides = self.overrides.with(code, handler);
        self
    }

    /// Number of `initialize` calls so far.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for StaticConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(
        &self,
        identifier: &ItemIdentifier,
        _endpoint: Option<&str>,
    ) -> Result<CanonicalMetadataRecord, ConnectorError> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(detail) => Err(ConnectorError::MetadataUnavailable {
                connector: self.name.clone(),
                identifier: identifier.to_string(),
                detail: detail.clone(),
            }),
            None => Ok(self.record.clone()),
        }
    }

    fn indicators(&self) -> IndicatorTable {
        self.overrides.clone()
    }
}

//! Error taxonomy for FAIR evaluations.
//!
//! Only the variants of [`EvaluationError`] abort a request. Indicator
//! failures never surface here; the executor degrades them to zero-point
//! results.

use crate::domain::identifier::IdScheme;

/// Transport-level failures below the resolver and connectors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("{url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Transient failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::Exhausted { .. } => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The item identifier could not be turned into something routable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("identifier '{raw}' ({scheme}) cannot be routed without an explicit repository")]
    Unroutable { raw: String, scheme: IdScheme },

    #[error("no landing page found for DOI {doi}: {reason}")]
    LocatorNotFound { doi: String, reason: String },

    #[error("handle {handle} did not resolve to a URL")]
    HandleUnresolved { handle: String },

    #[error("landing URL '{url}' has no host")]
    InvalidLandingUrl { url: String },
}

/// No connector can serve the item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("no plugin available for domain '{domain}'")]
    NoPluginAvailable { domain: String },

    #[error("unknown plugin '{name}'")]
    UnknownPlugin { name: String },
}

/// A connector was found but could not produce metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("metadata unavailable from {connector} for {identifier}: {detail}")]
    MetadataUnavailable {
        connector: String,
        identifier: String,
        detail: String,
    },

    #[error("connector {connector} requires an endpoint but none was provided")]
    MissingEndpoint { connector: String },

    #[error("connector {connector} could not parse metadata: {detail}")]
    Parse { connector: String, detail: String },
}

/// Catalog construction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("weight must be 1, 2 or 3, got {weight}")]
    InvalidWeight { weight: u8 },

    #[error("duplicate indicator code: {code}")]
    DuplicateCode { code: String },

    #[error("indicator catalog is empty")]
    Empty,
}

/// Request-level failures. Any of these aborts the evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("connector initialization error: {0}")]
    ConnectorInit(#[from] ConnectorError),
}

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvaluationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_transience() {
        let transport = FetchError::Transport {
            url: "https://x".to_string(),
            detail: "connection reset".to_string(),
        };
        assert!(transport.is_transient());

        let throttled = FetchError::Status {
            url: "https://x".to_string(),
            status: 429,
        };
        assert!(throttled.is_transient());

        let server = FetchError::Status {
            url: "https://x".to_string(),
            status: 503,
        };
        assert!(server.is_transient());

        let missing = FetchError::Status {
            url: "https://x".to_string(),
            status: 404,
        };
        assert!(!missing.is_transient());
        assert_eq!(missing.status(), Some(404));
    }

    #[test]
    fn test_evaluation_error_display() {
        let err: EvaluationError = RoutingError::NoPluginAvailable {
            domain: "unknown.example".to_string(),
        }
        .into();
        assert!(err.to_string().contains("routing error"));
        assert!(err.to_string().contains("unknown.example"));

        let err: EvaluationError = ConnectorError::MetadataUnavailable {
            connector: "oai-pmh".to_string(),
            identifier: "doi:10.1/x".to_string(),
            detail: "HTTP 500".to_string(),
        }
        .into();
        assert!(err.to_string().contains("metadata unavailable"));
    }

    #[test]
    fn test_unroutable_names_scheme() {
        let err = ResolutionError::Unroutable {
            raw: "abc".to_string(),
            scheme: IdScheme::Internal,
        };
        assert!(err.to_string().contains("internal"));
    }
}

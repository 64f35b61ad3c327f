//! Failure taxonomy shared by the resolver, the client and the orchestrator.

use std::time::Duration;

use thiserror::Error;

use crate::location::PlatformError;

/// Why the current position could not be resolved.
#[derive(Debug, Clone, Error)]
pub enum LocationFailure {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
    #[error("location error: {0}")]
    Other(#[source] PlatformError),
}

/// Why the forecast could not be fetched or decoded.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("invalid forecast request: {0}")]
    InvalidRequest(String),
    #[error("transport error: {0}")]
    Transport(#[source] TransportCause),
    /// The exchange completed without producing an HTTP response.
    ///
    /// An HTTP error status is not this: its body goes through the empty and
    /// decode checks like any other response.
    #[error("response was not a valid HTTP response")]
    InvalidResponse,
    #[error("response body was empty")]
    EmptyBody,
    #[error("failed to decode forecast JSON: {0}")]
    DecodeFailed(#[source] serde_json::Error),
}

/// Network-layer cause of a [`FetchFailure::Transport`].
#[derive(Debug, Error)]
pub enum TransportCause {
    #[error("no response within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

impl TransportCause {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportCause::TimedOut(_) => true,
            TransportCause::Client(err) => err.is_timeout(),
        }
    }
}

/// Single failure type handed to the presentation layer.
#[derive(Debug, Error)]
pub enum AcquisitionFailure {
    #[error(transparent)]
    Location(#[from] LocationFailure),
    #[error(transparent)]
    Fetch(#[from] FetchFailure),
}

/// What the user can do about a failed acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Send the user to system settings to grant location access.
    OpenSettings,
    /// Offer to run the whole acquisition again.
    Retry,
}

impl AcquisitionFailure {
    pub fn recovery(&self) -> Recovery {
        match self {
            AcquisitionFailure::Location(LocationFailure::PermissionDenied) => Recovery::OpenSettings,
            _ => Recovery::Retry,
        }
    }
}

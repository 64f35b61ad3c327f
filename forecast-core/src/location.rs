//! Single-shot position resolution on top of a subscribe/unsubscribe platform capability.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::{error::LocationFailure, model::Coordinate};

/// Error codes a platform location service can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorCode {
    /// The user or system refused location access.
    Denied,
    /// No fix could be determined right now.
    LocationUnknown,
    Network,
    Other(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code:?})")]
pub struct PlatformError {
    pub code: PlatformErrorCode,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: PlatformErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Maps a platform error onto the resolver's failure kinds.
pub fn classify(error: PlatformError) -> LocationFailure {
    match error.code {
        PlatformErrorCode::Denied => LocationFailure::PermissionDenied,
        PlatformErrorCode::LocationUnknown => LocationFailure::Unavailable,
        PlatformErrorCode::Network | PlatformErrorCode::Other(_) => LocationFailure::Other(error),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    NotDetermined,
    Granted,
    Denied,
}

/// Outcome callbacks handed to [`LocationPlatform::subscribe`].
///
/// Deliveries after the resolver has settled are dropped.
#[derive(Debug, Clone)]
pub struct LocationEvents {
    tx: mpsc::UnboundedSender<LocationEvent>,
}

#[derive(Debug, Clone, PartialEq)]
enum LocationEvent {
    Fix(Coordinate),
    Error(PlatformError),
}

impl LocationEvents {
    pub fn on_fix(&self, coordinate: Coordinate) {
        let _ = self.tx.send(LocationEvent::Fix(coordinate));
    }

    pub fn on_error(&self, error: PlatformError) {
        let _ = self.tx.send(LocationEvent::Error(error));
    }
}

/// Platform location services as seen by the resolver.
#[async_trait]
pub trait LocationPlatform: Send + Sync + Debug {
    async fn authorization(&self) -> Authorization;

    /// Ask the user for access; resolves with the resulting authorization.
    async fn request_permission(&self) -> Result<Authorization, PlatformError>;

    /// Start delivering updates to `events` until [`unsubscribe`](Self::unsubscribe).
    fn subscribe(&self, events: LocationEvents) -> Result<(), PlatformError>;

    fn unsubscribe(&self);
}

/// Resolves the device position once per call.
#[derive(Debug)]
pub struct LocationResolver {
    platform: Arc<dyn LocationPlatform>,
    // The platform subscription is one shared handle; resolutions must not overlap.
    in_flight: Mutex<()>,
    fix_timeout: Option<Duration>,
}

/// Live platform subscription; unsubscribes when dropped.
///
/// Dropping a pending resolution drops this too, so an abandoned request never
/// leaves the platform tracking.
struct Subscription<'a> {
    platform: &'a dyn LocationPlatform,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.platform.unsubscribe();
        tracing::debug!("location subscription stopped");
    }
}

impl LocationResolver {
    pub fn new(platform: Arc<dyn LocationPlatform>) -> Self {
        Self { platform, in_flight: Mutex::new(()), fix_timeout: None }
    }

    /// Give up waiting for a fix after `timeout` and report `Unavailable`.
    ///
    /// Without this the resolver waits for the hardware indefinitely.
    pub fn with_fix_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fix_timeout = timeout;
        self
    }

    pub async fn resolve_current_location(&self) -> Result<Coordinate, LocationFailure> {
        let _guard = self.in_flight.lock().await;

        self.ensure_permission().await?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.platform.subscribe(LocationEvents { tx }).map_err(classify)?;
        let subscription = Subscription { platform: self.platform.as_ref() };
        tracing::debug!("location subscription started");

        let event = match self.fix_timeout {
            None => rx.recv().await,
            Some(limit) => match tokio::time::timeout(limit, rx.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    tracing::warn!(?limit, "no location fix before timeout");
                    return Err(LocationFailure::Unavailable);
                }
            },
        };

        drop(subscription);

        match event {
            Some(LocationEvent::Fix(coordinate)) => {
                tracing::debug!(%coordinate, "location resolved");
                Ok(coordinate)
            }
            Some(LocationEvent::Error(error)) => {
                tracing::debug!(%error, "location platform reported an error");
                Err(classify(error))
            }
            // Platform dropped every sender without reporting anything.
            None => Err(LocationFailure::Unavailable),
        }
    }

    async fn ensure_permission(&self) -> Result<(), LocationFailure> {
        let status = match self.platform.authorization().await {
            Authorization::NotDetermined => {
                self.platform.request_permission().await.map_err(classify)?
            }
            other => other,
        };

        match status {
            Authorization::Denied => Err(LocationFailure::PermissionDenied),
            // Platforms may still report a denial through the subscription.
            Authorization::Granted | Authorization::NotDetermined => Ok(()),
        }
    }
}

/// Platform that reports a preconfigured position.
///
/// Used on hosts without positioning hardware. With no position configured
/// every subscription reports [`PlatformErrorCode::LocationUnknown`].
#[derive(Debug, Clone)]
pub struct FixedPosition {
    coordinate: Option<Coordinate>,
}

impl FixedPosition {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationPlatform for FixedPosition {
    async fn authorization(&self) -> Authorization {
        Authorization::Granted
    }

    async fn request_permission(&self) -> Result<Authorization, PlatformError> {
        Ok(Authorization::Granted)
    }

    fn subscribe(&self, events: LocationEvents) -> Result<(), PlatformError> {
        match self.coordinate {
            Some(coordinate) => events.on_fix(coordinate),
            None => events.on_error(PlatformError::new(
                PlatformErrorCode::LocationUnknown,
                "no position configured",
            )),
        }
        Ok(())
    }

    fn unsubscribe(&self) {}
}

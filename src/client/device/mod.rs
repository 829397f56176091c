//! Device subscriptions
//!
//! Geolocation and camera access behind small traits, so the platform layer
//! plugs in its own sources. Every subscription returns a `SubscriptionHandle`
//! that can be cancelled any number of times from any owner.
//!
//! Device failures are reported to the user and never queued or retried.

pub mod camera;
pub mod geolocation;

pub use camera::{CameraSession, FrameSource};
pub use geolocation::{Geolocation, PositionSource};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Device not supported")]
    Unsupported,

    /// The device is stopped or has not produced data yet
    #[error("Device not ready")]
    NotReady,

    #[error("Device unavailable: {message}")]
    Unavailable { message: String },

    #[error("Subscription cancelled")]
    Cancelled,
}

impl DeviceError {
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Text shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied { .. } => "Permiso denegado para acceder al dispositivo.",
            DeviceError::Unsupported => "El navegador no soporta acceso a la cámara.",
            DeviceError::NotReady => "La cámara no está lista.",
            DeviceError::Unavailable { .. } => "No se pudo iniciar la cámara.",
            DeviceError::Cancelled => "Operación cancelada.",
        }
    }
}

/// Cancellation handle of a device subscription
#[derive(Debug, Clone, Default)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the subscription. Safe to call repeatedly.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("device subscription cancelled");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the subscription is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

//! Geolocation subscriptions
//!
//! A one-shot fix and a continuous watch, each with its own handle.

use super::{DeviceError, SubscriptionHandle};
use crate::shared::Coordinates;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Platform position provider
#[async_trait]
pub trait PositionSource: Send + Sync + 'static {
    async fn current_position(&self) -> Result<Coordinates, DeviceError>;
}

#[derive(Debug)]
pub struct Geolocation<P> {
    source: Arc<P>,
}

impl<P> Clone for Geolocation<P> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<P: PositionSource> Geolocation<P> {
    pub fn new(source: P) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Request a single fix. Cancelling the handle resolves the future with
    /// `DeviceError::Cancelled`.
    pub fn locate_once(
        &self,
    ) -> (SubscriptionHandle, BoxFuture<'static, Result<Coordinates, DeviceError>>) {
        let handle = SubscriptionHandle::new();
        let cancel = handle.clone();
        let source = Arc::clone(&self.source);

        let fix = async move {
            tokio::select! {
                _ = cancel.cancelled() => Err(DeviceError::Cancelled),
                position = source.current_position() => position,
            }
        };

        (handle, fix.boxed())
    }

    /// Report a fix every `interval` until the handle is cancelled or the
    /// receiver is dropped. A permission error ends the watch.
    pub fn watch(
        &self,
        interval: Duration,
    ) -> (SubscriptionHandle, mpsc::Receiver<Result<Coordinates, DeviceError>>) {
        let handle = SubscriptionHandle::new();
        let cancel = handle.clone();
        let source = Arc::clone(&self.source);
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                let position = tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => tokio::select! {
                        _ = cancel.cancelled() => break,
                        position = source.current_position() => position,
                    },
                };

                let fatal = matches!(
                    position,
                    Err(DeviceError::PermissionDenied { .. }) | Err(DeviceError::Unsupported)
                );
                if tx.send(position).await.is_err() || fatal {
                    break;
                }
            }
            tracing::debug!("position watch ended");
        });

        (handle, rx)
    }
}

//! Camera sessions
//!
//! A session owns the camera between `start` and `stop`. Capturing outside a
//! running session, or before the camera has produced a frame, is
//! `DeviceError::NotReady`. The camera is released by `stop`, by dropping the
//! session, or by the next `start` after the handle was cancelled.

use super::{DeviceError, SubscriptionHandle};
use crate::shared::PhotoBlob;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Platform camera
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Acquire the camera
    async fn open(&self) -> Result<(), DeviceError>;

    /// Encode the current frame. An empty blob means no frame yet.
    async fn grab_frame(&self) -> Result<PhotoBlob, DeviceError>;

    /// Release the camera
    fn close(&self);
}

#[derive(Debug)]
pub struct CameraSession<C: FrameSource> {
    source: C,
    active: Mutex<Option<SubscriptionHandle>>,
}

impl<C: FrameSource> CameraSession<C> {
    pub fn new(source: C) -> Self {
        Self {
            source,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open the camera. Starting a running session returns its handle.
    pub async fn start(&self) -> Result<SubscriptionHandle, DeviceError> {
        if let Some(handle) = self.running_handle() {
            return Ok(handle);
        }
        // Cancelled through its handle but still holding the device
        if self.active().take().is_some() {
            self.source.close();
            tracing::debug!("released camera of a cancelled session");
        }

        self.source.open().await.map_err(|e| {
            tracing::warn!(error = %e, "camera could not start");
            e
        })?;

        let handle = SubscriptionHandle::new();
        *self.active() = Some(handle.clone());
        tracing::debug!("camera started");
        Ok(handle)
    }

    pub fn is_running(&self) -> bool {
        self.running_handle().is_some()
    }

    /// Capture the current frame
    pub async fn capture(&self) -> Result<PhotoBlob, DeviceError> {
        if self.running_handle().is_none() {
            return Err(DeviceError::NotReady);
        }

        let blob = self.source.grab_frame().await?;
        if blob.is_empty() {
            return Err(DeviceError::NotReady);
        }
        Ok(blob)
    }

    /// Release the camera. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(handle) = self.active().take() {
            handle.cancel();
            self.source.close();
            tracing::debug!("camera stopped");
        }
    }

    fn running_handle(&self) -> Option<SubscriptionHandle> {
        let active = self.active();
        active.as_ref().filter(|h| !h.is_cancelled()).cloned()
    }
}

impl<C: FrameSource> Drop for CameraSession<C> {
    fn drop(&mut self) {
        let active = match self.active.get_mut() {
            Ok(active) => active.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = active {
            handle.cancel();
            self.source.close();
        }
    }
}

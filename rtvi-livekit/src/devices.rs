//! Media device enumeration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of media device, mirroring the browser's `MediaDeviceInfo.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Microphone.
    AudioInput,
    /// Camera.
    VideoInput,
    /// Speaker or headphones.
    AudioOutput,
}

/// A capture or playback device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeviceInfo {
    /// Stable identifier used for selection.
    pub device_id: String,
    /// Device kind.
    pub kind: DeviceKind,
    /// Human-readable name.
    pub label: String,
    /// Groups devices that belong to the same physical unit.
    #[serde(default)]
    pub group_id: String,
}

impl MediaDeviceInfo {
    /// Create a device entry with an empty group id.
    pub fn new(device_id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self { device_id: device_id.into(), kind, label: label.into(), group_id: String::new() }
    }
}

/// Source of the device list.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Every device the platform reports.
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>>;

    /// Devices of one kind, in enumeration order.
    async fn devices_of_kind(&self, kind: DeviceKind) -> Result<Vec<MediaDeviceInfo>> {
        let devices = self.enumerate_devices().await?;
        Ok(devices.into_iter().filter(|d| d.kind == kind).collect())
    }
}

/// A fixed device list, for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMediaDevices {
    devices: Vec<MediaDeviceInfo>,
}

impl StaticMediaDevices {
    /// Create from a list of devices.
    pub fn new(devices: Vec<MediaDeviceInfo>) -> Self {
        Self { devices }
    }

    /// An empty device list.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaDevices for StaticMediaDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        Ok(self.devices.clone())
    }
}

/// Microphones and speakers from the default cpal host.
///
/// cpal does not expose cameras, so no `VideoInput` devices are reported.
/// Device names double as device ids.
#[cfg(feature = "desktop-audio")]
#[derive(Debug, Clone, Default)]
pub struct CpalMediaDevices;

#[cfg(feature = "desktop-audio")]
impl CpalMediaDevices {
    fn enumerate_blocking() -> Result<Vec<MediaDeviceInfo>> {
        use cpal::traits::{DeviceTrait, HostTrait};

        use crate::error::TransportError;

        let host = cpal::default_host();
        let mut devices = Vec::new();

        let inputs = host.input_devices().map_err(|e| TransportError::device(e.to_string()))?;
        for device in inputs {
            match device.name() {
                Ok(name) => devices.push(MediaDeviceInfo::new(&name, DeviceKind::AudioInput, &name)),
                Err(e) => tracing::debug!(error = %e, "Skipping unnamed input device"),
            }
        }

        let outputs = host.output_devices().map_err(|e| TransportError::device(e.to_string()))?;
        for device in outputs {
            match device.name() {
                Ok(name) => {
                    devices.push(MediaDeviceInfo::new(&name, DeviceKind::AudioOutput, &name))
                }
                Err(e) => tracing::debug!(error = %e, "Skipping unnamed output device"),
            }
        }

        Ok(devices)
    }
}

#[cfg(feature = "desktop-audio")]
#[async_trait]
impl MediaDevices for CpalMediaDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        tokio::task::spawn_blocking(Self::enumerate_blocking)
            .await
            .map_err(|e| crate::error::TransportError::device(e.to_string()))?
    }
}

//! Persisted session configuration
//!
//! The configuration is stored by the host as an opaque postcard blob,
//! wherever it keeps its preferences.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CAMERA_ZOOM, DEFAULT_UPLOAD_RETRIES};
use crate::errors::ConfigError;
use crate::types::mission::MissionSettings;

const NAME: &str = "config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Settings the mission draft starts out with
    pub settings: MissionSettings,
    /// Zoom level used when centering the map on the vehicle
    pub camera_zoom: f64,
    /// Automatic retries after a failed upload, before giving up
    pub upload_retries: u8,
    /// Discard the loaded mission on any waypoint edit, instead of only
    /// once the mission has failed or been flown
    pub invalidate_on_edit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settings: MissionSettings::default(),
            camera_zoom: DEFAULT_CAMERA_ZOOM,
            upload_retries: DEFAULT_UPLOAD_RETRIES,
            invalidate_on_edit: false,
        }
    }
}

impl SessionConfig {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(postcard::to_stdvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(postcard::from_bytes(bytes)?)
    }

    /// Deserialize the stored configuration, or fall back to the default
    /// if nothing is stored or the stored data is unreadable.
    pub fn load_or_default(stored: Option<&[u8]>) -> Self {
        match stored.map(Self::from_bytes) {
            Some(Ok(config)) => {
                trace!("[{}] Found and deserialized stored configuration", NAME);
                config
            }
            Some(Err(error)) => {
                warn!("[{}] {} Using default", NAME, error);
                Self::default()
            }
            None => {
                trace!("[{}] No stored configuration, using default", NAME);
                Self::default()
            }
        }
    }
}

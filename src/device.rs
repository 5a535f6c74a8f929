//! Roku device records. A device's identity is its serial number; every other
//! field may change between sightings (new IP, renamed, app list refreshed)
//! and is reconciled with [`RokuDevice::update_from`].

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use url::Url;

/// Entry in the system menu rather than a launchable channel.
const MENU_TYPE: &str = "menu";

/// Network a device was last seen on. Used only to disambiguate devices that
/// share a name; never part of identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub ssid: String,
    pub bssid: Option<String>,
}

/// A single app catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub app_type: Option<String>,
}

impl App {
    /// Placeholder entries without an id and system menu entries cannot be
    /// launched and are filtered from user-facing lists.
    pub fn is_launchable(&self) -> bool {
        self.id.is_some() && self.app_type.as_deref() != Some(MENU_TYPE)
    }
}

impl PartialEq for App {
    fn eq(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            (None, None) => self.name == other.name && self.app_type == other.app_type,
            _ => false,
        }
    }
}

impl Eq for App {}

/// A discovered or remembered Roku device.
///
/// Created only by successfully parsing a device-info response; round-trips
/// through serde for the device store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RokuDevice {
    pub serial_number: String,
    pub current_location: Url,
    pub model_name: Option<String>,
    pub friendly_model_name: Option<String>,
    pub friendly_device_name: String,
    pub is_tv: bool,
    pub is_stick: bool,
    #[serde(default)]
    pub apps: Vec<App>,
    #[serde(default)]
    pub connected_network_info: Option<NetworkInfo>,
}

impl RokuDevice {
    /// Copy every non-identity field from a fresher record with the same
    /// serial number. A serial mismatch is a no-op: the fresher record
    /// describes a different device. An empty app catalog or absent network
    /// info on the fresher record does not clobber known-good values.
    pub fn update_from(&mut self, fresher: &RokuDevice) {
        if fresher.serial_number != self.serial_number {
            return;
        }
        self.current_location = fresher.current_location.clone();
        self.model_name = fresher.model_name.clone();
        self.friendly_model_name = fresher.friendly_model_name.clone();
        self.friendly_device_name = fresher.friendly_device_name.clone();
        self.is_tv = fresher.is_tv;
        self.is_stick = fresher.is_stick;
        if !fresher.apps.is_empty() {
            self.apps = fresher.apps.clone();
        }
        if fresher.connected_network_info.is_some() {
            self.connected_network_info = fresher.connected_network_info.clone();
        }
    }

    /// Apps a user can actually launch (id present, not a menu entry).
    pub fn launchable_apps(&self) -> Vec<&App> {
        self.apps.iter().filter(|app| app.is_launchable()).collect()
    }

    pub fn app_with_id(&self, id: &str) -> Option<&App> {
        self.apps.iter().find(|app| app.id.as_deref() == Some(id))
    }

    pub fn display_name(&self) -> &str {
        if !self.friendly_device_name.is_empty() {
            &self.friendly_device_name
        } else if let Some(model) = self.friendly_model_name.as_deref().or(self.model_name.as_deref()) {
            model
        } else {
            &self.serial_number
        }
    }
}

impl PartialEq for RokuDevice {
    fn eq(&self, other: &Self) -> bool {
        self.serial_number == other.serial_number
    }
}

impl Eq for RokuDevice {}

impl Hash for RokuDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial_number.hash(state);
    }
}

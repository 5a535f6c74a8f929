//! Roku device discovery and control.
//!
//! Discovers Roku devices on the local network via SSDP multicast, fetches
//! identity and app catalogs over the External Control Protocol (ECP), and
//! issues control commands: key presses, app launches, text entry, and
//! content searches. Devices are identified by serial number; everything
//! else about a device may change between sightings.

pub mod device;
pub mod discovery;
pub mod ecp;
pub mod error;
pub mod icon_cache;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use device::{App, NetworkInfo, RokuDevice};
pub use discovery::resolver::DeviceResolver;
pub use discovery::{DiscoveryEvent, SsdpDiscoverer};
pub use ecp::EcpClient;
pub use ecp::keypress::KeyPress;
pub use ecp::search::{SearchKind, SearchQuery};
pub use error::Error;
pub use icon_cache::IconCache;

//! Locates a remembered device on the current network: last-known location
//! first, then a bounded SSDP search filtered by serial number.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use super::{DiscoveryEvent, SsdpDiscoverer};
use crate::device::RokuDevice;
use crate::ecp::EcpClient;
use crate::error::Error;

/// The fallback search window. Keep this below any caller-facing overall
/// timeout budget: resolution runs in the critical path before a command
/// can be dispatched.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DeviceResolver {
    client: EcpClient,
    search_timeout: Duration,
}

impl DeviceResolver {
    pub fn new(client: EcpClient) -> Self {
        Self {
            client,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Produce the currently-reachable record for `serial_number`.
    ///
    /// The fast path probes the last-known location and returns immediately
    /// on a serial match, without any network-wide search. A failed probe or
    /// a serial mismatch (the address now hosts a different device) falls
    /// back to a bounded search; the first matching device stops the search.
    /// `Error::NotFound` means the search window elapsed with no match.
    pub async fn resolve(
        &self,
        serial_number: &str,
        last_known_location: Option<&Url>,
    ) -> Result<RokuDevice, Error> {
        if let Some(location) = last_known_location {
            match self.client.fetch_device_info(location).await {
                Ok(device) if device.serial_number == serial_number => {
                    debug!(%location, "resolved device at last known location");
                    return Ok(device);
                }
                Ok(device) => debug!(
                    found = %device.serial_number,
                    wanted = %serial_number,
                    "different device at last known location"
                ),
                Err(error) => debug!(%location, "last known location failed: {error}"),
            }
        }
        self.search(serial_number).await
    }

    async fn search(&self, serial_number: &str) -> Result<RokuDevice, Error> {
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let discoverer = SsdpDiscoverer::new(self.client.clone(), event_tx);
        if let Err(error) = discoverer
            .start_searching(Some(self.search_timeout))
            .await
        {
            warn!("fallback search could not start: {error}");
            return Err(Error::NotFound);
        }
        while let Some(event) = event_rx.recv().await {
            match event {
                DiscoveryEvent::Found(device) if device.serial_number == serial_number => {
                    discoverer.stop_searching();
                    return Ok(device);
                }
                DiscoveryEvent::Found(device) => {
                    debug!(serial = %device.serial_number, "ignoring non-matching device");
                }
                DiscoveryEvent::Stopped => break,
            }
        }
        Err(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockEcpServer, device_info_xml};

    #[tokio::test]
    async fn test_fast_path_returns_matching_device_without_search() {
        let server = MockEcpServer::start(&device_info_xml("1GU48T017973", "Living Room"), "").await;
        let resolver = DeviceResolver::new(EcpClient::new())
            .with_search_timeout(Duration::from_millis(200));

        let device = resolver
            .resolve("1GU48T017973", Some(server.location()))
            .await
            .unwrap();
        assert_eq!(device.serial_number, "1GU48T017973");
        assert_eq!(&device.current_location, server.location());
        assert_eq!(server.requests(), vec!["/query/device-info".to_string()]);
    }

    #[tokio::test]
    async fn test_serial_mismatch_falls_back_to_search() {
        // The last-known address now hosts a different device; the resolver
        // must search rather than return the mismatched record.
        let server = MockEcpServer::start(&device_info_xml("OTHER", "Imposter"), "").await;
        let resolver = DeviceResolver::new(EcpClient::new())
            .with_search_timeout(Duration::from_millis(300));

        let result = resolver.resolve("1GU48T017973", Some(server.location())).await;
        assert!(matches!(result, Err(Error::NotFound)));
        assert_eq!(server.requests(), vec!["/query/device-info".to_string()]);
    }

    #[tokio::test]
    async fn test_no_last_known_location_searches_and_reports_not_found() {
        let resolver = DeviceResolver::new(EcpClient::new())
            .with_search_timeout(Duration::from_millis(300));
        let result = resolver.resolve("NOSUCHSERIAL", None).await;
        assert!(matches!(result, Err(Error::NotFound)));
    }
}

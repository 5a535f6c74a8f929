//! ECP command client. Translates a (device location, command) pair into an
//! HTTP call against a Roku's External Control Protocol endpoint and reports
//! completion as a typed result. No operation here retries automatically;
//! retry policy belongs to callers.

pub mod keypress;
pub mod search;
mod xml;

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::device::{App, RokuDevice};
use crate::error::Error;
use crate::icon_cache::IconCache;
use keypress::KeyPress;
use search::SearchQuery;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP client for a device's control endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EcpClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl Default for EcpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EcpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Resolve a path like `query/device-info` against a device location.
    /// Percent-escapes in the path (the `Lit_` tokens) are preserved as-is.
    fn endpoint(location: &Url, path: &str) -> Url {
        location.join(path).unwrap_or_else(|_| location.clone())
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, Error> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn post(&self, url: Url) -> Result<(), Error> {
        self.http
            .post(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fetch and parse `/query/device-info`. The returned record's location
    /// is the location that was queried, not anything from the body.
    pub async fn fetch_device_info(&self, location: &Url) -> Result<RokuDevice, Error> {
        let url = Self::endpoint(location, "query/device-info");
        let body = self.get_bytes(url).await?;
        match xml::parse_device_info(&String::from_utf8_lossy(&body), location) {
            Some(device) => {
                debug!(serial = %device.serial_number, %location, "fetched device info");
                Ok(device)
            }
            None => Err(Error::MalformedResponse { raw: body }),
        }
    }

    /// Fetch `/query/apps`. A body that is not an app catalog is reported
    /// and yields an empty list; callers keep their last-known-good catalog
    /// on transport failure instead.
    pub async fn fetch_apps(&self, location: &Url) -> Result<Vec<App>, Error> {
        let url = Self::endpoint(location, "query/apps");
        let body = self.get_bytes(url).await?;
        match xml::parse_apps(&String::from_utf8_lossy(&body)) {
            Some(apps) => Ok(apps),
            None => {
                warn!(%location, "app catalog did not parse; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Fetch `/query/active-app`. "Nothing active" and an unparseable body
    /// are both `Ok(None)`, not errors.
    pub async fn fetch_active_app(&self, location: &Url) -> Result<Option<App>, Error> {
        let url = Self::endpoint(location, "query/active-app");
        let body = self.get_bytes(url).await?;
        Ok(xml::parse_active_app(&String::from_utf8_lossy(&body)))
    }

    /// Fire-and-forget key press. Returns immediately; overlapping presses
    /// carry no ordering guarantee, which is fine for discrete buttons.
    pub fn send_keypress(&self, location: &Url, key: &KeyPress) {
        let url = Self::endpoint(location, &format!("keypress/{}", key.wire_token()));
        debug!(%url, "sending keypress");
        let http = self.http.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let sent = http
                .post(url)
                .timeout(timeout)
                .send()
                .await
                .and_then(|response| response.error_for_status());
            if let Err(error) = sent {
                warn!("keypress send failed: {error}");
            }
        });
    }

    /// Key press that does not return until the HTTP round trip completes.
    /// Sequential awaited calls are delivered in program order.
    pub async fn send_keypress_sync(&self, location: &Url, key: &KeyPress) -> Result<(), Error> {
        let url = Self::endpoint(location, &format!("keypress/{}", key.wire_token()));
        debug!(%url, "sending keypress (sync)");
        self.post(url).await
    }

    /// Type text one `Lit` press at a time. Each character's round trip
    /// completes before the next is sent, so input never arrives scrambled.
    pub async fn send_text(&self, location: &Url, text: &str) -> Result<(), Error> {
        for key in KeyPress::lit_sequence(text) {
            self.send_keypress_sync(location, &key).await?;
        }
        Ok(())
    }

    /// POST `/launch/{app_id}`.
    pub async fn launch_app(&self, location: &Url, app_id: &str) -> Result<(), Error> {
        let url = Self::endpoint(location, &format!("launch/{app_id}"));
        debug!(%url, "launching app");
        self.post(url).await
    }

    /// Launch an app on a device and report the launched entry from the
    /// device's cached catalog. Best-effort: the catalog is not re-fetched,
    /// so an id missing from the cache launches but reports `None`.
    pub async fn launch_device_app(
        &self,
        device: &RokuDevice,
        app_id: &str,
    ) -> Result<Option<App>, Error> {
        self.launch_app(&device.current_location, app_id).await?;
        Ok(device.app_with_id(app_id).cloned())
    }

    /// POST `/search/browse` with the query's wire encoding.
    pub async fn send_search(&self, location: &Url, query: &SearchQuery) -> Result<(), Error> {
        let mut url = Self::endpoint(location, "search/browse");
        let pairs = query.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        debug!(%url, "sending search");
        self.post(url).await
    }

    /// Fetch an app icon, cache-first. A miss fetches `/query/icon/{app_id}`
    /// and persists to the cache in the background without blocking.
    pub async fn fetch_icon(
        &self,
        location: &Url,
        app_id: &str,
        cache: &IconCache,
    ) -> Result<Vec<u8>, Error> {
        if let Some(bytes) = cache.get(app_id) {
            debug!(app_id, "icon cache hit");
            return Ok(bytes);
        }
        let url = Self::endpoint(location, &format!("query/icon/{app_id}"));
        let bytes = self.get_bytes(url).await?;
        cache.store(app_id, bytes.clone());
        Ok(bytes)
    }
}

//! Error taxonomy for the discovery and control core. Every public operation
//! resolves to a value or one of these variants; there are no panic paths.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure reaching a device's HTTP endpoint
    /// (timeout, connection refused, DNS failure).
    #[error("device unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The endpoint responded but the body did not parse into the expected
    /// structure. Carries the raw response bytes for diagnostic capture.
    #[error("malformed response ({} bytes)", raw.len())]
    MalformedResponse { raw: Vec<u8> },

    /// A bounded search ended without locating the requested device.
    /// Distinct from `Unreachable`: the search ran and found nothing.
    #[error("no matching device found on the network")]
    NotFound,

    /// Multicast bind/join failed. Reported once via the discoverer's stop
    /// event; never retried automatically.
    #[error("ssdp socket setup failed: {0}")]
    SocketSetup(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_response_keeps_raw_bytes() {
        let raw = b"<html>not ecp</html>".to_vec();
        let error = Error::MalformedResponse { raw: raw.clone() };
        match error {
            Error::MalformedResponse { raw: kept } => assert_eq!(kept, raw),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_display_includes_byte_count() {
        let error = Error::MalformedResponse { raw: vec![0; 42] };
        assert_eq!(error.to_string(), "malformed response (42 bytes)");
    }
}

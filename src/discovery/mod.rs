//! SSDP device discovery. Sends a multicast M-SEARCH probe for `roku:ecp`
//! responders and resolves each answer's LOCATION header into a full device
//! record via a device-info fetch.

pub mod resolver;

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use url::Url;

use crate::device::RokuDevice;
use crate::ecp::EcpClient;
use crate::error::Error;

pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const SSDP_PORT: u16 = 1900;

const M_SEARCH: &[u8] = b"M-SEARCH * HTTP/1.1\r\n\
Host: 239.255.255.250:1900\r\n\
Man: \"ssdp:discover\"\r\n\
ST: roku:ecp\r\n\
\r\n";

/// Events a search session emits on its channel.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A response location resolved into a full device record. The
    /// discoverer does not deduplicate; the same device may be reported
    /// more than once and callers dedupe by serial number.
    Found(RokuDevice),
    /// The session ended: stopped explicitly, timed out, or never started
    /// because socket setup failed. Emitted exactly once per session.
    Stopped,
}

#[derive(Default)]
struct SearchState {
    session: u64,
    shutdown: Option<oneshot::Sender<()>>,
}

/// Multicast SSDP discoverer with an Idle -> Searching -> Idle lifecycle.
/// The socket is exclusively owned by the active search session; found
/// devices belong to whoever holds the event receiver, not to any global
/// list.
pub struct SsdpDiscoverer {
    client: EcpClient,
    event_tx: mpsc::Sender<DiscoveryEvent>,
    state: Arc<Mutex<SearchState>>,
}

impl SsdpDiscoverer {
    pub fn new(client: EcpClient, event_tx: mpsc::Sender<DiscoveryEvent>) -> Self {
        Self {
            client,
            event_tx,
            state: Arc::new(Mutex::new(SearchState::default())),
        }
    }

    pub fn is_searching(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.shutdown.is_some())
            .unwrap_or(false)
    }

    /// Transition Idle -> Searching: open the multicast socket, send one
    /// M-SEARCH probe, and start collecting responses. A setup failure
    /// emits a single `Stopped` event, leaves the discoverer idle, and is
    /// otherwise non-fatal. A timeout schedules an automatic stop for this
    /// session only. Calling while already searching is a no-op.
    pub async fn start_searching(&self, timeout: Option<Duration>) -> Result<(), Error> {
        // Claim the session under a single lock acquisition so racing start
        // calls cannot both pass an idle check and run two sessions at once.
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = {
            let Ok(mut state) = self.state.lock() else {
                return self.report_setup_failure(poisoned_state_error()).await;
            };
            if state.shutdown.is_some() {
                warn!("search already in progress");
                return Ok(());
            }
            state.session += 1;
            state.shutdown = Some(shutdown_tx);
            state.session
        };

        let socket = match open_multicast_socket() {
            Ok(socket) => socket,
            Err(error) => {
                clear_session(&self.state, session);
                return self.report_setup_failure(error).await;
            }
        };
        let probe_target = SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT);
        if let Err(error) = socket.send_to(M_SEARCH, probe_target).await {
            clear_session(&self.state, session);
            return self.report_setup_failure(error).await;
        }
        debug!("sent ssdp probe for roku:ecp");

        tokio::spawn(run_search(
            socket,
            self.client.clone(),
            self.event_tx.clone(),
            shutdown_rx,
            Arc::clone(&self.state),
            session,
        ));

        if let Some(timeout) = timeout {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                signal_stop(&state, Some(session));
            });
        }

        Ok(())
    }

    /// Idempotent: a no-op while idle (no event emitted); while searching,
    /// closes the socket and the session emits exactly one `Stopped`.
    /// In-flight device-info fetches that complete afterwards are discarded.
    pub fn stop_searching(&self) {
        signal_stop(&self.state, None);
    }

    async fn report_setup_failure(&self, error: std::io::Error) -> Result<(), Error> {
        warn!("ssdp socket setup failed: {error}");
        let _ = self.event_tx.send(DiscoveryEvent::Stopped).await;
        Err(Error::SocketSetup(error))
    }
}

fn poisoned_state_error() -> std::io::Error {
    std::io::Error::other("discoverer state lock poisoned")
}

fn signal_stop(state: &Mutex<SearchState>, only_session: Option<u64>) {
    let Ok(mut state) = state.lock() else { return };
    if let Some(expected) = only_session {
        if state.session != expected {
            return;
        }
    }
    if let Some(shutdown) = state.shutdown.take() {
        let _ = shutdown.send(());
    }
}

/// Clear the searching flag when a session exits on its own, unless a newer
/// session has already replaced it.
fn clear_session(state: &Mutex<SearchState>, session: u64) {
    let Ok(mut state) = state.lock() else { return };
    if state.session == session {
        state.shutdown = None;
    }
}

/// Reuse-bound multicast socket on the SSDP port, handed to tokio.
fn open_multicast_socket() -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT).into())?;
    socket.join_multicast_v4(&SSDP_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

async fn run_search(
    socket: UdpSocket,
    client: EcpClient,
    event_tx: mpsc::Sender<DiscoveryEvent>,
    mut shutdown: oneshot::Receiver<()>,
    state: Arc<Mutex<SearchState>>,
    session: u64,
) {
    let (found_tx, mut found_rx) = mpsc::channel::<RokuDevice>(16);
    let mut buf = [0u8; 2048];
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(device) = found_rx.recv() => {
                if event_tx.send(DiscoveryEvent::Found(device)).await.is_err() {
                    // Receiver gone; nobody is listening to this session.
                    break;
                }
            }
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, addr)) => {
                    if let Some(location) = parse_ssdp_response(&buf[..len]) {
                        debug!(%addr, %location, "roku ssdp response");
                        let client = client.clone();
                        let found_tx = found_tx.clone();
                        tokio::spawn(async move {
                            match client.fetch_device_info(&location).await {
                                Ok(device) => {
                                    let _ = found_tx.send(device).await;
                                }
                                // Unreachable or bogus locations are dropped
                                // silently, never surfaced as errors.
                                Err(error) => debug!(%location, "discarding response: {error}"),
                            }
                        });
                    }
                }
                Err(error) => warn!("ssdp receive failed: {error}"),
            }
        }
    }
    // Dropping the receiver discards fetches that complete after the stop.
    drop(found_rx);
    drop(socket);
    clear_session(&state, session);
    let _ = event_tx.send(DiscoveryEvent::Stopped).await;
}

/// Extract the LOCATION header from an SSDP 200 OK datagram. Anything that
/// is not a 200 response with a parseable location is discarded.
fn parse_ssdp_response(datagram: &[u8]) -> Option<Url> {
    let text = std::str::from_utf8(datagram).ok()?;
    if !text.contains("HTTP/1.1 200 OK") {
        return None;
    }
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("location") {
                return Url::parse(value.trim()).ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ssdp_response_extracts_location() {
        let payload = b"HTTP/1.1 200 OK\r\nLOCATION: http://192.168.1.50:8060/\r\n";
        let location = parse_ssdp_response(payload).unwrap();
        assert_eq!(location.as_str(), "http://192.168.1.50:8060/");
    }

    #[test]
    fn test_parse_ssdp_response_location_key_is_case_insensitive() {
        let payload = b"HTTP/1.1 200 OK\r\nlocation: http://192.168.1.50:8060/\r\n";
        assert!(parse_ssdp_response(payload).is_some());
    }

    #[test]
    fn test_parse_ssdp_response_discards_non_200() {
        let payload = b"NOTIFY * HTTP/1.1\r\nLOCATION: http://192.168.1.50:8060/\r\n";
        assert!(parse_ssdp_response(payload).is_none());
    }

    #[test]
    fn test_parse_ssdp_response_discards_missing_location() {
        assert!(parse_ssdp_response(b"HTTP/1.1 200 OK\r\nST: roku:ecp\r\n").is_none());
        assert!(parse_ssdp_response(b"HTTP/1.1 200 OK\r\nLOCATION: not a url\r\n").is_none());
        assert!(parse_ssdp_response(&[0xff, 0xfe, 0x00]).is_none());
    }

    #[test]
    fn test_probe_is_a_roku_ecp_msearch() {
        let probe = std::str::from_utf8(M_SEARCH).unwrap();
        assert!(probe.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(probe.contains("ST: roku:ecp\r\n"));
        assert!(probe.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop_and_emits_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let discoverer = SsdpDiscoverer::new(EcpClient::new(), tx);
        assert!(!discoverer.is_searching());
        discoverer.stop_searching();
        discoverer.stop_searching();
        assert!(!discoverer.is_searching());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_then_stop_emits_exactly_one_stop_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let discoverer = SsdpDiscoverer::new(EcpClient::new(), tx);

        // When the environment forbids multicast setup, the failure path
        // must itself emit the single stop event.
        if discoverer.start_searching(None).await.is_ok() {
            assert!(discoverer.is_searching());
            discoverer.stop_searching();
        }

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("stop event within deadline")
            .expect("channel open");
        assert!(matches!(event, DiscoveryEvent::Stopped));
        assert!(!discoverer.is_searching());

        // No further events: stopping again stays silent.
        discoverer.stop_searching();
        assert!(
            tokio::time::timeout(Duration::from_millis(200), rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_racing_starts_run_a_single_session() {
        let (tx, mut rx) = mpsc::channel(8);
        let discoverer = SsdpDiscoverer::new(EcpClient::new(), tx);

        let (a, b) = tokio::join!(
            discoverer.start_searching(None),
            discoverer.start_searching(None),
        );

        // At most one call may have claimed a session; each failed start
        // reports its own stop event, and a live session reports one more
        // when stopped.
        let started = a.is_ok() || b.is_ok();
        let mut expected = [&a, &b].iter().filter(|result| result.is_err()).count();
        if started {
            discoverer.stop_searching();
            expected += 1;
        }

        for _ in 0..expected {
            let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("stop event within deadline")
                .expect("channel open");
            assert!(matches!(event, DiscoveryEvent::Stopped));
        }
        assert!(!discoverer.is_searching());
        assert!(
            tokio::time::timeout(Duration::from_millis(200), rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_timeout_stops_search_automatically() {
        let (tx, mut rx) = mpsc::channel(8);
        let discoverer = SsdpDiscoverer::new(EcpClient::new(), tx);

        match discoverer.start_searching(Some(Duration::from_millis(100))).await {
            Ok(()) => {
                let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                    .await
                    .expect("auto-stop within deadline")
                    .expect("channel open");
                assert!(matches!(event, DiscoveryEvent::Stopped));
                assert!(!discoverer.is_searching());
            }
            Err(Error::SocketSetup(_)) => {
                // Setup failure already emitted the stop event.
                assert!(matches!(rx.recv().await, Some(DiscoveryEvent::Stopped)));
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

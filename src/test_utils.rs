//! Test helpers: a minimal in-process ECP device endpoint backed by a plain
//! TCP listener, recording every request path it serves in arrival order.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

pub fn device_info_xml(serial: &str, name: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\
         <device-info>\
         <serial-number>{serial}</serial-number>\
         <model-name>Roku Ultra</model-name>\
         <friendly-model-name>Roku Ultra</friendly-model-name>\
         <friendly-device-name>{name}</friendly-device-name>\
         <is-tv>false</is-tv>\
         <is-stick>false</is-stick>\
         </device-info>"
    )
}

pub struct MockEcpServer {
    location: Url,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockEcpServer {
    /// Serve `device_info` for /query/device-info and `apps` for
    /// /query/apps; every other path gets an empty 200.
    pub async fn start(device_info: &str, apps: &str) -> Self {
        Self::start_with_status(200, device_info, apps).await
    }

    /// Like [`MockEcpServer::start`], but every response carries `status`.
    pub async fn start_with_status(status: u16, device_info: &str, apps: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        let location = Url::parse(&format!("http://{addr}/")).expect("mock location");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let device_info = device_info.to_string();
        let apps = apps.to_string();
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let device_info = device_info.clone();
                let apps = apps.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    serve_one(stream, status, &device_info, &apps, &log).await;
                });
            }
        });

        Self { location, requests }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Request paths (with query strings) in the order they arrived.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one(
    mut stream: TcpStream,
    status: u16,
    device_info: &str,
    apps: &str,
    log: &Arc<Mutex<Vec<String>>>,
) {
    let mut buf = vec![0u8; 8192];
    let mut read = 0;
    loop {
        match stream.read(&mut buf[read..]).await {
            Ok(0) | Err(_) => return,
            Ok(n) => read += n,
        }
        if buf[..read].windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
        if read == buf.len() {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf[..read]);
    let path = request
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    log.lock().unwrap().push(path.clone());

    let body = if path.ends_with("/query/device-info") {
        device_info
    } else if path.ends_with("/query/apps") {
        apps
    } else {
        ""
    };
    let reason = if status < 400 { "OK" } else { "Service Unavailable" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

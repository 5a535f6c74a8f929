use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

use rokuctl::store::{JsonFileStore, ObjectStoreExt};
use rokuctl::{
    DeviceResolver, DiscoveryEvent, EcpClient, Error, IconCache, KeyPress, RokuDevice, SearchKind,
    SearchQuery, SsdpDiscoverer,
};

const DEVICES_KEY: &str = "devices";

#[derive(Parser)]
#[command(name = "rokuctl", version, about = "Discover and control Roku devices over ECP")]
struct Cli {
    /// Control endpoint base URL, e.g. http://192.168.1.50:8060/
    #[arg(long, global = true)]
    location: Option<Url>,

    /// Serial number of a remembered device to resolve on the network
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Path to the device store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the local network for Roku devices and remember them
    Discover {
        /// Search window in seconds
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
    /// List remembered devices
    Devices,
    /// Show information about the target device
    Info,
    /// List the target device's launchable apps
    Apps,
    /// Show the currently active app
    Active,
    /// Send a key press (wire token, e.g. Home, Play, VolumeUp)
    Press { key: KeyPress },
    /// Type text one character at a time
    Type { text: String },
    /// Launch an app by id
    Launch { app_id: String },
    /// Search the device's content catalog
    Search {
        #[arg(long)]
        keyword: Option<String>,
        /// Exact title match instead of a keyword search
        #[arg(long)]
        title: Option<String>,
        /// movie, tv-show, person, channel, or game
        #[arg(long)]
        kind: Option<SearchKind>,
        #[arg(long)]
        season: Option<u32>,
        /// Ask the device to launch the best match
        #[arg(long)]
        launch: bool,
    },
    /// Fetch an app icon and write it to a file
    Icon {
        app_id: String,
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let store_path = cli.store.clone().unwrap_or_else(default_store_path);
    let store = JsonFileStore::open(store_path);
    let client = EcpClient::new();

    match &cli.command {
        Command::Discover { timeout } => discover(&client, &store, *timeout).await,
        Command::Devices => {
            let devices: Vec<RokuDevice> = store.get_or(DEVICES_KEY, Vec::new());
            if devices.is_empty() {
                println!("no remembered devices; run `rokuctl discover`");
            }
            for device in devices {
                print_device(&device);
            }
            Ok(())
        }
        Command::Info => {
            let device = resolve_target(&cli, &client, &store).await?;
            print_device(&device);
            println!(
                "  model: {}  tv: {}  stick: {}",
                device
                    .friendly_model_name
                    .as_deref()
                    .or(device.model_name.as_deref())
                    .unwrap_or("unknown"),
                device.is_tv,
                device.is_stick
            );
            if let Some(network) = &device.connected_network_info {
                println!("  network: {}", network.ssid);
            }
            Ok(())
        }
        Command::Apps => {
            let mut device = resolve_target(&cli, &client, &store).await?;
            device.apps = client.fetch_apps(&device.current_location).await?;
            remember_device(&store, &device);
            for app in device.launchable_apps() {
                println!("{}  {}", app.id.as_deref().unwrap_or("-"), app.name);
            }
            Ok(())
        }
        Command::Active => {
            let device = resolve_target(&cli, &client, &store).await?;
            match client.fetch_active_app(&device.current_location).await? {
                Some(app) => println!("{}", app.name),
                None => println!("nothing active"),
            }
            Ok(())
        }
        Command::Press { key } => {
            let device = resolve_target(&cli, &client, &store).await?;
            if key.is_tv_only() && !device.is_tv {
                eprintln!("{key} is only available on Roku TVs");
                return Ok(());
            }
            client.send_keypress_sync(&device.current_location, key).await
        }
        Command::Type { text } => {
            let device = resolve_target(&cli, &client, &store).await?;
            client.send_text(&device.current_location, text).await
        }
        Command::Launch { app_id } => {
            let mut device = resolve_target(&cli, &client, &store).await?;
            if device.apps.is_empty() {
                device.apps = client.fetch_apps(&device.current_location).await.unwrap_or_default();
            }
            match client.launch_device_app(&device, app_id).await? {
                Some(app) => println!("launched {}", app.name),
                None => println!("launched app {app_id}"),
            }
            Ok(())
        }
        Command::Search {
            keyword,
            title,
            kind,
            season,
            launch,
        } => {
            let device = resolve_target(&cli, &client, &store).await?;
            let query = SearchQuery {
                keyword: keyword.clone(),
                title: title.clone(),
                kind: *kind,
                season: *season,
                launch: if *launch { Some(true) } else { None },
                ..SearchQuery::default()
            };
            client.send_search(&device.current_location, &query).await
        }
        Command::Icon { app_id, out } => {
            let device = resolve_target(&cli, &client, &store).await?;
            let cache = IconCache::new(default_icon_cache_dir());
            let bytes = client
                .fetch_icon(&device.current_location, app_id, &cache)
                .await?;
            match std::fs::write(out, &bytes) {
                Ok(()) => {
                    println!("wrote {} bytes to {}", bytes.len(), out.display());
                    Ok(())
                }
                Err(error) => {
                    eprintln!("could not write {}: {error}", out.display());
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn discover(client: &EcpClient, store: &JsonFileStore, timeout_secs: u64) -> Result<(), Error> {
    let (event_tx, mut event_rx) = mpsc::channel(32);
    let discoverer = SsdpDiscoverer::new(client.clone(), event_tx);
    discoverer
        .start_searching(Some(Duration::from_secs(timeout_secs)))
        .await?;

    let mut found: Vec<RokuDevice> = Vec::new();
    while let Some(event) = event_rx.recv().await {
        match event {
            DiscoveryEvent::Found(device) => {
                // The same device may answer the probe more than once.
                if found.contains(&device) {
                    continue;
                }
                print_device(&device);
                remember_device(store, &device);
                found.push(device);
            }
            DiscoveryEvent::Stopped => break,
        }
    }
    println!("{} device(s) found", found.len());
    Ok(())
}

/// Pick the target device: an explicit location wins, then an explicit
/// serial resolved via its remembered location, then the first remembered
/// device. Successful resolutions refresh the store.
async fn resolve_target(
    cli: &Cli,
    client: &EcpClient,
    store: &JsonFileStore,
) -> Result<RokuDevice, Error> {
    if let Some(location) = &cli.location {
        return client.fetch_device_info(location).await;
    }

    let devices: Vec<RokuDevice> = store.get_or(DEVICES_KEY, Vec::new());
    let (serial, last_known) = match &cli.serial {
        Some(serial) => {
            let known = devices.iter().find(|device| device.serial_number == *serial);
            (serial.clone(), known.map(|device| device.current_location.clone()))
        }
        None => {
            let Some(first) = devices.first() else {
                warn!("no remembered devices; run `rokuctl discover` or pass --location");
                return Err(Error::NotFound);
            };
            (first.serial_number.clone(), Some(first.current_location.clone()))
        }
    };

    let resolver = DeviceResolver::new(client.clone());
    let device = resolver.resolve(&serial, last_known.as_ref()).await?;
    remember_device(store, &device);
    Ok(device)
}

fn remember_device(store: &JsonFileStore, device: &RokuDevice) {
    let mut devices: Vec<RokuDevice> = store.get_or(DEVICES_KEY, Vec::new());
    match devices
        .iter_mut()
        .find(|known| known.serial_number == device.serial_number)
    {
        Some(known) => known.update_from(device),
        None => devices.push(device.clone()),
    }
    store.set(DEVICES_KEY, &devices);
}

fn print_device(device: &RokuDevice) {
    println!(
        "{}  {}  {}",
        device.serial_number,
        device.display_name(),
        device.current_location
    );
}

fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rokuctl")
        .join("devices.json")
}

fn default_icon_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rokuctl")
        .join("icons")
}

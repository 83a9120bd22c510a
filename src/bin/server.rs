use roverctl::controller::{ControllerConfig, MissionController};
use roverctl::protocol::{CommandResponse, ProtocolHandler};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::time;
use tracing::{error, info, warn};

const TCP_PORT: u16 = 8084;
const SNAPSHOT_BROADCAST_BUFFER_SIZE: usize = 256;
const TICK_INTERVAL_MS: u64 = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("🤖 Rover Mission Controller");
    println!("===========================");

    // The demo rover boots with a partially charged battery
    let config = ControllerConfig {
        initial_battery_percent: 87.0,
        ..ControllerConfig::default()
    };
    let controller = Arc::new(Mutex::new(MissionController::new_with_config(config)));

    // Log every accepted transition
    {
        let mut guard = controller.lock().await;
        let _ = guard.subscribe(|change| {
            info!(
                "🔄 STATE: {} -> {} ({})",
                change.previous, change.current, change.command
            );
        });
    }

    // Create broadcast channel for status snapshots
    let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_BROADCAST_BUFFER_SIZE);

    // Start TCP server
    let tcp_controller = Arc::clone(&controller);
    let tcp_snapshot_tx = snapshot_tx.clone();
    let tcp_server = tokio::spawn(async move {
        if let Err(e) = start_tcp_server(tcp_controller, tcp_snapshot_tx).await {
            error!("TCP server error: {}", e);
        }
    });

    // Shut the controller down on Ctrl+C; the main loop notices the flag
    let shutdown_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let mut guard = shutdown_controller.lock().await;
            guard.shutdown();
        }
    });

    // Main control loop; the controller schedules telemetry and scan work
    // on their own intervals against this base cadence
    let mut protocol = ProtocolHandler::new();
    let mut interval = time::interval(Duration::from_millis(TICK_INTERVAL_MS));

    loop {
        interval.tick().await;

        let frame = {
            let mut guard = controller.lock().await;
            guard.tick()
        };

        if let Some(snapshot) = frame {
            match protocol.serialize_snapshot(&snapshot) {
                Ok(json) => {
                    if snapshot_tx.receiver_count() > 0 {
                        if let Err(e) = snapshot_tx.send(json.to_string()) {
                            warn!("Failed to broadcast snapshot: {}", e);
                        }
                    }
                    info!(
                        "📡 TELEMETRY: state={} battery={:.1}% scanned={}",
                        snapshot.mission_state,
                        snapshot.telemetry.battery_percent,
                        snapshot.total_scanned
                    );
                }
                Err(e) => error!("Snapshot serialization error: {}", e),
            }
        }

        let running = {
            let guard = controller.lock().await;
            guard.is_running()
        };

        if !running {
            break;
        }
    }

    tcp_server.abort();
    println!("🛑 Rover Mission Controller stopped");

    Ok(())
}

async fn start_tcp_server(
    controller: Arc<Mutex<MissionController>>,
    snapshot_tx: broadcast::Sender<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", TCP_PORT)).await?;
    info!("🌐 TCP server listening on port {}", TCP_PORT);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("🔗 New client connected: {}", addr);
                let client_controller = Arc::clone(&controller);
                let client_snapshot_rx = snapshot_tx.subscribe();

                tokio::spawn(async move {
                    if let Err(e) =
                        handle_client(stream, client_controller, client_snapshot_rx).await
                    {
                        warn!("Client {} error: {}", addr, e);
                    }
                    info!("🔌 Client {} disconnected", addr);
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    controller: Arc<Mutex<MissionController>>,
    mut snapshot_rx: broadcast::Receiver<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut protocol = ProtocolHandler::new();

    // Wrap writer in Arc<Mutex<>> so the snapshot stream and command replies
    // can share it
    let writer = Arc::new(Mutex::new(writer));

    // Push the current snapshot right away so clients like `roverctl status`
    // need not wait out the next telemetry boundary
    {
        let snapshot = {
            let guard = controller.lock().await;
            guard.snapshot()
        };
        let json = protocol.serialize_snapshot(&snapshot)?.to_string();
        let mut writer_guard = writer.lock().await;
        writer_guard.write_all(json.as_bytes()).await?;
        writer_guard.write_all(b"\n").await?;
    }

    // Spawn snapshot streaming task
    let snapshot_writer = Arc::clone(&writer);
    let snapshot_task = tokio::spawn(async move {
        while let Ok(snapshot) = snapshot_rx.recv().await {
            let mut writer_guard = snapshot_writer.lock().await;
            if let Err(e) = writer_guard.write_all(snapshot.as_bytes()).await {
                warn!("Failed to send snapshot: {}", e);
                break;
            }
            if let Err(e) = writer_guard.write_all(b"\n").await {
                warn!("Failed to send snapshot newline: {}", e);
                break;
            }
        }
    });

    // Process commands from client
    let mut line = String::new();
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => break, // Client disconnected
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let response = match protocol.parse_command(trimmed) {
                    Ok(command) => {
                        info!("📨 Received command: {:?}", command);

                        let mut guard = controller.lock().await;
                        match guard.issue_command(command.command) {
                            Ok(state) => CommandResponse::accepted(command.id, unix_ms(), state),
                            Err(rejection) => {
                                CommandResponse::rejected(command.id, unix_ms(), &rejection)
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse command: {}", e);
                        CommandResponse::error(0, unix_ms(), &e.to_string())
                    }
                };

                let response_json = protocol.serialize_response(&response)?.to_string();
                {
                    let mut writer_guard = writer.lock().await;
                    writer_guard.write_all(response_json.as_bytes()).await?;
                    writer_guard.write_all(b"\n").await?;
                }
                info!("📤 Sent response: {}", response_json);
            }
            Err(e) => {
                error!("Error reading from client: {}", e);
                break;
            }
        }
    }

    snapshot_task.abort();
    Ok(())
}

fn unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

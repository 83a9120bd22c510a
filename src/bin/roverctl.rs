use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use roverctl::mission::MissionCommand;
use roverctl::protocol::{format_record_id, format_uptime, OperatorCommand};
use std::process::Command;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8084";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("roverctl")
        .version("0.1.0")
        .author("Rover Operations Team")
        .about("🤖 Rover Mission Controller - Warehouse scanning mission control")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Controller host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Controller port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable verbose output")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("start")
                .about("▶️  Begin or resume a scanning mission")
                .long_about("Sends a Start command; legal when the rover is idle or paused"),
        )
        .subcommand(
            SubCommand::with_name("pause")
                .about("⏸️  Pause the active scanning mission")
                .long_about("Sends a Pause command; legal only while the rover is scanning"),
        )
        .subcommand(
            SubCommand::with_name("terminate")
                .about("⏹️  Terminate the mission and go idle")
                .long_about("Sends a Terminate command; legal from any active mission state"),
        )
        .subcommand(
            SubCommand::with_name("return")
                .about("🏠 Send the rover back to base")
                .long_about("Sends a ReturnToBase command; legal while scanning or paused"),
        )
        .subcommand(
            SubCommand::with_name("status")
                .about("📊 Show the latest mission status")
                .long_about("Retrieves the most recent status snapshot from the controller"),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("📈 Monitor the live status stream")
                .long_about("Continuously prints status snapshots as the controller broadcasts them")
                .arg(
                    Arg::with_name("duration")
                        .short("d")
                        .long("duration")
                        .value_name("SECONDS")
                        .help("Monitor duration in seconds (default: infinite)")
                        .takes_value(true)
                        .validator(|v| match v.parse::<u64>() {
                            Ok(_) => Ok(()),
                            Err(_) => Err("Duration must be a whole number of seconds".into()),
                        }),
                ),
        )
        .subcommand(
            SubCommand::with_name("server")
                .about("🚀 Start the mission controller server")
                .long_about("Launches the rover mission controller server for this workstation")
                .arg(
                    Arg::with_name("background")
                        .short("b")
                        .long("background")
                        .help("Run server in background"),
                ),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap();
    let port = matches.value_of("port").unwrap().parse::<u16>()?;
    let format = matches.value_of("format").unwrap();
    let verbose = matches.is_present("verbose");

    if verbose {
        println!("{}", "🤖 roverctl - Rover Mission Controller".bright_blue().bold());
        println!("{} {}:{}", "Connecting to".dimmed(), host, port);
    }

    match matches.subcommand() {
        ("start", _) => {
            handle_mission_command(MissionCommand::Start, "Mission start", host, port, format, verbose).await?;
        }
        ("pause", _) => {
            handle_mission_command(MissionCommand::Pause, "Mission pause", host, port, format, verbose).await?;
        }
        ("terminate", _) => {
            handle_mission_command(MissionCommand::Terminate, "Mission terminate", host, port, format, verbose).await?;
        }
        ("return", _) => {
            handle_mission_command(MissionCommand::ReturnToBase, "Return to base", host, port, format, verbose).await?;
        }
        ("status", _) => {
            handle_status(host, port, format, verbose).await?;
        }
        ("monitor", Some(sub_matches)) => {
            handle_monitor(sub_matches, host, port, format).await?;
        }
        ("server", Some(sub_matches)) => {
            handle_server(sub_matches, port).await?;
        }
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            println!("{}", "Quick start:".bright_green());
            println!("  {} Start the controller server", "roverctl server".bright_cyan());
            println!("  {} Begin a scanning mission", "roverctl start".bright_cyan());
            println!("  {} Watch live status", "roverctl monitor".bright_cyan());
        }
    }

    Ok(())
}

async fn handle_mission_command(
    command: MissionCommand,
    action: &str,
    host: &str,
    port: u16,
    format: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        println!("{} {}", "Sending".dimmed(), command);
    }

    let response = send_command(host, port, command).await?;
    print_command_result(action, &response, format);

    Ok(())
}

async fn handle_status(
    host: &str,
    port: u16,
    format: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        println!("{}", "Retrieving mission status...".dimmed());
    }

    let snapshot = fetch_snapshot(host, port).await?;

    match format {
        "json" => println!("{}", snapshot),
        "compact" => {
            let state = snapshot["mission_state"].as_str().unwrap_or("Unknown");
            let battery = snapshot["telemetry"]["battery_percent"].as_f64().unwrap_or(0.0);
            let total = snapshot["total_scanned"].as_u64().unwrap_or(0);
            println!("{} | {:.1}% | {} scanned", state_label(state), battery, total);
        }
        _ => print_snapshot_table(&snapshot),
    }

    Ok(())
}

async fn handle_monitor(
    matches: &ArgMatches<'_>,
    host: &str,
    port: u16,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let duration = matches.value_of("duration").map(|t| t.parse::<u64>().unwrap());

    println!("{}", "📡 Monitoring rover status (Press Ctrl+C to stop)...".bright_blue().bold());

    let stream = async {
        match format {
            "json" => monitor_status_json(host, port).await,
            "compact" => monitor_status_compact(host, port).await,
            _ => monitor_status_table(host, port).await,
        }
    };

    match duration {
        Some(secs) => {
            match tokio::time::timeout(std::time::Duration::from_secs(secs), stream).await {
                Ok(result) => result?,
                Err(_) => println!("{}", "⏱️  Monitor window elapsed".dimmed()),
            }
        }
        None => stream.await?,
    }

    Ok(())
}

async fn handle_server(matches: &ArgMatches<'_>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let background = matches.is_present("background");

    println!("{}", "🚀 Starting rover mission controller server...".bright_green().bold());

    let mut cmd = Command::new("cargo");
    cmd.args(&["run", "--bin", "roverctl-server"]);

    if background {
        cmd.spawn()?;
        println!("{} Server started in background on port {}", "✅".green(), port);
    } else {
        println!("{} Server starting on port {} (Press Ctrl+C to stop)", "🌐".bright_blue(), port);
        cmd.status()?;
    }

    Ok(())
}

// Helper functions

fn state_label(state: &str) -> &str {
    match state {
        "ReturningToBase" => "Returning to Base",
        other => other,
    }
}

fn colored_state(state: &str) -> ColoredString {
    match state {
        "Scanning" => "Scanning".bright_green(),
        "Paused" => "Paused".bright_yellow(),
        "ReturningToBase" => "Returning to Base".bright_cyan(),
        _ => state_label(state).white(),
    }
}

fn colored_battery(percent: f64) -> ColoredString {
    let text = format!("{:.1}%", percent);
    if percent > 50.0 {
        text.green()
    } else if percent > 20.0 {
        text.yellow()
    } else {
        text.red()
    }
}

fn colored_sync(status: &str) -> ColoredString {
    match status {
        "Synced" => "synced".bright_green(),
        "Failed" => "failed".bright_red(),
        _ => "pending".bright_yellow(),
    }
}

fn print_command_result(action: &str, response: &serde_json::Value, format: &str) {
    match format {
        "json" => println!("{}", response),
        "compact" => {
            if response["status"] == "Accepted" {
                println!("{}", "OK".bright_green());
            } else {
                println!("{}", "REJECTED".bright_red());
            }
        }
        _ => {
            let status = response["status"].as_str().unwrap_or("Unknown");
            match status {
                "Accepted" => {
                    let state = response["state"].as_str().unwrap_or("?");
                    println!(
                        "{} {} accepted, rover is now {}",
                        "✅".green(),
                        action.bright_white(),
                        state_label(state).bright_cyan()
                    );
                }
                "Rejected" => {
                    let message = response["message"].as_str().unwrap_or("Command rejected");
                    println!(
                        "{} {} rejected: {}",
                        "❌".red(),
                        action.bright_white(),
                        message.bright_red()
                    );
                    println!(
                        "{} Check the mission state with: {}",
                        "💡".yellow(),
                        "roverctl status".bright_cyan()
                    );
                }
                "Error" => {
                    let message = response["message"].as_str().unwrap_or("Server error");
                    println!(
                        "{} {} failed: {}",
                        "⚠️".yellow(),
                        action.bright_white(),
                        message.bright_red()
                    );
                }
                other => {
                    println!(
                        "{} {} returned status {}",
                        "❓".blue(),
                        action.bright_white(),
                        other.bright_blue()
                    );
                }
            }
        }
    }
}

fn print_snapshot_table(snapshot: &serde_json::Value) {
    let state = snapshot["mission_state"].as_str().unwrap_or("Unknown");
    let battery = snapshot["telemetry"]["battery_percent"].as_f64().unwrap_or(0.0);
    let connectivity = snapshot["telemetry"]["connectivity"].as_str().unwrap_or("Unknown");
    let uptime_s = snapshot["telemetry"]["uptime_s"].as_u64().unwrap_or(0);
    let total = snapshot["total_scanned"].as_u64().unwrap_or(0);

    println!("\n{}", "📊 Mission Status".bright_blue().bold());
    println!("{}", "═════════════════".bright_blue());
    println!("{} {}", "State:".bright_white(), colored_state(state));
    println!("{} {}", "Battery:".bright_white(), colored_battery(battery));
    println!("{} {}", "Link:".bright_white(), connectivity);
    println!("{} {}", "Uptime:".bright_white(), format_uptime(uptime_s));

    match snapshot["current_scan"].as_str() {
        Some(item) => println!("{} {}", "Scanning:".bright_white(), item.bright_cyan()),
        None => println!("{} {}", "Scanning:".bright_white(), "idle".dimmed()),
    }
    println!("{} {}", "Total scanned:".bright_white(), total.to_string().bright_cyan());

    if let Some(recent) = snapshot["recent_scans"].as_array() {
        if !recent.is_empty() {
            println!("\n{}", "Recent scans".bright_white().bold());
            for record in recent {
                let id = record["id"].as_u64().unwrap_or(0);
                let label = record["item_label"].as_str().unwrap_or("?");
                let sync = record["sync_status"].as_str().unwrap_or("Pending");
                match record["sync_error"].as_str() {
                    Some(reason) => println!(
                        "  {}  {:<20} {} {}",
                        format_record_id(id).bright_white(),
                        label,
                        colored_sync(sync),
                        format!("({})", reason).dimmed()
                    ),
                    None => println!(
                        "  {}  {:<20} {}",
                        format_record_id(id).bright_white(),
                        label,
                        colored_sync(sync)
                    ),
                }
            }
        }
    }
}

async fn connect(host: &str, port: u16) -> Result<TcpStream, Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", host, port);
    match TcpStream::connect(&addr).await {
        Ok(stream) => Ok(stream),
        Err(e) => {
            eprintln!("{} Failed to connect to mission controller at {}", "❌".red(), addr.bright_white());

            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                eprintln!("{} Server is not running. Start it with:", "💡".yellow());
                eprintln!("   {}", "roverctl server".bright_cyan());
                eprintln!("   or");
                eprintln!("   {}", "cargo run --bin roverctl-server".bright_cyan());
            } else {
                eprintln!("{} Network error: {}", "🔌".yellow(), e.to_string().bright_red());
            }

            Err(e.into())
        }
    }
}

async fn send_command(
    host: &str,
    port: u16,
    command: MissionCommand,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let stream = connect(host, port).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let request = OperatorCommand {
        id: current_timestamp() as u32,
        timestamp: current_timestamp(),
        command,
    };
    let request_id = u64::from(request.id);
    let payload = serde_json::to_string(&request)?;

    match tokio::time::timeout(std::time::Duration::from_secs(5), async {
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;

        // Status snapshots interleave with command replies on the same
        // stream, so match replies by id
        while let Some(line) = lines.next_line().await? {
            let parsed = match serde_json::from_str::<serde_json::Value>(&line) {
                Ok(value) => value,
                Err(_) => continue,
            };
            if parsed.get("status").is_some() && parsed["id"].as_u64() == Some(request_id) {
                return Ok(parsed);
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "Server closed connection before replying",
        ))
    })
    .await
    {
        Ok(result) => Ok(result?),
        Err(_) => {
            eprintln!("{} Command timed out after 5 seconds", "⏰".yellow());
            eprintln!("{} Server may be overloaded or unresponsive", "💡".yellow());
            Err("Command timeout".into())
        }
    }
}

async fn fetch_snapshot(host: &str, port: u16) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let stream = connect(host, port).await?;
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    match tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while let Some(line) = lines.next_line().await? {
            let parsed = match serde_json::from_str::<serde_json::Value>(&line) {
                Ok(value) => value,
                Err(_) => continue,
            };
            if parsed.get("mission_state").is_some() {
                return Ok(parsed);
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "Server closed connection before sending a snapshot",
        ))
    })
    .await
    {
        Ok(result) => Ok(result?),
        Err(_) => {
            eprintln!("{} No snapshot received within 5 seconds", "⏰".yellow());
            Err("Snapshot timeout".into())
        }
    }
}

async fn monitor_status_table(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = connect(host, port).await?;
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    println!("{}", format!("┌{}┐", "─".repeat(88)).bright_white());
    println!("{}", format!("│{:^88}│", "🤖 ROVER MISSION MONITOR").bright_blue().bold());
    println!("{}", format!("├{}┤", "─".repeat(88)).bright_white());
    println!("{}", "│ Uptime   │ State             │ Battery │ Link         │ Scans │ Current                │".bright_white());
    println!("{}", format!("├{}┤", "─".repeat(88)).bright_white());

    while let Some(line) = lines.next_line().await? {
        let snapshot = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => value,
            Err(_) => continue,
        };
        if snapshot.get("mission_state").is_none() {
            continue;
        }

        let uptime_s = snapshot["telemetry"]["uptime_s"].as_u64().unwrap_or(0);
        let state = snapshot["mission_state"].as_str().unwrap_or("Unknown");
        let battery = snapshot["telemetry"]["battery_percent"].as_f64().unwrap_or(0.0);
        let link = snapshot["telemetry"]["connectivity"].as_str().unwrap_or("Unknown");
        let total = snapshot["total_scanned"].as_u64().unwrap_or(0);
        let current = snapshot["current_scan"].as_str().unwrap_or("-");

        let time_str = format!("{:>8}", format_uptime(uptime_s));
        let state_str = match state {
            "Scanning" => format!("{:<17}", "Scanning").bright_green(),
            "Paused" => format!("{:<17}", "Paused").bright_yellow(),
            "ReturningToBase" => format!("{:<17}", "Returning to Base").bright_cyan(),
            _ => format!("{:<17}", state_label(state)).white(),
        };
        let battery_text = format!("{:>6.1}%", battery);
        let battery_str = if battery > 50.0 {
            battery_text.green()
        } else if battery > 20.0 {
            battery_text.yellow()
        } else {
            battery_text.red()
        };
        let link_str = match link {
            "Connected" => format!("{:<12}", "Connected").bright_green(),
            "Degraded" => format!("{:<12}", "Degraded").bright_yellow(),
            _ => format!("{:<12}", link).bright_red(),
        };
        let scans_str = format!("{:>5}", total);
        let current_str = if current == "-" {
            format!("{:<22}", "-").dimmed()
        } else {
            format!("{:<22}", current).bright_cyan()
        };

        println!(
            "│ {} │ {} │ {} │ {} │ {} │ {} │",
            time_str, state_str, battery_str, link_str, scans_str, current_str
        );
    }

    Ok(())
}

async fn monitor_status_json(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = connect(host, port).await?;
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        println!("{}", line);
    }

    Ok(())
}

async fn monitor_status_compact(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = connect(host, port).await?;
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let snapshot = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => value,
            Err(_) => continue,
        };
        if snapshot.get("mission_state").is_none() {
            continue;
        }

        let uptime_s = snapshot["telemetry"]["uptime_s"].as_u64().unwrap_or(0);
        let state = snapshot["mission_state"].as_str().unwrap_or("Unknown");
        let battery = snapshot["telemetry"]["battery_percent"].as_f64().unwrap_or(0.0);
        let link = snapshot["telemetry"]["connectivity"].as_str().unwrap_or("Unknown");
        let total = snapshot["total_scanned"].as_u64().unwrap_or(0);

        let status = match state {
            "Scanning" => "SCAN".bright_green(),
            "Paused" => "PAUSE".bright_yellow(),
            "ReturningToBase" => "RTB".bright_cyan(),
            _ => "IDLE".white(),
        };

        println!(
            "[{}] {} | {:>5.1}% | {} | {} scanned",
            format_uptime(uptime_s),
            status,
            battery,
            link,
            total
        );
    }

    Ok(())
}

fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
}

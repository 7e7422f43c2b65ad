use std::{
    future::Future,
    io::{self, BufRead},
    path::PathBuf,
    rc::Rc,
    time::Instant,
};

use clap::Parser;
use simdash::{
    addon::{CommandInstaller, Installer},
    config::{shared, ClusterSettings},
    console::{parse_line, ConsoleCommand, LogSurface},
    init_tracing,
    network::NetworkOptions,
    screen::ScreenStack,
    screens::DashboardScreen,
    tick_period, TelemetryMode, DEFAULT_UDP_HOST, DEFAULT_UDP_PORT,
};
use tokio::{
    signal,
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// simdash command line arguments
#[derive(Parser, Debug)]
#[command(version)]
struct DashArgs {
    /// Telemetry source to start with
    #[arg(
        short = 'm',
        long,
        value_enum,
        default_value = "demo",
        env = "SIMDASH_MODE"
    )]
    mode: TelemetryMode,

    /// Address the telemetry bridge forwards to
    #[arg(long, default_value = DEFAULT_UDP_HOST, env = "SIMDASH_UDP_HOST")]
    udp_host: String,

    /// Port the telemetry bridge forwards to
    #[arg(short = 'p', long, default_value_t = DEFAULT_UDP_PORT, env = "SIMDASH_UDP_PORT")]
    udp_port: u16,

    /// Render ticks per second
    #[arg(long, default_value_t = 30, env = "SIMDASH_FPS")]
    fps: u32,

    /// IP of the console the bridge reads from
    #[arg(short = 'c', long, env = "SIMDASH_CONSOLE_IP")]
    console_ip: Option<String>,

    /// Program that fetches and registers the telemetry bridge
    #[arg(
        long,
        default_value = "/usr/local/bin/simdash-install-bridge",
        env = "SIMDASH_INSTALLER"
    )]
    installer: PathBuf,
}

/// Stdin is read on its own thread so a pending read never holds up shutdown
fn spawn_console_reader(input_tx: mpsc::Sender<ConsoleCommand>, cancel_token: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("simdash-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if cancel_token.is_cancelled() {
                    break;
                }
                match parse_line(&line) {
                    Some(cmd) => {
                        if input_tx.blocking_send(cmd).is_err() {
                            break;
                        }
                    }
                    None => warn!("Unknown command {line:?}, try s, b, t, i <url> [sha256], ip <addr> or q"),
                }
            }
            debug!("Console input closed");
        });
    if let Err(err) = spawned {
        warn!("No console input: {err}");
    }
}

/// Cancels `token` once `exit_signal` fires. A signal that cannot be awaited
/// leaves the token alone, so `q` still works.
fn cancel_on_exit_signal<F>(token: CancellationToken, exit_signal: F) -> JoinHandle<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = exit_signal.await {
            warn!("Could not listen for exit signal: {err}");
            return;
        }
        info!("Received exit signal, shutting down!");
        token.cancel();
    })
}

#[tokio::main]
async fn main() {
    let cli = DashArgs::parse();

    println!("Initializing simdash...");
    init_tracing().expect("Could not init tracing");

    let settings = shared(ClusterSettings {
        mode: cli.mode,
        network: NetworkOptions {
            host: cli.udp_host,
            port: cli.udp_port,
            ..Default::default()
        },
        console_ip: cli.console_ip,
    });
    let installer: Rc<dyn Installer> = Rc::new(CommandInstaller::new(cli.installer));
    let mut stack = ScreenStack::with_root(Box::new(DashboardScreen::new(settings, installer)));

    let token = CancellationToken::new();
    let (input_tx, mut input_rx) = mpsc::channel::<ConsoleCommand>(32);
    spawn_console_reader(input_tx, token.clone());

    cancel_on_exit_signal(token.clone(), signal::ctrl_c());

    let mut ticker = interval(tick_period(f64::from(cli.fps)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut surface = LogSurface::default();
    let mut last_tick = Instant::now();

    info!("Initialization complete, ready...");
    info!("Use Ctrl+C, SIGINT or q to exit cleanly!");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let now = Instant::now();
                stack.update(now - last_tick);
                last_tick = now;
                stack.draw(&mut surface);
                surface.flush();
            },
            Some(cmd) = input_rx.recv() => match cmd {
                ConsoleCommand::Input(event) => {
                    if !stack.handle_input(&event) {
                        debug!("{:?} ignored by {:?}", event, stack.top_name());
                    }
                    stack.draw(&mut surface);
                    info!("Showing {}: {}", stack.top_name().unwrap_or("nothing"), surface.render());
                },
                ConsoleCommand::Quit => {
                    info!("Quit requested, shutting down!");
                    token.cancel();
                    break;
                },
            },
        }
    }

    // exits the top screen, which stops any running telemetry source
    stack.clear();
}

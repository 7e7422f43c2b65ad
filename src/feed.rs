use std::{error::Error, net::SocketAddr, time::Duration};

use tokio::{
    net::{lookup_host, UdpSocket},
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    channel::FrameSource, demo::DemoSource, tick_period, DEFAULT_UDP_HOST, DEFAULT_UDP_PORT,
};

/// feed options, these are static immutable settings
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Host the dashboard listens on
    pub out_host: String,
    pub out_port: u16,
    /// Upper bound on frames sent per second, floored to 1
    pub max_fps: f64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            out_host: DEFAULT_UDP_HOST.to_string(),
            out_port: DEFAULT_UDP_PORT,
            max_fps: 60.0,
        }
    }
}

impl FeedOptions {
    pub fn send_interval(&self) -> Duration {
        tick_period(self.max_fps)
    }
}

/// Forward demo telemetry as one JSON object per datagram until cancelled.
/// Returns the number of frames sent.
pub async fn run_feed(
    cancel_token: CancellationToken,
    opts: FeedOptions,
) -> Result<u64, Box<dyn Error + Send + Sync>> {
    let dest: SocketAddr = lookup_host((opts.out_host.as_str(), opts.out_port))
        .await?
        .next()
        .ok_or_else(|| format!("{} did not resolve", opts.out_host))?;
    let local: SocketAddr = if dest.is_ipv4() {
        "0.0.0.0:0".parse()?
    } else {
        "[::]:0".parse()?
    };
    let socket = UdpSocket::bind(local).await?;

    let mut demo = DemoSource::new();
    demo.start()?;

    let mut ticker = interval(opts.send_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent = 0u64;
    info!("Sending to udp://{dest}");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!("Quitting feed after {sent} frames");
                break Ok(sent);
            },
            _ = ticker.tick() => {
                let frame = demo.latest();
                trace!("Sending {frame:?}");
                match socket.send_to(&frame.encode(), dest).await {
                    Ok(_) => sent += 1,
                    Err(err) => warn!("Could not send frame: {err}"),
                }
            }
        }
    }
}

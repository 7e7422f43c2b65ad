use clap::Parser;
use simdash::{
    feed::{run_feed, FeedOptions},
    init_tracing, DEFAULT_UDP_HOST, DEFAULT_UDP_PORT,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// simdash-feed command line arguments
#[derive(Parser, Debug)]
#[command(version)]
struct FeedArgs {
    /// Host the dashboard listens on
    #[arg(long, default_value = DEFAULT_UDP_HOST, env = "SIMDASH_UDP_HOST")]
    out_host: String,

    /// Port the dashboard listens on
    #[arg(long, default_value_t = DEFAULT_UDP_PORT, env = "SIMDASH_UDP_PORT")]
    out_port: u16,

    /// Max send rate (frames/sec)
    #[arg(long, default_value_t = 60.0, env = "SIMDASH_FEED_MAX_FPS")]
    max_fps: f64,
}

#[tokio::main]
async fn main() {
    let cli = FeedArgs::parse();
    init_tracing().expect("Could not init tracing");

    let token = CancellationToken::new();

    let mut feed = tokio::spawn(run_feed(
        token.clone(),
        FeedOptions {
            out_host: cli.out_host,
            out_port: cli.out_port,
            max_fps: cli.max_fps,
        },
    ));

    info!("Use Ctrl+C or SIGINT to exit cleanly!");
    let result = tokio::select! {
        res = &mut feed => res,
        res = signal::ctrl_c() => {
            res.expect("Could not read cancellation trigger (ctr+c)");
            info!("Received exit signal, shutting down!");
            token.cancel();
            feed.await
        }
    };

    match result {
        Ok(Ok(sent)) => info!("Sent {sent} frames"),
        Ok(Err(err)) => warn!("Feed failed: {err}"),
        Err(err) => warn!("Feed task panicked: {err}"),
    }
}

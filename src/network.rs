use std::{
    io::{self, ErrorKind},
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    channel::{FrameSource, TelemetryMode},
    error::{SourceError, SourceTerminated},
    frame::{now_ns, TelemetryFrame},
    DEFAULT_UDP_HOST, DEFAULT_UDP_PORT,
};

/// Where and how the network source listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOptions {
    pub host: String,
    pub port: u16,
    /// Largest datagram accepted, anything longer is truncated by the OS
    pub recv_buffer: usize,
    /// How long the receiver sleeps when no datagram is waiting
    pub idle_poll: Duration,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_UDP_HOST.to_string(),
            port: DEFAULT_UDP_PORT,
            recv_buffer: 4096,
            idle_poll: Duration::from_millis(2),
        }
    }
}

/// Counters kept by the receive loop
#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    discarded: AtomicU64,
    terminated: AtomicBool,
}

impl Counters {
    fn snapshot(&self) -> ReceiverStats {
        ReceiverStats {
            published: self.published.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            terminated: self.terminated.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the receiver counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames decoded and published
    pub published: u64,
    /// Malformed datagrams dropped
    pub discarded: u64,
    /// The loop exited on a socket error rather than a stop request
    pub terminated: bool,
}

struct Receiver {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Receives one JSON telemetry object per UDP datagram on a background thread.
///
/// Only the most recent frame is kept. `latest()` never blocks on the receiver:
/// the loop builds each frame in full and swaps it into the slot in one step.
pub struct NetworkSource {
    opts: NetworkOptions,
    latest: Arc<ArcSwap<TelemetryFrame>>,
    counters: Arc<Counters>,
    receiver: Option<Receiver>,
}

impl NetworkSource {
    pub fn new(opts: NetworkOptions) -> Self {
        Self {
            opts,
            latest: Arc::new(ArcSwap::from_pointee(TelemetryFrame::default())),
            counters: Arc::default(),
            receiver: None,
        }
    }

    pub fn options(&self) -> &NetworkOptions {
        &self.opts
    }

    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    /// The address actually bound, useful when listening on port 0
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().map(|r| r.local_addr)
    }

    pub fn stats(&self) -> ReceiverStats {
        self.counters.snapshot()
    }

    fn bind(&self) -> Result<UdpSocket, SourceError> {
        let addr = format!("{}:{}", self.opts.host, self.opts.port);
        let bind_err = |reason| SourceError::Bind {
            addr: addr.clone(),
            reason,
        };
        let candidates: Vec<SocketAddr> = (self.opts.host.as_str(), self.opts.port)
            .to_socket_addrs()
            .map_err(bind_err)?
            .collect();
        let socket = UdpSocket::bind(&candidates[..]).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        Ok(socket)
    }
}

impl FrameSource for NetworkSource {
    fn kind(&self) -> TelemetryMode {
        TelemetryMode::Network
    }

    /// Bind, then hand the socket to the receive thread. Bind failures return here.
    fn start(&mut self) -> Result<(), SourceError> {
        if self.receiver.is_some() {
            debug!("Network telemetry already running");
            return Ok(());
        }
        let socket = self.bind()?;
        let local_addr = socket
            .local_addr()
            .map_err(|reason| SourceError::Bind {
                addr: format!("{}:{}", self.opts.host, self.opts.port),
                reason,
            })?;

        self.counters.terminated.store(false, Ordering::Relaxed);
        let cancel_token = CancellationToken::new();
        let handle = thread::Builder::new()
            .name("simdash-udp-rx".to_string())
            .spawn({
                let cancel_token = cancel_token.clone();
                let latest = self.latest.clone();
                let counters = self.counters.clone();
                let opts = self.opts.clone();
                move || {
                    run_receiver(
                        move |buf| socket.recv_from(buf),
                        &cancel_token,
                        &latest,
                        &counters,
                        &opts,
                    )
                }
            })
            .map_err(|reason| SourceError::Spawn { reason })?;

        info!("Listening for telemetry on udp://{local_addr}");
        self.receiver = Some(Receiver {
            cancel_token,
            handle,
            local_addr,
        });
        Ok(())
    }

    fn latest(&self) -> TelemetryFrame {
        **self.latest.load()
    }

    /// Cancel and join the receive thread. The socket is closed by the time this returns.
    fn stop(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };
        receiver.cancel_token.cancel();
        if receiver.handle.join().is_err() {
            warn!("Telemetry receiver panicked");
        }
        debug!("Stopped telemetry on udp://{}", receiver.local_addr);
    }
}

impl Drop for NetworkSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Thread body: run the loop and record a socket failure in `counters`.
/// `recv` owns the socket, which closes when this returns.
fn run_receiver<R>(
    recv: R,
    cancel_token: &CancellationToken,
    latest: &ArcSwap<TelemetryFrame>,
    counters: &Counters,
    opts: &NetworkOptions,
) where
    R: FnMut(&mut [u8]) -> io::Result<(usize, SocketAddr)>,
{
    if let Err(err) = receive_loop(recv, cancel_token, latest, counters, opts) {
        counters.terminated.store(true, Ordering::Relaxed);
        error!("{err}, serving last good frame");
    }
}

/// Runs until cancelled (Ok) or until `recv` fails hard (Err)
fn receive_loop<R>(
    mut recv: R,
    cancel_token: &CancellationToken,
    latest: &ArcSwap<TelemetryFrame>,
    counters: &Counters,
    opts: &NetworkOptions,
) -> Result<(), SourceTerminated>
where
    R: FnMut(&mut [u8]) -> io::Result<(usize, SocketAddr)>,
{
    let mut buf = vec![0u8; opts.recv_buffer];
    while !cancel_token.is_cancelled() {
        match recv(&mut buf) {
            Ok((len, peer)) => match TelemetryFrame::decode(&buf[..len], now_ns()) {
                Ok(frame) => {
                    trace!("Received frame from {peer}: {frame:?}");
                    latest.store(Arc::new(frame));
                    counters.published.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    counters.discarded.fetch_add(1, Ordering::Relaxed);
                    warn!("Discarding datagram from {peer}: {err}");
                }
            },
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(opts.idle_poll),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            // a previous send to a closed port can surface here on some platforms
            Err(err) if err.kind() == ErrorKind::ConnectionReset => continue,
            Err(err) => return Err(err.into()),
        }
    }
    debug!("Telemetry receiver cancelled");
    Ok(())
}

// THEORY:
// `SignalReceiver` is the robot's end of the link. The operator console pushes one
// decision byte per transmission; the robot only needs the latest decision, proof
// that the console is still alive, and, during a sampling window (typically the
// start of autonomous), a tally of how often each side was reported on.
//
// Key principles:
// 1.  **Latest wins**: every byte overwrites the current decision. Nothing is
//     buffered beyond what the socket holds.
// 2.  **Heartbeat**: any received data refreshes the heartbeat. A client counts as
//     connected while its last heartbeat is younger than `heartbeat_timeout` (3 s).
// 3.  **Idle clients are dropped**: a connection that sends nothing for
//     `idle_timeout` (10 s) is closed so a vanished console cannot pin a thread.
// 4.  **Counting is opt-in**: votes accumulate only between `start_sampling_counts`
//     and `stop_sampling_counts`; `reset` clears the tally and the decision.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core_modules::detector::Decision;

pub const DEFAULT_LISTEN_PORT: u16 = 1180;
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverTiming {
    /// How long after the last byte a client still counts as connected.
    pub heartbeat_timeout: Duration,
    /// Silence after which a client connection is closed.
    pub idle_timeout: Duration,
    /// Granularity of the accept and read loops.
    pub poll_interval: Duration,
}

impl Default for ReceiverTiming {
    fn default() -> Self {
        Self {
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Tally of received decisions while sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteCounts {
    pub left: u32,
    pub right: u32,
    pub total: u32,
}

/// Everything the robot knows about the console.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReceiverState {
    latest: Decision,
    last_heartbeat: Option<Instant>,
    counting: bool,
    counts: VoteCounts,
}

impl ReceiverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Decision {
        self.latest
    }

    pub fn counts(&self) -> VoteCounts {
        self.counts
    }

    pub fn is_counting(&self) -> bool {
        self.counting
    }

    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.last_heartbeat
    }

    pub fn heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = Some(now);
    }

    /// Decodes one received byte, makes it the current decision and counts it when
    /// sampling.
    pub fn record(&mut self, byte: u8, now: Instant) -> Decision {
        let decision = Decision::from_byte(byte);
        self.latest = decision;
        if self.counting {
            self.counts.left += u32::from(decision.left_on);
            self.counts.right += u32::from(decision.right_on);
            self.counts.total += 1;
        }
        self.heartbeat(now);
        decision
    }

    /// True while the last heartbeat is strictly younger than `timeout`.
    pub fn has_client(&self, now: Instant, timeout: Duration) -> bool {
        self.last_heartbeat
            .is_some_and(|last| now.saturating_duration_since(last) < timeout)
    }

    pub fn start_sampling_counts(&mut self) {
        self.counting = true;
    }

    pub fn stop_sampling_counts(&mut self) {
        self.counting = false;
    }

    /// Clears the tally and the current decision. Sampling mode and heartbeat are
    /// left alone.
    pub fn reset(&mut self) {
        self.counts = VoteCounts::default();
        self.latest = Decision::default();
    }
}

struct Shared {
    state: Mutex<ReceiverState>,
    running: AtomicBool,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ReceiverState> {
        // The state stays consistent even if a client thread panicked mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// A bound, not yet serving, receiver.
pub struct SignalReceiver {
    listener: TcpListener,
    timing: ReceiverTiming,
}

impl SignalReceiver {
    pub fn bind(addr: impl ToSocketAddrs, timing: ReceiverTiming) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        // Non-blocking accept lets the serve loop notice `stop`.
        listener.set_nonblocking(true)?;
        Ok(Self { listener, timing })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Starts serving on a background thread. Each client gets its own thread.
    pub fn start(self) -> io::Result<ReceiverHandle> {
        let local_addr = self.listener.local_addr()?;
        let shared = Arc::new(Shared {
            state: Mutex::new(ReceiverState::new()),
            running: AtomicBool::new(true),
        });
        let timing = self.timing;
        let server = {
            let shared = shared.clone();
            thread::spawn(move || serve(self.listener, &shared, timing))
        };
        log::info!("listening for the operator console on {local_addr}");
        Ok(ReceiverHandle {
            shared,
            timing,
            local_addr,
            server: Some(server),
        })
    }
}

/// Robot-side view of a running receiver.
pub struct ReceiverHandle {
    shared: Arc<Shared>,
    timing: ReceiverTiming,
    local_addr: SocketAddr,
    server: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn has_client_connection(&self) -> bool {
        self.shared
            .state()
            .has_client(Instant::now(), self.timing.heartbeat_timeout)
    }

    pub fn latest(&self) -> Decision {
        self.shared.state().latest()
    }

    pub fn counts(&self) -> VoteCounts {
        self.shared.state().counts()
    }

    pub fn snapshot(&self) -> ReceiverState {
        self.shared.state().clone()
    }

    pub fn start_sampling_counts(&self) {
        self.shared.state().start_sampling_counts();
    }

    pub fn stop_sampling_counts(&self) {
        self.shared.state().stop_sampling_counts();
    }

    pub fn reset(&self) {
        self.shared.state().reset();
    }

    /// Stops accepting, closes every client and waits for the threads.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(server) = self.server.take() {
            if server.join().is_err() {
                log::error!("receiver thread panicked");
            }
            log::info!("receiver on {} stopped", self.local_addr);
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(listener: TcpListener, shared: &Arc<Shared>, timing: ReceiverTiming) {
    let mut clients: Vec<JoinHandle<()>> = Vec::new();
    while shared.is_running() {
        match listener.accept() {
            Ok((stream, peer)) => {
                log::info!("operator console connected from {peer}");
                let shared = shared.clone();
                clients.push(thread::spawn(move || {
                    if let Err(err) = serve_client(stream, &shared, timing) {
                        log::warn!("console connection from {peer} failed: {err}");
                    }
                }));
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => thread::sleep(timing.poll_interval),
            Err(err) => {
                log::warn!("accept failed: {err}");
                thread::sleep(timing.poll_interval);
            }
        }
        clients.retain(|client| !client.is_finished());
    }
    for client in clients {
        let _ = client.join();
    }
}

fn serve_client(mut stream: TcpStream, shared: &Shared, timing: ReceiverTiming) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(timing.poll_interval))?;

    let mut last_data = Instant::now();
    shared.state().heartbeat(last_data);

    let mut buf = [0u8; 1024];
    while shared.is_running() {
        match stream.read(&mut buf) {
            Ok(0) => {
                log::info!("operator console closed the connection");
                return Ok(());
            }
            Ok(n) => {
                let now = Instant::now();
                let mut state = shared.state();
                for &byte in &buf[..n] {
                    state.record(byte, now);
                }
                last_data = now;
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(err) => return Err(err),
        }
        if last_data.elapsed() >= timing.idle_timeout {
            log::warn!("no data from operator console for {:?}; closing", timing.idle_timeout);
            return Ok(());
        }
    }
    Ok(())
}

// THEORY:
// `RobotLink` keeps a best-effort channel to the robot controller and pushes the
// current decision over it at a fixed maximum rate. The remote end only cares about
// the most recent byte and tolerates gaps, while the operator display must never
// freeze, so the link never blocks for long and never propagates a failure:
//
// 1.  **Rate gate**: at most one transmission per `period` (25 ms at 40 Hz). Ticks
//     inside the window do no I/O at all.
// 2.  **Connect on demand**: when disconnected, a tick tries to connect with a short
//     timeout. A failed attempt pushes the next allowed attempt one backoff (1 s)
//     into the future, so a dead robot costs one short stall per second.
// 3.  **Discard on failure**: a failed write drops the connection and the decision.
//     Nothing is queued; the next tick sends whatever is current then.
// 4.  **One connection**: the `Connected` state owns the stream, so there is never
//     more than one live connection and a failed one cannot be reused.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::core_modules::detector::Decision;

pub const DEFAULT_SEND_RATE_HZ: f64 = 40.0;
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(25);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_millis(1000);

/// Opens connections to the robot. Abstracted so the state machine can be driven
/// without a network.
pub trait Connector {
    type Stream: Write;

    fn connect(&mut self) -> io::Result<Self::Stream>;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> String;
}

/// TCP connector with bounded connect and write timeouts.
///
/// The endpoint is resolved once, when the connector is built. Name lookup has no
/// timeout of its own, so it must not run inside the send loop.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoint: String,
    addrs: Vec<SocketAddr>,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl TcpConnector {
    /// Resolves `host:port` to every address it names.
    pub fn new(host: &str, port: u16) -> io::Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses resolved for {host}:{port}"),
            ));
        }
        log::debug!("robot endpoint {host}:{port} resolved to {addrs:?}");
        Ok(Self::from_addrs(format!("{host}:{port}"), addrs))
    }

    /// Uses already-resolved addresses, tried in order on every connect.
    pub fn from_addrs(endpoint: impl Into<String>, addrs: Vec<SocketAddr>) -> Self {
        Self {
            endpoint: endpoint.into(),
            addrs,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    /// Tries each resolved address with the connect timeout; the first that
    /// answers wins.
    fn connect(&mut self) -> io::Result<TcpStream> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "robot endpoint has no addresses");
        for addr in &self.addrs {
            match TcpStream::connect_timeout(addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(self.write_timeout))?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(err) => {
                    log::trace!("connect to {addr} failed: {err}");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

/// Timing parameters of the link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkTiming {
    /// Minimum spacing between transmissions.
    pub period: Duration,
    /// Extra delay after a failed connect before the next attempt.
    pub reconnect_backoff: Duration,
}

impl LinkTiming {
    /// `None` when the rate is not positive or its period is not a representable
    /// `Duration`.
    pub fn from_rate(send_rate_hz: f64, reconnect_backoff: Duration) -> Option<Self> {
        if !(send_rate_hz.is_finite() && send_rate_hz > 0.0) {
            return None;
        }
        let period = Duration::try_from_secs_f64(send_rate_hz.recip()).ok()?;
        Some(Self {
            period,
            reconnect_backoff,
        })
    }
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Inside the rate window or the reconnect backoff; no I/O performed.
    Throttled,
    /// A connection attempt failed; backing off.
    ConnectFailed,
    /// The decision byte was written.
    Sent(u8),
    /// The write failed and the connection was dropped.
    SendFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

enum Link<S> {
    Disconnected,
    Connected(S),
}

pub struct RobotLink<C: Connector = TcpConnector> {
    connector: C,
    link: Link<C::Stream>,
    timing: LinkTiming,
    /// Reference point for the rate gate. `None` until the first attempt, so the
    /// first tick is never throttled.
    last_send: Option<Instant>,
}

impl<C: Connector> RobotLink<C> {
    pub fn new(connector: C, timing: LinkTiming) -> Self {
        Self {
            connector,
            link: Link::Disconnected,
            timing,
            last_send: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.link {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connected(_) => ConnectionState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Earliest instant at which the next tick may do I/O.
    pub fn next_send_at(&self) -> Option<Instant> {
        self.last_send.map(|last| last + self.timing.period)
    }

    /// Runs one step of the link. Never fails; failures become outcomes and logs.
    pub fn tick(&mut self, now: Instant, decision: Decision) -> TickOutcome {
        if let Some(next) = self.next_send_at() {
            if now < next {
                log::trace!("link throttled for {:?}", next - now);
                return TickOutcome::Throttled;
            }
        }

        let mut stream = match std::mem::replace(&mut self.link, Link::Disconnected) {
            Link::Connected(stream) => stream,
            Link::Disconnected => match self.connector.connect() {
                Ok(stream) => {
                    log::info!("connected to robot at {}", self.connector.endpoint());
                    stream
                }
                Err(err) => {
                    log::warn!("failed to reconnect to {}: {}", self.connector.endpoint(), err);
                    self.last_send = Some(now + self.timing.reconnect_backoff);
                    return TickOutcome::ConnectFailed;
                }
            },
        };

        let byte = decision.to_byte();
        match stream.write_all(&[byte]).and_then(|()| stream.flush()) {
            Ok(()) => {
                self.link = Link::Connected(stream);
                self.last_send = Some(now);
                TickOutcome::Sent(byte)
            }
            Err(err) => {
                log::warn!("could not send data to robot: {}", err);
                TickOutcome::SendFailed
            }
        }
    }

    /// Drops the current connection, if any.
    pub fn disconnect(&mut self) {
        if let Link::Connected(_) = std::mem::replace(&mut self.link, Link::Disconnected) {
            log::info!("closed robot link to {}", self.connector.endpoint());
        }
    }
}

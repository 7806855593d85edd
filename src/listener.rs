//! Trigger listener: the HTTP endpoint behind the remote action button.
//!
//! ```text
//!   accept ──▶ read head (≤ 8 KiB, 5 s) ──▶ GET? ──▶ 200 + ack, close ──▶ batch
//!                                          └── no ──▶ 501 / 400, close
//! ```
//!
//! One connection is served at a time.  The acknowledgment is written and
//! the connection closed before the batch starts, so the caller never
//! waits for the effects and never sees their outcome.  Triggers that
//! arrive during a batch wait in the accept backlog.
//!
//! `serve` returns `Ok(())` once the shutdown token is cancelled, even
//! while a client is still sending its request, and an
//! error when accepting fails for a reason other than an interruption or
//! when a batch hits a hardware fault.

use core::time::Duration;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use async_io_mini::{Async, Timer};
use futures_lite::future;
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::app::ports::{Clock, EventSink};
use crate::error::{Error, ListenerError};
use crate::orchestrator::{BatchReport, Orchestrator};
use crate::rig::Rig;

/// Body of every successful trigger response.
pub const ACK_BODY: &str = "<html><title>Asteroid</title><body>Asteroid</body></html>";

/// Largest request head read before parsing.
pub const HEAD_LIMIT: usize = 8192;

/// Time a client gets to send its request head.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 512;

// ── Request parsing ───────────────────────────────────────────

/// What the request line asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// A GET on any path.  Fires the batch.
    Get { target: &'a str },
    /// A well-formed request with another method.
    Unsupported { method: &'a str },
    Malformed,
}

/// Parse the request line at the start of `head`.
pub fn parse_request(head: &[u8]) -> Request<'_> {
    let Some(end) = head.iter().position(|&b| b == b'\n') else {
        return Request::Malformed;
    };
    let line = head[..end].strip_suffix(b"\r").unwrap_or(&head[..end]);
    let Ok(line) = core::str::from_utf8(line) else {
        return Request::Malformed;
    };

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Request::Malformed;
    };
    if method.is_empty()
        || !method.bytes().all(|b| b.is_ascii_uppercase())
        || target.is_empty()
        || !version.starts_with("HTTP/1.")
    {
        return Request::Malformed;
    }

    if method == "GET" {
        Request::Get { target }
    } else {
        Request::Unsupported { method }
    }
}

/// A complete `Connection: close` response.
pub fn response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

// ── Trigger context ───────────────────────────────────────────

/// Everything a trigger needs, built once at startup and lent to the
/// listener for the lifetime of the accept loop.
pub struct TriggerContext<'a, C, S> {
    pub orchestrator: &'a Orchestrator<C>,
    pub rig: &'a mut Rig,
    pub sink: &'a mut S,
}

impl<C: Clock, S: EventSink> TriggerContext<'_, C, S> {
    /// Run one batch.
    pub async fn fire(&mut self) -> BatchReport {
        self.orchestrator.run(&mut *self.rig, &mut *self.sink).await
    }
}

// ── Listener ──────────────────────────────────────────────────

pub struct TriggerListener {
    socket: Async<TcpListener>,
}

impl TriggerListener {
    pub fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let socket = Async::<TcpListener>::bind(addr)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.socket.get_ref().local_addr()?)
    }

    /// Accept triggers until `shutdown` is cancelled.
    pub async fn serve<C: Clock, S: EventSink>(
        &self,
        ctx: &mut TriggerContext<'_, C, S>,
        shutdown: &CancellationToken,
    ) -> Result<(), Error> {
        loop {
            let accepted = future::or(async { Some(self.socket.accept().await) }, async {
                shutdown.cancelled().await;
                None
            })
            .await;
            let Some(accepted) = accepted else {
                info!("Shutdown requested, listener stopping");
                return Ok(());
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) if recoverable(&e) => {
                    debug!("accept interrupted: {}", e);
                    continue;
                }
                Err(e) => {
                    error!("accept failed: {}", e);
                    return Err(ListenerError::from(e).into());
                }
            };

            let answered = future::or(answer(&stream, peer), async {
                shutdown.cancelled().await;
                false
            })
            .await;
            drop(stream);
            if !answered {
                continue;
            }

            if shutdown.is_cancelled() {
                info!("Trigger from {} ignored, shutting down", peer);
                continue;
            }
            let report = ctx.fire().await;
            if let Some(fault) = report.first_fault() {
                error!("Batch failed on {:?}: {}", report.failed_channels(), fault);
                return Err(fault.into());
            }
            if !report.unsettled.is_empty() {
                warn!("Channels not settled after batch: {:?}", report.unsettled);
            }
        }
    }
}

/// Accept errors that concern one connection, not the listener.
fn recoverable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted | io::ErrorKind::WouldBlock
    )
}

/// Read the request, write the response and close.  Returns true when
/// the request was a trigger.
async fn answer(stream: &Async<TcpStream>, peer: SocketAddr) -> bool {
    let head = match read_head(stream).await {
        Ok(head) => head,
        Err(e) => {
            warn!("{}: reading request failed: {}", peer, e);
            return false;
        }
    };

    let (reply, trigger) = match parse_request(&head) {
        Request::Get { target } => {
            info!("Trigger from {} ({})", peer, target);
            (response("200 OK", ACK_BODY), true)
        }
        Request::Unsupported { method } => {
            info!("{} from {} not supported", method, peer);
            (response("501 Not Implemented", ""), false)
        }
        Request::Malformed => {
            info!("Malformed request from {}", peer);
            (response("400 Bad Request", ""), false)
        }
    };

    if let Err(e) = write_all(stream, reply.as_bytes()).await {
        // The trigger still counts; the caller just missed the ack.
        warn!("{}: writing response failed: {}", peer, e);
    }
    let _ = stream.get_ref().shutdown(Shutdown::Both);
    trigger
}

/// Read until the blank line ending the head, EOF, [`HEAD_LIMIT`] bytes,
/// or [`READ_TIMEOUT`].
async fn read_head(stream: &Async<TcpStream>) -> io::Result<heapless::Vec<u8, HEAD_LIMIT>> {
    let read = async {
        let mut head = heapless::Vec::<u8, HEAD_LIMIT>::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = stream.read_with(|mut s| s.read(&mut chunk)).await?;
            if n == 0 {
                break;
            }
            let room = HEAD_LIMIT - head.len();
            let take = n.min(room);
            // Cannot fail: `take` fits the remaining capacity.
            let _ = head.extend_from_slice(&chunk[..take]);
            if take < n || head.len() == HEAD_LIMIT || head.windows(4).any(|w| w == b"\r\n\r\n")
            {
                break;
            }
        }
        Ok(head)
    };
    let timeout = async {
        Timer::after(READ_TIMEOUT).await;
        Err(io::Error::new(io::ErrorKind::TimedOut, "request head timed out"))
    };
    future::or(read, timeout).await
}

async fn write_all(stream: &Async<TcpStream>, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        let n = stream.write_with(|mut s| s.write(buf)).await?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        buf = &buf[n..];
    }
    Ok(())
}

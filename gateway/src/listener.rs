//! TCP listener: accepts one connection, reads a single framed request, and
//! hands it to the worker pool (`spec.md` §4.4).

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gw_protocol::MAX_FRAME_SIZE;
use slog::{debug, error, o, warn, Logger};

use crate::error::GatewayError;
use crate::pool::WorkerPool;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Listener {
    socket: TcpListener,
    log: Logger,
}

impl Listener {
    pub fn bind(port: u16, log: &Logger) -> Result<Listener, GatewayError> {
        let socket = TcpListener::bind(("0.0.0.0", port)).map_err(|e| GatewayError::BindFailed(port, e))?;
        Ok(Listener {
            socket,
            log: log.new(o!("component" => "listener")),
        })
    }

    /// Accepts connections until `working` becomes false. Each accepted
    /// connection is read once (up to [`MAX_FRAME_SIZE`] bytes) and, on a
    /// successful positive-length read, enqueued onto `pool`.
    ///
    /// `accept` itself cannot be given a timeout on a blocking
    /// `std::net::TcpListener`, so the socket is switched to non-blocking
    /// mode and polled with a short sleep between attempts — this is what
    /// lets the loop notice `working` going false promptly instead of
    /// blocking in `accept` forever, addressing the "SHOULD interrupt
    /// accept" note in `spec.md` §5.
    pub fn run(&self, pool: &WorkerPool, working: Arc<AtomicBool>) {
        self.socket
            .set_nonblocking(true)
            .expect("TcpListener always supports non-blocking mode");

        while working.load(Ordering::SeqCst) {
            match self.socket.accept() {
                Ok((stream, peer)) => {
                    debug!(self.log, "accepted connection"; "peer" => %peer);
                    if let Err(e) = stream.set_nonblocking(false) {
                        error!(self.log, "failed to switch accepted socket to blocking mode"; "error" => %e);
                        continue;
                    }
                    match Self::read_request(&stream) {
                        Ok(Some(bytes)) => pool.enqueue(stream, bytes),
                        Ok(None) => warn!(self.log, "peer sent no data"; "peer" => %peer),
                        Err(e) => error!(self.log, "packet receive error"; "error" => %e),
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    error!(self.log, "accept failed"; "error" => %e);
                }
            }
        }
    }

    /// Reads up to [`MAX_FRAME_SIZE`] bytes from `stream` in a single call.
    /// Returns `Ok(None)` iff the peer closed without sending data — the fix
    /// for the original source's `recv_gcom_ch`, which returned success
    /// unconditionally regardless of how many bytes (if any) were read
    /// (`spec.md` §9).
    fn read_request(mut stream: &TcpStream) -> std::io::Result<Option<Vec<u8>>> {
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

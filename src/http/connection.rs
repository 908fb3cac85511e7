use std::io::{self, IoSlice, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::buffer::Buffer;
use crate::http::parser;
use crate::http::request::Request;
use crate::http::response::Response;

/// Below this many pending bytes a level-triggered write loop hands control
/// back to the reactor instead of issuing more small system calls.
const WRITE_SPIN_THRESHOLD: usize = 10 * 1024;

/// Per-server state injected into every connection: the resource root, the
/// trigger mode, the response keep-alive policy, and the live-connection
/// counter the accept path checks against its ceiling.
pub struct ConnContext {
    pub root: PathBuf,
    pub edge_triggered: bool,
    pub keep_alive_responses: bool,
    pub live: AtomicUsize,
}

/// One client connection: the socket, an inbound and an outbound buffer, the
/// request being parsed and the response being written.
///
/// The response is transmitted as a two-slot gather write: slot one is the
/// status/header bytes in the outbound buffer, slot two the memory-mapped
/// file. `file_written` tracks how far into the mapping the socket has
/// progressed; the outbound buffer's own read cursor tracks slot one.
pub struct Connection {
    fd: RawFd,
    peer: SocketAddr,
    stream: Option<TcpStream>,
    inbound: Buffer,
    outbound: Buffer,
    request: Request,
    response: Response,
    file_written: usize,
    ctx: Arc<ConnContext>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, ctx: Arc<ConnContext>) -> Self {
        let fd = stream.as_raw_fd();
        let live = ctx.live.fetch_add(1, Ordering::AcqRel) + 1;
        info!("client {} connected on fd {}, {} online", peer, fd, live);
        Self {
            fd,
            peer,
            stream: Some(stream),
            inbound: Buffer::new(),
            outbound: Buffer::new(),
            request: Request::new(),
            response: Response::new(ctx.root.clone(), ctx.keep_alive_responses),
            file_written: 0,
            ctx,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Fills the inbound buffer from the socket. Edge-triggered connections
    /// drain until the socket would block; level-triggered ones read once and
    /// rely on the reactor re-firing.
    ///
    /// `Ok(0)` is an orderly close, `Ok(n)` bytes received,
    /// `ErrorKind::WouldBlock` a spurious wakeup; anything else is fatal.
    pub fn read(&mut self) -> io::Result<usize> {
        let edge_triggered = self.ctx.edge_triggered;
        let Some(stream) = self.stream.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };

        let mut total = 0;
        loop {
            match self.inbound.read_from(stream) {
                Ok(0) => return Ok(0),
                Ok(n) => {
                    total += n;
                    if !edge_triggered {
                        return Ok(total);
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock && total > 0 => {
                    return Ok(total);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs the parser over whatever has arrived and, once a full request is
    /// in hand (or the parse failed), builds the response into the outbound
    /// buffer and arms the gather slots.
    ///
    /// Returns `false` when there is nothing to do yet: no readable bytes, or
    /// a request whose remainder has not arrived.
    pub fn process(&mut self) -> bool {
        if self.request.is_finished() {
            // Previous keep-alive request is done; start the next one.
            self.request.reset();
        }
        if self.inbound.readable_bytes() == 0 {
            return false;
        }

        match parser::parse(&mut self.request, &mut self.inbound) {
            Ok(()) => {
                if !self.request.is_finished() {
                    return false;
                }
                debug!("request for {} from {}", self.request.path(), self.peer);
                self.response.init(
                    self.request.path().to_string(),
                    self.request.keep_alive(),
                    None,
                );
            }
            Err(err) => {
                debug!("bad request from {}: {:?}", self.peer, err);
                // Keep-alive is forced off for malformed requests.
                self.response
                    .init(self.request.path().to_string(), false, Some(400));
            }
        }

        self.response.build(&mut self.outbound);
        self.file_written = 0;
        true
    }

    /// Gather-writes the response: slot one from the outbound buffer, slot
    /// two from the file mapping. Keeps writing while edge-triggered or while
    /// enough is pending to be worth another system call.
    pub fn write(&mut self) -> io::Result<usize> {
        if self.pending_bytes() == 0 {
            return Ok(0);
        }

        let mut last = 0;
        loop {
            let head_len = self.outbound.readable_bytes();
            let n = {
                let head = self.outbound.peek();
                let file: &[u8] = match self.response.file() {
                    Some(map) => &map[self.file_written..],
                    None => &[],
                };
                let Some(stream) = self.stream.as_mut() else {
                    return Err(io::ErrorKind::NotConnected.into());
                };
                let slots = [IoSlice::new(head), IoSlice::new(file)];
                let used = if file.is_empty() { &slots[..1] } else { &slots[..] };
                stream.write_vectored(used)?
            };
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            last = n;

            if n > head_len {
                // The write ran into slot two; slot one is finished with the
                // outbound buffer and it can be recycled.
                self.file_written += n - head_len;
                if head_len > 0 {
                    self.outbound.reset();
                }
            } else {
                self.outbound.advance(n);
            }

            let pending = self.pending_bytes();
            if pending == 0 {
                return Ok(last);
            }
            if !self.ctx.edge_triggered && pending <= WRITE_SPIN_THRESHOLD {
                return Ok(last);
            }
        }
    }

    /// Bytes of the current response not yet handed to the socket.
    pub fn pending_bytes(&self) -> usize {
        self.outbound.readable_bytes()
            + self.response.file_len().saturating_sub(self.file_written)
    }

    /// The transport keep-alive decision for the request just answered
    /// (forced off when the request was malformed).
    pub fn keep_alive(&self) -> bool {
        self.response.keep_alive()
    }

    /// Closes the socket, releases the file mapping and drops this connection
    /// out of the live count. Safe to call more than once.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            self.response.unmap();
            let live = self.ctx.live.fetch_sub(1, Ordering::AcqRel) - 1;
            info!("client {} on fd {} closed, {} online", self.peer, self.fd, live);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

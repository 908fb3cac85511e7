//! The orchestrator: one dispatcher thread multiplexing every socket.
//!
//! The dispatcher owns the listening socket, the reactor and the connection
//! table; it never performs blocking I/O itself. Ready descriptors are handed
//! to the worker pool as read or write tasks. Connection descriptors carry
//! `EPOLLONESHOT`, so a descriptor is reported at most once until the worker
//! that handled it re-arms the interest; that is what keeps a connection
//! touched by at most one worker at a time.

pub mod listener;
pub mod reactor;

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::connection::{ConnContext, Connection};
use crate::pool::WorkerPool;
use crate::server::reactor::{EV_ERR, EV_ET, EV_HUP, EV_IN, EV_ONESHOT, EV_OUT, EV_RDHUP, Reactor};

/// Sent to a connection accepted above the ceiling, which is then closed
/// without ever entering the connection table.
const BUSY_MESSAGE: &[u8] = b"Server busy!";

pub struct Server {
    listener: TcpListener,
    listen_fd: RawFd,
    reactor: Arc<Reactor>,
    pool: WorkerPool,
    connections: HashMap<RawFd, Arc<Mutex<Connection>>>,
    ctx: Arc<ConnContext>,
    listen_event: u32,
    conn_event: u32,
    max_connections: usize,
    closed: bool,
}

impl Server {
    /// Binds the listening socket, creates the reactor and spawns the pool.
    /// Any failure here is fatal: the server never enters its event loop.
    pub fn new(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let (listen_event, conn_event) = trigger_events(cfg.trigger_mode);

        let listener = listener::bind(cfg.port, cfg.linger)
            .with_context(|| format!("bind port {}", cfg.port))?;
        let listen_fd = listener.as_raw_fd();

        let reactor = Arc::new(Reactor::new().context("create reactor")?);
        reactor
            .register(listen_fd, listen_event | EV_IN)
            .context("register listening socket")?;

        let pool = WorkerPool::new(cfg.workers).context("spawn worker pool")?;

        let ctx = Arc::new(ConnContext {
            root: PathBuf::from(&cfg.resource_root),
            edge_triggered: conn_event & EV_ET != 0,
            keep_alive_responses: cfg.keep_alive_responses,
            live: AtomicUsize::new(0),
        });

        info!(
            "listening on port {} ({} workers, trigger mode {})",
            cfg.port, cfg.workers, cfg.trigger_mode
        );

        Ok(Self {
            listener,
            listen_fd,
            reactor,
            pool,
            connections: HashMap::new(),
            ctx,
            listen_event,
            conn_event,
            max_connections: cfg.max_connections,
            closed: false,
        })
    }

    /// The event loop: block in the reactor, then accept or dispatch every
    /// ready descriptor.
    pub fn run(&mut self) -> Result<()> {
        let mut ready: Vec<(RawFd, u32)> = Vec::new();
        info!("server started");

        while !self.closed {
            self.reactor.wait(&mut ready, -1).context("reactor wait")?;
            for &(fd, events) in &ready {
                if fd == self.listen_fd {
                    self.accept_connections();
                } else if events & (EV_RDHUP | EV_HUP | EV_ERR) != 0 {
                    self.close_from_dispatcher(fd);
                } else if events & EV_IN != 0 {
                    self.dispatch(fd, read_task);
                } else if events & EV_OUT != 0 {
                    self.dispatch(fd, write_task);
                } else {
                    error!("unexpected event mask {:#x} on fd {}", events, fd);
                }
            }
        }
        Ok(())
    }

    /// Accepts pending connections, draining the backlog when the listener is
    /// edge-triggered. Above the ceiling the client gets the busy notice and
    /// the accept burst ends.
    fn accept_connections(&mut self) {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(pair) => pair,
                // Transient accept failures (including would-block when the
                // backlog is drained) are silently ignored.
                Err(_) => return,
            };

            if self.ctx.live.load(Ordering::Acquire) >= self.max_connections {
                warn!("connection ceiling reached, rejecting {}", peer);
                reject_busy(stream, peer);
                return;
            }

            if let Err(err) = stream.set_nonblocking(true) {
                warn!("set_nonblocking for {} failed: {}", peer, err);
                continue;
            }

            let fd = stream.as_raw_fd();
            let conn = Connection::new(stream, peer, Arc::clone(&self.ctx));
            // A stale entry from a worker-closed connection on a recycled
            // descriptor number is replaced (and dropped) here.
            self.connections.insert(fd, Arc::new(Mutex::new(conn)));

            if let Err(err) = self.reactor.register(fd, self.conn_event | EV_IN) {
                error!("register fd {} failed: {}", fd, err);
                self.connections.remove(&fd);
            }

            if self.listen_event & EV_ET == 0 {
                return;
            }
        }
    }

    /// Hands the connection for `fd` to the pool.
    fn dispatch(&self, fd: RawFd, task: fn(&Mutex<Connection>, &Reactor, u32)) {
        let Some(conn) = self.connections.get(&fd) else {
            warn!("event for unknown fd {}", fd);
            return;
        };
        let conn = Arc::clone(conn);
        let reactor = Arc::clone(&self.reactor);
        let conn_event = self.conn_event;
        self.pool.submit(move || task(&conn, &reactor, conn_event));
    }

    fn close_from_dispatcher(&mut self, fd: RawFd) {
        if let Err(err) = self.reactor.deregister(fd) {
            debug!("deregister fd {} failed: {}", fd, err);
        }
        match self.connections.remove(&fd) {
            Some(conn) => match conn.lock() {
                Ok(mut conn) => conn.close(),
                Err(_) => error!("connection mutex poisoned for fd {}", fd),
            },
            None => warn!("close event for unknown fd {}", fd),
        }
    }
}

/// Interest masks for the four trigger-mode combinations. Connection sockets
/// always carry ONESHOT so the re-arm protocol holds.
fn trigger_events(mode: u8) -> (u32, u32) {
    let mut listen_event = EV_RDHUP;
    let mut conn_event = EV_ONESHOT | EV_RDHUP;
    match mode {
        0 => {}
        1 => conn_event |= EV_ET,
        2 => listen_event |= EV_ET,
        _ => {
            listen_event |= EV_ET;
            conn_event |= EV_ET;
        }
    }
    (listen_event, conn_event)
}

fn reject_busy(mut stream: TcpStream, peer: SocketAddr) {
    if let Err(err) = stream.write_all(BUSY_MESSAGE) {
        warn!("failed to send busy notice to {}: {}", peer, err);
    }
}

/// Read task, run on a worker: drain the socket, then parse and respond
/// synchronously. Write-interest is armed when a response was produced,
/// read-interest when more of the request is still on the wire.
fn read_task(conn: &Mutex<Connection>, reactor: &Reactor, conn_event: u32) {
    let Ok(mut conn) = conn.lock() else {
        error!("connection mutex poisoned");
        return;
    };
    match conn.read() {
        Ok(0) => close_from_worker(reactor, &mut conn),
        Err(err) if err.kind() != io::ErrorKind::WouldBlock => {
            debug!("read error on fd {}: {}", conn.fd(), err);
            close_from_worker(reactor, &mut conn);
        }
        _ => rearm(reactor, &mut conn, conn_event),
    }
}

/// Write task, run on a worker: push the staged response out. A fully
/// drained keep-alive connection goes straight back through `process` in
/// case the client pipelined the next request.
fn write_task(conn: &Mutex<Connection>, reactor: &Reactor, conn_event: u32) {
    let Ok(mut conn) = conn.lock() else {
        error!("connection mutex poisoned");
        return;
    };
    let result = conn.write();

    if conn.pending_bytes() == 0 {
        if conn.keep_alive() {
            rearm(reactor, &mut conn, conn_event);
            return;
        }
    } else if let Err(err) = result {
        if err.kind() == io::ErrorKind::WouldBlock {
            if let Err(err) = reactor.modify(conn.fd(), conn_event | EV_OUT) {
                error!("re-arm fd {} for write failed: {}", conn.fd(), err);
                close_from_worker(reactor, &mut conn);
            }
            return;
        }
        debug!("write error on fd {}: {}", conn.fd(), err);
    }
    close_from_worker(reactor, &mut conn);
}

fn rearm(reactor: &Reactor, conn: &mut Connection, conn_event: u32) {
    let interest = if conn.process() {
        conn_event | EV_OUT
    } else {
        conn_event | EV_IN
    };
    if let Err(err) = reactor.modify(conn.fd(), interest) {
        error!("re-arm fd {} failed: {}", conn.fd(), err);
        close_from_worker(reactor, conn);
    }
}

fn close_from_worker(reactor: &Reactor, conn: &mut Connection) {
    if let Err(err) = reactor.deregister(conn.fd()) {
        debug!("deregister fd {} failed: {}", conn.fd(), err);
    }
    conn.close();
}

//! Thin wrapper over the kernel readiness facility (epoll).
//!
//! The reactor only tracks descriptor/interest pairs; it never owns
//! connection state. Registration, modification and removal go through
//! `epoll_ctl`, which is safe to call from worker threads while the
//! dispatcher blocks in [`Reactor::wait`].

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Readiness / interest masks, re-exported so callers do not spell out the
/// libc casts everywhere.
pub const EV_IN: u32 = libc::EPOLLIN as u32;
pub const EV_OUT: u32 = libc::EPOLLOUT as u32;
pub const EV_ERR: u32 = libc::EPOLLERR as u32;
pub const EV_HUP: u32 = libc::EPOLLHUP as u32;
pub const EV_RDHUP: u32 = libc::EPOLLRDHUP as u32;
pub const EV_ET: u32 = libc::EPOLLET as u32;
pub const EV_ONESHOT: u32 = libc::EPOLLONESHOT as u32;

/// Upper bound on events reported by a single [`Reactor::wait`] call.
const MAX_EVENTS: usize = 1024;

pub struct Reactor {
    epfd: OwnedFd,
}

impl Reactor {
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            epfd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    /// Starts watching `fd` with the given interest mask.
    pub fn register(&self, fd: RawFd, interest: u32) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, interest)
    }

    /// Replaces the interest mask of an already-registered descriptor. Also
    /// re-arms descriptors registered with `EV_ONESHOT`.
    pub fn modify(&self, fd: RawFd, interest: u32) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, interest)
    }

    pub fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe {
            libc::epoll_ctl(
                self.epfd.as_raw_fd(),
                libc::EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocks until at least one registered descriptor is ready (or `timeout_ms`
    /// elapses; `-1` blocks indefinitely, `0` polls) and fills `ready` with the
    /// (descriptor, event mask) pairs. Interrupted waits are retried.
    pub fn wait(&self, ready: &mut Vec<(RawFd, u32)>, timeout_ms: i32) -> io::Result<usize> {
        let mut events: [libc::epoll_event; MAX_EVENTS] = unsafe { std::mem::zeroed() };
        let n = loop {
            let rc = unsafe {
                libc::epoll_wait(
                    self.epfd.as_raw_fd(),
                    events.as_mut_ptr(),
                    MAX_EVENTS as i32,
                    timeout_ms,
                )
            };
            if rc >= 0 {
                break rc as usize;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        };

        ready.clear();
        for event in &events[..n] {
            ready.push((event.u64 as RawFd, event.events));
        }
        Ok(n)
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, interest: u32) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: interest,
            u64: fd as u64,
        };
        let rc = unsafe { libc::epoll_ctl(self.epfd.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

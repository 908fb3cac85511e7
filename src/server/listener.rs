//! Listening-socket setup.
//!
//! `SO_REUSEADDR` must be set before `bind`, so the socket is built through
//! libc and only then handed to the standard library.

use std::io;
use std::mem;
use std::net::TcpListener;
use std::os::fd::FromRawFd;

const BACKLOG: libc::c_int = 6;

/// Creates the non-blocking listening socket on `port`, bound to all
/// interfaces. When `linger` is set the socket closes gracefully: `close`
/// blocks up to one second while queued data drains.
pub fn bind(port: u16, linger: bool) -> io::Result<TcpListener> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let opt = libc::linger {
            l_onoff: linger as libc::c_int,
            l_linger: 1,
        };
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            &opt as *const _ as *const libc::c_void,
            mem::size_of::<libc::linger>() as libc::socklen_t,
        ) < 0
        {
            return Err(close_on_error(fd));
        }

        let one: libc::c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        ) < 0
        {
            return Err(close_on_error(fd));
        }

        let addr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: libc::INADDR_ANY.to_be(),
            },
            sin_zero: [0; 8],
        };
        if libc::bind(
            fd,
            &addr as *const _ as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        ) < 0
        {
            return Err(close_on_error(fd));
        }

        if libc::listen(fd, BACKLOG) < 0 {
            return Err(close_on_error(fd));
        }

        let listener = TcpListener::from_raw_fd(fd);
        listener.set_nonblocking(true)?;
        Ok(listener)
    }
}

/// Captures `errno` before closing the half-built socket.
fn close_on_error(fd: libc::c_int) -> io::Error {
    let err = io::Error::last_os_error();
    unsafe { libc::close(fd) };
    err
}

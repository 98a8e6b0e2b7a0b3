use std::io::ErrorKind;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace};

use crate::error::{LinkError, Result};
use crate::limits::{max_value_len, MAX_GATT_VALUE_LEN};
use crate::traits::Link;

/// Packet link over Unix datagram sockets.
///
/// Datagram sockets keep write boundaries intact, which makes them a
/// faithful stand-in for GATT writes and notifications on a host. The
/// negotiated MTU is a property of the link value, not of the socket.
///
/// Ends created by [`UnixDatagramLink::pair`] are connected
/// `SOCK_SEQPACKET` sockets: a dropped peer reads as end-of-file and maps to
/// [`LinkError::Closed`]. Ends created by [`UnixDatagramLink::bind`] are
/// connectionless, so a vanished peer is only observable on write; readers
/// on bound links should set a read timeout.
pub struct UnixDatagramLink {
    socket: UnixDatagram,
    /// A zero-length read means the peer hung up.
    connected_pair: bool,
    mtu: usize,
    read_timeout: Option<Duration>,
    path: Option<PathBuf>,
    created_inode: Option<(u64, u64)>,
}

impl UnixDatagramLink {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Create two connected, unnamed ends.
    ///
    /// Reading from one end after the other is dropped returns
    /// [`LinkError::Closed`]. Empty packets are not delivered on a pair,
    /// since they would be indistinguishable from the peer hanging up.
    pub fn pair(mtu: usize) -> Result<(Self, Self)> {
        let (left, right) = seqpacket_pair()?;
        let mut left = Self::from_socket(left, mtu);
        let mut right = Self::from_socket(right, mtu);
        left.connected_pair = true;
        right.connected_pair = true;
        Ok((left, right))
    }

    /// Bind a datagram socket at a filesystem path.
    ///
    /// A stale socket at `path` is removed first; any other kind of file
    /// makes the bind fail. The link must be [`connect`](Self::connect)ed to
    /// a peer path before packets can be written.
    pub fn bind(path: impl AsRef<Path>, mtu: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(LinkError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| LinkError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if !metadata.file_type().is_socket() {
                return Err(LinkError::Bind {
                    path: path.clone(),
                    source: std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| LinkError::Bind {
                path: path.clone(),
                source: e,
            })?;
        }

        let socket = UnixDatagram::bind(&path).map_err(|e| LinkError::Bind {
            path: path.clone(),
            source: e,
        })?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(|e| LinkError::Bind {
            path: path.clone(),
            source: e,
        })?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| LinkError::Bind {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, mtu, "bound datagram link");

        let mut link = Self::from_socket(socket, mtu);
        link.created_inode = Some((created.dev(), created.ino()));
        link.path = Some(path);
        Ok(link)
    }

    /// Direct all writes to the socket bound at `peer`.
    pub fn connect(&self, peer: impl AsRef<Path>) -> Result<()> {
        let peer = peer.as_ref();
        self.socket
            .connect(peer)
            .map_err(|e| LinkError::Connect {
                path: peer.to_path_buf(),
                source: e,
            })?;
        debug!(?peer, "datagram link connected");
        Ok(())
    }

    fn from_socket(socket: UnixDatagram, mtu: usize) -> Self {
        Self {
            socket,
            connected_pair: false,
            mtu,
            read_timeout: None,
            path: None,
            created_inode: None,
        }
    }

    /// Update the negotiated MTU for this end.
    pub fn set_mtu(&mut self, mtu: usize) {
        self.mtu = mtu;
    }

    /// Set a read timeout for [`Link::read_packet`]. `None` blocks forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout)?;
        self.read_timeout = timeout;
        Ok(())
    }

    /// The path this link is bound to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Link for UnixDatagramLink {
    fn mtu(&self) -> usize {
        self.mtu
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let max = max_value_len(self.mtu);
        if packet.len() > max {
            return Err(LinkError::PacketTooLarge {
                len: packet.len(),
                max,
            });
        }

        if packet.is_empty() && self.connected_pair {
            trace!("empty packet dropped on seqpacket link");
            return Ok(());
        }

        loop {
            match self.socket.send(packet) {
                Ok(_) => {
                    trace!(len = packet.len(), "datagram link write");
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::ConnectionRefused
                            | ErrorKind::NotConnected
                            | ErrorKind::BrokenPipe
                            | ErrorKind::ConnectionReset
                    ) =>
                {
                    return Err(LinkError::Closed)
                }
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }

    fn read_packet(&mut self) -> Result<Bytes> {
        let mut buf = [0u8; MAX_GATT_VALUE_LEN];
        loop {
            match self.socket.recv(&mut buf) {
                Ok(0) if self.connected_pair => {
                    debug!("datagram link peer hung up");
                    return Err(LinkError::Closed);
                }
                Ok(n) => return Ok(Bytes::copy_from_slice(&buf[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::ConnectionReset => {
                    return Err(LinkError::Closed)
                }
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(match self.read_timeout {
                        Some(timeout) => LinkError::Timeout(timeout),
                        None => LinkError::Io(err),
                    });
                }
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }
}

fn seqpacket_pair() -> std::io::Result<(UnixDatagram, UnixDatagram)> {
    let mut fds = [0 as libc::c_int; 2];

    // SAFETY: `fds` is a valid writable array of two descriptors, as
    // `socketpair` requires.
    let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_SEQPACKET, 0, fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `socketpair` succeeded, so both descriptors are open and owned
    // by nothing else.
    let (left, right) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [&left, &right] {
        set_cloexec(fd)?;
    }
    Ok((UnixDatagram::from(left), UnixDatagram::from(right)))
}

fn set_cloexec(fd: &OwnedFd) -> std::io::Result<()> {
    // SAFETY: `fd` is an open descriptor for the duration of both calls.
    let rc = unsafe {
        let flags = libc::fcntl(fd.as_raw_fd(), libc::F_GETFD);
        if flags < 0 {
            flags
        } else {
            libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, flags | libc::FD_CLOEXEC)
        }
    };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl Drop for UnixDatagramLink {
    fn drop(&mut self) {
        let (Some(path), Some((expected_dev, expected_ino))) = (&self.path, self.created_inode)
        else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(?path, "cleaning up socket file");
                let _ = std::fs::remove_file(path);
            } else {
                debug!(?path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

impl std::fmt::Debug for UnixDatagramLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixDatagramLink")
            .field("mtu", &self.mtu)
            .field("path", &self.path)
            .finish()
    }
}

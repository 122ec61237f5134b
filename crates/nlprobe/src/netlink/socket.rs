//! Low-level netlink socket operations.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};

use super::builder::MessageBuilder;
use super::error::{Error, Result};

/// Netlink protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Routing/device hook (links, addresses, routes)
    Route,
    /// Generic netlink
    Generic,
}

impl Protocol {
    fn as_isize(self) -> isize {
        match self {
            Protocol::Route => protocols::NETLINK_ROUTE,
            Protocol::Generic => protocols::NETLINK_GENERIC,
        }
    }
}

/// Socket tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// User-space buffer for one received datagram.
    pub recv_buffer: usize,
    /// Kernel receive queue size (`SO_RCVBUF`), kernel default when `None`.
    pub rcvbuf: Option<usize>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            recv_buffer: 32768,
            rcvbuf: None,
        }
    }
}

/// Synchronous netlink socket.
///
/// Allocated unbound; [`connect`](Self::connect) binds it and learns the
/// port id the kernel assigned.
pub struct NetlinkSocket {
    socket: Socket,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel on connect).
    pid: u32,
    protocol: Protocol,
    connected: bool,
    config: SocketConfig,
}

impl NetlinkSocket {
    /// Allocate a socket for the given protocol.
    pub fn new(protocol: Protocol) -> Result<Self> {
        Self::with_config(protocol, SocketConfig::default())
    }

    /// Allocate a socket with explicit buffer settings.
    pub fn with_config(protocol: Protocol, config: SocketConfig) -> Result<Self> {
        let socket = Socket::new(protocol.as_isize()).map_err(Error::socket("socket"))?;
        Ok(Self {
            socket,
            seq: AtomicU32::new(1),
            pid: 0,
            protocol,
            connected: false,
            config,
        })
    }

    /// Allocate and connect a short-lived request socket.
    pub fn connected(protocol: Protocol, config: SocketConfig) -> Result<Self> {
        let mut socket = Self::with_config(protocol, config)?;
        socket.connect()?;
        Ok(socket)
    }

    /// Bind the socket. Connecting twice is a no-op.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }

        let mut addr = SocketAddr::new(0, 0);
        self.socket.bind(&addr).map_err(Error::socket("bind"))?;
        self.socket
            .get_address(&mut addr)
            .map_err(Error::socket("getsockname"))?;
        self.pid = addr.port_number();

        if let Some(size) = self.config.rcvbuf {
            let size = libc::c_int::try_from(size).unwrap_or(libc::c_int::MAX);
            self.socket
                .set_rx_buf_sz(size)
                .map_err(Error::socket("setsockopt(SO_RCVBUF)"))?;
        }

        // Extended ACK is best effort; older kernels reject it.
        self.socket.set_ext_ack(true).ok();

        self.connected = true;
        Ok(())
    }

    /// Check whether [`connect`](Self::connect) has run.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Switch between blocking and non-blocking reads.
    pub fn set_non_blocking(&self, non_blocking: bool) -> Result<()> {
        self.socket
            .set_non_blocking(non_blocking)
            .map_err(Error::socket("fcntl(O_NONBLOCK)"))
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Subscribe to a multicast group.
    pub fn add_membership(&mut self, group: u32) -> Result<()> {
        self.socket
            .add_membership(group)
            .map_err(Error::socket("setsockopt(NETLINK_ADD_MEMBERSHIP)"))
    }

    /// Send a raw message.
    pub fn send(&self, msg: &[u8]) -> Result<()> {
        self.socket.send(msg, 0)?;
        Ok(())
    }

    /// Stamp a request with a fresh sequence number and our port id, then send it.
    ///
    /// Returns the sequence number replies must carry.
    pub fn send_request(&self, mut builder: MessageBuilder) -> Result<u32> {
        let seq = self.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.pid);
        self.send(&builder.finish())?;
        Ok(seq)
    }

    /// Receive one datagram.
    pub fn recv_msg(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.config.recv_buffer);
        // recv advances buf, so buf[..] holds exactly the datagram.
        self.socket.recv(&mut buf, 0)?;
        Ok(buf)
    }

    /// Receive one datagram from a non-blocking socket.
    ///
    /// `Ok(None)` once the queue is empty.
    pub fn try_recv(&self) -> Result<Option<BytesMut>> {
        match self.recv_msg() {
            Ok(buf) => Ok(Some(buf)),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl std::fmt::Debug for NetlinkSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlinkSocket")
            .field("fd", &self.as_raw_fd())
            .field("protocol", &self.protocol)
            .field("pid", &self.pid)
            .field("connected", &self.connected)
            .finish()
    }
}

/// Multicast groups for NETLINK_ROUTE.
pub mod rtnetlink_groups {
    pub const RTNLGRP_LINK: u32 = 1;
    pub const RTNLGRP_IPV4_IFADDR: u32 = 5;
    pub const RTNLGRP_IPV4_ROUTE: u32 = 7;
    pub const RTNLGRP_IPV6_IFADDR: u32 = 9;
    pub const RTNLGRP_IPV6_ROUTE: u32 = 11;
}

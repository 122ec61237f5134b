//! Request/reply exchanges over a netlink socket.
//!
//! Every synchronous call (family resolution, dumps, scan triggers, link
//! changes) and every notification drain goes through [`process_datagram`],
//! which classifies each message as ACK, error, end of dump or payload.

use std::io;

use tracing::trace;

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NlMsgError, NlMsgHdr, NlMsgType};
use super::socket::NetlinkSocket;

/// Where a request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Keep receiving.
    Pending,
    /// ACK or end of dump seen.
    Done,
    /// Kernel replied with this (negative) errno.
    Failed(i32),
}

impl RequestState {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }

    /// Map `Failed` to [`Error::Kernel`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Failed(code) => Err(Error::from_errno(code)),
            Self::Done | Self::Pending => Ok(()),
        }
    }
}

/// Sequence number policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// Every message must echo this request's sequence number.
    Strict(u32),
    /// Multicast notifications carry unrelated sequence numbers.
    Disabled,
}

/// Returned by payload callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Hand no further payload messages to the callback.
    Stop,
}

/// State carried across the datagrams of one exchange.
#[derive(Debug)]
pub struct Exchange {
    state: RequestState,
    check: SeqCheck,
    stopped: bool,
}

impl Exchange {
    pub fn new(check: SeqCheck) -> Self {
        Self {
            state: RequestState::Pending,
            check,
            stopped: false,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Whether a callback asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Classify every message in one datagram.
///
/// Error messages settle the exchange and end processing of the datagram.
/// After `on_valid` returns [`Control::Stop`] payload messages are skipped,
/// but ACK/DONE/ERROR still settle the exchange.
pub fn process_datagram<F>(data: &[u8], exchange: &mut Exchange, on_valid: &mut F) -> Result<()>
where
    F: FnMut(&NlMsgHdr, &[u8]) -> Control,
{
    for msg in MessageIter::new(data) {
        let (header, payload) = msg?;

        if let SeqCheck::Strict(seq) = exchange.check {
            if header.nlmsg_seq != seq {
                return Err(Error::SequenceMismatch {
                    expected: seq,
                    actual: header.nlmsg_seq,
                });
            }
        }

        match header.nlmsg_type {
            NlMsgType::ERROR => {
                let err = NlMsgError::from_bytes(payload)?;
                exchange.state = if err.is_ack() {
                    RequestState::Done
                } else {
                    RequestState::Failed(err.error)
                };
                return Ok(());
            }
            NlMsgType::DONE => exchange.state = RequestState::Done,
            NlMsgType::NOOP | NlMsgType::OVERRUN => {}
            _ => {
                if !exchange.stopped && on_valid(&header, payload) == Control::Stop {
                    exchange.stopped = true;
                }
            }
        }
    }
    Ok(())
}

/// Send `builder` and receive until the kernel settles the request.
pub fn send_and_receive<F>(
    socket: &NetlinkSocket,
    builder: MessageBuilder,
    on_valid: F,
) -> Result<RequestState>
where
    F: FnMut(&NlMsgHdr, &[u8]) -> Control,
{
    let seq = socket.send_request(builder)?;
    receive_until_settled(socket, SeqCheck::Strict(seq), on_valid)
}

/// Send a request that carries no reply payload and wait for its ACK.
pub fn request_ack(socket: &NetlinkSocket, builder: MessageBuilder) -> Result<()> {
    send_and_receive(socket, builder, |_, _| Control::Continue)?.into_result()
}

/// Block on `socket` until the exchange leaves [`RequestState::Pending`].
pub fn receive_until_settled<F>(
    socket: &NetlinkSocket,
    check: SeqCheck,
    mut on_valid: F,
) -> Result<RequestState>
where
    F: FnMut(&NlMsgHdr, &[u8]) -> Control,
{
    let mut exchange = Exchange::new(check);
    while exchange.state.is_pending() {
        let data = socket.recv_msg()?;
        if data.is_empty() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "netlink socket returned no data with a request pending",
            )));
        }
        trace!(len = data.len(), "received datagram");
        process_datagram(&data, &mut exchange, &mut on_valid)?;
    }
    Ok(exchange.state)
}

/// Outcome of draining a notification socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained {
    pub state: RequestState,
    /// The kernel reported dropped notifications (`ENOBUFS`).
    pub overrun: bool,
}

/// Read a non-blocking socket until it would block or a callback stops.
///
/// Sequence numbers are not checked.
pub fn drain<F>(socket: &NetlinkSocket, mut on_valid: F) -> Result<Drained>
where
    F: FnMut(&NlMsgHdr, &[u8]) -> Control,
{
    let mut exchange = Exchange::new(SeqCheck::Disabled);
    let mut overrun = false;
    loop {
        let data = match socket.try_recv() {
            Ok(Some(data)) => data,
            Ok(None) => break,
            Err(e) if e.is_overrun() => {
                overrun = true;
                continue;
            }
            Err(e) => return Err(e),
        };
        if data.is_empty() {
            break;
        }
        trace!(len = data.len(), "received notification datagram");
        process_datagram(&data, &mut exchange, &mut on_valid)?;
        if exchange.stopped || matches!(exchange.state, RequestState::Failed(_)) {
            break;
        }
    }
    Ok(Drained {
        state: exchange.state,
        overrun,
    })
}

//! Driving a listener from a tokio task.
//!
//! Listeners are synchronous and never wait on their own. [`AsyncListener`]
//! registers the event socket with the tokio reactor and calls
//! [`EventSource::data_ready`] whenever it becomes readable.

use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use crate::dispatch::EventSource;
use crate::netlink::{Error, Result};

/// A started listener registered with the tokio reactor.
#[derive(Debug)]
pub struct AsyncListener<L: EventSource> {
    fd: AsyncFd<L>,
}

impl<L: EventSource> AsyncListener<L> {
    /// Register `listener`, which must already be started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(listener: L) -> Result<Self> {
        let fd = AsyncFd::try_with_interest(listener, Interest::READABLE)
            .map_err(|e| Error::socket("epoll_ctl")(e.into_parts().1))?;
        Ok(Self { fd })
    }

    /// Wait until the event socket is readable, then dispatch what is queued.
    ///
    /// Readiness is only cleared when dispatching succeeds, so after an
    /// observer fault the next call resumes with whatever is still queued.
    pub async fn ready(&mut self) -> Result<()> {
        let mut guard = self.fd.readable_mut().await?;
        guard.get_inner_mut().data_ready()?;
        guard.clear_ready();
        Ok(())
    }

    /// Dispatch forever, returning the first error.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.ready().await?;
        }
    }

    pub fn get_ref(&self) -> &L {
        self.fd.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut L {
        self.fd.get_mut()
    }

    /// Deregister and hand the listener back.
    pub fn into_inner(self) -> L {
        self.fd.into_inner()
    }
}

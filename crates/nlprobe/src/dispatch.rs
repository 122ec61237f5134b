//! Fault-contained delivery of events to an observer.
//!
//! Observers run from inside receive loops that can only be told to
//! continue or stop. A failure is parked in a single slot and handed back to
//! the caller of the public operation once the loop has returned.

use std::os::unix::io::{AsRawFd, RawFd};

use tracing::debug;

use crate::netlink::{Control, Error, ObserverError, RequestState, Result};
use crate::observer::Observer;

/// A listener that can be polled externally.
pub trait EventSource: AsRawFd {
    /// Descriptor to watch for readability.
    fn fileno(&self) -> RawFd {
        self.as_raw_fd()
    }

    /// Dispatch whatever is queued on the event socket without blocking.
    fn data_ready(&mut self) -> Result<()>;
}

/// Owns the observer and the fault slot.
#[derive(Debug)]
pub struct Dispatcher<O> {
    observer: O,
    fault: Option<Error>,
}

impl<O: Observer> Dispatcher<O> {
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            fault: None,
        }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Call the observer unless a fault is already parked.
    pub fn deliver<F>(&mut self, call: F) -> Control
    where
        F: FnOnce(&mut O) -> std::result::Result<(), ObserverError>,
    {
        if self.fault.is_some() {
            return Control::Stop;
        }
        match call(&mut self.observer) {
            Ok(()) => Control::Continue,
            Err(e) => {
                debug!(error = %e, "observer failed, suspending delivery");
                self.fault = Some(Error::Observer(e));
                Control::Stop
            }
        }
    }

    /// Park a failure raised while decoding an event. The first fault wins.
    pub fn capture(&mut self, err: Error) -> Control {
        if self.fault.is_none() {
            debug!(error = %err, "event decoding failed, suspending delivery");
            self.fault = Some(err);
        }
        Control::Stop
    }

    /// Take the parked fault, clearing the slot.
    pub fn take_fault(&mut self) -> Option<Error> {
        self.fault.take()
    }

    /// Turn the outcome of a receive loop into the public call's result.
    ///
    /// A parked fault takes precedence over everything else, then errors
    /// from the loop itself, then a kernel error code.
    pub fn settle(&mut self, outcome: Result<RequestState>) -> Result<()> {
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        outcome?.into_result()
    }
}

//! nl80211 listener tests against the live kernel.
//!
//! Machines without a wireless driver do not register nl80211; the
//! listener then fails to start with `FamilyNotFound`.

use nlprobe::{Error, EventSource, Observer, ObserverResult, Result, WlanEvent, WlanListener};

#[derive(Default)]
struct Events(Vec<WlanEvent>);

impl Observer for Events {
    fn wlan_event(&mut self, event: &WlanEvent) -> ObserverResult {
        self.0.push(event.clone());
        Ok(())
    }
}

#[test]
fn test_start_reports_interfaces() -> Result<()> {
    let mut listener = WlanListener::new(Events::default())?;
    assert!(matches!(listener.data_ready(), Err(Error::InvalidState(_))));

    match listener.start() {
        Ok(()) => {}
        Err(Error::FamilyNotFound { .. }) => {
            eprintln!("Skipping test: nl80211 not available");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    for event in &listener.observer().0 {
        assert_eq!(event.cmd, "NEW_INTERFACE");
        assert!(event.ifindex > 0);
    }
    assert!(matches!(listener.start(), Err(Error::InvalidState(_))));
    listener.data_ready()?;
    Ok(())
}

#[test]
fn test_trigger_scan_before_start() -> Result<()> {
    let listener = WlanListener::new(Events::default())?;
    assert!(matches!(
        listener.trigger_scan(1),
        Err(Error::InvalidState(_))
    ));
    Ok(())
}

//! Route listener tests against the live kernel.

use std::time::Duration;

use nlprobe::{Action, AsyncListener, Error, EventSource, Result, RouteListener};

use crate::common::{DummyLink, Recorder};

const IFF_UP: u32 = libc::IFF_UP as u32;

#[test]
fn test_start_replays_loopback() -> Result<()> {
    let mut listener = RouteListener::new(Recorder::default())?;
    listener.start()?;

    let lo = listener
        .observer()
        .links
        .iter()
        .find(|(_, link)| link.name.as_deref() == Some("lo"))
        .expect("loopback should be replayed");
    assert_eq!(lo.0, Action::New);
    assert!(listener.link(lo.1.ifindex).is_some());

    // Links are replayed before addresses and routes.
    assert!(listener.observer().addrs.iter().all(|(a, _)| *a == Action::New));
    assert!(matches!(listener.start(), Err(Error::InvalidState(_))));

    // Nothing queued is not an error.
    listener.data_ready()?;
    Ok(())
}

#[test]
fn test_set_flags_on_unknown_link() -> Result<()> {
    let mut listener = RouteListener::new(Recorder::default())?;
    listener.start()?;
    let err = listener.set_link_flags(i32::MAX, IFF_UP).unwrap_err();
    assert!(matches!(err, Error::LinkNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_link_flags_round_trip() -> Result<()> {
    require_root!();

    let mut listener = RouteListener::new(Recorder::default())?;
    listener.start()?;

    let dummy = DummyLink::new()?;
    let ifindex = dummy.ifindex()?;
    let mut driver = AsyncListener::new(listener)?;

    // Wait for the new link to reach the cache.
    tokio::time::timeout(Duration::from_secs(2), async {
        while driver.get_ref().link(ifindex).is_none() {
            driver.ready().await?;
        }
        Ok::<_, Error>(())
    })
    .await
    .expect("new link notification")?;

    driver.get_ref().set_link_flags(ifindex, IFF_UP)?;
    // Setting it again is not an error.
    driver.get_ref().set_link_flags(ifindex, IFF_UP)?;

    tokio::time::timeout(Duration::from_secs(2), async {
        while !driver.get_ref().link(ifindex).is_some_and(|l| l.is_up()) {
            driver.ready().await?;
        }
        Ok::<_, Error>(())
    })
    .await
    .expect("link up notification")?;

    driver.get_ref().unset_link_flags(ifindex, IFF_UP)?;
    tokio::time::timeout(Duration::from_secs(2), async {
        while driver.get_ref().link(ifindex).is_some_and(|l| l.is_up()) {
            driver.ready().await?;
        }
        Ok::<_, Error>(())
    })
    .await
    .expect("link down notification")?;

    let listener = driver.into_inner();
    let changes: Vec<_> = listener
        .observer()
        .links
        .iter()
        .filter(|(_, link)| link.ifindex == ifindex)
        .map(|(action, _)| *action)
        .collect();
    assert_eq!(changes.first(), Some(&Action::New));
    assert!(changes.contains(&Action::Change));
    assert_eq!(listener.link(ifindex).map(|l| l.name()), Some(Some(dummy.name())));
    Ok(())
}

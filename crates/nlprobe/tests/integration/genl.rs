//! Generic netlink family resolution against the live kernel.

use nlprobe::Result;
use nlprobe::netlink::genl::{GENL_ID_CTRL, resolve_family};
use nlprobe::netlink::{NetlinkSocket, Protocol, SocketConfig};

#[test]
fn test_resolve_control_family() -> Result<()> {
    let socket = NetlinkSocket::connected(Protocol::Generic, SocketConfig::default())?;
    let family = resolve_family(&socket, "nlctrl", &["notify", "no-such-group"])?;

    assert_eq!(family.id, GENL_ID_CTRL);
    assert!(family.group("notify").is_some());
    assert_eq!(family.group("no-such-group"), None);
    Ok(())
}

#[test]
fn test_unknown_family() -> Result<()> {
    let socket = NetlinkSocket::connected(Protocol::Generic, SocketConfig::default())?;
    let err = resolve_family(&socket, "nlprobe-missing", &[]).unwrap_err();
    assert!(matches!(err, nlprobe::Error::FamilyNotFound { .. }));
    assert!(err.is_not_found());
    Ok(())
}

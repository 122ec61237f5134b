//! Captured rtnetlink payloads (everything after `nlmsghdr`).
//!
//! Multi-byte fields are little-endian, as on the machines they came from.

/// Link message for the loopback interface.
/// Captured from: ip link show lo
pub fn link_loopback() -> Vec<u8> {
    vec![
        // ifinfomsg: family=0, type=772 (ARPHRD_LOOPBACK), index=1, flags=0x49 (UP|LOOPBACK|RUNNING)
        0x00, 0x00, // family, pad
        0x04, 0x03, // type = 772
        0x01, 0x00, 0x00, 0x00, // index = 1
        0x49, 0x00, 0x00, 0x00, // flags
        0x00, 0x00, 0x00, 0x00, // change = 0
        // IFLA_IFNAME = "lo"
        0x07, 0x00, // len = 7
        0x03, 0x00, // type = IFLA_IFNAME (3)
        b'l', b'o', 0x00, 0x00, // "lo\0" + padding
        // IFLA_MTU = 65536
        0x08, 0x00, // len = 8
        0x04, 0x00, // type = IFLA_MTU (4)
        0x00, 0x00, 0x01, 0x00, // mtu = 65536
        // IFLA_OPERSTATE = 0 (UNKNOWN)
        0x05, 0x00, // len = 5
        0x10, 0x00, // type = IFLA_OPERSTATE (16)
        0x00, 0x00, 0x00, 0x00, // operstate + padding
    ]
}

/// Link message for an ethernet interface with index 2 and the given flags.
pub fn link_eth0(flags: u32) -> Vec<u8> {
    let mut data = vec![
        0x00, 0x00, // family, pad
        0x01, 0x00, // type = 1 (ARPHRD_ETHER)
        0x02, 0x00, 0x00, 0x00, // index = 2
    ];
    data.extend_from_slice(&flags.to_le_bytes());
    data.extend_from_slice(&[
        0x00, 0x00, 0x00, 0x00, // change = 0
        // IFLA_IFNAME = "eth0"
        0x09, 0x00, // len = 9
        0x03, 0x00, // type = IFLA_IFNAME (3)
        b'e', b't', b'h', b'0', 0x00, 0x00, 0x00, 0x00, // "eth0\0" + padding
        // IFLA_ADDRESS = 52:54:00:12:34:56
        0x0a, 0x00, // len = 10
        0x01, 0x00, // type = IFLA_ADDRESS (1)
        0x52, 0x54, 0x00, 0x12, 0x34, 0x56, 0x00, 0x00, // MAC + padding
    ]);
    data
}

/// Append IFLA_MTU to a link message.
pub fn with_mtu(mut link: Vec<u8>, mtu: u32) -> Vec<u8> {
    link.extend_from_slice(&[0x08, 0x00, 0x04, 0x00]);
    link.extend_from_slice(&mtu.to_le_bytes());
    link
}

/// IPv4 address on index 2 (eth0).
pub fn addr_v4(addr: [u8; 4], prefixlen: u8) -> Vec<u8> {
    let mut data = vec![
        // ifaddrmsg
        0x02, // family = AF_INET
        prefixlen,
        0x80, // flags = IFA_F_PERMANENT
        0x00, // scope = RT_SCOPE_UNIVERSE
        0x02, 0x00, 0x00, 0x00, // index = 2
        // IFA_ADDRESS
        0x08, 0x00, // len = 8
        0x01, 0x00, // type = IFA_ADDRESS (1)
    ];
    data.extend_from_slice(&addr);
    data.extend_from_slice(&[
        // IFA_LOCAL
        0x08, 0x00, // len = 8
        0x02, 0x00, // type = IFA_LOCAL (2)
    ]);
    data.extend_from_slice(&addr);
    data.extend_from_slice(&[
        // IFA_LABEL = "eth0"
        0x09, 0x00, // len = 9
        0x03, 0x00, // type = IFA_LABEL (3)
        b'e', b't', b'h', b'0', 0x00, 0x00, 0x00, 0x00, // "eth0\0" + padding
        // IFA_FLAGS = 0x280 (PERMANENT | NOPREFIXROUTE)
        0x08, 0x00, // len = 8
        0x08, 0x00, // type = IFA_FLAGS (8)
        0x80, 0x02, 0x00, 0x00,
    ]);
    data
}

/// Address message for IPv6 loopback address ::1/128.
pub fn addr_loopback_v6() -> Vec<u8> {
    vec![
        // ifaddrmsg: family=AF_INET6, prefixlen=128, flags=0x80 (IFA_F_PERMANENT), scope=RT_SCOPE_HOST, index=1
        0x0a, // family = AF_INET6
        0x80, // prefixlen = 128
        0x80, // flags = IFA_F_PERMANENT
        0xfe, // scope = RT_SCOPE_HOST (254)
        0x01, 0x00, 0x00, 0x00, // index = 1
        // IFA_ADDRESS = ::1
        0x14, 0x00, // len = 20
        0x01, 0x00, // type = IFA_ADDRESS (1)
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // ::1 (first 8 bytes)
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // ::1 (last 8 bytes)
    ]
}

/// Default route via 192.168.1.1 on index 2.
pub fn route_default_v4() -> Vec<u8> {
    vec![
        // rtmsg
        0x02, // family = AF_INET
        0x00, // dst_len = 0 (default route)
        0x00, // src_len = 0
        0x00, // tos = 0
        0xfe, // table = RT_TABLE_MAIN (254)
        0x04, // protocol = RTPROT_STATIC (4)
        0x00, // scope = RT_SCOPE_UNIVERSE (0)
        0x01, // type = RTN_UNICAST (1)
        0x00, 0x00, 0x00, 0x00, // flags = 0
        // RTA_TABLE = 254
        0x08, 0x00, // len = 8
        0x0f, 0x00, // type = RTA_TABLE (15)
        0xfe, 0x00, 0x00, 0x00, // table = 254
        // RTA_GATEWAY = 192.168.1.1
        0x08, 0x00, // len = 8
        0x05, 0x00, // type = RTA_GATEWAY (5)
        0xc0, 0xa8, 0x01, 0x01, // 192.168.1.1
        // RTA_OIF = 2
        0x08, 0x00, // len = 8
        0x04, 0x00, // type = RTA_OIF (4)
        0x02, 0x00, 0x00, 0x00, // oif = 2
    ]
}

/// Directly connected IPv4 route, metric 100. `RTA_OIF` comes last.
pub fn route_v4(dst: [u8; 4], dst_len: u8, oif: u32) -> Vec<u8> {
    let mut data = vec![
        // rtmsg
        0x02, // family = AF_INET
        dst_len,
        0x00, // src_len = 0
        0x00, // tos = 0
        0xfe, // table = RT_TABLE_MAIN (254)
        0x02, // protocol = RTPROT_KERNEL (2)
        0xfd, // scope = RT_SCOPE_LINK (253)
        0x01, // type = RTN_UNICAST (1)
        0x00, 0x00, 0x00, 0x00, // flags = 0
        // RTA_DST
        0x08, 0x00, // len = 8
        0x01, 0x00, // type = RTA_DST (1)
    ];
    data.extend_from_slice(&dst);
    data.extend_from_slice(&[
        // RTA_PRIORITY = 100
        0x08, 0x00, // len = 8
        0x06, 0x00, // type = RTA_PRIORITY (6)
        0x64, 0x00, 0x00, 0x00, // 100
        // RTA_OIF
        0x08, 0x00, // len = 8
        0x04, 0x00, // type = RTA_OIF (4)
    ]);
    data.extend_from_slice(&oif.to_le_bytes());
    data
}

/// Default route balanced over 10.0.0.1 dev 3 and 10.0.1.1 dev 4 (weight 2).
/// Captured from: ip route add default nexthop via 10.0.0.1 dev eth1 nexthop via 10.0.1.1 dev eth2 weight 2
pub fn route_multipath_v4() -> Vec<u8> {
    vec![
        // rtmsg
        0x02, // family = AF_INET
        0x00, // dst_len = 0
        0x00, // src_len = 0
        0x00, // tos = 0
        0xfe, // table = RT_TABLE_MAIN (254)
        0x03, // protocol = RTPROT_BOOT (3)
        0x00, // scope = RT_SCOPE_UNIVERSE (0)
        0x01, // type = RTN_UNICAST (1)
        0x00, 0x00, 0x00, 0x00, // flags = 0
        // RTA_MULTIPATH
        0x24, 0x00, // len = 36
        0x09, 0x00, // type = RTA_MULTIPATH (9)
        // rtnexthop: len=16, flags=0, hops=0, ifindex=3
        0x10, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00,
        // RTA_GATEWAY = 10.0.0.1
        0x08, 0x00, 0x05, 0x00, 0x0a, 0x00, 0x00, 0x01,
        // rtnexthop: len=16, flags=0, hops=1, ifindex=4
        0x10, 0x00, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00,
        // RTA_GATEWAY = 10.0.1.1
        0x08, 0x00, 0x05, 0x00, 0x0a, 0x00, 0x01, 0x01,
    ]
}

//! nl80211 numbering used by the listener.
//!
//! Only the commands and attributes the listener sends or reads are named;
//! the full command list exists for rendering event names.

/// Generic netlink family name.
pub const NL80211_GENL_NAME: &str = "nl80211";

/// Multicast group carrying association and authentication events.
pub const NL80211_MULTICAST_GROUP_MLME: &str = "mlme";
/// Multicast group carrying scan notifications.
pub const NL80211_MULTICAST_GROUP_SCAN: &str = "scan";

/// nl80211 commands (`enum nl80211_commands`).
pub struct Nl80211Cmd;

impl Nl80211Cmd {
    pub const GET_INTERFACE: u8 = 5;
    pub const NEW_INTERFACE: u8 = 7;
    pub const GET_SCAN: u8 = 32;
    pub const TRIGGER_SCAN: u8 = 33;
    pub const NEW_SCAN_RESULTS: u8 = 34;
    pub const SCAN_ABORTED: u8 = 35;
    pub const ASSOCIATE: u8 = 38;
    pub const CONNECT: u8 = 46;
    pub const DISCONNECT: u8 = 48;
    pub const SET_QOS_MAP: u8 = 104;
}

// Top-level attributes (`enum nl80211_attrs`)
pub const NL80211_ATTR_WIPHY: u16 = 1;
pub const NL80211_ATTR_IFINDEX: u16 = 3;
pub const NL80211_ATTR_IFNAME: u16 = 4;
pub const NL80211_ATTR_SCAN_SSIDS: u16 = 45;
pub const NL80211_ATTR_BSS: u16 = 47;

// BSS attributes (`enum nl80211_bss`)
pub const NL80211_BSS_BSSID: u16 = 1;
pub const NL80211_BSS_INFORMATION_ELEMENTS: u16 = 6;
pub const NL80211_BSS_STATUS: u16 = 9;

/// Information element id of the SSID.
pub const WLAN_EID_SSID: u8 = 0;

/// Kernel command names, indexed by command number, prefix stripped.
const COMMAND_NAMES: [&str; 105] = [
    "UNSPEC",
    "GET_WIPHY",
    "SET_WIPHY",
    "NEW_WIPHY",
    "DEL_WIPHY",
    "GET_INTERFACE",
    "SET_INTERFACE",
    "NEW_INTERFACE",
    "DEL_INTERFACE",
    "GET_KEY",
    "SET_KEY",
    "NEW_KEY",
    "DEL_KEY",
    "GET_BEACON",
    "SET_BEACON",
    "START_AP",
    "STOP_AP",
    "GET_STATION",
    "SET_STATION",
    "NEW_STATION",
    "DEL_STATION",
    "GET_MPATH",
    "SET_MPATH",
    "NEW_MPATH",
    "DEL_MPATH",
    "SET_BSS",
    "SET_REG",
    "REQ_SET_REG",
    "GET_MESH_CONFIG",
    "SET_MESH_CONFIG",
    "SET_MGMT_EXTRA_IE",
    "GET_REG",
    "GET_SCAN",
    "TRIGGER_SCAN",
    "NEW_SCAN_RESULTS",
    "SCAN_ABORTED",
    "REG_CHANGE",
    "AUTHENTICATE",
    "ASSOCIATE",
    "DEAUTHENTICATE",
    "DISASSOCIATE",
    "MICHAEL_MIC_FAILURE",
    "REG_BEACON_HINT",
    "JOIN_IBSS",
    "LEAVE_IBSS",
    "TESTMODE",
    "CONNECT",
    "ROAM",
    "DISCONNECT",
    "SET_WIPHY_NETNS",
    "GET_SURVEY",
    "NEW_SURVEY_RESULTS",
    "SET_PMKSA",
    "DEL_PMKSA",
    "FLUSH_PMKSA",
    "REMAIN_ON_CHANNEL",
    "CANCEL_REMAIN_ON_CHANNEL",
    "SET_TX_BITRATE_MASK",
    "REGISTER_FRAME",
    "FRAME",
    "FRAME_TX_STATUS",
    "SET_POWER_SAVE",
    "GET_POWER_SAVE",
    "SET_CQM",
    "NOTIFY_CQM",
    "SET_CHANNEL",
    "SET_WDS_PEER",
    "FRAME_WAIT_CANCEL",
    "JOIN_MESH",
    "LEAVE_MESH",
    "UNPROT_DEAUTHENTICATE",
    "UNPROT_DISASSOCIATE",
    "NEW_PEER_CANDIDATE",
    "GET_WOWLAN",
    "SET_WOWLAN",
    "START_SCHED_SCAN",
    "STOP_SCHED_SCAN",
    "SCHED_SCAN_RESULTS",
    "SCHED_SCAN_STOPPED",
    "SET_REKEY_OFFLOAD",
    "PMKSA_CANDIDATE",
    "TDLS_OPER",
    "TDLS_MGMT",
    "UNEXPECTED_FRAME",
    "PROBE_CLIENT",
    "REGISTER_BEACONS",
    "UNEXPECTED_4ADDR_FRAME",
    "SET_NOACK_MAP",
    "CH_SWITCH_NOTIFY",
    "START_P2P_DEVICE",
    "STOP_P2P_DEVICE",
    "CONN_FAILED",
    "SET_MCAST_RATE",
    "SET_MAC_ACL",
    "RADAR_DETECT",
    "GET_PROTOCOL_FEATURES",
    "UPDATE_FT_IES",
    "FT_EVENT",
    "CRIT_PROTOCOL_START",
    "CRIT_PROTOCOL_STOP",
    "GET_COALESCE",
    "SET_COALESCE",
    "CHANNEL_SWITCH",
    "VENDOR",
    "SET_QOS_MAP",
];

/// Name of an nl80211 command without the `NL80211_CMD_` prefix.
///
/// Commands newer than `SET_QOS_MAP` render as `"NL80211_CMD_UNKNOWN"`.
pub fn command_name(cmd: u8) -> &'static str {
    COMMAND_NAMES
        .get(cmd as usize)
        .copied()
        .unwrap_or("NL80211_CMD_UNKNOWN")
}

/// Receiver sentinel for a message that fans out to every mesh node.
pub const BROADCAST: &str = "BROADCAST";

/// Receiver shown for a message whose `receiver` field is missing.
pub const MISSING_RECEIVER: &str = "all";

/// Admin API paths, relative to a node's base URL.
pub mod endpoints {
    pub const NODES: &str = "/admin/nodes";
    pub const MESSAGES: &str = "/admin/messages";
    pub const HEARTBEATS: &str = "/admin/heartbeats";
    pub const LEADER: &str = "/admin/leader";
    pub const REPLICAS: &str = "/admin/replicas";
    pub const REFRESH_REPLICAS: &str = "/admin/refresh-replicas";
    pub const TRIGGER_ELECTION: &str = "/admin/trigger-election";
    pub const PARTITION_ENABLE: &str = "/admin/partition/enable";
    pub const PARTITION_DISABLE: &str = "/admin/partition/disable";
    pub const REPLAY: &str = "/admin/replay";
    pub const TEST_UNICAST: &str = "/admin/test/unicast";
    pub const SEND_MESSAGE: &str = "/api/messages/send";

    /// Partition toggle path for the requested mode.
    pub fn partition(enable: bool) -> &'static str {
        if enable {
            PARTITION_ENABLE
        } else {
            PARTITION_DISABLE
        }
    }
}

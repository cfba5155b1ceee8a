/// Application name
pub const APP_NAME: &str = "Troc";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// How often the server sweeps for conversations both parties accepted
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Maximum number of attachment URLs on a single message
pub const MAX_ATTACHMENTS: usize = 10;

/// Default page size when listing messages of a conversation
pub const DEFAULT_MESSAGE_PAGE: u32 = 100;

/// Canned line used in the opening message of a matched conversation
pub const OPENING_LINE: &str = "I'm interested in trading";

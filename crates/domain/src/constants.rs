//! Application constants
//!
//! Centralized location for domain-level defaults shared by the agents and
//! their provider clients.

// Calendar sync window
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 15;
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 30;

// OAuth
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;
pub const DEFAULT_REDIRECT_TIMEOUT_SECS: u64 = 300;
pub const TOKEN_REFRESH_ATTEMPTS: u32 = 3;

// Montage child process
pub const DEFAULT_MONTAGE_STARTUP_TIMEOUT_SECS: u64 = 10;

// Result sizing
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_INBOX_LIMIT: usize = 25;
pub const MAX_FAVORITE_TRACKS: usize = 50;
/// Upper bound for track searches; Spotify rejects offsets above 1000.
pub const MAX_SEARCH_RESULTS: usize = 100;

// On-disk file names under the data directory
pub const TOKEN_CACHE_DIR: &str = "tokens";
pub const USER_DATA_FILE: &str = "userdata.json";

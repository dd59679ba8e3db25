pub mod config;
pub mod credential;
pub mod status;
pub mod store;
pub mod types;
pub mod utils;

// Remote snapshot object is named "<world name><ARCHIVE_EXTENSION>"
pub const ARCHIVE_EXTENSION: &str = ".zip";
// Shared by all machines, there is only one push at a time whatever the world
pub const LOCK_OBJECT_NAME: &str = "savesync.lock";
pub const DEFAULT_CANARY_FILE: &str = "level.dat";
pub const DEFAULT_POLL_INTERVAL: u64 = 2;
pub const APP_FOLDER_NAME: &str = ".savesync";

/// Application name, used in lock metadata and diagnostics.
pub const APP_NAME: &str = "isengard";

/// Rules file looked up by the CLI when none is given.
pub const DEFAULT_RULES_FILENAME: &str = "isengard.json";

/// Fingerprint database created next to the rules file when none is given.
pub const DEFAULT_DB_FILENAME: &str = ".isengard.db";

/// Suffix appended to the database path to form its lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// On-disk format version of the fingerprint database.
pub const FINGERPRINT_DB_VERSION: u32 = 1;

/// Prefix marking a target identifier as virtual (no physical artifact).
pub const VIRTUAL_TARGET_PREFIX: char = '@';

/// Suffix marking a target identifier as a folder.
pub const FOLDER_TARGET_SUFFIX: char = '/';

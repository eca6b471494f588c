/// Directory searched for import/update files when `-d` is not given
pub const DEFAULT_IMPORT_DIR: &str = "assets/imports";

/// Directory export files are written to when `-d` is not given
pub const DEFAULT_EXPORT_DIR: &str = "assets/exports";

/// Format (and file extension) used by export when no encoder is given
pub const DEFAULT_FORMAT: &str = "json";

/// Normalization group applied on export
pub const DEFAULT_GROUP: &str = "export";

/// Property used by `update` to match incoming rows to stored entities
pub const DEFAULT_UNIQUE_PROPERTY: &str = "id";

/// Entity store file used when `--store` is not given
pub const DEFAULT_STORE_PATH: &str = "charon-store.json";

/// Prefix of every canonical entity reference (`/api/people/3`)
pub const REFERENCE_PREFIX: &str = "/api";

/// Two-character sequence standing in for a newline inside line-oriented formats
pub const LINE_BREAK_ESCAPE: &str = "\\n";

/// Bumped whenever the on-disk store layout changes
pub const STORE_VERSION: u32 = 1;

/// Progress update interval (tick every N rows)
pub const PROGRESS_INTERVAL: u64 = 100;

//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Index error - an index could not be parsed, built or validated
pub const INDEX_ERROR: i32 = 2;

/// Not found - unknown repository, chart or version
pub const NOT_FOUND: i32 = 3;

/// Configuration error - repositories.yaml is unreadable or malformed
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

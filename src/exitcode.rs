//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (also: structurally invalid tree operation)
pub const DATAERR: i32 = 65;

/// Service unavailable (remote source failed)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Temporary failure (another operation holds the node)
pub const TEMPFAIL: i32 = 75;

/// Remote error in protocol (malformed payload)
pub const PROTOCOL: i32 = 76;

/// Configuration error
pub const CONFIG: i32 = 78;

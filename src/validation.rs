//! Target validation for user-entered `host[:port]` strings.
//!
//! Callers in local-command mode can ask the bridge to dial arbitrary
//! targets, so the raw text arrives from an untrusted radio peer. Validation
//! is deliberately conservative: a short length cap, a hostname charset that
//! excludes anything shell- or control-meaningful, and a strict port range.
//! No DNS happens here; resolution failures are connect-time errors.

/// A validated `(host, port)` pair, ready for the outbound connect step.
///
/// Immutable once constructed. The host text is preserved exactly as the
/// caller typed it (comparison elsewhere is case-insensitive, but DNS names
/// are case-insensitive anyway and IP literals must not be rewritten).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Rejection reasons for a raw target string. Each message is the exact
/// line sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("Usage: CONNECT <host>[:port]")]
    Usage,

    #[error("Target too long (maximum {MAX_TARGET_LEN} characters)")]
    TooLong,

    #[error("Invalid port number. Use: CONNECT <host>[:port]")]
    InvalidPort,

    #[error("Port out of range (1-65535)")]
    InvalidPortRange,

    #[error("Invalid hostname. Use letters, digits, '.' and '-' only")]
    InvalidHostname,
}

/// Maximum accepted length for a raw target string. Radio peers are slow
/// but not necessarily friendly; this bounds what we parse and log.
pub const MAX_TARGET_LEN: usize = 100;

/// Default destination port when the caller gives only a host (telnet).
pub const DEFAULT_PORT: u16 = 23;

/// Parse and validate a raw `host[:port]` string into a [`Target`].
///
/// Rules:
/// - empty after trim → [`TargetError::Usage`]
/// - longer than [`MAX_TARGET_LEN`] → [`TargetError::TooLong`]
/// - at most one `:`; the port half must be a base-10 integer in 1-65535
/// - the host half must be non-empty, alphanumeric plus `.` and `-`
///
/// Pure and deterministic; performs no I/O.
pub fn validate_target(raw: &str) -> Result<Target, TargetError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(TargetError::Usage);
    }
    if trimmed.len() > MAX_TARGET_LEN {
        return Err(TargetError::TooLong);
    }

    let (host, port) = match trimmed.matches(':').count() {
        0 => (trimmed, DEFAULT_PORT),
        1 => {
            let (host, port_str) = trimmed.split_once(':').expect("single colon present");
            if port_str.is_empty() || !port_str.chars().all(|c| c.is_ascii_digit()) {
                return Err(TargetError::InvalidPort);
            }
            // All-digit but absurdly long ports overflow the parse; that is
            // an out-of-range value, not a format problem.
            let port = match port_str.parse::<u32>() {
                Ok(p) if (1..=65535).contains(&p) => p as u16,
                _ => return Err(TargetError::InvalidPortRange),
            };
            (host, port)
        }
        // Multiple colons: host and port are not separable.
        _ => return Err(TargetError::InvalidPort),
    };

    if host.is_empty() {
        return Err(TargetError::Usage);
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(TargetError::InvalidHostname);
    }

    Ok(Target {
        host: host.to_string(),
        port,
    })
}

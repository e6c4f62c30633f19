use ulid::Ulid;

/// Well-known ID prefixes.
pub mod prefix {
    /// Live real-time connection.
    pub const CONNECTION: &str = "conn";
}

/// `<prefix>_<ULID>`, e.g. `conn_01J9Z3...`.
///
/// # Examples
/// ```
/// let id = telehealth_common::id::prefixed_ulid("conn");
/// assert!(id.starts_with("conn_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new())
}

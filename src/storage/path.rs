//! Abstract path handling: `<protocol>://<remainder>`

use crate::error::{MelonError, Result};

/// Separator between the protocol and the rest of a path
pub const PROTOCOL_SEPARATOR: &str = "://";

/// Split a path into its protocol and remainder
///
/// Splits at the first `"://"`:
/// `"assets://stage/canyon.xml"` → `("assets", "stage/canyon.xml")`.
/// Fails with `InvalidPath` when the separator is missing.
pub fn split_path_into_parts(path: &str) -> Result<(&str, &str)> {
    path.split_once(PROTOCOL_SEPARATOR).ok_or_else(|| {
        MelonError::InvalidPath(format!(
            "'{}' has no '{}' protocol separator",
            path, PROTOCOL_SEPARATOR
        ))
    })
}

//! Name validation for buckets, indexes and sequences.
//!
//! Valid names:
//! - Must be non-empty and at most [`MAX_NAME_LEN`] bytes
//! - Must start with an ASCII lowercase letter
//! - May only contain ASCII lowercase letters, digits and `_`
//!
//! Keeping `:` and `.` out of names is what keeps every bucket's rows,
//! postings and sequences in disjoint key ranges (see [`crate::keys`]).

use crate::error::{OrmError, OrmResult};

/// Longest accepted name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Validate a bucket, index or sequence name.
///
/// # Examples
///
/// ```
/// use strata_orm::names::validate_name;
///
/// assert!(validate_name("counters").is_ok());
/// assert!(validate_name("by_owner2").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("Bad:Name").is_err());
/// ```
pub fn validate_name(name: &str) -> OrmResult<()> {
    let invalid = |reason: &str| OrmError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let first = name.chars().next().ok_or_else(|| invalid("must not be empty"))?;
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("too long"));
    }
    if !first.is_ascii_lowercase() {
        return Err(invalid("must start with a lowercase letter"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
    {
        return Err(OrmError::InvalidName {
            name: name.to_string(),
            reason: format!("contains forbidden character: {ch:?}"),
        });
    }
    Ok(())
}

use crate::{Result, decode_base36, encode_base36};

/// Kind prefix the remote API puts in front of comment IDs.
pub const COMMENT_PREFIX: &str = "t1_";

/// Formats `id` as a fullname: `prefix` followed by its base-36 form.
///
/// # Example
/// ```
/// # #[cfg(feature = "base36")] {
/// use quarry::{COMMENT_PREFIX, to_fullname};
///
/// assert_eq!(to_fullname(COMMENT_PREFIX, 1_295), "t1_zz");
/// # }
/// ```
pub fn to_fullname(prefix: &str, id: u64) -> String {
    let mut name = String::with_capacity(prefix.len() + 13);
    name.push_str(prefix);
    name.push_str(&encode_base36(id));
    name
}

/// Parses a fullname or a bare base-36 ID.
///
/// `prefix` is stripped when present; anything else must be plain base 36.
///
/// # Errors
///
/// Returns [`crate::Error::Base36`] if what remains is not a valid base-36
/// ID.
pub fn from_fullname(prefix: &str, name: &str) -> Result<u64> {
    let digits = name.trim();
    let digits = digits.strip_prefix(prefix).unwrap_or(digits);
    Ok(decode_base36(digits)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Base36Error, Error};

    #[test]
    fn formats_with_prefix() {
        assert_eq!(to_fullname(COMMENT_PREFIX, 0), "t1_0");
        assert_eq!(to_fullname("", 36), "10");
    }

    #[test]
    fn parses_prefixed_and_bare() {
        assert_eq!(from_fullname(COMMENT_PREFIX, "t1_zz"), Ok(1_295));
        assert_eq!(from_fullname(COMMENT_PREFIX, "zz\n"), Ok(1_295));
    }

    #[test]
    fn rejects_other_kinds() {
        assert_eq!(
            from_fullname(COMMENT_PREFIX, "t3_zz"),
            Err(Error::Base36(Base36Error::InvalidChar { byte: b'_' }))
        );
    }
}

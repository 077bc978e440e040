use crate::Base36Error;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const NO_VALUE: u8 = 255;
/// `u64::MAX` in base 36 is 13 digits long.
const MAX_DIGITS: usize = 13;

/// Lookup table for base-36 decoding, accepting either case.
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    while i < 36 {
        let c = ALPHABET[i as usize];
        lut[c as usize] = i;
        if c.is_ascii_lowercase() {
            lut[(c - 32) as usize] = i; // uppercase letter
        }
        i += 1;
    }
    lut
};

/// Encodes `id` as lowercase base 36, the form remote APIs use for IDs.
///
/// # Example
/// ```
/// # #[cfg(feature = "base36")] {
/// assert_eq!(quarry::encode_base36(0), "0");
/// assert_eq!(quarry::encode_base36(35), "z");
/// assert_eq!(quarry::encode_base36(36), "10");
/// # }
/// ```
pub fn encode_base36(mut id: u64) -> String {
    let mut buf = [0_u8; MAX_DIGITS];
    let mut pos = MAX_DIGITS;
    loop {
        pos -= 1;
        buf[pos] = ALPHABET[(id % 36) as usize];
        id /= 36;
        if id == 0 {
            break;
        }
    }
    buf[pos..].iter().map(|&b| char::from(b)).collect()
}

/// Decodes a base-36 string in either case.
///
/// # Errors
///
/// Returns [`Base36Error`] if `s` is empty, contains a non-alphanumeric byte,
/// or does not fit in a `u64`.
pub fn decode_base36(s: &str) -> Result<u64, Base36Error> {
    if s.is_empty() {
        return Err(Base36Error::Empty);
    }
    s.bytes().try_fold(0_u64, |acc, byte| {
        let digit = LOOKUP[byte as usize];
        if digit == NO_VALUE {
            return Err(Base36Error::InvalidChar { byte });
        }
        acc.checked_mul(36)
            .and_then(|acc| acc.checked_add(u64::from(digit)))
            .ok_or(Base36Error::Overflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode_base36(0), "0");
        assert_eq!(encode_base36(10), "a");
        assert_eq!(encode_base36(1_295), "zz");
        assert_eq!(encode_base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn decodes_either_case() {
        assert_eq!(decode_base36("zz"), Ok(1_295));
        assert_eq!(decode_base36("ZZ"), Ok(1_295));
        assert_eq!(decode_base36("c0ffee"), Ok(726_313_910));
        assert_eq!(decode_base36("3w5e11264sgsf"), Ok(u64::MAX));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(decode_base36(""), Err(Base36Error::Empty));
        assert_eq!(
            decode_base36("t1_abc"),
            Err(Base36Error::InvalidChar { byte: b'_' })
        );
        assert_eq!(decode_base36("3w5e11264sgsg"), Err(Base36Error::Overflow));
    }

    #[test]
    fn roundtrips_boundaries() {
        for id in [1, 35, 36, 1_000_000, u64::MAX - 1] {
            assert_eq!(decode_base36(&encode_base36(id)), Ok(id));
        }
    }
}

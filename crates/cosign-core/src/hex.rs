//! Hex helpers shared by the identifier newtypes, the signature types and
//! the key loaders.

use crate::error::ValidationError;

/// Render bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check that `s` is non-empty ASCII hex. `kind` names the value in errors.
pub fn validate(s: &str, kind: &'static str) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::Empty { kind });
    }
    if let Some((position, found)) = s.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(ValidationError::NotHex {
            kind,
            found,
            position,
        });
    }
    Ok(())
}

/// Decode a hex string into bytes.
pub fn decode(s: &str, kind: &'static str) -> Result<Vec<u8>, ValidationError> {
    let s = s.trim();
    validate(s, kind)?;
    if s.len() % 2 != 0 {
        return Err(ValidationError::OddLength {
            kind,
            actual: s.len(),
        });
    }
    // Every char is an ASCII hex digit, so byte slicing is on char boundaries.
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ValidationError::NotHex {
                kind,
                found: s[i..].chars().next().unwrap_or('?'),
                position: i,
            })
        })
        .collect()
}

/// Decode exactly `N` bytes.
pub fn decode_array<const N: usize>(s: &str, kind: &'static str) -> Result<[u8; N], ValidationError> {
    let s = s.trim();
    if s.len() != N * 2 {
        return Err(ValidationError::InvalidLength {
            kind,
            expected: N * 2,
            actual: s.len(),
        });
    }
    let bytes = decode(s, kind)?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// First four bytes as hex, for `Debug` output of key material.
pub fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode() {
        let bytes = [0x00, 0xab, 0xff, 0x10];
        assert_eq!(encode(&bytes), "00abff10");
        assert_eq!(decode("00ABff10", "test").unwrap(), bytes.to_vec());
    }

    #[test]
    fn rejects_odd_length_and_garbage() {
        assert_eq!(
            decode("abc", "test"),
            Err(ValidationError::OddLength { kind: "test", actual: 3 })
        );
        assert!(matches!(
            decode("zz", "test"),
            Err(ValidationError::NotHex { found: 'z', position: 0, .. })
        ));
        assert_eq!(decode("", "test"), Err(ValidationError::Empty { kind: "test" }));
    }

    #[test]
    fn decode_array_checks_length() {
        let arr: [u8; 2] = decode_array("beef", "test").unwrap();
        assert_eq!(arr, [0xbe, 0xef]);
        assert!(matches!(
            decode_array::<2>("beefbeef", "test"),
            Err(ValidationError::InvalidLength { expected: 4, actual: 8, .. })
        ));
    }

    #[test]
    fn prefix_handles_short_input() {
        assert_eq!(prefix(&[1, 2]), "0102");
        assert_eq!(prefix(&[1, 2, 3, 4, 5, 6]), "01020304");
    }
}

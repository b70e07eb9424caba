//! EOSIO account/action names: up to 13 characters packed into a `u64`.

use crate::error::AbiError;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

/// Pack a name string into its `u64` form.
pub fn string_to_name(s: &str) -> Result<u64, AbiError> {
    if s.len() > 13 {
        return Err(AbiError::InvalidName(format!("{s:?} is longer than 13 characters")));
    }

    let mut value = 0u64;
    for (i, c) in s.bytes().enumerate() {
        let symbol = char_to_symbol(c)
            .ok_or_else(|| AbiError::InvalidName(format!("{s:?} contains {:?}", c as char)))?;
        if i < 12 {
            value |= symbol << (64 - 5 * (i + 1));
        } else {
            // The 13th character only has 4 bits.
            if symbol > 0x0f {
                return Err(AbiError::InvalidName(format!("{s:?}: 13th character out of range")));
            }
            value |= symbol;
        }
    }
    Ok(value)
}

/// Unpack a `u64` name into its string form (trailing dots trimmed).
pub fn name_to_string(value: u64) -> String {
    let mut out = [b'.'; 13];
    let mut tmp = value;
    for i in 0..13 {
        let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
        out[12 - i] = CHARMAP[(tmp & mask) as usize];
        tmp >>= shift;
    }

    let end = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
    // CHARMAP is ASCII.
    out[..end].iter().map(|&c| c as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert_eq!(string_to_name("eosio").unwrap(), 6138663577826885632);
        assert_eq!(string_to_name("eosio.token").unwrap(), 6138663591592764928);
        assert_eq!(name_to_string(3773036822876127232), "alice");
        assert_eq!(name_to_string(0), "");
    }

    #[test]
    fn thirteen_character_names() {
        let v = string_to_name("zzzzzzzzzzzzj").unwrap();
        assert_eq!(name_to_string(v), "zzzzzzzzzzzzj");
        assert!(string_to_name("zzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(string_to_name("Alice").is_err());
        assert!(string_to_name("bob9").is_err());
        assert!(string_to_name("abcdefghijklmn").is_err());
    }
}

//! Hex text for byte strings: payloads, unforgeable ids, keys and hashes.

/// Errors from [`parse_hex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    #[error("odd number of hex digits ({0})")]
    OddLength(usize),

    #[error("invalid hex digit at position {0}")]
    Digit(usize),
}

/// Lowercase hex rendering used for byte payloads and unforgeable names.
pub fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Parse hex digits in either case. No prefix or whitespace is accepted;
/// an empty string is zero bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }
    let mut out = Vec::with_capacity(digits.len() / 2);
    for (idx, pair) in digits.chunks(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(HexError::Digit(idx * 2))?;
        let lo = nibble(pair[1]).ok_or(HexError::Digit(idx * 2 + 1))?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

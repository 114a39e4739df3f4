//! Chunk-size strings such as `4096`, `64K`, `1M`, `2G`

use crate::error::BufSizeError;

/// Parse `{num}[K/M/G]` into a byte count (binary multipliers).
pub fn parse_buffer_size(size: &str) -> Result<usize, BufSizeError> {
    let wrong = || BufSizeError::WrongFormat(size.to_string());

    let (digits, mul): (&str, u64) = match size.as_bytes().last() {
        Some(b'K') => (&size[..size.len() - 1], 1024),
        Some(b'M') => (&size[..size.len() - 1], 1024 * 1024),
        Some(b'G') => (&size[..size.len() - 1], 1024 * 1024 * 1024),
        Some(_) => (size, 1),
        None => return Err(wrong()),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(wrong());
    }

    let too_large = || BufSizeError::TooLarge(size.to_string());
    let n: u64 = digits.parse().map_err(|_| too_large())?;
    let bytes = n.checked_mul(mul).ok_or_else(too_large)?;
    if bytes == 0 {
        return Err(BufSizeError::Zero);
    }
    usize::try_from(bytes).map_err(|_| too_large())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_suffixed() {
        assert_eq!(parse_buffer_size("1").unwrap(), 1);
        assert_eq!(parse_buffer_size("4096").unwrap(), 4096);
        assert_eq!(parse_buffer_size("64K").unwrap(), 64 * 1024);
        assert_eq!(parse_buffer_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_buffer_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_buffer_size("007K").unwrap(), 7 * 1024);
    }

    #[test]
    fn test_wrong_format() {
        for s in ["", "K", "1k", "1.5M", "-1", " 1M", "1M ", "1KB", "M1", "0x10"] {
            assert_eq!(
                parse_buffer_size(s),
                Err(BufSizeError::WrongFormat(s.to_string())),
                "{s:?}"
            );
        }
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(parse_buffer_size("0"), Err(BufSizeError::Zero));
        assert_eq!(parse_buffer_size("0G"), Err(BufSizeError::Zero));
    }

    #[test]
    fn test_too_large() {
        assert!(matches!(
            parse_buffer_size("99999999999999999999"),
            Err(BufSizeError::TooLarge(_))
        ));
        assert!(matches!(
            parse_buffer_size("18446744073709551615G"),
            Err(BufSizeError::TooLarge(_))
        ));
    }
}

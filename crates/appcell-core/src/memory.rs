//! Memory size parsing.
//!
//! Grammar: `<decimal digits>[K|M|G][B|b]`. Every failure yields `0`,
//! which callers treat as "no limit configured".

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Parses a memory size such as `512M`, `2GB` or `4096` into bytes.
///
/// Returns `0` when no digits lead the string, when the suffix is not
/// one of the accepted forms, or when the value overflows.
#[must_use]
pub fn parse_memory_size(text: &str) -> u64 {
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(digits_end);
    let Ok(value) = digits.parse::<u64>() else {
        return 0;
    };

    let multiplier = match suffix.as_bytes() {
        [] | [b'B' | b'b'] => 1,
        [unit] | [unit, b'B' | b'b'] => match unit {
            b'K' => KIB,
            b'M' => MIB,
            b'G' => GIB,
            _ => return 0,
        },
        _ => return 0,
    };
    value.checked_mul(multiplier).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_digits_are_bytes() {
        assert_eq!(parse_memory_size("100"), 100);
    }

    #[test]
    fn units_scale_by_powers_of_1024() {
        assert_eq!(parse_memory_size("512M"), 512 * 1024 * 1024);
        assert_eq!(parse_memory_size("4K"), 4096);
        assert_eq!(parse_memory_size("2G"), 2 * GIB);
        assert_eq!(parse_memory_size("64MB"), 64 * MIB);
        assert_eq!(parse_memory_size("64Mb"), 64 * MIB);
    }

    #[test]
    fn empty_and_missing_digits_yield_zero() {
        assert_eq!(parse_memory_size(""), 0);
        assert_eq!(parse_memory_size("M"), 0);
        assert_eq!(parse_memory_size(" 5M"), 0);
    }

    #[test]
    fn unknown_units_yield_zero() {
        assert_eq!(parse_memory_size("10Q"), 0);
        assert_eq!(parse_memory_size("10MX"), 0);
        assert_eq!(parse_memory_size("10MBB"), 0);
        assert_eq!(parse_memory_size("10m"), 0);
    }

    #[test]
    fn overflow_yields_zero() {
        assert_eq!(parse_memory_size("99999999999999999999"), 0);
        assert_eq!(parse_memory_size("18446744073709551615G"), 0);
    }
}

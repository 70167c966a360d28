//! Command argument parsing.

use std::time::Duration;

/// Parse a duration like `30`, `30m`, `2h`, `1d` or `1w`. A bare number
/// means minutes.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    let (last_idx, unit) = input.char_indices().last()?;

    let (digits, unit) = if unit.is_ascii_digit() {
        (input, 'm')
    } else {
        (&input[..last_idx], unit.to_ascii_lowercase())
    };
    let amount: u64 = digits.parse().ok()?;
    if amount == 0 {
        return None;
    }

    let seconds = match unit {
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(3600)?,
        'd' => amount.checked_mul(86400)?,
        'w' => amount.checked_mul(604800)?,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1w"), Some(Duration::from_secs(604800)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("5 phút"), None);
        assert_eq!(parse_duration("3ư"), None);
    }
}

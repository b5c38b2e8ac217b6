use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// 1 unit = 100 cents, so 500.00 = 50000 cents.
pub type Cents = i64;

/// Cash denominations, in cents, that every ledger amount must be a multiple of.
pub const DENOMINATIONS: [Cents; 2] = [500 * 100, 1000 * 100];

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents.
/// Example: "500.00" -> 50000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let (units_str, decimal_str) = match parts.as_slice() {
        [units] => (*units, ""),
        [units, decimals] => (*units, *decimals),
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    // Pad a single digit ("5" -> 50 cents), truncate past two digits.
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => {
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        _ => decimal_str
            .get(..2)
            .ok_or(ParseCentsError::InvalidFormat)?
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

/// Check the business rule for withdraw, deposit and transfer amounts:
/// strictly positive and a whole multiple of 500 or 1000.
pub fn validate_amount(cents: Cents) -> Result<Cents, AmountError> {
    if cents <= 0 {
        return Err(AmountError::NotPositive(cents));
    }
    if !DENOMINATIONS.iter().any(|d| cents % d == 0) {
        return Err(AmountError::NotADenomination(cents));
    }
    Ok(cents)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    NotPositive(Cents),
    NotADenomination(Cents),
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::NotPositive(cents) => {
                write!(f, "{} is not a positive amount", format_cents(*cents))
            }
            AmountError::NotADenomination(cents) => write!(
                f,
                "{} is not a multiple of 500 or 1000",
                format_cents(*cents)
            ),
        }
    }
}

impl std::error::Error for AmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(50000), "500.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("500"), Ok(50000));
        assert_eq!(parse_cents("500.00"), Ok(50000));
        assert_eq!(parse_cents(" 1000 "), Ok(100000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-500"), Ok(-50000));
        assert_eq!(parse_cents("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert_eq!(parse_cents("abc"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("12.34.56"), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents(""), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("."), Err(ParseCentsError::InvalidFormat));
        assert_eq!(
            parse_cents("999999999999999999"),
            Err(ParseCentsError::OutOfRange)
        );
    }

    #[test]
    fn test_validate_amount_accepts_denominations() {
        for units in [500, 1000, 1500, 2000, 10500] {
            assert_eq!(validate_amount(units * 100), Ok(units * 100));
        }
    }

    #[test]
    fn test_validate_amount_rejects_other_amounts() {
        assert_eq!(
            validate_amount(75000),
            Err(AmountError::NotADenomination(75000))
        );
        assert_eq!(
            validate_amount(50050),
            Err(AmountError::NotADenomination(50050))
        );
        assert_eq!(validate_amount(100), Err(AmountError::NotADenomination(100)));
        assert_eq!(validate_amount(0), Err(AmountError::NotPositive(0)));
        assert_eq!(validate_amount(-50000), Err(AmountError::NotPositive(-50000)));
    }
}

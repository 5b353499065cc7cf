use std::{fmt::Display, str::FromStr};

/// Parse a boolean flag from a configuration value.
///
/// Accepts `1/0`, `true/false`, `yes/no` and `on/off` in any case. Anything else is an error carrying a
/// human-readable reason.
pub fn parse_boolean_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("'{value}' is not a recognised boolean flag")),
    }
}

/// Parse a strictly positive number from a configuration value.
///
/// Returns a human-readable reason on failure so that callers can log it before falling back to a default.
pub fn parse_positive<T>(value: &str) -> Result<T, String>
where
    T: FromStr + PartialOrd + Default + Display,
    T::Err: Display,
{
    let n = value.trim().parse::<T>().map_err(|e| format!("'{value}' is not a valid number. {e}"))?;
    if n <= T::default() {
        return Err(format!("{n} must be greater than zero"));
    }
    Ok(n)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert_eq!(parse_boolean_flag("YES"), Ok(true));
        assert_eq!(parse_boolean_flag(" off "), Ok(false));
        assert!(parse_boolean_flag("flase").is_err());
        assert!(parse_boolean_flag("").is_err());
    }

    #[test]
    fn positive_numbers() {
        assert_eq!(parse_positive::<usize>("250"), Ok(250));
        assert!(parse_positive::<usize>("0").is_err());
        assert!(parse_positive::<u64>("ten").is_err());
        assert!(parse_positive::<i64>("-3").is_err());
    }
}

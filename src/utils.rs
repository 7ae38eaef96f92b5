use std::str::FromStr;
use std::time::Duration;

/// Parses a duration string such as "500ms", "30s", "10m", "5h" or "3d".
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration string cannot be empty".to_string());
    }

    let split_at = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("Missing duration unit in '{}'. Use 'ms', 's', 'm', 'h', or 'd'.", s))?;
    let (value_str, unit) = s.split_at(split_at);

    let value = u64::from_str(value_str)
        .map_err(|_| format!("Invalid numeric value in duration: '{}'", value_str))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        "d" => Ok(Duration::from_secs(value * 24 * 60 * 60)),
        _ => Err(format!(
            "Unknown duration unit: '{}'. Use 'ms', 's', 'm', 'h', or 'd'.",
            unit
        )),
    }
}

/// Parses "name=weight" pairs separated by commas, e.g. "web=3,api=1".
///
/// A bare name gets weight 1.
pub fn parse_weighted_list(s: &str) -> Result<Vec<(String, u32)>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, weight)) => {
                let weight = u32::from_str(weight.trim())
                    .map_err(|_| format!("Invalid weight in '{}'", entry))?;
                Ok((name.trim().to_string(), weight))
            }
            None => Ok((entry.to_string(), 1)),
        })
        .collect()
}

/// Splits a comma-separated header list, honouring `\,` as a literal comma.
///
/// Example: "Connection:keep-alive,Keep-Alive:timeout=5\,max=200"
pub fn parse_headers_with_escapes(headers_str: &str) -> Vec<String> {
    let mut headers = Vec::new();
    let mut current = String::new();
    let mut chars = headers_str.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&',') => {
                current.push(',');
                chars.next();
            }
            ',' => {
                if !current.trim().is_empty() {
                    headers.push(std::mem::take(&mut current));
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        headers.push(current);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    mod duration {
        use super::*;

        #[test]
        fn parse_millis() {
            assert_eq!(
                parse_duration_string("3000ms").unwrap(),
                Duration::from_millis(3000)
            );
        }

        #[test]
        fn parse_seconds() {
            assert_eq!(
                parse_duration_string("15s").unwrap(),
                Duration::from_secs(15)
            );
        }

        #[test]
        fn parse_minutes() {
            assert_eq!(
                parse_duration_string("10m").unwrap(),
                Duration::from_secs(600)
            );
        }

        #[test]
        fn parse_hours_and_days() {
            assert_eq!(
                parse_duration_string("2h").unwrap(),
                Duration::from_secs(7200)
            );
            assert_eq!(
                parse_duration_string("1d").unwrap(),
                Duration::from_secs(86400)
            );
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                parse_duration_string("  10m  ").unwrap(),
                Duration::from_secs(600)
            );
        }

        #[test]
        fn empty_string_errors() {
            let err = parse_duration_string("   ").unwrap_err();
            assert!(err.contains("empty"), "error was: {}", err);
        }

        #[test]
        fn no_suffix_errors() {
            let err = parse_duration_string("10").unwrap_err();
            assert!(err.contains("Missing duration unit"), "error was: {}", err);
        }

        #[test]
        fn unknown_suffix_errors() {
            let err = parse_duration_string("10x").unwrap_err();
            assert!(err.contains("Unknown duration unit"), "error was: {}", err);
        }

        #[test]
        fn no_number_errors() {
            let err = parse_duration_string("ms").unwrap_err();
            assert!(err.contains("Invalid numeric"), "error was: {}", err);
        }

        #[test]
        fn fractional_number_errors() {
            let err = parse_duration_string("1.5s").unwrap_err();
            assert!(err.contains("Invalid numeric") || err.contains("Unknown"), "error was: {}", err);
        }
    }

    #[test]
    fn test_parse_weighted_list() {
        let parsed = parse_weighted_list("web=3, api=1,errorhandling").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("web".to_string(), 3),
                ("api".to_string(), 1),
                ("errorhandling".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_parse_weighted_list_rejects_bad_weight() {
        assert!(parse_weighted_list("web=lots").is_err());
        assert!(parse_weighted_list("web=-1").is_err());
    }

    #[test]
    fn test_parse_headers_with_escaped_comma() {
        let result = parse_headers_with_escapes("Connection:keep-alive,Keep-Alive:timeout=5\\,max=200");
        assert_eq!(result, vec!["Connection:keep-alive", "Keep-Alive:timeout=5,max=200"]);
    }

    #[test]
    fn test_parse_headers_keeps_other_backslashes() {
        let result = parse_headers_with_escapes("Path:C:\\Users\\test,Host:example.com");
        assert_eq!(result, vec!["Path:C:\\Users\\test", "Host:example.com"]);
    }

    #[test]
    fn test_parse_headers_skips_empty_entries() {
        let result = parse_headers_with_escapes("X-A:1,  ,X-B:2,");
        assert_eq!(result, vec!["X-A:1", "X-B:2"]);
    }
}

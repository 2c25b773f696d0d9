/// Info strings longer than this are rejected wholesale; the containing
/// datagram is treated as a protocol violation.
pub const MAX_INFO_STRING: usize = 8192;

/// Looks up `key` in a q3-style `\key\value\key\value…` info string.
///
/// Keys are compared case-insensitively. Returns `None` for a missing key,
/// an empty or oversized info string, or a string with no value following
/// the key.
pub fn info_value(info: &str, key: &str) -> Option<String> {
    if info.is_empty() || info.len() >= MAX_INFO_STRING {
        return None;
    }

    let mut parts = info.strip_prefix('\\').unwrap_or(info).split('\\');

    while let Some(candidate) = parts.next() {
        let value = parts.next()?;
        if candidate.eq_ignore_ascii_case(key) {
            return Some(value.to_string());
        }
    }

    None
}

/// Removes every `^` that is followed by an ASCII digit (a q3 color code),
/// passing all other bytes through unchanged.
pub fn strip_colors(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '^' && chars.peek().is_some_and(|next| next.is_ascii_digit()) {
            chars.next();
        } else {
            out.push(ch);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{info_value, strip_colors, MAX_INFO_STRING};

    #[test]
    fn finds_values_by_key() {
        let info = "\\hostname\\^2Cool\\gametype\\tdm\\mapname\\m1\\world\\gta5";
        assert_eq!(info_value(info, "hostname").unwrap(), "^2Cool");
        assert_eq!(info_value(info, "gametype").unwrap(), "tdm");
        assert_eq!(info_value(info, "world").unwrap(), "gta5");
    }

    #[test]
    fn keys_compare_case_insensitively() {
        let info = "\\HostName\\server";
        assert_eq!(info_value(info, "hostname").unwrap(), "server");
    }

    #[test]
    fn missing_key_is_none() {
        assert!(info_value("\\hostname\\server", "world").is_none());
        assert!(info_value("", "world").is_none());
    }

    #[test]
    fn key_without_value_is_none() {
        assert!(info_value("\\hostname", "hostname").is_none());
    }

    #[test]
    fn oversized_info_string_is_rejected() {
        let huge = format!("\\hostname\\{}", "x".repeat(MAX_INFO_STRING));
        assert!(info_value(&huge, "hostname").is_none());
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_colors("^2Cool ^1Server"), "Cool Server");
        assert_eq!(strip_colors("plain"), "plain");
    }

    #[test]
    fn caret_without_digit_passes_through() {
        assert_eq!(strip_colors("a^b^"), "a^b^");
        assert_eq!(strip_colors("^^1x"), "^x");
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

static ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[[^\]]*\]").unwrap());

/// Extracts a JSON array of titles from raw model output.
///
/// Models reliably wrap JSON in commentary no matter how firmly the system
/// instruction forbids it, so a strict parse is followed by a bracket-scan
/// fallback. Anything unparseable yields an empty list; this function never
/// fails.
pub fn parse_title_array(raw: &str) -> Vec<String> {
    if let Ok(titles) = serde_json::from_str::<Vec<String>>(raw) {
        return titles;
    }

    if let Some(found) = ARRAY_RE.find(raw) {
        if let Ok(titles) = serde_json::from_str::<Vec<String>>(found.as_str()) {
            return titles;
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_array() {
        assert_eq!(parse_title_array(r#"["A","B"]"#), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_array_with_surrounding_text() {
        assert_eq!(
            parse_title_array(r#"here: ["A","B"] thanks"#),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_parse_array_spanning_lines() {
        let raw = "Sure, here you go:\n[\n  \"One\",\n  \"Two\"\n]\nHave fun!";
        assert_eq!(parse_title_array(raw), vec!["One", "Two"]);
    }

    #[test]
    fn test_parse_no_json_returns_empty() {
        assert_eq!(parse_title_array("no json here"), Vec::<String>::new());
    }

    #[test]
    fn test_parse_malformed_bracket_contents_returns_empty() {
        assert_eq!(
            parse_title_array("look: [not, actually, json]"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_parse_empty_input_returns_empty() {
        assert_eq!(parse_title_array(""), Vec::<String>::new());
    }
}

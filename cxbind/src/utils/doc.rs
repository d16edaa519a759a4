//! Cleanup of raw documentation comments.

use std::sync::OnceLock;

use regex::Regex;

fn markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    // Comment delimiters, and leading `*` or `///` decoration of every line
    MARKERS.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:/\*\*<?|/\*!<?|/\*|///<?|//!<?|//|\*/|\*+(?:\s|$))|\*/\s*$")
            .expect("valid comment marker pattern")
    })
}

fn commands() -> &'static Regex {
    static COMMANDS: OnceLock<Regex> = OnceLock::new();
    // Doxygen commands which only structure the text
    COMMANDS.get_or_init(|| {
        Regex::new(r"[\\@](?:brief|returns?|param(?:\[[a-z,]+\])?|see|c|p|b)\b\s*")
            .expect("valid doxygen command pattern")
    })
}

/// Reduce a raw comment to one line of plain text.
///
/// Returns `None` when nothing but markup remains.
pub fn clean_comment(raw: &str) -> Option<String> {
    let text = markers().replace_all(raw, " ");
    let text = commands().replace_all(&text, "");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_comment() {
        let raw = "/**\n * \\brief Retrieve the file that is included by the given\n * inclusion directive cursor.\n */";
        assert_eq!(
            clean_comment(raw).as_deref(),
            Some("Retrieve the file that is included by the given inclusion directive cursor.")
        );
    }

    #[test]
    fn test_line_comments() {
        let raw = "/// Determine whether the given header is guarded\n/// against multiple inclusions.";
        assert_eq!(
            clean_comment(raw).as_deref(),
            Some("Determine whether the given header is guarded against multiple inclusions.")
        );
    }

    #[test]
    fn test_trailing_member_comment() {
        assert_eq!(clean_comment("/**< The amount of memory. */").as_deref(), Some("The amount of memory."));
    }

    #[test]
    fn test_empty_comment() {
        assert_eq!(clean_comment("/** */"), None);
        assert_eq!(clean_comment(""), None);
    }
}

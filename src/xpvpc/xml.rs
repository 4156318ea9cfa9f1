//! Minimal XML text encoding for the port client's documents.

// Mirrors the C library's isspace() set.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

/// Appends `text` to `out`, trimmed of leading and trailing whitespace and
/// XML-escaped.
///
/// `<`, `>` and `&` always escape; the active `quote` character escapes to
/// its entity; TAB, LF and CR pass through; other C0 control characters are
/// emitted as decimal character references.
pub(crate) fn push_encoded(out: &mut String, text: &str, quote: Option<char>) {
    for c in text.trim_matches(is_space).chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if quote == Some('"') => out.push_str("&quot;"),
            '\'' if quote == Some('\'') => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' => {
                out.push_str("&#");
                out.push_str(&(c as u32).to_string());
                out.push(';');
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::push_encoded;

    fn encoded(text: &str, quote: Option<char>) -> String {
        let mut out = String::new();
        push_encoded(&mut out, text, quote);
        out
    }

    #[test]
    fn markup_characters_escape() {
        assert_eq!(encoded("a<b>c&d", None), "a&lt;b&gt;c&amp;d");
    }

    #[test]
    fn only_the_active_quote_escapes() {
        assert_eq!(encoded("it's \"q\"", Some('\'')), "it&apos;s \"q\"");
        assert_eq!(encoded("it's \"q\"", Some('"')), "it's &quot;q&quot;");
        assert_eq!(encoded("it's \"q\"", None), "it's \"q\"");
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(encoded("  padded \t", None), "padded");
    }

    #[test]
    fn control_characters_become_references() {
        assert_eq!(encoded("a\x01b", None), "a&#1;b");
        // TAB, LF and CR pass through (inner ones survive the trim).
        assert_eq!(encoded("a\tb\nc", None), "a\tb\nc");
    }
}

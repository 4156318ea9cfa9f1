//! The point value line grammar:
//!
//! ```text
//! <pointName> <stamp> [ '[' <escapedState> ']' ] [ '"' <escapedValue> '"' ]
//! ```
//!
//! Inside the state field a literal `[` is written `][` and a literal `]` is
//! written `[]`; the field ends at a `]` followed by anything but `[`. Inside
//! the value field a literal `"` is doubled. A lone `-` in value position
//! marks the point value as deleted.

use crate::pipe::line_input::FieldCursor;
use crate::pipe::PipeResult;
use crate::point_value::{PointValue, State};

pub(crate) fn parse_point_value(line: &str, stamp_required: bool) -> PipeResult<PointValue> {
    let mut cursor = FieldCursor::new(line.to_string());
    let mut point_value = PointValue::new(cursor.require_field()?);

    let stamp = if stamp_required {
        Some(cursor.require_field()?)
    } else {
        cursor.next_field(false)?
    };
    let Some(stamp) = stamp else {
        return Ok(point_value);
    };
    point_value.stamp = Some(stamp);

    let mut rest = cursor.rest();

    if let Some(after) = rest.strip_prefix('[') {
        match parse_state(after) {
            Some((state, remainder)) => {
                point_value.state = Some(State::Text(state));
                rest = remainder;
            }
            None => {
                warn!("Invalid format for state field: [{after}");
                return Ok(point_value);
            }
        }
    }

    if let Some(after) = rest.strip_prefix('"') {
        match parse_quoted(after) {
            Some(value) => point_value.value = Some(value),
            None => warn!("Invalid format for value field: \"{after}"),
        }
    } else if rest.starts_with('-') {
        point_value.state = Some(State::Deleted);
    }

    Ok(point_value)
}

// Unescapes the state field. Returns the state text and the remainder of the
// line after the closing bracket and its separator, or `None` when the field
// is malformed.
fn parse_state(text: &str) -> Option<(String, &str)> {
    let mut state = String::new();
    let mut left_seen = false;
    let mut right_seen = false;
    let mut chars = text.char_indices();

    loop {
        let Some((index, c)) = chars.next() else {
            // End of line is only valid right after the closing bracket.
            return right_seen.then(|| (state, ""));
        };

        if right_seen {
            if c == '[' {
                state.push('[');
                right_seen = false;
            } else {
                // The bracket closed the field; `c` is the separator.
                let rest = &text[index + c.len_utf8()..];
                return Some((state, rest.trim_start_matches(' ')));
            }
        } else if left_seen {
            if c == ']' {
                state.push(']');
                left_seen = false;
            } else {
                return None;
            }
        } else if c == '[' {
            left_seen = true;
        } else if c == ']' {
            right_seen = true;
        } else {
            state.push(c);
        }
    }
}

// Unescapes the value field, which runs to the end of the line. `None` when
// the quote is unterminated or followed by stray characters.
fn parse_quoted(text: &str) -> Option<String> {
    let mut value = String::new();
    let mut quote_seen = false;

    for c in text.chars() {
        if quote_seen {
            if c == '"' {
                value.push('"');
                quote_seen = false;
            } else {
                return None;
            }
        } else if c == '"' {
            quote_seen = true;
        } else {
            value.push(c);
        }
    }

    quote_seen.then_some(value)
}

pub(crate) fn format_point_value(point_value: &PointValue, out: &mut String) {
    out.push_str(&point_value.point_name);

    if let Some(stamp) = &point_value.stamp {
        out.push(' ');
        out.push_str(stamp);
    }

    if let Some(state) = &point_value.state {
        out.push_str(" [");
        for c in state.as_text().chars() {
            if c == '[' {
                out.push(']');
            } else if c == ']' {
                out.push('[');
            }
            out.push(c);
        }
        out.push(']');
    }

    if let Some(value) = &point_value.value {
        out.push_str(" \"");
        for c in value.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::{format_point_value, parse_point_value};
    use crate::point_value::{PointValue, State};

    fn roundtrip(point_value: &PointValue) -> PointValue {
        let mut line = String::new();
        format_point_value(point_value, &mut line);
        parse_point_value(&line, false).unwrap()
    }

    #[test]
    fn plain_fields() {
        let parsed = parse_point_value("P1 2020-01-01T00:00:00", true).unwrap();
        assert_eq!(parsed.point_name, "P1");
        assert_eq!(parsed.stamp.as_deref(), Some("2020-01-01T00:00:00"));
        assert_eq!(parsed.state, None);
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn optional_stamp_may_be_absent() {
        let parsed = parse_point_value("P1", false).unwrap();
        assert_eq!(parsed.point_name, "P1");
        assert_eq!(parsed.stamp, None);
        assert!(parse_point_value("P1", true).is_err());
    }

    #[test]
    fn state_and_value() {
        let parsed = parse_point_value("P1 2020-01-01 [good] \"7.5\"", true).unwrap();
        assert_eq!(parsed.state, Some(State::Text("good".to_string())));
        assert_eq!(parsed.value.as_deref(), Some("7.5"));
    }

    #[test]
    fn escaped_state_and_value_round_trip() {
        let point_value = PointValue {
            point_name: "P[1]".to_string(),
            stamp: Some("2020-01-01T00:00:00".to_string()),
            state: Some(State::Text("a[b]c".to_string())),
            value: Some("say \"hi\"".to_string()),
        };
        assert_eq!(roundtrip(&point_value), point_value);
    }

    #[test]
    fn dash_marks_deletion_and_drops_the_state() {
        let parsed = parse_point_value("P1 2020-01-01 [gone] -", true).unwrap();
        assert!(parsed.is_deleted());
        assert_eq!(parsed.value, None);

        let parsed = parse_point_value("P1 2020-01-01 -", true).unwrap();
        assert!(parsed.is_deleted());
    }

    #[test]
    fn malformed_state_leaves_remaining_fields_unset() {
        let parsed = parse_point_value("P1 2020-01-01 [open \"v\"", true).unwrap();
        assert_eq!(parsed.state, None);
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn unterminated_value_is_dropped_with_a_warning() {
        let parsed = parse_point_value("P1 2020-01-01 \"unclosed", true).unwrap();
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn stray_characters_after_the_closing_quote_drop_the_value() {
        let parsed = parse_point_value("P1 2020-01-01 \"v\"x", true).unwrap();
        assert_eq!(parsed.value, None);
    }

    #[test]
    fn deleted_state_renders_as_its_wire_spelling() {
        let point_value = PointValue {
            point_name: "P1".to_string(),
            stamp: Some("2020-01-01".to_string()),
            state: Some(State::Deleted),
            value: None,
        };
        let mut line = String::new();
        format_point_value(&point_value, &mut line);
        assert_eq!(line, "P1 2020-01-01 [DELETED]");
    }
}

//! Parsing of the `"KEY=VALUE"` entries handed to
//! [`Store::put_env`](crate::store::Store::put_env).

/// Splits a `"KEY=VALUE"` entry; `None` without an `=`.
pub fn parse_env_entry(entry: &str) -> Option<(&str, &str)> {
    entry.split_once('=')
}

/// Reads a boolean entry value.
///
/// `None` yields the default; an empty value means true; otherwise the usual
/// spellings are accepted case-insensitively, and anything unrecognized is
/// logged and yields the default.
pub fn parse_bool_env_value(value: Option<&str>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    if value.is_empty() {
        return true;
    }

    match value.to_ascii_uppercase().as_str() {
        "1" | "T" | "Y" | "ON" | "YES" | "TRUE" => true,
        "0" | "F" | "N" | "NO" | "OFF" | "FALSE" => false,
        _ => {
            warn!("The boolean value '{value}' is not recognized");
            default
        }
    }
}

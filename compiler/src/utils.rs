use crate::error::BufObjectsError;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> BufObjectsError {
    BufObjectsError::Parse {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Lower-cases the first character and leaves the rest untouched.
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None        => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

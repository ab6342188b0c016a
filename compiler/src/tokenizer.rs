use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::BufObjectsError;

/// A bare identifier or one wrapped in single or double quotes.
const KEY: &str = r#"(?:"([A-Za-z_][A-Za-z0-9_]*)"|'([A-Za-z_][A-Za-z0-9_]*)'|([A-Za-z_][A-Za-z0-9_]*))"#;

lazy_static! {
    pub static ref ENTRY_RX: Regex = Regex::new(&format!(r"^( *){}[ \t]*:(.*)$", KEY)).unwrap();
    pub static ref FLOW_ENTRY_RX: Regex = Regex::new(&format!(r"^\s*{}\s*:(.*)$", KEY)).unwrap();
    pub static ref BLANK_RX: Regex = Regex::new(r"^\s*(#.*)?$").unwrap();
}

const BOM: char = '\u{feff}';

/// One `key: value` line of a schema document.
#[derive(Debug, PartialEq)]
pub struct Token {
    pub indent:  usize,
    pub key:     String,
    pub value:   Option<String>,
    /// Entries of an inline `{ key: value, .. }` mapping.
    pub entries: Option<Vec<Token>>,
    pub line:    usize,
    pub column:  usize,
}

pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, BufObjectsError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut tokens = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if BLANK_RX.is_match(raw) {
            continue;
        }

        let leading = &raw[..raw.len() - raw.trim_start().len()];
        if let Some(pos) = leading.find('\t') {
            return Err(error("Tabs are not allowed in indentation", line, pos + 1));
        }

        let caps = ENTRY_RX.captures(raw).ok_or_else(|| {
            error(
                &format!("Syntax error: {}", quote(raw.trim())),
                line,
                leading.len() + 1,
            )
        })?;

        let indent = caps[1].len();
        let rest = caps.get(5).map_or("", |m| m.as_str());
        let value_column = caps.get(5).map_or(raw.len(), |m| m.start()) + 1;

        let trimmed = rest.trim_start();
        let offset = value_column + rest.len() - trimmed.len();
        let (value, entries) = if trimmed.starts_with('{') {
            (None, Some(parse_flow(trimmed, indent, line, offset)?))
        } else {
            (parse_value(rest, line, value_column)?, None)
        };

        tokens.push(Token {
            indent,
            key: captured_key(&caps, 2),
            value,
            entries,
            line,
            column: indent + 1,
        });
    }

    Ok(tokens)
}

/// The key out of whichever of the three `KEY` alternatives matched.
fn captured_key(caps: &regex::Captures, first: usize) -> String {
    (first..first + 3)
        .find_map(|i| caps.get(i))
        .map_or_else(String::new, |m| m.as_str().to_string())
}

fn parse_value(rest: &str, line: usize, column: usize) -> Result<Option<String>, BufObjectsError> {
    let trimmed = rest.trim_start();
    let offset = column + rest.len() - trimmed.len();

    let (value, tail) = match trimmed.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let body = &trimmed[1..];
            let end = body
                .find(q)
                .ok_or_else(|| error("Unterminated quoted value", line, offset))?;
            (&body[..end], &body[end + 1..])
        }
        _ => {
            let end = trimmed.find('#').unwrap_or(trimmed.len());
            (trimmed[..end].trim_end(), "")
        }
    };

    let tail = tail.trim();
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(error(
            &format!("Unexpected text after value: {}", quote(tail)),
            line,
            offset,
        ));
    }

    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value.to_string()))
    }
}

/// Splits `{a: int32, b: "[]B"}` into one token per entry. `text` starts at
/// the opening brace, found at `column`.
fn parse_flow(text: &str, indent: usize, line: usize, column: usize) -> Result<Vec<Token>, BufObjectsError> {
    let mut quote_char = None;
    let mut item_start = 1;
    let mut items: Vec<(usize, &str)> = Vec::new();
    let mut close = None;

    for (pos, c) in text.char_indices().skip(1) {
        match (quote_char, c) {
            (Some(q), c) if c == q => quote_char = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote_char = Some(c),
            (None, ',') => {
                items.push((item_start, &text[item_start..pos]));
                item_start = pos + 1;
            }
            (None, '{') => return Err(error("Nested mappings are not supported", line, column + pos)),
            (None, '}') => {
                items.push((item_start, &text[item_start..pos]));
                close = Some(pos);
                break;
            }
            (None, _) => {}
        }
    }

    let close = close.ok_or_else(|| error("Unterminated inline mapping", line, column))?;
    let tail = text[close + 1..].trim();
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(error(
            &format!("Unexpected text after mapping: {}", quote(tail)),
            line,
            column + close + 1,
        ));
    }

    let mut entries = Vec::new();
    for (start, item) in items {
        if item.trim().is_empty() {
            continue;
        }
        let item_column = column + start + (item.len() - item.trim_start().len());
        let caps = FLOW_ENTRY_RX
            .captures(item)
            .ok_or_else(|| error(&format!("Syntax error: {}", quote(item.trim())), line, item_column))?;
        let rest = caps.get(4).map_or("", |m| m.as_str());
        let value_column = column + start + caps.get(4).map_or(item.len(), |m| m.start());
        entries.push(Token {
            indent,
            key: captured_key(&caps, 1),
            value: parse_value(rest, line, value_column)?,
            entries: None,
            line,
            column: item_column,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        let input = "Point:\n  x: int32\n  y: int32\n";
        let expected = vec![
            Token { indent: 0, key: "Point".into(), value: None,                  entries: None, line: 1, column: 1 },
            Token { indent: 2, key: "x".into(),     value: Some("int32".into()), entries: None, line: 2, column: 3 },
            Token { indent: 2, key: "y".into(),     value: Some("int32".into()), entries: None, line: 3, column: 3 },
        ];
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_tokenize_quotes_and_comments() {
        let input = "# leading comment\nPath:   # trailing\n  points: \"[]Point\" # seq\n  size: '[4]uint8'\n  id: uint16#note\n";
        let got = tokenize_schema(input).unwrap();
        assert_eq!(got.len(), 4);
        assert_eq!(got[0].value, None);
        assert_eq!(got[0].line, 2);
        assert_eq!(got[1].value.as_deref(), Some("[]Point"));
        assert_eq!(got[2].value.as_deref(), Some("[4]uint8"));
        assert_eq!(got[3].value.as_deref(), Some("uint16"));
    }

    #[test]
    fn test_tokenize_bare_brackets() {
        let got = tokenize_schema("Grid:\n  cells: [9]int8\n").unwrap();
        assert_eq!(got[1].value.as_deref(), Some("[9]int8"));
    }

    #[test]
    fn test_tokenize_unexpected_text() {
        let err = tokenize_schema("Point:\n  x int32\n").unwrap_err();
        assert!(
            matches!(err, BufObjectsError::Parse { line: 2, .. }),
            "expected a ParseError but got {:?}",
            err
        );
    }

    #[test]
    fn test_tokenize_rejects_tabs() {
        let err = tokenize_schema("Point:\n\tx: int32\n").unwrap_err();
        assert!(matches!(err, BufObjectsError::Parse { line: 2, column: 1, .. }));
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        let err = tokenize_schema("Point:\n  x: \"int32\n").unwrap_err();
        assert!(matches!(err, BufObjectsError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_tokenize_skips_bom() {
        let got = tokenize_schema("\u{feff}Point:\n  x: int32\n").unwrap();
        assert_eq!(got[0].key, "Point");
        assert_eq!(got[0].column, 1);
    }

    #[test]
    fn test_tokenize_quoted_keys() {
        let got = tokenize_schema("\"Point\":\n  'x': int32\n").unwrap();
        assert_eq!(got[0].key, "Point");
        assert_eq!(got[1].key, "x");
        assert_eq!(got[1].value.as_deref(), Some("int32"));
    }

    #[test]
    fn test_tokenize_rejects_quoted_non_identifier_key() {
        let err = tokenize_schema("\"Po int\":\n").unwrap_err();
        assert!(matches!(err, BufObjectsError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_tokenize_flow_mapping() {
        let got = tokenize_schema("Path: {points: \"[]Point\", 'n': uint8, id: 3} # inline\n").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, None);
        let entries = got[0].entries.as_ref().unwrap();
        let pairs: Vec<_> = entries
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_deref()))
            .collect();
        assert_eq!(pairs, [("points", Some("[]Point")), ("n", Some("uint8")), ("id", Some("3"))]);
        assert_eq!(entries[0].column, 8);
    }

    #[test]
    fn test_tokenize_empty_flow_mapping() {
        let got = tokenize_schema("Ping: {}\n").unwrap();
        assert_eq!(got[0].entries.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_tokenize_flow_mapping_errors() {
        for input in ["A: {x: int32\n", "A: {x: {y: int32}}\n", "A: {x: int32} y\n", "A: {x int32}\n"] {
            let err = tokenize_schema(input).unwrap_err();
            assert!(matches!(err, BufObjectsError::Parse { line: 1, .. }), "{input}: {err:?}");
        }
    }
}

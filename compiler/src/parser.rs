use std::collections::HashSet;

use crate::{
    tokenizer::{tokenize_schema, Token},
    utils::{error, quote},
    error::BufObjectsError,
};

/// One parsed schema source.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub origin:  String,
    pub records: Vec<RecordDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub body:   RecordBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    /// Declared entries in order, including a possible `_id`.
    Fields(Vec<FieldDecl>),
    /// Shorthand record with no field map.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name:   String,
    pub value:  String,
    pub line:   usize,
    pub column: usize,
}

const EMPTY_MARKERS: [&str; 2] = ["~", "null"];

pub fn parse_document(origin: &str, text: &str) -> Result<SchemaDocument, BufObjectsError> {
    let records = tokenize_schema(text)
        .and_then(|tokens| parse_schema(&tokens))
        .map_err(|e| match e {
            BufObjectsError::Parse { msg, line, column } => BufObjectsError::Parse {
                msg: format!("{}: {}", origin, msg),
                line,
                column,
            },
            other => other,
        })?;
    Ok(SchemaDocument {
        origin: origin.to_string(),
        records,
    })
}

pub fn parse_schema(tokens: &[Token]) -> Result<Vec<RecordDecl>, BufObjectsError> {
    let mut records = Vec::new();
    let mut index = 0;

    while index < tokens.len() {
        let head = &tokens[index];
        index += 1;

        if head.indent != 0 {
            return Err(error(
                &format!("Expected a record name but found field {}", quote(&head.key)),
                head.line,
                head.column,
            ));
        }

        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        let inline = match (head.value.as_deref(), &head.entries) {
            (_, Some(entries)) => {
                for tok in entries {
                    push_field(&mut fields, &mut seen, tok)?;
                }
                true
            }
            (None, None) => false,
            (Some(v), None) if EMPTY_MARKERS.contains(&v) => true,
            (Some(v), None) => {
                return Err(error(
                    &format!("Expected a field map for {} but found {}", quote(&head.key), quote(v)),
                    head.line,
                    head.column,
                ));
            }
        };

        // Indented lines following the record name are its fields.
        let mut field_indent = None;
        while index < tokens.len() && tokens[index].indent > 0 {
            let tok = &tokens[index];
            index += 1;

            let expected = *field_indent.get_or_insert(tok.indent);
            if tok.indent != expected {
                return Err(error(
                    &format!("Unexpected indentation for {}, nested maps are not supported", quote(&tok.key)),
                    tok.line,
                    tok.column,
                ));
            }
            if inline {
                return Err(error(
                    &format!("Record {} is declared inline but has indented fields", quote(&head.key)),
                    tok.line,
                    tok.column,
                ));
            }
            push_field(&mut fields, &mut seen, tok)?;
        }

        let body = if fields.is_empty() {
            RecordBody::Empty
        } else {
            RecordBody::Fields(fields)
        };

        records.push(RecordDecl {
            name:   head.key.clone(),
            line:   head.line,
            column: head.column,
            body,
        });
    }

    Ok(records)
}

fn push_field(
    fields: &mut Vec<FieldDecl>,
    seen: &mut HashSet<String>,
    tok: &Token,
) -> Result<(), BufObjectsError> {
    let value = match (&tok.value, &tok.entries) {
        (_, Some(_)) => {
            return Err(error(
                &format!("Field {} holds a mapping, nested maps are not supported", quote(&tok.key)),
                tok.line,
                tok.column,
            ));
        }
        (Some(v), None) => v.clone(),
        (None, None) => {
            return Err(error(
                &format!("Expected a type for field {}", quote(&tok.key)),
                tok.line,
                tok.column,
            ));
        }
    };
    if !seen.insert(tok.key.clone()) {
        return Err(error(
            &format!("The field {} is declared twice", quote(&tok.key)),
            tok.line,
            tok.column,
        ));
    }
    fields.push(FieldDecl {
        name:   tok.key.clone(),
        value,
        line:   tok.line,
        column: tok.column,
    });
    Ok(())
}

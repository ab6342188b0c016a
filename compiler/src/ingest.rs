use std::collections::HashSet;

use tracing::debug;

use crate::{
    allocator::{AllocError, IdAllocator, UNSET_ID},
    classifier::classify,
    error::BufObjectsError,
    parser::{FieldDecl, RecordBody, SchemaDocument},
    types::{CompiledDocument, Field, Record, SourceSpan},
};

/// Field key that carries a record's explicit id instead of declaring a field.
pub const ID_KEY: &str = "_id";

/// Turns one parsed source into records and appends them to `doc`.
///
/// Nothing is appended unless every record of the source is valid. Ids are
/// reserved or allocated through `ids`, which is shared by every source of
/// the run so uniqueness holds across files.
pub fn ingest(
    source: &SchemaDocument,
    ids: &mut IdAllocator,
    doc: &mut CompiledDocument,
) -> Result<usize, BufObjectsError> {
    let mut known: HashSet<&str> = doc.records.iter().map(|r| r.raw_name.as_str()).collect();
    let mut records = Vec::with_capacity(source.records.len());

    for decl in &source.records {
        let at = location(&source.origin, decl.line, decl.column);
        if !known.insert(decl.name.as_str()) {
            return Err(BufObjectsError::DuplicateRecord {
                at,
                name: decl.name.clone(),
            });
        }

        let mut explicit_id = None;
        let mut fields = Vec::new();
        if let RecordBody::Fields(decls) = &decl.body {
            for field in decls {
                if field.name == ID_KEY {
                    explicit_id = Some((parse_id(&source.origin, &decl.name, field)?, field));
                    continue;
                }
                fields.push(build_field(&source.origin, &decl.name, field)?);
            }
        }

        // An explicit 0 is the "unset" sentinel and asks for allocation.
        let id = match explicit_id {
            Some((id, field)) if id != UNSET_ID => {
                ids.reserve(id).map_err(|e| {
                    alloc_error(e, &decl.name, location(&source.origin, field.line, field.column))
                })?;
                id
            }
            _ => ids.allocate_next().map_err(|e| alloc_error(e, &decl.name, at))?,
        };
        debug!(record = %decl.name, id, explicit = explicit_id.is_some(), "ingested record");

        records.push(Record {
            id,
            name:             format!("{}{}", decl.name, doc.config.name_suffix),
            raw_name:         decl.name.clone(),
            fields,
            is_variable_size: false,
            fixed_size:       None,
        });
    }

    let start = doc.records.len();
    let count = records.len();
    doc.records.extend(records);
    doc.sources.push(SourceSpan {
        origin:  source.origin.clone(),
        records: start..start + count,
    });
    Ok(count)
}

fn location(origin: &str, line: usize, column: usize) -> String {
    format!("{}:{}:{}", origin, line, column)
}

fn build_field(origin: &str, record: &str, decl: &FieldDecl) -> Result<Field, BufObjectsError> {
    let ty = classify(&decl.value).map_err(|source| BufObjectsError::InvalidTypeToken {
        at:     location(origin, decl.line, decl.column),
        record: record.to_string(),
        field:  decl.name.clone(),
        token:  decl.value.clone(),
        source,
    })?;
    Ok(Field {
        name:       decl.name.clone(),
        type_token: decl.value.clone(),
        ty,
    })
}

/// Parses an `_id` value as an unsigned 16-bit decimal. Signs are rejected.
fn parse_id(origin: &str, record: &str, decl: &FieldDecl) -> Result<u16, BufObjectsError> {
    let invalid = |reason: String| BufObjectsError::InvalidIdentifier {
        at:     location(origin, decl.line, decl.column),
        record: record.to_string(),
        value:  decl.value.clone(),
        reason,
    };
    if decl.value.starts_with('+') {
        return Err(invalid("a sign is not allowed".to_string()));
    }
    decl.value.parse::<u16>().map_err(|e| invalid(e.to_string()))
}

fn alloc_error(err: AllocError, record: &str, at: String) -> BufObjectsError {
    match err {
        AllocError::Duplicate(id) => BufObjectsError::DuplicateIdentifier {
            at,
            id,
            record: record.to_string(),
        },
        AllocError::Exhausted => BufObjectsError::IdentifierSpaceExhausted {
            at,
            record: record.to_string(),
        },
    }
}

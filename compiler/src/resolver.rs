use std::collections::HashMap;

use crate::{
    error::BufObjectsError,
    types::{ElementType, FieldShape, Record},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Determines for every record whether its encoded length is fixed, and how
/// long it is when it is.
///
/// Must run over the complete record set since object fields may name
/// records declared in other sources. Records embedding each other by value
/// (directly or through a fixed array) are rejected; dynamic sequences of
/// records are not embedded by value and may refer back to their owner.
pub fn resolve(records: &mut [Record]) -> Result<(), BufObjectsError> {
    let targets = resolve_targets(records)?;
    let mut marks = vec![Mark::Unvisited; records.len()];
    let mut sizes: Vec<Option<usize>> = vec![None; records.len()];

    for root in 0..records.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        // (record, next field to look at)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::Visiting;

        while let Some(top) = stack.last_mut() {
            let (current, next) = *top;
            let fields = &records[current].fields;

            if next < fields.len() {
                top.1 += 1;
                let embedded = matches!(
                    fields[next].shape(),
                    FieldShape::ObjectReference | FieldShape::ObjectFixedArray
                );
                let target = match targets[current][next] {
                    Some(target) if embedded => target,
                    _ => continue,
                };
                match marks[target] {
                    Mark::Done => {}
                    Mark::Unvisited => {
                        marks[target] = Mark::Visiting;
                        stack.push((target, 0));
                    }
                    Mark::Visiting => {
                        let start = stack.iter().position(|&(r, _)| r == target).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..]
                            .iter()
                            .map(|&(r, _)| records[r].raw_name.clone())
                            .collect();
                        cycle.push(records[target].raw_name.clone());
                        return Err(BufObjectsError::CyclicReference { cycle });
                    }
                }
            } else {
                let size = fixed_size(&records[current], &targets[current], &sizes)?;
                sizes[current] = size;
                marks[current] = Mark::Done;
                stack.pop();
            }
        }
    }

    for (record, size) in records.iter_mut().zip(sizes) {
        record.fixed_size = size;
        record.is_variable_size = size.is_none();
    }
    Ok(())
}

/// Maps every object field to the index of the record it names.
fn resolve_targets(records: &[Record]) -> Result<Vec<Vec<Option<usize>>>, BufObjectsError> {
    let by_name: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.raw_name.as_str(), i))
        .collect();

    records
        .iter()
        .map(|record| {
            record
                .fields
                .iter()
                .map(|field| match &field.ty.element {
                    ElementType::Scalar(_) => Ok(None),
                    ElementType::Object(target) => match by_name.get(target.as_str()) {
                        Some(&index) => Ok(Some(index)),
                        None => Err(BufObjectsError::UnresolvedReference {
                            record: record.raw_name.clone(),
                            field:  field.name.clone(),
                            target: target.clone(),
                        }),
                    },
                })
                .collect()
        })
        .collect()
}

/// Encoded width of `record`, `None` when it depends on the data. Every
/// embedded target must already be resolved in `sizes`.
fn fixed_size(
    record: &Record,
    targets: &[Option<usize>],
    sizes: &[Option<usize>],
) -> Result<Option<usize>, BufObjectsError> {
    let mut total: usize = 0;

    for (field, target) in record.fields.iter().zip(targets) {
        let element = match (&field.ty.element, target) {
            (ElementType::Scalar(t), _) => t.width(),
            (ElementType::Object(_), Some(index)) => sizes[*index],
            (ElementType::Object(_), None) => None,
        };
        let width = match field.shape() {
            FieldShape::Scalar | FieldShape::ObjectReference => element,
            FieldShape::FixedArray | FieldShape::ObjectFixedArray => {
                let length = field.array_length().unwrap_or(0) as usize;
                match element {
                    Some(w) => Some(w.checked_mul(length).ok_or_else(|| overflow(record))?),
                    None => None,
                }
            }
            FieldShape::DynamicSequence | FieldShape::ObjectDynamicSequence => None,
        };
        match width {
            Some(w) => total = total.checked_add(w).ok_or_else(|| overflow(record))?,
            None => return Ok(None),
        }
    }

    Ok(Some(total))
}

fn overflow(record: &Record) -> BufObjectsError {
    BufObjectsError::Config(format!("the encoded size of \"{}\" overflows", record.raw_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocator::IdAllocator,
        ingest::ingest,
        parser::parse_document,
        types::CompiledDocument,
    };

    fn resolved(sources: &[&str]) -> Result<CompiledDocument, BufObjectsError> {
        let mut ids = IdAllocator::new();
        let mut doc = CompiledDocument::default();
        for (i, text) in sources.iter().enumerate() {
            let source = parse_document(&format!("{}.yml", i), text)?;
            ingest(&source, &mut ids, &mut doc)?;
        }
        resolve(&mut doc.records)?;
        Ok(doc)
    }

    fn record<'a>(doc: &'a CompiledDocument, name: &str) -> &'a Record {
        doc.record_by_raw_name(name).unwrap()
    }

    #[test]
    fn test_empty_record_is_fixed() {
        let doc = resolved(&["Ping:\n"]).unwrap();
        assert!(!record(&doc, "Ping").is_variable_size);
        assert_eq!(record(&doc, "Ping").fixed_size, Some(0));
    }

    #[test]
    fn test_string_makes_record_variable() {
        let doc = resolved(&["Name:\n  value: string\n"]).unwrap();
        assert!(record(&doc, "Name").is_variable_size);
        assert_eq!(record(&doc, "Name").fixed_size, None);
    }

    #[test]
    fn test_sequences_make_record_variable() {
        let doc = resolved(&["Bytes:\n  data: \"[]byte\"\n"]).unwrap();
        assert!(record(&doc, "Bytes").is_variable_size);
    }

    #[test]
    fn test_variability_propagates_through_references() {
        let doc = resolved(&[
            "Holder:\n  inner: Label\nHolders:\n  all: \"[2]Label\"\n",
            "Label:\n  text: string\n",
        ])
        .unwrap();
        assert!(record(&doc, "Holder").is_variable_size);
        assert!(record(&doc, "Holders").is_variable_size);
    }

    #[test]
    fn test_fixed_sizes_add_up() {
        let doc = resolved(&[
            "Point:\n  x: int32\n  y: int32\n",
            "Box:\n  corners: \"[2]Point\"\n  color: \"[4]uint8\"\n  flag: bool\n  origin: Point\n",
        ])
        .unwrap();
        assert_eq!(record(&doc, "Point").fixed_size, Some(8));
        assert!(!record(&doc, "Box").is_variable_size);
        assert_eq!(record(&doc, "Box").fixed_size, Some(16 + 4 + 1 + 8));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = resolved(&["A:\n  b: B\nB:\n  a: A\n"]).unwrap_err();
        match err {
            BufObjectsError::CyclicReference { cycle } => assert_eq!(cycle, ["A", "B", "A"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_by_fixed_array_is_rejected() {
        let err = resolved(&["Node:\n  children: \"[2]Node\"\n"]).unwrap_err();
        assert!(matches!(err, BufObjectsError::CyclicReference { ref cycle } if cycle == &["Node", "Node"]));
    }

    #[test]
    fn test_self_reference_by_sequence_is_allowed() {
        let doc = resolved(&["Tree:\n  value: int32\n  children: \"[]Tree\"\n"]).unwrap();
        assert!(record(&doc, "Tree").is_variable_size);
    }

    #[test]
    fn test_unresolved_reference_names_field() {
        let err = resolved(&["A:\n  items: \"[]Missing\"\n"]).unwrap_err();
        match err {
            BufObjectsError::UnresolvedReference { record, field, target } => {
                assert_eq!(record, "A");
                assert_eq!(field, "items");
                assert_eq!(target, "Missing");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut text = String::new();
        for i in 0..5000 {
            text.push_str(&format!("R{}:\n  next: R{}\n", i, i + 1));
        }
        text.push_str("R5000:\n  v: uint8\n");
        let doc = resolved(&[&text]).unwrap();
        assert_eq!(record(&doc, "R0").fixed_size, Some(1));
    }
}

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::TypeTokenError,
    types::{ElementType, FieldShape, FieldType, ScalarType},
};

lazy_static! {
    static ref CONTAINER:  Regex = Regex::new(r"^\[([^\]]*)\](.*)$").unwrap();
    static ref LENGTH:     Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

enum Container {
    Single,
    Fixed(u32),
    Dynamic,
}

/// Classifies a declared type token into its shape, element type and array length.
///
/// `[N]T` is a fixed array of `N` elements, `[]T` a dynamic sequence, and a
/// base type starting with an upper-case letter names another record.
pub fn classify(type_token: &str) -> Result<FieldType, TypeTokenError> {
    let (container, element) = match CONTAINER.captures(type_token) {
        Some(caps) => {
            let length = caps.get(1).map_or("", |m| m.as_str());
            let element = caps.get(2).map_or("", |m| m.as_str());
            let container = if length.is_empty() {
                Container::Dynamic
            } else {
                Container::Fixed(parse_length(length)?)
            };
            (container, element)
        }
        None if type_token.starts_with('[') => {
            return Err(TypeTokenError::InvalidArrayLength(type_token.to_string()));
        }
        None => (Container::Single, type_token),
    };

    let element = classify_element(element)?;
    let is_object = matches!(element, ElementType::Object(_));

    let (shape, array_length) = match (container, is_object) {
        (Container::Single, false)    => (FieldShape::Scalar, None),
        (Container::Single, true)     => (FieldShape::ObjectReference, None),
        (Container::Fixed(n), false)  => (FieldShape::FixedArray, Some(n)),
        (Container::Fixed(n), true)   => (FieldShape::ObjectFixedArray, Some(n)),
        (Container::Dynamic, false)   => (FieldShape::DynamicSequence, None),
        (Container::Dynamic, true)    => (FieldShape::ObjectDynamicSequence, None),
    };

    Ok(FieldType {
        shape,
        element,
        array_length,
    })
}

fn parse_length(text: &str) -> Result<u32, TypeTokenError> {
    if !LENGTH.is_match(text) {
        return Err(TypeTokenError::InvalidArrayLength(text.to_string()));
    }
    match text.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(TypeTokenError::InvalidArrayLength(text.to_string())),
    }
}

fn classify_element(element: &str) -> Result<ElementType, TypeTokenError> {
    let first = match element.chars().next() {
        Some(c) => c,
        None => return Err(TypeTokenError::MissingElementType),
    };
    if first == '[' {
        return Err(TypeTokenError::NestedContainer);
    }
    if first.is_uppercase() {
        if !IDENTIFIER.is_match(element) {
            return Err(TypeTokenError::UnknownScalar(element.to_string()));
        }
        return Ok(ElementType::Object(element.to_string()));
    }
    ScalarType::from_keyword(element)
        .map(ElementType::Scalar)
        .ok_or_else(|| TypeTokenError::UnknownScalar(element.to_string()))
}

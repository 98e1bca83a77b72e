//! JSON pointer evaluation for result references
//!
//! RFC 6901 traversal plus the `*` segment, which maps the rest of the pointer
//! over every element of an array and flattens array results into the output.

use serde_json::Value;
use thiserror::Error;

use crate::model::fields::child_path;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("pointer '{0}' must be empty or start with '/'")]
    Syntax(String),
    #[error("invalid escape sequence in pointer segment '{0}'")]
    Escape(String),
    #[error("nothing found at '{0}'")]
    NotFound(String),
}

pub fn evaluate(root: &Value, pointer: &str) -> Result<Value, PointerError> {
    if pointer.is_empty() {
        return Ok(root.clone());
    }

    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PointerError::Syntax(pointer.to_string()));
    };

    let tokens = rest
        .split('/')
        .map(unescape)
        .collect::<Result<Vec<_>, _>>()?;

    walk(root, &tokens, "")
}

fn unescape(segment: &str) -> Result<String, PointerError> {
    let mut output = String::with_capacity(segment.len());
    let mut characters = segment.chars();
    while let Some(character) = characters.next() {
        if character != '~' {
            output.push(character);
            continue;
        }
        match characters.next() {
            Some('0') => output.push('~'),
            Some('1') => output.push('/'),
            _ => return Err(PointerError::Escape(segment.to_string())),
        }
    }
    Ok(output)
}

fn walk(value: &Value, tokens: &[String], location: &str) -> Result<Value, PointerError> {
    let Some((token, rest)) = tokens.split_first() else {
        return Ok(value.clone());
    };
    let here = child_path(location, token);

    match value {
        Value::Object(map) => {
            let next = map.get(token).ok_or(PointerError::NotFound(here.clone()))?;
            walk(next, rest, &here)
        }
        Value::Array(items) if token == WILDCARD => {
            let mut collected = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match walk(item, rest, &child_path(location, &index.to_string()))? {
                    Value::Array(inner) => collected.extend(inner),
                    other => collected.push(other),
                }
            }
            Ok(Value::Array(collected))
        }
        Value::Array(items) => {
            let next = parse_index(token)
                .and_then(|index| items.get(index))
                .ok_or(PointerError::NotFound(here.clone()))?;
            walk(next, rest, &here)
        }
        _ => Err(PointerError::NotFound(here)),
    }
}

/// Array indices are decimal without leading zeros.
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

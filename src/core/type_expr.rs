//! core::type_expr
//!
//! Type expressions as written in `@var` and `@param` tags.
//!
//! # Grammar
//!
//! ```text
//! expr     := nullable | union | generic | list | name
//! nullable := '?' expr
//! union    := expr '|' expr          (only `T|null` keeps T, else `mixed`)
//! generic  := name '<' name '>'      (collection types only)
//! list     := name '[]'              (sugar for array<name>)
//! name     := ['::'] segment ('::' segment)*
//! ```
//!
//! Scalar aliases are normalized: `int` becomes `integer`, `bool` becomes
//! `boolean`, `double` becomes `float`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{TypeName, NAMESPACE_SEPARATOR};

/// The catch-all type used when nothing better is known.
pub const MIXED: &str = "mixed";

/// Built-in scalar type names, including aliases.
pub const LITERAL_TYPES: &[&str] = &[
    "integer", "int", "float", "double", "boolean", "bool", "string",
];

/// Types that may carry an element type.
pub const COLLECTION_TYPES: &[&str] = &[
    "array",
    "iterable",
    "ArrayObject",
    "SplObjectStorage",
    "Collections::Collection",
    "Collections::ArrayCollection",
];

/// Errors from type-expression parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocTypeError {
    #[error("type expression is empty")]
    Empty,

    #[error("malformed type expression '{0}'")]
    Malformed(String),

    #[error("type '{type_name}' cannot have element type '{element_type}'")]
    ElementTypeOnNonCollection {
        type_name: String,
        element_type: String,
    },
}

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedType {
    /// Normalized outer type.
    pub type_name: String,
    /// Element type for collections.
    pub element_type: Option<String>,
    /// Whether `null` is an accepted value.
    pub nullable: bool,
}

/// Whether `name` is a built-in scalar type.
pub fn is_literal_type(name: &str) -> bool {
    LITERAL_TYPES.contains(&name)
}

/// Whether `name` is a scalar or the `array` type.
pub fn is_simple_type(name: &str) -> bool {
    is_literal_type(name) || name == "array"
}

/// Whether `name` is a collection type.
pub fn is_collection_type(name: &str) -> bool {
    let name = name.strip_prefix(NAMESPACE_SEPARATOR).unwrap_or(name);
    COLLECTION_TYPES.contains(&name)
}

/// Normalize scalar aliases and strip a leading separator.
///
/// ```
/// use classlens::core::type_expr::normalize;
///
/// assert_eq!(normalize("int"), "integer");
/// assert_eq!(normalize("::Acme::Order"), "Acme::Order");
/// assert_eq!(normalize("Acme::Order"), "Acme::Order");
/// ```
pub fn normalize(name: &str) -> String {
    match name {
        "int" => "integer".to_string(),
        "bool" => "boolean".to_string(),
        "double" => "float".to_string(),
        other => other
            .strip_prefix(NAMESPACE_SEPARATOR)
            .unwrap_or(other)
            .to_string(),
    }
}

/// Split a union at top-level `|`, ignoring bars inside `<...>`.
///
/// ```
/// use classlens::core::type_expr::split_union;
///
/// assert_eq!(split_union("array<A|B>|null"), vec!["array<A|B>", "null"]);
/// assert_eq!(split_union("int"), vec!["int"]);
/// ```
pub fn split_union(expr: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                members.push(expr[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    members.push(expr[start..].trim());
    members
}

/// Remove nullable markers, returning the inner expression.
///
/// Handles `?T`, `T|null` and `null|T`. Any other union is returned
/// unchanged with `nullable` reflecting whether `null` was a member.
pub fn strip_nullable(expr: &str) -> (String, bool) {
    let expr = expr.trim();
    if let Some(inner) = expr.strip_prefix('?') {
        return (inner.trim().to_string(), true);
    }

    let members = split_union(expr);
    if members.len() == 1 {
        return (expr.to_string(), false);
    }

    let nullable = members.iter().any(|m| m.eq_ignore_ascii_case("null"));
    let rest: Vec<&str> = members
        .into_iter()
        .filter(|m| !m.eq_ignore_ascii_case("null"))
        .collect();
    (rest.join("|"), nullable)
}

/// Rewrite list sugar `T[]` to `array<T>`.
pub fn expand_list_suffix(expr: &str) -> String {
    match expr.strip_suffix("[]") {
        Some(inner) if !inner.is_empty() => format!("array<{inner}>"),
        _ => expr.to_string(),
    }
}

/// Split `Outer<Inner>` into its parts.
pub fn split_generic(expr: &str) -> Option<(&str, &str)> {
    let open = expr.find('<')?;
    let inner = expr[open + 1..].strip_suffix('>')?;
    Some((&expr[..open], inner))
}

/// Parse a type expression into its normalized parts.
///
/// ```
/// use classlens::core::type_expr::parse_type;
///
/// let parsed = parse_type("?int").unwrap();
/// assert_eq!(parsed.type_name, "integer");
/// assert!(parsed.nullable);
///
/// let parsed = parse_type("Acme::Item[]").unwrap();
/// assert_eq!(parsed.type_name, "array");
/// assert_eq!(parsed.element_type.as_deref(), Some("Acme::Item"));
///
/// assert!(parse_type("string<int>").is_err());
/// ```
pub fn parse_type(expr: &str) -> Result<ParsedType, DocTypeError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(DocTypeError::Empty);
    }

    let (inner, nullable) = strip_nullable(expr);
    if split_union(&inner).len() > 1 {
        return Ok(ParsedType {
            type_name: MIXED.to_string(),
            element_type: None,
            nullable,
        });
    }

    let inner = expand_list_suffix(&inner);
    let (outer, element) = match split_generic(&inner) {
        Some((outer, element)) => (outer, Some(element)),
        None => (inner.as_str(), None),
    };

    let type_name = parse_name(outer, expr)?;
    let element_type = match element {
        Some(element) => {
            let element_type = parse_name(element, expr)?;
            if !is_collection_type(&type_name) {
                return Err(DocTypeError::ElementTypeOnNonCollection {
                    type_name,
                    element_type,
                });
            }
            Some(element_type)
        }
        None => None,
    };

    Ok(ParsedType {
        type_name,
        element_type,
        nullable,
    })
}

fn parse_name(name: &str, expr: &str) -> Result<String, DocTypeError> {
    let name = name.trim();
    if name == MIXED || is_literal_type(name) || is_collection_type(name) {
        return Ok(normalize(name));
    }
    TypeName::new(name)
        .map(String::from)
        .map_err(|_| DocTypeError::Malformed(expr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod classification {
        use super::*;

        #[test]
        fn literals() {
            assert!(is_literal_type("int"));
            assert!(is_literal_type("string"));
            assert!(!is_literal_type("array"));
            assert!(!is_literal_type("Acme::Order"));
        }

        #[test]
        fn simple_includes_array() {
            assert!(is_simple_type("array"));
            assert!(is_simple_type("bool"));
            assert!(!is_simple_type("mixed"));
        }

        #[test]
        fn collections() {
            assert!(is_collection_type("array"));
            assert!(is_collection_type("::Collections::Collection"));
            assert!(!is_collection_type("string"));
        }
    }

    mod nullable {
        use super::*;

        #[test]
        fn question_mark() {
            assert_eq!(strip_nullable("?string"), ("string".to_string(), true));
        }

        #[test]
        fn pipe_null_either_side() {
            assert_eq!(strip_nullable("string|null"), ("string".to_string(), true));
            assert_eq!(strip_nullable("NULL|int"), ("int".to_string(), true));
        }

        #[test]
        fn plain() {
            assert_eq!(strip_nullable("int"), ("int".to_string(), false));
        }

        #[test]
        fn generic_with_null_suffix() {
            assert_eq!(
                strip_nullable("array<Acme::Item>|null"),
                ("array<Acme::Item>".to_string(), true)
            );
        }
    }

    mod parse {
        use super::*;

        #[test]
        fn scalar_normalized() {
            let parsed = parse_type("bool").unwrap();
            assert_eq!(parsed.type_name, "boolean");
            assert_eq!(parsed.element_type, None);
            assert!(!parsed.nullable);
        }

        #[test]
        fn class_name() {
            let parsed = parse_type("::Acme::Order").unwrap();
            assert_eq!(parsed.type_name, "Acme::Order");
        }

        #[test]
        fn generic_collection() {
            let parsed = parse_type("array<int>").unwrap();
            assert_eq!(parsed.type_name, "array");
            assert_eq!(parsed.element_type.as_deref(), Some("integer"));
        }

        #[test]
        fn list_sugar() {
            let parsed = parse_type("string[]").unwrap();
            assert_eq!(parsed.type_name, "array");
            assert_eq!(parsed.element_type.as_deref(), Some("string"));
        }

        #[test]
        fn union_degrades_to_mixed() {
            let parsed = parse_type("int|string").unwrap();
            assert_eq!(parsed.type_name, "mixed");

            let parsed = parse_type("int|string|null").unwrap();
            assert_eq!(parsed.type_name, "mixed");
            assert!(parsed.nullable);
        }

        #[test]
        fn element_on_scalar_rejected() {
            let err = parse_type("integer<string>").unwrap_err();
            assert!(matches!(err, DocTypeError::ElementTypeOnNonCollection { .. }));
        }

        #[test]
        fn malformed_rejected() {
            assert_eq!(parse_type("  "), Err(DocTypeError::Empty));
            assert!(matches!(
                parse_type("Acme::::Order"),
                Err(DocTypeError::Malformed(_))
            ));
            assert!(matches!(
                parse_type("array<int"),
                Err(DocTypeError::Malformed(_))
            ));
        }
    }
}

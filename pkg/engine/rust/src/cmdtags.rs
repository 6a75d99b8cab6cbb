// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Tag-driven projection of configuration values into command-line arguments
//! and environment variable assignments.
//!
//! A configuration type implements [`CmdTags`] by listing its fields in
//! declaration order. Each field carries the annotations it is known by
//! (short flag, long flag, environment variable) and a [`Value`] describing
//! its shape. [`parse_cmd_tags`] walks the fields, emits tagged ones through a
//! [`Joiner`] and recurses into untagged nested configuration.
//!
//! Annotation strings follow `name[,option...]`. Supported options:
//! - `nonzero`: skip integers (and slice lengths) equal to zero.
//! - `invertBool`: negate a boolean before rendering it.
//! - `intBool`: render a boolean as `1`/`0` instead of a bare flag.

use crate::errors::EncodeError;
use std::collections::HashSet;

pub const OPT_NON_ZERO: &str = "nonzero";
pub const OPT_INVERT_BOOL: &str = "invertBool";
pub const OPT_INT_BOOL: &str = "intBool";

/// The annotation a field is selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    ShortFlag,
    LongFlag,
    Env,
}

/// Shape of a field value. The set is closed: anything a configuration type
/// wants to expose must be expressed as one of these.
#[derive(Clone)]
pub enum Value<'a> {
    Str(&'a str),
    Bool(bool),
    Int(i64),
    Uint(u64),
    /// A sequence; only its length is rendered.
    Len(usize),
    /// An optional value, rendered as if the pointee were declared inline.
    Optional(Option<Box<Value<'a>>>),
    /// Nested configuration embedded by value.
    Struct(&'a dyn CmdTags),
    /// Nested configuration reached through a shared pointer. Tracked by
    /// address so that back-references are only walked once.
    Ref(Option<&'a dyn CmdTags>),
    /// Anything else. Only an error when tagged.
    Other(&'static str),
}

impl<'a> Value<'a> {
    pub fn optional(value: Option<Value<'a>>) -> Self {
        Value::Optional(value.map(Box::new))
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Len(_) => "slice",
            Value::Optional(_) => "optional",
            Value::Struct(_) => "struct",
            Value::Ref(_) => "pointer",
            Value::Other(kind) => *kind,
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Str(s)
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(s: &'a String) -> Self {
        Value::Str(s.as_str())
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<'a, T> From<&'a [T]> for Value<'a> {
    fn from(s: &'a [T]) -> Self {
        Value::Len(s.len())
    }
}

impl<'a, T> From<&'a Vec<T>> for Value<'a> {
    fn from(v: &'a Vec<T>) -> Self {
        Value::Len(v.len())
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $wide:ty, $($t:ty),+) => {
        $(
            impl From<$t> for Value<'_> {
                fn from(n: $t) -> Self {
                    Value::$variant(<$wide>::from(n))
                }
            }
        )+
    };
}

impl_from_int!(Int, i64, i8, i16, i32, i64);
impl_from_int!(Uint, u64, u8, u16, u32, u64);

impl From<usize> for Value<'_> {
    fn from(n: usize) -> Self {
        Value::Uint(n as u64)
    }
}

/// One field of a configuration value.
#[derive(Clone)]
pub struct Field<'a> {
    pub name: &'static str,
    pub tags: &'static [(Tag, &'static str)],
    pub value: Value<'a>,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, value: impl Into<Value<'a>>) -> Self {
        Self {
            name,
            tags: &[],
            value: value.into(),
        }
    }

    pub fn tagged(
        name: &'static str,
        tags: &'static [(Tag, &'static str)],
        value: impl Into<Value<'a>>,
    ) -> Self {
        Self {
            name,
            tags,
            value: value.into(),
        }
    }

    fn lookup(&self, filter: Tag) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(tag, _)| *tag == filter)
            .map(|(_, annotation)| *annotation)
    }
}

/// Implemented by configuration types that can be rendered as arguments or
/// environment variables.
pub trait CmdTags {
    /// Fields in declaration order.
    fn cmd_fields(&self) -> Vec<Field<'_>>;
}

/// Combines an annotation name and an optional value into output tokens.
pub type Joiner = fn(&str, Option<&str>) -> Vec<String>;

/// `--name=value` or `--name`.
pub fn join_long_args(name: &str, value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) => vec![format!("--{name}={v}")],
        None => vec![format!("--{name}")],
    }
}

/// `-n value` (two tokens) or `-n`.
pub fn join_short_args(name: &str, value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) => vec![format!("-{name}"), v.to_string()],
        None => vec![format!("-{name}")],
    }
}

/// `NAME=value`, or `NAME=true` for a bare boolean.
pub fn join_env_vars(name: &str, value: Option<&str>) -> Vec<String> {
    vec![format!("{name}={}", value.unwrap_or("true"))]
}

/// Addresses of shared nested values already walked.
pub type SeenPtrs = HashSet<usize>;

fn address(value: &dyn CmdTags) -> usize {
    std::ptr::from_ref(value).cast::<()>() as usize
}

/// Render every field of `input` annotated with `filter` through `joiner`,
/// splicing in the output of untagged nested configuration.
///
/// Pass `None` for `seen` on the first call.
pub fn parse_cmd_tags(
    input: &dyn CmdTags,
    filter: Tag,
    joiner: Joiner,
    seen: Option<&mut SeenPtrs>,
) -> Result<Vec<String>, EncodeError> {
    let mut local = SeenPtrs::new();
    let seen = match seen {
        Some(seen) => seen,
        None => {
            local.insert(address(input));
            &mut local
        }
    };

    let mut out = Vec::new();
    for field in input.cmd_fields() {
        match field.lookup(filter) {
            Some(annotation) => {
                encode_tagged(&field, annotation, filter, joiner, seen, &mut out)?
            }
            None => encode_untagged(&field.value, filter, joiner, seen, &mut out)?,
        }
    }
    Ok(out)
}

fn encode_untagged(
    value: &Value<'_>,
    filter: Tag,
    joiner: Joiner,
    seen: &mut SeenPtrs,
    out: &mut Vec<String>,
) -> Result<(), EncodeError> {
    match value {
        Value::Struct(nested) => out.extend(parse_cmd_tags(*nested, filter, joiner, Some(seen))?),
        Value::Ref(Some(nested)) => {
            if seen.insert(address(*nested)) {
                out.extend(parse_cmd_tags(*nested, filter, joiner, Some(seen))?);
            }
        }
        Value::Optional(Some(inner)) => encode_untagged(inner, filter, joiner, seen, out)?,
        _ => {}
    }
    Ok(())
}

/// Single-field stand-in for a present optional value, carrying the original
/// annotations so the pointee is rendered by the same rules as an inline
/// field.
struct Pointee<'a> {
    field: Field<'a>,
}

impl CmdTags for Pointee<'_> {
    fn cmd_fields(&self) -> Vec<Field<'_>> {
        vec![self.field.clone()]
    }
}

fn encode_tagged(
    field: &Field<'_>,
    annotation: &'static str,
    filter: Tag,
    joiner: Joiner,
    seen: &mut SeenPtrs,
    out: &mut Vec<String>,
) -> Result<(), EncodeError> {
    let mut parts = annotation.split(',');
    let name = parts.next().unwrap_or_default();
    let opts: Vec<&str> = parts.collect();
    let has_opt = |opt: &str| opts.iter().any(|o| *o == opt);

    match &field.value {
        Value::Str(s) => {
            if !s.is_empty() {
                out.extend(joiner(name, Some(*s)));
            }
        }
        Value::Bool(b) => {
            let set = if has_opt(OPT_INVERT_BOOL) { !b } else { *b };
            if has_opt(OPT_INT_BOOL) {
                out.extend(joiner(name, Some(if set { "1" } else { "0" })));
            } else if set {
                out.extend(joiner(name, None));
            }
        }
        Value::Int(n) => {
            if *n != 0 || !has_opt(OPT_NON_ZERO) {
                out.extend(joiner(name, Some(&n.to_string())));
            }
        }
        Value::Uint(n) => {
            if *n != 0 || !has_opt(OPT_NON_ZERO) {
                out.extend(joiner(name, Some(&n.to_string())));
            }
        }
        Value::Len(len) => {
            if *len != 0 || !has_opt(OPT_NON_ZERO) {
                out.extend(joiner(name, Some(&len.to_string())));
            }
        }
        Value::Optional(None) => {}
        Value::Optional(Some(inner)) => {
            let pointee = Pointee {
                field: Field {
                    name: field.name,
                    tags: field.tags,
                    value: (**inner).clone(),
                },
            };
            out.extend(parse_cmd_tags(&pointee, filter, joiner, Some(seen))?);
        }
        other @ (Value::Struct(_) | Value::Ref(_) | Value::Other(_)) => {
            return Err(EncodeError::UnhandledField {
                field: field.name,
                tag: annotation,
                kind: other.kind(),
            });
        }
    }
    Ok(())
}

//! Conversion tables used by overload scoring.
//!
//! These are deliberately approximate: they cover primitive widening and
//! boxing, not the full assignment-compatibility rules. Extend the tables
//! rather than special-casing types in the resolver.

use phf::{phf_map, phf_set};

/// Score for an identical parameter type.
pub const EXACT: f64 = 1.0;
/// Score for a primitive widening conversion.
pub const WIDENING: f64 = 0.8;
/// Score for boxing or conversion to `Number`/`Object`.
pub const CONVERTIBLE: f64 = 0.5;
/// Score for an incompatible parameter.
pub const MISMATCH: f64 = 0.0;

/// Universal top type.
pub const TOP_TYPE: &str = "Object";

/// Primitive widening: `from` -> types it widens to.
static WIDENS_TO: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "byte" => &["short", "int", "long", "float", "double"],
    "short" => &["int", "long", "float", "double"],
    "char" => &["int", "long", "float", "double"],
    "int" => &["long", "float", "double"],
    "long" => &["float", "double"],
    "float" => &["double"],
};

/// Primitive -> wrapper.
static BOXES_TO: phf::Map<&'static str, &'static str> = phf_map! {
    "boolean" => "Boolean",
    "byte" => "Byte",
    "char" => "Character",
    "short" => "Short",
    "int" => "Integer",
    "long" => "Long",
    "float" => "Float",
    "double" => "Double",
};

/// Wrapper types.
static WRAPPERS: phf::Set<&'static str> = phf_set! {
    "Boolean", "Byte", "Character", "Short", "Integer", "Long", "Float", "Double",
};

/// Types convertible to `Number`.
static NUMERIC: phf::Set<&'static str> = phf_set! {
    "byte", "short", "int", "long", "float", "double",
    "Byte", "Short", "Integer", "Long", "Float", "Double",
};

/// Whether `from` widens to `to` by a primitive widening conversion.
pub fn widens_to(from: &str, to: &str) -> bool {
    WIDENS_TO
        .get(from)
        .map(|targets| targets.contains(&to))
        .unwrap_or(false)
}

/// Whether `from` converts to `to` by boxing, or from a primitive or
/// wrapper to `Number`/`Object`. Reference types other than the wrappers
/// never convert; their hierarchy is not consulted.
pub fn converts_to(from: &str, to: &str) -> bool {
    if BOXES_TO.get(from).copied() == Some(to) {
        return true;
    }
    match to {
        "Number" => NUMERIC.contains(from),
        TOP_TYPE => BOXES_TO.contains_key(from) || WRAPPERS.contains(from),
        _ => false,
    }
}

/// Score one argument type against one parameter type.
pub fn param_score(arg: &str, param: &str) -> f64 {
    if arg == param {
        EXACT
    } else if widens_to(arg, param) {
        WIDENING
    } else if converts_to(arg, param) {
        CONVERTIBLE
    } else {
        MISMATCH
    }
}

#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/yamlcore/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::fn_params_excessive_bools,
    clippy::manual_range_contains,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::unnecessary_wraps,
    clippy::match_wildcard_for_single_variants
)]
#![deny(unsafe_code)]

mod anchor;
mod error;
mod event;
mod event_stream;
#[macro_use]
mod macros;
mod parser;
mod presenter;
mod reader;
mod scanner;
mod tag_registry;
mod token;
mod writer;

pub use crate::anchor::{AnchorId, AnchorTable};
pub use crate::error::*;
pub use crate::event::*;
pub use crate::event_stream::{CollaboratorEventStream, EventStream, ParserEventStream};
pub use crate::parser::Parser;
pub use crate::presenter::{AnchorStyle, OutputVersion, PresentationStyle, Presenter, PresenterConfig};
pub use crate::reader::Reader;
pub use crate::scanner::Scanner;
pub use crate::tag_registry::{TagId, TagRegistry};
pub use crate::token::*;
pub use crate::writer::Writer;

/// The tag `!!null` with the only possible value: `null`.
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
/// The tag `!!bool` with the values: `true` and `false`.
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
/// The tag `!!str` for string values.
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag `!!int` for integer values.
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
/// The tag `!!float` for float values.
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
/// The tag `!!timestamp` for date and time values.
pub const TIMESTAMP_TAG: &str = "tag:yaml.org,2002:timestamp";
/// The tag `!!seq` is used to denote sequences.
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag `!!map` is used to denote mappings.
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

/// The default scalar tag is `!!str`.
pub const DEFAULT_SCALAR_TAG: &str = STR_TAG;
/// The default sequence tag is `!!seq`.
pub const DEFAULT_SEQUENCE_TAG: &str = SEQ_TAG;
/// The default mapping tag is `!!map`.
pub const DEFAULT_MAPPING_TAG: &str = MAP_TAG;

/// The `%YAML` directive's version numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct VersionDirective {
    /// The major version number.
    pub major: i32,
    /// The minor version number.
    pub minor: i32,
}

/// A `%TAG` directive: a shorthand handle bound to a URI prefix for one
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle, e.g. `!!` or `!e!`.
    pub handle: String,
    /// The URI prefix the handle expands to.
    pub prefix: String,
}

/// The stream's character encoding, detected by the [`reader`](crate::reader)
/// from a byte-order mark or leading zero-byte pattern.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Let the reader detect the encoding from the input.
    #[default]
    Any = 0,
    /// UTF-8, with or without a byte-order mark.
    Utf8 = 1,
    /// UTF-16, little-endian.
    Utf16Le = 2,
    /// UTF-16, big-endian.
    Utf16Be = 3,
    /// UTF-32, little-endian.
    Utf32Le = 4,
    /// UTF-32, big-endian.
    Utf32Be = 5,
}

/// The line-break style used when presenting a stream.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum LineBreak {
    /// A single `LF` (Unix convention). The default.
    #[default]
    Lf,
    /// A single `CR` (old Mac convention).
    Cr,
    /// `CR` followed by `LF` (Windows convention).
    CrLf,
    /// Resolved to [`LineBreak::CrLf`] on Windows and [`LineBreak::Lf`]
    /// elsewhere, at the point the presenter's configuration is built.
    Platform,
}

impl LineBreak {
    /// Resolve [`LineBreak::Platform`] to a concrete style; every other
    /// variant is already concrete and is returned unchanged.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            LineBreak::Platform => {
                if cfg!(windows) {
                    LineBreak::CrLf
                } else {
                    LineBreak::Lf
                }
            }
            other => other,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self.resolve() {
            LineBreak::Cr => "\r",
            LineBreak::CrLf => "\r\n",
            LineBreak::Lf | LineBreak::Platform => "\n",
        }
    }
}

/// Scalar presentation styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// Let the presenter choose the style.
    #[default]
    Any = 0,
    /// The plain (unquoted) scalar style.
    Plain = 1,
    /// The single-quoted scalar style.
    SingleQuoted = 2,
    /// The double-quoted scalar style.
    DoubleQuoted = 3,
    /// The literal block scalar style (`|`).
    Literal = 4,
    /// The folded block scalar style (`>`).
    Folded = 5,
}

/// A lexer advisory for a plain scalar's likely resolved type. The core
/// never resolves a scalar itself (that is a collaborator's job); this is
/// only a hint produced by a pure classifier over the decoded text.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum TypeHint {
    /// Matches the core schema integer grammar (decimal, `0o`-octal, or
    /// `0x`-hex).
    Integer,
    /// Matches the core schema float grammar.
    Float,
    /// `.inf` or `-.inf`, case-insensitive.
    FloatInf,
    /// `.nan`, case-insensitive.
    FloatNan,
    /// `true` (core schema) or `y`/`yes`/`on` (1.1 hint set), case-insensitive.
    BoolTrue,
    /// `false` (core schema) or `n`/`no`/`off` (1.1 hint set), case-insensitive.
    BoolFalse,
    /// `null`, `~`, or empty.
    Null,
    /// Did not match any of the above; would resolve to `!!str`.
    String,
    /// Reserved for non-plain scalars, which are never hinted.
    Unknown,
}

/// Sequence collection styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// Let the presenter choose the style.
    #[default]
    Any = 0,
    /// `- a\n- b\n`
    Block = 1,
    /// `[a, b]`
    Flow = 2,
}

/// Mapping collection styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// Let the presenter choose the style.
    #[default]
    Any = 0,
    /// `a: 1\nb: 2\n`
    Block = 1,
    /// `{a: 1, b: 2}`
    Flow = 2,
    /// The single-entry mapping synthesized by a `k: v` flow-sequence
    /// entry (the `ns-flow-pair` production), distinct from a literal
    /// `{k: v}` written in the same position.
    Pair = 3,
}

/// Computes a [`TypeHint`] for a plain scalar's decoded text, following the
/// YAML 1.2 core schema regexes plus the YAML 1.1 boolean hint set.
#[must_use]
pub fn classify_plain_scalar(value: &str) -> TypeHint {
    if value.is_empty() || value == "~" || value.eq_ignore_ascii_case("null") {
        return TypeHint::Null;
    }
    if value.eq_ignore_ascii_case("true")
        || matches!(
            value.to_ascii_lowercase().as_str(),
            "y" | "yes" | "on"
        )
    {
        return TypeHint::BoolTrue;
    }
    if value.eq_ignore_ascii_case("false")
        || matches!(
            value.to_ascii_lowercase().as_str(),
            "n" | "no" | "off"
        )
    {
        return TypeHint::BoolFalse;
    }
    if value.eq_ignore_ascii_case(".inf") || value.eq_ignore_ascii_case("-.inf") || value.eq_ignore_ascii_case("+.inf")
    {
        return TypeHint::FloatInf;
    }
    if value.eq_ignore_ascii_case(".nan") {
        return TypeHint::FloatNan;
    }
    if is_core_schema_int(value) {
        return TypeHint::Integer;
    }
    if is_core_schema_float(value) {
        return TypeHint::Float;
    }
    TypeHint::String
}

fn is_core_schema_int(value: &str) -> bool {
    let value = value.strip_prefix(['+', '-']).unwrap_or(value);
    if let Some(digits) = value.strip_prefix("0x") {
        return !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(digits) = value.strip_prefix("0o") {
        return !digits.is_empty() && digits.chars().all(|c| matches!(c, '0'..='7'));
    }
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn is_core_schema_float(value: &str) -> bool {
    let value = value.strip_prefix(['+', '-']).unwrap_or(value);
    let (mantissa, exponent) = match value.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (value, None),
    };
    if let Some(exponent) = exponent {
        let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exponent.is_empty() || !exponent.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    let Some((int_part, frac_part)) = mantissa.split_once('.') else {
        return false;
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    int_part.chars().all(|c| c.is_ascii_digit()) && frac_part.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_core_schema_scalars() {
        assert_eq!(classify_plain_scalar(""), TypeHint::Null);
        assert_eq!(classify_plain_scalar("~"), TypeHint::Null);
        assert_eq!(classify_plain_scalar("Null"), TypeHint::Null);
        assert_eq!(classify_plain_scalar("true"), TypeHint::BoolTrue);
        assert_eq!(classify_plain_scalar("False"), TypeHint::BoolFalse);
        assert_eq!(classify_plain_scalar("yes"), TypeHint::BoolTrue);
        assert_eq!(classify_plain_scalar("off"), TypeHint::BoolFalse);
        assert_eq!(classify_plain_scalar("-.inf"), TypeHint::FloatInf);
        assert_eq!(classify_plain_scalar(".NaN"), TypeHint::FloatNan);
        assert_eq!(classify_plain_scalar("42"), TypeHint::Integer);
        assert_eq!(classify_plain_scalar("-42"), TypeHint::Integer);
        assert_eq!(classify_plain_scalar("0x1A"), TypeHint::Integer);
        assert_eq!(classify_plain_scalar("0o17"), TypeHint::Integer);
        assert_eq!(classify_plain_scalar("3.14"), TypeHint::Float);
        assert_eq!(classify_plain_scalar("6.02e23"), TypeHint::Float);
        assert_eq!(classify_plain_scalar("hello"), TypeHint::String);
        assert_eq!(classify_plain_scalar("0x"), TypeHint::String);
    }

    #[test]
    fn platform_line_break_resolves_concretely() {
        assert_ne!(LineBreak::Platform.resolve(), LineBreak::Platform);
    }
}

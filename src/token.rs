use crate::{Encoding, Position, ScalarStyle};

/// A lexical token produced by the [`crate::scanner::Scanner`].
///
/// Tokens are short-lived: the parser discards each one immediately after
/// folding it into an event or into parser-internal bookkeeping.
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub struct Token {
    /// The token payload.
    pub data: TokenData,
    /// The beginning of the token.
    pub start_mark: Position,
    /// The end of the token.
    pub end_mark: Position,
}

#[derive(Debug, PartialEq)]
pub enum TokenData {
    /// A STREAM-START token.
    StreamStart {
        /// The detected or configured stream encoding.
        encoding: Encoding,
    },
    /// A STREAM-END token.
    StreamEnd,
    /// A `%YAML` directive token.
    VersionDirective {
        /// The major version number.
        major: i32,
        /// The minor version number.
        minor: i32,
    },
    /// A `%TAG` directive token.
    TagDirective {
        /// The tag handle (e.g. `!!`).
        handle: String,
        /// The tag prefix the handle expands to.
        prefix: String,
    },
    /// An unrecognized directive. Its name and raw parameters are carried
    /// so a caller may report a warning; the directive itself has no
    /// further effect on parsing.
    ReservedDirective {
        /// The directive name, without the leading `%`.
        name: String,
        /// The raw, unparsed parameter text.
        params: String,
    },
    /// A `---` token.
    DocumentStart,
    /// A `...` token.
    DocumentEnd,
    /// The start of a block sequence (inferred from indentation).
    BlockSequenceStart,
    /// The start of a block mapping (inferred from indentation).
    BlockMappingStart,
    /// The end of a block collection (inferred from indentation).
    BlockEnd,
    /// A `[` token.
    FlowSequenceStart,
    /// A `]` token.
    FlowSequenceEnd,
    /// A `{` token.
    FlowMappingStart,
    /// A `}` token.
    FlowMappingEnd,
    /// A `-` block sequence entry indicator.
    BlockEntry,
    /// A `,` flow entry separator.
    FlowEntry,
    /// A `?` explicit mapping key indicator.
    Key,
    /// A `:` mapping value indicator.
    Value,
    /// A `*name` alias reference.
    Alias {
        /// The referenced anchor name.
        value: String,
    },
    /// A `&name` anchor property.
    Anchor {
        /// The anchor name being defined.
        value: String,
    },
    /// A tag property, `!handle!suffix` or `!<verbatim-uri>`.
    Tag {
        /// The tag handle; empty for a verbatim tag.
        handle: String,
        /// The tag suffix, or the full URI for a verbatim tag.
        suffix: String,
    },
    /// A scalar's decoded content and style.
    Scalar {
        /// The decoded scalar value.
        value: String,
        /// The scalar's lexical style.
        style: ScalarStyle,
    },
}

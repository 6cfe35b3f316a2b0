use crate::anchor::AnchorId;
use crate::tag_registry::TagId;
use crate::{Encoding, MappingStyle, Position, ScalarStyle, SequenceStyle, TagDirective, VersionDirective};

/// An event produced by the [`crate::parser::Parser`] and consumed by the
/// [`crate::presenter::Presenter`] (or any other collaborator walking the
/// event stream).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Event {
    /// The event payload.
    pub data: EventData,
    /// The beginning of the event.
    pub start_mark: Position,
    /// The end of the event.
    pub end_mark: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// The first event of every stream.
    StreamStart {
        /// The stream's encoding.
        encoding: Encoding,
    },
    /// The last event of every stream.
    StreamEnd,
    /// The start of a document.
    DocumentStart {
        /// The `%YAML` directive, if one was seen.
        version_directive: Option<VersionDirective>,
        /// The `%TAG` directives declared for this document.
        tag_directives: Vec<TagDirective>,
        /// Whether the `---` marker was implicit.
        implicit: bool,
    },
    /// The end of a document.
    DocumentEnd {
        /// Whether the `...` marker was implicit.
        implicit: bool,
    },
    /// A reference to a previously anchored node.
    Alias {
        /// The id of the anchor being referenced.
        anchor: AnchorId,
    },
    /// A scalar node.
    Scalar {
        /// The anchor defined on this node, if any.
        anchor: Option<AnchorId>,
        /// The node's tag. Always present: untagged nodes carry the
        /// registry's non-specific `?` or `!` id (see
        /// [`crate::tag_registry::TagRegistry`]).
        tag: TagId,
        /// The scalar's decoded value.
        value: String,
        /// Whether the tag may be omitted when presenting in plain style.
        plain_implicit: bool,
        /// Whether the tag may be omitted when presenting in any non-plain
        /// style.
        quoted_implicit: bool,
        /// The scalar's lexical style.
        style: ScalarStyle,
    },
    /// The start of a sequence.
    SequenceStart {
        /// The anchor defined on this node, if any.
        anchor: Option<AnchorId>,
        /// The node's tag.
        tag: TagId,
        /// Whether the tag may be omitted when presenting.
        implicit: bool,
        /// The sequence's collection style.
        style: SequenceStyle,
    },
    /// The end of a sequence.
    SequenceEnd,
    /// The start of a mapping.
    MappingStart {
        /// The anchor defined on this node, if any.
        anchor: Option<AnchorId>,
        /// The node's tag.
        tag: TagId,
        /// Whether the tag may be omitted when presenting.
        implicit: bool,
        /// The mapping's collection style.
        style: MappingStyle,
    },
    /// The end of a mapping.
    MappingEnd,
}

impl Event {
    pub(crate) fn new(data: EventData) -> Self {
        Self {
            data,
            start_mark: Position::default(),
            end_mark: Position::default(),
        }
    }

    /// Create the STREAM-START event.
    pub fn stream_start(encoding: Encoding) -> Self {
        Self::new(EventData::StreamStart { encoding })
    }

    /// Create the STREAM-END event.
    pub fn stream_end() -> Self {
        Self::new(EventData::StreamEnd)
    }

    /// Create the DOCUMENT-START event.
    pub fn document_start(
        version_directive: Option<VersionDirective>,
        tag_directives: &[TagDirective],
        implicit: bool,
    ) -> Self {
        Self::new(EventData::DocumentStart {
            version_directive,
            tag_directives: tag_directives.to_vec(),
            implicit,
        })
    }

    /// Create the DOCUMENT-END event.
    pub fn document_end(implicit: bool) -> Self {
        Self::new(EventData::DocumentEnd { implicit })
    }

    /// Create an ALIAS event.
    pub fn alias(anchor: AnchorId) -> Self {
        Self::new(EventData::Alias { anchor })
    }

    /// Create a SCALAR event.
    #[allow(clippy::too_many_arguments)]
    pub fn scalar(
        anchor: Option<AnchorId>,
        tag: TagId,
        value: &str,
        plain_implicit: bool,
        quoted_implicit: bool,
        style: ScalarStyle,
    ) -> Self {
        Self::new(EventData::Scalar {
            anchor,
            tag,
            value: value.to_owned(),
            plain_implicit,
            quoted_implicit,
            style,
        })
    }

    /// Create a SEQUENCE-START event.
    pub fn sequence_start(
        anchor: Option<AnchorId>,
        tag: TagId,
        implicit: bool,
        style: SequenceStyle,
    ) -> Self {
        Self::new(EventData::SequenceStart {
            anchor,
            tag,
            implicit,
            style,
        })
    }

    /// Create a SEQUENCE-END event.
    pub fn sequence_end() -> Self {
        Self::new(EventData::SequenceEnd)
    }

    /// Create a MAPPING-START event.
    pub fn mapping_start(
        anchor: Option<AnchorId>,
        tag: TagId,
        implicit: bool,
        style: MappingStyle,
    ) -> Self {
        Self::new(EventData::MappingStart {
            anchor,
            tag,
            implicit,
            style,
        })
    }

    /// Create a MAPPING-END event.
    pub fn mapping_end() -> Self {
        Self::new(EventData::MappingEnd)
    }
}

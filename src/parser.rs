//! The parser: a recursive-descent-by-table state machine that folds a
//! [`Scanner`]'s [`Token`]s into [`Event`]s.
//!
//! Drives the scanner one token of lookahead at a time and walks the YAML
//! 1.2 grammar for directives, document markers, block and flow
//! collections, and implicit/explicit keys. Anchors and tags attach to
//! the next node event; anchor names and tag handles/suffixes are
//! resolved through a per-document [`AnchorTable`] and an owned
//! [`TagRegistry`] into opaque ids rather than carried as raw strings.

use std::mem;

use crate::anchor::AnchorTable;
use crate::error::{ParserError, Position, Warning};
use crate::event::{Event, EventData};
use crate::reader::Reader;
use crate::scanner::Scanner;
use crate::tag_registry::{TagId, TagRegistry};
use crate::token::{Token, TokenData};
use crate::{MappingStyle, ScalarStyle, SequenceStyle, TagDirective, VersionDirective};

/// The parser. Consumes a [`Scanner`] and produces [`Event`]s on demand.
#[non_exhaustive]
pub struct Parser<'r> {
    scanner: Scanner<'r>,
    current: Option<Token>,
    states: Vec<ParserState>,
    state: ParserState,
    marks: Vec<Position>,
    tag_directives: Vec<TagDirective>,
    tag_registry: TagRegistry,
    anchors: AnchorTable,
    stream_end_produced: bool,
}

/// The states of the parser's state machine.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[non_exhaustive]
enum ParserState {
    #[default]
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockNodeOrIndentlessSequence,
    FlowNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

impl<'r> Parser<'r> {
    /// Create a parser reading from `reader`.
    pub fn new(reader: Reader<'r>) -> Self {
        Parser {
            scanner: Scanner::new(reader),
            current: None,
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(4),
            tag_registry: TagRegistry::new(),
            anchors: AnchorTable::new(),
            stream_end_produced: false,
        }
    }

    /// The tag registry backing this parser's tag ids. Use this to resolve
    /// an [`Event`]'s [`TagId`] back to its URI.
    pub fn tag_registry(&self) -> &TagRegistry {
        &self.tag_registry
    }

    /// The current document's anchor table. Use this to resolve an
    /// [`Event`]'s anchor id back to its source name. Cleared at every
    /// `document-end`, matching anchors' per-document scope.
    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    /// Drain dialectal warnings accumulated by the underlying scanner
    /// since the last call.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.scanner.take_warnings()
    }

    /// Parse the input stream and produce the next event.
    ///
    /// Call this repeatedly to obtain the full event sequence; the first
    /// event is always [`EventData::StreamStart`] and the last is always
    /// [`EventData::StreamEnd`].
    pub fn parse(&mut self) -> Result<Event, ParserError> {
        if self.stream_end_produced || self.state == ParserState::End {
            return Ok(Event::new(EventData::StreamEnd));
        }
        self.state_machine()
    }

    // -- token lookahead ----------------------------------------------------

    fn peek_token(&mut self) -> Result<&Token, ParserError> {
        if self.current.is_none() {
            self.current = Some(self.scanner.scan()?);
        }
        Ok(self.current.as_ref().expect("just filled"))
    }

    fn peek_token_mut(&mut self) -> Result<&mut Token, ParserError> {
        if self.current.is_none() {
            self.current = Some(self.scanner.scan()?);
        }
        Ok(self.current.as_mut().expect("just filled"))
    }

    fn skip_token(&mut self) {
        let token = self.current.take().expect("skip_token called with no token peeked");
        if matches!(token.data, TokenData::StreamEnd) {
            self.stream_end_produced = true;
        }
    }

    fn err<T>(problem: &'static str, mark: Position) -> Result<T, ParserError> {
        Err(ParserError::Problem { problem, mark })
    }

    fn err_ctx<T>(
        context: &'static str,
        context_mark: Position,
        problem: &'static str,
        mark: Position,
    ) -> Result<T, ParserError> {
        Err(ParserError::ProblemWithContext {
            context,
            context_mark,
            problem,
            mark,
        })
    }

    // -- state machine ----------------------------------------------------

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            ParserState::FlowNode => self.parse_node(false, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            ParserState::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            ParserState::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => panic!("parser end state reached unexpectedly"),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::StreamStart { encoding } = &token.data {
            let event = Event {
                data: EventData::StreamStart { encoding: *encoding },
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.state = ParserState::ImplicitDocumentStart;
            self.skip_token();
            Ok(event)
        } else {
            let mark = token.start_mark;
            Self::err("did not find expected <stream-start>", mark)
        }
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = vec![];
        let mut token = self.peek_token()?;
        if !implicit {
            while let TokenData::DocumentEnd = &token.data {
                self.skip_token();
                token = self.peek_token()?;
            }
        }
        if implicit
            && !matches!(
                token.data,
                TokenData::VersionDirective { .. }
                    | TokenData::TagDirective { .. }
                    | TokenData::ReservedDirective { .. }
                    | TokenData::DocumentStart
                    | TokenData::StreamEnd
            )
        {
            let event = Event {
                data: EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: vec![],
                    implicit: true,
                },
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.process_directives(None, None)?;
            self.states.push(ParserState::DocumentEnd);
            self.state = ParserState::BlockNode;
            Ok(event)
        } else if !matches!(token.data, TokenData::StreamEnd) {
            let start_mark = token.start_mark;
            self.process_directives(Some(&mut version_directive), Some(&mut tag_directives))?;
            token = self.peek_token()?;
            if let TokenData::DocumentStart = token.data {
                let end_mark = token.end_mark;
                let event = Event {
                    data: EventData::DocumentStart {
                        version_directive,
                        tag_directives: mem::take(&mut tag_directives),
                        implicit: false,
                    },
                    start_mark,
                    end_mark,
                };
                self.states.push(ParserState::DocumentEnd);
                self.state = ParserState::DocumentContent;
                self.skip_token();
                Ok(event)
            } else {
                Self::err("did not find expected <document start>", token.start_mark)
            }
        } else {
            let event = Event {
                data: EventData::StreamEnd,
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.state = ParserState::End;
            self.skip_token();
            Ok(event)
        }
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::VersionDirective { .. }
        | TokenData::TagDirective { .. }
        | TokenData::ReservedDirective { .. }
        | TokenData::DocumentStart
        | TokenData::DocumentEnd
        | TokenData::StreamEnd = &token.data
        {
            let mark = token.start_mark;
            self.state = self.states.pop().unwrap();
            self.process_empty_scalar(mark)
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let mut implicit = true;
        let token = self.peek_token()?;
        let mut end_mark = token.start_mark;
        let start_mark = end_mark;
        if let TokenData::DocumentEnd = &token.data {
            end_mark = token.end_mark;
            self.skip_token();
            implicit = false;
        }
        self.tag_directives.clear();
        self.anchors.clear();
        self.state = ParserState::DocumentStart;
        Ok(Event {
            data: EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        })
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let mut anchor_name: Option<String> = None;
        let mut tag_handle: Option<String> = None;
        let mut tag_suffix: Option<String> = None;
        let mut tag_mark = Position::default();

        let mut token = self.peek_token_mut()?;

        if let TokenData::Alias { value } = &mut token.data {
            let name = mem::take(value);
            let start_mark = token.start_mark;
            let end_mark = token.end_mark;
            let anchor = self
                .anchors
                .resolve(&name)
                .ok_or(ParserError::UndefinedAlias { mark: start_mark })?;
            self.state = self.states.pop().unwrap();
            self.skip_token();
            return Ok(Event {
                data: EventData::Alias { anchor },
                start_mark,
                end_mark,
            });
        }

        let mut end_mark = token.start_mark;
        let start_mark = end_mark;
        if let TokenData::Anchor { value } = &mut token.data {
            anchor_name = Some(mem::take(value));
            end_mark = token.end_mark;
            self.skip_token();
            token = self.peek_token_mut()?;
            if let TokenData::Tag { handle, suffix } = &mut token.data {
                tag_handle = Some(mem::take(handle));
                tag_suffix = Some(mem::take(suffix));
                tag_mark = token.start_mark;
                end_mark = token.end_mark;
                self.skip_token();
            }
        } else if let TokenData::Tag { handle, suffix } = &mut token.data {
            tag_handle = Some(mem::take(handle));
            tag_suffix = Some(mem::take(suffix));
            tag_mark = token.start_mark;
            end_mark = token.end_mark;
            self.skip_token();
            token = self.peek_token_mut()?;
            if let TokenData::Anchor { value } = &mut token.data {
                anchor_name = Some(mem::take(value));
                end_mark = token.end_mark;
                self.skip_token();
            }
        }

        let tag_uri: Option<String> = if let Some(tag_handle_value) = &tag_handle {
            if tag_handle_value.is_empty() {
                tag_suffix.clone()
            } else {
                let mut resolved = None;
                for tag_directive in &self.tag_directives {
                    if &tag_directive.handle == tag_handle_value {
                        let suffix = tag_suffix.as_deref().unwrap_or("");
                        resolved = Some(format!("{}{}", tag_directive.prefix, suffix));
                        break;
                    }
                }
                match resolved {
                    Some(r) => Some(r),
                    None => {
                        return Err(ParserError::UndefinedTagHandle { mark: tag_mark });
                    }
                }
            }
        } else {
            None
        };

        let tag: TagId = match tag_uri.as_deref() {
            None => self.tag_registry.non_specific_question(),
            Some("!") => self.tag_registry.non_specific_bang(),
            Some(uri) => self.tag_registry.register(uri),
        };
        let anchor = anchor_name.as_deref().map(|name| self.anchors.define(name));
        let implicit = tag_uri.is_none() || tag_uri.as_deref() == Some("");

        let token = self.peek_token_mut()?;

        if indentless_sequence && matches!(token.data, TokenData::BlockEntry) {
            end_mark = token.end_mark;
            self.state = ParserState::IndentlessSequenceEntry;
            Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            })
        } else if let TokenData::Scalar { value, style } = &mut token.data {
            let mut plain_implicit = false;
            let mut quoted_implicit = false;
            end_mark = token.end_mark;
            if (*style == ScalarStyle::Plain && tag_uri.is_none()) || tag_uri.as_deref() == Some("!") {
                plain_implicit = true;
            } else if tag_uri.is_none() {
                quoted_implicit = true;
            }
            let event = Event {
                data: EventData::Scalar {
                    anchor,
                    tag,
                    value: mem::take(value),
                    plain_implicit,
                    quoted_implicit,
                    style: *style,
                },
                start_mark,
                end_mark,
            };
            self.state = self.states.pop().unwrap();
            self.skip_token();
            Ok(event)
        } else if let TokenData::FlowSequenceStart = &token.data {
            end_mark = token.end_mark;
            self.state = ParserState::FlowSequenceFirstEntry;
            Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Flow,
                },
                start_mark,
                end_mark,
            })
        } else if let TokenData::FlowMappingStart = &token.data {
            end_mark = token.end_mark;
            self.state = ParserState::FlowMappingFirstKey;
            Ok(Event {
                data: EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Flow,
                },
                start_mark,
                end_mark,
            })
        } else if block && matches!(token.data, TokenData::BlockSequenceStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockSequenceFirstEntry;
            Ok(Event {
                data: EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            })
        } else if block && matches!(token.data, TokenData::BlockMappingStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockMappingFirstKey;
            Ok(Event {
                data: EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Block,
                },
                start_mark,
                end_mark,
            })
        } else if anchor.is_some() || tag_uri.is_some() {
            self.state = self.states.pop().unwrap();
            Ok(Event {
                data: EventData::Scalar {
                    anchor,
                    tag,
                    value: String::new(),
                    plain_implicit: implicit,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark,
                end_mark,
            })
        } else {
            Self::err_ctx(
                if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                },
                start_mark,
                "did not find expected node content",
                token.start_mark,
            )
        }
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if let TokenData::BlockEntry = &token.data {
            let mark = token.end_mark;
            self.skip_token();
            token = self.peek_token()?;
            if matches!(token.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                self.state = ParserState::BlockSequenceEntry;
                self.process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::BlockSequenceEntry);
                self.parse_node(true, false)
            }
        } else if let TokenData::BlockEnd = token.data {
            let event = Event {
                data: EventData::SequenceEnd,
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.state = self.states.pop().unwrap();
            let _ = self.marks.pop();
            self.skip_token();
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().unwrap();
            Self::err_ctx(
                "while parsing a block collection",
                mark,
                "did not find expected '-' indicator",
                token_mark,
            )
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if let TokenData::BlockEntry = token.data {
            let mark = token.end_mark;
            self.skip_token();
            token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::IndentlessSequenceEntry;
                self.process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            let event = Event {
                data: EventData::SequenceEnd,
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.state = self.states.pop().unwrap();
            Ok(event)
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if let TokenData::Key = token.data {
            let mark = token.end_mark;
            self.skip_token();
            token = self.peek_token()?;
            if matches!(token.data, TokenData::Key | TokenData::Value | TokenData::BlockEnd) {
                self.state = ParserState::BlockMappingValue;
                self.process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::BlockMappingValue);
                self.parse_node(true, true)
            }
        } else if let TokenData::BlockEnd = token.data {
            let event = Event {
                data: EventData::MappingEnd,
                start_mark: token.start_mark,
                end_mark: token.end_mark,
            };
            self.state = self.states.pop().unwrap();
            let _ = self.marks.pop();
            self.skip_token();
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().unwrap();
            Self::err_ctx(
                "while parsing a block mapping",
                mark,
                "did not find expected key",
                token_mark,
            )
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if let TokenData::Value = token.data {
            let mark = token.end_mark;
            self.skip_token();
            token = self.peek_token()?;
            if matches!(token.data, TokenData::Key | TokenData::Value | TokenData::BlockEnd) {
                self.state = ParserState::BlockMappingKey;
                self.process_empty_scalar(mark)
            } else {
                self.states.push(ParserState::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            let mark = token.start_mark;
            self.state = ParserState::BlockMappingKey;
            self.process_empty_scalar(mark)
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowSequenceEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().unwrap();
                    return Self::err_ctx(
                        "while parsing a flow sequence",
                        mark,
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                // `[k: v]`: a single implicit-mapping entry inside a flow
                // sequence. Tagged with a distinct style so a presenter
                // can tell it apart from a literal `{k: v}`.
                let event = Event {
                    data: EventData::MappingStart {
                        anchor: None,
                        tag: self.tag_registry.non_specific_question(),
                        implicit: true,
                        style: MappingStyle::Pair,
                    },
                    start_mark: token.start_mark,
                    end_mark: token.end_mark,
                };
                self.state = ParserState::FlowSequenceEntryMappingKey;
                self.skip_token();
                return Ok(event);
            } else if !matches!(token.data, TokenData::FlowSequenceEnd) {
                self.states.push(ParserState::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let event = Event {
            data: EventData::SequenceEnd,
            start_mark: token.start_mark,
            end_mark: token.end_mark,
        };
        self.state = self.states.pop().unwrap();
        let _ = self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(
            token.data,
            TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
        ) {
            let mark = token.end_mark;
            self.skip_token();
            self.state = ParserState::FlowSequenceEntryMappingValue;
            self.process_empty_scalar(mark)
        } else {
            self.states.push(ParserState::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if let TokenData::Value = token.data {
            self.skip_token();
            token = self.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowSequenceEnd) {
                self.states.push(ParserState::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
        }
        let mark = token.start_mark;
        self.state = ParserState::FlowSequenceEntryMappingEnd;
        self.process_empty_scalar(mark)
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let end_mark = token.end_mark;
        self.state = ParserState::FlowSequenceEntry;
        Ok(Event {
            data: EventData::MappingEnd,
            start_mark,
            end_mark,
        })
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowMappingEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().unwrap();
                    return Self::err_ctx(
                        "while parsing a flow mapping",
                        mark,
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                self.skip_token();
                token = self.peek_token()?;
                if !matches!(
                    token.data,
                    TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                ) {
                    self.states.push(ParserState::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                let mark = token.start_mark;
                self.state = ParserState::FlowMappingValue;
                return self.process_empty_scalar(mark);
            } else if !matches!(token.data, TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let event = Event {
            data: EventData::MappingEnd,
            start_mark: token.start_mark,
            end_mark: token.end_mark,
        };
        self.state = self.states.pop().unwrap();
        let _ = self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if empty {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            return self.process_empty_scalar(mark);
        }
        if let TokenData::Value = token.data {
            self.skip_token();
            token = self.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingKey);
                return self.parse_node(false, false);
            }
        }
        let mark = token.start_mark;
        self.state = ParserState::FlowMappingKey;
        self.process_empty_scalar(mark)
    }

    fn process_empty_scalar(&self, mark: Position) -> Result<Event, ParserError> {
        Ok(Event {
            data: EventData::Scalar {
                anchor: None,
                tag: self.tag_registry.non_specific_question(),
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            start_mark: mark,
            end_mark: mark,
        })
    }

    fn process_directives(
        &mut self,
        version_directive_ref: Option<&mut Option<VersionDirective>>,
        tag_directives_ref: Option<&mut Vec<TagDirective>>,
    ) -> Result<(), ParserError> {
        let default_tag_directives = [
            TagDirective {
                handle: String::from("!"),
                prefix: String::from("!"),
            },
            TagDirective {
                handle: String::from("!!"),
                prefix: String::from("tag:yaml.org,2002:"),
            },
        ];
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = Vec::with_capacity(4);

        let mut token = self.peek_token_mut()?;
        loop {
            match &mut token.data {
                TokenData::VersionDirective { major, minor } => {
                    let mark = token.start_mark;
                    if version_directive.is_some() {
                        return Self::err("found duplicate %YAML directive", mark);
                    }
                    version_directive = Some(VersionDirective {
                        major: *major,
                        minor: *minor,
                    });
                }
                TokenData::TagDirective { handle, prefix } => {
                    let value = TagDirective {
                        handle: mem::take(handle),
                        prefix: mem::take(prefix),
                    };
                    let mark = token.start_mark;
                    self.append_tag_directive(value.clone(), false, mark)?;
                    tag_directives.push(value);
                }
                TokenData::ReservedDirective { .. } => {
                    // Already surfaced as a `Warning` by the scanner; no
                    // further effect on the document.
                }
                _ => break,
            }
            self.skip_token();
            token = self.peek_token_mut()?;
        }

        let start_mark = token.start_mark;
        for default_tag_directive in default_tag_directives {
            self.append_tag_directive(default_tag_directive, true, start_mark)?;
        }

        if let Some(version_directive_ref) = version_directive_ref {
            *version_directive_ref = version_directive;
        }
        if let Some(tag_directives_ref) = tag_directives_ref {
            *tag_directives_ref = tag_directives;
        }

        Ok(())
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
        mark: Position,
    ) -> Result<(), ParserError> {
        for tag_directive in &self.tag_directives {
            if value.handle == tag_directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Self::err("found duplicate %TAG directive", mark);
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    fn events(input: &[u8]) -> Vec<EventData> {
        let mut parser = Parser::new(Reader::from_slice(input));
        let mut out = Vec::new();
        loop {
            let event = parser.parse().unwrap();
            let done = matches!(event.data, EventData::StreamEnd);
            out.push(event.data);
            if done {
                break;
            }
        }
        out
    }

    fn scalar_value(data: &EventData) -> &str {
        match data {
            EventData::Scalar { value, .. } => value,
            other => panic!("expected a scalar event, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_simple_block_mapping() {
        let out = events(b"foo: bar\n");
        assert!(matches!(out[0], EventData::StreamStart { .. }));
        assert!(matches!(out[1], EventData::DocumentStart { .. }));
        assert!(matches!(out[2], EventData::MappingStart { .. }));
        assert_eq!(scalar_value(&out[3]), "foo");
        assert_eq!(scalar_value(&out[4]), "bar");
        assert!(matches!(out[5], EventData::MappingEnd));
        assert!(matches!(out[6], EventData::DocumentEnd { .. }));
        assert!(matches!(out[7], EventData::StreamEnd));
    }

    #[test]
    fn parses_a_flow_sequence() {
        let out = events(b"[1, 2, 3]\n");
        assert!(matches!(out[2], EventData::SequenceStart { .. }));
        assert_eq!(scalar_value(&out[3]), "1");
        assert_eq!(scalar_value(&out[4]), "2");
        assert_eq!(scalar_value(&out[5]), "3");
        assert!(matches!(out[6], EventData::SequenceEnd));
    }

    #[test]
    fn resolves_an_alias_to_its_anchor() {
        let mut parser = Parser::new(Reader::from_slice(b"[&a 1, *a]\n"));
        let mut anchor = None;
        let mut alias = None;
        let mut name = None;
        loop {
            let event = parser.parse().unwrap();
            match &event.data {
                EventData::Scalar { anchor: Some(id), .. } => {
                    anchor = Some(*id);
                    name = parser.anchors().name(*id).map(str::to_owned);
                }
                EventData::Alias { anchor: id } => alias = Some(*id),
                EventData::StreamEnd => break,
                _ => {}
            }
        }
        assert_eq!(anchor, alias);
        assert_eq!(name.as_deref(), Some("a"));
    }

    #[test]
    fn empty_input_is_just_stream_start_and_end() {
        let out = events(b"");
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], EventData::StreamStart { .. }));
        assert!(matches!(out[1], EventData::StreamEnd));
    }

    #[test]
    fn bare_document_marker_starts_an_explicit_document() {
        let out = events(b"---\nfoo\n");
        let EventData::DocumentStart { implicit, .. } = &out[1] else {
            panic!("expected a document-start event");
        };
        assert!(!implicit);
        assert_eq!(scalar_value(&out[2]), "foo");
    }

    #[test]
    fn untagged_scalars_carry_the_non_specific_question_tag() {
        let mut parser = Parser::new(Reader::from_slice(b"bar\n"));
        let registry_question = parser.tag_registry().non_specific_question();
        loop {
            let event = parser.parse().unwrap();
            if let EventData::Scalar { tag, .. } = &event.data {
                assert_eq!(*tag, registry_question);
            }
            if matches!(event.data, EventData::StreamEnd) {
                break;
            }
        }
    }

    #[test]
    fn rejects_an_alias_to_an_undefined_anchor() {
        let mut parser = Parser::new(Reader::from_slice(b"*missing\n"));
        let err = loop {
            match parser.parse() {
                Ok(event) if matches!(event.data, EventData::StreamEnd) => panic!("expected an error"),
                Ok(_) => continue,
                Err(err) => break err,
            }
        };
        assert!(matches!(err, ParserError::UndefinedAlias { .. }));
    }
}

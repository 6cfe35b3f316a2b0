//! Consumes an event stream and writes YAML bytes.
//!
//! A per-event state machine mirrors the parser's grammar in reverse:
//! a scalar analysis pass inspects each value's characters to decide
//! which styles remain legal, style selection picks the most compact one
//! the requested style and that analysis allow, and four scalar writers
//! (plain, single-quoted, double-quoted, literal/folded) produce the
//! bytes. Tags and anchors are resolved against a [`TagRegistry`] and the
//! parser's anchor table rather than carried as raw strings.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::anchor::AnchorId;
use crate::error::{PresenterError, StreamError};
use crate::event::{Event, EventData};
use crate::event_stream::EventStream;
use crate::macros::{is_alpha, is_ascii, is_blank, is_break, is_breakz, is_printable, is_space};
use crate::tag_registry::{TagId, TagRegistry};
use crate::writer::Writer;
use crate::{Encoding, LineBreak, MappingStyle, ScalarStyle, SequenceStyle, TagDirective, VersionDirective};

/// How the presenter decides which nodes get an `&anchor` definition.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnchorStyle {
    /// Never emit anchors or aliases; every alias is expanded into a copy
    /// of the subtree it refers to.
    None,
    /// Anchor only the nodes actually referenced by an alias. Requires
    /// buffering a whole document's events before any of them are
    /// written.
    #[default]
    Tidy,
    /// Anchor every node that carries an anchor id, whether or not it is
    /// ever aliased.
    Always,
}

/// The overall presentation style.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresentationStyle {
    /// Prefer the most compact representation permitted by each node's
    /// analysis (e.g. flow collections over block when a collection's
    /// style is left unspecified).
    Minimal,
    /// Ordinary presentation: block collections and the narrowest
    /// adequate scalar style.
    #[default]
    Default,
    /// Every scalar double-quoted and explicitly tagged; every
    /// collection flow-style.
    Canonical,
    /// Flow-only collections with double-quoted mapping keys, suitable
    /// for a strict JSON consumer.
    Json,
    /// Never select flow style for a collection at the top of the
    /// document tree, even when the event requests it or the collection
    /// is empty. Collections nested inside an already-flow ancestor stay
    /// flow, since YAML has no block-in-flow production.
    BlockOnly,
}

/// Which `%YAML` directive, if any, the presenter synthesizes for a
/// document whose `DocumentStart` event carries none.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputVersion {
    /// Never synthesize a `%YAML` directive.
    #[default]
    None,
    /// Write `%YAML 1.1` for documents that don't request a version.
    V1_1,
    /// Write `%YAML 1.2` for documents that don't request a version.
    V1_2,
}

/// Presenter configuration.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct PresenterConfig {
    /// The overall presentation style.
    pub style: PresentationStyle,
    /// Spaces added per block nesting level. Clamped to `2..=9` at
    /// stream-start.
    pub indentation_step: i64,
    /// The column past which the presenter prefers to break a line, or
    /// `None` for no limit.
    pub max_line_width: Option<i64>,
    /// Whether and which `%YAML` directive to synthesize when a document
    /// doesn't request one.
    pub output_version: OutputVersion,
    /// The line-break style used for every line break the presenter
    /// writes, including inside block scalars.
    pub line_break: LineBreak,
    /// `%TAG` directives written for every document in addition to
    /// whatever the `DocumentStart` event itself carries.
    pub tag_handles: Vec<(String, String)>,
    /// How anchors are emitted.
    pub anchor_style: AnchorStyle,
    /// Whether non-ASCII printable characters may be written as-is
    /// (`true`) or must be escaped in double-quoted scalars (`false`).
    pub unicode: bool,
    /// In [`PresentationStyle::Json`], fail with
    /// [`PresenterError::Json`] if a mapping key does not carry the
    /// `!!str` tag (or no explicit tag at all).
    pub json_strict: bool,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        PresenterConfig {
            style: PresentationStyle::default(),
            indentation_step: 2,
            max_line_width: Some(80),
            output_version: OutputVersion::default(),
            line_break: LineBreak::default().resolve(),
            tag_handles: Vec::new(),
            anchor_style: AnchorStyle::default(),
            unicode: true,
            json_strict: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PresenterState {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    BlockSequenceFirstItem,
    BlockSequenceItem,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    End,
}

struct AnchorAnalysis {
    name: String,
    alias: bool,
}

struct TagAnalysis {
    handle: String,
    suffix: String,
}

struct ScalarAnalysis<'a> {
    value: &'a str,
    multiline: bool,
    flow_plain_allowed: bool,
    block_plain_allowed: bool,
    single_quoted_allowed: bool,
    block_allowed: bool,
    style: ScalarStyle,
}

#[derive(Default)]
struct Analysis<'a> {
    anchor: Option<AnchorAnalysis>,
    tag: Option<TagAnalysis>,
    scalar: Option<ScalarAnalysis<'a>>,
}

/// Walks an [`EventStream`] (or any caller-supplied sequence of events)
/// and writes the YAML text it describes.
pub struct Presenter<'w, 'r> {
    writer: Writer<'w>,
    config: PresenterConfig,
    tag_registry: &'r TagRegistry,
    state: PresenterState,
    states: Vec<PresenterState>,
    events: VecDeque<Event>,
    document_prepared: bool,
    indent: i64,
    indents: Vec<i64>,
    flow_level: u32,
    tag_directives: Vec<TagDirective>,
    anchor_names: HashMap<AnchorId, String>,
    anchor_counter: u32,
    line: u64,
    column: i64,
    whitespace: bool,
    indention: bool,
    open_ended: u8,
    sequence_context: bool,
    mapping_context: bool,
    simple_key_context: bool,
    key_context: bool,
}

impl<'w, 'r> Presenter<'w, 'r> {
    /// Build a presenter writing through `writer`, resolving tags against
    /// `tag_registry`.
    #[must_use]
    pub fn new(writer: Writer<'w>, config: PresenterConfig, tag_registry: &'r TagRegistry) -> Self {
        Presenter {
            writer,
            config,
            tag_registry,
            state: PresenterState::StreamStart,
            states: Vec::new(),
            events: VecDeque::new(),
            document_prepared: false,
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            tag_directives: Vec::new(),
            anchor_names: HashMap::new(),
            anchor_counter: 0,
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: 0,
            sequence_context: false,
            mapping_context: false,
            simple_key_context: false,
            key_context: false,
        }
    }

    /// Drain `stream` and present every event it produces.
    ///
    /// # Errors
    ///
    /// Propagates a [`StreamError`] from the underlying stream, or wraps
    /// a [`PresenterError`] raised while presenting.
    pub fn present_all(&mut self, stream: &mut dyn EventStream) -> Result<(), StreamError> {
        while let Some(event) = stream.next()? {
            self.emit(event)?;
        }
        Ok(())
    }

    /// Present a single event. The terminal `stream-end` event flushes
    /// the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`PresenterError`] if the event stream violates an
    /// invariant (misnested collections, an unexpected event kind in the
    /// current state) or the byte sink reports a write failure.
    pub fn emit(&mut self, event: Event) -> Result<(), PresenterError> {
        self.events.push_back(event);
        loop {
            if self.config.anchor_style != AnchorStyle::Always && !self.document_prepared {
                if matches!(
                    self.events.front().map(|e| &e.data),
                    Some(EventData::DocumentStart { .. })
                ) {
                    if !Self::document_complete(&self.events) {
                        return Ok(());
                    }
                    self.prepare_document_anchors();
                    self.document_prepared = true;
                } else if matches!(
                    self.events.front().map(|e| &e.data),
                    Some(EventData::StreamEnd)
                ) {
                    // No document wrapper (a bare STREAM-END after STREAM-START):
                    // nothing to prepare.
                }
            }

            let Some(event) = self.next_ready_event() else {
                break;
            };
            if matches!(event.data, EventData::DocumentEnd { .. }) {
                self.document_prepared = false;
            }

            let tag_directives = self.tag_directives.clone();
            let mut analysis = self.analyze_event(&event, &tag_directives)?;
            self.state_machine(&event, &mut analysis)?;
        }
        Ok(())
    }

    // ---- event buffering -------------------------------------------------

    fn document_complete(events: &VecDeque<Event>) -> bool {
        let mut level = 0i32;
        for event in events {
            match event.data {
                EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::DocumentEnd { .. } | EventData::SequenceEnd | EventData::MappingEnd => {
                    level -= 1;
                    if level == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Pops the front event once there's either enough lookahead buffered
    /// to make an empty-collection decision, or the whole nested
    /// structure starting at the front is present.
    fn next_ready_event(&mut self) -> Option<Event> {
        let accumulate = match self.events.front()?.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return self.events.pop_front(),
        };

        if self.events.len() > accumulate {
            return self.events.pop_front();
        }

        let mut level = 0;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                _ => {}
            }
            if level == 0 {
                return self.events.pop_front();
            }
        }
        None
    }

    /// Rewrite the buffered document in place according to
    /// [`AnchorStyle::Tidy`] or [`AnchorStyle::None`]. Only called once
    /// the whole document (`DocumentStart` through its matching
    /// `DocumentEnd`) is present in `self.events`.
    fn prepare_document_anchors(&mut self) {
        self.events.make_contiguous();
        let mut level = 0i32;
        let mut end = 0usize;
        for (i, event) in self.events.iter().enumerate() {
            match event.data {
                EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::DocumentEnd { .. } | EventData::SequenceEnd | EventData::MappingEnd => {
                    level -= 1;
                    if level == 0 {
                        end = i;
                        break;
                    }
                }
                _ => {}
            }
        }
        let doc: Vec<Event> = self.events.drain(0..=end).collect();
        let doc = match self.config.anchor_style {
            AnchorStyle::Tidy => {
                let referenced = Self::collect_referenced_anchors(&doc);
                doc.into_iter()
                    .map(|event| Self::clear_unreferenced_anchor(event, &referenced))
                    .collect()
            }
            AnchorStyle::None => {
                let mut anchors = HashMap::new();
                let mut out = Vec::with_capacity(doc.len());
                Self::expand_events(&doc, &mut anchors, &mut out);
                out
            }
            AnchorStyle::Always => doc,
        };
        for event in doc.into_iter().rev() {
            self.events.push_front(event);
        }
    }

    fn collect_referenced_anchors(doc: &[Event]) -> HashSet<AnchorId> {
        doc.iter()
            .filter_map(|event| match &event.data {
                EventData::Alias { anchor } => Some(*anchor),
                _ => None,
            })
            .collect()
    }

    fn clear_unreferenced_anchor(mut event: Event, referenced: &HashSet<AnchorId>) -> Event {
        let anchor = match &mut event.data {
            EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => anchor,
            _ => return event,
        };
        if let Some(id) = *anchor {
            if !referenced.contains(&id) {
                *anchor = None;
            }
        }
        event
    }

    fn node_anchor(data: &EventData) -> Option<AnchorId> {
        match data {
            EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => *anchor,
            _ => None,
        }
    }

    fn stripped(mut event: Event) -> Event {
        match &mut event.data {
            EventData::Scalar { anchor, .. }
            | EventData::SequenceStart { anchor, .. }
            | EventData::MappingStart { anchor, .. } => *anchor = None,
            _ => {}
        }
        event
    }

    /// Expand a flat, well-formed event sequence (a document, or a
    /// recorded subtree standing in for an alias) with every alias
    /// replaced by a copy of the subtree it names, and every anchor
    /// field cleared. Used by [`AnchorStyle::None`].
    fn expand_events(events: &[Event], anchors: &mut HashMap<AnchorId, Vec<Event>>, out: &mut Vec<Event>) {
        let mut pos = 0usize;
        while pos < events.len() {
            match &events[pos].data {
                EventData::Alias { anchor } => {
                    if let Some(span) = anchors.get(anchor).cloned() {
                        Self::expand_events(&span, anchors, out);
                    } else {
                        out.push(events[pos].clone());
                    }
                    pos += 1;
                }
                EventData::SequenceStart { .. } | EventData::MappingStart { .. } => {
                    let start = pos;
                    let mut level = 1i32;
                    pos += 1;
                    while level > 0 {
                        match events[pos].data {
                            EventData::SequenceStart { .. } | EventData::MappingStart { .. } => {
                                level += 1;
                            }
                            EventData::SequenceEnd | EventData::MappingEnd => level -= 1,
                            _ => {}
                        }
                        pos += 1;
                    }
                    let span = events[start..pos].to_vec();
                    if let Some(id) = Self::node_anchor(&span[0].data) {
                        anchors.insert(id, span.clone());
                    }
                    out.push(Self::stripped(span[0].clone()));
                    Self::expand_events(&span[1..span.len() - 1], anchors, out);
                    out.push(span[span.len() - 1].clone());
                }
                _ => {
                    if let Some(id) = Self::node_anchor(&events[pos].data) {
                        anchors.insert(id, vec![events[pos].clone()]);
                    }
                    out.push(Self::stripped(events[pos].clone()));
                    pos += 1;
                }
            }
        }
    }

    // ---- anchor / tag resolution ------------------------------------------

    fn anchor_name(&mut self, id: AnchorId) -> String {
        if let Some(name) = self.anchor_names.get(&id) {
            return name.clone();
        }
        self.anchor_counter += 1;
        let name = format!("id{:03}", self.anchor_counter);
        self.anchor_names.insert(id, name.clone());
        name
    }

    fn node_has_explicit_tag(&self, id: TagId) -> bool {
        id != self.tag_registry.non_specific_bang() && id != self.tag_registry.non_specific_question()
    }

    fn analyze_anchor(&mut self, id: Option<AnchorId>, alias: bool) -> Option<AnchorAnalysis> {
        id.map(|id| AnchorAnalysis {
            name: self.anchor_name(id),
            alias,
        })
    }

    fn analyze_tag(&self, id: TagId, tag_directives: &[TagDirective]) -> Result<Option<TagAnalysis>, PresenterError> {
        if !self.node_has_explicit_tag(id) {
            return Ok(None);
        }
        let uri = self
            .tag_registry
            .uri(id)
            .ok_or(PresenterError::Problem("tag id not registered"))?;
        let mut handle = String::new();
        let mut suffix = uri.to_owned();
        for directive in tag_directives {
            let prefix_len = directive.prefix.len();
            if prefix_len < uri.len() && directive.prefix.as_str() == &uri[..prefix_len] {
                handle = directive.handle.clone();
                suffix = uri[prefix_len..].to_owned();
                break;
            }
        }
        Ok(Some(TagAnalysis { handle, suffix }))
    }

    fn analyze_version_directive(&self, version_directive: VersionDirective) -> Result<(), PresenterError> {
        if version_directive.major != 1 || (version_directive.minor != 1 && version_directive.minor != 2) {
            return Err(PresenterError::Problem("incompatible %YAML directive"));
        }
        Ok(())
    }

    fn analyze_tag_directive(&self, tag_directive: &TagDirective) -> Result<(), PresenterError> {
        if tag_directive.handle.is_empty() {
            return Err(PresenterError::Problem("tag handle must not be empty"));
        }
        if !tag_directive.handle.starts_with('!') || !tag_directive.handle.ends_with('!') {
            return Err(PresenterError::Problem("tag handle must start and end with '!'"));
        }
        if tag_directive.handle.len() > 2 {
            let content = &tag_directive.handle[1..tag_directive.handle.len() - 1];
            if !content.chars().all(is_alpha) {
                return Err(PresenterError::Problem(
                    "tag handle must contain alphanumerical characters only",
                ));
            }
        }
        if tag_directive.prefix.is_empty() {
            return Err(PresenterError::Problem("tag prefix must not be empty"));
        }
        Ok(())
    }

    fn append_tag_directive(&mut self, value: TagDirective, allow_duplicates: bool) -> Result<(), PresenterError> {
        for directive in &self.tag_directives {
            if value.handle == directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Err(PresenterError::Problem("duplicate %TAG directive"));
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }

    fn analyze_scalar<'a>(&self, value: &'a str) -> ScalarAnalysis<'a> {
        if value.is_empty() {
            return ScalarAnalysis {
                value: "",
                multiline: false,
                flow_plain_allowed: false,
                block_plain_allowed: true,
                single_quoted_allowed: true,
                block_allowed: false,
                style: ScalarStyle::Any,
            };
        }

        let mut block_indicators = value.starts_with("---") || value.starts_with("...");
        let mut flow_indicators = block_indicators;
        let mut line_breaks = false;
        let mut special_characters = false;
        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;
        let mut preceded_by_whitespace = true;
        let mut previous_space = false;
        let mut previous_break = false;
        let mut first = true;

        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let followed_by_whitespace = next.is_none() || is_break(next) || is_blank(next);
            if first {
                match ch {
                    '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@'
                    | '`' => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    '?' | ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '-' if followed_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            } else {
                match ch {
                    ',' | '?' | '[' | ']' | '{' | '}' => flow_indicators = true,
                    ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '#' if preceded_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            }

            if !is_printable(ch) || (!is_ascii(ch) && !self.config.unicode) {
                special_characters = true;
            }
            if is_break(ch) {
                line_breaks = true;
            }

            if is_space(ch) {
                if first {
                    leading_space = true;
                }
                if next.is_none() {
                    trailing_space = true;
                }
                if previous_break {
                    break_space = true;
                }
                previous_space = true;
                previous_break = false;
            } else if is_break(ch) {
                if first {
                    leading_break = true;
                }
                if next.is_none() {
                    trailing_break = true;
                }
                if previous_space {
                    space_break = true;
                }
                previous_space = false;
                previous_break = true;
            } else {
                previous_space = false;
                previous_break = false;
            }

            preceded_by_whitespace = is_blank(ch) || is_breakz(next);
            first = false;
        }

        let mut analysis = ScalarAnalysis {
            value,
            multiline: line_breaks,
            flow_plain_allowed: true,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: true,
            style: ScalarStyle::Any,
        };

        if leading_space || leading_break || trailing_space || trailing_break {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if trailing_space {
            analysis.block_allowed = false;
        }
        if break_space {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
        }
        if space_break || special_characters {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
            analysis.block_allowed = false;
        }
        if line_breaks {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if flow_indicators {
            analysis.flow_plain_allowed = false;
        }
        if block_indicators {
            analysis.block_plain_allowed = false;
        }
        analysis
    }

    fn analyze_event<'a>(
        &mut self,
        event: &'a Event,
        tag_directives: &[TagDirective],
    ) -> Result<Analysis<'a>, PresenterError> {
        let canonical = self.config.style == PresentationStyle::Canonical;
        let mut analysis = Analysis::default();

        match &event.data {
            EventData::Alias { anchor } => {
                analysis.anchor = self.analyze_anchor(Some(*anchor), true);
            }
            EventData::Scalar {
                anchor,
                tag,
                value,
                plain_implicit,
                quoted_implicit,
                ..
            } => {
                analysis.anchor = self.analyze_anchor(*anchor, false);
                if self.node_has_explicit_tag(*tag) && (canonical || (!*plain_implicit && !*quoted_implicit)) {
                    analysis.tag = self.analyze_tag(*tag, tag_directives)?;
                }
                analysis.scalar = Some(self.analyze_scalar(value));
            }
            EventData::SequenceStart { anchor, tag, implicit, .. } => {
                analysis.anchor = self.analyze_anchor(*anchor, false);
                if self.node_has_explicit_tag(*tag) && (canonical || !*implicit) {
                    analysis.tag = self.analyze_tag(*tag, tag_directives)?;
                }
            }
            EventData::MappingStart { anchor, tag, implicit, .. } => {
                analysis.anchor = self.analyze_anchor(*anchor, false);
                if self.node_has_explicit_tag(*tag) && (canonical || !*implicit) {
                    analysis.tag = self.analyze_tag(*tag, tag_directives)?;
                }
            }
            _ => {}
        }

        Ok(analysis)
    }

    // ---- low-level writing -------------------------------------------------

    fn put(&mut self, byte: u8) -> Result<(), PresenterError> {
        self.writer.write_char(char::from(byte))?;
        self.column += 1;
        Ok(())
    }

    fn put_break(&mut self) -> Result<(), PresenterError> {
        self.writer.write_str(self.config.line_break.as_str())?;
        self.column = 0;
        self.line += 1;
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), PresenterError> {
        for ch in s.chars() {
            self.write_char(ch)?;
        }
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), PresenterError> {
        self.writer.write_char(ch)?;
        self.column += 1;
        Ok(())
    }

    fn write_break_char(&mut self, ch: char) -> Result<(), PresenterError> {
        if ch == '\n' {
            self.put_break()
        } else {
            self.write_char(ch)?;
            self.column = 0;
            self.line += 1;
            Ok(())
        }
    }

    fn line_width_exceeded(&self) -> bool {
        match self.config.max_line_width {
            Some(width) => self.column > width,
            None => false,
        }
    }

    fn write_indent(&mut self) -> Result<(), PresenterError> {
        let indent = if self.indent >= 0 { self.indent } else { 0 };
        if !self.indention || self.column > indent || (self.column == indent && !self.whitespace) {
            self.put_break()?;
        }
        while self.column < indent {
            self.put(b' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<(), PresenterError> {
        if need_whitespace && !self.whitespace {
            self.put(b' ')?;
        }
        self.write_str(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn write_anchor(&mut self, name: &str) -> Result<(), PresenterError> {
        self.write_str(name)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_handle(&mut self, value: &str) -> Result<(), PresenterError> {
        if !self.whitespace {
            self.put(b' ')?;
        }
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_content(&mut self, value: &str, need_whitespace: bool) -> Result<(), PresenterError> {
        if need_whitespace && !self.whitespace {
            self.put(b' ')?;
        }
        for ch in value.chars() {
            if is_alpha(ch) {
                self.write_char(ch)?;
                continue;
            }
            if matches!(
                ch,
                ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '_' | '.' | '~' | '*' | '\'' | '(' | ')'
                    | '[' | ']'
            ) {
                self.write_char(ch)?;
                continue;
            }
            let mut buf = [0u8; 4];
            let encoded = ch.encode_utf8(&mut buf);
            for byte in encoded.bytes() {
                let upper = (byte >> 4) + if (byte >> 4) < 10 { b'0' } else { b'A' - 10 };
                let lower = (byte & 0x0F) + if (byte & 0x0F) < 10 { b'0' } else { b'A' - 10 };
                self.put(b'%')?;
                self.put(upper)?;
                self.put(lower)?;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_bom(&mut self) -> Result<(), PresenterError> {
        self.writer.write_char('\u{feff}')?;
        Ok(())
    }

    fn write_plain_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), PresenterError> {
        let mut spaces = false;
        let mut breaks = false;
        if !self.whitespace && (!value.is_empty() || self.flow_level != 0) {
            self.put(b' ')?;
        }
        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            if is_space(ch) {
                if allow_breaks && !spaces && self.line_width_exceeded() && !is_space(next) {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_single_quoted_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), PresenterError> {
        let mut spaces = false;
        let mut breaks = false;
        self.write_indicator("'", true, false, false)?;
        let mut chars = value.chars();
        let mut is_first = true;
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let is_last = next.is_none();
            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.line_width_exceeded()
                    && !is_first
                    && !is_last
                    && !is_space(next)
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.put(b'\'')?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
            is_first = false;
        }
        if breaks {
            self.write_indent()?;
        }
        self.write_indicator("'", false, false, false)
    }

    fn write_double_quoted_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), PresenterError> {
        let mut spaces = false;
        self.write_indicator("\"", true, false, false)?;
        let mut chars = value.chars();
        let mut first = true;
        while let Some(ch) = chars.next() {
            if !is_printable(ch) || (!self.config.unicode && !is_ascii(ch)) || ch == '\u{feff}' || is_break(ch)
                || ch == '"'
                || ch == '\\'
            {
                self.put(b'\\')?;
                match ch {
                    '\0' => self.put(b'0')?,
                    '\x07' => self.put(b'a')?,
                    '\x08' => self.put(b'b')?,
                    '\x09' => self.put(b't')?,
                    '\x0A' => self.put(b'n')?,
                    '\x0B' => self.put(b'v')?,
                    '\x0C' => self.put(b'f')?,
                    '\x0D' => self.put(b'r')?,
                    '\x1B' => self.put(b'e')?,
                    '\x22' => self.put(b'"')?,
                    '\x5C' => self.put(b'\\')?,
                    '\u{0085}' => self.put(b'N')?,
                    '\u{00A0}' => self.put(b'_')?,
                    '\u{2028}' => self.put(b'L')?,
                    '\u{2029}' => self.put(b'P')?,
                    _ => {
                        let (prefix, width) = if ch <= '\u{00ff}' {
                            (b'x', 2)
                        } else if ch <= '\u{ffff}' {
                            (b'u', 4)
                        } else {
                            (b'U', 8)
                        };
                        self.put(prefix)?;
                        let mut k = (width - 1) * 4;
                        let value = ch as u32;
                        loop {
                            let digit = (value >> k) & 0x0F;
                            let digit_char = char::from_digit(digit, 16)
                                .unwrap_or('0')
                                .to_ascii_uppercase();
                            self.put(digit_char as u8)?;
                            if k == 0 {
                                break;
                            }
                            k -= 4;
                        }
                    }
                }
                spaces = false;
            } else if is_space(ch) {
                if allow_breaks && !spaces && self.line_width_exceeded() && !first && chars.clone().next().is_some()
                {
                    self.write_indent()?;
                    if is_space(chars.clone().next()) {
                        self.put(b'\\')?;
                    }
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else {
                self.write_char(ch)?;
                spaces = false;
            }
            first = false;
        }
        self.write_indicator("\"", false, false, false)
    }

    fn write_block_scalar_hints(&mut self, string: &str) -> Result<(), PresenterError> {
        let mut chomp_hint: Option<&str> = None;
        let first = string.chars().next();
        if is_space(first) || is_break(first) {
            let digit = char::from_digit(self.config.indentation_step as u32, 10).unwrap_or('2');
            let mut buf = [0u8; 1];
            let indent_hint = digit.encode_utf8(&mut buf);
            self.write_indicator(indent_hint, false, false, false)?;
        }
        self.open_ended = 0;

        if string.is_empty() {
            chomp_hint = Some("-");
        } else {
            let mut rev = string.chars().rev();
            let last = rev.next();
            let before_last = rev.next();
            if !is_break(last) {
                chomp_hint = Some("-");
            } else if is_breakz(before_last) {
                chomp_hint = Some("+");
                self.open_ended = 2;
            }
        }

        if let Some(chomp_hint) = chomp_hint {
            self.write_indicator(chomp_hint, false, false, false)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<(), PresenterError> {
        let mut breaks = true;
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        for ch in value.chars() {
            if is_break(ch) {
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<(), PresenterError> {
        let mut breaks = true;
        let mut leading_spaces = true;
        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            if is_break(ch) {
                if !breaks && !leading_spaces && ch == '\n' {
                    let mut lookahead = chars.clone();
                    while is_break(lookahead.clone().next()) {
                        lookahead.next();
                    }
                    if !is_breakz(lookahead.next()) && !is_blank(lookahead.next()) {
                        self.put_break()?;
                    }
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_blank(ch);
                }
                if !breaks && is_space(ch) && !is_space(chars.clone().next()) && self.line_width_exceeded() {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    // ---- per-event processing ----------------------------------------------

    fn process_anchor(&mut self, analysis: &Option<AnchorAnalysis>) -> Result<(), PresenterError> {
        let Some(analysis) = analysis.as_ref() else {
            return Ok(());
        };
        self.write_indicator(if analysis.alias { "*" } else { "&" }, true, false, false)?;
        self.write_anchor(&analysis.name)
    }

    fn process_tag(&mut self, analysis: &Option<TagAnalysis>) -> Result<(), PresenterError> {
        let Some(analysis) = analysis.as_ref() else {
            return Ok(());
        };
        if analysis.handle.is_empty() && analysis.suffix.is_empty() {
            return Ok(());
        }
        if analysis.handle.is_empty() {
            self.write_indicator("!<", true, false, false)?;
            self.write_tag_content(&analysis.suffix, false)?;
            self.write_indicator(">", false, false, false)
        } else {
            self.write_tag_handle(&analysis.handle.clone())?;
            if !analysis.suffix.is_empty() {
                self.write_tag_content(&analysis.suffix.clone(), false)?;
            }
            Ok(())
        }
    }

    fn process_scalar(&mut self, analysis: &ScalarAnalysis) -> Result<(), PresenterError> {
        let allow_breaks = !self.simple_key_context;
        match analysis.style {
            ScalarStyle::Plain => self.write_plain_scalar(analysis.value, allow_breaks),
            ScalarStyle::SingleQuoted => self.write_single_quoted_scalar(analysis.value, allow_breaks),
            ScalarStyle::DoubleQuoted => self.write_double_quoted_scalar(analysis.value, allow_breaks),
            ScalarStyle::Literal => self.write_literal_scalar(analysis.value),
            ScalarStyle::Folded => self.write_folded_scalar(analysis.value),
            ScalarStyle::Any => unreachable!("scalar style must be resolved before writing"),
        }
    }

    fn select_scalar_style(
        &self,
        plain_implicit: bool,
        quoted_implicit: bool,
        requested: ScalarStyle,
        scalar: &mut ScalarAnalysis,
        tag: &mut Option<TagAnalysis>,
    ) -> Result<(), PresenterError> {
        let no_tag = tag.is_none();
        if no_tag && !plain_implicit && !quoted_implicit {
            return Err(PresenterError::Problem("neither tag nor implicit flags are specified"));
        }

        let mut style = requested;
        if style == ScalarStyle::Any {
            style = ScalarStyle::Plain;
        }
        let canonical = self.config.style == PresentationStyle::Canonical;
        if canonical {
            style = ScalarStyle::DoubleQuoted;
        }
        if self.simple_key_context && scalar.multiline {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::Plain {
            if self.config.style == PresentationStyle::Json && self.key_context {
                style = ScalarStyle::DoubleQuoted;
            } else if self.flow_level != 0 && !scalar.flow_plain_allowed
                || self.flow_level == 0 && !scalar.block_plain_allowed
            {
                style = ScalarStyle::SingleQuoted;
            }
            if scalar.value.is_empty() && (self.flow_level != 0 || self.simple_key_context) {
                style = ScalarStyle::SingleQuoted;
            }
            if no_tag && !plain_implicit {
                style = ScalarStyle::SingleQuoted;
            }
        }
        if style == ScalarStyle::SingleQuoted && !scalar.single_quoted_allowed {
            style = ScalarStyle::DoubleQuoted;
        }
        if (style == ScalarStyle::Literal || style == ScalarStyle::Folded)
            && (!scalar.block_allowed || self.flow_level != 0 || self.simple_key_context)
        {
            style = ScalarStyle::DoubleQuoted;
        }
        if no_tag && !quoted_implicit && style != ScalarStyle::Plain {
            *tag = Some(TagAnalysis {
                handle: "!".to_owned(),
                suffix: String::new(),
            });
        }
        scalar.style = style;
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.config.indentation_step } else { 0 };
        } else if !indentless {
            self.indent += self.config.indentation_step;
        }
    }

    fn check_empty_sequence(&self, event: &Event) -> bool {
        let Some(next) = self.events.front() else {
            return false;
        };
        matches!(event.data, EventData::SequenceStart { .. }) && matches!(next.data, EventData::SequenceEnd)
    }

    fn check_empty_mapping(&self, event: &Event) -> bool {
        let Some(next) = self.events.front() else {
            return false;
        };
        matches!(event.data, EventData::MappingStart { .. }) && matches!(next.data, EventData::MappingEnd)
    }

    fn check_simple_key(&self, event: &Event, analysis: &Analysis) -> bool {
        let mut length = analysis.anchor.as_ref().map_or(0, |a| a.name.len())
            + analysis
                .tag
                .as_ref()
                .map_or(0, |t| t.handle.len() + t.suffix.len());

        match &event.data {
            EventData::Alias { .. } => {
                length = analysis.anchor.as_ref().map_or(0, |a| a.name.len());
            }
            EventData::Scalar { .. } => {
                let Some(scalar) = analysis.scalar.as_ref() else {
                    return false;
                };
                if scalar.multiline {
                    return false;
                }
                length += scalar.value.len();
            }
            EventData::SequenceStart { .. } => {
                if !self.check_empty_sequence(event) {
                    return false;
                }
            }
            EventData::MappingStart { .. } => {
                if !self.check_empty_mapping(event) {
                    return false;
                }
            }
            _ => return false,
        }

        length <= 128
    }

    // ---- state machine -----------------------------------------------------

    fn state_machine(&mut self, event: &Event, analysis: &mut Analysis) -> Result<(), PresenterError> {
        match self.state {
            PresenterState::StreamStart => self.emit_stream_start(event),
            PresenterState::FirstDocumentStart => self.emit_document_start(event, true),
            PresenterState::DocumentStart => self.emit_document_start(event, false),
            PresenterState::DocumentContent => self.emit_document_content(event, analysis),
            PresenterState::DocumentEnd => self.emit_document_end(event),
            PresenterState::FlowSequenceFirstItem => self.emit_flow_sequence_item(event, true, analysis),
            PresenterState::FlowSequenceItem => self.emit_flow_sequence_item(event, false, analysis),
            PresenterState::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true, analysis),
            PresenterState::FlowMappingKey => self.emit_flow_mapping_key(event, false, analysis),
            PresenterState::FlowMappingSimpleValue => self.emit_flow_mapping_value(event, true, analysis),
            PresenterState::FlowMappingValue => self.emit_flow_mapping_value(event, false, analysis),
            PresenterState::BlockSequenceFirstItem => self.emit_block_sequence_item(event, true, analysis),
            PresenterState::BlockSequenceItem => self.emit_block_sequence_item(event, false, analysis),
            PresenterState::BlockMappingFirstKey => self.emit_block_mapping_key(event, true, analysis),
            PresenterState::BlockMappingKey => self.emit_block_mapping_key(event, false, analysis),
            PresenterState::BlockMappingSimpleValue => self.emit_block_mapping_value(event, true, analysis),
            PresenterState::BlockMappingValue => self.emit_block_mapping_value(event, false, analysis),
            PresenterState::End => Err(PresenterError::Problem("expected nothing after STREAM-END")),
        }
    }

    fn emit_stream_start(&mut self, event: &Event) -> Result<(), PresenterError> {
        let EventData::StreamStart { .. } = &event.data else {
            return Err(PresenterError::Problem("expected STREAM-START"));
        };
        self.open_ended = 0;
        if self.config.indentation_step < 2 || self.config.indentation_step > 9 {
            self.config.indentation_step = 2;
        }
        self.indent = -1;
        self.line = 0;
        self.column = 0;
        self.whitespace = true;
        self.indention = true;
        if self.writer.encoding() != Encoding::Utf8 {
            self.write_bom()?;
        }
        self.state = PresenterState::FirstDocumentStart;
        Ok(())
    }

    fn emit_document_start(&mut self, event: &Event, first: bool) -> Result<(), PresenterError> {
        let canonical = self.config.style == PresentationStyle::Canonical;
        match &event.data {
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit,
            } => {
                let mut implicit = *implicit;
                let version_directive = version_directive.or(match self.config.output_version {
                    crate::presenter::OutputVersion::V1_1 => Some(VersionDirective { major: 1, minor: 1 }),
                    crate::presenter::OutputVersion::V1_2 => Some(VersionDirective { major: 1, minor: 2 }),
                    crate::presenter::OutputVersion::None => None,
                });

                let mut directives = tag_directives.clone();
                for (handle, prefix) in self.config.tag_handles.clone() {
                    if !directives.iter().any(|d| d.handle == handle) {
                        directives.push(TagDirective { handle, prefix });
                    }
                }

                if let Some(version_directive) = version_directive {
                    self.analyze_version_directive(version_directive)?;
                }
                for directive in &directives {
                    self.analyze_tag_directive(directive)?;
                    self.append_tag_directive(directive.clone(), false)?;
                }
                let default_tag_directives = [
                    TagDirective {
                        handle: "!".to_owned(),
                        prefix: "!".to_owned(),
                    },
                    TagDirective {
                        handle: "!!".to_owned(),
                        prefix: "tag:yaml.org,2002:".to_owned(),
                    },
                ];
                for directive in default_tag_directives {
                    self.append_tag_directive(directive, true)?;
                }

                if !first || canonical {
                    implicit = false;
                }
                if (version_directive.is_some() || !directives.is_empty()) && self.open_ended != 0 {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                self.open_ended = 0;
                if let Some(version_directive) = version_directive {
                    implicit = false;
                    self.write_indicator("%YAML", true, false, false)?;
                    self.write_indicator(
                        if version_directive.minor == 1 { "1.1" } else { "1.2" },
                        true,
                        false,
                        false,
                    )?;
                    self.write_indent()?;
                }
                if !directives.is_empty() {
                    implicit = false;
                    for directive in &directives {
                        self.write_indicator("%TAG", true, false, false)?;
                        self.write_tag_handle(&directive.handle.clone())?;
                        self.write_tag_content(&directive.prefix.clone(), true)?;
                        self.write_indent()?;
                    }
                }
                if self.root_requires_explicit_marker() {
                    implicit = false;
                }
                if !implicit {
                    self.write_indent()?;
                    self.write_indicator("---", true, false, false)?;
                    if canonical {
                        self.write_indent()?;
                    }
                }
                self.state = PresenterState::DocumentContent;
                self.open_ended = 0;
                Ok(())
            }
            EventData::StreamEnd => {
                if self.open_ended == 2 {
                    self.write_indicator("...", true, false, false)?;
                    self.open_ended = 0;
                    self.write_indent()?;
                }
                self.writer.flush()?;
                self.state = PresenterState::End;
                Ok(())
            }
            _ => Err(PresenterError::Problem("expected DOCUMENT-START or STREAM-END")),
        }
    }

    /// `document-start` emits `---` when the root node has an anchor or
    /// tag. Safe to peek: by the time a `DocumentStart` event reaches the
    /// state machine, [`Presenter::next_ready_event`] has already
    /// guaranteed the whole document is buffered.
    fn root_requires_explicit_marker(&self) -> bool {
        let Some(root) = self.events.front() else {
            return false;
        };
        match &root.data {
            EventData::Scalar { anchor, tag, .. }
            | EventData::SequenceStart { anchor, tag, .. }
            | EventData::MappingStart { anchor, tag, .. } => {
                anchor.is_some() || self.node_has_explicit_tag(*tag)
            }
            _ => false,
        }
    }

    fn emit_document_content(&mut self, event: &Event, analysis: &mut Analysis) -> Result<(), PresenterError> {
        self.states.push(PresenterState::DocumentEnd);
        self.emit_node(event, true, false, false, false, analysis)
    }

    fn emit_document_end(&mut self, event: &Event) -> Result<(), PresenterError> {
        let EventData::DocumentEnd { implicit } = &event.data else {
            return Err(PresenterError::Problem("expected DOCUMENT-END"));
        };
        let implicit = *implicit;
        self.write_indent()?;
        if !implicit {
            self.write_indicator("...", true, false, false)?;
            self.open_ended = 0;
            self.write_indent()?;
        } else if self.open_ended == 0 {
            self.open_ended = 1;
        }
        self.writer.flush()?;
        self.state = PresenterState::DocumentStart;
        self.tag_directives.clear();
        Ok(())
    }

    fn emit_flow_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        let canonical = self.config.style == PresentationStyle::Canonical;
        if let EventData::SequenceEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().unwrap_or(-1);
            if canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.state = self.states.pop().unwrap_or(PresenterState::End);
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if canonical || self.line_width_exceeded() {
            self.write_indent()?;
        }
        self.states.push(PresenterState::FlowSequenceItem);
        self.emit_node(event, false, true, false, false, analysis)
    }

    fn emit_flow_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        let canonical = self.config.style == PresentationStyle::Canonical;
        if let EventData::MappingEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().unwrap_or(-1);
            if canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.state = self.states.pop().unwrap_or(PresenterState::End);
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if canonical || self.line_width_exceeded() {
            self.write_indent()?;
        }
        self.key_context = true;
        let simple = !canonical && self.check_simple_key(event, analysis);
        let result = if simple {
            self.states.push(PresenterState::FlowMappingSimpleValue);
            self.emit_node(event, false, false, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(PresenterState::FlowMappingValue);
            self.emit_node(event, false, false, true, false, analysis)
        };
        self.key_context = false;
        result
    }

    fn emit_flow_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.config.style == PresentationStyle::Canonical || self.line_width_exceeded() {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(PresenterState::FlowMappingKey);
        self.emit_node(event, false, false, true, false, analysis)
    }

    fn emit_block_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        if first {
            self.increase_indent(false, self.mapping_context && !self.indention);
        }
        if let EventData::SequenceEnd = &event.data {
            self.indent = self.indents.pop().unwrap_or(-1);
            self.state = self.states.pop().unwrap_or(PresenterState::End);
            return Ok(());
        }
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(PresenterState::BlockSequenceItem);
        self.emit_node(event, false, true, false, false, analysis)
    }

    fn emit_block_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        if first {
            self.increase_indent(false, false);
        }
        if let EventData::MappingEnd = &event.data {
            self.indent = self.indents.pop().unwrap_or(-1);
            self.state = self.states.pop().unwrap_or(PresenterState::End);
            return Ok(());
        }
        self.write_indent()?;
        self.key_context = true;
        let simple = self.check_simple_key(event, analysis);
        let result = if simple {
            self.states.push(PresenterState::BlockMappingSimpleValue);
            self.emit_node(event, false, false, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(PresenterState::BlockMappingValue);
            self.emit_node(event, false, false, true, false, analysis)
        };
        self.key_context = false;
        result
    }

    fn emit_block_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.states.push(PresenterState::BlockMappingKey);
        self.emit_node(event, false, false, true, false, analysis)
    }

    fn emit_node(
        &mut self,
        event: &Event,
        root: bool,
        sequence: bool,
        mapping: bool,
        simple_key: bool,
        analysis: &mut Analysis,
    ) -> Result<(), PresenterError> {
        let _ = root;
        self.sequence_context = sequence;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;

        match &event.data {
            EventData::Alias { .. } => self.emit_alias(&analysis.anchor),
            EventData::Scalar { .. } => self.emit_scalar(event, analysis),
            EventData::SequenceStart { .. } => self.emit_sequence_start(event, analysis),
            EventData::MappingStart { .. } => self.emit_mapping_start(event, analysis),
            _ => Err(PresenterError::Problem(
                "expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS",
            )),
        }
    }

    fn emit_alias(&mut self, anchor: &Option<AnchorAnalysis>) -> Result<(), PresenterError> {
        self.process_anchor(anchor)?;
        if self.simple_key_context {
            self.put(b' ')?;
        }
        self.state = self.states.pop().unwrap_or(PresenterState::End);
        Ok(())
    }

    fn emit_scalar(&mut self, event: &Event, analysis: &mut Analysis) -> Result<(), PresenterError> {
        let EventData::Scalar {
            tag,
            plain_implicit,
            quoted_implicit,
            style,
            ..
        } = &event.data
        else {
            unreachable!("emit_scalar called for a non-scalar event");
        };
        if self.config.style == PresentationStyle::Json
            && self.config.json_strict
            && self.key_context
            && *tag != self.tag_registry.str_tag()
            && self.node_has_explicit_tag(*tag)
        {
            return Err(PresenterError::Json("mapping key must resolve to a string"));
        }
        let Some(scalar) = analysis.scalar.as_mut() else {
            unreachable!("scalar analysis missing");
        };
        self.select_scalar_style(*plain_implicit, *quoted_implicit, *style, scalar, &mut analysis.tag)?;
        self.process_anchor(&analysis.anchor)?;
        self.process_tag(&analysis.tag)?;
        self.increase_indent(true, false);
        self.process_scalar(analysis.scalar.as_ref().unwrap())?;
        self.indent = self.indents.pop().unwrap_or(-1);
        self.state = self.states.pop().unwrap_or(PresenterState::End);
        Ok(())
    }

    fn emit_sequence_start(&mut self, event: &Event, analysis: &Analysis) -> Result<(), PresenterError> {
        self.process_anchor(&analysis.anchor)?;
        self.process_tag(&analysis.tag)?;
        let EventData::SequenceStart { style, .. } = &event.data else {
            unreachable!()
        };
        self.state = if self.use_flow_sequence(event, *style) {
            PresenterState::FlowSequenceFirstItem
        } else {
            PresenterState::BlockSequenceFirstItem
        };
        Ok(())
    }

    fn emit_mapping_start(&mut self, event: &Event, analysis: &Analysis) -> Result<(), PresenterError> {
        self.process_anchor(&analysis.anchor)?;
        self.process_tag(&analysis.tag)?;
        let EventData::MappingStart { style, .. } = &event.data else {
            unreachable!()
        };
        self.state = if self.use_flow_mapping(event, *style) {
            PresenterState::FlowMappingFirstKey
        } else {
            PresenterState::BlockMappingFirstKey
        };
        Ok(())
    }

    fn use_flow_sequence(&self, event: &Event, style: SequenceStyle) -> bool {
        if matches!(self.config.style, PresentationStyle::BlockOnly) && self.flow_level == 0 {
            return false;
        }
        if matches!(self.config.style, PresentationStyle::Canonical | PresentationStyle::Json) {
            return true;
        }
        if self.flow_level != 0 {
            return true;
        }
        match style {
            SequenceStyle::Flow => true,
            SequenceStyle::Block => false,
            SequenceStyle::Any => {
                matches!(self.config.style, PresentationStyle::Minimal) || self.check_empty_sequence(event)
            }
        }
    }

    fn use_flow_mapping(&self, event: &Event, style: MappingStyle) -> bool {
        if matches!(self.config.style, PresentationStyle::BlockOnly) && self.flow_level == 0 {
            return false;
        }
        if matches!(self.config.style, PresentationStyle::Canonical | PresentationStyle::Json) {
            return true;
        }
        if self.flow_level != 0 {
            return true;
        }
        match style {
            MappingStyle::Flow | MappingStyle::Pair => true,
            MappingStyle::Block => false,
            MappingStyle::Any => {
                matches!(self.config.style, PresentationStyle::Minimal) || self.check_empty_mapping(event)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, ScalarStyle, SequenceStyle};

    fn to_string(config: PresenterConfig, registry: &TagRegistry, events: Vec<Event>) -> String {
        let mut out = Vec::new();
        {
            let writer = Writer::new(&mut out, Encoding::Utf8);
            let mut presenter = Presenter::new(writer, config, registry);
            for event in events {
                presenter.emit(event).unwrap();
            }
        }
        String::from_utf8(out).unwrap()
    }

    fn wrap(registry: &TagRegistry, node: Vec<Event>) -> Vec<Event> {
        let mut events = vec![Event::stream_start(Encoding::Utf8), Event::document_start(None, &[], true)];
        events.extend(node);
        events.push(Event::document_end(true));
        events.push(Event::stream_end());
        let _ = registry;
        events
    }

    #[test]
    fn presents_a_simple_block_mapping() {
        let registry = TagRegistry::new();
        let node = vec![
            Event::mapping_start(None, registry.non_specific_question(), true, MappingStyle::Block),
            Event::scalar(None, registry.str_tag(), "foo", true, true, ScalarStyle::Plain),
            Event::scalar(None, registry.str_tag(), "bar", true, true, ScalarStyle::Plain),
            Event::mapping_end(),
        ];
        let out = to_string(PresenterConfig::default(), &registry, wrap(&registry, node));
        assert_eq!(out, "foo: bar\n");
    }

    #[test]
    fn presents_a_flow_sequence_when_requested() {
        let registry = TagRegistry::new();
        let node = vec![
            Event::sequence_start(None, registry.non_specific_question(), true, SequenceStyle::Flow),
            Event::scalar(None, registry.str_tag(), "a", true, true, ScalarStyle::Plain),
            Event::scalar(None, registry.str_tag(), "b", true, true, ScalarStyle::Plain),
            Event::sequence_end(),
        ];
        let out = to_string(PresenterConfig::default(), &registry, wrap(&registry, node));
        assert_eq!(out, "[a, b]\n");
    }

    #[test]
    fn tidy_anchors_only_referenced_nodes() {
        let registry = TagRegistry::new();
        let mut anchors = crate::AnchorTable::new();
        let shared = anchors.define("shared");
        let unused = anchors.define("unused");
        let node = vec![
            Event::sequence_start(None, registry.non_specific_question(), true, SequenceStyle::Flow),
            Event::scalar(Some(shared), registry.str_tag(), "x", true, true, ScalarStyle::Plain),
            Event::scalar(Some(unused), registry.str_tag(), "y", true, true, ScalarStyle::Plain),
            Event::alias(shared),
            Event::sequence_end(),
        ];
        let mut config = PresenterConfig::default();
        config.anchor_style = AnchorStyle::Tidy;
        let out = to_string(config, &registry, wrap(&registry, node));
        assert!(out.contains("&id001 x"));
        assert_eq!(out.matches('&').count(), 1);
        assert!(out.contains("*id001"));
        assert!(!out.contains("unused"));
        assert!(out.contains(" y"));
    }

    #[test]
    fn none_anchor_style_duplicates_the_referenced_value() {
        let registry = TagRegistry::new();
        let mut anchors = crate::AnchorTable::new();
        let shared = anchors.define("shared");
        let node = vec![
            Event::sequence_start(None, registry.non_specific_question(), true, SequenceStyle::Flow),
            Event::scalar(Some(shared), registry.str_tag(), "x", true, true, ScalarStyle::Plain),
            Event::alias(shared),
            Event::sequence_end(),
        ];
        let mut config = PresenterConfig::default();
        config.anchor_style = AnchorStyle::None;
        let out = to_string(config, &registry, wrap(&registry, node));
        assert_eq!(out, "[x, x]\n");
        assert!(!out.contains('&'));
        assert!(!out.contains('*'));
    }

    #[test]
    fn json_style_forces_flow_and_double_quoted_keys() {
        let registry = TagRegistry::new();
        let node = vec![
            Event::mapping_start(None, registry.non_specific_question(), true, MappingStyle::Block),
            Event::scalar(None, registry.str_tag(), "foo", true, true, ScalarStyle::Plain),
            Event::scalar(None, registry.str_tag(), "bar", true, true, ScalarStyle::Plain),
            Event::mapping_end(),
        ];
        let mut config = PresenterConfig::default();
        config.style = PresentationStyle::Json;
        let out = to_string(config, &registry, wrap(&registry, node));
        assert_eq!(out, "{\"foo\": bar}\n");
    }

    #[test]
    fn json_strict_rejects_a_non_string_key() {
        let registry = TagRegistry::new();
        let node = vec![
            Event::mapping_start(None, registry.non_specific_question(), true, MappingStyle::Block),
            Event::scalar(None, registry.int_tag(), "1", false, false, ScalarStyle::Plain),
            Event::scalar(None, registry.str_tag(), "bar", true, true, ScalarStyle::Plain),
            Event::mapping_end(),
        ];
        let mut config = PresenterConfig::default();
        config.style = PresentationStyle::Json;
        config.json_strict = true;
        let mut out = Vec::new();
        let writer = Writer::new(&mut out, Encoding::Utf8);
        let mut presenter = Presenter::new(writer, config, &registry);
        let mut result = Ok(());
        for event in wrap(&registry, node) {
            result = presenter.emit(event);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(PresenterError::Json(_))));
    }

    #[test]
    fn canonical_style_tags_and_quotes_every_scalar() {
        let registry = TagRegistry::new();
        let node = vec![Event::scalar(None, registry.str_tag(), "hi", true, true, ScalarStyle::Plain)];
        let mut config = PresenterConfig::default();
        config.style = PresentationStyle::Canonical;
        let out = to_string(config, &registry, wrap(&registry, node));
        assert!(out.contains("!!str"));
        assert!(out.contains("\"hi\""));
    }

    #[test]
    fn block_only_style_never_selects_flow_at_the_root() {
        let registry = TagRegistry::new();
        let node = vec![
            Event::sequence_start(None, registry.non_specific_question(), true, SequenceStyle::Flow),
            Event::scalar(None, registry.str_tag(), "a", true, true, ScalarStyle::Plain),
            Event::sequence_end(),
        ];
        let mut config = PresenterConfig::default();
        config.style = PresentationStyle::BlockOnly;
        let out = to_string(config, &registry, wrap(&registry, node));
        assert_eq!(out, "- a\n");
    }
}

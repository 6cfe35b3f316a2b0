//! A lazy, peekable, fallible sequence of [`Event`]s.
//!
//! Generalizes `std::iter::Peekable` to a fallible trait, so a
//! collaborator that produces events without parsing any YAML text (e.g.
//! a serializer) can sit behind the same interface as a real [`Parser`].

use crate::error::StreamError;
use crate::event::{Event, EventData};
use crate::parser::Parser;

/// A lazy, non-restartable sequence of events.
///
/// Implementations are either parser-backed (pulling from a [`Scanner`](crate::scanner::Scanner)
/// through a [`Parser`]) or collaborator-backed (driven by a serializer that
/// has no `Parser` of its own). Once [`EventStream::is_finished`] returns
/// `true`, or `next`/`peek` have returned an error, no further events are
/// produced.
pub trait EventStream {
    /// Produce the next event, advancing the stream.
    fn next(&mut self) -> Result<Option<Event>, StreamError>;

    /// Return the next event without consuming it. Idempotent until the
    /// next call to [`EventStream::next`].
    fn peek(&mut self) -> Result<Option<&Event>, StreamError>;

    /// `true` once the terminal `stream-end` event has been produced (by
    /// `next`) and no further events remain.
    fn is_finished(&self) -> bool;
}

/// Adapts a [`Parser`] into an [`EventStream`].
pub struct ParserEventStream<'r> {
    parser: Parser<'r>,
    peeked: Option<Event>,
    finished: bool,
    failed: bool,
}

impl<'r> ParserEventStream<'r> {
    /// Wrap `parser` in a stream adapter.
    #[must_use]
    pub fn new(parser: Parser<'r>) -> Self {
        ParserEventStream {
            parser,
            peeked: None,
            finished: false,
            failed: false,
        }
    }

    /// Borrow the underlying parser, e.g. to resolve a [`crate::TagId`] or
    /// [`crate::AnchorId`] produced by an already-yielded event.
    pub fn parser(&self) -> &Parser<'r> {
        &self.parser
    }
}

impl EventStream for ParserEventStream<'_> {
    fn next(&mut self) -> Result<Option<Event>, StreamError> {
        if self.failed {
            return Ok(None);
        }
        if let Some(event) = self.peeked.take() {
            if matches!(event.data, EventData::StreamEnd) {
                self.finished = true;
            }
            return Ok(Some(event));
        }
        if self.finished {
            return Ok(None);
        }
        match self.parser.parse() {
            Ok(event) => {
                if matches!(event.data, EventData::StreamEnd) {
                    self.finished = true;
                }
                Ok(Some(event))
            }
            Err(err) => {
                self.failed = true;
                Err(StreamError::from(err))
            }
        }
    }

    fn peek(&mut self) -> Result<Option<&Event>, StreamError> {
        if self.failed || self.finished && self.peeked.is_none() {
            return Ok(None);
        }
        if self.peeked.is_none() {
            match self.parser.parse() {
                Ok(event) => self.peeked = Some(event),
                Err(err) => {
                    self.failed = true;
                    return Err(StreamError::from(err));
                }
            }
        }
        Ok(self.peeked.as_ref())
    }

    fn is_finished(&self) -> bool {
        self.finished && self.peeked.is_none()
    }
}

/// Drives an [`EventStream`] from a caller-supplied closure rather than a
/// [`Parser`]: useful for a serializer turning native values into events
/// without going through YAML text at all.
pub struct CollaboratorEventStream {
    produce: Box<dyn FnMut() -> Result<Option<Event>, StreamError>>,
    peeked: Option<Event>,
    finished: bool,
}

impl CollaboratorEventStream {
    /// Build a stream from a closure that produces one event per call,
    /// returning `Ok(None)` once exhausted.
    pub fn new(produce: impl FnMut() -> Result<Option<Event>, StreamError> + 'static) -> Self {
        CollaboratorEventStream {
            produce: Box::new(produce),
            peeked: None,
            finished: false,
        }
    }
}

impl EventStream for CollaboratorEventStream {
    fn next(&mut self) -> Result<Option<Event>, StreamError> {
        if let Some(event) = self.peeked.take() {
            return Ok(Some(event));
        }
        if self.finished {
            return Ok(None);
        }
        let event = (self.produce)()?;
        if event.is_none() {
            self.finished = true;
        }
        Ok(event)
    }

    fn peek(&mut self) -> Result<Option<&Event>, StreamError> {
        if self.peeked.is_none() && !self.finished {
            let event = (self.produce)()?;
            if event.is_none() {
                self.finished = true;
            }
            self.peeked = event;
        }
        Ok(self.peeked.as_ref())
    }

    fn is_finished(&self) -> bool {
        self.finished && self.peeked.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Encoding;

    #[test]
    fn parser_event_stream_peek_is_idempotent() {
        let reader = crate::reader::Reader::from_slice(b"foo: bar\n");
        let parser = Parser::new(reader);
        let mut stream = ParserEventStream::new(parser);
        assert!(matches!(
            stream.peek().unwrap().map(|e| &e.data),
            Some(EventData::StreamStart { .. })
        ));
        assert!(matches!(
            stream.peek().unwrap().map(|e| &e.data),
            Some(EventData::StreamStart { .. })
        ));
        let consumed = stream.next().unwrap().unwrap();
        assert!(matches!(consumed.data, EventData::StreamStart { .. }));
    }

    #[test]
    fn collaborator_stream_runs_out() {
        let mut remaining = vec![Event::stream_end(), Event::stream_start(Encoding::Utf8)];
        let mut stream = CollaboratorEventStream::new(move || Ok(remaining.pop()));
        assert!(stream.next().unwrap().is_some());
        assert!(stream.next().unwrap().is_some());
        assert!(stream.next().unwrap().is_none());
        assert!(stream.is_finished());
    }
}

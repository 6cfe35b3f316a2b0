//! The lexer: a context-sensitive state machine that turns a [`Reader`]'s
//! character stream into a sequence of [`Token`]s.
//!
//! Tracks indentation and flow-collection depth to distinguish block and
//! flow context, recognizes plain/quoted/block scalars and their escape
//! and folding rules, and records simple-key candidates so a following
//! `:` on the same line (or within the enclosing flow collection) can
//! promote a scalar into a mapping key.

use std::collections::VecDeque;

use crate::error::{Position, ScannerError, Warning};
use crate::macros::{is_alpha, is_blank, is_blankz, is_bom, is_break, is_breakz, is_digit, is_hex};
use crate::reader::Reader;
use crate::token::{Token, TokenData};
use crate::{Encoding, ScalarStyle};

/// The maximum length, in decoded characters, of a candidate simple key,
/// per the YAML 1.2 recommendation. Enforced strictly.
const MAX_SIMPLE_KEY_LENGTH: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: u64,
    position: Position,
}

impl SimpleKey {
    const fn empty() -> Self {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            position: Position {
                index: 0,
                line: 0,
                column: 0,
            },
        }
    }
}

/// The lexer. Consumes a [`Reader`] and produces [`Token`]s on demand.
pub struct Scanner<'r> {
    reader: Reader<'r>,
    tokens: VecDeque<Token>,
    tokens_parsed: u64,
    token_available: bool,
    stream_start_produced: bool,
    stream_end_produced: bool,
    /// Current indentation level, 0-based column; -1 means "no indentation
    /// established yet" (only true before the first block collection).
    indent: i64,
    indents: Vec<i64>,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
    flow_level: u32,
    warnings: Vec<Warning>,
}

impl<'r> Scanner<'r> {
    /// Wrap a reader in a fresh scanner.
    pub fn new(reader: Reader<'r>) -> Self {
        Scanner {
            reader,
            tokens: VecDeque::new(),
            tokens_parsed: 0,
            token_available: false,
            stream_start_produced: false,
            stream_end_produced: false,
            indent: -1,
            indents: Vec::new(),
            simple_key_allowed: true,
            simple_keys: Vec::new(),
            flow_level: 0,
            warnings: Vec::new(),
        }
    }

    /// The encoding the reader detected (or was configured with). Only
    /// meaningful once the first token has been produced.
    pub fn encoding(&self) -> Encoding {
        self.reader.encoding()
    }

    /// Drain accumulated dialectal warnings (unsupported `%YAML` minor
    /// version, unknown directive names), reported through this side
    /// channel rather than a dedicated token kind.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Produce the next token. Once STREAM-END has been produced, every
    /// further call returns another (equivalent) STREAM-END token.
    pub fn scan(&mut self) -> Result<Token, ScannerError> {
        if self.stream_end_produced {
            let mark = self.position();
            return Ok(Token {
                data: TokenData::StreamEnd,
                start_mark: mark,
                end_mark: mark,
            });
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let token = self
            .tokens
            .pop_front()
            .expect("fetch_more_tokens always leaves at least one token queued");
        self.token_available = false;
        self.tokens_parsed += 1;
        if matches!(token.data, TokenData::StreamEnd) {
            self.stream_end_produced = true;
        }
        Ok(token)
    }

    // -- position / lookahead helpers -----------------------------------

    fn position(&self) -> Position {
        Position {
            index: self.reader.index(),
            line: self.reader.line(),
            column: self.reader.column(),
        }
    }

    /// 0-based column of the next unread character ([`Position::column`]
    /// is 1-based for the public API; internal indentation arithmetic
    /// stays 0-based).
    fn col0(&self) -> i64 {
        self.reader.column() as i64 - 1
    }

    fn peek_at(&mut self, n: usize) -> Result<Option<char>, ScannerError> {
        Ok(self.reader.peek_nth(n)?)
    }

    fn peek(&mut self) -> Result<Option<char>, ScannerError> {
        self.peek_at(0)
    }

    fn check(&mut self, ch: char) -> Result<bool, ScannerError> {
        Ok(self.peek()? == Some(ch))
    }

    fn check_at(&mut self, ch: char, n: usize) -> Result<bool, ScannerError> {
        Ok(self.peek_at(n)? == Some(ch))
    }

    fn is_z(&mut self) -> Result<bool, ScannerError> {
        Ok(self.peek()?.is_none())
    }

    fn is_blankz_at(&mut self, n: usize) -> Result<bool, ScannerError> {
        Ok(is_blankz(self.peek_at(n)?))
    }

    fn skip(&mut self) -> Result<(), ScannerError> {
        self.reader
            .advance()?
            .expect("skip() called with a character known to be present");
        Ok(())
    }

    /// Consume one line break. The `Reader` has already folded CR/CRLF
    /// into a single `LF`, so this only needs to consume whichever single
    /// break character remains.
    fn skip_line(&mut self) -> Result<(), ScannerError> {
        if is_break(self.peek()?) {
            self.skip()?;
        }
        Ok(())
    }

    fn read_string(&mut self, out: &mut String) -> Result<(), ScannerError> {
        let ch = self
            .reader
            .advance()?
            .expect("read_string() called with a character known to be present");
        out.push(ch);
        Ok(())
    }

    /// Consume one line break, appending its normalized form: a genuine
    /// `LF` becomes `\n`; a wide Unicode break (NEL/LS/PS) is preserved
    /// verbatim.
    fn read_line_string(&mut self, out: &mut String) -> Result<(), ScannerError> {
        let ch = self
            .reader
            .advance()?
            .expect("read_line_string() called with a break character known to be present");
        out.push(if ch == '\n' { '\n' } else { ch });
        Ok(())
    }

    fn err<T>(&self, problem: &'static str, mark: Position) -> Result<T, ScannerError> {
        Err(ScannerError::Simple {
            problem,
            problem_mark: mark,
        })
    }

    fn err_ctx<T>(
        &self,
        context: &'static str,
        context_mark: Position,
        problem: &'static str,
    ) -> Result<T, ScannerError> {
        Err(ScannerError::Problem {
            context,
            context_mark,
            problem,
            problem_mark: self.position(),
        })
    }

    // -- token fetching ----------------------------------------------------

    fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more_tokens = self.tokens.is_empty();
            if !need_more_tokens {
                self.stale_simple_keys()?;
                for key in &self.simple_keys {
                    if key.possible && key.token_number == self.tokens_parsed {
                        need_more_tokens = true;
                        break;
                    }
                }
            }
            if !need_more_tokens {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        let col = self.col0();
        self.unroll_indent(col);

        if self.is_z()? {
            return self.fetch_stream_end();
        }
        if self.col0() == 0 && self.check('%')? {
            return self.fetch_directive();
        }
        if self.col0() == 0
            && self.check_at('-', 0)?
            && self.check_at('-', 1)?
            && self.check_at('-', 2)?
            && self.is_blankz_at(3)?
        {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if self.col0() == 0
            && self.check_at('.', 0)?
            && self.check_at('.', 1)?
            && self.check_at('.', 2)?
            && self.is_blankz_at(3)?
        {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        if self.check('[')? {
            return self.fetch_flow_collection_start(TokenData::FlowSequenceStart);
        }
        if self.check('{')? {
            return self.fetch_flow_collection_start(TokenData::FlowMappingStart);
        }
        if self.check(']')? {
            return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd);
        }
        if self.check('}')? {
            return self.fetch_flow_collection_end(TokenData::FlowMappingEnd);
        }
        if self.check(',')? {
            return self.fetch_flow_entry();
        }
        if self.check('-')? && self.is_blankz_at(1)? {
            return self.fetch_block_entry();
        }
        if self.check('?')? && (self.flow_level != 0 || self.is_blankz_at(1)?) {
            return self.fetch_key();
        }
        if self.check(':')? && (self.flow_level != 0 || self.is_blankz_at(1)?) {
            return self.fetch_value();
        }
        if self.check('*')? {
            return self.fetch_anchor(true);
        }
        if self.check('&')? {
            return self.fetch_anchor(false);
        }
        if self.check('!')? {
            return self.fetch_tag();
        }
        if self.check('|')? && self.flow_level == 0 {
            return self.fetch_block_scalar(true);
        }
        if self.check('>')? && self.flow_level == 0 {
            return self.fetch_block_scalar(false);
        }
        if self.check('\'')? {
            return self.fetch_flow_scalar(true);
        }
        if self.check('"')? {
            return self.fetch_flow_scalar(false);
        }
        let plain_candidate = {
            let c = self.peek()?;
            !(is_blankz(c)
                || matches!(
                    c,
                    Some('-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!'
                        | '|' | '>' | '\'' | '"' | '%' | '@' | '`')
                ))
                || (c == Some('-') && !is_blank(self.peek_at(1)?))
                || (self.flow_level == 0
                    && matches!(c, Some('?' | ':'))
                    && !is_blankz(self.peek_at(1)?))
        };
        if plain_candidate {
            return self.fetch_plain_scalar();
        }
        self.err_ctx(
            "while scanning for the next token",
            self.position(),
            "found character that cannot start any token",
        )
    }

    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let now = self.position();
        for key in &mut self.simple_keys {
            if key.possible
                && (key.position.line < now.line || key.position.index + MAX_SIMPLE_KEY_LENGTH < now.index)
            {
                if key.required {
                    return Err(ScannerError::Simple {
                        problem: "could not find expected ':'",
                        problem_mark: key.position,
                    });
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let required = self.flow_level == 0 && self.indent == self.col0();
        if self.simple_key_allowed {
            let key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len() as u64,
                position: self.position(),
            };
            self.remove_simple_key()?;
            *self.simple_keys.last_mut().expect("flow level stack never empty") = key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let key = self.simple_keys.last_mut().expect("flow level stack never empty");
        if key.possible && key.required {
            return Err(ScannerError::Simple {
                problem: "could not find expected ':'",
                problem_mark: key.position,
            });
        }
        key.possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::empty());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level != 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    fn roll_indent(
        &mut self,
        column: i64,
        number: Option<u64>,
        data: TokenData,
        mark: Position,
    ) {
        if self.flow_level != 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token {
                data,
                start_mark: mark,
                end_mark: mark,
            };
            match number {
                None => self.tokens.push_back(token),
                Some(number) => {
                    let at = (number - self.tokens_parsed) as usize;
                    self.tokens.insert(at, token);
                }
            }
        }
    }

    fn unroll_indent(&mut self, column: i64) {
        if self.flow_level != 0 {
            return;
        }
        while self.indent > column {
            let mark = self.position();
            self.tokens.push_back(Token {
                data: TokenData::BlockEnd,
                start_mark: mark,
                end_mark: mark,
            });
            self.indent = self.indents.pop().expect("indent stack balances BlockEnd tokens");
        }
    }

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::empty());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let mark = self.position();
        self.tokens.push_back(Token {
            data: TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            start_mark: mark,
            end_mark: mark,
        });
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let mark = self.position();
        self.tokens.push_back(Token {
            data: TokenData::StreamEnd,
            start_mark: mark,
            end_mark: mark,
        });
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.position();
        self.skip()?;
        self.skip()?;
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        let start_mark = self.position();
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.position();
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.position();
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data: TokenData::FlowEntry,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.err("block sequence entries are not allowed in this context", self.position());
            }
            let col = self.col0();
            let mark = self.position();
            self.roll_indent(col, None, TokenData::BlockSequenceStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.position();
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data: TokenData::BlockEntry,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.err("mapping keys are not allowed in this context", self.position());
            }
            let col = self.col0();
            let mark = self.position();
            self.roll_indent(col, None, TokenData::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.position();
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data: TokenData::Key,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let key = *self.simple_keys.last().expect("flow level stack never empty");
        if key.possible {
            let token = Token {
                data: TokenData::Key,
                start_mark: key.position,
                end_mark: key.position,
            };
            let at = (key.token_number - self.tokens_parsed) as usize;
            self.tokens.insert(at, token);
            self.roll_indent(
                key.position.column as i64 - 1,
                Some(key.token_number),
                TokenData::BlockMappingStart,
                key.position,
            );
            self.simple_keys.last_mut().unwrap().possible = false;
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return self.err("mapping values are not allowed in this context", self.position());
                }
                let col = self.col0();
                let mark = self.position();
                self.roll_indent(col, None, TokenData::BlockMappingStart, mark);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start_mark = self.position();
        self.skip()?;
        let end_mark = self.position();
        self.tokens.push_back(Token {
            data: TokenData::Value,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    // -- whitespace / comment skipping -------------------------------------

    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            if self.col0() == 0 && is_bom(self.peek()?.unwrap_or('\0')) {
                self.skip()?;
            }
            while self.check(' ')?
                || ((self.flow_level != 0 || !self.simple_key_allowed) && self.check('\t')?)
            {
                self.skip()?;
            }
            if self.check('#')? {
                while !is_breakz(self.peek()?) {
                    self.skip()?;
                }
            }
            if !is_break(self.peek()?) {
                break;
            }
            self.skip_line()?;
            if self.flow_level == 0 {
                self.simple_key_allowed = true;
            }
        }
        Ok(())
    }

    // -- directives ---------------------------------------------------------

    fn scan_directive(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.position();
        self.skip()?;
        let name = self.scan_directive_name(start_mark)?;
        let data = if name == "YAML" {
            let (major, minor) = self.scan_version_directive_value(start_mark)?;
            if !(major == 1 && (minor == 1 || minor == 2)) {
                self.warnings.push(Warning::UnsupportedYamlVersion {
                    major,
                    minor,
                    position: start_mark,
                });
                #[cfg(feature = "log")]
                log::warn!("unsupported %YAML version {major}.{minor}, treating as 1.2");
            }
            TokenData::VersionDirective { major, minor }
        } else if name == "TAG" {
            let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
            TokenData::TagDirective { handle, prefix }
        } else {
            let params = self.scan_directive_params()?;
            self.warnings.push(Warning::UnknownDirective {
                name: name.clone(),
                position: start_mark,
            });
            #[cfg(feature = "log")]
            log::warn!("unknown directive %{name}");
            TokenData::ReservedDirective { name, params }
        };

        while is_blank(self.peek()?) {
            self.skip()?;
        }
        if self.check('#')? {
            while !is_breakz(self.peek()?) {
                self.skip()?;
            }
        }
        if !is_breakz(self.peek()?) {
            return self.err("did not find expected comment or line break", start_mark);
        }
        if is_break(self.peek()?) {
            self.skip_line()?;
        }
        let end_mark = self.position();
        Ok(Token {
            data,
            start_mark,
            end_mark,
        })
    }

    /// Consume the raw parameter text of an unrecognized directive, up to
    /// (not including) its trailing comment or line break.
    fn scan_directive_params(&mut self) -> Result<String, ScannerError> {
        let mut params = String::new();
        while is_blank(self.peek()?) {
            self.skip()?;
        }
        while !is_breakz(self.peek()?) && !self.check('#')? {
            self.read_string(&mut params)?;
        }
        Ok(params.trim_end().to_owned())
    }

    fn scan_directive_name(&mut self, start_mark: Position) -> Result<String, ScannerError> {
        let mut name = String::new();
        while is_alpha(self.peek()?) {
            self.read_string(&mut name)?;
        }
        if name.is_empty() {
            self.err_ctx(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
            )
        } else if !is_blankz(self.peek()?) {
            self.err_ctx(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
            )
        } else {
            Ok(name)
        }
    }

    fn scan_version_directive_value(&mut self, start_mark: Position) -> Result<(i32, i32), ScannerError> {
        while is_blank(self.peek()?) {
            self.skip()?;
        }
        let major = self.scan_version_directive_number(start_mark)?;
        if !self.check('.')? {
            return self.err_ctx(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
            );
        }
        self.skip()?;
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Position) -> Result<i32, ScannerError> {
        const MAX_NUMBER_LENGTH: u32 = 9;
        let mut value: i32 = 0;
        let mut length: u32 = 0;
        while is_digit(self.peek()?) {
            length += 1;
            if length > MAX_NUMBER_LENGTH {
                return self.err_ctx(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                );
            }
            let digit = self.peek()?.unwrap().to_digit(10).unwrap() as i32;
            value = value * 10 + digit;
            self.skip()?;
        }
        if length == 0 {
            return self.err_ctx(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
            );
        }
        Ok(value)
    }

    fn scan_tag_directive_value(&mut self, start_mark: Position) -> Result<(String, String), ScannerError> {
        while is_blank(self.peek()?) {
            self.skip()?;
        }
        let handle = self.scan_tag_handle(true, start_mark)?;
        if !is_blank(self.peek()?) {
            return self.err_ctx(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
            );
        }
        while is_blank(self.peek()?) {
            self.skip()?;
        }
        let prefix = self.scan_tag_uri(true, true, None, start_mark)?;
        if !is_blankz(self.peek()?) {
            return self.err_ctx(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }
        Ok((handle, prefix))
    }

    // -- anchors / aliases ----------------------------------------------------

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScannerError> {
        let start_mark = self.position();
        self.skip()?;
        let mut name = String::new();
        while is_alpha(self.peek()?) {
            self.read_string(&mut name)?;
        }
        let end_mark = self.position();
        let next = self.peek()?;
        let ok = !name.is_empty()
            && (is_blankz(next)
                || matches!(next, Some('?' | ':' | ',' | ']' | '}' | '%' | '@' | '`')));
        if !ok {
            self.err_ctx(
                if alias {
                    "while scanning an alias"
                } else {
                    "while scanning an anchor"
                },
                start_mark,
                "did not find expected alphabetic or numeric character",
            )
        } else {
            Ok(Token {
                data: if alias {
                    TokenData::Alias { value: name }
                } else {
                    TokenData::Anchor { value: name }
                },
                start_mark,
                end_mark,
            })
        }
    }

    // -- tags -----------------------------------------------------------------

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.position();
        let (handle, suffix);

        if self.check_at('<', 1)? {
            self.skip()?;
            self.skip()?;
            suffix = self.scan_tag_uri(true, false, None, start_mark)?;
            if !self.check('>')? {
                return self.err_ctx(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                );
            }
            self.skip()?;
            handle = String::new();
        } else {
            let mut scanned_handle = self.scan_tag_handle(false, start_mark)?;
            if scanned_handle.starts_with('!') && scanned_handle.len() > 1 && scanned_handle.ends_with('!') {
                suffix = self.scan_tag_uri(false, false, None, start_mark)?;
                handle = scanned_handle;
            } else {
                let mut scanned_suffix = self.scan_tag_uri(false, false, Some(&scanned_handle), start_mark)?;
                scanned_handle = String::from("!");
                if scanned_suffix.is_empty() {
                    std::mem::swap(&mut scanned_handle, &mut scanned_suffix);
                }
                handle = scanned_handle;
                suffix = scanned_suffix;
            }
        }

        if !is_blankz(self.peek()?) && !(self.flow_level != 0 && self.check(',')?) {
            return self.err_ctx(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }

        let end_mark = self.position();
        Ok(Token {
            data: TokenData::Tag { handle, suffix },
            start_mark,
            end_mark,
        })
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: Position) -> Result<String, ScannerError> {
        let mut handle = String::new();
        if !self.check('!')? {
            return self.err_ctx(
                if directive {
                    "while scanning a tag directive"
                } else {
                    "while scanning a tag"
                },
                start_mark,
                "did not find expected '!'",
            );
        }
        self.read_string(&mut handle)?;
        while is_alpha(self.peek()?) {
            self.read_string(&mut handle)?;
        }
        if self.check('!')? {
            self.read_string(&mut handle)?;
        } else if directive && handle != "!" {
            return self.err_ctx(
                "while parsing a tag directive",
                start_mark,
                "did not find expected '!'",
            );
        }
        Ok(handle)
    }

    fn scan_tag_uri(
        &mut self,
        uri_char: bool,
        directive: bool,
        head: Option<&str>,
        start_mark: Position,
    ) -> Result<String, ScannerError> {
        let head = head.unwrap_or("");
        let mut length = head.chars().count();
        let mut uri = if length > 1 {
            head.chars().skip(1).collect::<String>()
        } else {
            String::new()
        };

        loop {
            let Some(c) = self.peek()? else { break };
            let is_uri_char = is_alpha(Some(c))
                || matches!(
                    c,
                    ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | '.' | '%' | '!' | '~'
                        | '*' | '\'' | '(' | ')'
                )
                || (uri_char && matches!(c, ',' | '[' | ']'));
            if !is_uri_char {
                break;
            }
            if c == '%' {
                self.scan_uri_escapes(directive, start_mark, &mut uri)?;
            } else {
                self.read_string(&mut uri)?;
            }
            length += 1;
        }
        if length == 0 {
            self.err_ctx(
                if directive {
                    "while parsing a %TAG directive"
                } else {
                    "while parsing a tag"
                },
                start_mark,
                "did not find expected tag URI",
            )
        } else {
            Ok(uri)
        }
    }

    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start_mark: Position,
        out: &mut String,
    ) -> Result<(), ScannerError> {
        let mut width = 0u32;
        loop {
            let ok = self.check('%')? && is_hex(self.peek_at(1)?) && is_hex(self.peek_at(2)?);
            if !ok {
                return self.err_ctx(
                    if directive {
                        "while parsing a %TAG directive"
                    } else {
                        "while parsing a tag"
                    },
                    start_mark,
                    "did not find URI escaped octet",
                );
            }
            let hi = self.peek_at(1)?.unwrap().to_digit(16).unwrap();
            let lo = self.peek_at(2)?.unwrap().to_digit(16).unwrap();
            let octet = ((hi << 4) + lo) as u8;
            if width == 0 {
                width = if octet & 0x80 == 0 {
                    1
                } else if octet & 0xE0 == 0xC0 {
                    2
                } else if octet & 0xF0 == 0xE0 {
                    3
                } else if octet & 0xF8 == 0xF0 {
                    4
                } else {
                    0
                };
                if width == 0 {
                    return self.err_ctx(
                        if directive {
                            "while parsing a %TAG directive"
                        } else {
                            "while parsing a tag"
                        },
                        start_mark,
                        "found an incorrect leading UTF-8 octet",
                    );
                }
            } else if octet & 0xC0 != 0x80 {
                return self.err_ctx(
                    if directive {
                        "while parsing a %TAG directive"
                    } else {
                        "while parsing a tag"
                    },
                    start_mark,
                    "found an incorrect trailing UTF-8 octet",
                );
            }
            out.push(char::from_u32(octet as u32).expect("byte value is a valid codepoint"));
            self.skip()?;
            self.skip()?;
            self.skip()?;
            width -= 1;
            if width == 0 {
                break;
            }
        }
        Ok(())
    }

    // -- block scalars ---------------------------------------------------------

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut chomping = 0i32;
        let mut increment = 0i32;
        let mut indent;
        let mut leading_blank = false;

        let start_mark = self.position();
        self.skip()?;

        if self.check('+')? || self.check('-')? {
            chomping = if self.check('+')? { 1 } else { -1 };
            self.skip()?;
            if is_digit(self.peek()?) {
                if self.check('0')? {
                    return self.err("found an indentation indicator equal to 0", start_mark);
                }
                increment = self.peek()?.unwrap().to_digit(10).unwrap() as i32;
                self.skip()?;
            }
        } else if is_digit(self.peek()?) {
            if self.check('0')? {
                return self.err("found an indentation indicator equal to 0", start_mark);
            }
            increment = self.peek()?.unwrap().to_digit(10).unwrap() as i32;
            self.skip()?;
            if self.check('+')? || self.check('-')? {
                chomping = if self.check('+')? { 1 } else { -1 };
                self.skip()?;
            }
        }

        while is_blank(self.peek()?) {
            self.skip()?;
        }
        if self.check('#')? {
            while !is_breakz(self.peek()?) {
                self.skip()?;
            }
        }
        if !is_breakz(self.peek()?) {
            return self.err_ctx(
                "while scanning a block scalar",
                start_mark,
                "did not find expected comment or line break",
            );
        }
        if is_break(self.peek()?) {
            self.skip_line()?;
        }

        indent = if increment != 0 {
            if self.indent >= 0 {
                self.indent + increment as i64
            } else {
                increment as i64
            }
        } else {
            0
        };
        let mut end_mark = self.position();
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark, &mut end_mark)?;

        while self.col0() == indent && !self.is_z()? {
            let trailing_blank = is_blank(self.peek()?);
            if !literal && leading_break == "\n" && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
                leading_break.clear();
            } else {
                string.push_str(&leading_break);
                leading_break.clear();
            }
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = is_blank(self.peek()?);
            while !is_breakz(self.peek()?) {
                self.read_string(&mut string)?;
            }
            self.read_line_string(&mut leading_break)?;
            self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark, &mut end_mark)?;
        }

        if chomping != -1 {
            string.push_str(&leading_break);
        }
        if chomping == 1 {
            string.push_str(&trailing_breaks);
        }

        Ok(Token {
            data: TokenData::Scalar {
                value: string,
                style: if literal {
                    ScalarStyle::Literal
                } else {
                    ScalarStyle::Folded
                },
            },
            start_mark,
            end_mark,
        })
    }

    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut i64,
        breaks: &mut String,
        start_mark: Position,
        end_mark: &mut Position,
    ) -> Result<(), ScannerError> {
        let mut max_indent = 0i64;
        *end_mark = self.position();
        loop {
            while (*indent == 0 || self.col0() < *indent) && self.check(' ')? {
                self.skip()?;
            }
            if self.col0() > max_indent {
                max_indent = self.col0();
            }
            if (*indent == 0 || self.col0() < *indent) && self.check('\t')? {
                return self.err_ctx(
                    "while scanning a block scalar",
                    start_mark,
                    "found a tab character where an indentation space is expected",
                );
            }
            if !is_break(self.peek()?) {
                break;
            }
            self.read_line_string(breaks)?;
            *end_mark = self.position();
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        Ok(())
    }

    // -- quoted scalars ---------------------------------------------------------

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();

        let start_mark = self.position();
        self.skip()?;
        loop {
            if self.col0() == 0
                && ((self.check_at('-', 0)? && self.check_at('-', 1)? && self.check_at('-', 2)?)
                    || (self.check_at('.', 0)? && self.check_at('.', 1)? && self.check_at('.', 2)?))
                && self.is_blankz_at(3)?
            {
                return self.err_ctx(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document indicator",
                );
            }
            if self.is_z()? {
                return self.err_ctx(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected end of stream",
                );
            }

            let mut leading_blanks = false;
            while !is_blankz(self.peek()?) {
                if single && self.check_at('\'', 0)? && self.check_at('\'', 1)? {
                    string.push('\'');
                    self.skip()?;
                    self.skip()?;
                    continue;
                }
                let quote = if single { '\'' } else { '"' };
                if self.check(quote)? {
                    break;
                }
                if !single && self.check('\\')? && is_break(self.peek_at(1)?) {
                    self.skip()?;
                    self.skip_line()?;
                    leading_blanks = true;
                    break;
                }
                if !single && self.check('\\')? {
                    let mut code_length = 0u32;
                    match self.peek_at(1)?.unwrap() {
                        '0' => string.push('\0'),
                        'a' => string.push('\x07'),
                        'b' => string.push('\x08'),
                        't' | '\t' => string.push('\t'),
                        'n' => string.push('\n'),
                        'v' => string.push('\x0B'),
                        'f' => string.push('\x0C'),
                        'r' => string.push('\r'),
                        'e' => string.push('\x1B'),
                        ' ' => string.push(' '),
                        '"' => string.push('"'),
                        '/' => string.push('/'),
                        '\\' => string.push('\\'),
                        'N' => string.push('\u{0085}'),
                        '_' => string.push('\u{00a0}'),
                        'L' => string.push('\u{2028}'),
                        'P' => string.push('\u{2029}'),
                        'x' => code_length = 2,
                        'u' => code_length = 4,
                        'U' => code_length = 8,
                        _ => {
                            return self.err_ctx(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found unknown escape character",
                            )
                        }
                    }
                    self.skip()?;
                    self.skip()?;
                    if code_length != 0 {
                        let mut value: u32 = 0;
                        for k in 0..code_length {
                            if !is_hex(self.peek_at(k as usize)?) {
                                return self.err_ctx(
                                    "while parsing a quoted scalar",
                                    start_mark,
                                    "did not find expected hexadecimal number",
                                );
                            }
                            value = (value << 4) + self.peek_at(k as usize)?.unwrap().to_digit(16).unwrap();
                        }
                        let Some(ch) = char::from_u32(value) else {
                            return self.err_ctx(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found invalid Unicode character escape code",
                            );
                        };
                        string.push(ch);
                        for _ in 0..code_length {
                            self.skip()?;
                        }
                    }
                } else {
                    self.read_string(&mut string)?;
                }
            }

            if self.check(if single { '\'' } else { '"' })? {
                break;
            }

            while is_blank(self.peek()?) || is_break(self.peek()?) {
                if is_blank(self.peek()?) {
                    if !leading_blanks {
                        self.read_string(&mut whitespaces)?;
                    } else {
                        self.skip()?;
                    }
                } else if !leading_blanks {
                    whitespaces.clear();
                    self.read_line_string(&mut leading_break)?;
                    leading_blanks = true;
                } else {
                    self.read_line_string(&mut trailing_breaks)?;
                }
            }

            if leading_blanks {
                if leading_break == "\n" {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                } else {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    leading_break.clear();
                    trailing_breaks.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        self.skip()?;
        let end_mark = self.position();
        Ok(Token {
            data: TokenData::Scalar {
                value: string,
                style: if single {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::DoubleQuoted
                },
            },
            start_mark,
            end_mark,
        })
    }

    // -- plain scalars ---------------------------------------------------------

    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        let indent = self.indent + 1;

        let start_mark = self.position();
        let mut end_mark = start_mark;

        loop {
            if self.col0() == 0
                && ((self.check_at('-', 0)? && self.check_at('-', 1)? && self.check_at('-', 2)?)
                    || (self.check_at('.', 0)? && self.check_at('.', 1)? && self.check_at('.', 2)?))
                && self.is_blankz_at(3)?
            {
                break;
            }
            if self.check('#')? {
                break;
            }
            while !is_blankz(self.peek()?) {
                if self.flow_level != 0
                    && self.check(':')?
                    && matches!(self.peek_at(1)?, Some(',' | '?' | '[' | ']' | '{' | '}'))
                {
                    return self.err_ctx(
                        "while scanning a plain scalar",
                        start_mark,
                        "found unexpected ':'",
                    );
                }
                if (self.check(':')? && self.is_blankz_at(1)?)
                    || (self.flow_level != 0 && matches!(self.peek()?, Some(',' | '[' | ']' | '{' | '}')))
                {
                    break;
                }
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break == "\n" {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                            leading_break.clear();
                        } else {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            leading_break.clear();
                            trailing_breaks.clear();
                        }
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }
                self.read_string(&mut string)?;
                end_mark = self.position();
            }
            if !(is_blank(self.peek()?) || is_break(self.peek()?)) {
                break;
            }

            while is_blank(self.peek()?) || is_break(self.peek()?) {
                if is_blank(self.peek()?) {
                    if leading_blanks && self.col0() < indent && self.check('\t')? {
                        return self.err_ctx(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                        );
                    } else if !leading_blanks {
                        self.read_string(&mut whitespaces)?;
                    } else {
                        self.skip()?;
                    }
                } else if !leading_blanks {
                    whitespaces.clear();
                    self.read_line_string(&mut leading_break)?;
                    leading_blanks = true;
                } else {
                    self.read_line_string(&mut trailing_breaks)?;
                }
            }
            if self.flow_level == 0 && self.col0() < indent {
                break;
            }
        }

        if leading_blanks {
            self.simple_key_allowed = true;
        }

        Ok(Token {
            data: TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Vec<TokenData> {
        let reader = Reader::from_slice(input.as_bytes());
        let mut scanner = Scanner::new(reader);
        let mut out = Vec::new();
        loop {
            let token = scanner.scan().unwrap();
            let done = matches!(token.data, TokenData::StreamEnd);
            out.push(token.data);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_simple_block_mapping() {
        let tokens = scan_all("foo: bar\n");
        assert!(matches!(tokens[0], TokenData::StreamStart { .. }));
        assert!(tokens.iter().any(|t| matches!(t, TokenData::BlockMappingStart)));
        assert!(tokens.iter().any(|t| matches!(t, TokenData::Key)));
        assert!(tokens.iter().any(|t| matches!(t, TokenData::Value)));
        assert!(tokens.iter().any(
            |t| matches!(t, TokenData::Scalar { value, style: ScalarStyle::Plain } if value == "foo")
        ));
        assert!(tokens.iter().any(
            |t| matches!(t, TokenData::Scalar { value, style: ScalarStyle::Plain } if value == "bar")
        ));
    }

    #[test]
    fn scans_flow_sequence() {
        let tokens = scan_all("[1, 2, 3]\n");
        assert!(matches!(tokens[1], TokenData::FlowSequenceStart));
        assert!(tokens.iter().any(|t| matches!(t, TokenData::FlowEntry)));
        assert!(matches!(tokens[tokens.len() - 3], TokenData::FlowSequenceEnd));
    }

    #[test]
    fn scans_anchor_and_alias() {
        let tokens = scan_all("- &a 1\n- *a\n");
        assert!(tokens
            .iter()
            .any(|t| matches!(t, TokenData::Anchor { value } if value == "a")));
        assert!(tokens
            .iter()
            .any(|t| matches!(t, TokenData::Alias { value } if value == "a")));
    }

    #[test]
    fn double_quoted_escape_decodes() {
        let tokens = scan_all("\"a\\tb\"\n");
        assert!(tokens.iter().any(
            |t| matches!(t, TokenData::Scalar { value, style: ScalarStyle::DoubleQuoted } if value == "a\tb")
        ));
    }

    #[test]
    fn literal_block_scalar_clips_by_default() {
        let tokens = scan_all("|\n  line1\n  line2\n\n");
        assert!(tokens.iter().any(
            |t| matches!(t, TokenData::Scalar { value, style: ScalarStyle::Literal } if value == "line1\nline2\n")
        ));
    }

    #[test]
    fn literal_block_scalar_strip_chomping() {
        let tokens = scan_all("|-\n  line1\n  line2\n\n");
        assert!(tokens.iter().any(
            |t| matches!(t, TokenData::Scalar { value, style: ScalarStyle::Literal } if value == "line1\nline2")
        ));
    }

    #[test]
    fn unknown_directive_is_a_warning_not_an_error() {
        let reader = Reader::from_slice(b"%FOO bar\n---\n");
        let mut scanner = Scanner::new(reader);
        loop {
            let token = scanner.scan().unwrap();
            if matches!(token.data, TokenData::StreamEnd) {
                break;
            }
        }
        let warnings = scanner.take_warnings();
        assert!(matches!(&warnings[0], Warning::UnknownDirective { name, .. } if name == "FOO"));
    }

    #[test]
    fn simple_key_limit_is_enforced() {
        let long_key = "a".repeat(2000);
        let input = format!("{long_key}: 1\n");
        let reader = Reader::from_slice(input.as_bytes());
        let mut scanner = Scanner::new(reader);
        loop {
            match scanner.scan() {
                Ok(token) if matches!(token.data, TokenData::StreamEnd) => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
    }
}

//! Home to the YAML Scanner.
//!
//! The scanner is the lowest-level parsing utility. It is the lexer / tokenizer, reading
//! characters from the [`Reader`] and emitting [`Token`]s. It does not check the order of the
//! tokens; that is the [`Parser`](crate::parser::Parser)'s job.
//!
//! Besides tokens, the scanner records every comment it skips, with its position, so that
//! round-trip loading can re-attach them to nodes.

use std::collections::{HashSet, VecDeque};

use crate::char_traits::{
    as_hex, is_alpha, is_anchor_char, is_blank, is_blank_or_breakz, is_bom, is_break, is_breakz,
    is_digit, is_flow, is_hex, is_tag_char, is_uri_char, is_z,
};
pub use crate::error::ScanError;
pub use crate::reader::Marker;
use crate::reader::Reader;

/// The encoding of the input. Byte sources are always decoded to UTF-8 by the reader.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
pub enum TEncoding {
    Utf8,
}

/// The style as which the scalar was written in the YAML document.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash, PartialOrd, Ord)]
pub enum TScalarStyle {
    /// A YAML plain scalar.
    Plain,
    /// A YAML single quoted scalar.
    SingleQuoted,
    /// A YAML double quoted scalar.
    DoubleQuoted,
    /// A YAML literal block (`|` block).
    Literal,
    /// A YAML folded block (`>` block).
    Folded,
}

/// A range of locations in a YAML document.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
pub struct Span {
    /// The start (inclusive) of the range.
    pub start: Marker,
    /// The end (exclusive) of the range.
    pub end: Marker,
}

impl Span {
    #[must_use]
    pub fn new(start: Marker, end: Marker) -> Span {
        Span { start, end }
    }

    #[must_use]
    pub fn empty(mark: Marker) -> Span {
        Span {
            start: mark,
            end: mark,
        }
    }
}

/// The contents of a scanner token.
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum TokenType {
    /// The start of the stream. Sent first, before even [`TokenType::DocumentStart`].
    StreamStart(TEncoding),
    /// The end of the stream, EOF.
    StreamEnd,
    /// A YAML version directive: major, minor.
    VersionDirective(u32, u32),
    /// A YAML tag directive (e.g.: `!!` or `!foo!`): handle, prefix.
    TagDirective(String, String),
    /// The start of a YAML document (`---`).
    DocumentStart,
    /// The end of a YAML document (`...`).
    DocumentEnd,
    /// The start of a sequence block.
    BlockSequenceStart,
    /// The start of a mapping block.
    BlockMappingStart,
    /// End of the corresponding `BlockSequenceStart` or `BlockMappingStart`.
    BlockEnd,
    /// Start of an inline sequence (`[ a, b ]`).
    FlowSequenceStart,
    /// End of an inline sequence.
    FlowSequenceEnd,
    /// Start of an inline mapping (`{ a: b, c: d }`).
    FlowMappingStart,
    /// End of an inline mapping.
    FlowMappingEnd,
    /// An entry in a block sequence (`- `).
    BlockEntry,
    /// An entry in a flow sequence or mapping (`,`).
    FlowEntry,
    /// A key in a mapping (explicit `? ` or implicit).
    Key,
    /// A value in a mapping (`: `).
    Value,
    /// A reference to an anchor.
    Alias(String),
    /// A YAML anchor (`&`/`*`).
    Anchor(String),
    /// A YAML tag: handle, suffix. The suffix has its `%` escapes decoded.
    Tag(String, String),
    /// A regular YAML scalar.
    Scalar(TScalarStyle, String),
}

/// A scanner token.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct Token(pub Span, pub TokenType);

/// A comment found between tokens.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct Comment {
    /// Position of the `#`.
    pub mark: Marker,
    /// The comment text, `#` included, up to (excluding) the line break.
    pub text: String,
    /// Whether nothing but whitespace precedes the comment on its line.
    pub standalone: bool,
}

/// A possible implicit key: a node that may turn into a mapping key if a `:` follows.
#[derive(Clone, PartialEq, Debug, Eq)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Marker,
}

impl SimpleKey {
    fn new(mark: Marker) -> SimpleKey {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum Chomping {
    /// `-`: trailing line breaks are dropped.
    Strip,
    /// Default: a single trailing line break is kept.
    Clip,
    /// `+`: all trailing line breaks are kept.
    Keep,
}

/// The YAML scanner.
pub struct Scanner<'a> {
    reader: Reader<'a>,
    tokens: VecDeque<Token>,
    error: Option<ScanError>,

    stream_start_produced: bool,
    stream_end_produced: bool,
    stream_end_fetched: bool,
    /// Character index right after a JSON-like node (quoted scalar, flow collection end),
    /// where `:` is a value indicator even without a following blank.
    adjacent_value_allowed_at: usize,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
    indent: isize,
    indents: Vec<isize>,
    flow_level: usize,
    tokens_parsed: usize,
    token_available: bool,

    comments: VecDeque<Comment>,
    /// Line on which the last token with content ended.
    last_token_line: usize,
    /// Start marks of top-level block scalars whose content had no indentation.
    unindented_block_scalars: HashSet<Marker>,
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;
    fn next(&mut self) -> Option<Token> {
        if self.error.is_some() {
            return None;
        }
        match self.next_token() {
            Ok(tok) => tok,
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

/// A convenience alias for scanner functions that may fail without returning a value.
pub type ScanResult = Result<(), ScanError>;

impl<'a> Scanner<'a> {
    /// Creates the YAML tokenizer.
    #[must_use]
    pub fn new(reader: Reader<'a>) -> Scanner<'a> {
        Scanner {
            reader,
            tokens: VecDeque::new(),
            error: None,

            stream_start_produced: false,
            stream_end_produced: false,
            stream_end_fetched: false,
            adjacent_value_allowed_at: usize::MAX,
            simple_key_allowed: true,
            simple_keys: Vec::new(),
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            tokens_parsed: 0,
            token_available: false,

            comments: VecDeque::new(),
            last_token_line: 0,
            unindented_block_scalars: HashSet::new(),
        }
    }

    /// Get a copy of the last error that was encountered, if any.
    ///
    /// This does not clear the error state and further calls to [`Self::get_error`] will
    /// return (a clone of) the same error.
    #[inline]
    #[must_use]
    pub fn get_error(&self) -> Option<ScanError> {
        self.error.clone()
    }

    #[inline]
    fn lookahead(&mut self, count: usize) -> ScanResult {
        self.reader.lookahead(count)?;
        Ok(())
    }

    #[inline]
    fn skip(&mut self) {
        self.reader.forward();
    }

    #[inline]
    fn ch(&self) -> char {
        self.reader.peek(0)
    }

    #[inline]
    fn ch_is(&self, c: char) -> bool {
        self.reader.peek(0) == c
    }

    #[inline]
    fn peek(&self, idx: usize) -> char {
        self.reader.peek(idx)
    }

    #[inline]
    #[must_use]
    pub fn stream_started(&self) -> bool {
        self.stream_start_produced
    }

    #[inline]
    #[must_use]
    pub fn stream_ended(&self) -> bool {
        self.stream_end_produced
    }

    #[inline]
    #[must_use]
    pub fn mark(&self) -> Marker {
        self.reader.mark()
    }

    /// Comments scanned so far and not yet taken by the consumer, in source order.
    pub fn comments_mut(&mut self) -> &mut VecDeque<Comment> {
        &mut self.comments
    }

    /// Whether the block scalar starting at `mark` is a top-level one whose content was not
    /// indented and whose indentation was not given explicitly.
    #[must_use]
    pub fn is_unindented_block_scalar(&self, mark: Marker) -> bool {
        self.unindented_block_scalars.contains(&mark)
    }

    fn is_document_indicator(&self) -> bool {
        self.mark().col() == 0
            && ((self.peek(0) == '-' && self.peek(1) == '-' && self.peek(2) == '-')
                || (self.peek(0) == '.' && self.peek(1) == '.' && self.peek(2) == '.'))
            && is_blank_or_breakz(self.peek(3))
    }

    fn read_break(&mut self, s: &mut String) {
        if self.ch_is('\r') && self.peek(1) == '\n' {
            s.push('\n');
            self.skip();
            self.skip();
        } else if is_break(self.ch()) {
            s.push('\n');
            self.skip();
        }
    }

    fn skip_line(&mut self) {
        if self.ch_is('\r') && self.peek(1) == '\n' {
            self.skip();
            self.skip();
        } else if is_break(self.ch()) {
            self.skip();
        }
    }

    fn push_token(&mut self, tok: Token) {
        if tok.0.end.line() > self.last_token_line {
            self.last_token_line = tok.0.end.line();
        }
        self.tokens.push_back(tok);
    }

    fn insert_token(&mut self, pos: usize, tok: Token) {
        self.tokens.insert(pos, tok);
    }

    fn allow_simple_key(&mut self) {
        self.simple_key_allowed = true;
    }

    fn disallow_simple_key(&mut self) {
        self.simple_key_allowed = false;
    }

    /// Fetch the next token, push it to the token queue.
    pub fn fetch_next_token(&mut self) -> ScanResult {
        self.lookahead(1)?;

        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        if self.stream_end_fetched {
            return Ok(());
        }
        self.skip_to_next_token()?;

        self.stale_simple_keys()?;

        let mark = self.mark();
        self.unroll_indent(mark.col() as isize);

        self.lookahead(4)?;

        if is_z(self.ch()) {
            self.fetch_stream_end()?;
            return Ok(());
        }

        if self.mark().col() == 0 && self.ch_is('%') {
            return self.fetch_directive();
        }

        if self.mark().col() == 0
            && self.peek(0) == '-'
            && self.peek(1) == '-'
            && self.peek(2) == '-'
            && is_blank_or_breakz(self.peek(3))
        {
            return self.fetch_document_indicator(TokenType::DocumentStart);
        }

        if self.mark().col() == 0
            && self.peek(0) == '.'
            && self.peek(1) == '.'
            && self.peek(2) == '.'
            && is_blank_or_breakz(self.peek(3))
        {
            return self.fetch_document_indicator(TokenType::DocumentEnd);
        }

        let c = self.peek(0);
        let nc = self.peek(1);
        match c {
            '[' => self.fetch_flow_collection_start(TokenType::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenType::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenType::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenType::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blank_or_breakz(nc) => self.fetch_block_entry(),
            '?' if is_blank_or_breakz(nc) => self.fetch_key(),
            ':' if is_blank_or_breakz(nc)
                || (self.flow_level > 0
                    && (is_flow(nc) || self.mark().index() == self.adjacent_value_allowed_at)) =>
            {
                self.fetch_value()
            }
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            // plain scalar
            '-' if !is_blank_or_breakz(nc) => self.fetch_plain_scalar(),
            ':' | '?' if !is_blank_or_breakz(nc) && self.flow_level == 0 => {
                self.fetch_plain_scalar()
            }
            '%' | '@' | '`' => Err(ScanError::new(
                self.mark(),
                &format!("unexpected character: `{c}'"),
            )),
            _ => self.fetch_plain_scalar(),
        }
    }

    /// Return the next token in the stream.
    /// # Errors
    /// Returns `ScanError` when scanning fails to find an expected next token.
    pub fn next_token(&mut self) -> Result<Option<Token>, ScanError> {
        if self.stream_end_produced {
            return Ok(None);
        }

        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let Some(t) = self.tokens.pop_front() else {
            return Err(ScanError::new(self.mark(), "unexpected end of the token queue"));
        };
        self.token_available = false;
        self.tokens_parsed += 1;

        if let TokenType::StreamEnd = t.1 {
            self.stream_end_produced = true;
        }
        log::trace!("token {:?}", t.1);
        Ok(Some(t))
    }

    /// Fetch tokens from the token stream.
    /// # Errors
    /// Returns `ScanError` when loading fails.
    pub fn fetch_more_tokens(&mut self) -> ScanResult {
        let mut need_more;
        loop {
            if self.tokens.is_empty() {
                need_more = true;
            } else {
                need_more = false;
                self.stale_simple_keys()?;
                for sk in &self.simple_keys {
                    if sk.possible && sk.token_number == self.tokens_parsed {
                        need_more = true;
                        break;
                    }
                }
            }

            if !need_more || self.stream_end_fetched {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;

        Ok(())
    }

    fn stale_simple_keys(&mut self) -> ScanResult {
        let mark = self.mark();
        for sk in &mut self.simple_keys {
            if sk.possible
                && (sk.mark.line() < mark.line() || sk.mark.index() + 1024 < mark.index())
            {
                if sk.required {
                    return Err(ScanError::new(mark, "simple key expect ':'"));
                }
                sk.possible = false;
            }
        }
        Ok(())
    }

    fn skip_to_next_token(&mut self) -> ScanResult {
        loop {
            self.lookahead(1)?;
            match self.ch() {
                ' ' => self.skip(),
                '\t' if self.flow_level > 0 || !self.simple_key_allowed => self.skip(),
                c if is_bom(c) && self.mark().col() == 0 => self.skip(),
                '\n' | '\r' => {
                    self.lookahead(2)?;
                    self.skip_line();
                    if self.flow_level == 0 {
                        self.allow_simple_key();
                    }
                }
                '#' => self.scan_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Record a comment; the current character is `#`.
    fn scan_comment(&mut self) -> ScanResult {
        let mark = self.mark();
        let mut text = String::new();
        while !is_breakz(self.ch()) {
            text.push(self.ch());
            self.skip();
            self.lookahead(1)?;
        }
        self.comments.push_back(Comment {
            mark,
            text,
            standalone: mark.line() > self.last_token_line,
        });
        Ok(())
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.mark();
        self.indent = -1;
        self.stream_start_produced = true;
        self.allow_simple_key();
        self.tokens
            .push_back(Token(Span::empty(mark), TokenType::StreamStart(TEncoding::Utf8)));
        self.simple_keys.push(SimpleKey::new(Marker::new(0, 0, 0)));
    }

    fn fetch_stream_end(&mut self) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.disallow_simple_key();
        self.stream_end_fetched = true;

        let mark = self.mark();
        self.tokens
            .push_back(Token(Span::empty(mark), TokenType::StreamEnd));
        Ok(())
    }

    fn fetch_directive(&mut self) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.disallow_simple_key();

        if let Some(tok) = self.scan_directive()? {
            self.push_token(tok);
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<Option<Token>, ScanError> {
        let start_mark = self.mark();
        self.skip();

        let name = self.scan_directive_name()?;
        let tok = match name.as_ref() {
            "YAML" => {
                let (major, minor) = self.scan_version_directive_value(&start_mark)?;
                Some(TokenType::VersionDirective(major, minor))
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start_mark)?;
                Some(TokenType::TagDirective(handle, prefix))
            }
            _ => {
                log::warn!(
                    "unknown directive %{} at line {} ignored",
                    name,
                    start_mark.line()
                );
                self.lookahead(1)?;
                while !is_breakz(self.ch()) {
                    self.skip();
                    self.lookahead(1)?;
                }
                None
            }
        };
        let end_mark = self.mark();

        self.lookahead(1)?;
        while is_blank(self.ch()) {
            self.skip();
            self.lookahead(1)?;
        }

        if self.ch() == '#' {
            self.scan_comment()?;
        }

        if !is_breakz(self.ch()) {
            return Err(ScanError::new(
                start_mark,
                "while scanning a directive, did not find expected comment or line break",
            ));
        }

        // Eat a line break
        if is_break(self.ch()) {
            self.lookahead(2)?;
            self.skip_line();
        }

        Ok(tok.map(|t| Token(Span::new(start_mark, end_mark), t)))
    }

    fn scan_directive_name(&mut self) -> Result<String, ScanError> {
        let start_mark = self.mark();
        let mut string = String::new();
        self.lookahead(1)?;
        while is_alpha(self.ch()) {
            string.push(self.ch());
            self.skip();
            self.lookahead(1)?;
        }

        if string.is_empty() {
            return Err(ScanError::new(
                start_mark,
                "while scanning a directive, could not find expected directive name",
            ));
        }

        if !is_blank_or_breakz(self.ch()) {
            return Err(ScanError::new(
                start_mark,
                "while scanning a directive, found unexpected non-alphabetical character",
            ));
        }

        Ok(string)
    }

    fn scan_version_directive_value(&mut self, mark: &Marker) -> Result<(u32, u32), ScanError> {
        self.lookahead(1)?;

        while is_blank(self.ch()) {
            self.skip();
            self.lookahead(1)?;
        }

        let major = self.scan_version_directive_number(mark)?;

        if self.ch() != '.' {
            return Err(ScanError::new(
                *mark,
                "while scanning a YAML directive, did not find expected digit or '.' character",
            ));
        }

        self.skip();

        let minor = self.scan_version_directive_number(mark)?;

        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, mark: &Marker) -> Result<u32, ScanError> {
        let mut val = 0u32;
        let mut length = 0usize;
        self.lookahead(1)?;
        while let Some(digit) = self.ch().to_digit(10) {
            if length + 1 > 9 {
                return Err(ScanError::new(
                    *mark,
                    "while scanning a YAML directive, found extremely long version number",
                ));
            }
            length += 1;
            val = val * 10 + digit;
            self.skip();
            self.lookahead(1)?;
        }

        if length == 0 {
            return Err(ScanError::new(
                *mark,
                "while scanning a YAML directive, did not find expected version number",
            ));
        }

        Ok(val)
    }

    fn scan_tag_directive_value(&mut self, mark: &Marker) -> Result<(String, String), ScanError> {
        self.lookahead(1)?;
        // Eat whitespaces.
        while is_blank(self.ch()) {
            self.skip();
            self.lookahead(1)?;
        }
        let handle = self.scan_tag_handle(true, mark)?;

        self.lookahead(1)?;
        // Eat whitespaces.
        while is_blank(self.ch()) {
            self.skip();
            self.lookahead(1)?;
        }

        let prefix = self.scan_tag_uri(true, true, "", mark)?;

        self.lookahead(1)?;

        if is_blank_or_breakz(self.ch()) {
            Ok((handle, prefix))
        } else {
            Err(ScanError::new(
                *mark,
                "while scanning TAG, did not find expected whitespace or line break",
            ))
        }
    }

    fn fetch_tag(&mut self) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let tok = self.scan_tag()?;
        self.push_token(tok);
        Ok(())
    }

    fn scan_tag(&mut self) -> Result<Token, ScanError> {
        let start_mark = self.mark();
        let mut handle = String::new();
        let mut suffix;

        // Check if the tag is in the canonical form (verbatim).
        self.lookahead(2)?;

        if self.peek(1) == '<' {
            // Eat '!<'
            self.skip();
            self.skip();
            suffix = self.scan_tag_uri(false, true, "", &start_mark)?;

            if self.ch() != '>' {
                return Err(ScanError::new(
                    start_mark,
                    "while scanning a tag, did not find the expected '>'",
                ));
            }

            self.skip();
        } else {
            // The tag has either the '!suffix' or the '!handle!suffix'
            handle = self.scan_tag_handle(false, &start_mark)?;
            // Check if it is, indeed, handle.
            if handle.len() >= 2 && handle.starts_with('!') && handle.ends_with('!') {
                suffix = self.scan_tag_uri(false, false, "", &start_mark)?;
            } else {
                suffix = self.scan_tag_uri(false, false, &handle, &start_mark)?;
                handle = "!".to_owned();
                // A special case: the '!' tag.  Set the handle to '' and the
                // suffix to '!'.
                if suffix.is_empty() {
                    handle.clear();
                    suffix = "!".to_owned();
                }
            }
        }

        self.lookahead(1)?;
        if is_blank_or_breakz(self.ch()) || (self.flow_level > 0 && is_flow(self.ch())) {
            // XXX: ex 7.2, an empty scalar can follow a secondary tag
            Ok(Token(
                Span::new(start_mark, self.mark()),
                TokenType::Tag(handle, suffix),
            ))
        } else {
            Err(ScanError::new(
                start_mark,
                "while scanning a tag, did not find expected whitespace or line break",
            ))
        }
    }

    fn scan_tag_handle(&mut self, directive: bool, mark: &Marker) -> Result<String, ScanError> {
        let mut string = String::new();
        self.lookahead(1)?;
        if self.ch() != '!' {
            return Err(ScanError::new(
                *mark,
                "while scanning a tag, did not find expected '!'",
            ));
        }

        string.push(self.ch());
        self.skip();

        self.lookahead(1)?;
        while is_alpha(self.ch()) {
            string.push(self.ch());
            self.skip();
            self.lookahead(1)?;
        }

        // Check if the trailing character is '!' and copy it.
        if self.ch() == '!' {
            string.push(self.ch());
            self.skip();
        } else if directive && string != "!" {
            // It's either the '!' tag or not really a tag handle.  If it's a %TAG
            // directive, it's an error.  If it's a tag token, it must be a part of
            // URI.
            return Err(ScanError::new(
                *mark,
                "while parsing a tag directive, did not find expected '!'",
            ));
        }
        Ok(string)
    }

    /// Scan the URI part of a tag. `head` is the beginning of a primary handle (`!foo`)
    /// that turned out to be part of the suffix.
    fn scan_tag_uri(
        &mut self,
        directive: bool,
        verbatim: bool,
        head: &str,
        mark: &Marker,
    ) -> Result<String, ScanError> {
        let mut length = head.len();
        let mut string = String::new();

        // Copy the head if needed.
        // Note that we don't copy the leading '!' character.
        if length > 1 {
            string.extend(head.chars().skip(1));
        }

        self.lookahead(1)?;
        loop {
            let c = self.ch();
            // Flow indicators end a tag inside a flow collection.
            let accept = if verbatim || directive || self.flow_level == 0 {
                is_uri_char(c)
            } else {
                is_tag_char(c) || c == '!'
            };
            if !accept {
                break;
            }
            // Check if it is a URI-escape sequence.
            if c == '%' {
                string.push(self.scan_uri_escapes(mark)?);
            } else {
                string.push(c);
                self.skip();
            }

            length += 1;
            self.lookahead(1)?;
        }

        if length == 0 {
            return Err(ScanError::new(
                *mark,
                "while parsing a tag, did not find expected tag URI",
            ));
        }

        Ok(string)
    }

    /// Decode a run of `%XX` escapes forming one UTF-8 encoded character.
    fn scan_uri_escapes(&mut self, mark: &Marker) -> Result<char, ScanError> {
        let mut width = 0usize;
        let mut code = 0u32;
        loop {
            self.lookahead(3)?;

            if !(self.ch() == '%' && is_hex(self.peek(1)) && is_hex(self.peek(2))) {
                return Err(ScanError::new(
                    *mark,
                    "while parsing a tag, did not find URI escaped octet",
                ));
            }

            let octet = (as_hex(self.peek(1)) << 4) + as_hex(self.peek(2));
            if width == 0 {
                width = match octet {
                    _ if octet & 0x80 == 0x00 => 1,
                    _ if octet & 0xE0 == 0xC0 => 2,
                    _ if octet & 0xF0 == 0xE0 => 3,
                    _ if octet & 0xF8 == 0xF0 => 4,
                    _ => {
                        return Err(ScanError::new(
                            *mark,
                            "while parsing a tag, found an incorrect leading UTF-8 octet",
                        ));
                    }
                };
                code = octet;
            } else {
                if octet & 0xc0 != 0x80 {
                    return Err(ScanError::new(
                        *mark,
                        "while parsing a tag, found an incorrect trailing UTF-8 octet",
                    ));
                }
                code = (code << 8) + octet;
            }

            self.skip();
            self.skip();
            self.skip();

            width -= 1;
            if width == 0 {
                break;
            }
        }

        let bytes = code.to_be_bytes();
        let used = bytes.iter().skip_while(|b| **b == 0).count().max(1);
        match std::str::from_utf8(&bytes[4 - used..]) {
            Ok(s) => s.chars().next().ok_or_else(|| {
                ScanError::new(*mark, "while parsing a tag, found an invalid UTF-8 codepoint")
            }),
            Err(_) => Err(ScanError::new(
                *mark,
                "while parsing a tag, found an invalid UTF-8 codepoint",
            )),
        }
    }

    fn fetch_anchor(&mut self, alias: bool) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let tok = self.scan_anchor(alias)?;

        self.push_token(tok);

        Ok(())
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScanError> {
        let mut string = String::new();
        let start_mark = self.mark();

        self.skip();
        self.lookahead(1)?;
        while is_anchor_char(self.ch()) {
            string.push(self.ch());
            self.skip();
            self.lookahead(1)?;
        }

        if string.is_empty() {
            return Err(ScanError::new(
                start_mark,
                "while scanning an anchor or alias, did not find expected alphabetic or numeric character",
            ));
        }

        let span = Span::new(start_mark, self.mark());
        if alias {
            Ok(Token(span, TokenType::Alias(string)))
        } else {
            Ok(Token(span, TokenType::Anchor(string)))
        }
    }

    fn fetch_flow_collection_start(&mut self, tok: TokenType) -> ScanResult {
        // The indicators '[' and '{' may start a simple key.
        self.save_simple_key()?;

        self.increase_flow_level()?;

        self.allow_simple_key();

        let start_mark = self.mark();
        self.skip();

        self.push_token(Token(Span::new(start_mark, self.mark()), tok));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, tok: TokenType) -> ScanResult {
        self.remove_simple_key()?;
        self.decrease_flow_level();

        self.disallow_simple_key();

        let start_mark = self.mark();
        self.skip();
        self.adjacent_value_allowed_at = self.mark().index();

        self.push_token(Token(Span::new(start_mark, self.mark()), tok));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> ScanResult {
        self.remove_simple_key()?;
        self.allow_simple_key();

        let start_mark = self.mark();
        self.skip();

        self.push_token(Token(
            Span::new(start_mark, self.mark()),
            TokenType::FlowEntry,
        ));
        Ok(())
    }

    fn increase_flow_level(&mut self) -> ScanResult {
        self.simple_keys.push(SimpleKey::new(Marker::new(0, 0, 0)));
        self.flow_level = self
            .flow_level
            .checked_add(1)
            .ok_or_else(|| ScanError::new(self.mark(), "recursion limit exceeded"))?;
        Ok(())
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    fn fetch_block_entry(&mut self) -> ScanResult {
        if self.flow_level > 0 {
            return Err(ScanError::new(
                self.mark(),
                r#""-" is only valid inside a block"#,
            ));
        }
        // Check if we are allowed to start a new entry.
        if !self.simple_key_allowed {
            return Err(ScanError::new(
                self.mark(),
                "block sequence entries are not allowed in this context",
            ));
        }

        let mark = self.mark();
        // generate BLOCK-SEQUENCE-START if indented
        self.roll_indent(mark.col(), None, TokenType::BlockSequenceStart, mark);

        self.remove_simple_key()?;
        self.allow_simple_key();

        let start_mark = self.mark();
        self.skip();

        self.push_token(Token(
            Span::new(start_mark, self.mark()),
            TokenType::BlockEntry,
        ));
        Ok(())
    }

    fn fetch_document_indicator(&mut self, t: TokenType) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.disallow_simple_key();

        let mark = self.mark();

        self.skip();
        self.skip();
        self.skip();

        self.push_token(Token(Span::new(mark, self.mark()), t));
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> ScanResult {
        self.save_simple_key()?;
        self.allow_simple_key();
        let tok = self.scan_block_scalar(literal)?;

        self.push_token(tok);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScanError> {
        let start_mark = self.mark();
        let mut chomping = Chomping::Clip;
        let mut increment: usize = 0;
        let mut indent: usize = 0;
        let mut indent_known = false;
        let mut trailing_blank: bool;
        let mut leading_blank: bool = false;

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();

        // skip '|' or '>'
        self.skip();
        self.lookahead(1)?;

        if self.ch() == '+' || self.ch() == '-' {
            chomping = if self.ch() == '+' {
                Chomping::Keep
            } else {
                Chomping::Strip
            };
            self.skip();
            self.lookahead(1)?;
            if is_digit(self.ch()) {
                if self.ch() == '0' {
                    return Err(ScanError::new(
                        start_mark,
                        "while scanning a block scalar, found an indentation indicator equal to 0",
                    ));
                }
                increment = (self.ch() as usize) - ('0' as usize);
                self.skip();
            }
        } else if is_digit(self.ch()) {
            if self.ch() == '0' {
                return Err(ScanError::new(
                    start_mark,
                    "while scanning a block scalar, found an indentation indicator equal to 0",
                ));
            }

            increment = (self.ch() as usize) - ('0' as usize);
            self.skip();
            self.lookahead(1)?;
            if self.ch() == '+' || self.ch() == '-' {
                chomping = if self.ch() == '+' {
                    Chomping::Keep
                } else {
                    Chomping::Strip
                };
                self.skip();
            }
        }

        // Eat whitespaces and comments to the end of the line.
        self.lookahead(1)?;

        while is_blank(self.ch()) {
            self.skip();
            self.lookahead(1)?;
        }

        if self.ch() == '#' {
            self.scan_comment()?;
        }

        // Check if we are at the end of the line.
        if !is_breakz(self.ch()) {
            return Err(ScanError::new(
                start_mark,
                "while scanning a block scalar, did not find expected comment or line break",
            ));
        }

        if is_break(self.ch()) {
            self.lookahead(2)?;
            self.skip_line();
        }

        if increment > 0 {
            indent = if self.indent >= 0 {
                (self.indent as usize) + increment
            } else {
                increment
            };
            indent_known = true;
        }

        let mut end_mark = self.mark();
        // Scan the leading line breaks and determine the indentation level if needed.
        self.block_scalar_breaks(&mut indent, &mut indent_known, &mut trailing_breaks)?;

        self.lookahead(1)?;

        if indent == 0 && !is_z(self.ch()) {
            self.unindented_block_scalars.insert(start_mark);
        }

        while self.mark().col() == indent && !is_z(self.ch()) {
            if indent == 0 {
                self.lookahead(4)?;
                if self.is_document_indicator() {
                    break;
                }
            }
            // We are at the beginning of a non-empty line.
            trailing_blank = is_blank(self.ch());
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank
            {
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

            leading_blank = is_blank(self.ch());

            while !is_breakz(self.ch()) {
                string.push(self.ch());
                self.skip();
                self.lookahead(1)?;
            }
            end_mark = self.mark();
            // break on EOF
            if is_z(self.ch()) {
                break;
            }

            self.lookahead(2)?;
            self.read_break(&mut leading_break);

            // Eat the following indentation spaces and line breaks.
            self.block_scalar_breaks(&mut indent, &mut indent_known, &mut trailing_breaks)?;
        }

        // Chomp the tail.
        if chomping != Chomping::Strip {
            string.push_str(&leading_break);
        }

        if chomping == Chomping::Keep {
            string.push_str(&trailing_breaks);
            // The kept breaks belong to the scalar.
            let line = self.mark().line().saturating_sub(1).max(end_mark.line());
            end_mark = Marker::new(self.mark().index(), line, 0);
        }

        let style = if literal {
            TScalarStyle::Literal
        } else {
            TScalarStyle::Folded
        };
        Ok(Token(
            Span::new(start_mark, end_mark),
            TokenType::Scalar(style, string),
        ))
    }

    fn block_scalar_breaks(
        &mut self,
        indent: &mut usize,
        indent_known: &mut bool,
        breaks: &mut String,
    ) -> ScanResult {
        let mut max_indent = 0;
        loop {
            self.lookahead(1)?;
            while (!*indent_known || self.mark().col() < *indent) && self.ch() == ' ' {
                self.skip();
                self.lookahead(1)?;
            }

            if self.mark().col() > max_indent {
                max_indent = self.mark().col();
            }

            // Check for a tab character messing the indentation.
            if (!*indent_known || self.mark().col() < *indent) && self.ch() == '\t' {
                return Err(ScanError::new(
                    self.mark(),
                    "while scanning a block scalar, found a tab character where an indentation space is expected",
                ));
            }

            if !is_break(self.ch()) {
                break;
            }

            self.lookahead(2)?;
            // Consume the line break.
            self.read_break(breaks);
        }

        if !*indent_known {
            // A top-level block scalar may start in the first column.
            let min = if self.indent >= 0 {
                (self.indent as usize) + 1
            } else {
                0
            };
            *indent = max_indent.max(min);
            *indent_known = true;
        }

        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let tok = self.scan_flow_scalar(single)?;

        // YAML 1.2: to ensure JSON compatibility, if a key inside a flow mapping is JSON-like,
        // YAML allows the following value to be specified adjacent to the “:”.
        self.adjacent_value_allowed_at = self.mark().index();

        self.push_token(tok);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScanError> {
        let start_mark = self.mark();

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks;

        /* Eat the left quote. */
        self.skip();

        loop {
            /* Check for a document indicator. */
            self.lookahead(4)?;

            if self.is_document_indicator() {
                return Err(ScanError::new(
                    start_mark,
                    "while scanning a quoted scalar, found unexpected document indicator",
                ));
            }

            if is_z(self.ch()) {
                return Err(ScanError::new(
                    start_mark,
                    "while scanning a quoted scalar, found unexpected end of stream",
                ));
            }

            self.lookahead(2)?;

            leading_blanks = false;
            // Consume non-blank characters.

            while !is_blank_or_breakz(self.ch()) {
                match self.ch() {
                    // Check for an escaped single quote.
                    '\'' if self.peek(1) == '\'' && single => {
                        string.push('\'');
                        self.skip();
                        self.skip();
                    }
                    // Check for the right quote.
                    '\'' if single => break,
                    '"' if !single => break,
                    // Check for an escaped line break.
                    '\\' if !single && is_break(self.peek(1)) => {
                        self.lookahead(3)?;
                        self.skip();
                        self.skip_line();
                        leading_blanks = true;
                        break;
                    }
                    // Check for an escape sequence.
                    '\\' if !single => {
                        string.push(self.scan_escape(&start_mark)?);
                    }
                    c => {
                        string.push(c);
                        self.skip();
                    }
                }
                self.lookahead(2)?;
            }
            self.lookahead(1)?;
            match self.ch() {
                '\'' if single => break,
                '"' if !single => break,
                _ => {}
            }

            // Consume blank characters.
            while is_blank(self.ch()) || is_break(self.ch()) {
                if is_blank(self.ch()) {
                    // Consume a space or a tab character.
                    if leading_blanks {
                        self.skip();
                    } else {
                        whitespaces.push(self.ch());
                        self.skip();
                    }
                } else {
                    self.lookahead(2)?;
                    // Check if it is a first line break.
                    if leading_blanks {
                        self.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.lookahead(1)?;
            }

            // Join the whitespaces or fold line breaks.
            if leading_blanks {
                if leading_break.is_empty() {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    trailing_breaks.clear();
                    leading_break.clear();
                } else {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        } // loop

        // Eat the right quote.
        self.skip();
        let end_mark = self.mark();

        let style = if single {
            TScalarStyle::SingleQuoted
        } else {
            TScalarStyle::DoubleQuoted
        };
        Ok(Token(
            Span::new(start_mark, end_mark),
            TokenType::Scalar(style, string),
        ))
    }

    /// Decode a `\` escape in a double-quoted scalar; the current character is the `\`.
    fn scan_escape(&mut self, start_mark: &Marker) -> Result<char, ScanError> {
        let mut code_length = 0usize;
        let ret = match self.peek(1) {
            '0' => '\0',
            'a' => '\x07',
            'b' => '\x08',
            't' | '\t' => '\t',
            'n' => '\n',
            'v' => '\x0b',
            'f' => '\x0c',
            'r' => '\r',
            'e' => '\x1b',
            ' ' => ' ',
            '"' => '"',
            '/' => '/',
            '\\' => '\\',
            // NEL (#x85)
            'N' => '\u{85}',
            // #xA0
            '_' => '\u{a0}',
            // LS (#x2028)
            'L' => '\u{2028}',
            // PS (#x2029)
            'P' => '\u{2029}',
            'x' => {
                code_length = 2;
                '\0'
            }
            'u' => {
                code_length = 4;
                '\0'
            }
            'U' => {
                code_length = 8;
                '\0'
            }
            _ => {
                return Err(ScanError::new(
                    *start_mark,
                    "while parsing a quoted scalar, found unknown escape character",
                ))
            }
        };
        self.skip();
        self.skip();
        if code_length == 0 {
            return Ok(ret);
        }

        self.lookahead(code_length)?;
        let mut value = 0u32;
        for i in 0..code_length {
            let c = self.peek(i);
            if !is_hex(c) {
                return Err(ScanError::new(
                    *start_mark,
                    "while parsing a quoted scalar, did not find expected hexadecimal number",
                ));
            }
            value = (value << 4) + as_hex(c);
        }

        let Some(ch) = char::from_u32(value) else {
            return Err(ScanError::new(
                *start_mark,
                "while parsing a quoted scalar, found invalid Unicode character escape code",
            ));
        };

        for _ in 0..code_length {
            self.skip();
        }
        Ok(ch)
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult {
        self.save_simple_key()?;
        self.disallow_simple_key();

        let tok = self.scan_plain_scalar()?;

        self.push_token(tok);
        Ok(())
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, ScanError> {
        let indent = self.indent + 1;
        let start_mark = self.mark();
        let mut end_mark = start_mark;

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;

        loop {
            /* Check for a document indicator. */
            self.lookahead(4)?;

            if self.is_document_indicator() {
                break;
            }

            if self.ch() == '#' {
                break;
            }
            while !is_blank_or_breakz(self.ch()) {
                // indicators can end a plain scalar, see 7.3.3. Plain Style
                match self.ch() {
                    ':' if is_blank_or_breakz(self.peek(1))
                        || (self.flow_level > 0 && is_flow(self.peek(1))) =>
                    {
                        break;
                    }
                    c if self.flow_level > 0 && is_flow(c) => break,
                    _ => {}
                }

                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break.is_empty() {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            trailing_breaks.clear();
                            leading_break.clear();
                        } else {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                            leading_break.clear();
                        }
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }

                string.push(self.ch());
                self.skip();
                self.lookahead(2)?;
                end_mark = self.mark();
            }
            // is the end?
            if !(is_blank(self.ch()) || is_break(self.ch())) {
                break;
            }
            self.lookahead(1)?;

            while is_blank(self.ch()) || is_break(self.ch()) {
                if is_blank(self.ch()) {
                    if leading_blanks && (self.mark().col() as isize) < indent && self.ch() == '\t'
                    {
                        return Err(ScanError::new(
                            start_mark,
                            "while scanning a plain scalar, found a tab",
                        ));
                    }

                    if leading_blanks {
                        self.skip();
                    } else {
                        whitespaces.push(self.ch());
                        self.skip();
                    }
                } else {
                    self.lookahead(2)?;
                    // Check if it is a first line break
                    if leading_blanks {
                        self.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.lookahead(1)?;
            }

            // check indentation level
            if self.flow_level == 0 && (self.mark().col() as isize) < indent {
                break;
            }
        }

        if leading_blanks {
            self.allow_simple_key();
        }

        if string.is_empty() {
            return Err(ScanError::new(
                start_mark,
                "while scanning a plain scalar, found unexpected character",
            ));
        }

        Ok(Token(
            Span::new(start_mark, end_mark),
            TokenType::Scalar(TScalarStyle::Plain, string),
        ))
    }

    fn fetch_key(&mut self) -> ScanResult {
        let start_mark = self.mark();
        if self.flow_level == 0 {
            // Check if we are allowed to start a new key (not necessarily simple).
            if !self.simple_key_allowed {
                return Err(ScanError::new(
                    self.mark(),
                    "mapping keys are not allowed in this context",
                ));
            }
            self.roll_indent(
                start_mark.col(),
                None,
                TokenType::BlockMappingStart,
                start_mark,
            );
        }

        self.remove_simple_key()?;

        if self.flow_level == 0 {
            self.allow_simple_key();
        } else {
            self.disallow_simple_key();
        }

        self.skip();
        self.push_token(Token(Span::new(start_mark, self.mark()), TokenType::Key));
        Ok(())
    }

    fn fetch_value(&mut self) -> ScanResult {
        let Some(sk) = self.simple_keys.last().cloned() else {
            return Err(ScanError::new(self.mark(), "simple key stack is empty"));
        };
        let start_mark = self.mark();
        if sk.possible {
            // insert simple key
            let tok = Token(Span::empty(sk.mark), TokenType::Key);
            let tokens_parsed = self.tokens_parsed;
            self.insert_token(sk.token_number - tokens_parsed, tok);

            // Add the BLOCK-MAPPING-START token if needed.
            self.roll_indent(
                sk.mark.col(),
                Some(sk.token_number),
                TokenType::BlockMappingStart,
                sk.mark,
            );

            if let Some(last) = self.simple_keys.last_mut() {
                last.possible = false;
            }
            self.disallow_simple_key();
        } else {
            // The ':' indicator follows a complex key.
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(ScanError::new(
                        start_mark,
                        "mapping values are not allowed in this context",
                    ));
                }

                self.roll_indent(
                    start_mark.col(),
                    None,
                    TokenType::BlockMappingStart,
                    start_mark,
                );
            }

            if self.flow_level == 0 {
                self.allow_simple_key();
            } else {
                self.disallow_simple_key();
            }
        }
        self.skip();
        self.push_token(Token(Span::new(start_mark, self.mark()), TokenType::Value));

        Ok(())
    }

    fn roll_indent(&mut self, col: usize, number: Option<usize>, tok: TokenType, mark: Marker) {
        if self.flow_level > 0 {
            return;
        }

        if self.indent < col as isize {
            self.indents.push(self.indent);
            self.indent = col as isize;
            let tokens_parsed = self.tokens_parsed;
            match number {
                Some(n) => self.insert_token(n - tokens_parsed, Token(Span::empty(mark), tok)),
                None => self.tokens.push_back(Token(Span::empty(mark), tok)),
            }
        }
    }

    fn unroll_indent(&mut self, col: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > col {
            let mark = self.mark();
            self.tokens
                .push_back(Token(Span::empty(mark), TokenType::BlockEnd));
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn save_simple_key(&mut self) -> ScanResult {
        let required = self.flow_level == 0 && self.indent == (self.mark().col() as isize);
        if self.simple_key_allowed {
            let mut sk = SimpleKey::new(self.mark());
            sk.possible = true;
            sk.required = required;
            sk.token_number = self.tokens_parsed + self.tokens.len();

            self.remove_simple_key()?;

            self.simple_keys.pop();
            self.simple_keys.push(sk);
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> ScanResult {
        let mark = self.mark();
        if let Some(last) = self.simple_keys.last_mut() {
            if last.possible && last.required {
                return Err(ScanError::new(
                    mark,
                    "while scanning a simple key, could not find expected ':'",
                ));
            }
            last.possible = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::TokenType::*;
    use super::*;

    macro_rules! next {
        ($p:ident, $tk:pat) => {{
            let tok = $p.next().unwrap();
            match tok.1 {
                $tk => {}
                _ => panic!("unexpected token: {:?}", tok),
            }
        }};
    }

    macro_rules! next_scalar {
        ($p:ident, $tk:expr, $v:expr) => {{
            let tok = $p.next().unwrap();
            match tok.1 {
                Scalar(style, ref v) => {
                    assert_eq!(style, $tk);
                    assert_eq!(v, $v);
                }
                _ => panic!("unexpected token: {:?}", tok),
            }
        }};
    }

    macro_rules! end {
        ($p:ident) => {{
            assert_eq!($p.next(), None);
        }};
    }

    fn scanner(s: &str) -> Scanner {
        Scanner::new(Reader::from_str(s))
    }

    #[test]
    fn test_empty() {
        let s = "";
        let mut p = scanner(s);
        next!(p, StreamStart(..));
        next!(p, StreamEnd);
        end!(p);
    }

    #[test]
    fn test_explicit_scalar() {
        let s = "---
'a scalar'
...
";
        let mut p = scanner(s);
        next!(p, StreamStart(..));
        next!(p, DocumentStart);
        next!(p, Scalar(TScalarStyle::SingleQuoted, _));
        next!(p, DocumentEnd);
        next!(p, StreamEnd);
        end!(p);
    }

    #[test]
    fn test_block_mapping() {
        let s = "a simple key: a value
? a complex key
: another value
a mapping:
  key 1: value 1
a sequence:
  - item 1
";
        let mut p = scanner(s);
        next!(p, StreamStart(..));
        next!(p, BlockMappingStart);
        next!(p, Key);
        next_scalar!(p, TScalarStyle::Plain, "a simple key");
        next!(p, Value);
        next_scalar!(p, TScalarStyle::Plain, "a value");
        next!(p, Key);
        next_scalar!(p, TScalarStyle::Plain, "a complex key");
        next!(p, Value);
        next_scalar!(p, TScalarStyle::Plain, "another value");
        next!(p, Key);
        next_scalar!(p, TScalarStyle::Plain, "a mapping");
        next!(p, Value);
        next!(p, BlockMappingStart);
        next!(p, Key);
        next_scalar!(p, TScalarStyle::Plain, "key 1");
        next!(p, Value);
        next_scalar!(p, TScalarStyle::Plain, "value 1");
        next!(p, BlockEnd);
        next!(p, Key);
        next_scalar!(p, TScalarStyle::Plain, "a sequence");
        next!(p, Value);
        next!(p, BlockSequenceStart);
        next!(p, BlockEntry);
        next_scalar!(p, TScalarStyle::Plain, "item 1");
        next!(p, BlockEnd);
        next!(p, BlockEnd);
        next!(p, StreamEnd);
        end!(p);
    }

    #[test]
    fn test_flow_collections() {
        let s = "{a: [1, 2], \"b\":c}";
        let mut p = scanner(s);
        next!(p, StreamStart(..));
        next!(p, FlowMappingStart);
        next!(p, Key);
        next_scalar!(p, TScalarStyle::Plain, "a");
        next!(p, Value);
        next!(p, FlowSequenceStart);
        next_scalar!(p, TScalarStyle::Plain, "1");
        next!(p, FlowEntry);
        next_scalar!(p, TScalarStyle::Plain, "2");
        next!(p, FlowSequenceEnd);
        next!(p, FlowEntry);
        next!(p, Key);
        next_scalar!(p, TScalarStyle::DoubleQuoted, "b");
        next!(p, Value);
        next_scalar!(p, TScalarStyle::Plain, "c");
        next!(p, FlowMappingEnd);
        next!(p, StreamEnd);
        end!(p);
    }

    #[test]
    fn test_double_quoted_escapes() {
        let mut p = scanner(r#""a\tb\x41é\
  c  d""#);
        next!(p, StreamStart(..));
        next_scalar!(p, TScalarStyle::DoubleQuoted, "a\tbAéc  d");
        next!(p, StreamEnd);
    }

    #[test]
    fn test_folding() {
        let mut p = scanner("'a\n  b\n\n  c'");
        next!(p, StreamStart(..));
        next_scalar!(p, TScalarStyle::SingleQuoted, "a b\nc");
        next!(p, StreamEnd);
    }

    #[test]
    fn test_block_scalars() {
        let mut p = scanner("- |\n  a\n  b\n\n- >-\n  a\n  b\n\n  c\n- |+\n  x\n\n");
        next!(p, StreamStart(..));
        next!(p, BlockSequenceStart);
        next!(p, BlockEntry);
        next_scalar!(p, TScalarStyle::Literal, "a\nb\n");
        next!(p, BlockEntry);
        next_scalar!(p, TScalarStyle::Folded, "a b\nc");
        next!(p, BlockEntry);
        next_scalar!(p, TScalarStyle::Literal, "x\n\n");
        next!(p, BlockEnd);
        next!(p, StreamEnd);
    }

    #[test]
    fn test_top_level_block_scalar_without_indentation() {
        let s = "--- |\ntesting123\n";
        let mut p = scanner(s);
        next!(p, StreamStart(..));
        next!(p, DocumentStart);
        let tok = p.next().unwrap();
        assert_eq!(
            tok.1,
            Scalar(TScalarStyle::Literal, "testing123\n".to_owned())
        );
        assert!(p.is_unindented_block_scalar(tok.0.start));
        next!(p, StreamEnd);
    }

    #[test]
    fn test_explicit_indentation_indicator() {
        let mut p = scanner("--- |4\n     testing123\n");
        next!(p, StreamStart(..));
        next!(p, DocumentStart);
        next_scalar!(p, TScalarStyle::Literal, " testing123\n");
        next!(p, StreamEnd);
    }

    #[test]
    fn test_tags() {
        let mut p = scanner("- !!python/%75nicode a\n- !<tag:x> b\n- !e!foo c\n- ! d\n- !Ref: e\n");
        next!(p, StreamStart(..));
        next!(p, BlockSequenceStart);
        next!(p, BlockEntry);
        let tok = p.next().unwrap();
        assert_eq!(tok.1, Tag("!!".to_owned(), "python/unicode".to_owned()));
        next!(p, Scalar(..));
        next!(p, BlockEntry);
        let tok = p.next().unwrap();
        assert_eq!(tok.1, Tag(String::new(), "tag:x".to_owned()));
        next!(p, Scalar(..));
        next!(p, BlockEntry);
        let tok = p.next().unwrap();
        assert_eq!(tok.1, Tag("!e!".to_owned(), "foo".to_owned()));
        next!(p, Scalar(..));
        next!(p, BlockEntry);
        let tok = p.next().unwrap();
        assert_eq!(tok.1, Tag(String::new(), "!".to_owned()));
        next!(p, Scalar(..));
        next!(p, BlockEntry);
        let tok = p.next().unwrap();
        assert_eq!(tok.1, Tag("!".to_owned(), "Ref:".to_owned()));
        next_scalar!(p, TScalarStyle::Plain, "e");
    }

    #[test]
    fn test_comments_are_recorded() {
        let mut p = scanner("# head\na: 1  # tail\n");
        while p.next().is_some() {}
        let comments: Vec<_> = p.comments_mut().drain(..).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "# head");
        assert!(comments[0].standalone);
        assert_eq!(comments[1].text, "# tail");
        assert!(!comments[1].standalone);
        assert_eq!(comments[1].mark.col(), 6);
    }

    #[test]
    fn test_unknown_directive_is_skipped() {
        let mut p = scanner("%FOO bar\n--- a\n");
        next!(p, StreamStart(..));
        next!(p, DocumentStart);
        next_scalar!(p, TScalarStyle::Plain, "a");
    }

    #[test]
    fn test_unterminated_quote() {
        let mut p = scanner("'abc");
        next!(p, StreamStart(..));
        assert_eq!(p.next(), None);
        assert!(p.get_error().is_some());
    }

    #[test]
    fn test_bad_escape() {
        let mut p = scanner(r#""\q""#);
        next!(p, StreamStart(..));
        assert_eq!(p.next(), None);
        assert!(p
            .get_error()
            .unwrap()
            .info()
            .contains("unknown escape character"));
    }
}

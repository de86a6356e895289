//! Home to the YAML Parser.
//!
//! The parser takes input from the [`crate::scanner::Scanner`], performs final checks for YAML
//! compliance, and emits a stream of YAML events. This stream can for instance be used to create
//! YAML objects.

use std::collections::HashMap;

use crate::reader::Reader;
use crate::scanner::{Comment, Marker, Scanner, Span, TScalarStyle, Token, TokenType};
pub use crate::error::ParserError;

/// Nesting of collections beyond this depth is rejected.
pub const MAX_DEPTH: usize = 1000;

/// Prefix of the `!!` handle.
pub const DEFAULT_TAG_PREFIX: &str = "tag:yaml.org,2002:";

#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
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

/// A YAML tag, as written and as resolved against the document's `%TAG` directives.
#[derive(Clone, PartialEq, Debug, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    /// Handle as written (`!`, `!!`, `!e!`), empty for verbatim and non-specific tags.
    pub handle: String,
    /// Suffix as written, `%` escapes decoded.
    pub suffix: String,
    /// The full tag: handle prefix followed by the suffix.
    pub full: String,
}

impl Tag {
    /// Whether this is the non-specific `!` tag, which forces a string.
    #[must_use]
    pub fn is_non_specific(&self) -> bool {
        self.handle.is_empty() && self.suffix == "!"
    }
}

/// An event generated by the YAML parser.
///
/// Events are used in the low-level event-based API (push parser). The API entrypoint is the
/// [`EventReceiver`] trait.
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum Event {
    /// Reserved for internal use.
    Nothing,
    /// Event generated at the very beginning of parsing.
    StreamStart,
    /// Last event that will be generated by the parser. Signals EOF.
    StreamEnd,
    /// The start of a YAML document. Whether `---` was written.
    DocumentStart(bool),
    /// The YAML end document. Whether `...` was written.
    DocumentEnd(bool),
    /// A YAML Alias, by anchor name.
    Alias(String),
    /// Value, style, anchor, tag.
    Scalar(String, TScalarStyle, Option<String>, Option<Tag>),
    /// The start of a YAML sequence: anchor, tag, flow style.
    SequenceStart(Option<String>, Option<Tag>, bool),
    /// The end of a YAML sequence.
    SequenceEnd,
    /// The start of a YAML mapping: anchor, tag, flow style.
    MappingStart(Option<String>, Option<Tag>, bool),
    /// The end of a YAML mapping.
    MappingEnd,
}

impl Event {
    /// Create an empty scalar.
    fn empty_scalar() -> Event {
        Event::Scalar(String::new(), TScalarStyle::Plain, None, None)
    }

    /// Create an empty scalar with the given anchor and tag.
    fn empty_scalar_with_anchor(anchor: Option<String>, tag: Option<Tag>) -> Event {
        Event::Scalar(String::new(), TScalarStyle::Plain, anchor, tag)
    }
}

/// Trait to be implemented in order to use the low-level parsing API.
///
/// The low-level parsing API is event-based (a push parser), calling [`EventReceiver::on_event`]
/// for each YAML [`Event`] that occurs.
pub trait EventReceiver {
    /// Handler called for each YAML event that is emitted by the parser.
    fn on_event(&mut self, ev: Event);
}

/// Trait to be implemented for using the low-level parsing API.
///
/// Functionally similar to [`EventReceiver`], but receives a [`Marker`] as well as the event.
pub trait MarkedEventReceiver {
    /// Handler called for each event that occurs.
    fn on_event(&mut self, ev: Event, _mark: Marker);
}

impl<R: EventReceiver> MarkedEventReceiver for R {
    fn on_event(&mut self, ev: Event, _mark: Marker) {
        self.on_event(ev);
    }
}

/// A convenience alias for a `Result` of a parser event.
pub type ParseResult = Result<(Event, Span), ParserError>;

/// A YAML parser.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    states: Vec<State>,
    state: State,
    token: Option<Token>,
    current: Option<(Event, Span)>,
    depth: usize,
    /// `%YAML` directive of the current document.
    version: Option<(u32, u32)>,
    /// `%TAG` directives of the current document, defaults included.
    tags: HashMap<String, String>,
    /// Handles declared explicitly by `%TAG` in the current document, in order.
    declared_tags: Vec<(String, String)>,
    /// Reject non-indented top-level block scalars in YAML 1.1 documents.
    strict_block_scalar_indent_1_1: bool,
    /// Version assumed for documents without a `%YAML` directive.
    default_version: Option<(u32, u32)>,
}

impl<'a> Parser<'a> {
    /// Create a new instance of a parser from the given reader.
    #[must_use]
    pub fn new(reader: Reader<'a>) -> Parser<'a> {
        Parser {
            scanner: Scanner::new(reader),
            states: Vec::new(),
            state: State::StreamStart,
            token: None,
            current: None,
            depth: 0,
            version: None,
            tags: default_tags(),
            declared_tags: Vec::new(),
            strict_block_scalar_indent_1_1: false,
            default_version: None,
        }
    }

    /// Create a new instance of a parser from a &str.
    #[must_use]
    pub fn new_from_str(value: &'a str) -> Parser<'a> {
        Parser::new(Reader::from_str(value))
    }

    /// Make a top-level block scalar whose content is not indented an error in documents
    /// declared `%YAML 1.1`.
    pub fn set_strict_block_scalar_indent_1_1(&mut self, strict: bool) {
        self.strict_block_scalar_indent_1_1 = strict;
    }

    /// Treat documents without a `%YAML` directive as this version when checking
    /// version-dependent syntax.
    pub fn set_default_version(&mut self, version: Option<(u32, u32)>) {
        self.default_version = version;
    }

    /// The `%YAML` version of the document being parsed, if one was declared.
    #[must_use]
    pub fn version(&self) -> Option<(u32, u32)> {
        self.version
    }

    /// The `%TAG` directives declared for the document being parsed.
    #[must_use]
    pub fn tag_directives(&self) -> &[(String, String)] {
        &self.declared_tags
    }

    /// Comments scanned so far and not yet taken.
    pub fn comments_mut(&mut self) -> &mut std::collections::VecDeque<Comment> {
        self.scanner.comments_mut()
    }

    /// Try to load the next event and return it, but do not consuming it from `self`.
    ///
    /// Any subsequent call to [`Parser::peek`] will return the same value, until a call to
    /// [`Parser::next_event`].
    /// # Errors
    /// Returns `ParserError` when loading the next event fails.
    pub fn peek(&mut self) -> Result<&(Event, Span), ParserError> {
        if self.current.is_none() {
            let ev = self.next_event_impl()?;
            self.current = Some(ev);
        }
        self.current
            .as_ref()
            .ok_or_else(|| ParserError::new(self.scanner.mark(), "no event available"))
    }

    /// Try to load the next event and return it, consuming it from `self`.
    /// # Errors
    /// Returns `ParserError` when loading the next event fails.
    pub fn next_event(&mut self) -> ParseResult {
        match self.current.take() {
            None => self.next_event_impl(),
            Some(v) => Ok(v),
        }
    }

    fn next_event_impl(&mut self) -> ParseResult {
        if self.state == State::End {
            return Ok((Event::StreamEnd, Span::empty(self.scanner.mark())));
        }
        let (ev, span) = self.state_machine()?;
        log::trace!("event {:?} at line {}", ev, span.start.line());
        Ok((ev, span))
    }

    fn peek_token(&mut self) -> Result<&Token, ParserError> {
        if self.token.is_none() {
            self.token = self.scanner.next_token()?;
        }
        match self.token.as_ref() {
            Some(tok) => Ok(tok),
            None => Err(ParserError::new(self.scanner.mark(), "unexpected eof")),
        }
    }

    fn fetch_token(&mut self) -> Result<Token, ParserError> {
        self.peek_token()?;
        self.token
            .take()
            .ok_or_else(|| ParserError::new(self.scanner.mark(), "unexpected eof"))
    }

    fn peek_token_cloned(&mut self) -> Result<Token, ParserError> {
        self.peek_token().cloned()
    }

    fn skip(&mut self) {
        self.token = None;
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(State::End);
    }

    fn push_state(&mut self, state: State) {
        self.states.push(state);
    }

    fn enter(&mut self, mark: Marker) -> Result<(), ParserError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParserError::new(mark, "recursion limit exceeded"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Drive the parser to the end of the stream, feeding every event to `recv`.
    ///
    /// If `multi` is false, stops after the first document.
    /// # Errors
    /// Returns `ParserError` when loading fails.
    pub fn load<R: MarkedEventReceiver>(
        &mut self,
        recv: &mut R,
        multi: bool,
    ) -> Result<(), ParserError> {
        if !self.scanner.stream_started() {
            let (ev, span) = self.next_event()?;
            if ev != Event::StreamStart {
                return Err(ParserError::new(span.start, "did not find expected <stream-start>"));
            }
            recv.on_event(ev, span.start);
        }

        if self.scanner.stream_ended() {
            recv.on_event(Event::StreamEnd, self.scanner.mark());
            return Ok(());
        }
        loop {
            let (ev, span) = self.next_event()?;
            if ev == Event::StreamEnd {
                recv.on_event(ev, span.start);
                return Ok(());
            }
            self.load_document(ev, span.start, recv)?;
            if !multi {
                break;
            }
        }
        Ok(())
    }

    fn load_document<R: MarkedEventReceiver>(
        &mut self,
        first_ev: Event,
        mark: Marker,
        recv: &mut R,
    ) -> Result<(), ParserError> {
        if !matches!(first_ev, Event::DocumentStart(_)) {
            return Err(ParserError::new(mark, "did not find expected <document-start>"));
        }
        recv.on_event(first_ev, mark);

        let (ev, span) = self.next_event()?;
        self.load_node(ev, span.start, recv)?;

        // DOCUMENT-END is expected.
        let (ev, span) = self.next_event()?;
        if !matches!(ev, Event::DocumentEnd(_)) {
            return Err(ParserError::new(span.start, "did not find expected <document-end>"));
        }
        recv.on_event(ev, span.start);

        Ok(())
    }

    fn load_node<R: MarkedEventReceiver>(
        &mut self,
        first_ev: Event,
        mark: Marker,
        recv: &mut R,
    ) -> Result<(), ParserError> {
        match first_ev {
            Event::Alias(..) | Event::Scalar(..) => {
                recv.on_event(first_ev, mark);
                Ok(())
            }
            Event::SequenceStart(..) => {
                recv.on_event(first_ev, mark);
                self.load_sequence(recv)
            }
            Event::MappingStart(..) => {
                recv.on_event(first_ev, mark);
                self.load_mapping(recv)
            }
            _ => Err(ParserError::new(mark, "unexpected event")),
        }
    }

    fn load_mapping<R: MarkedEventReceiver>(&mut self, recv: &mut R) -> Result<(), ParserError> {
        let (mut key_ev, mut key_span) = self.next_event()?;
        while key_ev != Event::MappingEnd {
            // key
            self.load_node(key_ev, key_span.start, recv)?;

            // value
            let (ev, span) = self.next_event()?;
            self.load_node(ev, span.start, recv)?;

            // next event
            let (ev, span) = self.next_event()?;
            key_ev = ev;
            key_span = span;
        }
        recv.on_event(key_ev, key_span.start);
        Ok(())
    }

    fn load_sequence<R: MarkedEventReceiver>(&mut self, recv: &mut R) -> Result<(), ParserError> {
        let (mut ev, mut span) = self.next_event()?;
        while ev != Event::SequenceEnd {
            self.load_node(ev, span.start, recv)?;

            // next event
            let (next_ev, next_span) = self.next_event()?;
            ev = next_ev;
            span = next_span;
        }
        recv.on_event(ev, span.start);
        Ok(())
    }

    fn state_machine(&mut self) -> ParseResult {
        match self.state {
            State::StreamStart => self.stream_start(),

            State::ImplicitDocumentStart => self.document_start(true),
            State::DocumentStart => self.document_start(false),
            State::DocumentContent => self.document_content(),
            State::DocumentEnd => self.document_end(),

            State::BlockNode => self.parse_node(true, false),

            State::BlockMappingFirstKey => self.block_mapping_key(true),
            State::BlockMappingKey => self.block_mapping_key(false),
            State::BlockMappingValue => self.block_mapping_value(),

            State::BlockSequenceFirstEntry => self.block_sequence_entry(true),
            State::BlockSequenceEntry => self.block_sequence_entry(false),

            State::FlowSequenceFirstEntry => self.flow_sequence_entry(true),
            State::FlowSequenceEntry => self.flow_sequence_entry(false),

            State::FlowMappingFirstKey => self.flow_mapping_key(true),
            State::FlowMappingKey => self.flow_mapping_key(false),
            State::FlowMappingValue => self.flow_mapping_value(false),

            State::IndentlessSequenceEntry => self.indentless_sequence_entry(),

            State::FlowSequenceEntryMappingKey => self.flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.flow_sequence_entry_mapping_end(),
            State::FlowMappingEmptyValue => self.flow_mapping_value(true),

            /* impossible */
            State::End => Ok((Event::StreamEnd, Span::empty(self.scanner.mark()))),
        }
    }

    fn stream_start(&mut self) -> ParseResult {
        let tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::StreamStart(_) => {
                self.state = State::ImplicitDocumentStart;
                self.skip();
                Ok((Event::StreamStart, tok.0))
            }
            _ => Err(ParserError::new(
                tok.0.start,
                "did not find expected <stream-start>",
            )),
        }
    }

    fn document_start(&mut self, implicit: bool) -> ParseResult {
        let mut tok = self.peek_token_cloned()?;
        while let TokenType::DocumentEnd = tok.1 {
            self.skip();
            tok = self.peek_token_cloned()?;
        }

        match tok.1 {
            TokenType::StreamEnd => {
                self.state = State::End;
                self.skip();
                Ok((Event::StreamEnd, tok.0))
            }
            TokenType::VersionDirective(..)
            | TokenType::TagDirective(..)
            | TokenType::DocumentStart => {
                // explicit document
                self.explicit_document_start()
            }
            _ if implicit => {
                self.process_directives()?;
                self.push_state(State::DocumentEnd);
                self.state = State::BlockNode;
                Ok((Event::DocumentStart(false), Span::empty(tok.0.start)))
            }
            _ => {
                // explicit document
                self.explicit_document_start()
            }
        }
    }

    fn process_directives(&mut self) -> Result<(), ParserError> {
        self.version = None;
        self.tags = default_tags();
        self.declared_tags.clear();
        loop {
            let tok = self.peek_token_cloned()?;
            match tok.1 {
                TokenType::VersionDirective(major, minor) => {
                    if self.version.is_some() {
                        return Err(ParserError::new(
                            tok.0.start,
                            "found duplicate YAML directive",
                        ));
                    }
                    if major != 1 {
                        return Err(ParserError::new(
                            tok.0.start,
                            "found incompatible YAML document",
                        ));
                    }
                    if minor > 2 {
                        log::warn!(
                            "document declares YAML {}.{}, parsing it as 1.2",
                            major,
                            minor
                        );
                    }
                    self.version = Some((major, minor));
                }
                TokenType::TagDirective(handle, prefix) => {
                    if self.declared_tags.iter().any(|(h, _)| *h == handle) {
                        return Err(ParserError::new(
                            tok.0.start,
                            "the TAG directive must only be given at most once per handle in the same document",
                        ));
                    }
                    self.tags.insert(handle.clone(), prefix.clone());
                    self.declared_tags.push((handle, prefix));
                }
                _ => break,
            }
            self.skip();
        }
        Ok(())
    }

    fn explicit_document_start(&mut self) -> ParseResult {
        self.process_directives()?;
        let tok = self.peek_token_cloned()?;
        if tok.1 != TokenType::DocumentStart {
            return Err(ParserError::new(
                tok.0.start,
                "did not find expected <document start>",
            ));
        }
        self.push_state(State::DocumentEnd);
        self.state = State::DocumentContent;
        self.skip();
        Ok((Event::DocumentStart(true), tok.0))
    }

    fn document_content(&mut self) -> ParseResult {
        let tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::VersionDirective(..)
            | TokenType::TagDirective(..)
            | TokenType::DocumentStart
            | TokenType::DocumentEnd
            | TokenType::StreamEnd => {
                self.pop_state();
                // empty scalar
                Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
            }
            _ => self.parse_node(true, false),
        }
    }

    fn document_end(&mut self) -> ParseResult {
        let mut explicit_end = false;
        let tok = self.peek_token_cloned()?;
        let span = if let TokenType::DocumentEnd = tok.1 {
            self.skip();
            explicit_end = true;
            tok.0
        } else {
            Span::empty(tok.0.start)
        };

        self.state = State::DocumentStart;
        Ok((Event::DocumentEnd(explicit_end), span))
    }

    fn resolve_tag(&self, handle: String, suffix: String, mark: Marker) -> Result<Tag, ParserError> {
        let full = if handle.is_empty() {
            suffix.clone()
        } else if let Some(prefix) = self.tags.get(&handle) {
            format!("{prefix}{suffix}")
        } else {
            return Err(ParserError::new(
                mark,
                "while parsing a node, found undefined tag handle",
            ));
        };
        Ok(Tag {
            handle,
            suffix,
            full,
        })
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> ParseResult {
        let mut anchor = None;
        let mut tag = None;
        let mut tok = self.fetch_token()?;
        let start = tok.0.start;
        match tok.1 {
            TokenType::Alias(name) => {
                self.pop_state();
                return Ok((Event::Alias(name), tok.0));
            }
            TokenType::Anchor(name) => {
                anchor = Some(name);
                tok = self.fetch_token()?;
                if let TokenType::Tag(handle, suffix) = tok.1 {
                    tag = Some(self.resolve_tag(handle, suffix, tok.0.start)?);
                    tok = self.fetch_token()?;
                }
            }
            TokenType::Tag(handle, suffix) => {
                tag = Some(self.resolve_tag(handle, suffix, tok.0.start)?);
                tok = self.fetch_token()?;
                if let TokenType::Anchor(name) = tok.1 {
                    anchor = Some(name);
                    tok = self.fetch_token()?;
                }
            }
            _ => {}
        }
        let node_start = if anchor.is_some() || tag.is_some() {
            start
        } else {
            tok.0.start
        };
        match tok.1 {
            TokenType::BlockEntry if indentless_sequence => {
                // The entry is consumed by the sequence state.
                self.token = Some(tok.clone());
                self.state = State::IndentlessSequenceEntry;
                self.enter(tok.0.start)?;
                Ok((
                    Event::SequenceStart(anchor, tag, false),
                    Span::new(node_start, tok.0.end),
                ))
            }
            TokenType::Scalar(style, v) => {
                if matches!(style, TScalarStyle::Literal | TScalarStyle::Folded)
                    && self.strict_block_scalar_indent_1_1
                    && self.version.or(self.default_version) == Some((1, 1))
                    && self.states.last() == Some(&State::DocumentEnd)
                    && self.scanner.is_unindented_block_scalar(tok.0.start)
                {
                    return Err(ParserError::new(
                        tok.0.start,
                        "top level block style scalar must be indented in YAML 1.1",
                    ));
                }
                self.pop_state();
                Ok((
                    Event::Scalar(v, style, anchor, tag),
                    Span::new(node_start, tok.0.end),
                ))
            }
            TokenType::FlowSequenceStart => {
                self.token = Some(tok.clone());
                self.state = State::FlowSequenceFirstEntry;
                self.enter(tok.0.start)?;
                Ok((
                    Event::SequenceStart(anchor, tag, true),
                    Span::new(node_start, tok.0.end),
                ))
            }
            TokenType::FlowMappingStart => {
                self.token = Some(tok.clone());
                self.state = State::FlowMappingFirstKey;
                self.enter(tok.0.start)?;
                Ok((
                    Event::MappingStart(anchor, tag, true),
                    Span::new(node_start, tok.0.end),
                ))
            }
            TokenType::BlockSequenceStart if block => {
                self.token = Some(tok.clone());
                self.state = State::BlockSequenceFirstEntry;
                self.enter(tok.0.start)?;
                Ok((
                    Event::SequenceStart(anchor, tag, false),
                    Span::new(node_start, tok.0.end),
                ))
            }
            TokenType::BlockMappingStart if block => {
                self.token = Some(tok.clone());
                self.state = State::BlockMappingFirstKey;
                self.enter(tok.0.start)?;
                Ok((
                    Event::MappingStart(anchor, tag, false),
                    Span::new(node_start, tok.0.end),
                ))
            }
            // ex 7.2, an empty scalar can follow a secondary tag
            _ if tag.is_some() || anchor.is_some() => {
                self.token = Some(tok.clone());
                self.pop_state();
                Ok((
                    Event::empty_scalar_with_anchor(anchor, tag),
                    Span::new(node_start, tok.0.start),
                ))
            }
            _ => Err(ParserError::new(
                tok.0.start,
                "while parsing a node, did not find expected node content",
            )),
        }
    }

    fn block_mapping_key(&mut self, first: bool) -> ParseResult {
        // skip BlockMappingStart
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        let tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::Key => {
                self.skip();
                let tok = self.peek_token_cloned()?;
                if let TokenType::Key | TokenType::Value | TokenType::BlockEnd = tok.1 {
                    self.state = State::BlockMappingValue;
                    // empty scalar
                    Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
                } else {
                    self.push_state(State::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            // libyaml fails on YAML 1.2 example 8.18
            TokenType::Value => {
                self.state = State::BlockMappingValue;
                Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
            }
            TokenType::BlockEnd => {
                self.pop_state();
                self.skip();
                self.leave();
                Ok((Event::MappingEnd, tok.0))
            }
            _ => Err(ParserError::new(
                tok.0.start,
                "while parsing a block mapping, did not find expected key",
            )),
        }
    }

    fn block_mapping_value(&mut self) -> ParseResult {
        let tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::Value => {
                self.skip();
                let tok = self.peek_token_cloned()?;
                if let TokenType::Key | TokenType::Value | TokenType::BlockEnd = tok.1 {
                    self.state = State::BlockMappingKey;
                    // empty scalar
                    Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
                } else {
                    self.push_state(State::BlockMappingKey);
                    self.parse_node(true, true)
                }
            }
            _ => {
                self.state = State::BlockMappingKey;
                // empty scalar
                Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
            }
        }
    }

    fn flow_mapping_key(&mut self, first: bool) -> ParseResult {
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        let mut tok = self.peek_token_cloned()?;

        if tok.1 != TokenType::FlowMappingEnd {
            if !first {
                if tok.1 == TokenType::FlowEntry {
                    self.skip();
                    tok = self.peek_token_cloned()?;
                } else {
                    return Err(ParserError::new(
                        tok.0.start,
                        "while parsing a flow mapping, did not find expected ',' or '}'",
                    ));
                }
            }

            if tok.1 == TokenType::Key {
                self.skip();
                tok = self.peek_token_cloned()?;
                match tok.1 {
                    TokenType::Value | TokenType::FlowEntry | TokenType::FlowMappingEnd => {
                        self.state = State::FlowMappingValue;
                        return Ok((Event::empty_scalar(), Span::empty(tok.0.start)));
                    }
                    _ => {
                        self.push_state(State::FlowMappingValue);
                        return self.parse_node(false, false);
                    }
                }
            // XXX libyaml fail ex 7.3, empty key
            } else if tok.1 == TokenType::Value {
                self.state = State::FlowMappingValue;
                return Ok((Event::empty_scalar(), Span::empty(tok.0.start)));
            } else if tok.1 != TokenType::FlowMappingEnd {
                self.push_state(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }

        self.pop_state();
        self.skip();
        self.leave();
        Ok((Event::MappingEnd, tok.0))
    }

    fn flow_mapping_value(&mut self, empty: bool) -> ParseResult {
        let tok = self.peek_token_cloned()?;
        if empty {
            self.state = State::FlowMappingKey;
            return Ok((Event::empty_scalar(), Span::empty(tok.0.start)));
        }

        if tok.1 == TokenType::Value {
            self.skip();
            let tok = self.peek_token_cloned()?;
            match tok.1 {
                TokenType::FlowEntry | TokenType::FlowMappingEnd => {}
                _ => {
                    self.push_state(State::FlowMappingKey);
                    return self.parse_node(false, false);
                }
            }
        }

        self.state = State::FlowMappingKey;
        Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
    }

    fn flow_sequence_entry(&mut self, first: bool) -> ParseResult {
        // skip FlowSequenceStart
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        let mut tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::FlowSequenceEnd => {
                self.pop_state();
                self.skip();
                self.leave();
                return Ok((Event::SequenceEnd, tok.0));
            }
            TokenType::FlowEntry if !first => {
                self.skip();
                tok = self.peek_token_cloned()?;
            }
            _ if !first => {
                return Err(ParserError::new(
                    tok.0.start,
                    "while parsing a flow sequence, expected ',' or ']'",
                ));
            }
            _ => { /* next */ }
        }
        match tok.1 {
            TokenType::FlowSequenceEnd => {
                self.pop_state();
                self.skip();
                self.leave();
                Ok((Event::SequenceEnd, tok.0))
            }
            TokenType::Key => {
                self.state = State::FlowSequenceEntryMappingKey;
                self.skip();
                self.enter(tok.0.start)?;
                Ok((Event::MappingStart(None, None, true), tok.0))
            }
            _ => {
                self.push_state(State::FlowSequenceEntry);
                self.parse_node(false, false)
            }
        }
    }

    fn indentless_sequence_entry(&mut self) -> ParseResult {
        let mut tok = self.peek_token_cloned()?;
        if tok.1 != TokenType::BlockEntry {
            self.pop_state();
            self.leave();
            return Ok((Event::SequenceEnd, Span::empty(tok.0.start)));
        }

        self.skip();
        tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::BlockEntry | TokenType::Key | TokenType::Value | TokenType::BlockEnd => {
                self.state = State::IndentlessSequenceEntry;
                Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
            }
            _ => {
                self.push_state(State::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        }
    }

    fn block_sequence_entry(&mut self, first: bool) -> ParseResult {
        // BLOCK-SEQUENCE-START
        if first {
            let _ = self.peek_token()?;
            self.skip();
        }
        let mut tok = self.peek_token_cloned()?;
        match tok.1 {
            TokenType::BlockEnd => {
                self.pop_state();
                self.skip();
                self.leave();
                Ok((Event::SequenceEnd, tok.0))
            }
            TokenType::BlockEntry => {
                self.skip();
                tok = self.peek_token_cloned()?;
                match tok.1 {
                    TokenType::BlockEntry | TokenType::BlockEnd => {
                        self.state = State::BlockSequenceEntry;
                        Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
                    }
                    _ => {
                        self.push_state(State::BlockSequenceEntry);
                        self.parse_node(true, false)
                    }
                }
            }
            _ => Err(ParserError::new(
                tok.0.start,
                "while parsing a block collection, did not find expected '-' indicator",
            )),
        }
    }

    fn flow_sequence_entry_mapping_key(&mut self) -> ParseResult {
        let tok = self.peek_token_cloned()?;

        match tok.1 {
            TokenType::Value | TokenType::FlowEntry | TokenType::FlowSequenceEnd => {
                self.state = State::FlowSequenceEntryMappingValue;
                Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
            }
            _ => {
                self.push_state(State::FlowSequenceEntryMappingValue);
                self.parse_node(false, false)
            }
        }
    }

    fn flow_sequence_entry_mapping_value(&mut self) -> ParseResult {
        let tok = self.peek_token_cloned()?;

        match tok.1 {
            TokenType::Value => {
                self.skip();
                let tok = self.peek_token_cloned()?;
                self.state = State::FlowSequenceEntryMappingValue;
                match tok.1 {
                    TokenType::FlowEntry | TokenType::FlowSequenceEnd => {
                        self.state = State::FlowSequenceEntryMappingEnd;
                        Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
                    }
                    _ => {
                        self.push_state(State::FlowSequenceEntryMappingEnd);
                        self.parse_node(false, false)
                    }
                }
            }
            _ => {
                self.state = State::FlowSequenceEntryMappingEnd;
                Ok((Event::empty_scalar(), Span::empty(tok.0.start)))
            }
        }
    }

    fn flow_sequence_entry_mapping_end(&mut self) -> ParseResult {
        self.state = State::FlowSequenceEntry;
        self.leave();
        let mark = match self.peek_token() {
            Ok(tok) => tok.0.start,
            Err(_) => self.scanner.mark(),
        };
        Ok((Event::MappingEnd, Span::empty(mark)))
    }
}

fn default_tags() -> HashMap<String, String> {
    let mut tags = HashMap::new();
    tags.insert("!".to_owned(), "!".to_owned());
    tags.insert("!!".to_owned(), DEFAULT_TAG_PREFIX.to_owned());
    tags
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<(Event, Span), ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::End && self.current.is_none() {
            return None;
        }
        Some(self.next_event())
    }
}

#[cfg(test)]
mod test {
    use super::{Event, Parser};
    use crate::scanner::TScalarStyle;

    fn events(s: &str) -> Vec<Event> {
        Parser::new_from_str(s)
            .map(|r| r.unwrap().0)
            .collect::<Vec<_>>()
    }

    #[test]
    fn test_peek_eq_parse() {
        let s = "
a0 bb: val
a1: &x
    b1: 4
    b2: d
a2: 4
a3: [1, 2, 3]
a4:
    - [a1, a2]
    - 2
a5: *x
";
        let mut p = Parser::new_from_str(s);
        loop {
            let event_peek = p.peek().unwrap().clone();
            let event = p.next_event().unwrap();
            assert_eq!(event, event_peek);
            if event.0 == Event::StreamEnd {
                break;
            }
        }
    }

    #[test]
    fn test_tag_directives() {
        let s = "%TAG !e! tag:example.com,2000:\n--- !e!foo bar\n";
        let evs = events(s);
        match &evs[2] {
            Event::Scalar(v, _, _, Some(tag)) => {
                assert_eq!(v, "bar");
                assert_eq!(tag.handle, "!e!");
                assert_eq!(tag.suffix, "foo");
                assert_eq!(tag.full, "tag:example.com,2000:foo");
            }
            ev => panic!("unexpected event {ev:?}"),
        }
    }

    #[test]
    fn test_tag_directives_are_per_document() {
        let s = "%TAG !e! tag:example.com,2000:\n--- !e!foo bar\n...\n--- !e!foo baz\n";
        let mut p = Parser::new_from_str(s);
        let err = loop {
            match p.next_event() {
                Ok((Event::StreamEnd, _)) => panic!("expected an error"),
                Ok(_) => {}
                Err(e) => break e,
            }
        };
        assert!(err.to_string().contains("undefined tag handle"));
    }

    #[test]
    fn test_secondary_handle() {
        let evs = events("!!str 1");
        match &evs[2] {
            Event::Scalar(_, TScalarStyle::Plain, None, Some(tag)) => {
                assert_eq!(tag.full, "tag:yaml.org,2002:str");
            }
            ev => panic!("unexpected event {ev:?}"),
        }
    }

    #[test]
    fn test_incompatible_version() {
        let mut p = Parser::new_from_str("%YAML 2.0\n--- a\n");
        assert!(p.next_event().is_ok());
        assert!(p.next_event().is_err());
    }

    #[test]
    fn test_strict_top_level_block_scalar() {
        let s = "%YAML 1.1\n--- |\ntesting123\n";
        assert!(Parser::new_from_str(s).all(|r| r.is_ok()));

        let mut p = Parser::new_from_str(s);
        p.set_strict_block_scalar_indent_1_1(true);
        assert!(p.any(|r| r.is_err()));

        let mut p = Parser::new_from_str("%YAML 1.1\n--- |\n  testing123\n");
        p.set_strict_block_scalar_indent_1_1(true);
        assert!(p.all(|r| r.is_ok()));
    }

    #[test]
    fn test_strict_block_scalar_default_version() {
        let s = "--- |\ntesting123\n";
        let mut p = Parser::new_from_str(s);
        p.set_strict_block_scalar_indent_1_1(true);
        assert!(p.all(|r| r.is_ok()));

        let mut p = Parser::new_from_str(s);
        p.set_strict_block_scalar_indent_1_1(true);
        p.set_default_version(Some((1, 1)));
        assert!(p.any(|r| r.is_err()));

        let s12 = format!("%YAML 1.2\n{s}");
        let mut p = Parser::new_from_str(&s12);
        p.set_strict_block_scalar_indent_1_1(true);
        p.set_default_version(Some((1, 1)));
        assert!(p.all(|r| r.is_ok()));
    }

    #[test]
    fn test_depth_limit() {
        let s = "[".repeat(1100) + &"]".repeat(1100);
        let mut p = Parser::new_from_str(&s);
        let err = loop {
            match p.next_event() {
                Ok((Event::StreamEnd, _)) => panic!("expected an error"),
                Ok(_) => {}
                Err(e) => break e,
            }
        };
        assert!(err.to_string().contains("recursion limit exceeded"));
    }

    #[test]
    fn test_document_markers() {
        let evs = events("--- a\n...\n--- b\n");
        assert_eq!(
            evs,
            vec![
                Event::StreamStart,
                Event::DocumentStart(true),
                Event::Scalar("a".to_owned(), TScalarStyle::Plain, None, None),
                Event::DocumentEnd(true),
                Event::DocumentStart(true),
                Event::Scalar("b".to_owned(), TScalarStyle::Plain, None, None),
                Event::DocumentEnd(false),
                Event::StreamEnd,
            ]
        );
    }
}

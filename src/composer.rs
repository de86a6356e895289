//! Builds the node graph of each document from the parser's events.
//!
//! Besides resolving tags and wiring aliases to their anchored node, the composer hands out the
//! comments the scanner collected: a comment on its own line goes to the next node, a comment
//! on the line a node ends goes to that node as its trailing comment.

use std::collections::HashMap;

use crate::error::ComposerError;
use crate::nodes::{CommentLine, Document, Node, NodeRef, TrailingComment};
use crate::parser::{Event, Parser, Tag};
use crate::reader::Marker;
use crate::resolver::{NodeClass, Resolver, DEFAULT_VERSION, STR};
use crate::scanner::{Span, TScalarStyle};

/// Pulls documents out of a [`Parser`].
pub struct Composer<'a> {
    parser: Parser<'a>,
    anchor_map: HashMap<String, NodeRef>,
    resolver: Resolver,
    /// Version used for documents without a `%YAML` directive.
    default_version: Option<(u32, u32)>,
    stream_started: bool,
    /// Node that may still receive a trailing comment.
    last_node: Option<NodeRef>,
    /// Last line holding content or a comment, used to count blank lines.
    last_line: Option<usize>,
    pending: Vec<CommentLine>,
    /// Line of an explicit `---`.
    doc_start_line: Option<usize>,
    start_comment: Option<TrailingComment>,
    flow_level: usize,
}

impl<'a> Composer<'a> {
    #[must_use]
    pub fn new(parser: Parser<'a>, default_version: Option<(u32, u32)>) -> Composer<'a> {
        Composer {
            parser,
            anchor_map: HashMap::new(),
            resolver: Resolver::new(default_version.unwrap_or(DEFAULT_VERSION)),
            default_version,
            stream_started: false,
            last_node: None,
            last_line: None,
            pending: Vec::new(),
            doc_start_line: None,
            start_comment: None,
            flow_level: 0,
        }
    }

    /// Compose the next document of the stream, `None` once the stream is exhausted.
    /// # Errors
    /// Returns `ComposerError` on a syntax error or an alias to an unknown anchor.
    pub fn compose_document(&mut self) -> Result<Option<Document>, ComposerError> {
        if !self.stream_started {
            let (ev, span) = self.parser.next_event()?;
            if ev != Event::StreamStart {
                return Err(ComposerError::new(
                    span.start,
                    "did not find expected <stream-start>",
                ));
            }
            self.stream_started = true;
        }

        let (ev, span) = self.parser.next_event()?;
        let explicit_start = match ev {
            Event::StreamEnd => return Ok(None),
            Event::DocumentStart(explicit) => explicit,
            _ => {
                return Err(ComposerError::new(
                    span.start,
                    "did not find expected <document-start>",
                ))
            }
        };

        let version = self.parser.version();
        let tags = self.parser.tag_directives().to_vec();
        let processing_version = version
            .or(self.default_version)
            .unwrap_or(DEFAULT_VERSION);
        self.resolver = Resolver::new(processing_version);
        self.anchor_map.clear();
        self.last_node = None;
        self.start_comment = None;
        self.flow_level = 0;
        if explicit_start {
            self.doc_start_line = Some(span.start.line());
            self.last_line = Some(span.start.line());
        } else {
            self.doc_start_line = None;
            self.last_line = None;
        }

        let root = self.compose_node()?;

        let (ev, span) = self.parser.next_event()?;
        let Event::DocumentEnd(explicit_end) = ev else {
            return Err(ComposerError::new(
                span.start,
                "did not find expected <document-end>",
            ));
        };
        self.take_comments(span.start);

        let mut doc = Document::new(root);
        doc.explicit_start = explicit_start;
        doc.explicit_end = explicit_end;
        doc.version = version;
        doc.processing_version = processing_version;
        doc.tags = tags;
        doc.start_comment = self.start_comment.take();
        doc.end_comments = std::mem::take(&mut self.pending);
        Ok(Some(doc))
    }

    /// Compose the only document of the stream. An empty stream gives `None`.
    /// # Errors
    /// Returns `ComposerError` if the stream holds more than one document.
    pub fn compose_single_document(&mut self) -> Result<Option<Document>, ComposerError> {
        let doc = self.compose_document()?;
        if doc.is_some() {
            let (ev, span) = self.parser.peek()?;
            if *ev != Event::StreamEnd {
                return Err(ComposerError::new(
                    span.start,
                    "expected a single document in the stream but found another document",
                ));
            }
        }
        Ok(doc)
    }

    fn compose_node(&mut self) -> Result<NodeRef, ComposerError> {
        let (ev, span) = self.parser.next_event()?;
        self.take_comments(span.start);
        match ev {
            Event::Alias(name) => {
                let Some(node) = self.anchor_map.get(&name).cloned() else {
                    return Err(ComposerError::new(span.start, "found undefined alias"));
                };
                // The anchored node owns its own comments.
                self.last_node = None;
                self.note_line(span.end.line());
                Ok(node)
            }
            Event::Scalar(value, style, anchor, tag) => {
                let synthesized = value.is_empty()
                    && style == TScalarStyle::Plain
                    && span.start == span.end
                    && anchor.is_none()
                    && tag.is_none();
                let resolved = self.resolve_tag(
                    tag.as_ref(),
                    NodeClass::Scalar(style == TScalarStyle::Plain),
                    &value,
                );
                let node = Node::scalar(&resolved, value, style)
                    .with_explicit_tag(tag)
                    .at(span.start, span.end)
                    .into_ref();
                self.register(anchor, &node, span.start);
                if !synthesized {
                    self.attach_pending(&node);
                    self.last_node = Some(node.clone());
                    self.note_line(span.end.line());
                }
                Ok(node)
            }
            Event::SequenceStart(anchor, tag, flow) => {
                let resolved = self.resolve_tag(tag.as_ref(), NodeClass::Sequence, "");
                let node = Node::sequence(&resolved, flow)
                    .with_explicit_tag(tag)
                    .at(span.start, span.end)
                    .into_ref();
                self.register(anchor, &node, span.start);
                self.open_collection(&node, flow, &span);
                while !matches!(self.parser.peek()?.0, Event::SequenceEnd) {
                    let item = self.compose_node()?;
                    node.push_item(item);
                }
                let (_, end) = self.parser.next_event()?;
                self.close_collection(&node, flow, &end);
                Ok(node)
            }
            Event::MappingStart(anchor, tag, flow) => {
                let resolved = self.resolve_tag(tag.as_ref(), NodeClass::Mapping, "");
                let node = Node::mapping(&resolved, flow)
                    .with_explicit_tag(tag)
                    .at(span.start, span.end)
                    .into_ref();
                self.register(anchor, &node, span.start);
                self.open_collection(&node, flow, &span);
                while !matches!(self.parser.peek()?.0, Event::MappingEnd) {
                    let key = self.compose_node()?;
                    let value = self.compose_node()?;
                    node.push_pair(key, value);
                }
                let (_, end) = self.parser.next_event()?;
                self.close_collection(&node, flow, &end);
                Ok(node)
            }
            _ => Err(ComposerError::new(span.start, "expected a node")),
        }
    }

    fn resolve_tag(&self, tag: Option<&Tag>, class: NodeClass, value: &str) -> String {
        match tag {
            Some(tag) if tag.is_non_specific() => match class {
                NodeClass::Scalar(_) => STR.to_owned(),
                _ => self.resolver.resolve(class, value).to_owned(),
            },
            Some(tag) => tag.full.clone(),
            None => self.resolver.resolve(class, value).to_owned(),
        }
    }

    fn register(&mut self, anchor: Option<String>, node: &NodeRef, mark: Marker) {
        let Some(anchor) = anchor else {
            return;
        };
        if self.anchor_map.contains_key(&anchor) {
            log::warn!(
                "found duplicate anchor {:?} at line {}, the later one is used",
                anchor,
                mark.line()
            );
        }
        *node.anchor.borrow_mut() = Some(anchor.clone());
        self.anchor_map.insert(anchor, node.clone());
    }

    fn open_collection(&mut self, node: &NodeRef, flow: bool, span: &Span) {
        if flow {
            // Comments of a block collection stay pending for its first child.
            self.attach_pending(node);
            self.flow_level += 1;
        }
        if flow || node.explicit_tag.is_some() || node.anchor.borrow().is_some() {
            self.last_node = None;
            self.note_line(span.start.line());
        }
    }

    fn close_collection(&mut self, node: &NodeRef, flow: bool, end: &Span) {
        self.take_comments(end.start);
        if flow {
            self.flow_level -= 1;
            node.end.set(end.end);
            self.last_node = Some(node.clone());
            self.note_line(end.end.line());
        } else if let Some(last) = last_child(node) {
            node.end.set(last.end.get());
        }
    }

    fn note_line(&mut self, line: usize) {
        self.last_line = Some(self.last_line.map_or(line, |l| l.max(line)));
    }

    /// Give the comments preceding `mark` to the nodes they belong to.
    fn take_comments(&mut self, mark: Marker) {
        loop {
            let comments = self.parser.comments_mut();
            match comments.front() {
                Some(c) if c.mark.index() < mark.index() => {}
                _ => break,
            }
            let Some(comment) = comments.pop_front() else {
                break;
            };
            let line = comment.mark.line();
            let col = comment.mark.col();
            if !comment.standalone {
                if let Some(node) = self.last_node.as_ref() {
                    let end = node.end.get();
                    let mut comments = node.comments.borrow_mut();
                    if end.line() == line && comments.trailing.is_none() {
                        comments.trailing = Some(TrailingComment {
                            col,
                            gap: col.saturating_sub(end.col()).max(1),
                            text: comment.text,
                        });
                        continue;
                    }
                }
                if self.doc_start_line == Some(line) && self.start_comment.is_none() {
                    self.start_comment = Some(TrailingComment {
                        col,
                        gap: 1,
                        text: comment.text,
                    });
                    continue;
                }
            }
            self.push_blank_lines(line);
            self.pending.push(CommentLine {
                col,
                text: comment.text,
            });
            self.note_line(line);
        }
    }

    fn push_blank_lines(&mut self, line: usize) {
        if self.flow_level > 0 {
            return;
        }
        if let Some(last) = self.last_line {
            for _ in last + 1..line {
                self.pending.push(CommentLine::blank());
            }
        }
    }

    fn attach_pending(&mut self, node: &NodeRef) {
        self.push_blank_lines(node.start.line());
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        node.comments.borrow_mut().before.extend(pending);
    }
}

fn last_child(node: &NodeRef) -> Option<NodeRef> {
    if let Some(items) = node.items() {
        return items.last().cloned();
    }
    node.pairs()
        .and_then(|pairs| pairs.last().map(|(_, v)| v.clone()))
}

//! YAML serialization helpers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::char_traits::{is_indicator, is_printable, is_unicode_break};
use crate::error::EmitError;
use crate::nodes::{CommentLine, Document, NodeKind, NodeRef, TrailingComment};
use crate::parser::DEFAULT_TAG_PREFIX;
use crate::resolver::{Resolver, MAP, SEQ, STR};
use crate::scanner::TScalarStyle;

/// Layout options of the emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Flow style of collections without one of their own: always (`Some(true)`), never
    /// (`Some(false)`), or only for collections of scalars (`None`).
    pub default_flow_style: Option<bool>,
    /// Indentation of nested mappings and of block scalar content.
    pub indent: usize,
    /// Indentation of the content of sequence items.
    pub sequence_indent: usize,
    /// Offset of the `-` of sequence items.
    pub sequence_dash_offset: usize,
    /// Column after which flow collections are wrapped.
    pub width: usize,
    /// Align the values of a block mapping on the longest key.
    pub mapping_value_align: bool,
    /// Write single-pair mappings inside flow sequences as `{a: 1}` instead of `a: 1`.
    pub brace_single_entry_mapping_in_flow_sequence: bool,
    /// Force (`Some(true)`) or omit (`Some(false)`) the `---` of the first document.
    pub explicit_start: Option<bool>,
    /// Terminate every document with `...`.
    pub explicit_end: bool,
    /// Write non-ASCII printable characters as they are instead of escaping them.
    pub allow_unicode: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        EmitterConfig {
            default_flow_style: None,
            indent: 2,
            sequence_indent: 2,
            sequence_dash_offset: 0,
            width: 80,
            mapping_value_align: false,
            brace_single_entry_mapping_in_flow_sequence: false,
            explicit_start: None,
            explicit_end: false,
            allow_unicode: true,
        }
    }
}

pub type EmitResult = Result<(), EmitError>;

/// Styles a scalar may be written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScalarAnalysis {
    pub empty: bool,
    pub multiline: bool,
    /// Plain style in block context.
    pub allow_plain: bool,
    /// Plain style in flow context.
    pub allow_flow_plain: bool,
    pub allow_single: bool,
    /// Literal and folded styles.
    pub allow_block: bool,
}

/// Find out which styles can represent `text` exactly.
#[must_use]
pub fn analyze_scalar(text: &str) -> ScalarAnalysis {
    if text.is_empty() {
        return ScalarAnalysis {
            empty: true,
            multiline: false,
            allow_plain: false,
            allow_flow_plain: false,
            allow_single: true,
            allow_block: false,
        };
    }

    let mut block_indicators = text.starts_with("---") || text.starts_with("...");
    let mut flow_indicators = block_indicators;
    let mut line_breaks = false;
    let mut special = false;
    let mut space_break = false;
    let mut break_space = false;

    let chars: Vec<char> = text.chars().collect();
    let is_line_break = |c: char| c == '\n' || is_unicode_break(c);
    let followed_by_blank =
        |i: usize| chars.get(i + 1).map_or(true, |&n| n == ' ' || is_line_break(n));

    for (i, &c) in chars.iter().enumerate() {
        if i == 0 {
            if matches!(c, '-' | '?' | ':') {
                flow_indicators |= c != '-';
                if followed_by_blank(i) {
                    flow_indicators = true;
                    block_indicators = true;
                }
            } else if is_indicator(c) {
                flow_indicators = true;
                block_indicators = true;
            }
        } else {
            if matches!(c, ',' | '?' | '[' | ']' | '{' | '}') {
                flow_indicators = true;
            }
            if c == ':' {
                flow_indicators = true;
                if followed_by_blank(i) {
                    block_indicators = true;
                }
            }
            if c == '#' && chars[i - 1] == ' ' {
                flow_indicators = true;
                block_indicators = true;
            }
        }

        if is_line_break(c) {
            line_breaks = true;
        } else if c == '\t' || c == '\u{feff}' || !is_printable(c) {
            special = true;
        }

        if let Some(&next) = chars.get(i + 1) {
            if c == ' ' && is_line_break(next) {
                space_break = true;
            }
            if is_line_break(c) && next == ' ' {
                break_space = true;
            }
        }
    }

    let first = chars[0];
    let last = chars[chars.len() - 1];
    let leading_blank = first == ' ' || is_line_break(first);
    let trailing_space = last == ' ';
    let trailing_blank = trailing_space || is_line_break(last);

    let mut analysis = ScalarAnalysis {
        empty: false,
        multiline: line_breaks,
        allow_plain: true,
        allow_flow_plain: true,
        allow_single: true,
        allow_block: true,
    };
    if leading_blank || trailing_blank || line_breaks {
        analysis.allow_plain = false;
        analysis.allow_flow_plain = false;
    }
    if trailing_space {
        analysis.allow_block = false;
    }
    if break_space {
        analysis.allow_plain = false;
        analysis.allow_flow_plain = false;
        analysis.allow_single = false;
    }
    if space_break || special {
        analysis = ScalarAnalysis {
            allow_plain: false,
            allow_flow_plain: false,
            allow_single: false,
            allow_block: false,
            ..analysis
        };
    }
    if flow_indicators {
        analysis.allow_flow_plain = false;
    }
    if block_indicators {
        analysis.allow_plain = false;
    }
    analysis
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Context {
    Root,
    Sequence,
    MappingKey,
    MappingValue,
    Flow,
    FlowKey,
}

/// Writes composed documents as YAML text.
pub struct YamlEmitter<'a> {
    writer: &'a mut dyn fmt::Write,
    config: EmitterConfig,
    resolver: Resolver,
    column: usize,
    line_start: bool,
    documents: usize,
    ended: bool,
    flow_level: usize,
    tag_directives: Vec<(String, String)>,
    anchors: HashMap<usize, String>,
    emitted: HashSet<usize>,
}

fn node_id(node: &NodeRef) -> usize {
    Rc::as_ptr(node) as usize
}

impl<'a> YamlEmitter<'a> {
    pub fn new(writer: &'a mut dyn fmt::Write) -> YamlEmitter<'a> {
        YamlEmitter::with_config(writer, EmitterConfig::default())
    }

    pub fn with_config(
        writer: &'a mut dyn fmt::Write,
        config: EmitterConfig,
    ) -> YamlEmitter<'a> {
        YamlEmitter {
            writer,
            config,
            resolver: Resolver::default(),
            column: 0,
            line_start: true,
            documents: 0,
            ended: true,
            flow_level: 0,
            tag_directives: Vec::new(),
            anchors: HashMap::new(),
            emitted: HashSet::new(),
        }
    }

    /// Write one document, after the ones already written.
    /// # Errors
    /// Returns `EmitError` if the writer fails or the indentation settings are unusable.
    pub fn emit_document(&mut self, doc: &Document) -> EmitResult {
        for indent in [self.config.indent, self.config.sequence_indent] {
            if !(1..=9).contains(&indent) {
                return Err(EmitError::BadIndent(indent));
            }
        }
        self.resolver = Resolver::new(doc.processing_version);
        self.tag_directives.clone_from(&doc.tags);
        self.flow_level = 0;
        self.assign_anchors(&doc.root);

        let has_directives = doc.version.is_some() || !doc.tags.is_empty();
        if has_directives && !self.ended {
            self.write("...\n")?;
        }
        if let Some((major, minor)) = doc.version {
            self.write(&format!("%YAML {major}.{minor}\n"))?;
        }
        for (handle, prefix) in &doc.tags {
            self.write(&format!("%TAG {handle} {prefix}\n"))?;
        }

        let root = &doc.root;
        let block_root = self.is_block(root);
        if !block_root {
            self.write_comment_lines(&root.comments.borrow().before)?;
        }
        let explicit_start = has_directives
            || self.documents > 0
            || doc.start_comment.is_some()
            || match self.config.explicit_start {
                Some(forced) => forced,
                None => doc.explicit_start,
            };
        if explicit_start {
            self.newline()?;
            self.write("---")?;
            self.write_trailing(doc.start_comment.as_ref())?;
        }

        if block_root {
            let props = self.begin_node(root, None);
            if !props.is_empty() {
                if doc.start_comment.is_some() {
                    self.newline()?;
                } else if explicit_start {
                    self.write(" ")?;
                }
                self.write(&props)?;
            }
            match &root.kind {
                NodeKind::Mapping(..) => self.emit_block_mapping(root, 0, false)?,
                _ => self.emit_block_sequence(root, self.config.sequence_dash_offset, false)?,
            }
        } else if doc.start_comment.is_some() {
            self.newline()?;
            self.emit_node(root, Context::Root, 0, None)?;
        } else {
            if explicit_start && !self.is_empty_plain(root) {
                self.write(" ")?;
            }
            let ctx = if explicit_start {
                Context::MappingValue
            } else {
                Context::Root
            };
            self.emit_node(root, ctx, 0, None)?;
        }

        self.write_comment_lines(&doc.end_comments)?;
        self.newline()?;
        self.ended = doc.explicit_end || self.config.explicit_end;
        if self.ended {
            self.write("...\n")?;
        }
        self.documents += 1;
        Ok(())
    }

    fn write(&mut self, s: &str) -> EmitResult {
        if s.is_empty() {
            return Ok(());
        }
        self.writer.write_str(s)?;
        match s.rfind('\n') {
            Some(pos) => self.column = s[pos + 1..].chars().count(),
            None => self.column += s.chars().count(),
        }
        self.line_start = s.ends_with('\n');
        Ok(())
    }

    fn newline(&mut self) -> EmitResult {
        if !self.line_start {
            self.write("\n")?;
        }
        Ok(())
    }

    fn write_indent(&mut self, col: usize) -> EmitResult {
        self.newline()?;
        self.write(&" ".repeat(col))
    }

    fn write_comment_lines(&mut self, lines: &[CommentLine]) -> EmitResult {
        if self.flow_level > 0 || lines.is_empty() {
            return Ok(());
        }
        for line in lines {
            self.newline()?;
            if line.is_blank() {
                self.write("\n")?;
            } else {
                self.write(&" ".repeat(line.col))?;
                self.write(&line.text)?;
                self.write("\n")?;
            }
        }
        Ok(())
    }

    /// Write an end-of-line comment, at its original column when the line is short enough.
    fn write_trailing(&mut self, comment: Option<&TrailingComment>) -> EmitResult {
        let Some(comment) = comment else {
            return Ok(());
        };
        if self.flow_level > 0 {
            return Ok(());
        }
        let pad = if comment.col > self.column {
            comment.col - self.column
        } else {
            comment.gap.max(1)
        };
        self.write(&" ".repeat(pad))?;
        self.write(&comment.text)
    }

    /// Comments written before the line a node starts on, including those of the first
    /// child of a block collection that starts on the same line.
    fn write_leading(&mut self, node: &NodeRef) -> EmitResult {
        if self.is_alias(node) {
            return Ok(());
        }
        self.write_comment_lines(&node.comments.borrow().before)?;
        if self.is_block(node) && self.properties(node, None).is_empty() {
            let first = match &node.kind {
                NodeKind::Mapping(pairs, _) => pairs.borrow().first().map(|(k, _)| k.clone()),
                NodeKind::Sequence(items, _) => items.borrow().first().cloned(),
                NodeKind::Scalar(..) => None,
            };
            if let Some(first) = first {
                self.write_leading(&first)?;
            }
        }
        Ok(())
    }

    fn assign_anchors(&mut self, root: &NodeRef) {
        fn visit(node: &NodeRef, counts: &mut HashMap<usize, usize>, order: &mut Vec<NodeRef>) {
            let count = counts.entry(node_id(node)).or_insert(0);
            *count += 1;
            if *count > 1 {
                return;
            }
            order.push(node.clone());
            match &node.kind {
                NodeKind::Scalar(..) => {}
                NodeKind::Sequence(items, _) => {
                    for item in items.borrow().iter() {
                        visit(item, counts, order);
                    }
                }
                NodeKind::Mapping(pairs, _) => {
                    for (k, v) in pairs.borrow().iter() {
                        visit(k, counts, order);
                        visit(v, counts, order);
                    }
                }
            }
        }

        self.anchors.clear();
        self.emitted.clear();
        let mut counts = HashMap::new();
        let mut order = Vec::new();
        visit(root, &mut counts, &mut order);

        let taken: HashSet<String> = order
            .iter()
            .filter_map(|n| n.anchor.borrow().clone())
            .collect();
        let mut last_id = 0;
        for node in &order {
            let id = node_id(node);
            if let Some(name) = node.anchor.borrow().as_ref() {
                self.anchors.insert(id, name.clone());
            } else if counts.get(&id).copied().unwrap_or(0) > 1 {
                let name = loop {
                    last_id += 1;
                    let name = format!("id{last_id:03}");
                    if !taken.contains(&name) {
                        break name;
                    }
                };
                self.anchors.insert(id, name);
            }
        }
    }

    fn is_alias(&self, node: &NodeRef) -> bool {
        let id = node_id(node);
        self.emitted.contains(&id) && self.anchors.contains_key(&id)
    }

    fn is_block(&self, node: &NodeRef) -> bool {
        self.flow_level == 0 && !node.is_scalar() && !node.is_flow() && !node.is_empty()
    }

    fn is_empty_plain(&self, node: &NodeRef) -> bool {
        matches!(&node.kind, NodeKind::Scalar(text, TScalarStyle::Plain) if text.is_empty())
            && self.properties(node, Some(TScalarStyle::Plain)).is_empty()
            && !self.is_alias(node)
    }

    /// Anchor and tag of a node, as written before its content.
    fn properties(&self, node: &NodeRef, style: Option<TScalarStyle>) -> String {
        let mut props = String::new();
        if let Some(anchor) = self.anchors.get(&node_id(node)) {
            props.push('&');
            props.push_str(anchor);
        }
        if let Some(tag) = self.tag_text(node, style) {
            if !props.is_empty() {
                props.push(' ');
            }
            props.push_str(&tag);
        }
        props
    }

    /// Properties of a node about to be written; later occurrences become aliases.
    fn begin_node(&mut self, node: &NodeRef, style: Option<TScalarStyle>) -> String {
        let props = self.properties(node, style);
        self.emitted.insert(node_id(node));
        props
    }

    fn tag_text(&self, node: &NodeRef, style: Option<TScalarStyle>) -> Option<String> {
        if let Some(tag) = &node.explicit_tag {
            if tag.handle.is_empty() {
                return Some(format!("!<{}>", tag.full));
            }
            return Some(format!(
                "{}{}",
                tag.handle,
                escape_tag_suffix(&tag.suffix, self.flow_level > 0)
            ));
        }
        let implicit = match &node.kind {
            NodeKind::Scalar(text, own) => match style.unwrap_or(*own) {
                TScalarStyle::Plain => self.resolver.resolve_plain(text) == node.tag,
                _ => node.tag == STR,
            },
            NodeKind::Sequence(..) => node.tag == SEQ,
            NodeKind::Mapping(..) => node.tag == MAP,
        };
        if implicit {
            return None;
        }
        let flow = self.flow_level > 0;
        let mut best: Option<(&str, &str)> = None;
        for (handle, prefix) in &self.tag_directives {
            if node.tag.starts_with(prefix.as_str())
                && best.map_or(true, |(_, p)| prefix.len() > p.len())
            {
                best = Some((handle, prefix));
            }
        }
        if let Some((handle, prefix)) = best {
            return Some(format!(
                "{handle}{}",
                escape_tag_suffix(&node.tag[prefix.len()..], flow)
            ));
        }
        if let Some(suffix) = node.tag.strip_prefix(DEFAULT_TAG_PREFIX) {
            return Some(format!("!!{}", escape_tag_suffix(suffix, flow)));
        }
        if let Some(suffix) = node.tag.strip_prefix('!') {
            return Some(format!("!{}", escape_tag_suffix(suffix, flow)));
        }
        Some(format!("!<{}>", node.tag))
    }

    /// Write a scalar, alias or flow collection where it starts, or the header of a block
    /// scalar.
    fn emit_node(
        &mut self,
        node: &NodeRef,
        ctx: Context,
        indent: usize,
        header_comment: Option<&TrailingComment>,
    ) -> EmitResult {
        if self.is_alias(node) {
            let name = self.anchors.get(&node_id(node)).cloned().unwrap_or_default();
            return self.write(&format!("*{name}"));
        }
        match &node.kind {
            NodeKind::Scalar(text, style) => {
                let style = self.scalar_style(text, *style, ctx);
                let props = self.begin_node(node, Some(style));
                let empty = text.is_empty() && style == TScalarStyle::Plain;
                if !props.is_empty() {
                    self.write(&props)?;
                    if !empty {
                        self.write(" ")?;
                    }
                } else if empty && ctx != Context::MappingValue && ctx != Context::Sequence {
                    return self.write("null");
                }
                match style {
                    TScalarStyle::Plain => self.write(text)?,
                    TScalarStyle::SingleQuoted => self.write_single_quoted(text, indent)?,
                    TScalarStyle::DoubleQuoted => self.write_double_quoted(text)?,
                    TScalarStyle::Literal | TScalarStyle::Folded => {
                        let own = node.comments.borrow().trailing.clone();
                        return self.write_block_scalar(
                            text,
                            style,
                            indent,
                            header_comment.or(own.as_ref()),
                        );
                    }
                }
            }
            NodeKind::Sequence(..) => {
                let props = self.begin_node(node, None);
                if !props.is_empty() {
                    self.write(&props)?;
                    self.write(" ")?;
                }
                self.emit_flow_sequence(node, indent)?;
            }
            NodeKind::Mapping(..) => {
                let props = self.begin_node(node, None);
                if !props.is_empty() {
                    self.write(&props)?;
                    self.write(" ")?;
                }
                self.emit_flow_mapping(node, indent)?;
            }
        }
        if !matches!(ctx, Context::MappingKey | Context::FlowKey) {
            let trailing = node.comments.borrow().trailing.clone();
            self.write_trailing(trailing.as_ref())?;
        }
        Ok(())
    }

    /// The style a scalar can actually be written in at this position.
    fn scalar_style(&self, text: &str, style: TScalarStyle, ctx: Context) -> TScalarStyle {
        let analysis = analyze_scalar(text);
        let flow = self.flow_level > 0;
        let key = matches!(ctx, Context::MappingKey | Context::FlowKey);
        let single_ok = analysis.allow_single && !(analysis.multiline && (key || flow));
        let quoted = if single_ok {
            TScalarStyle::SingleQuoted
        } else {
            TScalarStyle::DoubleQuoted
        };
        match style {
            TScalarStyle::Plain if text.is_empty() => TScalarStyle::Plain,
            TScalarStyle::Plain => {
                let ok = if flow {
                    analysis.allow_flow_plain
                } else {
                    analysis.allow_plain
                };
                if ok {
                    TScalarStyle::Plain
                } else {
                    quoted
                }
            }
            TScalarStyle::SingleQuoted => quoted,
            TScalarStyle::Literal | TScalarStyle::Folded => {
                if flow || key || !analysis.allow_block {
                    TScalarStyle::DoubleQuoted
                } else {
                    style
                }
            }
            TScalarStyle::DoubleQuoted => TScalarStyle::DoubleQuoted,
        }
    }

    fn is_simple_key(&self, key: &NodeRef) -> bool {
        if self.is_alias(key) {
            return true;
        }
        match &key.kind {
            NodeKind::Scalar(text, _) => {
                !analyze_scalar(text).multiline && text.chars().count() < 128
            }
            _ => key.is_empty(),
        }
    }

    fn emit_block_mapping(
        &mut self,
        node: &NodeRef,
        indent: usize,
        inline_first: bool,
    ) -> EmitResult {
        let pairs: Vec<(NodeRef, NodeRef)> = node.pairs().map(|p| p.clone()).unwrap_or_default();
        let align = if self.config.mapping_value_align {
            pairs
                .iter()
                .filter_map(|(k, _)| k.scalar_value())
                .map(|k| k.chars().count())
                .max()
        } else {
            None
        };

        for (i, (key, value)) in pairs.iter().enumerate() {
            if i > 0 || !inline_first {
                if !self.is_alias(key) {
                    self.write_comment_lines(&key.comments.borrow().before)?;
                }
                self.write_indent(indent)?;
            }
            if self.is_simple_key(key) {
                let start = self.column;
                let alias = self.is_alias(key);
                self.emit_node(key, Context::MappingKey, indent, None)?;
                self.write(if alias { " :" } else { ":" })?;
                if let Some(width) = align {
                    if !self.is_block(value) && !self.is_empty_plain(value) {
                        let target = start + width + 1;
                        if self.column < target {
                            self.write(&" ".repeat(target - self.column))?;
                        }
                    }
                }
            } else {
                self.write("?")?;
                self.emit_sequence_item(key, indent)?;
                self.write_indent(indent)?;
                self.write(":")?;
            }
            self.emit_mapping_value(key, value, indent)?;
        }
        Ok(())
    }

    fn emit_mapping_value(&mut self, key: &NodeRef, value: &NodeRef, indent: usize) -> EmitResult {
        let key_comment = key.comments.borrow().trailing.clone();
        if self.is_alias(value) {
            self.write(" ")?;
            self.emit_node(value, Context::MappingValue, indent, None)?;
            return self.write_trailing(key_comment.as_ref());
        }
        if self.is_block(value) {
            let props = self.begin_node(value, None);
            if !props.is_empty() {
                self.write(" ")?;
                self.write(&props)?;
            }
            self.write_trailing(key_comment.as_ref())?;
            return match &value.kind {
                NodeKind::Mapping(..) => {
                    self.emit_block_mapping(value, indent + self.config.indent, false)
                }
                _ => self.emit_block_sequence(
                    value,
                    indent + self.config.sequence_dash_offset,
                    false,
                ),
            };
        }

        let block_scalar = matches!(
            value.style(),
            Some(TScalarStyle::Literal | TScalarStyle::Folded)
        );
        let has_before = !value.comments.borrow().before.is_empty();
        if (key_comment.is_some() && !block_scalar) || has_before {
            self.write_trailing(key_comment.as_ref())?;
            self.write_comment_lines(&value.comments.borrow().before)?;
            self.write_indent(indent + self.config.indent)?;
            return self.emit_node(value, Context::MappingValue, indent, None);
        }
        if !self.is_empty_plain(value) && self.column > 0 {
            self.write(" ")?;
        }
        self.emit_node(value, Context::MappingValue, indent, key_comment.as_ref())
    }

    fn emit_block_sequence(
        &mut self,
        node: &NodeRef,
        dash_col: usize,
        inline_first: bool,
    ) -> EmitResult {
        let items: Vec<NodeRef> = node.items().map(|i| i.clone()).unwrap_or_default();
        for (i, item) in items.iter().enumerate() {
            if i > 0 || !inline_first {
                self.write_leading(item)?;
                self.write_indent(dash_col)?;
            }
            self.write("-")?;
            self.emit_sequence_item(item, dash_col)?;
        }
        Ok(())
    }

    /// Write what follows a `-` (or the `?` of a complex key).
    fn emit_sequence_item(&mut self, item: &NodeRef, dash_col: usize) -> EmitResult {
        let width = self
            .config
            .sequence_indent
            .saturating_sub(self.config.sequence_dash_offset)
            .max(2);
        let content_col = dash_col + width;
        let pad = " ".repeat(width - 1);

        if self.is_alias(item) {
            self.write(&pad)?;
            return self.emit_node(item, Context::Sequence, dash_col, None);
        }
        if self.is_block(item) {
            let props = self.begin_node(item, None);
            if props.is_empty() {
                self.write(&pad)?;
                return match &item.kind {
                    NodeKind::Mapping(..) => self.emit_block_mapping(item, content_col, true),
                    _ => self.emit_block_sequence(item, content_col, true),
                };
            }
            self.write(" ")?;
            self.write(&props)?;
            return match &item.kind {
                NodeKind::Mapping(..) => self.emit_block_mapping(item, content_col, false),
                _ => self.emit_block_sequence(item, content_col, false),
            };
        }
        if self.is_empty_plain(item) {
            self.begin_node(item, None);
            let trailing = item.comments.borrow().trailing.clone();
            return self.write_trailing(trailing.as_ref());
        }
        self.write(&pad)?;
        self.emit_node(item, Context::Sequence, dash_col, None)
    }

    /// Break a long flow collection before its next entry.
    fn wrap(&mut self, indent: usize) -> EmitResult {
        if self.column > self.config.width {
            self.write("\n")?;
            self.write(&" ".repeat(indent + self.config.indent))?;
        }
        Ok(())
    }

    fn emit_flow_sequence(&mut self, node: &NodeRef, indent: usize) -> EmitResult {
        let items: Vec<NodeRef> = node.items().map(|i| i.clone()).unwrap_or_default();
        self.write("[")?;
        self.flow_level += 1;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
                self.wrap(indent)?;
            }
            if self.is_bare_pair(item) {
                let pairs: Vec<(NodeRef, NodeRef)> =
                    item.pairs().map(|p| p.clone()).unwrap_or_default();
                self.begin_node(item, None);
                for (k, v) in &pairs {
                    self.emit_flow_pair(k, v, indent)?;
                }
            } else {
                self.emit_node(item, Context::Flow, indent, None)?;
            }
        }
        self.flow_level -= 1;
        self.write("]")
    }

    /// Whether a flow sequence item can be written as `key: value` without braces.
    fn is_bare_pair(&self, item: &NodeRef) -> bool {
        if self.config.brace_single_entry_mapping_in_flow_sequence || self.is_alias(item) {
            return false;
        }
        match item.pairs() {
            Some(pairs) if pairs.len() == 1 => {
                let key = &pairs[0].0;
                key.is_scalar()
                    && !self.is_alias(key)
                    && !key.scalar_value().map_or(true, str::is_empty)
                    && self.properties(item, None).is_empty()
            }
            _ => false,
        }
    }

    fn emit_flow_mapping(&mut self, node: &NodeRef, indent: usize) -> EmitResult {
        let pairs: Vec<(NodeRef, NodeRef)> = node.pairs().map(|p| p.clone()).unwrap_or_default();
        self.write("{")?;
        self.flow_level += 1;
        for (i, (k, v)) in pairs.iter().enumerate() {
            if i > 0 {
                self.write(", ")?;
                self.wrap(indent)?;
            }
            self.emit_flow_pair(k, v, indent)?;
        }
        self.flow_level -= 1;
        self.write("}")
    }

    fn emit_flow_pair(&mut self, key: &NodeRef, value: &NodeRef, indent: usize) -> EmitResult {
        let alias = self.is_alias(key);
        self.emit_node(key, Context::FlowKey, indent, None)?;
        self.write(if alias { " : " } else { ": " })?;
        self.emit_node(value, Context::Flow, indent, None)
    }

    fn write_single_quoted(&mut self, text: &str, indent: usize) -> EmitResult {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('\'');
        let continuation = " ".repeat(indent + self.config.indent);
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\'' => out.push_str("''"),
                '\n' => {
                    // A single line break folds into a space: write one more than the text has.
                    out.push_str("\n\n");
                    while chars.peek() == Some(&'\n') {
                        chars.next();
                        out.push('\n');
                    }
                    out.push_str(&continuation);
                }
                c => out.push(c),
            }
        }
        out.push('\'');
        self.write(&out)
    }

    // from serialize::json
    fn write_double_quoted(&mut self, v: &str) -> EmitResult {
        let mut out = String::with_capacity(v.len() + 2);
        out.push('"');
        for c in v.chars() {
            let escaped = match c {
                '"' => "\\\"",
                '\\' => "\\\\",
                '\0' => "\\0",
                '\x07' => "\\a",
                '\x08' => "\\b",
                '\t' => "\\t",
                '\n' => "\\n",
                '\x0b' => "\\v",
                '\x0c' => "\\f",
                '\r' => "\\r",
                '\x1b' => "\\e",
                '\u{85}' => "\\N",
                '\u{a0}' => "\\_",
                '\u{2028}' => "\\L",
                '\u{2029}' => "\\P",
                c if !is_printable(c)
                    || c == '\u{feff}'
                    || (!self.config.allow_unicode && !c.is_ascii()) =>
                {
                    let code = u32::from(c);
                    if code <= 0xff {
                        out.push_str(&format!("\\x{code:02X}"));
                    } else if code <= 0xffff {
                        out.push_str(&format!("\\u{code:04X}"));
                    } else {
                        out.push_str(&format!("\\U{code:08X}"));
                    }
                    continue;
                }
                c => {
                    out.push(c);
                    continue;
                }
            };
            out.push_str(escaped);
        }
        out.push('"');
        self.write(&out)
    }

    fn write_block_scalar(
        &mut self,
        text: &str,
        style: TScalarStyle,
        indent: usize,
        comment: Option<&TrailingComment>,
    ) -> EmitResult {
        let mut header = String::from(if style == TScalarStyle::Literal { "|" } else { ">" });
        if text.starts_with(' ') || text.starts_with('\n') {
            header.push_str(&self.config.indent.to_string());
        }
        if !text.ends_with('\n') {
            header.push('-');
        } else if text == "\n" || text.ends_with("\n\n") {
            header.push('+');
        }
        self.write(&header)?;
        self.write_trailing(comment)?;

        let content_col = indent + self.config.indent;
        let body = text.strip_suffix('\n').unwrap_or(text);
        let mut previous_normal = false;
        let mut last_empty = false;
        for line in body.split('\n') {
            self.write("\n")?;
            last_empty = line.is_empty();
            if line.is_empty() {
                continue;
            }
            let normal = !line.starts_with(' ');
            if style == TScalarStyle::Folded && normal && previous_normal {
                // Adjacent lines would fold into one.
                self.write("\n")?;
            }
            previous_normal = normal;
            self.write(&" ".repeat(content_col))?;
            self.write(line)?;
        }
        if last_empty {
            // The empty last line still needs its own line break.
            self.line_start = false;
        }
        Ok(())
    }
}

/// Percent-encode the characters of a tag suffix that would end or break the tag.
fn escape_tag_suffix(suffix: &str, flow: bool) -> String {
    let mut out = String::with_capacity(suffix.len());
    for c in suffix.chars() {
        let keep = c.is_ascii_alphanumeric()
            || "-;/?:@&=+$._~*'()#".contains(c)
            || (!flow && matches!(c, ',' | '[' | ']'));
        if keep {
            out.push(c);
        } else {
            let mut buf = [0; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

// parser.rs - Pattern parser.
// Recursive descent from decoded characters to the AST arena, group and
// back-reference bookkeeping, the post-parse resolution pass and the limit
// checks that run before any enumeration starts.
//
// Grammar (lowest precedence first):
//   alts   := branch ('|' branch)*
//   branch := exp*
//   exp    := atom quantifier?
//   atom   := char | '.' | class | '(' ('?:' | '?i:')? alts ')' | '\' escape

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use smallvec::SmallVec;

use crate::ast::*;
use crate::charset::Charset;
use crate::decoder::Decoder;
use crate::error::*;
use crate::uchar::{CharTable, UChar};

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_MAX_LENGTH: usize = 4096;
pub const MAX_REPEAT_NUM: u32 = 100_000;
/// Width of the case mask of one case-insensitive section.
pub const MAX_CASE_BITS: u64 = 64;

const DEFAULT_PARSE_DEPTH_LIMIT: u32 = 256;

static DIGIT_RANGES: &[(u32, u32)] = &[(0x30, 0x39)];
static WORD_RANGES: &[(u32, u32)] = &[(0x30, 0x39), (0x41, 0x5a), (0x5f, 0x5f), (0x61, 0x7a)];
static SPACE_RANGES: &[(u32, u32)] = &[(0x09, 0x0d), (0x20, 0x20)];
static PRINTABLE_RANGES: &[(u32, u32)] = &[(PRINTABLE_FIRST, PRINTABLE_LAST)];

// ============================================================================
// Global State
// ============================================================================

static PARSE_DEPTH_LIMIT: AtomicU32 = AtomicU32::new(DEFAULT_PARSE_DEPTH_LIMIT);

pub fn parse_depth_limit() -> u32 {
    PARSE_DEPTH_LIMIT.load(Ordering::Relaxed)
}

/// Set the maximum group nesting depth. `0` restores the default.
pub fn set_parse_depth_limit(depth: u32) {
    let depth = if depth == 0 {
        DEFAULT_PARSE_DEPTH_LIMIT
    } else {
        depth
    };
    PARSE_DEPTH_LIMIT.store(depth, Ordering::Relaxed);
}

// ============================================================================
// Options and output
// ============================================================================

/// Settings fixed for one parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub charset: Charset,
    /// Upper bound substituted for `*`, `+` and `{m,}`. Unbounded
    /// repetition is rejected when `None`.
    pub repeat_limit: Option<u32>,
    /// Longest word, in characters, the pattern may produce.
    pub max_length: usize,
    /// Reject patterns whose combination upper bound exceeds this.
    pub max_combinations: Option<u128>,
    /// Whether a word source backs `\0`.
    pub stream: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            charset: Charset::Utf8,
            repeat_limit: None,
            max_length: DEFAULT_MAX_LENGTH,
            max_combinations: None,
            stream: false,
        }
    }
}

/// A successfully parsed, resolved and limit-checked pattern.
#[derive(Clone, Debug)]
pub struct ParsedPattern {
    pub(crate) ast: Ast,
    pub(crate) groups: BTreeMap<u32, NodeId>,
    pub(crate) stream_anchor: Option<NodeId>,
    pub(crate) chars: CharTable,
    /// Mask widths of the case-insensitive sections that read a group
    /// varying faster than themselves.
    pub(crate) case_widths: BTreeMap<NodeId, u32>,
}

impl ParsedPattern {
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The node of capturing group `id`.
    pub fn group(&self, id: u32) -> Option<NodeId> {
        self.groups.get(&id).copied()
    }

    pub fn stream_anchor(&self) -> Option<NodeId> {
        self.stream_anchor
    }

    pub fn charset(&self) -> Charset {
        self.chars.charset()
    }

    /// Fixed mask width of case-insensitive section `node`, if its value
    /// can change while its mask runs.
    pub fn fixed_case_width(&self, node: NodeId) -> Option<u32> {
        self.case_widths.get(&node).copied()
    }
}

/// Parse, resolve and check `pattern`.
pub fn parse(pattern: &[u8], options: &ParseOptions) -> Result<ParsedPattern, GenError> {
    let mut ctx = ParserContext::new(pattern, options.clone());
    let root = ctx.parse_regexp()?;
    ctx.resolve_group_references();
    if let Some(group) = ctx.first_unresolved_reference() {
        return Err(GenError::DanglingReference { group });
    }
    ctx.check_reference_cycles()?;
    ctx.check_limits(root)?;
    let case_widths = ctx.fixed_case_widths()?;
    Ok(ctx.finish(case_widths))
}

// ============================================================================
// Parser context
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingRef {
    node: NodeId,
    position: usize,
}

enum Piece {
    Char(UChar),
    Node(NodeId),
}

#[derive(Clone, Copy)]
struct EscValue {
    code: u32,
    /// Written as a numeric escape: keeps its case.
    preserve: bool,
}

enum CcItem {
    Value(EscValue),
    Set(&'static [(u32, u32)]),
}

#[derive(Default)]
struct ClassSet {
    codes: Vec<(u32, bool)>,
    seen: HashSet<u32>,
}

impl ClassSet {
    fn add(&mut self, code: u32, preserve: bool) {
        if char::from_u32(code).is_some() && self.seen.insert(code) {
            self.codes.push((code, preserve));
        }
    }

    fn add_range(&mut self, lo: u32, hi: u32, preserve: bool) {
        for code in lo..=hi {
            self.add(code, preserve);
        }
    }
}

pub struct ParserContext {
    input: Decoder,
    options: ParseOptions,
    chars: CharTable,
    ast: Ast,
    /// Id of the next capturing group.
    group_id: u32,
    groups: BTreeMap<u32, NodeId>,
    group_refs: BTreeMap<u32, SmallVec<[PendingRef; 2]>>,
    stream_anchor: Option<NodeId>,
    depth: u32,
}

impl ParserContext {
    pub fn new(input: &[u8], options: ParseOptions) -> Self {
        ParserContext {
            input: Decoder::new(input),
            chars: CharTable::new(options.charset),
            options,
            ast: Ast::new(),
            group_id: 1,
            groups: BTreeMap::new(),
            group_refs: BTreeMap::new(),
            stream_anchor: None,
            depth: 0,
        }
    }

    fn err(&self, code: i32) -> GenError {
        GenError::syntax(code, self.input.position())
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn groups(&self) -> &BTreeMap<u32, NodeId> {
        &self.groups
    }

    /// Nodes of the references waiting on group `id`.
    pub fn group_references(&self, id: u32) -> Vec<NodeId> {
        self.group_refs
            .get(&id)
            .map(|refs| refs.iter().map(|r| r.node).collect())
            .unwrap_or_default()
    }

    fn register_group(&mut self, id: u32, node: NodeId) {
        self.groups.insert(id, node);
    }

    fn register_group_reference(&mut self, id: u32, node: NodeId, position: usize) {
        self.group_refs
            .entry(id)
            .or_default()
            .push(PendingRef { node, position });
    }

    /// The first `\0` allocates the stream anchor; every later one becomes a
    /// reference bound to it.
    pub fn stream_node(&mut self) -> NodeId {
        match self.stream_anchor {
            None => {
                let anchor = self.ast.push(Node::StreamAnchor);
                self.stream_anchor = Some(anchor);
                anchor
            }
            Some(anchor) => self.ast.push(Node::GroupRef {
                id: STREAM_GROUP_ID,
                target: Some(anchor),
            }),
        }
    }

    // === Resolution pass ===

    /// Bind every pending reference to its group.
    pub fn resolve_group_references(&mut self) {
        for (id, &group) in &self.groups {
            let Some(refs) = self.group_refs.get(id) else {
                continue;
            };
            for r in refs {
                if let Node::GroupRef { target, .. } = self.ast.get_mut(r.node) {
                    *target = Some(group);
                }
            }
        }
    }

    fn first_unresolved_reference(&self) -> Option<u32> {
        self.group_refs
            .iter()
            .find(|(_, refs)| {
                refs.iter().any(|r| {
                    matches!(self.ast.get(r.node), Node::GroupRef { target: None, .. })
                })
            })
            .map(|(&id, _)| id)
    }

    /// True if some reference is still unbound after resolution.
    pub fn has_invalid_group_references(&self) -> bool {
        self.first_unresolved_reference().is_some()
    }

    /// Reject groups whose value depends on itself, directly (`(a\1)`) or
    /// through other groups (`(a\2)(b\1)`).
    fn check_reference_cycles(&self) -> Result<(), GenError> {
        let edges: BTreeMap<u32, Vec<u32>> = self
            .groups
            .iter()
            .map(|(&id, &node)| {
                let mut refs = Vec::new();
                self.ast.referenced_groups(node, &mut refs);
                (id, refs)
            })
            .collect();

        let mut marks = HashMap::new();
        for &id in edges.keys() {
            if let Some((from, to)) = find_cycle(id, &edges, &mut marks) {
                let group = self.groups[&from];
                let position = self.group_refs[&to]
                    .iter()
                    .find(|r| self.ast.contains(group, r.node))
                    .map_or(0, |r| r.position);
                return Err(GenError::syntax(ERR_INVALID_BACKREF, position));
            }
        }
        Ok(())
    }

    fn check_limits(&self, root: NodeId) -> Result<(), GenError> {
        let mut measure = Measure::new(&self.ast);
        for (_, node) in self.ast.iter() {
            if let Node::CaseInsensitive(child) = node {
                let bits = measure.max_case_bits(*child);
                if bits > MAX_CASE_BITS {
                    return Err(GenError::limit(
                        ERR_TOO_MANY_CASE_CHARS,
                        format!("{} > {}", bits, MAX_CASE_BITS),
                    ));
                }
            }
        }

        let len = measure.max_len(root);
        if len > self.options.max_length {
            return Err(GenError::limit(
                ERR_TOO_LONG_WORD,
                format!("{} > {}", len, self.options.max_length),
            ));
        }

        if let Some(limit) = self.options.max_combinations {
            let bound = measure.upper_bound(root);
            if bound > limit {
                return Err(GenError::limit(
                    ERR_TOO_MANY_COMBINATIONS,
                    format!("{} > {}", bound, limit),
                ));
            }
        }
        Ok(())
    }

    /// A case-insensitive section normally sizes its mask from the value
    /// its child holds when the mask starts. That breaks when the child
    /// reads a group which varies faster than the section: one to its
    /// right, or one sharing an enclosing repetition. Such sections get the
    /// static width of their child instead; the engine drops the masks the
    /// current value is too short for.
    fn fixed_case_widths(&self) -> Result<BTreeMap<NodeId, u32>, GenError> {
        let layout = self.ast.layout();
        let mut measure = Measure::new(&self.ast);
        let mut widths = BTreeMap::new();
        for (id, node) in self.ast.iter() {
            let Node::CaseInsensitive(child) = node else {
                continue;
            };
            if !layout.is_placed(id) {
                continue;
            }
            let (ahead, reads_stream) = self.reads_ahead(id, *child, &layout);
            let Some(reference) = ahead else {
                continue;
            };
            if reads_stream {
                let position = self
                    .group_refs
                    .values()
                    .flatten()
                    .find(|r| r.node == reference)
                    .map_or(0, |r| r.position);
                return Err(GenError::syntax(ERR_STREAM_IN_FORWARD_CASE_SECTION, position));
            }
            // bounded by check_limits
            widths.insert(id, measure.max_case_bits(*child) as u32);
        }
        Ok(widths)
    }

    /// Walk the value of `child` of section `section`, following references
    /// out of it. Returns the first reference whose target varies faster
    /// than the section, and whether the value can hold stream words.
    fn reads_ahead(
        &self,
        section: NodeId,
        child: NodeId,
        layout: &Layout,
    ) -> (Option<NodeId>, bool) {
        let mut ahead = None;
        let mut reads_stream = false;
        let mut seen = HashSet::new();
        let mut stack = vec![child];
        while let Some(n) = stack.pop() {
            match self.ast.get(n) {
                Node::StreamAnchor | Node::GroupRef { id: STREAM_GROUP_ID, .. } => {
                    reads_stream = true;
                }
                Node::GroupRef {
                    target: Some(target),
                    ..
                } => {
                    let target = *target;
                    if layout.encloses(child, target) {
                        continue;
                    }
                    if ahead.is_none() && !self.settled_before(section, target, layout) {
                        ahead = Some(n);
                    }
                    if seen.insert(target) {
                        stack.push(target);
                    }
                }
                _ => stack.extend(self.ast.children(n)),
            }
        }
        (ahead, reads_stream)
    }

    /// True if `target` keeps its value while `section` enumerates: it lies
    /// to the left and no repetition holds both.
    fn settled_before(&self, section: NodeId, target: NodeId, layout: &Layout) -> bool {
        if !layout.precedes(target, section) {
            return false;
        }
        let mut up = layout.parent(section);
        while let Some(n) = up {
            if matches!(self.ast.get(n), Node::Repeat { .. }) && layout.encloses(n, target) {
                return false;
            }
            up = layout.parent(n);
        }
        true
    }

    fn finish(self, case_widths: BTreeMap<NodeId, u32>) -> ParsedPattern {
        ParsedPattern {
            ast: self.ast,
            groups: self.groups,
            stream_anchor: self.stream_anchor,
            chars: self.chars,
            case_widths,
        }
    }

    // ========================================================================
    // Recursive descent
    // ========================================================================

    /// Parse the whole input and set the AST root.
    pub fn parse_regexp(&mut self) -> Result<NodeId, GenError> {
        let root = self.parse_alts(false)?;
        self.ast.set_root(root);
        Ok(root)
    }

    fn parse_alts(&mut self, in_group: bool) -> Result<NodeId, GenError> {
        self.depth += 1;
        if self.depth > parse_depth_limit() {
            return Err(self.err(ERR_PARSE_DEPTH_LIMIT_OVER));
        }

        let mut branches: NodeList = SmallVec::new();
        branches.push(self.parse_branch()?);
        while self.input.peek() == Some('|') {
            self.input.next_char();
            branches.push(self.parse_branch()?);
        }

        match self.input.peek() {
            None if in_group => return Err(self.err(ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS)),
            Some(')') if !in_group => return Err(self.err(ERR_UNMATCHED_CLOSE_PARENTHESIS)),
            _ => {}
        }

        self.depth -= 1;
        if branches.len() == 1 {
            Ok(branches[0])
        } else {
            Ok(self.ast.push(Node::Alt(branches)))
        }
    }

    /// A sequence of expressions. Runs of plain characters are merged into
    /// one literal.
    fn parse_branch(&mut self) -> Result<NodeId, GenError> {
        let mut items: NodeList = SmallVec::new();
        let mut pending: Vec<UChar> = Vec::new();

        while let Some(c) = self.input.peek() {
            if c == '|' || c == ')' {
                break;
            }
            match self.parse_exp(c)? {
                Piece::Char(ch) => pending.push(ch),
                Piece::Node(node) => {
                    if !pending.is_empty() {
                        let lit = Node::Literal(std::mem::take(&mut pending));
                        items.push(self.ast.push(lit));
                    }
                    items.push(node);
                }
            }
        }

        if !pending.is_empty() || items.is_empty() {
            items.push(self.ast.push(Node::Literal(pending)));
        }
        if items.len() == 1 {
            Ok(items[0])
        } else {
            Ok(self.ast.push(Node::Concat(items)))
        }
    }

    fn parse_exp(&mut self, c: char) -> Result<Piece, GenError> {
        let start = self.input.position();
        let piece = self.parse_atom(c)?;

        let Some((min, max)) = self.fetch_quantifier()? else {
            return Ok(piece);
        };
        if matches!(self.input.peek(), Some('*' | '+' | '?' | '{')) {
            return Err(self.err(ERR_NESTED_REPEAT_OPERATOR));
        }

        let child = match piece {
            Piece::Char(ch) => self.ast.push(Node::Literal(vec![ch])),
            Piece::Node(node) => node,
        };
        if let Some(anchor) = self.stream_anchor {
            if self.ast.contains(child, anchor) {
                return Err(GenError::syntax(ERR_STREAM_REPEATED, start));
            }
        }

        let max = match (max, self.options.repeat_limit) {
            (Some(max), _) => max,
            (None, Some(limit)) => limit.max(min),
            (None, None) => {
                return Err(GenError::limit(
                    ERR_UNBOUNDED_REPEAT,
                    format!("at position {}", start),
                ))
            }
        };
        Ok(Piece::Node(self.ast.push(Node::Repeat { child, min, max })))
    }

    fn parse_atom(&mut self, c: char) -> Result<Piece, GenError> {
        let pos = self.input.position();
        self.input.next_char();
        match c {
            '(' => self.parse_group(pos).map(Piece::Node),
            '[' => self.parse_cc(pos).map(Piece::Node),
            '.' => Ok(Piece::Node(self.range_class(PRINTABLE_RANGES))),
            '\\' => self.parse_escape(pos),
            '*' | '+' | '?' | '{' => Err(GenError::syntax(
                ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED,
                pos,
            )),
            _ => Ok(Piece::Char(self.chars.get_char(c))),
        }
    }

    fn parse_group(&mut self, open: usize) -> Result<NodeId, GenError> {
        let mut capture = true;
        let mut ignore_case = false;
        if self.input.peek() == Some('?') {
            self.input.next_char();
            capture = false;
            let pos = self.input.position();
            match (self.input.next_char(), self.input.peek()) {
                (Some(':'), _) => {}
                (Some('i'), Some(':')) => {
                    self.input.next_char();
                    ignore_case = true;
                }
                _ => return Err(GenError::syntax(ERR_UNDEFINED_GROUP_OPTION, pos)),
            }
        }

        let id = capture.then(|| {
            let id = self.group_id;
            self.group_id += 1;
            id
        });

        let child = self.parse_alts(true)?;
        // parse_alts(true) only returns at ')'
        if self.input.next_char() != Some(')') {
            return Err(GenError::syntax(
                ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS,
                open,
            ));
        }

        if let Some(id) = id {
            let node = self.ast.push(Node::Group { id, child });
            self.register_group(id, node);
            Ok(node)
        } else if ignore_case {
            Ok(self.ast.push(Node::CaseInsensitive(child)))
        } else {
            Ok(child)
        }
    }

    fn parse_escape(&mut self, pos: usize) -> Result<Piece, GenError> {
        let Some(c) = self.input.next_char() else {
            return Err(GenError::syntax(ERR_END_PATTERN_AT_ESCAPE, pos));
        };
        match c {
            '0' => {
                if !self.options.stream {
                    return Err(GenError::syntax(ERR_STREAM_NOT_CONFIGURED, pos));
                }
                Ok(Piece::Node(self.stream_node()))
            }
            '1'..='9' => {
                let id = self.scan_group_number(c, pos)?;
                let node = self.ast.push(Node::GroupRef { id, target: None });
                self.register_group_reference(id, node, pos);
                Ok(Piece::Node(node))
            }
            'd' => Ok(Piece::Node(self.range_class(DIGIT_RANGES))),
            'w' => Ok(Piece::Node(self.range_class(WORD_RANGES))),
            's' => Ok(Piece::Node(self.range_class(SPACE_RANGES))),
            _ => {
                let v = self.fetch_escaped_value(c, pos)?;
                Ok(Piece::Char(self.value_char(v)))
            }
        }
    }

    fn value_char(&mut self, v: EscValue) -> UChar {
        let mut ch = self.chars.get(v.code);
        if v.preserve {
            ch.set_preserve_case();
        }
        ch
    }

    fn range_class(&mut self, ranges: &[(u32, u32)]) -> NodeId {
        let members = ranges
            .iter()
            .flat_map(|&(lo, hi)| lo..=hi)
            .map(|code| self.chars.get(code))
            .collect();
        self.ast.push(Node::Class {
            members,
            negated: false,
        })
    }

    // === Character classes ===

    fn parse_cc(&mut self, open: usize) -> Result<NodeId, GenError> {
        let negated = self.input.peek() == Some('^');
        if negated {
            self.input.next_char();
        }
        if self.input.is_end() {
            return Err(GenError::syntax(ERR_END_PATTERN_AT_LEFT_BRACKET, open));
        }

        let mut set = ClassSet::default();
        let mut empty = true;
        loop {
            let pos = self.input.position();
            let Some(c) = self.input.next_char() else {
                return Err(GenError::syntax(ERR_PREMATURE_END_OF_CHAR_CLASS, open));
            };
            if c == ']' {
                if empty {
                    return Err(GenError::syntax(ERR_EMPTY_CHAR_CLASS, open));
                }
                break;
            }
            empty = false;

            let lo = match self.fetch_cc_item(c, pos)? {
                CcItem::Set(ranges) => {
                    ranges
                        .iter()
                        .for_each(|&(lo, hi)| set.add_range(lo, hi, false));
                    continue;
                }
                CcItem::Value(v) => v,
            };

            let is_range = self.input.peek() == Some('-')
                && !matches!(self.input.peek_nth(1), Some(']') | None);
            if !is_range {
                set.add(lo.code, lo.preserve);
                continue;
            }

            self.input.next_char();
            let hpos = self.input.position();
            let Some(hc) = self.input.next_char() else {
                return Err(GenError::syntax(ERR_PREMATURE_END_OF_CHAR_CLASS, open));
            };
            let hi = match self.fetch_cc_item(hc, hpos)? {
                CcItem::Value(v) => v,
                CcItem::Set(_) => {
                    return Err(GenError::syntax(ERR_CHAR_CLASS_VALUE_AT_END_OF_RANGE, hpos))
                }
            };
            if hi.code < lo.code {
                return Err(GenError::syntax(ERR_EMPTY_RANGE_IN_CHAR_CLASS, pos));
            }
            set.add_range(lo.code, hi.code, lo.preserve && hi.preserve);
        }

        let members = if negated {
            (PRINTABLE_FIRST..=PRINTABLE_LAST)
                .filter(|code| !set.seen.contains(code))
                .map(|code| self.chars.get(code))
                .collect()
        } else {
            set.codes
                .iter()
                .map(|&(code, preserve)| self.value_char(EscValue { code, preserve }))
                .collect()
        };
        Ok(self.ast.push(Node::Class { members, negated }))
    }

    fn fetch_cc_item(&mut self, c: char, pos: usize) -> Result<CcItem, GenError> {
        if c != '\\' {
            return Ok(CcItem::Value(EscValue {
                code: c as u32,
                preserve: false,
            }));
        }
        let Some(e) = self.input.next_char() else {
            return Err(GenError::syntax(ERR_END_PATTERN_AT_ESCAPE, pos));
        };
        match e {
            'd' => Ok(CcItem::Set(DIGIT_RANGES)),
            'w' => Ok(CcItem::Set(WORD_RANGES)),
            's' => Ok(CcItem::Set(SPACE_RANGES)),
            _ => self.fetch_escaped_value(e, pos).map(CcItem::Value),
        }
    }

    // === Escapes and numbers ===

    fn fetch_escaped_value(&mut self, c: char, pos: usize) -> Result<EscValue, GenError> {
        let code = match c {
            'n' => 0x0a,
            'r' => 0x0d,
            't' => 0x09,
            'f' => 0x0c,
            'v' => 0x0b,
            'a' => 0x07,
            'e' => 0x1b,
            'x' if self.input.peek() == Some('{') => {
                self.input.next_char();
                let code = self.scan_hex(1, 6, pos)?;
                if self.input.next_char() != Some('}') {
                    return Err(GenError::syntax(ERR_INVALID_CODE_POINT_VALUE, pos));
                }
                return self.numeric_value(code, pos);
            }
            'x' => {
                let code = self.scan_hex(2, 2, pos)?;
                return self.numeric_value(code, pos);
            }
            'u' => {
                let code = self.scan_hex(4, 4, pos)?;
                return self.numeric_value(code, pos);
            }
            _ => c as u32,
        };
        Ok(EscValue {
            code,
            preserve: false,
        })
    }

    fn numeric_value(&self, code: u32, pos: usize) -> Result<EscValue, GenError> {
        if char::from_u32(code).is_none() {
            return Err(GenError::syntax(ERR_INVALID_CODE_POINT_VALUE, pos));
        }
        Ok(EscValue {
            code,
            preserve: true,
        })
    }

    fn scan_hex(&mut self, min: usize, max: usize, pos: usize) -> Result<u32, GenError> {
        let mut code = 0u32;
        let mut n = 0;
        while n < max {
            let Some(d) = self.input.peek().and_then(|c| c.to_digit(16)) else {
                break;
            };
            self.input.next_char();
            code = (code << 4) | d;
            n += 1;
        }
        if n < min {
            return Err(GenError::syntax(ERR_INVALID_CODE_POINT_VALUE, pos));
        }
        Ok(code)
    }

    fn scan_group_number(&mut self, first: char, pos: usize) -> Result<u32, GenError> {
        let mut id = first.to_digit(10).unwrap_or(0);
        while let Some(d) = self.input.peek().and_then(|c| c.to_digit(10)) {
            self.input.next_char();
            id = id
                .checked_mul(10)
                .and_then(|v| v.checked_add(d))
                .ok_or_else(|| GenError::syntax(ERR_TOO_BIG_NUMBER, pos))?;
        }
        Ok(id)
    }

    fn scan_number(&mut self) -> Result<Option<u32>, GenError> {
        let start = self.input.position();
        let mut n: Option<u32> = None;
        while let Some(d) = self.input.peek().and_then(|c| c.to_digit(10)) {
            self.input.next_char();
            let v = n
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(d))
                .filter(|&v| v <= MAX_REPEAT_NUM)
                .ok_or_else(|| GenError::syntax(ERR_TOO_BIG_NUMBER, start))?;
            n = Some(v);
        }
        Ok(n)
    }

    fn fetch_quantifier(&mut self) -> Result<Option<(u32, Option<u32>)>, GenError> {
        let q = match self.input.peek() {
            Some('*') => (0, None),
            Some('+') => (1, None),
            Some('?') => (0, Some(1)),
            Some('{') => {
                self.input.next_char();
                return self.fetch_interval().map(Some);
            }
            _ => return Ok(None),
        };
        self.input.next_char();
        Ok(Some(q))
    }

    /// `{n}`, `{n,m}`, `{n,}` or `{,m}`; the `{` is already consumed.
    fn fetch_interval(&mut self) -> Result<(u32, Option<u32>), GenError> {
        let open = self.input.position() - 1;
        let low = self.scan_number()?;
        let (min, max) = if self.input.peek() == Some(',') {
            self.input.next_char();
            let up = self.scan_number()?;
            if low.is_none() && up.is_none() {
                return Err(GenError::syntax(ERR_INVALID_REPEAT_RANGE_PATTERN, open));
            }
            (low.unwrap_or(0), up)
        } else {
            match low {
                Some(n) => (n, Some(n)),
                None => return Err(GenError::syntax(ERR_INVALID_REPEAT_RANGE_PATTERN, open)),
            }
        };
        if self.input.next_char() != Some('}') {
            return Err(GenError::syntax(ERR_INVALID_REPEAT_RANGE_PATTERN, open));
        }
        if let Some(max) = max {
            if max < min {
                return Err(GenError::syntax(
                    ERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE,
                    open,
                ));
            }
        }
        Ok((min, max))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// Depth-first search for a back edge. Returns `(group, referenced group)`.
fn find_cycle(
    id: u32,
    edges: &BTreeMap<u32, Vec<u32>>,
    marks: &mut HashMap<u32, Mark>,
) -> Option<(u32, u32)> {
    if marks.contains_key(&id) {
        return None;
    }
    marks.insert(id, Mark::Active);
    for &next in edges.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
        match marks.get(&next) {
            Some(Mark::Active) => return Some((id, next)),
            Some(Mark::Done) => continue,
            None => {
                if let Some(cycle) = find_cycle(next, edges, marks) {
                    return Some(cycle);
                }
            }
        }
    }
    marks.insert(id, Mark::Done);
    None
}

// ============================================================================
// Tests
// ============================================================================

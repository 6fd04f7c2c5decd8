// ast.rs - Pattern AST.
// Node taxonomy, the arena that owns every node, and static analyses over
// it (length, case bits, combination bounds).

use smallvec::SmallVec;

use crate::uchar::UChar;

/// Group id used by stream-anchor references.
pub const STREAM_GROUP_ID: u32 = 0;

/// Alphabet of negated classes and `.`: printable ASCII.
pub const PRINTABLE_FIRST: u32 = 0x20;
pub const PRINTABLE_LAST: u32 = 0x7e;

/// Handle of a node inside an [`Ast`]. Handles never own their node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub type NodeList = SmallVec<[NodeId; 4]>;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Exactly one sequence: the characters themselves.
    Literal(Vec<UChar>),
    /// One single-character sequence per member. Negated classes keep the
    /// complement within the printable alphabet in `members`.
    Class { members: Vec<UChar>, negated: bool },
    /// Cross product of the children, rightmost varying fastest.
    Concat(NodeList),
    /// Union of the children, in declaration order.
    Alt(NodeList),
    /// Union over `k` in `min..=max` of the `k`-fold concatenation.
    Repeat { child: NodeId, min: u32, max: u32 },
    /// Capturing group, numbered by opening order from 1.
    Group { id: u32, child: NodeId },
    /// Replays the current value of group `id`. `target` is bound by the
    /// resolution pass.
    GroupRef { id: u32, target: Option<NodeId> },
    /// Every upper/lower combination of the child's case-mutable characters.
    CaseInsensitive(NodeId),
    /// Words delivered by the configured word source.
    StreamAnchor,
}

impl Node {
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::Class { .. } => "class",
            Node::Concat(_) => "concat",
            Node::Alt(_) => "alt",
            Node::Repeat { .. } => "repeat",
            Node::Group { .. } => "group",
            Node::GroupRef { .. } => "group-ref",
            Node::CaseInsensitive(_) => "case-insensitive",
            Node::StreamAnchor => "stream",
        }
    }
}

/// Arena owning every node of one parsed pattern.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// The root node. An AST that was never given a root denotes the empty
    /// pattern.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Direct children of `id`, in document order.
    pub fn children(&self, id: NodeId) -> NodeList {
        match self.get(id) {
            Node::Concat(list) | Node::Alt(list) => list.clone(),
            Node::Repeat { child, .. }
            | Node::Group { child, .. }
            | Node::CaseInsensitive(child) => SmallVec::from_slice(&[*child]),
            _ => SmallVec::new(),
        }
    }

    /// True if `needle` is `id` or one of its descendants. References are
    /// not followed.
    pub fn contains(&self, id: NodeId, needle: NodeId) -> bool {
        id == needle || self.children(id).iter().any(|&c| self.contains(c, needle))
    }

    /// Ids of every group reference below `id`, excluding stream references.
    pub fn referenced_groups(&self, id: NodeId, out: &mut Vec<u32>) {
        if let Node::GroupRef { id: gid, .. } = self.get(id) {
            if *gid != STREAM_GROUP_ID {
                out.push(*gid);
            }
        }
        for c in self.children(id) {
            self.referenced_groups(c, out);
        }
    }

    // === Static analyses ===
    // Callers guarantee references are resolved and acyclic. Each call
    // builds a fresh [`Measure`]; use one directly to share the memo across
    // several queries.

    /// Longest sequence `id` can produce, in characters. Stream words are
    /// not included.
    pub fn max_len(&self, id: NodeId) -> usize {
        Measure::new(self).max_len(id)
    }

    /// Largest number of case-mutable characters one sequence of `id` can
    /// hold.
    pub fn max_case_bits(&self, id: NodeId) -> u64 {
        Measure::new(self).max_case_bits(id)
    }

    /// Upper bound of the number of sequences `id` denotes, saturating at
    /// `u128::MAX`. Each stream word counts once.
    pub fn upper_bound(&self, id: NodeId) -> u128 {
        Measure::new(self).upper_bound(id)
    }

    /// Pre-order positions and parents of every node below the root.
    pub fn layout(&self) -> Layout {
        let mut layout = Layout {
            span: vec![None; self.nodes.len()],
            parent: vec![None; self.nodes.len()],
        };
        if let Some(root) = self.root {
            let mut next = 0;
            self.lay_out(root, None, &mut next, &mut layout);
        }
        layout
    }

    fn lay_out(&self, id: NodeId, parent: Option<NodeId>, next: &mut usize, layout: &mut Layout) {
        let start = *next;
        *next += 1;
        layout.parent[id.index()] = parent;
        for c in self.children(id) {
            self.lay_out(c, Some(id), next, layout);
        }
        layout.span[id.index()] = Some((start, *next));
    }
}

/// Document order of an [`Ast`]: `span[n]` is the half-open pre-order range
/// covered by node `n` and its descendants.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    span: Vec<Option<(usize, usize)>>,
    parent: Vec<Option<NodeId>>,
}

impl Layout {
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent[id.index()]
    }

    /// True if `id` is reachable from the root.
    pub fn is_placed(&self, id: NodeId) -> bool {
        self.span[id.index()].is_some()
    }

    /// True if all of `a` comes before all of `b`.
    pub fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        match (self.span[a.index()], self.span[b.index()]) {
            (Some((_, a_end)), Some((b_start, _))) => a_end <= b_start,
            _ => false,
        }
    }

    /// True if `inner` is `outer` or lies below it.
    pub fn encloses(&self, outer: NodeId, inner: NodeId) -> bool {
        match (self.span[outer.index()], self.span[inner.index()]) {
            (Some((o_start, o_end)), Some((i_start, i_end))) => {
                o_start <= i_start && i_end <= o_end
            }
            _ => false,
        }
    }
}

/// Memoised static analyses. References are followed into their targets,
/// so each target is measured once however many references reach it.
#[derive(Debug)]
pub struct Measure<'a> {
    ast: &'a Ast,
    len: Vec<Option<usize>>,
    case_bits: Vec<Option<u64>>,
    bound: Vec<Option<u128>>,
}

impl<'a> Measure<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let n = ast.len();
        Measure {
            ast,
            len: vec![None; n],
            case_bits: vec![None; n],
            bound: vec![None; n],
        }
    }

    pub fn max_len(&mut self, id: NodeId) -> usize {
        if let Some(v) = self.len[id.index()] {
            return v;
        }
        let ast = self.ast;
        let v = match ast.get(id) {
            Node::Literal(chars) => chars.len(),
            Node::Class { .. } => 1,
            Node::Concat(list) => {
                let mut acc = 0usize;
                for &c in list {
                    acc = acc.saturating_add(self.max_len(c));
                }
                acc
            }
            Node::Alt(list) => {
                let mut best = 0;
                for &c in list {
                    best = best.max(self.max_len(c));
                }
                best
            }
            Node::Repeat { child, max, .. } => self.max_len(*child).saturating_mul(*max as usize),
            Node::Group { child, .. } | Node::CaseInsensitive(child) => self.max_len(*child),
            Node::GroupRef { target, .. } => target.map_or(0, |t| self.max_len(t)),
            Node::StreamAnchor => 0,
        };
        self.len[id.index()] = Some(v);
        v
    }

    pub fn max_case_bits(&mut self, id: NodeId) -> u64 {
        if let Some(v) = self.case_bits[id.index()] {
            return v;
        }
        let ast = self.ast;
        let v = match ast.get(id) {
            Node::Literal(chars) => chars.iter().filter(|c| c.is_case_mutable()).count() as u64,
            Node::Class { members, .. } => members.iter().any(|c| c.is_case_mutable()) as u64,
            Node::Concat(list) => {
                let mut acc = 0u64;
                for &c in list {
                    acc = acc.saturating_add(self.max_case_bits(c));
                }
                acc
            }
            Node::Alt(list) => {
                let mut best = 0;
                for &c in list {
                    best = best.max(self.max_case_bits(c));
                }
                best
            }
            Node::Repeat { child, max, .. } => {
                self.max_case_bits(*child).saturating_mul(*max as u64)
            }
            Node::Group { child, .. } | Node::CaseInsensitive(child) => self.max_case_bits(*child),
            Node::GroupRef { target, .. } => target.map_or(0, |t| self.max_case_bits(t)),
            Node::StreamAnchor => 0,
        };
        self.case_bits[id.index()] = Some(v);
        v
    }

    pub fn upper_bound(&mut self, id: NodeId) -> u128 {
        if let Some(v) = self.bound[id.index()] {
            return v;
        }
        let ast = self.ast;
        let v = match ast.get(id) {
            Node::Literal(_) | Node::GroupRef { .. } | Node::StreamAnchor => 1,
            Node::Class { members, .. } => members.len() as u128,
            Node::Concat(list) => {
                let mut acc = 1u128;
                for &c in list {
                    acc = acc.saturating_mul(self.upper_bound(c));
                }
                acc
            }
            Node::Alt(list) => {
                let mut acc = 0u128;
                for &c in list {
                    acc = acc.saturating_add(self.upper_bound(c));
                }
                acc
            }
            Node::Repeat { child, min, max } => {
                let c = self.upper_bound(*child);
                let mut term = c.saturating_pow(*min);
                let mut total = 0u128;
                for _ in *min..=*max {
                    total = total.saturating_add(term);
                    if total == u128::MAX {
                        break;
                    }
                    term = term.saturating_mul(c);
                }
                total
            }
            Node::Group { child, .. } => self.upper_bound(*child),
            Node::CaseInsensitive(child) => {
                let bits = self.max_case_bits(*child);
                let factor = if bits >= 128 { u128::MAX } else { 1u128 << bits };
                self.upper_bound(*child).saturating_mul(factor)
            }
        };
        self.bound[id.index()] = Some(v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;

    fn lit(ast: &mut Ast, s: &str) -> NodeId {
        let chars = s.chars().map(|c| UChar::from_char(c, Charset::Utf8)).collect();
        ast.push(Node::Literal(chars))
    }

    fn class(ast: &mut Ast, s: &str) -> NodeId {
        let members = s.chars().map(|c| UChar::from_char(c, Charset::Utf8)).collect();
        ast.push(Node::Class {
            members,
            negated: false,
        })
    }

    #[test]
    fn arena_handles() {
        let mut ast = Ast::new();
        assert!(ast.is_empty());
        let a = lit(&mut ast, "ab");
        let b = class(&mut ast, "xyz");
        let cat = ast.push(Node::Concat(SmallVec::from_slice(&[a, b])));
        ast.set_root(cat);
        assert_eq!(ast.root(), Some(cat));
        assert_eq!(ast.len(), 3);
        assert_eq!(ast.children(cat).as_slice(), &[a, b]);
        assert!(ast.contains(cat, b));
        assert!(!ast.contains(a, b));
        assert_eq!(ast.get(cat).type_name(), "concat");
    }

    #[test]
    fn lengths_and_bounds() {
        let mut ast = Ast::new();
        let a = lit(&mut ast, "a1");
        let b = class(&mut ast, "xyz");
        let alt = ast.push(Node::Alt(SmallVec::from_slice(&[a, b])));
        let rep = ast.push(Node::Repeat {
            child: alt,
            min: 1,
            max: 2,
        });
        assert_eq!(ast.max_len(alt), 2);
        assert_eq!(ast.max_len(rep), 4);
        assert_eq!(ast.upper_bound(alt), 4);
        // 4 + 4*4
        assert_eq!(ast.upper_bound(rep), 20);
        assert_eq!(ast.max_case_bits(rep), 2);
    }

    #[test]
    fn case_insensitive_bound() {
        let mut ast = Ast::new();
        let a = lit(&mut ast, "abc");
        let ci = ast.push(Node::CaseInsensitive(a));
        assert_eq!(ast.upper_bound(ci), 8);
    }

    #[test]
    fn upper_bound_saturates() {
        let mut ast = Ast::new();
        let b = class(&mut ast, "0123456789");
        let rep = ast.push(Node::Repeat {
            child: b,
            min: 0,
            max: 200,
        });
        assert_eq!(ast.upper_bound(rep), u128::MAX);
    }

    #[test]
    fn measure_follows_references_once() {
        // (a)(\1\1)(\2\2): each reference is measured through its target
        let mut ast = Ast::new();
        let a = lit(&mut ast, "a");
        let g1 = ast.push(Node::Group { id: 1, child: a });
        let r1 = ast.push(Node::GroupRef { id: 1, target: Some(g1) });
        let r1b = ast.push(Node::GroupRef { id: 1, target: Some(g1) });
        let c2 = ast.push(Node::Concat(SmallVec::from_slice(&[r1, r1b])));
        let g2 = ast.push(Node::Group { id: 2, child: c2 });
        let r2 = ast.push(Node::GroupRef { id: 2, target: Some(g2) });
        let r2b = ast.push(Node::GroupRef { id: 2, target: Some(g2) });
        let c3 = ast.push(Node::Concat(SmallVec::from_slice(&[r2, r2b])));
        let g3 = ast.push(Node::Group { id: 3, child: c3 });
        let root = ast.push(Node::Concat(SmallVec::from_slice(&[g1, g2, g3])));
        ast.set_root(root);

        let mut measure = Measure::new(&ast);
        assert_eq!(measure.max_len(g3), 4);
        assert_eq!(measure.max_len(root), 7);
        assert_eq!(measure.max_case_bits(root), 7);
        assert_eq!(ast.max_len(root), 7);
    }

    #[test]
    fn layout_is_document_order() {
        let mut ast = Ast::new();
        let a = lit(&mut ast, "a");
        let b = class(&mut ast, "bc");
        let rep = ast.push(Node::Repeat {
            child: b,
            min: 1,
            max: 2,
        });
        let orphan = lit(&mut ast, "z");
        let root = ast.push(Node::Concat(SmallVec::from_slice(&[a, rep])));
        ast.set_root(root);

        let layout = ast.layout();
        assert!(layout.precedes(a, rep));
        assert!(layout.precedes(a, b));
        assert!(!layout.precedes(rep, a));
        assert!(layout.encloses(rep, b));
        assert!(layout.encloses(root, a));
        assert!(!layout.encloses(a, b));
        assert_eq!(layout.parent(b), Some(rep));
        assert_eq!(layout.parent(root), None);
        assert!(!layout.is_placed(orphan));
        assert!(!layout.precedes(orphan, a));
    }

    #[test]
    fn referenced_groups_skip_stream() {
        let mut ast = Ast::new();
        let r1 = ast.push(Node::GroupRef { id: 1, target: None });
        let r0 = ast.push(Node::GroupRef {
            id: STREAM_GROUP_ID,
            target: None,
        });
        let cat = ast.push(Node::Concat(SmallVec::from_slice(&[r1, r0])));
        let mut out = Vec::new();
        ast.referenced_groups(cat, &mut out);
        assert_eq!(out, vec![1]);
    }
}

// iter.rs - Iterator engine.
// Walks a parsed pattern with a parallel arena of cursor states. Every state
// sits on one value of its node: `reset` moves it to the first value,
// `advance` to the next one (odometer order, rightmost child fastest) and
// `render` appends the current value. States are built per enumeration, so
// a fresh engine always replays the same sequence.

use smallvec::SmallVec;

use crate::ast::{Node, NodeId};
use crate::decoder;
use crate::error::*;
use crate::parser::{ParsedPattern, MAX_CASE_BITS};
use crate::source::WordSource;
use crate::uchar::{CharTable, UChar};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StateId(u32);

impl StateId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

type StateList = SmallVec<[StateId; 4]>;

#[derive(Debug)]
enum Cursor {
    Literal,
    Class {
        index: usize,
    },
    Concat(StateList),
    Alt {
        children: StateList,
        current: usize,
    },
    /// `copies[..k]` are live; more copies are built on demand.
    Repeat {
        copies: Vec<StateId>,
        k: u32,
    },
    Group(StateId),
    GroupRef,
    /// Bit `i` of `mask` flips the `i`-th case-mutable character counted
    /// from the right. `bits` is the width for the child's current value,
    /// computed on first advance, unless the section has a `fixed` width.
    CaseInsensitive {
        child: StateId,
        mask: u64,
        bits: Option<u32>,
        fixed: Option<u32>,
    },
    Stream(Vec<UChar>),
}

#[derive(Debug)]
struct State {
    node: NodeId,
    parent: Option<StateId>,
    cursor: Cursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Fresh,
    Running,
    Done,
}

/// One enumeration over a [`ParsedPattern`].
pub struct Engine<'a> {
    pattern: &'a ParsedPattern,
    source: Option<&'a mut dyn WordSource>,
    chars: CharTable,
    states: Vec<State>,
    root: Option<StateId>,
    max_length: usize,
    phase: Phase,
    scratch: Vec<UChar>,
}

impl<'a> Engine<'a> {
    pub fn new(
        pattern: &'a ParsedPattern,
        source: Option<&'a mut dyn WordSource>,
        max_length: usize,
    ) -> Self {
        let mut engine = Engine {
            pattern,
            source,
            chars: pattern.chars.clone(),
            states: Vec::new(),
            root: None,
            max_length,
            phase: Phase::Fresh,
            scratch: Vec::new(),
        };
        let root = pattern.ast.root().map(|r| engine.build(r, None));
        engine.root = root;
        engine
    }

    /// Start over from the first word.
    pub fn restart(&mut self) {
        self.phase = Phase::Fresh;
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Number of cursor states allocated so far.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Step to the next word and return its characters. Errors end the
    /// enumeration.
    pub fn next_chars(&mut self) -> Result<Option<&[UChar]>, GenError> {
        match self.advance_word() {
            Ok(true) => Ok(Some(self.scratch.as_slice())),
            Ok(false) => Ok(None),
            Err(e) => {
                self.phase = Phase::Done;
                Err(e)
            }
        }
    }

    /// Step to the next word and write its encoded bytes to `out`, which is
    /// cleared first. Returns `Ok(false)` once the enumeration is over.
    pub fn next_into(&mut self, out: &mut Vec<u8>) -> Result<bool, GenError> {
        out.clear();
        let result = self.advance_word().and_then(|more| {
            if more {
                out.reserve(self.scratch.len() * self.chars.charset().min_enc_len());
                for ch in &self.scratch {
                    ch.write_to(out)?;
                }
            }
            Ok(more)
        });
        if result.is_err() {
            self.phase = Phase::Done;
        }
        result
    }

    fn advance_word(&mut self) -> Result<bool, GenError> {
        loop {
            let more = match (self.phase, self.root) {
                (Phase::Done, _) => false,
                (Phase::Fresh, None) => true,
                (Phase::Running, None) => false,
                (Phase::Fresh, Some(root)) => self.reset(root)?,
                (Phase::Running, Some(root)) => self.advance(root)?,
            };
            self.phase = if more { Phase::Running } else { Phase::Done };
            if !more {
                return Ok(false);
            }

            let mut buf = std::mem::take(&mut self.scratch);
            buf.clear();
            let fits = match self.root {
                Some(root) => self.render(root, &mut buf),
                None => true,
            };
            self.scratch = buf;
            // a fixed-width case mask wider than the value it landed on
            if !fits {
                continue;
            }
            if self.scratch.len() > self.max_length {
                return Err(GenError::limit(
                    ERR_TOO_LONG_WORD,
                    format!("{} > {}", self.scratch.len(), self.max_length),
                ));
            }
            return Ok(true);
        }
    }

    // ========================================================================
    // State arena
    // ========================================================================

    fn build(&mut self, node: NodeId, parent: Option<StateId>) -> StateId {
        let pattern = self.pattern;
        let id = StateId(self.states.len() as u32);
        self.states.push(State {
            node,
            parent,
            cursor: Cursor::Literal,
        });

        let cursor = match pattern.ast.get(node) {
            Node::Literal(_) => Cursor::Literal,
            Node::Class { .. } => Cursor::Class { index: 0 },
            Node::Concat(list) => {
                Cursor::Concat(list.iter().map(|&c| self.build(c, Some(id))).collect())
            }
            Node::Alt(list) => Cursor::Alt {
                children: list.iter().map(|&c| self.build(c, Some(id))).collect(),
                current: 0,
            },
            Node::Repeat { .. } => Cursor::Repeat {
                copies: Vec::new(),
                k: 0,
            },
            Node::Group { child, .. } => Cursor::Group(self.build(*child, Some(id))),
            Node::GroupRef { .. } => Cursor::GroupRef,
            Node::CaseInsensitive(child) => Cursor::CaseInsensitive {
                child: self.build(*child, Some(id)),
                mask: 0,
                bits: None,
                fixed: pattern.fixed_case_width(node),
            },
            Node::StreamAnchor => Cursor::Stream(Vec::new()),
        };
        self.states[id.index()].cursor = cursor;
        id
    }

    /// Make sure repeat state `s` owns at least `k` child copies.
    fn ensure_copies(&mut self, s: StateId, k: usize) {
        let pattern = self.pattern;
        let Node::Repeat { child, .. } = pattern.ast.get(self.states[s.index()].node) else {
            return;
        };
        loop {
            let len = match &self.states[s.index()].cursor {
                Cursor::Repeat { copies, .. } => copies.len(),
                _ => return,
            };
            if len >= k {
                return;
            }
            let copy = self.build(*child, Some(s));
            if let Cursor::Repeat { copies, .. } = &mut self.states[s.index()].cursor {
                copies.push(copy);
            }
        }
    }

    // ========================================================================
    // Reset / advance
    // ========================================================================

    /// Move `s` to its first value. `Ok(false)` if the node denotes no
    /// sequence at all.
    fn reset(&mut self, s: StateId) -> Result<bool, GenError> {
        let pattern = self.pattern;
        let node = pattern.ast.get(self.states[s.index()].node);
        match &mut self.states[s.index()].cursor {
            Cursor::Literal | Cursor::GroupRef => Ok(true),
            Cursor::Class { index } => {
                *index = 0;
                Ok(matches!(node, Node::Class { members, .. } if !members.is_empty()))
            }
            Cursor::Concat(children) => {
                let children = children.clone();
                self.reset_all(&children)
            }
            Cursor::Alt { children, .. } => {
                let children = children.clone();
                self.select_branch(s, &children, 0)
            }
            Cursor::Repeat { .. } => {
                let min = match node {
                    Node::Repeat { min, .. } => *min,
                    _ => 0,
                };
                self.start_repeat(s, min)
            }
            Cursor::Group(child) => {
                let child = *child;
                self.reset(child)
            }
            Cursor::CaseInsensitive {
                child,
                mask,
                bits,
                fixed,
            } => {
                *mask = 0;
                *bits = *fixed;
                let child = *child;
                self.reset(child)
            }
            Cursor::Stream(_) => {
                if let Some(src) = self.source.as_deref_mut() {
                    src.rewind();
                }
                self.pull_word(s)
            }
        }
    }

    /// Move `s` to its next value. `Ok(false)` when exhausted; the state
    /// must be reset before it is rendered again.
    fn advance(&mut self, s: StateId) -> Result<bool, GenError> {
        let pattern = self.pattern;
        let node = pattern.ast.get(self.states[s.index()].node);
        match &mut self.states[s.index()].cursor {
            Cursor::Literal | Cursor::GroupRef => Ok(false),
            Cursor::Class { index } => {
                let len = match node {
                    Node::Class { members, .. } => members.len(),
                    _ => 0,
                };
                // an exhausted class keeps rendering its last member
                if *index + 1 < len {
                    *index += 1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Cursor::Concat(children) => {
                let children = children.clone();
                self.advance_odometer(&children)
            }
            Cursor::Alt { children, current } => {
                let children = children.clone();
                let current = *current;
                if self.advance(children[current])? {
                    return Ok(true);
                }
                self.select_branch(s, &children, current + 1)
            }
            Cursor::Repeat { copies, k } => {
                let k = *k;
                let active: StateList = copies[..k as usize].iter().copied().collect();
                if self.advance_odometer(&active)? {
                    return Ok(true);
                }
                let max = match node {
                    Node::Repeat { max, .. } => *max,
                    _ => 0,
                };
                if k >= max {
                    return Ok(false);
                }
                self.start_repeat(s, k + 1)
            }
            Cursor::Group(child) => {
                let child = *child;
                self.advance(child)
            }
            Cursor::CaseInsensitive { child, .. } => {
                let child = *child;
                self.advance_case(s, child)
            }
            Cursor::Stream(_) => self.pull_word(s),
        }
    }

    fn reset_all(&mut self, list: &[StateId]) -> Result<bool, GenError> {
        for &c in list {
            if !self.reset(c)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn advance_odometer(&mut self, list: &[StateId]) -> Result<bool, GenError> {
        for i in (0..list.len()).rev() {
            if self.advance(list[i])? {
                return self.reset_all(&list[i + 1..]);
            }
        }
        Ok(false)
    }

    /// Select the first branch at or after `from` that has a value.
    fn select_branch(
        &mut self,
        s: StateId,
        children: &[StateId],
        from: usize,
    ) -> Result<bool, GenError> {
        for (i, &c) in children.iter().enumerate().skip(from) {
            if self.reset(c)? {
                if let Cursor::Alt { current, .. } = &mut self.states[s.index()].cursor {
                    *current = i;
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn start_repeat(&mut self, s: StateId, k: u32) -> Result<bool, GenError> {
        self.ensure_copies(s, k as usize);
        let active: StateList = match &mut self.states[s.index()].cursor {
            Cursor::Repeat { copies, k: live } => {
                *live = k;
                copies[..k as usize].iter().copied().collect()
            }
            _ => return Ok(false),
        };
        self.reset_all(&active)
    }

    fn advance_case(&mut self, s: StateId, child: StateId) -> Result<bool, GenError> {
        let (mask, bits, fixed) = match self.states[s.index()].cursor {
            Cursor::CaseInsensitive {
                mask, bits, fixed, ..
            } => (mask, bits, fixed),
            _ => return Ok(false),
        };
        let bits = match bits {
            Some(bits) => bits,
            None => self.case_positions(child)?,
        };
        let last = if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };

        let (next_mask, next_bits, more) = if mask < last {
            (mask + 1, Some(bits), true)
        } else if self.advance(child)? {
            (0, fixed, true)
        } else {
            (mask, Some(bits), false)
        };
        if let Cursor::CaseInsensitive { mask, bits, .. } = &mut self.states[s.index()].cursor {
            *mask = next_mask;
            *bits = next_bits;
        }
        Ok(more)
    }

    /// Case-mutable characters in the current value of `child`.
    fn case_positions(&self, child: StateId) -> Result<u32, GenError> {
        let mut value = Vec::new();
        self.render(child, &mut value);
        let n = value.iter().filter(|c| c.is_case_mutable()).count() as u64;
        if n > MAX_CASE_BITS {
            return Err(GenError::limit(
                ERR_TOO_MANY_CASE_CHARS,
                format!("{} > {}", n, MAX_CASE_BITS),
            ));
        }
        Ok(n as u32)
    }

    /// Load the next source word into stream state `s`.
    fn pull_word(&mut self, s: StateId) -> Result<bool, GenError> {
        let Some(src) = self.source.as_deref_mut() else {
            return Ok(false);
        };
        let Some(bytes) = src.next_word() else {
            return Ok(false);
        };
        let word: Vec<UChar> = decoder::decode(&bytes)
            .into_iter()
            .map(|c| self.chars.get_char(c))
            .collect();
        if let Cursor::Stream(current) = &mut self.states[s.index()].cursor {
            *current = word;
        }
        Ok(true)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Append the current value of `s` to `out`. Returns `false` if a
    /// fixed-width case mask inside selects characters the value does not
    /// have; such a combination is not a word.
    fn render(&self, s: StateId, out: &mut Vec<UChar>) -> bool {
        let state = &self.states[s.index()];
        match (&state.cursor, self.pattern.ast.get(state.node)) {
            (Cursor::Literal, Node::Literal(chars)) => {
                out.extend_from_slice(chars);
                true
            }
            (Cursor::Class { index }, Node::Class { members, .. }) => {
                if let Some(ch) = members.get(*index) {
                    out.push(*ch);
                }
                true
            }
            (Cursor::Concat(children), _) => {
                let mut fits = true;
                for &c in children {
                    fits &= self.render(c, out);
                }
                fits
            }
            (Cursor::Alt { children, current }, _) => self.render(children[*current], out),
            (Cursor::Repeat { copies, k }, _) => {
                let mut fits = true;
                for &c in &copies[..*k as usize] {
                    fits &= self.render(c, out);
                }
                fits
            }
            (Cursor::Group(child), _) => self.render(*child, out),
            (Cursor::GroupRef, Node::GroupRef { target: Some(target), .. }) => {
                match self.find_instance(s, *target) {
                    Some(instance) => self.render(instance, out),
                    None => true,
                }
            }
            (
                Cursor::CaseInsensitive {
                    child, mask, fixed, ..
                },
                _,
            ) => {
                let start = out.len();
                let mut fits = self.render(*child, out);
                if fixed.is_some() {
                    fits &= mask_fits(&out[start..], *mask);
                }
                apply_case_mask(&mut out[start..], *mask);
                fits
            }
            (Cursor::Stream(word), _) => {
                out.extend_from_slice(word);
                true
            }
            _ => true,
        }
    }

    /// The live instance of `target` a reference at `from` reads: the
    /// rightmost one inside the nearest enclosing scope that has any.
    fn find_instance(&self, from: StateId, target: NodeId) -> Option<StateId> {
        let mut scope = self.states[from.index()].parent;
        while let Some(s) = scope {
            if let Some(found) = self.search(s, target) {
                return Some(found);
            }
            scope = self.states[s.index()].parent;
        }
        None
    }

    /// Search the live part of the subtree at `s`, right to left.
    fn search(&self, s: StateId, target: NodeId) -> Option<StateId> {
        let state = &self.states[s.index()];
        if state.node == target {
            return Some(s);
        }
        match &state.cursor {
            Cursor::Concat(children) => children.iter().rev().find_map(|&c| self.search(c, target)),
            Cursor::Alt { children, current } => self.search(children[*current], target),
            Cursor::Repeat { copies, k } => copies[..*k as usize]
                .iter()
                .rev()
                .find_map(|&c| self.search(c, target)),
            Cursor::Group(child) | Cursor::CaseInsensitive { child, .. } => {
                self.search(*child, target)
            }
            _ => None,
        }
    }
}

/// True if every bit of `mask` selects a case-mutable character of `chars`.
fn mask_fits(chars: &[UChar], mask: u64) -> bool {
    let n = chars.iter().filter(|c| c.is_case_mutable()).count();
    n >= 64 || mask >> n == 0
}

/// Flip the case of the case-mutable characters selected by `mask`; bit 0
/// is the rightmost one.
fn apply_case_mask(chars: &mut [UChar], mask: u64) {
    if mask == 0 {
        return;
    }
    let mut bit = 0u32;
    for ch in chars.iter_mut().rev() {
        if !ch.is_case_mutable() {
            continue;
        }
        if bit >= 64 {
            break;
        }
        if mask & (1u64 << bit) != 0 {
            ch.toggle_casefolded();
        }
        bit += 1;
    }
}

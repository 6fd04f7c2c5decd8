// uchar.rs - Character model.
//
// One logical character: its codepoint, Unicode plane, target charset,
// case flags, and the cached binary forms of the character and of its
// case variants. Rendering copies cached bytes; nothing is encoded on the
// hot path.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::charset::{encode_codepoint, Binary, Charset};
use crate::error::GenError;

pub const MAX_CASE_VARIANTS: usize = 3;

bitflags! {
    /// Case handling flags of a [`UChar`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CharFlags: u8 {
        /// The character was toggled away from its written case.
        const CHANGE_CASE = 0x01;
        /// The character must render exactly as written.
        const PRESERVE_CASE = 0x02;
        /// Render the first cached case variant instead of the codepoint.
        const USE_CASEFOLDED = 0x04;
    }
}

/// Unicode plane of a codepoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    Basic,
    Supplementary,
    Ideographic,
    Tertiary,
    Special,
    PrivateA,
    PrivateB,
    Unassigned(u8),
}

impl Plane {
    pub fn of(code: u32) -> Plane {
        match code >> 16 {
            0 => Plane::Basic,
            1 => Plane::Supplementary,
            2 => Plane::Ideographic,
            3 => Plane::Tertiary,
            14 => Plane::Special,
            15 => Plane::PrivateA,
            16 => Plane::PrivateB,
            n => Plane::Unassigned(n.min(u8::MAX as u32) as u8),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Plane::Basic => 0,
            Plane::Supplementary => 1,
            Plane::Ideographic => 2,
            Plane::Tertiary => 3,
            Plane::Special => 14,
            Plane::PrivateA => 15,
            Plane::PrivateB => 16,
            Plane::Unassigned(n) => n,
        }
    }
}

fn single_char<I: Iterator<Item = char>>(mut it: I) -> Option<char> {
    let first = it.next()?;
    it.next().is_none().then_some(first)
}

/// Single-codepoint case mappings of `code` that differ from it.
fn case_variants(code: u32) -> ([u32; MAX_CASE_VARIANTS], usize) {
    let mut out = [0u32; MAX_CASE_VARIANTS];
    let mut n = 0;
    let Some(c) = char::from_u32(code) else {
        return (out, 0);
    };
    let mapped = [single_char(c.to_uppercase()), single_char(c.to_lowercase())];
    for v in mapped.into_iter().flatten().map(|v| v as u32) {
        if v != code && n < MAX_CASE_VARIANTS && !out[..n].contains(&v) {
            out[n] = v;
            n += 1;
        }
    }
    (out, n)
}

/// A logical character bound to one output charset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UChar {
    codepoint: u32,
    plane: Plane,
    charset: Charset,
    flags: CharFlags,
    /// `None` when the codepoint has no representation in `charset`.
    binary: Option<Binary>,
    variants: [u32; MAX_CASE_VARIANTS],
    variant_count: u8,
    casefolded: [Option<Binary>; MAX_CASE_VARIANTS],
}

impl UChar {
    pub fn new(codepoint: u32, charset: Charset) -> Self {
        let (variants, count) = case_variants(codepoint);
        let mut casefolded = [None; MAX_CASE_VARIANTS];
        for (slot, &v) in casefolded.iter_mut().zip(&variants[..count]) {
            *slot = encode_codepoint(v, charset).ok();
        }
        UChar {
            codepoint,
            plane: Plane::of(codepoint),
            charset,
            flags: CharFlags::empty(),
            binary: encode_codepoint(codepoint, charset).ok(),
            variants,
            variant_count: count as u8,
            casefolded,
        }
    }

    pub fn from_char(c: char, charset: Charset) -> Self {
        UChar::new(c as u32, charset)
    }

    /// The codepoint as written, ignoring [`CharFlags::USE_CASEFOLDED`].
    pub fn codepoint(&self) -> u32 {
        self.codepoint
    }

    /// The codepoint that [`UChar::to_binary`] renders.
    pub fn effective_codepoint(&self) -> u32 {
        if self.flags.contains(CharFlags::USE_CASEFOLDED) && self.variant_count > 0 {
            self.variants[0]
        } else {
            self.codepoint
        }
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn flags(&self) -> CharFlags {
        self.flags
    }

    pub fn case_variants(&self) -> &[u32] {
        &self.variants[..self.variant_count as usize]
    }

    pub fn is_ascii(&self) -> bool {
        self.codepoint < 0x80
    }

    pub fn can_change_case(&self) -> bool {
        !self.flags.contains(CharFlags::PRESERVE_CASE)
    }

    pub fn must_change_case(&self) -> bool {
        self.flags.contains(CharFlags::CHANGE_CASE)
    }

    /// True if a case-insensitive section may render this character in
    /// another case.
    pub fn is_case_mutable(&self) -> bool {
        self.can_change_case() && self.variant_count > 0
    }

    pub fn set_change_case(&mut self) {
        self.flags.insert(CharFlags::CHANGE_CASE);
        self.flags.remove(CharFlags::PRESERVE_CASE);
    }

    pub fn set_preserve_case(&mut self) {
        self.flags.remove(CharFlags::CHANGE_CASE);
        self.flags.insert(CharFlags::PRESERVE_CASE);
    }

    /// Switch to the first case variant, recomputing the cached binaries.
    /// No-op for characters that preserve case or have no variant.
    pub fn toggle_case(&mut self) {
        if !self.is_case_mutable() {
            return;
        }
        let changed = self.flags.contains(CharFlags::CHANGE_CASE);
        let keep = self.flags & CharFlags::USE_CASEFOLDED;
        *self = UChar::new(self.variants[0], self.charset);
        self.flags = keep;
        if !changed {
            self.set_change_case();
        }
    }

    /// Flip between the written form and the first cached case variant
    /// without re-encoding.
    pub fn toggle_casefolded(&mut self) {
        if self.is_case_mutable() {
            self.flags.toggle(CharFlags::USE_CASEFOLDED);
        }
    }

    /// The cached bytes for this character in its charset.
    pub fn to_binary(&self) -> Result<&[u8], GenError> {
        let bin = if self.flags.contains(CharFlags::USE_CASEFOLDED) && self.variant_count > 0 {
            self.casefolded[0].as_ref()
        } else {
            self.binary.as_ref()
        };
        bin.map(Binary::as_bytes).ok_or(GenError::Encoding {
            codepoint: self.effective_codepoint(),
            charset: self.charset,
        })
    }

    /// Append the rendered bytes to `dst`.
    pub fn write_to(&self, dst: &mut Vec<u8>) -> Result<(), GenError> {
        dst.extend_from_slice(self.to_binary()?);
        Ok(())
    }
}

/// Per-charset memo of characters: each distinct codepoint is encoded once.
#[derive(Debug, Clone)]
pub struct CharTable {
    charset: Charset,
    cache: HashMap<u32, UChar>,
}

impl CharTable {
    pub fn new(charset: Charset) -> Self {
        CharTable {
            charset,
            cache: HashMap::new(),
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn get(&mut self, codepoint: u32) -> UChar {
        let charset = self.charset;
        *self
            .cache
            .entry(codepoint)
            .or_insert_with(|| UChar::new(codepoint, charset))
    }

    pub fn get_char(&mut self, c: char) -> UChar {
        self.get(c as u32)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planes() {
        assert_eq!(Plane::of(0x41), Plane::Basic);
        assert_eq!(Plane::of(0x1f600), Plane::Supplementary);
        assert_eq!(Plane::of(0x20000), Plane::Ideographic);
        assert_eq!(Plane::of(0xe0001), Plane::Special);
        assert_eq!(Plane::of(0xf0000), Plane::PrivateA);
        assert_eq!(Plane::of(0x100000), Plane::PrivateB);
        assert_eq!(Plane::of(0x50000), Plane::Unassigned(5));
        assert_eq!(Plane::of(0x100000).number(), 16);
    }

    #[test]
    fn letter_has_case_variant() {
        let a = UChar::from_char('a', Charset::Utf8);
        assert_eq!(a.case_variants(), &['A' as u32]);
        assert!(a.is_case_mutable());
        assert!(a.is_ascii());
        let d = UChar::from_char('7', Charset::Utf8);
        assert!(d.case_variants().is_empty());
        assert!(!d.is_case_mutable());
    }

    #[test]
    fn multi_char_mappings_are_not_variants() {
        // 'ß' uppercases to "SS"
        let ss = UChar::from_char('ß', Charset::Utf8);
        assert!(ss.case_variants().is_empty());
    }

    #[test]
    fn preserve_and_change_case_are_exclusive() {
        let mut c = UChar::from_char('x', Charset::Utf8);
        c.set_change_case();
        assert!(c.must_change_case());
        c.set_preserve_case();
        assert!(!c.must_change_case());
        assert!(!c.can_change_case());
        c.set_change_case();
        assert!(c.can_change_case());
        assert!(!c.flags().contains(CharFlags::PRESERVE_CASE));
    }

    #[test]
    fn toggle_case_recomputes_binary() {
        let mut c = UChar::from_char('é', Charset::Utf16Le);
        c.toggle_case();
        assert_eq!(c.codepoint(), 'É' as u32);
        assert_eq!(c.to_binary().unwrap(), &[0xc9, 0x00]);
        assert!(c.must_change_case());
        c.toggle_case();
        assert_eq!(c.codepoint(), 'é' as u32);
        assert!(!c.must_change_case());
    }

    #[test]
    fn toggle_case_respects_preserve_case() {
        let mut c = UChar::from_char('q', Charset::Utf8);
        c.set_preserve_case();
        c.toggle_case();
        assert_eq!(c.codepoint(), 'q' as u32);
        c.toggle_casefolded();
        assert_eq!(c.to_binary().unwrap(), b"q");
    }

    #[test]
    fn casefolded_rendering_uses_cache() {
        let mut c = UChar::from_char('k', Charset::Utf8);
        c.toggle_casefolded();
        assert_eq!(c.to_binary().unwrap(), b"K");
        assert_eq!(c.effective_codepoint(), 'K' as u32);
        assert_eq!(c.codepoint(), 'k' as u32);
        c.toggle_casefolded();
        assert_eq!(c.to_binary().unwrap(), b"k");
    }

    #[test]
    fn unrepresentable_surfaces_on_render() {
        let c = UChar::new(0x263a, Charset::Ansi);
        assert_eq!(
            c.to_binary().unwrap_err(),
            GenError::Encoding {
                codepoint: 0x263a,
                charset: Charset::Ansi
            }
        );
        // 'ÿ' fits ANSI but its uppercase 'Ÿ' does not
        let mut y = UChar::from_char('ÿ', Charset::Ansi);
        assert_eq!(y.to_binary().unwrap(), &[0xff]);
        y.toggle_casefolded();
        assert!(y.to_binary().is_err());
    }

    #[test]
    fn char_table_memoizes() {
        let mut table = CharTable::new(Charset::Utf32Be);
        let a = table.get_char('a');
        let b = table.get_char('a');
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(a.to_binary().unwrap(), &[0, 0, 0, 0x61]);
        assert_eq!(table.charset(), Charset::Utf32Be);
    }
}

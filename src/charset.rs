// charset.rs - Output charsets.
// Codepoint <-> byte conversion for ANSI, UTF-8, UTF-16 and UTF-32 (both
// byte orders), plus byte order marks.

use crate::error::GenError;

pub const MAX_CODE_POINT: u32 = 0x10ffff;
pub const ANSI_LIMIT: u32 = 0xff;

/// A concrete byte-level encoding, fixed for one generation run.
///
/// The numeric tags are stable and match [`Charset::tag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Charset {
    /// ISO-8859-1: one byte per codepoint, `U+0000..=U+00FF` only.
    Ansi = 1,
    #[default]
    Utf8 = 2,
    Utf16Be = 3,
    Utf32Be = 4,
    Utf16Le = 5,
    Utf32Le = 6,
}

impl Charset {
    pub fn from_tag(tag: u8) -> Option<Charset> {
        match tag {
            1 => Some(Charset::Ansi),
            2 => Some(Charset::Utf8),
            3 => Some(Charset::Utf16Be),
            4 => Some(Charset::Utf32Be),
            5 => Some(Charset::Utf16Le),
            6 => Some(Charset::Utf32Le),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Ansi => "ANSI",
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf32Be => "UTF-32BE",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf32Le => "UTF-32LE",
        }
    }

    /// Byte order mark written at the start of a stream in this charset.
    pub fn bom(self) -> &'static [u8] {
        match self {
            Charset::Ansi => &[],
            Charset::Utf8 => &[0xef, 0xbb, 0xbf],
            Charset::Utf16Be => &[0xfe, 0xff],
            Charset::Utf16Le => &[0xff, 0xfe],
            Charset::Utf32Be => &[0x00, 0x00, 0xfe, 0xff],
            Charset::Utf32Le => &[0xff, 0xfe, 0x00, 0x00],
        }
    }

    /// Smallest number of bytes one codepoint takes in this charset.
    pub fn min_enc_len(self) -> usize {
        match self {
            Charset::Ansi | Charset::Utf8 => 1,
            Charset::Utf16Be | Charset::Utf16Le => 2,
            Charset::Utf32Be | Charset::Utf32Le => 4,
        }
    }
}

// === Binary ===

/// The encoded form of one codepoint (at most 4 bytes in every charset).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Binary {
    bytes: [u8; 4],
    len: u8,
}

impl Binary {
    fn push(&mut self, b: u8) {
        self.bytes[self.len as usize] = b;
        self.len += 1;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[inline]
fn is_surrogate(code: u32) -> bool {
    (0xd800..=0xdfff).contains(&code)
}

fn unrepresentable(code: u32, charset: Charset) -> GenError {
    GenError::Encoding {
        codepoint: code,
        charset,
    }
}

fn code_to_utf8(code: u32, out: &mut Binary) {
    if (code & 0xffffff80) == 0 {
        out.push(code as u8);
    } else if (code & 0xfffff800) == 0 {
        out.push(((code >> 6) & 0x1f) as u8 | 0xc0);
        out.push((code & 0x3f) as u8 | 0x80);
    } else if (code & 0xffff0000) == 0 {
        out.push(((code >> 12) & 0x0f) as u8 | 0xe0);
        out.push(((code >> 6) & 0x3f) as u8 | 0x80);
        out.push((code & 0x3f) as u8 | 0x80);
    } else {
        out.push(((code >> 18) & 0x07) as u8 | 0xf0);
        out.push(((code >> 12) & 0x3f) as u8 | 0x80);
        out.push(((code >> 6) & 0x3f) as u8 | 0x80);
        out.push((code & 0x3f) as u8 | 0x80);
    }
}

fn push_u16(unit: u16, big_endian: bool, out: &mut Binary) {
    let b = if big_endian {
        unit.to_be_bytes()
    } else {
        unit.to_le_bytes()
    };
    out.push(b[0]);
    out.push(b[1]);
}

fn code_to_utf16(code: u32, big_endian: bool, out: &mut Binary) {
    if code < 0x10000 {
        push_u16(code as u16, big_endian, out);
    } else {
        let v = code - 0x10000;
        push_u16(0xd800 | (v >> 10) as u16, big_endian, out);
        push_u16(0xdc00 | (v & 0x3ff) as u16, big_endian, out);
    }
}

/// Encode `code` in `charset`.
pub fn encode_codepoint(code: u32, charset: Charset) -> Result<Binary, GenError> {
    let mut out = Binary::default();
    match charset {
        Charset::Ansi => {
            if code > ANSI_LIMIT {
                return Err(unrepresentable(code, charset));
            }
            out.push(code as u8);
            return Ok(out);
        }
        _ if code > MAX_CODE_POINT || is_surrogate(code) => {
            return Err(unrepresentable(code, charset));
        }
        Charset::Utf8 => code_to_utf8(code, &mut out),
        Charset::Utf16Be => code_to_utf16(code, true, &mut out),
        Charset::Utf16Le => code_to_utf16(code, false, &mut out),
        Charset::Utf32Be => code.to_be_bytes().iter().for_each(|&b| out.push(b)),
        Charset::Utf32Le => code.to_le_bytes().iter().for_each(|&b| out.push(b)),
    }
    Ok(out)
}

fn read_u16(p: &[u8], big_endian: bool) -> Option<u16> {
    let b: [u8; 2] = p.get(..2)?.try_into().ok()?;
    Some(if big_endian {
        u16::from_be_bytes(b)
    } else {
        u16::from_le_bytes(b)
    })
}

fn utf16_to_code(p: &[u8], big_endian: bool) -> Option<(u32, usize)> {
    let hi = read_u16(p, big_endian)? as u32;
    if !is_surrogate(hi) {
        return Some((hi, 2));
    }
    if hi >= 0xdc00 {
        return None;
    }
    let lo = read_u16(&p[2..], big_endian)? as u32;
    if !(0xdc00..=0xdfff).contains(&lo) {
        return None;
    }
    Some((0x10000 + ((hi - 0xd800) << 10) + (lo - 0xdc00), 4))
}

fn utf32_to_code(p: &[u8], big_endian: bool) -> Option<(u32, usize)> {
    let b: [u8; 4] = p.get(..4)?.try_into().ok()?;
    let code = if big_endian {
        u32::from_be_bytes(b)
    } else {
        u32::from_le_bytes(b)
    };
    if code > MAX_CODE_POINT || is_surrogate(code) {
        return None;
    }
    Some((code, 4))
}

/// Decode the first codepoint of `p` in `charset`.
/// Returns the codepoint and the number of bytes consumed, or `None` for a
/// truncated or malformed sequence.
pub fn decode_codepoint(p: &[u8], charset: Charset) -> Option<(u32, usize)> {
    match charset {
        Charset::Ansi => p.first().map(|&b| (b as u32, 1)),
        Charset::Utf8 => crate::decoder::utf8_decode_step(p).map(|(c, len)| (c as u32, len)),
        Charset::Utf16Be => utf16_to_code(p, true),
        Charset::Utf16Le => utf16_to_code(p, false),
        Charset::Utf32Be => utf32_to_code(p, true),
        Charset::Utf32Le => utf32_to_code(p, false),
    }
}

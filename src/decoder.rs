// decoder.rs - Input decoder.
// Turns the host's narrow multibyte input (UTF-8) into characters and
// exposes the cursor the parser reads from.

// === EncLen table ===
// Lead byte to sequence length. A matcher's table gives stray bytes
// (continuations, 0xC0/0xC1, 0xF5..) length 1 so a search can step over
// them; here they map to 0, which ends decoding.

static ENC_LEN_UTF8: [u8; 256] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Decode one character from the front of `p`.
///
/// Returns the character and its byte length, or `None` at end of input or
/// on a malformed sequence. The two are not distinguished.
pub fn utf8_decode_step(p: &[u8]) -> Option<(char, usize)> {
    let len = ENC_LEN_UTF8[*p.first()? as usize] as usize;
    if len == 0 || len > p.len() {
        return None;
    }
    // from_utf8 rejects overlong forms and surrogates the table lets through.
    let s = std::str::from_utf8(&p[..len]).ok()?;
    s.chars().next().map(|c| (c, len))
}

/// Decode `input` greedily, stopping at the first malformed sequence.
pub fn decode(input: &[u8]) -> Vec<char> {
    let mut chars = Vec::with_capacity(input.len());
    let mut p = 0;
    while let Some((c, len)) = utf8_decode_step(&input[p..]) {
        chars.push(c);
        p += len;
    }
    chars
}

/// A monotonically advancing cursor over decoded input.
#[derive(Debug, Clone)]
pub struct Decoder {
    chars: Vec<char>,
    pos: usize,
}

impl Decoder {
    pub fn new(input: &[u8]) -> Self {
        Decoder {
            chars: decode(input),
            pos: 0,
        }
    }

    /// Return the current character and advance past it.
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    pub fn peek(&self) -> Option<char> {
        self.peek_nth(0)
    }

    /// Look `n` characters past the cursor without consuming.
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    pub fn is_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Offset of the cursor, in characters.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

// source.rs - Word sources for the stream anchor.
//
// A `\0` in a pattern stands for every word a source delivers, in order.
// Sources hand out raw host-encoded (UTF-8) bytes; the engine decodes and
// re-encodes them into the output charset.

/// Supplier of the words substituted for `\0`.
///
/// The engine calls [`WordSource::rewind`] whenever the stream anchor is
/// reset, so a source must be able to replay its words from the start.
pub trait WordSource {
    /// Restart from the first word.
    fn rewind(&mut self);

    /// The next word, or `None` once the source is exhausted.
    fn next_word(&mut self) -> Option<Vec<u8>>;
}

/// Words taken one per line from an in-memory buffer.
///
/// Lines end at `\n`; a preceding `\r` is dropped. A final line without a
/// terminator still counts, an empty trailing line does not.
#[derive(Debug, Clone)]
pub struct LineSource {
    data: Vec<u8>,
    pos: usize,
}

impl LineSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        LineSource {
            data: data.into(),
            pos: 0,
        }
    }

    /// Number of words in the buffer.
    pub fn count(&self) -> usize {
        let mut n = 0;
        let mut p = 0;
        while let Some((_, next)) = split_line(&self.data, p) {
            n += 1;
            p = next;
        }
        n
    }
}

/// The line starting at `pos` and the offset following it.
fn split_line(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    if pos >= data.len() {
        return None;
    }
    let rest = &data[pos..];
    let (line, next) = match memchr::memchr(b'\n', rest) {
        Some(i) => (&rest[..i], pos + i + 1),
        None => (rest, data.len()),
    };
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, next))
}

impl WordSource for LineSource {
    fn rewind(&mut self) {
        self.pos = 0;
    }

    fn next_word(&mut self) -> Option<Vec<u8>> {
        let (line, next) = split_line(&self.data, self.pos)?;
        self.pos = next;
        Some(line.to_vec())
    }
}

/// A word source driven by a closure.
///
/// The closure receives the zero-based index of the requested word and
/// returns `None` to end the stream. Rewinding restarts the index at 0.
pub struct FnSource<F> {
    f: F,
    index: usize,
}

impl<F> FnSource<F>
where
    F: FnMut(usize) -> Option<Vec<u8>>,
{
    pub fn new(f: F) -> Self {
        FnSource { f, index: 0 }
    }
}

impl<F> WordSource for FnSource<F>
where
    F: FnMut(usize) -> Option<Vec<u8>>,
{
    fn rewind(&mut self) {
        self.index = 0;
    }

    fn next_word(&mut self) -> Option<Vec<u8>> {
        let word = (self.f)(self.index)?;
        self.index += 1;
        Some(word)
    }
}

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSource")
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(src: &mut dyn WordSource) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| src.next_word()).collect()
    }

    #[test]
    fn lines_without_terminators() {
        let mut src = LineSource::new(&b"alpha\nbeta\r\ngamma"[..]);
        assert_eq!(
            drain(&mut src),
            vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]
        );
        assert_eq!(src.next_word(), None);
    }

    #[test]
    fn trailing_newline_adds_no_word() {
        let src = LineSource::new(&b"a\nb\n"[..]);
        assert_eq!(src.count(), 2);
        let src = LineSource::new(&b"a\n\nb"[..]);
        assert_eq!(src.count(), 3);
        assert_eq!(LineSource::new(Vec::<u8>::new()).count(), 0);
    }

    #[test]
    fn rewind_replays() {
        let mut src = LineSource::new("x\ny");
        let first = drain(&mut src);
        src.rewind();
        assert_eq!(drain(&mut src), first);
    }

    #[test]
    fn closure_source() {
        let words = ["red", "green"];
        let mut src = FnSource::new(|i| words.get(i).map(|w| w.as_bytes().to_vec()));
        assert_eq!(drain(&mut src).len(), 2);
        src.rewind();
        assert_eq!(src.next_word(), Some(b"red".to_vec()));
    }
}

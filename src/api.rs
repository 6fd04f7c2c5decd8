// api.rs - Idiomatic Rust API for wordgen.
//
// Wraps the parser and the iterator engine with Rust-native types:
// Generator, GeneratorBuilder, and the Words pull iterator. Push-mode
// delivery goes through Generator::generate.

use std::iter::FusedIterator;
use std::ops::ControlFlow;

use crate::ast::Ast;
use crate::charset::Charset;
use crate::error::GenError;
use crate::iter::Engine;
use crate::lasterr::record;
use crate::parser::{parse, ParseOptions, ParsedPattern};
use crate::source::WordSource;

/// A parsed pattern, ready to enumerate the words it describes.
///
/// # Examples
///
/// ```
/// use wordgen::api::Generator;
///
/// let mut g = Generator::new("[ab][12]").unwrap();
/// let words: Vec<Vec<u8>> = g.words().collect::<Result<_, _>>().unwrap();
/// assert_eq!(words, vec![b"a1".to_vec(), b"a2".to_vec(), b"b1".to_vec(), b"b2".to_vec()]);
/// ```
pub struct Generator {
    pattern: ParsedPattern,
    source: Option<Box<dyn WordSource>>,
    max_length: usize,
    bom: bool,
}

impl Generator {
    /// Parse `pattern` with default options (UTF-8 output, no repeat limit).
    pub fn new(pattern: &str) -> Result<Generator, GenError> {
        GeneratorBuilder::new(pattern).build()
    }

    /// Parse a UTF-8 encoded pattern given as bytes.
    pub fn new_bytes(pattern: &[u8]) -> Result<Generator, GenError> {
        GeneratorBuilder::from_bytes(pattern).build()
    }

    /// Create a builder for custom options.
    pub fn builder(pattern: &str) -> GeneratorBuilder {
        GeneratorBuilder::new(pattern)
    }

    /// Iterate over all words, in order. Every call starts a fresh
    /// enumeration from the first word.
    pub fn words(&mut self) -> Words<'_> {
        let bom = self.bom.then(|| self.pattern.charset().bom());
        let source = self
            .source
            .as_mut()
            .map(|s| &mut **s as &mut dyn WordSource);
        Words {
            engine: Engine::new(&self.pattern, source, self.max_length),
            bom,
            done: false,
        }
    }

    /// Push every word to `sink` until the enumeration ends or the sink
    /// returns [`ControlFlow::Break`]. Returns the number of words
    /// delivered.
    ///
    /// ```
    /// use std::ops::ControlFlow;
    /// use wordgen::api::Generator;
    ///
    /// let mut g = Generator::new("[0-9]{3}").unwrap();
    /// let mut seen = Vec::new();
    /// let n = g
    ///     .generate(|w| {
    ///         seen.push(w.to_vec());
    ///         if seen.len() == 5 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    ///     })
    ///     .unwrap();
    /// assert_eq!(n, 5);
    /// assert_eq!(seen[4], b"004");
    /// ```
    pub fn generate<F>(&mut self, mut sink: F) -> Result<u64, GenError>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let bom = self.bom.then(|| self.pattern.charset().bom());
        let source = self
            .source
            .as_mut()
            .map(|s| &mut **s as &mut dyn WordSource);
        let mut engine = Engine::new(&self.pattern, source, self.max_length);

        let mut buf = Vec::new();
        let mut delivered = 0u64;
        while record(engine.next_into(&mut buf))? {
            if delivered == 0 {
                if let Some(bom) = bom {
                    buf.splice(0..0, bom.iter().copied());
                }
            }
            delivered += 1;
            if sink(&buf).is_break() {
                break;
            }
        }
        Ok(delivered)
    }

    /// Enumerate everything and return the number of words.
    pub fn count(&mut self) -> Result<u64, GenError> {
        self.generate(|_| ControlFlow::Continue(()))
    }

    /// Upper bound of the number of words, saturating at `u128::MAX`.
    pub fn upper_bound(&self) -> u128 {
        let ast = self.pattern.ast();
        ast.root().map_or(1, |root| ast.upper_bound(root))
    }

    /// Number of capturing groups in the pattern.
    pub fn group_count(&self) -> usize {
        self.pattern.group_count()
    }

    pub fn charset(&self) -> Charset {
        self.pattern.charset()
    }

    pub fn ast(&self) -> &Ast {
        self.pattern.ast()
    }

    /// Whether the pattern reads from the word source (`\0`).
    pub fn uses_word_source(&self) -> bool {
        self.pattern.stream_anchor().is_some()
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("charset", &self.charset())
            .field("groups", &self.group_count())
            .finish_non_exhaustive()
    }
}

// === GeneratorBuilder ===

/// Builder for a [`Generator`] with custom options.
///
/// # Examples
///
/// ```
/// use wordgen::api::Generator;
/// use wordgen::charset::Charset;
///
/// let mut g = Generator::builder("x+")
///     .repeat_limit(3)
///     .charset(Charset::Utf16Le)
///     .build()
///     .unwrap();
/// let words: Vec<_> = g.words().map(Result::unwrap).collect();
/// assert_eq!(words, vec![b"x\0".to_vec(), b"x\0x\0".to_vec(), b"x\0x\0x\0".to_vec()]);
/// ```
pub struct GeneratorBuilder {
    pattern: Vec<u8>,
    options: ParseOptions,
    source: Option<Box<dyn WordSource>>,
    bom: bool,
}

impl GeneratorBuilder {
    /// Create a new builder for the given pattern.
    pub fn new(pattern: &str) -> Self {
        GeneratorBuilder::from_bytes(pattern.as_bytes())
    }

    /// Create a builder for a UTF-8 encoded pattern given as bytes.
    pub fn from_bytes(pattern: &[u8]) -> Self {
        GeneratorBuilder {
            pattern: pattern.to_vec(),
            options: ParseOptions::default(),
            source: None,
            bom: false,
        }
    }

    /// Output charset of the generated words (default: UTF-8).
    pub fn charset(mut self, charset: Charset) -> Self {
        self.options.charset = charset;
        self
    }

    /// Allow `*`, `+` and `{m,}`, capping them at `limit` repetitions.
    pub fn repeat_limit(mut self, limit: u32) -> Self {
        self.options.repeat_limit = Some(limit);
        self
    }

    /// Longest word in characters (default: 4096).
    pub fn max_length(mut self, len: usize) -> Self {
        self.options.max_length = len;
        self
    }

    /// Reject patterns that may describe more than `limit` words.
    pub fn max_combinations(mut self, limit: u128) -> Self {
        self.options.max_combinations = Some(limit);
        self
    }

    /// Supply the words that `\0` stands for.
    pub fn word_source(mut self, source: impl WordSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self.options.stream = true;
        self
    }

    /// Prefix the first word with the charset's byte order mark.
    pub fn bom(mut self, yes: bool) -> Self {
        self.bom = yes;
        self
    }

    /// Parse the pattern into a [`Generator`].
    pub fn build(self) -> Result<Generator, GenError> {
        let pattern = record(parse(&self.pattern, &self.options))?;
        Ok(Generator {
            pattern,
            source: self.source,
            max_length: self.options.max_length,
            bom: self.bom,
        })
    }
}

// === Words ===

/// Iterator over the words of a [`Generator`].
///
/// Yields `Err` at most once; the iterator is finished afterwards.
pub struct Words<'g> {
    engine: Engine<'g>,
    bom: Option<&'static [u8]>,
    done: bool,
}

impl Iterator for Words<'_> {
    type Item = Result<Vec<u8>, GenError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut word = Vec::new();
        match record(self.engine.next_into(&mut word)) {
            Ok(true) => {
                if let Some(bom) = self.bom.take() {
                    word.splice(0..0, bom.iter().copied());
                }
                Some(Ok(word))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Words<'_> {}

impl std::fmt::Debug for Words<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Words")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

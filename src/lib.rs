//! # wordgen
//!
//! Reverse regular expressions: instead of matching text against a
//! pattern, enumerate every word the pattern describes. Useful for word
//! lists, test corpora and password-candidate sets.
//!
//! ## Quick Start
//!
//! ```rust
//! use wordgen::prelude::*;
//!
//! let mut g = Generator::new(r"(?i:ab)[0-1]").unwrap();
//! let words: Vec<String> = g
//!     .words()
//!     .map(|w| String::from_utf8(w.unwrap()).unwrap())
//!     .collect();
//! assert_eq!(words.len(), 8);
//! assert_eq!(words[0], "ab0");
//! assert_eq!(words[3], "aB1");
//! ```
//!
//! For output charsets, repetition caps and word sources, use
//! [`GeneratorBuilder`]:
//!
//! ```rust
//! use wordgen::prelude::*;
//!
//! let mut g = Generator::builder(r"\0-\0")
//!     .word_source(LineSource::new("foo\nbar"))
//!     .build()
//!     .unwrap();
//! assert_eq!(g.count().unwrap(), 2);
//! ```
//!
//! ## Pattern Syntax
//!
//! | Syntax | Denotes |
//! |--------|---------|
//! | `abc` | the literal word |
//! | `[a-c]`, `[^a-c]`, `.` | one character of the class (negation and `.` range over printable ASCII) |
//! | `\d`, `\w`, `\s` | ASCII digit, word and space classes |
//! | `x\|y` | the words of `x`, then those of `y` |
//! | `x{m,n}`, `x{m}`, `x?` | `m` to `n` repetitions |
//! | `x*`, `x+`, `x{m,}` | capped by [`GeneratorBuilder::repeat_limit`] |
//! | `(x)`, `(?:x)` | capturing / non-capturing group |
//! | `\1` .. `\9`, `\10` .. | the current value of a capturing group |
//! | `(?i:x)` | every upper/lower case combination of `x` |
//! | `\0` | each word of the configured word source |
//! | `\xHH`, `\x{H..}`, `\uHHHH` | a codepoint, never case-varied |
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`api`] | `Generator`, `GeneratorBuilder`, `Words` |
//! | [`parser`] | Pattern parser, group resolution, limit checks |
//! | [`ast`] | Node arena and static analyses |
//! | [`iter`] | Enumeration engine |
//! | [`uchar`] | Character model with cached encodings |
//! | [`charset`] | Output charsets and byte order marks |
//! | [`decoder`] | UTF-8 input decoding |
//! | [`source`] | Word sources for `\0` |
//! | [`error`] | Error type and codes |
//! | [`lasterr`] | Process-wide last-error message |

pub mod api;
pub mod ast;
pub mod charset;
pub mod decoder;
pub mod error;
pub mod iter;
pub mod lasterr;
pub mod parser;
pub mod prelude;
pub mod source;
pub mod uchar;

pub use api::{Generator, GeneratorBuilder, Words};
pub use error::GenError;

// prelude.rs - Convenient re-exports for the idiomatic API.
//
//! # Prelude
//!
//! ```
//! use wordgen::prelude::*;
//!
//! let mut g = Generator::new(r"([a-z])\1").unwrap();
//! assert_eq!(g.count().unwrap(), 26);
//! ```

pub use crate::api::{Generator, GeneratorBuilder, Words};
pub use crate::charset::Charset;
pub use crate::error::GenError;
pub use crate::source::{FnSource, LineSource, WordSource};

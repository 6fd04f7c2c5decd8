// api_test.rs - Integration tests for the idiomatic Rust API.

use std::ops::ControlFlow;

use wordgen::api::{Generator, GeneratorBuilder};
use wordgen::error::*;
use wordgen::prelude::*;

// === Generator::new ===

#[test]
fn simple_pattern() {
    let mut g = Generator::new("ab[cd]").unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![b"abc".to_vec(), b"abd".to_vec()]);
}

#[test]
fn bytes_pattern() {
    let mut g = Generator::new_bytes("[é€]".as_bytes()).unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec!["é".as_bytes().to_vec(), "€".as_bytes().to_vec()]);
}

#[test]
fn empty_pattern() {
    let mut g = Generator::new("").unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![Vec::<u8>::new()]);
}

#[test]
fn invalid_pattern_syntax_error() {
    let err = Generator::new("(unclosed").unwrap_err();
    assert!(matches!(err, GenError::Syntax { .. }));
    assert!(is_syntax_error(err.code()));
    assert!(err.to_string().starts_with("syntax error at position 9"));
}

// === GeneratorBuilder ===

#[test]
fn builder_charsets() {
    let cases: &[(Charset, &[u8])] = &[
        (Charset::Ansi, &[0xe9]),
        (Charset::Utf8, &[0xc3, 0xa9]),
        (Charset::Utf16Le, &[0xe9, 0x00]),
        (Charset::Utf16Be, &[0x00, 0xe9]),
        (Charset::Utf32Le, &[0xe9, 0x00, 0x00, 0x00]),
        (Charset::Utf32Be, &[0x00, 0x00, 0x00, 0xe9]),
    ];
    for &(charset, expected) in cases {
        let mut g = GeneratorBuilder::new("é").charset(charset).build().unwrap();
        assert_eq!(g.charset(), charset);
        let words: Vec<_> = g.words().map(Result::unwrap).collect();
        assert_eq!(words, vec![expected.to_vec()], "{}", charset.name());
    }
}

#[test]
fn builder_bom() {
    let mut g = Generator::builder("a|b")
        .charset(Charset::Utf16Be)
        .bom(true)
        .build()
        .unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![vec![0xfe, 0xff, 0x00, b'a'], vec![0x00, b'b']]);
}

#[test]
fn builder_max_length() {
    let err = Generator::builder("[ab]{10}")
        .max_length(9)
        .build()
        .unwrap_err();
    assert_eq!(err.code(), ERR_TOO_LONG_WORD);
    assert!(Generator::builder("[ab]{10}").max_length(10).build().is_ok());
}

#[test]
fn builder_max_combinations() {
    let err = Generator::builder("[a-z]{4}")
        .max_combinations(100_000)
        .build()
        .unwrap_err();
    assert_eq!(err.code(), ERR_TOO_MANY_COMBINATIONS);
    assert!(matches!(err, GenError::LengthLimit { .. }));
}

#[test]
fn builder_repeat_limit() {
    let mut g = Generator::builder("x{2,}").repeat_limit(4).build().unwrap();
    assert_eq!(g.count().unwrap(), 3);
    // a limit below the lower bound still yields the lower bound
    let mut g = Generator::builder("x{5,}").repeat_limit(2).build().unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![b"xxxxx".to_vec()]);
}

// === Word sources ===

#[test]
fn line_source() {
    let mut g = Generator::builder("\\0\\d")
        .word_source(LineSource::new("pass\r\nword\n"))
        .build()
        .unwrap();
    assert_eq!(g.count().unwrap(), 20);
    let first = g.words().next().unwrap().unwrap();
    assert_eq!(first, b"pass0");
}

#[test]
fn closure_source() {
    let names = ["ann", "bob"];
    let mut g = Generator::builder("(?i:\\0)")
        .word_source(FnSource::new(move |i| {
            names.get(i).map(|n| n.as_bytes().to_vec())
        }))
        .build()
        .unwrap();
    assert_eq!(g.count().unwrap(), 8 + 8);
}

#[test]
fn stream_reference_repeats_anchor_word() {
    let mut g = Generator::builder("\\0:\\0")
        .word_source(LineSource::new("x\ny"))
        .build()
        .unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![b"x:x".to_vec(), b"y:y".to_vec()]);
}

#[test]
fn stream_words_reencoded() {
    let mut g = Generator::builder("<\\0>")
        .charset(Charset::Utf16Le)
        .word_source(LineSource::new("é"))
        .build()
        .unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![vec![b'<', 0, 0xe9, 0, b'>', 0]]);
}

#[test]
fn empty_source_yields_nothing() {
    let mut g = Generator::builder("a\\0")
        .word_source(LineSource::new(""))
        .build()
        .unwrap();
    assert_eq!(g.count().unwrap(), 0);
}

// === Push mode ===

#[test]
fn generate_delivers_in_order() {
    let mut g = Generator::new("[12][ab]").unwrap();
    let mut seen = Vec::new();
    let n = g
        .generate(|w| {
            seen.push(String::from_utf8(w.to_vec()).unwrap());
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(n, 4);
    assert_eq!(seen, vec!["1a", "1b", "2a", "2b"]);
}

#[test]
fn generate_stops_on_break() {
    let mut g = Generator::new("[0-9]{6}").unwrap();
    let mut calls = 0;
    let n = g
        .generate(|_| {
            calls += 1;
            if calls == 10 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    assert_eq!(n, 10);
    assert_eq!(calls, 10);
}

#[test]
fn generate_reports_encoding_error() {
    let mut g = Generator::builder("[a\u{0100}]")
        .charset(Charset::Ansi)
        .build()
        .unwrap();
    let mut seen = 0;
    let err = g
        .generate(|_| {
            seen += 1;
            ControlFlow::Continue(())
        })
        .unwrap_err();
    assert_eq!(seen, 1);
    assert_eq!(
        err,
        GenError::Encoding {
            codepoint: 0x100,
            charset: Charset::Ansi
        }
    );
}

// === Accessors ===

#[test]
fn group_count_and_ast() {
    let g = Generator::new("(a)(?:b)((c)|d)").unwrap();
    assert_eq!(g.group_count(), 3);
    assert!(g.ast().len() > 3);
    assert!(format!("{:?}", g).starts_with("Generator"));
}

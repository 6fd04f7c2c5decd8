// generate_test.rs - Enumeration tests against whole patterns.
//
// Helpers follow the shape of a table-driven regex test suite:
//   x2(pattern, count)        -> enumerate, expect exactly `count` words
//   x3(pattern, words)        -> enumerate, expect exactly `words`, in order
//   e(pattern, code)          -> building the generator fails with `code`

use wordgen::error::*;
use wordgen::prelude::*;

fn build(pattern: &str) -> Generator {
    Generator::new(pattern)
        .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", pattern, e))
}

fn x2(pattern: &str, count: u64) {
    let mut g = build(pattern);
    let n = g
        .count()
        .unwrap_or_else(|e| panic!("enumeration failed for {:?}: {}", pattern, e));
    assert_eq!(n, count, "x2: wrong word count for {:?}", pattern);
}

fn x3(pattern: &str, words: &[&str]) {
    let mut g = build(pattern);
    let got: Vec<String> = g
        .words()
        .map(|w| String::from_utf8(w.unwrap()).unwrap())
        .collect();
    assert_eq!(got, words, "x3: wrong words for {:?}", pattern);
}

fn e(pattern: &str, code: i32) {
    match Generator::new(pattern) {
        Ok(_) => panic!("e: expected error {} for {:?}", code, pattern),
        Err(err) => assert_eq!(err.code(), code, "e: wrong error for {:?}: {}", pattern, err),
    }
}

// === Case-insensitive sections ===

#[test]
fn case_insensitive_counts() {
    x2("(?i:abc)", 8);
    x2("(?i:a(?i:bc))", 2 * 2 * 8);
    x2("(?i:[abc])-[pP]", 12);
    x2("(?i:[123]abc){3}", 3 * 3 * 3 * 8 * 8 * 8);
}

#[test]
fn case_insensitive_over_long_literal() {
    // 65 case-mutable letters do not fit the case mask
    let letters = "abcdefghij".repeat(6) + "abcde";
    e(&format!("(?i:{})", letters), ERR_TOO_MANY_CASE_CHARS);
    assert!(matches!(
        Generator::new(&format!("(?i:{})", letters)),
        Err(GenError::LengthLimit { .. })
    ));

    // one letter followed by 64 digits
    let digits = "1234567890".repeat(6) + "1234";
    x2(&format!("(?i:a{})", digits), 2);
}

#[test]
fn case_insensitive_skips_numeric_escapes() {
    x3("(?i:\\x61b)", &["ab", "aB"]);
    x3("(?i:\\u0041)", &["A"]);
}

#[test]
fn case_insensitive_non_ascii() {
    x3("(?i:é)", &["é", "É"]);
    // no single-character uppercase
    x2("(?i:ß)", 1);
}

// === Back-references ===

#[test]
fn back_reference_counts() {
    x2("(a)\\1", 1);
    x2("([abc])\\1", 3);
    x2("([a-z])\\1", 26);
    x3("([abc])\\1", &["aa", "bb", "cc"]);
}

#[test]
fn back_reference_follows_group_value() {
    x3("(x|yz)-\\1", &["x-x", "yz-yz"]);
    x3("((a)|b)\\2", &["aa", "b"]);
    x3("(?i:(a)\\1)", &["aa", "aA", "Aa", "AA"]);
    x3("(?i:(a))\\1", &["aa", "Aa"]);
}

#[test]
fn case_insensitive_reference_to_later_group() {
    x2("(?i:\\1)([ab])", 4);
    x3("(?i:\\1)([ab])", &["aa", "bb", "Aa", "Bb"]);
    // every branch keeps all of its case variants: 4 for ab, 2 for c
    x2("(?i:\\1)(ab|c)", 6);
    x3("(?i:\\1)(ab|c)", &["abab", "cc", "aBab", "Cc", "Abab", "ABab"]);
    // agrees with the backward form
    x2("([ab])(?i:\\1)", 4);
}

#[test]
fn long_reference_chain_fails_fast() {
    let mut pattern = String::from("(a)");
    for k in 1..40 {
        pattern.push_str(&format!("(\\{}\\{})", k, k));
    }
    e(&pattern, ERR_TOO_LONG_WORD);
}

#[test]
fn dangling_reference_fails() {
    assert_eq!(
        Generator::new("(a)\\2").unwrap_err(),
        GenError::DanglingReference { group: 2 }
    );
    e("\\1", ERR_DANGLING_BACKREF);
}

#[test]
fn self_reference_fails() {
    e("(a\\1)", ERR_INVALID_BACKREF);
}

// === Structure ===

#[test]
fn concat_alt_repeat() {
    x3("a[xy]b", &["axb", "ayb"]);
    x3("foo|bar|", &["foo", "bar", ""]);
    x3("(ab){1,2}", &["ab", "abab"]);
    x3("[01]{0,2}", &["", "0", "1", "00", "01", "10", "11"]);
    x2("[0-9]{4}", 10_000);
    x2("(?:a|b|c){3}", 27);
}

#[test]
fn escapes_and_shorthands() {
    x3("a\\.b", &["a.b"]);
    x3("\\t", &["\t"]);
    x3("\\x{263A}", &["\u{263a}"]);
    x2("\\d", 10);
    x2("\\w", 63);
    x2("\\s", 6);
    x2(".", 95);
    x2("[^0-9]", 95 - 10);
}

#[test]
fn unbounded_repeat_needs_limit() {
    e("a+", ERR_UNBOUNDED_REPEAT);
    let mut g = Generator::builder("a*b").repeat_limit(2).build().unwrap();
    let words: Vec<_> = g.words().map(Result::unwrap).collect();
    assert_eq!(words, vec![b"b".to_vec(), b"ab".to_vec(), b"aab".to_vec()]);
}

#[test]
fn syntax_errors() {
    e("(ab", ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS);
    e("ab)", ERR_UNMATCHED_CLOSE_PARENTHESIS);
    e("[b-a]", ERR_EMPTY_RANGE_IN_CHAR_CLASS);
    e("a{2,1}", ERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE);
    e("?", ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED);
    e("\\0", ERR_STREAM_NOT_CONFIGURED);
    match Generator::new("ab[") {
        Err(GenError::Syntax { position, .. }) => assert_eq!(position, 2),
        other => panic!("unexpected {:?}", other),
    }
}

// === Enumeration contract ===

#[test]
fn restartable() {
    let mut g = build("((?i:[ab]{1,2}))(x|\\1)");
    let first: Vec<_> = g.words().map(Result::unwrap).collect();
    let second: Vec<_> = g.words().map(Result::unwrap).collect();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn count_within_upper_bound() {
    for pattern in ["[ab]{1,3}", "(?i:ab|c)d", "(a|b)\\1"] {
        let mut g = build(pattern);
        let n = g.count().unwrap() as u128;
        assert!(n <= g.upper_bound(), "{:?}: {} > {}", pattern, n, g.upper_bound());
    }
}

#[test]
fn alternation_keeps_duplicates() {
    x3("a|a", &["a", "a"]);
}

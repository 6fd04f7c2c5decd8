// error.rs - Error codes, messages and the GenError type.
//
// Every failure carries a stable negative code so callers on the far side
// of the last-error sink can still classify it.

use std::fmt;

use crate::charset::Charset;

// === Error codes ===

// Syntax errors (-100..-199)
pub const ERR_UNMATCHED_CLOSE_PARENTHESIS: i32 = -100;
pub const ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS: i32 = -101;
pub const ERR_END_PATTERN_AT_LEFT_BRACKET: i32 = -102;
pub const ERR_EMPTY_CHAR_CLASS: i32 = -103;
pub const ERR_PREMATURE_END_OF_CHAR_CLASS: i32 = -104;
pub const ERR_END_PATTERN_AT_ESCAPE: i32 = -105;
pub const ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED: i32 = -106;
pub const ERR_NESTED_REPEAT_OPERATOR: i32 = -107;
pub const ERR_INVALID_REPEAT_RANGE_PATTERN: i32 = -108;
pub const ERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE: i32 = -109;
pub const ERR_TOO_BIG_NUMBER: i32 = -110;
pub const ERR_EMPTY_RANGE_IN_CHAR_CLASS: i32 = -111;
pub const ERR_UNDEFINED_GROUP_OPTION: i32 = -112;
pub const ERR_INVALID_CODE_POINT_VALUE: i32 = -113;
pub const ERR_INVALID_BACKREF: i32 = -114;
pub const ERR_STREAM_NOT_CONFIGURED: i32 = -115;
pub const ERR_STREAM_REPEATED: i32 = -116;
pub const ERR_PARSE_DEPTH_LIMIT_OVER: i32 = -117;
pub const ERR_CHAR_CLASS_VALUE_AT_END_OF_RANGE: i32 = -118;
pub const ERR_STREAM_IN_FORWARD_CASE_SECTION: i32 = -119;

// Reference errors
pub const ERR_DANGLING_BACKREF: i32 = -200;

// Encoding errors
pub const ERR_UNREPRESENTABLE_CODE_POINT: i32 = -300;

// Limit errors (-400..-499)
pub const ERR_TOO_LONG_WORD: i32 = -400;
pub const ERR_TOO_MANY_CASE_CHARS: i32 = -401;
pub const ERR_UNBOUNDED_REPEAT: i32 = -402;
pub const ERR_TOO_MANY_COMBINATIONS: i32 = -403;

/// Return the message template for an error code.
pub fn error_code_to_format(code: i32) -> &'static str {
    match code {
        ERR_UNMATCHED_CLOSE_PARENTHESIS => "unmatched close parenthesis",
        ERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS => "end pattern with unmatched parenthesis",
        ERR_END_PATTERN_AT_LEFT_BRACKET => "end pattern at left bracket",
        ERR_EMPTY_CHAR_CLASS => "empty char-class",
        ERR_PREMATURE_END_OF_CHAR_CLASS => "premature end of char-class",
        ERR_END_PATTERN_AT_ESCAPE => "end pattern at escape",
        ERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED => {
            "target of repeat operator is not specified"
        }
        ERR_NESTED_REPEAT_OPERATOR => "nested repeat operator",
        ERR_INVALID_REPEAT_RANGE_PATTERN => "invalid repeat range {lower,upper}",
        ERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE => {
            "upper is smaller than lower in repeat range"
        }
        ERR_TOO_BIG_NUMBER => "too big number",
        ERR_EMPTY_RANGE_IN_CHAR_CLASS => "empty range in char class",
        ERR_UNDEFINED_GROUP_OPTION => "undefined group option",
        ERR_INVALID_CODE_POINT_VALUE => "invalid code point value",
        ERR_INVALID_BACKREF => "invalid backref: group refers to itself",
        ERR_STREAM_NOT_CONFIGURED => "stream reference without a word source",
        ERR_STREAM_REPEATED => "stream reference cannot be repeated",
        ERR_PARSE_DEPTH_LIMIT_OVER => "parse depth limit over",
        ERR_CHAR_CLASS_VALUE_AT_END_OF_RANGE => "char-class value at end of range",
        ERR_STREAM_IN_FORWARD_CASE_SECTION => {
            "case-insensitive section reads a later group and a word source"
        }
        ERR_DANGLING_BACKREF => "reference to undefined group",
        ERR_UNREPRESENTABLE_CODE_POINT => "code point not representable in charset",
        ERR_TOO_LONG_WORD => "generated word exceeds maximum length",
        ERR_TOO_MANY_CASE_CHARS => "too many case-mutable characters in case-insensitive group",
        ERR_UNBOUNDED_REPEAT => "unbounded repetition requires a repeat limit",
        ERR_TOO_MANY_COMBINATIONS => "number of combinations exceeds limit",
        _ => "undefined error code",
    }
}

#[inline]
pub fn is_syntax_error(code: i32) -> bool {
    (-199..=-100).contains(&code)
}

#[inline]
pub fn is_limit_error(code: i32) -> bool {
    (-499..=-400).contains(&code)
}

/// Error type for parsing and generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// Malformed pattern. `position` is the offset in decoded characters.
    Syntax {
        code: i32,
        position: usize,
        message: String,
    },
    /// Back-reference to a group id that never appears in the pattern.
    DanglingReference { group: u32 },
    /// A codepoint has no representation in the output charset.
    Encoding { codepoint: u32, charset: Charset },
    /// A configured length or combination bound was exceeded.
    LengthLimit { code: i32, message: String },
}

impl GenError {
    pub(crate) fn syntax(code: i32, position: usize) -> Self {
        GenError::Syntax {
            code,
            position,
            message: error_code_to_format(code).to_string(),
        }
    }

    pub(crate) fn limit(code: i32, detail: impl fmt::Display) -> Self {
        GenError::LengthLimit {
            code,
            message: format!("{} ({})", error_code_to_format(code), detail),
        }
    }

    /// Returns the numeric error code.
    pub fn code(&self) -> i32 {
        match self {
            GenError::Syntax { code, .. } => *code,
            GenError::DanglingReference { .. } => ERR_DANGLING_BACKREF,
            GenError::Encoding { .. } => ERR_UNREPRESENTABLE_CODE_POINT,
            GenError::LengthLimit { code, .. } => *code,
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Syntax {
                position, message, ..
            } => write!(f, "syntax error at position {}: {}", position, message),
            GenError::DanglingReference { group } => {
                write!(f, "reference to undefined group {}", group)
            }
            GenError::Encoding { codepoint, charset } => write!(
                f,
                "encoding error: U+{:04X} cannot be represented in {}",
                codepoint,
                charset.name()
            ),
            GenError::LengthLimit { message, .. } => write!(f, "limit exceeded: {}", message),
        }
    }
}

impl std::error::Error for GenError {}

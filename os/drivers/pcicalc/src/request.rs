//! The `A+B<terminator>` request grammar.
//!
//! Parsing happens in two passes over the caller's bytes. [`scan`] finds
//! the operand spans without looking at their values; [`ParsedRequest::parse`]
//! then converts each span to an `i64`. Nothing is written anywhere until
//! both operands have converted.

use crate::error::{Operand, SyntaxError};
use core::num::IntErrorKind;
use core::ops::Range;

pub const OPERATOR: u8 = b'+';
pub const SIGN: u8 = b'-';

/// Byte ranges of a request, all within the scanned input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpans {
    pub a: Range<usize>,
    pub b: Range<usize>,
    /// Index of the byte that ended operand B. Discarded, as is everything after it.
    pub terminator: usize,
}

/// Locate both operands.
///
/// A `-` is accepted only as the first byte of an operand. The first `+`
/// is the operator; the first byte after it that is neither a digit nor a
/// leading sign is the terminator.
///
/// # Errors
/// [`SyntaxError::MissingOperator`] if a non-digit turns up before any `+`
/// or the input is empty, [`SyntaxError::MissingTerminator`] if the input
/// runs out after the operator.
pub fn scan(input: &[u8]) -> Result<RequestSpans, SyntaxError> {
    let mut operator = None;
    let mut operand_start = 0;

    for (i, &byte) in input.iter().enumerate() {
        if byte.is_ascii_digit() || (byte == SIGN && i == operand_start) {
            continue;
        }
        match operator {
            None if byte == OPERATOR => {
                operator = Some(i);
                operand_start = i + 1;
            }
            None => return Err(SyntaxError::MissingOperator),
            Some(op) => {
                return Ok(RequestSpans {
                    a: 0..op,
                    b: op + 1..i,
                    terminator: i,
                });
            }
        }
    }

    Err(match operator {
        Some(_) => SyntaxError::MissingTerminator,
        None => SyntaxError::MissingOperator,
    })
}

/// The two operands of an addition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRequest {
    pub operand_a: i64,
    pub operand_b: i64,
}

impl ParsedRequest {
    /// # Errors
    /// Any [`SyntaxError`]; see [`scan`] for the structural ones.
    pub fn parse(input: &[u8]) -> Result<Self, SyntaxError> {
        let spans = scan(input)?;
        Ok(Self {
            operand_a: parse_operand(&input[spans.a], Operand::A)?,
            operand_b: parse_operand(&input[spans.b], Operand::B)?,
        })
    }
}

fn parse_operand(text: &[u8], which: Operand) -> Result<i64, SyntaxError> {
    if matches!(text, [] | [SIGN]) {
        return Err(SyntaxError::MalformedOperand(which));
    }
    let text = core::str::from_utf8(text).map_err(|_| SyntaxError::MalformedOperand(which))?;
    text.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            SyntaxError::OperandOutOfRange(which)
        }
        _ => SyntaxError::MalformedOperand(which),
    })
}

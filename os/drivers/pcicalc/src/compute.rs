use crate::request::ParsedRequest;
use crate::result_store::ResultBuffer;

/// Longest rendering: `-9223372036854775808\n`.
pub const MAX_RENDERED: usize = 21;

/// Two's-complement sum; overflow wraps.
#[must_use]
pub const fn compute(a: i64, b: i64) -> i64 {
    a.wrapping_add(b)
}

/// Decimal text of a value followed by a newline.
pub struct Rendered {
    bytes: [u8; MAX_RENDERED],
    start: usize,
}

impl Rendered {
    #[must_use]
    pub fn new(value: i64) -> Self {
        let mut bytes = [0; MAX_RENDERED];
        let mut pos = MAX_RENDERED - 1;
        bytes[pos] = b'\n';

        let mut rest = value.unsigned_abs();
        loop {
            pos -= 1;
            #[allow(clippy::cast_possible_truncation)]
            let digit = (rest % 10) as u8;
            bytes[pos] = b'0' + digit;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        if value < 0 {
            pos -= 1;
            bytes[pos] = b'-';
        }

        Self { bytes, start: pos }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[self.start..]
    }
}

/// Add the operands and store the rendered sum.
pub fn apply(request: &ParsedRequest, store: &mut ResultBuffer) -> i64 {
    let sum = compute(request.operand_a, request.operand_b);
    store.replace(Rendered::new(sum).as_bytes());
    sum
}

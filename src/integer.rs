//! Arithmetic integer decoding (T.88 Annex A).
//!
//! Each decoding procedure of the symbol dictionary (IADH, IADW, IAEX, ...)
//! owns one [`IntDecoder`] with its own 512-entry context bank, reused across
//! every invocation of that procedure within a segment. Symbol IDs use the
//! fixed-width [`IdDecoder`] instead.

use crate::arithmetic::{ArithmeticDecoder, Context};

/// The IAx integer arithmetic decoding procedure (A.2).
pub(crate) struct IntDecoder {
    contexts: Vec<Context>,
}

impl IntDecoder {
    pub(crate) fn new() -> Self {
        Self {
            contexts: vec![Context::default(); 512],
        }
    }

    /// Decode one signed integer, or `None` for the OOB value.
    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Option<i32> {
        // PREV starts at 1 and accumulates decoded bits as the context label,
        // saturating to 9 bits (A.2, Figure A.1).
        let mut prev = 1_u32;

        let mut read_bit = |decoder: &mut ArithmeticDecoder<'_>| {
            let bit = decoder.decode_bit(&mut self.contexts[prev as usize]);
            prev = if prev < 256 {
                (prev << 1) | bit
            } else {
                (((prev << 1) | bit) & 511) | 256
            };
            bit
        };

        let sign = read_bit(decoder);

        let (num_bits, offset) = if read_bit(decoder) == 0 {
            (2, 0)
        } else if read_bit(decoder) == 0 {
            (4, 4)
        } else if read_bit(decoder) == 0 {
            (6, 20)
        } else if read_bit(decoder) == 0 {
            (8, 84)
        } else if read_bit(decoder) == 0 {
            (12, 340)
        } else {
            (32, 4436)
        };

        let mut value = 0_u32;
        for _ in 0..num_bits {
            value = (value << 1) | read_bit(decoder);
        }
        let value = value.wrapping_add(offset);

        if sign == 1 {
            // A negative zero is the OOB value (A.2 step 6).
            if value == 0 {
                None
            } else {
                Some((value as i32).wrapping_neg())
            }
        } else {
            Some(value as i32)
        }
    }
}

/// The IAID symbol ID decoding procedure (A.3).
///
/// Decodes a fixed-width unsigned symbol ID; the width (`SYMCODELEN`) is set
/// once when the symbol list size is known.
pub(crate) struct IdDecoder {
    contexts: Vec<Context>,
    code_len: u32,
}

impl IdDecoder {
    pub(crate) fn new(code_len: u32) -> Self {
        Self {
            contexts: vec![Context::default(); 1 << (code_len + 1)],
            code_len,
        }
    }

    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> u32 {
        let mut prev = 1_u32;

        for _ in 0..self.code_len {
            let bit = decoder.decode_bit(&mut self.contexts[prev as usize]);
            prev = (prev << 1) | bit;
        }

        prev - (1 << self.code_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Past the end of its data the arithmetic decoder feeds marker padding,
    // so a short stream still decodes to a known value.

    #[test]
    fn integer_decoding_on_padding_is_deterministic() {
        let mut decoder = ArithmeticDecoder::new(&[]);
        let mut int = IntDecoder::new();
        assert_eq!(int.decode(&mut decoder), Some(-2400));
    }

    #[test]
    fn negative_zero_is_out_of_band() {
        // This stream decodes the bits 1, 0, 0, 0: a negative sign, the
        // two-bit value class, and the value zero.
        let mut decoder = ArithmeticDecoder::new(&[0xD5, 0x00]);
        let mut int = IntDecoder::new();
        assert_eq!(int.decode(&mut decoder), None);
    }

    #[test]
    fn id_decoding_is_fixed_width() {
        let mut decoder = ArithmeticDecoder::new(&[]);
        let mut id = IdDecoder::new(2);
        // Two one-bits off the padding.
        assert_eq!(id.decode(&mut decoder), 3);
    }
}

//! The MQ arithmetic decoder (T.88 Annex E).
//!
//! The decoder consumes an arithmetically coded byte sequence and, given a
//! sequence of context labels, reconstructs the original binary symbols one
//! bit per call. All state lives in the decoder itself plus one [`Context`]
//! cell per context label; both carry forward across calls and must never be
//! reset in the middle of a coded stream.

/// Adaptive state for a single coding context (E.2.4).
///
/// Each context pairs a probability-estimate index into the Qe table with the
/// current sense of the more probable symbol.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Context {
    index: u8,
    mps: u8,
}

/// MQ decoder state (E.3, Table E.1).
pub(crate) struct ArithmeticDecoder<'a> {
    data: &'a [u8],
    /// The C-register; Chigh is the upper 16 bits.
    c: u32,
    /// The A-register (interval size).
    a: u32,
    /// BP, the index of the byte most recently fed into C.
    bp: usize,
    /// CT, the count of bits left before the next BYTEIN.
    ct: u32,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Create a decoder and run INITDEC (E.3.5, Figure G.1).
    pub(crate) fn new(data: &'a [u8]) -> Self {
        let mut decoder = Self {
            data,
            c: 0,
            a: 0,
            bp: 0,
            ct: 0,
        };

        decoder.c = (u32::from(decoder.byte_at(0)) ^ 0xFF) << 16;
        decoder.byte_in();
        decoder.c <<= 7;
        decoder.ct -= 7;
        decoder.a = 0x8000;

        decoder
    }

    /// The number of input bytes fed into the C-register so far.
    ///
    /// Used by the Huffman refinement path to cross-check an embedded
    /// region's declared byte size.
    pub(crate) fn bytes_read(&self) -> usize {
        self.bp + 1
    }

    /// Decode one bit with the given context (the DECODE procedure,
    /// E.3.2, Figure G.2).
    #[inline(always)]
    pub(crate) fn decode_bit(&mut self, cx: &mut Context) -> u32 {
        let (qe, nmps, nlps, switch) = QE_TABLE[cx.index as usize];
        let qe = u32::from(qe);

        self.a -= qe;

        if (self.c >> 16) < self.a {
            if self.a & 0x8000 != 0 {
                return u32::from(cx.mps);
            }

            // MPS_EXCHANGE (Figure E.16).
            let d = if self.a < qe {
                let d = 1 - cx.mps;
                if switch {
                    cx.mps = 1 - cx.mps;
                }
                cx.index = nlps;
                d
            } else {
                let d = cx.mps;
                cx.index = nmps;
                d
            };
            self.renormalize();
            u32::from(d)
        } else {
            self.c -= self.a << 16;

            // LPS_EXCHANGE (Figure E.17).
            let d = if self.a < qe {
                let d = cx.mps;
                cx.index = nmps;
                d
            } else {
                let d = 1 - cx.mps;
                if switch {
                    cx.mps = 1 - cx.mps;
                }
                cx.index = nlps;
                d
            };
            self.a = qe;
            self.renormalize();
            u32::from(d)
        }
    }

    /// The RENORMD procedure (E.3.3, Figure E.18).
    #[inline(always)]
    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.byte_in();
            }

            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// The BYTEIN procedure (E.3.4, Figure G.3).
    ///
    /// Compensates for the stuff bit following any 0xFF byte. Past the end
    /// of the data, or once a marker code is seen, the stream behaves as an
    /// endless run of 0xFF bytes.
    #[inline(always)]
    fn byte_in(&mut self) {
        if self.byte_at(self.bp) == 0xFF {
            if self.byte_at(self.bp + 1) > 0x8F {
                // Marker code: do not advance, feed 1-bits forever.
                self.ct = 8;
            } else {
                self.bp += 1;
                self.c = self
                    .c
                    .wrapping_add(0xFE00)
                    .wrapping_sub(u32::from(self.byte_at(self.bp)) << 9);
                self.ct = 7;
            }
        } else {
            self.bp += 1;
            self.c = self
                .c
                .wrapping_add(0xFF00)
                .wrapping_sub(u32::from(self.byte_at(self.bp)) << 8);
            self.ct = 8;
        }
    }

    #[inline(always)]
    fn byte_at(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0xFF)
    }
}

/// "Table E.1 – Qe values and probability estimation process":
/// (Qe, NMPS, NLPS, SWITCH) per index.
#[rustfmt::skip]
const QE_TABLE: [(u16, u8, u8, bool); 47] = [
    (0x5601,  1,  1, true),
    (0x3401,  2,  6, false),
    (0x1801,  3,  9, false),
    (0x0AC1,  4, 12, false),
    (0x0521,  5, 29, false),
    (0x0221, 38, 33, false),
    (0x5601,  7,  6, true),
    (0x5401,  8, 14, false),
    (0x4801,  9, 14, false),
    (0x3801, 10, 14, false),
    (0x3001, 11, 17, false),
    (0x2401, 12, 18, false),
    (0x1C01, 13, 20, false),
    (0x1601, 29, 21, false),
    (0x5601, 15, 14, true),
    (0x5401, 16, 14, false),
    (0x5101, 17, 15, false),
    (0x4801, 18, 16, false),
    (0x3801, 19, 17, false),
    (0x3401, 20, 18, false),
    (0x3001, 21, 19, false),
    (0x2801, 22, 19, false),
    (0x2401, 23, 20, false),
    (0x2201, 24, 21, false),
    (0x1C01, 25, 22, false),
    (0x1801, 26, 23, false),
    (0x1601, 27, 24, false),
    (0x1401, 28, 25, false),
    (0x1201, 29, 26, false),
    (0x1101, 30, 27, false),
    (0x0AC1, 31, 28, false),
    (0x09C1, 32, 29, false),
    (0x08A1, 33, 30, false),
    (0x0521, 34, 31, false),
    (0x0441, 35, 32, false),
    (0x02A1, 36, 33, false),
    (0x0221, 37, 34, false),
    (0x0141, 38, 35, false),
    (0x0111, 39, 36, false),
    (0x0085, 40, 37, false),
    (0x0049, 41, 38, false),
    (0x0025, 42, 39, false),
    (0x0015, 43, 40, false),
    (0x0009, 44, 41, false),
    (0x0005, 45, 42, false),
    (0x0001, 45, 43, false),
    (0x5601, 46, 46, false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_past_end_is_deterministic() {
        // With no input at all, INITDEC sees the marker padding and the
        // C-register stays zero, so the decoded bits depend only on the
        // interval subdivision.
        let mut decoder = ArithmeticDecoder::new(&[]);
        let bits: Vec<u32> = (0..6)
            .map(|_| decoder.decode_bit(&mut Context::default()))
            .collect();

        assert_eq!(bits, [1, 1, 1, 1, 1, 0]);
        // The padding never advances past the (virtual) first byte.
        assert_eq!(decoder.bytes_read(), 1);
    }

    #[test]
    fn byte_in_consumes_stuffed_bytes() {
        // A 0xFF data byte followed by a non-marker byte is a stuff bit,
        // not padding: BYTEIN advances past it.
        let mut decoder = ArithmeticDecoder::new(&[0xFF, 0x00, 0x00]);
        assert_eq!(decoder.bytes_read(), 2);
    }
}

//! A cursor for reading bits and bytes from a segment's data.

/// A sequential MSB-first bit reader over a byte slice.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    /// Index of the next byte to read from.
    byte: usize,
    /// Number of bits of `data[byte]` that have already been consumed (0-7).
    bit: u8,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte: 0,
            bit: 0,
        }
    }

    /// Skip any bits remaining in the current byte.
    pub(crate) fn align(&mut self) {
        if self.bit != 0 {
            self.bit = 0;
            self.byte += 1;
        }
    }

    /// The position of the cursor in bytes, rounding partially read bytes up.
    pub(crate) fn byte_pos(&self) -> usize {
        self.byte + usize::from(self.bit != 0)
    }

    /// The remaining data starting at the current (rounded-up) byte position.
    pub(crate) fn tail(&self) -> Option<&'a [u8]> {
        self.data.get(self.byte_pos()..)
    }

    /// Read a single bit.
    pub(crate) fn read_bit(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.byte)?;
        let bit = (byte >> (7 - self.bit)) & 1;

        self.bit += 1;
        if self.bit == 8 {
            self.bit = 0;
            self.byte += 1;
        }

        Some(bit)
    }

    /// Read up to 32 bits, MSB first.
    pub(crate) fn read_bits(&mut self, count: u8) -> Option<u32> {
        debug_assert!(count <= 32);

        let mut value = 0_u64;
        let mut remaining = count;

        while remaining > 0 {
            let byte = u64::from(*self.data.get(self.byte)?);
            let available = 8 - self.bit;
            let take = remaining.min(available);

            let bits = (byte >> (available - take)) & ((1 << take) - 1);
            value = (value << take) | bits;

            self.bit += take;
            if self.bit == 8 {
                self.bit = 0;
                self.byte += 1;
            }

            remaining -= take;
        }

        Some(value as u32)
    }

    /// Read a single byte. The reader must be byte-aligned.
    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        debug_assert_eq!(self.bit, 0);

        let byte = *self.data.get(self.byte)?;
        self.byte += 1;

        Some(byte)
    }

    /// Read the given number of bytes. The reader must be byte-aligned.
    pub(crate) fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        debug_assert_eq!(self.bit, 0);

        let end = self.byte.checked_add(len)?;
        let bytes = self.data.get(self.byte..end)?;
        self.byte = end;

        Some(bytes)
    }

    /// Skip the given number of bytes. The reader must be byte-aligned.
    pub(crate) fn skip_bytes(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a big-endian u16. The reader must be byte-aligned.
    pub(crate) fn read_u16(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes(self.read_bytes(2)?.try_into().ok()?))
    }

    /// Read a big-endian u32. The reader must be byte-aligned.
    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_be_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    /// Read a big-endian i32. The reader must be byte-aligned.
    pub(crate) fn read_i32(&mut self) -> Option<i32> {
        Some(i32::from_be_bytes(self.read_bytes(4)?.try_into().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_msb_first() {
        let mut reader = Reader::new(&[0b1011_0100, 0xFF]);
        assert_eq!(reader.read_bit(), Some(1));
        assert_eq!(reader.read_bit(), Some(0));
        assert_eq!(reader.read_bits(3), Some(0b110));
        assert_eq!(reader.read_bits(5), Some(0b100_11));
    }

    #[test]
    fn align_skips_partial_byte() {
        let mut reader = Reader::new(&[0xAB, 0xCD]);
        assert_eq!(reader.read_bits(3), Some(0b101));
        reader.align();
        assert_eq!(reader.read_byte(), Some(0xCD));
        assert_eq!(reader.read_byte(), None);
    }

    #[test]
    fn align_is_idempotent() {
        let mut reader = Reader::new(&[0xAB, 0xCD]);
        reader.align();
        reader.align();
        assert_eq!(reader.read_byte(), Some(0xAB));
    }

    #[test]
    fn eof_is_none() {
        let mut reader = Reader::new(&[0x80]);
        assert_eq!(reader.read_bits(8), Some(0x80));
        assert_eq!(reader.read_bit(), None);
        assert_eq!(reader.read_u16(), None);
    }

    #[test]
    fn multi_byte_reads() {
        let mut reader = Reader::new(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(reader.read_u16(), Some(0x1234));
        assert_eq!(reader.read_u32(), Some(0x5678_9ABC));
    }
}

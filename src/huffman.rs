//! Huffman table assignment and decoding (T.88 Annex B).

use std::sync::LazyLock;

use crate::error::{DecodeError, HuffmanError, ParseError, Result, bail};
use crate::reader::Reader;

/// One line of a Huffman table (B.1).
///
/// A line pairs a prefix code with a value range. Besides plain ranges there
/// are the 32-bit lower and upper range lines extending towards negative and
/// positive infinity, and the out-of-band line carrying no value at all.
#[derive(Debug, Clone, Copy)]
struct TableLine {
    prefix_length: u8,
    /// Assigned by `assign_codes`.
    code: u32,
    kind: LineKind,
}

#[derive(Debug, Clone, Copy)]
enum LineKind {
    /// `range_length` further bits added to `range_low`.
    Plain { range_length: u8, range_low: i32 },
    /// The lower range line: 32 further bits subtracted from `range_low`.
    Lower { range_low: i32 },
    /// The upper range line: 32 further bits added to `range_low`.
    Upper { range_low: i32 },
    /// The out-of-band line.
    Oob,
}

impl TableLine {
    const fn new(prefix_length: u8, range_length: u8, range_low: i32) -> Self {
        Self {
            prefix_length,
            code: 0,
            kind: LineKind::Plain {
                range_length,
                range_low,
            },
        }
    }

    const fn lower(prefix_length: u8, range_low: i32) -> Self {
        Self {
            prefix_length,
            code: 0,
            kind: LineKind::Lower { range_low },
        }
    }

    const fn upper(prefix_length: u8, range_low: i32) -> Self {
        Self {
            prefix_length,
            code: 0,
            kind: LineKind::Upper { range_low },
        }
    }

    const fn oob(prefix_length: u8) -> Self {
        Self {
            prefix_length,
            code: 0,
            kind: LineKind::Oob,
        }
    }
}

/// A prefix-code table mapping bit sequences to integers (T.88 Annex B).
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    lines: Vec<TableLine>,
    max_prefix_length: u8,
}

impl HuffmanTable {
    fn from_lines(lines: Vec<TableLine>) -> Self {
        let mut table = Self {
            max_prefix_length: lines.iter().map(|l| l.prefix_length).max().unwrap_or(0),
            lines,
        };
        table.assign_codes();

        table
    }

    /// Assign canonical prefix codes to all lines (the procedure in B.3).
    fn assign_codes(&mut self) {
        let max_len = usize::from(self.max_prefix_length);

        let mut count = vec![0_u32; max_len + 1];
        for line in &self.lines {
            count[usize::from(line.prefix_length)] += 1;
        }
        count[0] = 0;

        let mut first_code = 0_u32;
        for len in 1..=max_len {
            first_code = (first_code + count[len - 1]) << 1;

            let mut code = first_code;
            for line in &mut self.lines {
                if usize::from(line.prefix_length) == len {
                    line.code = code;
                    code += 1;
                }
            }
        }
    }

    /// Read a user-supplied table from a table segment's data (B.2).
    pub fn from_segment(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        Self::read(&mut reader)
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
        let has_oob = flags & 1 != 0;
        let prefix_size = ((flags >> 1) & 0x7) + 1;
        let range_size = ((flags >> 4) & 0x7) + 1;

        let low = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;
        let high = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;

        let mut lines = Vec::new();
        // The range progression runs in i64: a line of 31 range bits steps
        // past i32 on its way to HTHIGH.
        let mut cur_low = i64::from(low);

        while cur_low < i64::from(high) {
            let prefix_length = reader
                .read_bits(prefix_size)
                .ok_or(ParseError::UnexpectedEof)? as u8;
            let range_length = reader
                .read_bits(range_size)
                .ok_or(ParseError::UnexpectedEof)? as u8;

            lines.push(TableLine::new(prefix_length, range_length, cur_low as i32));

            // A 32-bit range line covers everything up to `high`.
            if range_length >= 32 {
                break;
            }

            cur_low += 1_i64 << range_length;
        }

        let lower_length = reader
            .read_bits(prefix_size)
            .ok_or(ParseError::UnexpectedEof)? as u8;
        // The lower line covers values below HTLOW, so an HTLOW with
        // nothing below it leaves that line nothing to represent.
        let lower_low = low.checked_sub(1).ok_or(DecodeError::Overflow)?;
        lines.push(TableLine::lower(lower_length, lower_low));

        let upper_length = reader
            .read_bits(prefix_size)
            .ok_or(ParseError::UnexpectedEof)? as u8;
        lines.push(TableLine::upper(upper_length, high));

        if has_oob {
            let oob_length = reader
                .read_bits(prefix_size)
                .ok_or(ParseError::UnexpectedEof)? as u8;
            lines.push(TableLine::oob(oob_length));
        }

        // Zero-length prefixes are unused lines and never match.
        lines.retain(|l| l.prefix_length > 0);

        if lines.is_empty() {
            bail!(HuffmanError::InvalidCode);
        }

        Ok(Self::from_lines(lines))
    }

    /// Decode one value (the procedure in B.4). `Ok(None)` is the OOB value.
    pub(crate) fn decode(&self, reader: &mut Reader<'_>) -> Result<Option<i32>> {
        let mut code = 0_u32;

        for len in 1..=self.max_prefix_length {
            let bit = reader.read_bit().ok_or(ParseError::UnexpectedEof)?;
            code = (code << 1) | u32::from(bit);

            for line in &self.lines {
                if line.prefix_length == len && line.code == code {
                    return self.read_range(reader, line);
                }
            }
        }

        bail!(HuffmanError::InvalidCode)
    }

    /// Like [`Self::decode`], but OOB is an error.
    pub(crate) fn decode_value(&self, reader: &mut Reader<'_>) -> Result<i32> {
        self.decode(reader)?
            .ok_or_else(|| HuffmanError::UnexpectedOob.into())
    }

    fn read_range(&self, reader: &mut Reader<'_>, line: &TableLine) -> Result<Option<i32>> {
        match line.kind {
            LineKind::Plain {
                range_length,
                range_low,
            } => {
                let offset = reader
                    .read_bits(range_length)
                    .ok_or(ParseError::UnexpectedEof)?;

                Ok(Some(range_low.wrapping_add(offset as i32)))
            }
            LineKind::Lower { range_low } => {
                let offset = reader.read_bits(32).ok_or(ParseError::UnexpectedEof)?;

                Ok(Some(range_low.wrapping_sub(offset as i32)))
            }
            LineKind::Upper { range_low } => {
                let offset = reader.read_bits(32).ok_or(ParseError::UnexpectedEof)?;

                Ok(Some(range_low.wrapping_add(offset as i32)))
            }
            LineKind::Oob => Ok(None),
        }
    }
}

macro_rules! standard_table {
    ($name:ident, [$($line:expr),+ $(,)?]) => {
        static $name: LazyLock<HuffmanTable> =
            LazyLock::new(|| HuffmanTable::from_lines(vec![$($line),+]));
    };
}

// The standard tables B.1 to B.15.

standard_table!(TABLE_B1, [
    TableLine::new(1, 4, 0),
    TableLine::new(2, 8, 16),
    TableLine::new(3, 16, 272),
    TableLine::upper(3, 65808),
]);

standard_table!(TABLE_B2, [
    TableLine::new(1, 0, 0),
    TableLine::new(2, 0, 1),
    TableLine::new(3, 0, 2),
    TableLine::new(4, 3, 3),
    TableLine::new(5, 6, 11),
    TableLine::upper(6, 75),
    TableLine::oob(6),
]);

standard_table!(TABLE_B3, [
    TableLine::new(8, 8, -256),
    TableLine::new(1, 0, 0),
    TableLine::new(2, 0, 1),
    TableLine::new(3, 0, 2),
    TableLine::new(4, 3, 3),
    TableLine::new(5, 6, 11),
    TableLine::lower(8, -257),
    TableLine::upper(7, 75),
    TableLine::oob(6),
]);

standard_table!(TABLE_B4, [
    TableLine::new(1, 0, 1),
    TableLine::new(2, 0, 2),
    TableLine::new(3, 0, 3),
    TableLine::new(4, 3, 4),
    TableLine::new(5, 6, 12),
    TableLine::upper(5, 76),
]);

standard_table!(TABLE_B5, [
    TableLine::new(7, 8, -255),
    TableLine::new(1, 0, 1),
    TableLine::new(2, 0, 2),
    TableLine::new(3, 0, 3),
    TableLine::new(4, 3, 4),
    TableLine::new(5, 6, 12),
    TableLine::lower(7, -256),
    TableLine::upper(6, 76),
]);

standard_table!(TABLE_B6, [
    TableLine::new(5, 10, -2048),
    TableLine::new(4, 9, -1024),
    TableLine::new(4, 8, -512),
    TableLine::new(4, 7, -256),
    TableLine::new(5, 6, -128),
    TableLine::new(5, 5, -64),
    TableLine::new(4, 5, -32),
    TableLine::new(2, 7, 0),
    TableLine::new(3, 7, 128),
    TableLine::new(3, 8, 256),
    TableLine::new(4, 9, 512),
    TableLine::new(4, 10, 1024),
    TableLine::lower(6, -2049),
    TableLine::upper(6, 2048),
]);

standard_table!(TABLE_B7, [
    TableLine::new(4, 9, -1024),
    TableLine::new(3, 8, -512),
    TableLine::new(4, 7, -256),
    TableLine::new(5, 6, -128),
    TableLine::new(5, 5, -64),
    TableLine::new(4, 5, -32),
    TableLine::new(4, 5, 0),
    TableLine::new(5, 5, 32),
    TableLine::new(5, 6, 64),
    TableLine::new(4, 7, 128),
    TableLine::new(3, 8, 256),
    TableLine::new(3, 9, 512),
    TableLine::new(3, 10, 1024),
    TableLine::lower(5, -1025),
    TableLine::upper(5, 2048),
]);

standard_table!(TABLE_B8, [
    TableLine::new(8, 3, -15),
    TableLine::new(9, 1, -7),
    TableLine::new(8, 1, -5),
    TableLine::new(9, 0, -3),
    TableLine::new(7, 0, -2),
    TableLine::new(4, 0, -1),
    TableLine::new(2, 1, 0),
    TableLine::new(5, 0, 2),
    TableLine::new(6, 0, 3),
    TableLine::new(3, 4, 4),
    TableLine::new(6, 1, 20),
    TableLine::new(4, 4, 22),
    TableLine::new(4, 5, 38),
    TableLine::new(5, 6, 70),
    TableLine::new(5, 7, 134),
    TableLine::new(6, 7, 262),
    TableLine::new(7, 8, 390),
    TableLine::new(6, 10, 646),
    TableLine::lower(9, -16),
    TableLine::upper(9, 1670),
    TableLine::oob(2),
]);

standard_table!(TABLE_B9, [
    TableLine::new(8, 4, -31),
    TableLine::new(9, 2, -15),
    TableLine::new(8, 2, -11),
    TableLine::new(9, 1, -7),
    TableLine::new(7, 1, -5),
    TableLine::new(4, 1, -3),
    TableLine::new(3, 1, -1),
    TableLine::new(3, 1, 1),
    TableLine::new(5, 1, 3),
    TableLine::new(6, 1, 5),
    TableLine::new(3, 5, 7),
    TableLine::new(6, 2, 39),
    TableLine::new(4, 5, 43),
    TableLine::new(4, 6, 75),
    TableLine::new(5, 7, 139),
    TableLine::new(5, 8, 267),
    TableLine::new(6, 8, 523),
    TableLine::new(7, 9, 779),
    TableLine::new(6, 11, 1291),
    TableLine::lower(9, -32),
    TableLine::upper(9, 3339),
    TableLine::oob(2),
]);

standard_table!(TABLE_B10, [
    TableLine::new(7, 4, -21),
    TableLine::new(8, 0, -5),
    TableLine::new(7, 0, -4),
    TableLine::new(5, 0, -3),
    TableLine::new(2, 2, -2),
    TableLine::new(5, 0, 2),
    TableLine::new(6, 0, 3),
    TableLine::new(7, 0, 4),
    TableLine::new(8, 0, 5),
    TableLine::new(2, 6, 6),
    TableLine::new(5, 5, 70),
    TableLine::new(6, 5, 102),
    TableLine::new(7, 6, 134),
    TableLine::new(8, 7, 198),
    TableLine::new(9, 8, 326),
    TableLine::new(9, 9, 582),
    TableLine::new(9, 10, 1094),
    TableLine::new(10, 11, 2118),
    TableLine::lower(9, -22),
    TableLine::upper(9, 4166),
    TableLine::oob(2),
]);

standard_table!(TABLE_B11, [
    TableLine::new(1, 0, 1),
    TableLine::new(2, 1, 2),
    TableLine::new(4, 0, 4),
    TableLine::new(4, 1, 5),
    TableLine::new(5, 1, 7),
    TableLine::new(5, 2, 9),
    TableLine::new(6, 2, 13),
    TableLine::new(7, 2, 17),
    TableLine::new(7, 3, 21),
    TableLine::new(7, 4, 29),
    TableLine::new(7, 5, 45),
    TableLine::new(7, 6, 77),
    TableLine::upper(7, 141),
]);

standard_table!(TABLE_B12, [
    TableLine::new(1, 0, 1),
    TableLine::new(2, 0, 2),
    TableLine::new(3, 1, 3),
    TableLine::new(5, 0, 5),
    TableLine::new(5, 1, 6),
    TableLine::new(6, 1, 8),
    TableLine::new(7, 0, 10),
    TableLine::new(7, 1, 11),
    TableLine::new(7, 2, 13),
    TableLine::new(7, 3, 17),
    TableLine::new(7, 4, 25),
    TableLine::new(8, 5, 41),
    TableLine::upper(8, 73),
]);

standard_table!(TABLE_B13, [
    TableLine::new(1, 0, 1),
    TableLine::new(3, 0, 2),
    TableLine::new(4, 0, 3),
    TableLine::new(5, 0, 4),
    TableLine::new(4, 1, 5),
    TableLine::new(3, 3, 7),
    TableLine::new(6, 1, 15),
    TableLine::new(6, 2, 17),
    TableLine::new(6, 3, 21),
    TableLine::new(6, 4, 29),
    TableLine::new(6, 5, 45),
    TableLine::new(7, 6, 77),
    TableLine::upper(7, 141),
]);

standard_table!(TABLE_B14, [
    TableLine::new(3, 0, -2),
    TableLine::new(3, 0, -1),
    TableLine::new(1, 0, 0),
    TableLine::new(3, 0, 1),
    TableLine::new(3, 0, 2),
]);

standard_table!(TABLE_B15, [
    TableLine::new(7, 4, -24),
    TableLine::new(6, 2, -8),
    TableLine::new(5, 1, -4),
    TableLine::new(4, 0, -2),
    TableLine::new(3, 0, -1),
    TableLine::new(1, 0, 0),
    TableLine::new(3, 0, 1),
    TableLine::new(4, 0, 2),
    TableLine::new(5, 1, 3),
    TableLine::new(6, 2, 5),
    TableLine::new(7, 4, 9),
    TableLine::lower(7, -25),
    TableLine::upper(7, 25),
]);

/// A shared reference to one of the standard tables B.1 to B.15.
pub(crate) fn standard_table(number: u8) -> &'static HuffmanTable {
    match number {
        1 => &TABLE_B1,
        2 => &TABLE_B2,
        3 => &TABLE_B3,
        4 => &TABLE_B4,
        5 => &TABLE_B5,
        6 => &TABLE_B6,
        7 => &TABLE_B7,
        8 => &TABLE_B8,
        9 => &TABLE_B9,
        10 => &TABLE_B10,
        11 => &TABLE_B11,
        12 => &TABLE_B12,
        13 => &TABLE_B13,
        14 => &TABLE_B14,
        15 => &TABLE_B15,
        _ => unreachable!("standard table numbers are 1 to 15"),
    }
}

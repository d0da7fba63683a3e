//! The text region decoding procedure (T.88 §6.4).
//!
//! Only the decoding procedure itself lives here. The symbol dictionary
//! invokes it for aggregate symbol coding, handing it either its own
//! arithmetic decoder and integer contexts or, in Huffman mode, the raw
//! reader plus a fixed set of standard tables.

use crate::arithmetic::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{DecodeError, ParseError, Result, SymbolError, bail};
use crate::generic::AtPixel;
use crate::huffman::{HuffmanTable, standard_table};
use crate::integer::{IdDecoder, IntDecoder};
use crate::reader::Reader;
use crate::refinement::{RefinementTemplate, decode_refinement};

/// The corner of a symbol instance that its (S, T) coordinate addresses
/// (§6.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceCorner {
    BottomLeft,
    TopLeft,
    BottomRight,
    TopRight,
}

/// Parameters of one text region decode (Table 9).
pub(crate) struct TextParams<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) num_instances: u32,
    /// LOG2SBSTRIPS.
    pub(crate) log_strip_size: u8,
    pub(crate) reference_corner: ReferenceCorner,
    pub(crate) transposed: bool,
    pub(crate) default_pixel: bool,
    /// SBDSOFFSET.
    pub(crate) delta_s_offset: i32,
    /// SBREFINE.
    pub(crate) use_refinement: bool,
    pub(crate) refinement_template: RefinementTemplate,
    pub(crate) refinement_at: &'a [AtPixel],
}

impl TextParams<'_> {
    fn strip_size(&self) -> u32 {
        1 << self.log_strip_size
    }
}

/// Shared integer decoder state for text region decoding (§6.4.6 to
/// §6.4.11). The symbol dictionary owns one of these so that repeated
/// aggregate invocations share their coding history.
pub(crate) struct TextContexts {
    pub(crate) iadt: IntDecoder,
    pub(crate) iafs: IntDecoder,
    pub(crate) iads: IntDecoder,
    pub(crate) iait: IntDecoder,
    pub(crate) iaid: IdDecoder,
    pub(crate) iari: IntDecoder,
    pub(crate) iardw: IntDecoder,
    pub(crate) iardh: IntDecoder,
    pub(crate) iardx: IntDecoder,
    pub(crate) iardy: IntDecoder,
}

impl TextContexts {
    pub(crate) fn new(symbol_code_len: u32) -> Self {
        Self {
            iadt: IntDecoder::new(),
            iafs: IntDecoder::new(),
            iads: IntDecoder::new(),
            iait: IntDecoder::new(),
            iaid: IdDecoder::new(symbol_code_len),
            iari: IntDecoder::new(),
            iardw: IntDecoder::new(),
            iardh: IntDecoder::new(),
            iardx: IntDecoder::new(),
            iardy: IntDecoder::new(),
        }
    }
}

/// The Huffman tables a text region decode draws from (§7.4.3.1.6).
pub(crate) struct TextHuffmanTables<'a> {
    pub(crate) first_s: &'a HuffmanTable,
    pub(crate) delta_s: &'a HuffmanTable,
    pub(crate) delta_t: &'a HuffmanTable,
    pub(crate) refinement_width: &'a HuffmanTable,
    pub(crate) refinement_height: &'a HuffmanTable,
    pub(crate) refinement_x: &'a HuffmanTable,
    pub(crate) refinement_y: &'a HuffmanTable,
    pub(crate) refinement_size: &'a HuffmanTable,
}

impl TextHuffmanTables<'static> {
    /// The fixed table set used for aggregate symbol coding (§6.5.8.2.3):
    /// B.6, B.8 and B.11 for the coordinates, B.15 for the refinement
    /// deltas and B.1 for the embedded data size.
    pub(crate) fn aggregate() -> Self {
        Self {
            first_s: standard_table(6),
            delta_s: standard_table(8),
            delta_t: standard_table(11),
            refinement_width: standard_table(15),
            refinement_height: standard_table(15),
            refinement_x: standard_table(15),
            refinement_y: standard_table(15),
            refinement_size: standard_table(1),
        }
    }
}

/// The coding state a text region decode runs against.
pub(crate) enum DecodeContext<'a, 'b> {
    Huffman {
        reader: &'a mut Reader<'b>,
        tables: TextHuffmanTables<'a>,
        /// Symbol IDs are fixed-length codes of this many bits.
        symbol_code_len: u8,
    },
    Arithmetic {
        decoder: &'a mut ArithmeticDecoder<'b>,
        contexts: &'a mut TextContexts,
        gr_contexts: &'a mut [Context],
    },
}

impl DecodeContext<'_, '_> {
    /// Decode the strip delta T (§6.4.6), already scaled by the strip size.
    fn read_strip_delta_t(&mut self, strip_size: u32) -> Result<i32> {
        let delta = match self {
            Self::Huffman { reader, tables, .. } => tables.delta_t.decode_value(reader)?,
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts
                .iadt
                .decode(decoder)
                .ok_or(SymbolError::UnexpectedOob)?,
        };

        delta
            .checked_mul(strip_size as i32)
            .ok_or(DecodeError::Overflow)
    }

    /// Decode the first symbol instance S coordinate of a strip (§6.4.7).
    fn read_first_s(&mut self) -> Result<i32> {
        match self {
            Self::Huffman { reader, tables, .. } => tables.first_s.decode_value(reader),
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts
                .iafs
                .decode(decoder)
                .ok_or(SymbolError::UnexpectedOob.into()),
        }
    }

    /// Decode a subsequent S delta (§6.4.8); `None` ends the strip.
    fn read_delta_s(&mut self) -> Result<Option<i32>> {
        match self {
            Self::Huffman { reader, tables, .. } => tables.delta_s.decode(reader),
            Self::Arithmetic {
                decoder, contexts, ..
            } => Ok(contexts.iads.decode(decoder)),
        }
    }

    /// Decode a symbol instance T coordinate within the strip (§6.4.9).
    fn read_symbol_t(&mut self, log_strip_size: u8) -> Result<i32> {
        if log_strip_size == 0 {
            return Ok(0);
        }

        match self {
            Self::Huffman { reader, .. } => Ok(reader
                .read_bits(log_strip_size)
                .ok_or(ParseError::UnexpectedEof)? as i32),
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts
                .iait
                .decode(decoder)
                .ok_or(SymbolError::UnexpectedOob.into()),
        }
    }

    /// Decode a symbol ID (§6.4.10).
    fn read_symbol_id(&mut self) -> Result<usize> {
        match self {
            Self::Huffman {
                reader,
                symbol_code_len,
                ..
            } => Ok(reader
                .read_bits(*symbol_code_len)
                .ok_or(ParseError::UnexpectedEof)? as usize),
            Self::Arithmetic {
                decoder, contexts, ..
            } => Ok(contexts.iaid.decode(decoder) as usize),
        }
    }

    /// Decode the per-instance refinement indicator (§6.4.11).
    fn read_refinement_flag(&mut self) -> Result<bool> {
        match self {
            Self::Huffman { reader, .. } => {
                Ok(reader.read_bit().ok_or(ParseError::UnexpectedEof)? != 0)
            }
            Self::Arithmetic {
                decoder, contexts, ..
            } => Ok(contexts
                .iari
                .decode(decoder)
                .ok_or(SymbolError::UnexpectedOob)?
                != 0),
        }
    }

    fn read_refinement_delta(&mut self, which: RefinementField) -> Result<i32> {
        match self {
            Self::Huffman { reader, tables, .. } => match which {
                RefinementField::Width => tables.refinement_width.decode_value(reader),
                RefinementField::Height => tables.refinement_height.decode_value(reader),
                RefinementField::X => tables.refinement_x.decode_value(reader),
                RefinementField::Y => tables.refinement_y.decode_value(reader),
            },
            Self::Arithmetic {
                decoder, contexts, ..
            } => {
                let int_decoder = match which {
                    RefinementField::Width => &mut contexts.iardw,
                    RefinementField::Height => &mut contexts.iardh,
                    RefinementField::X => &mut contexts.iardx,
                    RefinementField::Y => &mut contexts.iardy,
                };
                int_decoder
                    .decode(decoder)
                    .ok_or(SymbolError::UnexpectedOob.into())
            }
        }
    }

    /// Decode the refinement bitmap for one instance, steps 5 to 7 of
    /// §6.4.11.
    fn decode_refinement_bitmap(
        &mut self,
        refined: &mut Bitmap,
        reference: &Bitmap,
        dx: i32,
        dy: i32,
        template: RefinementTemplate,
        at: &[AtPixel],
    ) -> Result<()> {
        match self {
            Self::Huffman { reader, tables, .. } => {
                let size = tables.refinement_size.decode_value(reader)?;
                let size = usize::try_from(size).map_err(|_| DecodeError::Overflow)?;
                reader.align();

                let data = reader.read_bytes(size).ok_or(ParseError::UnexpectedEof)?;

                // Embedded refinement data gets a decoder and context bank of
                // its own; it is a self-contained arithmetic stream.
                let mut decoder = ArithmeticDecoder::new(data);
                let mut contexts = vec![Context::default(); 1 << 13];

                decode_refinement(
                    refined,
                    reference,
                    dx,
                    dy,
                    &mut decoder,
                    &mut contexts,
                    template,
                    at,
                    false,
                );
            }
            Self::Arithmetic {
                decoder,
                gr_contexts,
                ..
            } => {
                decode_refinement(refined, reference, dx, dy, decoder, gr_contexts, template, at, false);
            }
        }

        Ok(())
    }
}

enum RefinementField {
    Width,
    Height,
    X,
    Y,
}

/// A symbol instance's bitmap: either a dictionary symbol or a refined copy.
enum InstanceBitmap {
    Shared(usize),
    Owned(Bitmap),
}

/// Decode a text region (§6.4, steps 1 to 10).
///
/// `symbols` may contain `None` slots for zero-size placeholder symbols; an
/// instance referencing one of those is invalid input.
pub(crate) fn decode_text_region(
    mut ctx: DecodeContext<'_, '_>,
    symbols: &[Option<&Bitmap>],
    params: &TextParams<'_>,
) -> Result<Bitmap> {
    let mut region = Bitmap::new(params.width, params.height)?;
    if params.default_pixel {
        region.fill(true);
    }

    let strip_size = params.strip_size();

    let mut strip_t = ctx
        .read_strip_delta_t(strip_size)?
        .checked_neg()
        .ok_or(DecodeError::Overflow)?;
    let mut first_s: i32 = 0;
    let mut instance_count = 0;

    while instance_count < params.num_instances {
        let delta_t = ctx.read_strip_delta_t(strip_size)?;
        strip_t = strip_t.checked_add(delta_t).ok_or(DecodeError::Overflow)?;

        let mut first_in_strip = true;
        let mut current_s = 0;

        loop {
            // A corrupt stream can keep producing instances instead of the
            // end-of-strip sentinel.
            if instance_count > params.num_instances {
                bail!(SymbolError::TooManySymbols);
            }

            if first_in_strip {
                first_s = first_s
                    .checked_add(ctx.read_first_s()?)
                    .ok_or(DecodeError::Overflow)?;
                current_s = first_s;
                first_in_strip = false;
            } else {
                let Some(delta_s) = ctx.read_delta_s()? else {
                    break;
                };

                current_s = current_s
                    .checked_add(delta_s)
                    .and_then(|s| s.checked_add(params.delta_s_offset))
                    .ok_or(DecodeError::Overflow)?;
            }

            let symbol_t = strip_t
                .checked_add(ctx.read_symbol_t(params.log_strip_size)?)
                .ok_or(DecodeError::Overflow)?;

            let symbol_id = ctx.read_symbol_id()?;
            let instance = decode_instance_bitmap(&mut ctx, symbols, params, symbol_id)?;

            let bitmap: &Bitmap = match &instance {
                InstanceBitmap::Shared(id) => lookup_symbol(symbols, *id)?,
                InstanceBitmap::Owned(bitmap) => bitmap,
            };
            let width = bitmap.width() as i32;
            let height = bitmap.height() as i32;

            // §6.4.5 step 3c: the S coordinate tracks the far edge of each
            // instance, advanced before placement for right/bottom corners
            // and after placement for the others.
            let pre_advance = if params.transposed {
                matches!(
                    params.reference_corner,
                    ReferenceCorner::BottomLeft | ReferenceCorner::BottomRight
                )
                .then_some(height - 1)
            } else {
                matches!(
                    params.reference_corner,
                    ReferenceCorner::TopRight | ReferenceCorner::BottomRight
                )
                .then_some(width - 1)
            };

            if let Some(advance) = pre_advance {
                current_s = current_s
                    .checked_add(advance)
                    .ok_or(DecodeError::Overflow)?;
            }

            let (x, y) = if params.transposed {
                match params.reference_corner {
                    ReferenceCorner::TopLeft => (symbol_t, current_s),
                    ReferenceCorner::TopRight => (symbol_t - width + 1, current_s),
                    ReferenceCorner::BottomLeft => (symbol_t, current_s - height + 1),
                    ReferenceCorner::BottomRight => {
                        (symbol_t - width + 1, current_s - height + 1)
                    }
                }
            } else {
                match params.reference_corner {
                    ReferenceCorner::TopLeft => (current_s, symbol_t),
                    ReferenceCorner::TopRight => (current_s - width + 1, symbol_t),
                    ReferenceCorner::BottomLeft => (current_s, symbol_t - height + 1),
                    ReferenceCorner::BottomRight => {
                        (current_s - width + 1, symbol_t - height + 1)
                    }
                }
            };

            region.draw(bitmap, x, y);

            let post_advance = if params.transposed {
                matches!(
                    params.reference_corner,
                    ReferenceCorner::TopLeft | ReferenceCorner::TopRight
                )
                .then_some(height - 1)
            } else {
                matches!(
                    params.reference_corner,
                    ReferenceCorner::TopLeft | ReferenceCorner::BottomLeft
                )
                .then_some(width - 1)
            };

            if let Some(advance) = post_advance {
                current_s = current_s
                    .checked_add(advance)
                    .ok_or(DecodeError::Overflow)?;
            }

            instance_count += 1;
        }
    }

    Ok(region)
}

pub(crate) fn lookup_symbol<'a>(
    symbols: &'a [Option<&'a Bitmap>],
    id: usize,
) -> Result<&'a Bitmap> {
    symbols
        .get(id)
        .ok_or(SymbolError::OutOfRange)?
        .ok_or(SymbolError::NullReference.into())
}

/// Determine one instance's bitmap, refining it if the stream says so
/// (§6.4.11).
fn decode_instance_bitmap(
    ctx: &mut DecodeContext<'_, '_>,
    symbols: &[Option<&Bitmap>],
    params: &TextParams<'_>,
    symbol_id: usize,
) -> Result<InstanceBitmap> {
    if !params.use_refinement || !ctx.read_refinement_flag()? {
        // Validate the ID even when the bitmap is used as-is.
        lookup_symbol(symbols, symbol_id)?;
        return Ok(InstanceBitmap::Shared(symbol_id));
    }

    let reference = lookup_symbol(symbols, symbol_id)?;

    let rdw = ctx.read_refinement_delta(RefinementField::Width)?;
    let rdh = ctx.read_refinement_delta(RefinementField::Height)?;
    let rdx = ctx.read_refinement_delta(RefinementField::X)?;
    let rdy = ctx.read_refinement_delta(RefinementField::Y)?;

    let width = (reference.width() as i32)
        .checked_add(rdw)
        .filter(|w| *w > 0)
        .ok_or(DecodeError::Overflow)? as u32;
    let height = (reference.height() as i32)
        .checked_add(rdh)
        .filter(|h| *h > 0)
        .ok_or(DecodeError::Overflow)? as u32;

    // §6.4.11 step 4: the reference is consulted at an offset of
    // floor(RDW / 2) + RDX, floor(RDH / 2) + RDY.
    let dx = rdw
        .div_euclid(2)
        .checked_add(rdx)
        .ok_or(DecodeError::Overflow)?;
    let dy = rdh
        .div_euclid(2)
        .checked_add(rdy)
        .ok_or(DecodeError::Overflow)?;

    let mut refined = Bitmap::new(width, height)?;
    ctx.decode_refinement_bitmap(
        &mut refined,
        reference,
        dx,
        dy,
        params.refinement_template,
        params.refinement_at,
    )?;

    Ok(InstanceBitmap::Owned(refined))
}

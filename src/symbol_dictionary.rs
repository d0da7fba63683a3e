//! Symbol dictionary segment parsing and decoding (T.88 §7.4.2, §6.5).

use crate::arithmetic::{ArithmeticDecoder, Context};
use crate::bitmap::{Bitmap, MAX_IMAGE_SIZE};
use crate::error::{
    DecodeError, HuffmanError, ParseError, RegionError, Result, SymbolError, bail,
};
use crate::generic::{self, AtPixel, Template};
use crate::huffman::{HuffmanTable, standard_table};
use crate::integer::IntDecoder;
use crate::reader::Reader;
use crate::refinement::{RefinementTemplate, decode_refinement};
use crate::text::{
    DecodeContext, ReferenceCorner, TextContexts, TextHuffmanTables, TextParams,
    decode_text_region, lookup_symbol,
};

/// The largest symbol count a dictionary may declare, imported or new.
const MAX_SYMBOLS: u32 = 65535;

/// A decoded symbol dictionary: the exported symbols, in export order.
///
/// A `None` slot is a zero-size placeholder symbol. Dictionaries may declare
/// such symbols, and later segments may re-export them, so they keep their
/// position in the list.
#[derive(Debug, Clone)]
pub struct SymbolDictionary {
    pub symbols: Vec<Option<Bitmap>>,
}

/// Decode a symbol dictionary segment (§6.5).
///
/// `data` is the segment's data part, starting at the symbol dictionary
/// flags. `input_symbols` are the symbols exported by the dictionaries this
/// segment refers to, in referral order, and `referred_tables` the
/// user-supplied Huffman tables it refers to.
pub fn decode_symbol_dictionary(
    data: &[u8],
    input_symbols: &[Option<Bitmap>],
    referred_tables: &[HuffmanTable],
) -> Result<SymbolDictionary> {
    let mut reader = Reader::new(data);
    let header = parse(&mut reader)?;

    if header.num_new > MAX_SYMBOLS || header.num_export > MAX_SYMBOLS {
        bail!(SymbolError::TooManySymbols);
    }

    let symbols = if header.huffman {
        decode_huffman(&mut reader, &header, input_symbols, referred_tables)?
    } else {
        let data = reader.tail().ok_or(ParseError::UnexpectedEof)?;
        decode_arith(data, &header, input_symbols)?
    };

    Ok(SymbolDictionary { symbols })
}

/// Parsed symbol dictionary segment header (§7.4.2.1).
struct Header {
    huffman: bool,
    refinement: bool,
    dh_selection: u8,
    dw_selection: u8,
    bmsize_custom: bool,
    aggregate_custom: bool,
    template: Template,
    at: Vec<AtPixel>,
    refinement_template: RefinementTemplate,
    refinement_at: Vec<AtPixel>,
    num_export: u32,
    num_new: u32,
}

/// Parse a symbol dictionary segment header (§7.4.2.1.1 to §7.4.2.1.5).
fn parse(reader: &mut Reader<'_>) -> Result<Header> {
    let flags = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;

    let huffman = flags & 0x0001 != 0;
    let refinement = flags & 0x0002 != 0;
    let dh_selection = ((flags >> 2) & 0x3) as u8;
    let dw_selection = ((flags >> 4) & 0x3) as u8;
    let bmsize_custom = flags & 0x0040 != 0;
    let aggregate_custom = flags & 0x0080 != 0;
    let template = Template::from_bits((flags >> 10) as u8);
    let refinement_template = RefinementTemplate::from_bit((flags >> 12) as u8);

    if huffman && (dh_selection == 2 || dw_selection == 2) {
        bail!(HuffmanError::InvalidSelection);
    }

    let at = if huffman {
        Vec::new()
    } else {
        let mut at = Vec::with_capacity(template.adaptive_pixel_count());
        for _ in 0..template.adaptive_pixel_count() {
            let x = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
            let y = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
            at.push(AtPixel::new(x, y)?);
        }
        at
    };

    let refinement_at = if refinement && refinement_template == RefinementTemplate::Template0 {
        let x = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
        let y = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
        let first = AtPixel::new(x, y)?;

        // The second adaptive pixel lies in the reference bitmap, which is
        // fully available, so any position is fine.
        let x = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
        let y = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
        vec![first, AtPixel { x, y }]
    } else {
        Vec::new()
    };

    let num_export = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let num_new = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    Ok(Header {
        huffman,
        refinement,
        dh_selection,
        dw_selection,
        bmsize_custom,
        aggregate_custom,
        template,
        at,
        refinement_template,
        refinement_at,
        num_export,
        num_new,
    })
}

/// The number of bits in a symbol ID code for a dictionary holding `total`
/// symbols (§6.5.8.2.3).
fn symbol_code_len(total: u32, huffman: bool) -> u32 {
    let bits = 32 - total.saturating_sub(1).leading_zeros();
    if huffman { bits.max(1) } else { bits }
}

fn total_symbols(input_symbols: &[Option<Bitmap>], num_new: u32) -> Result<u32> {
    u32::try_from(input_symbols.len())
        .ok()
        .and_then(|n| n.checked_add(num_new))
        .ok_or(SymbolError::TooManySymbols.into())
}

fn checked_dimension(base: i32, delta: i32) -> Result<i32> {
    let value = base.checked_add(delta).ok_or(DecodeError::Overflow)?;
    if value < 0 || value > MAX_IMAGE_SIZE as i32 {
        bail!(RegionError::InvalidDimension);
    }

    Ok(value)
}

/// The text region parameters for aggregate symbol coding (§6.5.8.2,
/// Table 17): a single strip, top-left corner, OR composition, no
/// transposition.
fn aggregate_params<'a>(
    header: &'a Header,
    width: u32,
    height: u32,
    num_instances: u32,
) -> TextParams<'a> {
    TextParams {
        width,
        height,
        num_instances,
        log_strip_size: 0,
        reference_corner: ReferenceCorner::TopLeft,
        transposed: false,
        default_pixel: false,
        delta_s_offset: 0,
        use_refinement: true,
        refinement_template: header.refinement_template,
        refinement_at: &header.refinement_at,
    }
}

/// Integer decoding state for the arithmetic path. Every procedure keeps its
/// own context bank for the whole segment (§6.5.8.1).
struct ArithContexts {
    delta_height: IntDecoder,
    delta_width: IntDecoder,
    export_run: IntDecoder,
    aggregate_instances: IntDecoder,
    text: TextContexts,
    gb: Vec<Context>,
    gr: Vec<Context>,
}

/// Decode the new symbols and the export list, arithmetic path (§6.5.5,
/// SDHUFF = 0).
fn decode_arith(
    data: &[u8],
    header: &Header,
    input_symbols: &[Option<Bitmap>],
) -> Result<Vec<Option<Bitmap>>> {
    let total = total_symbols(input_symbols, header.num_new)?;
    let code_len = symbol_code_len(total, false);

    let mut decoder = ArithmeticDecoder::new(data);
    let mut cx = ArithContexts {
        delta_height: IntDecoder::new(),
        delta_width: IntDecoder::new(),
        export_run: IntDecoder::new(),
        aggregate_instances: IntDecoder::new(),
        text: TextContexts::new(code_len),
        gb: vec![Context::default(); 1 << header.template.context_bits()],
        gr: vec![Context::default(); 1 << 13],
    };

    let mut new_symbols: Vec<Option<Bitmap>> = Vec::with_capacity(header.num_new as usize);
    let mut height: i32 = 0;
    let mut empty_classes = 0_u32;

    while (new_symbols.len() as u32) < header.num_new {
        let class_start = new_symbols.len();

        // "b) Decode the height class delta height" (§6.5.5 step 4).
        let delta_height = cx
            .delta_height
            .decode(&mut decoder)
            .ok_or(SymbolError::UnexpectedOob)?;
        height = checked_dimension(height, delta_height)?;

        let mut width: i32 = 0;

        // The height class ends at the OOB value of the delta width
        // decoder (§6.5.5 step 4c).
        while let Some(delta_width) = cx.delta_width.decode(&mut decoder) {
            width = checked_dimension(width, delta_width)?;

            if new_symbols.len() as u32 == header.num_new {
                bail!(SymbolError::TooManySymbols);
            }

            // A zero-size symbol occupies a slot but has no bitmap.
            if width == 0 || height == 0 {
                new_symbols.push(None);
                continue;
            }

            let symbol = if header.refinement {
                decode_aggregate_arith(
                    &mut decoder,
                    &mut cx,
                    header,
                    input_symbols,
                    &new_symbols,
                    width as u32,
                    height as u32,
                )?
            } else {
                let mut bitmap = Bitmap::new(width as u32, height as u32)?;
                generic::decode_arith(
                    &mut bitmap,
                    &mut decoder,
                    &mut cx.gb,
                    header.template,
                    &header.at,
                    false,
                );
                bitmap
            };

            new_symbols.push(Some(symbol));
        }

        note_class_progress(&mut empty_classes, new_symbols.len() > class_start)?;
    }

    export_symbols(input_symbols, new_symbols, header.num_export, || {
        cx.export_run
            .decode(&mut decoder)
            .ok_or(SymbolError::UnexpectedOob.into())
    })
}

/// Track height classes that add no symbols. The arithmetic decoder never
/// runs out of input (it pads past the end of data), so a corrupt stream
/// could otherwise cycle through empty height classes forever.
fn note_class_progress(empty_classes: &mut u32, progressed: bool) -> Result<()> {
    if progressed {
        *empty_classes = 0;
        return Ok(());
    }

    *empty_classes += 1;
    if *empty_classes == 2 {
        bail!(SymbolError::EmptyHeightClasses);
    }

    Ok(())
}

/// Decode one symbol by refinement or aggregation, arithmetic path
/// (§6.5.8.2, SDREFAGG = 1).
fn decode_aggregate_arith(
    decoder: &mut ArithmeticDecoder<'_>,
    cx: &mut ArithContexts,
    header: &Header,
    input_symbols: &[Option<Bitmap>],
    new_symbols: &[Option<Bitmap>],
    width: u32,
    height: u32,
) -> Result<Bitmap> {
    let num_instances = cx
        .aggregate_instances
        .decode(decoder)
        .ok_or(SymbolError::UnexpectedOob)?;
    if num_instances < 1 {
        bail!(SymbolError::InvalidAggregateCount);
    }

    let combined: Vec<Option<&Bitmap>> = input_symbols
        .iter()
        .map(Option::as_ref)
        .chain(new_symbols.iter().map(Option::as_ref))
        .collect();

    if num_instances == 1 {
        // "2) If REFAGGNINST is one, then decode the symbol's bitmap using a
        // generic refinement region decoding procedure" (§6.5.8.2.2).
        let id = cx.text.iaid.decode(decoder) as usize;
        let rdx = cx
            .text
            .iardx
            .decode(decoder)
            .ok_or(SymbolError::UnexpectedOob)?;
        let rdy = cx
            .text
            .iardy
            .decode(decoder)
            .ok_or(SymbolError::UnexpectedOob)?;

        let reference = lookup_symbol(&combined, id)?;

        let mut bitmap = Bitmap::new(width, height)?;
        decode_refinement(
            &mut bitmap,
            reference,
            rdx,
            rdy,
            decoder,
            &mut cx.gr,
            header.refinement_template,
            &header.refinement_at,
            false,
        );

        Ok(bitmap)
    } else {
        let params = aggregate_params(header, width, height, num_instances as u32);
        let ctx = DecodeContext::Arithmetic {
            decoder,
            contexts: &mut cx.text,
            gr_contexts: &mut cx.gr,
        };

        decode_text_region(ctx, &combined, &params)
    }
}

/// The Huffman tables a symbol dictionary decode draws from (§7.4.2.1.6).
struct DictHuffmanTables<'a> {
    delta_height: &'a HuffmanTable,
    delta_width: &'a HuffmanTable,
    bitmap_size: &'a HuffmanTable,
    aggregate_instances: &'a HuffmanTable,
    export_runs: &'a HuffmanTable,
}

fn select_tables<'a>(header: &Header, referred: &'a [HuffmanTable]) -> Result<DictHuffmanTables<'a>> {
    let mut next_custom = 0;
    let mut get_custom = || -> Result<&'a HuffmanTable> {
        let table = referred.get(next_custom).ok_or(HuffmanError::MissingTables)?;
        next_custom += 1;
        Ok(table)
    };

    let delta_height = match header.dh_selection {
        0 => standard_table(4),
        1 => standard_table(5),
        _ => get_custom()?,
    };
    let delta_width = match header.dw_selection {
        0 => standard_table(2),
        1 => standard_table(3),
        _ => get_custom()?,
    };
    let bitmap_size = if header.bmsize_custom {
        get_custom()?
    } else {
        standard_table(1)
    };
    let aggregate_instances = if header.aggregate_custom {
        get_custom()?
    } else {
        standard_table(1)
    };

    Ok(DictHuffmanTables {
        delta_height,
        delta_width,
        bitmap_size,
        aggregate_instances,
        // Export runs always use table B.1 (§6.5.10).
        export_runs: standard_table(1),
    })
}

/// Decode the new symbols and the export list, Huffman path (§6.5.5,
/// SDHUFF = 1).
fn decode_huffman(
    reader: &mut Reader<'_>,
    header: &Header,
    input_symbols: &[Option<Bitmap>],
    referred_tables: &[HuffmanTable],
) -> Result<Vec<Option<Bitmap>>> {
    let tables = select_tables(header, referred_tables)?;
    let total = total_symbols(input_symbols, header.num_new)?;
    let code_len = symbol_code_len(total, true) as u8;

    let mut gr_contexts = vec![Context::default(); 1 << 13];

    let mut new_symbols: Vec<Option<Bitmap>> = Vec::with_capacity(header.num_new as usize);
    let mut height: i32 = 0;

    while (new_symbols.len() as u32) < header.num_new {
        let delta_height = tables.delta_height.decode_value(reader)?;
        height = checked_dimension(height, delta_height)?;

        let mut width: i32 = 0;
        let mut total_width: i32 = 0;
        let class_start = new_symbols.len();
        let mut widths: Vec<u32> = Vec::new();

        loop {
            let Some(delta_width) = tables.delta_width.decode(reader)? else {
                break;
            };
            width = checked_dimension(width, delta_width)?;

            if new_symbols.len() as u32 == header.num_new {
                bail!(SymbolError::TooManySymbols);
            }

            if !header.refinement {
                // The symbol is sliced out of the height class's collective
                // bitmap afterwards; only its width is recorded here.
                widths.push(width as u32);
                total_width = checked_dimension(total_width, width)?;
                new_symbols.push(None);
                continue;
            }

            if width == 0 || height == 0 {
                new_symbols.push(None);
                continue;
            }

            let symbol = decode_aggregate_huffman(
                reader,
                &tables,
                &mut gr_contexts,
                header,
                input_symbols,
                &new_symbols,
                width as u32,
                height as u32,
                code_len,
            )?;
            new_symbols.push(Some(symbol));
        }

        if !header.refinement {
            decode_collective_bitmap(
                reader,
                &tables,
                &mut new_symbols[class_start..],
                &widths,
                total_width as u32,
                height as u32,
            )?;
        }
    }

    export_symbols(input_symbols, new_symbols, header.num_export, || {
        tables.export_runs.decode_value(reader)
    })
}

/// Decode a height class's collective bitmap and slice the symbols out of it
/// (§6.5.9).
fn decode_collective_bitmap(
    reader: &mut Reader<'_>,
    tables: &DictHuffmanTables<'_>,
    class_symbols: &mut [Option<Bitmap>],
    widths: &[u32],
    total_width: u32,
    height: u32,
) -> Result<()> {
    let size = tables.bitmap_size.decode_value(reader)?;
    let size = usize::try_from(size).map_err(|_| DecodeError::Overflow)?;
    reader.align();

    if total_width == 0 || height == 0 {
        // Nothing to slice; the class holds only zero-size symbols.
        reader.skip_bytes(size).ok_or(ParseError::UnexpectedEof)?;
        return Ok(());
    }

    // "If BMSIZE is zero, then the collective bitmap is stored uncompressed"
    // (§6.5.9 step 2); otherwise it is MMR-coded in exactly BMSIZE bytes.
    let collective = if size == 0 {
        let stride = (total_width as usize).div_ceil(8);
        let bytes = reader
            .read_bytes(stride * height as usize)
            .ok_or(ParseError::UnexpectedEof)?;
        Bitmap::from_packed(total_width, height, bytes)?
    } else {
        let data = reader.read_bytes(size).ok_or(ParseError::UnexpectedEof)?;
        let mut collective = Bitmap::new(total_width, height)?;
        generic::decode_mmr(&mut collective, data)?;
        collective
    };

    let mut x = 0_i32;
    for (slot, &width) in class_symbols.iter_mut().zip(widths) {
        if width == 0 {
            continue;
        }

        *slot = Some(collective.sub_image(x, 0, width, height)?);
        x += width as i32;
    }

    Ok(())
}

/// Decode one symbol by refinement or aggregation, Huffman path (§6.5.8.2,
/// SDHUFF = 1).
fn decode_aggregate_huffman(
    reader: &mut Reader<'_>,
    tables: &DictHuffmanTables<'_>,
    gr_contexts: &mut [Context],
    header: &Header,
    input_symbols: &[Option<Bitmap>],
    new_symbols: &[Option<Bitmap>],
    width: u32,
    height: u32,
    code_len: u8,
) -> Result<Bitmap> {
    let num_instances = tables.aggregate_instances.decode_value(reader)?;
    if num_instances < 1 {
        bail!(SymbolError::InvalidAggregateCount);
    }

    let combined: Vec<Option<&Bitmap>> = input_symbols
        .iter()
        .map(Option::as_ref)
        .chain(new_symbols.iter().map(Option::as_ref))
        .collect();

    if num_instances == 1 {
        // §6.5.8.2.2 with SDHUFF = 1: a fixed-length symbol ID, offsets via
        // table B.15 and the embedded data size via B.1.
        let id = reader
            .read_bits(code_len)
            .ok_or(ParseError::UnexpectedEof)? as usize;
        let rdx = standard_table(15).decode_value(reader)?;
        let rdy = standard_table(15).decode_value(reader)?;
        let declared_size = standard_table(1).decode_value(reader)?;
        let declared_size = usize::try_from(declared_size).map_err(|_| DecodeError::Overflow)?;
        reader.align();

        let reference = lookup_symbol(&combined, id)?;

        let mut bitmap = Bitmap::new(width, height)?;
        let data = reader.tail().ok_or(ParseError::UnexpectedEof)?;
        let mut decoder = ArithmeticDecoder::new(data);
        decode_refinement(
            &mut bitmap,
            reference,
            rdx,
            rdy,
            &mut decoder,
            gr_contexts,
            header.refinement_template,
            &header.refinement_at,
            false,
        );

        // The declared size covers the coded bytes plus the two terminating
        // marker bytes; anything else means the stream is inconsistent
        // (§6.5.8.2.2).
        if decoder.bytes_read() + 2 != declared_size {
            bail!(SymbolError::SizeMismatch);
        }
        reader
            .skip_bytes(declared_size)
            .ok_or(ParseError::UnexpectedEof)?;

        Ok(bitmap)
    } else {
        let params = aggregate_params(header, width, height, num_instances as u32);
        let ctx = DecodeContext::Huffman {
            reader: &mut *reader,
            tables: TextHuffmanTables::aggregate(),
            // The embedded text region sizes its symbol codes to the symbols
            // decoded so far, not the declared total (§6.5.8.2.3).
            symbol_code_len: symbol_code_len(combined.len() as u32, true) as u8,
        };

        decode_text_region(ctx, &combined, &params)
    }
}

/// Run the export flag pass (§6.5.10): alternating runs of retained and
/// exported symbols over the concatenation of input and new symbols.
///
/// Exported input symbols are copied, exported new symbols are moved.
fn export_symbols(
    input_symbols: &[Option<Bitmap>],
    mut new_symbols: Vec<Option<Bitmap>>,
    num_export: u32,
    mut read_run: impl FnMut() -> Result<i32>,
) -> Result<Vec<Option<Bitmap>>> {
    let total = input_symbols.len() + new_symbols.len();
    let mut exported = Vec::with_capacity(num_export as usize);

    let mut index = 0_usize;
    let mut exporting = false;
    let mut zero_runs = 0;

    while index < total {
        let run = read_run()?;
        let run = usize::try_from(run).map_err(|_| SymbolError::ExportRunOverflow)?;

        // Two zero-length runs in a row make no progress; a conforming
        // stream never needs them.
        if run == 0 {
            zero_runs += 1;
            if zero_runs == 2 {
                bail!(SymbolError::ExportRunOverflow);
            }
        } else {
            zero_runs = 0;
        }

        let end = index
            .checked_add(run)
            .filter(|end| *end <= total)
            .ok_or(SymbolError::ExportRunOverflow)?;

        if exporting {
            for i in index..end {
                if exported.len() == num_export as usize {
                    bail!(SymbolError::TooManyExports);
                }

                let symbol = if i < input_symbols.len() {
                    input_symbols[i].clone()
                } else {
                    new_symbols[i - input_symbols.len()].take()
                };
                exported.push(symbol);
            }
        }

        index = end;
        exporting = !exporting;
    }

    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(runs: &[i32]) -> impl FnMut() -> Result<i32> + '_ {
        let mut iter = runs.iter();
        move || Ok(iter.next().copied().unwrap_or(0))
    }

    fn square(fill: bool) -> Option<Bitmap> {
        let mut bitmap = Bitmap::new(2, 2).unwrap();
        if fill {
            bitmap.fill(true);
        }
        Some(bitmap)
    }

    #[test]
    fn export_keeps_relative_order() {
        let input = vec![square(true)];
        let new = vec![square(false), None];

        // Skip the input symbol, export both new ones.
        let exported = export_symbols(&input, new, 2, script(&[1, 2])).unwrap();
        assert_eq!(exported, vec![square(false), None]);
    }

    #[test]
    fn export_copies_input_symbols() {
        let input = vec![square(true)];
        let exported = export_symbols(&input, Vec::new(), 1, script(&[0, 1])).unwrap();
        assert_eq!(exported, vec![square(true)]);
        // The input slice is untouched.
        assert_eq!(input, vec![square(true)]);
    }

    #[test]
    fn export_run_past_the_end_is_rejected() {
        let input = vec![square(true)];
        assert!(matches!(
            export_symbols(&input, Vec::new(), 1, script(&[5])),
            Err(DecodeError::Symbol(SymbolError::ExportRunOverflow))
        ));
    }

    #[test]
    fn export_stalled_runs_are_rejected() {
        let input = vec![square(true)];
        assert!(matches!(
            export_symbols(&input, Vec::new(), 1, script(&[])),
            Err(DecodeError::Symbol(SymbolError::ExportRunOverflow))
        ));
    }

    #[test]
    fn export_more_than_declared_is_rejected() {
        let input = vec![square(true), square(false)];
        assert!(matches!(
            export_symbols(&input, Vec::new(), 1, script(&[0, 2])),
            Err(DecodeError::Symbol(SymbolError::TooManyExports))
        ));
    }

    #[test]
    fn fewer_exports_than_declared_is_allowed() {
        let input = vec![square(true)];
        let exported = export_symbols(&input, Vec::new(), 5, script(&[0, 1])).unwrap();
        assert_eq!(exported.len(), 1);
    }

    #[test]
    fn symbol_code_lengths() {
        assert_eq!(symbol_code_len(1, false), 0);
        assert_eq!(symbol_code_len(2, false), 1);
        assert_eq!(symbol_code_len(3, false), 2);
        assert_eq!(symbol_code_len(256, false), 8);
        assert_eq!(symbol_code_len(257, false), 9);
        // The Huffman paths use at least one bit.
        assert_eq!(symbol_code_len(1, true), 1);
    }

    /// A dictionary with no new and no exported symbols is trivially empty.
    #[test]
    fn empty_arithmetic_dictionary() {
        let data = [
            0x00, 0x00, // flags: arithmetic, no refinement, template 0
            0x03, 0xFF, 0xFD, 0xFF, 0x02, 0xFE, 0xFE, 0xFE, // AT pixels
            0x00, 0x00, 0x00, 0x00, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x00, // SDNUMNEWSYMS
        ];

        let dictionary = decode_symbol_dictionary(&data, &[], &[]).unwrap();
        assert!(dictionary.symbols.is_empty());
    }

    /// Huffman path end to end: one height class of height 1 holding a
    /// 2-wide and a 3-wide symbol in an uncompressed collective bitmap,
    /// both exported.
    #[test]
    fn huffman_dictionary_with_collective_bitmap() {
        let data = [
            0x00, 0x01, // flags: SDHUFF, standard tables B.4 / B.2 / B.1
            0x00, 0x00, 0x00, 0x02, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x02, // SDNUMNEWSYMS
            // DH = 1, DW = 2, DW = 1, OOB, BMSIZE = 0
            0x6B, 0xF0, 0x00,
            // collective bitmap, one raw row of 5 pixels: 1 0 1 1 0
            0xB0,
            // export runs: 0, then 2
            0x00, 0x80,
        ];

        let dictionary = decode_symbol_dictionary(&data, &[], &[]).unwrap();
        assert_eq!(dictionary.symbols.len(), 2);

        let first = dictionary.symbols[0].as_ref().unwrap();
        assert_eq!((first.width(), first.height()), (2, 1));
        assert!(first.get(0, 0));
        assert!(!first.get(1, 0));

        let second = dictionary.symbols[1].as_ref().unwrap();
        assert_eq!((second.width(), second.height()), (3, 1));
        assert!(second.get(0, 0));
        assert!(second.get(1, 0));
        assert!(!second.get(2, 0));
    }

    /// A height class whose first symbol has width zero records a `None`
    /// slot and contributes nothing to the collective bitmap.
    #[test]
    fn huffman_dictionary_with_zero_width_symbol() {
        let data = [
            0x00, 0x01, // flags: SDHUFF
            0x00, 0x00, 0x00, 0x02, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x02, // SDNUMNEWSYMS
            // DH = 1, DW = 0, DW = 2, OOB, BMSIZE = 0
            0x37, 0xE0,
            // collective bitmap, one raw row of 2 pixels: 1 1
            0xC0,
            // export runs: 0, then 2
            0x00, 0x80,
        ];

        let dictionary = decode_symbol_dictionary(&data, &[], &[]).unwrap();
        assert_eq!(dictionary.symbols.len(), 2);
        assert!(dictionary.symbols[0].is_none());

        let second = dictionary.symbols[1].as_ref().unwrap();
        assert_eq!((second.width(), second.height()), (2, 1));
        assert!(second.get(0, 0) && second.get(1, 0));
    }

    /// Re-exporting an input symbol copies it through untouched.
    #[test]
    fn huffman_dictionary_reexports_input_symbol() {
        let data = [
            0x00, 0x01, // flags: SDHUFF
            0x00, 0x00, 0x00, 0x01, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x00, // SDNUMNEWSYMS
            // export runs: 0, then 1
            0x00, 0x40,
        ];

        let input = vec![square(true)];
        let dictionary = decode_symbol_dictionary(&data, &input, &[]).unwrap();
        assert_eq!(dictionary.symbols, vec![square(true)]);
    }

    /// A negative accumulated height class height is invalid.
    #[test]
    fn huffman_dictionary_rejects_negative_height() {
        let data = [
            0x00, 0x05, // flags: SDHUFF, DH via table B.5
            0x00, 0x00, 0x00, 0x01, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x01, // SDNUMNEWSYMS
            0xFD, 0xF4, // DH = -5 via B.5
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Region(RegionError::InvalidDimension))
        ));
    }

    /// More decoded symbols than SDNUMNEWSYMS declared is invalid.
    #[test]
    fn huffman_dictionary_rejects_surplus_symbols() {
        let data = [
            0x00, 0x01, // flags: SDHUFF
            0x00, 0x00, 0x00, 0x01, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x01, // SDNUMNEWSYMS
            // DH = 1, DW = 1, DW = 1: a second symbol in a one-symbol
            // dictionary.
            0x50,
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Symbol(SymbolError::TooManySymbols))
        ));
    }

    /// An export run reaching past input + new symbols is invalid.
    #[test]
    fn huffman_dictionary_rejects_export_overrun() {
        let data = [
            0x00, 0x01, // flags: SDHUFF
            0x00, 0x00, 0x00, 0x01, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x00, // SDNUMNEWSYMS
            0x28, // export run: 5, but only one symbol exists
        ];

        let input = vec![square(true)];
        assert!(matches!(
            decode_symbol_dictionary(&data, &input, &[]),
            Err(DecodeError::Symbol(SymbolError::ExportRunOverflow))
        ));
    }

    /// Table selection value 2 is reserved for both DH and DW.
    #[test]
    fn reserved_table_selection_is_rejected() {
        let data = [
            0x00, 0x09, // flags: SDHUFF, DH selection 2
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Huffman(HuffmanError::InvalidSelection))
        ));
    }

    /// Selecting a custom table without referring one is invalid.
    #[test]
    fn missing_custom_table_is_rejected() {
        let data = [
            0x00, 0x0D, // flags: SDHUFF, DH selection 3 (custom)
            0x00, 0x00, 0x00, 0x00, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x00, // SDNUMNEWSYMS
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Huffman(HuffmanError::MissingTables))
        ));
    }

    /// An adaptive template pixel must reference already-decoded pixels.
    #[test]
    fn invalid_at_pixel_is_rejected() {
        let data = [
            0x00, 0x00, // flags: arithmetic, template 0
            0x02, 0x00, // first AT pixel at (2, 0): not yet decoded
            0xFD, 0xFF, 0x02, 0xFE, 0xFE, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        assert!(decode_symbol_dictionary(&data, &[], &[]).is_err());
    }

    /// Declared symbol counts beyond the hard cap are rejected before any
    /// allocation happens.
    #[test]
    fn oversized_declared_counts_are_rejected() {
        let data = [
            0x00, 0x01, // flags: SDHUFF
            0x00, 0x01, 0x00, 0x00, // SDNUMEXSYMS = 65536
            0x00, 0x00, 0x00, 0x00, // SDNUMNEWSYMS
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Symbol(SymbolError::TooManySymbols))
        ));
    }

    /// Two height classes in a row without a single symbol mean the stream
    /// is running on decoder padding and will never finish.
    #[test]
    fn consecutive_empty_height_classes_are_rejected() {
        let mut empty_classes = 0;
        assert!(note_class_progress(&mut empty_classes, false).is_ok());
        // A symbol resets the count.
        assert!(note_class_progress(&mut empty_classes, true).is_ok());
        assert!(note_class_progress(&mut empty_classes, false).is_ok());
        assert!(matches!(
            note_class_progress(&mut empty_classes, false),
            Err(DecodeError::Symbol(SymbolError::EmptyHeightClasses))
        ));
    }

    /// An OOB result from the height delta decoder is invalid (§6.5.5).
    #[test]
    fn arithmetic_oob_height_delta_is_rejected() {
        let data = [
            0x00, 0x00, // flags: arithmetic, no refinement, template 0
            0x03, 0xFF, 0xFD, 0xFF, 0x02, 0xFE, 0xFE, 0xFE, // AT pixels
            0x00, 0x00, 0x00, 0x00, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x01, // SDNUMNEWSYMS
            // An arithmetic stream whose first IADH decode is the OOB value.
            0xD5, 0x00,
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Symbol(SymbolError::UnexpectedOob))
        ));
    }

    /// With the body missing entirely, the arithmetic decoder runs on its
    /// end-of-data padding; the decode must fail instead of spinning.
    #[test]
    fn truncated_arithmetic_stream_is_rejected() {
        let data = [
            0x00, 0x00, // flags: arithmetic, no refinement, template 0
            0x03, 0xFF, 0xFD, 0xFF, 0x02, 0xFE, 0xFE, 0xFE, // AT pixels
            0x00, 0x00, 0x00, 0x00, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x01, // SDNUMNEWSYMS
        ];

        // The padding decodes to a large negative height delta.
        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Region(RegionError::InvalidDimension))
        ));
    }

    /// A single-instance refinement naming a symbol past the end of the
    /// combined list is invalid (§6.5.8.2.2).
    #[test]
    fn huffman_refinement_with_out_of_range_id_is_rejected() {
        let data = [
            0x00, 0x03, // flags: SDHUFF, SDREFAGG, refinement template 0
            0xFF, 0xFF, 0xFF, 0xFF, // refinement AT pixels at (-1, -1)
            0x00, 0x00, 0x00, 0x01, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x01, // SDNUMNEWSYMS
            // DH = 1, DW = 1, REFAGGNINST = 1
            0x41,
            // symbol ID 1: the combined list is still empty
            0x80,
        ];

        assert!(matches!(
            decode_symbol_dictionary(&data, &[], &[]),
            Err(DecodeError::Symbol(SymbolError::OutOfRange))
        ));
    }

    /// A single-instance refinement of a zero-size placeholder symbol is
    /// invalid.
    #[test]
    fn huffman_refinement_of_null_symbol_is_rejected() {
        let data = [
            0x00, 0x03, // flags: SDHUFF, SDREFAGG, refinement template 0
            0xFF, 0xFF, 0xFF, 0xFF, // refinement AT pixels at (-1, -1)
            0x00, 0x00, 0x00, 0x01, // SDNUMEXSYMS
            0x00, 0x00, 0x00, 0x01, // SDNUMNEWSYMS
            // DH = 1, DW = 1, REFAGGNINST = 1
            0x41,
            // symbol ID 0, RDX = RDY = 0, embedded size = 0
            0x00,
        ];

        // The only referenceable symbol is a zero-size placeholder.
        let input = vec![None];
        assert!(matches!(
            decode_symbol_dictionary(&data, &input, &[]),
            Err(DecodeError::Symbol(SymbolError::NullReference))
        ));
    }
}

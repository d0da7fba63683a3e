//! The generic region decoding procedure (T.88 §6.2).
//!
//! Only the decoding procedure itself lives here; the symbol dictionary
//! invokes it with a shared arithmetic decoder and a shared context bank, so
//! both are parameters rather than locals.

use crate::arithmetic::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{RegionError, Result, TemplateError, bail};

/// The generic region coding template (§6.2.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Template {
    Template0,
    Template1,
    Template2,
    Template3,
}

impl Template {
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::Template0,
            1 => Self::Template1,
            2 => Self::Template2,
            _ => Self::Template3,
        }
    }

    /// The number of adaptive pixels in the template (§6.2.5.4).
    pub(crate) fn adaptive_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 4,
            _ => 1,
        }
    }

    /// The number of context bits the template produces.
    pub(crate) fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// The pseudo-pixel context used for the SLTP bit (Figures 8 to 11).
    fn sltp_context(self) -> usize {
        match self {
            Self::Template0 => 0b1001_1011_0010_0101,
            Self::Template1 => 0b0_0111_1001_0101,
            Self::Template2 => 0b00_1110_0101,
            Self::Template3 => 0b01_1001_0101,
        }
    }
}

/// An adaptive template pixel position, relative to the current pixel
/// (§6.2.5.4).
#[derive(Debug, Clone, Copy)]
pub(crate) struct AtPixel {
    pub(crate) x: i8,
    pub(crate) y: i8,
}

impl AtPixel {
    /// An adaptive pixel may only reference already-decoded pixels: rows
    /// above, or the current row strictly to the left.
    pub(crate) fn new(x: i8, y: i8) -> Result<Self> {
        if y > 0 || (y == 0 && x >= 0) {
            bail!(TemplateError::InvalidAtPixel);
        }

        Ok(Self { x, y })
    }
}

/// Decode a bitmap using a template and arithmetic coding (§6.2.5).
///
/// `contexts` must hold `1 << template.context_bits()` entries. Both the
/// decoder and the context bank carry their state across calls, which is how
/// every symbol of a dictionary shares one coding history.
pub(crate) fn decode_arith(
    bitmap: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut [Context],
    template: Template,
    at: &[AtPixel],
    tpgdon: bool,
) {
    debug_assert_eq!(at.len(), template.adaptive_pixel_count());

    let mut ltp = false;

    for y in 0..bitmap.height() {
        if tpgdon {
            let sltp = decoder.decode_bit(&mut contexts[template.sltp_context()]);
            ltp ^= sltp != 0;
        }

        // A typical row repeats the row above it (§6.2.5.7 step 3c); for the
        // first row that leaves it all zero.
        if ltp {
            if y > 0 {
                bitmap.copy_row(y, y - 1);
            }
            continue;
        }

        for x in 0..bitmap.width() {
            let context = gather_context(bitmap, x as i32, y as i32, template, at);
            let pixel = decoder.decode_bit(&mut contexts[context as usize]);
            bitmap.set(x, y, pixel != 0);
        }
    }
}

/// Gather the context bits for the pixel at `(x, y)` (§6.2.5.7, Figures 3
/// to 6).
fn gather_context(bitmap: &Bitmap, x: i32, y: i32, template: Template, at: &[AtPixel]) -> u32 {
    let pixel = |dx: i32, dy: i32| u32::from(bitmap.get(x + dx, y + dy));
    let adaptive = |i: usize| u32::from(bitmap.get(x + i32::from(at[i].x), y + i32::from(at[i].y)));

    match template {
        Template::Template0 => {
            let mut context = adaptive(3);
            context = (context << 1) | pixel(-1, -2);
            context = (context << 1) | pixel(0, -2);
            context = (context << 1) | pixel(1, -2);
            context = (context << 1) | adaptive(2);

            context = (context << 1) | adaptive(1);
            context = (context << 1) | pixel(-2, -1);
            context = (context << 1) | pixel(-1, -1);
            context = (context << 1) | pixel(0, -1);
            context = (context << 1) | pixel(1, -1);
            context = (context << 1) | pixel(2, -1);
            context = (context << 1) | adaptive(0);

            context = (context << 1) | pixel(-4, 0);
            context = (context << 1) | pixel(-3, 0);
            context = (context << 1) | pixel(-2, 0);
            (context << 1) | pixel(-1, 0)
        }
        Template::Template1 => {
            let mut context = pixel(-1, -2);
            context = (context << 1) | pixel(0, -2);
            context = (context << 1) | pixel(1, -2);
            context = (context << 1) | pixel(2, -2);

            context = (context << 1) | pixel(-2, -1);
            context = (context << 1) | pixel(-1, -1);
            context = (context << 1) | pixel(0, -1);
            context = (context << 1) | pixel(1, -1);
            context = (context << 1) | pixel(2, -1);
            context = (context << 1) | adaptive(0);

            context = (context << 1) | pixel(-3, 0);
            context = (context << 1) | pixel(-2, 0);
            (context << 1) | pixel(-1, 0)
        }
        Template::Template2 => {
            let mut context = pixel(-1, -2);
            context = (context << 1) | pixel(0, -2);
            context = (context << 1) | pixel(1, -2);

            context = (context << 1) | pixel(-2, -1);
            context = (context << 1) | pixel(-1, -1);
            context = (context << 1) | pixel(0, -1);
            context = (context << 1) | pixel(1, -1);
            context = (context << 1) | adaptive(0);

            context = (context << 1) | pixel(-2, 0);
            (context << 1) | pixel(-1, 0)
        }
        Template::Template3 => {
            let mut context = pixel(-3, -1);
            context = (context << 1) | pixel(-2, -1);
            context = (context << 1) | pixel(-1, -1);
            context = (context << 1) | pixel(0, -1);
            context = (context << 1) | pixel(1, -1);
            context = (context << 1) | adaptive(0);

            context = (context << 1) | pixel(-4, 0);
            context = (context << 1) | pixel(-3, 0);
            context = (context << 1) | pixel(-2, 0);
            (context << 1) | pixel(-1, 0)
        }
    }
}

/// Decode a bitmap using MMR coding (§6.2.6). Returns the number of input
/// bytes consumed.
pub(crate) fn decode_mmr(bitmap: &mut Bitmap, data: &[u8]) -> Result<usize> {
    /// A decoder sink writing decoded pixels into a [`Bitmap`].
    struct BitmapSink<'a> {
        bitmap: &'a mut Bitmap,
        x: u32,
        y: u32,
    }

    impl hayro_ccitt::Decoder for BitmapSink<'_> {
        fn push_pixel(&mut self, white: bool) {
            if self.x < self.bitmap.width() && self.y < self.bitmap.height() {
                self.bitmap.set(self.x, self.y, white);
            }
            self.x += 1;
        }

        fn push_pixel_chunk(&mut self, white: bool, chunk_count: u32) {
            for _ in 0..chunk_count * 8 {
                self.push_pixel(white);
            }
        }

        fn next_line(&mut self) {
            self.x = 0;
            self.y += 1;
        }
    }

    let settings = hayro_ccitt::DecodeSettings {
        columns: bitmap.width(),
        rows: bitmap.height(),
        // The stream may carry an EOFB, but does not have to (§6.2.6).
        end_of_block: true,
        end_of_line: false,
        rows_are_byte_aligned: false,
        encoding: hayro_ccitt::EncodingMode::Group4,
        // MMR "black" is pixel value 1 here (§6.2.6), the opposite of the
        // CCITT fax convention.
        invert_black: true,
    };

    let mut sink = BitmapSink {
        bitmap,
        x: 0,
        y: 0,
    };

    let mut ctx = hayro_ccitt::DecoderContext::new(settings);
    hayro_ccitt::decode(data, &mut sink, &mut ctx).map_err(|_| RegionError::InvalidMmrData.into())
}

//! The generic refinement region decoding procedure (T.88 §6.3).

use crate::arithmetic::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::generic::AtPixel;

/// The refinement coding template (§6.3.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefinementTemplate {
    Template0,
    Template1,
}

impl RefinementTemplate {
    pub(crate) fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            Self::Template0
        } else {
            Self::Template1
        }
    }

    /// The number of adaptive pixels in the template (§6.3.5.3). The first
    /// lies in the bitmap being decoded, the second in the reference.
    pub(crate) fn adaptive_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 2,
            Self::Template1 => 0,
        }
    }

    /// The pseudo-pixel context used for the SLTP bit (§6.3.5.6): the
    /// reference-centre bit of the template.
    fn sltp_context(self) -> usize {
        match self {
            Self::Template0 => 0x0200,
            Self::Template1 => 0x0080,
        }
    }
}

/// Decode a bitmap by refining a reference bitmap (§6.3.5.6).
///
/// The reference is consulted at an offset, so the pixel at `(x, y)` of the
/// output is predicted from the neighbourhood of `(x - dx, y - dy)` in the
/// reference. `contexts` must hold `1 << 13` entries and is shared across
/// all refinements of a dictionary.
pub(crate) fn decode_refinement(
    bitmap: &mut Bitmap,
    reference: &Bitmap,
    dx: i32,
    dy: i32,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut [Context],
    template: RefinementTemplate,
    at: &[AtPixel],
    tpgron: bool,
) {
    debug_assert_eq!(at.len(), template.adaptive_pixel_count());

    let mut ltp = false;

    for y in 0..bitmap.height() as i32 {
        if tpgron {
            let sltp = decoder.decode_bit(&mut contexts[template.sltp_context()]);
            ltp ^= sltp != 0;
        }

        for x in 0..bitmap.width() as i32 {
            // In a typical row, a pixel whose 3x3 reference neighbourhood is
            // uniform takes that value without consulting the coder
            // (§6.3.5.6 step 4c).
            if ltp {
                if let Some(value) = typical_value(reference, x - dx, y - dy) {
                    bitmap.set(x as u32, y as u32, value);
                    continue;
                }
            }

            let context = gather_context(bitmap, reference, x, y, dx, dy, template, at);
            let pixel = decoder.decode_bit(&mut contexts[context as usize]);
            bitmap.set(x as u32, y as u32, pixel != 0);
        }
    }
}

/// The uniform value of the 3x3 neighbourhood around `(x, y)` in the
/// reference, if there is one.
fn typical_value(reference: &Bitmap, x: i32, y: i32) -> Option<bool> {
    let mut ones = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            ones += i32::from(reference.get(x + dx, y + dy));
        }
    }

    match ones {
        0 => Some(false),
        9 => Some(true),
        _ => None,
    }
}

/// Gather the context bits for the pixel at `(x, y)` (§6.3.5.3, Figures 12
/// and 13).
fn gather_context(
    bitmap: &Bitmap,
    reference: &Bitmap,
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    template: RefinementTemplate,
    at: &[AtPixel],
) -> u32 {
    let cur = |px: i32, py: i32| u32::from(bitmap.get(x + px, y + py));
    let refer = |px: i32, py: i32| u32::from(reference.get(x - dx + px, y - dy + py));

    match template {
        RefinementTemplate::Template0 => {
            let at1 = (i32::from(at[0].x), i32::from(at[0].y));
            let at2 = (i32::from(at[1].x), i32::from(at[1].y));

            let mut context = refer(0, -1);
            context = (context << 1) | refer(1, -1);
            context = (context << 1) | refer(-1, 0);
            context = (context << 1) | refer(0, 0);
            context = (context << 1) | refer(1, 0);
            context = (context << 1) | refer(at2.0, at2.1);
            context = (context << 1) | refer(-1, 1);
            context = (context << 1) | refer(0, 1);
            context = (context << 1) | refer(1, 1);

            context = (context << 1) | cur(at1.0, at1.1);
            context = (context << 1) | cur(0, -1);
            context = (context << 1) | cur(1, -1);
            (context << 1) | cur(-1, 0)
        }
        RefinementTemplate::Template1 => {
            let mut context = refer(0, -1);
            context = (context << 1) | refer(-1, 0);
            context = (context << 1) | refer(0, 0);
            context = (context << 1) | refer(1, 0);
            context = (context << 1) | refer(0, 1);
            context = (context << 1) | refer(1, 1);

            context = (context << 1) | cur(-1, -1);
            context = (context << 1) | cur(0, -1);
            context = (context << 1) | cur(1, -1);
            (context << 1) | cur(-1, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_neighbourhoods() {
        let reference = Bitmap::from_rows(&[
            &[1, 1, 1, 0, 0],
            &[1, 1, 1, 0, 0],
            &[1, 1, 1, 0, 0],
        ]);

        assert_eq!(typical_value(&reference, 1, 1), Some(true));
        assert_eq!(typical_value(&reference, 3, 1), None);
        // Outside the bitmap everything reads as zero.
        assert_eq!(typical_value(&reference, -5, 0), Some(false));
    }

    #[test]
    fn reference_pixels_follow_the_offset() {
        let bitmap = Bitmap::new(4, 4).unwrap();
        let mut reference = Bitmap::new(4, 4).unwrap();
        reference.set(0, 0, true);

        // With dx = 1, dy = 1, decoding (1, 1) looks at (0, 0) of the
        // reference, the centre pixel at bit 7 of the template 1 context.
        assert_eq!(
            gather_context(
                &bitmap,
                &reference,
                1,
                1,
                1,
                1,
                RefinementTemplate::Template1,
                &[],
            ),
            1 << 7
        );
    }

    #[test]
    fn sltp_contexts_are_the_reference_centre_bit() {
        let bitmap = Bitmap::new(3, 3).unwrap();
        let mut reference = Bitmap::new(3, 3).unwrap();
        reference.set(1, 1, true);

        // With only the reference centre set and the adaptive pixels over
        // blank positions, the gathered context for the centre pixel is
        // exactly the SLTP pseudo-pixel context of the template.
        let at = [AtPixel::new(-1, -1).unwrap(), AtPixel::new(-1, -1).unwrap()];
        assert_eq!(
            gather_context(
                &bitmap,
                &reference,
                1,
                1,
                0,
                0,
                RefinementTemplate::Template0,
                &at,
            ) as usize,
            RefinementTemplate::Template0.sltp_context()
        );
        assert_eq!(
            gather_context(
                &bitmap,
                &reference,
                1,
                1,
                0,
                0,
                RefinementTemplate::Template1,
                &[],
            ) as usize,
            RefinementTemplate::Template1.sltp_context()
        );
    }
}

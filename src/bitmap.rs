//! A bi-level bitmap.

use crate::error::{RegionError, Result, bail};

/// The largest width or height a decoded bitmap may have.
pub(crate) const MAX_IMAGE_SIZE: u32 = 65535;

/// A bi-level bitmap, one pixel per `bool`, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Bitmap {
    /// Create an all-zero bitmap. Both dimensions must be positive and at
    /// most [`MAX_IMAGE_SIZE`].
    pub(crate) fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || width > MAX_IMAGE_SIZE || height == 0 || height > MAX_IMAGE_SIZE {
            bail!(RegionError::InvalidDimension);
        }

        Ok(Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        })
    }

    /// Build a bitmap from packed rows, 8 pixels per byte MSB-first, each
    /// row padded to a whole byte.
    pub(crate) fn from_packed(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let mut bitmap = Self::new(width, height)?;
        let stride = (width as usize).div_ceil(8);

        if bytes.len() < stride * height as usize {
            bail!(RegionError::InvalidDimension);
        }

        for y in 0..height {
            let row = &bytes[y as usize * stride..];
            for x in 0..width {
                let bit = row[x as usize / 8] >> (7 - x % 8) & 1;
                bitmap.set(x, y, bit != 0);
            }
        }

        Ok(bitmap)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at `(x, y)`, where anything outside the bitmap is 0.
    #[inline(always)]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width as i32 || y < 0 || y >= self.height as i32 {
            return false;
        }

        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    /// Set every pixel to the given value.
    pub(crate) fn fill(&mut self, value: bool) {
        self.data.fill(value);
    }

    /// Copy a whole row from `src_y` to `dst_y`.
    pub(crate) fn copy_row(&mut self, dst_y: u32, src_y: u32) {
        let width = self.width as usize;
        let src = src_y as usize * width;
        let dst = dst_y as usize * width;
        self.data.copy_within(src..src + width, dst);
    }

    /// Extract the `width` by `height` rectangle with its top-left corner at
    /// `(x, y)`. Pixels outside the source read as 0.
    pub(crate) fn sub_image(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Self> {
        let mut out = Self::new(width, height)?;

        for oy in 0..height {
            for ox in 0..width {
                if self.get(x + ox as i32, y + oy as i32) {
                    out.set(ox, oy, true);
                }
            }
        }

        Ok(out)
    }

    /// OR `src` onto this bitmap with its top-left corner at `(x, y)`.
    /// Parts of `src` falling outside this bitmap are clipped.
    pub(crate) fn draw(&mut self, src: &Self, x: i32, y: i32) {
        for sy in 0..src.height {
            let dy = y + sy as i32;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }

            for sx in 0..src.width {
                let dx = x + sx as i32;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }

                if src.get(sx as i32, sy as i32) {
                    self.set(dx as u32, dy as u32, true);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&[u8]]) -> Self {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut bitmap = Self::new(width, height).unwrap();

        for (y, row) in rows.iter().enumerate() {
            for (x, &pixel) in row.iter().enumerate() {
                bitmap.set(x as u32, y as u32, pixel != 0);
            }
        }

        bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_oversized_dimensions_are_rejected() {
        assert!(Bitmap::new(0, 1).is_err());
        assert!(Bitmap::new(1, 0).is_err());
        assert!(Bitmap::new(MAX_IMAGE_SIZE + 1, 1).is_err());
        assert!(Bitmap::new(1, MAX_IMAGE_SIZE).is_ok());
    }

    #[test]
    fn out_of_bounds_reads_are_zero() {
        let mut bitmap = Bitmap::new(2, 2).unwrap();
        bitmap.set(1, 1, true);

        assert!(bitmap.get(1, 1));
        assert!(!bitmap.get(-1, 0));
        assert!(!bitmap.get(0, -1));
        assert!(!bitmap.get(2, 0));
        assert!(!bitmap.get(0, 2));
    }

    #[test]
    fn packed_rows_are_msb_first_and_byte_padded() {
        // 9 pixels wide, so each row takes two bytes.
        let bitmap = Bitmap::from_packed(9, 2, &[0b1010_0000, 0b1000_0000, 0xFF, 0x80]).unwrap();

        assert!(bitmap.get(0, 0));
        assert!(!bitmap.get(1, 0));
        assert!(bitmap.get(2, 0));
        assert!(bitmap.get(8, 0));
        assert!((0..9).all(|x| bitmap.get(x, 1)));
    }

    #[test]
    fn packed_rows_must_cover_the_bitmap() {
        assert!(Bitmap::from_packed(9, 2, &[0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn sub_image_clips_to_zero() {
        let src = Bitmap::from_rows(&[&[1, 1, 0], &[0, 1, 1]]);
        let sub = src.sub_image(1, 0, 3, 2).unwrap();

        assert_eq!(sub, Bitmap::from_rows(&[&[1, 0, 0], &[1, 1, 0]]));
    }

    #[test]
    fn draw_ors_pixels() {
        let src = Bitmap::from_rows(&[&[1, 0]]);
        let mut dst = Bitmap::from_rows(&[&[0, 1]]);
        dst.draw(&src, 0, 0);

        assert_eq!(dst, Bitmap::from_rows(&[&[1, 1]]));
    }

    #[test]
    fn draw_clips_outside_destination() {
        let src = Bitmap::from_rows(&[&[1, 1], &[1, 1]]);
        let mut dst = Bitmap::new(2, 2).unwrap();
        dst.draw(&src, 1, -1);

        assert_eq!(dst, Bitmap::from_rows(&[&[0, 1], &[0, 0]]));
    }
}

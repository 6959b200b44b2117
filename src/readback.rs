//! Pixel readback from either rendering backend.
//!
//! Accelerated buffers are bottom-up; everything handed to the controller is
//! top-down. The flip happens here and nowhere else.

use std::io::Cursor;

use image::{ImageOutputFormat, RgbaImage, imageops};

use crate::error::CommandError;
use crate::host::{AcceleratedSurface, Canvas};

/// Full top-down image of an accelerated surface.
pub fn read_accelerated(surface: &dyn AcceleratedSurface, width: u32, height: u32) -> RgbaImage {
    let mut pixels = surface.read_pixels(0, 0, width, height);
    pixels.resize(width as usize * height as usize * 4, 0);
    let mut img = RgbaImage::from_raw(width, height, pixels)
        .unwrap_or_else(|| RgbaImage::new(width, height));
    imageops::flip_vertical_in_place(&mut img);
    img
}

/// Top-down image of whichever context the canvas exposes, preferring the
/// accelerated one.
pub fn snapshot(canvas: &dyn Canvas) -> Option<RgbaImage> {
    if let Some(gl) = canvas.accelerated() {
        return Some(read_accelerated(gl, canvas.width(), canvas.height()));
    }
    canvas.immediate().map(|ctx| ctx.snapshot())
}

/// `count` contiguous pixels starting at the canvas center, in surface
/// coordinates. Always returns exactly `count` tuples.
pub fn sample_center(
    surface: &dyn AcceleratedSurface,
    width: u32,
    height: u32,
    count: u32,
) -> ((u32, u32), Vec<[u8; 4]>) {
    let origin = (width / 2, height / 2);
    let mut pixels = surface.read_pixels(origin.0, origin.1, count, 1);
    pixels.resize(count as usize * 4, 0);
    let tuples = pixels
        .chunks_exact(4)
        .map(|px| [px[0], px[1], px[2], px[3]])
        .collect();
    (origin, tuples)
}

/// What a browser canvas reports for a zero-area `toDataURL`.
pub const EMPTY_DATA_URL: &str = "data:,";

/// PNG data URL of `img`; [`EMPTY_DATA_URL`] when it has no pixels.
pub fn to_data_url(img: &RgbaImage) -> Result<String, CommandError> {
    if img.width() == 0 || img.height() == 0 {
        return Ok(EMPTY_DATA_URL.to_string());
    }
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|e| CommandError::Encode(e.to_string()))?;
    Ok(format!("data:image/png;base64,{}", base64::encode(&png)))
}

/// Inverse of [`to_data_url`].
pub fn decode_data_url(data_url: &str) -> Option<RgbaImage> {
    let encoded = data_url.strip_prefix("data:image/png;base64,")?;
    let bytes = base64::decode(encoded).ok()?;
    image::load_from_memory(&bytes).ok().map(|img| img.to_rgba8())
}

/// Copy a top-down image into a bottom-up buffer, as a GPU framebuffer holds it.
pub fn to_bottom_up(img: &RgbaImage) -> Vec<u8> {
    imageops::flip_vertical(img).into_raw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct BottomUp {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    }

    impl AcceleratedSurface for BottomUp {
        fn read_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
            let mut out = vec![0u8; (w * h * 4) as usize];
            for row in 0..h {
                for col in 0..w {
                    let (sx, sy) = (x + col, y + row);
                    if sx < self.width && sy < self.height {
                        let src = ((sy * self.width + sx) * 4) as usize;
                        let dst = ((row * w + col) * 4) as usize;
                        out[dst..dst + 4].copy_from_slice(&self.pixels[src..src + 4]);
                    }
                }
            }
            out
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8 * 10, y as u8 * 10, 7, 255]))
    }

    #[test]
    fn accelerated_readback_is_top_down() {
        let img = gradient(4, 3);
        let surface = BottomUp {
            width: 4,
            height: 3,
            pixels: to_bottom_up(&img),
        };
        assert_eq!(read_accelerated(&surface, 4, 3), img);
    }

    #[test]
    fn center_sample_pads_out_of_range_pixels() {
        let img = gradient(12, 4);
        let surface = BottomUp {
            width: 12,
            height: 4,
            pixels: to_bottom_up(&img),
        };
        let (origin, tuples) = sample_center(&surface, 12, 4, 10);
        assert_eq!(origin, (6, 2));
        assert_eq!(tuples.len(), 10);
        // surface row 2 from the bottom is image row 1
        assert_eq!(tuples[0], [60, 10, 7, 255]);
        assert_eq!(tuples[5], [110, 10, 7, 255]);
        assert_eq!(tuples[6], [0, 0, 0, 0]);
    }

    #[test]
    fn empty_images_encode_as_empty_data_url() {
        assert_eq!(to_data_url(&RgbaImage::new(0, 0)).unwrap(), EMPTY_DATA_URL);
        assert_eq!(to_data_url(&RgbaImage::new(3, 0)).unwrap(), EMPTY_DATA_URL);
        assert!(decode_data_url(EMPTY_DATA_URL).is_none());
    }

    #[test]
    fn data_url_decodes_back_to_pixels() {
        let img = gradient(5, 5);
        let url = to_data_url(&img).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), img);
    }
}

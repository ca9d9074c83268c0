//! Dominant color classification.
//!
//! The analysis works on the central half of the image, downsampled to a
//! fixed grid, and ignores pixels that are too dark or too bright to say
//! anything about the body paint.
use super::palette::CSS3_PALETTE;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::collections::HashMap;

/// Returned when no pixel survives the luminance band.
pub const UNKNOWN_COLOR: &str = "unknown";

/// Side of the square grid the crop is resized to.
pub const SAMPLE_GRID: u32 = 50;

/// Inclusive luminance band of pixels that count toward the tally.
pub const LUMINANCE_BAND: (f64, f64) = (50.0, 200.0);

/// Rec. 709 relative luminance on 0..=255 channels.
pub fn luminance(rgb: [u8; 3]) -> f64 {
    0.2126 * f64::from(rgb[0]) + 0.7152 * f64::from(rgb[1]) + 0.0722 * f64::from(rgb[2])
}

pub fn within_luminance_band(rgb: [u8; 3]) -> bool {
    (LUMINANCE_BAND.0..=LUMINANCE_BAND.1).contains(&luminance(rgb))
}

/// Nearest palette entry by squared RGB distance; first entry wins ties.
pub fn nearest_named(rgb: [u8; 3]) -> &'static str {
    let mut best = CSS3_PALETTE[0];
    let mut best_distance = u32::MAX;
    for entry in CSS3_PALETTE {
        let distance = squared_distance(rgb, entry.1);
        if distance < best_distance {
            best = entry;
            best_distance = distance;
        }
    }
    best.0
}

fn squared_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let delta = i32::from(x) - i32::from(y);
            (delta * delta) as u32
        })
        .sum()
}

/// Classify the dominant color of a decoded image.
pub fn dominant_color(img: &DynamicImage) -> String {
    let sample = central_sample(img);
    match most_frequent_in_band(&sample) {
        Some(rgb) => nearest_named(rgb).to_string(),
        None => UNKNOWN_COLOR.to_string(),
    }
}

/// Crop `[w/4, 3w/4) x [h/4, 3h/4)` and resize to the sample grid.
fn central_sample(img: &DynamicImage) -> image::RgbImage {
    let (width, height) = img.dimensions();
    let left = width / 4;
    let top = height / 4;
    let crop_width = (3 * width / 4).saturating_sub(left).max(1);
    let crop_height = (3 * height / 4).saturating_sub(top).max(1);
    img.crop_imm(left, top, crop_width, crop_height)
        .resize_exact(SAMPLE_GRID, SAMPLE_GRID, FilterType::Triangle)
        .to_rgb8()
}

/// Most frequent exact RGB value inside the luminance band.
///
/// Equal counts resolve to the value seen first in row-major order.
fn most_frequent_in_band(sample: &image::RgbImage) -> Option<[u8; 3]> {
    let mut tally: HashMap<[u8; 3], (usize, usize)> = HashMap::new();
    for (position, pixel) in sample.pixels().enumerate() {
        let rgb = pixel.0;
        if !within_luminance_band(rgb) {
            continue;
        }
        tally.entry(rgb).or_insert((0, position)).0 += 1;
    }
    tally
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(rgb, _)| rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn black_and_white_images_are_unknown() {
        assert_eq!(dominant_color(&uniform(200, 100, [0, 0, 0])), UNKNOWN_COLOR);
        assert_eq!(
            dominant_color(&uniform(200, 100, [255, 255, 255])),
            UNKNOWN_COLOR
        );
    }

    #[test]
    fn mid_luminance_red_maps_to_named_red() {
        let red = [200, 60, 60];
        assert!((luminance(red) - 89.764).abs() < 1e-6);
        assert_eq!(dominant_color(&uniform(320, 240, red)), "firebrick");
    }

    #[test]
    fn border_pixels_outside_central_crop_are_ignored() {
        let mut img = RgbImage::from_pixel(400, 400, Rgb([30, 60, 200]));
        for y in 100..300 {
            for x in 100..300 {
                img.put_pixel(x, y, Rgb([60, 140, 60]));
            }
        }
        assert_eq!(dominant_color(&DynamicImage::ImageRgb8(img)), "seagreen");
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert!(within_luminance_band([50, 50, 50]));
        assert!(within_luminance_band([200, 200, 200]));
        assert!(!within_luminance_band([49, 49, 49]));
        assert!(!within_luminance_band([201, 201, 201]));
    }

    #[test]
    fn nearest_named_ties_resolve_to_palette_order() {
        assert_eq!(nearest_named([128, 128, 128]), "gray");
        assert_eq!(nearest_named([169, 169, 169]), "darkgray");
        assert_eq!(nearest_named([0, 255, 255]), "aqua");
    }

    #[test]
    fn tiny_images_still_sample() {
        assert_eq!(dominant_color(&uniform(1, 1, [100, 100, 100])), "dimgray");
    }
}

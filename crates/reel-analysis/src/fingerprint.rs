//! Perceptual frame fingerprints.
//!
//! A 64-bit difference hash: the luma plane is shrunk to 9x8 and each bit
//! records whether a pixel is brighter than its right neighbor. Hashes of
//! visually similar frames differ in few bits, so near-duplicate windows
//! are found by Hamming distance.

use image::imageops::{self, FilterType};
use image::GrayImage;

use reel_media::GrayFrame;
use reel_models::Fingerprint;

const HASH_WIDTH: u32 = 9;
const HASH_HEIGHT: u32 = 8;

/// Compute the difference hash of a decoded frame.
pub fn fingerprint_frame(frame: &GrayFrame) -> Fingerprint {
    fingerprint_luma(frame.width, frame.height, &frame.data)
}

/// Compute the difference hash of a raw luma plane.
pub fn fingerprint_luma(width: u32, height: u32, data: &[u8]) -> Fingerprint {
    let image = GrayImage::from_raw(width, height, data.to_vec())
        .unwrap_or_else(|| GrayImage::new(HASH_WIDTH, HASH_HEIGHT));
    let small = imageops::resize(&image, HASH_WIDTH, HASH_HEIGHT, FilterType::Triangle);

    let mut bits: u64 = 0;
    for y in 0..HASH_HEIGHT {
        for x in 0..HASH_WIDTH - 1 {
            bits <<= 1;
            if small.get_pixel(x, y)[0] > small.get_pixel(x + 1, y)[0] {
                bits |= 1;
            }
        }
    }
    Fingerprint(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32, step: u8) -> GrayFrame {
        let data: Vec<u8> = (0..height)
            .flat_map(|_| (0..width).map(move |x| (x as u8).wrapping_mul(step)))
            .collect();
        GrayFrame {
            index: 0,
            timestamp: 0.0,
            width,
            height,
            data,
        }
    }

    fn ramp_frame(width: u32, height: u32, descending: bool) -> GrayFrame {
        let data: Vec<u8> = (0..height)
            .flat_map(|_| {
                (0..width).map(move |x| {
                    let v = (x * 255 / (width - 1)) as u8;
                    if descending {
                        255 - v
                    } else {
                        v
                    }
                })
            })
            .collect();
        GrayFrame {
            index: 0,
            timestamp: 0.0,
            width,
            height,
            data,
        }
    }

    #[test]
    fn identical_frames_hash_identically() {
        let a = fingerprint_frame(&gradient_frame(160, 90, 3));
        let b = fingerprint_frame(&gradient_frame(160, 90, 3));
        assert_eq!(a.hamming_distance(&b), 0);
    }

    #[test]
    fn flat_frames_hash_to_zero_bits() {
        let flat = GrayFrame {
            index: 0,
            timestamp: 0.0,
            width: 32,
            height: 18,
            data: vec![128; 32 * 18],
        };
        assert_eq!(fingerprint_frame(&flat), Fingerprint(0));
    }

    #[test]
    fn opposite_ramps_are_maximally_apart() {
        // Ascending luma never has a pixel brighter than its right neighbor;
        // descending luma always does. Every hash bit differs.
        let a = fingerprint_frame(&ramp_frame(160, 90, false));
        let b = fingerprint_frame(&ramp_frame(160, 90, true));
        assert_eq!(a, Fingerprint(0));
        assert_eq!(a.hamming_distance(&b), 64);
    }
}

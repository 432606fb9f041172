//! Deterministic synthetic frames for unit tests.

use ndarray::{Array2, Array3};

use crate::tracker::frame::Frame;

fn noise(x: usize, y: usize, seed: u32) -> u8 {
    let mut v = (x as u32)
        .wrapping_mul(73_856_093)
        ^ (y as u32).wrapping_mul(19_349_663)
        ^ seed.wrapping_mul(83_492_791);
    v ^= v >> 13;
    v = v.wrapping_mul(0x5bd1_e995);
    v ^= v >> 15;
    (v >> 24) as u8
}

pub fn textured_patch(h: usize, w: usize, seed: u32) -> Array2<u8> {
    Array2::from_shape_fn((h, w), |(y, x)| noise(x, y, seed))
}

pub fn gray_scene(h: usize, w: usize, seed: u32) -> Frame {
    Frame::Gray(textured_patch(h, w, seed))
}

pub fn rgb_scene(h: usize, w: usize, seed: u32) -> Frame {
    Frame::Rgb(Array3::from_shape_fn((h, w, 3), |(y, x, c)| {
        noise(x, y, seed.wrapping_add(c as u32 * 7_919))
    }))
}

pub fn flat_scene(h: usize, w: usize, value: u8) -> Frame {
    Frame::Gray(Array2::from_elem((h, w), value))
}

/// Copy `patch` into a grayscale frame with its top-left corner at `(x, y)`.
pub fn paste_gray(frame: &mut Frame, patch: &Array2<u8>, x: usize, y: usize) {
    if let Frame::Gray(pixels) = frame {
        let (ph, pw) = patch.dim();
        pixels
            .slice_mut(ndarray::s![y..y + ph, x..x + pw])
            .assign(patch);
    }
}

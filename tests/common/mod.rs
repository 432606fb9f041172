#![allow(dead_code)]

use hybridtrack_rs::{BoundingBox, Frame};
use ndarray::{Array2, Array3, s};

pub const FRAME_W: usize = 320;
pub const FRAME_H: usize = 200;
pub const TARGET_SIDE: usize = 20;

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

pub fn patch(side: usize, seed: u32) -> Array2<u8> {
    Array2::from_shape_fn((side, side), |(y, x)| noise(x, y, seed))
}

pub fn background(h: usize, w: usize, seed: u32) -> Array2<u8> {
    Array2::from_shape_fn((h, w), |(y, x)| noise(x, y, seed))
}

/// Textured background with `target` pasted at `(x, y)`.
pub fn scene(target: &Array2<u8>, x: usize, y: usize) -> Frame {
    let mut pixels = background(FRAME_H, FRAME_W, 1);
    let (h, w) = target.dim();
    pixels.slice_mut(s![y..y + h, x..x + w]).assign(target);
    Frame::from_gray(pixels)
}

/// Color variant of [`scene`]; the target patch is tinted per channel.
pub fn rgb_scene(target: &Array2<u8>, x: usize, y: usize) -> Frame {
    let gray = background(FRAME_H, FRAME_W, 2);
    let mut pixels = Array3::from_shape_fn((FRAME_H, FRAME_W, 3), |(r, c, ch)| {
        gray[[r, c]].wrapping_add(ch as u8 * 40)
    });
    let (h, w) = target.dim();
    for ch in 0..3 {
        let tinted = target.mapv(|v| v / (ch as u8 + 1));
        pixels
            .slice_mut(s![y..y + h, x..x + w, ch])
            .assign(&tinted);
    }
    Frame::Rgb(pixels)
}

pub fn flat(h: usize, w: usize, value: u8) -> Frame {
    Frame::from_gray(Array2::from_elem((h, w), value))
}

pub fn target_box(x: usize, y: usize) -> BoundingBox {
    BoundingBox::new(x as i32, y as i32, TARGET_SIDE as i32, TARGET_SIDE as i32)
}

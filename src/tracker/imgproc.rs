//! Classical image-matching primitives used by the tracking engine.
//!
//! Everything here works on [`GrayImage`] (f32 intensities on the 0..=255
//! scale) or on RGB crops, and is deterministic: ties are broken in raster
//! order, first occurrence wins.

use std::fmt;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{Array1, Array2, ArrayView3};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::tracker::frame::GrayImage;

/// Number of intensity histogram bins.
pub const INTENSITY_BINS: usize = 16;
/// Hue bins over the 0..180 hue range.
pub const HUE_BINS: usize = 12;
/// Saturation bins over the 0..256 saturation range.
pub const SATURATION_BINS: usize = 8;

const FLAT_EPSILON: f64 = 1e-6;

/// Best normalized cross-correlation response of a template inside an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Zero-mean normalized correlation in [-1, 1].
    pub score: f32,
    /// Column of the template's top-left corner inside the searched image.
    pub x: usize,
    /// Row of the template's top-left corner inside the searched image.
    pub y: usize,
}

/// Bilinear resize with pixel-center alignment; shrinking averages over the
/// covered source pixels.
pub fn resize(src: &GrayImage, width: usize, height: usize) -> GrayImage {
    let (src_h, src_w) = src.dim();
    if src_h == 0 || src_w == 0 || width == 0 || height == 0 {
        return Array2::zeros((height, width));
    }
    if (src_h, src_w) == (height, width) {
        return src.clone();
    }

    // float pixels are clamped to [0, 1] while resampling
    let unit: Vec<f32> = src.iter().map(|&v| v / 255.0).collect();
    let Some(buffer) = ImageBuffer::<Luma<f32>, _>::from_raw(src_w as u32, src_h as u32, unit)
    else {
        return Array2::zeros((height, width));
    };
    let resized = imageops::resize(&buffer, width as u32, height as u32, FilterType::Triangle);
    match Array2::from_shape_vec((height, width), resized.into_raw()) {
        Ok(dst) => dst * 255.0,
        Err(_) => Array2::zeros((height, width)),
    }
}

/// Slide `template` over `image` and return the best zero-mean NCC response.
///
/// Returns `None` when the template is empty or larger than the image in
/// either dimension. Positions whose image patch (or the template itself) is
/// flat score 0. Use [`SearchImage`] to match several templates against the
/// same image.
pub fn match_template(image: &GrayImage, template: &GrayImage) -> Option<TemplateMatch> {
    SearchImage::new(image).best_match(template)
}

/// Multiply-adds needed to score every placement of a `tw x th` template in a
/// `width x height` image, with whichever strategy [`SearchImage`] picks.
pub fn correlation_cost(width: usize, height: usize, tw: usize, th: usize) -> u64 {
    if tw == 0 || th == 0 || tw > width || th > height {
        return 0;
    }
    direct_cost(width, height, tw, th).min(spectral_cost(width, height))
}

fn direct_cost(width: usize, height: usize, tw: usize, th: usize) -> u64 {
    let positions = ((width - tw + 1) * (height - th + 1)) as u64;
    positions * (tw * th) as u64
}

/// Template spectrum, product, inverse transform. The image spectrum is
/// shared by every template matched against the same [`SearchImage`].
fn spectral_cost(width: usize, height: usize) -> u64 {
    let padded = (fft_len(width) * fft_len(height)) as u64;
    let log = u64::from(padded.max(2).ilog2() + 1);
    3 * padded * log
}

/// A grayscale image prepared for repeated template matching.
///
/// Window sums come from integral images. The correlation numerator is
/// computed directly for small searches and through 2D FFTs otherwise; the
/// image spectrum is computed once and reused.
pub struct SearchImage {
    width: usize,
    height: usize,
    pixels: Vec<f64>,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    planner: FftPlanner<f64>,
    spectrum: Option<Vec<Complex<f64>>>,
}

impl fmt::Debug for SearchImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("spectrum", &self.spectrum.is_some())
            .finish()
    }
}

impl SearchImage {
    pub fn new(image: &GrayImage) -> Self {
        let (height, width) = image.dim();
        let pixels: Vec<f64> = image.iter().map(|&v| v as f64).collect();
        let (sum, sum_sq) = integral_images(&pixels, width, height);
        Self {
            width,
            height,
            pixels,
            sum,
            sum_sq,
            planner: FftPlanner::new(),
            spectrum: None,
        }
    }

    /// Best zero-mean NCC placement of `template`; ties go to the first
    /// position in raster order.
    pub fn best_match(&mut self, template: &GrayImage) -> Option<TemplateMatch> {
        let (ih, iw) = (self.height, self.width);
        let (th, tw) = template.dim();
        if th == 0 || tw == 0 || th > ih || tw > iw {
            return None;
        }

        let n = (th * tw) as f64;
        let tmpl: Vec<f64> = template.iter().map(|&v| v as f64).collect();
        let t_mean = tmpl.iter().sum::<f64>() / n;
        let tmpl: Vec<f64> = tmpl.into_iter().map(|v| v - t_mean).collect();
        let t_norm2: f64 = tmpl.iter().map(|v| v * v).sum();

        let (cols, rows) = (iw - tw + 1, ih - th + 1);
        let numerators = if direct_cost(iw, ih, tw, th) <= spectral_cost(iw, ih) {
            self.direct_numerators(&tmpl, tw, th)
        } else {
            self.spectral_numerators(&tmpl, tw, th)
        };

        let stride = iw + 1;
        let window_sum = |table: &[f64], x: usize, y: usize| {
            table[(y + th) * stride + x + tw] - table[y * stride + x + tw]
                - table[(y + th) * stride + x]
                + table[y * stride + x]
        };

        let mut best = TemplateMatch {
            score: f32::NEG_INFINITY,
            x: 0,
            y: 0,
        };
        for y in 0..rows {
            for x in 0..cols {
                let s = window_sum(&self.sum, x, y);
                let variance = window_sum(&self.sum_sq, x, y) - s * s / n;
                let denom = (variance.max(0.0) * t_norm2).sqrt();
                let score = if denom <= FLAT_EPSILON {
                    0.0
                } else {
                    (numerators[y * cols + x] / denom).clamp(-1.0, 1.0) as f32
                };
                if score > best.score {
                    best = TemplateMatch { score, x, y };
                }
            }
        }
        Some(best)
    }

    /// `sum(image * template)` per placement, row-major over placements.
    fn direct_numerators(&self, tmpl: &[f64], tw: usize, th: usize) -> Vec<f64> {
        let iw = self.width;
        let (cols, rows) = (iw - tw + 1, self.height - th + 1);
        let mut out = Vec::with_capacity(cols * rows);
        for y in 0..rows {
            for x in 0..cols {
                let mut num = 0.0;
                for v in 0..th {
                    let row = &self.pixels[(y + v) * iw + x..(y + v) * iw + x + tw];
                    let trow = &tmpl[v * tw..(v + 1) * tw];
                    num += row.iter().zip(trow).map(|(a, b)| a * b).sum::<f64>();
                }
                out.push(num);
            }
        }
        out
    }

    /// Same as [`direct_numerators`](Self::direct_numerators) via the
    /// correlation theorem. Padding to at least the image size keeps every
    /// valid placement free of wrap-around.
    fn spectral_numerators(&mut self, tmpl: &[f64], tw: usize, th: usize) -> Vec<f64> {
        let (iw, ih) = (self.width, self.height);
        let (pw, ph) = (fft_len(iw), fft_len(ih));

        if self.spectrum.is_none() {
            let mut spectrum = vec![Complex::default(); pw * ph];
            for (y, row) in self.pixels.chunks_exact(iw).enumerate() {
                for (x, &v) in row.iter().enumerate() {
                    spectrum[y * pw + x].re = v;
                }
            }
            fft_2d(&mut self.planner, &mut spectrum, pw, ph, false);
            self.spectrum = Some(spectrum);
        }

        let mut product = vec![Complex::default(); pw * ph];
        for (v, row) in tmpl.chunks_exact(tw).enumerate() {
            for (u, &t) in row.iter().enumerate() {
                product[v * pw + u].re = t;
            }
        }
        fft_2d(&mut self.planner, &mut product, pw, ph, false);
        if let Some(spectrum) = &self.spectrum {
            for (p, s) in product.iter_mut().zip(spectrum) {
                *p = *s * p.conj();
            }
        }
        fft_2d(&mut self.planner, &mut product, pw, ph, true);

        let scale = 1.0 / (pw * ph) as f64;
        let (cols, rows) = (iw - tw + 1, ih - th + 1);
        let mut out = Vec::with_capacity(cols * rows);
        for y in 0..rows {
            out.extend(product[y * pw..y * pw + cols].iter().map(|c| c.re * scale));
        }
        out
    }
}

/// In-place 2D transform of a row-major `width x height` buffer.
fn fft_2d(
    planner: &mut FftPlanner<f64>,
    data: &mut Vec<Complex<f64>>,
    width: usize,
    height: usize,
    inverse: bool,
) {
    let (rows, cols) = if inverse {
        (planner.plan_fft_inverse(width), planner.plan_fft_inverse(height))
    } else {
        (planner.plan_fft_forward(width), planner.plan_fft_forward(height))
    };
    rows.process(data);
    let mut transposed = transpose(data, width, height);
    cols.process(&mut transposed);
    *data = transpose(&transposed, height, width);
}

fn transpose(data: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::default(); data.len()];
    for (y, row) in data.chunks_exact(width).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            out[x * height + y] = v;
        }
    }
    out
}

/// Smallest length `>= n` with no prime factor above 5.
fn fft_len(n: usize) -> usize {
    let smooth = |mut m: usize| {
        for p in [2, 3, 5] {
            while m % p == 0 {
                m /= p;
            }
        }
        m == 1
    };
    (n.max(1)..).find(|&m| smooth(m)).unwrap_or(n)
}

/// Summed-area tables of the values and their squares, `(w + 1) x (h + 1)`.
fn integral_images(img: &[f64], width: usize, height: usize) -> (Vec<f64>, Vec<f64>) {
    let stride = width + 1;
    let mut sum = vec![0.0; stride * (height + 1)];
    let mut sum_sq = vec![0.0; stride * (height + 1)];
    for y in 0..height {
        let (mut row, mut row_sq) = (0.0, 0.0);
        for x in 0..width {
            let v = img[y * width + x];
            row += v;
            row_sq += v * v;
            sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
            sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
        }
    }
    (sum, sum_sq)
}

/// NCC between two images of identical shape; 0 on a shape mismatch.
pub fn correlation(a: &GrayImage, b: &GrayImage) -> f32 {
    if a.dim() != b.dim() {
        return 0.0;
    }
    match_template(a, b).map_or(0.0, |m| m.score)
}

/// L2-normalized intensity histogram with [`INTENSITY_BINS`] bins over 0..256.
pub fn intensity_histogram(image: &GrayImage) -> Array1<f32> {
    let mut hist = Array1::zeros(INTENSITY_BINS);
    let bin_width = 256.0 / INTENSITY_BINS as f32;
    for &v in image.iter() {
        let bin = ((v / bin_width).floor().max(0.0) as usize).min(INTENSITY_BINS - 1);
        hist[bin] += 1.0;
    }
    normalize_l2(&mut hist);
    hist
}

/// L2-normalized 2D hue/saturation histogram of an RGB crop, flattened
/// hue-major (`HUE_BINS x SATURATION_BINS`).
pub fn hue_saturation_histogram(rgb: &ArrayView3<'_, u8>) -> Array1<f32> {
    let mut hist = Array1::zeros(HUE_BINS * SATURATION_BINS);
    let (h, w, _) = rgb.dim();
    for y in 0..h {
        for x in 0..w {
            let (hue, sat) = hue_saturation(rgb[[y, x, 0]], rgb[[y, x, 1]], rgb[[y, x, 2]]);
            let hb = ((hue / (180.0 / HUE_BINS as f32)) as usize).min(HUE_BINS - 1);
            let sb = ((sat / (256.0 / SATURATION_BINS as f32)) as usize).min(SATURATION_BINS - 1);
            hist[hb * SATURATION_BINS + sb] += 1.0;
        }
    }
    normalize_l2(&mut hist);
    hist
}

/// Hue in [0, 180) and saturation in [0, 255] of an 8-bit RGB pixel.
fn hue_saturation(r: u8, g: u8, b: u8) -> (f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);
    let sat = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    if diff <= 0.0 {
        return (0.0, sat);
    }
    let mut hue = if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    ((hue / 2.0).min(179.999), sat)
}

pub fn normalize_l2(hist: &mut Array1<f32>) {
    let norm = hist.dot(hist).sqrt();
    if norm > 0.0 {
        hist.mapv_inplace(|v| v / norm);
    }
}

/// Pearson correlation of two histograms; two flat histograms compare as 1.
pub fn histogram_correlation(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;
    let (mut num, mut den_a, mut den_b) = (0.0, 0.0, 0.0);
    for (&va, &vb) in a.iter().zip(b.iter()) {
        let da = va as f64 - mean_a;
        let db = vb as f64 - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }
    let denom = den_a * den_b;
    if denom.abs() > f64::EPSILON {
        (num / denom.sqrt()) as f32
    } else {
        1.0
    }
}

/// In-place `(1 - rate) * target + rate * sample`.
pub fn blend_into(target: &mut GrayImage, sample: &GrayImage, rate: f32) {
    if target.dim() != sample.dim() {
        return;
    }
    target.zip_mut_with(sample, |t, &s| *t = (1.0 - rate) * *t + rate * s);
}

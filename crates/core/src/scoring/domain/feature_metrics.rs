//! Per-frame visual signals.
//!
//! All metrics are pure functions of the pixel data. Grayscale conversion uses
//! the ITU-R BT.601 luma weights in 14-bit fixed point and hue is expressed on
//! the 8-bit `[0, 180)` scale, so values are comparable with the conventional
//! OpenCV definitions.

use ndarray::{Array2, ArrayView2, Zip};

use crate::shared::constants::{CANNY_HIGH_THRESHOLD, CANNY_LOW_THRESHOLD};
use crate::shared::frame::Frame;

/// The four signals combined by the scorer. Computed once per admitted frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureVector {
    pub sharpness: f64,
    pub color_variance: f64,
    pub edge_density: f64,
    pub symmetry: f64,
}

impl FeatureVector {
    /// Computes every metric, converting to grayscale only once.
    pub fn extract(frame: &Frame) -> Self {
        let gray = grayscale(frame);
        Self {
            sharpness: laplacian_variance(gray.view()),
            color_variance: color_variance(frame),
            edge_density: canny_density(gray.view()),
            symmetry: mirror_symmetry(gray.view()),
        }
    }

    /// Same as [`extract`](Self::extract) for a frame whose sharpness the
    /// content gate already measured.
    pub fn with_sharpness(frame: &Frame, sharpness: f64) -> Self {
        let gray = grayscale(frame);
        Self {
            sharpness,
            color_variance: color_variance(frame),
            edge_density: canny_density(gray.view()),
            symmetry: mirror_symmetry(gray.view()),
        }
    }
}

/// Variance of the Laplacian of the grayscale frame. Flat frames score 0.
pub fn sharpness(frame: &Frame) -> f64 {
    laplacian_variance(grayscale(frame).view())
}

/// Variance of the hue channel, independent of brightness.
pub fn color_variance(frame: &Frame) -> f64 {
    let hues = hue_channel(frame);
    variance(hues.iter().map(|&h| h as f64), hues.len())
}

/// Mean Canny edge-map intensity per pixel, in `[0, 255]`.
pub fn edge_density(frame: &Frame) -> f64 {
    canny_density(grayscale(frame).view())
}

/// `1 / (1 + mse)` between the left half and the mirrored right half.
///
/// The split is at `width / 2`; for odd widths the center column belongs to
/// neither compared half.
pub fn symmetry(frame: &Frame) -> f64 {
    mirror_symmetry(grayscale(frame).view())
}

/// BT.601 luma weights scaled by `2^14`; they sum to exactly `2^14`.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// BT.601 luma in fixed point, rounded to 8 bits. Single-channel frames pass through.
pub fn grayscale(frame: &Frame) -> Array2<u8> {
    let pixels = frame.as_ndarray();
    let (h, w) = (frame.height() as usize, frame.width() as usize);
    if frame.channels() < 3 {
        return Array2::from_shape_fn((h, w), |(y, x)| pixels[[y, x, 0]]);
    }
    Array2::from_shape_fn((h, w), |(y, x)| {
        luma(pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]])
    })
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    ((sum + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// Hue of every pixel on the 8-bit `[0, 180)` scale; achromatic pixels are 0.
pub fn hue_channel(frame: &Frame) -> Array2<u8> {
    let pixels = frame.as_ndarray();
    let (h, w) = (frame.height() as usize, frame.width() as usize);
    if frame.channels() < 3 {
        return Array2::zeros((h, w));
    }
    Array2::from_shape_fn((h, w), |(y, x)| {
        hue_8bit(pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]])
    })
}

/// Hue in degrees halved, rounded half up. Red wins ties for the maximum, then green.
pub fn hue_8bit(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);
    if diff == 0 {
        return 0;
    }
    let sector = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut hue = (sector as f64 * 30.0 / diff as f64 + 0.5).floor() as i32;
    if hue < 0 {
        hue += 180;
    }
    hue as u8
}

fn laplacian_variance(gray: ArrayView2<'_, u8>) -> f64 {
    let lap = laplacian(gray);
    variance(lap.iter().copied(), lap.len())
}

/// 4-neighbour Laplacian with reflect-101 borders (`gfedcb|abcdefgh|gfedcba`).
fn laplacian(gray: ArrayView2<'_, u8>) -> Array2<f64> {
    let (h, w) = gray.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let at = |dy: isize, dx: isize| {
            gray[[
                reflect_101(y as isize + dy, h),
                reflect_101(x as isize + dx, w),
            ]] as f64
        };
        at(-1, 0) + at(1, 0) + at(0, -1) + at(0, 1) - 4.0 * at(0, 0)
    })
}

fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = i;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

fn canny_density(gray: ArrayView2<'_, u8>) -> f64 {
    let edges = canny(gray, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
    if edges.is_empty() {
        return 0.0;
    }
    let total: u64 = edges.iter().map(|&p| p as u64).sum();
    total as f64 / edges.len() as f64
}

/// `tan(22.5°)` in Q15, for binning gradient directions without floats.
const TAN_22_5_Q15: i64 = 13_573;
const ANGLE_SHIFT: u32 = 15;

/// Canny edge map (0 or 255) on the unsmoothed image.
///
/// 3x3 Sobel with replicated borders, L1 magnitude `|gx| + |gy|`, non-maximum
/// suppression over four direction bins, then hysteresis: a pixel above
/// `high` seeds an edge which grows through 8-connected pixels above `low`.
fn canny(gray: ArrayView2<'_, u8>, low: i32, high: i32) -> Array2<u8> {
    let (h, w) = gray.dim();
    let (low, high) = if low > high { (high, low) } else { (low, high) };
    if h == 0 || w == 0 {
        return Array2::zeros((h, w));
    }
    let Some(img) = image::GrayImage::from_raw(w as u32, h as u32, gray.iter().copied().collect())
    else {
        return Array2::zeros((h, w));
    };

    let gx = imageproc::gradients::horizontal_sobel(&img);
    let gy = imageproc::gradients::vertical_sobel(&img);
    let grad = |y: usize, x: usize| {
        (
            gx.get_pixel(x as u32, y as u32).0[0] as i32,
            gy.get_pixel(x as u32, y as u32).0[0] as i32,
        )
    };
    let mag = Array2::from_shape_fn((h, w), |(y, x)| {
        let (dx, dy) = grad(y, x);
        dx.abs() + dy.abs()
    });
    // Outside the image the magnitude is zero.
    let mag_at = |y: isize, x: isize| -> i32 {
        if y < 0 || x < 0 || y >= h as isize || x >= w as isize {
            0
        } else {
            mag[[y as usize, x as usize]]
        }
    };

    let mut candidates = Array2::from_elem((h, w), false);
    let mut seeds = Vec::new();
    for ((y, x), &m) in mag.indexed_iter() {
        if m <= low {
            continue;
        }
        let (dx, dy) = grad(y, x);
        let ax = dx.unsigned_abs() as i64;
        let ay = (dy.unsigned_abs() as i64) << ANGLE_SHIFT;
        let tg22 = ax * TAN_22_5_Q15;
        let (yi, xi) = (y as isize, x as isize);

        let is_peak = if ay < tg22 {
            m > mag_at(yi, xi - 1) && m >= mag_at(yi, xi + 1)
        } else if ay > tg22 + (ax << (ANGLE_SHIFT + 1)) {
            m > mag_at(yi - 1, xi) && m >= mag_at(yi + 1, xi)
        } else {
            let s = if (dx < 0) != (dy < 0) { -1 } else { 1 };
            m > mag_at(yi - 1, xi - s) && m > mag_at(yi + 1, xi + s)
        };
        if is_peak {
            candidates[[y, x]] = true;
            if m > high {
                seeds.push((y, x));
            }
        }
    }
    trace_hysteresis(&candidates, seeds)
}

/// Marks every candidate 8-connected to a seed, seeds included.
fn trace_hysteresis(candidates: &Array2<bool>, seeds: Vec<(usize, usize)>) -> Array2<u8> {
    let (h, w) = candidates.dim();
    let mut edges = Array2::zeros((h, w));
    let mut stack = seeds;
    for &(y, x) in &stack {
        edges[[y, x]] = 255;
    }
    while let Some((y, x)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                if candidates[[ny, nx]] && edges[[ny, nx]] == 0 {
                    edges[[ny, nx]] = 255;
                    stack.push((ny, nx));
                }
            }
        }
    }
    edges
}

fn mirror_symmetry(gray: ArrayView2<'_, u8>) -> f64 {
    let (h, w) = gray.dim();
    let half = w / 2;
    if half == 0 || h == 0 {
        return 1.0;
    }
    let left = gray.slice(ndarray::s![.., ..half]);
    let right = gray.slice(ndarray::s![.., w - half..;-1]);

    let mut sum_sq = 0.0;
    Zip::from(&left).and(&right).for_each(|&l, &r| {
        let d = l as f64 - r as f64;
        sum_sq += d * d;
    });
    let mse = sum_sq / (h * half) as f64;
    1.0 / (1.0 + mse)
}

/// Population variance; 0 for an empty sample.
fn variance(values: impl Iterator<Item = f64> + Clone, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64
}

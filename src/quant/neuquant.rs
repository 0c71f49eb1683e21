//! NeuQuant neural-net color quantization.
//!
//! Anthony Dekker, "Kohonen neural networks for optimal colour quantization",
//! Network: Computation in Neural Systems 5 (1994), pp. 351-367.
//!
//! A one-dimensional self-organising map of 255 neurons is trained on a
//! strided sample of the frame. Two neurons are pinned to pure black and pure
//! white; the other 253 start on the gray ramp and drift toward the colors
//! they win. After training the network is rounded, sorted by green, and
//! indexed so lookups only scan neighbours whose green is close enough to
//! still beat the best match.

use crate::core::frame::{blue, green, red};
use crate::error::{GifError, GifResult};

use super::{Palette, Quantizer};

const NET_SIZE: usize = 255;
const SPECIALS: usize = 2;
const CUT_NET_SIZE: usize = NET_SIZE - SPECIALS;
const MAX_NET_POS: usize = NET_SIZE - 1;

/// Learning cycles over the sample set.
const CYCLES: usize = 100;

const INIT_RAD: i32 = (NET_SIZE / 8) as i32;
const RADIUS_BIAS_SHIFT: i32 = 6;
const INIT_BIAS_RADIUS: i32 = INIT_RAD << RADIUS_BIAS_SHIFT;
const RADIUS_DEC: i32 = 30;

const INIT_ALPHA: i32 = 1 << 10;

const GAMMA: f64 = 1024.0;
const BETA: f64 = 1.0 / 1024.0;
const BETA_GAMMA: f64 = BETA * GAMMA;

/// Strides near 500; one of them will not divide any realistic frame size.
const PRIMES: [usize; 4] = [499, 491, 487, 503];

/// Below this many pixels every pixel is sampled.
const MIN_PICTURE_PIXELS: usize = 3 * PRIMES[3];

pub const MIN_SAMPLE_FACTOR: u32 = 1;
pub const MAX_SAMPLE_FACTOR: u32 = 30;

pub fn validate_sample_factor(sample_factor: u32) -> GifResult<()> {
    if !(MIN_SAMPLE_FACTOR..=MAX_SAMPLE_FACTOR).contains(&sample_factor) {
        return Err(GifError::validation(
            "sample_factor",
            format!("must be within {}..={}", MIN_SAMPLE_FACTOR, MAX_SAMPLE_FACTOR),
            sample_factor.to_string(),
        ));
    }
    Ok(())
}

/// Training state. Dropped once the colormap is fixed.
struct Network {
    neurons: [[f64; 3]; NET_SIZE],
    bias: [f64; NET_SIZE],
    freq: [f64; NET_SIZE],
}

impl Network {
    fn new() -> Self {
        let mut neurons = [[0.0; 3]; NET_SIZE];
        neurons[1] = [255.0; 3];
        for (i, n) in neurons.iter_mut().enumerate().skip(SPECIALS) {
            let v = 255.0 * (i - SPECIALS) as f64 / CUT_NET_SIZE as f64;
            *n = [v; 3];
        }
        Self {
            neurons,
            bias: [0.0; NET_SIZE],
            freq: [1.0 / NET_SIZE as f64; NET_SIZE],
        }
    }

    fn learn(&mut self, pixels: &[u32], sample_factor: u32) {
        let length = pixels.len();
        if length == 0 {
            return;
        }
        let sample_factor = if length < MIN_PICTURE_PIXELS { 1 } else { sample_factor };
        let alphadec = 30 + (sample_factor as i32 - 1) / 3;
        let samples = (length / sample_factor as usize).max(1);
        let delta = samples / CYCLES;
        let mut alpha = INIT_ALPHA;
        let mut bias_radius = INIT_BIAS_RADIUS;
        let mut rad = unbias_radius(bias_radius);

        let step = PRIMES
            .iter()
            .copied()
            .find(|p| length % p != 0)
            .unwrap_or(PRIMES[3]);

        let mut pos = 0;
        for i in 1..=samples {
            let p = pixels[pos];
            let sample = [red(p) as f64, green(p) as f64, blue(p) as f64];

            let j = self
                .special_find(&sample)
                .unwrap_or_else(|| self.contest(&sample));

            if j >= SPECIALS {
                let a = alpha as f64 / INIT_ALPHA as f64;
                self.alter_single(a, j, &sample);
                if rad > 0 {
                    self.alter_neigh(a, rad, j, &sample);
                }
            }

            pos = (pos + step) % length;

            if delta != 0 && i % delta == 0 {
                alpha -= alpha / alphadec;
                bias_radius -= bias_radius / RADIUS_DEC;
                rad = unbias_radius(bias_radius);
            }
        }
    }

    fn special_find(&self, sample: &[f64; 3]) -> Option<usize> {
        self.neurons[..SPECIALS].iter().position(|n| n == sample)
    }

    /// Bias-corrected winner among the learnable neurons.
    ///
    /// Every neuron's frequency decays each call; the plain-distance winner
    /// is rewarded so often-chosen neurons lose bias and idle ones gain it.
    fn contest(&mut self, sample: &[f64; 3]) -> usize {
        let mut best_d = f64::MAX;
        let mut best_bias_d = f64::MAX;
        let mut best_pos = SPECIALS;
        let mut best_bias_pos = SPECIALS;

        for i in SPECIALS..NET_SIZE {
            let n = &self.neurons[i];
            let dist = (n[0] - sample[0]).abs() + (n[1] - sample[1]).abs() + (n[2] - sample[2]).abs();
            if dist < best_d {
                best_d = dist;
                best_pos = i;
            }
            let bias_dist = dist - self.bias[i];
            if bias_dist < best_bias_d {
                best_bias_d = bias_dist;
                best_bias_pos = i;
            }
            self.freq[i] -= BETA * self.freq[i];
            self.bias[i] += BETA_GAMMA * self.freq[i];
        }
        self.freq[best_pos] += BETA;
        self.bias[best_pos] -= BETA_GAMMA;
        best_bias_pos
    }

    fn alter_single(&mut self, alpha: f64, i: usize, sample: &[f64; 3]) {
        move_toward(&mut self.neurons[i], alpha, sample);
    }

    /// Pull neighbours within `rad` toward the sample with parabolic falloff.
    fn alter_neigh(&mut self, alpha: f64, rad: i32, i: usize, sample: &[f64; 3]) {
        let rad = rad as isize;
        let i = i as isize;
        let lo = (i - rad).max(SPECIALS as isize - 1);
        let hi = (i + rad).min(NET_SIZE as isize);
        let rad2 = (rad * rad) as f64;

        let (mut j, mut k, mut q) = (i + 1, i - 1, 0isize);
        while j < hi || k > lo {
            let a = alpha * (rad2 - (q * q) as f64) / rad2;
            q += 1;
            if j < hi {
                move_toward(&mut self.neurons[j as usize], a, sample);
                j += 1;
            }
            if k > lo {
                move_toward(&mut self.neurons[k as usize], a, sample);
                k -= 1;
            }
        }
    }

    /// Round neurons to integer colors clamped to 0..=255.
    fn fix(&self) -> [[u8; 3]; NET_SIZE] {
        let mut colormap = [[0u8; 3]; NET_SIZE];
        for (out, n) in colormap.iter_mut().zip(self.neurons.iter()) {
            for (c, v) in out.iter_mut().zip(n.iter()) {
                *c = ((0.5 + v) as i32).clamp(0, 255) as u8;
            }
        }
        colormap
    }
}

#[inline]
fn move_toward(n: &mut [f64; 3], a: f64, sample: &[f64; 3]) {
    n[0] -= a * (n[0] - sample[0]);
    n[1] -= a * (n[1] - sample[1]);
    n[2] -= a * (n[2] - sample[2]);
}

#[inline]
fn unbias_radius(bias_radius: i32) -> i32 {
    let rad = bias_radius >> RADIUS_BIAS_SHIFT;
    if rad <= 1 { 0 } else { rad }
}

/// Sort the colormap by green and build the green -> start position table.
fn inx_build(colormap: &mut [[u8; 3]; NET_SIZE]) -> [usize; 256] {
    let mut net_index = [0usize; 256];
    let mut previous_col = 0usize;
    let mut start_pos = 0usize;

    for i in 0..NET_SIZE {
        let mut small_pos = i;
        let mut small_val = colormap[i][1] as usize;
        for (j, c) in colormap.iter().enumerate().skip(i + 1) {
            if (c[1] as usize) < small_val {
                small_pos = j;
                small_val = c[1] as usize;
            }
        }
        colormap.swap(i, small_pos);

        if small_val != previous_col {
            net_index[previous_col] = (start_pos + i) >> 1;
            for slot in net_index.iter_mut().take(small_val).skip(previous_col + 1) {
                *slot = i;
            }
            previous_col = small_val;
            start_pos = i;
        }
    }
    net_index[previous_col] = (start_pos + MAX_NET_POS) >> 1;
    for slot in net_index.iter_mut().skip(previous_col + 1) {
        *slot = MAX_NET_POS;
    }
    net_index
}

/// Trained NeuQuant palette with its green-indexed lookup.
pub struct NeuQuant {
    colormap: [[u8; 3]; NET_SIZE],
    net_index: [usize; 256],
    palette: Palette,
}

impl NeuQuant {
    /// Train on `pixels`, sampling one pixel in `sample_factor` (1..=30).
    pub fn build(pixels: &[u32], sample_factor: u32) -> GifResult<Self> {
        validate_sample_factor(sample_factor)?;

        let mut network = Network::new();
        network.learn(pixels, sample_factor);
        let mut colormap = network.fix();
        let net_index = inx_build(&mut colormap);
        let palette = Palette::with_colors(colormap.iter().copied());

        Ok(Self {
            colormap,
            net_index,
            palette,
        })
    }

    /// Position in the sorted colormap closest to `pixel`.
    ///
    /// Scans outward from the green seed in both directions; a direction
    /// stops once the green difference alone reaches the best distance.
    fn inx_search(&self, pixel: u32) -> usize {
        let (r, g, b) = (red(pixel) as i32, green(pixel) as i32, blue(pixel) as i32);

        let mut best_d = 1000;
        let mut best = 0;
        let mut i = self.net_index[g as usize] as isize;
        let mut j = i - 1;

        while i < NET_SIZE as isize || j >= 0 {
            if i < NET_SIZE as isize {
                let p = &self.colormap[i as usize];
                let mut dist = p[1] as i32 - g;
                if dist >= best_d {
                    i = NET_SIZE as isize;
                } else {
                    dist = dist.abs() + (p[2] as i32 - b).abs();
                    if dist < best_d {
                        dist += (p[0] as i32 - r).abs();
                        if dist < best_d {
                            best_d = dist;
                            best = i as usize;
                        }
                    }
                    i += 1;
                }
            }
            if j >= 0 {
                let p = &self.colormap[j as usize];
                let mut dist = g - p[1] as i32;
                if dist >= best_d {
                    j = -1;
                } else {
                    dist = dist.abs() + (p[2] as i32 - b).abs();
                    if dist < best_d {
                        dist += (p[0] as i32 - r).abs();
                        if dist < best_d {
                            best_d = dist;
                            best = j as usize;
                        }
                    }
                    j -= 1;
                }
            }
        }
        best
    }
}

impl Quantizer for NeuQuant {
    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn nearest_index(&self, pixel: u32) -> u8 {
        // slot 0 is transparent, the sorted colormap starts at 1
        (self.inx_search(pixel) + 1) as u8
    }
}

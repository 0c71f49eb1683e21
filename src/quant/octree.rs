//! Octree color quantizer.
//!
//! Each opaque pixel descends six levels, choosing a child from one bit of
//! each channel per level. When more than 255 distinct leaves exist, the
//! least referenced interior nodes are folded into leaves until the palette
//! fits.

use crate::core::frame::{blue, green, red, TRANSPARENT};

use super::{Palette, Quantizer};

const DEPTH: usize = 6;
const COLORS: usize = 255;
const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    children: [Option<usize>; 8],
    leaf: bool,
    ref_count: u64,
    sum: [u64; 3],
    index: u8,
}

impl Node {
    fn average(&self) -> [u8; 3] {
        let count = self.ref_count.max(1) as f64;
        self.sum
            .map(|s| (s as f64 / count).round_ties_even().clamp(0.0, 255.0) as u8)
    }
}

#[inline]
fn child_index(r: u8, g: u8, b: u8, depth: usize) -> usize {
    let shift = 7 - depth;
    ((r >> shift & 1) as usize) << 2 | ((g >> shift & 1) as usize) << 1 | (b >> shift & 1) as usize
}

/// Octree palette with its descent lookup.
pub struct Octree {
    nodes: Vec<Node>,
    palette: Palette,
}

struct Builder {
    nodes: Vec<Node>,
    /// Interior nodes per depth, excluding the root.
    levels: Vec<Vec<usize>>,
    leaf_count: usize,
}

impl Builder {
    fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            levels: vec![Vec::new(); DEPTH - 1],
            leaf_count: 0,
        }
    }

    fn insert(&mut self, r: u8, g: u8, b: u8) {
        let mut node = ROOT;
        for depth in 0..DEPTH {
            let idx = child_index(r, g, b, depth);
            node = match self.nodes[node].children[idx] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[node].children[idx] = Some(child);
                    if depth < DEPTH - 1 {
                        self.levels[depth].push(child);
                    }
                    child
                }
            };
        }
        let leaf = &mut self.nodes[node];
        if !leaf.leaf {
            self.leaf_count += 1;
        }
        leaf.leaf = true;
        leaf.ref_count += 1;
        leaf.sum[0] += r as u64;
        leaf.sum[1] += g as u64;
        leaf.sum[2] += b as u64;
    }

    /// Fold nodes until the leaf count fits the palette.
    ///
    /// Returns the interior nodes that survive, in reduction order.
    fn reduce(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = self.levels.iter().rev().flatten().copied().collect();
        order.push(ROOT);

        // deepest first, so children are summed before parents
        for &n in &order {
            let total = self.nodes[n]
                .children
                .iter()
                .flatten()
                .map(|&c| self.nodes[c].ref_count)
                .sum();
            self.nodes[n].ref_count = total;
        }

        // stable: on equal counts children stay ahead of their parents
        order.sort_by_key(|&n| self.nodes[n].ref_count);

        for &n in &order {
            if self.leaf_count <= COLORS || n == ROOT {
                break;
            }
            self.fold(n);
        }

        order.retain(|&n| !self.nodes[n].leaf);
        order
    }

    fn fold(&mut self, n: usize) {
        let children = std::mem::take(&mut self.nodes[n].children);
        for child in children.into_iter().flatten() {
            let sum = self.nodes[child].sum;
            let node = &mut self.nodes[n];
            for (acc, s) in node.sum.iter_mut().zip(sum) {
                *acc += s;
            }
            self.leaf_count -= 1;
        }
        self.nodes[n].leaf = true;
        self.leaf_count += 1;
    }

    fn assign_palette(&mut self, interior: &[usize]) -> Palette {
        let mut palette = Palette::new();
        for &n in interior {
            for child in self.nodes[n].children.into_iter().flatten() {
                if !self.nodes[child].leaf {
                    continue;
                }
                let color = self.nodes[child].average();
                if let Some(index) = palette.push(color) {
                    self.nodes[child].index = index;
                }
            }
        }
        palette
    }
}

impl Octree {
    /// Build a palette from every non-sentinel pixel.
    pub fn build(pixels: &[u32]) -> Self {
        let mut builder = Builder::new();
        for &p in pixels {
            if p != TRANSPARENT {
                builder.insert(red(p), green(p), blue(p));
            }
        }
        let interior = builder.reduce();
        let palette = builder.assign_palette(&interior);
        Self {
            nodes: builder.nodes,
            palette,
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.palette.visible_len()
    }
}

impl Quantizer for Octree {
    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn nearest_index(&self, pixel: u32) -> u8 {
        let (r, g, b) = (red(pixel), green(pixel), blue(pixel));
        let mut node = ROOT;
        for depth in 0..DEPTH {
            match self.nodes[node].children[child_index(r, g, b, depth)] {
                Some(child) if self.nodes[child].leaf => return self.nodes[child].index,
                Some(child) => node = child,
                None => break,
            }
        }
        // colors never inserted fall back to the closest palette entry
        self.palette.nearest(pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::rgb;
    use std::collections::HashSet;

    #[test]
    fn test_few_colors_are_exact() {
        let pixels = vec![rgb(255, 0, 0), rgb(0, 255, 0), rgb(0, 0, 255), rgb(255, 0, 0)];
        let tree = Octree::build(&pixels);
        assert_eq!(tree.palette().visible_len(), 3);
        for &p in &pixels {
            let index = tree.nearest_index(p);
            assert_ne!(index, 0);
            assert_eq!(
                tree.palette().get(index).unwrap(),
                [red(p), green(p), blue(p)]
            );
        }
    }

    #[test]
    fn test_reduces_to_palette_budget() {
        let pixels: Vec<u32> = (0..64u32)
            .flat_map(|r| (0..64u32).map(move |g| rgb((r * 4) as u8, (g * 4) as u8, ((r + g) * 2) as u8)))
            .collect();
        let tree = Octree::build(&pixels);
        assert!(tree.leaf_count() <= 255);
        assert!(tree.leaf_count() > 0);
        assert!(pixels.iter().all(|&p| tree.nearest_index(p) != 0));
    }

    #[test]
    fn test_sentinel_pixels_are_skipped() {
        let pixels = vec![TRANSPARENT, rgb(10, 20, 30), TRANSPARENT];
        let tree = Octree::build(&pixels);
        assert_eq!(tree.palette().visible_len(), 1);
        assert_eq!(tree.index_pixels(&pixels), vec![0, 1, 0]);
    }

    #[test]
    fn test_unseen_color_maps_to_nearest_entry() {
        let tree = Octree::build(&[rgb(250, 250, 250), rgb(5, 5, 5)]);
        let index = tree.nearest_index(rgb(0, 0, 20));
        assert_eq!(tree.palette().get(index).unwrap(), [5, 5, 5]);
    }

    #[test]
    fn test_solid_frame_uses_one_entry() {
        let pixels = vec![rgb(12, 200, 77); 100 * 100];
        let tree = Octree::build(&pixels);
        let used: HashSet<u8> = tree.index_pixels(&pixels).into_iter().collect();
        assert_eq!(used.len(), 1);
        assert_eq!(tree.palette().visible_len(), 1);
    }
}

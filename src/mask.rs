//! Classifies silhouette occupancy into the three per-tile region grids.
//!
//! Input is either the procedural rasterizer's coverage bitmap or a decoded
//! mask image. Output is three parallel boolean grids aligned to the tile
//! grid: interior membership, edge adjacency, and trunk membership, with the
//! invariants `trunk ⇒ interior` and `edge ⇒ interior`.

use crate::error::{FlapError, FlapResult};
use crate::silhouette::{self, Bitmap, TrunkMeta};

/// Alpha cut for image pixels, matching the procedural occupancy threshold.
const ALPHA_CUTOFF: u8 = 20;
/// Channels above this on all of r/g/b count as a hole, so anti-aliased
/// near-white fringes in a mask image do not register as silhouette.
const NEAR_WHITE: u8 = 245;

/// A decoded RGBA mask image.
#[derive(Clone, Debug)]
pub struct MaskImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl MaskImage {
    pub fn decode(bytes: &[u8]) -> FlapResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FlapError::asset(format!("decode mask image: {e}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    pub fn from_path(path: &std::path::Path) -> FlapResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| FlapError::asset(format!("read mask image '{}': {e}", path.display())))?;
        Self::decode(&bytes)
    }

    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> FlapResult<Self> {
        if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            return Err(FlapError::asset("mask image dimensions mismatch"));
        }
        Ok(Self { width, height, rgba })
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}

/// The three region grids, one entry per tile, row-major.
#[derive(Clone, Debug)]
pub struct MaskGrid {
    cols: usize,
    rows: usize,
    interior: Vec<bool>,
    edge: Vec<bool>,
    trunk: Vec<bool>,
}

impl MaskGrid {
    pub fn empty(cols: usize, rows: usize) -> Self {
        let n = cols * rows;
        Self {
            cols,
            rows,
            interior: vec![false; n],
            edge: vec![false; n],
            trunk: vec![false; n],
        }
    }

    /// Rebuilds the mask for a `cols x rows` grid. With an image the image
    /// wins; otherwise the procedural silhouette is rasterized. A degenerate
    /// surface yields an all-false mask.
    pub fn build(cols: usize, rows: usize, image: Option<&MaskImage>) -> Self {
        if cols == 0 || rows == 0 {
            return Self::empty(cols, rows);
        }
        let mut grid = match image {
            Some(img) => Self::from_image(img, cols, rows),
            None => match silhouette::rasterize(cols, rows) {
                Some((bitmap, meta)) => Self::from_bitmap(&bitmap, Some(&meta)),
                None => Self::empty(cols, rows),
            },
        };
        grid.compute_edges();
        grid
    }

    pub fn from_bitmap(bitmap: &Bitmap, meta: Option<&TrunkMeta>) -> Self {
        let cols = bitmap.width();
        let rows = bitmap.height();
        let mut grid = Self::empty(cols, rows);
        for y in 0..rows {
            for x in 0..cols {
                grid.interior[y * cols + x] = bitmap.occupied(x, y);
            }
        }
        if let Some(meta) = meta {
            grid.mark_trunk_band(meta);
        }
        grid
    }

    /// Samples a decoded image scaled to fit half the grid width and 62% of
    /// its height, centered both ways.
    pub fn from_image(img: &MaskImage, cols: usize, rows: usize) -> Self {
        let mut grid = Self::empty(cols, rows);
        let iw = img.width as f64;
        let ih = img.height as f64;
        let scale = ((cols as f64 * 0.5) / iw).min((rows as f64 * 0.62) / ih);
        if scale <= 0.0 {
            return grid;
        }
        let dw = iw * scale;
        let dh = ih * scale;
        let dx = (cols as f64 - dw) / 2.0;
        let dy = (rows as f64 - dh) / 2.0;

        for y in 0..rows {
            for x in 0..cols {
                let sx = ((x as f64 + 0.5 - dx) / scale).floor();
                let sy = ((y as f64 + 0.5 - dy) / scale).floor();
                if sx < 0.0 || sy < 0.0 || sx >= iw || sy >= ih {
                    continue;
                }
                let [r, g, b, a] = img.pixel(sx as u32, sy as u32);
                let near_white = r > NEAR_WHITE && g > NEAR_WHITE && b > NEAR_WHITE;
                grid.interior[y * cols + x] = a > ALPHA_CUTOFF && !near_white;
            }
        }
        grid
    }

    /// Marks the vertically tapered trunk band as trunk and forces it
    /// interior, so the stump renders as one solid block.
    fn mark_trunk_band(&mut self, meta: &TrunkMeta) {
        let span = (meta.bottom_y - meta.top_y).max(1.0);
        for y in 0..self.rows {
            let yf = y as f64;
            if yf < meta.top_y - 2.0 || yf > meta.bottom_y + 1.0 {
                continue;
            }
            let t = ((yf - meta.top_y) / span).clamp(0.0, 1.0);
            let mut half_w =
                meta.top_w * 0.6 + (meta.bottom_w * 0.55 - meta.top_w * 0.6) * t.powf(1.45) + 0.7;
            if t > 0.72 {
                // Base flare.
                half_w += (t - 0.72) * 4.2;
            }
            for x in 0..self.cols {
                if (x as f64 - meta.center_x).abs() <= half_w {
                    let i = y * self.cols + x;
                    self.trunk[i] = true;
                    self.interior[i] = true;
                }
            }
        }
    }

    /// 8-neighbor boundary detection over `interior`; the grid border counts
    /// as non-interior.
    fn compute_edges(&mut self) {
        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = y * self.cols + x;
                self.edge[i] = false;
                if !self.interior[i] {
                    continue;
                }
                'scan: for oy in -1i64..=1 {
                    for ox in -1i64..=1 {
                        if ox == 0 && oy == 0 {
                            continue;
                        }
                        let nx = x as i64 + ox;
                        let ny = y as i64 + oy;
                        if nx < 0 || ny < 0 || nx >= self.cols as i64 || ny >= self.rows as i64 {
                            self.edge[i] = true;
                            break 'scan;
                        }
                        if !self.interior[ny as usize * self.cols + nx as usize] {
                            self.edge[i] = true;
                            break 'scan;
                        }
                    }
                }
            }
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.interior.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interior.is_empty()
    }

    pub fn interior(&self, i: usize) -> bool {
        self.interior[i]
    }

    pub fn edge(&self, i: usize) -> bool {
        self.edge[i]
    }

    pub fn trunk(&self, i: usize) -> bool {
        self.trunk[i]
    }
}

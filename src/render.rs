//! CPU renderer: paints the board's current animated state into an RGBA8
//! frame. Pure with respect to board state; committing finished flips is
//! [`Board::update`]'s job, so rendering the same instant twice yields
//! byte-identical frames.

use crate::board::{Board, FlipView};
use crate::config::Rgb;
use crate::error::{FlapError, FlapResult};
use crate::font;

/// One rendered frame, RGBA8, fully opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&[background.r(), background.g(), background.b(), 255]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    fn blend_px(&mut self, x: i64, y: i64, color: Rgb, alpha: f64) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        let a = alpha.clamp(0.0, 1.0);
        for (c, &s) in color.0.iter().enumerate() {
            let d = f64::from(self.data[i + c]);
            self.data[i + c] = (d + (f64::from(s) - d) * a).round() as u8;
        }
    }

    fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb, alpha: f64) {
        for y in y0.max(0)..y1.min(i64::from(self.height)) {
            for x in x0.max(0)..x1.min(i64::from(self.width)) {
                self.blend_px(x, y, color, alpha);
            }
        }
    }
}

const HIGHLIGHT: Rgb = Rgb([255, 255, 255]);
const SHADOW: Rgb = Rgb([0, 0, 0]);
const INK_DARK: Rgb = Rgb([9, 24, 50]);
const INK_LIGHT: Rgb = Rgb([242, 248, 255]);

/// Renders the board at instant `now` (ms). `dpr` is the device pixel
/// ratio; it is capped by the configured maximum.
pub fn render_frame(board: &Board, now: f64, dpr: f64) -> FlapResult<Frame> {
    let cfg = board.config();
    if !(dpr > 0.0) {
        return Err(FlapError::surface("device pixel ratio must be > 0"));
    }
    let scale = dpr.min(cfg.max_dpr);
    let width = (f64::from(board.width_px()) * scale).ceil() as u32;
    let height = (f64::from(board.height_px()) * scale).ceil() as u32;
    if width == 0 || height == 0 {
        return Err(FlapError::surface("render surface has zero area"));
    }

    let mut frame = Frame::new(width, height, cfg.background);
    let ts = f64::from(cfg.tile_size_px);
    let border = (scale.round() as i64).max(1);
    let px = |v: f64| (v * scale).round() as i64;

    for r in 0..board.rows() {
        for c in 0..board.cols() {
            let tile = board.tile(r, c);
            let view = FlipView::resolve(tile, now, cfg);
            let palette = cfg.palettes[view.scheme % cfg.palettes.len()];

            let wave_pulse = if view.active {
                (view.progress * std::f64::consts::PI).sin() * 7.0
            } else {
                0.0
            };
            let edge_shift = if tile.is_edge && !tile.is_trunk {
                if palette.face_is_darker() { -6.0 } else { 6.0 }
            } else {
                0.0
            };
            let base = if tile.is_trunk {
                // One flat stump color, no per-tile noise.
                palette.face
            } else {
                let target = if tile.in_silhouette {
                    palette.face
                } else {
                    palette.field
                };
                target.tint(edge_shift + wave_pulse + (tile.tone_seed - 0.5) * 4.0)
            };
            let base_lum = base.luminance();

            let x = c as f64 * ts;
            let y = r as f64 * ts - view.lift;
            let (x0, y0) = (px(x), px(y));
            let (x1, y1) = (px(x + ts), px(y + ts));

            frame.fill_rect(x0, y0, x1, y1, base, 1.0);

            // Flap edges: top highlight, right shadow.
            frame.fill_rect(x0, y0, x1, y0 + border, HIGHLIGHT, 0.24);
            frame.fill_rect(x1 - border, y0, x1, y1, SHADOW, 0.11);

            if view.active {
                // Pseudo-3D bands that grow toward the flip midpoint.
                let band = px(view.depth.max(1.0)).max(border);
                frame.fill_rect(x0, y0, x1, y0 + band, HIGHLIGHT, 0.16);
                frame.fill_rect(x0, y1 - band, x1, y1, SHADOW, 0.10);
            }

            if let Some(glyph) = font::glyph(view.glyph) {
                let ink = if base_lum > 145.0 { INK_DARK } else { INK_LIGHT };
                let ink_alpha = if base_lum > 145.0 { 0.92 } else { 0.9 };

                let gh = ts * 0.7 * view.squash;
                let gw = ts * 0.7 * (font::GLYPH_COLS as f64 / font::GLYPH_ROWS as f64);
                let cx = x + ts * 0.5;
                let cy = y + ts * 0.5 + 0.4;
                let (gx0, gy0) = (px(cx - gw * 0.5), px(cy - gh * 0.5));
                let (gx1, gy1) = (px(cx + gw * 0.5), px(cy + gh * 0.5));
                if gx1 > gx0 && gy1 > gy0 {
                    let bw = (gx1 - gx0) as f64;
                    let bh = (gy1 - gy0) as f64;
                    for pyy in gy0..gy1 {
                        for pxx in gx0..gx1 {
                            let col = (((pxx - gx0) as f64 + 0.5) / bw * font::GLYPH_COLS as f64)
                                .floor() as usize;
                            let row = (((pyy - gy0) as f64 + 0.5) / bh * font::GLYPH_ROWS as f64)
                                .floor() as usize;
                            if font::pixel_set(glyph, col, row) {
                                frame.blend_px(pxx, pyy, ink, ink_alpha);
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(frame)
}

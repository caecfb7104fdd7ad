//! The tile grid and its animation state machine.
//!
//! Each tile moves through `Idle -> Scheduled -> Flipping -> Idle`. A wave
//! schedules every tile at once with a delay that grows along the `row + col`
//! diagonal, so flips sweep the board corner to corner instead of firing
//! simultaneously. All time is caller-supplied milliseconds, which keeps the
//! whole state machine deterministic and testable offline.

use crate::config::BoardConfig;
use crate::error::FlapResult;
use crate::mask::{MaskGrid, MaskImage};
use crate::rng::Lcg;
use crate::stream::HashStream;

/// Lead time between scheduling a wave and its first flip.
const WAVE_LEAD_MS: f64 = 100.0;
/// Nominal half-amplitude of per-tile flip jitter.
const JITTER_HALF_MS: f64 = 80.0;
/// Stream cursor advances this many columns' worth of glyphs per wave.
const CURSOR_COLS_PER_WAVE: usize = 3;

/// One grid cell. Reused positionally across resizes so in-flight flips
/// survive without visible pops.
#[derive(Clone, Debug)]
pub struct Tile {
    pub current: char,
    pub next: char,
    pub flip_start: Option<f64>,
    pub is_flipping: bool,
    pub scheme_current: usize,
    pub scheme_next: usize,
    /// Static per-tile shading noise in [0, 1), fixed at creation.
    pub tone_seed: f64,
    pub in_silhouette: bool,
    pub is_edge: bool,
    pub is_trunk: bool,
}

impl Tile {
    fn new(tone_seed: f64) -> Self {
        Self {
            current: ' ',
            next: ' ',
            flip_start: None,
            is_flipping: false,
            scheme_current: 0,
            scheme_next: 0,
            tone_seed,
            in_silhouette: false,
            is_edge: false,
            is_trunk: false,
        }
    }
}

/// A tile's resolved visual state at one instant; pure function of the tile,
/// the clock, and the flip duration.
#[derive(Clone, Copy, Debug)]
pub struct FlipView {
    pub progress: f64,
    pub active: bool,
    /// Vertical scale simulating the card turning edge-on at the midpoint.
    pub squash: f64,
    pub lift: f64,
    pub depth: f64,
    pub glyph: char,
    pub scheme: usize,
}

impl FlipView {
    pub fn resolve(tile: &Tile, now: f64, cfg: &BoardConfig) -> FlipView {
        let mut progress = 0.0;
        let mut active = false;
        let mut committed = false;
        if tile.is_flipping {
            if let Some(start) = tile.flip_start {
                if now >= start {
                    progress = ((now - start) / cfg.flip_duration_ms).min(1.0);
                    active = progress < 1.0;
                    committed = !active;
                }
            }
        }

        let p = if active { progress } else { 0.0 };
        let angle = p * std::f64::consts::PI;
        let squash = if active {
            angle.cos().abs().max(0.06)
        } else {
            1.0
        };
        let lift = if active { angle.sin() * cfg.lift_px } else { 0.0 };
        let depth = if active { angle.sin() * cfg.depth_px } else { 0.0 };

        // The visible face switches exactly at the halfway point.
        let show_next = committed || (active && progress >= 0.5);
        FlipView {
            progress,
            active,
            squash,
            lift,
            depth,
            glyph: if show_next { tile.next } else { tile.current },
            scheme: if show_next {
                tile.scheme_next
            } else {
                tile.scheme_current
            },
        }
    }
}

/// The board: grid geometry, tile states, region mask, and the glyph stream.
#[derive(Clone, Debug)]
pub struct Board {
    config: BoardConfig,
    width_px: u32,
    height_px: u32,
    cols: usize,
    rows: usize,
    tiles: Vec<Tile>,
    mask: MaskGrid,
    scheme_index: usize,
    stream: Option<HashStream>,
    cursor: usize,
    rng: Lcg,
}

impl Board {
    pub fn new(config: BoardConfig) -> FlapResult<Self> {
        config.validate()?;
        let rng = Lcg::with_seed(config.seed);
        Ok(Self {
            config,
            width_px: 0,
            height_px: 0,
            cols: 0,
            rows: 0,
            tiles: Vec::new(),
            mask: MaskGrid::empty(0, 0),
            scheme_index: 0,
            stream: None,
            cursor: 0,
            rng,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, row: usize, col: usize) -> &Tile {
        &self.tiles[row * self.cols + col]
    }

    pub fn scheme_index(&self) -> usize {
        self.scheme_index
    }

    pub fn stream(&self) -> Option<&HashStream> {
        self.stream.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rebuilds the grid for a new viewport, reusing existing tiles by index
    /// so overlapping positions keep their animation state, then rebuilds
    /// the mask.
    pub fn resize(&mut self, width_px: u32, height_px: u32, mask_image: Option<&MaskImage>) {
        self.width_px = width_px;
        self.height_px = height_px;
        let tile = self.config.tile_size_px as f64;
        self.cols = (f64::from(width_px) / tile).ceil() as usize;
        self.rows = (f64::from(height_px) / tile).ceil() as usize;
        let count = self.cols * self.rows;

        let mut old = std::mem::take(&mut self.tiles);
        let mut next = Vec::with_capacity(count);
        let reused = old.len().min(count);
        next.extend(old.drain(..reused));
        while next.len() < count {
            let tone = self.rng.next_f64();
            next.push(Tile::new(tone));
        }
        self.tiles = next;

        self.rebuild_mask(mask_image);
    }

    /// Rebuilds the region mask and writes all three grids onto the tiles.
    pub fn rebuild_mask(&mut self, mask_image: Option<&MaskImage>) {
        self.mask = MaskGrid::build(self.cols, self.rows, mask_image);
        for (i, t) in self.tiles.iter_mut().enumerate() {
            t.in_silhouette = self.mask.interior(i);
            t.is_edge = self.mask.edge(i);
            t.is_trunk = self.mask.trunk(i);
        }
    }

    pub fn mask(&self) -> &MaskGrid {
        &self.mask
    }

    /// Installs a new non-empty stream. Empty streams are ignored so the
    /// board keeps showing its last good data.
    pub fn set_stream(&mut self, stream: HashStream) -> bool {
        if stream.is_empty() {
            return false;
        }
        self.stream = Some(stream);
        true
    }

    /// Schedules a full re-flip of the board as a diagonal wave starting at
    /// `now`. Advances the palette scheme and, afterwards, the stream cursor
    /// so the next wave reveals different characters. No-op without a stream.
    pub fn schedule_wave(&mut self, now: f64) -> bool {
        let Some(stream) = self.stream.clone() else {
            return false;
        };
        let stream_len = stream.len();

        self.scheme_index = (self.scheme_index + 1) % self.config.palettes.len();
        let max_wave_index = (self.rows + self.cols).saturating_sub(2).max(1) as f64;
        let start = now + WAVE_LEAD_MS;
        // Jitter must stay below the wave span or tiny waves lose their
        // corner-to-corner ordering.
        let jitter_half = JITTER_HALF_MS.min(self.config.wave_duration_ms * 0.45);

        for r in 0..self.rows {
            for c in 0..self.cols {
                let i = r * self.cols + c;
                let wave = ((r + c) as f64 / max_wave_index) * self.config.wave_duration_ms;
                let jitter = self.rng.jitter(jitter_half);
                let t = &mut self.tiles[i];
                t.next = stream.glyph_at(self.cursor + i);
                t.scheme_next = self.scheme_index;
                t.flip_start = Some(start + wave + jitter);
                t.is_flipping = true;
            }
        }

        self.cursor = (self.cursor + CURSOR_COLS_PER_WAVE * self.cols) % stream_len;
        true
    }

    /// Advances the state machine: commits finished flips and reports
    /// whether anything is still scheduled or mid-flip. The frame loop keeps
    /// running only while this returns true.
    pub fn update(&mut self, now: f64) -> bool {
        let mut animating = false;
        for t in &mut self.tiles {
            if !t.is_flipping {
                continue;
            }
            let Some(start) = t.flip_start else {
                t.is_flipping = false;
                continue;
            };
            if now < start {
                animating = true;
                continue;
            }
            let progress = (now - start) / self.config.flip_duration_ms;
            if progress >= 1.0 {
                t.current = t.next;
                t.scheme_current = t.scheme_next;
                t.is_flipping = false;
                t.flip_start = None;
            } else {
                animating = true;
            }
        }
        animating
    }

    /// True while any tile is scheduled or mid-flip.
    pub fn is_animating(&self) -> bool {
        self.tiles.iter().any(|t| t.is_flipping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BoardConfig {
        BoardConfig {
            tile_size_px: 10,
            ..BoardConfig::default()
        }
    }

    fn hash_of(digit: char) -> String {
        format!("0x{}", digit.to_string().repeat(64))
    }

    fn board_with_stream(w: u32, h: u32) -> Board {
        let mut board = Board::new(test_config()).unwrap();
        board.resize(w, h, None);
        assert!(board.set_stream(HashStream::build(&[hash_of('a'), hash_of('b')])));
        board
    }

    #[test]
    fn resize_derives_grid_from_viewport() {
        let mut board = Board::new(test_config()).unwrap();
        board.resize(101, 59, None);
        assert_eq!(board.cols(), 11);
        assert_eq!(board.rows(), 6);
        assert_eq!(board.tiles().len(), 66);
    }

    #[test]
    fn resize_reuses_tiles_by_index() {
        let mut board = board_with_stream(100, 100);
        board.schedule_wave(0.0);
        let before: Vec<char> = board.tiles().iter().map(|t| t.next).collect();
        board.resize(120, 100, None);
        // Overlapping indices keep their scheduled state.
        for (i, t) in board.tiles().iter().take(before.len()).enumerate() {
            assert_eq!(t.next, before[i]);
            assert!(t.is_flipping);
        }
    }

    #[test]
    fn wave_requires_a_stream() {
        let mut board = Board::new(test_config()).unwrap();
        board.resize(100, 100, None);
        assert!(!board.schedule_wave(0.0));
        assert!(!board.is_animating());
        assert!(board.tiles().iter().all(|t| t.current == ' ' && t.next == ' '));
    }

    #[test]
    fn wave_delay_is_monotonic_corner_to_corner() {
        let mut board = board_with_stream(200, 150);
        board.schedule_wave(0.0);
        let first = board.tile(0, 0).flip_start.unwrap();
        let last = board
            .tile(board.rows() - 1, board.cols() - 1)
            .flip_start
            .unwrap();
        assert!(first < last, "wave must sweep: {first} !< {last}");
    }

    #[test]
    fn tiny_wave_duration_keeps_corner_ordering() {
        let cfg = BoardConfig {
            tile_size_px: 10,
            wave_duration_ms: 1.0,
            ..BoardConfig::default()
        };
        let mut board = Board::new(cfg).unwrap();
        board.resize(100, 100, None);
        board.set_stream(HashStream::build(&[hash_of('c')]));
        board.schedule_wave(0.0);
        let first = board.tile(0, 0).flip_start.unwrap();
        let last = board
            .tile(board.rows() - 1, board.cols() - 1)
            .flip_start
            .unwrap();
        assert!(first < last);
    }

    #[test]
    fn wave_advances_scheme_and_cursor() {
        let mut board = board_with_stream(100, 100);
        assert_eq!(board.scheme_index(), 0);
        board.schedule_wave(0.0);
        assert_eq!(board.scheme_index(), 1);
        let after_first = board.cursor();
        assert_eq!(after_first, 3 * board.cols() % board.stream().unwrap().len());
        board.schedule_wave(100.0);
        assert_eq!(board.scheme_index(), 0);
        assert_ne!(board.cursor(), after_first);
    }

    #[test]
    fn wave_assigns_glyphs_from_cursor_offset() {
        let mut board = board_with_stream(100, 100);
        let stream = board.stream().unwrap().clone();
        board.schedule_wave(0.0);
        for (i, t) in board.tiles().iter().enumerate() {
            assert_eq!(t.next, stream.glyph_at(i));
        }
    }

    #[test]
    fn update_commits_finished_flips() {
        let mut board = board_with_stream(50, 30);
        board.schedule_wave(0.0);
        assert!(board.update(0.0));
        // Far past every flip's end.
        let done = 100.0 + board.config().wave_duration_ms + board.config().flip_duration_ms + 200.0;
        assert!(!board.update(done));
        for t in board.tiles() {
            assert!(!t.is_flipping);
            assert_eq!(t.current, t.next);
            assert_eq!(t.scheme_current, 1);
        }
    }

    #[test]
    fn flip_view_midpoint_contract() {
        let cfg = test_config();
        let mut tile = Tile::new(0.5);
        tile.current = 'a';
        tile.next = 'b';
        tile.scheme_current = 0;
        tile.scheme_next = 1;
        tile.is_flipping = true;
        tile.flip_start = Some(0.0);

        let just_before = FlipView::resolve(&tile, cfg.flip_duration_ms * 0.499, &cfg);
        assert_eq!(just_before.glyph, 'a');
        assert_eq!(just_before.scheme, 0);

        let midpoint = FlipView::resolve(&tile, cfg.flip_duration_ms * 0.5, &cfg);
        assert_eq!(midpoint.glyph, 'b');
        assert_eq!(midpoint.scheme, 1);
        assert!(midpoint.active);
        // Edge-on at the midpoint: squash bottoms out at the floor.
        assert!(midpoint.squash <= 0.07);
        assert!(midpoint.lift > 0.0);
    }

    #[test]
    fn flip_view_idle_is_static() {
        let cfg = test_config();
        let tile = Tile::new(0.1);
        let view = FlipView::resolve(&tile, 12_345.0, &cfg);
        assert!(!view.active);
        assert_eq!(view.squash, 1.0);
        assert_eq!(view.lift, 0.0);
        assert_eq!(view.glyph, ' ');
    }

    #[test]
    fn scheduled_but_unstarted_tile_shows_current_face() {
        let cfg = test_config();
        let mut tile = Tile::new(0.5);
        tile.current = '1';
        tile.next = '2';
        tile.is_flipping = true;
        tile.flip_start = Some(500.0);
        let view = FlipView::resolve(&tile, 100.0, &cfg);
        assert!(!view.active);
        assert_eq!(view.glyph, '1');
    }

    #[test]
    fn empty_stream_is_rejected() {
        let mut board = Board::new(test_config()).unwrap();
        board.resize(50, 50, None);
        assert!(!board.set_stream(HashStream::build::<&str>(&[])));
        assert!(!board.has_stream());
    }
}

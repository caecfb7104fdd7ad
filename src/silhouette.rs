//! Procedural tree-silhouette rasterizer.
//!
//! Draws a tapered trunk plus a recursively branching canopy into a coverage
//! bitmap sized one cell per board tile. All randomness comes from explicit
//! [`Lcg`] state seeded per root, so a given grid size always produces the
//! same silhouette. Branch geometry is computed in canonical (right-half)
//! space and stamped through a mirror transform, then replayed with the same
//! seed for the left half, which keeps the two halves cell-symmetric.

use kurbo::{CubicBez, ParamCurve, Point, QuadBez};

use crate::rng::Lcg;

/// Composition frame the silhouette was tuned against. Smaller or wider
/// viewports letterbox into this aspect, centered and bottom-aligned.
const REFERENCE_WIDTH: f64 = 1047.0;
const REFERENCE_HEIGHT: f64 = 992.0;

const CENTER_ROOT_SEED: u32 = 7331;
const SIDE_ROOT_SEED_BASE: u32 = 11_027;
const SIDE_ROOT_SEED_STEP: u32 = 977;

/// Coverage above this counts as occupied, mirroring an alpha cut of 20/255.
pub const OCCUPANCY_THRESHOLD: f32 = 20.0 / 255.0;

/// Grayscale coverage bitmap, one cell per tile.
#[derive(Clone, Debug)]
pub struct Bitmap {
    width: usize,
    height: usize,
    coverage: Vec<f32>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            coverage: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn coverage_at(&self, x: usize, y: usize) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.coverage[y * self.width + x]
    }

    pub fn occupied(&self, x: usize, y: usize) -> bool {
        self.coverage_at(x, y) > OCCUPANCY_THRESHOLD
    }

    fn add(&mut self, x: i64, y: i64, c: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = y as usize * self.width + x as usize;
        self.coverage[i] = (self.coverage[i] + c).min(1.0);
    }

    /// Adds a soft disc of coverage centered at `(cx, cy)`.
    fn stamp_disc(&mut self, cx: f64, cy: f64, radius: f64) {
        let reach = radius + 0.5;
        let x0 = (cx - reach).floor() as i64;
        let x1 = (cx + reach).ceil() as i64;
        let y0 = (cy - reach).floor() as i64;
        let y1 = (cy + reach).ceil() as i64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x as f64 + 0.5) - cx;
                let dy = (y as f64 + 0.5) - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let c = (radius + 0.5 - d).clamp(0.0, 1.0);
                if c > 0.0 {
                    self.add(x, y, c as f32);
                }
            }
        }
    }

    /// Even-odd scanline fill of a closed polygon at full coverage.
    fn fill_polygon(&mut self, pts: &[Point]) {
        if pts.len() < 3 {
            return;
        }
        for y in 0..self.height {
            let yc = y as f64 + 0.5;
            let mut crossings: Vec<f64> = Vec::new();
            for i in 0..pts.len() {
                let a = pts[i];
                let b = pts[(i + 1) % pts.len()];
                if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                    let t = (yc - a.y) / (b.y - a.y);
                    crossings.push(a.x + (b.x - a.x) * t);
                }
            }
            crossings.sort_by(f64::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let (xa, xb) = (pair[0], pair[1]);
                for x in 0..self.width {
                    let xc = x as f64 + 0.5;
                    if xc >= xa && xc <= xb {
                        self.add(x as i64, y as i64, 1.0);
                    }
                }
            }
        }
    }

    /// Max-blends `src` into `self` with its top-left corner at `(dx, dy)`.
    fn blit(&mut self, src: &Bitmap, dx: i64, dy: i64) {
        for y in 0..src.height {
            for x in 0..src.width {
                let c = src.coverage[y * src.width + x];
                if c <= 0.0 {
                    continue;
                }
                let tx = x as i64 + dx;
                let ty = y as i64 + dy;
                if tx < 0 || ty < 0 || tx >= self.width as i64 || ty >= self.height as i64 {
                    continue;
                }
                let i = ty as usize * self.width + tx as usize;
                self.coverage[i] = self.coverage[i].max(c);
            }
        }
    }
}

/// Trunk geometry in final-bitmap cell coordinates; the mask classifier uses
/// it to force a solid tapered band regardless of stroke gaps.
#[derive(Clone, Copy, Debug)]
pub struct TrunkMeta {
    pub center_x: f64,
    pub top_y: f64,
    pub bottom_y: f64,
    pub top_w: f64,
    pub bottom_w: f64,
}

/// Rasterizes the procedural silhouette for a `cols x rows` board.
///
/// Returns `None` for a degenerate surface (zero cells); callers then leave
/// the mask empty rather than failing.
pub fn rasterize(cols: usize, rows: usize) -> Option<(Bitmap, TrunkMeta)> {
    if cols == 0 || rows == 0 {
        return None;
    }

    let aspect = REFERENCE_WIDTH / REFERENCE_HEIGHT;
    let mut frame_w = cols;
    let mut frame_h = (cols as f64 / aspect).round() as usize;
    if frame_h > rows {
        frame_h = rows;
        frame_w = (rows as f64 * aspect).round() as usize;
    }
    frame_w = frame_w.max(1);
    frame_h = frame_h.max(1);

    let mut frame = Bitmap::new(frame_w, frame_h);
    let meta = draw_tree(&mut frame);

    // Center horizontally, sit on the bottom edge.
    let dx = (cols as i64 - frame_w as i64) / 2;
    let dy = rows as i64 - frame_h as i64;

    let mut out = Bitmap::new(cols, rows);
    out.blit(&frame, dx, dy);

    Some((
        out,
        TrunkMeta {
            center_x: meta.center_x + dx as f64,
            top_y: meta.top_y + dy as f64,
            bottom_y: meta.bottom_y + dy as f64,
            top_w: meta.top_w,
            bottom_w: meta.bottom_w,
        },
    ))
}

#[derive(Clone, Copy, Debug)]
struct Canopy {
    cx: f64,
    base_y: f64,
    w: f64,
    h: f64,
    arc_cy: f64,
    arc_rx: f64,
    arc_ry: f64,
}

impl Canopy {
    /// Y of the guiding semicircular arc at horizontal position `x`; upper
    /// branch tips are pulled onto it so the outer silhouette stays coherent.
    fn edge_arc_y(&self, x: f64) -> f64 {
        let dx = (x - self.cx) / self.arc_rx;
        let t = (1.0 - dx * dx).max(0.0);
        self.arc_cy - self.arc_ry * t.sqrt()
    }
}

#[derive(Clone, Copy, Debug)]
struct BranchParams {
    x: f64,
    y: f64,
    len: f64,
    angle: f64,
    width: f64,
    depth: i32,
    bias: i32,
}

#[derive(Clone, Copy)]
struct Root {
    /// Start offset from the trunk centerline, in trunk-top-width units.
    x_off: f64,
    /// Start offset below the trunk top, cells.
    y_off: f64,
    angle: f64,
    /// Initial branch length as a fraction of canopy width.
    len_frac: f64,
    /// Initial stroke width as a fraction of canopy width.
    width_frac: f64,
    depth: i32,
    bias: i32,
}

const CENTER_ROOT: Root = Root {
    x_off: 0.0,
    y_off: 1.3,
    angle: -std::f64::consts::FRAC_PI_2,
    len_frac: 0.3,
    width_frac: 0.0138,
    depth: 9,
    bias: 0,
};

const SIDE_ROOTS: [Root; 6] = [
    Root { x_off: 0.08, y_off: 1.5, angle: -1.46, len_frac: 0.24, width_frac: 0.0132, depth: 8, bias: 0 },
    Root { x_off: 0.24, y_off: 1.8, angle: -1.28, len_frac: 0.25, width_frac: 0.0128, depth: 8, bias: 1 },
    Root { x_off: 0.56, y_off: 2.2, angle: -1.06, len_frac: 0.23, width_frac: 0.0122, depth: 8, bias: 1 },
    Root { x_off: 0.9, y_off: 2.6, angle: -0.72, len_frac: 0.2, width_frac: 0.0118, depth: 8, bias: 1 },
    Root { x_off: 0.72, y_off: 2.95, angle: -0.86, len_frac: 0.205, width_frac: 0.0114, depth: 7, bias: 1 },
    Root { x_off: 1.02, y_off: 3.15, angle: -0.56, len_frac: 0.185, width_frac: 0.0111, depth: 7, bias: 1 },
];

fn draw_tree(bmp: &mut Bitmap) -> TrunkMeta {
    let w = bmp.width() as f64;
    let h = bmp.height() as f64;
    let cx = w * 0.5;
    // Trunk base sits a few rows below the nominal composition line.
    let base_y = (h * 0.84 + 5.5).min(h - 2.5);
    let canopy_w = w * 0.76;
    let canopy_h = h * 0.52;

    let trunk_top_y = base_y - canopy_h * 0.39;
    let trunk_bottom_y = base_y;
    let trunk_top_w = canopy_w * 0.034;
    let trunk_bottom_w = canopy_w * 0.118;

    fill_trunk(
        bmp,
        cx,
        base_y,
        canopy_h,
        trunk_top_y,
        trunk_bottom_y,
        trunk_top_w,
        trunk_bottom_w,
    );

    let canopy = Canopy {
        cx,
        base_y,
        w: canopy_w,
        h: canopy_h,
        arc_cy: base_y - canopy_h * 0.58,
        arc_rx: canopy_w * 0.75,
        arc_ry: canopy_h * 0.56,
    };

    let spawn = |root: &Root| BranchParams {
        x: cx + trunk_top_w * root.x_off,
        y: trunk_top_y + root.y_off,
        len: canopy_w * root.len_frac,
        angle: root.angle,
        width: canopy_w * root.width_frac,
        depth: root.depth,
        bias: root.bias,
    };

    // Each root is drawn twice with an identical seed, once plain and once
    // through the mirror transform, so cell occupancy is left/right
    // symmetric by construction.
    for mirror in [false, true] {
        let mut painter = BranchPainter {
            bmp,
            canopy,
            rng: Lcg::with_seed(CENTER_ROOT_SEED),
            mirror,
        };
        painter.branch(spawn(&CENTER_ROOT));
    }

    for (idx, root) in SIDE_ROOTS.iter().enumerate() {
        let seed = SIDE_ROOT_SEED_BASE + SIDE_ROOT_SEED_STEP * idx as u32;
        for mirror in [false, true] {
            let mut painter = BranchPainter {
                bmp,
                canopy,
                rng: Lcg::with_seed(seed),
                mirror,
            };
            painter.branch(spawn(root));
        }
    }

    TrunkMeta {
        center_x: cx,
        top_y: trunk_top_y,
        bottom_y: trunk_bottom_y,
        top_w: trunk_top_w,
        bottom_w: trunk_bottom_w,
    }
}

/// Fills the tapered trunk outline: flared base, narrow waist, rounded top.
#[allow(clippy::too_many_arguments)]
fn fill_trunk(
    bmp: &mut Bitmap,
    cx: f64,
    base_y: f64,
    canopy_h: f64,
    top_y: f64,
    bottom_y: f64,
    top_w: f64,
    bottom_w: f64,
) {
    const STEPS: usize = 24;
    let mut pts: Vec<Point> = Vec::with_capacity(4 * STEPS);

    let left_side = CubicBez::new(
        Point::new(cx - bottom_w * 0.5, bottom_y),
        Point::new(cx - bottom_w * 0.45, base_y - canopy_h * 0.06),
        Point::new(cx - top_w * 0.95, top_y + canopy_h * 0.12),
        Point::new(cx - top_w * 0.52, top_y),
    );
    let left_cap = QuadBez::new(
        Point::new(cx - top_w * 0.52, top_y),
        Point::new(cx - top_w * 0.06, top_y - canopy_h * 0.02),
        Point::new(cx, top_y - canopy_h * 0.015),
    );
    let right_cap = QuadBez::new(
        Point::new(cx, top_y - canopy_h * 0.015),
        Point::new(cx + top_w * 0.06, top_y - canopy_h * 0.02),
        Point::new(cx + top_w * 0.52, top_y),
    );
    let right_side = CubicBez::new(
        Point::new(cx + top_w * 0.52, top_y),
        Point::new(cx + top_w * 0.95, top_y + canopy_h * 0.12),
        Point::new(cx + bottom_w * 0.45, base_y - canopy_h * 0.06),
        Point::new(cx + bottom_w * 0.5, bottom_y),
    );

    for i in 0..STEPS {
        pts.push(left_side.eval(i as f64 / STEPS as f64));
    }
    for i in 0..STEPS {
        pts.push(left_cap.eval(i as f64 / STEPS as f64));
    }
    for i in 0..STEPS {
        pts.push(right_cap.eval(i as f64 / STEPS as f64));
    }
    for i in 0..=STEPS {
        pts.push(right_side.eval(i as f64 / STEPS as f64));
    }

    bmp.fill_polygon(&pts);
}

/// How likely a filler rule is to fire, possibly depending on whether the
/// parent branch is a center (`bias == 0`) or side branch.
#[derive(Clone, Copy)]
enum Chance {
    Fixed(f64),
    BySide { center: f64, side: f64 },
}

#[derive(Clone, Copy)]
enum AngleRule {
    /// `seg_angle + (rand - 0.5) * k`
    Jitter(f64),
    /// Tilts toward the trunk centerline, plus jitter.
    TiltInward { tilt: f64, jitter: f64 },
    /// Tilts away from the trunk centerline, plus jitter.
    TiltOutward { tilt: f64, jitter: f64 },
}

#[derive(Clone, Copy)]
enum ChildBias {
    Zero,
    RandomSign,
    /// Side of the parent branch (`-1` for center parents).
    SideSign,
    CenterRandomElseZero,
    CenterRandomElseInherit,
}

/// One probability-gated extra-branch rule. Evaluated in order after the
/// main two-way split; each shapes density in one region of the canopy.
struct FillerRule {
    /// Allowed |x - cx| range, as fractions of canopy width (max may be inf).
    x_abs_frac: (f64, f64),
    /// Allowed height band: `base_y - b*h < y < base_y - a*h` (b may be inf).
    y_frac: Option<(f64, f64)>,
    depth: (i32, i32),
    chance: Chance,
    len_base: f64,
    len_spread: f64,
    angle: AngleRule,
    width_factor: f64,
    depth_step: i32,
    child_bias: ChildBias,
}

const INF: f64 = f64::INFINITY;

/// Density shaping, tuned region by region: center twigs, center-column
/// feeders, upper-center pocket, top-side band, top-middle wisps, mid-center
/// connectors, lower-side pockets, and the central vertical feeder strip.
const FILLER_RULES: &[FillerRule] = &[
    FillerRule {
        x_abs_frac: (0.0, INF),
        y_frac: None,
        depth: (3, 7),
        chance: Chance::BySide { center: 0.82, side: 0.34 },
        len_base: 0.58,
        len_spread: 0.1,
        angle: AngleRule::Jitter(0.12),
        width_factor: 0.64,
        depth_step: 2,
        child_bias: ChildBias::CenterRandomElseZero,
    },
    FillerRule {
        x_abs_frac: (0.0, INF),
        y_frac: None,
        depth: (2, 6),
        chance: Chance::BySide { center: 0.68, side: 0.0 },
        len_base: 0.5,
        len_spread: 0.08,
        angle: AngleRule::Jitter(0.2),
        width_factor: 0.56,
        depth_step: 1,
        child_bias: ChildBias::RandomSign,
    },
    FillerRule {
        x_abs_frac: (0.0, 0.24),
        y_frac: None,
        depth: (3, 8),
        chance: Chance::Fixed(0.74),
        len_base: 0.54,
        len_spread: 0.1,
        angle: AngleRule::Jitter(0.08),
        width_factor: 0.72,
        depth_step: 1,
        child_bias: ChildBias::Zero,
    },
    FillerRule {
        x_abs_frac: (0.0, 0.22),
        y_frac: Some((0.54, INF)),
        depth: (2, 6),
        chance: Chance::Fixed(0.68),
        len_base: 0.5,
        len_spread: 0.08,
        angle: AngleRule::Jitter(0.07),
        width_factor: 0.62,
        depth_step: 1,
        child_bias: ChildBias::Zero,
    },
    FillerRule {
        x_abs_frac: (0.38, 0.74),
        y_frac: Some((0.56, INF)),
        depth: (2, 6),
        chance: Chance::Fixed(0.95),
        len_base: 0.46,
        len_spread: 0.08,
        angle: AngleRule::TiltInward { tilt: 0.11, jitter: 0.08 },
        width_factor: 0.52,
        depth_step: 1,
        child_bias: ChildBias::SideSign,
    },
    FillerRule {
        x_abs_frac: (0.0, 0.12),
        y_frac: Some((0.62, 0.9)),
        depth: (2, 5),
        chance: Chance::Fixed(0.62),
        len_base: 0.42,
        len_spread: 0.08,
        angle: AngleRule::Jitter(0.06),
        width_factor: 0.48,
        depth_step: 1,
        child_bias: ChildBias::Zero,
    },
    FillerRule {
        x_abs_frac: (0.0, 0.18),
        y_frac: Some((0.42, 0.7)),
        depth: (3, 7),
        chance: Chance::Fixed(0.55),
        len_base: 0.5,
        len_spread: 0.08,
        angle: AngleRule::Jitter(0.1),
        width_factor: 0.62,
        depth_step: 1,
        child_bias: ChildBias::RandomSign,
    },
    FillerRule {
        x_abs_frac: (0.28, 0.64),
        y_frac: Some((0.18, 0.58)),
        depth: (2, 6),
        chance: Chance::Fixed(0.68),
        len_base: 0.5,
        len_spread: 0.08,
        angle: AngleRule::TiltOutward { tilt: 0.08, jitter: 0.08 },
        width_factor: 0.6,
        depth_step: 1,
        child_bias: ChildBias::CenterRandomElseInherit,
    },
    FillerRule {
        x_abs_frac: (0.0, 0.17),
        y_frac: None,
        depth: (3, 9),
        chance: Chance::Fixed(0.78),
        len_base: 0.62,
        len_spread: 0.08,
        angle: AngleRule::Jitter(0.05),
        width_factor: 0.82,
        depth_step: 1,
        child_bias: ChildBias::Zero,
    },
];

struct BranchPainter<'a> {
    bmp: &'a mut Bitmap,
    canopy: Canopy,
    rng: Lcg,
    mirror: bool,
}

impl BranchPainter<'_> {
    fn map(&self, p: Point) -> Point {
        if self.mirror {
            Point::new(2.0 * self.canopy.cx - p.x, p.y)
        } else {
            p
        }
    }

    fn stroke_cubic(&mut self, p0: Point, c1: Point, c2: Point, p1: Point, width: f64) {
        let bez = CubicBez::new(self.map(p0), self.map(c1), self.map(c2), self.map(p1));
        let approx_len = (bez.p1 - bez.p0).hypot()
            + (bez.p2 - bez.p1).hypot()
            + (bez.p3 - bez.p2).hypot();
        let steps = ((approx_len / 0.3).ceil() as usize).max(2);
        let radius = (width.max(0.16) * 0.5).max(0.3);
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let pt = bez.eval(t);
            self.bmp.stamp_disc(pt.x, pt.y, radius);
        }
    }

    fn branch(&mut self, p: BranchParams) {
        if p.depth <= 0 || p.len < 0.82 || p.width < 0.07 {
            return;
        }

        let c = self.canopy;
        let side_uniform = p.bias.abs() == 1;
        let heading_jitter = if side_uniform { 0.14 } else { 0.36 };
        let heading =
            p.angle + (self.rng.next_f64() - 0.5) * heading_jitter + f64::from(p.bias) * 0.07;
        let x2 = p.x + heading.cos() * p.len;
        let mut y2 = p.y + heading.sin() * p.len;
        let x_abs = (x2 - c.cx).abs();

        // Pull upper branches onto the shared canopy arc.
        if p.depth <= 2 {
            let semi_y = c.edge_arc_y(x2) + if p.depth == 1 { 0.1 } else { 0.24 };
            let pull = if p.depth == 1 { 0.95 } else { 0.88 };
            y2 = y2 * (1.0 - pull) + semi_y * pull;
            let min_top = c.edge_arc_y(x2) - 0.2;
            if y2 < min_top {
                y2 = min_top;
            }
        } else if p.depth == 3 && x_abs > c.w * 0.18 {
            let semi_y = c.edge_arc_y(x2) + 0.36;
            let pull = if x_abs > c.w * 0.45 { 0.76 } else { 0.62 };
            y2 = y2 * (1.0 - pull) + semi_y * pull;
        }

        let seg_angle = (y2 - p.y).atan2(x2 - p.x);
        let normal = seg_angle + std::f64::consts::FRAC_PI_2;
        let curve_dir_base = if p.bias == 0 {
            f64::from(self.rng.sign())
        } else {
            f64::from(p.bias)
        };
        let curve_dir = curve_dir_base
            * if p.bias != 0 && p.depth % 2 == 1 {
                -0.55
            } else {
                1.0
            };
        let curve1 = p.len
            * if side_uniform {
                0.2
            } else {
                0.16 + self.rng.next_f64() * 0.2
            }
            * curve_dir;
        let curve2 = p.len
            * if side_uniform {
                0.17
            } else {
                0.12 + self.rng.next_f64() * 0.22
            }
            * curve_dir;
        let c1 = Point::new(
            p.x + seg_angle.cos() * p.len * 0.33 + normal.cos() * curve1,
            p.y + seg_angle.sin() * p.len * 0.33 + normal.sin() * curve1,
        );
        let c2 = Point::new(
            p.x + seg_angle.cos() * p.len * 0.72 + normal.cos() * curve2,
            p.y + seg_angle.sin() * p.len * 0.72 + normal.sin() * curve2,
        );

        self.stroke_cubic(Point::new(p.x, p.y), c1, c2, Point::new(x2, y2), p.width);

        // Hard canopy bounds.
        let zone_top = c.base_y - c.h * 1.24;
        let zone_bottom = c.base_y + c.h * 0.04;
        if y2 < zone_top || y2 > zone_bottom || x2 < c.cx - c.w * 0.72 || x2 > c.cx + c.w * 0.72 {
            return;
        }

        // Thin lower outer lobes.
        if x_abs > c.w * 0.42 && y2 > c.base_y - c.h * 0.42 && self.rng.next_f64() < 0.22 {
            return;
        }
        // Thin the upper-center cluster.
        if x_abs < c.w * 0.18
            && y2 < c.base_y - c.h * 0.52
            && y2 > c.base_y - c.h * 0.82
            && self.rng.next_f64() < 0.34
        {
            return;
        }
        // Thin the inner-mid cluster on inward-leaning branches.
        if p.bias < 0
            && x_abs > c.w * 0.18
            && x_abs < c.w * 0.44
            && y2 > c.base_y - c.h * 0.72
            && y2 < c.base_y - c.h * 0.26
            && self.rng.next_f64() < 0.36
        {
            return;
        }

        let next_len = p.len
            * if side_uniform {
                0.72
            } else {
                0.69 + self.rng.next_f64() * 0.06
            };
        let next_width = p.width
            * if side_uniform {
                0.54
            } else {
                0.48 + self.rng.next_f64() * 0.07
            };
        let spread = if side_uniform {
            0.24 - ((9 - p.depth) as f64 * 0.008).min(0.06)
        } else {
            0.2 + self.rng.next_f64() * 0.24
        };

        // Main two-way split.
        self.branch(BranchParams {
            x: x2,
            y: y2,
            len: next_len,
            angle: seg_angle - spread,
            width: next_width,
            depth: p.depth - 1,
            bias: -1,
        });
        let right_len = next_len * (0.94 + self.rng.next_f64() * 0.1);
        self.branch(BranchParams {
            x: x2,
            y: y2,
            len: right_len,
            angle: seg_angle + spread,
            width: next_width,
            depth: p.depth - 1,
            bias: 1,
        });

        for rule in FILLER_RULES {
            self.try_filler(rule, x2, y2, x_abs, seg_angle, next_len, next_width, p.depth, p.bias);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn try_filler(
        &mut self,
        rule: &FillerRule,
        x2: f64,
        y2: f64,
        x_abs: f64,
        seg_angle: f64,
        next_len: f64,
        next_width: f64,
        depth: i32,
        bias: i32,
    ) {
        let c = self.canopy;
        if depth < rule.depth.0 || depth > rule.depth.1 {
            return;
        }
        let (xmin, xmax) = rule.x_abs_frac;
        if x_abs >= xmax * c.w {
            return;
        }
        if xmin > 0.0 && x_abs <= xmin * c.w {
            return;
        }
        if let Some((a, b)) = rule.y_frac {
            if y2 >= c.base_y - c.h * a {
                return;
            }
            if b.is_finite() && y2 <= c.base_y - c.h * b {
                return;
            }
        }

        let chance = match rule.chance {
            Chance::Fixed(v) => v,
            Chance::BySide { center, side } => {
                if bias == 0 {
                    center
                } else {
                    side
                }
            }
        };
        if chance <= 0.0 || self.rng.next_f64() >= chance {
            return;
        }

        let len = next_len * (rule.len_base + self.rng.next_f64() * rule.len_spread);
        let angle = seg_angle
            + match rule.angle {
                AngleRule::Jitter(k) => (self.rng.next_f64() - 0.5) * k,
                AngleRule::TiltInward { tilt, jitter } => {
                    (if bias > 0 { -tilt } else { tilt }) + (self.rng.next_f64() - 0.5) * jitter
                }
                AngleRule::TiltOutward { tilt, jitter } => {
                    (if bias > 0 { tilt } else { -tilt }) + (self.rng.next_f64() - 0.5) * jitter
                }
            };
        let child_bias = match rule.child_bias {
            ChildBias::Zero => 0,
            ChildBias::RandomSign => self.rng.sign(),
            ChildBias::SideSign => {
                if bias > 0 {
                    1
                } else {
                    -1
                }
            }
            ChildBias::CenterRandomElseZero => {
                if bias == 0 {
                    self.rng.sign()
                } else {
                    0
                }
            }
            ChildBias::CenterRandomElseInherit => {
                if bias == 0 {
                    self.rng.sign()
                } else {
                    bias
                }
            }
        };

        self.branch(BranchParams {
            x: x2,
            y: y2,
            len,
            angle,
            width: next_width * rule.width_factor,
            depth: depth - rule.depth_step,
            bias: child_bias,
        });
    }
}

/// 32-bit linear congruential generator (Numerical Recipes constants).
///
/// The silhouette rasterizer leans on exact replay: reseeding with the same
/// value and repeating the same call sequence yields bit-identical output,
/// which is what makes the mirrored canopy halves line up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn with_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn reseed(&mut self, seed: u32) {
        self.state = seed;
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        f64::from(self.state) / 4_294_967_296.0
    }

    /// Uniform in `[-half, half]`.
    pub fn jitter(&mut self, half: f64) -> f64 {
        (self.next_f64() - 0.5) * 2.0 * half
    }

    /// Either `-1` or `1` with equal probability.
    pub fn sign(&mut self) -> i32 {
        if self.next_f64() < 0.5 { -1 } else { 1 }
    }
}

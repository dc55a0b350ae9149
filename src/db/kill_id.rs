// Random numeric ids for teamkill records.

use rand::Rng;

pub const DEFAULT_WIDTH: u32 = 5;
pub const DEFAULT_MAX_WIDTH: u32 = 8;
pub const DEFAULT_ATTEMPTS_PER_WIDTH: u32 = 32;

/// Policy for drawing teamkill ids.
///
/// Candidates are `width` random decimal digits. After `attempts_per_width`
/// collisions the width grows by one, up to `max_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillIdGenerator {
    width: u32,
    max_width: u32,
    attempts_per_width: u32,
}

impl KillIdGenerator {
    /// Widths are clamped to `1..=9` so every candidate fits in a `u32`.
    pub fn new(width: u32, max_width: u32, attempts_per_width: u32) -> Self {
        let width = width.clamp(1, 9);
        Self {
            width,
            max_width: max_width.clamp(width, 9),
            attempts_per_width: attempts_per_width.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn attempts_per_width(&self) -> u32 {
        self.attempts_per_width
    }

    /// Total number of candidates drawn before giving up.
    pub fn max_attempts(&self) -> u32 {
        (self.max_width - self.width + 1) * self.attempts_per_width
    }

    /// Widths to try, in order.
    pub fn widths(&self) -> std::ops::RangeInclusive<u32> {
        self.width..=self.max_width
    }

    /// Draw one zero-padded candidate of the given width.
    pub fn candidate(&self, width: u32) -> String {
        let upper = 10u32.pow(width);
        let n = rand::thread_rng().gen_range(0..upper);
        format!("{n:0width$}", width = width as usize)
    }
}

impl Default for KillIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_MAX_WIDTH, DEFAULT_ATTEMPTS_PER_WIDTH)
    }
}

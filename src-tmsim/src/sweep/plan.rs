//! Enumeration of sweep combinations
//!
//! Order: volume (outer) → grade → grid x → grid y (inner). Grade 0 is
//! evaluated once per volume at the centre; grades 1..=4 at every grid point.

use crate::state::PerforationGrade;

/// One (volume, grade, position) combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    /// Zero-based position of this point in the plan
    pub index: usize,
    pub middle_ear_volume_cm3: f64,
    pub grade: PerforationGrade,
    pub position_x: f64,
    pub position_y: f64,
}

/// Number of combinations: `(1 + 4·N²) · volumes`, saturating at `usize::MAX`
pub fn total_combinations(grid_size: usize, volume_count: usize) -> usize {
    checked_total_combinations(grid_size, volume_count).unwrap_or(usize::MAX)
}

/// Number of combinations, or `None` when it does not fit in a `usize`
pub fn checked_total_combinations(grid_size: usize, volume_count: usize) -> Option<usize> {
    grid_size
        .checked_mul(grid_size)?
        .checked_mul(4)?
        .checked_add(1)?
        .checked_mul(volume_count)
}

/// Position of grid line `i` in `[0, 1]`; a single line sits at the centre
pub fn grid_position(i: usize, grid_size: usize) -> f64 {
    if grid_size <= 1 {
        0.5
    } else {
        i as f64 / (grid_size - 1) as f64
    }
}

/// Quadrant of the membrane: 1 posterior-superior, 2 anterior-superior,
/// 3 anterior-inferior, 4 posterior-inferior
pub fn quadrant(position_x: f64, position_y: f64) -> u8 {
    match (position_x >= 0.5, position_y >= 0.5) {
        (true, true) => 1,
        (false, true) => 2,
        (false, false) => 3,
        (true, false) => 4,
    }
}

/// Iterator over every sweep combination
#[derive(Debug, Clone)]
pub struct SweepPlan {
    volumes: Vec<f64>,
    grid_size: usize,
    volume_idx: usize,
    grade: u8,
    gx: usize,
    gy: usize,
    emitted: usize,
}

impl SweepPlan {
    pub fn new(volumes: &[f64], grid_size: usize) -> Self {
        Self {
            volumes: volumes.to_vec(),
            grid_size: grid_size.max(1),
            volume_idx: 0,
            grade: 0,
            gx: 0,
            gy: 0,
            emitted: 0,
        }
    }

    pub fn total(&self) -> usize {
        total_combinations(self.grid_size, self.volumes.len())
    }

    fn advance(&mut self) {
        if self.grade == 0 {
            self.grade = 1;
            self.gx = 0;
            self.gy = 0;
            return;
        }
        self.gy += 1;
        if self.gy < self.grid_size {
            return;
        }
        self.gy = 0;
        self.gx += 1;
        if self.gx < self.grid_size {
            return;
        }
        self.gx = 0;
        self.grade += 1;
        if self.grade <= crate::constants::MAX_GRADE {
            return;
        }
        self.grade = 0;
        self.volume_idx += 1;
    }
}

impl Iterator for SweepPlan {
    type Item = SweepPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let volume = *self.volumes.get(self.volume_idx)?;
        let (x, y) = if self.grade == 0 {
            (0.5, 0.5)
        } else {
            (grid_position(self.gx, self.grid_size), grid_position(self.gy, self.grid_size))
        };
        let point = SweepPoint {
            index: self.emitted,
            middle_ear_volume_cm3: volume,
            grade: PerforationGrade::new(self.grade as i64),
            position_x: x,
            position_y: y,
        };
        self.emitted += 1;
        self.advance();
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.emitted);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SweepPlan {}

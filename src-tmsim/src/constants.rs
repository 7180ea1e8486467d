//! Physical constants, standard audiometric frequencies and grade tables

/// Number of standard audiometric frequencies
pub const NUM_FREQUENCIES: usize = 8;

/// Standard audiometric frequencies (Hz) used by every table
pub const STANDARD_FREQUENCIES: [f64; NUM_FREQUENCIES] =
    [125.0, 250.0, 500.0, 1000.0, 2000.0, 3000.0, 4000.0, 8000.0];

/// Number of perforation grades (0 = intact, 4 = subtotal)
pub const NUM_GRADES: usize = 5;

/// Highest perforation grade
pub const MAX_GRADE: u8 = 4;

/// Grade → perforated area ratio used by the ABG model
pub const PRIMARY_GRADE_RATIO: [f64; NUM_GRADES] = [0.0, 0.125, 0.375, 0.625, 0.875];

/// Grade → perforated area ratio used for experiment geometry columns.
///
/// Intentionally distinct from [`PRIMARY_GRADE_RATIO`]: the sweep tables report
/// perforation size with this mapping while the model uses the primary one.
pub const VISUALIZATION_GRADE_RATIO: [f64; NUM_GRADES] = [0.0, 0.05, 0.25, 0.50, 0.75];

/// Speed of sound in air (m/s)
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Reference pressure for SPL (Pa)
pub const REFERENCE_PRESSURE_PA: f64 = 20e-6;

/// Middle-ear cavity volume of a normal ear (cm³)
pub const NORMAL_MIDDLE_EAR_VOLUME_CM3: f64 = 0.8;

/// Default tympanic membrane area (mm²)
pub const DEFAULT_TYMPANIC_AREA_MM2: f64 = 85.0;

/// Upper bound of any reported ABG (dB)
pub const MAX_ABG_DB: f64 = 60.0;

/// Indices of the low band (125, 250, 500 Hz)
pub const LOW_BAND: [usize; 3] = [0, 1, 2];

/// Indices of the mid band (1, 2 kHz)
pub const MID_BAND: [usize; 2] = [3, 4];

/// Indices of the high band (3, 4, 8 kHz)
pub const HIGH_BAND: [usize; 3] = [5, 6, 7];

/// Default middle-ear volumes swept by the experiment runner (cm³)
pub const DEFAULT_SWEEP_VOLUMES: [f64; 3] = [0.5, 0.8, 1.2];

/// Default position grid resolution of the experiment runner
pub const DEFAULT_GRID_SIZE: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_ratio_tables_are_strictly_increasing() {
        for table in [PRIMARY_GRADE_RATIO, VISUALIZATION_GRADE_RATIO] {
            for i in 0..NUM_GRADES - 1 {
                assert!(table[i] < table[i + 1], "ratio[{}] >= ratio[{}]", i, i + 1);
            }
        }
    }

    #[test]
    fn grade_ratio_tables_stay_distinct() {
        assert_ne!(PRIMARY_GRADE_RATIO, VISUALIZATION_GRADE_RATIO);
        assert_eq!(PRIMARY_GRADE_RATIO[0], 0.0);
        assert_eq!(VISUALIZATION_GRADE_RATIO[0], 0.0);
    }

    #[test]
    fn bands_cover_every_frequency_once() {
        let mut seen = [0usize; NUM_FREQUENCIES];
        for i in LOW_BAND.iter().chain(MID_BAND.iter()).chain(HIGH_BAND.iter()) {
            seen[*i] += 1;
        }
        assert!(seen.iter().all(|&n| n == 1));
    }
}

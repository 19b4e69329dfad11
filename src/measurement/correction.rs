//! Piecewise-linear correction tables.
//!
//! A table is a list of `(measured, actual)` breakpoints sorted by `measured`.
//! Inputs between two breakpoints are linearly interpolated; inputs outside the
//! table are extrapolated with the slope of the nearest segment.

/// One breakpoint of a correction table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionPoint {
    /// Value produced by the uncorrected conversion
    pub measured: f32,
    /// Value observed on a reference instrument
    pub actual: f32,
}

impl CorrectionPoint {
    pub const fn new(measured: f32, actual: f32) -> Self {
        Self { measured, actual }
    }
}

/// Line-voltage correction measured against a bench multimeter.
pub const VOLTAGE_CORRECTION: [CorrectionPoint; 10] = [
    CorrectionPoint::new(0.0, 0.0),
    CorrectionPoint::new(0.3, 1.72),
    CorrectionPoint::new(2.55, 4.03),
    CorrectionPoint::new(9.7, 11.22),
    CorrectionPoint::new(26.1, 27.5),
    CorrectionPoint::new(47.5, 49.0),
    CorrectionPoint::new(64.2, 65.73),
    CorrectionPoint::new(84.3, 85.8),
    CorrectionPoint::new(100.0, 101.5),
    CorrectionPoint::new(200.0, 201.5),
];

/// Monotonic piecewise-linear lookup over a static breakpoint table.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionTable {
    points: &'static [CorrectionPoint],
}

impl CorrectionTable {
    /// Wrap a breakpoint table. Points must be sorted by `measured`.
    pub const fn new(points: &'static [CorrectionPoint]) -> Self {
        Self { points }
    }

    /// The default line-voltage table.
    pub const fn voltage() -> Self {
        Self::new(&VOLTAGE_CORRECTION)
    }

    /// A table that returns its input unchanged.
    pub const fn identity() -> Self {
        Self::new(&[])
    }

    /// Map a measured value to its corrected value.
    pub fn correct(&self, value: f32) -> f32 {
        match self.points {
            [] => value,
            [only] => value + (only.actual - only.measured),
            points => {
                // Index of the segment [i, i + 1] used for the lookup. Values
                // outside the table use the first or last segment.
                let segment = points
                    .windows(2)
                    .position(|pair| value < pair[1].measured)
                    .unwrap_or(points.len() - 2);

                let lo = points[segment];
                let hi = points[segment + 1];
                let span = hi.measured - lo.measured;
                if span <= 0.0 {
                    return lo.actual;
                }

                lo.actual + (value - lo.measured) * (hi.actual - lo.actual) / span
            }
        }
    }
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self::voltage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_breakpoints_map_exactly() {
        let table = CorrectionTable::voltage();
        for point in VOLTAGE_CORRECTION.iter() {
            assert!(
                approx(table.correct(point.measured), point.actual),
                "breakpoint {} should map to {}",
                point.measured,
                point.actual
            );
        }
    }

    #[test]
    fn test_interpolates_between_breakpoints() {
        let table = CorrectionTable::voltage();
        // Halfway between 26.1 -> 27.5 and 47.5 -> 49.0
        let mid = (26.1 + 47.5) / 2.0;
        assert!(approx(table.correct(mid), (27.5 + 49.0) / 2.0));
    }

    #[test]
    fn test_extrapolates_past_last_segment() {
        let table = CorrectionTable::voltage();
        // Last segment has slope 1.0 with a +1.5 offset
        assert!(approx(table.correct(300.0), 301.5));
    }

    #[test]
    fn test_extrapolates_below_first_segment() {
        static TABLE: [CorrectionPoint; 2] = [
            CorrectionPoint::new(1.0, 2.0),
            CorrectionPoint::new(2.0, 4.0),
        ];
        let table = CorrectionTable::new(&TABLE);
        // Slope 2 through (1, 2) gives 0 at 0
        assert!(approx(table.correct(0.0), 0.0));
    }

    #[test]
    fn test_degenerate_tables() {
        assert!(approx(CorrectionTable::identity().correct(12.5), 12.5));

        static SINGLE: [CorrectionPoint; 1] = [CorrectionPoint::new(1.0, 1.5)];
        assert!(approx(CorrectionTable::new(&SINGLE).correct(10.0), 10.5));
    }

    #[test]
    fn test_monotonic_over_table() {
        let table = CorrectionTable::voltage();
        let mut prev = table.correct(0.0);
        for i in 1..=250 {
            let next = table.correct(i as f32);
            assert!(next >= prev, "correction must be monotonic at {}", i);
            prev = next;
        }
    }
}

use serde::{Deserialize, Serialize};

/// New extreme produced by one roll update
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExtremaUpdate {
    pub max_positive: Option<f64>,
    /// Magnitude of the new negative extreme (always >= 0)
    pub max_negative: Option<f64>,
}

/// Most extreme lean seen in each direction since the last reset
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RollExtremes {
    max_positive: f64,
    max_negative: f64,
}

impl RollExtremes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.max_positive = 0.0;
        self.max_negative = 0.0;
    }

    /// Widen the extremes with a fused roll value. The negative extreme is
    /// reported as a magnitude so the display never shows a sign.
    pub fn update(&mut self, roll: f64) -> ExtremaUpdate {
        let mut update = ExtremaUpdate::default();
        if roll > self.max_positive {
            self.max_positive = roll;
            update.max_positive = Some(roll);
        }
        if roll < self.max_negative {
            self.max_negative = roll;
            update.max_negative = Some(roll.abs());
        }
        update
    }

    pub fn max_positive(&self) -> f64 {
        self.max_positive
    }

    /// Signed negative extreme (<= 0)
    pub fn max_negative(&self) -> f64 {
        self.max_negative
    }

    pub fn max_negative_magnitude(&self) -> f64 {
        self.max_negative.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_sequence() {
        let mut extremes = RollExtremes::new();
        let updates: Vec<ExtremaUpdate> = [5.0, -3.0, 7.0, -9.0, 2.0]
            .iter()
            .map(|roll| extremes.update(*roll))
            .collect();

        assert_eq!(extremes.max_positive(), 7.0);
        assert_eq!(extremes.max_negative(), -9.0);
        assert_eq!(extremes.max_negative_magnitude(), 9.0);

        let positives: Vec<f64> = updates.iter().filter_map(|u| u.max_positive).collect();
        let negatives: Vec<f64> = updates.iter().filter_map(|u| u.max_negative).collect();
        assert_eq!(positives, vec![5.0, 7.0]);
        assert_eq!(negatives, vec![3.0, 9.0]);
    }

    #[test]
    fn test_zero_updates_nothing() {
        let mut extremes = RollExtremes::new();
        assert_eq!(extremes.update(0.0), ExtremaUpdate::default());
    }

    #[test]
    fn test_extremes_only_widen() {
        let mut extremes = RollExtremes::new();
        extremes.update(12.0);
        extremes.update(-4.0);
        assert_eq!(extremes.update(6.0), ExtremaUpdate::default());
        assert_eq!(extremes.update(-2.0), ExtremaUpdate::default());
        assert_eq!(extremes.max_positive(), 12.0);
        assert_eq!(extremes.max_negative(), -4.0);
    }

    #[test]
    fn test_signs_hold_after_reset() {
        let mut extremes = RollExtremes::new();
        for roll in [-1.5, -0.5, -20.0, -3.0] {
            extremes.update(roll);
        }
        assert!(extremes.max_positive() >= 0.0);
        extremes.reset();
        for roll in [0.5, 8.0, 1.0] {
            extremes.update(roll);
        }
        assert!(extremes.max_negative() <= 0.0);
        assert_eq!(extremes.max_negative(), 0.0);
        assert_eq!(extremes.max_positive(), 8.0);
    }
}

use geo::{HaversineDistance, Point};

use crate::types::GpsFix;

/// Journey path recorded while tracking
pub struct PathRecorder {
    points: Vec<GpsFix>,
    min_distance_m: f64,
}

impl PathRecorder {
    pub fn new(min_distance_m: f64) -> Self {
        PathRecorder {
            points: Vec::new(),
            min_distance_m,
        }
    }

    /// Add a fix unless it is within the movement threshold of the last
    /// kept one. Returns whether the fix was kept.
    pub fn push(&mut self, fix: GpsFix) -> bool {
        if let Some(last) = self.points.last() {
            if distance_m(last, &fix) < self.min_distance_m {
                return false;
            }
        }
        self.points.push(fix);
        true
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[GpsFix] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length of the raw path in kilometres
    pub fn distance_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| distance_m(&pair[0], &pair[1]))
            .sum::<f64>()
            / 1000.0
    }

    pub fn smoothed(&self, half_window: usize) -> Vec<GpsFix> {
        moving_average(&self.points, half_window)
    }
}

/// Centered moving average over `half_window` neighbours on each side.
/// The window is clipped at both ends of the path.
pub fn moving_average(points: &[GpsFix], half_window: usize) -> Vec<GpsFix> {
    (0..points.len())
        .map(|i| {
            let start = i.saturating_sub(half_window);
            let end = (i + half_window).min(points.len() - 1);
            let window = &points[start..=end];
            let count = window.len() as f64;
            let lat = window.iter().map(|p| p.latitude).sum::<f64>() / count;
            let lon = window.iter().map(|p| p.longitude).sum::<f64>() / count;
            GpsFix::new(lat, lon)
        })
        .collect()
}

fn distance_m(a: &GpsFix, b: &GpsFix) -> f64 {
    Point::new(a.longitude, a.latitude).haversine_distance(&Point::new(b.longitude, b.latitude))
}

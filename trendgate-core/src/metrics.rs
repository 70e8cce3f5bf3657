//! Series metrics for one trend level: inclination angle, directional
//! consistency and price distance to the moving average.
//!
//! Each metric returns its points or a `DataIssue`; the level scorer turns an
//! issue into 0 points and an `error` tag.

use serde::{Deserialize, Serialize};

use crate::domain::Direction;
use crate::error::DataIssue;

/// Maximum number of trailing points used by the regression.
pub const MAX_ANGLE_WINDOW: usize = 10;

/// Angles within this band (degrees, exclusive) are lateral.
pub const LATERAL_ANGLE: f64 = 15.0;

/// Slopes are measured in basis points of the window mean per bar, which
/// makes the angle independent of the instrument's price scale.
const SLOPE_SCALE: f64 = 10_000.0;

/// Classification of `|angle|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleClass {
    Fuerte,
    Saludable,
    Debil,
    #[default]
    Consolidacion,
}

impl AngleClass {
    pub fn from_degrees(degrees: f64) -> Self {
        let abs = degrees.abs();
        if abs >= 60.0 {
            Self::Fuerte
        } else if abs >= 45.0 {
            Self::Saludable
        } else if abs >= 15.0 {
            Self::Debil
        } else {
            Self::Consolidacion
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fuerte => "fuerte",
            Self::Saludable => "saludable",
            Self::Debil => "debil",
            Self::Consolidacion => "consolidacion",
        }
    }
}

/// Inclination of a moving-average series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleReading {
    pub degrees: f64,
    /// Raw regression slope, in series units per bar.
    pub slope: f64,
    /// Slope as percent of the window mean per bar, clamped to [-1, 1].
    pub normalized_slope: f64,
    pub class: AngleClass,
    pub direction: Direction,
}

/// Least-squares slope of `values` against x = 0, 1, 2, ...
///
/// Returns 0.0 for fewer than two points.
pub fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    num / den
}

/// Number of trailing points the regression reads for a series of `len`.
pub fn angle_window(len: usize) -> usize {
    MAX_ANGLE_WINDOW.min(len / 2)
}

/// Measure the inclination of the tail of `series`.
pub fn measure_angle(series: &[f64]) -> Result<AngleReading, DataIssue> {
    let window = angle_window(series.len());
    if window < 2 {
        return Err(DataIssue::InsufficientData);
    }
    let tail = &series[series.len() - window..];
    if tail.iter().any(|v| !v.is_finite()) {
        return Err(DataIssue::InsufficientData);
    }

    let mean = tail.iter().sum::<f64>() / window as f64;
    if mean <= 0.0 || !mean.is_finite() {
        return Err(DataIssue::DegenerateSeries);
    }

    let slope = regression_slope(tail);
    let relative = slope / mean;
    let degrees = (relative * SLOPE_SCALE).atan().to_degrees();

    let direction = if degrees > LATERAL_ANGLE {
        Direction::Bullish
    } else if degrees < -LATERAL_ANGLE {
        Direction::Bearish
    } else {
        Direction::Lateral
    };

    Ok(AngleReading {
        degrees,
        slope,
        normalized_slope: (relative * 100.0).clamp(-1.0, 1.0),
        class: AngleClass::from_degrees(degrees),
        direction,
    })
}

/// Angle points (0–40).
pub fn angle_score(reading: &AngleReading) -> f64 {
    let abs = reading.degrees.abs();
    match reading.class {
        AngleClass::Fuerte => 40.0,
        AngleClass::Saludable => 35.0,
        AngleClass::Debil if abs >= 25.0 => 25.0,
        AngleClass::Debil if abs >= 20.0 => 22.0,
        AngleClass::Debil => 20.0,
        AngleClass::Consolidacion if abs >= 10.0 => 10.0,
        AngleClass::Consolidacion if abs >= 5.0 => 7.0,
        AngleClass::Consolidacion => 5.0,
    }
}

/// Differences read by the consistency score for a series of length `len`:
/// a quarter of the series, capped at `cap`.
pub fn consistency_window(len: usize, cap: usize) -> usize {
    cap.min(len / 4)
}

/// Consistency points (0–30) over the last `window + 1` points of `series`.
///
/// Points follow the share of successive differences that move in the
/// dominant direction: at least 90% scores 30, 70% scores 20, 50% scores 10.
pub fn consistency_score(series: &[f64], window: usize) -> Result<f64, DataIssue> {
    let needed = window + 1;
    if window == 0 || series.len() < needed {
        return Err(DataIssue::InsufficientData);
    }
    let tail = &series[series.len() - needed..];
    if tail.iter().any(|v| !v.is_finite()) {
        return Err(DataIssue::InsufficientData);
    }

    let (mut up, mut down) = (0usize, 0usize);
    for pair in tail.windows(2) {
        if pair[1] > pair[0] {
            up += 1;
        } else if pair[1] < pair[0] {
            down += 1;
        }
    }

    // Integer comparison keeps the band edges exact.
    let dominant = up.max(down);
    let points = if dominant * 10 >= window * 9 {
        30.0
    } else if dominant * 10 >= window * 7 {
        20.0
    } else if dominant * 10 >= window * 5 {
        10.0
    } else {
        0.0
    };
    Ok(points)
}

/// Relative distance `|price - ma| / ma`.
pub fn relative_distance(price: f64, ma: f64) -> Result<f64, DataIssue> {
    if !ma.is_finite() || !price.is_finite() || ma == 0.0 {
        return Err(DataIssue::DegenerateSeries);
    }
    Ok((price - ma).abs() / ma.abs())
}

/// Distance points (5–30): closer to the moving average scores higher.
pub fn distance_score(price: f64, ma: f64) -> Result<f64, DataIssue> {
    let d = relative_distance(price, ma)?;
    let points = if d < 0.001 {
        30.0
    } else if d < 0.003 {
        25.0
    } else if d < 0.005 {
        20.0
    } else if d < 0.01 {
        10.0
    } else {
        5.0
    };
    Ok(points)
}

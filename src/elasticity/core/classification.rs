//! Confidence intervals, hypothesis tests and the sustainability rule.
//!
//! The classification of a network is a pure function of the confidence
//! interval for its elasticity β, never of the point estimate alone:
//!
//! - `Sustainable`   iff `lower > 1`,
//! - `Unsustainable` iff `upper < 1`,
//! - `Borderline`    otherwise (an interval touching 1.0 is Borderline).
//!
//! A bound within [`GENERAL_TOL`] of 1.0 counts as touching it, so a
//! degenerate interval from a noise-free unit-elasticity fit stays
//! Borderline whatever rounding the log transform introduced.
use crate::numerical_stability::transformations::GENERAL_TOL;
use serde::Serialize;

/// Threshold separating super-linear from sub-linear value growth.
pub const UNIT_ELASTICITY: f64 = 1.0;

/// Sustainability class of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// Value grows faster than usage with confidence.
    Sustainable,
    /// The interval includes unit elasticity.
    Borderline,
    /// Value grows slower than usage with confidence.
    Unsustainable,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Sustainable => "Sustainable",
            Classification::Borderline => "Borderline",
            Classification::Unsustainable => "Unsustainable",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-sided confidence interval at `level`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl ConfidenceInterval {
    /// `estimate ± critical · std_error`.
    pub fn symmetric(estimate: f64, std_error: f64, critical: f64, level: f64) -> Self {
        let half_width = critical * std_error;
        ConfidenceInterval { lower: estimate - half_width, upper: estimate + half_width, level }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    /// Apply the sustainability rule to this interval.
    pub fn classify(&self) -> Classification {
        if self.lower > UNIT_ELASTICITY + GENERAL_TOL {
            Classification::Sustainable
        } else if self.upper < UNIT_ELASTICITY - GENERAL_TOL {
            Classification::Unsustainable
        } else {
            Classification::Borderline
        }
    }
}

/// Two-sided Wald test of `H₀: coefficient = null_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HypothesisTest {
    pub null_value: f64,
    pub statistic: f64,
    pub p_value: f64,
}

/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::io::{ConfigError, ConfigRepr};

use super::{
    BATTIN_THRESHOLD, LAGRANGE_THRESHOLD, MAX_BATTIN_THRESHOLD, MAX_ITERATIONS,
    MULTI_REV_TOLERANCE, SERIES_TOLERANCE, ZERO_REV_TOLERANCE,
};

/// LambertOpts stores the tolerances and switches of the Izzo solver.
///
/// The defaults reproduce the reference behavior: 15 Householder iterations at most, a tolerance on
/// the universal variable of 1e-5 for the zero revolution branch and 1e-8 for the multi revolution
/// branches, and the simple `floor(T/π)` cap on the number of revolutions.
#[derive(Clone, Copy, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
#[serde(default)]
pub struct LambertOpts {
    #[builder(default = ZERO_REV_TOLERANCE)]
    pub zero_rev_tol: f64,
    #[builder(default = MULTI_REV_TOLERANCE)]
    pub multi_rev_tol: f64,
    #[builder(default = MAX_ITERATIONS)]
    pub max_iter: usize,
    /// Distance to x = 1 below which the Battin series is used
    #[builder(default = BATTIN_THRESHOLD)]
    pub battin_threshold: f64,
    /// Distance to x = 1 below which the Lagrange expression is used
    #[builder(default = LAGRANGE_THRESHOLD)]
    pub lagrange_threshold: f64,
    #[builder(default = SERIES_TOLERANCE)]
    pub series_tol: f64,
    /// Locate the true minimum time of flight of the highest revolution count and drop it if unreachable.
    #[builder(default = false)]
    pub refine_max_revs: bool,
    /// Return an error instead of the last iterate when a branch exhausts its iterations.
    #[builder(default = false)]
    pub strict_convergence: bool,
    /// Solve the branches on the rayon thread pool.
    #[builder(default = false)]
    pub parallel: bool,
}

impl LambertOpts {
    /// Returns the tolerance on x used for the branches of the provided revolution count
    pub fn tolerance(&self, revs: u32) -> f64 {
        if revs == 0 {
            self.zero_rev_tol
        } else {
            self.multi_rev_tol
        }
    }

    /// Checks that the tolerances and thresholds are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("zero_rev_tol", self.zero_rev_tol),
            ("multi_rev_tol", self.multi_rev_tol),
            ("battin_threshold", self.battin_threshold),
            ("lagrange_threshold", self.lagrange_threshold),
            ("series_tol", self.series_tol),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidConfig {
                    msg: format!("{name} must be finite and positive, got {value}"),
                });
            }
        }

        if self.battin_threshold > MAX_BATTIN_THRESHOLD {
            return Err(ConfigError::InvalidConfig {
                msg: format!(
                    "battin_threshold ({}) must not exceed {MAX_BATTIN_THRESHOLD}",
                    self.battin_threshold
                ),
            });
        }

        if self.lagrange_threshold >= 1.0 {
            return Err(ConfigError::InvalidConfig {
                msg: format!(
                    "lagrange_threshold ({}) must be smaller than one",
                    self.lagrange_threshold
                ),
            });
        }

        if self.battin_threshold >= self.lagrange_threshold {
            return Err(ConfigError::InvalidConfig {
                msg: format!(
                    "battin_threshold ({}) must be smaller than lagrange_threshold ({})",
                    self.battin_threshold, self.lagrange_threshold
                ),
            });
        }

        if self.max_iter == 0 {
            return Err(ConfigError::InvalidConfig {
                msg: "max_iter must be at least one".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for LambertOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for LambertOpts {}

impl fmt::Display for LambertOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tol: {:e} (0 rev) / {:e} (N rev), max iter: {}, battin: {}, lagrange: {}, refine: {}, strict: {}",
            self.zero_rev_tol,
            self.multi_rev_tol,
            self.max_iter,
            self.battin_threshold,
            self.lagrange_threshold,
            self.refine_max_revs,
            self.strict_convergence
        )
    }
}

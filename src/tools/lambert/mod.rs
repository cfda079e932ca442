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

use crate::errors::LambertError;
use crate::linalg::Vector3;
use crate::time::Duration;
use std::fmt;

mod geometry;
mod izzo;
mod options;
pub mod tof;

use anise::errors::PhysicsError;
use anise::prelude::Orbit;
pub use geometry::TransferGeometry;
pub use izzo::{householder, initial_guess, refine_max_revs, Branch, LambertSolver};
pub use options::LambertOpts;

const ZERO_REV_TOLERANCE: f64 = 1e-5; // Tolerance on x for the single revolution branch
const MULTI_REV_TOLERANCE: f64 = 1e-8; // Tolerance on x for the multi revolution branches
const BATTIN_THRESHOLD: f64 = 0.01;
const LAGRANGE_THRESHOLD: f64 = 0.2;
/// Largest Battin threshold for which the hypergeometric series argument stays within [-0.5625, 0.5625]
const MAX_BATTIN_THRESHOLD: f64 = 0.25;
const SERIES_TOLERANCE: f64 = 1e-11;
/// Minimum |sin(Δν)| between both positions, below which the transfer plane is undefined.
pub const COLLINEAR_TOLERANCE: f64 = 1e-12;
/// Maximum number of Householder iterations per branch.
/// Reaching it is not an error unless strict convergence is requested.
pub const MAX_ITERATIONS: usize = 15;

/// Direction of motion of the transfer, as seen from the +Z axis
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Counter clockwise
    Prograde,
    /// Clockwise
    Retrograde,
}

/// Which branch of a given revolution count a solution belongs to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// The only branch of the zero revolution case
    Single,
    /// Left of the minimum of the time of flight curve
    Left,
    /// Right of the minimum of the time of flight curve
    Right,
}

/// Outcome of the Householder iterations of a branch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Convergence {
    Converged,
    /// The iteration budget was exhausted and the last iterate was kept
    IterationLimit,
}

#[derive(Clone, Debug)]
pub struct LambertSolution {
    pub v_init: Vector3<f64>,
    pub v_final: Vector3<f64>,
    pub revs: u32,
    pub side: Side,
    /// Universal variable of this solution
    pub x: f64,
    pub iterations: usize,
    pub convergence: Convergence,
}

impl fmt::Display for LambertSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rev ({:?}): x = {:.9}, v_init = [{:.6}, {:.6}, {:.6}] km/s, v_final = [{:.6}, {:.6}, {:.6}] km/s ({:?} in {} iterations)",
            self.revs,
            self.side,
            self.x,
            self.v_init.x,
            self.v_init.y,
            self.v_init.z,
            self.v_final.x,
            self.v_final.y,
            self.v_final.z,
            self.convergence,
            self.iterations
        )
    }
}

#[derive(Debug)]
pub struct LambertInput {
    pub initial_state: Orbit,
    pub final_state: Orbit,
}

impl LambertInput {
    pub fn from_planetary_states(
        initial_state: Orbit,
        final_state: Orbit,
    ) -> Result<Self, LambertError> {
        if final_state.frame != initial_state.frame {
            return Err(LambertError::AstroPhysics {
                source: PhysicsError::FrameMismatch {
                    action: "Lambert solver requires both states to be in the same frame",
                    frame1: final_state.frame.into(),
                    frame2: initial_state.frame.into(),
                },
            });
        }
        // Ensure that the GM is set
        initial_state
            .frame
            .mu_km3_s2()
            .map_err(|source| LambertError::AstroPhysics { source })?;

        let tof = final_state.epoch - initial_state.epoch;
        if tof <= Duration::ZERO {
            return Err(LambertError::InvalidTimeOfFlight {
                tof_s: tof.to_seconds(),
            });
        }

        Ok(Self {
            initial_state,
            final_state,
        })
    }

    /// Return the gravitational parameter of this Lambert problem
    pub fn mu_km3_s2(&self) -> Result<f64, LambertError> {
        self.initial_state
            .frame
            .mu_km3_s2()
            .map_err(|source| LambertError::AstroPhysics { source })
    }

    /// Time of flight between both states
    pub fn tof(&self) -> Duration {
        self.final_state.epoch - self.initial_state.epoch
    }

    /// Solves the Lambert problem between the positions of both states
    pub fn solve(
        &self,
        direction: Direction,
        max_revs: u32,
        opts: LambertOpts,
    ) -> Result<LambertSolver, LambertError> {
        LambertSolver::with_opts(
            self.initial_state.radius_km,
            self.final_state.radius_km,
            self.tof().to_seconds(),
            self.mu_km3_s2()?,
            direction,
            max_revs,
            opts,
        )
    }
}

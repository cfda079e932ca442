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

use crate::io::ConfigError;
use anise::errors::PhysicsError;
use snafu::Snafu;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LambertError {
    #[snafu(display("time of flight must be finite and strictly positive, got {tof_s} s"))]
    InvalidTimeOfFlight { tof_s: f64 },
    #[snafu(display("gravitational parameter must be finite and strictly positive, got {mu_km3_s2} km^3/s^2"))]
    InvalidGravParam { mu_km3_s2: f64 },
    #[snafu(display("{which} position vector is degenerate (norm = {norm_km} km)"))]
    DegeneratePosition { which: &'static str, norm_km: f64 },
    #[snafu(display("position vectors are collinear (|sin(dnu)| = {sin_angle:e}), the transfer plane is undefined"))]
    CollinearPositions { sin_angle: f64 },
    #[snafu(display("Householder iterations did not converge for {revs} revolution(s) after {maxiter} iterations"))]
    SolverMaxIter { revs: u32, maxiter: usize },
    #[snafu(display("no solution with {revs} revolution(s): at most {max_revs} are feasible"))]
    RevsNotFeasible { revs: u32, max_revs: u32 },
    #[snafu(display("invalid Lambert solver options: {source}"))]
    Options { source: ConfigError },
    #[snafu(display("physics error when building the Lambert problem: {source}"))]
    AstroPhysics { source: PhysicsError },
}

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

/*! # nyx-lambert

Multi-revolution Lambert solver, following D. Izzo's "Revisiting Lambert's problem" (2015).

Given two position vectors, a time of flight and a gravitational parameter, the solver returns every
initial and final velocity pair connecting both positions, for up to the requested number of complete revolutions.

```ignore
use nyx_lambert::linalg::Vector3;
use nyx_lambert::tools::lambert::{Direction, LambertSolver};

let r1 = Vector3::new(15945.34, 0.0, 0.0);
let r2 = Vector3::new(12214.83899, 10249.46731, 0.0);
let solver = LambertSolver::new(r1, r2, 76.0 * 60.0, 3.98600433e5, Direction::Prograde, 0)?;
println!("{}", solver.velocities1()[0]);
```
*/

/// Simple tools (e.g. Lambert solver)
pub mod tools;

/// Loading of the solver configuration from YAML files.
pub mod io;

mod errors;
/// Functions which may fail will return an error instead of propagating NaNs.
pub use self::errors::LambertError;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export the main solver types
pub use self::tools::lambert::{Direction, LambertSolution, LambertSolver};

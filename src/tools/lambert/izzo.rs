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

use core::f64::consts::PI;

use rayon::prelude::*;

use crate::errors::LambertError;

use super::tof::{compute_y, tof_derivatives, TimeOfFlight};
use super::{
    Convergence, Direction, LambertOpts, LambertSolution, Side, TransferGeometry, Vector3,
};

/// Maximum number of Halley steps when locating the minimum time of flight
const HALLEY_MAX_ITER: usize = 12;
const HALLEY_TOLERANCE: f64 = 1e-13;

/// One solution branch of the Lambert problem and the state of its root finding.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Branch {
    pub revs: u32,
    pub side: Side,
    /// Initial guess of the universal variable
    pub x0: f64,
    /// Converged (or last) value of the universal variable
    pub x: f64,
    pub iterations: usize,
    pub convergence: Convergence,
}

/// Multi-revolution Lambert solver using D. Izzo's method, as described in "Revisiting Lambert's problem" (2015).
///
/// All `2 N + 1` solutions are computed on construction, where `N` is the smallest of the requested
/// number of revolutions and the number of revolutions the time of flight allows. Index 0 is the zero
/// revolution solution, and indexes `2i - 1` and `2i` are respectively the left and right solutions with `i`
/// complete revolutions.
#[derive(Clone, Debug)]
pub struct LambertSolver {
    geometry: TransferGeometry,
    mu_km3_s2: f64,
    tof_s: f64,
    /// Dimensionless time of flight
    t: f64,
    theoretical_max_revs: u32,
    max_revs: u32,
    branches: Vec<Branch>,
    v1: Vec<Vector3<f64>>,
    v2: Vec<Vector3<f64>>,
    opts: LambertOpts,
}

impl LambertSolver {
    /// Solves the Lambert problem with the default options.
    ///
    /// # Arguments
    ///
    /// * `r_init` - The initial radius vector, in km.
    /// * `r_final` - The final radius vector, in km.
    /// * `tof_s` - The time of flight in seconds.
    /// * `mu_km3_s2` - The gravitational parameter in km^3/s^2.
    /// * `direction` - Prograde or retrograde motion.
    /// * `max_revs` - The maximum number of complete revolutions to consider.
    pub fn new(
        r_init: Vector3<f64>,
        r_final: Vector3<f64>,
        tof_s: f64,
        mu_km3_s2: f64,
        direction: Direction,
        max_revs: u32,
    ) -> Result<Self, LambertError> {
        Self::with_opts(
            r_init,
            r_final,
            tof_s,
            mu_km3_s2,
            direction,
            max_revs,
            LambertOpts::default(),
        )
    }

    /// Solves the Lambert problem with the provided options.
    pub fn with_opts(
        r_init: Vector3<f64>,
        r_final: Vector3<f64>,
        tof_s: f64,
        mu_km3_s2: f64,
        direction: Direction,
        max_revs: u32,
        opts: LambertOpts,
    ) -> Result<Self, LambertError> {
        opts.validate()
            .map_err(|source| LambertError::Options { source })?;

        if !(tof_s.is_finite() && tof_s > 0.0) {
            return Err(LambertError::InvalidTimeOfFlight { tof_s });
        }
        if !(mu_km3_s2.is_finite() && mu_km3_s2 > 0.0) {
            return Err(LambertError::InvalidGravParam { mu_km3_s2 });
        }

        let geometry = TransferGeometry::new(r_init, r_final, direction)?;
        let lambda = geometry.lambda;
        let model = TimeOfFlight::new(lambda, &opts);

        let t = geometry.dimensionless_tof(tof_s, mu_km3_s2);
        let theoretical_max_revs = (t / PI).floor() as u32;

        let mut feasible_revs = theoretical_max_revs;
        if opts.refine_max_revs {
            feasible_revs = refine_max_revs(&model, t, feasible_revs);
        }
        let max_revs = max_revs.min(feasible_revs);

        debug!(
            "Lambert T = {t}, N max = {theoretical_max_revs} (feasible: {feasible_revs}), solving for {max_revs} revolution(s) with {opts}"
        );

        let mut seeds = Vec::with_capacity(2 * max_revs as usize + 1);
        seeds.push((0, Side::Single));
        for revs in 1..=max_revs {
            seeds.push((revs, Side::Left));
            seeds.push((revs, Side::Right));
        }

        let solve = |(revs, side): (u32, Side)| -> Branch {
            let x0 = initial_guess(t, lambda, revs, side);
            let (x, iterations, convergence) =
                householder(&model, t, x0, revs, opts.tolerance(revs), opts.max_iter);
            Branch {
                revs,
                side,
                x0,
                x,
                iterations,
                convergence,
            }
        };

        let branches: Vec<Branch> = if opts.parallel {
            seeds.into_par_iter().map(solve).collect()
        } else {
            seeds.into_iter().map(solve).collect()
        };

        for branch in &branches {
            if branch.convergence == Convergence::IterationLimit {
                if opts.strict_convergence {
                    return Err(LambertError::SolverMaxIter {
                        revs: branch.revs,
                        maxiter: opts.max_iter,
                    });
                }
                warn!(
                    "Lambert {} rev ({:?}) branch did not converge in {} iterations, keeping x = {}",
                    branch.revs, branch.side, branch.iterations, branch.x
                );
            }
        }

        // Reconstruct
        let gamma = (mu_km3_s2 * geometry.s / 2.0).sqrt();
        let rho = geometry.rho();
        let sigma = (1.0 - rho.powi(2)).max(0.0).sqrt();

        let (v1, v2): (Vec<_>, Vec<_>) = branches
            .iter()
            .map(|branch| {
                let y = compute_y(branch.x, lambda);
                // Compute the radial and tangential components at initial and final position vectors
                let (v_r1, v_r2, v_t1, v_t2) = reconstruct(
                    branch.x,
                    y,
                    geometry.r1_norm,
                    geometry.r2_norm,
                    lambda,
                    gamma,
                    rho,
                    sigma,
                );
                (
                    v_r1 * geometry.i_r1 + v_t1 * geometry.i_t1,
                    v_r2 * geometry.i_r2 + v_t2 * geometry.i_t2,
                )
            })
            .unzip();

        Ok(Self {
            geometry,
            mu_km3_s2,
            tof_s,
            t,
            theoretical_max_revs,
            max_revs,
            branches,
            v1,
            v2,
            opts,
        })
    }

    /// Initial velocities of all solutions, ordered as the branches
    pub fn velocities1(&self) -> &[Vector3<f64>] {
        &self.v1
    }

    /// Final velocities of all solutions, ordered as the branches
    pub fn velocities2(&self) -> &[Vector3<f64>] {
        &self.v2
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Number of Householder iterations of each branch
    pub fn iterations(&self) -> Vec<usize> {
        self.branches.iter().map(|b| b.iterations).collect()
    }

    /// Returns whether every branch converged within the iteration budget
    pub fn converged(&self) -> bool {
        self.branches
            .iter()
            .all(|b| b.convergence == Convergence::Converged)
    }

    pub fn solutions(&self) -> Vec<LambertSolution> {
        (0..self.branches.len()).map(|i| self.solution_at(i)).collect()
    }

    /// The zero revolution solution, which always exists
    pub fn zero_rev(&self) -> LambertSolution {
        self.solution_at(0)
    }

    /// The left and right solutions with `revs` complete revolutions
    pub fn multi_rev(
        &self,
        revs: u32,
    ) -> Result<(LambertSolution, LambertSolution), LambertError> {
        if revs == 0 || revs > self.max_revs {
            return Err(LambertError::RevsNotFeasible {
                revs,
                max_revs: self.max_revs,
            });
        }
        let left = 2 * revs as usize - 1;
        Ok((self.solution_at(left), self.solution_at(left + 1)))
    }

    fn solution_at(&self, idx: usize) -> LambertSolution {
        let branch = &self.branches[idx];
        LambertSolution {
            v_init: self.v1[idx],
            v_final: self.v2[idx],
            revs: branch.revs,
            side: branch.side,
            x: branch.x,
            iterations: branch.iterations,
            convergence: branch.convergence,
        }
    }

    pub fn geometry(&self) -> &TransferGeometry {
        &self.geometry
    }

    pub fn lambda(&self) -> f64 {
        self.geometry.lambda
    }

    /// Time of flight scaled by sqrt(2μ/s³)
    pub fn dimensionless_tof(&self) -> f64 {
        self.t
    }

    /// floor(T / π), before capping by the requested or feasible number of revolutions
    pub fn theoretical_max_revs(&self) -> u32 {
        self.theoretical_max_revs
    }

    /// Number of revolutions actually solved for
    pub fn max_revs(&self) -> u32 {
        self.max_revs
    }

    pub fn tof_s(&self) -> f64 {
        self.tof_s
    }

    pub fn mu_km3_s2(&self) -> f64 {
        self.mu_km3_s2
    }

    pub fn opts(&self) -> &LambertOpts {
        &self.opts
    }

    /// Time of flight in seconds of the transfer defined by x with `revs` revolutions
    pub fn time_of_flight_s(&self, x: f64, revs: u32) -> f64 {
        let t = TimeOfFlight::new(self.geometry.lambda, &self.opts).tof(x, revs);
        t / (2.0 * self.mu_km3_s2 / self.geometry.s.powi(3)).sqrt()
    }
}

/// Reconstructs solution velocity vectors.
/// Returns a tuple of (V_r1, V_r2, V_t1, V_t2).
#[allow(clippy::too_many_arguments)]
pub fn reconstruct(
    x: f64,
    y: f64,
    r1: f64,
    r2: f64,
    ll: f64,
    gamma: f64,
    rho: f64,
    sigma: f64,
) -> (f64, f64, f64, f64) {
    let v_r1 = gamma * ((ll * y - x) - rho * (ll * y + x)) / r1;
    let v_r2 = -gamma * ((ll * y - x) + rho * (ll * y + x)) / r2;
    let v_t1 = gamma * sigma * (y + ll * x) / r1;
    let v_t2 = gamma * sigma * (y + ll * x) / r2;

    (v_r1, v_r2, v_t1, v_t2)
}

/// Calculates the initial guess of x for the requested branch.
///
/// # Arguments
///
/// * `t` - The dimensionless time of flight.
/// * `ll` - The lambda parameter, related to the geometry of the transfer.
/// * `revs` - The number of complete revolutions.
/// * `side` - `Side::Single` is the zero revolution branch and ignores `revs`. There is a single
///   branch without revolutions, so `Left` and `Right` fall back to it when `revs` is zero.
pub fn initial_guess(t: f64, ll: f64, revs: u32, side: Side) -> f64 {
    let revs = f64::from(revs);
    let tmp = match side {
        Side::Single => return zero_rev_guess(t, ll),
        _ if revs == 0.0 => return zero_rev_guess(t, ll),
        Side::Left => ((revs * PI + PI) / (8.0 * t)).powf(2.0 / 3.0),
        Side::Right => ((8.0 * t) / (revs * PI)).powf(2.0 / 3.0),
    };
    (tmp - 1.0) / (tmp + 1.0)
}

/// Zero revolution guess, interpolating between the times of flight at x = 0 (T00) and x = 1 (T1).
fn zero_rev_guess(t: f64, ll: f64) -> f64 {
    let t_00 = ll.acos() + ll * (1.0 - ll.powi(2)).sqrt();
    let t_1 = 2.0 / 3.0 * (1.0 - ll.powi(3));

    if t >= t_00 {
        -(t - t_00) / (t - t_00 + 4.0)
    } else if t <= t_1 {
        t_1 * (t_1 - t) / (2.0 / 5.0 * (1.0 - ll.powi(5)) * t) + 1.0
    } else {
        (t / t_00).powf(2.0f64.ln() / (t_1 / t_00).ln()) - 1.0
    }
}

/// Finds a zero of the time of flight equation using Householder's method.
///
/// Returns the last iterate, the number of iterations, and whether the step fell below `eps`
/// before `max_iter` iterations.
pub fn householder(
    model: &TimeOfFlight,
    t: f64,
    mut x: f64,
    revs: u32,
    eps: f64,
    max_iter: usize,
) -> (f64, usize, Convergence) {
    let mut err = f64::INFINITY;
    let mut it = 0;
    while err > eps && it < max_iter {
        let eval = model.evaluate(x, revs);
        let delta = eval.tof - t;
        let dt2 = eval.dt.powi(2);
        let x_new = x
            - delta * (dt2 - delta * eval.ddt / 2.0)
                / (eval.dt * (dt2 - delta * eval.ddt) + eval.dddt * delta.powi(2) / 6.0);
        err = (x - x_new).abs();
        trace!("Householder #{it} (N = {revs}): x = {x_new:.15}, ΔT = {delta:e}");
        x = x_new;
        it += 1;
    }

    let convergence = if err <= eps {
        Convergence::Converged
    } else {
        Convergence::IterationLimit
    };

    (x, it, convergence)
}

/// Decrements `max_revs` if the minimum time of flight with that many revolutions exceeds `t`.
///
/// The minimum is found with Halley iterations on dT/dx starting from x = 0.
pub fn refine_max_revs(model: &TimeOfFlight, t: f64, max_revs: u32) -> u32 {
    if max_revs == 0 {
        return 0;
    }

    let ll = model.lambda;
    let t_00 = ll.acos() + ll * (1.0 - ll.powi(2)).sqrt();
    let t_0 = t_00 + f64::from(max_revs) * PI;
    if t >= t_0 {
        return max_revs;
    }

    let mut t_min = t_0;
    let mut x_old = 0.0;
    let mut x_new = 0.0;
    for _ in 0..=HALLEY_MAX_ITER {
        let (dt, ddt, dddt) = tof_derivatives(x_old, t_min, ll);
        if dt != 0.0 {
            x_new = x_old - dt * ddt / (ddt.powi(2) - dt * dddt / 2.0);
        }
        if (x_old - x_new).abs() < HALLEY_TOLERANCE {
            break;
        }
        t_min = model.tof(x_new, max_revs);
        x_old = x_new;
    }

    if t_min > t {
        debug!("minimum T with {max_revs} revolution(s) is {t_min} > {t}");
        max_revs - 1
    } else {
        max_revs
    }
}

#[cfg(test)]
mod ut_izzo {
    use super::*;

    #[test]
    fn test_lambert_izzo_shortway() {
        // Test case from Vallado, Example 7-1, p. 462
        let ri = Vector3::new(15945.34, 0.0, 0.0);
        let rf = Vector3::new(12214.83899, 10249.46731, 0.0);
        let tof_s = 76.0 * 60.0;
        let mu_km3_s2 = 3.98600433e5;

        let exp_vi = Vector3::new(2.058913, 2.915965, 0.0);
        let exp_vf = Vector3::new(-3.451565, 0.910315, 0.0);

        let solver = LambertSolver::new(ri, rf, tof_s, mu_km3_s2, Direction::Prograde, 0).unwrap();
        let sol = solver.zero_rev();

        println!("{sol}\t{exp_vi}\t{exp_vf}");

        assert_eq!(solver.velocities1().len(), 1);
        assert_eq!(sol.convergence, Convergence::Converged);
        assert!((sol.v_init - exp_vi).norm() < 1e-5);
        assert!((sol.v_final - exp_vf).norm() < 1e-5);
    }

    #[test]
    fn test_lambert_izzo_longway() {
        // Test case from Vallado, Example 7-1, p. 462
        let ri = Vector3::new(15945.34, 0.0, 0.0);
        let rf = Vector3::new(12214.83899, 10249.46731, 0.0);
        let tof_s = 76.0 * 60.0;
        let mu_km3_s2 = 3.98600433e5;

        let exp_vi = Vector3::new(-3.811158, -2.003854, 0.0);
        let exp_vf = Vector3::new(4.207569, 0.914724, 0.0);

        let solver =
            LambertSolver::new(ri, rf, tof_s, mu_km3_s2, Direction::Retrograde, 0).unwrap();
        let sol = solver.zero_rev();

        assert!((sol.v_init - exp_vi).norm() < 1e-5);
        assert!((sol.v_final - exp_vf).norm() < 1e-5);
    }

    #[test]
    fn zero_rev_guess_regimes() {
        let ll: f64 = 0.3;
        let t_00 = ll.acos() + ll * (1.0 - ll * ll).sqrt();
        let t_1 = 2.0 / 3.0 * (1.0 - ll * ll * ll);
        // Long transfers start on the elliptic side, short ones on the hyperbolic side
        assert!(initial_guess(3.0 * t_00, ll, 0, Side::Single) < 0.0);
        assert!(initial_guess(0.5 * t_1, ll, 0, Side::Single) > 1.0);
        let mid = initial_guess(0.5 * (t_00 + t_1), ll, 0, Side::Single);
        assert!(mid > 0.0 && mid < 1.0);
        // The guesses are continuous at T00 and T1
        assert!(initial_guess(t_00, ll, 0, Side::Single).abs() < 1e-12);
        assert!(initial_guess(t_00 * (1.0 - 1e-12), ll, 0, Side::Single).abs() < 1e-9);
        assert!((initial_guess(t_1, ll, 0, Side::Single) - 1.0).abs() < 1e-12);
        assert!((initial_guess(t_1 * (1.0 + 1e-12), ll, 0, Side::Single) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multi_rev_guesses_straddle_minimum() {
        let t = 12.0;
        let left = initial_guess(t, 0.2, 2, Side::Left);
        let right = initial_guess(t, 0.2, 2, Side::Right);
        assert!(left > -1.0 && left < 1.0);
        assert!(right > -1.0 && right < 1.0);
        assert!(left < right);
        // Right branch guess: ((8T / Nπ)^(2/3) - 1) / ((8T / Nπ)^(2/3) + 1)
        let tmp = (8.0 * t / (2.0 * PI)).powf(2.0 / 3.0);
        assert_eq!(right, (tmp - 1.0) / (tmp + 1.0));
    }

    #[test]
    fn branch_side_dispatch() {
        let t = 12.0;
        let zero_rev = initial_guess(t, 0.2, 0, Side::Single);
        // The single branch is always the zero revolution one
        assert_eq!(initial_guess(t, 0.2, 2, Side::Single), zero_rev);
        assert_ne!(initial_guess(t, 0.2, 2, Side::Right), zero_rev);
        // Without revolutions there is no left or right branch
        assert_eq!(initial_guess(t, 0.2, 0, Side::Left), zero_rev);
        assert_eq!(initial_guess(t, 0.2, 0, Side::Right), zero_rev);
        assert!(zero_rev.is_finite());
    }

    #[test]
    fn householder_budget() {
        let model = TimeOfFlight::new(0.5, &LambertOpts::default());
        let t = model.tof(0.25, 0);
        let (x, it, convergence) = householder(&model, t, -0.5, 0, 1e-12, 15);
        assert_eq!(convergence, Convergence::Converged);
        assert!(it <= 15);
        assert!((x - 0.25).abs() < 1e-10);

        let (_, it, convergence) = householder(&model, t, -0.5, 0, 1e-12, 1);
        assert_eq!(it, 1);
        assert_eq!(convergence, Convergence::IterationLimit);
    }

    #[test]
    fn refinement_drops_unreachable_revolution() {
        let ll = 0.5;
        let model = TimeOfFlight::new(ll, &LambertOpts::default());
        // Locate the minimum time of flight with one revolution by scanning
        let t_min = (0..1999)
            .map(|i| model.tof(-0.999 + 0.001 * f64::from(i), 1))
            .fold(f64::INFINITY, f64::min);
        assert!(t_min > PI);
        // Between π and the minimum: one revolution is not reachable
        let t = 0.5 * (PI + t_min);
        assert_eq!((t / PI).floor() as u32, 1);
        assert_eq!(refine_max_revs(&model, t, 1), 0);
        // Just above the minimum it is
        assert_eq!(refine_max_revs(&model, t_min + 1e-3, 1), 1);
        assert_eq!(refine_max_revs(&model, 0.1, 0), 0);
    }
}

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

use super::options::LambertOpts;

/// Dimensionless time of flight and its first three derivatives with respect to x.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TofEval {
    pub tof: f64,
    pub dt: f64,
    pub ddt: f64,
    pub dddt: f64,
}

/// Time of flight model T(x, N) for a fixed λ.
///
/// Three expressions of the same function are used depending on the distance from x to 1:
/// the Battin series right next to the parabola, the Lagrange expression in a band around it,
/// and Lancaster's expression everywhere else.
#[derive(Copy, Clone, Debug)]
pub struct TimeOfFlight {
    pub lambda: f64,
    pub battin_threshold: f64,
    pub lagrange_threshold: f64,
    pub series_tol: f64,
}

impl TimeOfFlight {
    pub fn new(lambda: f64, opts: &LambertOpts) -> Self {
        Self {
            lambda,
            battin_threshold: opts.battin_threshold,
            lagrange_threshold: opts.lagrange_threshold,
            series_tol: opts.series_tol,
        }
    }

    /// Dimensionless time of flight at x for `revs` complete revolutions.
    pub fn tof(&self, x: f64, revs: u32) -> f64 {
        let dist = (x - 1.0).abs();
        if dist <= self.battin_threshold {
            battin_tof(x, self.lambda, revs, self.series_tol)
        } else if dist < self.lagrange_threshold {
            lagrange_tof(x, self.lambda, revs)
        } else {
            lancaster_tof(x, self.lambda, revs)
        }
    }

    /// Time of flight and its derivatives at x.
    pub fn evaluate(&self, x: f64, revs: u32) -> TofEval {
        let tof = self.tof(x, revs);
        let (dt, ddt, dddt) = tof_derivatives(x, tof, self.lambda);
        TofEval {
            tof,
            dt,
            ddt,
            dddt,
        }
    }
}

/// y = sqrt(1 - λ²(1 - x²))
pub fn compute_y(x: f64, lambda: f64) -> f64 {
    (1.0 - lambda.powi(2) * (1.0 - x.powi(2))).sqrt()
}

/// Derivatives of T with respect to x, using the already computed T at that x.
///
/// Returns (dT/dx, d²T/dx², d³T/dx³). These hold whichever expression produced T.
pub fn tof_derivatives(x: f64, tof: f64, lambda: f64) -> (f64, f64, f64) {
    let l2 = lambda.powi(2);
    let l3 = l2 * lambda;
    let umx2 = 1.0 - x.powi(2);
    let y = compute_y(x, lambda);
    let y3 = y.powi(3);

    let dt = (3.0 * tof * x - 2.0 + 2.0 * l3 * x / y) / umx2;
    let ddt = (3.0 * tof + 5.0 * x * dt + 2.0 * (1.0 - l2) * l3 / y3) / umx2;
    let dddt = (7.0 * x * ddt + 8.0 * dt - 6.0 * (1.0 - l2) * l2 * l3 * x / y3 / y.powi(2)) / umx2;

    (dt, ddt, dddt)
}

/// Lagrange's expression, using the semi-major axis a = 1 / (1 - x²).
pub fn lagrange_tof(x: f64, lambda: f64, revs: u32) -> f64 {
    let a = 1.0 / (1.0 - x.powi(2));
    if a > 0.0 {
        // Ellipse
        let alfa = 2.0 * x.acos();
        let mut beta = 2.0 * (lambda.powi(2) / a).sqrt().asin();
        if lambda < 0.0 {
            beta = -beta;
        }
        a * a.sqrt() * ((alfa - alfa.sin()) - (beta - beta.sin()) + 2.0 * PI * f64::from(revs))
            / 2.0
    } else {
        // Hyperbola
        let alfa = 2.0 * x.acosh();
        let mut beta = 2.0 * (-lambda.powi(2) / a).sqrt().asinh();
        if lambda < 0.0 {
            beta = -beta;
        }
        -a * (-a).sqrt() * ((beta - beta.sinh()) - (alfa - alfa.sinh())) / 2.0
    }
}

/// Battin's series expression, free of the removable singularity at x = 1.
pub fn battin_tof(x: f64, lambda: f64, revs: u32, series_tol: f64) -> f64 {
    let e = x.powi(2) - 1.0;
    let rho = e.abs();
    let z = (1.0 + lambda.powi(2) * e).sqrt();
    let eta = z - lambda * x;
    let s_1 = 0.5 * (1.0 - lambda - x * eta);
    let q = 4.0 / 3.0 * hypergeometric_f(s_1, series_tol);
    let revs_term = if revs == 0 {
        0.0
    } else {
        f64::from(revs) * PI / rho.powf(1.5)
    };
    (eta.powi(3) * q + 4.0 * lambda * eta) / 2.0 + revs_term
}

/// Lancaster's expression, elliptic when x² < 1 and hyperbolic otherwise.
pub fn lancaster_tof(x: f64, lambda: f64, revs: u32) -> f64 {
    let e = x.powi(2) - 1.0;
    let z = (1.0 + lambda.powi(2) * e).sqrt();
    let y = e.abs().sqrt();
    let g = x * z - lambda * e;
    let d = if e < 0.0 {
        f64::from(revs) * PI + g.clamp(-1.0, 1.0).acos()
    } else {
        let f = y * (z - lambda * x);
        (f + g).ln()
    };
    (x - lambda * z - d / y) / e
}

/// Hypergeometric function 2F1(3, 1, 5/2, z), see [Battin], summed until a term drops below `tol`.
///
/// The series only converges for |z| < 1: z ≥ 1 returns infinity and z ≤ -1 (or a NaN) returns NaN.
pub fn hypergeometric_f(z: f64, tol: f64) -> f64 {
    if z >= 1.0 {
        return f64::INFINITY;
    } else if z <= -1.0 || z.is_nan() {
        return f64::NAN;
    }

    let mut sum = 1.0;
    let mut term = 1.0;
    let mut j = 0.0_f64;
    loop {
        term *= (3.0 + j) * (1.0 + j) / (2.5 + j) * z / (j + 1.0);
        sum += term;
        if term.abs() <= tol {
            return sum;
        }
        j += 1.0;
    }
}

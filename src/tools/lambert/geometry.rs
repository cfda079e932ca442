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

use super::{Direction, Vector3, COLLINEAR_TOLERANCE};

/// Geometry of a Lambert transfer: the radial, normal and transverse unit vectors at both ends,
/// the chord, the semi-perimeter, and the signed λ parameter.
///
/// It is computed once per problem and never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferGeometry {
    pub r1: Vector3<f64>,
    pub r2: Vector3<f64>,
    pub r1_norm: f64,
    pub r2_norm: f64,
    /// Chord length between both positions
    pub chord: f64,
    /// Semi-perimeter of the triangle formed by both positions and the central body
    pub s: f64,
    pub i_r1: Vector3<f64>,
    pub i_r2: Vector3<f64>,
    /// Orbit normal (r1 × r2, normalized)
    pub i_h: Vector3<f64>,
    pub i_t1: Vector3<f64>,
    pub i_t2: Vector3<f64>,
    /// λ, where λ² = 1 - c/s and the sign encodes the transfer angle and direction
    pub lambda: f64,
    /// Set when the transfer angle seen from +Z exceeds 180 degrees
    pub long_way: bool,
}

impl TransferGeometry {
    /// Builds the geometry from both positions, failing on zero, non-finite or collinear positions.
    pub fn new(
        r1: Vector3<f64>,
        r2: Vector3<f64>,
        direction: Direction,
    ) -> Result<Self, LambertError> {
        let r1_norm = r1.norm();
        let r2_norm = r2.norm();

        for (which, norm_km) in [("initial", r1_norm), ("final", r2_norm)] {
            if !(norm_km.is_finite() && norm_km > 0.0) {
                return Err(LambertError::DegeneratePosition { which, norm_km });
            }
        }

        let chord = (r2 - r1).norm();
        // Semi parameter
        let s = (r1_norm + r2_norm + chord) * 0.5;

        // Versors
        let i_r1 = r1 / r1_norm;
        let i_r2 = r2 / r2_norm;

        let i_h = i_r1.cross(&i_r2);
        let sin_angle = i_h.norm();
        if sin_angle < COLLINEAR_TOLERANCE {
            return Err(LambertError::CollinearPositions { sin_angle });
        }
        let i_h = i_h / sin_angle;

        let lambda2 = (1.0 - chord / s).max(0.0);
        let mut lambda = lambda2.sqrt();

        let long_way = i_h.z < 0.0;
        let (mut i_t1, mut i_t2) = if long_way {
            // Transfer angle greater than 180 degrees as seen from above the Z axis
            lambda = -lambda;
            (i_r1.cross(&i_h), i_r2.cross(&i_h))
        } else {
            (i_h.cross(&i_r1), i_h.cross(&i_r2))
        };
        // Ensure unit vector
        i_t1 /= i_t1.norm();
        i_t2 /= i_t2.norm();

        if direction == Direction::Retrograde {
            lambda = -lambda;
            i_t1 = -i_t1;
            i_t2 = -i_t2;
        }

        debug!(
            "Lambert geometry: |r1| = {r1_norm} km, |r2| = {r2_norm} km, c = {chord} km, s = {s} km, λ = {lambda} ({direction:?}, long way: {long_way})"
        );

        Ok(Self {
            r1,
            r2,
            r1_norm,
            r2_norm,
            chord,
            s,
            i_r1,
            i_r2,
            i_h,
            i_t1,
            i_t2,
            lambda,
            long_way,
        })
    }

    /// Returns the time of flight scaled by sqrt(2μ/s³)
    pub fn dimensionless_tof(&self, tof_s: f64, mu_km3_s2: f64) -> f64 {
        (2.0 * mu_km3_s2 / self.s.powi(3)).sqrt() * tof_s
    }

    /// Ratio (|r1| - |r2|) / c used in the velocity reconstruction
    pub fn rho(&self) -> f64 {
        (self.r1_norm - self.r2_norm) / self.chord
    }
}

#[cfg(test)]
mod ut_geometry {
    use super::*;

    fn cases() -> Vec<(Vector3<f64>, Vector3<f64>)> {
        vec![
            (
                Vector3::new(15945.34, 0.0, 0.0),
                Vector3::new(12214.83899, 10249.46731, 0.0),
            ),
            (Vector3::new(1.0, 0.0, 0.0), Vector3::new(-0.5, -0.7, 0.1)),
            (
                Vector3::new(-6045.0, 3490.0, 1200.0),
                Vector3::new(12214.8, -10249.4, -2500.0),
            ),
            (Vector3::new(1.0, 0.0, 0.0), Vector3::new(-1.0, 1e-3, 0.0)),
        ]
    }

    #[test]
    fn orthonormal_frame() {
        for direction in [Direction::Prograde, Direction::Retrograde] {
            for (r1, r2) in cases() {
                let geo = TransferGeometry::new(r1, r2, direction).unwrap();
                for unit in [geo.i_r1, geo.i_r2, geo.i_h, geo.i_t1, geo.i_t2] {
                    assert!((unit.norm() - 1.0).abs() < 1e-10);
                }
                assert!(geo.i_r1.dot(&geo.i_h).abs() < 1e-10);
                assert!(geo.i_r2.dot(&geo.i_h).abs() < 1e-10);
                assert!(geo.i_r1.dot(&geo.i_t1).abs() < 1e-10);
                assert!(geo.i_r2.dot(&geo.i_t2).abs() < 1e-10);
                // Transverse vectors stay in the transfer plane
                assert!(geo.i_t1.dot(&geo.i_h).abs() < 1e-10);
                assert!(geo.i_t2.dot(&geo.i_h).abs() < 1e-10);
                assert!(geo.lambda.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn long_way_sign() {
        let r1 = Vector3::new(1.0, 0.0, 0.0);
        let short = TransferGeometry::new(r1, Vector3::new(0.0, 1.0, 0.0), Direction::Prograde)
            .unwrap();
        assert!(!short.long_way);
        assert!(short.lambda > 0.0);

        let long = TransferGeometry::new(r1, Vector3::new(0.0, -1.0, 0.0), Direction::Prograde)
            .unwrap();
        assert!(long.long_way);
        assert!(long.lambda < 0.0);
        assert!((long.lambda + short.lambda).abs() < 1e-15);

        // Prograde motion is counter clockwise seen from +Z
        assert!(long.i_t1.y > 0.0);

        let retro = TransferGeometry::new(r1, Vector3::new(0.0, 1.0, 0.0), Direction::Retrograde)
            .unwrap();
        assert!(retro.lambda < 0.0);
        assert!(retro.i_t1.y < 0.0);
    }

    #[test]
    fn degenerate_inputs() {
        let r1 = Vector3::new(7000.0, 0.0, 0.0);
        assert!(matches!(
            TransferGeometry::new(Vector3::zeros(), r1, Direction::Prograde),
            Err(LambertError::DegeneratePosition { which: "initial", .. })
        ));
        assert!(matches!(
            TransferGeometry::new(r1, Vector3::new(f64::NAN, 0.0, 0.0), Direction::Prograde),
            Err(LambertError::DegeneratePosition { which: "final", .. })
        ));
        assert!(matches!(
            TransferGeometry::new(r1, 2.0 * r1, Direction::Prograde),
            Err(LambertError::CollinearPositions { .. })
        ));
        assert!(matches!(
            TransferGeometry::new(r1, -r1, Direction::Prograde),
            Err(LambertError::CollinearPositions { .. })
        ));
    }
}

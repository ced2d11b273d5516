//! Range-stage path length and direction estimators.

use log::warn;
use muonfit_core::{
    AngleSource, EnergyConfig, GeometryError, PaddleHit, RangeLengthMethod, TrackStub, Vector3,
};
use nalgebra::{Matrix3, SymmetricEigen};

/// Channels below this id belong to the front veto and carry no track information.
pub const VETO_CHANNEL_LIMIT: u32 = 26;

/// `|cos|` below this is treated as a track perpendicular to the beam.
const COS_EPSILON: f64 = 1e-9;

/// Estimates the range-stage path length of a track.
pub trait RangeTrackEstimator: Send + Sync {
    /// Path length (cm) given the angle (rad) chosen for this run.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] when the track geometry does not allow an
    /// estimate.
    fn length(&self, track: &TrackStub, angle: f64) -> Result<f64, GeometryError>;

    /// Returns the name of the estimator.
    fn name(&self) -> &'static str;
}

/// `|stop - start|` of the fitted stub.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubEndpoints;

impl RangeTrackEstimator for StubEndpoints {
    fn length(&self, track: &TrackStub, _angle: f64) -> Result<f64, GeometryError> {
        Ok(track.endpoint_length())
    }

    fn name(&self) -> &'static str {
        "stub-endpoints"
    }
}

/// Sum of distances between consecutive hit paddles in channel order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectTheDots;

impl RangeTrackEstimator for ConnectTheDots {
    fn length(&self, track: &TrackStub, _angle: f64) -> Result<f64, GeometryError> {
        Ok(connect_the_dots(&track.paddle_hits))
    }

    fn name(&self) -> &'static str {
        "connect-the-dots"
    }
}

/// Layers crossed times layer thickness, corrected for the track angle.
#[derive(Debug, Clone, Copy)]
pub struct LayerCount {
    /// Absorber layer thickness (cm).
    pub thickness: f64,
}

impl Default for LayerCount {
    fn default() -> Self {
        Self { thickness: 5.0 }
    }
}

impl RangeTrackEstimator for LayerCount {
    fn length(&self, track: &TrackStub, angle: f64) -> Result<f64, GeometryError> {
        layer_count_length(track.layers_hit, self.thickness, angle)
    }

    fn name(&self) -> &'static str {
        "layer-count"
    }
}

/// Builds the estimator for a configured method.
#[must_use]
pub fn estimator_for(method: RangeLengthMethod, config: &EnergyConfig) -> Box<dyn RangeTrackEstimator> {
    match method {
        RangeLengthMethod::StubEndpoints => Box::new(StubEndpoints),
        RangeLengthMethod::ConnectTheDots => Box::new(ConnectTheDots),
        RangeLengthMethod::LayerCount => Box::new(LayerCount {
            thickness: config.layer_thickness,
        }),
    }
}

/// Sorts hits by channel and sums consecutive distances, ignoring veto channels.
///
/// Returns 0 for fewer than two hits.
#[must_use]
pub fn connect_the_dots(hits: &[PaddleHit]) -> f64 {
    let mut sorted: Vec<&PaddleHit> = hits
        .iter()
        .filter(|hit| hit.channel_id >= VETO_CHANNEL_LIMIT)
        .collect();
    sorted.sort_by_key(|hit| hit.channel_id);
    sorted
        .windows(2)
        .map(|pair| pair[0].position.distance(&pair[1].position))
        .sum()
}

/// `thickness * (layers + 0.5) / |cos(angle)|`.
///
/// # Errors
/// Returns [`GeometryError::PerpendicularTrack`] when `cos(angle)` is zero.
pub fn layer_count_length(layers_hit: u32, thickness: f64, angle: f64) -> Result<f64, GeometryError> {
    let cos = angle.cos().abs();
    if cos < COS_EPSILON {
        return Err(GeometryError::PerpendicularTrack { angle_rad: angle });
    }
    Ok(thickness * (f64::from(layers_hit) + 0.5) / cos)
}

/// Rescales a layer-count length for multiple scattering.
///
/// `initial_loss` is the first range-stage energy estimate, before any
/// integration.
#[must_use]
pub fn scattering_rescale(length: f64, initial_loss: f64, config: &EnergyConfig) -> f64 {
    if initial_loss >= config.scatter_threshold {
        length / config.scatter_factor_high
    } else {
        length / config.scatter_factor_low
    }
}

/// Principal direction of a point cloud, oriented along +z.
///
/// Uses the eigenvector of the largest eigenvalue of the unbiased covariance.
///
/// # Errors
/// Returns [`GeometryError::TooFewPoints`] for fewer than two points and
/// [`GeometryError::ZeroDirection`] when all points coincide.
pub fn principal_direction(points: &[Vector3]) -> Result<Vector3, GeometryError> {
    if points.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            required: 2,
            got: points.len(),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let mean = points.iter().fold(Vector3::zero(), |acc, p| acc + *p) * (1.0 / n);

    let mut covariance = Matrix3::<f64>::zeros();
    for p in points {
        let d = *p - mean;
        let d = [d.x, d.y, d.z];
        for i in 0..3 {
            for j in 0..3 {
                covariance[(i, j)] += d[i] * d[j];
            }
        }
    }
    covariance /= n - 1.0;

    // nalgebra does not order eigenvalues
    let eigen = SymmetricEigen::new(covariance);
    let (index, largest) = eigen
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    if !(largest.is_finite() && largest > 0.0) {
        return Err(GeometryError::ZeroDirection);
    }

    let column = eigen.eigenvectors.column(index);
    let direction = Vector3::new(column[0], column[1], column[2])
        .unit()
        .ok_or(GeometryError::ZeroDirection)?;
    Ok(if direction.z < 0.0 { -direction } else { direction })
}

/// Track angle for the configured source, falling back to the stub angle.
#[must_use]
pub fn resolve_angle(track: &TrackStub, source: AngleSource) -> f64 {
    match source {
        AngleSource::Stub => track.angle,
        AngleSource::PrincipalDirection => {
            let points: Vec<Vector3> = track
                .paddle_hits
                .iter()
                .filter(|hit| hit.channel_id >= VETO_CHANNEL_LIMIT)
                .map(|hit| hit.position)
                .collect();
            match principal_direction(&points) {
                Ok(direction) => direction.angle_to(&Vector3::BEAM_AXIS),
                Err(err) => {
                    warn!("principal-direction fit failed ({err}), using stub angle");
                    track.angle
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn colinear_hits() -> Vec<PaddleHit> {
        (0..4)
            .map(|i| PaddleHit::new(30 + i, Vector3::new(0.0, 0.0, 10.0 * f64::from(i))))
            .collect()
    }

    #[test]
    fn test_connect_the_dots_order_invariant() {
        let hits = colinear_hits();
        assert_relative_eq!(connect_the_dots(&hits), 30.0);
        let mut reversed = hits.clone();
        reversed.reverse();
        assert_relative_eq!(connect_the_dots(&reversed), 30.0);
        reversed.swap(0, 2);
        assert_relative_eq!(connect_the_dots(&reversed), 30.0);
    }

    #[test]
    fn test_connect_the_dots_small_inputs() {
        assert_eq!(connect_the_dots(&[]), 0.0);
        assert_eq!(connect_the_dots(&colinear_hits()[..1]), 0.0);
    }

    #[test]
    fn test_connect_the_dots_ignores_veto() {
        let mut hits = colinear_hits();
        hits.push(PaddleHit::new(3, Vector3::new(500.0, 0.0, -300.0)));
        assert_relative_eq!(connect_the_dots(&hits), 30.0);
    }

    #[test]
    fn test_principal_direction_colinear() {
        let dir = Vector3::new(1.0, 0.5, 2.0).unit().unwrap();
        let mut points: Vec<Vector3> = (0..5).map(|i| dir * (7.0 * f64::from(i))).collect();
        let fitted = principal_direction(&points).unwrap();
        assert_relative_eq!(fitted.dot(&dir), 1.0, epsilon = 1e-9);

        points.reverse();
        points.push(points[1]);
        let refitted = principal_direction(&points).unwrap();
        assert_relative_eq!(refitted.dot(&dir), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_principal_direction_points_downstream() {
        let points = [Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 3.0, 0.0)];
        let fitted = principal_direction(&points).unwrap();
        assert!(fitted.z > 0.0);
    }

    #[test]
    fn test_principal_direction_degenerate() {
        assert_eq!(
            principal_direction(&[Vector3::zero()]),
            Err(GeometryError::TooFewPoints { required: 2, got: 1 })
        );
        let same = [Vector3::new(1.0, 1.0, 1.0); 3];
        assert_eq!(principal_direction(&same), Err(GeometryError::ZeroDirection));
    }

    #[test]
    fn test_layer_count() {
        assert_relative_eq!(layer_count_length(4, 5.0, 0.0).unwrap(), 22.5);
        assert_relative_eq!(
            layer_count_length(4, 5.0, std::f64::consts::FRAC_PI_3).unwrap(),
            45.0,
            epsilon = 1e-9
        );
        assert!(layer_count_length(4, 5.0, std::f64::consts::FRAC_PI_2).is_err());
    }

    #[test]
    fn test_scattering_rescale_uses_threshold() {
        let config = EnergyConfig::default();
        assert_relative_eq!(scattering_rescale(95.0, 400.0, &config), 100.0);
        assert_relative_eq!(scattering_rescale(80.0, 399.9, &config), 100.0);
    }

    #[test]
    fn test_resolve_angle_falls_back() {
        let track = TrackStub {
            angle: 0.3,
            ..TrackStub::default()
        };
        assert_relative_eq!(resolve_angle(&track, AngleSource::PrincipalDirection), 0.3);

        let slanted = TrackStub {
            angle: 0.3,
            paddle_hits: vec![
                PaddleHit::new(40, Vector3::new(0.0, 0.0, 0.0)),
                PaddleHit::new(41, Vector3::new(10.0, 0.0, 10.0)),
            ],
            ..TrackStub::default()
        };
        assert_relative_eq!(
            resolve_angle(&slanted, AngleSource::PrincipalDirection),
            std::f64::consts::FRAC_PI_4,
            epsilon = 1e-9
        );
        assert_relative_eq!(resolve_angle(&slanted, AngleSource::Stub), 0.3);
    }

    #[test]
    fn test_estimators() {
        let track = TrackStub::from_endpoints(Vector3::zero(), Vector3::new(0.0, 0.0, 40.0))
            .with_layers_hit(3)
            .with_paddle_hits(colinear_hits());
        let config = EnergyConfig::default();
        let lengths: Vec<f64> = [
            RangeLengthMethod::StubEndpoints,
            RangeLengthMethod::ConnectTheDots,
            RangeLengthMethod::LayerCount,
        ]
        .into_iter()
        .map(|m| estimator_for(m, &config).length(&track, 0.0).unwrap())
        .collect();
        assert_relative_eq!(lengths[0], 40.0);
        assert_relative_eq!(lengths[1], 30.0);
        assert_relative_eq!(lengths[2], 17.5);
        assert_eq!(estimator_for(RangeLengthMethod::LayerCount, &config).name(), "layer-count");
    }
}

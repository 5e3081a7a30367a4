//! Terminal state sampling for the state lattice
//!
//! Three strategies produce the target poses the planner optimizes towards:
//! uniform polar, polar biased toward a goal direction, and lateral offsets
//! across a lane.

use std::f64::consts::PI;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::common::{PlannerError, PlannerResult, Pose2D};

/// Polar sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarSamplingConfig {
    /// Number of position (angle) samples
    #[serde(default = "default_nxy")]
    pub nxy: usize,
    /// Number of heading samples per position
    #[serde(default = "default_nh")]
    pub nh: usize,
    /// Distance of the terminal states [m]
    #[serde(default = "default_d")]
    pub d: f64,
    /// Position sampling min angle [rad]
    #[serde(default = "default_a_min")]
    pub a_min: f64,
    /// Position sampling max angle [rad]
    #[serde(default = "default_a_max")]
    pub a_max: f64,
    /// Heading offset min [rad]
    #[serde(default = "default_p_min")]
    pub p_min: f64,
    /// Heading offset max [rad]
    #[serde(default = "default_p_max")]
    pub p_max: f64,
}

fn default_nxy() -> usize {
    5
}
fn default_nh() -> usize {
    3
}
fn default_d() -> f64 {
    20.0
}
fn default_a_min() -> f64 {
    -45.0_f64.to_radians()
}
fn default_a_max() -> f64 {
    45.0_f64.to_radians()
}
fn default_p_min() -> f64 {
    -45.0_f64.to_radians()
}
fn default_p_max() -> f64 {
    45.0_f64.to_radians()
}

impl Default for PolarSamplingConfig {
    fn default() -> Self {
        Self {
            nxy: default_nxy(),
            nh: default_nh(),
            d: default_d(),
            a_min: default_a_min(),
            a_max: default_a_max(),
            p_min: default_p_min(),
            p_max: default_p_max(),
        }
    }
}

impl PolarSamplingConfig {
    pub fn validate(&self) -> PlannerResult<()> {
        check_count("nxy", self.nxy)?;
        check_count("nh", self.nh)?;
        check_finite("d", self.d)?;
        check_finite("a_min", self.a_min)?;
        check_finite("a_max", self.a_max)?;
        check_finite("p_min", self.p_min)?;
        check_finite("p_max", self.p_max)
    }
}

/// Goal-biased polar sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasedSamplingConfig {
    /// Resolution of the navigation cost sampling
    #[serde(default = "default_ns")]
    pub ns: usize,
    #[serde(default = "default_biased_polar")]
    pub polar: PolarSamplingConfig,
}

fn default_ns() -> usize {
    100
}
fn default_biased_polar() -> PolarSamplingConfig {
    PolarSamplingConfig {
        nxy: 30,
        nh: 2,
        p_min: -20.0_f64.to_radians(),
        p_max: 20.0_f64.to_radians(),
        ..PolarSamplingConfig::default()
    }
}

impl Default for BiasedSamplingConfig {
    fn default() -> Self {
        Self {
            ns: default_ns(),
            polar: default_biased_polar(),
        }
    }
}

impl BiasedSamplingConfig {
    pub fn validate(&self) -> PlannerResult<()> {
        if self.ns < 2 {
            return Err(PlannerError::BadSamplingParameters(format!(
                "ns must be at least 2, got {}",
                self.ns
            )));
        }
        self.polar.validate()
    }
}

/// Lane sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSamplingConfig {
    /// Lateral position of the lane center [m]
    #[serde(default)]
    pub l_center: f64,
    /// Lane heading [rad]
    #[serde(default)]
    pub l_heading: f64,
    /// Lane width [m]
    #[serde(default = "default_lane_width")]
    pub l_width: f64,
    /// Vehicle width [m]
    #[serde(default = "default_vehicle_width")]
    pub v_width: f64,
    /// Longitudinal distance along the lane [m]
    #[serde(default = "default_d")]
    pub d: f64,
    /// Number of lateral samples
    #[serde(default = "default_nxy")]
    pub nxy: usize,
}

fn default_lane_width() -> f64 {
    3.0
}
fn default_vehicle_width() -> f64 {
    1.0
}

impl Default for LaneSamplingConfig {
    fn default() -> Self {
        Self {
            l_center: 0.0,
            l_heading: 0.0,
            l_width: default_lane_width(),
            v_width: default_vehicle_width(),
            d: default_d(),
            nxy: default_nxy(),
        }
    }
}

impl LaneSamplingConfig {
    pub fn validate(&self) -> PlannerResult<()> {
        check_count("nxy", self.nxy)?;
        check_finite("l_center", self.l_center)?;
        check_finite("l_heading", self.l_heading)?;
        check_finite("l_width", self.l_width)?;
        check_finite("v_width", self.v_width)?;
        check_finite("d", self.d)?;
        if self.v_width > self.l_width {
            return Err(PlannerError::BadSamplingParameters(format!(
                "vehicle width {} exceeds lane width {}",
                self.v_width, self.l_width
            )));
        }
        Ok(())
    }
}

fn check_count(name: &str, value: usize) -> PlannerResult<()> {
    if value == 0 {
        return Err(PlannerError::BadSamplingParameters(format!(
            "{} must be at least 1",
            name
        )));
    }
    Ok(())
}

fn check_finite(name: &str, value: f64) -> PlannerResult<()> {
    if !value.is_finite() {
        return Err(PlannerError::BadSamplingParameters(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    Ok(())
}

/// `n` evenly spaced fractions over [0, 1]; a single sample sits at 0.5
fn even_fractions(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![0.5];
    }
    (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
}

/// Uniformly distributed terminal states in polar coordinates
pub fn calc_uniform_polar_states(config: &PolarSamplingConfig) -> PlannerResult<Vec<Pose2D>> {
    config.validate()?;
    Ok(sample_states(&even_fractions(config.nxy), config))
}

/// Polar terminal states concentrated around `goal_angle`
///
/// Candidate angles get the navigation cost `pi - |angle - goal_angle|`,
/// inverted so near-goal angles carry little weight. The cumulative weight
/// then stays flat around the goal, and reading it at evenly spaced positions
/// packs the samples there.
pub fn calc_biased_polar_states(
    goal_angle: f64,
    config: &BiasedSamplingConfig,
) -> PlannerResult<Vec<Pose2D>> {
    config.validate()?;
    check_finite("goal_angle", goal_angle)?;

    let polar = &config.polar;
    let ns = config.ns;
    let candidates = ns - 1;

    let cnav: Vec<f64> = (0..candidates)
        .map(|i| polar.a_min + (polar.a_max - polar.a_min) * i as f64 / candidates as f64)
        .map(|angle| PI - (angle - goal_angle).abs())
        .collect();
    let cnav_sum: f64 = cnav.iter().sum();
    let cnav_max = cnav.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let normalizer = cnav_max * ns as f64 - cnav_sum;
    if !(normalizer.is_finite() && normalizer > 0.0) {
        return Err(PlannerError::BadSamplingParameters(format!(
            "goal angle {} gives a degenerate navigation cost",
            goal_angle
        )));
    }

    let cumulative: Vec<f64> = cnav
        .iter()
        .scan(0.0, |acc, c| {
            *acc += (cnav_max - c) / normalizer;
            Some(*acc)
        })
        .collect();

    let mut fractions = Vec::with_capacity(polar.nxy);
    let mut start = 0;
    for position in even_fractions(polar.nxy) {
        let hit = (start..candidates).find(|&ii| ii as f64 / ns as f64 >= position);
        match hit {
            Some(ii) => {
                fractions.push(cumulative[ii]);
                start = ii.saturating_sub(1);
            }
            // The last positions can lie past every candidate
            None => fractions.push(cumulative[candidates - 1]),
        }
    }

    Ok(sample_states(&fractions, polar))
}

/// Terminal states spread across the free width of a lane
///
/// The lane center sits at `d` along the heading with `l_center` mixed in
/// as `(cos h * d + sin h * l_center, sin h * d + cos h * l_center)`.
/// Offsets run along the lane normal `(-sin h, cos h)`; every state points
/// along the lane.
pub fn calc_lane_states(config: &LaneSamplingConfig) -> PlannerResult<Vec<Pose2D>> {
    config.validate()?;

    let free_width = config.l_width - config.v_width;
    let (sin_h, cos_h) = config.l_heading.sin_cos();
    let xc = cos_h * config.d + sin_h * config.l_center;
    let yc = sin_h * config.d + cos_h * config.l_center;

    let states = even_fractions(config.nxy)
        .into_iter()
        .map(|f| {
            let offset = if config.nxy == 1 {
                0.0
            } else {
                -0.5 * free_width + free_width * f
            };
            Pose2D::new(xc - offset * sin_h, yc + offset * cos_h, config.l_heading)
        })
        .collect();

    Ok(states)
}

/// Expand angle fractions into positions at distance `d`, each with `nh`
/// heading offsets
fn sample_states(angle_fractions: &[f64], config: &PolarSamplingConfig) -> Vec<Pose2D> {
    let heading_offsets: Vec<f64> = even_fractions(config.nh)
        .into_iter()
        .map(|f| config.p_min + (config.p_max - config.p_min) * f)
        .collect();

    angle_fractions
        .iter()
        .map(|f| config.a_min + (config.a_max - config.a_min) * f)
        .cartesian_product(heading_offsets.iter())
        .map(|(a, offset)| Pose2D::new(config.d * a.cos(), config.d * a.sin(), a + offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_even_fractions() {
        assert_eq!(even_fractions(1), vec![0.5]);
        assert_eq!(even_fractions(3), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_uniform_polar_count() {
        let config = PolarSamplingConfig {
            nxy: 5,
            nh: 3,
            ..PolarSamplingConfig::default()
        };
        let states = calc_uniform_polar_states(&config).unwrap();
        assert_eq!(states.len(), 15);

        for state in &states {
            assert_abs_diff_eq!(state.range(), config.d, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_uniform_polar_layout() {
        let config = PolarSamplingConfig::default();
        let states = calc_uniform_polar_states(&config).unwrap();

        // First position at a_min with headings a_min + p_min..p_max
        let first = states[0];
        assert_abs_diff_eq!(first.y.atan2(first.x), config.a_min, epsilon = 1e-12);
        assert_abs_diff_eq!(first.yaw, config.a_min + config.p_min, epsilon = 1e-12);
        assert_abs_diff_eq!(states[2].yaw, config.a_min + config.p_max, epsilon = 1e-12);

        let last = states[states.len() - 1];
        assert_abs_diff_eq!(last.y.atan2(last.x), config.a_max, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_polar_single_samples_use_midpoints() {
        let config = PolarSamplingConfig {
            nxy: 1,
            nh: 1,
            a_min: 0.0,
            a_max: 0.4,
            p_min: 0.1,
            p_max: 0.3,
            ..PolarSamplingConfig::default()
        };
        let states = calc_uniform_polar_states(&config).unwrap();
        assert_eq!(states.len(), 1);
        assert_abs_diff_eq!(states[0].y.atan2(states[0].x), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(states[0].yaw, 0.2 + 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_polar_rejects_zero_counts() {
        let config = PolarSamplingConfig {
            nxy: 0,
            ..PolarSamplingConfig::default()
        };
        assert!(matches!(
            calc_uniform_polar_states(&config),
            Err(PlannerError::BadSamplingParameters(_))
        ));

        let config = PolarSamplingConfig {
            nh: 0,
            ..PolarSamplingConfig::default()
        };
        assert!(calc_uniform_polar_states(&config).is_err());
    }

    #[test]
    fn test_uniform_polar_wraps_heading() {
        let config = PolarSamplingConfig {
            a_min: 170.0_f64.to_radians(),
            a_max: 180.0_f64.to_radians(),
            p_min: 0.0,
            p_max: 90.0_f64.to_radians(),
            ..PolarSamplingConfig::default()
        };
        let states = calc_uniform_polar_states(&config).unwrap();
        assert!(states.iter().all(|s| s.yaw > -PI && s.yaw <= PI));
    }

    #[test]
    fn test_biased_polar_count() {
        let config = BiasedSamplingConfig {
            ns: 100,
            polar: PolarSamplingConfig {
                nxy: 30,
                nh: 2,
                ..default_biased_polar()
            },
        };
        let states = calc_biased_polar_states(0.0, &config).unwrap();
        assert_eq!(states.len(), 60);
    }

    #[test]
    fn test_biased_polar_concentrates_near_goal() {
        let biased = BiasedSamplingConfig {
            ns: 100,
            polar: PolarSamplingConfig {
                nh: 1,
                ..default_biased_polar()
            },
        };
        let uniform = biased.polar.clone();
        let window = 15.0_f64.to_radians();

        let near_goal = |states: &[Pose2D]| {
            states
                .iter()
                .filter(|s| s.y.atan2(s.x).abs() < window)
                .count()
        };

        let biased_states = calc_biased_polar_states(0.0, &biased).unwrap();
        let uniform_states = calc_uniform_polar_states(&uniform).unwrap();
        assert_eq!(biased_states.len(), uniform_states.len());
        assert!(near_goal(&biased_states) > near_goal(&uniform_states));

        // Every sample stays inside the angular range
        for state in &biased_states {
            let angle = state.y.atan2(state.x);
            assert!(angle >= biased.polar.a_min - 1e-9 && angle <= biased.polar.a_max + 1e-9);
        }
    }

    #[test]
    fn test_biased_polar_rejects_bad_parameters() {
        let config = BiasedSamplingConfig {
            ns: 1,
            ..BiasedSamplingConfig::default()
        };
        assert!(matches!(
            calc_biased_polar_states(0.0, &config),
            Err(PlannerError::BadSamplingParameters(_))
        ));

        let config = BiasedSamplingConfig::default();
        assert!(calc_biased_polar_states(f64::NAN, &config).is_err());
    }

    #[test]
    fn test_lane_states_count_and_heading() {
        let config = LaneSamplingConfig {
            l_center: 10.0,
            l_heading: 90.0_f64.to_radians(),
            l_width: 3.0,
            v_width: 1.0,
            d: 10.0,
            nxy: 5,
        };
        let states = calc_lane_states(&config).unwrap();

        assert_eq!(states.len(), 5);
        for state in &states {
            assert_abs_diff_eq!(state.yaw, config.l_heading, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lane_states_ahead_of_vehicle_when_turned() {
        let config = LaneSamplingConfig {
            l_center: 10.0,
            l_heading: 90.0_f64.to_radians(),
            l_width: 3.0,
            v_width: 1.0,
            d: 10.0,
            nxy: 5,
        };
        let states = calc_lane_states(&config).unwrap();

        let expected = [11.0, 10.5, 10.0, 9.5, 9.0];
        for (state, x) in states.iter().zip(&expected) {
            assert_abs_diff_eq!(state.x, *x, epsilon = 1e-9);
        }
        for state in &states {
            assert_abs_diff_eq!(state.y, 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_lane_states_span_free_width() {
        let config = LaneSamplingConfig::default();
        let states = calc_lane_states(&config).unwrap();

        // Heading 0: x is the distance, y the lateral offset
        assert_abs_diff_eq!(states[0].x, config.d, epsilon = 1e-12);
        assert_abs_diff_eq!(states[0].y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(states[2].y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(states[4].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lane_states_single_sample_on_center() {
        let config = LaneSamplingConfig {
            l_center: 2.0,
            nxy: 1,
            ..LaneSamplingConfig::default()
        };
        let states = calc_lane_states(&config).unwrap();
        assert_eq!(states.len(), 1);
        assert_abs_diff_eq!(states[0].y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lane_states_reject_narrow_lane() {
        let config = LaneSamplingConfig {
            l_width: 1.0,
            v_width: 2.0,
            ..LaneSamplingConfig::default()
        };
        assert!(matches!(
            calc_lane_states(&config),
            Err(PlannerError::BadSamplingParameters(_))
        ));
    }
}

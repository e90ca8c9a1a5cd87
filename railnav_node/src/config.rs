// railnav_node/src/config.rs

//! Node configuration: defaults, then an optional TOML file, then
//! `RAILNAV_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `RAILNAV_NODE__TIMESTAMPS=frame`).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use railnav_core::estimation::filters::inertial::InertialConfig;
use railnav_core::estimation::filters::kalman::KalmanConfig;
use railnav_core::estimation::{EstimatorConfig, MotionStrategyConfig};
use railnav_core::fleet::FleetConfig;
use railnav_core::speed::StabilizerConfig;
use railnav_core::track::TrackConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Strategy;
use crate::lidar::LidarGateConfig;

pub const ENV_PREFIX: &str = "RAILNAV_";
pub const DEFAULT_LOG_FILTER: &str = "info,railnav_core=info,railnav_node=info";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
}

/// Which clock timestamps the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// Monotonic arrival time at this node.
    #[default]
    Arrival,
    /// The `t` field recorded in each frame (replaying a log).
    Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSettings {
    pub timestamps: TimestampSource,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            timestamps: TimestampSource::Arrival,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub estimator: EstimatorConfig,
    pub track: TrackConfig,
    pub stabilizer: StabilizerConfig,
    pub lidar: LidarGateConfig,
    pub node: NodeSettings,
}

impl NodeConfig {
    /// The provider chain, without extracting it.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        if let Some(path) = path {
            // Toml::file silently skips missing files.
            if !path.is_file() {
                return Err(ConfigLoadError::MissingFile(path.to_path_buf()));
            }
        }
        Ok(Self::figment(path).extract()?)
    }

    /// Replaces the motion strategy unless the configured one already
    /// matches, in which case its tuning is kept.
    pub fn apply_strategy(&mut self, strategy: Strategy) {
        let unchanged = matches!(
            (strategy, &self.estimator.motion),
            (Strategy::Integrator, MotionStrategyConfig::Integrator(_))
                | (Strategy::Kalman, MotionStrategyConfig::Kalman(_))
        );
        if unchanged {
            return;
        }
        self.estimator.motion = match strategy {
            Strategy::Integrator => MotionStrategyConfig::Integrator(InertialConfig::default()),
            Strategy::Kalman => MotionStrategyConfig::Kalman(KalmanConfig::default()),
        };
    }

    pub fn fleet(&self) -> FleetConfig {
        FleetConfig {
            estimator: self.estimator.clone(),
            track: self.track.clone(),
            stabilizer: self.stabilizer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use railnav_core::track::TrackSection;
    use railnav_core::utils::integrators::IntegrationScheme;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = NodeConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config, NodeConfig::default());
            assert_eq!(config.track.sections.len(), 9);
            assert_eq!(config.node.timestamps, TimestampSource::Arrival);
            Ok(())
        });
    }

    #[test]
    fn toml_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "railnav.toml",
                r#"
                [estimator.orientation]
                gyro_weight = 0.97
                gyro_unit = "radians"

                [estimator.motion]
                type = "integrator"
                scheme = "runge_kutta4"
                max_speed = 3.0

                [track]
                sections = [[5, 0], [40, 4]]
                tolerance = 0.25

                [node]
                timestamps = "arrival"
                "#,
            )?;
            jail.set_env("RAILNAV_NODE__TIMESTAMPS", "frame");
            jail.set_env("RAILNAV_STABILIZER__WINDOW", "8");

            let config =
                NodeConfig::load(Some(Path::new("railnav.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.estimator.orientation.gyro_weight, 0.97);
            match &config.estimator.motion {
                MotionStrategyConfig::Integrator(inertial) => {
                    assert_eq!(inertial.scheme, IntegrationScheme::RungeKutta4);
                    assert_eq!(inertial.max_speed, Some(3.0));
                    assert_eq!(inertial.damping, 0.9);
                }
                other => panic!("unexpected strategy {other:?}"),
            }
            assert_eq!(
                config.track.sections,
                vec![TrackSection::new(5.0, 0.0), TrackSection::new(40.0, 4.0)]
            );
            assert_eq!(config.track.tolerance, 0.25);
            assert_eq!(config.node.timestamps, TimestampSource::Frame);
            assert_eq!(config.stabilizer.window, 8);
            assert_eq!(config.stabilizer.alpha, 0.2);
            Ok(())
        });
    }

    #[test]
    fn kalman_section_is_parsed() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "kalman.toml",
                r#"
                [estimator.motion]
                type = "kalman"
                measurement_noise = 0.5
                "#,
            )?;
            let config =
                NodeConfig::load(Some(Path::new("kalman.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(
                config.estimator.motion,
                MotionStrategyConfig::Kalman(KalmanConfig {
                    measurement_noise: 0.5,
                    ..Default::default()
                })
            );
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[stabilizer]\nwindw = 3\n")?;
            assert!(matches!(
                NodeConfig::load(Some(Path::new("bad.toml"))),
                Err(ConfigLoadError::Invalid(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        Jail::expect_with(|_jail| {
            assert!(matches!(
                NodeConfig::load(Some(Path::new("nope.toml"))),
                Err(ConfigLoadError::MissingFile(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn strategy_override_keeps_matching_tuning() {
        let mut config = NodeConfig::default();
        config.estimator.motion = MotionStrategyConfig::Kalman(KalmanConfig {
            process_noise: 0.5,
            ..Default::default()
        });
        config.apply_strategy(Strategy::Kalman);
        assert!(matches!(
            &config.estimator.motion,
            MotionStrategyConfig::Kalman(k) if k.process_noise == 0.5
        ));
        config.apply_strategy(Strategy::Integrator);
        assert_eq!(config.estimator.motion, MotionStrategyConfig::default());
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/railnav.toml");
        let config = Figment::new()
            .merge(Toml::file(&path))
            .extract::<NodeConfig>()
            .unwrap();
        assert!(config.estimator.validation.is_some());
        assert!(matches!(
            &config.estimator.motion,
            MotionStrategyConfig::Integrator(inertial) if inertial.calibration.is_some()
        ));
        assert_eq!(config.track, TrackConfig::default());
    }

    #[test]
    fn effective_config_dumps_as_toml() {
        let text = toml::to_string_pretty(&NodeConfig::default()).unwrap();
        assert!(text.contains("type = \"integrator\""));
        let parsed: NodeConfig = Figment::new()
            .merge(Toml::string(&text))
            .extract()
            .unwrap();
        assert_eq!(parsed, NodeConfig::default());
    }
}

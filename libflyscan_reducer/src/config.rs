use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::*;
use super::error::ConfigError;
use super::range_mask::MaskWindow;
use super::rebin::RebinSettings;
use super::reduction::ReductionParameters;

const RAW_EXTENSION: &str = "h5";
const REDUCED_SUFFIX: &str = "_reduced";

/// Structure representing the application configuration. Contains pathing and reduction information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    /// Raw file names within raw_path; if empty every .h5 file in raw_path is reduced
    pub raw_files: Vec<String>,
    pub output_path: PathBuf,
    /// If set, every scan is written as its own NXdata group in this one file within
    /// output_path, instead of one reduced file per raw file
    #[serde(default)]
    pub combined_output: Option<String>,
    pub entry_name: String,
    pub number_of_bins: usize,
    pub q_floor: Option<f64>,
    pub q_ceiling: Option<f64>,
    pub q_resolution_floor: f64,
    pub centroid: Option<f64>,
    pub time_before_range_change: f64,
    pub time_after_range_change: f64,
    pub n_threads: i32,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("None"),
            raw_files: vec![],
            output_path: PathBuf::from("None"),
            combined_output: None,
            entry_name: String::from("flyScan"),
            number_of_bins: DEFAULT_NUMBER_OF_BINS,
            q_floor: Some(DEFAULT_Q_FLOOR),
            q_ceiling: Some(DEFAULT_Q_CEILING),
            q_resolution_floor: DEFAULT_Q_RESOLUTION_FLOOR,
            centroid: None,
            time_before_range_change: DEFAULT_TIME_BEFORE_RANGE_CHANGE,
            time_after_range_change: DEFAULT_TIME_AFTER_RANGE_CHANGE,
            n_threads: 1,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check the numeric settings. Paths are checked when they are used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_n_threads_valid() {
            return Err(ConfigError::InvalidValue {
                field: "n_threads",
                reason: format!("{} is less than 1", self.n_threads),
            });
        }
        if self.number_of_bins < 2 {
            return Err(ConfigError::InvalidValue {
                field: "number_of_bins",
                reason: format!("{} is less than 2", self.number_of_bins),
            });
        }
        for (field, value) in [("q_floor", self.q_floor), ("q_ceiling", self.q_ceiling)] {
            if let Some(q) = value {
                if !(q.is_finite() && q > 0.0) {
                    return Err(ConfigError::InvalidValue {
                        field,
                        reason: format!("{q} is not a positive Q"),
                    });
                }
            }
        }
        if let (Some(floor), Some(ceiling)) = (self.q_floor, self.q_ceiling) {
            if floor >= ceiling {
                return Err(ConfigError::InvalidValue {
                    field: "q_floor",
                    reason: format!("{floor} is not below q_ceiling {ceiling}"),
                });
            }
        }
        for (field, value) in [
            ("q_resolution_floor", self.q_resolution_floor),
            ("time_before_range_change", self.time_before_range_change),
            ("time_after_range_change", self.time_after_range_change),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{value} is not a finite, non-negative number"),
                });
            }
        }
        if let Some(name) = &self.combined_output {
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "combined_output",
                    reason: String::from("the file name is empty"),
                });
            }
        }
        if let Some(centroid) = self.centroid {
            if !centroid.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: "centroid",
                    reason: format!("{centroid} is not a finite angle"),
                });
            }
        }
        Ok(())
    }

    /// Get the list of raw fly scan files to reduce, sorted by name
    pub fn get_raw_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.raw_path.exists() {
            return Err(ConfigError::BadFilePath(self.raw_path.clone()));
        }
        let mut files: Vec<PathBuf> = Vec::new();
        if self.raw_files.is_empty() {
            for item in self.raw_path.read_dir()? {
                let item_path = item?.path();
                if item_path.is_file()
                    && item_path.extension().is_some_and(|ext| ext == RAW_EXTENSION)
                {
                    files.push(item_path);
                }
            }
        } else {
            files = self
                .raw_files
                .iter()
                .map(|name| self.raw_path.join(name))
                .collect();
        }
        if files.is_empty() {
            return Err(ConfigError::NoMatchingFiles(self.raw_path.clone()));
        }
        files.sort();
        Ok(files)
    }

    /// Get the path to the output hdf5 file for a raw file
    pub fn get_output_file_name(&self, raw_file: &Path) -> Result<PathBuf, ConfigError> {
        if !self.output_path.exists() {
            return Err(ConfigError::BadFilePath(self.output_path.clone()));
        }
        let stem = raw_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(self
            .output_path
            .join(format!("{stem}{REDUCED_SUFFIX}.{RAW_EXTENSION}")))
    }

    /// Get the path to the single output file used when combining scans, if any
    pub fn get_combined_output_file_name(&self) -> Result<Option<PathBuf>, ConfigError> {
        match &self.combined_output {
            Some(name) => {
                if !self.output_path.exists() {
                    return Err(ConfigError::BadFilePath(self.output_path.clone()));
                }
                Ok(Some(self.output_path.join(name)))
            }
            None => Ok(None),
        }
    }

    /// The reduction settings carried by this config
    pub fn reduction_parameters(&self) -> ReductionParameters {
        ReductionParameters {
            rebin: RebinSettings {
                number_of_bins: self.number_of_bins,
                q_floor: self.q_floor,
                q_ceiling: self.q_ceiling,
            },
            q_resolution_floor: self.q_resolution_floor,
            centroid: self.centroid,
            range_change_window: MaskWindow {
                time_before: self.time_before_range_change,
                time_after: self.time_after_range_change,
            },
        }
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.number_of_bins, DEFAULT_NUMBER_OF_BINS);
        assert_eq!(parsed.centroid, None);
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.reduction_parameters(), ReductionParameters::default());
    }

    #[test]
    fn test_read_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let yaml = "raw_path: /data/USAXS_data/struckData
raw_files: [Adam_120_1386638883.h5]
output_path: /data/reduced
entry_name: fly_2013_12_09
number_of_bins: 250
q_floor: null
q_ceiling: 0.5
q_resolution_floor: 1.0e-6
centroid: 8.8765
time_before_range_change: 0.2
time_after_range_change: 0.1
n_threads: 4
";
        std::fs::write(&path, yaml).unwrap();
        let config = Config::read_config_file(&path).unwrap();
        assert_eq!(config.entry_name, "fly_2013_12_09");
        assert_eq!(config.q_floor, None);
        assert_eq!(config.combined_output, None);
        let parameters = config.reduction_parameters();
        assert_eq!(parameters.rebin.number_of_bins, 250);
        assert_eq!(parameters.centroid, Some(8.8765));
        assert_eq!(parameters.range_change_window.time_after, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            Config::read_config_file(Path::new("/not/a/config.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            number_of_bins: 1,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "number_of_bins",
                ..
            })
        ));
        let config = Config {
            q_floor: Some(2.0),
            q_ceiling: Some(1.0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
        let config = Config {
            n_threads: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        let config = Config {
            time_before_range_change: -0.1,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        let config = Config {
            combined_output: Some(String::new()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_raw_file_discovery() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_scan.h5", "a_scan.h5", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let config = Config {
            raw_path: dir.path().to_path_buf(),
            output_path: dir.path().to_path_buf(),
            ..Config::default()
        };
        let files = config.get_raw_files().unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a_scan.h5"), dir.path().join("b_scan.h5")]
        );
        let output = config.get_output_file_name(&files[0]).unwrap();
        assert_eq!(output, dir.path().join("a_scan_reduced.h5"));

        assert_eq!(config.get_combined_output_file_name().unwrap(), None);
        let combined = Config {
            combined_output: Some(String::from("fly_2013_12_09.h5")),
            ..config.clone()
        };
        assert_eq!(
            combined.get_combined_output_file_name().unwrap(),
            Some(dir.path().join("fly_2013_12_09.h5"))
        );

        let empty = tempfile::tempdir().unwrap();
        let config = Config {
            raw_path: empty.path().to_path_buf(),
            ..Config::default()
        };
        assert!(matches!(
            config.get_raw_files(),
            Err(ConfigError::NoMatchingFiles(_))
        ));
    }
}

use std::path::{Path, PathBuf};

use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::config_utils;
use super::landmarks::LandmarkSelection;
use super::RouterConfig;
use super::SkimError;


/// Parameters of the transit router: walking on transfer links and the marginal utilities that
/// turn times and distances into a generalized cost.  Utilities follow the scoring convention
/// (negative is bad), so costs come out as `-time * utility`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitRouterParams {
    pub walk_speed_mps: f64,
    pub beeline_dist_factor: f64,
    pub transfer_radius_m: f64,
    pub additional_transfer_time_s: f64,
    pub marginal_utility_travel_time_pt_utl_s: f64,
    pub marginal_utility_travel_distance_pt_utl_m: f64,
    pub marginal_utility_travel_time_walk_utl_s: f64,
    pub marginal_utility_waiting_utl_s: f64,
    pub utility_of_line_switch_utl: f64,
}

impl Default for TransitRouterParams {
    fn default() -> Self {
        TransitRouterParams {
            walk_speed_mps: 3.0 / 3.6,
            beeline_dist_factor: 1.3,
            transfer_radius_m: 100.,
            additional_transfer_time_s: 0.,
            marginal_utility_travel_time_pt_utl_s: -6.0 / 3600.,
            marginal_utility_travel_distance_pt_utl_m: 0.,
            marginal_utility_travel_time_walk_utl_s: -12.0 / 3600.,
            marginal_utility_waiting_utl_s: -6.0 / 3600.,
            utility_of_line_switch_utl: -1.0,
        }
    }
}

impl TransitRouterParams {
    /// Reads the `router` block of a config.  Every key is optional; missing ones keep their
    /// default values.
    pub fn from_yaml(yaml_cfg: &Yaml) -> Result<TransitRouterParams, SkimError> {
        let mut params = TransitRouterParams::default();
        if yaml_cfg.is_badvalue() || yaml_cfg.is_null() {
            return Ok(params);
        }
        let fields: [(&str, &mut f64); 9] = [
            ("walk_speed_mps", &mut params.walk_speed_mps),
            ("beeline_dist_factor", &mut params.beeline_dist_factor),
            ("transfer_radius_m", &mut params.transfer_radius_m),
            ("additional_transfer_time_s", &mut params.additional_transfer_time_s),
            ("marginal_utility_travel_time_pt_utl_s",
             &mut params.marginal_utility_travel_time_pt_utl_s),
            ("marginal_utility_travel_distance_pt_utl_m",
             &mut params.marginal_utility_travel_distance_pt_utl_m),
            ("marginal_utility_travel_time_walk_utl_s",
             &mut params.marginal_utility_travel_time_walk_utl_s),
            ("marginal_utility_waiting_utl_s", &mut params.marginal_utility_waiting_utl_s),
            ("utility_of_line_switch_utl", &mut params.utility_of_line_switch_utl),
        ];
        for (key, field) in fields {
            if let Some(value) = optional_f64(yaml_cfg, key)? {
                *field = value;
            }
        }

        if params.walk_speed_mps <= 0. || params.beeline_dist_factor <= 0. {
            return Err(SkimError::Config(
                String::from("walk_speed_mps and beeline_dist_factor must be positive")));
        }
        Ok(params)
    }
}

impl RouterConfig for TransitRouterParams {
    fn get_walk_speed_mps(&self) -> f64 {
        return self.walk_speed_mps;
    }

    fn get_beeline_dist_factor(&self) -> f64 {
        return self.beeline_dist_factor;
    }

    fn get_transfer_radius_m(&self) -> f64 {
        return self.transfer_radius_m;
    }

    fn get_additional_transfer_time_s(&self) -> f64 {
        return self.additional_transfer_time_s;
    }
}


/// Where the routing graph comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkSource {
    GridCity {
        num_x_nodes: usize,
        num_y_nodes: usize,
        spacing_m: f64,
        freespeed_mps: f64,
    },
    Dataset {
        network_path: Option<PathBuf>,
        schedule_path: Option<PathBuf>,
        network_mode: Option<String>,
    },
}

/// Configuration of one skim computation run.
#[derive(Clone, Debug)]
pub struct SkimConfig {
    pub source: NetworkSource,
    pub zones_path: Option<PathBuf>,
    /// A csv of `from,to` node id pairs to answer with point-to-point queries.
    pub od_pairs_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub departure_time_s: f64,
    pub num_threads: usize,
    pub max_distance_m: Option<f64>,
    pub num_landmarks: usize,
    pub landmark_selection: LandmarkSelection,
    pub router: TransitRouterParams,
}

impl SkimConfig {
    pub fn from_file(config_path: &Path) -> Result<SkimConfig, SkimError> {
        let file_contents = std::fs::read_to_string(config_path)?;
        let config_dir = match config_path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        SkimConfig::from_yaml_str(&file_contents, &config_dir)
    }

    /// Parses a config; relative paths are taken relative to `config_dir`.
    pub fn from_yaml_str(yaml_str: &str, config_dir: &Path) -> Result<SkimConfig, SkimError> {
        let docs = YamlLoader::load_from_str(yaml_str)?;
        let yaml_cfg = match docs.get(0) {
            Some(doc) => doc,
            None => return Err(SkimError::Config(String::from("config file is empty"))),
        };

        let path_of = |yaml: &Yaml, key: &str| -> Option<PathBuf> {
            yaml[key].as_str().map(|ps| config_utils::str_to_absolute_path(ps, config_dir))
        };

        let source = if ! yaml_cfg["grid_city"].is_badvalue() {
            let grid_cfg = &yaml_cfg["grid_city"];
            NetworkSource::GridCity {
                num_x_nodes: required_i64(grid_cfg, "num_x_nodes")? as usize,
                num_y_nodes: required_i64(grid_cfg, "num_y_nodes")? as usize,
                spacing_m: required_f64(grid_cfg, "spacing_m")?,
                freespeed_mps: required_f64(grid_cfg, "freespeed_mps")?,
            }
        } else if ! yaml_cfg["dataset"].is_badvalue() {
            let dataset_cfg = &yaml_cfg["dataset"];
            let network_path = path_of(dataset_cfg, "network_path");
            let schedule_path = path_of(dataset_cfg, "schedule_path");
            if network_path.is_none() && schedule_path.is_none() {
                return Err(SkimError::Config(
                    String::from("dataset needs a network_path or a schedule_path")));
            }
            NetworkSource::Dataset {
                network_path,
                schedule_path,
                network_mode: dataset_cfg["network_mode"].as_str().map(String::from),
            }
        } else {
            return Err(SkimError::Config(String::from("no grid_city or dataset given in config")));
        };

        let zones_path = if yaml_cfg["dataset"].is_badvalue() {
            None
        } else {
            path_of(&yaml_cfg["dataset"], "zones_path")
        };

        let departure_time_s = match yaml_cfg["departure_time"].as_str() {
            Some(timestr) => config_utils::get_num_seconds_from_time_str(timestr)?,
            None => required_f64(yaml_cfg, "departure_time")?,
        };

        let num_threads = match yaml_cfg["num_threads"].as_i64() {
            Some(nt) if nt > 0 => nt as usize,
            Some(nt) => return Err(SkimError::Config(format!("num_threads must be positive, \
                                                               got {}", nt))),
            None => rayon::current_num_threads(),
        };

        let landmark_selection = match yaml_cfg["landmark_selection"].as_str() {
            None | Some("pie_slices") => LandmarkSelection::PieSlices,
            Some("farthest") => LandmarkSelection::Farthest,
            Some("random") => LandmarkSelection::Random {
                seed: yaml_cfg["landmark_seed"].as_i64().unwrap_or(0) as u64,
            },
            Some(other) => return Err(SkimError::Config(
                format!("unknown landmark selection {:?}", other))),
        };

        Ok(SkimConfig {
            source,
            zones_path,
            od_pairs_path: path_of(yaml_cfg, "od_pairs_path"),
            output_dir: path_of(yaml_cfg, "output_dir").unwrap_or_else(|| config_dir.to_path_buf()),
            departure_time_s,
            num_threads,
            max_distance_m: optional_f64(yaml_cfg, "max_distance_m")?,
            num_landmarks: yaml_cfg["num_landmarks"].as_i64().unwrap_or(16) as usize,
            landmark_selection,
            router: TransitRouterParams::from_yaml(&yaml_cfg["router"])?,
        })
    }
}


/// yaml_rust keeps integers and reals apart; numeric config values may be written as either.
fn optional_f64(yaml_cfg: &Yaml, key: &str) -> Result<Option<f64>, SkimError> {
    match &yaml_cfg[key] {
        Yaml::Real(_) => Ok(yaml_cfg[key].as_f64()),
        Yaml::Integer(ii) => Ok(Some(*ii as f64)),
        Yaml::BadValue | Yaml::Null => Ok(None),
        other => Err(SkimError::Config(format!("{} should be a number, got {:?}", key, other))),
    }
}

fn required_f64(yaml_cfg: &Yaml, key: &str) -> Result<f64, SkimError> {
    optional_f64(yaml_cfg, key)?.ok_or_else(|| SkimError::Config(format!("no {} given", key)))
}

fn required_i64(yaml_cfg: &Yaml, key: &str) -> Result<i64, SkimError> {
    yaml_cfg[key].as_i64().ok_or_else(|| SkimError::Config(format!("no {} given", key)))
}

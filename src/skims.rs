// One skim run, as driven by a config file: build the routing graph, compute the matrices, and
// write them out.
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::config::{NetworkSource, SkimConfig};
use super::cost::{FreeSpeedTravelCost, ScheduleCostModel, TravelDisutility, TravelTime};
use super::graph::Graph;
use super::landmarks::LandmarksFactory;
use super::matrix::{Matrix, SparseMatrix};
use super::matrix_builder::MatrixBuilder;
use super::network::Network;
use super::schedule::TransitSchedule;
use super::transit_network::build_transit_network;
use super::zones::{central_nodes, Zone};
use super::SkimError;


pub const DENSE_MATRIX_FILE: &str = "travel_times.csv";
pub const SPARSE_MATRIX_FILE: &str = "sparse_travel_times.csv";
pub const OD_TIMES_FILE: &str = "od_travel_times.csv";

/// What a run computed.  Everything here has also been written to the output directory.
pub struct SkimResults {
    pub graph: Arc<Graph>,
    pub matrix: Matrix<String>,
    pub sparse_matrix: Option<SparseMatrix>,
    /// (from node id, to node id, travel time) for each requested pair.
    pub od_travel_times: Vec<(String, String, Option<f64>)>,
}

pub fn run(config: &SkimConfig) -> Result<SkimResults, SkimError> {
    match &config.source {
        NetworkSource::GridCity {num_x_nodes, num_y_nodes, spacing_m, freespeed_mps} => {
            let network = Network::grid(*num_x_nodes, *num_y_nodes, *spacing_m, *freespeed_mps);
            let graph = Arc::new(Graph::from_network(&network)?);
            compute_skims(config, graph, FreeSpeedTravelCost)
        }
        NetworkSource::Dataset {schedule_path: Some(schedule_path), ..} => {
            let schedule = Arc::new(TransitSchedule::from_xml_file(schedule_path)?);
            let network = build_transit_network(&schedule, &config.router)?;
            let graph = Arc::new(Graph::from_network(&network)?);
            let cost = ScheduleCostModel::new(schedule, config.router.clone());
            compute_skims(config, graph, cost)
        }
        NetworkSource::Dataset {network_path: Some(network_path), network_mode, ..} => {
            let mut network = Network::from_xml(network_path)?;
            if let Some(mode) = network_mode {
                network = network.filter_by_mode(mode);
            }
            let graph = Arc::new(Graph::from_network(&network.clean())?);
            compute_skims(config, graph, FreeSpeedTravelCost)
        }
        NetworkSource::Dataset {..} => Err(SkimError::Config(
            String::from("dataset needs a network_path or a schedule_path"))),
    }
}

fn compute_skims<C>(config: &SkimConfig, graph: Arc<Graph>, cost: C)
                    -> Result<SkimResults, SkimError>
    where C: TravelTime + TravelDisutility + Clone + Send + Sync
{
    if ! graph.is_strongly_connected() {
        log::warn!("the routing graph is not strongly connected; the dense matrix will fail \
                    unless all zones lie in one component");
    }

    let zone_nodes: HashMap<String, usize> = match &config.zones_path {
        Some(zones_path) => central_nodes(&graph, &Zone::all_from_csv(zones_path)?)?,
        None => graph.nodes().iter().map(|nn| (nn.id.clone(), nn.index)).collect(),
    };

    let mut builder = MatrixBuilder::new(graph.clone(), cost, config.num_threads);
    std::fs::create_dir_all(&config.output_dir)?;

    let matrix = builder.dense_matrix(&zone_nodes, config.departure_time_s)?;
    matrix.write_csv(&config.output_dir.join(DENSE_MATRIX_FILE))?;

    let sparse_matrix = match config.max_distance_m {
        Some(max_distance) => {
            let sparse = builder.sparse_matrix(max_distance, config.departure_time_s)?;
            sparse.write_csv(&config.output_dir.join(SPARSE_MATRIX_FILE), &graph)?;
            Some(sparse)
        }
        None => None,
    };

    let mut od_travel_times = vec![];
    if let Some(od_pairs_path) = &config.od_pairs_path {
        if config.num_landmarks > 0 {
            let factory = LandmarksFactory::new(config.num_landmarks,
                                                config.landmark_selection.clone(),
                                                config.num_threads);
            builder = builder.with_landmarks(&factory)?;
        }
        let pairs = read_od_pairs(od_pairs_path, &graph)?;
        let times = builder.od_travel_times(&pairs, config.departure_time_s)?;
        for ((from, to), time) in pairs.into_iter().zip(times) {
            od_travel_times.push((graph.node(from).id.clone(), graph.node(to).id.clone(), time));
        }
        write_od_times(&config.output_dir.join(OD_TIMES_FILE), &od_travel_times)?;
    }

    Ok(SkimResults {
        graph,
        matrix,
        sparse_matrix,
        od_travel_times,
    })
}

// A convenience type for parsing csv data
type Row = HashMap<String, String>;

fn read_od_pairs(csvpath: &Path, graph: &Graph) -> Result<Vec<(usize, usize)>, SkimError> {
    let file = File::open(csvpath)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut pairs = vec![];
    for result in reader.deserialize() {
        let row: Row = result?;
        let mut ends = vec![];
        for column in &["from", "to"] {
            let id = row.get(*column).ok_or_else(
                || SkimError::Parse(format!("od pairs file has no {:?} column", column)))?;
            let node = graph.node_index(id.trim())
                .ok_or_else(|| SkimError::UnknownNode(id.clone()))?;
            ends.push(node);
        }
        pairs.push((ends[0], ends[1]));
    }
    Ok(pairs)
}

fn write_od_times(path: &Path, od_times: &Vec<(String, String, Option<f64>)>)
                  -> Result<(), SkimError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["from", "to", "time"])?;
    for (from, to, time) in od_times {
        let time = match time {
            Some(time) => time.to_string(),
            None => String::new(),
        };
        writer.write_record(&[from, to, &time])?;
    }
    writer.flush()?;
    log::info!("wrote {} od travel times to {:?}", od_times.len(), path);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_grid_run() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pairs.csv"), "from,to\n0,8\n8,0\n").unwrap();
        let yaml = r###"
grid_city:
  num_x_nodes: 3
  num_y_nodes: 3
  spacing_m: 100
  freespeed_mps: 10
departure_time: "07:00:00"
num_threads: 2
max_distance_m: 150
num_landmarks: 2
od_pairs_path: pairs.csv
"###;
        let config = SkimConfig::from_yaml_str(yaml, dir.path()).unwrap();
        let results = run(&config).unwrap();
        assert_eq!(results.matrix.len(), 81);
        assert_eq!(results.matrix.get(&String::from("0"), &String::from("8")), Some(40.));
        let sparse = results.sparse_matrix.unwrap();
        assert_eq!(sparse.get(4, 1), Some(10.));
        assert_eq!(sparse.get(4, 0), None);
        assert_eq!(results.od_travel_times, vec![
            (String::from("0"), String::from("8"), Some(40.)),
            (String::from("8"), String::from("0"), Some(40.)),
        ]);

        for file in &[DENSE_MATRIX_FILE, SPARSE_MATRIX_FILE, OD_TIMES_FILE] {
            assert!(dir.path().join(file).exists(), "{} was not written", file);
        }
    }

    #[test]
    fn test_unknown_od_node() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("pairs.csv"), "from,to\n0,nowhere\n").unwrap();
        let yaml = "grid_city:\n  num_x_nodes: 2\n  num_y_nodes: 2\n  spacing_m: 1\n  \
                    freespeed_mps: 1\ndeparture_time: 0\nod_pairs_path: pairs.csv\n";
        let config = SkimConfig::from_yaml_str(yaml, dir.path()).unwrap();
        assert!(matches!(run(&config), Err(SkimError::UnknownNode(_))));
    }
}

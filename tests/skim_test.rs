use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use glob::glob;
use tempfile::tempdir;
use approx::assert_relative_eq;
use itertools::iproduct;

use transit_skims::{run, SkimConfig, SkimError, SkimResults};
use transit_skims::{DENSE_MATRIX_FILE, OD_TIMES_FILE, SPARSE_MATRIX_FILE};


/// Loads an environment's config, redirecting its output to `output_dir`.
fn load_config(config_path: &Path, output_dir: &Path) -> SkimConfig {
    let mut config = SkimConfig::from_file(config_path).unwrap();
    config.output_dir = output_dir.to_path_buf();
    config
}

fn read_csv_times(path: &Path) -> HashMap<(String, String), Option<f64>> {
    let file = File::open(path).unwrap();
    let mut reader = csv::Reader::from_reader(file);
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["from", "to", "time"]);
    let mut times = HashMap::new();
    for result in reader.deserialize() {
        let row: HashMap<String, String> = result.unwrap();
        let time = match row["time"].as_str() {
            "" => None,
            tt => Some(tt.parse().unwrap()),
        };
        times.insert((row["from"].clone(), row["to"].clone()), time);
    }
    times
}

fn zone(id: &str) -> String {
    String::from(id)
}

#[test]
fn test_every_env_runs() {
    for path in glob("tests/envs/*/config*.yaml").expect("Failed to read glob pattern") {
        let path = path.unwrap();
        if path.starts_with("tests/envs/one-way-route") {
            continue;
        }
        println!("Testing {:?}", path);
        let dir = tempdir().unwrap();
        let config = load_config(&path, dir.path());
        let results = run(&config).unwrap();
        assert!(results.matrix.is_complete());
        assert!(dir.path().join(DENSE_MATRIX_FILE).exists());
        for zone in results.matrix.zones() {
            assert_eq!(results.matrix.get(zone, zone), Some(0.));
        }
    }
}

fn grid_manhattan_hops(from: usize, to: usize) -> usize {
    let (fx, fy) = (from % 4, from / 4);
    let (tx, ty) = (to % 4, to / 4);
    ((fx as i64 - tx as i64).abs() + (fy as i64 - ty as i64).abs()) as usize
}

#[test]
fn test_grid_city() {
    let dir = tempdir().unwrap();
    let config = load_config(&PathBuf::from("tests/envs/grid-city/config.yaml"), dir.path());
    let results = run(&config).unwrap();

    assert_eq!(results.graph.num_nodes(), 12);
    assert_eq!(results.matrix.len(), 144);
    for from in 0..12 {
        for to in 0..12 {
            let time = results.matrix.get(&from.to_string(), &to.to_string()).unwrap();
            assert_relative_eq!(time, 10. * grid_manhattan_hops(from, to) as f64);
        }
    }

    // only nodes closer than 250 m by road, that is at most two blocks away
    let sparse = results.sparse_matrix.as_ref().unwrap();
    for from in 0..12 {
        let row = sparse.get_row(from).unwrap();
        let expected: Vec<usize> = (0..12).filter(|to| grid_manhattan_hops(from, *to) <= 2)
            .collect();
        assert_eq!(row.len(), expected.len());
        for to in expected {
            assert_relative_eq!(sparse.get(from, to).unwrap(),
                                10. * grid_manhattan_hops(from, to) as f64);
        }
    }

    assert_eq!(results.od_travel_times, vec![
        (zone("0"), zone("11"), Some(50.)),
        (zone("11"), zone("0"), Some(50.)),
        (zone("5"), zone("6"), Some(10.)),
        (zone("3"), zone("3"), Some(0.)),
    ]);
}

#[test]
fn test_grid_city_csv_outputs() {
    let dir = tempdir().unwrap();
    let config = load_config(&PathBuf::from("tests/envs/grid-city/config.yaml"), dir.path());
    let results = run(&config).unwrap();

    let dense = read_csv_times(&dir.path().join(DENSE_MATRIX_FILE));
    assert_eq!(dense.len(), 144);
    assert_eq!(dense[&(zone("1"), zone("10"))], Some(30.));

    let sparse = read_csv_times(&dir.path().join(SPARSE_MATRIX_FILE));
    assert_eq!(sparse.len(), results.sparse_matrix.as_ref().unwrap().num_entries());
    assert_eq!(sparse[&(zone("0"), zone("5"))], Some(20.));
    assert!(!sparse.contains_key(&(zone("0"), zone("6"))));

    let od = read_csv_times(&dir.path().join(OD_TIMES_FILE));
    assert_eq!(od.len(), 4);
    assert_eq!(od[&(zone("11"), zone("0"))], Some(50.));
}

#[test]
fn test_results_dont_depend_on_thread_count() {
    let dir = tempdir().unwrap();
    let mut all_results: Vec<SkimResults> = vec![];
    for num_threads in &[1, 2, 5] {
        let mut config = load_config(&PathBuf::from("tests/envs/night-buses/config_night.yaml"),
                                     dir.path());
        config.num_threads = *num_threads;
        all_results.push(run(&config).unwrap());
    }
    let first = &all_results[0];
    for other in &all_results[1..] {
        assert_eq!(first.matrix.zones(), other.matrix.zones());
        for (from, to) in itertools::iproduct!(first.matrix.zones(), first.matrix.zones()) {
            assert_eq!(first.matrix.get(from, to), other.matrix.get(from, to));
        }
        assert_eq!(first.od_travel_times, other.od_travel_times);
    }
}

#[test]
fn test_buses_in_the_morning() {
    let dir = tempdir().unwrap();
    let config = load_config(&PathBuf::from("tests/envs/night-buses/config_morning.yaml"),
                             dir.path());
    let results = run(&config).unwrap();
    let matrix = &results.matrix;
    // leaving at 07:55, the eastbound bus leaves west at 08:00 and the westbound east at 08:30
    assert_eq!(matrix.get(&zone("west"), &zone("mid")), Some(600.));
    assert_eq!(matrix.get(&zone("west"), &zone("east")), Some(900.));
    assert_eq!(matrix.get(&zone("mid"), &zone("east")), Some(900.));
    // walk 30 m to the westbound stop, wait for the 08:35 bus, then walk 30 m back
    assert_eq!(matrix.get(&zone("mid"), &zone("west")), Some(2730.));
    assert_eq!(matrix.get(&zone("east"), &zone("west")), Some(2730.));
    assert_eq!(matrix.get(&zone("east"), &zone("mid")), Some(2430.));
}

#[test]
fn test_buses_after_midnight() {
    let dir = tempdir().unwrap();
    let config = load_config(&PathBuf::from("tests/envs/night-buses/config_night.yaml"),
                             dir.path());
    let results = run(&config).unwrap();
    let matrix = &results.matrix;
    // leaving at 23:55, every bus is tomorrow's
    assert_eq!(matrix.get(&zone("west"), &zone("mid")), Some(29400.));
    assert_eq!(matrix.get(&zone("west"), &zone("east")), Some(29700.));
    assert_eq!(matrix.get(&zone("mid"), &zone("east")), Some(29700.));
    assert_eq!(matrix.get(&zone("mid"), &zone("west")), Some(31530.));
    assert_eq!(matrix.get(&zone("east"), &zone("west")), Some(31530.));
    assert_eq!(matrix.get(&zone("east"), &zone("mid")), Some(31230.));

    // the landmark-guided queries agree with the full sweeps
    let west_node = zone("crosstown/eastbound/0");
    let east_node = zone("crosstown/eastbound/2");
    assert_eq!(results.od_travel_times, vec![
        (west_node.clone(), east_node.clone(), Some(29700.)),
        (east_node, west_node, Some(31530.)),
    ]);
}

#[test]
fn test_disconnected_zones() {
    let dir = tempdir().unwrap();
    let config = load_config(&PathBuf::from("tests/envs/one-way-route/config.yaml"), dir.path());
    match run(&config) {
        Err(SkimError::Disconnected {from, to}) => {
            assert_eq!(from, "shuttle/out/1");
            assert_eq!(to, "shuttle/out/0");
        }
        Err(other) => panic!("expected a disconnection error, got {}", other),
        Ok(_) => panic!("the end of the shuttle route can't reach its start"),
    }
}

#[test]
fn test_network_dataset() {
    let dir = tempdir().unwrap();
    let config = load_config(&PathBuf::from("tests/envs/small-network/config.yaml"), dir.path());
    let results = run(&config).unwrap();

    // the dead end and the bus-only node are gone
    let mut zones = results.matrix.zones().clone();
    zones.sort();
    assert_eq!(zones, vec![zone("a"), zone("b"), zone("c"), zone("d")]);

    let expected = [("a", "b", 10.), ("a", "c", 20.), ("a", "d", 40.),
                    ("b", "a", 20.), ("b", "c", 10.), ("b", "d", 30.),
                    ("c", "a", 40.), ("c", "b", 50.), ("c", "d", 20.),
                    ("d", "a", 20.), ("d", "b", 30.), ("d", "c", 40.)];
    for (from, to, time) in &expected {
        assert_eq!(results.matrix.get(&zone(from), &zone(to)), Some(*time),
                   "wrong time from {} to {}", from, to);
    }
    assert!(results.sparse_matrix.is_none());
    assert!(results.od_travel_times.is_empty());
    assert!(!dir.path().join(SPARSE_MATRIX_FILE).exists());
}

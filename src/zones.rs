use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;

use super::geometry::Point2d;
use super::graph::Graph;
use super::SkimError;


/// An area whose trips all start and end at one representative node of the routing graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    pub id: String,
    pub centroid: Point2d,
}

// A convenience type for parsing csv data
type Row = HashMap<String, String>;

impl Zone {
    pub fn new(id: &str, centroid: Point2d) -> Zone {
        Zone {
            id: String::from(id),
            centroid,
        }
    }

    /// Reads zones from a csv file with `id`, `x` and `y` columns.
    pub fn all_from_csv(csvpath: &Path) -> Result<Vec<Zone>, SkimError> {
        let file = File::open(csvpath)?;
        let mut reader = csv::Reader::from_reader(file);
        let mut zones = vec![];
        for result in reader.deserialize() {
            let row: Row = result?;
            let column = |name: &str| {
                row.get(name).ok_or_else(
                    || SkimError::Parse(format!("zones file has no {:?} column", name)))
            };
            let centroid = Point2d::new(column("x")?.trim().parse()?, column("y")?.trim().parse()?);
            zones.push(Zone::new(column("id")?.trim(), centroid));
        }
        log::info!("read {} zones", zones.len());
        Ok(zones)
    }
}

/// Maps each zone's id to the graph node nearest its centroid.
pub fn central_nodes(graph: &Graph, zones: &[Zone]) -> Result<HashMap<String, usize>, SkimError> {
    let mut kdtree = KdTree::new(2);
    for node in graph.nodes() {
        kdtree.add(node.coord.as_array(), node.index)?;
    }

    let mut central_nodes = HashMap::new();
    for zone in zones {
        let nearest = kdtree.nearest(&zone.centroid.as_array(), 1, &squared_euclidean)?;
        match nearest.first() {
            Some((_, node)) => {
                central_nodes.insert(zone.id.clone(), **node);
            }
            None => return Err(SkimError::Config(
                format!("no graph node near zone {}: the graph is empty", zone.id))),
        }
    }
    Ok(central_nodes)
}

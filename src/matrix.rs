// Output stores for skims: a dense zone-to-zone table and a sparse per-node neighbour list.
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::path::Path;

use ndarray::prelude::*;
use ndarray::parallel::prelude::*;

use super::graph::Graph;
use super::SkimError;


/// Travel times between every ordered pair of zones.  Cells not yet written are undefined.
#[derive(Clone, Debug)]
pub struct Matrix<Z> {
    zones: Vec<Z>,
    zone_idxs: HashMap<Z, usize>,
    // NaN marks an undefined cell
    values: Array<f64, Ix2>,
}

impl<Z> Matrix<Z>
    where Z: Eq + Hash + Clone + Debug
{
    /// An empty matrix over `zones`.  Repeated zones are only counted once.
    pub fn new<II: IntoIterator<Item = Z>>(zones: II) -> Matrix<Z> {
        let mut unique_zones = vec![];
        let mut zone_idxs = HashMap::new();
        for zone in zones {
            if ! zone_idxs.contains_key(&zone) {
                zone_idxs.insert(zone.clone(), unique_zones.len());
                unique_zones.push(zone);
            }
        }
        let size = unique_zones.len();
        Matrix {
            zones: unique_zones,
            zone_idxs,
            values: Array::from_elem((size, size), f64::NAN),
        }
    }

    pub fn zones(&self) -> &Vec<Z> {
        &self.zones
    }

    pub fn zone_index(&self, zone: &Z) -> Option<usize> {
        self.zone_idxs.get(zone).copied()
    }

    fn require_index(&self, zone: &Z) -> Result<usize, SkimError> {
        self.zone_index(zone).ok_or_else(|| SkimError::UnknownZone(format!("{:?}", zone)))
    }

    pub fn set(&mut self, from: &Z, to: &Z, value: f64) -> Result<(), SkimError> {
        let from_idx = self.require_index(from)?;
        let to_idx = self.require_index(to)?;
        self.values[[from_idx, to_idx]] = value;
        Ok(())
    }

    /// Sets every cell of `from`'s row; `values` is ordered like `zones()`.
    pub fn set_row(&mut self, from: &Z, values: &[f64]) -> Result<(), SkimError> {
        let from_idx = self.require_index(from)?;
        if values.len() != self.zones.len() {
            return Err(SkimError::Config(format!("a row of {} values does not fit a matrix of {} \
                                                  zones", values.len(), self.zones.len())));
        }
        self.values.row_mut(from_idx).assign(&ArrayView1::from(values));
        Ok(())
    }

    pub fn get(&self, from: &Z, to: &Z) -> Option<f64> {
        let value = self.values[[self.zone_index(from)?, self.zone_index(to)?]];
        if value.is_nan() {
            return None;
        }
        Some(value)
    }

    /// The number of defined cells.
    pub fn len(&self) -> usize {
        self.values.par_iter().filter(|vv| ! vv.is_nan()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.len() == self.zones.len() * self.zones.len()
    }
}

impl<Z> Matrix<Z>
    where Z: Eq + Hash + Clone + Debug + Display
{
    /// Writes the defined cells as `from,to,time` rows.
    pub fn write_csv(&self, path: &Path) -> Result<(), SkimError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&["from", "to", "time"])?;
        for ((from_idx, to_idx), value) in self.values.indexed_iter() {
            if value.is_nan() {
                continue;
            }
            writer.write_record(&[self.zones[from_idx].to_string(),
                                  self.zones[to_idx].to_string(),
                                  value.to_string()])?;
        }
        writer.flush()?;
        log::info!("wrote {} matrix cells to {:?}", self.len(), path);
        Ok(())
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeAndTime {
    pub node: usize,
    pub time: f64,
}

/// The destinations reached from one origin, in the order the search settled them.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SparseRow {
    pub entries: Vec<NodeAndTime>,
}

impl SparseRow {
    pub fn get(&self, to: usize) -> Option<f64> {
        self.entries.iter().find(|nt| nt.node == to).map(|nt| nt.time)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Travel times from every node to the nodes near it.  Only origins that have been computed
/// have a row.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<Option<SparseRow>>,
}

impl SparseMatrix {
    pub fn new(num_nodes: usize) -> SparseMatrix {
        SparseMatrix {
            rows: vec![None; num_nodes],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.rows.len()
    }

    pub fn set_row(&mut self, from: usize, row: SparseRow) -> Result<(), SkimError> {
        match self.rows.get_mut(from) {
            Some(slot) => {
                *slot = Some(row);
                Ok(())
            }
            None => Err(SkimError::NodeOutOfRange(from)),
        }
    }

    pub fn get_row(&self, from: usize) -> Option<&SparseRow> {
        self.rows.get(from)?.as_ref()
    }

    pub fn get(&self, from: usize, to: usize) -> Option<f64> {
        self.get_row(from)?.get(to)
    }

    /// The total number of (origin, destination) entries.
    pub fn num_entries(&self) -> usize {
        self.rows.iter().flatten().map(|row| row.len()).sum()
    }

    /// Writes all entries as `from,to,time` rows, naming nodes by their ids in `graph`.
    pub fn write_csv(&self, path: &Path, graph: &Graph) -> Result<(), SkimError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&["from", "to", "time"])?;
        for (from, row) in self.rows.iter().enumerate() {
            let row = match row {
                Some(row) => row,
                None => continue,
            };
            graph.check_node(from)?;
            for entry in &row.entries {
                graph.check_node(entry.node)?;
                writer.write_record(&[&graph.node(from).id, &graph.node(entry.node).id,
                                      &entry.time.to_string()])?;
            }
        }
        writer.flush()?;
        log::info!("wrote {} sparse matrix entries to {:?}", self.num_entries(), path);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use super::super::test_utils::grid_graph;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        assert_eq!(reader.headers().unwrap(), vec!["from", "to", "time"]);
        reader.records()
            .map(|rec| rec.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_dense_cells() {
        let mut matrix = Matrix::new(vec!["a", "b", "c", "a"]);
        assert_eq!(matrix.zones(), &vec!["a", "b", "c"]);
        assert_eq!(matrix.len(), 0);
        assert_eq!(matrix.get(&"a", &"b"), None);

        matrix.set(&"a", &"b", 12.).unwrap();
        matrix.set(&"b", &"a", 15.).unwrap();
        assert_eq!(matrix.get(&"a", &"b"), Some(12.));
        assert_eq!(matrix.get(&"b", &"a"), Some(15.));
        assert_eq!(matrix.len(), 2);
        assert!(matches!(matrix.set(&"z", &"a", 1.), Err(SkimError::UnknownZone(_))));
        assert_eq!(matrix.get(&"z", &"a"), None);

        matrix.set_row(&"c", &[1., 2., 0.]).unwrap();
        assert_eq!(matrix.get(&"c", &"b"), Some(2.));
        assert_eq!(matrix.len(), 5);
        assert!(!matrix.is_complete());
        assert!(matrix.set_row(&"c", &[1.]).is_err());
    }

    #[test]
    fn test_dense_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.csv");
        let mut matrix = Matrix::new(vec![String::from("x"), String::from("y")]);
        matrix.set_row(&String::from("x"), &[0., 30.5]).unwrap();
        matrix.write_csv(&path).unwrap();
        assert_eq!(read_rows(&path), vec![vec!["x", "x", "0"], vec!["x", "y", "30.5"]]);
    }

    #[test]
    fn test_sparse_rows() {
        let mut sparse = SparseMatrix::new(4);
        assert_eq!(sparse.num_nodes(), 4);
        let row = SparseRow {
            entries: vec![NodeAndTime {node: 2, time: 5.}, NodeAndTime {node: 1, time: 3.}],
        };
        sparse.set_row(0, row.clone()).unwrap();
        assert_eq!(sparse.get_row(0), Some(&row));
        assert_eq!(sparse.get(0, 1), Some(3.));
        assert_eq!(sparse.get(0, 3), None);
        assert_eq!(sparse.get(1, 0), None);
        assert_eq!(sparse.get(9, 0), None);
        assert_eq!(sparse.num_entries(), 2);
        assert!(matches!(sparse.set_row(4, SparseRow::default()),
                         Err(SkimError::NodeOutOfRange(4))));
    }

    #[test]
    fn test_sparse_csv() {
        let graph = grid_graph(2, 2);
        let mut sparse = SparseMatrix::new(4);
        sparse.set_row(3, SparseRow {entries: vec![NodeAndTime {node: 1, time: 10.}]}).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("sparse.csv");
        sparse.write_csv(&path, &graph).unwrap();
        assert_eq!(read_rows(&path), vec![vec!["3", "1", "10"]]);
    }
}

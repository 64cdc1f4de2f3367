use thiserror::Error;


/// Everything that can go wrong while loading inputs or building skims.
#[derive(Debug, Error)]
pub enum SkimError {
    /// A destination required by a dense matrix was never reached.  This means the routing
    /// network is not fully connected.
    #[error("undefined time from node {from} to node {to}: the routing network is probably \
             not fully connected, please check and/or clean it")]
    Disconnected { from: String, to: String },

    #[error("the worker pool has been shut down")]
    PoolShutDown,

    #[error("a worker pool needs at least one worker")]
    EmptyPool,

    #[error("node index {0} is out of range")]
    NodeOutOfRange(usize),

    #[error("unknown node id {0:?}")]
    UnknownNode(String),

    #[error("zone {0} is not part of this matrix")]
    UnknownZone(String),

    #[error("could not parse input: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xml(#[from] xml::reader::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] yaml_rust::ScanError),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("spatial index error: {0:?}")]
    Spatial(kdtree::ErrorKind),
}

impl From<kdtree::ErrorKind> for SkimError {
    fn from(err: kdtree::ErrorKind) -> Self {
        SkimError::Spatial(err)
    }
}

impl From<std::num::ParseFloatError> for SkimError {
    fn from(err: std::num::ParseFloatError) -> Self {
        SkimError::Parse(err.to_string())
    }
}

impl From<std::num::ParseIntError> for SkimError {
    fn from(err: std::num::ParseIntError) -> Self {
        SkimError::Parse(err.to_string())
    }
}

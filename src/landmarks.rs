// ALT landmarks: a few well-spread nodes, with precomputed costs from and to each of them, give
// a lower bound on the cost between any two nodes through the triangle inequality.
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use petgraph::Direction;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;
use rayon::prelude::*;

use super::cost::TravelDisutility;
use super::geometry::bounding_box_centre;
use super::graph::{Graph, GraphId};
use super::static_dijkstra::static_sweep;
use super::SkimError;


/// How landmark nodes are chosen.
#[derive(Clone, Debug, PartialEq)]
pub enum LandmarkSelection {
    /// Split the plane around the network's centre into equal angular sectors and take the node
    /// farthest from the centre in each.
    PieSlices,
    /// Repeatedly take the node whose cost from the already chosen landmarks is largest.
    Farthest,
    /// Uniformly random, reproducible from the seed.
    Random { seed: u64 },
}

#[derive(Debug)]
pub struct Landmarks {
    landmarks: Vec<usize>,
    // from_landmark[ll][node] is the cost from landmark ll to node, to_landmark the reverse
    from_landmark: Vec<Vec<f64>>,
    to_landmark: Vec<Vec<f64>>,
}

impl Landmarks {
    /// Chooses up to `num_landmarks` landmarks and runs a forward and a backward sweep from each
    /// of them on a dedicated pool of `num_threads` threads.
    pub fn preprocess<C>(graph: &Graph, cost: &C, num_landmarks: usize,
                         selection: &LandmarkSelection, num_threads: usize)
                         -> Result<Landmarks, SkimError>
        where C: TravelDisutility + Clone + Send + Sync
    {
        let landmarks = select_landmarks(graph, &mut cost.clone(), num_landmarks, selection);
        log::info!("preprocessing {} landmarks with {} threads", landmarks.len(), num_threads);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(num_threads).build()?;
        let sweeps: Vec<(Vec<f64>, Vec<f64>)> = pool.install(|| {
            landmarks.par_iter()
                .map_init(|| cost.clone(), |cost, &landmark| {
                    let from = static_sweep(graph, landmark, Direction::Outgoing, cost);
                    let to = static_sweep(graph, landmark, Direction::Incoming, cost);
                    (from, to)
                })
                .collect()
        });
        let (from_landmark, to_landmark) = sweeps.into_iter().unzip();
        log::info!("landmark preprocessing done");

        Ok(Landmarks {
            landmarks,
            from_landmark,
            to_landmark,
        })
    }

    pub fn landmarks(&self) -> &Vec<usize> {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// A lower bound on the cost of any path from `from` to `to`.  Terms involving unreachable
    /// landmarks are skipped; the result is never negative.
    pub fn lower_bound(&self, from: usize, to: usize) -> f64 {
        let mut bound = 0.;
        for (from_ll, to_ll) in self.from_landmark.iter().zip(&self.to_landmark) {
            // d(L, to) <= d(L, from) + d(from, to)
            let fwd = from_ll[to] - from_ll[from];
            if fwd.is_finite() && fwd > bound {
                bound = fwd;
            }
            // d(from, L) <= d(from, to) + d(to, L)
            let bwd = to_ll[from] - to_ll[to];
            if bwd.is_finite() && bwd > bound {
                bound = bwd;
            }
        }
        bound
    }
}


fn select_landmarks<C>(graph: &Graph, cost: &mut C, num_landmarks: usize,
                       selection: &LandmarkSelection) -> Vec<usize>
    where C: TravelDisutility
{
    let num_landmarks = num_landmarks.min(graph.num_nodes());
    if num_landmarks == 0 {
        return vec![];
    }

    match selection {
        LandmarkSelection::PieSlices => {
            let centre = match bounding_box_centre(graph.nodes().iter().map(|nn| &nn.coord)) {
                Some(centre) => centre,
                None => return vec![],
            };
            let slice_angle = 2. * PI / num_landmarks as f64;
            // (node, distance from centre) of the farthest node in each slice
            let mut farthest: Vec<Option<(usize, f64)>> = vec![None; num_landmarks];
            for node in graph.nodes() {
                let slice = ((node.coord.angle_from(&centre) / slice_angle) as usize)
                    .min(num_landmarks - 1);
                let dist = node.coord.euclidean_distance(&centre);
                let is_farther = match farthest[slice] {
                    Some((_, best)) => dist > best,
                    None => true,
                };
                if is_farther {
                    farthest[slice] = Some((node.index, dist));
                }
            }
            let landmarks: Vec<usize> = farthest.into_iter().flatten().map(|(nn, _)| nn).collect();
            if landmarks.len() < num_landmarks {
                log::debug!("{} of {} pie slices contain no nodes",
                            num_landmarks - landmarks.len(), num_landmarks);
            }
            landmarks
        }

        LandmarkSelection::Farthest => {
            // min over chosen landmarks of the cost to reach each node
            let mut min_costs = static_sweep(graph, 0, Direction::Outgoing, cost);
            let mut landmarks = vec![];
            while landmarks.len() < num_landmarks {
                let next = min_costs.iter().enumerate()
                    .filter(|(nn, cc)| cc.is_finite() && ! landmarks.contains(nn))
                    .fold(None, |best: Option<(usize, f64)>, (nn, cc)| match best {
                        Some((_, bc)) if bc >= *cc => best,
                        _ => Some((nn, *cc)),
                    });
                let next = match next {
                    Some((nn, _)) => nn,
                    None => break,
                };
                landmarks.push(next);
                let costs = static_sweep(graph, next, Direction::Outgoing, cost);
                for (mc, cc) in min_costs.iter_mut().zip(costs) {
                    if landmarks.len() == 1 || cc < *mc {
                        *mc = cc;
                    }
                }
            }
            landmarks
        }

        LandmarkSelection::Random { seed } => {
            let mut rng = Isaac64Rng::seed_from_u64(*seed);
            let all_nodes: Vec<usize> = (0..graph.num_nodes()).collect();
            all_nodes.choose_multiple(&mut rng, num_landmarks).cloned().collect()
        }
    }
}


/// Preprocesses landmarks at most once per graph, and hands out the shared result.
#[derive(Debug)]
pub struct LandmarksFactory {
    num_landmarks: usize,
    selection: LandmarkSelection,
    num_threads: usize,
    cache: Mutex<HashMap<GraphId, Arc<Landmarks>>>,
}

impl LandmarksFactory {
    pub fn new(num_landmarks: usize, selection: LandmarkSelection, num_threads: usize)
               -> LandmarksFactory {
        LandmarksFactory {
            num_landmarks,
            selection,
            num_threads,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the landmarks of `graph`, preprocessing them with `cost` on the first request.
    /// Later requests for the same graph get the cached landmarks, whatever cost model they pass.
    pub fn get_or_preprocess<C>(&self, graph: &Graph, cost: &C) -> Result<Arc<Landmarks>, SkimError>
        where C: TravelDisutility + Clone + Send + Sync
    {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(landmarks) = cache.get(&graph.id()) {
            log::debug!("reusing landmarks of graph {:?}", graph.id());
            return Ok(landmarks.clone());
        }
        let landmarks = Arc::new(Landmarks::preprocess(graph, cost, self.num_landmarks,
                                                       &self.selection, self.num_threads)?);
        cache.insert(graph.id(), landmarks.clone());
        Ok(landmarks)
    }

    pub fn num_cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

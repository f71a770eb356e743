use crate::instance::{Instance, VertexId};
use crate::tour::Tour;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &Instance) -> Tour;
    fn name(&self) -> &str;
}

/// Horizon-aware Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly moving to the closest unvisited vertex that
/// can still be reached before the horizon.
pub struct NearestNeighborHeuristic {
    pub randomized: bool,
    pub seed: u64,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic {
            randomized: false,
            seed: 42,
        }
    }

    pub fn randomized(seed: u64) -> Self {
        NearestNeighborHeuristic {
            randomized: true,
            seed,
        }
    }

    fn find_nearest(
        &self,
        instance: &Instance,
        current: VertexId,
        visited: &[bool],
        elapsed: u32,
        rng: &mut ChaCha8Rng,
    ) -> Option<VertexId> {
        let mut candidates: Vec<(VertexId, u32)> = instance
            .out_edges(current)
            .iter()
            .map(|&e| instance.edge(e))
            .filter(|edge| !visited[edge.target])
            .filter(|edge| elapsed + edge.travel_time <= instance.horizon)
            .map(|edge| (edge.target, edge.travel_time))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by_key(|&(v, t)| (t, v));

        if self.randomized && candidates.len() > 1 {
            let top_k = candidates.len().min(3);
            let idx = rng.gen_range(0..top_k);
            Some(candidates[idx].0)
        } else {
            Some(candidates[0].0)
        }
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, instance: &Instance) -> Tour {
        let start = std::time::Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut vertices = vec![instance.source];
        let mut visited = vec![false; instance.dimension];
        visited[instance.source] = true;

        let mut current = instance.source;
        let mut elapsed = 0;

        while vertices.len() < instance.dimension {
            let Some(next) = self.find_nearest(instance, current, &visited, elapsed, &mut rng) else {
                break;
            };
            if let Some(e) = instance.find_edge(current, next) {
                elapsed += instance.edge(e).travel_time;
            }
            vertices.push(next);
            visited[next] = true;
            current = next;
        }

        // Vertices that could not be reached stay out; the tour is then
        // reported infeasible.
        let mut tour = Tour::from_vertices(instance, vertices, self.name());
        tour.computation_time = start.elapsed().as_secs_f64();
        tour
    }

    fn name(&self) -> &str {
        if self.randomized {
            "NearestNeighbor-Randomized"
        } else {
            "NearestNeighbor"
        }
    }
}

/// Runs several constructions and keeps the cheapest feasible tour
pub struct MultiStartConstruction {
    heuristics: Vec<Box<dyn ConstructionHeuristic + Send + Sync>>,
}

impl MultiStartConstruction {
    pub fn new() -> Self {
        MultiStartConstruction {
            heuristics: Vec::new(),
        }
    }

    /// Deterministic nearest neighbor plus `starts` randomized runs
    pub fn with_seeds(seed: u64, starts: usize) -> Self {
        let mut multi_start = Self::new();
        multi_start.add_heuristic(NearestNeighborHeuristic::new());
        for i in 0..starts as u64 {
            multi_start.add_heuristic(NearestNeighborHeuristic::randomized(seed.wrapping_add(i)));
        }
        multi_start
    }

    pub fn add_heuristic<H: ConstructionHeuristic + Send + Sync + 'static>(&mut self, h: H) {
        self.heuristics.push(Box::new(h));
    }
}

impl Default for MultiStartConstruction {
    fn default() -> Self {
        Self::with_seeds(1, 8)
    }
}

impl ConstructionHeuristic for MultiStartConstruction {
    fn construct(&self, instance: &Instance) -> Tour {
        let start = std::time::Instant::now();

        let mut best: Option<Tour> = None;
        for heuristic in &self.heuristics {
            let tour = heuristic.construct(instance);
            let better = match &best {
                None => true,
                Some(current) => {
                    (tour.feasible && !current.feasible)
                        || (tour.feasible == current.feasible && tour.cost < current.cost)
                        || (!tour.feasible && !current.feasible && tour.vertices.len() > current.vertices.len())
                }
            };
            if better {
                best = Some(tour);
            }
        }

        let mut best = best.unwrap_or_else(|| Tour::from_vertices(instance, vec![instance.source], self.name()));
        log::debug!("Multi-start kept {} (cost {:.2}, feasible {})", best.algorithm, best.cost, best.feasible);
        best.algorithm = self.name().to_string();
        best.computation_time = start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        "MultiStart"
    }
}

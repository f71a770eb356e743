//! Module for parsing and representing time-constrained TSP instances.
//!
//! This module handles TSP-LIB style files extended with a time horizon.
//! Travel times are integral so that the network can be expanded over time:
//! Euclidean instances round distances to the nearest integer (at least 1),
//! explicit instances list directed edges with their travel time.

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

/// Index of an original vertex
pub type VertexId = usize;
/// Index of an original edge
pub type EdgeId = usize;

/// Represents a vertex of the original network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Vertex identifier (1-indexed in files, 0-indexed internally)
    pub id: VertexId,
    /// X coordinate (0 for explicit instances)
    pub x: f64,
    /// Y coordinate (0 for explicit instances)
    pub y: f64,
}

/// Represents a directed edge of the original network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    /// Travel time, always at least one time unit
    pub travel_time: u32,
}

/// Represents a complete time-constrained TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Number of vertices (including the source)
    pub dimension: usize,
    /// Vertex where every tour starts and ends
    pub source: VertexId,
    /// Latest admissible arrival time at any vertex
    pub horizon: u32,
    /// Earliest admissible return time at the source
    pub lower_bound: Option<u32>,
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    #[serde(skip)]
    out_edges: Vec<Vec<EdgeId>>,
}

#[derive(PartialEq)]
enum Section {
    Header,
    Coords,
    Edges,
}

impl Instance {
    /// Build an instance from an explicit list of `(from, to, travel_time)` triples
    /// (0-indexed). A `horizon` of `None` uses [`Instance::default_horizon`].
    pub fn from_edges(
        name: &str,
        dimension: usize,
        source: VertexId,
        arcs: &[(VertexId, VertexId, u32)],
        horizon: Option<u32>,
    ) -> Result<Self, String> {
        if dimension == 0 {
            return Err("Instance must contain at least one vertex".to_string());
        }
        if source >= dimension {
            return Err(format!("Source {} out of range (dimension {})", source, dimension));
        }

        let vertices = (0..dimension)
            .map(|id| Vertex { id, x: 0.0, y: 0.0 })
            .collect();

        let mut edges = Vec::with_capacity(arcs.len());
        for &(from, to, travel_time) in arcs {
            if from >= dimension || to >= dimension {
                return Err(format!("Edge {} -> {} references an unknown vertex", from, to));
            }
            if from == to {
                return Err(format!("Self-loop on vertex {}", from));
            }
            if travel_time == 0 {
                return Err(format!("Edge {} -> {} has zero travel time", from, to));
            }
            edges.push(Edge { id: edges.len(), source: from, target: to, travel_time });
        }

        let mut instance = Instance {
            name: name.to_string(),
            comment: String::new(),
            dimension,
            source,
            horizon: 0,
            lower_bound: None,
            vertices,
            edges,
            out_edges: Vec::new(),
        };
        instance.rebuild_adjacency();
        instance.horizon = horizon.unwrap_or_else(|| instance.default_horizon());
        Ok(instance)
    }

    /// Build a complete directed instance from planar coordinates
    pub fn from_coordinates(name: &str, coords: &[(f64, f64)], source: VertexId, horizon: Option<u32>) -> Result<Self, String> {
        let n = coords.len();
        let mut arcs = Vec::with_capacity(n * n.saturating_sub(1));
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = coords[i].0 - coords[j].0;
                    let dy = coords[i].1 - coords[j].1;
                    let time = (dx * dx + dy * dy).sqrt().round().max(1.0) as u32;
                    arcs.push((i, j, time));
                }
            }
        }

        let mut instance = Self::from_edges(name, n, source, &arcs, horizon)?;
        for (vertex, &(x, y)) in instance.vertices.iter_mut().zip(coords) {
            vertex.x = x;
            vertex.y = y;
        }
        Ok(instance)
    }

    /// Parse an instance from a TSP-LIB style file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let text = fs::read_to_string(&path)
            .map_err(|e| format!("Cannot open file: {}", e))?;
        Self::parse(&text)
    }

    /// Parse an instance from TSP-LIB style text
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut name = String::new();
        let mut comment = String::new();
        let mut dimension = 0usize;
        let mut source = 1usize;
        let mut horizon: Option<u32> = None;
        let mut lower_bound: Option<u32> = None;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut arcs: Vec<(usize, usize, u32)> = Vec::new();

        let mut section = Section::Header;

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() || line == "EOF" {
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim() {
                    "NAME" => name = value.to_string(),
                    "COMMENT" => comment = value.to_string(),
                    "DIMENSION" => dimension = value.parse().map_err(|_| "Invalid dimension")?,
                    "SOURCE" => source = value.parse().map_err(|_| "Invalid source")?,
                    "TIME_HORIZON" => horizon = Some(value.parse().map_err(|_| "Invalid time horizon")?),
                    "TIME_LOWER_BOUND" => lower_bound = Some(value.parse().map_err(|_| "Invalid time lower bound")?),
                    "TYPE" | "EDGE_WEIGHT_TYPE" => {}
                    other => return Err(format!("Unknown header key: {}", other)),
                }
                continue;
            }

            if line.starts_with("NODE_COORD_SECTION") {
                section = Section::Coords;
                continue;
            }
            if line.starts_with("EDGE_SECTION") {
                section = Section::Edges;
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match section {
                Section::Coords if parts.len() >= 3 => {
                    let id: usize = parts[0].parse().map_err(|_| "Invalid vertex id")?;
                    let x: f64 = parts[1].parse().map_err(|_| "Invalid x coordinate")?;
                    let y: f64 = parts[2].parse().map_err(|_| "Invalid y coordinate")?;
                    coords.push((id, x, y));
                }
                Section::Edges if parts.len() >= 3 => {
                    let from: usize = parts[0].parse().map_err(|_| "Invalid edge source")?;
                    let to: usize = parts[1].parse().map_err(|_| "Invalid edge target")?;
                    let time: u32 = parts[2].parse().map_err(|_| "Invalid travel time")?;
                    if from == 0 || to == 0 {
                        return Err("Vertex ids are 1-indexed".to_string());
                    }
                    arcs.push((from - 1, to - 1, time));
                }
                Section::Header => return Err(format!("Unexpected line outside of a section: {}", line)),
                _ => return Err(format!("Malformed line: {}", line)),
            }
        }

        if source == 0 {
            return Err("Vertex ids are 1-indexed".to_string());
        }

        let mut instance = if !coords.is_empty() {
            if dimension != 0 && coords.len() != dimension {
                return Err(format!("Expected {} coordinates, found {}", dimension, coords.len()));
            }
            coords.sort_by_key(|c| c.0);
            let points: Vec<(f64, f64)> = coords.iter().map(|&(_, x, y)| (x, y)).collect();
            Self::from_coordinates(&name, &points, source - 1, horizon)?
        } else {
            Self::from_edges(&name, dimension, source - 1, &arcs, horizon)?
        };

        instance.comment = comment;
        instance.lower_bound = lower_bound;
        Ok(instance)
    }

    /// Recompute the outgoing adjacency lists (needed after deserialization)
    pub fn rebuild_adjacency(&mut self) {
        let mut out_edges = vec![Vec::new(); self.dimension];
        for edge in &self.edges {
            out_edges[edge.source].push(edge.id);
        }
        self.out_edges = out_edges;
    }

    /// Sum over vertices of the largest outgoing travel time: no elementary
    /// tour can take longer than this.
    pub fn default_horizon(&self) -> u32 {
        self.out_edges
            .iter()
            .map(|out| out.iter().map(|&e| self.edges[e].travel_time).max().unwrap_or(0))
            .sum()
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    #[inline]
    pub fn out_edges(&self, vertex: VertexId) -> &[EdgeId] {
        &self.out_edges[vertex]
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Find the edge connecting `from` to `to`, if any
    pub fn find_edge(&self, from: VertexId, to: VertexId) -> Option<EdgeId> {
        self.out_edges
            .get(from)?
            .iter()
            .copied()
            .find(|&e| self.edges[e].target == to)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let times: Vec<u32> = self.edges.iter().map(|e| e.travel_time).collect();
        let avg_travel_time = if times.is_empty() {
            0.0
        } else {
            times.iter().map(|&t| t as f64).sum::<f64>() / times.len() as f64
        };
        let possible = self.dimension * self.dimension.saturating_sub(1);

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            num_edges: self.edges.len(),
            density: if possible == 0 { 0.0 } else { self.edges.len() as f64 / possible as f64 },
            horizon: self.horizon,
            lower_bound: self.lower_bound,
            min_travel_time: times.iter().copied().min().unwrap_or(0),
            max_travel_time: times.iter().copied().max().unwrap_or(0),
            avg_travel_time,
        }
    }
}

/// Statistics about an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub num_edges: usize,
    pub density: f64,
    pub horizon: u32,
    pub lower_bound: Option<u32>,
    pub min_travel_time: u32,
    pub max_travel_time: u32,
    pub avg_travel_time: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Vertices: {} (1 source + {} others)", self.dimension, self.dimension.saturating_sub(1))?;
        writeln!(f, "  Edges: {} (density {:.2})", self.num_edges, self.density)?;
        writeln!(f, "  Time horizon: {}", self.horizon)?;
        if let Some(lb) = self.lower_bound {
            writeln!(f, "  Earliest return: {}", lb)?;
        }
        writeln!(f, "  Travel time: min {} / avg {:.2} / max {}", self.min_travel_time, self.avg_travel_time, self.max_travel_time)
    }
}

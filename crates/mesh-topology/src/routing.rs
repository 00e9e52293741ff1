//! Path computation (§4.4): Dijkstra for the primary shortest path, Yen's
//! algorithm layered on top for up to `k` additional loop-free,
//! partially disjoint alternates.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use mesh_core::model::{Adjacency, Path};

pub type Graph = HashMap<String, Vec<Adjacency>>;

#[derive(Debug)]
struct HeapEntry {
    cost: f64,
    node: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we want the smallest cost first
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

/// Dijkstra's shortest path from `source` to `destination` over `graph`.
/// Returns `None` if no path exists. `max_hops` enforces §3's "hop-count
/// ≤ configured max" invariant by pruning the search.
pub fn shortest_path(graph: &Graph, source: &str, destination: &str, max_hops: usize) -> Option<Path> {
    shortest_path_excluding(graph, source, destination, max_hops, &HashSet::new(), &HashSet::new())
}

/// Dijkstra variant used by Yen's algorithm: some nodes and edges are
/// forbidden from the search entirely.
fn shortest_path_excluding(
    graph: &Graph,
    source: &str,
    destination: &str,
    max_hops: usize,
    excluded_nodes: &HashSet<String>,
    excluded_edges: &HashSet<(String, String)>,
) -> Option<Path> {
    let mut dist: HashMap<String, f64> = HashMap::new();
    let mut prev: HashMap<String, String> = HashMap::new();
    let mut hops: HashMap<String, usize> = HashMap::new();
    let mut heap = BinaryHeap::new();

    if excluded_nodes.contains(source) {
        return None;
    }
    dist.insert(source.to_owned(), 0.0);
    hops.insert(source.to_owned(), 0);
    heap.push(HeapEntry {
        cost: 0.0,
        node: source.to_owned(),
    });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if node == destination {
            break;
        }
        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }
        let current_hops = *hops.get(&node).unwrap_or(&0);
        if current_hops >= max_hops {
            continue;
        }
        let Some(neighbors) = graph.get(&node) else {
            continue;
        };
        for adj in neighbors {
            if excluded_nodes.contains(&adj.neighbor_id) {
                continue;
            }
            if excluded_edges.contains(&(node.clone(), adj.neighbor_id.clone())) {
                continue;
            }
            let next_cost = cost + adj.cost;
            if next_cost < *dist.get(&adj.neighbor_id).unwrap_or(&f64::INFINITY) {
                dist.insert(adj.neighbor_id.clone(), next_cost);
                prev.insert(adj.neighbor_id.clone(), node.clone());
                hops.insert(adj.neighbor_id.clone(), current_hops + 1);
                heap.push(HeapEntry {
                    cost: next_cost,
                    node: adj.neighbor_id.clone(),
                });
            }
        }
    }

    if !dist.contains_key(destination) {
        return None;
    }

    let mut nodes = vec![destination.to_owned()];
    let mut cursor = destination.to_owned();
    while let Some(p) = prev.get(&cursor) {
        nodes.push(p.clone());
        cursor = p.clone();
    }
    nodes.reverse();

    Some(Path::new(destination.to_owned(), nodes, dist[destination]))
}

/// Yen's k-shortest-paths: the primary path from `shortest_path`, plus up
/// to `k - 1` loop-free, cost-ordered alternates found by systematically
/// excluding edges/nodes of previously found paths at each deviation
/// point (§4.4).
pub fn k_shortest_paths(graph: &Graph, source: &str, destination: &str, k: usize, max_hops: usize) -> Vec<Path> {
    let Some(first) = shortest_path(graph, source, destination, max_hops) else {
        return Vec::new();
    };
    let mut accepted = vec![first];
    let mut candidates: Vec<Path> = Vec::new();

    while accepted.len() < k {
        let prev_path = accepted.last().unwrap().clone();
        for i in 0..prev_path.nodes.len().saturating_sub(1) {
            let spur_node = &prev_path.nodes[i];
            let root_path = &prev_path.nodes[..=i];

            let mut excluded_edges = HashSet::new();
            for existing in &accepted {
                if existing.nodes.len() > i && existing.nodes[..=i] == *root_path {
                    excluded_edges.insert((existing.nodes[i].clone(), existing.nodes[i + 1].clone()));
                }
            }
            let mut excluded_nodes: HashSet<String> = root_path[..root_path.len() - 1].iter().cloned().collect();
            excluded_nodes.remove(spur_node);

            let root_cost: f64 = root_path
                .windows(2)
                .map(|pair| {
                    graph
                        .get(&pair[0])
                        .and_then(|adjs| adjs.iter().find(|a| a.neighbor_id == pair[1]))
                        .map(|a| a.cost)
                        .unwrap_or(0.0)
                })
                .sum();

            if let Some(spur_path) = shortest_path_excluding(graph, spur_node, destination, max_hops, &excluded_nodes, &excluded_edges) {
                let mut total_nodes = root_path[..root_path.len() - 1].to_vec();
                total_nodes.extend(spur_path.nodes.clone());
                if total_nodes.iter().collect::<HashSet<_>>().len() == total_nodes.len() {
                    let candidate = Path::new(destination.to_owned(), total_nodes, root_cost + spur_path.cost);
                    if !accepted.contains(&candidate) && !candidates.contains(&candidate) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap_or(Ordering::Equal));
        accepted.push(candidates.remove(0));
    }

    accepted
}

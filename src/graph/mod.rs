//! Commit graph assembly: generation numbers, display ordering, and lane
//! assignment for history rendering.

use crate::error::{EngineError, EngineResult};
use crate::git::parser::CommitRecord;
use std::collections::HashMap;

/// A commit plus its computed position in the rendered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGraphNode {
    pub commit: CommitRecord,
    /// Longest-path distance from a root commit.
    pub generation: u32,
    /// Column assigned for rendering.
    pub lane: usize,
}

/// The built graph, nodes in display order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitGraph {
    nodes: Vec<CommitGraphNode>,
    index: HashMap<String, usize>,
    lane_count: usize,
}

impl CommitGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[CommitGraphNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&CommitGraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Display row of a commit, for selection restore in history views.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of columns the rendered graph needs.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }
}

/// Builds a [`CommitGraph`] from an unordered set of commit records.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Assemble the graph.
    ///
    /// Parents absent from the input (truncated history) are ignored, which
    /// makes their children synthetic roots. A cyclic parent chain is data
    /// corruption and fails the whole build.
    ///
    /// The result is deterministic for identical input regardless of record
    /// order: display order is generation descending, then committer time
    /// descending, then commit id.
    pub fn build(records: Vec<CommitRecord>) -> EngineResult<CommitGraph> {
        let by_id: HashMap<&str, &CommitRecord> =
            records.iter().map(|r| (r.id.as_str(), r)).collect();

        let generations = compute_generations(&records, &by_id)?;

        let mut order: Vec<&CommitRecord> = records.iter().collect();
        order.sort_by(|a, b| {
            generations[b.id.as_str()]
                .cmp(&generations[a.id.as_str()])
                .then(b.committer.when.cmp(&a.committer.when))
                .then(a.id.cmp(&b.id))
        });

        let lanes = assign_lanes(&order, &by_id);

        let mut nodes = Vec::with_capacity(order.len());
        let mut index = HashMap::with_capacity(order.len());
        let mut lane_count = 0;
        for (row, record) in order.iter().enumerate() {
            let lane = lanes[row];
            lane_count = lane_count.max(lane + 1);
            index.insert(record.id.clone(), row);
            nodes.push(CommitGraphNode {
                commit: (*record).clone(),
                generation: generations[record.id.as_str()],
                lane,
            });
        }

        Ok(CommitGraph {
            nodes,
            index,
            lane_count,
        })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Generation per commit: roots at 0, otherwise 1 + max over present parents.
///
/// Iterative DFS with tri-color marking; meeting an in-progress node through
/// a parent edge means the parent chain loops back on itself.
fn compute_generations<'a>(
    records: &'a [CommitRecord],
    by_id: &HashMap<&'a str, &'a CommitRecord>,
) -> EngineResult<HashMap<&'a str, u32>> {
    let mut marks: HashMap<&str, Mark> = records
        .iter()
        .map(|r| (r.id.as_str(), Mark::Unvisited))
        .collect();
    let mut generations: HashMap<&str, u32> = HashMap::with_capacity(records.len());

    for record in records {
        if marks[record.id.as_str()] == Mark::Done {
            continue;
        }

        let mut stack: Vec<&str> = vec![record.id.as_str()];
        while let Some(&current) = stack.last() {
            match marks[current] {
                Mark::Unvisited => {
                    marks.insert(current, Mark::InProgress);
                    for parent in present_parents(by_id[current], by_id) {
                        match marks[parent] {
                            Mark::Unvisited => stack.push(parent),
                            Mark::InProgress => {
                                return Err(EngineError::GraphInconsistency(format!(
                                    "cyclic parent chain through {current}"
                                )))
                            }
                            Mark::Done => {}
                        }
                    }
                }
                Mark::InProgress => {
                    let generation = present_parents(by_id[current], by_id)
                        .map(|p| generations[p])
                        .max()
                        .map(|g| g + 1)
                        .unwrap_or(0);
                    generations.insert(current, generation);
                    marks.insert(current, Mark::Done);
                    stack.pop();
                }
                Mark::Done => {
                    stack.pop();
                }
            }
        }
    }

    Ok(generations)
}

fn present_parents<'a>(
    record: &'a CommitRecord,
    by_id: &HashMap<&'a str, &'a CommitRecord>,
) -> impl Iterator<Item = &'a str> + 'a {
    let present: Vec<&'a str> = record
        .parents
        .iter()
        .map(String::as_str)
        .filter(|p| by_id.contains_key(p))
        .map(|p| by_id[p].id.as_str())
        .collect();
    present.into_iter()
}

/// Greedy column packing over the display order.
///
/// Each active lane holds the commit id it expects next. A commit lands in
/// the leftmost lane expecting it; every other lane expecting it closes
/// (merge fan-in frees columns). The first present parent continues the
/// commit's lane, remaining parents open the leftmost free lane.
fn assign_lanes(
    order: &[&CommitRecord],
    by_id: &HashMap<&str, &CommitRecord>,
) -> Vec<usize> {
    let mut lanes: Vec<Option<String>> = Vec::new();
    let mut assigned = Vec::with_capacity(order.len());

    for record in order {
        let expecting: Vec<usize> = lanes
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_deref() == Some(record.id.as_str()))
            .map(|(i, _)| i)
            .collect();

        let lane = match expecting.split_first() {
            Some((&first, rest)) => {
                for &other in rest {
                    lanes[other] = None;
                }
                first
            }
            None => allocate(&mut lanes),
        };

        let mut parents = record
            .parents
            .iter()
            .filter(|p| by_id.contains_key(p.as_str()));
        lanes[lane] = parents.next().cloned();
        for parent in parents {
            let already_tracked = lanes.iter().any(|l| l.as_deref() == Some(parent.as_str()));
            if !already_tracked {
                let idx = allocate(&mut lanes);
                lanes[idx] = Some(parent.clone());
            }
        }

        assigned.push(lane);
    }

    assigned
}

fn allocate(lanes: &mut Vec<Option<String>>) -> usize {
    match lanes.iter().position(Option::is_none) {
        Some(free) => free,
        None => {
            lanes.push(None);
            lanes.len() - 1
        }
    }
}

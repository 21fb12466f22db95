use strata_core::{Aggregation, Observation, Timespan};

use super::node::{InternalNode, LeafNode, Node};

/// The result of a resolution-bounded range query: either raw observations
/// (when the tree has fewer than `min_count` observations in range, or the
/// descent reached the leaves) or pre-aggregated summaries (when an
/// internal level already had enough nodes to satisfy `min_count`).
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// Raw observations, in time order of traversal.
    Observations(Vec<Observation>),
    /// Aggregated summaries, in time order of traversal.
    Aggregations(Vec<Aggregation>),
}

impl QueryResult {
    /// Number of elements in this result, whichever variant it is.
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Observations(v) => v.len(),
            QueryResult::Aggregations(v) => v.len(),
        }
    }

    /// Whether this result holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A time-indexed aggregating tree (TAT): owns the current root node and the
/// policy for growing it as observations arrive.
///
/// The tree grows upward only: when the current root seals (because its own
/// rightmost-spine append spilled into a new sibling of the same height), a
/// fresh internal node one level taller is installed as the new root, with
/// the old root and the new sibling as its two children. Leaves never shrink
/// and only the root ever changes height, so every leaf stays at the same
/// depth.
#[derive(Debug, Clone)]
pub struct Tat {
    root: Node,
}

impl Tat {
    /// A brand-new, empty tree.
    pub fn new() -> Self {
        Tat {
            root: Node::Leaf(LeafNode::new()),
        }
    }

    /// Appends a single observation, growing the tree if the root saturates.
    pub fn append(&mut self, obs: Observation) {
        if let Some(sibling) = self.root.append(obs) {
            self.grow(sibling);
        }
    }

    /// Appends a sequence of observations in order.
    pub fn extend(&mut self, observations: impl IntoIterator<Item = Observation>) {
        for obs in observations {
            self.append(obs);
        }
    }

    fn grow(&mut self, sibling: Node) {
        let old_root = std::mem::replace(&mut self.root, Node::Leaf(LeafNode::new()));
        self.root = Node::Internal(InternalNode::from_two_children(old_root, sibling));
    }

    /// Total number of observations ever appended.
    pub fn len(&self) -> usize {
        self.root.aggregation().metric.count() as usize
    }

    /// Whether no observations have been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The aggregation covering every observation in the tree.
    ///
    /// Returns `None` for an empty tree, since there is no sample to anchor
    /// a timespan on.
    pub fn aggregation(&self) -> Option<Aggregation> {
        if self.is_empty() {
            None
        } else {
            Some(self.root.aggregation())
        }
    }

    /// Every observation in the tree, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        TatIter::new(&self.root)
    }

    /// The most recently appended observation.
    pub fn last(&self) -> Option<Observation> {
        self.root.last()
    }

    /// Resolution-bounded range query (see the module-level algorithm
    /// description): descends the tree one level at a time, refining the
    /// first and last node of the current frontier by range and the middle
    /// nodes wholesale, until the frontier has at least `min_count`
    /// elements or bottoms out at raw observations.
    pub fn query(&self, span: Timespan, min_count: usize) -> QueryResult {
        if span.is_empty() || self.is_empty() {
            return QueryResult::Observations(Vec::new());
        }

        let mut frontier = match &self.root {
            Node::Leaf(_) => Frontier::Observations(self.root.select_range_observations(span)),
            Node::Internal(_) => Frontier::Nodes(self.root.select_range_nodes(span)),
        };

        while let Frontier::Nodes(nodes) = &frontier {
            if nodes.is_empty() || nodes.len() >= min_count {
                break;
            }
            frontier = descend(nodes, span);
        }

        match frontier {
            Frontier::Nodes(nodes) => {
                QueryResult::Aggregations(nodes.iter().map(|n| n.aggregation()).collect())
            }
            Frontier::Observations(obs) => QueryResult::Observations(obs),
        }
    }

    /// Exact aggregation of everything whose timestamp lies in `span`.
    /// Returns `None` on an empty intersection, including when `span` itself
    /// is reversed (`begin > end`).
    pub fn query_metrics(&self, span: Timespan) -> Option<Aggregation> {
        if span.is_empty() {
            return None;
        }
        let mut pieces = Vec::new();
        self.root.collect_exact(span, &mut pieces);
        if pieces.is_empty() {
            None
        } else {
            Some(Aggregation::from_aggregations(&pieces))
        }
    }

    /// Nearest observation at-or-before `t`, found by descending along the
    /// child whose timespan contains `t` (or, if none does, the rightmost
    /// child whose timespan ends at or before `t`), then scanning the leaf.
    pub fn query_value(&self, t: f64) -> Option<Observation> {
        if self.is_empty() {
            return None;
        }
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(leaf) => {
                    return leaf
                        .select_all()
                        .iter()
                        .rev()
                        .find(|obs| obs.timestamp <= t)
                        .cloned();
                }
                Node::Internal(internal) => {
                    let children = internal.select_all();
                    let chosen = children
                        .iter()
                        .find(|c| c.aggregation().timespan.contains(t))
                        .or_else(|| {
                            children
                                .iter()
                                .rev()
                                .find(|c| c.aggregation().timespan.end <= t)
                        })
                        .or_else(|| children.first());
                    match chosen {
                        Some(next) => node = next,
                        None => return None,
                    }
                }
            }
        }
    }
}

impl Default for Tat {
    fn default() -> Self {
        Self::new()
    }
}

/// The current resolution-bounded query frontier: a list of same-height
/// nodes still awaiting a verdict, or the raw observations reached once the
/// frontier has descended past the leaves.
enum Frontier<'a> {
    Nodes(Vec<&'a Node>),
    Observations(Vec<Observation>),
}

/// One step of the range-query descent: refine the first and last element
/// of `nodes` by `select_range`, and every middle element (already known to
/// be wholly inside `span`) by `select_all`. `nodes` are all the same
/// height, so whether this step lands on another level of nodes or on raw
/// observations depends only on the first element's kind. `nodes` is held by
/// reference throughout, so a middle element passed wholesale to
/// `select_all_nodes` is borrowed, not deep-copied.
fn descend<'a>(nodes: &[&'a Node], span: Timespan) -> Frontier<'a> {
    if matches!(nodes.first(), Some(Node::Leaf(_))) {
        let mut out = Vec::new();
        match nodes.len() {
            0 => {}
            1 => out.extend(nodes[0].select_range_observations(span)),
            _ => {
                out.extend(nodes[0].select_range_observations(span));
                for mid in &nodes[1..nodes.len() - 1] {
                    out.extend(mid.select_all_observations());
                }
                out.extend(nodes[nodes.len() - 1].select_range_observations(span));
            }
        }
        Frontier::Observations(out)
    } else {
        let mut out = Vec::new();
        match nodes.len() {
            0 => {}
            1 => out.extend(nodes[0].select_range_nodes(span)),
            _ => {
                out.extend(nodes[0].select_range_nodes(span));
                for mid in &nodes[1..nodes.len() - 1] {
                    out.extend(mid.select_all_nodes());
                }
                out.extend(nodes[nodes.len() - 1].select_range_nodes(span));
            }
        }
        Frontier::Nodes(out)
    }
}

struct TatIter<'a> {
    stack: Vec<(&'a Node, usize)>,
}

impl<'a> TatIter<'a> {
    fn new(root: &'a Node) -> Self {
        TatIter {
            stack: vec![(root, 0)],
        }
    }
}

impl<'a> Iterator for TatIter<'a> {
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        loop {
            let (node, idx) = self.stack.last_mut()?;
            match node {
                Node::Leaf(leaf) => {
                    let obs = leaf.select_all().get(*idx).cloned();
                    if obs.is_some() {
                        *idx += 1;
                        return obs;
                    } else {
                        self.stack.pop();
                    }
                }
                Node::Internal(internal) => {
                    let children = internal.select_all();
                    if *idx < children.len() {
                        let child = &children[*idx];
                        *idx += 1;
                        self.stack.push((child, 0));
                    } else {
                        self.stack.pop();
                    }
                }
            }
        }
    }
}

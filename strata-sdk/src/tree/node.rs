use strata_core::{Aggregation, Observation, Timespan};

/// Maximum number of raw observations held directly by a leaf before it
/// seals and a new sibling leaf is started.
pub const LEAF_CAP: usize = 32;

/// Maximum number of children an internal node holds before it seals and a
/// new sibling internal node is started.
pub const FANOUT: usize = 5;

/// A tagged node in the tree: either a leaf holding raw observations, or an
/// internal node holding same-height children.
///
/// Modeled as an enum rather than a trait-object hierarchy: every
/// polymorphic operation below is a two-armed match, and there is no need
/// for virtual dispatch or a parent back-pointer.
#[derive(Debug, Clone)]
pub enum Node {
    /// A leaf holding raw observations.
    Leaf(LeafNode),
    /// An internal node holding same-height children.
    Internal(InternalNode),
}

impl Node {
    /// Appends `obs` to the rightmost part of this node. Returns `Some` with
    /// a new sibling node (same height as `self`) if the append caused a
    /// seal; `self` is otherwise mutated in place and `None` is returned.
    pub fn append(&mut self, obs: Observation) -> Option<Node> {
        match self {
            Node::Leaf(leaf) => leaf.append(obs).map(Node::Leaf),
            Node::Internal(internal) => internal.append(obs).map(Node::Internal),
        }
    }

    /// The aggregation covering every observation below this node.
    pub fn aggregation(&self) -> Aggregation {
        match self {
            Node::Leaf(leaf) => leaf.aggregation().clone(),
            Node::Internal(internal) => internal.aggregation(),
        }
    }

    /// Height of this node: `0` for a leaf, one more than its children's
    /// height for an internal node.
    pub fn height(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Internal(internal) => internal.height,
        }
    }

    /// Children whose timespan overlaps `span`, borrowed rather than cloned:
    /// the query frontier that calls this only ever needs to read a few
    /// fields off each node, and cloning here would otherwise deep-copy
    /// every observation in every selected child's whole subtree.
    pub(crate) fn select_range_nodes(&self, span: Timespan) -> Vec<&Node> {
        match self {
            Node::Leaf(_) => Vec::new(),
            Node::Internal(internal) => internal.select_range(span),
        }
    }

    /// All children, borrowed. See [`select_range_nodes`](Node::select_range_nodes)
    /// for why this avoids cloning.
    pub(crate) fn select_all_nodes(&self) -> Vec<&Node> {
        match self {
            Node::Leaf(_) => Vec::new(),
            Node::Internal(internal) => internal.select_all().iter().collect(),
        }
    }

    pub(crate) fn select_range_observations(&self, span: Timespan) -> Vec<Observation> {
        match self {
            Node::Leaf(leaf) => leaf.select_range(span),
            Node::Internal(_) => Vec::new(),
        }
    }

    pub(crate) fn select_all_observations(&self) -> Vec<Observation> {
        match self {
            Node::Leaf(leaf) => leaf.select_all().to_vec(),
            Node::Internal(_) => Vec::new(),
        }
    }

    /// Last observation under this node, in insertion order.
    pub fn last(&self) -> Option<Observation> {
        match self {
            Node::Leaf(leaf) => leaf.last().cloned(),
            Node::Internal(internal) => internal.children.last().and_then(Node::last),
        }
    }

    /// Collects every whole sub-aggregation covered by `span`, and every
    /// individually-filtered observation from partially-covered leaves, into
    /// `out`. Used by the exact range-aggregation query (`query_metrics`).
    pub(crate) fn collect_exact(&self, span: Timespan, out: &mut Vec<Aggregation>) {
        let agg = self.aggregation();
        if !agg.timespan.overlaps(&span) {
            return;
        }
        if span.covers(&agg.timespan) {
            out.push(agg);
            return;
        }
        match self {
            Node::Leaf(leaf) => {
                let filtered = leaf.select_range(span);
                if let Ok(agg) = Aggregation::from_samples(&filtered) {
                    out.push(agg);
                }
            }
            Node::Internal(internal) => {
                for child in &internal.children {
                    child.collect_exact(span, out);
                }
            }
        }
    }
}

/// A leaf node: an append-only vector of raw observations plus a cached
/// aggregation kept in lockstep with it.
#[derive(Debug, Clone)]
pub struct LeafNode {
    observations: Vec<Observation>,
    aggregation: Option<Aggregation>,
}

impl LeafNode {
    /// An empty leaf with no observations yet.
    pub fn new() -> Self {
        LeafNode {
            observations: Vec::with_capacity(LEAF_CAP),
            aggregation: None,
        }
    }

    fn with_first(obs: Observation) -> Self {
        let mut leaf = LeafNode::new();
        leaf.push(obs);
        leaf
    }

    fn push(&mut self, obs: Observation) {
        let sample_agg =
            Aggregation::from_sample(&obs).expect("registry rejects non-finite scalars before append");
        self.aggregation = Some(match &self.aggregation {
            Some(agg) => agg.combine(&sample_agg),
            None => sample_agg,
        });
        self.observations.push(obs);
    }

    /// Appends `obs`, returning a new sibling leaf holding it if this leaf
    /// is already at [`LEAF_CAP`].
    pub fn append(&mut self, obs: Observation) -> Option<LeafNode> {
        if self.observations.len() < LEAF_CAP {
            self.push(obs);
            None
        } else {
            Some(LeafNode::with_first(obs))
        }
    }

    /// The cached aggregation of this leaf's observations, if any have been
    /// appended yet.
    pub fn aggregation(&self) -> &Aggregation {
        self.aggregation
            .as_ref()
            .expect("leaf aggregation requested before any observation was appended")
    }

    /// All observations whose timestamp lies within `span`, preserving
    /// insertion order.
    pub fn select_range(&self, span: Timespan) -> Vec<Observation> {
        match &self.aggregation {
            None => Vec::new(),
            Some(agg) if !agg.timespan.overlaps(&span) => Vec::new(),
            Some(_) => self
                .observations
                .iter()
                .filter(|obs| span.contains(obs.timestamp))
                .cloned()
                .collect(),
        }
    }

    /// All observations in insertion order.
    pub fn select_all(&self) -> &[Observation] {
        &self.observations
    }

    /// The most recently appended observation.
    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Number of observations held directly by this leaf.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether this leaf holds no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}

/// An internal node: an append-only vector of same-height children plus a
/// cached aggregation that is `None` until the node seals.
#[derive(Debug, Clone)]
pub struct InternalNode {
    children: Vec<Node>,
    height: usize,
    sealed_aggregation: Option<Aggregation>,
}

impl InternalNode {
    /// A new internal node one level above `height`, with no children yet.
    pub fn new(height: usize) -> Self {
        InternalNode {
            children: Vec::with_capacity(FANOUT),
            height,
            sealed_aggregation: None,
        }
    }

    /// Wraps two already-built nodes (the previous root and its new
    /// sibling) as the two children of a freshly grown root.
    pub fn from_two_children(left: Node, right: Node) -> Self {
        let height = left.height() + 1;
        debug_assert_eq!(height, right.height() + 1);
        InternalNode {
            children: vec![left, right],
            height,
            sealed_aggregation: None,
        }
    }

    /// Appends `child` directly, skipping the normal `Node::append`
    /// descent. Used only to seed a brand-new internal node with a single
    /// child during root growth.
    pub fn from_single_child(child: Node) -> Self {
        let height = child.height() + 1;
        InternalNode {
            children: vec![child],
            height,
            sealed_aggregation: None,
        }
    }

    /// Height of this node above its leaves (leaves are height `0`).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Recursively appends `obs` to the rightmost child, sealing and
    /// spilling into a new sibling if that child, or this node itself, is
    /// full.
    pub fn append(&mut self, obs: Observation) -> Option<InternalNode> {
        let last = self
            .children
            .last_mut()
            .expect("an internal node always has at least one child");
        if let Some(new_child) = last.append(obs) {
            self.append_child(new_child)
        } else {
            None
        }
    }

    /// Appends `child` if there is room; otherwise seals this node (caching
    /// its aggregation) and returns a new sibling node holding only `child`.
    pub fn append_child(&mut self, child: Node) -> Option<InternalNode> {
        debug_assert_eq!(
            child.height(),
            self.children.first().map(Node::height).unwrap_or(child.height()),
            "all children of an internal node must share a height"
        );
        if self.children.len() < FANOUT {
            self.children.push(child);
            None
        } else {
            self.seal();
            Some(InternalNode::from_single_child(child))
        }
    }

    fn seal(&mut self) {
        if self.sealed_aggregation.is_none() {
            self.sealed_aggregation = Some(self.compute_aggregation());
        }
    }

    fn compute_aggregation(&self) -> Aggregation {
        let aggs: Vec<Aggregation> = self.children.iter().map(Node::aggregation).collect();
        Aggregation::from_aggregations(&aggs)
    }

    /// The aggregation covering every descendant of this node: the cached
    /// value if sealed, recomputed from current children otherwise.
    pub fn aggregation(&self) -> Aggregation {
        match &self.sealed_aggregation {
            Some(agg) => agg.clone(),
            None => self.compute_aggregation(),
        }
    }

    /// Children whose own timespan overlaps `span`, in order; empty if this
    /// node's own aggregation does not overlap `span` at all.
    pub fn select_range(&self, span: Timespan) -> Vec<&Node> {
        let agg = self.aggregation();
        if !agg.timespan.overlaps(&span) {
            return Vec::new();
        }
        self.children
            .iter()
            .filter(|child| child.aggregation().timespan.overlaps(&span))
            .collect()
    }

    /// All children, in order.
    pub fn select_all(&self) -> &[Node] {
        &self.children
    }
}

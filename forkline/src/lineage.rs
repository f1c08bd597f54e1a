//! Fork lineage forest.
//!
//! Edges come from `ForkRegistered` logs in a trailing block window. When the
//! window holds none, a best-effort per-item scan (metadata documents or
//! registry `parentOf` calls) fills in. Every item `1..=totalSupply` without
//! a parent becomes a root.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::abi;
use crate::config::{
    ContractsConfig, DuplicateChildPolicy, FallbackStrategy, ForklineConfig, LineageConfig,
};
use crate::contract::ContractReader;
use crate::error::{with_deadline, Result};
use crate::events::{DecodedEvent, EventName, EventRegistry};
use crate::metadata::MetadataResolver;
use crate::source::ChainLogSource;
use crate::types::{ForkEdge, TokenId};
use crate::window::{current_window, fetch_logs};

/// Where a forest's edges came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeOrigin {
    /// `ForkRegistered` logs
    Logs,
    /// `parentTokenId` in metadata documents
    MetadataScan,
    /// Registry `parentOf` calls
    RegistryCalls,
    /// No source produced an edge
    None,
}

/// Node visited by [`LineageForest::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkEntry {
    pub id: TokenId,
    pub depth: usize,
}

/// Search match with its ancestor path, root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: TokenId,
    pub depth: usize,
    pub path: Vec<TokenId>,
}

/// Parent/child adjacency over all content items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageForest {
    /// Parent → children in discovery order. Only parents with children.
    children: BTreeMap<TokenId, Vec<TokenId>>,
    /// Items with no parent, ascending
    roots: Vec<TokenId>,
    #[serde(skip)]
    parents: BTreeMap<TokenId, TokenId>,
    total_supply: u64,
    origin: EdgeOrigin,
    /// Items the fallback scan could not read
    skipped: Vec<TokenId>,
}

impl LineageForest {
    /// Build from edges in discovery order.
    ///
    /// Self-loops are dropped. A child seen under a second parent is resolved
    /// by `policy`, with a warning either way.
    pub fn from_edges(
        total_supply: u64,
        edges: impl IntoIterator<Item = ForkEdge>,
        policy: DuplicateChildPolicy,
    ) -> Self {
        let mut children: BTreeMap<TokenId, Vec<TokenId>> = BTreeMap::new();
        let mut parents: BTreeMap<TokenId, TokenId> = BTreeMap::new();

        for edge in edges {
            if edge.parent == edge.child {
                warn!(token_id = edge.child, "dropping self-referencing fork edge");
                continue;
            }

            match parents.get(&edge.child).copied() {
                Some(existing) if existing == edge.parent => {
                    debug!(parent = edge.parent, child = edge.child, "repeated fork edge");
                    continue;
                }
                Some(existing) => match policy {
                    DuplicateChildPolicy::FirstSeen => {
                        warn!(
                            child = edge.child,
                            kept = existing,
                            ignored = edge.parent,
                            "child registered under more than one parent"
                        );
                        continue;
                    }
                    DuplicateChildPolicy::LastSeen => {
                        warn!(
                            child = edge.child,
                            replaced = existing,
                            kept = edge.parent,
                            "child registered under more than one parent"
                        );
                        if let Some(list) = children.get_mut(&existing) {
                            list.retain(|c| *c != edge.child);
                            if list.is_empty() {
                                children.remove(&existing);
                            }
                        }
                    }
                },
                None => {}
            }

            parents.insert(edge.child, edge.parent);
            children.entry(edge.parent).or_default().push(edge.child);
        }

        let roots = (1..=total_supply)
            .filter(|id| !parents.contains_key(id))
            .collect();

        Self {
            children,
            roots,
            parents,
            total_supply,
            origin: EdgeOrigin::None,
            skipped: Vec::new(),
        }
    }

    fn with_origin(mut self, origin: EdgeOrigin, skipped: Vec<TokenId>) -> Self {
        self.origin = if self.parents.is_empty() { EdgeOrigin::None } else { origin };
        self.skipped = skipped;
        self
    }

    pub fn roots(&self) -> &[TokenId] {
        &self.roots
    }

    pub fn children(&self) -> &BTreeMap<TokenId, Vec<TokenId>> {
        &self.children
    }

    pub fn children_of(&self, id: TokenId) -> &[TokenId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent_of(&self, id: TokenId) -> Option<TokenId> {
        self.parents.get(&id).copied()
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn origin(&self) -> EdgeOrigin {
        self.origin
    }

    pub fn skipped(&self) -> &[TokenId] {
        &self.skipped
    }

    pub fn edge_count(&self) -> usize {
        self.parents.len()
    }

    fn contains(&self, id: TokenId) -> bool {
        (1..=self.total_supply).contains(&id)
            || self.parents.contains_key(&id)
            || self.children.contains_key(&id)
    }

    /// Pre-order traversal from each root, with depth. Each node is visited once.
    pub fn walk(&self) -> Vec<WalkEntry> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        for root in &self.roots {
            self.walk_from(*root, 0, &mut visited, &mut out);
        }
        out
    }

    fn walk_from(
        &self,
        start: TokenId,
        start_depth: usize,
        visited: &mut HashSet<TokenId>,
        out: &mut Vec<WalkEntry>,
    ) {
        let mut stack = vec![(start, start_depth)];
        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            out.push(WalkEntry { id, depth });
            for child in self.children_of(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
    }

    /// Every node below `id`, pre-order.
    pub fn descendants(&self, id: TokenId) -> Vec<TokenId> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.walk_from(id, 0, &mut visited, &mut out);
        out.into_iter().skip(1).map(|e| e.id).collect()
    }

    /// Whether `id` is `root` or one of its descendants.
    pub fn subtree_contains(&self, root: TokenId, id: TokenId) -> bool {
        root == id || self.descendants(root).contains(&id)
    }

    /// Ancestors of `id` from the topmost down to `id` itself.
    ///
    /// `None` for unknown ids and for ids whose parent chain loops.
    pub fn path_to(&self, id: TokenId) -> Option<Vec<TokenId>> {
        if !self.contains(id) {
            return None;
        }
        let mut path = vec![id];
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if !seen.insert(parent) {
                return None;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Distance from the topmost ancestor. Roots are at depth 0.
    pub fn depth_of(&self, id: TokenId) -> Option<usize> {
        self.path_to(id).map(|p| p.len() - 1)
    }

    /// Nodes whose decimal id contains `query`, in walk order.
    ///
    /// Matching is per node at any depth, even below a non-matching parent.
    /// Each hit carries its ancestor path so callers can render it in place.
    /// See [`Self::search_pruned`] for the tree-filter variant.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim();
        self.walk()
            .into_iter()
            .filter(|entry| entry.id.to_string().contains(needle))
            .map(|entry| self.hit(entry))
            .collect()
    }

    /// Like [`Self::search`], but a node that does not match hides its whole
    /// subtree. A match nested under a non-matching root is not reported.
    pub fn search_pruned(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim();
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(TokenId, usize)> =
            self.roots.iter().rev().map(|root| (*root, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id) || !id.to_string().contains(needle) {
                continue;
            }
            out.push(self.hit(WalkEntry { id, depth }));
            for child in self.children_of(id).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    fn hit(&self, entry: WalkEntry) -> SearchHit {
        SearchHit {
            id: entry.id,
            depth: entry.depth,
            path: self.path_to(entry.id).unwrap_or_else(|| vec![entry.id]),
        }
    }
}

/// Extract a fork edge from a decoded registry event.
pub fn fork_edge(event: &DecodedEvent) -> Option<ForkEdge> {
    if event.event_name != EventName::ForkRegistered {
        return None;
    }
    let parent = event.uint_arg("parentTokenId")?;
    let child = event.uint_arg("childTokenId")?;
    match (abi::to_u64(parent), abi::to_u64(child)) {
        (Some(parent), Some(child)) => Some(ForkEdge::new(parent, child)),
        _ => {
            warn!(
                %parent,
                %child,
                block = event.block_number,
                "fork edge id exceeds u64, skipping"
            );
            None
        }
    }
}

/// Builds a [`LineageForest`] from chain state.
pub struct LineageBuilder {
    source: Arc<dyn ChainLogSource>,
    resolver: Arc<dyn MetadataResolver>,
    reader: ContractReader,
    registry: EventRegistry,
    contracts: ContractsConfig,
    lineage: LineageConfig,
    max_block_range: Option<u64>,
    rpc_timeout: Duration,
}

impl LineageBuilder {
    pub fn new(
        source: Arc<dyn ChainLogSource>,
        resolver: Arc<dyn MetadataResolver>,
        config: &ForklineConfig,
    ) -> Self {
        Self {
            reader: ContractReader::new(source.clone()),
            source,
            resolver,
            registry: EventRegistry::fork_registry(),
            contracts: config.contracts.clone(),
            lineage: config.lineage.clone(),
            max_block_range: config.rpc.max_block_range,
            rpc_timeout: config.rpc_timeout(),
        }
    }

    /// Read supply and edges, falling back to a per-item scan only when the
    /// log window produced no edges.
    pub async fn build_forest(&self) -> Result<LineageForest> {
        let total = with_deadline(
            self.rpc_timeout,
            "totalSupply",
            self.reader.total_supply(self.contracts.content),
        )
        .await?;

        let edges = match self.contracts.registry {
            Some(registry) => self.edges_from_logs(registry).await?,
            None => {
                debug!("no fork registry configured");
                Vec::new()
            }
        };

        let (edges, origin, skipped) = if !edges.is_empty() {
            (edges, EdgeOrigin::Logs, Vec::new())
        } else {
            match (self.lineage.fallback, self.contracts.registry) {
                (FallbackStrategy::Metadata, _) => {
                    let (edges, skipped) = self.edges_from_metadata(total).await;
                    (edges, EdgeOrigin::MetadataScan, skipped)
                }
                (FallbackStrategy::RegistryCall, Some(registry)) => {
                    let (edges, skipped) = self.edges_from_registry_calls(registry, total).await;
                    (edges, EdgeOrigin::RegistryCalls, skipped)
                }
                (FallbackStrategy::RegistryCall, None) => {
                    warn!("registry-call fallback needs a registry address");
                    (Vec::new(), EdgeOrigin::None, Vec::new())
                }
                (FallbackStrategy::None, _) => (Vec::new(), EdgeOrigin::None, Vec::new()),
            }
        };

        let forest = LineageForest::from_edges(total, edges, self.lineage.duplicate_child)
            .with_origin(origin, skipped);

        info!(
            total_supply = total,
            edges = forest.edge_count(),
            roots = forest.roots().len(),
            origin = ?forest.origin(),
            skipped = forest.skipped().len(),
            "lineage forest built"
        );
        Ok(forest)
    }

    async fn edges_from_logs(&self, registry: Address) -> Result<Vec<ForkEdge>> {
        let window =
            current_window(self.source.as_ref(), self.lineage.window_blocks, self.rpc_timeout)
                .await?;
        let logs = fetch_logs(
            self.source.as_ref(),
            registry,
            window,
            self.max_block_range,
            self.rpc_timeout,
        )
        .await?;

        let edges: Vec<ForkEdge> = self
            .registry
            .decode_all(&logs)
            .iter()
            .filter_map(fork_edge)
            .collect();

        debug!(
            from = window.from_block,
            to = window.to_block,
            logs = logs.len(),
            edges = edges.len(),
            "scanned fork registry"
        );
        Ok(edges)
    }

    async fn edges_from_metadata(&self, total: u64) -> (Vec<ForkEdge>, Vec<TokenId>) {
        info!(total_supply = total, "no fork logs in window, scanning metadata");
        let mut edges = Vec::new();
        let mut skipped = Vec::new();

        for id in 1..=total {
            match self.parent_from_metadata(id).await {
                Ok(Some(parent)) => edges.push(ForkEdge::new(parent, id)),
                Ok(None) => {}
                Err(e) => {
                    warn!(token_id = id, error = %e, "skipping item in metadata scan");
                    skipped.push(id);
                }
            }
        }
        (edges, skipped)
    }

    async fn parent_from_metadata(&self, id: TokenId) -> Result<Option<TokenId>> {
        let uri = with_deadline(
            self.rpc_timeout,
            format!("tokenURI({})", id),
            self.reader.token_uri(self.contracts.content, id),
        )
        .await?;
        // The resolver bounds each gateway attempt itself.
        let meta = self.resolver.resolve(&uri).await?;
        Ok(meta.parent_token_id)
    }

    async fn edges_from_registry_calls(
        &self,
        registry: Address,
        total: u64,
    ) -> (Vec<ForkEdge>, Vec<TokenId>) {
        info!(total_supply = total, "no fork logs in window, querying parentOf");
        let mut edges = Vec::new();
        let mut skipped = Vec::new();

        for id in 1..=total {
            let parent = with_deadline(
                self.rpc_timeout,
                format!("parentOf({})", id),
                self.reader.parent_of(registry, id),
            )
            .await;
            match parent {
                Ok(Some(parent)) => edges.push(ForkEdge::new(parent, id)),
                Ok(None) => {}
                Err(e) => {
                    warn!(token_id = id, error = %e, "skipping item in parentOf scan");
                    skipped.push(id);
                }
            }
        }
        (edges, skipped)
    }
}

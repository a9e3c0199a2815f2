//! Incrementally built entity-relationship graph

use crate::{GraphError, InfrastructureDenylist};
use stakeout_domain::{Edge, EdgeKind, Entity, EntityId, EntityKind, EvidenceId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// The investigation graph: typed entities and evidence-backed edges
///
/// Entities are unique by `(kind, key)`; edges by `(from, to, kind)`. Both
/// upserts are idempotent, so replaying an ingestion sequence reproduces the
/// same ids. The denylist is consulted once, at entity creation.
pub struct EntityGraph {
    chain: String,
    denylist: InfrastructureDenylist,
    entities: BTreeMap<EntityId, Entity>,
    entity_index: HashMap<(EntityKind, String), EntityId>,
    edges: Vec<Edge>,
    edge_index: HashMap<(EntityId, EntityId, EdgeKind), usize>,
    next_entity: u64,
}

impl EntityGraph {
    /// Create an empty graph for a chain with the built-in denylist
    pub fn new(chain: impl Into<String>) -> Self {
        Self::with_denylist(chain, InfrastructureDenylist::builtin())
    }

    /// Create an empty graph with an externally loaded denylist
    pub fn with_denylist(chain: impl Into<String>, denylist: InfrastructureDenylist) -> Self {
        Self {
            chain: chain.into(),
            denylist,
            entities: BTreeMap::new(),
            entity_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            next_entity: 1,
        }
    }

    /// Chain this graph was built for
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of logical edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Idempotent entity upsert
    ///
    /// Returns the existing id when `(kind, key)` is already present.
    /// Addresses matching the infrastructure denylist are tagged
    /// `infrastructure=true` at creation: retained as nodes, never clustered.
    /// LP pair entities are infrastructure by construction.
    pub fn upsert_entity(&mut self, kind: EntityKind, key: &str, first_seen: u64) -> EntityId {
        let index_key = (kind, key.to_lowercase());
        if let Some(id) = self.entity_index.get(&index_key) {
            return *id;
        }

        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;

        let mut entity = Entity::new(id, kind, index_key.1.clone(), first_seen);
        if self.denylist.contains(&self.chain, key) || kind == EntityKind::LpPair {
            entity.infrastructure = true;
            debug!(%id, key, "tagged infrastructure entity");
        }

        self.entity_index.insert(index_key, id);
        self.entities.insert(id, entity);
        id
    }

    /// Idempotent edge upsert: merges the observation into an existing edge
    /// or creates one
    pub fn upsert_edge(
        &mut self,
        from: EntityId,
        to: EntityId,
        kind: EdgeKind,
        eid: EvidenceId,
    ) -> Result<(), GraphError> {
        self.entity(from)?;
        self.entity(to)?;

        match self.edge_index.get(&(from, to, kind)) {
            Some(idx) => {
                self.edges[*idx].merge_evidence(eid);
            }
            None => {
                self.edge_index.insert((from, to, kind), self.edges.len());
                self.edges.push(Edge::new(from, to, kind, eid));
            }
        }
        Ok(())
    }

    /// Get an entity by id
    pub fn entity(&self, id: EntityId) -> Result<&Entity, GraphError> {
        self.entities.get(&id).ok_or(GraphError::UnknownEntity(id))
    }

    /// Look up an entity id by kind and key
    pub fn find(&self, kind: EntityKind, key: &str) -> Option<EntityId> {
        self.entity_index.get(&(kind, key.to_lowercase())).copied()
    }

    /// Append an attribute to an entity, citing the establishing observation
    pub fn annotate(
        &mut self,
        id: EntityId,
        name: &str,
        value: &str,
        eid: EvidenceId,
    ) -> Result<(), GraphError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(GraphError::UnknownEntity(id))?;
        entity.push_attribute(name, value, eid);
        Ok(())
    }

    /// All entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All logical edges in creation order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Neighbor set of an entity, optionally restricted to one edge kind
    ///
    /// An edge in either direction makes the other endpoint a neighbor.
    pub fn neighbors(&self, id: EntityId, kind: Option<EdgeKind>) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        for edge in &self.edges {
            if let Some(k) = kind {
                if edge.kind != k {
                    continue;
                }
            }
            if edge.from == id {
                out.insert(edge.to);
            } else if edge.to == id {
                out.insert(edge.from);
            }
        }
        out
    }

    /// Extract the subgraph induced by an entity set
    ///
    /// Entity ids stay stable, so features computed on the subgraph cite the
    /// same entities as the full graph.
    pub fn subgraph(&self, ids: &[EntityId]) -> EntityGraph {
        let keep: BTreeSet<EntityId> = ids.iter().copied().collect();

        let mut out = EntityGraph::with_denylist(self.chain.clone(), self.denylist.clone());
        out.next_entity = self.next_entity;
        for (id, entity) in &self.entities {
            if keep.contains(id) {
                out.entity_index
                    .insert((entity.kind, entity.key.clone()), *id);
                out.entities.insert(*id, entity.clone());
            }
        }
        for edge in &self.edges {
            if keep.contains(&edge.from) && keep.contains(&edge.to) {
                out.edge_index
                    .insert((edge.from, edge.to, edge.kind), out.edges.len());
                out.edges.push(edge.clone());
            }
        }
        out
    }

    /// Wallet entities eligible for clustering (non-infrastructure)
    pub fn clusterable_wallets(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.kind == EntityKind::Wallet && !e.infrastructure)
            .map(|e| e.id)
            .collect()
    }
}

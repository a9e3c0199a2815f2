//! Investigation run state and the analysis pipeline
//!
//! One `Investigation` owns the ledger, graph, claim resolver, and derived
//! scores for a single run. Ingestion is serialized through it (directly or
//! via the [`crate::ingest`] worker); feature extraction and scoring read an
//! immutable snapshot and write back only derived annotations - graph
//! attributes and replay-log entries - never source observations.

use crate::replay::{ObservationDto, ReplayEntry};
use crate::{EngineError, TimelineEvent};
use stakeout_domain::{
    Claim, ClaimKey, ClaimStatus, Cluster, ClusterId, ClusterVerdict, EntityId, EntityKind,
    EvidenceDomain, EvidenceId, FetchError, Observation, ObservationBatch, ObservationDraft,
    ObservationPayload, ObservationSource, QuestionDomain, RunId, SourceTier, TradeSide,
};
use stakeout_features::{
    extract_wallet_features, holder_profiles, insider_inputs, pair_features, FeatureConfig,
    PairFeatures, WalletFeatures,
};
use stakeout_gatekeeper::{
    Completeness, CompletenessConfig, CompletenessGate, EvidenceSummary, HeadlineConclusion, Mode,
};
use stakeout_graph::{EntityGraph, InfrastructureDenylist};
use stakeout_ledger::{EvidenceLedger, LedgerError};
use stakeout_resolver::{ClaimMatrixRow, ClaimResolver};
use stakeout_scorer::{
    build_clusters, classify_insider, detect_suspicious_holders, insider_score, link_confidence,
    score_pairs, FalsePositiveLibrary, FlagConfig, FlaggedHolder, InsiderLabel, LinkInputs,
    ScorerError, ScoringConfig,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Configuration of one investigation run
///
/// Everything tunable lives here so a run is reproducible from its config
/// plus its replay log. Weight and threshold validation happens in
/// [`Investigation::new`], never at score time.
#[derive(Debug, Clone)]
pub struct InvestigationConfig {
    /// Chain under investigation (selects the denylist lists)
    pub chain: String,
    /// Token contract under investigation, if known
    pub token: Option<String>,
    /// Candidate canonical contract address, if one is being verified
    pub candidate_address: Option<String>,
    /// Announcement time used as the timing reference for features
    pub reference_time: Option<u64>,
    /// Feature extraction windows
    pub features: FeatureConfig,
    /// Scoring weights and thresholds
    pub scoring: ScoringConfig,
    /// Completeness gate minimums
    pub completeness: CompletenessConfig,
    /// False-positive pattern library
    pub false_positives: FalsePositiveLibrary,
    /// Holder suspicion flag thresholds
    pub flags: FlagConfig,
    /// Infrastructure denylist
    pub denylist: InfrastructureDenylist,
    /// Confidence-ceiling penalty per acquisition gap
    pub gap_penalty: f64,
    /// Floor the ceiling never drops below
    pub confidence_floor: f64,
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            chain: "bsc".to_string(),
            token: None,
            candidate_address: None,
            reference_time: None,
            features: FeatureConfig::default(),
            scoring: ScoringConfig::default(),
            completeness: CompletenessConfig::default(),
            false_positives: FalsePositiveLibrary::default(),
            flags: FlagConfig::default(),
            denylist: InfrastructureDenylist::builtin(),
            gap_penalty: 0.1,
            confidence_floor: 0.3,
        }
    }
}

impl InvestigationConfig {
    /// Validate all sub-configurations
    pub fn validate(&self) -> Result<(), EngineError> {
        self.scoring.validate()?;
        self.features.validate().map_err(EngineError::Configuration)?;
        self.completeness
            .validate()
            .map_err(EngineError::Configuration)?;
        if !(0.0..=1.0).contains(&self.gap_penalty) {
            return Err(EngineError::Configuration(
                "gap_penalty must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(EngineError::Configuration(
                "confidence_floor must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// A recorded acquisition failure
///
/// Gaps are data, not errors: each one marks its evidence domain Unknown for
/// the gate and lowers the run's confidence ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionGap {
    /// Source descriptor that failed
    pub source: String,
    /// Evidence domain the source would have covered
    pub domain: EvidenceDomain,
    /// The typed failure
    pub error: FetchError,
}

/// What happened to one ingested batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Fresh observations recorded
    pub recorded: usize,
    /// Identical re-fetches resolved to existing EIDs
    pub duplicates: usize,
    /// Malformed observations rejected and logged
    pub rejected: usize,
}

/// The mutable state machine of one investigation run
pub struct Investigation {
    run_id: RunId,
    config: InvestigationConfig,
    ledger: EvidenceLedger,
    graph: EntityGraph,
    resolver: ClaimResolver,
    gaps: Vec<AcquisitionGap>,
    domain_citations: BTreeMap<EvidenceDomain, BTreeSet<EvidenceId>>,
    clusters: Vec<Cluster>,
    insider_labels: BTreeMap<ClusterId, InsiderLabel>,
    flagged_holders: Vec<FlaggedHolder>,
    observed_events: Vec<TimelineEvent>,
    derived_events: Vec<TimelineEvent>,
    replay: Vec<ReplayEntry>,
    derived_edges: BTreeSet<(EntityId, EntityId, &'static str, EvidenceId)>,
    first_trade_seen: bool,
    launch_time: Option<u64>,
    analyzed: bool,
}

impl Investigation {
    /// Start a run with a validated configuration
    pub fn new(config: InvestigationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let graph = EntityGraph::with_denylist(config.chain.clone(), config.denylist.clone());
        let run_id = RunId::new();
        info!(run = %run_id, chain = %config.chain, "investigation started");
        Ok(Self {
            run_id,
            config,
            ledger: EvidenceLedger::new(),
            graph,
            resolver: ClaimResolver::new(),
            gaps: Vec::new(),
            domain_citations: BTreeMap::new(),
            clusters: Vec::new(),
            insider_labels: BTreeMap::new(),
            flagged_holders: Vec::new(),
            observed_events: Vec::new(),
            derived_events: Vec::new(),
            replay: Vec::new(),
            derived_edges: BTreeSet::new(),
            first_trade_seen: false,
            launch_time: None,
            analyzed: false,
        })
    }

    /// This run's identifier
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The run's configuration
    pub fn config(&self) -> &InvestigationConfig {
        &self.config
    }

    /// The evidence ledger
    pub fn ledger(&self) -> &EvidenceLedger {
        &self.ledger
    }

    /// The entity graph
    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Ingest one batch of normalized observations
    ///
    /// Serialization point: callers must not interleave ingestion with
    /// anything else mutating the run. Malformed observations are logged and
    /// skipped; identical re-fetches are no-ops. Any fresh observation marks
    /// previously computed scores stale.
    pub fn ingest_batch(&mut self, batch: ObservationBatch) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        debug!(
            source = %batch.source,
            domain = batch.domain.as_str(),
            count = batch.observations.len(),
            "ingesting batch"
        );
        for draft in batch.observations {
            match self.ingest_draft(batch.domain, draft) {
                Ok(Some(_)) => outcome.recorded += 1,
                Ok(None) => outcome.duplicates += 1,
                Err(_) => outcome.rejected += 1,
            }
        }
        outcome
    }

    /// Fetch one batch from a source and ingest it, or record the gap
    ///
    /// The core never retries; a failed fetch marks the source's domain
    /// Unknown and degrades the confidence ceiling.
    pub fn ingest_source(&mut self, source: &mut dyn ObservationSource) -> IngestOutcome {
        let descriptor = source.descriptor().to_string();
        let domain = source.domain();
        match source.fetch() {
            Ok(batch) => self.ingest_batch(batch),
            Err(error) => {
                self.record_gap(descriptor, domain, error);
                IngestOutcome::default()
            }
        }
    }

    /// Record an acquisition gap
    pub fn record_gap(&mut self, source: String, domain: EvidenceDomain, error: FetchError) {
        warn!(
            source = %source,
            domain = domain.as_str(),
            %error,
            "acquisition gap recorded; domain marked unknown"
        );
        self.gaps.push(AcquisitionGap {
            source,
            domain,
            error,
        });
    }

    /// Record a single draft: ledger, graph, resolver, citations, replay log
    ///
    /// Returns `Ok(Some(eid))` for a fresh observation, `Ok(None)` for an
    /// idempotent duplicate.
    fn ingest_draft(
        &mut self,
        domain: EvidenceDomain,
        draft: ObservationDraft,
    ) -> Result<Option<EvidenceId>, LedgerError> {
        let before = self.ledger.len();
        let eid = self.ledger.record(draft)?;
        if self.ledger.len() == before {
            // Duplicate: state is unchanged, nothing downstream to do.
            return Ok(None);
        }

        self.domain_citations.entry(domain).or_default().insert(eid);

        // The ledger owns the observation; clone what graph building needs.
        let Ok(observation) = self.ledger.get(eid).cloned() else {
            return Ok(Some(eid));
        };
        self.replay.push(ReplayEntry::Observation(
            ObservationDto::from_observation(&observation, domain),
        ));

        self.apply_to_graph(&observation);
        self.apply_to_resolver(&observation);
        self.push_observed_event(&observation);
        self.analyzed = false;
        Ok(Some(eid))
    }

    /// Entity and edge upserts for one observation
    fn apply_to_graph(&mut self, obs: &Observation) {
        let eid = obs.eid;
        match &obs.payload {
            ObservationPayload::Transfer { from, to, at, .. } => {
                let from_id = self.touch_entity(EntityKind::Wallet, from, *at);
                let to_id = self.touch_entity(EntityKind::Wallet, to, *at);
                self.touch_edge(from_id, to_id, stakeout_domain::EdgeKind::Transfer, eid);
            }
            ObservationPayload::Trade { wallet, pair, at, .. } => {
                let wallet_id = self.touch_entity(EntityKind::Wallet, wallet, *at);
                let pair_id = self.touch_entity(EntityKind::LpPair, pair, *at);
                self.touch_edge(wallet_id, pair_id, stakeout_domain::EdgeKind::Trade, eid);
            }
            ObservationPayload::HolderSnapshot { token, holders, at } => {
                self.touch_entity(EntityKind::Contract, token, *at);
                for holder in holders {
                    self.touch_entity(EntityKind::Wallet, &holder.address, *at);
                }
            }
            ObservationPayload::SocialPost {
                handle, mentioned, at, ..
            } => {
                let handle_id = self.touch_entity(EntityKind::SocialHandle, handle, *at);
                for key in mentioned {
                    let target = self.touch_entity(classify_key(key), key, *at);
                    self.touch_edge(handle_id, target, stakeout_domain::EdgeKind::Mentions, eid);
                }
            }
            ObservationPayload::DomainRecord {
                domain, links_to, at, ..
            } => {
                let domain_id = self.touch_entity(EntityKind::Domain, domain, *at);
                for key in links_to {
                    let target = self.touch_entity(classify_key(key), key, *at);
                    self.touch_edge(domain_id, target, stakeout_domain::EdgeKind::Links, eid);
                }
            }
            ObservationPayload::ClaimAssertion { .. } => {}
        }
    }

    /// Upsert an entity, logging a replay entry only on creation
    fn touch_entity(&mut self, kind: EntityKind, key: &str, first_seen: u64) -> EntityId {
        if let Some(id) = self.graph.find(kind, key) {
            return id;
        }
        let id = self.graph.upsert_entity(kind, key, first_seen);
        self.replay.push(ReplayEntry::EntityUpsert {
            id: id.value(),
            kind: kind.as_str().to_string(),
            key: key.to_lowercase(),
            first_seen,
        });
        id
    }

    /// Upsert an edge and log the evidence merge
    fn touch_edge(
        &mut self,
        from: EntityId,
        to: EntityId,
        kind: stakeout_domain::EdgeKind,
        eid: EvidenceId,
    ) {
        // Both endpoints were just upserted; the only failure mode is an
        // unknown entity, which cannot happen here.
        if self.graph.upsert_edge(from, to, kind, eid).is_ok() {
            self.replay.push(ReplayEntry::EdgeUpsert {
                from: from.value(),
                to: to.value(),
                kind: kind.as_str().to_string(),
                eid: eid.value(),
            });
        }
    }

    /// Claim-status transitions, with turning points on decisive moves
    fn apply_to_resolver(&mut self, obs: &Observation) {
        let ObservationPayload::ClaimAssertion { claim_key, at, .. } = &obs.payload else {
            return;
        };
        let key = stakeout_domain::ClaimKey::custom(claim_key.clone());
        let previous = self
            .resolver
            .claim(&key)
            .map(|c| c.status)
            .unwrap_or(ClaimStatus::Proposed);

        let Some(next) = self.resolver.observe(obs) else {
            return;
        };

        if next != previous
            && matches!(next, ClaimStatus::Confirmed | ClaimStatus::Contradicted)
        {
            self.observed_events.push(
                TimelineEvent::observed(
                    *at,
                    obs.eid,
                    format!("claim '{}' became {}", claim_key, next.as_str()),
                )
                .turning(),
            );
        }
    }

    /// Observation-backed timeline event, with launch as a turning point
    fn push_observed_event(&mut self, obs: &Observation) {
        let at = obs.payload.occurred_at();
        let description = describe(obs);
        let mut event = TimelineEvent::observed(at, obs.eid, description);

        if let ObservationPayload::Trade { at: trade_at, .. } = &obs.payload {
            self.launch_time = Some(match self.launch_time {
                Some(current) => current.min(*trade_at),
                None => *trade_at,
            });
            if !self.first_trade_seen {
                self.first_trade_seen = true;
                event = event.turning();
            }
        }
        self.observed_events.push(event);
    }

    /// Run the full analysis pipeline over the current snapshot
    ///
    /// Features, pair scores, clusters, insider scores, false-positive
    /// review, holder flags. Derived scores are recomputed from scratch -
    /// nothing stale survives - and written back as graph attributes and
    /// replay entries.
    pub fn analyze(&mut self) -> Result<(), EngineError> {
        let wallets = self.graph.clusterable_wallets();
        debug!(wallets = wallets.len(), "analysis pass starting");

        let mut features: BTreeMap<EntityId, WalletFeatures> = BTreeMap::new();
        for id in &wallets {
            features.insert(
                *id,
                extract_wallet_features(
                    &self.ledger,
                    &self.graph,
                    *id,
                    self.config.reference_time,
                    &self.config.features,
                ),
            );
        }

        self.derive_flow_edges(&features);

        let mut pairs: Vec<PairFeatures> = Vec::new();
        let ids: Vec<EntityId> = features.keys().copied().collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                pairs.push(pair_features(&features[a], &features[b], &self.config.features));
            }
        }

        let scored = score_pairs(&pairs, &self.config.scoring)?;
        let mut clusters = build_clusters(&self.graph, &scored, &self.config.scoring);

        self.insider_labels.clear();
        for cluster in &mut clusters {
            let members: Vec<&WalletFeatures> = cluster
                .members
                .iter()
                .map(|id| {
                    features
                        .get(id)
                        .ok_or(ScorerError::IncompleteFeature(*id))
                })
                .collect::<Result<_, _>>()?;

            let inputs = insider_inputs(
                &members,
                self.config.reference_time,
                self.launch_time,
                &self.config.features,
            );
            let score = insider_score(&inputs, &self.config.scoring.insider_weights)?;
            cluster.insider_score = Some(score);
            self.insider_labels.insert(
                cluster.id,
                classify_insider(score, &self.config.scoring.thresholds),
            );

            self.config.false_positives.review(cluster, &members);
        }

        self.annotate_clusters(&clusters);
        self.rebuild_derived_events(&clusters);

        self.flagged_holders = match &self.config.token {
            Some(token) => {
                let profiles = holder_profiles(&self.ledger, token);
                detect_suspicious_holders(&profiles, &self.config.flags)
            }
            None => Vec::new(),
        };

        info!(
            clusters = clusters.len(),
            flagged_holders = self.flagged_holders.len(),
            "analysis pass complete"
        );
        self.clusters = clusters;
        self.analyzed = true;
        Ok(())
    }

    /// Upsert derived funding and exit edges from wallet features
    ///
    /// Each edge cites the transfer observations that ground it. Re-running
    /// analysis does not duplicate replay entries.
    fn derive_flow_edges(&mut self, features: &BTreeMap<EntityId, WalletFeatures>) {
        let mut edges: Vec<(EntityId, EntityId, stakeout_domain::EdgeKind, EvidenceId)> =
            Vec::new();
        for (wallet, f) in features {
            if let Some(funding) = &f.first_funding {
                if let Some(funder) = self.graph.find(EntityKind::Wallet, &funding.funder) {
                    edges.push((funder, *wallet, stakeout_domain::EdgeKind::Funding, funding.eid));
                }
            }
            if let Some(sink) = &f.profit_sink {
                if let Some(sink_id) = self.graph.find(EntityKind::Wallet, &sink.recipient) {
                    for eid in &sink.evidence {
                        edges.push((*wallet, sink_id, stakeout_domain::EdgeKind::Exit, *eid));
                    }
                }
            }
        }
        for (from, to, kind, eid) in edges {
            if self.derived_edges.insert((from, to, kind.as_str(), eid)) {
                self.touch_edge(from, to, kind, eid);
            }
        }
    }

    /// Write cluster membership back as graph attributes and replay entries
    fn annotate_clusters(&mut self, clusters: &[Cluster]) {
        for cluster in clusters {
            let evidence: Vec<EvidenceId> = cluster.evidence().into_iter().collect();
            let Some(first) = evidence.first().copied() else {
                continue;
            };
            for member in &cluster.members {
                // Members exist; annotate cannot fail for them.
                let _ = self
                    .graph
                    .annotate(*member, "cluster", &cluster.id.to_string(), first);
            }
            self.replay.push(ReplayEntry::ScoreUpdate {
                cluster: cluster.id.to_string(),
                members: cluster.members.iter().map(|m| m.value()).collect(),
                relation_score: cluster.relation_score,
                insider_score: cluster.insider_score,
                verdict: cluster.verdict.as_str().to_string(),
            });
        }
    }

    /// Rebuild cluster-derived timeline events from the current pass
    fn rebuild_derived_events(&mut self, clusters: &[Cluster]) {
        self.derived_events.clear();
        for cluster in clusters {
            if cluster.verdict < ClusterVerdict::Suspected {
                continue;
            }
            let evidence: Vec<EvidenceId> = cluster.evidence().into_iter().collect();
            let at = evidence
                .iter()
                .filter_map(|eid| self.ledger.get(*eid).ok())
                .map(|obs| obs.payload.occurred_at())
                .max()
                .unwrap_or(0);
            self.derived_events.push(TimelineEvent {
                at,
                eid: evidence.first().copied(),
                description: format!(
                    "{}: {} wallets linked ({})",
                    cluster.id,
                    cluster.members.len(),
                    cluster.verdict.as_str()
                ),
                turning_point: true,
            });
        }
    }

    /// Whether derived scores reflect the current ledger and graph
    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    /// Clusters from the latest analysis pass
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Look up one cluster
    pub fn get_cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Insider classification for a cluster from the latest pass
    pub fn insider_label(&self, id: ClusterId) -> Option<InsiderLabel> {
        self.insider_labels.get(&id).copied()
    }

    /// Flagged holders from the latest pass
    pub fn flagged_holders(&self) -> &[FlaggedHolder] {
        &self.flagged_holders
    }

    /// Claim matrix for reporting
    pub fn get_claim_matrix(&self) -> Vec<ClaimMatrixRow> {
        self.resolver.claim_matrix()
    }

    /// The contradiction log
    pub fn get_contradiction_log(&self) -> &[stakeout_domain::ContradictionRecord] {
        self.resolver.contradiction_log()
    }

    /// The claim resolver
    pub fn resolver(&self) -> &ClaimResolver {
        &self.resolver
    }

    /// Recorded acquisition gaps
    pub fn gaps(&self) -> &[AcquisitionGap] {
        &self.gaps
    }

    /// Timeline of the run, ordered by event time (ties by EID)
    pub fn get_timeline(&self) -> Vec<TimelineEvent> {
        let mut events: Vec<TimelineEvent> = self
            .observed_events
            .iter()
            .chain(self.derived_events.iter())
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.at, e.eid));
        events
    }

    /// Confidence ceiling after acquisition-gap penalties
    ///
    /// Starts at 1.0; every gap subtracts the configured penalty, floored.
    /// Missing data can only lower confidence, never raise it.
    pub fn confidence_ceiling(&self) -> f64 {
        (1.0 - self.gaps.len() as f64 * self.config.gap_penalty)
            .max(self.config.confidence_floor)
    }

    /// Snapshot of the evidence state for the completeness gate
    pub fn evidence_summary(&self) -> EvidenceSummary {
        let domain_citations = self
            .domain_citations
            .iter()
            .map(|(domain, eids)| (*domain, eids.len()))
            .collect();
        let domains_marked_unknown = self.gaps.iter().map(|g| g.domain).collect();

        let headline_conclusions = self
            .clusters
            .iter()
            .filter(|c| c.verdict >= ClusterVerdict::Suspected)
            .map(|c| {
                let evidence: Vec<EvidenceId> = c.evidence().into_iter().collect();
                let single_source_flagged = evidence.len() < 2;
                HeadlineConclusion {
                    statement: format!(
                        "{} wallets form a {} ({})",
                        c.members.len(),
                        c.verdict.as_str(),
                        c.id
                    ),
                    evidence,
                    single_source_flagged,
                }
            })
            .collect();

        let timeline = self.get_timeline();
        let turning_points = timeline.iter().filter(|e| e.turning_point).count();

        let answered = |domain: QuestionDomain| {
            self.resolver
                .claims()
                .any(|c: &Claim| c.key.question_domain() == domain && c.status != ClaimStatus::Proposed)
        };

        EvidenceSummary {
            domain_citations,
            domains_marked_unknown,
            headline_conclusions,
            timeline_events: timeline.len(),
            turning_points,
            canonical_address_answered: answered(QuestionDomain::CanonicalAddress),
            cooperation_answered: answered(QuestionDomain::Cooperation),
        }
    }

    /// Run the completeness gate over the current state
    ///
    /// `Incomplete` asks the caller to keep collecting; it never aborts.
    pub fn check_completeness(&self, mode: Mode) -> Completeness {
        CompletenessGate::new(self.config.completeness.clone()).check(mode, &self.evidence_summary())
    }

    /// Link confidence for the canonical-address identity question
    ///
    /// Deterministic strength is the share of official/on-chain tier
    /// citations; cross-source agreement the share of distinct sources
    /// backing the modal asserted value; temporal stability requires
    /// corroboration over time and is zeroed by an active contradiction.
    /// `None` until the claim has at least one assertion.
    pub fn identity_link_confidence(&self) -> Result<Option<f64>, EngineError> {
        let Some(address) = &self.config.candidate_address else {
            return Ok(None);
        };
        let key = ClaimKey::canonical_address(address);
        let Some(claim) = self.resolver.claim(&key) else {
            return Ok(None);
        };
        if claim.assertions.is_empty() {
            return Ok(None);
        }

        let n = claim.assertions.len() as f64;
        let deterministic_strength = claim
            .assertions
            .iter()
            .filter(|a| a.tier != SourceTier::P2)
            .count() as f64
            / n;

        let mut by_value: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut sources: BTreeSet<&str> = BTreeSet::new();
        for a in &claim.assertions {
            let source = self
                .ledger
                .get(a.eid)
                .map(|o| o.source_url.as_str())
                .unwrap_or("");
            sources.insert(source);
            by_value.entry(a.value.as_str()).or_default().insert(source);
        }
        let modal = by_value.values().map(|s| s.len()).max().unwrap_or(0);
        let cross_source_agreement = modal as f64 / sources.len() as f64;

        let temporal_stability = if self.resolver.has_active_contradiction(&key) {
            0.0
        } else if claim.assertions.len() >= 2 {
            1.0
        } else {
            0.5
        };

        let inputs = LinkInputs {
            deterministic_strength,
            cross_source_agreement,
            temporal_stability,
        };
        Ok(Some(link_confidence(
            &inputs,
            &self.config.scoring.link_weights,
        )?))
    }

    /// The ordered replay log accumulated so far
    pub fn replay_log(&self) -> &[ReplayEntry] {
        &self.replay
    }

    /// Rebuild a run from its replay log
    ///
    /// Observations are re-ingested in order; if the log contains score
    /// updates, analysis is re-run. Every upsert and score entry is then
    /// verified against the rebuilt state: a mismatch means the log and the
    /// engine disagree, which fails with [`EngineError::Replay`].
    pub fn from_replay(
        config: InvestigationConfig,
        entries: &[ReplayEntry],
    ) -> Result<Self, EngineError> {
        let mut run = Self::new(config)?;

        for entry in entries {
            if let ReplayEntry::Observation(dto) = entry {
                let (domain, draft) = dto.to_draft()?;
                let recorded = run
                    .ingest_draft(domain, draft)
                    .map_err(|e| EngineError::Replay(format!("re-ingestion failed: {}", e)))?;
                match recorded {
                    Some(eid) if eid.value() == dto.eid => {}
                    Some(eid) => {
                        return Err(EngineError::Replay(format!(
                            "EID diverged: log says {}, re-ingestion assigned {}",
                            dto.eid, eid
                        )))
                    }
                    None => {
                        return Err(EngineError::Replay(format!(
                            "observation EID-{:06} deduplicated on replay",
                            dto.eid
                        )))
                    }
                }
            }
        }

        // Funding/exit edges and score updates only ever come out of an
        // analysis pass; their presence means the original run analyzed.
        let analysis_ran = entries.iter().any(|e| match e {
            ReplayEntry::ScoreUpdate { .. } => true,
            ReplayEntry::EdgeUpsert { kind, .. } => kind == "funding" || kind == "exit",
            _ => false,
        });
        if analysis_ran {
            run.analyze()?;
        }

        run.verify_against(entries)?;
        Ok(run)
    }

    /// Check non-observation log entries against the rebuilt state
    fn verify_against(&self, entries: &[ReplayEntry]) -> Result<(), EngineError> {
        // Re-analysis appends newer score entries for the same cluster; only
        // the last one per cluster id is the expected final state.
        let mut final_scores: BTreeMap<&str, (&Vec<u64>, f64, &str)> = BTreeMap::new();

        for entry in entries {
            match entry {
                ReplayEntry::Observation(_) => {}
                ReplayEntry::EntityUpsert { id, kind, key, .. } => {
                    let kind = EntityKind::parse(kind).ok_or_else(|| {
                        EngineError::Replay(format!("unknown entity kind: {}", kind))
                    })?;
                    match self.graph.find(kind, key) {
                        Some(found) if found.value() == *id => {}
                        other => {
                            return Err(EngineError::Replay(format!(
                                "entity {} '{}' expected id {}, found {:?}",
                                kind.as_str(),
                                key,
                                id,
                                other
                            )))
                        }
                    }
                }
                ReplayEntry::EdgeUpsert { from, to, kind, eid } => {
                    let kind = stakeout_domain::EdgeKind::parse(kind).ok_or_else(|| {
                        EngineError::Replay(format!("unknown edge kind: {}", kind))
                    })?;
                    let cited = self.graph.edges().any(|e| {
                        e.from.value() == *from
                            && e.to.value() == *to
                            && e.kind == kind
                            && e.evidence.contains(&EvidenceId::new(*eid))
                    });
                    if !cited {
                        return Err(EngineError::Replay(format!(
                            "edge {}->{} ({}) missing evidence EID-{:06}",
                            from,
                            to,
                            kind.as_str(),
                            eid
                        )));
                    }
                }
                ReplayEntry::ScoreUpdate {
                    cluster,
                    members,
                    relation_score,
                    verdict,
                    ..
                } => {
                    final_scores.insert(
                        cluster.as_str(),
                        (members, *relation_score, verdict.as_str()),
                    );
                }
            }
        }

        for (cluster_name, (members, relation_score, verdict)) in final_scores {
            let found = self
                .clusters
                .iter()
                .find(|c| c.id.to_string() == cluster_name)
                .ok_or_else(|| {
                    EngineError::Replay(format!("cluster {} not reproduced", cluster_name))
                })?;
            let found_members: Vec<u64> = found.members.iter().map(|m| m.value()).collect();
            if &found_members != members
                || (found.relation_score - relation_score).abs() > 1e-9
                || found.verdict.as_str() != verdict
            {
                return Err(EngineError::Replay(format!(
                    "cluster {} diverged from the log",
                    cluster_name
                )));
            }
        }
        Ok(())
    }
}

/// Best-effort entity kind for a free-form mention/link key
fn classify_key(key: &str) -> EntityKind {
    if key.starts_with("0x") {
        EntityKind::Wallet
    } else if key.contains('.') {
        EntityKind::Domain
    } else {
        EntityKind::SocialHandle
    }
}

/// One-line timeline description of an observation
fn describe(obs: &Observation) -> String {
    match &obs.payload {
        ObservationPayload::Transfer {
            from, to, amount, ..
        } => format!("transfer {} -> {} ({})", from, to, amount),
        ObservationPayload::Trade {
            wallet,
            side,
            amount,
            ..
        } => match side {
            TradeSide::Buy => format!("{} bought {}", wallet, amount),
            TradeSide::Sell => format!("{} sold {}", wallet, amount),
        },
        ObservationPayload::HolderSnapshot { token, holders, .. } => {
            format!("holder snapshot of {} ({} rows)", token, holders.len())
        }
        ObservationPayload::SocialPost { handle, .. } => format!("post by {}", handle),
        ObservationPayload::DomainRecord { domain, .. } => format!("domain record for {}", domain),
        ObservationPayload::ClaimAssertion {
            claim_key, asserted, ..
        } => format!("'{}' asserted as '{}'", claim_key, asserted),
    }
}

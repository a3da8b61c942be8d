//! The staged entity resolver.
//!
//! Every raw name passes through the stages in a fixed order and stops at the
//! first that claims it:
//!
//! 0. Identifier: an external identifier already attached to an entity
//! 1. Exact: the verbatim name is a known variant
//! 2. Normalized: the normalized name equals an entity's normalized name
//! 3. Fuzzy: best similarity against every entity's normalized name
//!
//! A fuzzy score in the review band never merges. The name founds a new
//! entity flagged for review, and the near miss is queued as a [`ReviewItem`].

use serde::{Deserialize, Serialize};
use soi_core::{
    CanonicalEntity, EntityId, ResolutionMethod, ResolverConfig, Result, SoiError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::normalize::normalize_name;
use crate::similarity::{SimilarityScorer, TokenSetScorer};

/// Terminal state of one resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    /// Attached to an entity, existing or new.
    Resolved,
    /// Founded a provisional entity because the best fuzzy match fell in the
    /// review band.
    NeedsReview,
}

/// Outcome of [`EntityResolver::resolve`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Entity the name now belongs to.
    pub entity: EntityId,
    /// Stage that produced the outcome.
    pub method: ResolutionMethod,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Resolved or pending review.
    pub status: ResolutionStatus,
}

impl Resolution {
    /// Returns true if the outcome awaits review.
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.status == ResolutionStatus::NeedsReview
    }
}

/// A fuzzy near miss surfaced for manual decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Raw name being resolved.
    pub raw_name: String,
    /// Provisional entity created for it.
    pub provisional: EntityId,
    /// Closest existing entity.
    pub candidate: EntityId,
    /// Canonical name of the candidate.
    pub candidate_name: String,
    /// Similarity score, 0-100.
    pub score: f64,
}

/// Per-stage invocation and outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    /// Identifier lookups attempted.
    pub identifier_lookups: usize,
    /// Exact lookups attempted.
    pub exact_lookups: usize,
    /// Normalized lookups attempted.
    pub normalized_lookups: usize,
    /// Fuzzy searches attempted.
    pub fuzzy_searches: usize,
    /// Names resolved by identifier.
    pub identifier: usize,
    /// Names resolved verbatim.
    pub exact: usize,
    /// Names resolved after normalization.
    pub normalized: usize,
    /// Names auto-resolved by similarity.
    pub fuzzy: usize,
    /// Names that founded an entity outright.
    pub created: usize,
    /// Names that founded a provisional entity pending review.
    pub review: usize,
}

impl StageCounts {
    /// Total names resolved.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.identifier + self.exact + self.normalized + self.fuzzy + self.created + self.review
    }
}

/// Canonical entity registry with staged name resolution.
///
/// The registry is append-only and iterates in insertion order, so the first
/// sighting of a company fixes its canonical name. Feeding names in a stable
/// order therefore yields the same entities and ids on every run.
#[derive(Debug)]
pub struct EntityResolver {
    config: ResolverConfig,
    scorer: Arc<dyn SimilarityScorer>,
    entities: Vec<CanonicalEntity>,
    by_variant: HashMap<String, EntityId>,
    by_normalized: HashMap<String, EntityId>,
    by_identifier: HashMap<String, EntityId>,
    review: Vec<ReviewItem>,
    counts: StageCounts,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl EntityResolver {
    /// Creates an empty resolver using token-set similarity.
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            scorer: Arc::new(TokenSetScorer::new()),
            entities: Vec::new(),
            by_variant: HashMap::new(),
            by_normalized: HashMap::new(),
            by_identifier: HashMap::new(),
            review: Vec::new(),
            counts: StageCounts::default(),
        }
    }

    /// Replaces the similarity scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Resolver thresholds.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Entities in creation order.
    #[must_use]
    pub fn entities(&self) -> &[CanonicalEntity] {
        &self.entities
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&CanonicalEntity> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.entities.get(index)
    }

    /// Fuzzy near misses awaiting review, in the order they arose.
    #[must_use]
    pub fn review_queue(&self) -> &[ReviewItem] {
        &self.review
    }

    /// Stage counters since creation.
    #[must_use]
    pub const fn stage_counts(&self) -> &StageCounts {
        &self.counts
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity exists yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Sets an entity's industry unless one is already recorded.
    pub fn assign_industry(&mut self, id: EntityId, industry: impl Into<String>) {
        if let Some(entity) = self.entity_mut(id)
            && entity.industry.is_none()
        {
            entity.industry = Some(industry.into());
        }
    }

    /// Resolves a raw company name.
    ///
    /// `identifier` is an optional external key (such as a LEI); when it is
    /// already attached to an entity it decides the outcome before any name
    /// comparison, otherwise it is attached to whichever entity the name
    /// resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`SoiError::ResolverInvariant`] if the registry would end up
    /// with two entities claiming the same verbatim variant or identifier.
    pub fn resolve(&mut self, raw: &str, identifier: Option<&str>) -> Result<Resolution> {
        let identifier = identifier.map(str::trim).filter(|id| !id.is_empty());

        if let Some(key) = identifier {
            self.counts.identifier_lookups += 1;
            if let Some(&id) = self.by_identifier.get(key) {
                trace!(raw, identifier = key, entity = %id, "identifier match");
                self.counts.identifier += 1;
                self.attach_variant(id, raw, ResolutionMethod::Identifier, 1.0)?;
                return Ok(resolved(id, ResolutionMethod::Identifier, 1.0));
            }
        }

        let resolution = self.resolve_name(raw)?;
        if let Some(key) = identifier {
            self.attach_identifier(resolution.entity, key)?;
        }
        Ok(resolution)
    }

    fn resolve_name(&mut self, raw: &str) -> Result<Resolution> {
        self.counts.exact_lookups += 1;
        if let Some(&id) = self.by_variant.get(raw) {
            trace!(raw, entity = %id, "exact match");
            self.counts.exact += 1;
            return Ok(resolved(id, ResolutionMethod::Exact, 1.0));
        }

        let normalized = normalize_name(raw);
        self.counts.normalized_lookups += 1;
        if let Some(&id) = self.by_normalized.get(&normalized) {
            trace!(raw, normalized = %normalized, entity = %id, "normalized match");
            self.counts.normalized += 1;
            self.attach_variant(id, raw, ResolutionMethod::Normalized, 0.99)?;
            return Ok(resolved(id, ResolutionMethod::Normalized, 0.99));
        }

        self.counts.fuzzy_searches += 1;
        let best = self.best_match(&normalized);

        match best {
            Some((id, score)) if score >= self.config.auto_accept => {
                let confidence = score / 100.0;
                debug!(raw, entity = %id, score, "fuzzy match accepted");
                self.counts.fuzzy += 1;
                self.attach_variant(id, raw, ResolutionMethod::Fuzzy, confidence)?;
                Ok(resolved(id, ResolutionMethod::Fuzzy, confidence))
            }
            Some((candidate, score)) if score >= self.config.review_floor => {
                let provisional = self.create(raw, normalized, true)?;
                let candidate_name = self
                    .entity(candidate)
                    .map(|e| e.canonical_name.clone())
                    .unwrap_or_default();
                warn!(
                    raw,
                    candidate = %candidate,
                    candidate_name = %candidate_name,
                    score,
                    "fuzzy match needs review"
                );
                self.counts.review += 1;
                self.review.push(ReviewItem {
                    raw_name: raw.to_string(),
                    provisional,
                    candidate,
                    candidate_name,
                    score,
                });
                Ok(Resolution {
                    entity: provisional,
                    method: ResolutionMethod::New,
                    confidence: 1.0,
                    status: ResolutionStatus::NeedsReview,
                })
            }
            _ => {
                let id = self.create(raw, normalized, false)?;
                self.counts.created += 1;
                Ok(resolved(id, ResolutionMethod::New, 1.0))
            }
        }
    }

    /// Highest scoring entity; ties keep the earlier entity.
    fn best_match(&self, normalized: &str) -> Option<(EntityId, f64)> {
        let mut best: Option<(EntityId, f64)> = None;
        for entity in &self.entities {
            let score = self.scorer.score(normalized, &entity.normalized_name);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((entity.id, score));
            }
        }
        best
    }

    fn create(&mut self, raw: &str, normalized: String, needs_review: bool) -> Result<EntityId> {
        let next = u32::try_from(self.entities.len() + 1)
            .map_err(|_| SoiError::ResolverInvariant("entity id space exhausted".to_string()))?;
        let id = EntityId(next);
        self.claim_variant(id, raw)?;
        self.by_normalized.entry(normalized.clone()).or_insert(id);

        let mut entity = CanonicalEntity::new(id, raw, normalized);
        entity.needs_review = needs_review;
        debug!(entity = %id, name = raw, needs_review, "new canonical entity");
        self.entities.push(entity);
        Ok(id)
    }

    fn attach_variant(
        &mut self,
        id: EntityId,
        raw: &str,
        method: ResolutionMethod,
        confidence: f64,
    ) -> Result<()> {
        self.claim_variant(id, raw)?;
        if let Some(entity) = self.entity_mut(id) {
            entity.add_variant(raw, method, confidence);
        }
        Ok(())
    }

    fn claim_variant(&mut self, id: EntityId, raw: &str) -> Result<()> {
        match self.by_variant.get(raw) {
            Some(&owner) if owner != id => Err(SoiError::ResolverInvariant(format!(
                "variant {raw:?} claimed by {owner} and {id}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.by_variant.insert(raw.to_string(), id);
                Ok(())
            }
        }
    }

    fn attach_identifier(&mut self, id: EntityId, key: &str) -> Result<()> {
        if let Some(&owner) = self.by_identifier.get(key) {
            if owner != id {
                return Err(SoiError::ResolverInvariant(format!(
                    "identifier {key:?} claimed by {owner} and {id}"
                )));
            }
            return Ok(());
        }
        if let Some(entity) = self.entity_mut(id) {
            entity.identifier.get_or_insert_with(|| key.to_string());
        }
        self.by_identifier.insert(key.to_string(), id);
        Ok(())
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut CanonicalEntity> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.entities.get_mut(index)
    }

    /// Checks that no two entities claim one verbatim variant.
    ///
    /// # Errors
    ///
    /// Returns [`SoiError::ResolverInvariant`] naming the first shared variant.
    pub fn verify(&self) -> Result<()> {
        let mut owners: HashMap<&str, EntityId> = HashMap::new();
        for entity in &self.entities {
            for variant in &entity.variants {
                if let Some(owner) = owners.insert(variant.raw.as_str(), entity.id)
                    && owner != entity.id
                {
                    return Err(SoiError::ResolverInvariant(format!(
                        "variant {:?} claimed by {owner} and {}",
                        variant.raw, entity.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Registers an entity built elsewhere (for example loaded from a
    /// previous run), keeping its variants and identifier.
    ///
    /// The entity is renumbered to the next free id, which is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SoiError::ResolverInvariant`] if any of its variants or its
    /// identifier already belongs to another entity.
    pub fn seed(&mut self, mut entity: CanonicalEntity) -> Result<EntityId> {
        let next = u32::try_from(self.entities.len() + 1)
            .map_err(|_| SoiError::ResolverInvariant("entity id space exhausted".to_string()))?;
        let id = EntityId(next);

        for variant in &entity.variants {
            if let Some(&owner) = self.by_variant.get(&variant.raw) {
                return Err(SoiError::ResolverInvariant(format!(
                    "variant {:?} claimed by {owner} and {id}",
                    variant.raw
                )));
            }
        }
        if let Some(key) = entity.identifier.as_deref()
            && let Some(&owner) = self.by_identifier.get(key)
        {
            return Err(SoiError::ResolverInvariant(format!(
                "identifier {key:?} claimed by {owner} and {id}"
            )));
        }

        if entity.normalized_name.is_empty() {
            entity.normalized_name = normalize_name(&entity.canonical_name);
        }
        if !entity.knows(&entity.canonical_name) {
            let name = entity.canonical_name.clone();
            entity.add_variant(name, ResolutionMethod::New, 1.0);
        }
        entity.id = id;

        for variant in &entity.variants {
            self.by_variant.insert(variant.raw.clone(), id);
        }
        if let Some(key) = &entity.identifier {
            self.by_identifier.insert(key.clone(), id);
        }
        self.by_normalized
            .entry(entity.normalized_name.clone())
            .or_insert(id);
        self.entities.push(entity);
        Ok(id)
    }
}

const fn resolved(entity: EntityId, method: ResolutionMethod, confidence: f64) -> Resolution {
    Resolution {
        entity,
        method,
        confidence,
        status: ResolutionStatus::Resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedScorer(f64);

    impl SimilarityScorer for FixedScorer {
        fn score(&self, _a: &str, _b: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_normalized_stage_merges_punctuation_variants() {
        let mut resolver = EntityResolver::default();
        let first = resolver.resolve("ABC Holdings, LLC", None).unwrap();
        let second = resolver.resolve("ABC Holdings LLC", None).unwrap();

        assert_eq!(first.method, ResolutionMethod::New);
        assert_eq!(second.entity, first.entity);
        assert_eq!(second.method, ResolutionMethod::Normalized);
        assert!((second.confidence - 0.99).abs() < 1e-9);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.entities()[0].variants.len(), 2);
    }

    #[test]
    fn test_canonical_name_resolves_to_itself() {
        let mut resolver = EntityResolver::default();
        let created = resolver.resolve("Acme Corp", None).unwrap();
        let again = resolver.resolve("Acme Corp", None).unwrap();

        assert_eq!(again.entity, created.entity);
        assert_eq!(again.method, ResolutionMethod::Exact);
        assert!((again.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_names_never_reach_fuzzy_stage() {
        let mut resolver = EntityResolver::default();
        resolver.resolve("Acme Corp", None).unwrap();
        resolver.resolve("ABC Holdings, LLC", None).unwrap();
        let searches = resolver.stage_counts().fuzzy_searches;

        for _ in 0..5 {
            resolver.resolve("Acme Corp", None).unwrap();
            resolver.resolve("ABC Holdings, LLC", None).unwrap();
        }
        // Normalized matches stop before the fuzzy stage too.
        resolver.resolve("ABC Holdings LLC", None).unwrap();

        let counts = resolver.stage_counts();
        assert_eq!(counts.fuzzy_searches, searches);
        assert_eq!(counts.exact, 10);
        assert_eq!(counts.normalized, 1);
        assert_eq!(counts.total(), 13);
    }

    #[test]
    fn test_review_band_never_merges() {
        let mut resolver =
            EntityResolver::default().with_scorer(Arc::new(FixedScorer(85.0)));
        let acme = resolver.resolve("Acme Corp", None).unwrap();
        let near = resolver.resolve("Acme Corporation Group", None).unwrap();

        assert_ne!(near.entity, acme.entity);
        assert!(near.needs_review());
        assert_eq!(resolver.len(), 2);
        assert!(resolver.entities()[1].needs_review);
        assert!(!resolver.entities()[0].knows("Acme Corporation Group"));

        let item = &resolver.review_queue()[0];
        assert_eq!(item.candidate, acme.entity);
        assert_eq!(item.provisional, near.entity);
        assert_eq!(item.candidate_name, "Acme Corp");
        assert!((item.score - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fuzzy_auto_accept() {
        let mut resolver = EntityResolver::default();
        let first = resolver.resolve("Northwind Software Group", None).unwrap();
        let typo = resolver.resolve("Northwind Sofware Group", None).unwrap();

        assert_eq!(typo.entity, first.entity);
        assert_eq!(typo.method, ResolutionMethod::Fuzzy);
        assert!(typo.confidence >= 0.9 && typo.confidence < 1.0);
        // The accepted spelling is now an exact variant.
        let again = resolver.resolve("Northwind Sofware Group", None).unwrap();
        assert_eq!(again.method, ResolutionMethod::Exact);
    }

    #[test]
    fn test_low_score_creates_entity() {
        let mut resolver = EntityResolver::default();
        let a = resolver.resolve("Acme Corp", None).unwrap();
        let b = resolver.resolve("Zenith Dental Partners", None).unwrap();

        assert_ne!(a.entity, b.entity);
        assert_eq!(b.method, ResolutionMethod::New);
        assert_eq!(b.entity, EntityId(2));
        assert!(resolver.review_queue().is_empty());
    }

    #[test]
    fn test_identifier_precedes_names() {
        let mut resolver = EntityResolver::default();
        let acme = resolver.resolve("Acme Corp", Some("LEI-1")).unwrap();
        let renamed = resolver.resolve("Totally Different Name", Some("LEI-1")).unwrap();

        assert_eq!(renamed.entity, acme.entity);
        assert_eq!(renamed.method, ResolutionMethod::Identifier);
        assert_eq!(resolver.stage_counts().fuzzy_searches, 1);
        assert_eq!(resolver.entities()[0].identifier.as_deref(), Some("LEI-1"));
    }

    #[test]
    fn test_conflicting_identifier_is_invariant_violation() {
        let mut resolver = EntityResolver::default();
        resolver.resolve("Acme Corp", Some("LEI-1")).unwrap();
        resolver.resolve("Zenith Dental", Some("LEI-2")).unwrap();

        let err = resolver.resolve("Acme Corp", Some("LEI-2")).unwrap_err();
        assert!(matches!(err, SoiError::ResolverInvariant(_)));
    }

    #[test]
    fn test_seeded_duplicate_variant_is_rejected() {
        let mut resolver = EntityResolver::default();
        resolver.resolve("Acme Corp", None).unwrap();

        let mut clash = CanonicalEntity::new(EntityId(99), "Acme Inc", "acme");
        clash.add_variant("Acme Corp", ResolutionMethod::Exact, 1.0);
        assert!(matches!(
            resolver.seed(clash),
            Err(SoiError::ResolverInvariant(_))
        ));
        assert_eq!(resolver.len(), 1);
        assert!(resolver.verify().is_ok());
    }

    #[test]
    fn test_seed_renumbers_and_indexes() {
        let mut resolver = EntityResolver::default();
        let mut seeded = CanonicalEntity::new(EntityId(7), "Beta Holdings, Inc.", "");
        seeded.add_variant("BETA HOLDINGS", ResolutionMethod::Normalized, 0.99);

        let id = resolver.seed(seeded).unwrap();
        assert_eq!(id, EntityId(1));
        assert_eq!(resolver.entities()[0].normalized_name, "beta holdings");

        let hit = resolver.resolve("BETA HOLDINGS", None).unwrap();
        assert_eq!(hit.entity, id);
        assert_eq!(hit.method, ResolutionMethod::Exact);
    }

    #[test]
    fn test_deterministic_ids() {
        let names = ["Acme Corp", "Zenith Dental", "Acme Corp.", "Beta LLC"];
        let run = || {
            let mut resolver = EntityResolver::default();
            names
                .iter()
                .map(|name| resolver.resolve(name, None).unwrap().entity)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
        assert_eq!(run(), vec![EntityId(1), EntityId(2), EntityId(1), EntityId(3)]);
    }

    #[test]
    fn test_assign_industry_keeps_first() {
        let mut resolver = EntityResolver::default();
        let id = resolver.resolve("Acme Corp", None).unwrap().entity;
        resolver.assign_industry(id, "Software/Technology");
        resolver.assign_industry(id, "Retail");
        assert_eq!(
            resolver.entity(id).and_then(|e| e.industry.as_deref()),
            Some("Software/Technology")
        );
    }
}

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/soi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Resolution of free-text company names onto canonical entities.
//!
//! - [`normalize_name`] - Deterministic name normalization
//! - [`SimilarityScorer`] - Fuzzy scoring seam, [`TokenSetScorer`] by default
//! - [`EntityResolver`] - The staged registry
//! - [`IndustryClassifier`] - Sector tagging seam

/// Sector classification.
pub mod industry;
/// Name normalization.
pub mod normalize;
/// Staged resolver.
pub mod resolver;
/// Similarity scoring.
pub mod similarity;

pub use industry::{IndustryClassifier, KeywordIndustryClassifier, OTHER_SECTOR, UNKNOWN_SECTOR};
pub use normalize::normalize_name;
pub use soi_core::LEGAL_SUFFIXES;
pub use resolver::{EntityResolver, Resolution, ResolutionStatus, ReviewItem, StageCounts};
pub use similarity::{SimilarityScorer, TokenSetScorer, token_set_ratio};

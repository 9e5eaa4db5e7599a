//! Claim analysis: estimate generation, carrier comparison, PM Brain classification,
//! viability scoring and dispute letters, all persisted onto the claim's audit report.

pub mod comparison;
pub mod dispute;
pub mod domain;
pub mod envelope;
pub mod estimate;
pub mod facts;
pub mod metering;
pub mod repository;
pub mod router;
pub mod service;
pub mod strategy;
pub mod viability;

#[cfg(test)]
mod tests;

pub use comparison::ComparisonMode;
pub use domain::{
    AuditReport, CarrierEstimate, ClaimFacts, ClaimId, ComparisonResult, GeneratedEstimate,
    LineItem, OrganizationId, PolicySnapshot, ReportId, ReportStatus, ScopeSheet, UserId,
};
pub use facts::{AnalysisFacts, FactGatherer};
pub use repository::AnalysisRepository;
pub use router::analysis_router;
pub use service::ClaimAnalysisService;
pub use strategy::{PmBrainAnalysis, StrategyStatus, STRATEGY_RULES};
pub use viability::{Recommendation, ViabilityAnalysis, VIABILITY_RULES};

//! Fact gathering for the analysis steps. Pure reads, no side effects.

use super::domain::{AuditReport, CarrierEstimate, ClaimFacts, ClaimId, GeneratedEstimate};
use super::repository::AnalysisRepository;
use crate::error::ResolutionError;
use crate::workflows::identity::Caller;

/// Everything a comparison, classification or scoring step reads.
#[derive(Debug, Clone)]
pub struct AnalysisFacts {
    pub claim: ClaimFacts,
    pub report: Option<AuditReport>,
    pub carrier: Option<CarrierEstimate>,
}

impl AnalysisFacts {
    pub fn report(&self) -> Result<&AuditReport, ResolutionError> {
        self.report
            .as_ref()
            .ok_or_else(|| ResolutionError::NotFound("audit report".to_string()))
    }

    /// The latest report together with its generated estimate.
    pub fn estimated_report(&self) -> Result<(&AuditReport, &GeneratedEstimate), ResolutionError> {
        let report = self.report()?;
        let estimate = report.generated_estimate.as_ref().ok_or_else(|| {
            ResolutionError::PreconditionFailed(
                "the latest audit report has no generated estimate".to_string(),
            )
        })?;
        Ok((report, estimate))
    }

    /// Carrier estimate with parsed content, required by the comparison engine.
    pub fn parsed_carrier(&self) -> Result<&CarrierEstimate, ResolutionError> {
        self.carrier
            .as_ref()
            .filter(|carrier| carrier.parsed_data.is_some())
            .ok_or_else(|| ResolutionError::NotFound("parsed carrier estimate".to_string()))
    }
}

pub struct FactGatherer<'a, R> {
    repository: &'a R,
}

impl<'a, R> FactGatherer<'a, R>
where
    R: AnalysisRepository,
{
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Claim facts scoped to the caller's organization. A claim owned by another
    /// organization is reported as missing.
    pub fn claim(&self, caller: &Caller, claim_id: &ClaimId) -> Result<ClaimFacts, ResolutionError> {
        self.repository
            .claim_facts(claim_id, &caller.organization_id)?
            .ok_or_else(|| ResolutionError::NotFound(format!("claim {}", claim_id.0)))
    }

    pub fn gather(&self, caller: &Caller, claim_id: &ClaimId) -> Result<AnalysisFacts, ResolutionError> {
        let claim = self.claim(caller, claim_id)?;
        Ok(AnalysisFacts {
            report: self.repository.latest_report(claim_id)?,
            carrier: self.repository.latest_carrier_estimate(claim_id)?,
            claim,
        })
    }
}

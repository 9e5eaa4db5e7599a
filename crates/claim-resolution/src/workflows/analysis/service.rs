use std::sync::Arc;

use tracing::{info, warn};

use super::comparison::{self, ComparisonMode};
use super::dispute;
use super::domain::{AuditReport, ClaimId, ComparisonResult, GeneratedEstimate, ReportStatus};
use super::estimate;
use super::facts::FactGatherer;
use super::metering::{MeteredOperation, UsageRecord, TOKEN_PRICING};
use super::repository::AnalysisRepository;
use super::strategy::{self, PmBrainAnalysis, StrategyInputs, STRATEGY_RULES};
use super::viability::{self, ViabilityAnalysis, ViabilityInputs, VIABILITY_RULES};
use crate::clock::Clock;
use crate::error::ResolutionError;
use crate::llm::{Completion, CompletionRequest, LanguageModel};
use crate::workflows::identity::Caller;

/// Estimate generation and the analyses layered on top of it.
///
/// Every step reads through the [`FactGatherer`], calls the model once, validates the
/// response and writes the result onto the claim's latest audit report.
pub struct ClaimAnalysisService<R> {
    repository: Arc<R>,
    model: Arc<dyn LanguageModel>,
    clock: Arc<dyn Clock>,
}

impl<R> ClaimAnalysisService<R>
where
    R: AnalysisRepository + 'static,
{
    pub fn new(repository: Arc<R>, model: Arc<dyn LanguageModel>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            model,
            clock,
        }
    }

    /// Creates a new audit report from a scope sheet. A failed generation is still
    /// persisted with its error message.
    pub async fn generate_estimate(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
        scope_sheet_id: Option<&str>,
    ) -> Result<AuditReport, ResolutionError> {
        let gatherer = FactGatherer::new(self.repository.as_ref());
        let facts = gatherer.claim(caller, claim_id)?;
        let scope = self
            .repository
            .scope_sheet(claim_id, scope_sheet_id)?
            .ok_or_else(|| ResolutionError::NotFound(format!("scope sheet for claim {}", claim_id.0)))?;

        let mut report = AuditReport::pending(
            claim_id.clone(),
            scope.id.clone(),
            caller.user_id.clone(),
            self.clock.now(),
        );
        self.repository.insert_report(&report)?;
        self.set_status(&mut report, ReportStatus::Processing, None)?;

        match self.request_estimate(&report, estimate::build_request(&facts, &scope)).await {
            Ok(generated) => {
                report.generated_estimate = Some(generated);
                self.set_status(&mut report, ReportStatus::Completed, None)?;
                info!(
                    claim_id = %claim_id.0,
                    report_id = %report.id.0,
                    "estimate generated"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    claim_id = %claim_id.0,
                    report_id = %report.id.0,
                    error = %err,
                    "estimate generation failed"
                );
                self.set_status(&mut report, ReportStatus::Failed, Some(err.to_string()))?;
                Err(err)
            }
        }
    }

    pub async fn compare_estimates(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
        mode: ComparisonMode,
    ) -> Result<ComparisonResult, ResolutionError> {
        let facts = FactGatherer::new(self.repository.as_ref()).gather(caller, claim_id)?;
        let report = facts.report()?;
        let generated = report
            .generated_estimate
            .as_ref()
            .ok_or_else(|| ResolutionError::NotFound("generated estimate".to_string()))?;
        let carrier = facts.parsed_carrier()?;

        let result = match mode {
            ComparisonMode::Model => {
                let completion = self
                    .complete(report, MeteredOperation::Comparison, comparison::build_request(generated, carrier))
                    .await?;
                comparison::interpret(&completion.text, generated, carrier)?
            }
            ComparisonMode::Structured => {
                let parsed = carrier.line_item_estimate().ok_or_else(|| {
                    ResolutionError::PreconditionFailed(
                        "the carrier estimate has no line items to compare".to_string(),
                    )
                })?;
                comparison::reduce(generated, &parsed)?
            }
        };

        let mut updated = report.clone();
        updated.carrier_estimate_id = Some(carrier.id.clone());
        updated.comparison = Some(result.clone());
        self.save(&mut updated)?;
        info!(
            claim_id = %claim_id.0,
            report_id = %updated.id.0,
            discrepancies = result.discrepancies.len(),
            total_delta = result.summary.total_delta,
            "estimates compared"
        );
        Ok(result)
    }

    /// PM Brain classification; the rule table has the final word on the status.
    pub async fn classify_strategy(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
    ) -> Result<PmBrainAnalysis, ResolutionError> {
        let facts = FactGatherer::new(self.repository.as_ref()).gather(caller, claim_id)?;
        let (report, generated) = facts.estimated_report()?;
        let carrier = facts.carrier.as_ref();
        let inputs = StrategyInputs::from_estimates(generated, carrier)?;

        let request = strategy::build_request(&facts.claim.policy, generated, carrier, &STRATEGY_RULES);
        let completion = self
            .complete(report, MeteredOperation::StrategyClassification, request)
            .await?;
        let analysis = strategy::interpret(&completion.text, &inputs, &STRATEGY_RULES)?;

        let mut updated = report.clone();
        if let Some(carrier) = carrier {
            updated.carrier_estimate_id = Some(carrier.id.clone());
        }
        updated.pm_brain = Some(analysis.clone());
        self.save(&mut updated)?;
        info!(
            claim_id = %claim_id.0,
            report_id = %updated.id.0,
            status = analysis.status.as_str(),
            "settlement strategy classified"
        );
        Ok(analysis)
    }

    pub async fn score_viability(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
    ) -> Result<ViabilityAnalysis, ResolutionError> {
        let facts = FactGatherer::new(self.repository.as_ref()).gather(caller, claim_id)?;
        let (report, generated) = facts.estimated_report()?;
        let inputs = ViabilityInputs::new(&facts.claim.policy, generated)?;

        let completion = self
            .complete(
                report,
                MeteredOperation::ViabilityScoring,
                viability::build_request(&inputs, &VIABILITY_RULES),
            )
            .await?;
        let today = self.clock.now().date_naive();
        let analysis = viability::interpret(&completion.text, &inputs, &VIABILITY_RULES, today)?;

        let mut updated = report.clone();
        updated.viability = Some(analysis.clone());
        self.save(&mut updated)?;
        info!(
            claim_id = %claim_id.0,
            report_id = %updated.id.0,
            recommendation = analysis.recommendation.as_str(),
            economics_score = analysis.economics_score,
            coverage_score = analysis.coverage_score,
            "viability scored"
        );
        Ok(analysis)
    }

    /// Drafts a supplement request; only a `DISPUTE_OFFER` classification qualifies.
    pub async fn generate_dispute_letter(
        &self,
        caller: &Caller,
        claim_id: &ClaimId,
    ) -> Result<String, ResolutionError> {
        let facts = FactGatherer::new(self.repository.as_ref()).gather(caller, claim_id)?;
        let report = facts.report()?;
        let analysis = dispute::eligible_analysis(report)
            .map_err(|gate| ResolutionError::PreconditionFailed(gate.message()))?;

        let completion = self
            .complete(
                report,
                MeteredOperation::DisputeLetter,
                dispute::build_request(&facts.claim, analysis, report),
            )
            .await?;
        let letter = dispute::interpret(&completion.text)?;

        let mut updated = report.clone();
        updated.dispute_letter = Some(letter.clone());
        self.save(&mut updated)?;
        info!(claim_id = %claim_id.0, report_id = %updated.id.0, "dispute letter drafted");
        Ok(letter)
    }

    /// The authoritative (most recently created) report for an owned claim.
    pub fn latest_report(&self, caller: &Caller, claim_id: &ClaimId) -> Result<AuditReport, ResolutionError> {
        let facts = FactGatherer::new(self.repository.as_ref()).gather(caller, claim_id)?;
        facts
            .report
            .ok_or_else(|| ResolutionError::NotFound(format!("audit report for claim {}", claim_id.0)))
    }

    async fn request_estimate(
        &self,
        report: &AuditReport,
        request: CompletionRequest,
    ) -> Result<GeneratedEstimate, ResolutionError> {
        let completion = self
            .complete(report, MeteredOperation::EstimateGeneration, request)
            .await?;
        Ok(estimate::interpret(&completion.text)?)
    }

    async fn complete(
        &self,
        report: &AuditReport,
        operation: MeteredOperation,
        request: CompletionRequest,
    ) -> Result<Completion, ResolutionError> {
        let completion = self.model.complete(request).await?;
        self.meter(report, operation, &completion);
        Ok(completion)
    }

    /// Usage metering never fails the request.
    fn meter(&self, report: &AuditReport, operation: MeteredOperation, completion: &Completion) {
        let usage = UsageRecord::from_completion(
            &report.claim_id,
            Some(&report.id),
            operation,
            completion,
            &TOKEN_PRICING,
            self.clock.now(),
        );
        if let Err(err) = self.repository.record_usage(&usage) {
            warn!(
                claim_id = %report.claim_id.0,
                operation = operation.as_str(),
                error = %err,
                "failed to record api usage"
            );
        }
    }

    fn set_status(
        &self,
        report: &mut AuditReport,
        status: ReportStatus,
        error_message: Option<String>,
    ) -> Result<(), ResolutionError> {
        report.status = status;
        report.error_message = error_message;
        self.save(report)
    }

    fn save(&self, report: &mut AuditReport) -> Result<(), ResolutionError> {
        report.updated_at = self.clock.now();
        self.repository.update_report(report)?;
        Ok(())
    }
}

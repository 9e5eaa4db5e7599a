use serde::Serialize;

use super::StrategyStatus;

const RATIO_EPSILON: f64 = 1e-9;

/// Versioned settlement-disposition thresholds.
///
/// The same table frames the prompt and re-derives the authoritative status, so the model
/// never does the arithmetic that decides a claim's path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyRules {
    pub version: &'static str,
    /// Largest underpayment, as a share of the contractor total, that still closes.
    pub close_ratio: f64,
    /// Absolute underpayment at which legal review is required.
    pub legal_gap: f64,
}

pub const STRATEGY_RULES: StrategyRules = StrategyRules {
    version: "strategy-v1",
    close_ratio: 0.10,
    legal_gap: 15_000.0,
};

impl StrategyRules {
    /// Precedence: missing carrier data, then legal review, then close, then dispute.
    ///
    /// `carrier_total` is `None` when the carrier data is empty, garbled, or not a
    /// line-item estimate.
    pub fn derive(
        &self,
        contractor_total: f64,
        carrier_total: Option<f64>,
        coverage_denied: bool,
    ) -> StrategyStatus {
        let Some(carrier_total) = carrier_total else {
            return StrategyStatus::NeedDocs;
        };

        let gap = contractor_total - carrier_total;
        if coverage_denied || gap >= self.legal_gap {
            return StrategyStatus::LegalReview;
        }
        if gap <= 0.0 || contractor_total <= 0.0 {
            return StrategyStatus::Close;
        }
        if gap / contractor_total <= self.close_ratio + RATIO_EPSILON {
            StrategyStatus::Close
        } else {
            StrategyStatus::DisputeOffer
        }
    }

    /// Rule text embedded in the classification prompt.
    pub fn prompt_block(&self) -> String {
        let close_pct = self.close_ratio * 100.0;
        format!(
            "Decision rules ({version}):\n\
             - CLOSE: the carrier paid within {close_pct:.0}% of the contractor estimate, or more.\n\
             - DISPUTE_OFFER: the carrier underpaid by more than {close_pct:.0}% but the absolute gap is under ${gap:.0}.\n\
             - LEGAL_REVIEW: the gap is ${gap:.0} or more, or the carrier explicitly denied coverage on major items.\n\
             - NEED_DOCS: the carrier data is empty, garbled, or not a line-item estimate.",
            version = self.version,
            gap = self.legal_gap,
        )
    }
}

//! Contractor-vs-carrier estimate comparison.
//!
//! Two modes share one output shape. `Model` asks the language model for discrepancies
//! and justifications; `Structured` reduces the two line-item sets directly. Whenever the
//! carrier data is a line-item estimate, the summary totals come from the stored numbers
//! rather than from the model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    normalize_item, round_cents, CarrierEstimate, ComparisonResult, ComparisonSummary,
    Discrepancy, GeneratedEstimate, LineItem, ParsedCarrierEstimate,
};
use crate::llm::validate::{require, require_finite, require_text};
use crate::llm::{parse_json_response, CompletionRequest, ValidationError};

pub const COMPARISON_TEMPERATURE: f32 = 0.2;
const COMPARISON_MAX_TOKENS: u32 = 4_000;
/// Smallest absolute price gap reported as a discrepancy.
pub const MATERIAL_DELTA: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    #[default]
    Model,
    Structured,
}

pub fn build_request(estimate: &GeneratedEstimate, carrier: &CarrierEstimate) -> CompletionRequest {
    let carrier_data = carrier
        .parsed_data
        .clone()
        .unwrap_or(serde_json::Value::Null);

    let prompt = format!(
        "Compare the contractor's estimate (industry pricing) with the carrier's estimate line by line.\n\n\
         CONTRACTOR ESTIMATE:\n{estimate}\n\n\
         CARRIER ESTIMATE:\n{carrier_data}\n\n\
         List every line item whose prices differ by at least ${MATERIAL_DELTA:.2}, including items the \
         carrier omitted (carrier_price 0). delta = industry_price - carrier_price.\n\
         Respond with exactly one JSON object of this shape:\n{RESPONSE_SCHEMA}",
        estimate = json!(estimate),
    );

    CompletionRequest::new(SYSTEM_PROMPT, prompt)
        .temperature(COMPARISON_TEMPERATURE)
        .max_tokens(COMPARISON_MAX_TOKENS)
}

const SYSTEM_PROMPT: &str = "You are an insurance restoration estimator who audits carrier estimates \
against industry pricing. Respond with a single JSON object and nothing else: no markdown, no prose.";

const RESPONSE_SCHEMA: &str = r#"{
  "discrepancies": [{"item": "", "industry_price": 0.0, "carrier_price": 0.0, "delta": 0.0, "justification": ""}],
  "summary": {"total_industry": 0.0, "total_carrier": 0.0, "total_delta": 0.0}
}"#;

#[derive(Deserialize)]
struct RawComparison {
    #[serde(default)]
    discrepancies: Vec<RawDiscrepancy>,
    summary: Option<RawSummary>,
}

#[derive(Deserialize)]
struct RawDiscrepancy {
    item: Option<String>,
    industry_price: Option<f64>,
    carrier_price: Option<f64>,
    #[serde(default)]
    justification: Option<String>,
}

#[derive(Deserialize)]
struct RawSummary {
    total_industry: Option<f64>,
    total_carrier: Option<f64>,
}

/// Validates a model comparison. Discrepancy deltas are recomputed from the two prices.
pub fn interpret(
    text: &str,
    estimate: &GeneratedEstimate,
    carrier: &CarrierEstimate,
) -> Result<ComparisonResult, ValidationError> {
    let raw: RawComparison = parse_json_response(text)?;
    let summary = require(raw.summary, "summary")?;
    let model_industry = require_finite(summary.total_industry, "summary.total_industry")?;
    let model_carrier = require_finite(summary.total_carrier, "summary.total_carrier")?;

    let discrepancies = raw
        .discrepancies
        .into_iter()
        .map(|raw| {
            let industry_price = require_finite(raw.industry_price, "discrepancies.industry_price")?;
            let carrier_price = require_finite(raw.carrier_price, "discrepancies.carrier_price")?;
            Ok(Discrepancy {
                item: require_text(raw.item, "discrepancies.item")?,
                industry_price: round_cents(industry_price),
                carrier_price: round_cents(carrier_price),
                delta: round_cents(industry_price - carrier_price),
                justification: raw.justification.unwrap_or_default().trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let (total_industry, total_carrier) = match carrier.line_item_estimate() {
        Some(parsed) => (estimate.total()?, parsed.total),
        None => (model_industry, model_carrier),
    };

    Ok(ComparisonResult {
        discrepancies,
        summary: summarize(total_industry, total_carrier),
    })
}

/// Deterministic line-item reduction used for `Structured` mode.
pub fn reduce(
    estimate: &GeneratedEstimate,
    carrier: &ParsedCarrierEstimate,
) -> Result<ComparisonResult, ValidationError> {
    let total_industry = estimate.total()?;

    let mut carrier_items = group(&carrier.line_items);
    let mut discrepancies = Vec::new();

    for (key, (label, industry_price)) in ordered_groups(&estimate.line_items) {
        let (carrier_price, justification) = match carrier_items.remove(&key) {
            Some((_, price)) if price < industry_price => {
                (price, "carrier priced below the contractor estimate")
            }
            Some((_, price)) => (price, "carrier priced above the contractor estimate"),
            None => (0.0, "carrier estimate omits this item"),
        };
        push_material(&mut discrepancies, label, industry_price, carrier_price, justification);
    }

    for (_, (label, carrier_price)) in ordered_groups(&carrier.line_items) {
        if carrier_items.contains_key(&normalize_item(&label)) {
            push_material(
                &mut discrepancies,
                label,
                0.0,
                carrier_price,
                "carrier item has no counterpart in the contractor estimate",
            );
        }
    }

    Ok(ComparisonResult {
        discrepancies,
        summary: summarize(total_industry, carrier.total),
    })
}

fn push_material(
    discrepancies: &mut Vec<Discrepancy>,
    item: String,
    industry_price: f64,
    carrier_price: f64,
    justification: &str,
) {
    let delta = round_cents(industry_price - carrier_price);
    if delta.abs() >= MATERIAL_DELTA {
        discrepancies.push(Discrepancy {
            item,
            industry_price: round_cents(industry_price),
            carrier_price: round_cents(carrier_price),
            delta,
            justification: justification.to_string(),
        });
    }
}

fn summarize(total_industry: f64, total_carrier: f64) -> ComparisonSummary {
    ComparisonSummary {
        total_industry: round_cents(total_industry),
        total_carrier: round_cents(total_carrier),
        total_delta: round_cents(total_industry - total_carrier),
    }
}

/// Sums line items sharing a normalised description, keeping the first label seen.
fn group(items: &[LineItem]) -> BTreeMap<String, (String, f64)> {
    let mut groups: BTreeMap<String, (String, f64)> = BTreeMap::new();
    for item in items {
        groups
            .entry(normalize_item(&item.description))
            .or_insert_with(|| (item.description.trim().to_string(), 0.0))
            .1 += item.total;
    }
    groups
}

/// Grouped items in first-appearance order.
fn ordered_groups(items: &[LineItem]) -> Vec<(String, (String, f64))> {
    let mut groups = group(items);
    let mut ordered = Vec::with_capacity(groups.len());
    for item in items {
        let key = normalize_item(&item.description);
        if let Some(entry) = groups.remove(&key) {
            ordered.push((key, entry));
        }
    }
    ordered
}

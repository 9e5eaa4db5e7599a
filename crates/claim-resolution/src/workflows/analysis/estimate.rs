//! Independent repair estimate generation from a scope sheet.

use serde::Deserialize;
use serde_json::json;

use super::domain::{round_cents, ClaimFacts, GeneratedEstimate, LineItem, ScopeSheet};
use crate::llm::validate::{require_finite, require_text};
use crate::llm::{parse_json_response, CompletionRequest, ValidationError};

pub const ESTIMATE_TEMPERATURE: f32 = 0.2;
pub const ESTIMATE_MAX_TOKENS: u32 = 8_000;

pub fn build_request(facts: &ClaimFacts, scope: &ScopeSheet) -> CompletionRequest {
    let claim = json!({
        "property_address": facts.property_address,
        "loss_type": facts.policy.loss_type,
        "incident_date": facts.policy.incident_date,
        "carrier_name": facts.policy.carrier_name,
    });

    let prompt = format!(
        "Write a line-item repair estimate at current industry pricing for this claim.\n\n\
         CLAIM:\n{claim}\n\n\
         SCOPE SHEET:\n{scope}\n\n\
         Group line items by trade category. total = quantity × unit_price for every line. \
         Include overhead_and_profit only when the scope warrants a general contractor.\n\
         Respond with exactly one JSON object of this shape:\n{RESPONSE_SCHEMA}",
        scope = scope.data,
    );

    CompletionRequest::new(SYSTEM_PROMPT, prompt)
        .temperature(ESTIMATE_TEMPERATURE)
        .max_tokens(ESTIMATE_MAX_TOKENS)
}

const SYSTEM_PROMPT: &str = "You are a certified restoration estimator writing Xactimate-style \
estimates. Respond with a single JSON object and nothing else: no markdown, no prose.";

const RESPONSE_SCHEMA: &str = r#"{
  "line_items": [{"category": "", "description": "", "quantity": 0.0, "unit": "", "unit_price": 0.0, "total": 0.0}],
  "subtotal": 0.0,
  "overhead_and_profit": 0.0,
  "total": 0.0
}"#;

#[derive(Deserialize)]
struct RawEstimate {
    #[serde(default)]
    line_items: Vec<RawLineItem>,
    subtotal: Option<f64>,
    overhead_and_profit: Option<f64>,
    total: Option<f64>,
}

#[derive(Deserialize)]
struct RawLineItem {
    #[serde(default)]
    category: Option<String>,
    description: Option<String>,
    #[serde(default)]
    quantity: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    unit_price: Option<f64>,
    total: Option<f64>,
}

pub fn interpret(text: &str) -> Result<GeneratedEstimate, ValidationError> {
    let raw: RawEstimate = parse_json_response(text)?;
    if raw.line_items.is_empty() {
        return Err(ValidationError::Empty("line_items"));
    }

    let line_items = raw
        .line_items
        .into_iter()
        .map(|item| {
            Ok(LineItem {
                category: item
                    .category
                    .map(|category| category.trim().to_string())
                    .filter(|category| !category.is_empty())
                    .unwrap_or_else(|| "General".to_string()),
                description: require_text(item.description, "line_items.description")?,
                quantity: item.quantity.unwrap_or_default(),
                unit: item.unit.unwrap_or_default().trim().to_string(),
                unit_price: round_cents(item.unit_price.unwrap_or_default()),
                total: round_cents(require_finite(item.total, "line_items.total")?),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let total = require_finite(raw.total, "total")?;
    if total <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "total",
            value: total,
        });
    }

    Ok(GeneratedEstimate {
        line_items,
        subtotal: raw.subtotal.filter(|value| value.is_finite()).map(round_cents),
        overhead_and_profit: raw
            .overhead_and_profit
            .filter(|value| value.is_finite())
            .map(round_cents),
        total: Some(round_cents(total)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::analysis::domain::{ClaimId, OrganizationId, PolicySnapshot, UserId};

    #[test]
    fn estimate_requires_line_items_and_total() {
        assert!(matches!(
            interpret(r#"{"line_items": [], "total": 10}"#),
            Err(ValidationError::Empty("line_items"))
        ));
        assert!(matches!(
            interpret(r#"{"line_items": [{"description": "Drywall", "total": 10}]}"#),
            Err(ValidationError::MissingField("total"))
        ));
    }

    #[test]
    fn estimate_defaults_blank_categories() {
        let estimate = interpret(
            r#"{"line_items": [
                {"category": " ", "description": "Tear out carpet", "quantity": 200, "unit": "SF", "unit_price": 0.456, "total": 91.004},
                {"category": "Drywall", "description": "Hang drywall", "total": 1200}
            ], "subtotal": 1291, "total": 1291}"#,
        )
        .expect("estimate");

        assert_eq!(estimate.line_items[0].category, "General");
        assert_eq!(estimate.line_items[0].total, 91.0);
        assert_eq!(estimate.line_items[0].unit_price, 0.46);
        assert_eq!(estimate.total, Some(1_291.0));
        assert_eq!(estimate.overhead_and_profit, None);
    }

    #[test]
    fn request_uses_large_budget() {
        let facts = ClaimFacts {
            claim_id: ClaimId("claim-1".to_string()),
            organization_id: OrganizationId("org-1".to_string()),
            property_address: "12 Elm St".to_string(),
            created_by: UserId("user-1".to_string()),
            policy: PolicySnapshot {
                carrier_name: None,
                policy_number: None,
                claim_number: None,
                incident_date: None,
                deductible: 0.0,
                exclusions: None,
                loss_type: Some("wind".to_string()),
            },
        };
        let scope = ScopeSheet {
            id: "scope-1".to_string(),
            claim_id: ClaimId("claim-1".to_string()),
            data: json!({ "roof": { "squares": 24, "damage": "missing shingles" } }),
        };

        let request = build_request(&facts, &scope);
        assert_eq!(request.max_tokens, ESTIMATE_MAX_TOKENS);
        assert_eq!(request.temperature, ESTIMATE_TEMPERATURE);
        assert!(request.prompt.contains("missing shingles"));
        assert!(request.prompt.contains("12 Elm St"));
    }
}

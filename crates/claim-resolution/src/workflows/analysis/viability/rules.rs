use serde::Serialize;

use super::Recommendation;

/// Versioned viability scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViabilityRules {
    pub version: &'static str,
    pub pursue_coverage_floor: u8,
    pub pursue_economics_floor: u8,
    /// Economics floor for PURSUE when no coverage deduction applied at all.
    pub clean_coverage_economics_floor: u8,
    pub conditional_coverage_floor: u8,
    pub conditional_economics_floor: u8,
    pub explicit_exclusion_penalty: u8,
    pub ambiguity_penalty: u8,
    pub water_penalty: u8,
}

pub const VIABILITY_RULES: ViabilityRules = ViabilityRules {
    version: "viability-v1",
    pursue_coverage_floor: 70,
    pursue_economics_floor: 50,
    clean_coverage_economics_floor: 30,
    conditional_coverage_floor: 40,
    conditional_economics_floor: 30,
    explicit_exclusion_penalty: 60,
    ambiguity_penalty: 20,
    water_penalty: 30,
};

/// Related perils per loss family; the first entry is the family's own name.
const PERIL_FAMILIES: &[&[&str]] = &[
    &["water", "flood", "seepage", "leak", "plumbing", "mold", "sewer"],
    &["fire", "smoke", "soot"],
    &["wind", "hail", "storm", "hurricane", "tornado"],
    &["theft", "burglary", "vandalism"],
];

const HEDGE_WORDS: &[&str] = &["may", "might", "discretion", "unless", "limited"];
const HEDGE_PHRASES: &[&str] = &["subject to", "at the discretion", "case by case"];

impl ViabilityRules {
    /// `<2500 → 15`, `[2500, 7500] → 35`, `(7500, 20000] → 60`, `>20000 → 85`.
    pub fn economics_score(&self, net_recovery: f64) -> u8 {
        if net_recovery < 2_500.0 {
            15
        } else if net_recovery <= 7_500.0 {
            35
        } else if net_recovery <= 20_000.0 {
            60
        } else {
            85
        }
    }

    pub fn coverage_score(&self, assessment: &CoverageAssessment) -> u8 {
        let mut deduction = 0u16;
        if assessment.excluded_by_name {
            deduction += u16::from(self.explicit_exclusion_penalty);
        }
        if assessment.ambiguous {
            deduction += u16::from(self.ambiguity_penalty);
        }
        if assessment.water_loss {
            deduction += u16::from(self.water_penalty);
        }
        100u16.saturating_sub(deduction) as u8
    }

    pub fn recommend(&self, coverage: u8, economics: u8, net_recovery: f64) -> Recommendation {
        if coverage < self.conditional_coverage_floor
            || economics < self.conditional_economics_floor
            || net_recovery <= 0.0
        {
            return Recommendation::DoNotPursue;
        }

        let strong_economics = economics >= self.pursue_economics_floor
            || (coverage == 100 && economics >= self.clean_coverage_economics_floor);
        if coverage >= self.pursue_coverage_floor && strong_economics {
            Recommendation::Pursue
        } else {
            Recommendation::PursueWithConditions
        }
    }

    pub fn prompt_block(&self) -> String {
        format!(
            "Scoring rules ({version}):\n\
             - net_recovery = estimated_total - deductible.\n\
             - economics_score: net < $2,500 → 15; $2,500–$7,500 → 35; $7,500–$20,000 → 60; above $20,000 → 85.\n\
             - coverage_score starts at 100: minus {explicit} if exclusions explicitly name the loss type; minus {ambiguous} if coverage is ambiguous; minus {water} for water losses (latent seepage risk); floor 0.\n\
             - PURSUE when coverage ≥ {pursue_cov} and economics ≥ {pursue_econ}; PURSUE_WITH_CONDITIONS when coverage is {cond_cov}–{cov_top} or economics is {cond_econ}–{econ_top}; DO_NOT_PURSUE when coverage < {cond_cov}, economics < {cond_econ}, or net_recovery ≤ 0.",
            version = self.version,
            explicit = self.explicit_exclusion_penalty,
            ambiguous = self.ambiguity_penalty,
            water = self.water_penalty,
            pursue_cov = self.pursue_coverage_floor,
            pursue_econ = self.pursue_economics_floor,
            cond_cov = self.conditional_coverage_floor,
            cov_top = self.pursue_coverage_floor - 1,
            cond_econ = self.conditional_economics_floor,
            econ_top = self.pursue_economics_floor - 1,
        )
    }
}

/// Deterministic reading of the exclusions text against the loss type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoverageAssessment {
    pub excluded_by_name: bool,
    pub ambiguous: bool,
    pub water_loss: bool,
}

impl CoverageAssessment {
    pub fn assess(loss_type: Option<&str>, exclusions: Option<&str>) -> Self {
        let loss_words = words(loss_type.unwrap_or_default());
        let exclusion_words = words(exclusions.unwrap_or_default());
        let exclusion_text = format!(" {} ", exclusion_words.join(" "));

        let family = PERIL_FAMILIES
            .iter()
            .find(|family| loss_words.iter().any(|word| family.contains(&word.as_str())));
        let water_loss = family.is_some_and(|family| family[0] == "water");

        if exclusion_words.is_empty() || loss_words.is_empty() {
            return Self {
                excluded_by_name: false,
                ambiguous: false,
                water_loss,
            };
        }

        let loss_phrase = format!(" {} ", loss_words.join(" "));
        let excluded_by_name = exclusion_text.contains(&loss_phrase)
            || family.is_some_and(|family| exclusion_words.iter().any(|word| word == family[0]));

        let related_peril = family.is_some_and(|family| {
            family[1..]
                .iter()
                .any(|peril| exclusion_words.iter().any(|word| word == peril))
        });
        let hedged = exclusion_words
            .iter()
            .any(|word| HEDGE_WORDS.contains(&word.as_str()))
            || HEDGE_PHRASES
                .iter()
                .any(|phrase| exclusion_text.contains(&format!(" {phrase} ")));

        Self {
            excluded_by_name,
            ambiguous: !excluded_by_name && (related_peril || hedged),
            water_loss,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

use serde::{Deserialize, Serialize};

use super::scoring::Services;
use super::service::ServiceType;
use crate::places::Place;

pub const INSIGHT_SYSTEM_PROMPT: &str =
    "You are a medical facility expert specializing in stroke care assessment. Always respond with valid JSON.";

const MAX_REVIEWS: usize = 3;
const REVIEW_EXCERPT_CHARS: usize = 200;
const PROSE_REASONING_CHARS: usize = 200;

/// What is known about a facility when asking the model to describe it
#[derive(Debug, Clone, Serialize)]
pub struct FacilityProfile {
    pub name: String,
    pub address: String,
    pub types: Vec<String>,
    pub rating: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub service_requested: String,
    #[serde(skip)]
    pub reviews: Vec<String>,
}

impl FacilityProfile {
    /// Search hit merged with its details record; details win where both have a value
    pub fn new(hit: &Place, details: Option<&Place>, service: &ServiceType) -> Self {
        let pick = |f: fn(&Place) -> Option<String>| details.and_then(f).or_else(|| f(hit));
        Self {
            name: hit.name().to_string(),
            address: pick(|p| p.formatted_address.clone()).unwrap_or_else(|| hit.address().to_string()),
            types: hit.types.clone(),
            rating: details.and_then(|d| d.rating).or(hit.rating),
            phone: pick(|p| p.national_phone_number.clone()),
            website: pick(|p| p.website_uri.clone()),
            service_requested: service.as_str().to_string(),
            reviews: details
                .map(|d| {
                    d.reviews
                        .iter()
                        .filter_map(|r| r.text())
                        .take(MAX_REVIEWS)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Service flags as the model reports them; absent flags leave the default untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InferredServices {
    #[serde(default)]
    pub emergency: Option<bool>,
    #[serde(default)]
    pub rehab_therapy: Option<bool>,
    #[serde(default)]
    pub support_groups: Option<bool>,
    #[serde(default)]
    pub stroke_certified: Option<bool>,
    #[serde(default)]
    pub neuro_icu: Option<bool>,
    #[serde(default)]
    pub rehabilitation: Option<bool>,
}

impl InferredServices {
    pub fn apply(&self, services: &mut Services) {
        let flags = [
            (self.emergency, &mut services.emergency),
            (self.rehab_therapy, &mut services.rehab_therapy),
            (self.support_groups, &mut services.support_groups),
            (self.stroke_certified, &mut services.stroke_certified),
            (self.neuro_icu, &mut services.neuro_icu),
            (self.rehabilitation, &mut services.rehabilitation),
        ];
        for (inferred, flag) in flags {
            if let Some(value) = inferred {
                *flag = value;
            }
        }
    }
}

/// The model's description of one facility
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FacilityInsight {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub services: InferredServices,
    #[serde(default)]
    pub languages: Vec<String>,
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

pub fn facility_prompt(profile: &FacilityProfile) -> String {
    let info = serde_json::to_string_pretty(profile).unwrap_or_default();
    let reviews: Vec<String> = profile
        .reviews
        .iter()
        .map(|r| format!("- {}", excerpt(r, REVIEW_EXCERPT_CHARS)))
        .collect();

    format!(
        r#"As a medical facility expert, analyze this healthcare facility for stroke care services.

Facility Information:
{info}

Recent Reviews:
{reviews}

Service Requested: {service}

Please provide:
1. A brief assessment (2-3 sentences) of why this facility is suitable for the requested service
2. Determine what services they likely offer (emergency, rehab_therapy, support_groups, stroke_certified)
3. Estimate what languages they might support based on location and type

Return a JSON object with:
{{
    "reasoning": "Brief explanation of suitability",
    "services": {{
        "emergency": boolean,
        "rehab_therapy": boolean,
        "support_groups": boolean,
        "stroke_certified": boolean,
        "neuro_icu": boolean,
        "rehabilitation": boolean
    }},
    "languages": ["list", "of", "likely", "languages"]
}}"#,
        info = info,
        reviews = reviews.join("\n"),
        service = profile.service_requested,
    )
}

/// A JSON reply is taken field by field; prose is kept as a shortened reasoning
pub fn parse_insight(reply: &str) -> FacilityInsight {
    match serde_json::from_str::<FacilityInsight>(super::relevance::unfence(reply)) {
        Ok(insight) => insight,
        Err(_) => FacilityInsight {
            reasoning: excerpt(reply.trim(), PROSE_REASONING_CHARS),
            ..Default::default()
        },
    }
}

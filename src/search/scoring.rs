use serde::Serialize;

use super::relevance::Assessment;
use super::service::ServiceType;
use crate::config::SearchConfig;
use crate::places::Place;

/// Certification and capability phrases that mark a stroke-ready facility
const STROKE_FACILITY_BONUSES: &[(&[&str], i32)] = &[
    (&["comprehensive stroke center", "CSC"], 25),
    (&["primary stroke center", "PSC", "stroke certified"], 20),
    (&["thrombectomy", "endovascular", "neuro interventional"], 15),
    (&["level 1 trauma", "level I trauma"], 10),
];

const MEDICAL_TYPES: &[&str] = &["hospital", "doctor", "health", "medical_care"];

const NEPALI_LOCATIONS: &[&str] = &["kathmandu", "lalitpur", "pokhara", "bhaktapur", "nepal"];

/// Score from the model's assessment plus a bonus for nearby facilities
pub fn ai_score(assessment: &Assessment, distance_miles: f64, config: &SearchConfig) -> u32 {
    let mut score = assessment
        .score
        .unwrap_or(config.default_ai_score as f64);
    if distance_miles < config.nearby_miles {
        score += config.nearby_bonus as f64;
    }
    score.clamp(0.0, 100.0).round() as u32
}

/// Acronyms must appear as whole words; phrases may appear anywhere
fn mentions(haystack: &str, keyword: &str) -> bool {
    let is_acronym = keyword.len() <= 4 && keyword.chars().all(|c| c.is_ascii_uppercase());
    let keyword = keyword.to_lowercase();
    if is_acronym {
        haystack
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == keyword)
    } else {
        haystack.contains(&keyword)
    }
}

/// Keyword, type, rating and distance arithmetic used when no model is available
pub fn heuristic_score(place: &Place, service: &ServiceType, distance_miles: f64) -> u32 {
    let name = place.name().to_lowercase();
    let address = place
        .formatted_address
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let mut score: i32 = 50;

    for keyword in service.scoring_keywords() {
        let mut words = keyword.split_whitespace();
        if words.clone().any(|w| name.contains(w)) {
            score += 15;
        }
        if words.any(|w| address.contains(w)) {
            score += 5;
        }
    }

    for (keywords, boost) in STROKE_FACILITY_BONUSES {
        for keyword in keywords.iter() {
            if mentions(&name, keyword) || mentions(&address, keyword) {
                score += boost;
            }
        }
    }

    if place.types.iter().any(|t| MEDICAL_TYPES.contains(&t.as_str())) {
        score += 10;
    }

    let rating = place.rating.unwrap_or_default();
    if rating > 4.0 {
        score += 10;
    } else if rating > 3.5 {
        score += 5;
    }

    if distance_miles <= 5.0 {
        score += 5;
    } else if distance_miles <= 10.0 {
        score += 2;
    } else if distance_miles > 20.0 {
        score -= 5;
    }

    if place.is_permanently_closed() {
        score -= 50;
    }

    score.clamp(0, 100) as u32
}

/// Service flags reported with each facility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Services {
    pub emergency: bool,
    pub rehab_therapy: bool,
    pub support_groups: bool,
    pub stroke_certified: bool,
    pub neuro_icu: bool,
    pub rehabilitation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_therapy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_therapy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupational_therapy: Option<bool>,
}

pub fn services_for(service: &ServiceType, types: &[String]) -> Services {
    let has_type = |wanted: &[&str]| types.iter().any(|t| wanted.contains(&t.as_str()));
    let rehab = *service == ServiceType::RehabTherapy;

    Services {
        emergency: *service == ServiceType::Emergency,
        rehab_therapy: rehab,
        support_groups: *service == ServiceType::SupportGroups,
        stroke_certified: false,
        neuro_icu: *service == ServiceType::Emergency,
        rehabilitation: rehab,
        physical_therapy: rehab.then(|| has_type(&["physiotherapist", "physical_therapy"])),
        speech_therapy: rehab.then(|| has_type(&["speech_therapist", "speech_therapy"])),
        occupational_therapy: rehab.then(|| has_type(&["occupational_therapy"])),
    }
}

/// Languages staff are likely to speak at facilities near `location`
pub fn languages_for_location(location: &str) -> Vec<String> {
    let location = location.to_lowercase();
    let mut languages = vec!["English".to_string()];
    if NEPALI_LOCATIONS.iter().any(|place| location.contains(place)) {
        languages.push("Nepali".to_string());
    }
    languages
}

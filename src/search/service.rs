use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of care a search is for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceType {
    #[default]
    Emergency,
    RehabTherapy,
    SupportGroups,
    /// Any other service string; searched like an emergency
    Other(String),
}

const EMERGENCY_TERMS: &[&str] = &["hospital", "medical center", "clinic", "emergency room"];

const REHAB_TERMS: &[&str] = &[
    "physical therapy",
    "rehabilitation center",
    "speech therapy",
    "occupational therapy",
    "physiotherapy clinic",
    "stroke rehabilitation",
    "neuro rehabilitation",
];

const SUPPORT_TERMS: &[&str] = &[
    "stroke support group",
    "community center",
    "rehabilitation center",
    "mental health center",
    "counseling center",
    "support group meeting",
];

const EMERGENCY_KEYWORDS: &[&str] = &[
    "hospital emergency room",
    "emergency department",
    "stroke center",
    "trauma center",
    "medical center emergency",
];

const REHAB_KEYWORDS: &[&str] = &[
    "stroke rehabilitation center",
    "neurological rehabilitation",
    "physical therapy stroke",
    "occupational therapy",
    "speech therapy clinic",
    "neurorehabilitation center",
];

const SUPPORT_KEYWORDS: &[&str] = &[
    "stroke support group",
    "stroke survivor organization",
    "brain injury support",
    "neurological support center",
    "stroke foundation local chapter",
];

impl ServiceType {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "emergency" => ServiceType::Emergency,
            "rehab_therapy" => ServiceType::RehabTherapy,
            "support_groups" => ServiceType::SupportGroups,
            other => ServiceType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceType::Emergency => "emergency",
            ServiceType::RehabTherapy => "rehab_therapy",
            ServiceType::SupportGroups => "support_groups",
            ServiceType::Other(name) => name,
        }
    }

    /// Text queries sent to the places API, one request each
    pub fn search_terms(&self) -> &'static [&'static str] {
        match self {
            ServiceType::RehabTherapy => REHAB_TERMS,
            ServiceType::SupportGroups => SUPPORT_TERMS,
            ServiceType::Emergency | ServiceType::Other(_) => EMERGENCY_TERMS,
        }
    }

    /// Phrases whose words raise the heuristic relevance score
    pub fn scoring_keywords(&self) -> &'static [&'static str] {
        match self {
            ServiceType::RehabTherapy => REHAB_KEYWORDS,
            ServiceType::SupportGroups => SUPPORT_KEYWORDS,
            ServiceType::Emergency | ServiceType::Other(_) => EMERGENCY_KEYWORDS,
        }
    }

    /// "rehab_therapy" -> "Rehab Therapy"
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ServiceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServiceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ServiceType::parse(&value))
    }
}

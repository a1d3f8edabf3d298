use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::insight::{facility_prompt, parse_insight, FacilityInsight, FacilityProfile, INSIGHT_SYSTEM_PROMPT};
use super::service::ServiceType;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel, ChatOptions};

const SYSTEM_PROMPT: &str = "Analyze facilities and respond only with valid JSON array. \
Be consistent with the original individual analysis criteria.";

const REPLY_FORMAT: &str = r#"Respond with JSON array: [{"index": 1, "is_medical": true/false, "score": 0-100, "reason": "brief explanation"}, {"index": 2, "is_medical": true/false, "score": 0-100, "reason": "brief explanation"}, ...]"#;

/// What the chat model concluded about one candidate
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub is_medical: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Assessment {
    pub fn failed() -> Self {
        Self {
            is_medical: false,
            score: Some(0.0),
            reason: Some("Analysis failed".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexedAssessment {
    #[serde(default)]
    index: i64,
    #[serde(flatten)]
    assessment: Assessment,
}

/// A name and its vendor types, as shown to the model
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub types: Vec<String>,
}

/// Scores a whole batch of facilities with a single chat completion
#[derive(Clone)]
pub struct RelevanceAnalyzer {
    llm: Arc<dyn ChatModel>,
}

impl RelevanceAnalyzer {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_configured()
    }

    /// One assessment per candidate, keyed by zero-based position.
    /// Every candidate is marked "Analysis failed" when the model call or reply is unusable.
    pub async fn analyze_batch(
        &self,
        candidates: &[Candidate],
        service: &ServiceType,
    ) -> HashMap<usize, Assessment> {
        if candidates.is_empty() {
            return HashMap::new();
        }

        match self.request(candidates, service).await {
            Ok(assessments) => assessments,
            Err(e) => {
                warn!("Batch AI error: {}", e);
                (0..candidates.len()).map(|i| (i, Assessment::failed())).collect()
            }
        }
    }

    /// Reasoning, likely services and languages for one facility
    pub async fn describe_facility(&self, profile: &FacilityProfile) -> Result<FacilityInsight> {
        debug!("Analyzing facility with AI: {}", profile.name);
        let messages = vec![
            ChatMessage::system(INSIGHT_SYSTEM_PROMPT),
            ChatMessage::user(facility_prompt(profile)),
        ];
        let reply = self
            .llm
            .chat_completion(messages, &ChatOptions::new(500, 0.3))
            .await?;
        Ok(parse_insight(&reply))
    }

    async fn request(
        &self,
        candidates: &[Candidate],
        service: &ServiceType,
    ) -> Result<HashMap<usize, Assessment>> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(batch_prompt(candidates, service)),
        ];
        let reply = self
            .llm
            .chat_completion(messages, &ChatOptions::new(800, 0.1))
            .await?;
        debug!("Relevance reply: {} chars", reply.len());
        parse_assessments(&reply, candidates.len())
    }
}

fn format_types(types: &[String]) -> String {
    let quoted: Vec<String> = types.iter().map(|t| format!("'{}'", t)).collect();
    format!("[{}]", quoted.join(", "))
}

pub fn batch_prompt(candidates: &[Candidate], service: &ServiceType) -> String {
    let listing: String = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. Name: \"{}\", Types: {}\n", i + 1, c.name, format_types(&c.types)))
        .collect();

    let task = match service {
        ServiceType::Emergency => {
            "Analyze these medical facilities for emergency stroke care suitability.".to_string()
        }
        ServiceType::RehabTherapy => "Analyze these facilities for stroke rehabilitation therapy suitability \
(physical therapy, speech therapy, occupational therapy)."
            .to_string(),
        ServiceType::SupportGroups => {
            "Analyze these facilities for stroke support groups or mental health support suitability.".to_string()
        }
        ServiceType::Other(name) => format!("Analyze these medical facilities for {} suitability.", name),
    };

    format!(
        "{} For each facility, determine if it's medical and rate 0-100:\n\n{}\n{}",
        task, listing, REPLY_FORMAT
    )
}

/// Strip a markdown code fence the model sometimes wraps JSON in
pub(super) fn unfence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_assessments(reply: &str, batch_len: usize) -> Result<HashMap<usize, Assessment>> {
    let body = unfence(reply);
    let entries: Vec<IndexedAssessment> = serde_json::from_str(body)
        .map_err(|e| Error::Completion(format!("relevance reply is not a JSON array: {}", e)))?;

    let mut assessments = HashMap::new();
    for entry in entries {
        let position = entry.index - 1;
        if position >= 0 && (position as usize) < batch_len {
            assessments.insert(position as usize, entry.assessment);
        }
    }
    Ok(assessments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, types: &[&str]) -> Candidate {
        Candidate {
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn prompt_lists_candidates_one_based() {
        let prompt = batch_prompt(
            &[
                candidate("Bir Hospital", &["hospital", "health"]),
                candidate("City Cafe", &[]),
            ],
            &ServiceType::Emergency,
        );
        assert!(prompt.starts_with("Analyze these medical facilities for emergency stroke care suitability."));
        assert!(prompt.contains("1. Name: \"Bir Hospital\", Types: ['hospital', 'health']\n"));
        assert!(prompt.contains("2. Name: \"City Cafe\", Types: []\n"));
        assert!(prompt.ends_with(REPLY_FORMAT));
    }

    #[test]
    fn prompt_names_unknown_services() {
        let prompt = batch_prompt(&[candidate("A", &[])], &ServiceType::parse("dialysis"));
        assert!(prompt.starts_with("Analyze these medical facilities for dialysis suitability."));
    }

    #[test]
    fn parses_fenced_reply_and_ignores_bad_indexes() {
        let reply = "```json\n[\n  {\"index\": 1, \"is_medical\": true, \"score\": 88, \"reason\": \"Stroke unit\"},\n  {\"index\": 0, \"is_medical\": true, \"score\": 10},\n  {\"index\": 7, \"is_medical\": true, \"score\": 10},\n  {\"index\": 2, \"is_medical\": false, \"score\": 5, \"reason\": \"Restaurant\"}\n]\n```";
        let parsed = parse_assessments(reply, 2).unwrap();

        assert_eq!(parsed.len(), 2);
        assert!(parsed[&0].is_medical);
        assert_eq!(parsed[&0].score, Some(88.0));
        assert_eq!(parsed[&0].reason.as_deref(), Some("Stroke unit"));
        assert!(!parsed[&1].is_medical);
    }

    #[test]
    fn missing_fields_default() {
        let parsed = parse_assessments(r#"[{"index": 1, "is_medical": true}]"#, 1).unwrap();
        assert_eq!(parsed[&0].score, None);
        assert_eq!(parsed[&0].reason, None);
    }

    #[test]
    fn prose_reply_is_an_error() {
        assert!(parse_assessments("Sure! Here is the analysis you asked for.", 3).is_err());
    }
}

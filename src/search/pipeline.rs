use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use tracing::{debug, info, warn};

use super::fanout::{dedup_by_id, search_all};
use super::geo::distance_miles;
use super::insight::{FacilityInsight, FacilityProfile};
use super::relevance::{Assessment, Candidate, RelevanceAnalyzer};
use super::scoring::{ai_score, heuristic_score, languages_for_location, services_for, Services};
use super::service::ServiceType;
use crate::config::{ScoringMode, SearchConfig};
use crate::error::{Error, Result};
use crate::places::{Coordinates, Place, PlacesClient};

const METERS_PER_MILE: f64 = 1609.34;
const MAX_BIAS_RADIUS_METERS: f64 = 50_000.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub service: Option<ServiceType>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub radius_miles: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// One ranked facility in the search reply
#[derive(Debug, Clone, Serialize)]
pub struct FacilityResult {
    pub name: String,
    pub address: String,
    pub distance_miles: f64,
    pub relevance_score: u32,
    pub services: Services,
    pub languages: Vec<String>,
    pub ai_reasoning: String,
    pub contact: Contact,
    pub rating: Option<f64>,
    pub rating_count: u32,
    pub hours: String,
    pub place_id: String,
    pub facility_types: Vec<String>,
    pub service_type: ServiceType,
}

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub total_time: f64,
    pub places_search_time: f64,
    pub ai_analysis_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub query: String,
    pub service: ServiceType,
    pub language: String,
    pub radius_miles: f64,
    pub total_found: usize,
    pub coordinates: Coordinates,
    pub search_terms_used: Vec<String>,
    pub scoring: &'static str,
    pub timestamp: DateTime<Utc>,
    pub performance: Performance,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<FacilityResult>,
    pub search_metadata: SearchMetadata,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

fn apply_insight(result: &mut FacilityResult, insight: FacilityInsight) {
    if !insight.reasoning.trim().is_empty() {
        result.ai_reasoning = insight.reasoning;
    }
    insight.services.apply(&mut result.services);
    if !insight.languages.is_empty() {
        result.languages = insight.languages;
    }
}

/// Geocode, fan out, dedup, score and rank
pub struct FacilitySearch {
    places: PlacesClient,
    analyzer: RelevanceAnalyzer,
    config: SearchConfig,
    default_radius_meters: f64,
}

impl FacilitySearch {
    pub fn new(
        places: PlacesClient,
        analyzer: RelevanceAnalyzer,
        config: SearchConfig,
        default_radius_meters: f64,
    ) -> Self {
        Self {
            places,
            analyzer,
            config,
            default_radius_meters,
        }
    }

    /// Scoring that will actually be applied; the model is skipped when it has no key
    fn effective_scoring(&self) -> ScoringMode {
        match self.config.scoring {
            ScoringMode::Ai if self.analyzer.is_available() => ScoringMode::Ai,
            _ => ScoringMode::Heuristic,
        }
    }

    /// Bias radius sent to the places API and the distance cutoff, in that order
    fn radius(&self, radius_miles: Option<f64>) -> (f64, f64) {
        match radius_miles {
            Some(miles) if miles.is_finite() && miles > 0.0 => {
                ((miles * METERS_PER_MILE).min(MAX_BIAS_RADIUS_METERS), miles)
            }
            _ => (self.default_radius_meters, self.config.max_distance_miles),
        }
    }

    pub async fn run(&self, request: SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();

        let location = request
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::BadRequest("Location is required".to_string()))?
            .to_string();
        let service = request.service.unwrap_or_default();
        let language = request.language.unwrap_or_else(|| "en".to_string());
        let (radius_meters, cutoff_miles) = self.radius(request.radius_miles);
        info!("Search: {}, {}", location, service);

        let center = self.places.geocode(&location).await?;

        let terms = service.search_terms();
        debug!("Search terms for {}: {:?}", service, terms);
        let places_start = Instant::now();
        let found = search_all(
            &self.places,
            terms,
            center,
            radius_meters,
            self.config.worker_pool_size,
            Duration::from_secs(self.config.fanout_timeout_secs),
        )
        .await;
        let places_time = places_start.elapsed();
        info!("Concurrent places search took: {:.2}s", places_time.as_secs_f64());

        let unique = dedup_by_id(found);
        info!("Total unique places: {}", unique.len());
        let candidates: Vec<Place> = unique.into_iter().take(self.config.max_candidates).collect();

        let scoring = self.effective_scoring();
        let ai_start = Instant::now();
        let assessments = match scoring {
            ScoringMode::Ai => {
                let batch: Vec<Candidate> = candidates
                    .iter()
                    .map(|p| Candidate {
                        name: p.name().to_string(),
                        types: p.types.clone(),
                    })
                    .collect();
                self.analyzer.analyze_batch(&batch, &service).await
            }
            ScoringMode::Heuristic => HashMap::new(),
        };
        let mut ai_time = ai_start.elapsed();
        info!("{} scoring took: {:.2}s", scoring.as_str(), ai_time.as_secs_f64());

        let describe = scoring == ScoringMode::Heuristic
            && self.config.facility_insights
            && self.analyzer.is_available();
        let languages = languages_for_location(&location);
        let mut results = Vec::new();
        let mut hits = Vec::new();
        for (i, place) in candidates.into_iter().enumerate() {
            let Some(coordinates) = place.coordinates() else {
                debug!("Skipping {} without a location", place.name());
                continue;
            };

            let assessment = match scoring {
                ScoringMode::Ai => {
                    let assessment = assessments.get(&i).cloned().unwrap_or_else(Assessment::failed);
                    if !assessment.is_medical {
                        debug!("AI rejected: {}", place.name());
                        continue;
                    }
                    Some(assessment)
                }
                ScoringMode::Heuristic => None,
            };

            let distance = distance_miles(center, coordinates);
            if distance > cutoff_miles {
                continue;
            }

            let (relevance_score, ai_reasoning) = match assessment {
                Some(assessment) => (
                    ai_score(&assessment, distance, &self.config),
                    assessment
                        .reason
                        .unwrap_or_else(|| format!("{} facility", service.label())),
                ),
                None => (
                    heuristic_score(&place, &service, distance),
                    format!("{} facility", service.label()),
                ),
            };
            debug!("Added: {} (Score: {})", place.name(), relevance_score);
            if describe {
                hits.push(place.clone());
            }

            results.push(FacilityResult {
                name: place.name().to_string(),
                address: place.address().to_string(),
                distance_miles: round1(distance),
                relevance_score,
                services: services_for(&service, &place.types),
                languages: languages.clone(),
                ai_reasoning,
                contact: Contact {
                    phone: place.national_phone_number.clone(),
                    website: place.website_uri.clone(),
                },
                rating: place.rating,
                rating_count: place.user_rating_count.unwrap_or_default(),
                hours: place.hours(),
                place_id: place.id.clone().unwrap_or_else(|| "unknown".to_string()),
                facility_types: place.types,
                service_type: service.clone(),
            });
        }

        if describe {
            let insight_start = Instant::now();
            self.describe_results(&mut results, hits, &service).await;
            info!("Facility insights took: {:.2}s", insight_start.elapsed().as_secs_f64());
            ai_time += insight_start.elapsed();
        }

        results.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

        let total_time = started.elapsed();
        info!("Total request time: {:.2}s", total_time.as_secs_f64());

        Ok(SearchResponse {
            search_metadata: SearchMetadata {
                query: location,
                service,
                language,
                radius_miles: round1(cutoff_miles),
                total_found: results.len(),
                coordinates: center,
                search_terms_used: terms.iter().map(|t| t.to_string()).collect(),
                scoring: scoring.as_str(),
                timestamp: Utc::now(),
                performance: Performance {
                    total_time: round2(total_time),
                    places_search_time: round2(places_time),
                    ai_analysis_time: round2(ai_time),
                },
            },
            results,
        })
    }

    /// Replace heuristic placeholders with the model's description of each facility.
    /// `hits[i]` is the search hit behind `results[i]`; a facility whose completion
    /// fails or misses the deadline keeps its placeholder.
    async fn describe_results(&self, results: &mut [FacilityResult], hits: Vec<Place>, service: &ServiceType) {
        let permits = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));
        let mut tasks = JoinSet::new();

        for (i, hit) in hits.into_iter().enumerate() {
            let places = self.places.clone();
            let analyzer = self.analyzer.clone();
            let permits = permits.clone();
            let service = service.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let details = match hit.id.as_deref() {
                    Some(id) => places.place_details(id).await.unwrap_or_else(|e| {
                        warn!("Details lookup failed for {}: {}", hit.name(), e);
                        None
                    }),
                    None => None,
                };
                let profile = FacilityProfile::new(&hit, details.as_ref(), &service);
                (i, analyzer.describe_facility(&profile).await)
            });
        }

        let deadline = Duration::from_secs(self.config.fanout_timeout_secs);
        let stop_at = tokio::time::Instant::now() + deadline;
        loop {
            match timeout_at(stop_at, tasks.join_next()).await {
                Ok(Some(Ok((i, Ok(insight))))) => {
                    if let Some(result) = results.get_mut(i) {
                        apply_insight(result, insight);
                    }
                }
                Ok(Some(Ok((i, Err(e))))) => {
                    let name = results.get(i).map(|r| r.name.as_str()).unwrap_or_default();
                    warn!("AI analysis error for {}: {}", name, e);
                }
                Ok(Some(Err(e))) => {
                    warn!("Insight task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Facility insights timed out after {:?}, {} left as placeholders",
                        deadline,
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }
    }

    /// Full vendor record for one place
    pub async fn facility_details(&self, place_id: &str) -> Result<Place> {
        self.places
            .place_details(place_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Facility {} not found", place_id)))
    }
}

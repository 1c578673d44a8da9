//! Per-station analysis: recommendations, trend narrative, source
//! attribution and related news.
//!
//! [`LlmAnalyzer`] asks the model for a strict JSON document, then parses it
//! leniently: code fences and surrounding prose are stripped, missing
//! optional sections are left empty and recommendations without an id get
//! a fresh one. Beyond that the content is passed through untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use wardwatch_station_models::{Station, UserRole};

use crate::AiError;
use crate::providers::{LlmProvider, LlmResponse, create_provider_from_env};

/// How pressing a recommendation is.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecommendationKind {
    /// Act now.
    Urgent,
    /// General guidance.
    #[default]
    Advisory,
    /// Longer-term policy measure.
    Policy,
}

/// A single actionable recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Stable key for list rendering.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// One or two sentences of detail.
    pub description: String,
    /// Urgency class.
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
}

/// Model confidence in a source attribution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Estimated share of pollution from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    /// Source label (e.g., `"Vehicular Traffic"`).
    pub source: String,
    /// Estimated share, 0-100.
    pub percentage: f64,
    /// How sure the model is.
    pub confidence: Confidence,
}

/// A recent news item relevant to the station's area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    /// Relative publication time as written by the model (e.g., `"2h ago"`).
    pub time_ago: String,
    /// Publisher name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A web page the analysis cites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

/// Everything the analysis panel displays for one station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub grounding_urls: Vec<GroundingLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_breakdown: Option<Vec<SourceAttribution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<Vec<NewsItem>>,
}

/// Produces an [`AnalysisResult`] for a station as seen by a given role.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzes `station` for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the backing service fails or answers with
    /// something that is not an analysis.
    async fn analyze(&self, station: &Station, role: UserRole) -> Result<AnalysisResult, AiError>;
}

/// [`Analyzer`] that prompts an [`LlmProvider`].
pub struct LlmAnalyzer {
    provider: Box<dyn LlmProvider>,
}

impl LlmAnalyzer {
    /// Wraps a provider.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Builds the provider from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if no provider is configured.
    pub fn from_env() -> Result<Self, AiError> {
        Ok(Self::new(create_provider_from_env()?))
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, station: &Station, role: UserRole) -> Result<AnalysisResult, AiError> {
        log::debug!(
            "Requesting {role} analysis for {} from {}",
            station.id,
            self.provider.name()
        );

        let response = self
            .provider
            .complete(&system_prompt(role), &build_prompt(station))
            .await?;

        parse_analysis(response)
    }
}

fn system_prompt(role: UserRole) -> String {
    let audience = match role {
        UserRole::Citizen => {
            "You advise residents. Focus on personal health precautions, \
             outdoor activity timing, masks and air purifiers, and protecting \
             children, the elderly and people with respiratory conditions."
        }
        UserRole::Official => {
            "You advise government officials. Focus on enforcement, traffic \
             and construction controls, industrial compliance, public health \
             advisories and longer-term policy."
        }
    };

    format!(
        "You are an urban air-quality analyst. {audience}\n\
         Search for recent local news about air pollution in the area.\n\
         Respond with a single JSON object and nothing else, shaped as:\n\
         {{\"recommendations\": [{{\"title\": string, \"description\": string, \
         \"type\": \"urgent\" | \"advisory\" | \"policy\"}}], \
         \"trendAnalysis\": string, \
         \"sourceBreakdown\": [{{\"source\": string, \"percentage\": number, \
         \"confidence\": \"High\" | \"Medium\" | \"Low\"}}], \
         \"news\": [{{\"title\": string, \"summary\": string, \"timeAgo\": string, \
         \"source\": string}}]}}\n\
         Give 3 recommendations. Source percentages must not add up to more than 100."
    )
}

fn build_prompt(station: &Station) -> String {
    let p = &station.pollutants;
    let trend = station
        .trend
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Station: {name} (population {population})\n\
         Location: {lat:.4}, {lng:.4}\n\
         AQI: {aqi} ({severity})\n\
         PM2.5 {pm25}, PM10 {pm10}, NO2 {no2}, SO2 {so2}, CO {co}, O3 {o3}\n\
         Reported sources: {primary}; {secondary}\n\
         Last 7 days AQI: [{trend}]",
        name = station.name,
        population = station.population,
        lat = station.location.lat,
        lng = station.location.lng,
        aqi = station.aqi,
        severity = station.severity(),
        pm25 = p.pm25,
        pm10 = p.pm10,
        no2 = p.no2,
        so2 = p.so2,
        co = p.co,
        o3 = p.o3,
        primary = station.primary_source,
        secondary = station.secondary_source,
    )
}

/// Model output before ids are filled in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    recommendations: Vec<RawRecommendation>,
    #[serde(default)]
    grounding_urls: Vec<GroundingLink>,
    trend_analysis: Option<String>,
    source_breakdown: Option<Vec<SourceAttribution>>,
    news: Option<Vec<NewsItem>>,
}

#[derive(Deserialize)]
struct RawRecommendation {
    id: Option<String>,
    title: String,
    description: String,
    #[serde(rename = "type", default)]
    kind: RecommendationKind,
}

/// Extracts the JSON object from a model answer.
///
/// Handles fenced blocks (```` ```json ````) and prose before or after the
/// object by taking everything from the first `{` to the last `}`.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_analysis(response: LlmResponse) -> Result<AnalysisResult, AiError> {
    let json = extract_json(&response.text).ok_or_else(|| AiError::Malformed {
        message: "no JSON object in model answer".to_string(),
    })?;

    let raw: RawAnalysis = serde_json::from_str(json)?;

    let recommendations = raw
        .recommendations
        .into_iter()
        .map(|r| Recommendation {
            id: r
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title: r.title,
            description: r.description,
            kind: r.kind,
        })
        .collect();

    let mut grounding_urls = raw.grounding_urls;
    for citation in response.citations {
        if !grounding_urls.iter().any(|g| g.uri == citation.uri) {
            grounding_urls.push(citation);
        }
    }

    Ok(AnalysisResult {
        recommendations,
        grounding_urls,
        trend_analysis: raw.trend_analysis.filter(|t| !t.is_empty()),
        source_breakdown: raw.source_breakdown,
        news: raw.news,
    })
}

#[cfg(test)]
mod tests {
    use wardwatch_station_models::{Coordinate, Pollutants};

    use super::*;

    fn station() -> Station {
        Station {
            id: "w-101".to_string(),
            name: "Industrial Zone A".to_string(),
            population: 12_500,
            aqi: 312,
            pollutants: Pollutants {
                pm25: 180.0,
                ..Pollutants::default()
            },
            primary_source: "Industrial Emissions".to_string(),
            secondary_source: "Heavy Transport".to_string(),
            location: Coordinate::new(28.75, 77.10),
            trend: vec![280, 290, 305, 310, 300, 315, 312],
        }
    }

    struct CannedProvider {
        answer: LlmResponse,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<LlmResponse, AiError> {
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn strips_fences_and_prose() {
        let text = "Here you go:\n```json\n{\"recommendations\": []}\n```\nStay safe!";
        assert_eq!(extract_json(text), Some("{\"recommendations\": []}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn fills_missing_ids_and_merges_citations() {
        let response = LlmResponse {
            text: r#"```json
            {
              "recommendations": [
                { "id": "r1", "title": "Limit outdoor activity", "description": "…", "type": "urgent" },
                { "title": "Run purifiers", "description": "…", "type": "advisory" },
                { "id": "", "title": "Restrict trucks", "description": "…", "type": "policy" }
              ],
              "groundingUrls": [{ "title": "Model cited", "uri": "https://a.example" }],
              "trendAnalysis": "Rising for a week.",
              "sourceBreakdown": [
                { "source": "Industry", "percentage": 60, "confidence": "High" },
                { "source": "Traffic", "percentage": 30, "confidence": "Medium" }
              ],
              "news": [{ "title": "Smog alert", "summary": "…", "timeAgo": "2h ago" }]
            }
            ```"#
                .to_string(),
            citations: vec![
                GroundingLink {
                    title: "dup".to_string(),
                    uri: "https://a.example".to_string(),
                },
                GroundingLink {
                    title: "Search hit".to_string(),
                    uri: "https://b.example".to_string(),
                },
            ],
        };

        let result = parse_analysis(response).unwrap();

        assert_eq!(result.recommendations.len(), 3);
        assert_eq!(result.recommendations[0].id, "r1");
        assert!(!result.recommendations[1].id.is_empty());
        assert!(!result.recommendations[2].id.is_empty());
        assert_ne!(result.recommendations[1].id, result.recommendations[2].id);
        assert_eq!(result.recommendations[2].kind, RecommendationKind::Policy);

        let uris: Vec<&str> = result.grounding_urls.iter().map(|g| g.uri.as_str()).collect();
        assert_eq!(uris, ["https://a.example", "https://b.example"]);

        let breakdown = result.source_breakdown.unwrap();
        assert_eq!(breakdown[0].confidence, Confidence::High);
        assert_eq!(result.news.unwrap()[0].source, None);
        assert_eq!(result.trend_analysis.as_deref(), Some("Rising for a week."));
    }

    #[test]
    fn non_json_answer_is_malformed() {
        let response = LlmResponse {
            text: "I cannot help with that.".to_string(),
            citations: Vec::new(),
        };
        assert!(matches!(
            parse_analysis(response),
            Err(AiError::Malformed { .. })
        ));
    }

    #[test]
    fn prompt_carries_station_readings() {
        let prompt = build_prompt(&station());
        assert!(prompt.contains("Industrial Zone A"));
        assert!(prompt.contains("AQI: 312 (Hazardous)"));
        assert!(prompt.contains("[280, 290, 305, 310, 300, 315, 312]"));
    }

    #[tokio::test]
    async fn empty_object_is_an_empty_analysis() {
        let provider = CannedProvider {
            answer: LlmResponse {
                text: "{}".to_string(),
                citations: Vec::new(),
            },
        };
        let analyzer = LlmAnalyzer::new(Box::new(provider));

        let result = analyzer.analyze(&station(), UserRole::Official).await.unwrap();
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn role_changes_the_system_prompt() {
        let citizen = system_prompt(UserRole::Citizen);
        let official = system_prompt(UserRole::Official);
        assert!(citizen.contains("residents"));
        assert!(official.contains("government officials"));
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = AnalysisResult {
            trend_analysis: Some("flat".to_string()),
            ..AnalysisResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["trendAnalysis"], "flat");
        assert_eq!(json["groundingUrls"], serde_json::json!([]));
        assert!(json.get("news").is_none());
    }
}

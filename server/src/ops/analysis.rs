//! Deep location analysis: nearby places + community pins in, strict JSON
//! report out.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{GenerateRequest, GenerativeModel, LlmError};
use crate::ops::structured;
use crate::places::{Place, PlacesLookup};

/// Places listed in the prompt.
const MAX_PLACES: usize = 20;

const NO_PLACES_HINT: &str = "Assume a mix of urban/suburban layout.";

/// Subset of a community pin needed to summarise it. Pins come straight
/// from the UI's store, so any field may be absent or null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPin {
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
}

impl NearbyPin {
    pub fn new(business_type: &str, review: &str) -> Self {
        Self {
            business_type: Some(business_type.to_string()),
            review: Some(review.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Model returned invalid JSON: {0}")]
    Parse(String),
}

pub fn describe_places(places: &[Place]) -> Option<String> {
    if places.is_empty() {
        return None;
    }
    let names: Vec<String> = places
        .iter()
        .take(MAX_PLACES)
        .map(|p| {
            let types = if p.types.is_empty() {
                "place".to_string()
            } else {
                p.types.join(", ")
            };
            format!("{} ({})", p.name, types)
        })
        .collect();
    Some(format!("Places found within 10km: {}", names.join("; ")))
}

pub fn community_context(pins: &[NearbyPin]) -> String {
    if pins.is_empty() {
        return "No community ideas found nearby yet. You must set \"userSuggestion\" to null because there are no actual user suggestions tagged.".to_string();
    }
    let summaries: Vec<String> = pins
        .iter()
        .map(|p| {
            format!(
                "- A {} idea: \"{}\"",
                p.business_type.as_deref().unwrap_or("community"),
                p.review.as_deref().unwrap_or("")
            )
        })
        .collect();
    format!(
        "There are ACTUAL community members who have proposed ideas within 10km of this spot:\n{}\nUse this real community data to heavily influence the \"userSuggestion\" section.",
        summaries.join("\n")
    )
}

pub fn build_analysis_prompt(
    lat: f64,
    lng: f64,
    surroundings: Option<&str>,
    pins: &[NearbyPin],
) -> String {
    format!(
        r#"You are the Zonify AI Architect. Analyze the geographic location at Latitude: {lat}, Longitude: {lng}.
Context of surroundings (10km radius): {surroundings}
{community}

Provide a deep location analysis separated into exactly 4 parts, plus a global scores array for graph visualization.
1. "Planning Feasibility": How feasible is developing this area (zoning, economic potential, community value)?
2. "AI Site Audit": A detailed description of the detected surroundings, buildings and environment within a 10km radius.
3. "Suitable Facilities": Which equipment, buildings or infrastructure (a gym room, a football court, a community center...) would suit this place and its demographics.
4. "User Suggestion": A summary of the ideas and sentiment of the actual community members, if any were provided. If NO nearby community ideas were provided, this entire object MUST be null.

Return the response STRICTLY as a JSON object with the keys
"planningFeasibility", "aiSiteAudit", "suitableFacilities", "userSuggestion" and "scores".
"scores" must be an array of exactly 5 objects mapping overall feasibility categories to numbers out of 100, e.g. [{{ "category": "Economic Potential", "score": 85 }}].

EACH of the 4 section keys MUST be an object (or null for userSuggestion) containing:
- "narrative": the Markdown-formatted detailed analysis.
- "subMetrics": an array of exactly 3 objects scoring granular factors for the section, e.g. [{{"name": "Green Space", "score": 60}}, {{"name": "Transit Access", "score": 85}}, {{"name": "Density", "score": 70}}].

Do not include markdown blocks or any other text outside the JSON."#,
        lat = lat,
        lng = lng,
        surroundings = surroundings.unwrap_or(NO_PLACES_HINT),
        community = community_context(pins),
    )
}

/// Best-effort surroundings description. Lookup failures are logged and
/// treated as "nothing found".
pub async fn gather_surroundings(
    places: Option<&dyn PlacesLookup>,
    lat: f64,
    lng: f64,
) -> Option<String> {
    let lookup = places?;
    match lookup.nearby(lat, lng).await {
        Ok(found) => describe_places(&found),
        Err(e) => {
            warn!("Error fetching places context: {}", e);
            None
        }
    }
}

/// Parse the model's reply into the report object.
pub fn parse_report(output: &str, has_pins: bool) -> Result<Value, AnalysisError> {
    let mut report = structured::parse_json_document(output)
        .map_err(|e| AnalysisError::Parse(e.to_string()))?;

    let Some(obj) = report.as_object_mut() else {
        return Err(AnalysisError::Parse("expected a JSON object".to_string()));
    };
    if !has_pins {
        obj.insert("userSuggestion".to_string(), Value::Null);
    }
    Ok(report)
}

pub async fn analyze_location(
    model: &dyn GenerativeModel,
    places: Option<&dyn PlacesLookup>,
    lat: f64,
    lng: f64,
    pins: &[NearbyPin],
) -> Result<Value, AnalysisError> {
    let surroundings = gather_surroundings(places, lat, lng).await;
    let prompt = build_analysis_prompt(lat, lng, surroundings.as_deref(), pins);

    info!(
        "Requesting location analysis at {},{} ({} nearby pins) from {}",
        lat,
        lng,
        pins.len(),
        model.model_id()
    );
    let output = model.generate(GenerateRequest::json_prompt(prompt)).await?;
    parse_report(&output, !pins.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn place(name: &str, types: &[&str]) -> Place {
        Place {
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn places_are_listed_with_types() {
        let text = describe_places(&[
            place("Riverside Park", &["park", "point_of_interest"]),
            place("Kiosk", &[]),
        ])
        .unwrap();
        assert_eq!(
            text,
            "Places found within 10km: Riverside Park (park, point_of_interest); Kiosk (place)"
        );
    }

    #[test]
    fn place_list_is_capped() {
        let many: Vec<Place> = (0..30).map(|i| place(&format!("P{}", i), &["store"])).collect();
        let text = describe_places(&many).unwrap();
        assert!(text.contains("P19 (store)"));
        assert!(!text.contains("P20"));
    }

    #[test]
    fn no_places_uses_hint() {
        assert!(describe_places(&[]).is_none());
        let prompt = build_analysis_prompt(1.0, 2.0, None, &[]);
        assert!(prompt.contains("Context of surroundings (10km radius): Assume a mix of urban/suburban layout."));
    }

    #[test]
    fn no_pins_demands_null_user_suggestion() {
        let prompt = build_analysis_prompt(40.0, -73.0, None, &[]);
        assert!(prompt.contains("No community ideas found nearby yet"));
        assert!(prompt.contains("Latitude: 40, Longitude: -73"));
    }

    #[test]
    fn pins_are_summarised() {
        let pins = vec![NearbyPin::new("Skate Park", "Teens need somewhere to go")];
        let prompt = build_analysis_prompt(40.0, -73.0, Some("Places found within 10km: Mall (store)"), &pins);
        assert!(prompt.contains("- A Skate Park idea: \"Teens need somewhere to go\""));
        assert!(prompt.contains("Mall (store)"));
        assert!(!prompt.contains("No community ideas found"));
    }

    #[test]
    fn pins_with_missing_fields_still_render() {
        let pins: Vec<NearbyPin> =
            serde_json::from_str(r#"[{"businessType": null, "lat": 1.0, "votes": 3}]"#).unwrap();
        assert!(community_context(&pins).contains("- A community idea: \"\""));
    }

    #[test]
    fn report_without_pins_forces_null_suggestion() {
        let output = r#"{"planningFeasibility":{"narrative":"ok","subMetrics":[]},"userSuggestion":{"narrative":"made up"},"scores":[]}"#;
        let report = parse_report(output, false).unwrap();
        assert_eq!(report["userSuggestion"], Value::Null);
        assert_eq!(report["planningFeasibility"]["narrative"], "ok");
    }

    #[test]
    fn report_with_pins_is_untouched() {
        let output = "```json\n{\"userSuggestion\":{\"narrative\":\"locals want shade\"}}\n```";
        let report = parse_report(output, true).unwrap();
        assert_eq!(report, json!({"userSuggestion": {"narrative": "locals want shade"}}));
    }

    #[test]
    fn non_object_report_is_rejected() {
        assert!(matches!(parse_report("[1, 2, 3]", true), Err(AnalysisError::Parse(_))));
        assert!(matches!(parse_report("Sorry, I can't.", true), Err(AnalysisError::Parse(_))));
    }
}

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::ops::structured::{self, Extraction};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapAction {
    MoveTo,
    ShowPins,
    #[serde(rename = "SHOW_3D_SIMULATION")]
    Show3dSimulation,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    #[default]
    Draft,
    Validated,
    Rejected,
}

/// The structured block the auditor embeds in every reply to drive the map.
///
/// The block is kept as the model wrote it. Only `map_action` and `status`
/// are read into types; every other key (scores, flags, nulls for values
/// the model does not have yet) passes through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ActionPayload {
    map_action: MapAction,
    status: ProposalStatus,
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for ActionPayload {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let map_action = match fields.get("map_action") {
            Some(v) => MapAction::deserialize(v).map_err(|e| format!("map_action: {}", e))?,
            None => return Err("missing field `map_action`".to_string()),
        };
        let status = match fields.get("status") {
            None | Some(Value::Null) => ProposalStatus::Draft,
            Some(v) => ProposalStatus::deserialize(v).map_err(|e| format!("status: {}", e))?,
        };
        Ok(Self {
            map_action,
            status,
            fields,
        })
    }
}

impl Serialize for ActionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl ActionPayload {
    /// Neutral payload: no map action, still drafting.
    pub fn neutral(location: Option<Coordinates>) -> Self {
        let coords = location.unwrap_or_default();
        let mut fields = Map::new();
        fields.insert("map_action".into(), json!("NONE"));
        fields.insert("coordinates".into(), json!({ "lat": coords.lat, "lng": coords.lng }));
        fields.insert("feasibility_score".into(), json!(0));
        fields.insert("scoring_breakdown".into(), Value::Null);
        fields.insert("status".into(), json!("DRAFT"));
        fields.insert("idea_title".into(), Value::Null);
        fields.insert("idea_description".into(), Value::Null);
        fields.insert("flags".into(), json!([]));
        fields.insert("author".into(), Value::Null);
        Self {
            map_action: MapAction::None,
            status: ProposalStatus::Draft,
            fields,
        }
    }

    pub fn map_action(&self) -> MapAction {
        self.map_action
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    /// Raw value of any key in the block.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Pin coordinates, if the block carries usable ones.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.fields
            .get("coordinates")
            .and_then(|v| Coordinates::deserialize(v).ok())
    }

    /// Use the request location when the block has no coordinates of its own.
    fn with_location(mut self, location: Option<Coordinates>) -> Self {
        let absent = matches!(self.fields.get("coordinates"), None | Some(Value::Null));
        if let (true, Some(here)) = (absent, location) {
            self.fields.insert(
                "coordinates".into(),
                json!({ "lat": here.lat, "lng": here.lng }),
            );
        }
        self
    }
}

/// Display text plus the action recovered from one model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReply {
    pub text: String,
    pub action: Extraction<ActionPayload>,
}

pub fn extract_action(output: &str, location: Option<Coordinates>) -> ExtractedReply {
    let action = match structured::extract_fenced(output, || ActionPayload::neutral(location)) {
        Extraction::Parsed(payload) => Extraction::Parsed(payload.with_location(location)),
        fallback => fallback,
    };
    ExtractedReply {
        text: structured::strip_action_json(output),
        action,
    }
}

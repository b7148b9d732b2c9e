//! Wire types shared by the geodata service and its clients.

use geojson::Feature;
use serde::{Deserialize, Serialize};

use crate::codec::{self, DecodeError};

/// The server-of-record form of a feature.
///
/// `data` is the serialized feature. Servers are free to hand it back either as
/// a JSON string or as an inline object; both deserialize to the same string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Record {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_feature_text")]
    pub data: String,
}

impl Record {
    pub fn new(id: impl Into<String>, feature: &Feature) -> Self {
        Self {
            id: id.into(),
            data: codec::feature_to_string(feature),
        }
    }

    pub fn feature(&self) -> Result<Feature, DecodeError> {
        codec::parse_feature(&self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Edit,
}

/// Body of `POST /api/geodata` and `PUT /api/geodata/{id}`.
///
/// Create requests carry the feature inline, edit requests carry it
/// serialized; the server accepts either in both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodataRequest {
    pub action: Action,
    #[serde(deserialize_with = "deserialize_feature_text")]
    pub data: String,
}

impl GeodataRequest {
    pub fn create(feature: &Feature) -> serde_json::Value {
        serde_json::json!({
            "action": Action::Create,
            "data": feature,
        })
    }

    pub fn edit(feature: &Feature) -> Self {
        Self {
            action: Action::Edit,
            data: codec::feature_to_string(feature),
        }
    }
}

/// Pull the identifier out of a create response. `None` for a missing, null or
/// empty id, which the protocol treats as a failed create.
pub fn created_id(body: &serde_json::Value) -> Option<String> {
    match body.get("id")? {
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

fn deserialize_feature_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;

    if let Some(s) = value.as_str() {
        return Ok(s.to_string());
    }

    if value.is_object() {
        return serde_json::to_string(&value).map_err(D::Error::custom);
    }

    Err(D::Error::custom(
        "Expected either a JSON object or a JSON string",
    ))
}

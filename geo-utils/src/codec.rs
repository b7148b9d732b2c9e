//! Conversion between drawn shapes and GeoJSON features.
//!
//! A [`Layer`] is what the map surface renders: a [`Shape`] plus the feature's
//! property bag. Once a layer has been persisted, `properties.id` carries the
//! identifier the geodata service assigned to it, and that value travels with
//! every feature we send back.

use geojson::{Feature, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;

/// The property holding the server-assigned identifier.
pub const ID_PROPERTY: &str = "id";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl Position {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng,
            lat,
            alt: None,
        }
    }

    fn to_geojson(self) -> Vec<f64> {
        match self.alt {
            Some(alt) => vec![self.lng, self.lat, alt],
            None => vec![self.lng, self.lat],
        }
    }

    fn from_geojson(coords: &[f64]) -> Result<Self, DecodeError> {
        match coords {
            [lng, lat] => Ok(Self::new(*lng, *lat)),
            [lng, lat, alt] => Ok(Self {
                lng: *lng,
                lat: *lat,
                alt: Some(*alt),
            }),
            _ => Err(DecodeError::Malformed(format!(
                "position needs two or three coordinates, got {}",
                coords.len()
            ))),
        }
    }
}

/// A closed ring: the first and last positions are equal.
pub type Ring = Vec<Position>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "coordinates", rename_all = "snake_case")]
pub enum Shape {
    Point(Position),
    Polyline(Vec<Position>),
    /// Outer ring first, then holes.
    Polygon(Vec<Ring>),
    Rectangle(Bounds),
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Point(_) => "point",
            Shape::Polyline(_) => "polyline",
            Shape::Polygon(_) => "polygon",
            Shape::Rectangle(_) => "rectangle",
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Shape::Point(position) => Some(Bounds::around(position)),
            Shape::Polyline(positions) => Bounds::covering(positions),
            Shape::Polygon(rings) => Bounds::covering(rings.iter().flatten()),
            Shape::Rectangle(bounds) => Some(*bounds),
        }
    }
}

/// The renderable counterpart of a feature.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub shape: Shape,
    pub properties: JsonObject,
}

impl Layer {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            properties: JsonObject::new(),
        }
    }

    /// The server identifier, if this layer has been persisted.
    ///
    /// Numeric ids are accepted and rendered as strings; anything else (absent,
    /// null, empty string) means the layer is still a draft.
    pub fn id(&self) -> Option<String> {
        match self.properties.get(ID_PROPERTY)? {
            serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id().is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(&'static str),

    #[error("malformed geometry: {0}")]
    Malformed(String),

    #[error("invalid feature JSON")]
    Json(#[from] serde_json::Error),
}

/// Assign the server identifier to a layer. Must run before the layer is
/// registered, since the registry is keyed on it.
pub fn stamp_id(layer: &mut Layer, id: &str) {
    layer
        .properties
        .insert(ID_PROPERTY.to_string(), serde_json::Value::from(id));
}

pub fn to_feature(layer: &Layer) -> Feature {
    let value = match &layer.shape {
        Shape::Point(position) => Value::Point(position.to_geojson()),
        Shape::Polyline(positions) => {
            Value::LineString(positions.iter().map(|p| p.to_geojson()).collect())
        }
        Shape::Polygon(rings) => Value::Polygon(
            rings
                .iter()
                .map(|ring| ring.iter().map(|p| p.to_geojson()).collect())
                .collect(),
        ),
        Shape::Rectangle(bounds) => Value::Polygon(vec![
            rectangle_ring(bounds)
                .iter()
                .map(|p| p.to_geojson())
                .collect(),
        ]),
    };

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(layer.properties.clone()),
        foreign_members: None,
    }
}

pub fn from_feature(feature: &Feature) -> Result<Layer, DecodeError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| DecodeError::Malformed("feature has no geometry".to_string()))?;

    let shape = match &geometry.value {
        Value::Point(coords) => Shape::Point(Position::from_geojson(coords)?),
        Value::LineString(line) => {
            let positions = decode_positions(line)?;
            if positions.len() < 2 {
                return Err(DecodeError::Malformed(format!(
                    "line string needs at least two positions, got {}",
                    positions.len()
                )));
            }
            Shape::Polyline(positions)
        }
        Value::Polygon(rings) => {
            let rings = rings
                .iter()
                .map(|ring| decode_ring(ring))
                .collect::<Result<Vec<_>, _>>()?;
            if rings.is_empty() {
                return Err(DecodeError::Malformed("polygon has no rings".to_string()));
            }
            match as_rectangle(&rings) {
                Some(bounds) => Shape::Rectangle(bounds),
                None => Shape::Polygon(rings),
            }
        }
        Value::MultiPoint(_) => return Err(DecodeError::UnsupportedGeometry("MultiPoint")),
        Value::MultiLineString(_) => {
            return Err(DecodeError::UnsupportedGeometry("MultiLineString"));
        }
        Value::MultiPolygon(_) => return Err(DecodeError::UnsupportedGeometry("MultiPolygon")),
        Value::GeometryCollection(_) => {
            return Err(DecodeError::UnsupportedGeometry("GeometryCollection"));
        }
    };

    Ok(Layer {
        shape,
        properties: feature.properties.clone().unwrap_or_default(),
    })
}

pub fn parse_feature(text: &str) -> Result<Feature, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

pub fn feature_to_string(feature: &Feature) -> String {
    // Feature serialization only fails for non-string map keys, which JsonObject can't have.
    serde_json::to_string(feature).unwrap_or_default()
}

fn decode_positions(coords: &[Vec<f64>]) -> Result<Vec<Position>, DecodeError> {
    coords.iter().map(|c| Position::from_geojson(c)).collect()
}

fn decode_ring(coords: &[Vec<f64>]) -> Result<Ring, DecodeError> {
    let ring = decode_positions(coords)?;
    if ring.len() < 4 {
        return Err(DecodeError::Malformed(format!(
            "polygon ring needs at least four positions, got {}",
            ring.len()
        )));
    }
    if ring.first() != ring.last() {
        return Err(DecodeError::Malformed("polygon ring is not closed".to_string()));
    }
    Ok(ring)
}

// south-west, north-west, north-east, south-east, back to south-west
fn rectangle_ring(bounds: &Bounds) -> Ring {
    vec![
        Position::new(bounds.west, bounds.south),
        Position::new(bounds.west, bounds.north),
        Position::new(bounds.east, bounds.north),
        Position::new(bounds.east, bounds.south),
        Position::new(bounds.west, bounds.south),
    ]
}

/// Recognise the exact ring [`to_feature`] writes for a rectangle, so that
/// rectangles survive a round trip.
fn as_rectangle(rings: &[Ring]) -> Option<Bounds> {
    let [ring] = rings else {
        return None;
    };
    let first = ring.first()?;
    let opposite = ring.get(2)?;
    let bounds = Bounds::new(first.lng, first.lat, opposite.lng, opposite.lat);
    (!bounds.is_degenerate() && *ring == rectangle_ring(&bounds)).then_some(bounds)
}

use crux_core::capability::{Capability, CapabilityContext, Operation};
use geojson::{FeatureCollection, JsonObject};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::LngLat;
use crate::model::Suggestion;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum GeocodeOperation {
    /// Free-text search, optionally biased towards `bias`.
    Search {
        query: String,
        bias: Option<LngLat>,
        limit: u32,
    },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("geocoder returned status {status}")]
    Status { status: u16 },

    #[error("malformed geocoder response: {reason}")]
    Malformed { reason: String },
}

pub type GeocodeResult = Result<FeatureCollection, GeocodeError>;

impl Operation for GeocodeOperation {
    type Output = GeocodeResult;
}

pub struct Geocoder<Ev> {
    context: CapabilityContext<GeocodeOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geocoder<Ev> {
    type Operation = GeocodeOperation;
    type MappedSelf<MappedEv> = Geocoder<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Geocoder::new(self.context.map_event(f))
    }
}

impl<Ev> Geocoder<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<GeocodeOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn search<F>(&self, query: String, bias: Option<LngLat>, limit: u32, make_event: F)
    where
        F: FnOnce(GeocodeResult) -> Ev + Send + 'static,
        Ev: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(GeocodeOperation::Search { query, bias, limit })
                .await;
            ctx.update_app(make_event(result));
        });
    }
}

/// Location of the first `Point` feature, if any.
#[must_use]
pub fn first_point(features: &FeatureCollection) -> Option<LngLat> {
    features.features.iter().find_map(|feature| {
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Point(position)) => LngLat::from_position(position),
            _ => None,
        }
    })
}

/// Turns geocoder hits into labelled suggestions, dropping features without a
/// usable point or label and exact duplicates.
#[must_use]
pub fn suggestions_from_features(features: &FeatureCollection) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = Vec::new();
    for feature in &features.features {
        let location = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Point(position)) => LngLat::from_position(position),
            _ => None,
        };
        let Some(location) = location else { continue };
        let Some(label) = feature.properties.as_ref().and_then(suggestion_label) else {
            continue;
        };

        let candidate = Suggestion { label, location };
        if !suggestions.contains(&candidate) {
            suggestions.push(candidate);
        }
    }
    suggestions
}

/// "name, street, postcode city", skipping whatever is missing.
fn suggestion_label(properties: &JsonObject) -> Option<String> {
    let field = |key: &str| properties.get(key).and_then(property_text);

    let mut label = [field("name"), field("street")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

    if let Some(postcode) = field("postcode") {
        if !label.is_empty() {
            label.push_str(", ");
        }
        label.push_str(&postcode);
    }
    if let Some(city) = field("city") {
        if !label.is_empty() {
            label.push(' ');
        }
        label.push_str(&city);
    }

    (!label.is_empty()).then_some(label)
}

fn property_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, Geometry, Value};
    use serde_json::json;

    fn point_feature(lng: f64, lat: f64, properties: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![lng, lat]))),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    #[test]
    fn first_point_skips_non_points() {
        let line = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        let hits = collection(vec![line, point_feature(11.5, 48.1, json!({}))]);
        assert_eq!(first_point(&hits), Some(LngLat { lng: 11.5, lat: 48.1 }));
        assert_eq!(first_point(&collection(Vec::new())), None);
    }

    #[test]
    fn labels_join_available_fields() {
        let hits = collection(vec![
            point_feature(
                11.5,
                48.1,
                json!({ "name": "Marienplatz", "street": "Dienerstraße", "postcode": "80331", "city": "München" }),
            ),
            point_feature(11.6, 48.2, json!({ "city": "Freising" })),
            point_feature(11.7, 48.3, json!({ "name": "Nowhere", "postcode": 85354 })),
        ]);

        let labels: Vec<_> = suggestions_from_features(&hits)
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(
            labels,
            [
                "Marienplatz, Dienerstraße, 80331 München",
                "Freising",
                "Nowhere, 85354",
            ]
        );
    }

    #[test]
    fn suggestions_drop_duplicates_and_unlabelled_hits() {
        let hits = collection(vec![
            point_feature(11.5, 48.1, json!({ "name": "Odeonsplatz" })),
            point_feature(11.5, 48.1, json!({ "name": "Odeonsplatz" })),
            point_feature(11.5, 48.1, json!({})),
        ]);
        assert_eq!(suggestions_from_features(&hits).len(), 1);
    }
}

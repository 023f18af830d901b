// lib.rs - Bicycle navigation core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod geo;
pub mod guidance;
pub mod model;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::NavigationConfig;
pub use error::{ErrorKind, NavigationError};
pub use event::Event;
pub use geo::{BoundingBox, LngLat};
pub use model::{AppPhase, CameraPose, EndpointKind, NavigationSession, TurnInstruction};
pub use crux_core::{render::Render, App as CruxApp};

use crate::capabilities::RoutingProfile;
use crate::model::InputEndpoint;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EndpointView {
    pub text: String,
    pub is_resolved: bool,
    pub focused: bool,
    pub loading_suggestion: bool,
    pub suggestions: Vec<String>,
}

impl From<&InputEndpoint> for EndpointView {
    fn from(endpoint: &InputEndpoint) -> Self {
        Self {
            text: endpoint.text.clone(),
            is_resolved: endpoint.resolved_location.is_some(),
            focused: endpoint.focused,
            loading_suggestion: endpoint.loading_suggestion,
            suggestions: endpoint.suggestions.iter().map(|s| s.label.clone()).collect(),
        }
    }
}

/// Everything the shell needs to draw one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewModel {
    pub phase: AppPhase,
    pub camera: CameraPose,
    pub bounds: Option<BoundingBox>,
    /// Route as a GeoJSON `LineString`, ready for a map source.
    pub route_line: Option<geojson::Geometry>,
    pub turn_markers: Vec<TurnInstruction>,
    /// Icon identifier for the upcoming maneuver; empty when there is none.
    pub turn_icon: String,
    pub turn_text: String,
    pub is_off_path: bool,
    pub user_position: Option<LngLat>,
    pub user_heading: f64,
    pub from: EndpointView,
    pub to: EndpointView,
    pub profile: Option<RoutingProfile>,
    pub loading_route: bool,
    pub loading_gps: bool,
    pub can_request_route: bool,
}

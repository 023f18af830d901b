use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::{RouteResponse, RoutingProfile, WakeLockId, WatchId};
use crate::config::NavigationConfig;
use crate::geo::{BoundingBox, LngLat};
use crate::guidance::TurnDisplay;

pub const START_INSTRUCTION: &str = "Start";
pub const DESTINATION_INSTRUCTION: &str = "Destination";
pub const CURRENT_LOCATION_LABEL: &str = "Current Location";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppPhase {
    #[default]
    SearchingRoute,
    DisplayingRoute,
    Routing,
    FinishedRouting,
}

impl AppPhase {
    /// Phases in which the camera follows the rider.
    #[must_use]
    pub const fn follows_position(self) -> bool {
        matches!(self, Self::Routing | Self::FinishedRouting)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub center: LngLat,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    From,
    To,
}

impl EndpointKind {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::From => Self::To,
            Self::To => Self::From,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub label: String,
    pub location: LngLat,
}

/// One of the two search fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct InputEndpoint {
    pub text: String,
    pub resolved_location: Option<LngLat>,
    pub focused: bool,
    pub loading_suggestion: bool,
    pub suggestions: Vec<Suggestion>,
}

impl InputEndpoint {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn edit(&mut self, text: String) {
        self.text = text;
        self.resolved_location = None;
    }

    pub(crate) fn snap_to(&mut self, label: &str, location: LngLat) {
        self.text = label.to_string();
        self.resolved_location = Some(location);
        self.suggestions.clear();
        self.focused = false;
    }

    pub(crate) fn apply_suggestion(&mut self, suggestion: Suggestion) {
        self.text = suggestion.label;
        self.resolved_location = Some(suggestion.location);
        self.suggestions.clear();
        self.focused = false;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TurnInstruction {
    pub coordinate: LngLat,
    pub instruction: String,
}

impl TurnInstruction {
    pub fn new(coordinate: LngLat, instruction: impl Into<String>) -> Self {
        Self {
            coordinate,
            instruction: instruction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route response contains no features")]
    NoFeatures,
    #[error("route geometry is not a LineString")]
    NotALineString,
    #[error("route geometry has no usable points")]
    EmptyGeometry,
}

/// A loaded route: the line to draw and the waypoints to announce.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    geometry: Vec<LngLat>,
    turn_instructions: Vec<TurnInstruction>,
}

impl Route {
    pub fn new(
        geometry: Vec<LngLat>,
        turn_instructions: Vec<TurnInstruction>,
    ) -> Result<Self, RouteError> {
        if geometry.is_empty() {
            return Err(RouteError::EmptyGeometry);
        }
        Ok(Self {
            geometry,
            turn_instructions,
        })
    }

    /// Builds a route from the routing backend's answer. The backend only
    /// names intermediate turns; start and destination are added here.
    pub fn from_response(
        from: LngLat,
        to: LngLat,
        response: RouteResponse,
    ) -> Result<Self, RouteError> {
        let feature = response
            .geometry
            .features
            .first()
            .ok_or(RouteError::NoFeatures)?;

        let geometry = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::LineString(line)) => line
                .iter()
                .filter_map(|position| LngLat::from_position(position))
                .collect::<Vec<_>>(),
            _ => return Err(RouteError::NotALineString),
        };

        let mut turn_instructions = Vec::with_capacity(response.waypoints.len() + 2);
        turn_instructions.push(TurnInstruction::new(from, START_INSTRUCTION));
        turn_instructions.extend(response.waypoints);
        turn_instructions.push(TurnInstruction::new(to, DESTINATION_INSTRUCTION));

        Self::new(geometry, turn_instructions)
    }

    #[must_use]
    pub fn geometry(&self) -> &[LngLat] {
        &self.geometry
    }

    #[must_use]
    pub fn turn_instructions(&self) -> &[TurnInstruction] {
        &self.turn_instructions
    }

    #[must_use]
    pub fn first_point(&self) -> Option<LngLat> {
        self.geometry.first().copied()
    }

    #[must_use]
    pub fn line_string(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::LineString(
            self.geometry.iter().map(|p| p.to_position()).collect(),
        ))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionWatch {
    #[default]
    Inactive,
    Starting,
    Active(WatchId),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WakeLockState {
    #[default]
    Released,
    Acquiring,
    Held(WakeLockId),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Bookkeeping for the route request currently in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PendingRoute {
    pub id: RequestId,
    pub from_geocoded: bool,
    pub to_geocoded: bool,
    pub endpoints: Option<(LngLat, LngLat)>,
    pub then_begin_guidance: bool,
}

impl PendingRoute {
    pub(crate) fn new(id: RequestId, then_begin_guidance: bool) -> Self {
        Self {
            id,
            from_geocoded: false,
            to_geocoded: false,
            endpoints: None,
            then_begin_guidance,
        }
    }
}

/// The navigation session. A single instance is owned by the core and
/// mutated only from `update`.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationSession {
    pub(crate) phase: AppPhase,
    pub(crate) camera: CameraPose,
    pub(crate) route: Option<Route>,
    pub(crate) bounds: Option<BoundingBox>,
    pub(crate) position: Option<LngLat>,
    pub(crate) heading: f64,
    pub(crate) off_path: bool,
    pub(crate) from: InputEndpoint,
    pub(crate) to: InputEndpoint,
    pub(crate) profile: Option<RoutingProfile>,
    pub(crate) turn_display: TurnDisplay,

    pub(crate) position_watch: PositionWatch,
    pub(crate) wake_lock: WakeLockState,
    pub(crate) loading_route: bool,
    pub(crate) loading_gps: bool,

    pub(crate) pending_route: Option<PendingRoute>,
    pub(crate) pending_snap: Option<EndpointKind>,
    pub(crate) next_request_id: u64,
    pub(crate) epoch: u64,

    pub(crate) config: NavigationConfig,
}

impl Default for NavigationSession {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}

impl NavigationSession {
    #[must_use]
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            phase: AppPhase::SearchingRoute,
            camera: CameraPose {
                center: config.initial_center,
                zoom: config.initial_zoom,
                bearing: 0.0,
                pitch: 0.0,
            },
            route: None,
            bounds: None,
            position: None,
            heading: 0.0,
            off_path: false,
            from: InputEndpoint::default(),
            to: InputEndpoint::default(),
            profile: None,
            turn_display: TurnDisplay::default(),
            position_watch: PositionWatch::Inactive,
            wake_lock: WakeLockState::Released,
            loading_route: false,
            loading_gps: false,
            pending_route: None,
            pending_snap: None,
            next_request_id: 0,
            epoch: 0,
            config,
        }
    }

    // --- Reads ---

    #[must_use]
    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    #[must_use]
    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn turn_instructions(&self) -> &[TurnInstruction] {
        self.route.as_ref().map_or(&[], Route::turn_instructions)
    }

    #[must_use]
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    #[must_use]
    pub fn position(&self) -> Option<LngLat> {
        self.position
    }

    #[must_use]
    pub fn heading(&self) -> f64 {
        self.heading
    }

    #[must_use]
    pub fn is_off_path(&self) -> bool {
        self.off_path
    }

    #[must_use]
    pub fn endpoint(&self, kind: EndpointKind) -> &InputEndpoint {
        match kind {
            EndpointKind::From => &self.from,
            EndpointKind::To => &self.to,
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<RoutingProfile> {
        self.profile
    }

    #[must_use]
    pub fn turn_display(&self) -> &TurnDisplay {
        &self.turn_display
    }

    #[must_use]
    pub fn position_watch(&self) -> PositionWatch {
        self.position_watch
    }

    #[must_use]
    pub fn wake_lock(&self) -> WakeLockState {
        self.wake_lock
    }

    #[must_use]
    pub fn is_loading_route(&self) -> bool {
        self.loading_route
    }

    #[must_use]
    pub fn is_loading_gps(&self) -> bool {
        self.loading_gps
    }

    #[must_use]
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    // --- Mutations ---

    pub(crate) fn set_phase(&mut self, phase: AppPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase transition");
        }
        self.phase = phase;
    }

    pub(crate) fn camera_mut(&mut self) -> &mut CameraPose {
        &mut self.camera
    }

    pub(crate) fn endpoint_mut(&mut self, kind: EndpointKind) -> &mut InputEndpoint {
        match kind {
            EndpointKind::From => &mut self.from,
            EndpointKind::To => &mut self.to,
        }
    }

    pub(crate) fn set_position(&mut self, position: LngLat, heading: Option<f64>) {
        self.position = Some(position);
        if let Some(heading) = heading {
            self.heading = heading;
        }
    }

    /// Stores the off-path verdict; returns `true` only when it flipped.
    pub(crate) fn set_off_path(&mut self, off_path: bool) -> bool {
        if self.off_path == off_path {
            return false;
        }
        self.off_path = off_path;
        true
    }

    pub(crate) fn set_turn_display(&mut self, display: TurnDisplay) {
        self.turn_display = display;
    }

    pub(crate) fn replace_route(&mut self, route: Route, bounds: Option<BoundingBox>) {
        self.route = Some(route);
        self.bounds = bounds;
    }

    pub(crate) fn clear_route(&mut self) {
        self.route = None;
    }

    pub(crate) fn issue_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        RequestId(self.next_request_id)
    }

    pub(crate) fn is_current_request(&self, id: RequestId) -> bool {
        self.pending_route.is_some_and(|pending| pending.id == id)
    }

    pub(crate) fn has_requests_in_flight(&self) -> bool {
        self.pending_route.is_some() || self.from.loading_suggestion || self.to.loading_suggestion
    }

    /// Invalidates every response still on its way back from the shell.
    pub(crate) fn invalidate_requests(&mut self) {
        if self.has_requests_in_flight() {
            self.epoch += 1;
            debug!(epoch = self.epoch, "invalidated in-flight requests");
        }
        self.pending_route = None;
        self.loading_route = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Feature, FeatureCollection, Geometry, Value};

    fn p(lng: f64, lat: f64) -> LngLat {
        LngLat { lng, lat }
    }

    fn collection(value: Option<Value>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: value.map(Geometry::new),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        }
    }

    #[test]
    fn session_starts_searching_with_initial_camera() {
        let session = NavigationSession::default();
        assert_eq!(session.phase(), AppPhase::SearchingRoute);
        assert_eq!(session.camera().zoom, crate::config::INITIAL_ZOOM);
        assert_eq!(session.camera().center, crate::config::INITIAL_CENTER);
        assert!(session.route().is_none());
        assert!(session.turn_instructions().is_empty());
        assert_eq!(session.endpoint(EndpointKind::From), &InputEndpoint::default());
    }

    #[test]
    fn route_from_response_adds_start_and_destination() {
        let response = RouteResponse {
            geometry: collection(Some(Value::LineString(vec![
                vec![1.0, 1.0],
                vec![1.5, 1.5],
                vec![2.0, 2.0],
            ]))),
            waypoints: vec![TurnInstruction::new(p(1.5, 1.5), "right")],
        };

        let route = Route::from_response(p(1.0, 1.0), p(2.0, 2.0), response).unwrap();

        let labels: Vec<_> = route
            .turn_instructions()
            .iter()
            .map(|t| t.instruction.as_str())
            .collect();
        assert_eq!(labels, ["Start", "right", "Destination"]);
        assert_eq!(route.turn_instructions()[2].coordinate, p(2.0, 2.0));
        assert_eq!(route.geometry().len(), 3);
        assert_eq!(route.first_point(), Some(p(1.0, 1.0)));
    }

    #[test]
    fn route_rejects_non_linear_geometry() {
        let response = RouteResponse {
            geometry: collection(Some(Value::Point(vec![1.0, 1.0]))),
            waypoints: Vec::new(),
        };
        assert_eq!(
            Route::from_response(p(0.0, 0.0), p(1.0, 1.0), response),
            Err(RouteError::NotALineString)
        );
    }

    #[test]
    fn route_rejects_empty_feature_collection() {
        let response = RouteResponse {
            geometry: FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
            waypoints: Vec::new(),
        };
        assert_eq!(
            Route::from_response(p(0.0, 0.0), p(1.0, 1.0), response),
            Err(RouteError::NoFeatures)
        );
    }

    #[test]
    fn route_rejects_line_without_valid_points() {
        let response = RouteResponse {
            geometry: collection(Some(Value::LineString(vec![vec![f64::NAN, 1.0]]))),
            waypoints: Vec::new(),
        };
        assert_eq!(
            Route::from_response(p(0.0, 0.0), p(1.0, 1.0), response),
            Err(RouteError::EmptyGeometry)
        );
    }

    #[test]
    fn line_string_round_trips_points() {
        let route = Route::new(vec![p(1.0, 2.0), p(3.0, 4.0)], Vec::new()).unwrap();
        match route.line_string().value {
            Value::LineString(line) => assert_eq!(line, vec![vec![1.0, 2.0], vec![3.0, 4.0]]),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn off_path_reports_only_flips() {
        let mut session = NavigationSession::default();
        assert!(!session.set_off_path(false));
        assert!(session.set_off_path(true));
        assert!(!session.set_off_path(true));
        assert!(session.set_off_path(false));
    }

    #[test]
    fn editing_text_drops_resolution() {
        let mut endpoint = InputEndpoint::default();
        endpoint.snap_to(CURRENT_LOCATION_LABEL, p(1.0, 1.0));
        assert_eq!(endpoint.resolved_location, Some(p(1.0, 1.0)));
        endpoint.edit("Munich".into());
        assert_eq!(endpoint.text, "Munich");
        assert!(endpoint.resolved_location.is_none());
    }

    #[test]
    fn invalidation_bumps_epoch_only_when_needed() {
        let mut session = NavigationSession::default();
        session.invalidate_requests();
        assert_eq!(session.epoch, 0);

        let id = session.issue_request_id();
        session.pending_route = Some(PendingRoute::new(id, false));
        session.loading_route = true;
        assert!(session.is_current_request(id));

        session.invalidate_requests();
        assert_eq!(session.epoch, 1);
        assert!(!session.is_current_request(id));
        assert!(!session.is_loading_route());
    }
}

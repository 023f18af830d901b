use serde::{Deserialize, Serialize};

use crate::capabilities::{
    GeocodeResult, LocationOutput, RouteResult, RoutingProfile, WakeLockOutput, WatchId,
};
use crate::geo::LngLat;
use crate::model::{EndpointKind, RequestId};

// --- Event enum: capability responses boxed and kept out of the shell API ---

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Event {
    // Configuration
    ConfigurationLoaded {
        json: String,
    },

    // Search inputs
    EndpointTextChanged {
        endpoint: EndpointKind,
        text: String,
    },
    EndpointFocused {
        endpoint: EndpointKind,
    },
    SuggestionsRequested {
        endpoint: EndpointKind,
    },
    SuggestionSelected {
        endpoint: EndpointKind,
        index: usize,
    },
    UseCurrentPosition {
        endpoint: EndpointKind,
    },
    ProfileSelected {
        profile: RoutingProfile,
    },

    // Map
    CameraMoved {
        center: LngLat,
        zoom: f64,
        bearing: f64,
        pitch: f64,
    },

    // Session lifecycle
    RouteRequested,
    StartNavigation,
    FinishNavigation,
    ResetToHome,
    RecalculateRoute,

    // Device
    PositionChanged {
        watch: WatchId,
        position: LngLat,
        heading: Option<f64>,
    },
    PositionFailed {
        watch: WatchId,
        message: String,
    },
    /// Rider marker dragged on the map.
    PositionOverridden {
        position: LngLat,
    },

    // Capability responses
    #[serde(skip)]
    Geocoded {
        request: RequestId,
        endpoint: EndpointKind,
        result: Box<GeocodeResult>,
    },
    #[serde(skip)]
    RouteFetched {
        request: RequestId,
        result: Box<RouteResult>,
    },
    #[serde(skip)]
    SuggestionsFetched {
        endpoint: EndpointKind,
        epoch: u64,
        result: Box<GeocodeResult>,
    },
    #[serde(skip)]
    WatchStarted(LocationOutput),
    #[serde(skip)]
    WakeLockChanged(WakeLockOutput),
}

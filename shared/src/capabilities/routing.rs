use crux_core::capability::{Capability, CapabilityContext, Operation};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::LngLat;
use crate::model::TurnInstruction;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RoutingProfile {
    Trekking,
    RoadBike,
    Gravel,
    MountainBike,
}

impl RoutingProfile {
    pub const ALL: [Self; 4] = [Self::Trekking, Self::RoadBike, Self::Gravel, Self::MountainBike];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trekking => "Trekking",
            Self::RoadBike => "Road bike",
            Self::Gravel => "Gravel",
            Self::MountainBike => "Mountainbike",
        }
    }

    /// Profile name understood by the routing backend.
    #[must_use]
    pub const fn backend_name(self) -> &'static str {
        match self {
            Self::Trekking => "trekking",
            Self::RoadBike => "fastbike",
            Self::Gravel => "gravel",
            Self::MountainBike => "mtb",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RouteOperation {
    Fetch {
        from: LngLat,
        to: LngLat,
        profile: String,
    },
}

/// Track plus the named turn waypoints between start and destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub geometry: FeatureCollection,
    pub waypoints: Vec<TurnInstruction>,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoutingError {
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("routing backend returned status {status}")]
    Status { status: u16 },

    #[error("malformed route document: {reason}")]
    Malformed { reason: String },
}

pub type RouteResult = Result<RouteResponse, RoutingError>;

impl Operation for RouteOperation {
    type Output = RouteResult;
}

pub struct Routing<Ev> {
    context: CapabilityContext<RouteOperation, Ev>,
}

impl<Ev> Capability<Ev> for Routing<Ev> {
    type Operation = RouteOperation;
    type MappedSelf<MappedEv> = Routing<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Routing::new(self.context.map_event(f))
    }
}

impl<Ev> Routing<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<RouteOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn fetch<F>(&self, from: LngLat, to: LngLat, profile: RoutingProfile, make_event: F)
    where
        F: FnOnce(RouteResult) -> Ev + Send + 'static,
        Ev: Send,
    {
        let operation = RouteOperation::Fetch {
            from,
            to,
            profile: profile.backend_name().to_string(),
        };
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        let names: Vec<_> = RoutingProfile::ALL.iter().map(|p| p.backend_name()).collect();
        assert_eq!(names, ["trekking", "fastbike", "gravel", "mtb"]);
    }

    #[test]
    fn fetch_operation_serializes_points_longitude_first() {
        let op = RouteOperation::Fetch {
            from: LngLat { lng: 8.5, lat: 47.3 },
            to: LngLat { lng: 8.6, lat: 47.4 },
            profile: RoutingProfile::Gravel.backend_name().into(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["Fetch"]["from"], serde_json::json!([8.5, 47.3]));
        assert_eq!(json["Fetch"]["profile"], "gravel");
    }
}

mod alert;
mod geocoder;
mod location;
mod routing;
mod wake_lock;

pub use self::alert::{Alert, AlertOperation};
pub use self::geocoder::{
    first_point, suggestions_from_features, GeocodeError, GeocodeOperation, GeocodeResult,
    Geocoder,
};
pub use self::location::{Location, LocationOperation, LocationOutput, WatchId};
pub use self::routing::{
    RouteOperation, RouteResponse, RouteResult, Routing, RoutingError, RoutingProfile,
};
pub use self::wake_lock::{WakeLock, WakeLockId, WakeLockOperation, WakeLockOutput};

pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub routing: Routing<Event>,
    pub geocoder: Geocoder<Event>,
    pub location: Location<Event>,
    pub wake_lock: WakeLock<Event>,
    pub alert: Alert<Event>,
}

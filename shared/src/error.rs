use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Collaborator,
    Location,
    InvalidState,
}

/// Everything the core ever shows to the rider. `Display` is the exact alert text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum NavigationError {
    #[error("Could not find coords for {0}")]
    OriginNotFound(String),

    #[error("Could not find coords for {0}")]
    DestinationNotFound(String),

    #[error("Please select a routing profile.")]
    ProfileNotSelected,

    #[error("Failed to calculate route. Please try again.")]
    RouteCalculationFailed,

    #[error("Cannot recalculate route: Current location unknown.")]
    PositionUnknownForRecalculation,

    #[error(
        "Could not get current location. Please ensure GPS is enabled and permissions are granted."
    )]
    PositionUnavailable,

    #[error("Geolocation is not supported on this device.")]
    GeolocationUnsupported,
}

impl NavigationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OriginNotFound(_) | Self::DestinationNotFound(_) | Self::ProfileNotSelected => {
                ErrorKind::Validation
            }
            Self::RouteCalculationFailed => ErrorKind::Collaborator,
            Self::PositionUnavailable | Self::GeolocationUnsupported => ErrorKind::Location,
            Self::PositionUnknownForRecalculation => ErrorKind::InvalidState,
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        self.to_string()
    }
}

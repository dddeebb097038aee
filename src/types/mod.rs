pub mod message;
pub mod session;

pub use message::{Message, Origin};
pub use session::Session;

use serde::{Deserialize, Serialize};

/// The closed set of expert capabilities the dispatcher may route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Hotel,
    Weather,
    Place,
    Flight,
    Geolocation,
}

/// Wire name of the terminal routing decision.
pub const FINISH: &str = "FINISH";

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 5] = [
        CapabilityKind::Hotel,
        CapabilityKind::Weather,
        CapabilityKind::Place,
        CapabilityKind::Flight,
        CapabilityKind::Geolocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Hotel => "hotel_search_expert",
            CapabilityKind::Weather => "weather_expert",
            CapabilityKind::Place => "place_search_expert",
            CapabilityKind::Flight => "flight_fares_search_expert",
            CapabilityKind::Geolocation => "geolocation_expert",
        }
    }

    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "hotel_search_expert" => Some(CapabilityKind::Hotel),
            "weather_expert" => Some(CapabilityKind::Weather),
            "place_search_expert" => Some(CapabilityKind::Place),
            "flight_fares_search_expert" => Some(CapabilityKind::Flight),
            "geolocation_expert" => Some(CapabilityKind::Geolocation),
            _ => None,
        }
    }

    /// One-line summary used when presenting the capability set to the routing model.
    pub fn summary(&self) -> &'static str {
        match self {
            CapabilityKind::Hotel => {
                "finds real-time hotels for a location, travel dates, and optional star-rating filters"
            }
            CapabilityKind::Weather => "returns current weather for a given city",
            CapabilityKind::Place => {
                "suggests attractions, restaurants, and cultural spots near a location"
            }
            CapabilityKind::Flight => {
                "finds flights and fares between two IATA codes on a specific date"
            }
            CapabilityKind::Geolocation => {
                "resolves a place name to coordinates and a bounding box"
            }
        }
    }
}

/// Where a routing decision sends control next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteTarget {
    Capability(CapabilityKind),
    Finish,
}

impl RouteTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTarget::Capability(kind) => kind.as_str(),
            RouteTarget::Finish => FINISH,
        }
    }

    /// Parse a wire name. Anything outside the closed set is `None`, which the
    /// caller must treat as an unknown-capability error, never a no-op.
    pub fn parse(name: &str) -> Option<Self> {
        if name == FINISH {
            return Some(RouteTarget::Finish);
        }
        CapabilityKind::from_str(name).map(RouteTarget::Capability)
    }
}

/// One decision produced by the oracle per dispatch cycle.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub next: RouteTarget,
    /// Informational only; never used for control flow.
    pub reason: Option<String>,
}

impl RoutingDecision {
    pub fn capability(kind: CapabilityKind) -> Self {
        Self {
            next: RouteTarget::Capability(kind),
            reason: None,
        }
    }

    pub fn finish() -> Self {
        Self {
            next: RouteTarget::Finish,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The oracle returned the terminal decision.
    Complete,
    /// The cycle limit was reached before a terminal decision.
    Inconclusive,
}

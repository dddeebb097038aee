pub mod flights;
pub mod geocode;
pub mod hotels;
pub mod llm;
pub mod places;
pub mod weather;

pub use flights::FlightsProvider;
pub use geocode::GeocodeProvider;
pub use hotels::HotelsProvider;
pub use llm::{ChatMessage, LLMProvider};
pub use places::PlacesProvider;
pub use weather::WeatherProvider;

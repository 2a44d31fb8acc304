//! MET Norway weather provider for Nimbus.
//!
//! Forecasts come from MET Norway's locationforecast API, sun and moon data
//! from its sunrise API, and place names from OpenStreetMap Nominatim.
//! [`MetNoWeatherService`] ties them together behind callbacks.

pub mod callback;
pub mod convert;
mod de;
pub mod error;
mod http;
pub mod metno;
pub mod nominatim;
pub mod registry;
pub mod service;
pub mod timezone;
pub mod types;

pub use callback::{LocationCallback, ServiceMessage, WeatherCallback};
pub use convert::{MetNoConverter, WeatherConverter, WeatherResultWrapper};
pub use error::WeatherError;
pub use metno::{EphemerisResult, ForecastResult, MetNoApi, MetNoClient};
pub use nominatim::{GeocodeParams, NominatimApi, NominatimClient, NominatimLocationResult};
pub use registry::RequestRegistry;
pub use service::MetNoWeatherService;
pub use types::{
    CurrentWeather, DayForecast, HourlyForecast, Location, WeatherCondition, WeatherData,
};

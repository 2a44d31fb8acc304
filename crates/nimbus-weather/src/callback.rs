//! Result delivery for asynchronous requests.
//!
//! Callbacks run on a runtime worker. A UI that needs results on its own
//! thread can pass an `mpsc::Sender<ServiceMessage>` and drain the receiver.

use std::sync::mpsc::Sender;

use crate::types::Location;

pub trait WeatherCallback: Send + Sync {
    /// `location` carries the converted weather.
    fn on_weather_success(&self, location: Location);

    /// `location` is the location as requested, without new weather.
    fn on_weather_failure(&self, location: Location, is_rate_limited: bool, is_unauthorized: bool);
}

pub trait LocationCallback: Send + Sync {
    /// `query` is the search text, or the `"<lat>,<lon>"` key for a reverse lookup.
    fn on_location_success(&self, query: String, locations: Vec<Location>);

    fn on_location_failure(&self, query: String);
}

/// Callback outcomes as channel messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceMessage {
    WeatherSucceeded(Location),
    WeatherFailed {
        location: Location,
        is_rate_limited: bool,
        is_unauthorized: bool,
    },
    LocationsSucceeded {
        query: String,
        locations: Vec<Location>,
    },
    LocationsFailed(String),
}

// A dropped receiver means nobody is listening any more.
impl WeatherCallback for Sender<ServiceMessage> {
    fn on_weather_success(&self, location: Location) {
        let _ = self.send(ServiceMessage::WeatherSucceeded(location));
    }

    fn on_weather_failure(&self, location: Location, is_rate_limited: bool, is_unauthorized: bool) {
        let _ = self.send(ServiceMessage::WeatherFailed {
            location,
            is_rate_limited,
            is_unauthorized,
        });
    }
}

impl LocationCallback for Sender<ServiceMessage> {
    fn on_location_success(&self, query: String, locations: Vec<Location>) {
        let _ = self.send(ServiceMessage::LocationsSucceeded { query, locations });
    }

    fn on_location_failure(&self, query: String) {
        let _ = self.send(ServiceMessage::LocationsFailed(query));
    }
}

//! MET Norway weather service: forecast + ephemeris joined into one weather
//! result, plus Nominatim location search.
//!
//! Every asynchronous request runs as a task on the service's runtime and
//! reports through a callback. `cancel()` drops all of them at once.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use nimbus_core::{AppContext, Config};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::callback::{LocationCallback, WeatherCallback};
use crate::convert::{
    convert_reverse_result, convert_search_results, MetNoConverter, WeatherConverter,
};
use crate::error::WeatherError;
use crate::metno::{MetNoApi, MetNoClient};
use crate::nominatim::{GeocodeParams, NominatimApi, NominatimClient};
use crate::registry::RequestRegistry;
use crate::timezone::{local_date_string, utc_offset_at};
use crate::types::Location;

/// Days of sun and moon data requested alongside the forecast.
pub const EPHEMERIS_DAYS: u32 = 15;

enum WeatherOutcome {
    Success(Location),
    Failure {
        location: Location,
        is_rate_limited: bool,
        is_unauthorized: bool,
    },
}

pub struct MetNoWeatherService {
    api: Arc<dyn MetNoApi>,
    nominatim: Arc<dyn NominatimApi>,
    converter: Arc<dyn WeatherConverter>,
    runtime: Handle,
    registry: Arc<RequestRegistry>,
}

impl MetNoWeatherService {
    pub fn new(
        api: Arc<dyn MetNoApi>,
        nominatim: Arc<dyn NominatimApi>,
        converter: Arc<dyn WeatherConverter>,
        runtime: Handle,
    ) -> Self {
        Self {
            api,
            nominatim,
            converter,
            runtime,
            registry: Arc::new(RequestRegistry::new()),
        }
    }

    /// Service talking to the configured MET Norway and Nominatim hosts.
    ///
    /// Fails when the configured default timezone is unknown.
    pub fn from_config(config: &Config, runtime: Handle) -> Result<Self, WeatherError> {
        config.weather.timezone()?;

        let timeout = config.weather.request_timeout();
        let api = MetNoClient::new(&config.weather.metno_base_url, timeout)?;
        let nominatim = NominatimClient::new(&config.weather.nominatim_base_url, timeout)?;

        Ok(Self::new(
            Arc::new(api),
            Arc::new(nominatim),
            Arc::new(MetNoConverter),
            runtime,
        ))
    }

    /// Fetch forecast and ephemeris for `location` concurrently and report the
    /// converted weather. Either call failing fails the whole request.
    pub fn request_weather<C>(&self, context: &AppContext, location: &Location, callback: C)
    where
        C: WeatherCallback + 'static,
    {
        let user_agent = context.user_agent();
        let api = Arc::clone(&self.api);
        let converter = Arc::clone(&self.converter);
        let location = location.clone();

        let work = async move {
            let now = Utc::now();
            let date = local_date_string(location.timezone, now);
            let offset = utc_offset_at(location.timezone, now);
            let (lat, lon) = (location.latitude, location.longitude);
            debug!("Requesting weather for {} ({}, {})", location.key(), date, offset);

            let joined = tokio::try_join!(
                api.forecast(&user_agent, lat, lon),
                api.ephemeris(&user_agent, &date, EPHEMERIS_DAYS, lat, lon, &offset),
            );

            match joined {
                Ok((forecast, ephemeris)) => {
                    let wrapper = converter.convert(&location, forecast, ephemeris);
                    match wrapper.result {
                        Some(weather) => WeatherOutcome::Success(location.with_weather(weather)),
                        None => {
                            if let Some(e) = &wrapper.failure {
                                debug!("No weather converted for {}: {}", location.key(), e);
                            }
                            WeatherOutcome::Failure {
                                location,
                                is_rate_limited: false,
                                is_unauthorized: false,
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Weather request for {} failed: {}", location.key(), e);
                    WeatherOutcome::Failure {
                        is_rate_limited: e.is_rate_limited(),
                        is_unauthorized: e.is_unauthorized(),
                        location,
                    }
                }
            }
        };

        self.spawn_request(work, move |outcome| match outcome {
            WeatherOutcome::Success(location) => callback.on_weather_success(location),
            WeatherOutcome::Failure {
                location,
                is_rate_limited,
                is_unauthorized,
            } => callback.on_weather_failure(location, is_rate_limited, is_unauthorized),
        });
    }

    /// Reverse-geocode `location`. Reports one location keyed by
    /// `"<lat>,<lon>"`, or a failure under the same key.
    pub fn request_location_by_coordinates<C>(
        &self,
        context: &AppContext,
        location: &Location,
        callback: C,
    ) where
        C: LocationCallback + 'static,
    {
        let params = geocode_params(context);
        let nominatim = Arc::clone(&self.nominatim);
        let location = location.clone();

        let work = async move {
            let key = location.key();
            debug!("Reverse geocoding {}", key);

            let found = match nominatim
                .reverse(&params, location.latitude, location.longitude)
                .await
            {
                Ok(Some(result)) => Some(vec![convert_reverse_result(&location, result)]),
                Ok(None) => None,
                Err(e) => {
                    warn!("Reverse geocoding {} failed: {}", key, e);
                    None
                }
            };
            (key, found)
        };

        self.spawn_request(work, move |(key, found)| match found {
            Some(locations) => callback.on_location_success(key, locations),
            None => callback.on_location_failure(key),
        });
    }

    /// Search places by name. An empty result counts as a failure.
    pub fn request_locations_by_query<C>(&self, context: &AppContext, query: &str, callback: C)
    where
        C: LocationCallback + 'static,
    {
        let params = geocode_params(context);
        let timezone = search_timezone(context);
        let nominatim = Arc::clone(&self.nominatim);
        let query = query.to_string();

        let work = async move {
            debug!("Searching locations for '{}'", query);

            let found = match nominatim.search(&params, &query).await {
                Ok(results) => convert_search_results(results, timezone),
                Err(e) => {
                    warn!("Location search for '{}' failed: {}", query, e);
                    Vec::new()
                }
            };
            (query, found)
        };

        self.spawn_request(work, move |(query, found)| {
            if found.is_empty() {
                callback.on_location_failure(query);
            } else {
                callback.on_location_success(query, found);
            }
        });
    }

    /// Search places by name, surfacing any provider error.
    pub async fn try_search_locations(
        &self,
        context: &AppContext,
        query: &str,
    ) -> Result<Vec<Location>, WeatherError> {
        let params = geocode_params(context);
        let timezone = search_timezone(context);

        let results = self.nominatim.search(&params, query).await?;
        Ok(convert_search_results(results, timezone))
    }

    /// Search places by name. Errors are logged and yield an empty list.
    pub async fn search_locations(&self, context: &AppContext, query: &str) -> Vec<Location> {
        match self.try_search_locations(context, query).await {
            Ok(locations) => locations,
            Err(e) => {
                warn!("Location search for '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }

    /// Blocking form of [`search_locations`](Self::search_locations).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context, like
    /// [`Handle::block_on`].
    pub fn search_locations_blocking(&self, context: &AppContext, query: &str) -> Vec<Location> {
        self.runtime.block_on(self.search_locations(context, query))
    }

    /// Abort every in-flight request. None of their callbacks fire afterwards.
    ///
    /// A callback that is already running when `cancel` is called finishes
    /// first; `cancel` returns after it.
    pub fn cancel(&self) {
        let cancelled = self.registry.clear();
        info!("Cancelled {} pending weather request(s)", cancelled);
    }

    pub fn pending_requests(&self) -> usize {
        self.registry.pending()
    }

    fn spawn_request<W, T, D>(&self, work: W, deliver: D)
    where
        W: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        D: FnOnce(T) + Send + 'static,
    {
        let token = self.registry.token();
        let registry = Arc::clone(&self.registry);

        let handle = self.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                outcome = work => outcome,
            };
            registry.deliver_if_current(&token, move || deliver(outcome));
        });

        self.registry.register(handle.abort_handle());
    }
}

fn geocode_params(context: &AppContext) -> GeocodeParams {
    GeocodeParams::city(context.user_agent(), context.language_code())
}

/// Nominatim results carry no timezone; they get the configured default.
fn search_timezone(context: &AppContext) -> Tz {
    context.default_timezone().unwrap_or_else(|e| {
        warn!("{}, using UTC for search results", e);
        chrono_tz::UTC
    })
}

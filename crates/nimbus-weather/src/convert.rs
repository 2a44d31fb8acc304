//! Conversion of provider payloads into Nimbus models.

use std::collections::HashMap;

use chrono::{NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::error::WeatherError;
use crate::metno::{EphemerisDay, EphemerisResult, ForecastResult, ForecastTimeseries};
use crate::nominatim::NominatimLocationResult;
use crate::types::{
    CurrentWeather, DayForecast, HourlyForecast, Location, WeatherCondition, WeatherData,
};

const HOURLY_LIMIT: usize = 24;
const DAY_STARTS_AT: u32 = 6;
const NIGHT_STARTS_AT: u32 = 18;

/// Outcome of a conversion: the weather, or why there is none.
#[derive(Debug)]
pub struct WeatherResultWrapper {
    pub result: Option<WeatherData>,
    pub failure: Option<WeatherError>,
}

impl WeatherResultWrapper {
    pub fn success(weather: WeatherData) -> Self {
        Self {
            result: Some(weather),
            failure: None,
        }
    }

    pub fn failed(error: WeatherError) -> Self {
        Self {
            result: None,
            failure: Some(error),
        }
    }
}

/// Turns a joined forecast/ephemeris pair into the app's weather model.
pub trait WeatherConverter: Send + Sync {
    fn convert(
        &self,
        location: &Location,
        forecast: ForecastResult,
        ephemeris: EphemerisResult,
    ) -> WeatherResultWrapper;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetNoConverter;

impl WeatherConverter for MetNoConverter {
    fn convert(
        &self,
        location: &Location,
        forecast: ForecastResult,
        ephemeris: EphemerisResult,
    ) -> WeatherResultWrapper {
        let Some(properties) = forecast.properties else {
            return WeatherResultWrapper::failed(WeatherError::EmptyResult(
                "forecast has no properties".to_string(),
            ));
        };
        let Some(first) = properties.timeseries.first() else {
            return WeatherResultWrapper::failed(WeatherError::EmptyResult(
                "forecast has an empty timeseries".to_string(),
            ));
        };
        let Some(current) = current_weather(first) else {
            return WeatherResultWrapper::failed(WeatherError::Conversion(format!(
                "forecast step at {} has no air temperature",
                first.time
            )));
        };

        let updated_at = properties
            .meta
            .as_ref()
            .and_then(|m| m.updated_at)
            .unwrap_or(first.time);

        WeatherResultWrapper::success(WeatherData {
            updated_at,
            current,
            daily: daily_forecasts(location.timezone, &properties.timeseries, &ephemeris),
            hourly: hourly_forecasts(&properties.timeseries),
        })
    }
}

fn condition_of(step: &ForecastTimeseries) -> WeatherCondition {
    step.symbol_code()
        .map(WeatherCondition::from_symbol_code)
        .unwrap_or_default()
}

fn current_weather(step: &ForecastTimeseries) -> Option<CurrentWeather> {
    let details = step.details()?;

    Some(CurrentWeather {
        temperature: details.air_temperature?,
        dew_point: details.dew_point_temperature,
        humidity: details.relative_humidity,
        pressure: details.air_pressure_at_sea_level,
        cloud_cover: details.cloud_area_fraction,
        wind_speed: details.wind_speed,
        wind_direction: details.wind_from_direction,
        uv_index: details.ultraviolet_index_clear_sky,
        condition: condition_of(step),
        observed_at: step.time,
    })
}

fn hourly_forecasts(series: &[ForecastTimeseries]) -> Vec<HourlyForecast> {
    series
        .iter()
        .filter_map(|step| {
            let next = step.data.as_ref()?.next_1_hours.as_ref()?;
            let details = next.details.as_ref();
            let condition = next
                .summary
                .as_ref()
                .and_then(|s| s.symbol_code.as_deref())
                .map(WeatherCondition::from_symbol_code)
                .unwrap_or_default();

            Some(HourlyForecast {
                time: step.time,
                temperature: step.details().and_then(|d| d.air_temperature),
                condition,
                precipitation: details.and_then(|d| d.precipitation_amount),
                precipitation_probability: details.and_then(|d| d.probability_of_precipitation),
            })
        })
        .take(HOURLY_LIMIT)
        .collect()
}

#[derive(Debug)]
struct DayAccumulator {
    date: NaiveDate,
    high: Option<f64>,
    low: Option<f64>,
    first_symbol: Option<String>,
    day_symbol: Option<String>,
    night_symbol: Option<String>,
    precipitation: f64,
    probability: Option<f64>,
}

impl DayAccumulator {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            high: None,
            low: None,
            first_symbol: None,
            day_symbol: None,
            night_symbol: None,
            precipitation: 0.0,
            probability: None,
        }
    }

    fn add(&mut self, step: &ForecastTimeseries, local_hour: u32) {
        if let Some(t) = step.details().and_then(|d| d.air_temperature) {
            self.high = Some(self.high.map_or(t, |h| h.max(t)));
            self.low = Some(self.low.map_or(t, |l| l.min(t)));
        }

        if let Some(period) = step.precipitation_period() {
            self.precipitation += period.precipitation_amount.unwrap_or(0.0);
            if let Some(p) = period.probability_of_precipitation {
                self.probability = Some(self.probability.map_or(p, |q| q.max(p)));
            }
        }

        if let Some(code) = step.symbol_code() {
            if self.first_symbol.is_none() {
                self.first_symbol = Some(code.to_string());
            }
            if self.day_symbol.is_none() && (DAY_STARTS_AT..NIGHT_STARTS_AT).contains(&local_hour) {
                self.day_symbol = Some(code.to_string());
            }
            if self.night_symbol.is_none() && local_hour >= NIGHT_STARTS_AT {
                self.night_symbol = Some(code.to_string());
            }
        }
    }

    fn finish(self, sun: Option<&EphemerisDay>) -> DayForecast {
        let to_condition = |code: Option<&String>| {
            code.map(|c| WeatherCondition::from_symbol_code(c))
                .unwrap_or_default()
        };
        let day_symbol = self.day_symbol.as_ref().or(self.first_symbol.as_ref());
        let night_symbol = self.night_symbol.as_ref().or(self.first_symbol.as_ref());

        DayForecast {
            date: self.date,
            high: self.high,
            low: self.low,
            day_condition: to_condition(day_symbol),
            night_condition: to_condition(night_symbol),
            precipitation: self.precipitation,
            precipitation_probability: self.probability,
            sunrise: sun.and_then(|s| s.sunrise.as_ref()?.utc()),
            sunset: sun.and_then(|s| s.sunset.as_ref()?.utc()),
            moonrise: sun.and_then(|s| s.moonrise.as_ref()?.utc()),
            moonset: sun.and_then(|s| s.moonset.as_ref()?.utc()),
            moon_phase: sun.and_then(|s| s.moonphase.as_ref()?.value),
        }
    }
}

/// Group forecast steps by local calendar day. Steps arrive in time order.
fn daily_forecasts(
    timezone: Tz,
    series: &[ForecastTimeseries],
    ephemeris: &EphemerisResult,
) -> Vec<DayForecast> {
    let mut days: Vec<DayAccumulator> = Vec::new();

    for step in series {
        let local = step.time.with_timezone(&timezone);
        let date = local.date_naive();

        if days.last().map(|d| d.date) != Some(date) {
            days.push(DayAccumulator::new(date));
        }
        if let Some(day) = days.last_mut() {
            day.add(step, local.hour());
        }
    }

    let sun_by_date: HashMap<NaiveDate, &EphemerisDay> = ephemeris
        .days()
        .iter()
        .filter_map(|d| Some((d.date?, d)))
        .collect();

    days.into_iter()
        .map(|day| {
            let sun = sun_by_date.get(&day.date).copied();
            day.finish(sun)
        })
        .collect()
}

/// Convert free-text search results. Nominatim gives no timezone, so every
/// result gets `timezone`.
pub fn convert_search_results(
    results: Vec<NominatimLocationResult>,
    timezone: Tz,
) -> Vec<Location> {
    results
        .into_iter()
        .map(|result| {
            let mut location = Location::new(result.lat, result.lon, timezone);
            apply_place(&mut location, &result);
            location
        })
        .collect()
}

/// Merge a reverse-geocoded place into `location`, keeping its coordinates,
/// timezone and weather.
pub fn convert_reverse_result(location: &Location, result: NominatimLocationResult) -> Location {
    let mut merged = location.clone();
    apply_place(&mut merged, &result);
    merged
}

fn apply_place(location: &mut Location, result: &NominatimLocationResult) {
    location.city_id = result.place_id.map(|id| id.to_string());

    if let Some(address) = &result.address {
        location.city = address
            .place()
            .or(result.name.as_deref())
            .map(str::to_string);
        location.district = address.district().map(str::to_string);
        location.province = address.region().map(str::to_string);
        location.country = address.country.clone();
        location.country_code = address.country_code.as_ref().map(|c| c.to_uppercase());
        return;
    }

    // jsonv2 search results carry no address block; fall back to the
    // comma-separated display name ("Oslo, Norge" / "Bergen, Vestland, Norge").
    let segments: Vec<&str> = result
        .display_name
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    location.city = result
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(segments.first().copied())
        .map(str::to_string);
    location.district = None;
    location.country = if segments.len() > 1 {
        segments.last().map(|s| s.to_string())
    } else {
        None
    };
    location.province = if segments.len() > 2 {
        segments
            .get(segments.len() - 2)
            .filter(|p| Some(**p) != location.city.as_deref())
            .map(|p| p.to_string())
    } else {
        None
    };
    location.country_code = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nominatim::NominatimAddress;
    use serde_json::json;

    fn forecast(value: serde_json::Value) -> ForecastResult {
        serde_json::from_value(value).unwrap()
    }

    fn step(time: &str, temp: f64, symbol: &str, precip: f64) -> serde_json::Value {
        json!({
            "time": time,
            "data": {
                "instant": { "details": { "air_temperature": temp, "relative_humidity": 70.0 } },
                "next_1_hours": {
                    "summary": { "symbol_code": symbol },
                    "details": { "precipitation_amount": precip, "probability_of_precipitation": precip * 10.0 }
                }
            }
        })
    }

    fn oslo() -> Location {
        Location::new(59.9139, 10.7522, chrono_tz::Europe::Oslo)
    }

    #[test]
    fn test_missing_properties_fails() {
        let wrapper = MetNoConverter.convert(&oslo(), ForecastResult::default(), EphemerisResult::default());
        assert!(wrapper.result.is_none());
        assert!(matches!(
            wrapper.failure,
            Some(WeatherError::EmptyResult(ref reason)) if reason.contains("no properties")
        ));
    }

    #[test]
    fn test_empty_timeseries_fails() {
        let wrapper = MetNoConverter.convert(
            &oslo(),
            forecast(json!({"properties": {"timeseries": []}})),
            EphemerisResult::default(),
        );
        assert!(wrapper.result.is_none());
        assert!(matches!(wrapper.failure, Some(WeatherError::EmptyResult(_))));
    }

    #[test]
    fn test_missing_temperature_fails() {
        let wrapper = MetNoConverter.convert(
            &oslo(),
            forecast(json!({"properties": {"timeseries": [
                {"time": "2024-06-01T10:00:00Z", "data": {"instant": {"details": {}}}}
            ]}})),
            EphemerisResult::default(),
        );
        assert!(wrapper.result.is_none());

        let failure = wrapper.failure.unwrap();
        assert!(matches!(failure, WeatherError::Conversion(_)));
        assert!(!failure.is_rate_limited());
        assert!(!failure.is_unauthorized());
    }

    #[test]
    fn test_current_and_hourly() {
        let wrapper = MetNoConverter.convert(
            &oslo(),
            forecast(json!({"properties": {
                "meta": {"updated_at": "2024-06-01T09:30:00Z"},
                "timeseries": [
                    step("2024-06-01T10:00:00Z", 15.0, "fair_day", 0.0),
                    step("2024-06-01T11:00:00Z", 16.5, "rain", 0.8),
                ]
            }})),
            EphemerisResult::default(),
        );

        let weather = wrapper.result.unwrap();
        assert_eq!(weather.updated_at.to_rfc3339(), "2024-06-01T09:30:00+00:00");
        assert_eq!(weather.current.temperature, 15.0);
        assert_eq!(weather.current.humidity, Some(70.0));
        assert_eq!(weather.current.condition, WeatherCondition::PartlyCloudy);
        assert_eq!(weather.hourly.len(), 2);
        assert_eq!(weather.hourly[1].condition, WeatherCondition::Rain);
        assert_eq!(weather.hourly[1].precipitation, Some(0.8));
    }

    #[test]
    fn test_hourly_is_capped() {
        let steps: Vec<_> = (0..30)
            .map(|h| {
                let time = chrono::DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z").unwrap()
                    + chrono::Duration::hours(h);
                step(&time.to_rfc3339(), 10.0, "cloudy", 0.0)
            })
            .collect();

        let weather = MetNoConverter
            .convert(&oslo(), forecast(json!({"properties": {"timeseries": steps}})), EphemerisResult::default())
            .result
            .unwrap();
        assert_eq!(weather.hourly.len(), HOURLY_LIMIT);
    }

    #[test]
    fn test_daily_groups_by_local_date() {
        // 22:30Z on June 1st is already June 2nd in Oslo (UTC+2).
        let series = json!({"properties": {"timeseries": [
            step("2024-06-01T05:00:00Z", 12.0, "clearsky_day", 0.0),
            step("2024-06-01T12:00:00Z", 21.0, "partlycloudy_day", 0.5),
            step("2024-06-01T17:00:00Z", 18.0, "rainshowers_night", 1.5),
            step("2024-06-01T22:30:00Z", 11.0, "cloudy", 0.0),
        ]}});
        let ephemeris: EphemerisResult = serde_json::from_value(json!({"location": {"time": [
            {
                "date": "2024-06-01",
                "sunrise": {"time": "2024-06-01T03:59:00+02:00"},
                "sunset": {"time": "2024-06-01T22:31:00+02:00"},
                "moonphase": {"value": "83.1"}
            }
        ]}}))
        .unwrap();

        let weather = MetNoConverter
            .convert(&oslo(), forecast(series), ephemeris)
            .result
            .unwrap();

        assert_eq!(weather.daily.len(), 2);
        let first = &weather.daily[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(first.high, Some(21.0));
        assert_eq!(first.low, Some(12.0));
        assert_eq!(first.precipitation, 2.0);
        assert_eq!(first.precipitation_probability, Some(15.0));
        // 05:00Z is 07:00 local, the first step inside the day window
        assert_eq!(first.day_condition, WeatherCondition::Clear);
        // 17:00Z is 19:00 local
        assert_eq!(first.night_condition, WeatherCondition::Rain);
        assert_eq!(first.sunrise.unwrap().to_rfc3339(), "2024-06-01T01:59:00+00:00");
        assert_eq!(first.moon_phase, Some(83.1));

        let second = &weather.daily[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(second.day_condition, WeatherCondition::Cloudy);
        assert!(second.sunrise.is_none());
    }

    #[test]
    fn test_search_results_from_display_name() {
        let results = vec![
            NominatimLocationResult {
                place_id: Some(42),
                lat: 60.39,
                lon: 5.32,
                name: Some("Bergen".to_string()),
                display_name: Some("Bergen, Vestland, Norge".to_string()),
                category: None,
                place_type: None,
                address: None,
            },
            NominatimLocationResult {
                place_id: None,
                lat: 59.91,
                lon: 10.74,
                name: None,
                display_name: Some("Oslo, Norge".to_string()),
                category: None,
                place_type: None,
                address: None,
            },
        ];

        let locations = convert_search_results(results, chrono_tz::UTC);
        assert_eq!(locations.len(), 2);

        assert_eq!(locations[0].city_id.as_deref(), Some("42"));
        assert_eq!(locations[0].city.as_deref(), Some("Bergen"));
        assert_eq!(locations[0].province.as_deref(), Some("Vestland"));
        assert_eq!(locations[0].country.as_deref(), Some("Norge"));
        assert_eq!(locations[0].timezone, chrono_tz::UTC);
        assert!(locations[0].weather.is_none());

        assert_eq!(locations[1].city.as_deref(), Some("Oslo"));
        assert_eq!(locations[1].province, None);
        assert_eq!(locations[1].latitude, 59.91);
    }

    #[test]
    fn test_reverse_keeps_coordinates_and_timezone() {
        let original = Location::new(47.6062, -122.3321, chrono_tz::America::Los_Angeles);
        let place = NominatimLocationResult {
            place_id: Some(7),
            lat: 47.60,
            lon: -122.33,
            name: Some("Seattle".to_string()),
            display_name: Some("Seattle, King County, Washington, United States".to_string()),
            category: Some("boundary".to_string()),
            place_type: Some("administrative".to_string()),
            address: Some(NominatimAddress {
                city: Some("Seattle".to_string()),
                state: Some("Washington".to_string()),
                country: Some("United States".to_string()),
                country_code: Some("us".to_string()),
                ..Default::default()
            }),
        };

        let merged = convert_reverse_result(&original, place);
        assert_eq!(merged.latitude, 47.6062);
        assert_eq!(merged.longitude, -122.3321);
        assert_eq!(merged.timezone, chrono_tz::America::Los_Angeles);
        assert_eq!(merged.city.as_deref(), Some("Seattle"));
        assert_eq!(merged.province.as_deref(), Some("Washington"));
        assert_eq!(merged.country_code.as_deref(), Some("US"));
        // the input is untouched
        assert!(original.city.is_none());
    }
}

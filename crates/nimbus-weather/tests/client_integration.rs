//! Integration tests for the MET Norway and Nominatim clients using wiremock.

use std::time::Duration;

use nimbus_weather::{GeocodeParams, MetNoApi, MetNoClient, NominatimApi, NominatimClient, WeatherError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "Nimbus/0.1.0 github.com/nimbus-weather/nimbus/issues";
const FORECAST_PATH: &str = "/weatherapi/locationforecast/2.0/complete.json";
const EPHEMERIS_PATH: &str = "/weatherapi/sunrise/2.0/.json";

fn metno(server: &MockServer) -> MetNoClient {
    MetNoClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn nominatim(server: &MockServer) -> NominatimClient {
    NominatimClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_forecast_sends_identity_and_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .and(header("User-Agent", USER_AGENT))
        .and(query_param("lat", "59.91"))
        .and(query_param("lon", "10.75"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "Feature",
            "properties": {
                "meta": { "updated_at": "2024-06-01T10:00:00Z" },
                "timeseries": [{
                    "time": "2024-06-01T11:00:00Z",
                    "data": { "instant": { "details": { "air_temperature": 17.3 } } }
                }]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let forecast = metno(&mock_server)
        .forecast(USER_AGENT, 59.91, 10.75)
        .await
        .unwrap();

    let properties = forecast.properties.unwrap();
    assert_eq!(properties.timeseries.len(), 1);
    assert_eq!(
        properties.timeseries[0].details().unwrap().air_temperature,
        Some(17.3)
    );
}

#[tokio::test]
async fn test_ephemeris_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EPHEMERIS_PATH))
        .and(header("User-Agent", USER_AGENT))
        .and(query_param("date", "2024-06-01"))
        .and(query_param("days", "15"))
        .and(query_param("lat", "28.61"))
        .and(query_param("lon", "77.2"))
        .and(query_param("offset", "+05:30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "location": { "time": [{ "date": "2024-06-01", "moonphase": { "value": "12.5" } }] }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ephemeris = metno(&mock_server)
        .ephemeris(USER_AGENT, "2024-06-01", 15, 28.61, 77.2, "+05:30")
        .await
        .unwrap();

    assert_eq!(ephemeris.days().len(), 1);
    assert_eq!(
        ephemeris.days()[0].moonphase.as_ref().unwrap().value,
        Some(12.5)
    );
}

#[tokio::test]
async fn test_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&mock_server)
        .await;

    let err = metno(&mock_server)
        .forecast(USER_AGENT, 1.0, 2.0)
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn test_forbidden_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(EPHEMERIS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("User-Agent missing"))
        .mount(&mock_server)
        .await;

    let err = metno(&mock_server)
        .ephemeris(USER_AGENT, "2024-06-01", 15, 1.0, 2.0, "+00:00")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn test_malformed_forecast_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FORECAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let err = metno(&mock_server)
        .forecast(USER_AGENT, 1.0, 2.0)
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Parse(_)));
}

#[tokio::test]
async fn test_search_sends_fixed_flags() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(header("User-Agent", USER_AGENT))
        .and(query_param("q", "Tromsø"))
        .and(query_param("featuretype", "city"))
        .and(query_param("dedupe", "true"))
        .and(query_param("accept-language", "nb"))
        .and(query_param("format", "jsonv2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "place_id": 9, "lat": "69.6496", "lon": "18.956", "name": "Tromsø", "display_name": "Tromsø, Troms, Norge" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = GeocodeParams::city(USER_AGENT, "nb");
    let results = nominatim(&mock_server)
        .search(&params, "Tromsø")
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].lat, 69.6496);
    assert_eq!(results[0].name.as_deref(), Some("Tromsø"));
}

#[tokio::test]
async fn test_search_null_body_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let params = GeocodeParams::city(USER_AGENT, "en");
    let results = nominatim(&mock_server).search(&params, "x").await.unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_reverse_unknown_place() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "0.5"))
        .and(query_param("lon", "-30.25"))
        .and(query_param("format", "jsonv2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "error": "Unable to geocode" })),
        )
        .mount(&mock_server)
        .await;

    let params = GeocodeParams::city(USER_AGENT, "en");
    let result = nominatim(&mock_server)
        .reverse(&params, 0.5, -30.25)
        .await
        .unwrap();

    assert!(result.is_none());
}

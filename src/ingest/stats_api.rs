/// Stats API Client
///
/// Retrieves per-place time series for one statistical variable from the
/// `/api/stats/{variable}` endpoint, and place display names from
/// `/api/place/displayname`.
///
/// Both endpoints take places as repeated `dcid` query parameters and
/// answer with a flat JSON object keyed by place id (no envelope):
///
/// ```text
/// GET /api/stats/Count_Person?&dcid=geoId/05&dcid=geoId/06
/// {"geoId/05": {"data": {"2011": 21000, ...}, "place_name": "Arkansas"}, ...}
/// ```

use crate::config::ApiConfig;
use crate::model::{StatsApiResponse, StatsError};
use std::collections::BTreeMap;

/// Place id to display name, as returned by `/api/place/displayname`.
pub type DisplayNames = BTreeMap<String, String>;

// ============================================================================
// Source Abstraction
// ============================================================================

/// Anything that can answer stats queries.
///
/// The fetch orchestration issues calls from several worker threads at
/// once, so implementations must be `Sync`.
pub trait StatsSource: Sync {
    /// Fetch the series of `variable` for every place in `places`.
    fn fetch_variable(
        &self,
        variable: &str,
        places: &[String],
    ) -> Result<StatsApiResponse, StatsError>;

    /// Fetch display names for `places`.
    fn fetch_display_names(&self, places: &[String]) -> Result<DisplayNames, StatsError>;
}

// ============================================================================
// URL Construction
// ============================================================================

/// Builds the `?&dcid=a&dcid=b` query string shared by both endpoints.
///
/// Place ids are sent verbatim; ids such as `geoId/06` are accepted by the
/// backend unescaped.
pub fn build_place_params(places: &[String]) -> String {
    let mut params = String::from("?");
    for place in places {
        params.push_str("&dcid=");
        params.push_str(place);
    }
    params
}

/// URL of the series request for one variable.
pub fn build_stats_url(base_url: &str, variable: &str, places: &[String]) -> String {
    format!(
        "{}/api/stats/{}{}",
        base_url.trim_end_matches('/'),
        variable,
        build_place_params(places)
    )
}

/// URL of the display-name request.
pub fn build_display_name_url(base_url: &str, places: &[String]) -> String {
    format!(
        "{}/api/place/displayname{}",
        base_url.trim_end_matches('/'),
        build_place_params(places)
    )
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Parses a `/api/stats/{variable}` body.
pub fn parse_stats_response(body: &str) -> Result<StatsApiResponse, StatsError> {
    serde_json::from_str(body).map_err(|e| StatsError::ParseError(e.to_string()))
}

/// Parses a `/api/place/displayname` body.
pub fn parse_display_names(body: &str) -> Result<DisplayNames, StatsError> {
    serde_json::from_str(body).map_err(|e| StatsError::ParseError(e.to_string()))
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// `StatsSource` backed by a blocking reqwest client.
///
/// Timeouts are configured once on the client; there is no retry policy.
pub struct HttpStatsSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpStatsSource {
    pub fn new(config: &ApiConfig) -> Result<Self, StatsError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StatsError::RequestFailed(e.to_string()))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_text(&self, url: &str) -> Result<String, StatsError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| StatsError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StatsError::HttpError(response.status().as_u16()));
        }

        response
            .text()
            .map_err(|e| StatsError::RequestFailed(e.to_string()))
    }
}

impl StatsSource for HttpStatsSource {
    fn fetch_variable(
        &self,
        variable: &str,
        places: &[String],
    ) -> Result<StatsApiResponse, StatsError> {
        let url = build_stats_url(&self.base_url, variable, places);
        let body = self.get_text(&url)?;
        parse_stats_response(&body)
    }

    fn fetch_display_names(&self, places: &[String]) -> Result<DisplayNames, StatsError> {
        let url = build_display_name_url(&self.base_url, places);
        let body = self.get_text(&url)?;
        parse_display_names(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn places() -> Vec<String> {
        vec!["geoId/05".to_string(), "geoId/06".to_string()]
    }

    #[test]
    fn test_stats_url_repeats_dcid_per_place() {
        let url = build_stats_url("https://datacommons.org", "Count_Person", &places());
        assert_eq!(
            url,
            "https://datacommons.org/api/stats/Count_Person?&dcid=geoId/05&dcid=geoId/06"
        );
    }

    #[test]
    fn test_trailing_slash_on_base_url_is_ignored() {
        let url = build_stats_url("http://localhost:8080/", "Count_Person", &places());
        assert!(url.starts_with("http://localhost:8080/api/stats/"), "got {}", url);
    }

    #[test]
    fn test_empty_place_list_keeps_bare_query_marker() {
        assert_eq!(build_place_params(&[]), "?");
    }

    #[test]
    fn test_display_name_url() {
        assert_eq!(
            build_display_name_url("http://x", &places()),
            "http://x/api/place/displayname?&dcid=geoId/05&dcid=geoId/06"
        );
    }

    #[test]
    fn test_parse_stats_response() {
        let body = r#"{
            "geoId/05": {"data": {"2011": 21000, "2012": 22000}, "place_name": "Arkansas"},
            "geoId/72": null
        }"#;
        let resp = parse_stats_response(body).expect("valid body");
        let arkansas = resp["geoId/05"].as_ref().expect("series present");
        assert_eq!(arkansas.place_name, "Arkansas");
        assert_eq!(arkansas.data["2011"], 21000.0);
        assert!(resp["geoId/72"].is_none());
    }

    #[test]
    fn test_parse_rejects_envelope_shape() {
        // A value that is not an object/null for a place is a contract break.
        let err = parse_stats_response(r#"{"geoId/05": 12}"#).unwrap_err();
        assert!(matches!(err, StatsError::ParseError(_)), "got {:?}", err);
    }

    #[test]
    fn test_parse_display_names() {
        let names = parse_display_names(r#"{"geoId/05": "Arkansas"}"#).unwrap();
        assert_eq!(names["geoId/05"], "Arkansas");
    }
}

//! `get_weather`: current conditions for a city from a plain-text weather
//! service (wttr.in by default).
//!
//! Every outcome is a readable sentence; failures are reported in the result
//! string rather than as errors.

use tracing::{debug, warn};

/// Upper bound on how much of the service's reply reaches the observation.
const MAX_BODY_BYTES: usize = 4 * 1024;

/// Fetch the weather for `city`.
pub async fn get_weather(
    client: &reqwest::Client,
    base_url: &str,
    format: &str,
    city: &str,
) -> String {
    let city = city.trim();
    if city.is_empty() {
        return "Error fetching weather: no city name was given".into();
    }

    let url = match weather_url(base_url, format, city) {
        Ok(url) => url,
        Err(e) => return format!("Error fetching weather: {e}"),
    };

    debug!(tool = "get_weather", %url, "Requesting weather");

    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(tool = "get_weather", error = %e, "Weather request failed");
            return format!("Error fetching weather: {e}");
        }
    };

    let status = response.status();
    if !status.is_success() {
        return format!(
            "Error fetching weather for {city}: upstream returned status {}",
            status.as_u16()
        );
    }

    match read_capped(response).await {
        Ok(body) => format!("The weather in {city} is {}.", body.trim()),
        Err(e) => format!("Error fetching weather: {e}"),
    }
}

/// Read at most [`MAX_BODY_BYTES`] of the body; a cut-off reply ends in `...`.
async fn read_capped(mut response: reqwest::Response) -> Result<String, reqwest::Error> {
    let mut body = Vec::new();
    let mut truncated = false;

    while let Some(chunk) = response.chunk().await? {
        let room = MAX_BODY_BYTES - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        body.extend_from_slice(&chunk);
    }

    let text = String::from_utf8_lossy(&body);
    if truncated {
        warn!(tool = "get_weather", limit = MAX_BODY_BYTES, "Weather reply truncated");
        Ok(format!("{}...", text.trim_end_matches('\u{FFFD}')))
    } else {
        Ok(text.into_owned())
    }
}

/// `{base}/{city}?format={format}` with the city as one encoded path segment.
fn weather_url(base_url: &str, format: &str, city: &str) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| format!("invalid weather URL: {e}"))?;
    url.path_segments_mut()
        .map_err(|_| "weather URL cannot take a path".to_string())?
        .pop_if_empty()
        .push(city);
    url.set_query(Some(&format!("format={format}")));
    Ok(url)
}

//! Human-friendly rendering for `weather lookup`.

use std::fmt::Write as _;

use chrono::DateTime;
use weather_core::{GeoLocation, WeatherPayload, icon::icon_url, model::Condition};

/// Location header, current conditions and the daily forecast, one line per day.
pub fn render_lookup(location: &GeoLocation, payload: &WeatherPayload) -> String {
    let mut out = String::new();
    let current = &payload.current;

    let _ = writeln!(
        out,
        "{}, {} ({:.4}, {:.4})",
        location.city, location.country, location.lat, location.lon
    );
    let _ = writeln!(
        out,
        "Now: {}°C (feels like {}°C), {}",
        current.temp,
        current.feels_like,
        describe(&current.weather)
    );
    let _ = writeln!(
        out,
        "Humidity: {}%  Wind: {} m/s  Pressure: {} hPa",
        current.humidity, current.wind_speed, current.pressure
    );
    if let Some(url) = first_icon(&current.weather) {
        let _ = writeln!(out, "Icon: {url}");
    }

    if !payload.daily.is_empty() {
        let _ = writeln!(out, "\nForecast:");
    }
    for day in &payload.daily {
        let date = DateTime::from_timestamp(day.dt, 0)
            .map(|dt| dt.date_naive().to_string())
            .unwrap_or_else(|| day.dt.to_string());
        let _ = write!(
            out,
            "  {date}  {}°C .. {}°C  {}",
            day.temp.min,
            day.temp.max,
            describe(&day.weather)
        );
        if let Some(url) = first_icon(&day.weather) {
            let _ = write!(out, "  {url}");
        }
        out.push('\n');
    }

    out
}

fn describe(conditions: &[Condition]) -> &str {
    conditions
        .first()
        .map(|c| c.description.as_str())
        .unwrap_or("-")
}

fn first_icon(conditions: &[Condition]) -> Option<String> {
    conditions.first().and_then(|c| icon_url(&c.icon))
}

//! Weather icon codes.
//!
//! Records store a bare provider code; URLs are built only for display.

const WEATHERAPI_CDN: &str = "https://cdn.weatherapi.com/weather/64x64/day";
const OPENWEATHER_CDN: &str = "https://openweathermap.org/img/wn";

/// Reduce a provider icon reference to its bare code: the last path segment
/// without its extension.
///
/// `//cdn.weatherapi.com/weather/64x64/day/116.png` becomes `116`; `10d` stays `10d`.
pub fn normalize_icon(reference: &str) -> String {
    let file = reference.trim().rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

/// Display URL for an icon code, or `None` when there is no code.
pub fn icon_url(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    if code.starts_with("http://") || code.starts_with("https://") {
        return Some(code.to_string());
    }
    if let Some(rest) = code.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if code.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{WEATHERAPI_CDN}/{code}.png"));
    }
    Some(format!("{OPENWEATHER_CDN}/{code}@2x.png"))
}

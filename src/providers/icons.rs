//! Provider icon codes mapped onto one shared icon vocabulary.

/// OpenWeather icon ids look like `"10d"`: a condition group plus day/night.
pub fn open_weather_icon(code: &str) -> &'static str {
    let night = code.ends_with('n');
    match code.get(..2).unwrap_or_default() {
        "01" if night => "clear-night",
        "01" => "clear-day",
        "02" if night => "partly-cloudy-night",
        "02" => "partly-cloudy-day",
        "03" | "04" => "cloudy",
        "09" => "heavy-rain",
        "10" => "rain",
        "11" => "thunderstorm",
        "13" => "snow",
        "50" => "fog",
        _ => "clear-day",
    }
}

/// AccuWeather numbers its icons 1..=44.
pub fn accu_weather_icon(icon: u8) -> &'static str {
    match icon {
        1 | 2 => "clear-day",
        3..=5 => "partly-cloudy-day",
        6..=8 => "cloudy",
        11 => "fog",
        12 => "light-rain",
        13 | 14 => "rain",
        15..=17 => "thunderstorm",
        18 => "heavy-rain",
        19..=21 => "light-snow",
        22 | 23 => "snow",
        24..=26 | 29 => "sleet",
        30 => "hot",
        31 => "cold",
        32 => "wind",
        33 | 34 => "clear-night",
        35..=38 => "partly-cloudy-night",
        39 | 40 => "rain",
        41 | 42 => "thunderstorm",
        43 | 44 => "snow",
        _ => "clear-day",
    }
}

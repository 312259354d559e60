use crate::error::ValidationError;
use crate::model::{Coords, GeocodingRequest, WeatherRequest};

/// Checks a weather request before anything touches the store or a provider.
pub fn validate_weather_request(request: &WeatherRequest) -> Result<Coords, ValidationError> {
    let coords = request.coords.ok_or(ValidationError::EmptyCoords)?;
    if !coords.is_valid() {
        return Err(ValidationError::InvalidCoords);
    }
    if request.locale.is_empty() {
        return Err(ValidationError::EmptyLocale);
    }
    Ok(coords)
}

pub fn validate_geocoding_request(request: &GeocodingRequest) -> Result<(), ValidationError> {
    if request.city.trim().is_empty() {
        return Err(ValidationError::EmptyCity);
    }
    Ok(())
}

//! Coordinate quantization into zone keys.

use civic_pulse_zones_models::{Precision, ZoneKey};

/// Maps a coordinate pair onto the key of the grid cell containing it.
///
/// Each component is rounded half away from zero to `precision` decimal
/// places and then formatted with exactly that many fractional digits, so
/// equal rounded values always produce byte-identical keys.
///
/// Inputs must be finite; callers validate before quantizing.
#[must_use]
pub fn quantize(lat: f64, lng: f64, precision: Precision) -> ZoneKey {
    let digits = usize::from(precision.digits());
    let lat = round_to(lat, precision);
    let lng = round_to(lng, precision);
    ZoneKey::new(format!("{lat:.digits$},{lng:.digits$}"))
}

/// Rounds `value` half away from zero to `precision` decimal places.
#[must_use]
pub fn round_to(value: f64, precision: Precision) -> f64 {
    round_places(value, i32::from(precision.digits()))
}

pub(crate) fn round_places(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    // Adding positive zero folds -0.0 into 0.0 so keys never read "-0.0".
    (value * factor).round() / factor + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn precision(digits: u8) -> Precision {
        Precision::new(digits).unwrap()
    }

    #[test]
    fn one_digit_key() {
        let key = quantize(28.4595, 77.0266, precision(1));
        assert_eq!(key.as_str(), "28.5,77.0");
    }

    #[test]
    fn three_digit_key() {
        let key = quantize(28.4596, 77.0266, precision(3));
        assert_eq!(key.as_str(), "28.460,77.027");
    }

    #[test]
    fn zero_digit_key_has_no_fraction() {
        let key = quantize(28.6, -77.4, precision(0));
        assert_eq!(key.as_str(), "29,-77");
    }

    #[test]
    fn nearby_points_share_a_key() {
        let a = quantize(28.4595, 77.0266, precision(1));
        let b = quantize(28.47, 77.04, precision(1));
        assert_eq!(a, b);
    }

    #[test]
    fn representation_noise_does_not_split_keys() {
        let a = quantize(0.1 + 0.2, 1.0, precision(1));
        let b = quantize(0.3, 1.0, precision(1));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0.3,1.0");
    }

    #[test]
    fn negative_zero_is_normalized() {
        let key = quantize(-0.04, -0.01, precision(1));
        assert_eq!(key.as_str(), "0.0,0.0");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert!((round_to(0.25, precision(1)) - 0.3).abs() < 1e-12);
        assert!((round_to(-0.25, precision(1)) - -0.3).abs() < 1e-12);
        assert!((round_to(2.5, precision(0)) - 3.0).abs() < f64::EPSILON);
    }
}

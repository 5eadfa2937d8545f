//! Dense polyline buffer for route geometries.
//!
//! A route's dense buffer is built by concatenating provider segments. Two
//! consecutive segments share their join point, so every join operation here
//! drops the first point of the incoming segment.
//!
//! The compact encoded format (Google's polyline algorithm, as emitted by
//! OSRM with `geometries=polyline6`) is decoded at the provider boundary.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// An ordered list of coordinates approximating a road path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<GeoPoint>,
}

impl Polyline {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    pub fn get(&self, index: usize) -> Option<&GeoPoint> {
        self.points.get(index)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Appends `segment`, dropping its first point unless the buffer is empty.
    ///
    /// Returns the index of the last point of the buffer afterwards.
    pub fn append_joined(&mut self, segment: &[GeoPoint]) -> usize {
        if self.points.is_empty() {
            self.points.extend_from_slice(segment);
        } else {
            self.points.extend(segment.iter().skip(1).copied());
        }
        self.points.len().saturating_sub(1)
    }

    /// Keeps `[0..=index]` and discards everything after it.
    pub fn truncate_after(&mut self, index: usize) {
        self.points.truncate(index + 1);
    }

    /// Replaces `(after, through]` with `segment` minus its first point.
    ///
    /// `segment[0]` is expected to coincide with the point at `after`.
    /// Returns the index the last point of `segment` ends up at.
    pub fn splice_joined(&mut self, after: usize, through: usize, segment: &[GeoPoint]) -> usize {
        let end = (through + 1).min(self.points.len());
        let start = (after + 1).min(end);
        let inserted = segment.len().saturating_sub(1);
        self.points
            .splice(start..end, segment.iter().skip(1).copied());
        after + inserted
    }

    /// Total length along the line in metres.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].haversine_m(&pair[1]))
            .sum()
    }

    /// Encodes with Google's polyline algorithm at `precision` decimal digits.
    pub fn encode(&self, precision: u32) -> String {
        let factor = 10f64.powi(precision as i32);
        let mut out = String::new();
        let mut prev_lat = 0i64;
        let mut prev_lng = 0i64;
        for point in &self.points {
            let lat = (point.lat * factor).round() as i64;
            let lng = (point.lng * factor).round() as i64;
            encode_value(lat - prev_lat, &mut out);
            encode_value(lng - prev_lng, &mut out);
            prev_lat = lat;
            prev_lng = lng;
        }
        out
    }

    /// Decodes a polyline encoded at `precision` decimal digits.
    ///
    /// Returns `None` on truncated or out-of-alphabet input.
    pub fn decode(encoded: &str, precision: u32) -> Option<Self> {
        let factor = 10f64.powi(precision as i32);
        let mut bytes = encoded.bytes().peekable();
        let mut points = Vec::new();
        let mut lat = 0i64;
        let mut lng = 0i64;

        while bytes.peek().is_some() {
            lat += decode_value(&mut bytes)?;
            lng += decode_value(&mut bytes)?;
            points.push(GeoPoint::new(lng as f64 / factor, lat as f64 / factor));
        }

        Some(Self { points })
    }
}

impl From<Vec<GeoPoint>> for Polyline {
    fn from(points: Vec<GeoPoint>) -> Self {
        Self::new(points)
    }
}

fn encode_value(value: i64, out: &mut String) {
    let shifted = value << 1;
    let mut v = (if value < 0 { !shifted } else { shifted }) as u64;
    while v >= 0x20 {
        out.push((((v & 0x1F) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

fn decode_value(bytes: &mut impl Iterator<Item = u8>) -> Option<i64> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = bytes.next()?;
        let digit = byte.checked_sub(63).filter(|d| *d < 64)? as u64;
        result |= (digit & 0x1F) << shift;
        if digit & 0x20 == 0 {
            break;
        }
        shift += 5;
        if shift > 60 {
            return None;
        }
    }
    let value = (result >> 1) as i64;
    Some(if result & 1 == 1 { !value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lng: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lng, lat)
    }

    #[test]
    fn test_append_joined_drops_shared_point() {
        let mut line = Polyline::default();
        assert_eq!(line.append_joined(&[p(0.0, 0.0), p(1.0, 0.0)]), 1);
        assert_eq!(line.append_joined(&[p(1.0, 0.0), p(1.5, 0.0), p(2.0, 0.0)]), 3);
        assert_eq!(
            line.points(),
            &[p(0.0, 0.0), p(1.0, 0.0), p(1.5, 0.0), p(2.0, 0.0)]
        );
    }

    #[test]
    fn test_truncate_after() {
        let mut line = Polyline::new(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]);
        line.truncate_after(1);
        assert_eq!(line.len(), 2);
        assert_eq!(line.last(), Some(&p(1.0, 0.0)));
    }

    #[test]
    fn test_splice_joined_grows_and_shrinks() {
        let mut line = Polyline::new(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)]);
        // replace (0, 2] with a three-point detour
        let end = line.splice_joined(0, 2, &[p(0.0, 0.0), p(0.5, 1.0), p(1.0, 1.0), p(2.0, 1.0)]);
        assert_eq!(end, 3);
        assert_eq!(
            line.points(),
            &[p(0.0, 0.0), p(0.5, 1.0), p(1.0, 1.0), p(2.0, 1.0), p(3.0, 0.0)]
        );

        let end = line.splice_joined(0, 3, &[p(0.0, 0.0), p(2.0, 1.0)]);
        assert_eq!(end, 1);
        assert_eq!(line.points(), &[p(0.0, 0.0), p(2.0, 1.0), p(3.0, 0.0)]);
    }

    #[test]
    fn test_length_m() {
        let line = Polyline::new(vec![p(28.0, -26.2), p(28.0, -26.2), p(28.0, -26.3)]);
        let direct = p(28.0, -26.2).haversine_m(&p(28.0, -26.3));
        assert!((line.length_m() - direct).abs() < 1e-6);
    }

    #[test]
    fn test_decode_reference_polyline() {
        // Reference example from Google's polyline documentation.
        let line = Polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", 5).unwrap();
        let expected = [p(-120.2, 38.5), p(-120.95, 40.7), p(-126.453, 43.252)];
        assert_eq!(line.len(), expected.len());
        for (got, want) in line.points().iter().zip(expected.iter()) {
            assert!((got.lat - want.lat).abs() < 1e-9 && (got.lng - want.lng).abs() < 1e-9);
        }
    }

    #[test]
    fn test_encode_reference_polyline() {
        let line = Polyline::new(vec![p(-120.2, 38.5), p(-120.95, 40.7), p(-126.453, 43.252)]);
        assert_eq!(line.encode(5), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        assert!(Polyline::decode("_p~iF", 5).is_none());
        assert!(Polyline::decode("_p~iF~ps|U ", 5).is_none());
    }

    #[test]
    fn test_empty_polyline() {
        let line = Polyline::decode("", 6).unwrap();
        assert!(line.is_empty());
        assert_eq!(line.encode(6), "");
    }
}

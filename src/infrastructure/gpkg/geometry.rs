//! GeoPackage binary geometry encoding (header + ISO WKB)

use crate::infrastructure::geojson::Geometry;
use crate::infrastructure::{ContainerError, ContainerResult};

const MAGIC: &[u8; 2] = b"GP";
const VERSION: u8 = 0;
const FLAG_LITTLE_ENDIAN: u8 = 0b0000_0001;
const FLAG_ENVELOPE_XY: u8 = 0b0000_0010;
const FLAG_EMPTY: u8 = 0b0001_0000;
const WKB_LITTLE_ENDIAN: u8 = 1;
const WKB_Z_OFFSET: u32 = 1000;

/// Axis-aligned bounding box in the layer's CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    fn of_point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn expand(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn union(self, other: Envelope) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Envelope of all positions; None for empty geometries.
    pub fn of(geometry: &Geometry) -> Option<Self> {
        let mut env: Option<Envelope> = None;
        geometry.for_each_position(&mut |p| {
            if p.len() < 2 {
                return;
            }
            match env.as_mut() {
                Some(e) => e.expand(p[0], p[1]),
                None => env = Some(Envelope::of_point(p[0], p[1])),
            }
        });
        env
    }
}

/// Encode `geometry` as a GeoPackage geometry blob.
pub fn encode(geometry: &Geometry, srs_id: i32) -> ContainerResult<Vec<u8>> {
    let envelope = Envelope::of(geometry);
    let mut buf = Vec::with_capacity(64);

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    let flags = match envelope {
        Some(_) => FLAG_LITTLE_ENDIAN | FLAG_ENVELOPE_XY,
        None => FLAG_LITTLE_ENDIAN | FLAG_EMPTY,
    };
    buf.push(flags);
    buf.extend_from_slice(&srs_id.to_le_bytes());
    if let Some(e) = envelope {
        for v in [e.min_x, e.max_x, e.min_y, e.max_y] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }

    let mut wkb = WkbWriter {
        buf,
        has_z: geometry.has_z(),
    };
    wkb.geometry(geometry)?;
    Ok(wkb.buf)
}

struct WkbWriter {
    buf: Vec<u8>,
    has_z: bool,
}

impl WkbWriter {
    fn header(&mut self, base_type: u32) {
        self.buf.push(WKB_LITTLE_ENDIAN);
        let code = if self.has_z {
            base_type + WKB_Z_OFFSET
        } else {
            base_type
        };
        self.u32(code);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn count(&mut self, n: usize) -> ContainerResult<()> {
        let n = u32::try_from(n)
            .map_err(|_| ContainerError::InvalidGeometry(format!("too many parts: {n}")))?;
        self.u32(n);
        Ok(())
    }

    fn position(&mut self, p: &[f64]) -> ContainerResult<()> {
        if p.len() < 2 {
            return Err(ContainerError::InvalidGeometry(format!(
                "position needs at least 2 coordinates, got {}",
                p.len()
            )));
        }
        self.f64(p[0]);
        self.f64(p[1]);
        if self.has_z {
            self.f64(p.get(2).copied().unwrap_or(0.0));
        }
        Ok(())
    }

    fn points(&mut self, points: &[Vec<f64>]) -> ContainerResult<()> {
        self.count(points.len())?;
        points.iter().try_for_each(|p| self.position(p))
    }

    fn rings(&mut self, rings: &[Vec<Vec<f64>>]) -> ContainerResult<()> {
        self.count(rings.len())?;
        rings.iter().try_for_each(|r| self.points(r))
    }

    fn point(&mut self, p: &[f64]) -> ContainerResult<()> {
        self.header(1);
        if p.is_empty() {
            // empty point: all ordinates NaN
            let dims = if self.has_z { 3 } else { 2 };
            (0..dims).for_each(|_| self.f64(f64::NAN));
            Ok(())
        } else {
            self.position(p)
        }
    }

    fn geometry(&mut self, geometry: &Geometry) -> ContainerResult<()> {
        match geometry {
            Geometry::Point { coordinates } => self.point(coordinates),
            Geometry::LineString { coordinates } => {
                self.header(2);
                self.points(coordinates)
            }
            Geometry::Polygon { coordinates } => {
                self.header(3);
                self.rings(coordinates)
            }
            Geometry::MultiPoint { coordinates } => {
                self.header(4);
                self.count(coordinates.len())?;
                coordinates.iter().try_for_each(|p| self.point(p))
            }
            Geometry::MultiLineString { coordinates } => {
                self.header(5);
                self.count(coordinates.len())?;
                coordinates.iter().try_for_each(|line| {
                    self.header(2);
                    self.points(line)
                })
            }
            Geometry::MultiPolygon { coordinates } => {
                self.header(6);
                self.count(coordinates.len())?;
                coordinates.iter().try_for_each(|polygon| {
                    self.header(3);
                    self.rings(polygon)
                })
            }
            Geometry::GeometryCollection { geometries } => {
                self.header(7);
                self.count(geometries.len())?;
                geometries.iter().try_for_each(|g| self.geometry(g))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> Geometry {
        Geometry::Point {
            coordinates: vec![x, y],
        }
    }

    #[test]
    fn given_point_when_encoding_then_writes_header_envelope_and_wkb() {
        let blob = encode(&point(1.5, -2.0), 4326).unwrap();

        assert_eq!(&blob[0..2], b"GP");
        assert_eq!(blob[2], 0);
        assert_eq!(blob[3], FLAG_LITTLE_ENDIAN | FLAG_ENVELOPE_XY);
        assert_eq!(i32::from_le_bytes(blob[4..8].try_into().unwrap()), 4326);
        // header 8 + envelope 32 + wkb (1 + 4 + 16)
        assert_eq!(blob.len(), 8 + 32 + 21);
        let wkb = &blob[40..];
        assert_eq!(wkb[0], 1);
        assert_eq!(u32::from_le_bytes(wkb[1..5].try_into().unwrap()), 1);
        assert_eq!(f64::from_le_bytes(wkb[5..13].try_into().unwrap()), 1.5);
        assert_eq!(f64::from_le_bytes(wkb[13..21].try_into().unwrap()), -2.0);
    }

    #[test]
    fn given_empty_point_when_encoding_then_sets_empty_flag_without_envelope() {
        let blob = encode(&Geometry::Point { coordinates: vec![] }, 4326).unwrap();

        assert_eq!(blob[3] & FLAG_EMPTY, FLAG_EMPTY);
        assert_eq!(blob.len(), 8 + 21);
        assert!(f64::from_le_bytes(blob[13..21].try_into().unwrap()).is_nan());
    }

    #[test]
    fn given_3d_line_when_encoding_then_uses_iso_z_type() {
        let line = Geometry::LineString {
            coordinates: vec![vec![0.0, 0.0, 1.0], vec![2.0, 3.0, 4.0]],
        };

        let blob = encode(&line, 3857).unwrap();

        let wkb = &blob[40..];
        assert_eq!(u32::from_le_bytes(wkb[1..5].try_into().unwrap()), 1002);
        assert_eq!(u32::from_le_bytes(wkb[5..9].try_into().unwrap()), 2);
        // 1 + 4 + 4 + 2 * 24
        assert_eq!(wkb.len(), 57);
    }

    #[test]
    fn given_polygon_when_computing_envelope_then_covers_all_rings() {
        let polygon = Geometry::Polygon {
            coordinates: vec![vec![
                vec![0.0, 0.0],
                vec![4.0, 0.0],
                vec![4.0, 3.0],
                vec![0.0, 0.0],
            ]],
        };

        let env = Envelope::of(&polygon).unwrap();

        assert_eq!(
            env,
            Envelope {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 4.0,
                max_y: 3.0
            }
        );
    }

    #[test]
    fn given_short_position_when_encoding_then_fails() {
        let bad = Geometry::LineString {
            coordinates: vec![vec![1.0]],
        };
        assert!(matches!(
            encode(&bad, 4326),
            Err(ContainerError::InvalidGeometry(_))
        ));
    }
}

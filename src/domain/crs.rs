//! Coordinate reference system identifiers

use std::fmt;
use std::str::FromStr;

use crate::domain::DomainError;

/// Authority-qualified CRS identifier, e.g. `EPSG:4326`.
///
/// The export never reprojects: a layer's CRS travels unchanged into the
/// container, where `code` becomes the GeoPackage `srs_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs {
    pub authority: String,
    pub code: i32,
}

impl Crs {
    pub const WGS84_CODE: i32 = 4326;

    pub fn epsg(code: i32) -> Self {
        Self {
            authority: "EPSG".to_string(),
            code,
        }
    }

    /// GeoPackage `srs_id` for this CRS.
    pub fn srs_id(&self) -> i32 {
        self.code
    }

    pub fn is_wgs84(&self) -> bool {
        self.authority == "EPSG" && self.code == Self::WGS84_CODE
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::epsg(Self::WGS84_CODE)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

impl FromStr for Crs {
    type Err = DomainError;

    /// Accepts `AUTH:CODE` (authority is upper-cased) or a bare EPSG code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DomainError::InvalidCrs {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (authority, code) = match trimmed.split_once(':') {
            Some((auth, code)) => (auth.trim().to_ascii_uppercase(), code.trim()),
            None => ("EPSG".to_string(), trimmed),
        };
        if authority.is_empty() {
            return Err(invalid("missing authority"));
        }
        let code: i32 = code
            .parse()
            .map_err(|_| invalid("code is not an integer"))?;

        Ok(Self { authority, code })
    }
}

//! Coordinate reference system identifiers.
//!
//! `GeoJSON` layers declare their CRS through the legacy `crs` member in a
//! handful of spellings (`EPSG:27700`, `urn:ogc:def:crs:EPSG::27700`,
//! `http://www.opengis.net/def/crs/EPSG/0/27700`, ...). [`Crs::parse`]
//! folds them into a single `AUTHORITY:CODE` form so two layers can be
//! compared for equality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors produced when a CRS name cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrsParseError {
    /// The name was empty or whitespace.
    #[error("CRS name is empty")]
    Empty,

    /// The name matched none of the known spellings.
    #[error("Unrecognized CRS name: {name}")]
    Unrecognized {
        /// The name as it appeared in the input.
        name: String,
    },
}

/// A normalized CRS identifier such as `EPSG:3857`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    authority: String,
    code: String,
}

impl Crs {
    /// Geographic WGS 84 (longitude/latitude in degrees).
    pub const WGS84_CODE: u32 = 4326;

    /// Spherical (Web) Mercator, meters.
    pub const WEB_MERCATOR_CODE: u32 = 3857;

    /// Builds an EPSG identifier from its numeric code, folding known
    /// aliases onto their canonical code.
    #[must_use]
    pub fn epsg(code: u32) -> Self {
        let code = match code {
            900_913 | 3785 => Self::WEB_MERCATOR_CODE,
            other => other,
        };
        Self {
            authority: "EPSG".to_string(),
            code: code.to_string(),
        }
    }

    /// `EPSG:4326`.
    #[must_use]
    pub fn wgs84() -> Self {
        Self::epsg(Self::WGS84_CODE)
    }

    /// `EPSG:3857`.
    #[must_use]
    pub fn web_mercator() -> Self {
        Self::epsg(Self::WEB_MERCATOR_CODE)
    }

    /// The authority name, upper-cased (e.g. `"EPSG"`).
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The code within the authority (e.g. `"3857"`).
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The numeric EPSG code, if this is an EPSG identifier.
    #[must_use]
    pub fn epsg_code(&self) -> Option<u32> {
        if self.authority == "EPSG" {
            self.code.parse().ok()
        } else {
            None
        }
    }

    /// Parses any of the common CRS spellings found in `GeoJSON` files.
    ///
    /// # Errors
    ///
    /// Returns [`CrsParseError`] if the name is empty or not of the
    /// `AUTHORITY:CODE`, OGC URN or OGC URL forms.
    pub fn parse(name: &str) -> Result<Self, CrsParseError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CrsParseError::Empty);
        }

        let unrecognized = || CrsParseError::Unrecognized {
            name: trimmed.to_string(),
        };

        let (authority, code) = if let Some(rest) = strip_prefix_ignore_case(trimmed, "urn:ogc:def:crs:")
        {
            // urn:ogc:def:crs:{authority}:{version}:{code}, version may be empty
            let mut parts = rest.split(':');
            let authority = parts.next().ok_or_else(unrecognized)?;
            let code = parts.last().ok_or_else(unrecognized)?;
            (authority, code)
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, "http://www.opengis.net/def/crs/")
            .or_else(|| strip_prefix_ignore_case(trimmed, "https://www.opengis.net/def/crs/"))
        {
            // .../def/crs/{authority}/{version}/{code}
            let mut parts = rest.split('/');
            let authority = parts.next().ok_or_else(unrecognized)?;
            let code = parts.last().ok_or_else(unrecognized)?;
            (authority, code)
        } else if let Some((authority, code)) = trimmed.split_once(':') {
            (authority, code)
        } else if trimmed.eq_ignore_ascii_case("CRS84") {
            ("OGC", "CRS84")
        } else {
            return Err(unrecognized());
        };

        let authority = authority.trim().to_ascii_uppercase();
        let code = code.trim().to_ascii_uppercase();
        if authority.is_empty() || code.is_empty() {
            return Err(unrecognized());
        }

        Ok(match (authority.as_str(), code.as_str()) {
            // GeoJSON coordinates are always longitude-first, so CRS84 and
            // EPSG:4326 describe the same coordinates here.
            ("OGC", "CRS84" | "84") => Self::wgs84(),
            ("ESRI", "102100" | "102113") => Self::web_mercator(),
            ("EPSG", numeric) => numeric
                .parse::<u32>()
                .map(Self::epsg)
                .map_err(|_| unrecognized())?,
            _ => Self { authority, code },
        })
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.to_string()
    }
}

//! Coordinate reference systems known to the loader.

mod proj;

use std::{fmt, path::Path};

use geo::Rect;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use proj::Reprojector;

/// A supported coordinate reference system, identified by EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Crs {
    /// WGS84 longitude/latitude (EPSG:4326).
    Wgs84,
    /// TWD97 longitude/latitude (EPSG:3824).
    Twd97,
    /// TWD97 / TM2 zone 121, metres (EPSG:3826).
    Twd97Tm2,
    /// TWD67 / TM2 zone 121, metres (EPSG:3828).
    Twd67Tm2,
}

impl Crs {
    /// Metric projection used for every distance and centroid calculation.
    pub const METRIC: Crs = Crs::Twd97Tm2;

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            3824 => Some(Crs::Twd97),
            3826 => Some(Crs::Twd97Tm2),
            3828 => Some(Crs::Twd67Tm2),
            _ => None,
        }
    }

    #[inline]
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Twd97 => 3824,
            Crs::Twd97Tm2 => 3826,
            Crs::Twd67Tm2 => 3828,
        }
    }

    /// Geographic systems take and return degrees; projected ones metres.
    #[inline]
    pub fn is_geographic(self) -> bool { matches!(self, Crs::Wgs84 | Crs::Twd97) }

    /// PROJ.4 definition of this system.
    pub(crate) fn proj4(self) -> &'static str {
        match self {
            Crs::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
            Crs::Twd97 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs +type=crs",
            Crs::Twd97Tm2 => "+proj=tmerc +lat_0=0 +lon_0=121 +k=0.9999 +x_0=250000 +y_0=0 \
                +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs +type=crs",
            Crs::Twd67Tm2 => "+proj=tmerc +lat_0=0 +lon_0=121 +k=0.9999 +x_0=250000 +y_0=0 \
                +ellps=aust_SA +towgs84=-752,-358,-179,-0.0000011698,0.0000018398,0.0000009822,0.00002329 \
                +units=m +no_defs +type=crs",
        }
    }

    /// Identify the system described by an ESRI/OGC WKT string (the content of a `.prj` file).
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        // The outermost AUTHORITY clause is the last one in the string.
        let authority = Regex::new(r#"AUTHORITY\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).ok()
            .and_then(|re| re.captures_iter(wkt).last()?[1].parse::<u32>().ok())
            .and_then(Crs::from_epsg);
        if authority.is_some() { return authority }

        let upper = wkt.to_ascii_uppercase();
        let projected = upper.starts_with("PROJCS") || upper.contains("TRANSVERSE_MERCATOR");
        let twd97 = upper.contains("TWD_1997") || upper.contains("TWD97");
        let twd67 = upper.contains("TWD_1967") || upper.contains("TWD67");
        let wgs84 = upper.contains("WGS_1984") || upper.contains("WGS 84") || upper.contains("WGS84");

        match (projected, twd97, twd67, wgs84) {
            (true, true, _, _) => Some(Crs::Twd97Tm2),
            (true, _, true, _) => Some(Crs::Twd67Tm2),
            (false, true, _, _) => Some(Crs::Twd97),
            (false, _, _, true) => Some(Crs::Wgs84),
            _ => None,
        }
    }

    /// Read the `.prj` sidecar of a shapefile, if there is one.
    /// Returns `Ok(None)` when no sidecar exists and `Err` with the WKT when it is unrecognized.
    pub fn from_shapefile(shp_path: &Path) -> Result<Option<Self>, String> {
        let prj_path = shp_path.with_extension("prj");
        let Ok(wkt) = std::fs::read_to_string(&prj_path) else { return Ok(None) };
        Crs::from_wkt(&wkt).map(Some).ok_or(wkt)
    }

    /// Guess the system from coordinate bounds: anything inside the lon/lat
    /// envelope is taken as WGS84, everything else as TWD97 / TM2.
    pub fn guess_from_bounds(bounds: &Rect<f64>) -> Self {
        let (min, max) = (bounds.min(), bounds.max());
        if min.x >= -180.0 && max.x <= 180.0 && min.y >= -90.0 && max.y <= 90.0 {
            Crs::Wgs84
        } else {
            Crs::Twd97Tm2
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl From<Crs> for u32 {
    fn from(crs: Crs) -> u32 { crs.epsg() }
}

impl TryFrom<u32> for Crs {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Crs::from_epsg(code).ok_or_else(|| format!("unsupported EPSG code {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    const TWD97_TM2_ESRI: &str = r#"PROJCS["TWD_1997_TM_Taiwan",GEOGCS["GCS_TWD_1997",DATUM["D_TWD_1997",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",250000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",121.0],PARAMETER["Scale_Factor",0.9999],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    const WGS84_OGC: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

    #[test]
    fn recognizes_esri_twd97_tm2() {
        assert_eq!(Crs::from_wkt(TWD97_TM2_ESRI), Some(Crs::Twd97Tm2));
    }

    #[test]
    fn outermost_authority_wins() {
        assert_eq!(Crs::from_wkt(WGS84_OGC), Some(Crs::Wgs84));
    }

    #[test]
    fn unknown_wkt_is_none() {
        assert_eq!(Crs::from_wkt(r#"PROJCS["NAD83 / UTM zone 10N"]"#), None);
    }

    #[test]
    fn guesses_geographic_from_bounds() {
        let lonlat = Rect::new(Coord { x: 120.9, y: 24.7 }, Coord { x: 121.0, y: 24.9 });
        let metric = Rect::new(Coord { x: 240_000.0, y: 2_740_000.0 }, Coord { x: 255_000.0, y: 2_750_000.0 });
        assert_eq!(Crs::guess_from_bounds(&lonlat), Crs::Wgs84);
        assert_eq!(Crs::guess_from_bounds(&metric), Crs::Twd97Tm2);
    }

    #[test]
    fn serializes_as_epsg_code() {
        assert_eq!(serde_json::to_string(&Crs::Twd97Tm2).unwrap(), "3826");
        assert_eq!(serde_json::from_str::<Crs>("4326").unwrap(), Crs::Wgs84);
        assert!(serde_json::from_str::<Crs>("32651").is_err());
    }
}

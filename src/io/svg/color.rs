//! Color ramps and palettes for SVG maps.

use std::fmt;

use crate::spatial::{HotSpotClass, LisaCluster};

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Hex form, `#rrggbb`.
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    /// Format as CSS: rgb(r,g,b)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Fill of units without a value.
pub const NO_DATA: Rgb = Rgb::new(204, 204, 204);

/// Diverging blue to red ramp (ColorBrewer RdYlBu, reversed) for `t` in [0, 1].
pub fn diverging_color(t: f64) -> Rgb {
    // Handle NaN / infinities: fall back to neutral gray.
    if !t.is_finite() { return NO_DATA }

    const STOPS: [Rgb; 7] = [
        Rgb::new( 69, 117, 180),
        Rgb::new(145, 191, 219),
        Rgb::new(224, 243, 248),
        Rgb::new(255, 255, 191),
        Rgb::new(254, 224, 144),
        Rgb::new(252, 141,  89),
        Rgb::new(215,  48,  39),
    ];

    let x = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
    let lo = (x.floor() as usize).min(STOPS.len() - 2);
    let frac = x - lo as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round().clamp(0.0, 255.0) as u8;

    let (a, b) = (STOPS[lo], STOPS[lo + 1]);
    Rgb::new(lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b))
}

/// LISA cluster palette (GeoDa convention).
pub fn lisa_color(cluster: LisaCluster) -> Rgb {
    match cluster {
        LisaCluster::HighHigh => Rgb::new(228, 26, 28),
        LisaCluster::LowHigh => Rgb::new(166, 206, 227),
        LisaCluster::LowLow => Rgb::new(31, 120, 180),
        LisaCluster::HighLow => Rgb::new(251, 154, 153),
        LisaCluster::NotSignificant => Rgb::new(240, 240, 240),
        LisaCluster::Island | LisaCluster::Undefined => NO_DATA,
    }
}

/// Hot spot palette, red for hot and blue for cold.
pub fn hotspot_color(class: HotSpotClass) -> Rgb {
    match class {
        HotSpotClass::Hot99 => Rgb::new(215, 48, 39),
        HotSpotClass::Hot90 => Rgb::new(252, 141, 89),
        HotSpotClass::NotSignificant => Rgb::new(240, 240, 240),
        HotSpotClass::Cold90 => Rgb::new(145, 191, 219),
        HotSpotClass::Cold99 => Rgb::new(69, 117, 180),
        HotSpotClass::Island | HotSpotClass::Undefined => NO_DATA,
    }
}

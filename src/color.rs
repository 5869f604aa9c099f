use serde::{Deserialize, Serialize};

use crate::rand::Rng;

/// Saturation band shared by every sampled color.
pub const SATURATION: (f64, f64) = (0.5, 1.0);
/// Brightness band for "bright" colors, used for backgrounds.
pub const BRIGHT: (f64, f64) = (0.8, 1.0);
/// Brightness band for "any" colors.
pub const ANY: (f64, f64) = (0.0, 1.0);

/// An opaque color in hue/saturation/brightness space, every channel within `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

/// An opaque 8-bit sRGB color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Hsb {
    /// Draws hue, then saturation, then brightness, each uniformly from its band.
    pub fn sample(rng: &mut Rng, saturation: (f64, f64), brightness: (f64, f64)) -> Hsb {
        let hue = rng.rnd();
        let saturation = rng.uniform(saturation.0, saturation.1);
        let brightness = rng.uniform(brightness.0, brightness.1);
        Hsb {
            hue,
            saturation,
            brightness,
        }
    }

    /// A high-brightness color: readable, never muddy.
    pub fn bright(rng: &mut Rng) -> Hsb {
        Hsb::sample(rng, SATURATION, BRIGHT)
    }

    /// A color anywhere on the brightness axis.
    pub fn any(rng: &mut Rng) -> Hsb {
        Hsb::sample(rng, SATURATION, ANY)
    }

    pub fn to_rgb(self) -> Rgb {
        let h = self.hue.clamp(0.0, 1.0) * 6.0;
        let s = self.saturation.clamp(0.0, 1.0);
        let v = self.brightness.clamp(0.0, 1.0);

        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        // Sector 6 is hue == 1.0, which is the same as hue == 0.0.
        let (r, g, b) = match sector as u32 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Rgb {
            r: channel(r),
            g: channel(g),
            b: channel(b),
        }
    }
}

fn channel(v: f64) -> u8 {
    (v * 255.0).round() as u8
}

impl Rgb {
    /// Packs into the premultiplied ARGB word used by the drawing surface. Opaque colors are
    /// their own premultiplication.
    pub fn to_argb(self) -> u32 {
        0xff00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    pub fn from_argb(px: u32) -> Rgb {
        let [b, g, r, _a] = px.to_le_bytes();
        Rgb { r, g, b }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn hsb(hue: f64, saturation: f64, brightness: f64) -> Hsb {
        Hsb {
            hue,
            saturation,
            brightness,
        }
    }

    #[test]
    fn test_primaries() {
        assert_eq!(hsb(0.0, 1.0, 1.0).to_rgb(), Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(hsb(1.0 / 3.0, 1.0, 1.0).to_rgb(), Rgb { r: 0, g: 255, b: 0 });
        assert_eq!(hsb(2.0 / 3.0, 1.0, 1.0).to_rgb(), Rgb { r: 0, g: 0, b: 255 });
        assert_eq!(hsb(1.0, 1.0, 1.0).to_rgb(), hsb(0.0, 1.0, 1.0).to_rgb());
    }

    #[test]
    fn test_grays() {
        assert_eq!(hsb(0.4, 0.0, 1.0).to_rgb(), Rgb { r: 255, g: 255, b: 255 });
        assert_eq!(hsb(0.9, 0.7, 0.0).to_rgb(), Rgb { r: 0, g: 0, b: 0 });
        assert_eq!(hsb(0.0, 0.0, 0.5).to_rgb(), Rgb { r: 128, g: 128, b: 128 });
    }

    #[test]
    fn test_bright_band() {
        let mut rng = Rng::from_seed(5);
        for _ in 0..1000 {
            let c = Hsb::bright(&mut rng);
            assert!((0.0..1.0).contains(&c.hue));
            assert!((0.5..1.0).contains(&c.saturation));
            assert!((0.8..1.0).contains(&c.brightness));
            // The brightest channel of a bright color is at least 0.8 * 255.
            let Rgb { r, g, b } = c.to_rgb();
            assert!(r.max(g).max(b) >= 204);
        }
    }

    #[test]
    fn test_any_draws_three_values() {
        let mut a = Rng::from_seed(11);
        let mut b = Rng::from_seed(11);
        Hsb::any(&mut a);
        b.next_u64();
        b.next_u64();
        b.next_u64();
        assert_eq!(a, b);
    }

    #[test]
    fn test_argb_round_trip() {
        let c = Rgb { r: 1, g: 2, b: 3 };
        assert_eq!(c.to_argb(), 0xff010203);
        assert_eq!(Rgb::from_argb(c.to_argb()), c);
    }
}

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::format::FormatSet;
use crate::geometry::aspect_floor;

/// An inclusive pixel range, written `MIN..MAX` (or `N` for a fixed size) on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimRange {
    pub min: u32,
    pub max: u32,
}

impl DimRange {
    pub fn new(min: u32, max: u32) -> DimRange {
        DimRange { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl FromStr for DimRange {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedRange(s.to_owned());
        let parse = |v: &str| v.trim().parse::<u32>().map_err(|_| malformed());
        match s.split_once("..") {
            Some((min, max)) => {
                let max = max.strip_prefix('=').unwrap_or(max);
                Ok(DimRange::new(parse(min)?, parse(max)?))
            }
            None => {
                let n = parse(s)?;
                Ok(DimRange::new(n, n))
            }
        }
    }
}

impl fmt::Display for DimRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// Everything that shapes a batch, fixed for its whole lifetime.
#[derive(Debug, Clone, PartialEq, clap::Args, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Canvas width range in pixels, inclusive.
    #[clap(long, default_value = "100..2160")]
    pub width: DimRange,

    /// Canvas height range in pixels, inclusive.
    #[clap(long, default_value = "100..2160")]
    pub height: DimRange,

    /// Lower bound on shorter side / longer side. `0` disables the floor.
    #[clap(long, default_value_t = 0.75)]
    pub min_ratio: f64,

    /// Output formats: `png`, `jpeg`, or `png,jpeg`. With both enabled, each image gets one of
    /// the two at random.
    #[clap(long, default_value = "jpeg")]
    pub formats: FormatSet,

    /// JPEG quality in [0, 1].
    #[clap(long, default_value_t = 0.65)]
    pub jpeg_quality: f64,

    /// Fixed PRNG seed (decimal or 0x-prefixed hex) for reproducible batches.
    #[clap(long, value_parser = parse_seed)]
    pub seed: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            width: DimRange::new(100, 2160),
            height: DimRange::new(100, 2160),
            min_ratio: 0.75,
            formats: FormatSet::default(),
            jpeg_quality: 0.65,
            seed: None,
        }
    }
}

impl GenerationSettings {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read settings '{}'", path.display()))?;
        let settings: GenerationSettings = serde_json::from_str(&text)
            .with_context(|| format!("parse settings '{}'", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, range) in [("width", self.width), ("height", self.height)] {
            if range.min > range.max {
                return Err(ConfigError::InvertedRange {
                    axis,
                    min: range.min,
                    max: range.max,
                });
            }
            // Rectangles are drawn up to half a side, so a side needs at least 2 pixels.
            if range.min < 2 {
                return Err(ConfigError::DimensionTooSmall {
                    axis,
                    min: range.min,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.min_ratio) {
            return Err(ConfigError::RatioOutOfRange(self.min_ratio));
        }
        if !(0.0..=1.0).contains(&self.jpeg_quality) {
            return Err(ConfigError::QualityOutOfRange(self.jpeg_quality));
        }

        // The shorter side gets raised toward the longer one and may not leave its range.
        let checks = [
            ("height", self.width.max, self.height.max),
            ("width", self.height.max, self.width.max),
        ];
        for (axis, longer, max) in checks {
            let needed = aspect_floor(longer, self.min_ratio);
            if needed > max {
                return Err(ConfigError::AspectUnsatisfiable {
                    ratio: self.min_ratio,
                    axis,
                    needed,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Parses a seed written in decimal or as `0x`-prefixed big-endian hex.
pub fn parse_seed(s: &str) -> Result<u64, ConfigError> {
    let malformed = || ConfigError::MalformedSeed(s.to_owned());
    let Some(digits) = s.strip_prefix("0x") else {
        return s.parse().map_err(|_| malformed());
    };
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_owned()
    };
    let bytes = hex::decode(padded).map_err(|_| malformed())?;
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(malformed());
    }
    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(&bytes);
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::format::ImageFormat;

    #[test]
    fn test_dim_range_parse() {
        assert_eq!("100..2160".parse::<DimRange>(), Ok(DimRange::new(100, 2160)));
        assert_eq!("8..=16".parse::<DimRange>(), Ok(DimRange::new(8, 16)));
        assert_eq!("64".parse::<DimRange>(), Ok(DimRange::new(64, 64)));
        assert_eq!(
            "a..b".parse::<DimRange>(),
            Err(ConfigError::MalformedRange("a..b".into()))
        );
        assert_eq!(DimRange::new(3, 9).to_string(), "3..9");
    }

    #[test]
    fn test_default_is_valid() {
        assert_eq!(GenerationSettings::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects() {
        let base = GenerationSettings::default();

        let mut s = base.clone();
        s.width = DimRange::new(300, 200);
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvertedRange { axis: "width", .. })
        ));

        let mut s = base.clone();
        s.height = DimRange::new(1, 200);
        assert!(matches!(
            s.validate(),
            Err(ConfigError::DimensionTooSmall { axis: "height", .. })
        ));

        let mut s = base.clone();
        s.jpeg_quality = 1.5;
        assert_eq!(s.validate(), Err(ConfigError::QualityOutOfRange(1.5)));

        let mut s = base.clone();
        s.min_ratio = -0.1;
        assert_eq!(s.validate(), Err(ConfigError::RatioOutOfRange(-0.1)));

        // Width can reach 1000, which would push height to 750, past its max of 200.
        let mut s = base;
        s.width = DimRange::new(100, 1000);
        s.height = DimRange::new(100, 200);
        assert_eq!(
            s.validate(),
            Err(ConfigError::AspectUnsatisfiable {
                ratio: 0.75,
                axis: "height",
                needed: 750,
                max: 200
            })
        );
    }

    #[test]
    fn test_exact_aspect_floor_is_accepted() {
        // 100 * 0.07 is exactly 7 in decimal, even though the float product is slightly above.
        let s = GenerationSettings {
            width: DimRange::new(2, 100),
            height: DimRange::new(2, 7),
            min_ratio: 0.07,
            ..GenerationSettings::default()
        };
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn test_json_defaults_fill_gaps() {
        let s: GenerationSettings =
            serde_json::from_str(r#"{"formats": ["png", "jpeg"], "seed": 7}"#).unwrap();
        assert!(s.formats.contains(ImageFormat::Png));
        assert!(s.formats.is_both());
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.width, DimRange::new(100, 2160));
        assert_eq!(s.jpeg_quality, 0.65);
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("42"), Ok(42));
        assert_eq!(parse_seed("0x2a"), Ok(42));
        assert_eq!(parse_seed("0xabc"), Ok(0xabc));
        assert_eq!(parse_seed("0xffffffffffffffff"), Ok(u64::MAX));
        assert!(parse_seed("0x1ffffffffffffffff").is_err());
        assert!(parse_seed("0x").is_err());
        assert!(parse_seed("nope").is_err());
    }
}

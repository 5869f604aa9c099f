use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rand::Rng;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    fn other(self) -> ImageFormat {
        match self {
            ImageFormat::Png => ImageFormat::Jpeg,
            ImageFormat::Jpeg => ImageFormat::Png,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        })
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            _ => Err(ConfigError::UnknownFormat(s.to_owned())),
        }
    }
}

/// The set of enabled output formats. Never empty: there is no way to construct or mutate one
/// into a state with nothing enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<ImageFormat>", try_from = "Vec<ImageFormat>")]
pub struct FormatSet {
    png: bool,
    jpeg: bool,
}

impl Default for FormatSet {
    fn default() -> Self {
        FormatSet::only(ImageFormat::Jpeg)
    }
}

impl FormatSet {
    pub fn only(format: ImageFormat) -> FormatSet {
        let mut set = FormatSet {
            png: false,
            jpeg: false,
        };
        *set.slot(format) = true;
        set
    }

    pub fn both() -> FormatSet {
        FormatSet {
            png: true,
            jpeg: true,
        }
    }

    pub fn from_formats<I: IntoIterator<Item = ImageFormat>>(
        formats: I,
    ) -> Result<FormatSet, ConfigError> {
        let mut set = FormatSet {
            png: false,
            jpeg: false,
        };
        for format in formats {
            *set.slot(format) = true;
        }
        if !set.png && !set.jpeg {
            return Err(ConfigError::NoFormats);
        }
        Ok(set)
    }

    pub fn contains(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Png => self.png,
            ImageFormat::Jpeg => self.jpeg,
        }
    }

    pub fn is_both(&self) -> bool {
        self.png && self.jpeg
    }

    /// Toggles `format`. Switching off the last enabled format switches the other one on, and
    /// the format that got switched on is returned so a caller can refresh its own toggle.
    pub fn set(&mut self, format: ImageFormat, on: bool) -> Option<ImageFormat> {
        *self.slot(format) = on;
        if !self.png && !self.jpeg {
            let other = format.other();
            *self.slot(other) = true;
            return Some(other);
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = ImageFormat> + '_ {
        [ImageFormat::Png, ImageFormat::Jpeg]
            .into_iter()
            .filter(|f| self.contains(*f))
    }

    /// Resolves the single format for one unit. With both enabled this is a coin flip and
    /// consumes exactly one draw; otherwise nothing is drawn.
    pub fn pick(&self, rng: &mut Rng) -> ImageFormat {
        match (self.png, self.jpeg) {
            (true, true) => {
                if rng.boolean() {
                    ImageFormat::Png
                } else {
                    ImageFormat::Jpeg
                }
            }
            (true, false) => ImageFormat::Png,
            _ => ImageFormat::Jpeg,
        }
    }

    fn slot(&mut self, format: ImageFormat) -> &mut bool {
        match format {
            ImageFormat::Png => &mut self.png,
            ImageFormat::Jpeg => &mut self.jpeg,
        }
    }
}

impl From<FormatSet> for Vec<ImageFormat> {
    fn from(set: FormatSet) -> Self {
        set.iter().collect()
    }
}

impl TryFrom<Vec<ImageFormat>> for FormatSet {
    type Error = ConfigError;
    fn try_from(formats: Vec<ImageFormat>) -> Result<Self, Self::Error> {
        FormatSet::from_formats(formats)
    }
}

impl FromStr for FormatSet {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("both") {
            return Ok(FormatSet::both());
        }
        let formats = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.trim().parse())
            .collect::<Result<Vec<ImageFormat>, ConfigError>>()?;
        FormatSet::from_formats(formats)
    }
}

impl fmt::Display for FormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|format| format.to_string()).collect();
        f.write_str(&names.join(","))
    }
}

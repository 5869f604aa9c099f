use raqote::{AntialiasMode, BlendMode, DrawOptions, DrawTarget, SolidSource, Source};
use serde::Serialize;

use super::color::{Hsb, Rgb};
use super::error::ComposeError;
use super::geometry::{rect_in_size, Rect, Size};
use super::rand::Rng;

/// Every image gets at least this many rectangles.
pub const MIN_RECTS: u64 = 10;
/// One extra rectangle is allowed per this many pixels of the longer side.
pub const PIXELS_PER_EXTRA_RECT: u32 = 50;

/// A filled rectangle, in paint order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Paint {
    pub color: Rgb,
    pub rect: Rect,
}

/// Everything random about one image, drawn up front so that rasterizing needs no generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scene {
    pub size: Size,
    pub background: Rgb,
    pub paints: Vec<Paint>,
}

impl Scene {
    /// Draws the background color, then the rectangle count, then for each rectangle its color
    /// followed by its geometry.
    pub fn sample(size: Size, rng: &mut Rng) -> Scene {
        let background = Hsb::bright(rng).to_rgb();
        let max_rects = MIN_RECTS + u64::from(size.longer() / PIXELS_PER_EXTRA_RECT);
        let n = rng.int_in_range(MIN_RECTS, max_rects);
        let paints = (0..n)
            .map(|_| {
                let color = Hsb::any(rng).to_rgb();
                let rect = rect_in_size(rng, size);
                Paint { color, rect }
            })
            .collect();
        Scene {
            size,
            background,
            paints,
        }
    }

    /// Paints the scene onto a fresh surface. Every color is opaque, so a later rectangle fully
    /// covers whatever it overlaps and leaves the rest of the surface alone.
    pub fn render(&self) -> Result<Raster, ComposeError> {
        let mut dt = allocate(self.size)?;
        dt.clear(solid(self.background));
        // `Src` would clear everything outside the filled rectangle.
        let options = DrawOptions {
            blend_mode: BlendMode::SrcOver,
            alpha: 1.0,
            antialias: AntialiasMode::None,
        };
        for Paint { color, rect } in &self.paints {
            dt.fill_rect(
                rect.x as f32,
                rect.y as f32,
                rect.width as f32,
                rect.height as f32,
                &Source::Solid(solid(*color)),
                &options,
            );
        }
        Ok(Raster { dt })
    }
}

/// Samples and renders one image.
pub fn compose(size: Size, rng: &mut Rng) -> Result<Raster, ComposeError> {
    Scene::sample(size, rng).render()
}

fn solid(color: Rgb) -> SolidSource {
    SolidSource {
        r: color.r,
        g: color.g,
        b: color.b,
        a: 0xff,
    }
}

fn allocate(size: Size) -> Result<DrawTarget, ComposeError> {
    let err = || ComposeError::Allocation {
        width: size.width,
        height: size.height,
    };
    // The surface indexes pixels with i32 arithmetic.
    let len = u64::from(size.width) * u64::from(size.height);
    if size.width == 0 || size.height == 0 || len > i32::MAX as u64 {
        return Err(err());
    }
    let mut buf: Vec<u32> = Vec::new();
    buf.try_reserve_exact(len as usize).map_err(|_| err())?;
    Ok(DrawTarget::from_vec(
        size.width as i32,
        size.height as i32,
        buf,
    ))
}

/// An opaque in-memory raster. Created, encoded, and dropped once per unit.
pub struct Raster {
    dt: DrawTarget,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Raster({}x{})", self.width(), self.height())
    }
}

impl Raster {
    pub fn width(&self) -> u32 {
        self.dt.width() as u32
    }

    pub fn height(&self) -> u32 {
        self.dt.height() as u32
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let index = y as usize * self.width() as usize + x as usize;
        self.dt.get_data().get(index).copied().map(Rgb::from_argb)
    }

    /// Tightly packed 8-bit RGB rows, top to bottom.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let data = self.dt.get_data();
        let mut out = Vec::with_capacity(data.len() * 3);
        for px in data {
            let Rgb { r, g, b } = Rgb::from_argb(*px);
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }
}

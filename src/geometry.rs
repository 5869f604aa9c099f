use serde::{Deserialize, Serialize};

use crate::config::DimRange;
use crate::rand::Rng;

/// Canvas dimensions in pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// An axis-aligned rectangle in pixel coordinates, origin at the top left.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Size {
        Size { width, height }
    }

    pub fn longer(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn shorter(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn contains(&self, rect: &Rect) -> bool {
        u64::from(rect.x) + u64::from(rect.width) <= u64::from(self.width)
            && u64::from(rect.y) + u64::from(rect.height) <= u64::from(self.height)
    }
}

/// Smallest side length that satisfies the aspect floor against `longer`.
pub fn aspect_floor(longer: u32, min_ratio: f64) -> u32 {
    let exact = f64::from(longer) * min_ratio;
    let nearest = exact.round();
    // Products like `100.0 * 0.07` land a hair above the integer they stand for.
    if (exact - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        nearest as u32
    } else {
        exact.ceil() as u32
    }
}

/// Draws a width, then a height, uniformly from their ranges, then raises the shorter side so
/// that `shorter >= longer * min_ratio`. Neither drawn value is ever decreased.
pub fn size_in_range(rng: &mut Rng, width: DimRange, height: DimRange, min_ratio: f64) -> Size {
    let mut w = rng.int_in_range(width.min.into(), width.max.into()) as u32;
    let mut h = rng.int_in_range(height.min.into(), height.max.into()) as u32;
    if w > h {
        h = h.max(aspect_floor(w, min_ratio));
    } else {
        w = w.max(aspect_floor(h, min_ratio));
    }
    Size::new(w, h)
}

/// Draws a rectangle fully contained in `canvas`: width then height from `[1, side / 2]`, then
/// the origin so that the far edges stay on the canvas.
///
/// # Panics
///
/// Panics if either side of `canvas` is shorter than 2 pixels.
pub fn rect_in_size(rng: &mut Rng, canvas: Size) -> Rect {
    let width = rng.int_in_range(1, u64::from(canvas.width / 2)) as u32;
    let height = rng.int_in_range(1, u64::from(canvas.height / 2)) as u32;
    let x = rng.int_in_range(0, u64::from(canvas.width - width)) as u32;
    let y = rng.int_in_range(0, u64::from(canvas.height - height)) as u32;
    Rect {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn range(min: u32, max: u32) -> DimRange {
        DimRange { min, max }
    }

    #[test]
    fn test_size_respects_aspect_floor() {
        let mut rng = Rng::from_seed(3);
        for _ in 0..5000 {
            let size = size_in_range(&mut rng, range(100, 2160), range(100, 2160), 0.75);
            assert!(
                f64::from(size.shorter()) >= f64::from(size.longer()) * 0.75,
                "{:?}",
                size
            );
            assert!((100..=2160).contains(&size.width));
            assert!((100..=2160).contains(&size.height));
        }
    }

    #[test]
    fn test_size_without_floor_is_plain_draw() {
        let mut a = Rng::from_seed(8);
        let mut b = Rng::from_seed(8);
        let size = size_in_range(&mut a, range(10, 20), range(30, 40), 0.0);
        assert_eq!(
            size,
            Size::new(b.int_in_range(10, 20) as u32, b.int_in_range(30, 40) as u32)
        );
    }

    #[test]
    fn test_size_raises_shorter_side() {
        let mut rng = Rng::from_seed(0);
        // Height is always longer, so width gets raised to the full height.
        let size = size_in_range(&mut rng, range(2, 4), range(500, 500), 1.0);
        assert_eq!(size, Size::new(500, 500));
    }

    #[test]
    fn test_aspect_floor_rounds_up() {
        assert_eq!(aspect_floor(101, 0.75), 76);
        assert_eq!(aspect_floor(100, 0.75), 75);
        assert_eq!(aspect_floor(100, 0.0), 0);
        assert_eq!(aspect_floor(100, 0.07), 7);
        assert_eq!(aspect_floor(1000, 0.123), 123);
        assert_eq!(aspect_floor(2160, 1.0), 2160);
    }

    #[test]
    fn test_rect_contained() {
        let mut rng = Rng::from_seed(17);
        for canvas in [Size::new(2, 2), Size::new(3, 1000), Size::new(640, 480)] {
            for _ in 0..2000 {
                let rect = rect_in_size(&mut rng, canvas);
                assert!(rect.width >= 1 && rect.width <= canvas.width / 2);
                assert!(rect.height >= 1 && rect.height <= canvas.height / 2);
                assert!(canvas.contains(&rect), "{:?} not in {:?}", rect, canvas);
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_rect_in_degenerate_canvas() {
        rect_in_size(&mut Rng::from_seed(0), Size::new(1, 10));
    }
}

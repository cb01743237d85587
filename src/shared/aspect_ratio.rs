// This is free and unencumbered software released into the public domain.

use crate::shared::CameraError;
use alloc::collections::{BTreeMap, BTreeSet};
use core::{cmp::Ordering, str::FromStr};
use derive_more::Display;

/// An immutable width:height ratio, always stored in lowest terms.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("{x}:{y}")]
pub struct AspectRatio {
    x: u32,
    y: u32,
}

impl AspectRatio {
    pub const DEFAULT: AspectRatio = AspectRatio { x: 4, y: 3 };

    /// Returns the reduced ratio of `x` to `y`.
    ///
    /// A zero component is kept as-is (`0:1`, `1:0`); [`FromStr`] rejects it.
    pub fn of(x: u32, y: u32) -> Self {
        let g = gcd(x, y).max(1);
        Self { x: x / g, y: y / g }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn matches(&self, size: Size) -> bool {
        AspectRatio::of(size.width, size.height) == *self
    }

    pub fn inverse(&self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    pub fn to_f32(&self) -> f32 {
        self.x as f32 / self.y as f32
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PartialOrd for AspectRatio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AspectRatio {
    fn cmp(&self, other: &Self) -> Ordering {
        // x1/y1 vs x2/y2 without floating point.
        (self.x as u64 * other.y as u64)
            .cmp(&(other.x as u64 * self.y as u64))
            .then_with(|| self.x.cmp(&other.x))
    }
}

impl FromStr for AspectRatio {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| CameraError::invalid_config(format!("malformed aspect ratio: {s}")))?;
        let x: u32 = x
            .trim()
            .parse()
            .map_err(|_| CameraError::invalid_config(format!("malformed aspect ratio: {s}")))?;
        let y: u32 = y
            .trim()
            .parse()
            .map_err(|_| CameraError::invalid_config(format!("malformed aspect ratio: {s}")))?;
        if x == 0 || y == 0 {
            return Err(CameraError::invalid_config(format!(
                "aspect ratio components must be positive: {s}"
            )));
        }
        Ok(Self::of(x, y))
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[derive(Clone, Copy, Debug, Display, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{width}x{height}")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::of(self.width, self.height)
    }
}

/// Sizes grouped by aspect ratio.
#[derive(Clone, Debug, Default)]
pub struct SizeMap {
    ratios: BTreeMap<AspectRatio, BTreeSet<Size>>,
}

impl SizeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `size`, returning `false` if it was already present.
    pub fn add(&mut self, size: Size) -> bool {
        self.ratios
            .entry(size.aspect_ratio())
            .or_default()
            .insert(size)
    }

    pub fn remove(&mut self, ratio: AspectRatio) {
        self.ratios.remove(&ratio);
    }

    pub fn ratios(&self) -> BTreeSet<AspectRatio> {
        self.ratios.keys().copied().collect()
    }

    pub fn contains(&self, ratio: AspectRatio) -> bool {
        self.ratios.contains_key(&ratio)
    }

    /// Sizes of `ratio` in ascending order.
    pub fn sizes(&self, ratio: AspectRatio) -> impl Iterator<Item = Size> + '_ {
        self.ratios.get(&ratio).into_iter().flatten().copied()
    }

    pub fn largest(&self, ratio: AspectRatio) -> Option<Size> {
        self.ratios.get(&ratio).and_then(|s| s.last().copied())
    }

    pub fn clear(&mut self) {
        self.ratios.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

impl FromIterator<Size> for SizeMap {
    fn from_iter<T: IntoIterator<Item = Size>>(iter: T) -> Self {
        let mut map = SizeMap::new();
        for size in iter {
            map.add(size);
        }
        map
    }
}

/// Picks the aspect ratio a freshly opened camera should use.
///
/// Keeps `preferred` when the camera supports it, otherwise prefers 4:3,
/// otherwise the first supported ratio.
pub fn choose_aspect_ratio(map: &SizeMap, preferred: AspectRatio) -> Option<AspectRatio> {
    if map.contains(preferred) {
        return Some(preferred);
    }
    if map.contains(AspectRatio::DEFAULT) {
        return Some(AspectRatio::DEFAULT);
    }
    map.ratios().into_iter().next()
}

/// Picks the preview size of `ratio` that best fits a surface.
///
/// With an unknown surface (`None`), the largest size wins. Otherwise the
/// smallest size covering the surface, or the largest size if none does.
/// `rotated` means the display is in landscape relative to the sensor, so
/// the surface dimensions are swapped before comparing.
pub fn choose_optimal_size(
    map: &SizeMap,
    ratio: AspectRatio,
    surface: Option<Size>,
    rotated: bool,
) -> Option<Size> {
    let Some(surface) = surface.filter(|s| s.width > 0 && s.height > 0) else {
        return map.largest(ratio);
    };
    let (want_w, want_h) = if rotated {
        (surface.height, surface.width)
    } else {
        (surface.width, surface.height)
    };
    map.sizes(ratio)
        .find(|s| s.width >= want_w && s.height >= want_h)
        .or_else(|| map.largest(ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_normalized() {
        let r = AspectRatio::of(1920, 1080);
        assert_eq!((r.x(), r.y()), (16, 9));
        assert_eq!(AspectRatio::of(16, 12), AspectRatio::of(4, 3));
        assert_ne!(AspectRatio::of(4, 3), AspectRatio::of(3, 4));
        assert_eq!(AspectRatio::of(4, 3).inverse(), AspectRatio::of(3, 4));
    }

    #[test]
    fn ratio_parses_and_displays() {
        let r: AspectRatio = "16:9".parse().unwrap();
        assert_eq!(r.to_string(), "16:9");
        let r: AspectRatio = " 8 : 6 ".parse().unwrap();
        assert_eq!(r, AspectRatio::DEFAULT);
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert!("a:b".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn ratio_orders_by_value() {
        let mut ratios = vec![
            AspectRatio::of(16, 9),
            AspectRatio::of(1, 1),
            AspectRatio::of(4, 3),
        ];
        ratios.sort();
        assert_eq!(
            ratios,
            vec![AspectRatio::of(1, 1), AspectRatio::of(4, 3), AspectRatio::of(16, 9)]
        );
        assert!(AspectRatio::of(16, 9).matches(Size::new(1280, 720)));
        assert!(AspectRatio::of(16, 9).to_f32() > AspectRatio::DEFAULT.to_f32());
        assert_eq!(AspectRatio::of(3, 2).to_f32(), 1.5);
        assert!(!AspectRatio::of(16, 9).matches(Size::new(640, 480)));
    }

    #[test]
    fn size_map_groups_by_ratio() {
        let map: SizeMap = [
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(1920, 1080),
            Size::new(640, 480),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.ratios().len(), 2);
        assert_eq!(map.sizes(AspectRatio::of(16, 9)).count(), 2);
        assert_eq!(map.largest(AspectRatio::of(16, 9)), Some(Size::new(1920, 1080)));
        assert_eq!(map.largest(AspectRatio::of(1, 1)), None);
    }

    #[test]
    fn chooses_ratio_with_default_preference() {
        let map: SizeMap = [Size::new(1280, 720), Size::new(640, 480)]
            .into_iter()
            .collect();
        assert_eq!(
            choose_aspect_ratio(&map, AspectRatio::of(16, 9)),
            Some(AspectRatio::of(16, 9))
        );
        assert_eq!(
            choose_aspect_ratio(&map, AspectRatio::of(1, 1)),
            Some(AspectRatio::DEFAULT)
        );
        let wide: SizeMap = [Size::new(1280, 720)].into_iter().collect();
        assert_eq!(
            choose_aspect_ratio(&wide, AspectRatio::of(1, 1)),
            Some(AspectRatio::of(16, 9))
        );
        assert_eq!(choose_aspect_ratio(&SizeMap::new(), AspectRatio::DEFAULT), None);
    }

    #[test]
    fn chooses_smallest_covering_size() {
        let map: SizeMap = [Size::new(640, 480), Size::new(1280, 960), Size::new(2048, 1536)]
            .into_iter()
            .collect();
        let r = AspectRatio::DEFAULT;
        assert_eq!(choose_optimal_size(&map, r, None, false), Some(Size::new(2048, 1536)));
        assert_eq!(
            choose_optimal_size(&map, r, Some(Size::new(1000, 700)), false),
            Some(Size::new(1280, 960))
        );
        assert_eq!(
            choose_optimal_size(&map, r, Some(Size::new(700, 1000)), true),
            Some(Size::new(1280, 960))
        );
        assert_eq!(
            choose_optimal_size(&map, r, Some(Size::new(4000, 3000)), false),
            Some(Size::new(2048, 1536))
        );
    }
}

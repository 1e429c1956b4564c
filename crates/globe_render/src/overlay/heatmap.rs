//! Heatmap rasterization
//!
//! Each data point stamps a radial gradient onto a square RGBA8 image at
//! the point's spherical UV. The gradient color comes from the color scale
//! by `value / max_value`; its alpha falls off linearly from `intensity` at
//! the center to zero at `radius` pixels. Stamps are composited over an
//! opaque black background, then box-blurred.

use globe_core::Color;
use globe_math::spherical_uv;

use super::DataPoint;

/// Heatmap configuration
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapSettings {
    /// Edge length of the square texture in pixels
    pub size: u32,
    /// Stamp radius in pixels
    pub radius: f32,
    /// Alpha at the center of a stamp
    pub intensity: f32,
    /// Blur radius in pixels; rounded up, 0 disables
    pub blur: f32,
    /// Low to high
    pub color_scale: Vec<Color>,
    /// Density marker radius growth per unit of normalized density
    pub density_size_scale: f32,
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            size: 1024,
            radius: 10.0,
            intensity: 1.0,
            blur: 0.8,
            color_scale: vec![
                Color::rgb(0.0, 0.0, 1.0),
                Color::rgb(0.0, 1.0, 0.0),
                Color::rgb(1.0, 1.0, 0.0),
                Color::rgb(1.0, 0.0, 0.0),
            ],
            density_size_scale: 0.8,
        }
    }
}

impl HeatmapSettings {
    /// Scale entry for a value: `floor(value / max · (len − 1))`
    pub fn color_for(&self, value: f32, max_value: f32) -> Color {
        let Some(last) = self.color_scale.len().checked_sub(1) else {
            return Color::WHITE;
        };
        if max_value <= 0.0 || !value.is_finite() {
            return self.color_scale[0];
        }
        let t = (value / max_value).clamp(0.0, 1.0);
        let index = ((t * last as f32).floor() as usize).min(last);
        self.color_scale[index]
    }
}

/// Square RGBA8 image
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapImage {
    size: u32,
    pixels: Vec<u8>,
}

impl HeatmapImage {
    /// Opaque black image
    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        let mut pixels = vec![0u8; size as usize * size as usize * 4];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self { size, pixels }
    }

    /// Rasterize `points` with `settings`
    pub fn render(points: &[DataPoint], settings: &HeatmapSettings) -> Self {
        let mut image = Self::new(settings.size);
        let max_value = points.iter().map(|p| p.value).fold(0.0f32, f32::max);
        for point in points {
            let (u, v) = spherical_uv(point.position);
            let color = settings.color_for(point.value, max_value);
            image.stamp(
                u * image.size as f32,
                v * image.size as f32,
                settings.radius,
                settings.intensity,
                color,
            );
        }
        image.box_blur(settings.blur.ceil().max(0.0) as u32);
        image
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x.min(self.size - 1), y.min(self.size - 1));
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    /// Nearest-pixel lookup at texture coordinates in [0, 1]
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let max = (self.size - 1) as f32;
        let x = (u.clamp(0.0, 1.0) * max).round() as u32;
        let y = (v.clamp(0.0, 1.0) * max).round() as u32;
        let [r, g, b, a] = self.pixel(x, y);
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0]
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size as usize + x as usize) * 4
    }

    /// Composite one radial gradient centered at pixel (cx, cy)
    fn stamp(&mut self, cx: f32, cy: f32, radius: f32, intensity: f32, color: Color) {
        if radius <= 0.0 || intensity <= 0.0 {
            return;
        }
        let [r, g, b, _] = color.to_rgba8();
        let max = self.size as i64 - 1;
        let x0 = ((cx - radius).floor() as i64).clamp(0, max);
        let x1 = ((cx + radius).ceil() as i64).clamp(0, max);
        let y0 = ((cy - radius).floor() as i64).clamp(0, max);
        let y1 = ((cy + radius).ceil() as i64).clamp(0, max);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance >= radius {
                    continue;
                }
                let alpha = (intensity * (1.0 - distance / radius)).clamp(0.0, 1.0);
                let i = self.index(x as u32, y as u32);
                for (channel, src) in [r, g, b].into_iter().enumerate() {
                    let dst = self.pixels[i + channel] as f32;
                    self.pixels[i + channel] = (src as f32 * alpha + dst * (1.0 - alpha)).round() as u8;
                }
            }
        }
    }

    /// Separable box blur of the RGB channels
    pub fn box_blur(&mut self, radius: u32) {
        if radius == 0 || self.size < 2 {
            return;
        }
        let size = self.size as usize;
        let mut scratch = self.pixels.clone();
        blur_pass(&self.pixels, &mut scratch, size, radius as usize, true);
        blur_pass(&scratch, &mut self.pixels, size, radius as usize, false);
    }
}

/// One box-filter pass along rows (`horizontal`) or columns
fn blur_pass(src: &[u8], dst: &mut [u8], size: usize, radius: usize, horizontal: bool) {
    let at = |line: usize, k: usize| {
        let (x, y) = if horizontal { (k, line) } else { (line, k) };
        (y * size + x) * 4
    };
    for line in 0..size {
        for k in 0..size {
            let lo = k.saturating_sub(radius);
            let hi = (k + radius).min(size - 1);
            let mut sum = [0u32; 3];
            for s in lo..=hi {
                let i = at(line, s);
                for (c, total) in sum.iter_mut().enumerate() {
                    *total += src[i + c] as u32;
                }
            }
            let count = (hi - lo + 1) as u32;
            let i = at(line, k);
            for (c, total) in sum.iter().enumerate() {
                dst[i + c] = ((total + count / 2) / count) as u8;
            }
        }
    }
}

/// Hue for a normalized density: 0.6 (blue) down to 0 (red)
pub fn density_hue(density: f32) -> f32 {
    0.6 - density.clamp(0.0, 1.0) * 0.6
}

/// Density marker radius
pub fn density_radius(density: f32, size_scale: f32) -> f32 {
    0.2 + density.clamp(0.0, 1.0) * size_scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_math::Vec3;

    fn settings(size: u32, blur: f32) -> HeatmapSettings {
        HeatmapSettings {
            size,
            blur,
            ..HeatmapSettings::default()
        }
    }

    #[test]
    fn test_color_scale_index() {
        let s = HeatmapSettings::default();
        assert_eq!(s.color_for(0.0, 10.0), s.color_scale[0]);
        assert_eq!(s.color_for(5.0, 10.0), s.color_scale[1]);
        assert_eq!(s.color_for(9.9, 10.0), s.color_scale[2]);
        assert_eq!(s.color_for(10.0, 10.0), s.color_scale[3]);
        assert_eq!(s.color_for(3.0, 0.0), s.color_scale[0]);
    }

    #[test]
    fn test_empty_image_is_black() {
        let image = HeatmapImage::render(&[], &settings(16, 0.8));
        assert_eq!(image.pixels().len(), 16 * 16 * 4);
        assert!(image.pixels().chunks(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn test_stamp_lands_at_uv() {
        // +Z has theta 0, and the equator has phi = π/2
        let point = DataPoint::new(Vec3::new(0.0, 0.0, 2.0), 1.0);
        let (u, v) = spherical_uv(point.position);
        assert!(u.abs() < 1e-6 && (v - 0.5).abs() < 1e-6);

        let mut point = DataPoint::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        point.value = 4.0;
        let image = HeatmapImage::render(&[point], &settings(64, 0.0));
        // +X: theta π/2 → u 0.25
        let center = image.pixel(16, 32);
        assert!(center[0] > 220, "max value maps to red: {:?}", center);
        assert!(center[1] < 30);
        let far = image.pixel(48, 32);
        assert_eq!(far, [0, 0, 0, 255]);
    }

    #[test]
    fn test_alpha_falls_off_linearly() {
        let mut image = HeatmapImage::new(32);
        image.stamp(16.0, 16.0, 10.0, 1.0, Color::WHITE);
        let near = image.pixel(16, 16)[0];
        let mid = image.pixel(21, 16)[0];
        let edge = image.pixel(25, 16)[0];
        assert!(near > mid && mid > edge);
        assert!(near > 230);
        assert!((mid as i32 - 115).abs() < 15);
        assert_eq!(image.pixel(27, 16)[0], 0);
    }

    #[test]
    fn test_blur_spreads_energy() {
        let mut image = HeatmapImage::new(8);
        let i = image.index(4, 4);
        image.pixels[i] = 255;
        image.box_blur(1);
        assert!(image.pixel(4, 4)[0] < 255);
        assert!(image.pixel(5, 5)[0] > 0);
        assert_eq!(image.pixel(7, 7)[0], 0);
        assert!(image.pixels().chunks(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_density_styling() {
        assert_eq!(density_hue(0.0), 0.6);
        assert_eq!(density_hue(1.0), 0.0);
        assert_eq!(density_radius(0.0, 0.8), 0.2);
        assert!((density_radius(1.0, 0.8) - 1.0).abs() < 1e-6);
    }
}

//! Categorical clustering
//!
//! Points are grouped by their category label; every group gets a stable
//! color derived from the label text.

use std::collections::BTreeMap;

use globe_core::Color;

use super::DataPoint;

/// Label used for points without a category
pub const DEFAULT_CATEGORY: &str = "default";

/// Base radius of a category point before value scaling
pub const CATEGORY_POINT_SIZE: f32 = 0.5;

/// 32-bit string hash: `hash = c + (hash << 5) − hash` over UTF-16 units
pub fn category_hash(label: &str) -> i32 {
    label.encode_utf16().fold(0i32, |hash, unit| {
        (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}

/// Stable color for a category label
pub fn category_color(label: &str) -> Color {
    let hue = (category_hash(label) & 0xff) as f32 / 255.0;
    Color::from_hsl(hue, 0.8, 0.6)
}

/// Radius of a point carrying `value`
pub fn category_radius(value: f32) -> f32 {
    CATEGORY_POINT_SIZE * value.max(0.0).sqrt()
}

/// One category and the points that belong to it
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryGroup {
    pub label: String,
    pub color: Color,
    /// Indices into the source point list
    pub members: Vec<usize>,
}

/// Group point indices by category, ordered by label
pub fn group_by_category(points: &[DataPoint]) -> Vec<CategoryGroup> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, point) in points.iter().enumerate() {
        let label = point.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
        groups.entry(label).or_default().push(i);
    }
    groups
        .into_iter()
        .map(|(label, members)| CategoryGroup {
            label: label.to_string(),
            color: category_color(label),
            members,
        })
        .collect()
}

//! Modal pointer interaction
//!
//! The [`InteractionController`] turns pointer events into hover, selection,
//! distance measurement, route building and area selection over the scene
//! [`World`]. Pointer positions are normalized device coordinates; the
//! caller builds picking rays from them with its camera.
//!
//! Switching modes always starts from a clean slate: selection, measure
//! points, route cities, selection box, hover and the interacting flag are
//! all cleared.

use globe_core::{pick_ray, ObjectKey, World};
use globe_math::{Ray, Vec3};

/// Interaction mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    /// Hover highlights, click promotes the hovered object to the selection
    #[default]
    View,
    /// Clicking toggles objects in the selection
    Select,
    /// Clicks on the globe add measurement points
    Measure,
    /// Cities are appended to a route
    Route,
    /// Drag a screen-space box to select everything inside it
    Area,
}

impl InteractionMode {
    pub const ALL: [InteractionMode; 5] = [
        InteractionMode::View,
        InteractionMode::Select,
        InteractionMode::Measure,
        InteractionMode::Route,
        InteractionMode::Area,
    ];

    /// Mode bound to a number key, 1-based
    pub fn from_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            InteractionMode::View => "view",
            InteractionMode::Select => "select",
            InteractionMode::Measure => "measure",
            InteractionMode::Route => "route",
            InteractionMode::Area => "area",
        }
    }
}

/// Screen-space rectangle in NDC, as dragged by the user
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionBox {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

impl SelectionBox {
    /// Corners ordered as (min, max)
    pub fn normalized(&self) -> ((f32, f32), (f32, f32)) {
        (
            (self.start.0.min(self.end.0), self.start.1.min(self.end.1)),
            (self.start.0.max(self.end.0), self.start.1.max(self.end.1)),
        )
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        let (min, max) = self.normalized();
        point.0 >= min.0 && point.0 <= max.0 && point.1 >= min.1 && point.1 <= max.1
    }
}

/// Projection of world points to NDC
///
/// Implemented by the render camera; area selection uses it to decide
/// which objects fall inside the box.
pub trait ScreenProjector {
    /// NDC position, or `None` when the point is behind the camera
    fn project(&self, point: Vec3) -> Option<(f32, f32)>;
}

/// Modal interaction state
#[derive(Debug, Default)]
pub struct InteractionController {
    mode: InteractionMode,
    pointer: (f32, f32),
    hovered: Option<ObjectKey>,
    selected: Vec<ObjectKey>,
    measure_points: Vec<Vec3>,
    route: Vec<String>,
    selection_box: Option<SelectionBox>,
    interacting: bool,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch modes, clearing all accumulated state
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode != self.mode {
            log::info!("Interaction mode: {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
        self.clear();
    }

    /// Clear selection, measurement, route, box and hover
    pub fn clear(&mut self) {
        self.hovered = None;
        self.selected.clear();
        self.measure_points.clear();
        self.route.clear();
        self.selection_box = None;
        self.interacting = false;
    }

    /// Pointer moved to `ndc`
    ///
    /// `ray` is the picking ray through the pointer, or `None` when the
    /// camera could not build one.
    pub fn pointer_moved(&mut self, ndc: (f32, f32), ray: Option<&Ray>, world: &World) {
        self.pointer = ndc;
        match self.mode {
            InteractionMode::View | InteractionMode::Select => {
                self.hovered = ray.and_then(|ray| pick_ray(world, ray)).map(|hit| hit.key);
            }
            InteractionMode::Area if self.interacting => {
                if let Some(selection_box) = self.selection_box.as_mut() {
                    selection_box.end = ndc;
                }
            }
            _ => {}
        }
    }

    /// Primary button pressed at the last pointer position
    pub fn pointer_down(&mut self, ray: Option<&Ray>, world: &World) {
        match self.mode {
            InteractionMode::Area => {
                self.selection_box = Some(SelectionBox {
                    start: self.pointer,
                    end: self.pointer,
                });
                self.interacting = true;
            }
            InteractionMode::Measure => {
                if let Some(hit) = ray.and_then(|ray| pick_ray(world, ray)) {
                    self.measure_points.push(hit.point);
                    log::debug!(
                        "Measure point {} added, total distance {:.3}",
                        self.measure_points.len(),
                        self.measurement_distance()
                    );
                }
            }
            InteractionMode::Select => {
                if let Some(key) = self.hovered {
                    if let Some(index) = self.selected.iter().position(|k| *k == key) {
                        self.selected.remove(index);
                    } else {
                        self.selected.push(key);
                    }
                }
            }
            InteractionMode::View | InteractionMode::Route => {}
        }
    }

    /// Primary button released
    ///
    /// Finishing an area drag replaces the selection with every pickable,
    /// visible object whose projected position lies inside the box.
    pub fn pointer_up<P: ScreenProjector>(&mut self, world: &World, projector: &P) {
        if self.mode != InteractionMode::Area || !self.interacting {
            return;
        }
        self.interacting = false;
        let Some(selection_box) = self.selection_box.take() else {
            return;
        };

        self.selected = world
            .iter()
            .filter(|(_, object)| object.pickable && object.visible)
            .filter(|(_, object)| {
                projector
                    .project(object.transform.position)
                    .is_some_and(|p| selection_box.contains(p))
            })
            .map(|(key, _)| key)
            .collect();
        log::info!("Area selection picked {} objects", self.selected.len());
    }

    /// Promote the hovered object to the selection
    pub fn click(&mut self) -> Option<ObjectKey> {
        let key = self.hovered?;
        self.selected.clear();
        self.selected.push(key);
        Some(key)
    }

    /// Cumulative distance along the measurement points
    pub fn measurement_distance(&self) -> f32 {
        self.measure_points
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }

    /// Append a city to the route; ignored outside route mode
    pub fn add_route_point(&mut self, city_id: impl Into<String>) -> bool {
        if self.mode != InteractionMode::Route {
            return false;
        }
        self.route.push(city_id.into());
        true
    }

    /// The route being built, once it has at least two cities
    pub fn route(&self) -> Option<&[String]> {
        (self.route.len() >= 2).then_some(self.route.as_slice())
    }

    /// Objects whose name contains `term`, case-insensitively
    ///
    /// An empty term matches nothing.
    pub fn search(&self, world: &World, term: &str) -> Vec<ObjectKey> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        world
            .iter()
            .filter(|(_, object)| object.name.to_lowercase().contains(&term))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn hovered(&self) -> Option<ObjectKey> {
        self.hovered
    }

    pub fn selected(&self) -> &[ObjectKey] {
        &self.selected
    }

    pub fn measure_points(&self) -> &[Vec3] {
        &self.measure_points
    }

    pub fn selection_box(&self) -> Option<&SelectionBox> {
        self.selection_box.as_ref()
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }
}

//! Pointer hit testing and input routing
//!
//! One pointer, routed once per frame. Objects later in document order are
//! drawn on top, so routing walks back to front and the top-most hit takes
//! the click. A press produces at most one click edge in total.

use glam::Vec2;

use super::object::{Shape, SimObject};

/// Pointer state fed by host events or manual injection
#[derive(Debug, Clone, Default)]
pub struct Pointer {
    pub position: Vec2,
    pub down: bool,
    /// Press not yet routed to an object
    pending_press: bool,
    dragging: Option<String>,
    drag_offset: Vec2,
}

impl Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manual injection: set position and button state in one call.
    /// An up→down transition registers a press.
    pub fn inject(&mut self, x: f32, y: f32, down: bool) {
        if down && !self.down {
            self.pending_press = true;
        }
        if !down {
            self.dragging = None;
        }
        self.position = Vec2::new(x, y);
        self.down = down;
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.inject(x, y, self.down);
    }

    pub fn press(&mut self, x: f32, y: f32) {
        self.inject(x, y, true);
    }

    pub fn release(&mut self, x: f32, y: f32) {
        self.inject(x, y, false);
    }

    /// Id of the object following the pointer, if any
    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    pub fn has_pending_press(&self) -> bool {
        self.pending_press
    }
}

/// Shape-appropriate containment test (axis aligned, rotation ignored)
pub fn contains_point(obj: &SimObject, point: Vec2) -> bool {
    let d = point - obj.position;
    match obj.shape {
        Shape::Circle { radius } => d.length_squared() <= radius * radius,
        Shape::Rect { .. } | Shape::Symbol { .. } | Shape::Text { .. } => {
            let half = obj.box_size() / 2.0;
            d.x.abs() <= half.x && d.y.abs() <= half.y
        }
    }
}

/// Update hover flags, hand a pending press to the top-most hit object and
/// move the dragged object. Returns the index of the object that got the click.
pub fn route_input(objects: &mut [SimObject], pointer: &mut Pointer) -> Option<usize> {
    for obj in objects.iter_mut() {
        obj.hovered = contains_point(obj, pointer.position);
        obj.click_edge = false;
    }

    let mut clicked = None;
    if pointer.pending_press {
        pointer.pending_press = false;
        // A press released before this frame still clicks
        clicked = objects.iter().rposition(|o| o.hovered);
        if let Some(index) = clicked {
            let obj = &mut objects[index];
            obj.click_edge = true;
            if obj.draggable && pointer.down {
                pointer.dragging = Some(obj.id.clone());
                pointer.drag_offset = obj.position - pointer.position;
                log::debug!("drag start '{}'", obj.id);
            }
        }
    }

    if let Some(id) = pointer.dragging.clone() {
        match objects.iter_mut().find(|o| o.id == id) {
            Some(obj) => {
                obj.position = pointer.position + pointer.drag_offset;
                if let Some(physics) = obj.physics.as_mut() {
                    physics.velocity = Vec2::ZERO;
                }
            }
            None => pointer.dragging = None,
        }
    }

    clicked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::object::PhysicsState;

    #[test]
    fn test_contains_point_shapes() {
        let c = SimObject::circle("c", Vec2::new(100.0, 100.0), 10.0);
        assert!(contains_point(&c, Vec2::new(110.0, 100.0)));
        assert!(!contains_point(&c, Vec2::new(108.0, 108.0)));

        let r = SimObject::rect("r", Vec2::new(0.0, 0.0), 40.0, 20.0);
        assert!(contains_point(&r, Vec2::new(19.0, -9.0)));
        assert!(!contains_point(&r, Vec2::new(0.0, 11.0)));

        // "abcde" at 20px: 60 wide (estimated), 24 tall
        let t = SimObject::text("t", Vec2::ZERO, "abcde", 20.0);
        assert!(contains_point(&t, Vec2::new(29.0, 11.0)));
        assert!(!contains_point(&t, Vec2::new(31.0, 0.0)));
    }

    #[test]
    fn test_hover_follows_pointer() {
        let mut objects = vec![SimObject::circle("c", Vec2::new(50.0, 50.0), 10.0)];
        let mut pointer = Pointer::new();
        pointer.move_to(50.0, 55.0);
        route_input(&mut objects, &mut pointer);
        assert!(objects[0].hovered);
        assert!(!objects[0].click_edge);

        pointer.move_to(200.0, 200.0);
        route_input(&mut objects, &mut pointer);
        assert!(!objects[0].hovered);
    }

    #[test]
    fn test_single_click_edge_top_most_wins() {
        let mut objects = vec![
            SimObject::circle("bottom", Vec2::new(50.0, 50.0), 20.0),
            SimObject::circle("top", Vec2::new(55.0, 50.0), 20.0),
        ];
        let mut pointer = Pointer::new();
        pointer.press(52.0, 50.0);

        assert_eq!(route_input(&mut objects, &mut pointer), Some(1));
        assert!(objects[0].hovered && objects[1].hovered);
        assert!(!objects[0].click_edge);
        assert!(objects[1].click_edge);

        // Holding the button does not produce another edge
        assert_eq!(route_input(&mut objects, &mut pointer), None);
        assert!(!objects[1].click_edge);

        pointer.release(52.0, 50.0);
        pointer.press(52.0, 50.0);
        assert_eq!(route_input(&mut objects, &mut pointer), Some(1));
    }

    #[test]
    fn test_press_on_empty_space_is_consumed() {
        let mut objects = vec![SimObject::circle("c", Vec2::new(50.0, 50.0), 10.0)];
        let mut pointer = Pointer::new();
        pointer.press(300.0, 300.0);
        assert_eq!(route_input(&mut objects, &mut pointer), None);

        // Sliding onto the object while still held is not a click
        pointer.move_to(50.0, 50.0);
        assert_eq!(route_input(&mut objects, &mut pointer), None);
        assert!(objects[0].hovered);
    }

    #[test]
    fn test_drag_zeroes_velocity() {
        let mut obj = SimObject::circle("d", Vec2::new(100.0, 100.0), 20.0).with_physics(
            PhysicsState {
                velocity: Vec2::new(300.0, -200.0),
                ..Default::default()
            },
        );
        obj.draggable = true;
        let mut objects = vec![obj];
        let mut pointer = Pointer::new();

        pointer.press(110.0, 100.0);
        route_input(&mut objects, &mut pointer);
        assert_eq!(pointer.dragging(), Some("d"));

        pointer.move_to(210.0, 150.0);
        route_input(&mut objects, &mut pointer);
        assert_eq!(objects[0].position, Vec2::new(200.0, 150.0));
        assert_eq!(objects[0].physics.as_ref().unwrap().velocity, Vec2::ZERO);

        pointer.release(210.0, 150.0);
        assert_eq!(pointer.dragging(), None);
    }

    #[test]
    fn test_quick_click_between_frames() {
        let mut objects = vec![SimObject::circle("c", Vec2::new(50.0, 50.0), 10.0)];
        let mut pointer = Pointer::new();
        pointer.press(50.0, 50.0);
        pointer.release(50.0, 50.0);
        assert_eq!(route_input(&mut objects, &mut pointer), Some(0));
        assert!(!pointer.has_pending_press());
    }
}

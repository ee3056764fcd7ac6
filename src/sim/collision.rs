//! Broad-phase overlap tagging
//!
//! Every object is approximated by a circle of its effective radius. Overlaps
//! produce no response; they only fill `active_collisions` for this frame so
//! behaviors can react to contact.

use glam::Vec2;

use super::object::SimObject;

/// True if two circles overlap (touching does not count)
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance_squared(b) < (ra + rb) * (ra + rb)
}

/// Rebuild every object's collision list. O(n²), symmetric by construction.
pub fn tag_collisions(objects: &mut [SimObject]) {
    for obj in objects.iter_mut() {
        obj.active_collisions.clear();
    }

    let circles: Vec<(Vec2, f32)> = objects
        .iter()
        .map(|o| (o.position, o.effective_radius()))
        .collect();

    for i in 0..objects.len() {
        for j in (i + 1)..objects.len() {
            let (pa, ra) = circles[i];
            let (pb, rb) = circles[j];
            if circles_overlap(pa, ra, pb, rb) {
                let id_b = objects[j].id.clone();
                let id_a = objects[i].id.clone();
                objects[i].active_collisions.push(id_b);
                objects[j].active_collisions.push(id_a);
            }
        }
    }
}

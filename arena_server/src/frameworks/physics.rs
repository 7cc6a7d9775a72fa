// Small kinematic engine behind the `PhysicsWorld` port: integrates velocities, pushes
// dynamic circles out of static rectangles and sweeps sensors for contacts.

use crate::domain::entity::EntityId;
use crate::domain::physics::{BodyDesc, BodyHandle, BodyKind, Contact, PhysicsWorld, Shape};
use glam::Vec2;
use std::collections::BTreeMap;

/// Fraction of knockback velocity lost per second.
const KNOCKBACK_DECAY: f32 = 6.0;
/// Knockback below this speed is dropped.
const KNOCKBACK_EPSILON: f32 = 1.0;

#[derive(Debug, Clone)]
struct Body {
    entity: EntityId,
    position: Vec2,
    velocity: Vec2,
    knockback: Vec2,
    shape: Shape,
    kind: BodyKind,
}

#[derive(Debug, Default)]
pub struct ArcadePhysics {
    bodies: BTreeMap<BodyHandle, Body>,
    by_entity: BTreeMap<EntityId, BodyHandle>,
    contacts: Vec<Contact>,
    next_handle: u64,
}

impl ArcadePhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    fn integrate_dynamic(&mut self, dt: f32) {
        let statics: Vec<(Vec2, Vec2)> = self
            .bodies
            .values()
            .filter(|b| b.kind == BodyKind::Static)
            .filter_map(|b| match b.shape {
                Shape::Rect { half_extents } => Some((b.position, half_extents)),
                Shape::Circle { .. } => None,
            })
            .collect();

        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            body.position += (body.velocity + body.knockback) * dt;
            body.knockback *= (1.0 - KNOCKBACK_DECAY * dt).max(0.0);
            if body.knockback.length() < KNOCKBACK_EPSILON {
                body.knockback = Vec2::ZERO;
            }

            let Shape::Circle { radius } = body.shape else {
                continue;
            };
            for (center, half) in &statics {
                if let Some(pushed) = push_circle_out_of_rect(body.position, radius, *center, *half)
                {
                    body.position = pushed;
                }
            }
        }
    }

    fn sweep_sensors(&mut self, dt: f32) {
        let targets: Vec<(BodyHandle, Vec2, Shape)> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.kind != BodyKind::Sensor)
            .map(|(handle, b)| (*handle, b.position, b.shape))
            .collect();

        for (handle, body) in self.bodies.iter_mut() {
            if body.kind != BodyKind::Sensor {
                continue;
            }
            let start = body.position;
            let end = start + body.velocity * dt;
            let own_radius = match body.shape {
                Shape::Circle { radius } => radius,
                Shape::Rect { half_extents } => half_extents.max_element(),
            };

            let mut hits: Vec<(f32, BodyHandle)> = targets
                .iter()
                .filter_map(|(other, position, shape)| {
                    let t = match shape {
                        Shape::Circle { radius } => {
                            segment_circle_enter_t(start, end, *position, radius + own_radius)
                        }
                        Shape::Rect { half_extents } => {
                            let grown = *half_extents + Vec2::splat(own_radius);
                            segment_aabb_enter_t(start, end, *position - grown, *position + grown)
                        }
                    }?;
                    Some((t, *other))
                })
                .collect();
            hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for (t, other) in hits {
                self.contacts.push(Contact {
                    a: *handle,
                    b: other,
                    point: start.lerp(end, t),
                });
            }
            body.position = end;
        }
    }
}

impl PhysicsWorld for ArcadePhysics {
    fn create_body(&mut self, entity: EntityId, desc: BodyDesc) -> BodyHandle {
        self.next_handle += 1;
        let handle = BodyHandle(self.next_handle);
        self.bodies.insert(
            handle,
            Body {
                entity,
                position: desc.position,
                velocity: desc.velocity,
                knockback: Vec2::ZERO,
                shape: desc.shape,
                kind: desc.kind,
            },
        );
        self.by_entity.insert(entity, handle);
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.remove(&handle) {
            if self.by_entity.get(&body.entity) == Some(&handle) {
                self.by_entity.remove(&body.entity);
            }
        }
    }

    fn entity_of(&self, handle: BodyHandle) -> Option<EntityId> {
        self.bodies.get(&handle).map(|b| b.entity)
    }

    fn body_of(&self, entity: EntityId) -> Option<BodyHandle> {
        self.by_entity.get(&entity).copied()
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.position)
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.velocity + b.knockback)
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = velocity;
            body.knockback = Vec2::ZERO;
        }
    }

    fn drive(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = velocity;
        }
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if body.kind == BodyKind::Dynamic {
                body.knockback += impulse;
            }
        }
    }

    fn step(&mut self, dt: f32) {
        self.integrate_dynamic(dt);
        self.sweep_sensors(dt);
    }

    fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }
}

/// Parametric `t` in `[0, 1]` where segment `[p0, p1]` first touches the circle; `0` when
/// it starts inside.
fn segment_circle_enter_t(p0: Vec2, p1: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let d = p1 - p0;
    let f = p0 - center;
    let c = f.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let a = d.length_squared();
    if a <= 1e-12 {
        return None;
    }
    let b = 2.0 * f.dot(d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Parametric `t` at which segment `[p0, p1]` first enters the box; `None` when it misses.
fn segment_aabb_enter_t(p0: Vec2, p1: Vec2, min: Vec2, max: Vec2) -> Option<f32> {
    let d = p1 - p0;
    let mut tmin = 0.0f32;
    let mut tmax = 1.0f32;
    for i in 0..2 {
        let s = p0[i];
        let dir = d[i];
        if dir.abs() < 1e-6 {
            if s < min[i] || s > max[i] {
                return None;
            }
        } else {
            let inv = 1.0 / dir;
            let mut t0 = (min[i] - s) * inv;
            let mut t1 = (max[i] - s) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmin > tmax {
                return None;
            }
        }
    }
    Some(tmin)
}

/// Moves a circle out of an overlapping rectangle along the shallowest axis.
fn push_circle_out_of_rect(center: Vec2, radius: f32, rect: Vec2, half: Vec2) -> Option<Vec2> {
    let nearest = center.clamp(rect - half, rect + half);
    let offset = center - nearest;
    let distance = offset.length();
    if distance >= radius {
        return None;
    }
    if distance > 1e-4 {
        return Some(nearest + offset / distance * radius);
    }

    // Centre inside the rectangle.
    let local = center - rect;
    let pen_x = half.x - local.x.abs() + radius;
    let pen_y = half.y - local.y.abs() + radius;
    if pen_x < pen_y {
        let sign = if local.x < 0.0 { -1.0 } else { 1.0 };
        Some(center + Vec2::new(sign * pen_x, 0.0))
    } else {
        let sign = if local.y < 0.0 { -1.0 } else { 1.0 };
        Some(center + Vec2::new(0.0, sign * pen_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(position: Vec2, velocity: Vec2, radius: f32, kind: BodyKind) -> BodyDesc {
        BodyDesc {
            position,
            velocity,
            shape: Shape::Circle { radius },
            kind,
        }
    }

    #[test]
    fn when_sensor_crosses_a_circle_then_one_contact_is_reported_at_entry() {
        let mut world = ArcadePhysics::new();
        let arrow = world.create_body(
            EntityId(1),
            circle(Vec2::ZERO, Vec2::new(600.0, 0.0), 4.0, BodyKind::Sensor),
        );
        let target = world.create_body(
            EntityId(2),
            circle(Vec2::new(5.0, 0.0), Vec2::ZERO, 16.0, BodyKind::Dynamic),
        );

        world.step(1.0 / 60.0);
        let contacts = world.drain_contacts();
        assert_eq!(contacts.len(), 1);
        assert_eq!((contacts[0].a, contacts[0].b), (arrow, target));
        assert!(world.drain_contacts().is_empty());
    }

    #[test]
    fn when_fast_sensor_passes_a_thin_block_then_the_sweep_still_hits_it() {
        let mut world = ArcadePhysics::new();
        world.create_body(
            EntityId(1),
            circle(Vec2::ZERO, Vec2::new(6000.0, 0.0), 2.0, BodyKind::Sensor),
        );
        world.create_body(
            EntityId(2),
            BodyDesc {
                position: Vec2::new(50.0, 0.0),
                velocity: Vec2::ZERO,
                shape: Shape::Rect {
                    half_extents: Vec2::new(2.0, 20.0),
                },
                kind: BodyKind::Static,
            },
        );

        world.step(1.0 / 60.0);
        let contacts = world.drain_contacts();
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].point.x - 46.0).abs() < 1e-3);
    }

    #[test]
    fn when_dynamic_body_walks_into_a_block_then_it_is_pushed_back_out() {
        let mut world = ArcadePhysics::new();
        let player = world.create_body(
            EntityId(1),
            circle(Vec2::new(0.0, 0.0), Vec2::new(600.0, 0.0), 16.0, BodyKind::Dynamic),
        );
        world.create_body(
            EntityId(2),
            BodyDesc {
                position: Vec2::new(40.0, 0.0),
                velocity: Vec2::ZERO,
                shape: Shape::Rect {
                    half_extents: Vec2::splat(20.0),
                },
                kind: BodyKind::Static,
            },
        );

        world.step(1.0 / 60.0);
        let position = world.position(player).expect("player body");
        assert!(position.x <= 4.0 + 1e-3);
    }

    #[test]
    fn when_velocity_is_set_then_knockback_is_cleared() {
        let mut world = ArcadePhysics::new();
        let body = world.create_body(
            EntityId(1),
            circle(Vec2::ZERO, Vec2::ZERO, 16.0, BodyKind::Dynamic),
        );
        world.apply_impulse(body, Vec2::new(300.0, 0.0));
        world.drive(body, Vec2::new(0.0, 10.0));
        assert_eq!(world.velocity(body), Some(Vec2::new(300.0, 10.0)));

        world.set_velocity(body, Vec2::ZERO);
        assert_eq!(world.velocity(body), Some(Vec2::ZERO));
    }

    #[test]
    fn when_body_is_removed_then_side_table_forgets_it() {
        let mut world = ArcadePhysics::new();
        let body = world.create_body(
            EntityId(7),
            circle(Vec2::ZERO, Vec2::ZERO, 1.0, BodyKind::Sensor),
        );
        assert_eq!(world.entity_of(body), Some(EntityId(7)));
        world.remove_body(body);
        world.remove_body(body);
        assert_eq!(world.entity_of(body), None);
        assert_eq!(world.body_of(EntityId(7)), None);
        assert!(world.is_empty());
    }
}

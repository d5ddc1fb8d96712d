use bevy::prelude::*;

const EPSILON: f32 = 1e-6;

/// Collision volumes, centred on the owning entity's translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    /// Axis-aligned box.
    Cuboid { half_extents: Vec3 },
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Blocks hook sweeps and traces. Non-blocking colliders only overlap.
    pub blocking: bool,
}

impl Collider {
    pub fn blocking(shape: ColliderShape) -> Self {
        Self { shape, blocking: true }
    }

    pub fn overlap_only(shape: ColliderShape) -> Self {
        Self {
            shape,
            blocking: false,
        }
    }
}

/// Upright (Y axis) capsule around a character's translation.
/// `half_height` includes the hemispherical caps.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub radius: f32,
    pub half_height: f32,
}

impl Capsule {
    /// Degenerate capsule used for line traces.
    pub const POINT: Capsule = Capsule {
        radius: 0.0,
        half_height: 0.0,
    };

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            radius: self.radius * factor,
            half_height: self.half_height * factor,
        }
    }

    /// Half length of the inner segment joining the cap centres.
    pub fn segment_half(&self) -> f32 {
        (self.half_height - self.radius).max(0.0)
    }

    /// Gap between this capsule at `center` and `shape` at `shape_center`.
    /// Zero or negative means the two overlap.
    pub fn separation(&self, center: Vec3, shape: ColliderShape, shape_center: Vec3) -> f32 {
        let d = shape_center - center;
        let s = self.segment_half();
        match shape {
            ColliderShape::Sphere { radius } => {
                let dy = d.y - d.y.clamp(-s, s);
                Vec3::new(d.x, dy, d.z).length() - self.radius - radius
            }
            ColliderShape::Cuboid { half_extents } => {
                let gap = Vec3::new(
                    (d.x.abs() - half_extents.x).max(0.0),
                    (d.y.abs() - half_extents.y - s).max(0.0),
                    (d.z.abs() - half_extents.z).max(0.0),
                );
                gap.length() - self.radius
            }
        }
    }

    pub fn overlaps(&self, center: Vec3, shape: ColliderShape, shape_center: Vec3) -> bool {
        self.separation(center, shape, shape_center) <= 0.0
    }

    /// Distance along `dir` (unit) at which this capsule, swept from `from`,
    /// first touches `shape`. Shapes already overlapping at `from` are not hits.
    fn sweep_distance(
        &self,
        from: Vec3,
        dir: Vec3,
        shape: ColliderShape,
        shape_center: Vec3,
    ) -> Option<f32> {
        if self.overlaps(from, shape, shape_center) {
            return None;
        }
        let s = self.segment_half();
        match shape {
            ColliderShape::Sphere { radius } => {
                // Swap roles: a point moving against a capsule centred on the sphere.
                let pa = shape_center - Vec3::Y * s;
                let pb = shape_center + Vec3::Y * s;
                ray_capsule(from, dir, pa, pb, self.radius + radius)
            }
            ColliderShape::Cuboid { half_extents } => {
                // Rounded box approximated by its bounds; conservative at the edges.
                let grown = half_extents + Vec3::new(self.radius, s + self.radius, self.radius);
                ray_aabb(from, dir, shape_center - grown, shape_center + grown)
            }
        }
    }
}

/// First blocking contact of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub entity: Entity,
    /// Centre of the swept shape at the moment of contact.
    pub location: Vec3,
    /// Distance travelled from the sweep start.
    pub distance: f32,
}

/// Blocking geometry snapshot for one tick of queries.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    entries: Vec<(Entity, Vec3, ColliderShape)>,
}

impl ObstacleSet {
    /// Collect the blocking colliders from `(entity, centre, collider)` triples.
    pub fn blocking(colliders: impl IntoIterator<Item = (Entity, Vec3, Collider)>) -> Self {
        Self {
            entries: colliders
                .into_iter()
                .filter(|(_, _, collider)| collider.blocking)
                .map(|(entity, center, collider)| (entity, center, collider.shape))
                .collect(),
        }
    }

    pub fn push(&mut self, entity: Entity, center: Vec3, shape: ColliderShape) {
        self.entries.push((entity, center, shape));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep `capsule` from `from` to `to`, returning the nearest blocking hit.
    pub fn sweep(&self, from: Vec3, to: Vec3, capsule: Capsule, ignore: &[Entity]) -> Option<SweepHit> {
        let delta = to - from;
        let length = delta.length();
        if length <= EPSILON {
            return None;
        }
        let dir = delta / length;

        self.entries
            .iter()
            .filter(|(entity, _, _)| !ignore.contains(entity))
            .filter_map(|&(entity, center, shape)| {
                capsule
                    .sweep_distance(from, dir, shape, center)
                    .filter(|&t| t <= length)
                    .map(|t| SweepHit {
                        entity,
                        location: from + dir * t,
                        distance: t,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Line trace from `from` to `to`.
    pub fn line_trace(&self, from: Vec3, to: Vec3, ignore: &[Entity]) -> Option<SweepHit> {
        self.sweep(from, to, Capsule::POINT, ignore)
    }
}

fn ray_sphere(ro: Vec3, rd: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ro - center;
    let b = oc.dot(rd);
    let c = oc.dot(oc) - radius * radius;
    let h = b * b - c;
    if h < 0.0 {
        return None;
    }
    let t = -b - h.sqrt();
    (t >= 0.0).then_some(t)
}

/// Entry distance of a ray (unit `rd`, origin outside) into the capsule `pa`-`pb`.
fn ray_capsule(ro: Vec3, rd: Vec3, pa: Vec3, pb: Vec3, radius: f32) -> Option<f32> {
    let ba = pb - pa;
    let oa = ro - pa;
    let baba = ba.dot(ba);
    let bard = ba.dot(rd);
    let baoa = ba.dot(oa);
    let a = baba - bard * bard;

    if baba > EPSILON && a > EPSILON {
        let rdoa = rd.dot(oa);
        let oaoa = oa.dot(oa);
        let b = baba * rdoa - baoa * bard;
        let c = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = b * b - a * c;
        if h < 0.0 {
            return None;
        }
        let t = (-b - h.sqrt()) / a;
        let y = baoa + t * bard;
        if y > 0.0 && y < baba {
            return (t >= 0.0).then_some(t);
        }
    }

    // Entry through one of the caps.
    match (ray_sphere(ro, rd, pa, radius), ray_sphere(ro, rd, pb, radius)) {
        (Some(t0), Some(t1)) => Some(t0.min(t1)),
        (t0, t1) => t0.or(t1),
    }
}

fn ray_aabb(ro: Vec3, rd: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    for axis in 0..3 {
        let o = ro[axis];
        let d = rd[axis];
        if d.abs() < EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let t1 = (min[axis] - o) * inv;
        let t2 = (max[axis] - o) * inv;
        t_enter = t_enter.max(t1.min(t2));
        t_exit = t_exit.min(t1.max(t2));
        if t_enter > t_exit {
            return None;
        }
    }
    (t_enter >= 0.0).then_some(t_enter)
}

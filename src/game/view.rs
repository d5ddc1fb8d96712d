use bevy::prelude::*;

/// The owner's active view, used only for on-screen checks of hook anchors.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub clip_from_world: Mat4,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

impl ViewProjection {
    const NEAR: f32 = 10.0;
    const FAR: f32 = 100_000.0;

    /// Perspective view from `eye` toward `look_at`, Y up.
    pub fn looking_at(eye: Vec3, look_at: Vec3, fov_y: f32, viewport: Vec2) -> Self {
        let aspect = if viewport.y > 0.0 { viewport.x / viewport.y } else { 1.0 };
        let view = Mat4::look_at_rh(eye, look_at, Vec3::Y);
        let projection = Mat4::perspective_rh(fov_y, aspect, Self::NEAR, Self::FAR);
        Self {
            clip_from_world: projection * view,
            viewport,
        }
    }

    /// Pixel position of `world` with the origin at the top-left corner,
    /// or `None` when the point is behind the camera.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.clip_from_world * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.viewport.x,
            (1.0 - (ndc.y * 0.5 + 0.5)) * self.viewport.y,
        ))
    }

    /// Strictly inside the viewport. Projections that land on the origin
    /// corner (x or y below one pixel) are rejected as behind-camera artifacts.
    pub fn is_on_screen(&self, world: Vec3) -> bool {
        let Some(screen) = self.project(world) else {
            return false;
        };
        if screen.x < 1.0 || screen.y < 1.0 {
            return false;
        }
        screen.x > 0.0 && screen.x < self.viewport.x && screen.y > 0.0 && screen.y < self.viewport.y
    }
}

/// Keeps a `ViewProjection` trailing its entity.
#[derive(Component, Debug, Clone, Copy)]
pub struct ChaseCamera {
    /// Eye position in the entity's local frame (+Z is behind).
    pub offset: Vec3,
    /// Look-at point relative to the entity, along its forward vector.
    pub look_ahead: f32,
    pub fov_y: f32,
    pub viewport: Vec2,
}

impl Default for ChaseCamera {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 150.0, 900.0),
            look_ahead: 200.0,
            fov_y: 70f32.to_radians(),
            viewport: Vec2::new(1920.0, 1080.0),
        }
    }
}

impl ChaseCamera {
    pub fn view_from(&self, transform: &Transform) -> ViewProjection {
        let eye = transform.translation + transform.rotation * self.offset;
        let look_at = transform.translation + transform.forward().as_vec3() * self.look_ahead;
        ViewProjection::looking_at(eye, look_at, self.fov_y, self.viewport)
    }
}

/// Rebuild chase views from their entity's current transform.
pub fn update_chase_views(mut query: Query<(&Transform, &ChaseCamera, &mut ViewProjection)>) {
    for (transform, chase, mut view) in &mut query {
        *view = chase.view_from(transform);
    }
}

//! Perspective camera, orbit controls and the camera rig.
//!
//! The rig layers three motions on one camera, applied in this order each
//! tick: the slow decorative orbit around the origin, the intro zoom and
//! selection framing tweens, then the orbit controls (damping and distance
//! limits), which always have the last word.

use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraSettings;
use crate::picking::Ray;
use crate::tween::{Easing, Tween};

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            position: Vec3::from_array(settings.start_position),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: settings.fov,
            near: settings.near,
            far: settings.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// World-space ray through a point in normalized device coordinates
    /// (x right, y up, both in [-1, 1]).
    pub fn screen_ray(&self, ndc: Vec2, aspect: f32) -> Ray {
        let inverse = self.view_projection_matrix(aspect).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }

    /// Normalized device coordinates of a world point, or `None` behind the camera.
    pub fn project(&self, world: Vec3, aspect: f32) -> Option<Vec3> {
        let clip = self.view_projection_matrix(aspect) * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }
}

/// Where the camera goes to frame a body.
///
/// The horizontal offsets follow the sign of the body's coordinates so the
/// camera always stands on the outer side.
pub fn framing_point(body: Vec3, offset: [f32; 3]) -> Vec3 {
    let sx = if body.x >= 0.0 { 1.0 } else { -1.0 };
    let sz = if body.z >= 0.0 { 1.0 } else { -1.0 };
    Vec3::new(body.x + sx * offset[0], body.y + offset[1], body.z + sz * offset[2])
}

/// Damped orbit controls around a target point.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Fraction of pending motion kept per 60 Hz frame.
    pub damping: f32,
    pub enable_zoom: bool,
    /// Pending (azimuth, polar) rotation in radians.
    rotate_delta: Vec2,
    /// Pending log-scale zoom; positive moves closer.
    zoom_delta: f32,
}

impl OrbitControls {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            damping: settings.damping.clamp(0.0, 0.999),
            enable_zoom: true,
            rotate_delta: Vec2::ZERO,
            zoom_delta: 0.0,
        }
    }

    pub fn rotate(&mut self, azimuth: f32, polar: f32) {
        self.rotate_delta += Vec2::new(azimuth, polar);
    }

    pub fn zoom(&mut self, amount: f32) {
        if self.enable_zoom {
            self.zoom_delta += amount;
        }
    }

    pub fn is_settling(&self) -> bool {
        self.rotate_delta.length_squared() > 1e-10 || self.zoom_delta.abs() > 1e-5
    }

    /// Apply part of the pending motion and clamp the distance to the target.
    pub fn update(&mut self, camera: &mut Camera, dt: f32) {
        let frames = (dt * 60.0).max(0.0);
        let keep = self.damping.powf(frames);
        let apply = 1.0 - keep;

        let offset = camera.position - self.target;
        let mut radius = offset.length();
        if radius > 1e-6 {
            let mut azimuth = offset.x.atan2(offset.z);
            let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

            azimuth += self.rotate_delta.x * apply;
            polar = (polar + self.rotate_delta.y * apply).clamp(1e-3, std::f32::consts::PI - 1e-3);
            radius *= (-self.zoom_delta * apply).exp();
            radius = radius.clamp(self.min_distance, self.max_distance);

            camera.position = self.target
                + Vec3::new(
                    radius * polar.sin() * azimuth.sin(),
                    radius * polar.cos(),
                    radius * polar.sin() * azimuth.cos(),
                );
        }

        self.rotate_delta *= keep;
        self.zoom_delta *= keep;
        camera.target = self.target;
    }
}

/// Camera plus everything that moves it.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub camera: Camera,
    pub controls: OrbitControls,
    orbit_rate: f32,
    intro: Option<Tween<Vec3>>,
    position_tween: Option<Tween<Vec3>>,
    target_tween: Option<Tween<Vec3>>,
}

impl CameraRig {
    pub fn new(settings: &CameraSettings) -> Self {
        let camera = Camera::new(settings);
        let mut intro = Tween::new(camera.position);
        intro.retarget(Vec3::from_array(settings.intro_position), settings.intro_secs, Easing::Linear);
        Self {
            camera,
            controls: OrbitControls::new(settings),
            orbit_rate: settings.orbit_rate,
            intro: Some(intro),
            position_tween: None,
            target_tween: None,
        }
    }

    /// Decorative rotation of the camera position around the world origin.
    pub fn orbit(&mut self, dt: f32) {
        let angle = self.orbit_rate * dt;
        let (sin, cos) = angle.sin_cos();
        let p = self.camera.position;
        self.camera.position = Vec3::new(p.x * cos - p.z * sin, p.y, p.z * cos + p.x * sin);
    }

    /// Linear zoom from the start position; drives height and depth only.
    pub fn advance_intro(&mut self, dt: f32) {
        if let Some(intro) = self.intro.as_mut() {
            let v = intro.advance(dt);
            self.camera.position.y = v.y;
            self.camera.position.z = v.z;
            if !intro.is_active() {
                self.intro = None;
            }
        }
    }

    /// Start (or retarget) the framing tweens from the current camera state.
    pub fn frame(&mut self, position: Vec3, target: Vec3, duration: f32) {
        // Framing takes over from the intro
        self.intro = None;

        let mut position_tween = Tween::new(self.camera.position);
        position_tween.retarget(position, duration, Easing::QuadraticOut);
        let mut target_tween = Tween::new(self.controls.target);
        target_tween.retarget(target, duration, Easing::QuadraticOut);

        self.position_tween = Some(position_tween);
        self.target_tween = Some(target_tween);
    }

    pub fn advance_tweens(&mut self, dt: f32) {
        if let Some(tween) = self.position_tween.as_mut() {
            self.camera.position = tween.advance(dt);
            if !tween.is_active() {
                self.position_tween = None;
            }
        }
        if let Some(tween) = self.target_tween.as_mut() {
            self.controls.target = tween.advance(dt);
            self.camera.target = self.controls.target;
            if !tween.is_active() {
                self.target_tween = None;
            }
        }
    }

    pub fn update_controls(&mut self, dt: f32) {
        self.controls.update(&mut self.camera, dt);
    }

    pub fn is_framing(&self) -> bool {
        self.position_tween.is_some() || self.target_tween.is_some()
    }

    pub fn in_intro(&self) -> bool {
        self.intro.is_some()
    }
}

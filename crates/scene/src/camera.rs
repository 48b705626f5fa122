use glam::{Mat4, Vec3};

/// Orbit camera with damped rotation and zoom around a target point.
///
/// Pointer input accumulates velocity; [`OrbitCamera::update`] integrates it once
/// per frame, before the render sequence reads the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Angle around the Y axis, radians.
    pub azimuth: f32,
    /// Angle from the +Y axis, radians.
    pub polar: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    /// Fraction of velocity kept per 1/60 s.
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    angular_velocity: (f32, f32),
    zoom_velocity: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 6.0,
            azimuth: 0.0,
            polar: std::f32::consts::FRAC_PI_2,
            fov: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            damping: 0.9,
            min_distance: 1.5,
            max_distance: 40.0,
            angular_velocity: (0.0, 0.0),
            zoom_velocity: 0.0,
        }
    }
}

const MIN_POLAR: f32 = 0.01;
const MAX_POLAR: f32 = std::f32::consts::PI - 0.01;

impl OrbitCamera {
    /// Camera looking at the origin from `position`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().max(1e-3);
        Self {
            target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / distance).clamp(-1.0, 1.0).acos(),
            ..Self::default()
        }
    }

    pub fn with_fov_degrees(mut self, fov: f32) -> Self {
        self.fov = fov.to_radians();
        self
    }

    pub fn position(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + self.distance
                * Vec3::new(
                    sin_polar * self.azimuth.sin(),
                    self.polar.cos(),
                    sin_polar * self.azimuth.cos(),
                )
    }

    /// Feed a pointer drag in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.angular_velocity.0 -= dx * self.rotate_speed;
        self.angular_velocity.1 -= dy * self.rotate_speed;
    }

    /// Feed a wheel delta; positive zooms in.
    pub fn zoom(&mut self, delta: f32) {
        self.zoom_velocity -= delta * self.zoom_speed;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Integrate pending motion. Velocities decay by `damping` every 1/60 s.
    pub fn update(&mut self, dt: f32) {
        let (d_azimuth, d_polar) = self.angular_velocity;
        self.azimuth += d_azimuth;
        self.polar = (self.polar + d_polar).clamp(MIN_POLAR, MAX_POLAR);
        self.distance = (self.distance * (1.0 + self.zoom_velocity))
            .clamp(self.min_distance, self.max_distance);

        let keep = self.damping.clamp(0.0, 1.0).powf(dt.max(0.0) * 60.0);
        self.angular_velocity = (d_azimuth * keep, d_polar * keep);
        self.zoom_velocity *= keep;
        if self.angular_velocity.0.abs() < 1e-6 && self.angular_velocity.1.abs() < 1e-6 {
            self.angular_velocity = (0.0, 0.0);
        }
        if self.zoom_velocity.abs() < 1e-6 {
            self.zoom_velocity = 0.0;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.angular_velocity == (0.0, 0.0) && self.zoom_velocity == 0.0
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = OrbitCamera::default();
        assert!((cam.position() - Vec3::new(0.0, 0.0, 6.0)).length() < 1e-4);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn looking_at_recovers_position() {
        let pos = Vec3::new(3.0, 2.0, 4.0);
        let cam = OrbitCamera::looking_at(pos, Vec3::ZERO);
        assert!((cam.position() - pos).length() < 1e-4);
    }

    #[test]
    fn rotation_is_damped() {
        let mut cam = OrbitCamera::default();
        cam.rotate(100.0, 0.0);
        cam.update(1.0 / 60.0);
        let first = cam.azimuth;
        cam.update(1.0 / 60.0);
        let second = cam.azimuth - first;
        assert!(first < 0.0);
        assert!(second.abs() < first.abs());
        for _ in 0..600 {
            cam.update(1.0 / 60.0);
        }
        assert!(cam.is_settled());
    }

    #[test]
    fn polar_and_distance_are_clamped() {
        let mut cam = OrbitCamera::default();
        cam.rotate(0.0, -1.0e6);
        cam.zoom(-1.0e3);
        cam.update(1.0 / 60.0);
        assert!(cam.polar <= MAX_POLAR);
        assert!(cam.distance <= cam.max_distance);
        assert!(!cam.view_matrix().col(0).x.is_nan());
    }

    #[test]
    fn aspect_rejects_garbage() {
        let mut cam = OrbitCamera::default();
        cam.set_aspect(800.0 / 600.0);
        cam.set_aspect(f32::NAN);
        cam.set_aspect(0.0);
        assert!((cam.aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}

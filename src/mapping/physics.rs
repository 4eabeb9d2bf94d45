//! Small physics layer: a radial spring-damper and a friction rotor

use std::f32::consts::TAU;

/// Longest integration step; larger frames are split
const MAX_SUBSTEP: f32 = 1.0 / 120.0;

/// Hard cap on substeps per frame
const MAX_SUBSTEPS: usize = 16;

/// 1-D damped spring pulling an offset back to zero
///
/// `x'' = -k·x - c·x' + f`, integrated with semi-implicit Euler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    /// Current offset
    pub offset: f32,
    /// Current velocity
    pub velocity: f32,
    stiffness: f32,
    damping: f32,
}

impl Spring {
    /// Create a spring at rest
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Self {
            offset: 0.0,
            velocity: 0.0,
            stiffness: stiffness.max(0.0),
            damping: damping.max(0.0),
        }
    }

    /// Spring constant `k`
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Damping coefficient `c`
    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Instantaneous velocity impulse
    pub fn kick(&mut self, impulse: f32) {
        self.velocity += impulse;
    }

    /// Integrate `dt` seconds under an external force
    pub fn step(&mut self, dt: f32, force: f32) {
        if dt <= 0.0 {
            return;
        }
        let steps = ((dt / MAX_SUBSTEP).ceil() as usize).clamp(1, MAX_SUBSTEPS);
        let h = dt / steps as f32;
        for _ in 0..steps {
            let accel = -self.stiffness * self.offset - self.damping * self.velocity + force;
            self.velocity += accel * h;
            self.offset += self.velocity * h;
        }
    }

    /// Back to rest
    pub fn reset(&mut self) {
        self.offset = 0.0;
        self.velocity = 0.0;
    }
}

/// Angle driven by impulses and slowed by exponential friction
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    /// Angle in radians, wrapped to [0, 2π)
    pub angle: f32,
    /// Angular velocity in radians per second
    pub velocity: f32,
}

impl Rotation {
    /// Add angular velocity
    pub fn impulse(&mut self, amount: f32) {
        self.velocity += amount;
    }

    /// `velocity *= exp(-friction·dt); angle += velocity·dt`
    pub fn step(&mut self, dt: f32, friction: f32) {
        self.velocity *= (-friction.max(0.0) * dt).exp();
        self.angle = (self.angle + self.velocity * dt).rem_euclid(TAU);
    }
}

/// Exponential approach factor `1 - exp(-rate·dt)`
#[inline]
pub fn snap_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Move `current` toward `target` by an exponential snap
#[inline]
pub fn snap(current: &mut f32, target: f32, factor: f32) {
    *current += (target - *current) * factor;
}

/// Wrap an angle difference into (-π, π]
#[inline]
pub fn wrap_angle(delta: f32) -> f32 {
    let wrapped = (delta + std::f32::consts::PI).rem_euclid(TAU) - std::f32::consts::PI;
    if wrapped <= -std::f32::consts::PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Snap an angle toward a target along the shorter arc, result in [0, 2π)
#[inline]
pub fn snap_angle(current: &mut f32, target: f32, factor: f32) {
    *current = (*current + wrap_angle(target - *current) * factor).rem_euclid(TAU);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_spring_settles() {
        let mut spring = Spring::new(8.0, 2.5);
        spring.kick(2.0);
        // Envelope decays as exp(-c/2·t)
        for _ in 0..600 {
            spring.step(1.0 / 60.0, 0.0);
        }
        assert!(spring.offset.abs() < 1e-3);
        assert!(spring.velocity.abs() < 1e-3);
    }

    #[test]
    fn test_spring_constant_force_equilibrium() {
        let mut spring = Spring::new(8.0, 2.5);
        for _ in 0..1200 {
            spring.step(1.0 / 60.0, 4.0);
        }
        assert!((spring.offset - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_large_dt_is_substepped() {
        let mut a = Spring::new(8.0, 2.5);
        let mut b = a;
        a.kick(1.0);
        b.kick(1.0);
        a.step(0.1, 0.0);
        for _ in 0..12 {
            b.step(0.1 / 12.0, 0.0);
        }
        assert!((a.offset - b.offset).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_friction() {
        let mut rot = Rotation::default();
        rot.impulse(1.0);
        rot.step(0.5, 2.0);
        assert!((rot.velocity - (-1.0f32).exp()).abs() < 1e-6);
        assert!(rot.angle > 0.0);
    }

    #[test]
    fn test_shortest_arc() {
        assert!((wrap_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-5);
        let mut angle = 0.1;
        snap_angle(&mut angle, TAU - 0.1, 0.5);
        assert!((angle - 0.0).abs() < 1e-5 || (angle - TAU).abs() < 1e-5);
    }

    #[test]
    fn test_snap_factor() {
        // 8/s gives ~90% in 0.3 s
        let f = snap_factor(8.0, 0.3);
        assert!(f > 0.9 && f < 0.92);
    }
}

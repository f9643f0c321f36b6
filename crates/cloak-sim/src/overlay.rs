//! Debug overlay: raw physics shapes plus each actor's debug figure.

use cloak_core::render::{Color, Renderer};
use glam::Vec2;

use crate::physics::{PhysicsWorld, ShapeOutline};
use crate::world::World;

/// Vertices used to approximate a circle outline.
pub const CIRCLE_SEGMENTS: usize = 16;

/// `count` points evenly spaced on a circle, starting at `angle`.
pub fn circle_vertices(center: Vec2, radius: f32, angle: f32, count: usize) -> Vec<Vec2> {
    (0..count)
        .map(|i| {
            let theta = angle + std::f32::consts::TAU * i as f32 / count as f32;
            center + radius * Vec2::from_angle(theta)
        })
        .collect()
}

/// Outline every fixture in the physics world. Circles get a radius line so
/// their rotation is visible.
pub fn draw_shapes(physics: &PhysicsWorld, renderer: &mut dyn Renderer) {
    renderer.set_color(Color::SHAPE_OUTLINE);
    for outline in physics.shape_outlines() {
        match outline {
            ShapeOutline::Polygon(points) => renderer.line_loop(&points),
            ShapeOutline::Circle {
                center,
                radius,
                angle,
            } => {
                renderer.line_loop(&circle_vertices(center, radius, angle, CIRCLE_SEGMENTS));
                renderer.line(center, center + radius * Vec2::from_angle(angle));
            },
        }
    }
}

impl World {
    /// Shapes first, then every registered actor's debug figure, drawing or not.
    pub fn debug_draw(&self, renderer: &mut dyn Renderer) {
        draw_shapes(&self.physics, renderer);
        for (_, actor) in self.registry.iter() {
            actor.debug_draw(&self.physics, renderer);
        }
    }
}

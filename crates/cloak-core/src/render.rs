//! Immediate-mode drawing interface consumed by the rendering collaborator.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Outline color of raw physics shapes.
    pub const SHAPE_OUTLINE: Color = Color::rgb(0, 127, 0);
    pub const THIEF: Color = Color::rgb(0, 127, 255);
    pub const GUARD: Color = Color::rgb(255, 127, 0);
    pub const DEFAULT_ACTOR: Color = Color::rgb(0, 255, 0);
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT_ACTOR
    }
}

/// Drawing primitives the simulation emits. Coordinates are in the space of
/// whoever implements the trait; see [`Projected`] for the camera transform.
pub trait Renderer {
    fn set_color(&mut self, color: Color);
    fn fill_quad(&mut self, corners: [Vec2; 4]);
    fn line_loop(&mut self, points: &[Vec2]);
    fn line(&mut self, from: Vec2, to: Vec2);
}

/// View transform: the target is centered in the viewport and world units are
/// scaled uniformly by `view_height / world_view_units`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view_width: f32,
    pub view_height: f32,
    pub scale: f32,
    pub target: Vec2,
}

impl Camera {
    pub fn new(view_width: f32, view_height: f32, world_view_units: f32) -> Self {
        Self {
            view_width,
            view_height,
            scale: view_height / world_view_units,
            target: Vec2::ZERO,
        }
    }

    pub fn look_at(mut self, target: Vec2) -> Self {
        self.target = target;
        self
    }

    /// World point to screen pixels (origin bottom-left, y up).
    pub fn world_to_screen(&self, point: Vec2) -> Vec2 {
        let half_view = Vec2::new(self.view_width * 0.5, self.view_height * 0.5);
        half_view + (point - self.target) * self.scale
    }
}

/// Renderer adapter applying a [`Camera`] to every vertex before forwarding.
pub struct Projected<'a, R: Renderer + ?Sized> {
    camera: Camera,
    inner: &'a mut R,
    scratch: Vec<Vec2>,
}

impl<'a, R: Renderer + ?Sized> Projected<'a, R> {
    pub fn new(camera: Camera, inner: &'a mut R) -> Self {
        Self {
            camera,
            inner,
            scratch: Vec::new(),
        }
    }
}

impl<R: Renderer + ?Sized> Renderer for Projected<'_, R> {
    fn set_color(&mut self, color: Color) {
        self.inner.set_color(color);
    }

    fn fill_quad(&mut self, corners: [Vec2; 4]) {
        self.inner
            .fill_quad(corners.map(|c| self.camera.world_to_screen(c)));
    }

    fn line_loop(&mut self, points: &[Vec2]) {
        self.scratch.clear();
        self.scratch
            .extend(points.iter().map(|&p| self.camera.world_to_screen(p)));
        self.inner.line_loop(&self.scratch);
    }

    fn line(&mut self, from: Vec2, to: Vec2) {
        self.inner.line(
            self.camera.world_to_screen(from),
            self.camera.world_to_screen(to),
        );
    }
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Color(Color),
    Quad([Vec2; 4]),
    LineLoop(Vec<Vec2>),
    Line(Vec2, Vec2),
}

/// Renderer that records every call, for headless runs and tests.
#[derive(Debug, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn quads(&self) -> impl Iterator<Item = &[Vec2; 4]> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Quad(q) => Some(q),
            _ => None,
        })
    }

    pub fn line_loops(&self) -> impl Iterator<Item = &[Vec2]> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::LineLoop(points) => Some(points.as_slice()),
            _ => None,
        })
    }
}

impl Renderer for DrawList {
    fn set_color(&mut self, color: Color) {
        self.commands.push(DrawCommand::Color(color));
    }

    fn fill_quad(&mut self, corners: [Vec2; 4]) {
        self.commands.push(DrawCommand::Quad(corners));
    }

    fn line_loop(&mut self, points: &[Vec2]) {
        self.commands.push(DrawCommand::LineLoop(points.to_vec()));
    }

    fn line(&mut self, from: Vec2, to: Vec2) {
        self.commands.push(DrawCommand::Line(from, to));
    }
}

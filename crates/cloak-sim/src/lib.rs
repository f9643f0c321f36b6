pub mod actor;
pub mod ai;
pub mod character;
pub mod config;
pub mod contact;
pub mod controls;
pub mod entity;
pub mod game;
pub mod level;
pub mod overlay;
pub mod physics;
pub mod raycast;
pub mod session;
pub mod world;

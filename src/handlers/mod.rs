// src/handlers/mod.rs

pub mod catalog;
pub mod progress;
pub mod quiz;

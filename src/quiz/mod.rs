// src/quiz/mod.rs

pub mod flow;
pub mod interpreter;
pub mod prompt;
pub mod review;
pub mod session;

pub mod algorithm;
pub mod color;
pub mod config;
pub mod diagram;
pub mod engine;
pub mod error;
pub mod flow;
pub mod geometry;
pub mod layout;
pub mod parser;
pub mod renderer;
pub mod router;
pub mod separator;
pub mod visibility;

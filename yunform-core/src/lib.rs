//! Yunform Core
//!
//! Core library for the yunform infrastructure tool: the resource model,
//! schemas, the DSL parser, and planning and execution of effects.

pub mod differ;
pub mod effect;
pub mod executor;
pub mod parser;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod wait;

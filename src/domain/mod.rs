//! Core domain types and logic.

pub mod config_validation;
pub mod context;
pub mod editor;
pub mod error;
pub mod eval;
pub mod expression;
pub mod graph;
pub mod operation;
pub mod position;
pub mod resolver;

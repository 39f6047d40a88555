//! Core domain types
//!
//! This module contains the domain structures shared by the reconciler and
//! the CLI. `state` holds the lifecycle vocabulary and the equivalence rules
//! used to damp state churn; `pipeline` holds the record that gets persisted.

pub mod pipeline;
pub mod state;

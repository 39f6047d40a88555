//! Conduit Core
//!
//! Core types and pure reconciliation logic for managing remote streaming
//! pipelines.
//!
//! This crate contains:
//! - Domain types: lifecycle states and the persisted pipeline record
//! - DTOs: wire shapes exchanged with the pipeline and cluster APIs
//! - Merge: rebuilding a complete record from a partial remote snapshot

pub mod domain;
pub mod dto;
pub mod merge;

//! Data Transfer Objects for the remote APIs
//!
//! These mirror the JSON bodies exchanged with the data-plane pipeline API
//! and the control-plane cluster API. Every optional field defaults so that
//! partial responses still decode.

pub mod cluster;
pub mod pipeline;

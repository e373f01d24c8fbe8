//! songflow - department-scoped song workflow engine
//!
//! Songs move through publishing, label, marketing and digital stages.
//! Each stage carries a checklist; transitions are permission-checked,
//! audited and announced to the next department through alerts.

pub mod alerts;
pub mod assets;
pub mod checklist;
pub mod commands;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod permissions;
pub mod validation;
pub mod workflow;

// src/filesystem/mod.rs

//! Filesystem operations for sealpack
//!
//! This module provides:
//! - Source selection: which files go into an archive and under what key
//! - Path sanitization: confining extracted entries to the destination root

pub mod path;
mod source;

pub use source::SourceSet;

//! `mailrepack`: repackage exported email metadata into MBOX archives.
//!
//! The crate loads per-account metadata files produced by a PST extractor,
//! rebuilds each message's folder hierarchy, and writes archive containers
//! under one of four packaging strategies (see [`package`]).

pub mod archive;
pub mod config;
pub mod error;
pub mod fallback;
pub mod loader;
pub mod model;
pub mod package;
pub mod report;
pub mod sanitize;
pub mod synth;

//! Structural index of UBV surveillance recordings.
//!
//! The index is derived from the textual frame dump of Ubiquiti's
//! `ubnt_ubvinfo` analyzer (or a cached copy of its output): partitions,
//! tracks, the frame table, and per-track timing and rate. Essence bytes are
//! never touched here; extraction lives in `remux-lib`.

pub mod analyzer;
pub mod clock;
pub mod error;
pub mod index;
pub mod sidecar;
pub mod track;
pub mod version;

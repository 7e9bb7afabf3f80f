//! Traffic-source convergence for fleetroll.
//!
//! Answers "is this fleet fully and exclusively healthy in this
//! traffic source" and its dual "are these instances fully absent from
//! this traffic source", blocking (by polling) until the condition
//! holds. Also computes which instances newly appeared between two
//! membership snapshots — how replacements are identified.

pub mod attachment;

pub use attachment::{newly_appeared, AttachmentTracker};

//! Superimposition engine: align two snapshots of the same project and
//! classify every entity.
//!
//! # Features
//!
//! - **Identity alignment**: entities pair up 1:1 when their keys are equal
//! - **Complete classification**: every entity of either side gets exactly one
//!   UNCHANGED, CHANGED, ADDED or REMOVED marker
//! - **Scoped patches**: CHANGED methods diff only their own line range
//! - **Parallel processing**: kinds classify concurrently, patches per marker
//!
//! # Example
//!
//! ```no_run
//! use supergraph_core::differ::{superimpose, DiffStatus, PatchOptions};
//! # let (left, right) = (supergraph_core::ProjectGraph::default(), supergraph_core::ProjectGraph::default());
//!
//! let options = PatchOptions::new("checkout/left", "checkout/right");
//! let result = superimpose(&left, &right, "release-42", Some(&options));
//! for marker in result.markers_with_status(DiffStatus::Changed) {
//!     println!("{} {}", marker.kind.as_str(), marker.key);
//! }
//! ```

pub mod comparator;
pub mod markers;
pub mod patch;

pub use comparator::{same_field, same_method, same_type, superimpose};
pub use markers::{
    Alignment, DiffMarker, DiffStatus, DiffSummary, EntityKind, LineRange, SampleEntry, Supergraph,
};
pub use patch::{attach_patches, truncate_patch, PatchOptions, DEFAULT_MAX_PATCH_CHARS};

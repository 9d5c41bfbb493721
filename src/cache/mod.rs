//! Content-addressed artifact cache
//!
//! Encoded splits are keyed by a fingerprint of the dataset name and the
//! merged encoding properties. Same request = same artifacts; any parameter
//! change = new fingerprint = fresh build.
//!
//! # Cache States
//!
//! | State | Description |
//! |-------|-------------|
//! | Miss | No artifact for the key, build required |
//! | Building | Build job in flight, later requests wait on it |
//! | Complete | All three artifacts committed, served as-is |
//! | Partial | Some artifacts on disk (interrupted run), rebuilt on next request |

pub mod coordinator;
pub mod entry;
pub mod fingerprint;
pub mod store;

pub use coordinator::BuildCoordinator;
pub use entry::{format_bytes, CacheEntry, CacheState};
pub use fingerprint::Fingerprint;
pub use store::{ArtifactHandle, ArtifactKey, ArtifactKind, ArtifactSet, ArtifactStore};

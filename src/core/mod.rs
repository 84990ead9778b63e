//! # Core Module
//!
//! Concurrency primitives shared by the world and its background tasks.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `ProgressFlag`: The non-reentrant "working" flag guarding bulk level operations
//! - `CancelToken`: Cooperative shutdown signal checked inside long loops
//!
//! ## Usage
//! ```rust
//! use paged_voxel_world::core::{MtResource, ProgressFlag};
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let progress = ProgressFlag::new();
//! let guard = progress.try_begin().unwrap();
//! assert!(progress.try_begin().is_none());
//! drop(guard);
//! assert!(!progress.is_working());
//! ```

pub mod mt_resource;
pub mod progress;

pub use mt_resource::MtResource;
pub use progress::{CancelToken, ProgressFlag, ProgressGuard};

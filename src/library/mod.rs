//! Canonical media library state.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.curator/
//! ├── library.json              # Key -> {File, Width, Height, ...}
//! ├── actions.log               # One line per action, appended per run
//! └── recycle/                  # Soft-deleted files
//! ```
//!
//! The library itself lives wherever `File` paths point; this module only
//! tracks it.

pub mod store;
pub mod view;

pub use store::{Library, MetadataStore};
pub use view::{is_video, LibraryView, LocalView, MemoryView};

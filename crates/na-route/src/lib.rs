//! `na-route` — the shortest-path engine shared by every analysis.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`search`] | `SearchSpace` (reusable Dijkstra state), `SearchOptions`  |
//! | [`path`]   | `Path`, `shortest_path`                                   |
//!
//! # Search model
//!
//! A search runs over a [`NetworkView`](na_network::NetworkView), so overlay
//! splits and edge exclusions are honoured without touching the shared
//! network.  One `SearchSpace` is meant to be reused for many sources by one
//! thread: only the entries touched by the previous run are reset.

pub mod path;
pub mod search;


pub use path::{shortest_path, Path};
pub use search::{SearchOptions, SearchSpace};

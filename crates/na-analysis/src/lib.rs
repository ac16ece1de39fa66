//! `na-analysis` — the network analyses and the session that runs them.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                |
//! |------------------|---------------------------------------------------------|
//! | [`session`]      | `NetworkAnalysis` (network + rules + log + observer)    |
//! | [`od_matrix`]    | `od_cost_matrix`, `CostMatrixOptions`                   |
//! | [`route`]        | `route`, `k_routes`, `k_paths`, `KRoutesOptions`        |
//! | [`service_area`] | `service_area`, `ServiceAreaOptions`                    |
//! | [`frequency`]    | `route_frequencies`, `OdWeights`, `FrequencyOptions`    |
//! | [`rows`]         | result rows and the `AnalysisOutput` envelope           |
//! | [`runlog`]       | `RunRecord`, `Method`                                   |
//! | [`observer`]     | `AnalysisObserver`, `NoopObserver`, `CancelToken`       |
//!
//! # Per-call state
//!
//! Every analysis snaps its points, materialises line splits in a private
//! [`Overlay`](na_network::Overlay) and searches through a
//! [`NetworkView`](na_network::NetworkView).  The shared
//! [`Network`](na_network::Network) is never modified, so one network can
//! back any number of sessions.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Origins are processed on Rayon's thread pool (default).   |
//! | `serde`    | `Serialize`/`Deserialize` on rows, options and run log.   |
//!
//! `NetworkAnalysis::with_num_threads(Some(1))` keeps a parallel build on
//! the calling thread; rows come out the same either way.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use na_analysis::{CostMatrixOptions, NetworkAnalysis};
//! use na_core::Rules;
//!
//! let mut nwa = NetworkAnalysis::from_lines(lines, Rules::new("minutes"))?;
//! let out = nwa.od_cost_matrix(&origins, &destinations, &CostMatrixOptions::default())?;
//! for row in &out.rows {
//!     println!("{} -> {}: {:?}", row.origin, row.destination, row.cost);
//! }
//! ```

pub mod frequency;
pub mod observer;
pub mod od_matrix;
pub mod route;
pub mod rows;
pub mod runlog;
pub mod service_area;
pub mod session;

mod prepare;

#[cfg(test)]
mod tests;

pub use frequency::{FrequencyOptions, OdWeights};
pub use runlog::{Method, RunRecord};
pub use observer::{AnalysisObserver, CancelToken, NoopObserver};
pub use od_matrix::CostMatrixOptions;
pub use route::{k_paths, KRoutesOptions, WindowEdges};
pub use rows::{AnalysisOutput, CostRow, FrequencyRow, RouteRow, ServiceAreaRow};
pub use service_area::ServiceAreaOptions;
pub use session::NetworkAnalysis;

//! `na-network` — network construction, spatial indexing and snapping.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`line`]    | `LineRecord`, `LineDirection`                               |
//! | [`builder`] | `NetworkBuilder` (lines + rules → `Network`)                |
//! | [`network`] | `Network` (CSR adjacency + segment R-tree)                  |
//! | [`index`]   | `SegmentIndex` over line segments                           |
//! | [`snap`]    | `Snapper`, `Snap`, `SnapTarget`, `SnapFailure`              |
//! | [`overlay`] | `Overlay`, per-call line splits that never touch `Network`  |
//! | [`view`]    | `NetworkView`, the graph as seen by one search              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod builder;
pub mod index;
pub mod line;
pub mod network;
pub mod overlay;
pub mod snap;
pub mod view;


pub use builder::NetworkBuilder;
pub use index::SegmentIndex;
pub use line::{LineDirection, LineRecord};
pub use network::Network;
pub use overlay::{Overlay, OverlayEdge};
pub use snap::{Snap, SnapFailure, SnapTarget, Snapper};
pub use view::NetworkView;

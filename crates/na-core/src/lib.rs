//! `na-core` — foundational types for the network-analysis engine.
//!
//! This crate is a dependency of every other `na-*` crate.  It intentionally
//! has no `na-*` dependencies and few external ones (`geo` for geometry
//! primitives and `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `EdgeId`, `LineId`, `PointId`               |
//! | [`geometry`]    | polyline length, projection, substring                |
//! | [`rules`]       | `Rules`, `ConnectorCost`                              |
//! | [`error`]       | `NaError`, `NaResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and rules.           |

pub mod error;
pub mod geometry;
pub mod ids;
pub mod rules;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{NaError, NaResult};
pub use geometry::LinePosition;
pub use ids::{EdgeId, LineId, NodeId, PointId};
pub use rules::{travel_minutes, ConnectorCost, CostUnit, Rules, SpeedRule, MAX_EXPANSIONS};

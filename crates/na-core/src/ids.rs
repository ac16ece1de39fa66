//! Typed identifiers.
//!
//! Nodes, edges and lines are dense indices into the `Network` arrays;
//! points carry whatever id the caller gave them.  Wrapping each in its own
//! type keeps an `EdgeId` from ever indexing a node array.

use std::fmt;

macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// "No such id"; the inner type's `MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Position in the array this id indexes.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Id for an array position.  Builders keep arrays below the
            /// inner type's range.
            #[inline(always)]
            pub fn from_index(i: usize) -> Self {
                $name(i as $inner)
            }
        }

        impl Default for $name {
            /// `INVALID`, so an id nobody assigned never looks real.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Index of a network node.  Base nodes come first; nodes created by
    /// splitting a line for one analysis call are numbered after them.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed edge.  Overlay edges follow the base edges.
    pub struct EdgeId(u32);
}

typed_id! {
    /// Index of an input line that survived network construction.
    pub struct LineId(u32);
}

typed_id! {
    /// Caller-chosen identifier of an origin or destination point.
    pub struct PointId(u64);
}

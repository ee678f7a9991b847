#![forbid(unsafe_code)]

//! Surfaces that draw a [`mindsprout_core::TopicTree`].
//!
//! [`ViewSurface`] is the capability a session drives; [`SvgSurface`] is the bundled retained
//! implementation with a horizontal tree layout and SVG export.

pub mod layout;
pub mod model;
pub mod surface;
pub mod svg;
pub mod text;

use mindsprout_core::NodeId;

pub use layout::{LayoutOptions, TreeShape, layout_tree};
pub use surface::{NodeVisualState, ViewSurface};
pub use svg::{SvgOptions, SvgSurface};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no element for topic {id}")]
    UnknownElement { id: NodeId },
    #[error("parent of topic {id} has no element")]
    MissingParent { id: NodeId },
}

pub type Result<T> = std::result::Result<T, Error>;

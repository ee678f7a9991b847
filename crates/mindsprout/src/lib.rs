#![forbid(unsafe_code)]

//! `mindsprout` is a headless client core for AI-assisted mind maps.
//!
//! A seed phrase goes to a topic backend, the returned tree is held in a [`TopicTree`], and a
//! [`Session`] keeps any [`render::ViewSurface`] in sync with it while the user expands, edits,
//! adds and deletes topics.
//!
//! # Features
//!
//! - `raster`: enable PNG/JPG/PDF export of the SVG surface (`mindsprout::render::raster`)

pub use mindsprout_core::*;

pub mod session;

pub use session::{
    ClickOutcome, ExpansionOutcome, ExpansionTicket, Notification, NotificationLevel, Session,
    SessionError,
};

/// Topic backend clients.
pub mod gateway {
    pub use mindsprout_gateway::{
        AnyGateway, Error, GeneratedTree, HttpGateway, OfflineGateway, Result, TopicGateway,
    };
}

pub mod render {
    pub use mindsprout_render::layout::{LayoutOptions, TreeShape, layout_tree};
    pub use mindsprout_render::model::{Bounds, LayoutEdge, LayoutNode, LayoutPoint};
    pub use mindsprout_render::svg::{NodeElement, SvgOptions, SvgSurface};
    pub use mindsprout_render::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
    pub use mindsprout_render::{Error, NodeVisualState, Result, ViewSurface};

    #[cfg(feature = "raster")]
    pub mod raster;
}

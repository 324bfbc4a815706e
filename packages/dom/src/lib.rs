//! # Vellum DOM
//!
//! Renders a [`vellum_document::Document`] into an external tree and keeps
//! the two in sync with minimal mutations.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ renderer: predicate → RenderDescription      │
//! │  (async, last registered wins, batching)     │
//! └──────────────────────────────────────────────┘
//!                      ↓
//! ┌──────────────────────────────────────────────┐
//! │ reconciler: prepare (async) + patch (sync)   │
//! │  - slots reused, moved or discarded          │
//! │  - attribute / class / style patches         │
//! │  - whitespace coalescing                     │
//! └──────────────────────────────────────────────┘
//!                      ↓
//! ┌──────────────────────────────────────────────┐
//! │ external: element/text arena + record log    │
//! │ location: node ⇄ external node index         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Move, don't rebuild**: an external node survives as long as the node it renders does
//! 2. **Diff against what we wrote**: foreign classes, styles and children are left alone
//! 3. **Both directions at once**: every location map update is bidirectional
//!
//! ## Usage
//!
//! ```rust
//! use vellum_document::{Document, Outline};
//! use vellum_dom::{EngineConfig, ExternalDom, Reconciler};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let doc = Document::from_outline(&[Outline::container("p", vec![Outline::text("hi")])]).unwrap();
//! let mut dom = ExternalDom::new();
//! let mount = dom.create_element("div");
//! dom.append_child(dom.root(), mount).unwrap();
//!
//! let mut engine = Reconciler::new(mount, EngineConfig::default());
//! engine.redraw(&doc, &mut dom, None).await.unwrap();
//! assert_eq!(dom.inner_html(mount), "<p>hi</p>");
//! # });
//! ```

mod attributes;
mod config;
mod description;
mod errors;
mod external;
mod location;
mod reconciler;
mod renderer;
mod renderers;
mod selection;
mod whitespace;

pub use attributes::{apply_attribute_patches, diff_attributes, AttributePatch, AttributeState};
pub use config::EngineConfig;
pub use description::{
    ElementDescription, FragmentDescription, Hook, Hooks, RenderDescription, TextDescription, TextSpan,
};
pub use errors::{DomError, DomResult, RedrawError, RedrawResult, RenderError};
pub use external::{ExternalDom, ExternalId, ExternalPoint, ExternalSelection, MutationRecord};
pub use location::{LocationMap, SpanLocation};
pub use reconciler::{RedrawReport, Reconciler};
pub use renderer::{Renderer, RendererRegistry};
pub use renderers::{
    AtomicRenderer, ContainerRenderer, LineBreakRenderer, MarkerRenderer, RootRenderer, TextRenderer,
};
pub use whitespace::{visible_spaces, NBSP};

// Renderer implementations outside this crate need the same attribute
pub use async_trait::async_trait;

//! # Vellum Document
//!
//! In-memory document model for a structured rich-text editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: arena of nodes + structural edits │
//! │  - append/insert/wrap/unwrap/split/merge    │
//! │  - change log (natural dirty set)           │
//! │  - selection markers                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ node: NodeRef handles, tangible navigation  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ walker: navigation under a visibility policy│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ vellum-dom: render + reconcile              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Ids are identity**: every node carries a process-unique, never reused id
//! 2. **One filtering axis**: intangible nodes are skipped by every semantic query
//! 3. **Derived state is recomputed**: editability is read from modifier stacks on demand
//! 4. **Replace, never retype**: a node keeps its kind for life
//!
//! ## Usage
//!
//! ```rust
//! use vellum_document::{any, Document, NodeKind};
//!
//! let mut doc = Document::new();
//! let p = doc.create(NodeKind::container("p"));
//! let chars = doc.create_text("hi");
//! doc.append(p, &chars).unwrap();
//! doc.append(doc.root_id(), &[p]).unwrap();
//!
//! let first = doc.node(chars[0]).unwrap();
//! assert_eq!(first.next_sibling(any).unwrap().char(), Some('i'));
//! assert!(doc.root().is_before(first));
//! ```

mod document;
mod errors;
mod modifiers;
mod node;
mod outline;
mod selection;
mod walker;

pub use document::Document;
pub use errors::{ChildError, TreeError, TreeResult};
pub use modifiers::{parse_style, serialize_style, Attributes, Modifier, Modifiers};
pub use node::{any, NodeId, NodeKind, NodeRef};
pub use outline::{Keyword, Outline};
pub use selection::{Direction, Point, RelativePosition, SelectionState};
pub use walker::Walker;

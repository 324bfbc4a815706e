//! # Reconciliation Engine
//!
//! Renders document nodes through the registry and patches the external tree
//! to match, touching only what changed.
//!
//! ## Slots
//!
//! Every render call produces one *slot*: the group of nodes rendered
//! together (usually one node, or a batch of characters) and the external
//! nodes materialized for its description. A `Node` reference inside a
//! description becomes a reference to the child's slot, so the materialized
//! tree is a tree of slots mirroring the rendered document.
//!
//! A redraw runs in two phases:
//!
//! 1. **Prepare** (async): walk from the root and render every group that
//!    needs it, awaiting renderers. A group is re-rendered when one of its
//!    nodes is dirty, is an ancestor of a dirty node, or when the group's
//!    membership no longer matches its slot. Everything else is reused.
//! 2. **Patch** (sync): reconcile each prepared description against the
//!    slot it replaces. Elements with the same tag are kept, attributes are
//!    patched granularly, children are moved rather than rebuilt, and only
//!    slots nobody claimed are discarded.
//!
//! The location map is written as soon as a slot is stored, before any
//! parent reads it.

use crate::attributes::{apply_attribute_patches, diff_attributes, AttributeState};
use crate::config::EngineConfig;
use crate::description::{
    ElementDescription, FragmentDescription, Hook, Hooks, RenderDescription, TextDescription, TextSpan,
};
use crate::errors::{RedrawError, RedrawResult};
use crate::external::{ExternalDom, ExternalId};
use crate::location::{LocationMap, SpanLocation};
use crate::renderer::{Renderer, RendererRegistry};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, instrument, warn};
use vellum_document::{any, Document, NodeId, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotId(u64);

/// External nodes built for one description
#[derive(Debug)]
enum Materialized {
    Element {
        ext: ExternalId,
        tag: String,
        attributes: AttributeState,
        children: Vec<Materialized>,
        nodes: Vec<NodeId>,
        hooks: Hooks,
    },
    Text {
        ext: ExternalId,
        content: String,
        spans: Vec<TextSpan>,
    },
    Fragment {
        children: Vec<Materialized>,
        hooks: Hooks,
    },
    Native(Vec<ExternalId>),
    Slot(SlotId),
}

impl Materialized {
    fn matches(&self, description: &RenderDescription) -> bool {
        match (self, description) {
            (Materialized::Element { tag, .. }, RenderDescription::Element(element)) => {
                tag.eq_ignore_ascii_case(&element.tag)
            }
            (Materialized::Text { .. }, RenderDescription::Text(_))
            | (Materialized::Fragment { .. }, RenderDescription::Fragment(_))
            | (Materialized::Native(_), RenderDescription::Native(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Slot {
    nodes: Vec<NodeId>,
    root: Materialized,
    parent: Option<SlotId>,
    /// Tangible siblings around `nodes` when rendered
    neighbors: Neighbors,
    /// Nodes this slot wrote into the location map
    mapped: Vec<NodeId>,
}

type Neighbors = (Option<NodeId>, Option<NodeId>);

/// Summary of one redraw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedrawReport {
    /// External mutation records produced
    pub mutations: usize,
    /// Render calls made
    pub rendered: usize,
    /// Slots kept without rendering
    pub reused: usize,
    /// External nodes dropped
    pub discarded: usize,
}

/// Per-redraw scratch state
#[derive(Default)]
struct Pass {
    prepared: HashMap<Vec<NodeId>, RenderDescription>,
    claimed: HashSet<SlotId>,
    claimed_nodes: HashSet<NodeId>,
    candidates: Vec<SlotId>,
    discarded: Vec<(ExternalId, Option<Hook>)>,
    attached: Vec<(Hook, ExternalId)>,
    placed: HashSet<ExternalId>,
    reused: usize,
}

pub struct Reconciler {
    config: EngineConfig,
    registry: RendererRegistry,
    mount: ExternalId,
    locations: LocationMap,
    slots: HashMap<SlotId, Slot>,
    slot_of: HashMap<NodeId, SlotId>,
    mapped_by: HashMap<NodeId, SlotId>,
    ext_slot: HashMap<ExternalId, SlotId>,
    owned: HashSet<ExternalId>,
    externally_mutated: HashSet<ExternalId>,
    pending_selection: Option<SelectionState>,
    root_slot: Option<SlotId>,
    next_slot: u64,
}

impl Reconciler {
    /// Engine drawing into the element `mount`, with the default renderers
    pub fn new(mount: ExternalId, config: EngineConfig) -> Self {
        let registry = RendererRegistry::with_defaults(&config);
        Self::with_registry(mount, config, registry)
    }

    pub fn with_registry(mount: ExternalId, config: EngineConfig, registry: RendererRegistry) -> Self {
        Self {
            config,
            registry,
            mount,
            locations: LocationMap::new(),
            slots: HashMap::new(),
            slot_of: HashMap::new(),
            mapped_by: HashMap::new(),
            ext_slot: HashMap::new(),
            owned: HashSet::new(),
            externally_mutated: HashSet::new(),
            pending_selection: None,
            root_slot: None,
            next_slot: 1,
        }
    }

    /// Register a renderer taking precedence over every earlier one
    pub fn register(&mut self, renderer: impl Renderer + 'static) {
        self.registry.register(renderer);
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RendererRegistry {
        &mut self.registry
    }

    pub fn mount(&self) -> ExternalId {
        self.mount
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locations(&self) -> &LocationMap {
        &self.locations
    }

    /// External nodes currently representing `node`; empty when unmapped
    pub fn get_external_nodes(&self, node: NodeId) -> &[ExternalId] {
        self.locations.external_nodes(node)
    }

    /// Document nodes represented by `ext`; empty when unmapped
    pub fn get_nodes(&self, ext: ExternalId) -> &[NodeId] {
        self.locations.nodes(ext)
    }

    pub fn text_span(&self, node: NodeId) -> Option<SpanLocation> {
        self.locations.span(node)
    }

    /// Flag external nodes changed by foreign code. They are re-examined on
    /// the next redraw and left alone if they already match.
    pub fn mark_externally_mutated(&mut self, externals: &HashSet<ExternalId>) {
        debug!(count = externals.len(), "external nodes marked as mutated");
        self.externally_mutated.extend(externals.iter().copied());
    }

    /// Selection rendered onto the external tree after every redraw
    pub fn set_selection(&mut self, selection: Option<SelectionState>) {
        self.pending_selection = selection;
    }

    /// Bring the external tree in line with `doc`.
    ///
    /// `dirty` lists the nodes that changed since the last redraw, typically
    /// `Document::take_changes`. `None`, or a first redraw, renders
    /// everything. A failed redraw keeps the mutations applied so far;
    /// recover with a full redraw.
    #[instrument(skip_all, fields(mount = %self.mount))]
    pub async fn redraw(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        dirty: Option<&[NodeId]>,
    ) -> RedrawResult<RedrawReport> {
        let root = doc.root_id();
        if !dom.is_element(self.mount) || !dom.is_connected(self.mount) {
            warn!(node = %root, "mount element is no longer connected");
            return Err(RedrawError::Impossible {
                node: root,
                mount: self.mount,
                reason: "mount element is not connected to the document".to_string(),
            });
        }

        let before = dom.mutation_count();
        let root_group = vec![root];
        let full = dirty.is_none() || !self.slot_matches(&root_group);
        let needs = match dirty {
            Some(dirty) if !full => self.needs(doc, dirty),
            _ => HashSet::new(),
        };
        info!(
            full,
            dirty = dirty.map_or(0, |d| d.len()),
            needs = needs.len(),
            "redraw started"
        );

        let mut pass = Pass::default();
        if full || needs.contains(&root) {
            self.prepare(doc, &mut pass, root_group.clone(), full, &needs).await?;
        }
        let rendered = pass.prepared.len();
        let root_rendered = pass.prepared.contains_key(&root_group);

        let root_slot = self.patch_group(doc, dom, &mut pass, &root_group, None)?;
        if root_rendered {
            let desired = self.slot_externals(root_slot);
            let strict = self.externally_mutated.contains(&self.mount) || self.config.remove_foreign_children;
            self.sync_children(dom, &mut pass, self.mount, &desired, strict)?;
        }
        self.root_slot = Some(root_slot);
        let discarded = self.finish(dom, &mut pass)?;
        self.externally_mutated.clear();

        if let Some(selection) = self.pending_selection {
            self.render_selection(doc, dom, &selection);
        }

        let report = RedrawReport {
            mutations: dom.mutation_count() - before,
            rendered,
            reused: pass.reused,
            discarded,
        };
        info!(
            mutations = report.mutations,
            rendered = report.rendered,
            reused = report.reused,
            "redraw finished"
        );
        Ok(report)
    }

    fn slot_matches(&self, group: &[NodeId]) -> bool {
        group
            .first()
            .and_then(|id| self.slot_of.get(id))
            .and_then(|slot| self.slots.get(slot))
            .map_or(false, |slot| slot.nodes == group)
    }

    /// Nodes whose render must be recomputed for `dirty`
    fn needs(&self, doc: &Document, dirty: &[NodeId]) -> HashSet<NodeId> {
        let mut needs = HashSet::new();
        for id in dirty {
            if let Some(node) = doc.node(*id) {
                if node.is_attached() {
                    needs.insert(*id);
                    needs.extend(node.ancestors(any).iter().map(|a| a.id()));
                }
            }
            // the slots that rendered it before, in case it moved or left
            self.escalate(self.slot_of.get(id).copied(), &mut needs);
        }
        for ext in &self.externally_mutated {
            if *ext == self.mount {
                needs.insert(doc.root_id());
            }
            self.escalate(self.ext_slot.get(ext).copied(), &mut needs);
        }
        needs
    }

    /// A group renders the same as last time only if its siblings are the
    /// same too: text runs pick their edge spaces from them.
    fn slot_reusable(&self, doc: &Document, group: &[NodeId]) -> bool {
        self.slot_matches(group)
            && group
                .first()
                .and_then(|id| self.slot_of.get(id))
                .and_then(|slot| self.slots.get(slot))
                .map_or(false, |slot| slot.neighbors == neighbors(doc, group))
    }

    fn escalate(&self, mut slot: Option<SlotId>, needs: &mut HashSet<NodeId>) {
        while let Some(entry) = slot.and_then(|id| self.slots.get(&id)) {
            needs.extend(entry.nodes.iter().copied());
            slot = entry.parent;
        }
    }

    fn allocate_slot(&mut self) -> SlotId {
        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        id
    }

    // ---- prepare ---------------------------------------------------------

    async fn prepare(
        &self,
        doc: &Document,
        pass: &mut Pass,
        root: Vec<NodeId>,
        full: bool,
        needs: &HashSet<NodeId>,
    ) -> RedrawResult<()> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(group) = queue.pop_front() {
            claim_nodes(&mut seen, &group)?;
            let description = self.registry.render_group(doc, &group).await?;
            for run in description.node_runs() {
                for child in self.registry.group(doc, &run)? {
                    let render = full
                        || child.iter().any(|id| needs.contains(id))
                        || !self.slot_reusable(doc, &child);
                    if render {
                        queue.push_back(child);
                    } else {
                        claim_nodes(&mut seen, &child)?;
                    }
                }
            }
            pass.prepared.insert(group, description);
        }
        Ok(())
    }

    // ---- patch -----------------------------------------------------------

    fn patch_group(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        group: &[NodeId],
        parent: Option<SlotId>,
    ) -> RedrawResult<SlotId> {
        claim_nodes(&mut pass.claimed_nodes, group)?;
        let existing = group
            .iter()
            .filter_map(|id| self.slot_of.get(id).copied())
            .find(|slot| !pass.claimed.contains(slot) && self.slots.contains_key(slot));

        let Some(description) = pass.prepared.remove(group) else {
            let reusable = existing.filter(|slot| self.slots.get(slot).map_or(false, |s| s.nodes == group));
            let Some(id) = reusable else {
                return Err(RedrawError::Impossible {
                    node: group.first().copied().unwrap_or_else(|| doc.root_id()),
                    mount: self.mount,
                    reason: "group was neither rendered nor previously drawn".to_string(),
                });
            };
            pass.claimed.insert(id);
            pass.reused += 1;
            if let Some(slot) = self.slots.get_mut(&id) {
                slot.parent = parent;
            }
            return Ok(id);
        };

        let id = existing.unwrap_or_else(|| self.allocate_slot());
        pass.claimed.insert(id);
        let (old_root, old_nodes, old_mapped) = match self.slots.remove(&id) {
            Some(slot) => (Some(slot.root), slot.nodes, slot.mapped),
            None => (None, Vec::new(), Vec::new()),
        };
        debug!(slot = id.0, nodes = group.len(), fresh = old_root.is_none(), "patching slot");

        let root = self.materialize(doc, dom, pass, id, description, old_root)?;
        let neighbors = neighbors(doc, group);
        self.store_slot(id, group.to_vec(), old_nodes, old_mapped, root, parent, neighbors);
        Ok(id)
    }

    fn store_slot(
        &mut self,
        id: SlotId,
        nodes: Vec<NodeId>,
        old_nodes: Vec<NodeId>,
        old_mapped: Vec<NodeId>,
        root: Materialized,
        parent: Option<SlotId>,
        neighbors: Neighbors,
    ) {
        for node in old_mapped {
            if self.mapped_by.get(&node) == Some(&id) {
                self.mapped_by.remove(&node);
                self.locations.forget_node(node);
            }
        }
        for node in old_nodes {
            if self.slot_of.get(&node) == Some(&id) && !nodes.contains(&node) {
                self.slot_of.remove(&node);
            }
        }

        // the root stands for the mount itself
        let tops = if parent.is_none() {
            vec![self.mount]
        } else {
            self.externals_of(&root)
        };
        let mut mapped = Vec::with_capacity(nodes.len());
        for node in &nodes {
            self.slot_of.insert(*node, id);
            self.mapped_by.insert(*node, id);
            self.locations.set(*node, &tops);
            mapped.push(*node);
        }

        let mut externals = Vec::new();
        let mut extras = Vec::new();
        collect_mappings(&root, &mut externals, &mut extras);
        for (node, mapping) in extras {
            match mapping {
                Mapping::Element(ext) => self.locations.set(node, &[ext]),
                Mapping::Span(span) => self.locations.set_span(node, span.text, span.start, span.end),
            }
            self.mapped_by.insert(node, id);
            mapped.push(node);
        }
        for ext in externals {
            self.ext_slot.insert(ext, id);
        }

        self.slots.insert(
            id,
            Slot {
                nodes,
                root,
                parent,
                neighbors,
                mapped,
            },
        );
    }

    fn materialize(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        owner: SlotId,
        description: RenderDescription,
        old: Option<Materialized>,
    ) -> RedrawResult<Materialized> {
        match description {
            RenderDescription::Element(element) => self.materialize_element(doc, dom, pass, owner, element, old),
            RenderDescription::Text(text) => self.materialize_text(dom, pass, text, old),
            RenderDescription::Fragment(fragment) => self.materialize_fragment(doc, dom, pass, owner, fragment, old),
            RenderDescription::Native(externals) => {
                match old {
                    Some(Materialized::Native(previous)) if previous == externals => {}
                    Some(other) => self.discard(pass, other),
                    None => {}
                }
                Ok(Materialized::Native(externals))
            }
            RenderDescription::Node(id) => {
                let fragment = RenderDescription::fragment(vec![RenderDescription::Node(id)]);
                self.materialize(doc, dom, pass, owner, fragment, old)
            }
        }
    }

    fn materialize_element(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        owner: SlotId,
        element: ElementDescription,
        old: Option<Materialized>,
    ) -> RedrawResult<Materialized> {
        let ElementDescription {
            tag,
            attributes,
            children,
            nodes,
            hooks,
        } = element;
        let desired = AttributeState::from_pairs(&attributes);

        match old {
            Some(Materialized::Element {
                ext,
                tag: old_tag,
                attributes: old_attributes,
                children: old_children,
                ..
            }) if old_tag.eq_ignore_ascii_case(&tag) && dom.is_element(ext) => {
                let marked = self.externally_mutated.contains(&ext);
                let base = if marked {
                    AttributeState::observe(dom, ext, &old_attributes, &desired)
                } else {
                    old_attributes
                };
                apply_attribute_patches(dom, ext, &diff_attributes(&base, &desired))?;
                let children = self.reconcile_list(doc, dom, pass, owner, children, old_children)?;
                let strict = marked || self.config.remove_foreign_children;
                let desired_children = self.externals_of_list(&children);
                self.sync_children(dom, pass, ext, &desired_children, strict)?;
                Ok(Materialized::Element {
                    ext,
                    tag: old_tag,
                    attributes: desired,
                    children,
                    nodes,
                    hooks,
                })
            }
            old => {
                // a replaced element or fragment hands its children over
                let old_children = match old {
                    Some(Materialized::Element {
                        ext, children, hooks, ..
                    }) => {
                        pass.discarded.push((ext, hooks.detach));
                        children
                    }
                    Some(Materialized::Fragment { children, .. }) => children,
                    Some(other) => {
                        self.discard(pass, other);
                        Vec::new()
                    }
                    None => Vec::new(),
                };
                let ext = dom.create_element(&tag);
                self.owned.insert(ext);
                apply_attribute_patches(dom, ext, &diff_attributes(&AttributeState::default(), &desired))?;
                let children = self.reconcile_list(doc, dom, pass, owner, children, old_children)?;
                let desired_children = self.externals_of_list(&children);
                self.sync_children(dom, pass, ext, &desired_children, false)?;
                if let Some(hook) = &hooks.attach {
                    pass.attached.push((hook.clone(), ext));
                }
                debug!(%ext, %tag, "created element");
                Ok(Materialized::Element {
                    ext,
                    tag,
                    attributes: desired,
                    children,
                    nodes,
                    hooks,
                })
            }
        }
    }

    fn materialize_text(
        &mut self,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        text: TextDescription,
        old: Option<Materialized>,
    ) -> RedrawResult<Materialized> {
        let TextDescription { content, spans } = text;
        match old {
            Some(Materialized::Text {
                ext,
                content: previous,
                ..
            }) if dom.is_text(ext) => {
                let current = if self.externally_mutated.contains(&ext) {
                    dom.text(ext).map(str::to_string).unwrap_or_default()
                } else {
                    previous
                };
                if current != content {
                    dom.set_text(ext, &content)?;
                }
                Ok(Materialized::Text { ext, content, spans })
            }
            old => {
                if let Some(old) = old {
                    self.discard(pass, old);
                }
                let ext = dom.create_text(&content);
                self.owned.insert(ext);
                Ok(Materialized::Text { ext, content, spans })
            }
        }
    }

    fn materialize_fragment(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        owner: SlotId,
        fragment: FragmentDescription,
        old: Option<Materialized>,
    ) -> RedrawResult<Materialized> {
        let FragmentDescription { children, hooks } = fragment;
        let (old_children, fresh) = match old {
            Some(Materialized::Fragment { children, .. }) => (children, false),
            Some(Materialized::Element {
                ext, children, hooks, ..
            }) => {
                pass.discarded.push((ext, hooks.detach));
                (children, true)
            }
            Some(other) => {
                self.discard(pass, other);
                (Vec::new(), true)
            }
            None => (Vec::new(), true),
        };
        let children = self.reconcile_list(doc, dom, pass, owner, children, old_children)?;
        if fresh {
            if let Some(hook) = &hooks.attach {
                for ext in self.externals_of_list(&children) {
                    pass.attached.push((hook.clone(), ext));
                }
            }
        }
        Ok(Materialized::Fragment { children, hooks })
    }

    /// Pair new child descriptions with old materialized children. Node
    /// references are grouped and patched as slots; other entries reuse the
    /// next old entry of the same shape.
    fn reconcile_list(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        owner: SlotId,
        descriptions: Vec<RenderDescription>,
        old: Vec<Materialized>,
    ) -> RedrawResult<Vec<Materialized>> {
        let mut pool = Vec::new();
        for entry in old {
            match entry {
                Materialized::Slot(id) => pass.candidates.push(id),
                other => pool.push(Some(other)),
            }
        }

        let mut cursor = 0;
        let mut result = Vec::with_capacity(descriptions.len());
        let mut run = Vec::new();
        for description in descriptions {
            if let RenderDescription::Node(id) = description {
                run.push(id);
                continue;
            }
            self.flush_run(doc, dom, pass, owner, &mut run, &mut result)?;
            let previous = match pool[cursor.min(pool.len())..]
                .iter()
                .position(|entry| entry.as_ref().map_or(false, |e| e.matches(&description)))
            {
                Some(offset) => {
                    let index = cursor + offset;
                    cursor = index + 1;
                    pool[index].take()
                }
                None => None,
            };
            result.push(self.materialize(doc, dom, pass, owner, description, previous)?);
        }
        self.flush_run(doc, dom, pass, owner, &mut run, &mut result)?;

        for leftover in pool.into_iter().flatten() {
            self.discard(pass, leftover);
        }
        Ok(result)
    }

    fn flush_run(
        &mut self,
        doc: &Document,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        owner: SlotId,
        run: &mut Vec<NodeId>,
        result: &mut Vec<Materialized>,
    ) -> RedrawResult<()> {
        if run.is_empty() {
            return Ok(());
        }
        let run = std::mem::take(run);
        for group in self.registry.group(doc, &run)? {
            let slot = self.patch_group(doc, dom, pass, &group, Some(owner))?;
            result.push(Materialized::Slot(slot));
        }
        Ok(())
    }

    /// Make `desired` the engine-managed children of `parent`, in order.
    ///
    /// Children the engine does not own are left in place unless `strict`.
    /// Nodes already in increasing order stay put; only the rest move.
    fn sync_children(
        &mut self,
        dom: &mut ExternalDom,
        pass: &mut Pass,
        parent: ExternalId,
        desired: &[ExternalId],
        strict: bool,
    ) -> RedrawResult<()> {
        pass.placed.extend(desired.iter().copied());
        let wanted: HashSet<ExternalId> = desired.iter().copied().collect();
        let current = dom.children(parent)?.to_vec();
        for child in current {
            if !wanted.contains(&child) && (strict || self.owned.contains(&child)) {
                dom.remove(child)?;
            }
        }

        let position: HashMap<ExternalId, usize> = dom
            .children(parent)?
            .iter()
            .enumerate()
            .map(|(index, child)| (*child, index))
            .collect();
        let indices: Vec<Option<usize>> = desired.iter().map(|ext| position.get(ext).copied()).collect();
        let keep = longest_increasing(&indices);

        let mut next = None;
        for (index, ext) in desired.iter().enumerate().rev() {
            if !keep.contains(&index) {
                dom.insert_before(parent, *ext, next)?;
            }
            next = Some(*ext);
        }
        Ok(())
    }

    fn discard(&self, pass: &mut Pass, materialized: Materialized) {
        match materialized {
            Materialized::Element {
                ext, children, hooks, ..
            } => {
                for child in children {
                    self.discard(pass, child);
                }
                pass.discarded.push((ext, hooks.detach));
            }
            Materialized::Text { ext, .. } => pass.discarded.push((ext, None)),
            Materialized::Fragment { children, hooks } => {
                if let Some(hook) = hooks.detach {
                    for ext in self.externals_of_list(&children) {
                        pass.discarded.push((ext, Some(hook.clone())));
                    }
                }
                for child in children {
                    self.discard(pass, child);
                }
            }
            Materialized::Native(externals) => {
                pass.discarded.extend(externals.into_iter().map(|ext| (ext, None)));
            }
            Materialized::Slot(id) => pass.candidates.push(id),
        }
    }

    /// Drop unclaimed slots and detached externals, then run attach hooks
    fn finish(&mut self, dom: &mut ExternalDom, pass: &mut Pass) -> RedrawResult<usize> {
        while let Some(id) = pass.candidates.pop() {
            if pass.claimed.contains(&id) {
                continue;
            }
            let Some(slot) = self.slots.remove(&id) else {
                continue;
            };
            for node in slot.mapped {
                if self.mapped_by.get(&node) == Some(&id) {
                    self.mapped_by.remove(&node);
                    self.locations.forget_node(node);
                }
            }
            for node in slot.nodes {
                if self.slot_of.get(&node) == Some(&id) {
                    self.slot_of.remove(&node);
                }
            }
            self.discard(pass, slot.root);
        }

        let entries = std::mem::take(&mut pass.discarded);
        let dropped: HashSet<ExternalId> = entries
            .iter()
            .map(|(ext, _)| *ext)
            .filter(|ext| !pass.placed.contains(ext))
            .collect();
        for (ext, hook) in entries {
            if !dropped.contains(&ext) {
                continue;
            }
            if let Some(hook) = hook {
                hook(ext);
            }
            self.locations.forget_external(ext);
            self.ext_slot.remove(&ext);
            self.owned.remove(&ext);
            match dom.parent(ext) {
                Some(parent) if !dropped.contains(&parent) => dom.remove(ext)?,
                _ => {}
            }
        }

        for (hook, ext) in std::mem::take(&mut pass.attached) {
            if dom.is_connected(ext) {
                hook(ext);
            }
        }
        Ok(dropped.len())
    }

    // ---- queries ---------------------------------------------------------

    fn slot_externals(&self, id: SlotId) -> Vec<ExternalId> {
        self.slots
            .get(&id)
            .map(|slot| self.externals_of(&slot.root))
            .unwrap_or_default()
    }

    /// Top-level external nodes of a materialized description
    fn externals_of(&self, materialized: &Materialized) -> Vec<ExternalId> {
        match materialized {
            Materialized::Element { ext, .. } | Materialized::Text { ext, .. } => vec![*ext],
            Materialized::Fragment { children, .. } => self.externals_of_list(children),
            Materialized::Native(externals) => externals.clone(),
            Materialized::Slot(id) => self.slot_externals(*id),
        }
    }

    fn externals_of_list(&self, list: &[Materialized]) -> Vec<ExternalId> {
        list.iter().flat_map(|entry| self.externals_of(entry)).collect()
    }
}

fn claim_nodes(seen: &mut HashSet<NodeId>, group: &[NodeId]) -> RedrawResult<()> {
    for id in group {
        if !seen.insert(*id) {
            return Err(RedrawError::DuplicateReference(*id));
        }
    }
    Ok(())
}

fn neighbors(doc: &Document, group: &[NodeId]) -> Neighbors {
    let previous = group
        .first()
        .and_then(|id| doc.node(*id))
        .and_then(|node| node.previous_sibling(any))
        .map(|node| node.id());
    let next = group
        .last()
        .and_then(|id| doc.node(*id))
        .and_then(|node| node.next_sibling(any))
        .map(|node| node.id());
    (previous, next)
}

enum Mapping {
    Element(ExternalId),
    Span(SpanLocation),
}

/// External nodes owned by one slot, and the extra node mappings its
/// descriptions declared. Child slots are not entered.
fn collect_mappings(
    materialized: &Materialized,
    externals: &mut Vec<ExternalId>,
    extras: &mut Vec<(NodeId, Mapping)>,
) {
    match materialized {
        Materialized::Element {
            ext, children, nodes, ..
        } => {
            externals.push(*ext);
            extras.extend(nodes.iter().map(|node| (*node, Mapping::Element(*ext))));
            for child in children {
                collect_mappings(child, externals, extras);
            }
        }
        Materialized::Text { ext, spans, .. } => {
            externals.push(*ext);
            extras.extend(spans.iter().map(|span| {
                (
                    span.node,
                    Mapping::Span(SpanLocation {
                        text: *ext,
                        start: span.start,
                        end: span.end,
                    }),
                )
            }));
        }
        Materialized::Fragment { children, .. } => {
            for child in children {
                collect_mappings(child, externals, extras);
            }
        }
        Materialized::Native(natives) => externals.extend(natives.iter().copied()),
        Materialized::Slot(_) => {}
    }
}

/// Positions (into `indices`) of one longest strictly increasing subsequence
/// of the present values
fn longest_increasing(indices: &[Option<usize>]) -> HashSet<usize> {
    let mut tails: Vec<(usize, usize)> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; indices.len()];
    for (position, value) in indices.iter().enumerate() {
        let Some(value) = *value else {
            continue;
        };
        let at = tails.partition_point(|(tail, _)| *tail < value);
        previous[position] = at.checked_sub(1).map(|k| tails[k].1);
        if at == tails.len() {
            tails.push((value, position));
        } else {
            tails[at] = (value, position);
        }
    }

    let mut keep = HashSet::new();
    let mut cursor = tails.last().map(|(_, position)| *position);
    while let Some(position) = cursor {
        keep.insert(position);
        cursor = previous[position];
    }
    keep
}

/// Redraw tests against the in-memory external tree
///
/// These tests validate that:
/// - Character runs coalesce into one text node with visible spaces
/// - Incremental redraws emit the minimal set of mutations
/// - Foreign classes and children survive redraws
/// - External nodes are moved rather than rebuilt
/// - Hooks fire only when nodes are built or dropped
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use vellum_document::{any, Document, NodeId, NodeKind, NodeRef, Outline};
use vellum_dom::{
    async_trait, EngineConfig, ExternalDom, ExternalId, MutationRecord, RedrawError, Reconciler, RenderDescription,
    RenderError, Renderer,
};

fn mounted() -> (ExternalDom, ExternalId) {
    let mut dom = ExternalDom::new();
    let mount = dom.create_element("div");
    let body = dom.root();
    dom.append_child(body, mount).unwrap();
    (dom, mount)
}

fn paragraph(text: &str) -> Document {
    Document::from_outline(&[Outline::container("p", vec![Outline::text(text)])]).unwrap()
}

fn example() -> Document {
    let outline = Outline::parse(
        r#"[
            { "container": "p", "attributes": { "class": "lead" }, "children": [
                { "text": "hello " },
                { "text": "world", "formats": ["b"] },
                "lineBreak",
                { "atomic": "img", "attributes": { "src": "a.png" } }
            ] },
            { "container": "ul", "children": [
                { "container": "li", "children": [{ "text": "one" }] },
                { "container": "li", "children": [{ "text": "two" }] }
            ] }
        ]"#,
    )
    .unwrap();
    Document::from_outline(&outline).unwrap()
}

fn first_child(doc: &Document) -> NodeId {
    doc.root().first_child(any).unwrap().id()
}

#[tokio::test]
async fn test_adjacent_characters_coalesce() {
    let doc = paragraph("a  b");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let p_ext = engine.get_external_nodes(first_child(&doc))[0];
    let children = dom.children(p_ext).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(dom.text(children[0]), Some("a \u{a0}b"));
}

#[tokio::test]
async fn test_plain_spaces_without_visible_whitespace() {
    let doc = paragraph("a  b");
    let (mut dom, mount) = mounted();
    let config = EngineConfig {
        visible_whitespace: false,
        ..EngineConfig::default()
    };
    let mut engine = Reconciler::new(mount, config);
    engine.redraw(&doc, &mut dom, None).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p>a  b</p>");
}

#[tokio::test]
async fn test_removing_trailing_characters_is_one_mutation() {
    let mut doc = paragraph("abcde");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let p = first_child(&doc);
    let chars = doc.node(p).unwrap().child_ids().to_vec();
    let text = engine.text_span(chars[0]).unwrap().text;
    doc.remove(chars[3]).unwrap();
    doc.remove(chars[4]).unwrap();
    let dirty = doc.take_changes();
    dom.take_records();

    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(report.mutations, 1);
    assert_eq!(dom.take_records(), vec![MutationRecord::CharacterData { target: text }]);
    assert_eq!(dom.inner_html(mount), "<p>abc</p>");
    assert!(engine.get_external_nodes(chars[3]).is_empty());
    assert_eq!(engine.text_span(chars[2]).map(|s| (s.start, s.end)), Some((2, 3)));
}

#[tokio::test]
async fn test_second_redraw_is_silent() {
    let doc = example();
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());

    let first = engine.redraw(&doc, &mut dom, None).await.unwrap();
    assert!(first.mutations > 0);

    let second = engine.redraw(&doc, &mut dom, None).await.unwrap();
    assert_eq!(second.mutations, 0);
    assert_eq!(second.discarded, 0);

    let empty = engine.redraw(&doc, &mut dom, Some(&[])).await.unwrap();
    assert_eq!(empty.mutations, 0);
    assert_eq!(empty.rendered, 0);
}

#[tokio::test]
async fn test_full_render_markup() {
    let doc = example();
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();
    assert_eq!(
        dom.inner_html(mount),
        concat!(
            r#"<p class="lead">hello <b>world</b><br><img src="a.png"></p>"#,
            "<ul><li>one</li><li>two</li></ul>"
        )
    );
}

#[tokio::test]
async fn test_location_map_covers_every_node() {
    let doc = example();
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    assert_eq!(engine.get_external_nodes(doc.root_id()), &[mount]);
    let mut nodes = doc.root().descendants(any);
    nodes.push(doc.root());
    for node in nodes {
        let externals = engine.get_external_nodes(node.id());
        assert!(!externals.is_empty(), "{} is not mapped", node.id());
        for ext in externals {
            assert!(dom.is_connected(*ext));
            assert!(engine.get_nodes(*ext).contains(&node.id()));
        }
    }
    assert!(engine.locations().is_consistent());
}

#[tokio::test]
async fn test_foreign_class_survives_managed_change() {
    let mut doc = Document::new();
    let p = doc.create(NodeKind::container("p"));
    doc.update_modifiers(p, |m| m.attributes_mut().add_class("managed")).unwrap();
    let chars = doc.create_text("x");
    doc.append(p, &chars).unwrap();
    let root = doc.root_id();
    doc.append(root, &[p]).unwrap();
    doc.take_changes();

    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();
    let p_ext = engine.get_external_nodes(p)[0];
    dom.add_class(p_ext, "animating").unwrap();
    dom.take_records();

    doc.update_modifiers(p, |m| {
        let attributes = m.attributes_mut();
        attributes.remove_class("managed");
        attributes.add_class("other");
    })
    .unwrap();
    let dirty = doc.take_changes();
    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();

    assert_eq!(dom.classes(p_ext), vec!["animating".to_string(), "other".to_string()]);
    assert_eq!(report.mutations, 2);
    assert!(dom
        .take_records()
        .iter()
        .all(|r| matches!(r, MutationRecord::Attributes { name, .. } if name == "class")));
}

#[tokio::test]
async fn test_foreign_style_survives_managed_change() {
    let mut doc = Document::new();
    let p = doc.create(NodeKind::container("p"));
    doc.update_modifiers(p, |m| m.attributes_mut().set_style("color", "red")).unwrap();
    let chars = doc.create_text("x");
    doc.append(p, &chars).unwrap();
    let root = doc.root_id();
    doc.append(root, &[p]).unwrap();
    doc.take_changes();

    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();
    let p_ext = engine.get_external_nodes(p)[0];
    dom.set_style(p_ext, "transition", "opacity 1s").unwrap();
    dom.take_records();

    doc.update_modifiers(p, |m| m.attributes_mut().set_style("color", "blue")).unwrap();
    let dirty = doc.take_changes();
    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();

    assert_eq!(dom.style_value(p_ext, "transition"), Some("opacity 1s".to_string()));
    assert_eq!(dom.style_value(p_ext, "color"), Some("blue".to_string()));
    assert_eq!(report.mutations, 1);
    assert!(dom
        .take_records()
        .iter()
        .all(|r| matches!(r, MutationRecord::Attributes { name, .. } if name == "style")));
}

async fn fresh_html(doc: &Document) -> String {
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(doc, &mut dom, None).await.unwrap();
    dom.inner_html(mount)
}

#[tokio::test]
async fn test_edge_space_follows_new_and_removed_siblings() {
    let mut doc = paragraph("a ");
    let p = first_child(&doc);
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p>a\u{a0}</p>");

    let img = doc.create(NodeKind::atomic("img"));
    doc.append(p, &[img]).unwrap();
    let dirty = doc.take_changes();
    engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p>a <img></p>");
    assert_eq!(dom.inner_html(mount), fresh_html(&doc).await);

    doc.remove(img).unwrap();
    let dirty = doc.take_changes();
    engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p>a\u{a0}</p>");
    assert_eq!(dom.inner_html(mount), fresh_html(&doc).await);
}

#[tokio::test]
async fn test_foreign_children_kept_until_marked() {
    let mut doc = paragraph("ab");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let p = first_child(&doc);
    let p_ext = engine.get_external_nodes(p)[0];
    let foreign = dom.create_element("span");
    dom.append_child(p_ext, foreign).unwrap();

    let c = doc.create_text("c");
    doc.append(p, &c).unwrap();
    let dirty = doc.take_changes();
    engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(dom.inner_html(p_ext), "abc<span></span>");

    engine.mark_externally_mutated(&HashSet::from([p_ext]));
    let report = engine.redraw(&doc, &mut dom, Some(&[])).await.unwrap();
    assert_eq!(report.mutations, 1);
    assert_eq!(dom.inner_html(p_ext), "abc");
    assert!(!dom.is_connected(foreign));
}

#[tokio::test]
async fn test_externally_mutated_text_is_restored() {
    let doc = paragraph("abc");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let chars = doc.node(first_child(&doc)).unwrap().child_ids().to_vec();
    let text = engine.text_span(chars[0]).unwrap().text;

    dom.set_text(text, "abX").unwrap();
    engine.mark_externally_mutated(&HashSet::from([text]));
    let report = engine.redraw(&doc, &mut dom, Some(&[])).await.unwrap();
    assert_eq!(report.mutations, 1);
    assert_eq!(dom.text(text), Some("abc"));

    // already matching: left untouched
    engine.mark_externally_mutated(&HashSet::from([text]));
    let report = engine.redraw(&doc, &mut dom, Some(&[])).await.unwrap();
    assert_eq!(report.mutations, 0);
}

#[tokio::test]
async fn test_replaced_container_moves_text() {
    let mut doc = paragraph("ab");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let p = first_child(&doc);
    let chars = doc.node(p).unwrap().child_ids().to_vec();
    let p_ext = engine.get_external_nodes(p)[0];
    let text = engine.text_span(chars[0]).unwrap().text;

    let h1 = doc.create(NodeKind::container("h1"));
    let root = doc.root_id();
    doc.insert_before(root, h1, p).unwrap();
    let moved = doc.empty(p).unwrap();
    doc.append(h1, &moved).unwrap();
    doc.remove(p).unwrap();
    let dirty = doc.take_changes();

    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<h1>ab</h1>");
    assert_eq!(engine.text_span(chars[0]).unwrap().text, text);
    assert!(!dom.is_connected(p_ext));
    assert!(engine.get_external_nodes(p).is_empty());
    assert!(engine.get_nodes(p_ext).is_empty());
    assert_eq!(report.discarded, 1);
}

/// Renders `widget` atoms as a span, or as nothing while `hidden` is set
struct Widget;

#[async_trait(?Send)]
impl Renderer for Widget {
    fn name(&self) -> &str {
        "widget"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        node.is_atomic() && node.name() == "widget"
    }

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        let hidden = node
            .modifiers()
            .attributes()
            .map_or(false, |a| a.get("hidden").is_some());
        Ok(if hidden {
            RenderDescription::empty()
        } else {
            RenderDescription::element("span").with_attr("class", "widget")
        })
    }
}

#[tokio::test]
async fn test_empty_to_content_is_one_mutation_each_way() {
    let outline = Outline::parse(r#"[{ "container": "p", "children": [{ "atomic": "widget", "attributes": { "hidden": "" } }] }]"#)
        .unwrap();
    let mut doc = Document::from_outline(&outline).unwrap();
    let widget = doc.root().first_descendant(|n| n.is_atomic()).unwrap().id();

    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.register(Widget);
    engine.redraw(&doc, &mut dom, None).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p></p>");
    assert!(engine.get_external_nodes(widget).is_empty());

    doc.update_modifiers(widget, |m| m.attributes_mut().remove("hidden")).unwrap();
    let dirty = doc.take_changes();
    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(report.mutations, 1);
    assert_eq!(dom.inner_html(mount), r#"<p><span class="widget"></span></p>"#);

    doc.update_modifiers(widget, |m| m.attributes_mut().set("hidden", "")).unwrap();
    let dirty = doc.take_changes();
    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(report.mutations, 1);
    assert_eq!(dom.inner_html(mount), "<p></p>");
}

/// Section renderer that yields to the runtime and logs its hooks
struct Section {
    log: Rc<RefCell<Vec<(&'static str, ExternalId)>>>,
}

#[async_trait(?Send)]
impl Renderer for Section {
    fn name(&self) -> &str {
        "section"
    }

    fn predicate(&self, node: NodeRef<'_>) -> bool {
        node.is_container() && node.name() == "section"
    }

    async fn render(&self, node: NodeRef<'_>) -> Result<RenderDescription, RenderError> {
        tokio::task::yield_now().await;
        let attach = self.log.clone();
        let detach = self.log.clone();
        Ok(RenderDescription::element("section")
            .with_children(node.children(any).iter().map(|c| RenderDescription::node(c.id())))
            .on_attach(move |ext| attach.borrow_mut().push(("attach", ext)))
            .on_detach(move |ext| detach.borrow_mut().push(("detach", ext))))
    }
}

#[tokio::test]
async fn test_hooks_fire_on_build_and_drop_only() {
    let outline = Outline::parse(
        r#"[
            { "container": "section", "children": [{ "text": "a" }] },
            { "container": "p", "children": [{ "text": "b" }] }
        ]"#,
    )
    .unwrap();
    let mut doc = Document::from_outline(&outline).unwrap();
    let section = first_child(&doc);
    let p = doc.node(section).unwrap().next_sibling(any).unwrap().id();

    let log = Rc::new(RefCell::new(Vec::new()));
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.register(Section { log: log.clone() });
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let section_ext = engine.get_external_nodes(section)[0];
    assert_eq!(*log.borrow(), vec![("attach", section_ext)]);

    // moving keeps both external nodes and fires nothing
    let p_ext = engine.get_external_nodes(p)[0];
    let root = doc.root_id();
    doc.insert_before(root, p, section).unwrap();
    let dirty = doc.take_changes();
    engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p>b</p><section>a</section>");
    assert_eq!(engine.get_external_nodes(section), &[section_ext]);
    assert_eq!(engine.get_external_nodes(p), &[p_ext]);
    assert_eq!(log.borrow().len(), 1);

    doc.remove(section).unwrap();
    let dirty = doc.take_changes();
    engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(dom.inner_html(mount), "<p>b</p>");
    assert_eq!(*log.borrow(), vec![("attach", section_ext), ("detach", section_ext)]);
}

#[tokio::test]
async fn test_redraw_fails_without_mount() {
    let doc = paragraph("a");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    dom.remove(mount).unwrap();
    let err = engine.redraw(&doc, &mut dom, None).await.unwrap_err();
    assert!(matches!(err, RedrawError::Impossible { mount: m, .. } if m == mount));
    assert!(err.to_string().contains("impossible to redraw"));
}

#[tokio::test]
async fn test_markers_never_reach_the_external_tree() {
    let mut doc = paragraph("ab");
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(&doc, &mut dom, None).await.unwrap();

    let chars = doc.node(first_child(&doc)).unwrap().child_ids().to_vec();
    doc.set_selection(vellum_document::Point::after(chars[0]), vellum_document::Point::after(chars[1]))
        .unwrap();
    let dirty = doc.take_changes();
    let report = engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
    assert_eq!(report.mutations, 0);
    assert_eq!(dom.inner_html(mount), "<p>ab</p>");
}

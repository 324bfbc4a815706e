//! Property tests for incremental redraws.
//!
//! Random edits are applied to a small document of paragraphs. After every
//! edit the engine redraws only the changed nodes, and the result must match
//! a full redraw of the same document by a fresh engine.

use proptest::prelude::*;
use vellum_document::{any, Document, Modifier, NodeId, NodeKind, Outline};
use vellum_dom::{EngineConfig, ExternalDom, ExternalId, Reconciler};

#[derive(Debug, Clone)]
enum Edit {
    InsertChar { paragraph: usize, at: usize, value: char },
    InsertImage { paragraph: usize, at: usize },
    Remove { paragraph: usize, at: usize },
    ToggleBold { paragraph: usize, at: usize },
}

fn edit() -> impl Strategy<Value = Edit> {
    let pick = || (0usize..8, 0usize..16);
    prop_oneof![
        (pick(), prop::sample::select(vec!['a', 'b', ' ']))
            .prop_map(|((paragraph, at), value)| Edit::InsertChar { paragraph, at, value }),
        pick().prop_map(|(paragraph, at)| Edit::InsertImage { paragraph, at }),
        pick().prop_map(|(paragraph, at)| Edit::Remove { paragraph, at }),
        pick().prop_map(|(paragraph, at)| Edit::ToggleBold { paragraph, at }),
    ]
}

fn mounted() -> (ExternalDom, ExternalId) {
    let mut dom = ExternalDom::new();
    let mount = dom.create_element("div");
    let body = dom.root();
    dom.append_child(body, mount).unwrap();
    (dom, mount)
}

fn paragraphs(doc: &Document) -> Vec<NodeId> {
    doc.root().children(any).iter().map(|n| n.id()).collect()
}

fn children(doc: &Document, parent: NodeId) -> Vec<NodeId> {
    doc.node(parent)
        .map(|p| p.children(any).iter().map(|n| n.id()).collect())
        .unwrap_or_default()
}

fn apply(doc: &mut Document, edit: &Edit) {
    let ps = paragraphs(doc);
    let pick = |index: usize| ps[index % ps.len()];
    match *edit {
        Edit::InsertChar { paragraph, at, value } => {
            let p = pick(paragraph);
            let nodes = doc.create_text(&value.to_string());
            insert(doc, p, at, nodes[0]);
        }
        Edit::InsertImage { paragraph, at } => {
            let p = pick(paragraph);
            let img = doc.create(NodeKind::atomic("img"));
            insert(doc, p, at, img);
        }
        Edit::Remove { paragraph, at } => {
            let kids = children(doc, pick(paragraph));
            if !kids.is_empty() {
                doc.remove(kids[at % kids.len()]).unwrap();
            }
        }
        Edit::ToggleBold { paragraph, at } => {
            let kids = children(doc, pick(paragraph));
            if !kids.is_empty() {
                doc.update_modifiers(kids[at % kids.len()], |m| m.toggle(Modifier::format("b")))
                    .unwrap();
            }
        }
    }
}

fn insert(doc: &mut Document, parent: NodeId, at: usize, node: NodeId) {
    let kids = children(doc, parent);
    match kids.get(at % (kids.len() + 1)) {
        Some(reference) => doc.insert_before(parent, node, *reference).unwrap(),
        None => doc.append(parent, &[node]).unwrap(),
    }
}

async fn full_html(doc: &Document) -> String {
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    engine.redraw(doc, &mut dom, None).await.unwrap();
    dom.inner_html(mount)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn incremental_redraw_matches_full_redraw(
        texts in prop::collection::vec("[ab ]{0,5}", 1..4),
        edits in prop::collection::vec(edit(), 1..16),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let outline: Vec<Outline> = texts
                .iter()
                .map(|text| Outline::container("p", vec![Outline::text(text.as_str())]))
                .collect();
            let mut doc = Document::from_outline(&outline).unwrap();
            let (mut dom, mount) = mounted();
            let mut engine = Reconciler::new(mount, EngineConfig::default());
            engine.redraw(&doc, &mut dom, None).await.unwrap();

            for edit in &edits {
                apply(&mut doc, edit);
                let dirty = doc.take_changes();
                engine.redraw(&doc, &mut dom, Some(&dirty)).await.unwrap();
                assert_eq!(dom.inner_html(mount), full_html(&doc).await, "after {:?}", edit);
            }

            let settled = engine.redraw(&doc, &mut dom, None).await.unwrap();
            assert_eq!(settled.mutations, 0);
        });
    }
}

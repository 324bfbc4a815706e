use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;
use vellum_document::{any, Document, Outline};
use vellum_dom::{EngineConfig, ExternalDom, ExternalId, Reconciler};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn generate(paragraphs: usize) -> Document {
    let outline: Vec<Outline> = (0..paragraphs)
        .map(|i| {
            Outline::container(
                "p",
                vec![
                    Outline::text(format!("paragraph {i} with some  text ")),
                    Outline::formatted("bold", &["b"]),
                    Outline::text(" and a tail"),
                ],
            )
        })
        .collect();
    Document::from_outline(&outline).unwrap()
}

fn mounted() -> (ExternalDom, ExternalId) {
    let mut dom = ExternalDom::new();
    let mount = dom.create_element("div");
    let body = dom.root();
    dom.append_child(body, mount).unwrap();
    (dom, mount)
}

fn full_redraw(c: &mut Criterion) {
    let rt = runtime();
    let doc = generate(200);

    c.bench_function("full_redraw_200_paragraphs", |b| {
        b.iter(|| {
            let (mut dom, mount) = mounted();
            let mut engine = Reconciler::new(mount, EngineConfig::default());
            rt.block_on(engine.redraw(black_box(&doc), &mut dom, None)).unwrap()
        })
    });
}

fn incremental_redraw(c: &mut Criterion) {
    let rt = runtime();
    let mut doc = generate(200);
    let (mut dom, mount) = mounted();
    let mut engine = Reconciler::new(mount, EngineConfig::default());
    rt.block_on(engine.redraw(&doc, &mut dom, None)).unwrap();

    let paragraph = doc.root().children(any)[100].id();

    c.bench_function("incremental_redraw_one_character", |b| {
        b.iter(|| {
            let chars = doc.create_text("x");
            doc.append(paragraph, &chars).unwrap();
            let dirty = doc.take_changes();
            rt.block_on(engine.redraw(&doc, &mut dom, Some(&dirty))).unwrap();
            doc.remove(chars[0]).unwrap();
            let dirty = doc.take_changes();
            rt.block_on(engine.redraw(&doc, &mut dom, Some(&dirty))).unwrap()
        })
    });
}

criterion_group!(benches, full_redraw, incremental_redraw);
criterion_main!(benches);

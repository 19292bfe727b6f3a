use criterion::{criterion_group, criterion_main, Criterion};
use purifier::{ConfigStore, Purifier};
use std::hint::black_box;

/// A document that needs a bit of everything: foreign elements, misnested tags, lists, tables
/// and attributes that fail validation.
fn sample_document(paragraphs: usize) -> String {
    let mut html = String::from("<h1>Title</h1>");
    for i in 0..paragraphs {
        html.push_str(&format!(
            r#"<p class="intro" onclick="steal()">Paragraph {i} with <b>bold <i>and</b> italic</i>
<a href="http://example.com/{i}">a link</a> and <a href="javascript:alert({i})">a bad one</a>.
<div>block inside a paragraph</div><script>alert({i})</script>
<ul>loose<li>one<li>two</ul><table><td>cell</td></table><font color="red">old</font>"#
        ));
    }
    html
}

fn purify_documents(c: &mut Criterion) {
    let mut group = c.benchmark_group("Purify");
    group.significance_level(0.1).sample_size(100);

    let purifier = Purifier::from_store(&ConfigStore::new().unwrap()).unwrap();

    let small = sample_document(1);
    group.bench_function("small document", |b| {
        b.iter(|| purifier.purify(black_box(&small)))
    });

    let large = sample_document(200);
    group.bench_function("large document", |b| {
        b.iter(|| purifier.purify(black_box(&large)))
    });

    group.finish();
}

fn purify_with_injectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("Purify");
    group.significance_level(0.1).sample_size(100);

    let store = ConfigStore::new().unwrap();
    for key in [
        "autoformat.auto_paragraph",
        "autoformat.linkify",
        "autoformat.remove_empty",
    ] {
        store.set_from_str(key, "true").unwrap();
    }
    let purifier = Purifier::from_store(&store).unwrap();

    let text = "Some text with a link to http://example.com/ in it.\n\n".repeat(200);
    group.bench_function("injectors", |b| {
        b.iter(|| purifier.purify(black_box(&text)))
    });

    group.finish();
}

criterion_group!(benches, purify_documents, purify_with_injectors);
criterion_main!(benches);

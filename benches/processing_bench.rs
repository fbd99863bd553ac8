//! Extraction benchmarks for ddg-proxy
//!
//! Measures result-page parsing, main content extraction and sanitisation
//! on synthetic pages of realistic size.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ddg_proxy::extraction::{MainContentExtractor, SearchResultExtractor};
use ddg_proxy::processing::TextSanitizer;

fn results_page(count: usize) -> String {
    let mut page = String::from("<html><body><div id=\"links\">");
    for i in 0..count {
        page.push_str(&format!(
            r#"<div class="result"><h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fsite{i}.example%2Fpage&amp;rut=x">Result <b>{i}</b></a></h2>
<a class="result__snippet" href="https://site{i}.example/page">Snippet text for result {i} with &quot;quotes&quot;</a></div>"#
        ));
    }
    page.push_str("</div></body></html>");
    page
}

fn article_page(paragraphs: usize) -> String {
    let mut page = String::from(
        "<html><head><script>var x = 1;</script><style>p{}</style></head><body>\
         <header>Site</header><nav><a href=\"/\">Home</a></nav><div class=\"content\">",
    );
    for i in 0..paragraphs {
        page.push_str(&format!(
            "<h2>Section {i}</h2><p>Paragraph {i} &amp; some <em>emphasis</em>.</p>\
             <ul><li>Point one</li><li>Point two</li></ul>"
        ));
    }
    page.push_str("</div><footer>Footer</footer></body></html>");
    page
}

fn search_extraction_benchmark(c: &mut Criterion) {
    let extractor = SearchResultExtractor::new();
    let mut group = c.benchmark_group("search_extraction");

    for count in [10, 30, 100] {
        let page = results_page(count);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &page, |b, page| {
            b.iter(|| extractor.extract(black_box(page), 10))
        });
    }

    group.finish();
}

fn content_extraction_benchmark(c: &mut Criterion) {
    let extractor = MainContentExtractor::new();
    let mut group = c.benchmark_group("content_extraction");

    for paragraphs in [10, 100, 1000] {
        let page = article_page(paragraphs);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(paragraphs),
            &page,
            |b, page| b.iter(|| extractor.extract(black_box(page))),
        );
    }

    group.finish();
}

fn sanitize_benchmark(c: &mut Criterion) {
    let sanitizer = TextSanitizer::shared();
    let page = article_page(100);

    c.bench_function("sanitize", |b| {
        b.iter(|| sanitizer.sanitize(black_box(&page)))
    });
    c.bench_function("render_structured", |b| {
        b.iter(|| sanitizer.render_structured(black_box(&page)))
    });
}

criterion_group!(
    benches,
    search_extraction_benchmark,
    content_extraction_benchmark,
    sanitize_benchmark
);
criterion_main!(benches);

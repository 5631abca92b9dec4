//! Benchmarks for admin response parsing and log rendering.
//!
//! Run with: cargo bench --bench parsing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use coreguard::notify::LogEntry;
use coreguard::schema::{compare_versions, extract_schema_version};
use coreguard::stats::{parse_mbeans, StatsSummary};

fn mbeans_body(categories: usize) -> Value {
    let mut list = Vec::with_capacity(categories * 2 + 2);
    for i in 0..categories {
        list.push(json!(format!("CATEGORY{i}")));
        list.push(json!({"handler": {"class": "org.apache.solr.handler.Dummy", "stats": {"requests": i}}}));
    }
    list.push(json!("UPDATE"));
    list.push(json!({"updateHandler": {"stats": {
        "UPDATE.updateHandler.docsPending": 12,
        "UPDATE.updateHandler.softAutoCommitMaxTime": 15000,
        "UPDATE.updateHandler.deletesById": 4,
        "UPDATE.updateHandler.deletesByQuery": 1
    }}}));
    json!({ "solr-mbeans": list })
}

fn schema_xml(fields: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<schema name="drupal-8.x" version="1.6">
  <types>
    <fieldType name="string" class="solr.StrField"/>
    <fieldType name="text" class="solr.TextField"/>
  </types>
  <fields>
"#,
    );
    for i in 0..fields {
        xml.push_str(&format!(
            "    <field name=\"f{i}\" type=\"string\" indexed=\"true\" stored=\"true\"/>\n"
        ));
    }
    xml.push_str("  </fields>\n</schema>\n");
    xml
}

fn bench_parse_mbeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats/mbeans");

    for categories in [4, 32] {
        let body = mbeans_body(categories);
        group.throughput(Throughput::Elements(categories as u64 + 1));
        group.bench_with_input(BenchmarkId::new("parse", categories), &body, |b, body| {
            b.iter(|| black_box(parse_mbeans(body)))
        });
    }

    let mbeans = mbeans_body(8);
    let luke = json!({"index": {"numDocs": 120_000}});
    group.bench_function("summary", |b| {
        b.iter(|| {
            black_box(StatsSummary::from_responses(
                &mbeans,
                &luke,
                Some("1.6".to_string()),
            ))
        })
    });

    group.finish();
}

fn bench_schema_version(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema/version");

    for fields in [10, 500] {
        let xml = schema_xml(fields);
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::new("extract", fields), &xml, |b, xml| {
            b.iter(|| black_box(extract_schema_version(xml)))
        });
    }

    group.bench_function("compare", |b| {
        b.iter(|| black_box(compare_versions(black_box("1.6.2"), black_box("1.6"))))
    });

    group.finish();
}

fn bench_log_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/render");

    let entry = LogEntry::info("Attempting core reload (attempt @attempt of @max) for core: @core")
        .with("attempt", 2)
        .with("max", 3)
        .with("core", "main");
    group.bench_function("three_params", |b| b.iter(|| black_box(entry.render())));

    let unbound = LogEntry::warning("Schema version mismatch. Expected: @expected, Found: @current");
    group.bench_function("unbound", |b| b.iter(|| black_box(unbound.render())));

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_mbeans,
    bench_schema_version,
    bench_log_render
);
criterion_main!(benches);

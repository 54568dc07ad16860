//! Table Markup Benchmarks
//!
//! Benchmarks for header indexing and row parsing of rendered tables.
//!
//! Run with: `cargo bench --bench header_parse`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use probar_pages::table::{parse_table_row, parse_table_thead, TEXT_KEY};

fn header_markup(columns: usize, grouped: bool) -> String {
    let mut markup = String::from("<tr>");
    if grouped {
        markup.push_str(r#"<th rowspan="2">Id</th>"#);
        let _ = write!(markup, r#"<th colspan="{columns}">Details</th></tr><tr>"#);
    }
    for i in 0..columns {
        let _ = write!(markup, r#"<th data-field="f{i}">Column {i}</th>"#);
    }
    markup.push_str("</tr>");
    markup
}

fn row_markup(columns: usize) -> String {
    let mut markup = String::from("<tr>");
    for i in 0..columns {
        let _ = write!(markup, "<td><span>value &amp; {i}</span></td>");
    }
    markup.push_str("</tr>");
    markup
}

fn bench_header_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_parsing");
    let tracked: HashSet<String> = std::iter::once("data-field".to_string()).collect();

    for columns in [5_usize, 20, 80] {
        for grouped in [false, true] {
            let markup = header_markup(columns, grouped);
            let id = format!("{columns}_cols{}", if grouped { "_grouped" } else { "" });
            group.bench_with_input(BenchmarkId::from_parameter(id), &markup, |bench, m| {
                bench.iter(|| {
                    let index = parse_table_thead(black_box(m), TEXT_KEY, &tracked).unwrap();
                    black_box(index);
                });
            });
        }
    }

    group.finish();
}

fn bench_row_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_parsing");

    for columns in [5_usize, 20, 80] {
        let markup = row_markup(columns);
        group.bench_with_input(BenchmarkId::from_parameter(columns), &markup, |bench, m| {
            bench.iter(|| {
                let values = parse_table_row(black_box(m)).unwrap();
                black_box(values);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_header_parsing, bench_row_parsing);
criterion_main!(benches);

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quire::{
    PositionHint, RawOutlineNode, ReconcileConfig, extract_table_of_contents, reconcile_outline,
    split_text_by_chapters, validate_and_fix_chapter_positions,
};

/// Markdown-ish document with `chapters` chapters of 40 body lines each
fn document(chapters: usize) -> String {
    let mut text = String::new();
    for chapter in 0..chapters {
        text.push_str(&format!("# Chapter {chapter}\n"));
        for line in 0..40 {
            if line % 10 == 0 {
                text.push_str(&format!("## Section {chapter}.{line}\n"));
            }
            text.push_str("the quick brown fox jumps over the lazy dog again and again.\n");
        }
    }
    text
}

fn benchmark_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("toc_extraction");

    for chapters in [10, 100, 500] {
        let text = document(chapters);
        group.bench_with_input(BenchmarkId::new("extract", chapters), &text, |b, text| {
            b.iter(|| black_box(extract_table_of_contents(black_box(text))))
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("toc_pipeline");

    for chapters in [10, 100] {
        let text = document(chapters);
        group.bench_with_input(
            BenchmarkId::new("extract_validate_split", chapters),
            &text,
            |b, text| {
                b.iter(|| {
                    let toc = extract_table_of_contents(text);
                    let toc = validate_and_fix_chapter_positions(&toc, text);
                    black_box(split_text_by_chapters(text, &toc, "Full Text"))
                })
            },
        );
    }

    group.finish();
}

fn benchmark_reconciliation(c: &mut Criterion) {
    let mut group = c.benchmark_group("outline_reconciliation");
    let config = ReconcileConfig::default();

    for chapters in [10, 100] {
        let text = document(chapters);
        // Every other title is unknown to the text and has to be interpolated
        let outline: Vec<RawOutlineNode> = (0..chapters)
            .map(|chapter| {
                let title = if chapter % 2 == 0 {
                    format!("Chapter {chapter}")
                } else {
                    format!("Untitled page {chapter}")
                };
                RawOutlineNode::new(title, 1).with_hint(PositionHint::Ordinal(chapter as i64))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("reconcile", chapters),
            &(text, outline),
            |b, (text, outline)| {
                b.iter(|| black_box(reconcile_outline(black_box(outline), text, &config)))
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_extraction,
    benchmark_pipeline,
    benchmark_reconciliation
);
criterion_main!(benches);

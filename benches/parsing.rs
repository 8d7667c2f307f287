use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gitscope::git::parser::{parse_log, parse_refs, parse_status};
use gitscope::GraphBuilder;

const FS: char = '\u{1f}';
const RS: char = '\u{1e}';

fn generate_log(num_commits: usize) -> String {
    let mut output = String::new();
    for i in 0..num_commits {
        let parents = if i == 0 {
            String::new()
        } else {
            format!("{:040x}", i - 1)
        };
        output.push_str(&format!(
            "{:040x}{FS}{parents}{FS}{:040x}{FS}Alice{FS}alice@example.com{FS}{}{FS}Alice{FS}alice@example.com{FS}{}{FS}Commit message {}{RS}\n",
            i,
            i + 1_000_000,
            1_700_000_000 + i,
            1_700_000_000 + i,
            i
        ));
    }
    output
}

fn generate_status(num_files: usize) -> String {
    let mut output = String::new();
    for i in 0..num_files {
        let line = match i % 3 {
            0 => format!("M  file_{i}.rs\n"),
            1 => format!(" M file_{i}.rs\n"),
            _ => format!("?? file_{i}.rs\n"),
        };
        output.push_str(&line);
    }
    output
}

const REF_LIST: &str = "refs/heads/main\u{1f}aaa\u{1f}\u{1f}*\n\
                        refs/heads/feature\u{1f}bbb\u{1f}\u{1f} \n\
                        refs/tags/v1.0\u{1f}ccc\u{1f}ddd\u{1f} \n\
                        refs/remotes/origin/main\u{1f}aaa\u{1f}\u{1f} \n";

fn bench_parse_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_log");

    for size in [10, 100, 1000] {
        let input = generate_log(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &input,
            |b, input| b.iter(|| parse_log(black_box(input))),
        );
    }

    group.finish();
}

fn bench_parse_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_status");

    for size in [10, 100, 1000] {
        let input = generate_status(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &input,
            |b, input| b.iter(|| parse_status(black_box(input))),
        );
    }

    group.finish();
}

fn bench_parse_refs(c: &mut Criterion) {
    c.bench_function("parse_refs", |b| {
        b.iter(|| parse_refs(black_box(REF_LIST)))
    });
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");

    for size in [100, 1000] {
        let records = parse_log(&generate_log(size)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &records,
            |b, records| b.iter(|| GraphBuilder::build(black_box(records.clone()))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_log,
    bench_parse_status,
    bench_parse_refs,
    bench_graph_build
);
criterion_main!(benches);

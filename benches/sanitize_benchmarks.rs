use audioloader::extractor::ytdlp::parse_progress_line;
use audioloader::utils::filename::sanitize_filename;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn benchmark_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Folder Name Sanitization");

    let titles = [
        ("clean", "Road Trip Mix 2024".to_string()),
        ("dirty", r#"  ..AC/DC: "Live" <Best> | Hits?*  .. "#.to_string()),
        ("long", "Night Drive / Synthwave: Vol. 3 ".repeat(32)),
    ];

    for (name, title) in &titles {
        group.bench_with_input(BenchmarkId::new("sanitize_filename", name), title, |b, title| {
            b.iter(|| sanitize_filename(black_box(title)))
        });
    }

    group.finish();
}

fn benchmark_progress_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Progress Line Parsing");

    let lines = [
        ("download", "[download]  42.5% of ~ 150.00MiB at  5.20MiB/s ETA 00:15"),
        ("extract", "[ExtractAudio] Destination: /music/Song.mp3"),
        ("other", "[youtube] abc123: Downloading webpage"),
    ];

    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::new("parse_progress_line", name), &line, |b, line| {
            b.iter(|| parse_progress_line(black_box(line)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_sanitize, benchmark_progress_parsing);
criterion_main!(benches);

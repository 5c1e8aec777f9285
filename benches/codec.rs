//! Benchmarks for bookmark encoding and decoding

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mac_bookmark::{decode, Bookmark, Date, Key, Toc, Url, Value};

fn sample(depth: usize) -> Bookmark {
    let root = Arc::new(Url::new("file:///"));
    let path: Vec<String> = (0..depth).map(|i| format!("dir{}", i)).collect();
    let cnids: Vec<i64> = (0..depth as i64).map(|i| 1000 + i).collect();
    Bookmark::builder()
        .put(Key::PATH, Value::array(path.clone()))
        .put(Key::CNID_PATH, Value::array(cnids))
        .put(Key::URL, Url::with_base(root.clone(), path.join("/")))
        .put(Key::VOLUME_URL, Url::with_base(root, "Volumes/Data/"))
        .put(Key::VOLUME_NAME, "Macintosh HD")
        .put(Key::VOLUME_UUID, "0A81F3B1-51D9-3335-B3E3-169C3640360D")
        .put(Key::FILE_CREATION_DATE, Date::from_seconds(337_219_200.0))
        .put(Key::SANDBOX_RO_EXTENSION, vec![0x5au8; 128])
        .extra_toc(2, Toc::new().put(Key::VOLUME_PATH, "/Volumes/Image"))
        .build()
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for depth in [4, 32, 256].iter() {
        let bookmark = sample(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &bookmark, |b, bookmark| {
            b.iter(|| black_box(bookmark.encode()))
        });
    }

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for depth in [4, 32, 256].iter() {
        let buf = sample(*depth).encode().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &buf, |b, buf| {
            b.iter(|| black_box(decode(black_box(buf))))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);

//! Performance benchmarks for FastSmap
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fast_smap::convert::{convert, ConversionOptions};
use fast_smap::core::{parse_ace_bytes, AssemblyIndex, MemoryStore, MethodTable, ObjKey};

/// A clone carrying `transcripts` three-exon transcripts and two ESTs per transcript
fn synthetic_ace(transcripts: usize) -> String {
    let length = transcripts as i64 * 1000 + 1000;
    let mut clone = format!("Sequence : \"clone\"\nLength {}\n", length);
    let mut objects = String::new();
    for i in 0..transcripts {
        let start = i as i64 * 1000 + 1;
        clone.push_str(&format!("Subsequence \"tx{}\" {} {}\n", i, start, start + 599));
        clone.push_str(&format!(
            "Homol DNA_homol \"est{}\" \"blat\" 95 {} {} 1 100\n",
            i,
            start,
            start + 99
        ));
        clone.push_str(&format!(
            "Homol DNA_homol \"est{}\" \"blat\" 95 {} {} 101 180\n",
            i,
            start + 200,
            start + 279
        ));
        clone.push_str(&format!("Confirmed_intron {} {} EST \"est{}\"\n", start + 100, start + 199, i));
        objects.push_str(&format!(
            "\nTranscript : \"tx{}\"\nMethod \"curated\"\nSource_Exons 1 100\nSource_Exons 201 280\n\
             Source_Exons 401 600\nCDS 1 270\n",
            i
        ));
    }
    objects.push_str("\nMethod : \"curated\"\n\nMethod : \"blat\"\nJoin_blocks\nMap_gaps\n");
    clone + &objects
}

fn load(transcripts: usize) -> MemoryStore {
    parse_ace_bytes(synthetic_ace(transcripts).as_bytes()).unwrap()
}

/// Benchmark .ace parsing
fn bench_ace_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ace_parsing");
    for size in [100usize, 1000] {
        let text = synthetic_ace(size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| black_box(parse_ace_bytes(black_box(text.as_bytes())).unwrap()))
        });
    }
    group.finish();
}

/// Benchmark building the assembly index
fn bench_index_build(c: &mut Criterion) {
    let store = load(1000);
    let root = ObjKey::new("Sequence", "clone");
    c.bench_function("index_build_1000", |b| {
        b.iter(|| black_box(AssemblyIndex::new(&store, black_box(&root), None).unwrap()))
    });
}

/// Benchmark full conversions
fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion");
    for size in [10usize, 100, 1000] {
        let store = load(size);
        let root = ObjKey::new("Sequence", "clone");
        let index = AssemblyIndex::new(&store, &root, None).unwrap();
        let methods = MethodTable::from_store(&store);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("forward", size), &size, |b, _| {
            b.iter(|| black_box(convert(&store, &index, &methods, &root, &ConversionOptions::default()).unwrap()))
        });
        let reverse = ConversionOptions { reverse: true, ..ConversionOptions::default() };
        group.bench_with_input(BenchmarkId::new("reverse", size), &size, |b, _| {
            b.iter(|| black_box(convert(&store, &index, &methods, &root, &reverse).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ace_parsing, bench_index_build, bench_conversion);
criterion_main!(benches);

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tyjson_core::{Machine, Options, SliceReader};
use tyjson_types::{ExpectedType, FieldDesc, RecordType, ScalarKind};
use tyjson_value::DefaultBuilder;

fn flat_record_type(field_count: usize) -> ExpectedType {
    let mut fields = BTreeMap::new();
    for i in 0..field_count {
        let name = format!("field_{i}");
        fields.insert(name.clone(), FieldDesc::new(&name, ExpectedType::Scalar(ScalarKind::Int), true));
    }
    ExpectedType::Record(RecordType::new(fields, None))
}

fn flat_record_json(field_count: usize) -> String {
    let mut out = String::from("{");
    for i in 0..field_count {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("\"field_{i}\":{i}"));
    }
    out.push('}');
    out
}

fn bench_flat_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_record");

    for field_count in [10, 100, 1000].iter() {
        let ty = flat_record_type(*field_count);
        let input = flat_record_json(*field_count);
        group.throughput(Throughput::Elements(*field_count as u64));
        group.bench_with_input(
            BenchmarkId::new("parse", field_count),
            &(ty, input),
            |b, (ty, input)| {
                let mut machine = Machine::new(DefaultBuilder, Options::default());
                b.iter(|| {
                    let mut reader = SliceReader::new(input);
                    black_box(machine.parse(&mut reader, ty).unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    for field_count in [100, 1000].iter() {
        let wanted = flat_record_type(1);
        let input = flat_record_json(*field_count);
        group.throughput(Throughput::Elements(*field_count as u64));
        group.bench_with_input(
            BenchmarkId::new("drop_unexpected_fields", field_count),
            &(wanted, input),
            |b, (ty, input)| {
                let mut machine = Machine::new(DefaultBuilder, Options::default());
                b.iter(|| {
                    let mut reader = SliceReader::new(input);
                    black_box(machine.parse(&mut reader, ty).unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_chunk_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_size");
    let ty = flat_record_type(500);
    let input = flat_record_json(500);

    for chunk_size in [16, 256, 4096].iter() {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("refill_granularity", chunk_size),
            chunk_size,
            |b, &chunk_size| {
                let mut machine = Machine::new(
                    DefaultBuilder,
                    Options {
                        chunk_size,
                        ..Options::default()
                    },
                );
                b.iter(|| {
                    let mut reader = SliceReader::new(&input);
                    black_box(machine.parse(&mut reader, &ty).unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_nested_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_arrays");
    let element = flat_record_type(3);
    let ty = ExpectedType::Array(tyjson_types::ArrayType::open(element));

    for size in [10, 100, 1000].iter() {
        let mut input = String::from("[");
        for i in 0..*size {
            if i > 0 {
                input.push(',');
            }
            input.push_str(&flat_record_json(3));
        }
        input.push(']');
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(
            BenchmarkId::new("parse", size),
            &input,
            |b, input| {
                let mut machine = Machine::new(DefaultBuilder, Options::default());
                b.iter(|| {
                    let mut reader = SliceReader::new(input);
                    black_box(machine.parse(&mut reader, &ty).unwrap());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_flat_record, bench_projection, bench_chunk_size, bench_nested_arrays);
criterion_main!(benches);

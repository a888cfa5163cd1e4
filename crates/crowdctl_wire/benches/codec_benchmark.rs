//! # Codec Benchmark
//!
//! Encoding and decoding cost of a realistic step response: one membership
//! list plus per-person positions.
//!
//! Run with: `cargo bench --package crowdctl_wire`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crowdctl_wire::constants::{CMD_SET_PERSON_VARIABLE, VAR_TARGET_LIST};
use crowdctl_wire::{Command, Frame, FrameReader, FrameWriter, TypedValue};

/// Builds a payload of `persons` typed positions preceded by an id list.
fn step_payload(persons: usize) -> Vec<u8> {
    let mut writer = FrameWriter::with_capacity(persons * 32);
    let ids: Vec<String> = (0..persons).map(|i| i.to_string()).collect();
    TypedValue::StringList(ids).encode(&mut writer).unwrap();
    for i in 0..persons {
        let f = i as f64;
        TypedValue::Position2D { x: f * 0.5, y: f }
            .encode(&mut writer)
            .unwrap();
    }
    writer.into_bytes()
}

fn bench_decode_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_step");

    for persons in [10, 100, 1_000] {
        let payload = step_payload(persons);
        group.bench_with_input(BenchmarkId::from_parameter(persons), &payload, |b, payload| {
            b.iter(|| {
                let mut reader = FrameReader::new(black_box(payload));
                let mut decoded = 0usize;
                while !reader.is_exhausted() {
                    black_box(reader.read_value().unwrap());
                    decoded += 1;
                }
                decoded
            });
        });
    }

    group.finish();
}

fn bench_encode_target_lists(c: &mut Criterion) {
    let targets = TypedValue::StringList(vec!["1".into(), "2".into(), "3".into()]);

    c.bench_function("encode_100_target_list_commands", |b| {
        b.iter(|| {
            let mut payload = FrameWriter::with_capacity(4096);
            for person in 0..100 {
                Command::variable(CMD_SET_PERSON_VARIABLE, VAR_TARGET_LIST, person.to_string())
                    .with_value(black_box(&targets))
                    .unwrap()
                    .encode_into(&mut payload)
                    .unwrap();
            }
            Frame::encode(payload.as_slice()).unwrap()
        });
    });
}

criterion_group!(benches, bench_decode_step, bench_encode_target_lists);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fmdmap::{IndexBuilder, NaturalMappingScheme, MappingScheme};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_sequence(rng: &mut StdRng, length: usize) -> Vec<u8> {
    (0..length).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn bench_index_queries(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let reference = random_sequence(&mut rng, 2000);
    let mut builder = IndexBuilder::new().sample_rate(8);
    builder.add_contig("bench", 0, 0, &reference).unwrap();
    let index = builder.build().unwrap();

    // Reads drawn from the reference with a sprinkle of substitutions.
    let mut reads: Vec<Vec<u8>> = Vec::new();
    for _ in 0..50 {
        let start = rng.gen_range(0..reference.len() - 100);
        let mut read = reference[start..start + 100].to_vec();
        for c in read.iter_mut() {
            if rng.gen_bool(0.01) {
                *c = b"ACGT"[rng.gen_range(0..4)];
            }
        }
        reads.push(read);
    }

    c.bench_function("count_100bp", |b| {
        b.iter(|| {
            for read in &reads {
                black_box(index.count(read).unwrap());
            }
        })
    });

    c.bench_function("map_right_100bp", |b| {
        b.iter(|| {
            for read in &reads {
                black_box(index.map_right(read, None, 20).unwrap());
            }
        })
    });

    let scheme = NaturalMappingScheme::new(&index, None, 20);
    c.bench_function("map_both_100bp", |b| {
        b.iter(|| {
            for read in &reads {
                black_box(scheme.map(read).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_index_queries);
criterion_main!(benches);

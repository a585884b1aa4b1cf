//! Criterion benchmarks for the particle integrator
//!
//! - Update: advancing a full drain-sized particle system one frame
//! - Poses: deriving spiral and burst-spiral poses for every visible particle

use coinfx_animation::{
    BurstSpiral, BurstSpiralTiming, Easing, FadeEnvelope, Particle, ParticleSystem, SpiralPath,
};
use coinfx_core::Point;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

// =============================================================================
// Test Data Generators
// =============================================================================

fn make_drain(count: usize) -> ParticleSystem<SpiralPath> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut system = ParticleSystem::with_capacity(count);
    for _ in 0..count {
        let path = SpiralPath {
            center: Point::new(206.0, 457.5),
            start_angle: rng.random::<f32>() * PI * 2.0,
            start_radius: 800.0 + rng.random::<f32>() * 200.0,
            rotation: PI / 2.0 + rng.random::<f32>() * 0.3,
            size: 120.0 + rng.random::<f32>() * 80.0,
            shrink: 0.8,
        };
        let particle = Particle::new(
            rng.random::<f32>() * 0.6,
            1.4 + rng.random::<f32>() * 0.8,
            Easing::EaseIn,
        );
        system.push(particle, path);
    }
    system
}

fn make_stream(count: usize) -> ParticleSystem<BurstSpiral> {
    let mut rng = StdRng::seed_from_u64(11);
    let mut system = ParticleSystem::with_capacity(count);
    for _ in 0..count {
        let path = BurstSpiral {
            source: Point::new(80.0, 700.0),
            target: Point::new(320.0, 140.0),
            burst_angle: rng.random::<f32>() * PI * 2.0,
            burst_radius: 30.0 + rng.random::<f32>() * 50.0,
            spiral_rotation: PI * 0.8 + rng.random::<f32>() * PI * 0.4,
            size: 24.0 + rng.random::<f32>() * 24.0,
            timing: BurstSpiralTiming::default(),
        };
        let particle = Particle::new(
            rng.random::<f32>() * 0.3,
            0.8 + rng.random::<f32>() * 0.4,
            Easing::Linear,
        );
        system.push(particle, path);
    }
    system
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("particle_update");
    for count in [250usize, 2000, 8000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut system = make_drain(count);
            b.iter(|| black_box(system.update(black_box(0.9))));
        });
    }
    group.finish();
}

fn bench_poses(c: &mut Criterion) {
    let fade = FadeEnvelope::default();

    let mut drain = make_drain(2000);
    drain.update(0.9);
    c.bench_function("spiral_poses_2000", |b| {
        b.iter(|| {
            for (sample, path) in drain.visible() {
                black_box(path.pose(sample, &fade));
            }
        })
    });

    let mut stream = make_stream(25);
    stream.update(0.5);
    c.bench_function("burst_spiral_poses_25", |b| {
        b.iter(|| {
            for (sample, path) in stream.visible() {
                black_box(path.pose(sample));
            }
        })
    });
}

criterion_group!(benches, bench_update, bench_poses);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use synth_player_core::{
    distribute_event_times, interpolate_samples, parse_records, ChannelConfig, Engine,
    EngineConfig, EventId, Inputs, KeyedCurve, MemorySource, TimeValueSample,
};

fn zigzag(len: usize) -> Vec<TimeValueSample> {
    (0..len)
        .map(|i| {
            let value = if i % 2 == 0 { 1.0 } else { -0.5 };
            TimeValueSample::new(i as f64 * 0.25, value)
        })
        .collect()
}

fn series_text(len: usize) -> String {
    zigzag(len)
        .iter()
        .map(|s| format!("{}_{}\n", s.time, s.value))
        .collect()
}

fn bench_interpolation(c: &mut Criterion) {
    let samples = zigzag(256);
    c.bench_function("interpolate_256_samples", |b| {
        b.iter(|| interpolate_samples(black_box(&samples)))
    });
}

fn bench_schedule(c: &mut Criterion) {
    let curve = KeyedCurve::linear(0.25, 2.0);
    c.bench_function("distribute_1k_events", |b| {
        b.iter(|| distribute_event_times(black_box(1000), 30.0, &curve))
    });
}

fn bench_presets(c: &mut Criterion) {
    let text: String = (0..500)
        .map(|i| format!("{i},Param{},{}.5,-0.1,0.1\n", i % 50, i % 7))
        .collect();
    c.bench_function("parse_500_preset_rows", |b| {
        b.iter(|| parse_records(black_box(&text)))
    });
}

fn bench_engine_tick(c: &mut Criterion) {
    let mut cfg = EngineConfig::default();
    cfg.events.count = 64;
    cfg.events.duration = 10.0;
    cfg.events.primary = Some(EventId::new("Hit"));
    cfg.events.secondary = Some(EventId::new("Tail"));
    let mut assets = MemorySource::new();
    for i in 0..8 {
        let locator = format!("ch{i}.txt");
        assets.insert(locator.clone(), series_text(64));
        cfg = cfg.with_channel(ChannelConfig::new(locator, format!("P{i}"), 0.0));
    }
    let mut engine = Engine::new(cfg);
    engine.play();

    c.bench_function("engine_tick_8_channels", |b| {
        b.iter(|| {
            let out = engine.update(black_box(1.0 / 60.0), Inputs::default(), &mut assets);
            if !engine.channels().iter().any(|ch| ch.is_active()) {
                engine.play();
            }
            out
        })
    });
}

criterion_group!(
    benches,
    bench_interpolation,
    bench_schedule,
    bench_presets,
    bench_engine_tick
);
criterion_main!(benches);

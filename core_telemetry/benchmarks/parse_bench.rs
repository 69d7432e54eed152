use core_telemetry::Snapshot;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn running_payload(events: usize) -> String {
    let recent_events: Vec<_> = (0..events)
        .map(|i| json!({"t": i as f64 * 0.5, "type": "elite_spawn", "enemy": "brute"}))
        .collect();
    let hp_timeline: Vec<f64> = (0..events).map(|i| 1000.0 - i as f64).collect();
    json!({
        "status": "running",
        "trial": 1,
        "total_trials": 10,
        "elapsed_s": 120.0,
        "duration_s": 300.0,
        "tower": {"hp": 800, "max_hp": 1000, "hp_pct": 0.8, "armor": 3, "regen_per_s": 1},
        "economy": {"gold": 300, "total_earned": 900, "total_spent": 600},
        "enemies": {"alive": 12, "breakdown": {"grunt": 10, "brute": 2}},
        "combat": {"total_damage_dealt": 10000, "cc_uptime_pct": 0.1},
        "kills_by_type": {"grunt": 80, "brute": 6},
        "recent_events": recent_events,
        "hp_timeline": hp_timeline,
    })
    .to_string()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for events in [0usize, 16, 128, 1024] {
        let payload = running_payload(events);
        group.bench_with_input(BenchmarkId::new("events", events), &payload, |b, payload| {
            b.iter(|| Snapshot::from_json_str(payload).expect("valid payload"))
        });
    }

    group.finish();
}

criterion_group!(parse_benches, bench_parse);
criterion_main!(parse_benches);

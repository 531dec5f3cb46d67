use synth_player_core::{
    interpolate_samples, interpolate_samples_at, parse_records, parse_samples, RowIssueKind,
    TimeValueSample,
};
use synth_player_fixtures::{curves, presets};

fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

#[test]
fn fixture_presets_parse_with_header_rejected() {
    let parsed = parse_records(&presets::text("warm-pad").expect("fixture"));
    let names: Vec<&str> = parsed.items.iter().map(|r| r.parameter.as_str()).collect();
    assert_eq!(names, vec!["Cutoff", "Resonance", "Attack", "Release"]);
    assert_eq!(parsed.report.malformed(), 1);
    assert_eq!(parsed.report.issues[0].line, 1);
}

#[test]
fn messy_preset_keeps_only_valid_unique_rows() {
    let parsed = parse_records(&presets::text("messy").expect("fixture"));
    let names: Vec<&str> = parsed.items.iter().map(|r| r.parameter.as_str()).collect();
    assert_eq!(names, vec!["Cutoff", "Drive"]);
    assert_eq!(parsed.report.duplicates(), 1);
    assert_eq!(parsed.report.malformed(), 4);
    assert!(parsed
        .report
        .issues
        .iter()
        .any(|i| i.kind == RowIssueKind::EmptyParameter));

    let (lo, hi) = parsed.items[1].value_range();
    assert!(approx(lo, 0.35, 1e-12) && approx(hi, 0.15, 1e-12));
}

#[test]
fn parsing_is_idempotent_and_collapses_repeats() {
    let text = presets::text("bright-lead").expect("fixture");
    assert_eq!(parse_records(&text).items, parse_records(&text).items);

    let row = "x,Cutoff,0.5,-0.1,0.1\n";
    let repeated = row.repeat(12);
    let parsed = parse_records(&repeated);
    assert_eq!(parsed.items.len(), 1);
    assert_eq!(parsed.report.duplicates(), 11);
}

#[test]
fn curve_fixtures_interpolate_at_one_hundred_per_second() {
    let parsed = parse_samples(&curves::text("cutoff-sweep").expect("fixture"));
    assert!(parsed.report.is_clean());
    let series = interpolate_samples(&parsed.items);
    assert_eq!(series.len(), 12);
    assert_eq!(series.get(0), Some(0.2));
    assert_eq!(series.get(5), Some(0.8));
    assert_eq!(series.last(), Some(0.5));
}

#[test]
fn noisy_curve_skips_bad_lines() {
    let parsed = parse_samples(&curves::text("with-noise").expect("fixture"));
    assert_eq!(
        parsed.items,
        vec![TimeValueSample::new(0.0, 0.0), TimeValueSample::new(0.03, 1.0)]
    );
    assert_eq!(parsed.report.issues.len(), 2);
}

#[test]
fn sign_change_splits_at_the_midpoint() {
    let samples = parse_samples("0_1.0\n1_-1.0\n").items;
    let series = interpolate_samples(&samples);
    let values = series.values();

    // [0, 0.5] runs 1.0 -> -1.0 in 50 steps, [0.5, 1] holds -1.0.
    assert_eq!(values.len(), 102);
    assert_eq!(values[0], 1.0);
    assert_eq!(values[25], 0.0);
    assert_eq!(values[50], -1.0);
    assert!(values[51..].iter().all(|&v| v == -1.0));
}

#[test]
fn crossing_value_is_the_smaller_magnitude_endpoint() {
    let samples = vec![TimeValueSample::new(0.0, -0.25), TimeValueSample::new(0.04, 2.0)];
    let values = interpolate_samples(&samples).into_vec();
    // Two steps to the midpoint, holding -0.25 there, then up to 2.0.
    assert_eq!(values, vec![-0.25, -0.25, -0.25, -0.25, 0.875, 2.0]);
}

#[test]
fn same_sign_endpoints_are_exact() {
    let samples = vec![TimeValueSample::new(0.0, 0.1), TimeValueSample::new(0.37, 0.7)];
    let series = interpolate_samples(&samples);
    assert_eq!(series.len(), 38);
    assert_eq!(series.get(0), Some(0.1));
    assert_eq!(series.last(), Some(0.7));
    let mut prev = 0.0;
    for v in series.values() {
        assert!(*v >= prev);
        prev = *v;
    }
}

#[test]
fn degenerate_segments_still_emit() {
    let same_time = vec![TimeValueSample::new(1.0, 0.5), TimeValueSample::new(1.0, 0.7)];
    assert_eq!(interpolate_samples(&same_time).into_vec(), vec![0.5, 0.7]);

    let backwards = vec![TimeValueSample::new(2.0, 0.5), TimeValueSample::new(1.0, 0.7)];
    assert_eq!(interpolate_samples(&backwards).len(), 2);

    assert!(interpolate_samples(&[TimeValueSample::new(0.0, 1.0)]).is_empty());
}

#[test]
fn resolution_is_configurable() {
    let samples = vec![TimeValueSample::new(0.0, 0.0), TimeValueSample::new(1.0, 1.0)];
    let coarse = interpolate_samples_at(&samples, 10.0);
    assert_eq!(coarse.len(), 11);
    assert!(approx(coarse.get(3).unwrap_or_default(), 0.3, 1e-12));
}

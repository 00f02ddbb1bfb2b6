//! Integration tests: config → event loop → smeared prediction → χ².

use std::sync::Arc;

use approx::assert_relative_eq;
use nx_core::RecordEvent;
use nx_hist::Histogram;
use nx_select::{BinClassifier, EventSelector, VariableSet};
use nx_xsec::{
    CovarianceChi2, IdentityConversion, LikelihoodPolicy, MeasurementConfig, RateConverter,
    SmearedMeasurement, SmearingMatrix, diagonal_chi2,
};

const BINNING: &str = "\
0 cos_mu in -1.0 0.0
0 p_mu   in  0.0 1.0
1 cos_mu in -1.0 0.0
1 p_mu   in  1.0 2.0
2 cos_mu in  0.0 1.0
2 p_mu   in  0.0 1.0
3 cos_mu in  0.0 1.0
3 p_mu   in  1.0 2.0
";

fn config_json() -> String {
    r#"{
        "name": "numu_cc",
        "variables": [
            {"name": "p_mu", "expr": "sqrt(px*px + pz*pz)"},
            {"name": "cos_mu", "expr": "pz / p_mu"}
        ],
        "bins": "binning.txt",
        "conversion": {"kind": "scale", "scale_factor": 0.5},
        "smearing": {"rows": 4, "cols": 4, "values": [
            0.9, 0.1, 0.0, 0.0,
            0.1, 0.9, 0.0, 0.0,
            0.0, 0.0, 0.8, 0.2,
            0.0, 0.0, 0.2, 0.8
        ]},
        "density": {"kind": "grid", "x_edges": [0.0, 1.0, 2.0], "y_edges": [-1.0, 0.0, 1.0]},
        "data": {"content": [1.0, 1.0, 2.0, 2.0], "errors": [0.5, 0.5, 0.5, 0.5]},
        "likelihood": {"kind": "data_errors"},
        "x_title": "p_mu [GeV]",
        "y_title": "events"
    }"#
    .to_string()
}

fn muon(p: f64, cos: f64) -> RecordEvent {
    let sin = (1.0 - cos * cos).sqrt();
    RecordEvent::new().with("px", p * sin).with("pz", p * cos)
}

fn events() -> Vec<RecordEvent> {
    let mut out = Vec::new();
    for i in 0..200 {
        let p = 0.05 + (i % 19) as f64 * 0.1;
        let cos = -0.95 + (i % 20) as f64 * 0.1;
        out.push(muon(p, cos));
    }
    out
}

fn measurement() -> (tempfile::TempDir, SmearedMeasurement) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("binning.txt"), BINNING).unwrap();
    let path = dir.path().join("numu_cc.json");
    std::fs::write(&path, config_json()).unwrap();
    let cfg = MeasurementConfig::from_path(&path).unwrap();
    let m = SmearedMeasurement::from_config(&cfg).unwrap();
    (dir, m)
}

#[test]
fn end_to_end() {
    let (_dir, mut m) = measurement();
    m.process_events(&events());
    assert_eq!(m.raw().entries, 200.0);
    let raw = m.raw().contents().to_vec();

    let pred = m.convert_event_rates().unwrap().clone();
    assert_eq!(pred.name, "numu_cc_prediction");
    assert_eq!(pred.x_title, "p_mu [GeV]");
    // Every 2D cell has area 1, so the density step leaves values unchanged.
    let expected = [
        0.5 * (0.9 * raw[0] + 0.1 * raw[1]),
        0.5 * (0.1 * raw[0] + 0.9 * raw[1]),
        0.5 * (0.8 * raw[2] + 0.2 * raw[3]),
        0.5 * (0.2 * raw[2] + 0.8 * raw[3]),
    ];
    for (got, want) in pred.contents().iter().zip(expected) {
        assert_relative_eq!(*got, want, max_relative = 1e-12);
    }
    let total: f64 = pred.contents().iter().sum();
    assert_relative_eq!(total, 0.5 * raw.iter().sum::<f64>(), max_relative = 1e-12);

    let chi2 = m.get_likelihood().unwrap();
    let diag = diagonal_chi2(m.data(), m.data_errors(), pred.contents()).unwrap();
    assert_relative_eq!(chi2, diag, max_relative = 1e-9);
    let p = m.p_value().unwrap();
    assert!((0.0..=1.0).contains(&p));

    let h2 = m.prediction_2d().unwrap();
    assert_eq!((h2.nx(), h2.ny()), (2, 2));

    let mut out = Vec::new();
    assert!(m.validate_outputs(&mut out, true));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[OK] numu_cc passed checks."), "{text}");
    assert!(text.contains("[OK] numu_cc_prediction passed checks."), "{text}");
}

#[test]
fn parallel_fill_matches_sequential() {
    let evs = events();
    let (_d1, mut seq) = measurement();
    let (_d2, mut par) = measurement();
    seq.process_events(&evs);
    par.process_events_par(&evs).unwrap();
    assert_eq!(seq.raw().entries, par.raw().entries);
    for (a, b) in seq.raw().contents().iter().zip(par.raw().contents()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9);
    }
    for (a, b) in seq.raw().errors().iter().zip(par.raw().errors()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9);
    }
}

fn overlapping_measurement() -> SmearedMeasurement {
    let classifier = BinClassifier::from_text("0 x in 0 2\n1 x in 1 3\n").unwrap();
    let selector = EventSelector::new(Arc::new(classifier), Arc::new(VariableSet::new(&[]).unwrap()));
    SmearedMeasurement::new(
        "overlap",
        selector,
        RateConverter::unsmeared(2),
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        LikelihoodPolicy::Diagonal,
    )
    .unwrap()
}

#[test]
fn parallel_fill_counts_overlapping_events() {
    let evs: Vec<RecordEvent> =
        (0..100).map(|i| RecordEvent::new().with("x", 1.0 + 0.009 * i as f64)).collect();
    let mut seq = overlapping_measurement();
    let mut par = overlapping_measurement();
    seq.process_events(&evs);
    par.process_events_par(&evs).unwrap();

    assert_eq!(seq.selector().overlapping_events(), 100);
    assert_eq!(par.selector().overlapping_events(), 100);
    assert_eq!(seq.raw().contents(), par.raw().contents());
    assert_eq!(seq.raw().entries, par.raw().entries);
}

#[test]
fn prediction_missing_until_converted() {
    let (_dir, mut m) = measurement();
    let mut out = Vec::new();
    assert!(!m.validate_outputs(&mut out, false));
    assert!(String::from_utf8(out).unwrap().contains("[FAIL] Histogram is absent."));
    assert!(m.prediction_2d().is_err());

    m.process_events(&events());
    m.convert_event_rates().unwrap();
    m.reset();
    assert!(m.prediction().is_none());
    assert_eq!(m.raw().integral(), 0.0);
}

#[test]
fn smeared_diagonal_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("binning.txt"), BINNING).unwrap();
    let json = config_json().replace(r#"{"kind": "data_errors"}"#, r#"{"kind": "diagonal"}"#);
    let path = dir.path().join("bad.json");
    std::fs::write(&path, json).unwrap();
    let cfg = MeasurementConfig::from_path(&path).unwrap();
    assert!(SmearedMeasurement::from_config(&cfg).unwrap_err().is_config());
}

#[test]
fn empty_bin_source_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("binning.txt"), "# nothing here\n").unwrap();
    let path = dir.path().join("m.json");
    std::fs::write(&path, config_json()).unwrap();
    let cfg = MeasurementConfig::from_path(&path).unwrap();
    assert!(SmearedMeasurement::from_config(&cfg).unwrap_err().is_config());
}

#[test]
fn five_row_matrix_rejects_four_bins() {
    let m = SmearingMatrix::from_row_slice(5, 4, &[0.25; 20]).unwrap();
    let conv = RateConverter::new(Box::new(IdentityConversion), m);
    let mut raw = Histogram::indexed("raw", 4).unwrap();
    raw.set_contents(&[1.0; 4], &[1.0; 4]).unwrap();
    assert!(conv.convert(&raw).unwrap_err().is_dimension());
}

#[test]
fn correlated_covariance_differs_from_diagonal() {
    let data = [3.0, 1.0];
    let pred = [1.0, 3.0];
    let corr = CovarianceChi2::from_row_slice(2, &[1.0, 0.9, 0.9, 1.0]).unwrap();
    let policy = LikelihoodPolicy::Covariance(corr);
    let full = policy.chi2(&data, &[1.0, 1.0], &pred).unwrap();
    let diag = LikelihoodPolicy::Diagonal.chi2(&data, &[1.0, 1.0], &pred).unwrap();
    // r = (2, -2): anti-correlated residuals are penalized harder
    assert_relative_eq!(diag, 8.0, max_relative = 1e-12);
    assert_relative_eq!(full, 8.0 / 0.1, max_relative = 1e-9);
}

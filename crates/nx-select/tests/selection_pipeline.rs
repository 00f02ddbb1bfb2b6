//! Integration tests: definition file → classifier → selector → histogram.

use std::sync::Arc;

use nx_core::{Event, RecordEvent};
use nx_hist::{Histogram, validate};
use nx_select::{
    BinClassifier, Comparison, EventSelector, OverlapPolicy, Predicate, VariableSet, VariableSpec,
    fill_parallel,
};

const BINNING: &str = "\
# two angular slices, two momentum bins each
0 cos_mu in -1.0 0.0
0 p_mu   in  0.1 0.4
1 cos_mu in -1.0 0.0
1 p_mu   in  0.4 1.5
2 cos_mu in  0.0 1.0
2 p_mu   in  0.1 0.6
3 cos_mu in  0.0 1.0
3 p_mu   in  0.6 1.5
";

fn kinematics() -> VariableSet {
    VariableSet::new(&[
        VariableSpec::new("p_mu", "sqrt(px*px + py*py + pz*pz)"),
        VariableSpec::new("cos_mu", "pz / p_mu"),
    ])
    .unwrap()
}

fn muon(p: f64, cos: f64, weight: f64) -> RecordEvent {
    let sin = (1.0 - cos * cos).sqrt();
    RecordEvent::new().with("px", p * sin).with("py", 0.0).with("pz", p * cos).weighted(weight)
}

#[test]
fn file_driven_selection_fills_expected_bins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binning.txt");
    std::fs::write(&path, BINNING).unwrap();

    let classifier = Arc::new(BinClassifier::from_path(&path).unwrap());
    assert_eq!(classifier.n_bins(), 4);

    let mut selector = EventSelector::new(classifier.clone(), Arc::new(kinematics()));
    let mut raw = Histogram::indexed("raw", classifier.n_bins())
        .unwrap()
        .with_axis_titles("analysis bin", "events")
        .with_sumw2();

    let events = [
        muon(0.2, -0.5, 1.0), // bin 0
        muon(0.8, -0.5, 1.0), // bin 1
        muon(0.3, 0.5, 2.0),  // bin 2
        muon(1.0, 0.9, 0.5),  // bin 3
        muon(0.05, 0.5, 1.0), // below threshold
        muon(3.0, 0.5, 1.0),  // above range
    ];
    let matched: Vec<usize> = events.iter().map(|ev| selector.process(ev, &mut raw)).collect();
    assert_eq!(matched, vec![1, 1, 1, 1, 0, 0]);
    assert_eq!(raw.contents(), &[1.0, 1.0, 2.0, 0.5]);
    assert_eq!(raw.overflow(), 0.0);

    let mut log = Vec::new();
    assert!(validate(Some(&raw), &mut log, true));
}

#[test]
fn events_without_a_muon_are_background() {
    let classifier = Arc::new(BinClassifier::from_text(BINNING).unwrap());
    let mut selector = EventSelector::new(classifier, Arc::new(kinematics()));
    let no_muon = RecordEvent::new().with("n_protons", 2.0);
    assert!(!selector.is_signal(&no_muon));
}

#[test]
fn is_signal_agrees_with_classify() {
    let classifier = BinClassifier::from_text(BINNING).unwrap();
    let vars = kinematics();
    let mut cache = nx_select::VariableCache::new();
    for i in 0..200 {
        let ev = muon(0.01 * i as f64, -1.0 + 0.01 * i as f64, 1.0);
        vars.compute(&ev, &mut cache);
        let view = nx_select::CachedEvent::new(&ev, &vars, &cache);
        assert_eq!(classifier.is_signal(&view), !classifier.classify(&view).is_empty());
    }
}

#[test]
fn custom_predicates_combine_with_threshold_cuts() {
    let ccinc = Predicate::new(|ev: &dyn Event| ev.scalar("pdg").unwrap_or(f64::NAN), |pdg| {
        pdg == 13.0
    })
    .with_label("is muon");
    let bin = nx_select::Bin::new(vec![ccinc, Predicate::threshold("p_mu", Comparison::Gt, 0.1)]);
    let clf = BinClassifier::new(vec![bin]).unwrap();
    assert!(clf.is_signal(&RecordEvent::new().with("pdg", 13.0).with("p_mu", 0.2)));
    assert!(!clf.is_signal(&RecordEvent::new().with("pdg", 11.0).with("p_mu", 0.2)));
}

#[test]
fn parallel_pass_matches_sequential_histogram() {
    let classifier = Arc::new(BinClassifier::from_text(BINNING).unwrap());
    let vars = Arc::new(kinematics());
    let events: Vec<RecordEvent> = (0..500)
        .map(|i| muon(0.003 * i as f64, -0.99 + 0.004 * i as f64, 1.0))
        .collect();

    let par = fill_parallel(&classifier, &vars, OverlapPolicy::FirstMatch, &events)
        .into_histogram("raw")
        .unwrap();

    let mut seq = Histogram::indexed("raw", 4).unwrap();
    let mut sel = EventSelector::new(classifier, vars).with_overlap_policy(OverlapPolicy::FirstMatch);
    for ev in &events {
        sel.process(ev, &mut seq);
    }
    assert_eq!(par.contents(), seq.contents());
}

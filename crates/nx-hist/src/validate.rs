//! Pre-use sanity checks for finished histograms.
//!
//! Diagnostics are written line by line to any [`std::io::Write`] sink using
//! the tags `[FAIL]`, `[WARN]`, `[INFO]` and `[OK]`. Checks never modify the
//! histogram.

use std::io::Write;

use nx_core::{Error, Result};

use crate::hist2d::Histogram2D;
use crate::histogram::Histogram;

/// Anything that may be handed to [`validate`].
pub trait HistObject {
    /// Object name.
    fn name(&self) -> &str;

    /// Class name used in diagnostics.
    fn class_name(&self) -> &str;

    /// The object as a 1D histogram, if it is one.
    fn as_hist1d(&self) -> Option<&Histogram> {
        None
    }
}

impl HistObject for Histogram {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        "Histogram"
    }

    fn as_hist1d(&self) -> Option<&Histogram> {
        Some(self)
    }
}

impl HistObject for Histogram2D {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        "Histogram2D"
    }
}

/// Outcome of the structural checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// All structural checks passed.
    Passed,
    /// No histogram was supplied.
    Missing,
    /// The object is not a 1D histogram.
    WrongType,
    /// The histogram has no bins (or its storage does not match its bin count).
    NoBins,
    /// Non-finite content/error or negative error found.
    BadValues,
}

/// Counts and summary gathered by [`inspect`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Structural outcome.
    pub status: ValidationStatus,
    /// Bins (including flows) with non-finite content.
    pub bad_content: usize,
    /// Bins (including flows) with non-finite error.
    pub bad_error: usize,
    /// Bins (including flows) with negative error.
    pub negative_error: usize,
    /// Number of in-range bins.
    pub n_bins: usize,
    /// Entry count.
    pub entries: f64,
    /// Integral including under/overflow.
    pub integral: f64,
    /// Whether per-bin variance tracking is enabled.
    pub sumw2: bool,
    /// Histogram has zero entries and zero integral.
    pub empty: bool,
    /// X-axis title is empty.
    pub missing_x_title: bool,
    /// Y-axis title is empty.
    pub missing_y_title: bool,
    lines: Vec<(Tag, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Fail,
    Warn,
    WarnVerbose,
    Info,
    Ok,
}

impl ValidationReport {
    fn new(status: ValidationStatus) -> Self {
        Self {
            status,
            bad_content: 0,
            bad_error: 0,
            negative_error: 0,
            n_bins: 0,
            entries: 0.0,
            integral: 0.0,
            sumw2: false,
            empty: false,
            missing_x_title: false,
            missing_y_title: false,
            lines: Vec::new(),
        }
    }

    fn fail(status: ValidationStatus, msg: String) -> Self {
        let mut r = Self::new(status);
        r.lines.push((Tag::Fail, msg));
        r
    }

    /// True when no structural failure occurred.
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Passed
    }

    /// `Ok` when passed, otherwise [`Error::Validation`] carrying the first failure line.
    pub fn ensure(&self) -> Result<()> {
        if self.passed() {
            return Ok(());
        }
        let msg = self
            .lines
            .iter()
            .find(|(tag, _)| *tag == Tag::Fail)
            .map(|(_, msg)| msg.clone())
            .unwrap_or_else(|| format!("{:?}", self.status));
        Err(Error::Validation(msg))
    }

    /// Write the diagnostics to `sink`. Title warnings, `[INFO]` and `[OK]`
    /// lines are only written when `verbose`.
    pub fn write_to(&self, sink: &mut dyn Write, verbose: bool) -> std::io::Result<()> {
        for (tag, msg) in &self.lines {
            let prefix = match tag {
                Tag::Fail => "[FAIL]",
                Tag::Warn => "[WARN]",
                Tag::WarnVerbose if verbose => "[WARN]",
                Tag::Info if verbose => "[INFO]",
                Tag::Ok if verbose => "[OK]",
                _ => continue,
            };
            writeln!(sink, "{prefix} {msg}")?;
        }
        Ok(())
    }
}

/// Run every check on `obj` and collect the results without writing anything.
pub fn inspect(obj: Option<&dyn HistObject>) -> ValidationReport {
    let Some(obj) = obj else {
        return ValidationReport::fail(ValidationStatus::Missing, "Histogram is absent.".into());
    };
    let Some(h) = obj.as_hist1d() else {
        return ValidationReport::fail(
            ValidationStatus::WrongType,
            format!("Object '{}' is a {}, not a 1D histogram.", obj.name(), obj.class_name()),
        );
    };
    let n_cells = h.n_bins + 2;
    if h.n_bins == 0 || h.bin_content.len() != n_cells || h.bin_error.len() != n_cells {
        return ValidationReport::fail(ValidationStatus::NoBins, format!("{} has no bins.", h.name));
    }

    let mut r = ValidationReport::new(ValidationStatus::Passed);
    r.n_bins = h.n_bins;
    r.entries = h.entries;
    r.sumw2 = h.sumw2;

    for (c, e) in h.bin_content.iter().zip(&h.bin_error) {
        if !c.is_finite() {
            r.bad_content += 1;
        }
        if !e.is_finite() {
            r.bad_error += 1;
        }
        if *e < 0.0 {
            r.negative_error += 1;
        }
    }
    if r.bad_content + r.bad_error + r.negative_error > 0 {
        r.status = ValidationStatus::BadValues;
        r.lines.push((
            Tag::Fail,
            format!(
                "{} has issues: bad_content={}, bad_error={}, negative_error={}",
                h.name, r.bad_content, r.bad_error, r.negative_error
            ),
        ));
        return r;
    }

    r.integral = h.integral_with_flows();
    r.lines.push((
        Tag::Info,
        format!(
            "{} | bins={} | entries={} | integral(uf/of)={} | sumw2={}",
            h.name,
            h.n_bins,
            h.entries,
            r.integral,
            if h.sumw2 { "yes" } else { "no" }
        ),
    ));

    if r.entries == 0.0 && r.integral == 0.0 {
        r.empty = true;
        r.lines.push((
            Tag::Warn,
            format!("{} has zero entries and zero integral (is it empty?).", h.name),
        ));
    }
    if h.x_title.trim().is_empty() {
        r.missing_x_title = true;
        r.lines.push((Tag::WarnVerbose, "X-axis title is empty.".into()));
    }
    if h.y_title.trim().is_empty() {
        r.missing_y_title = true;
        r.lines.push((Tag::WarnVerbose, "Y-axis title is empty.".into()));
    }

    r.lines.push((Tag::Ok, format!("{} passed checks.", h.name)));
    r
}

/// Validate `obj`, writing diagnostics to `sink`. Returns `true` when no
/// structural failure occurred; warnings do not affect the result.
pub fn validate(obj: Option<&dyn HistObject>, sink: &mut dyn Write, verbose: bool) -> bool {
    let report = inspect(obj);
    if let Err(e) = report.write_to(sink, verbose) {
        log::warn!("failed to write histogram diagnostics: {e}");
    }
    report.passed()
}

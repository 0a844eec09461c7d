//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the extraction/fitting code stays clean and testable
//! - output changes are localized (golden tests below)

use crate::domain::{FitConfig, FitResult, FitStatus, LayerProfile};
use crate::models::BetheHeitler;
use crate::report::{LayerResidual, ReferenceRow};

/// One row of the batch summary.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub run: String,
    pub layers: usize,
    /// Fit outcome, or the reason the run could not be analyzed.
    pub outcome: Result<FitResult, String>,
}

/// Per-layer statistics table.
pub fn format_profile_table(profile: &LayerProfile) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:>5} {:>9} {:>12} {:>10} {:>10}", "layer", "depth", "total", "mean", "std"),
    );
    push_line(&mut out, format!("{:-<5} {:-<9} {:-<12} {:-<10} {:-<10}", "", "", "", "", ""));
    for l in &profile.layers {
        push_line(
            &mut out,
            format!(
                "{:>5} {:>9.2} {:>12.4} {:>10.4} {:>10.4}",
                l.layer, l.depth, l.total_energy, l.mean_energy, l.std_energy
            ),
        );
    }
    out
}

/// Run summary: profile overview, model-free observables and fit outcome.
pub fn format_fit_summary(
    input: &str,
    layer_pitch: f64,
    config: &FitConfig,
    profile: &LayerProfile,
    result: &FitResult,
) -> String {
    let mut out = String::new();
    let n = profile.len();

    out.push_str("=== shower - longitudinal profile fit ===\n");
    out.push_str(&format!("Input: {input}\n"));
    out.push_str(&format!(
        "Layers: n={n} | pitch={layer_pitch:.3} | y={}\n",
        config.y_selector.label()
    ));
    out.push_str(&format!(
        "Fit window: trim lead={} trail={} | normalize={:?}\n",
        config.trim.lead, config.trim.trail, config.normalize
    ));

    out.push_str(&format!("\nStatus: {}", result.status.display_name()));
    if let Some(failure) = result.failure {
        out.push_str(&format!(" ({})", failure.describe()));
    }
    out.push('\n');

    if let Some(layer) = result.shower_max_layer {
        let depth = profile.layers.get(layer).map(|l| l.depth).unwrap_or(f64::NAN);
        out.push_str(&format!("Measured shower max: layer {layer} (depth {depth:.2})\n"));
    }
    if let Some(tail) = result.tail_leakage {
        out.push_str(&format!("Tail leakage: {tail:.4}\n"));
    }

    if let Some(p) = result.params {
        out.push_str("\nGamma fit:\n");
        out.push_str(&format!("- a     = {:.6}\n", p.a));
        out.push_str(&format!("- b     = {:.6}\n", p.b));
        out.push_str(&format!("- scale = {:.6}\n", p.scale));
        if let (Some(max), Some(width)) = (result.shower_max_depth, result.shower_width) {
            out.push_str(&format!("Shower max depth: {max:.3}\n"));
            out.push_str(&format!("Shower width:     {width:.3}\n"));
        }
    }
    if let Some(q) = result.quality {
        out.push_str(&format!(
            "Quality: SSE={:.6} RMSE={:.6} ndf={} iterations={}\n",
            q.sse, q.rmse, q.ndf, q.iterations
        ));
    }
    if result.status == FitStatus::Degenerate {
        out.push_str("Profile is flat; no shape information to fit.\n");
    }
    out.push('\n');
    out
}

/// Measured vs fitted values; trimmed layers are marked with `*`.
pub fn format_residuals(rows: &[LayerResidual]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:>5} {:>9} {:>12} {:>12} {:>12}", "layer", "depth", "y_obs", "y_fit", "residual"),
    );
    push_line(&mut out, format!("{:-<5} {:-<9} {:-<12} {:-<12} {:-<12}", "", "", "", "", ""));
    for r in rows {
        let mark = if r.fitted { "" } else { " *" };
        push_line(
            &mut out,
            format!(
                "{:>5} {:>9.2} {:>12.4} {:>12.4} {:>12.4}{mark}",
                r.layer, r.depth, r.y_obs, r.y_fit, r.residual
            ),
        );
    }
    if rows.iter().any(|r| !r.fitted) {
        out.push_str("(* excluded from the fit window)\n");
    }
    out
}

/// Unit-sum comparison against the Bethe–Heitler expectation.
pub fn format_reference(rows: &[ReferenceRow], reference: &BetheHeitler) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Bethe-Heitler reference: E0={:.1} MeV | Ec={:.1} MeV | X0={:.2} | a={:.4} b={:.2} | t_max depth={:.2}\n",
        reference.incident_energy,
        reference.critical_energy,
        reference.radiation_length,
        reference.shape(),
        reference.b,
        reference.shower_max_depth()
    ));
    push_line(
        &mut out,
        format!("{:>5} {:>9} {:>10} {:>10} {:>10}", "layer", "depth", "measured", "expected", "diff"),
    );
    push_line(&mut out, format!("{:-<5} {:-<9} {:-<10} {:-<10} {:-<10}", "", "", "", "", ""));
    for r in rows {
        push_line(
            &mut out,
            format!(
                "{:>5} {:>9.2} {:>10.4} {:>10.4} {:>10.4}",
                r.layer,
                r.depth,
                r.measured,
                r.expected,
                r.measured - r.expected
            ),
        );
    }
    out
}

/// One line per run: status and shower observables, or the load/extract error.
pub fn format_batch_table(entries: &[BatchEntry]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<24} {:>6} {:<10} {:>9} {:>9} {:>9} {:>12}",
            "run", "layers", "status", "max_layer", "max_depth", "width", "tail"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<24} {:-<6} {:-<10} {:-<9} {:-<9} {:-<9} {:-<12}", "", "", "", "", "", "", ""),
    );
    for e in entries {
        let run = truncate(&e.run, 24);
        match &e.outcome {
            Ok(r) => push_line(
                &mut out,
                format!(
                    "{:<24} {:>6} {:<10} {:>9} {:>9} {:>9} {:>12}",
                    run,
                    e.layers,
                    r.status.display_name(),
                    opt_usize(r.shower_max_layer),
                    opt_f64(r.shower_max_depth, 2),
                    opt_f64(r.shower_width, 2),
                    opt_f64(r.tail_leakage, 4),
                ),
            ),
            Err(msg) => push_line(&mut out, format!("{run:<24} error: {msg}")),
        }
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn opt_f64(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}")).unwrap_or_else(|| "-".to_string())
}

fn opt_usize(v: Option<usize>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

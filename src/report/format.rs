//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the identification code stays clean and testable
//! - output changes are localized (the summary has a snapshot test)

use crate::domain::{ArxCoefficients, CandidateModel, ComplexNumber, Identification};

/// Format the full run summary (dataset stats + candidate diagnostics + chosen model).
pub fn format_summary(result: &Identification, source: &str) -> String {
    let mut out = String::new();

    out.push_str("=== arxid - ARX identification ===\n");
    out.push_str(&format!("Capture: {source}\n"));
    out.push_str(&format!(
        "Rows: read={} | used={} | estimation={} | Ts={:.4}s\n",
        result.dataset.rows_read,
        result.dataset.rows_used,
        result.dataset.estimation_rows,
        result.dataset.sampling_interval,
    ));

    out.push_str("\nCandidates:\n");
    out.push_str(&format_candidate_table(&result.candidates, result.order()));
    for dropped in &result.dropped {
        out.push_str(&format!("  (dropped ARX({})) {}\n", dropped.order, dropped.reason));
    }

    let chosen = &result.decision.chosen;
    out.push_str("\nChosen model:\n");
    out.push_str(&format!(
        "- ARX({}) via {} selection\n",
        chosen.order,
        result.method().display_name()
    ));
    out.push_str(&format!("- rationale: {}\n", truncate(result.rationale(), 120)));
    out.push_str(&format!("- {}\n", chosen.equation));
    out.push_str(&format!("- a: {}\n", fmt_vec(&chosen.coefficients.a)));
    out.push_str(&format!("- b: {}\n", fmt_vec(&chosen.coefficients.b)));
    out.push_str(&format!("- poles: {}\n", fmt_poles(&chosen.poles)));
    out.push_str(&format!(
        "- one-step errors: var={:.3e} lag1={:.3e}\n",
        chosen.one_step.variance, chosen.one_step.autocorr
    ));

    out
}

fn format_candidate_table(candidates: &[CandidateModel], chosen_order: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<6} {:>12} {:>8} {:>7} {:>9}\n",
        "order", "mse", "fit%", "stable", "max|p|"
    ));
    out.push_str(&format!("  {:-<6} {:-<12} {:-<8} {:-<7} {:-<9}\n", "", "", "", "", ""));

    for c in candidates {
        let mark = if c.order == chosen_order { '*' } else { ' ' };
        let fit = c
            .fit_percent
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        let max_pole = c.max_pole_modulus();
        let max_pole = if max_pole.is_nan() {
            "n/a".to_string()
        } else {
            format!("{max_pole:.4}")
        };
        out.push_str(&format!(
            "{mark} {:<6} {:>12.4e} {:>8} {:>7} {:>9}\n",
            c.order,
            c.mse,
            fit,
            if c.stable { "yes" } else { "no" },
            max_pole,
        ));
    }
    out
}

/// Format the final state of a recursive estimator run.
pub fn format_track_summary(
    coefficients: &ArxCoefficients,
    steps: u64,
    rms_error: f64,
    lambda: f64,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Recursive ARX({}) | lambda={lambda:.3} | steps={steps}\n",
        coefficients.order()
    ));
    out.push_str(&format!("- {}\n", coefficients.equation()));
    out.push_str(&format!("- a: {}\n", fmt_vec(&coefficients.a)));
    out.push_str(&format!("- b: {}\n", fmt_vec(&coefficients.b)));
    out.push_str(&format!("- a-priori error RMS: {rms_error:.4e}\n"));
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_poles(poles: &[ComplexNumber]) -> String {
    let parts: Vec<String> = poles
        .iter()
        .map(|p| {
            if p.im.abs() < 1e-9 {
                format!("{:.4}", p.re)
            } else {
                let sign = if p.im < 0.0 { '-' } else { '+' };
                format!("{:.4}{sign}{:.4}i", p.re, p.im.abs())
            }
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DatasetStats, DroppedOrder, EstimationMethod, ResidualStats, SelectionDecision, SelectionMethod,
    };

    fn candidate(order: usize, mse: f64, stable: bool, poles: Vec<ComplexNumber>) -> CandidateModel {
        let coefficients = ArxCoefficients::new(vec![0.9; order], vec![0.1; order + 1]);
        CandidateModel {
            order,
            equation: coefficients.equation(),
            coefficients,
            sampling_interval: 0.05,
            mse,
            fit_percent: Some(95.0),
            one_step: ResidualStats {
                variance: 1e-6,
                autocorr: 2e-7,
            },
            stable,
            poles,
            method: EstimationMethod::BatchLeastSquares,
        }
    }

    fn identification() -> Identification {
        let first = candidate(1, 1e-4, true, vec![ComplexNumber::new(0.9, 0.0)]);
        let second = candidate(
            2,
            5e-5,
            false,
            vec![ComplexNumber::new(0.6, 0.9), ComplexNumber::new(0.6, -0.9)],
        );
        Identification {
            decision: SelectionDecision {
                chosen: first.clone(),
                index: 0,
                rationale: "stable candidate with the lowest MSE".to_string(),
                method: SelectionMethod::Heuristic,
            },
            candidates: vec![first, second],
            dropped: vec![DroppedOrder {
                order: 3,
                reason: "singular regression".to_string(),
            }],
            dataset: DatasetStats {
                rows_read: 120,
                rows_used: 118,
                estimation_rows: 95,
                sampling_interval: 0.05,
            },
        }
    }

    #[test]
    fn summary_marks_chosen_and_lists_dropped() {
        let txt = format_summary(&identification(), "cap.csv");
        assert!(txt.contains("Capture: cap.csv"));
        assert!(txt.contains("Rows: read=120 | used=118 | estimation=95 | Ts=0.0500s"));
        assert!(txt.contains("* 1 "));
        assert!(txt.contains("  2 "));
        assert!(txt.contains("(dropped ARX(3)) singular regression"));
        assert!(txt.contains("- ARX(1) via heuristic selection"));
        assert!(txt.contains("- poles: [0.9000]"));
    }

    #[test]
    fn complex_poles_are_formatted_with_sign() {
        let s = fmt_poles(&[ComplexNumber::new(0.6, 0.9), ComplexNumber::new(0.6, -0.9)]);
        assert_eq!(s, "[0.6000+0.9000i, 0.6000-0.9000i]");
    }

    #[test]
    fn track_summary_lists_coefficients() {
        let c = ArxCoefficients::new(vec![0.5], vec![0.25, 0.0]);
        let txt = format_track_summary(&c, 200, 1e-3, 0.98);
        assert!(txt.starts_with("Recursive ARX(1) | lambda=0.980 | steps=200\n"));
        assert!(txt.contains("- a: [0.500000]"));
        assert!(txt.contains("- b: [0.250000, 0.000000]"));
    }

    #[test]
    fn non_finite_pole_is_reported_as_not_available() {
        let c = candidate(1, 1e-3, false, vec![ComplexNumber::new(f64::NAN, 0.0)]);
        let table = format_candidate_table(&[c], 1);
        let row = table.lines().nth(2).unwrap();
        assert!(row.ends_with("n/a"), "{row}");
        assert!(!row.contains("0.0000"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}

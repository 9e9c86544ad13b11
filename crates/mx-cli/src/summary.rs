//! Plain-text regression summaries for stdout.

use std::fmt::Write as _;

use mx_inference::{OlsFit, TermEstimate};

/// Fixed-effect dummies are counted, not listed.
fn is_fixed_effect(name: &str) -> bool {
    name.starts_with("C(")
}

fn fmt_num(v: f64, width: usize, prec: usize) -> String {
    if v.is_finite() { format!("{v:>width$.prec$}") } else { format!("{:>width$}", "nan") }
}

/// Coefficient table in the usual OLS layout, fixed effects folded into a
/// count line, followed by the aliased-column list if any.
pub fn format_fit(title: &str, dep_var: &str, fit: &OlsFit) -> String {
    let mut out = String::new();
    let rule = "=".repeat(86);
    let thin = "-".repeat(86);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{title:^86}");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<22}{:>20}    {:<22}{:>18}",
        "Dep. Variable:", dep_var, "No. Observations:", fit.n_obs
    );
    let _ = writeln!(
        out,
        "{:<22}{:>20}    {:<22}{:>18}",
        "Covariance Type:", fit.cov_type, "Df Residuals:", fit.df_resid
    );
    let _ = writeln!(
        out,
        "{:<22}{:>20}    {:<22}{:>18}",
        "R-squared:",
        fmt_num(fit.r_squared, 0, 4).trim(),
        "Rank / Columns:",
        format!("{} / {}", fit.rank, fit.names.len())
    );
    let _ = writeln!(out, "{thin}");
    let _ = writeln!(
        out,
        "{:<22}{:>11}{:>11}{:>9}{:>9}{:>12}{:>12}",
        "", "coef", "std err", "z", "P>|z|", "[0.025", "0.975]"
    );
    let _ = writeln!(out, "{thin}");

    let mut fe_count = 0usize;
    for (j, name) in fit.names.iter().enumerate() {
        if is_fixed_effect(name) {
            fe_count += 1;
            continue;
        }
        let _ = writeln!(
            out,
            "{:<22}{}{}{}{}{}{}",
            name,
            fmt_num(fit.coefficients[j], 11, 4),
            fmt_num(fit.std_errors[j], 11, 4),
            fmt_num(fit.z_values[j], 9, 3),
            fmt_num(fit.p_values[j], 9, 3),
            fmt_num(fit.ci_lower[j], 12, 4),
            fmt_num(fit.ci_upper[j], 12, 4),
        );
    }
    let _ = writeln!(out, "{thin}");
    if fe_count > 0 {
        let _ = writeln!(out, "Fixed-effect dummies not shown: {fe_count}");
    }
    if !fit.aliased.is_empty() {
        let _ = writeln!(
            out,
            "Rank deficient design; minimum-norm estimates. Aliased columns: {}",
            fit.aliased.join(", ")
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// One-line headline for the DiD interaction.
pub fn did_headline(term: &TermEstimate) -> String {
    format!(
        "DiD effect = {:.4} (95% CI {:.4}, {:.4}), p = {:.3}",
        term.coef, term.ci_lower, term.ci_upper, term.p_value
    )
}

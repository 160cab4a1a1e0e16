//! Deterministic stand-in for `fastFMM::fui`.
//!
//! Fits one ordinary least-squares regression per point of the functional
//! domain (the `<outcome>.<k>` columns), optionally smooths the coefficient
//! curves with a three-point moving average, and returns a result list
//! shaped like the package's: a labeled coefficient matrix, a column-labeled
//! information-criteria matrix, a 3-D covariance array, and so on.
//! Random-effect terms (`(1 | id)`) only select the bootstrap resampling
//! unit and the `randeffs` grouping.

use std::collections::{BTreeMap, HashMap};

use fmm_core::robject::{NA_INTEGER, is_na_real, na_real};
use fmm_core::{DataFrame, Error, RObject, Result, Vector};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INTERCEPT: &str = "(Intercept)";
const Z_975: f64 = 1.959963984540054;

fn fit_error(message: impl Into<String>) -> Error {
    Error::Foreign { call: "fastFMM::fui".into(), message: message.into() }
}

/// Keyword arguments of `fui`, with the package defaults.
#[derive(Debug, Clone)]
pub(super) struct FitArgs {
    family: String,
    analytic: bool,
    var: bool,
    argvals: Option<Vec<i32>>,
    design_mat: bool,
    residuals: bool,
    n_boots: i32,
    seed: i32,
    caic: bool,
    randeffs: bool,
    non_neg: i32,
    mom: i32,
    impute_outcome: bool,
    override_zero_var: bool,
    unsmooth: bool,
}

impl FitArgs {
    pub(super) fn from_args(args: &HashMap<String, RObject>) -> Result<Self> {
        let flag = |name: &str, default: bool| -> Result<bool> {
            match args.get(name) {
                None | Some(RObject::Null) => Ok(default),
                Some(RObject::Logical(v)) if v.len() == 1 => {
                    v.data[0].ok_or_else(|| fit_error(format!("'{name}' must be TRUE or FALSE")))
                }
                Some(other) => Err(fit_error(format!("'{name}' must be logical, not {}", other.type_name()))),
            }
        };
        let int = |name: &str, default: i32| -> Result<i32> {
            match args.get(name) {
                None | Some(RObject::Null) => Ok(default),
                Some(RObject::Integer(v)) if v.len() == 1 && v.data[0] != NA_INTEGER => Ok(v.data[0]),
                Some(RObject::Real(v)) if v.len() == 1 && v.data[0].fract() == 0.0 => Ok(v.data[0] as i32),
                Some(other) => Err(fit_error(format!("'{name}' must be a whole number, not {}", other.type_name()))),
            }
        };
        let family = match args.get("family") {
            None | Some(RObject::Null) => "gaussian".to_string(),
            Some(obj) => obj.as_str().map(str::to_string).ok_or_else(|| fit_error("'family' must be a string"))?,
        };
        let argvals = match args.get("argvals") {
            None | Some(RObject::Null) => None,
            Some(RObject::Integer(v)) => Some(v.data.clone()),
            Some(RObject::Real(v)) => Some(v.data.iter().map(|&x| x as i32).collect()),
            Some(other) => return Err(fit_error(format!("'argvals' must be numeric, not {}", other.type_name()))),
        };
        Ok(Self {
            family,
            analytic: flag("analytic", true)?,
            var: flag("var", true)?,
            argvals,
            design_mat: flag("design_mat", false)?,
            residuals: flag("residuals", false)?,
            n_boots: int("n_boots", 500)?,
            seed: int("seed", 1)?,
            caic: flag("caic", false)?,
            randeffs: flag("randeffs", false)?,
            non_neg: int("non_neg", 0)?,
            mom: int("MoM", 1)?,
            impute_outcome: flag("impute_outcome", false)?,
            override_zero_var: flag("override_zero_var", false)?,
            unsmooth: flag("unsmooth", false)?,
        })
    }
}

/// Parsed right-hand side of a model formula.
#[derive(Debug, PartialEq)]
struct Formula {
    outcome: String,
    intercept: bool,
    fixed: Vec<String>,
    group: Option<String>,
}

/// Split on `+` outside parentheses.
fn split_terms(rhs: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in rhs.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '+' if depth == 0 => {
                terms.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    terms.push(current.trim().to_string());
    terms.retain(|t| !t.is_empty());
    terms
}

fn parse_formula(text: &str) -> Result<Formula> {
    let (lhs, rhs) = text.split_once('~').ok_or_else(|| fit_error(format!("invalid formula: '{text}'")))?;
    let outcome = lhs.trim().to_string();
    if outcome.is_empty() || rhs.trim().is_empty() {
        return Err(fit_error(format!("invalid formula: '{text}'")));
    }
    let mut formula = Formula { outcome, intercept: true, fixed: Vec::new(), group: None };
    for term in split_terms(rhs) {
        if let Some((_, group)) = term.split_once('|') {
            formula.group = Some(group.trim().trim_end_matches(')').trim().to_string());
        } else if term == "1" {
            formula.intercept = true;
        } else if term == "0" || term == "-1" {
            formula.intercept = false;
        } else {
            formula.fixed.push(term);
        }
    }
    Ok(formula)
}

/// A data frame column as doubles (`NA` → NaN).
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df.column(name).ok_or_else(|| fit_error(format!("object '{name}' not found")))?;
    match col {
        RObject::Real(v) => Ok(v.data.iter().map(|&x| if is_na_real(x) { f64::NAN } else { x }).collect()),
        RObject::Integer(v) => {
            Ok(v.data.iter().map(|&x| if x == NA_INTEGER { f64::NAN } else { f64::from(x) }).collect())
        }
        RObject::Logical(v) => {
            Ok(v.data.iter().map(|x| x.map_or(f64::NAN, |b| if b { 1.0 } else { 0.0 })).collect())
        }
        other => Err(fit_error(format!("predictor '{name}' is {}, not numeric", other.type_name()))),
    }
}

/// `a:b` interaction terms are element-wise products.
fn term_column(df: &DataFrame, term: &str) -> Result<Vec<f64>> {
    let mut parts = term.split(':').map(str::trim);
    let first = parts.next().unwrap_or(term);
    let mut out = numeric_column(df, first)?;
    for part in parts {
        let other = numeric_column(df, part)?;
        out.iter_mut().zip(other).for_each(|(a, b)| *a *= b);
    }
    Ok(out)
}

fn group_labels(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let col = df.column(name).ok_or_else(|| fit_error(format!("object '{name}' not found")))?;
    Ok(match col {
        RObject::Integer(v) => v.data.iter().map(|x| x.to_string()).collect(),
        RObject::Real(v) => v.data.iter().map(|x| x.to_string()).collect(),
        RObject::Character(v) => v.data.iter().map(|s| s.clone().unwrap_or_else(|| "NA".into())).collect(),
        RObject::Logical(v) => v.data.iter().map(|b| format!("{b:?}")).collect(),
        other => return Err(fit_error(format!("grouping variable '{name}' is {}", other.type_name()))),
    })
}

/// `<outcome>.<k>` columns ordered by `k`, or the outcome column itself.
fn outcome_columns(df: &DataFrame, outcome: &str) -> Result<Vec<String>> {
    let prefix = format!("{outcome}.");
    let mut indexed: Vec<(u32, String)> = df
        .columns
        .iter()
        .filter_map(|(name, _)| name.strip_prefix(&prefix)?.parse::<u32>().ok().map(|k| (k, name.clone())))
        .collect();
    indexed.sort();
    if indexed.is_empty() {
        if df.column(outcome).is_some() {
            return Ok(vec![outcome.to_string()]);
        }
        return Err(fit_error(format!("object '{outcome}' not found")));
    }
    Ok(indexed.into_iter().map(|(_, name)| name).collect())
}

/// Solve `a x = b` by Gauss-Jordan elimination with partial pivoting.
fn solve(a: &Array2<f64>, b: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut a = a.clone();
    let mut b = b.clone();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            for k in 0..b.ncols() {
                b.swap([pivot, k], [col, k]);
            }
        }
        let p = a[[col, col]];
        a.row_mut(col).mapv_inplace(|v| v / p);
        b.row_mut(col).mapv_inplace(|v| v / p);
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            for k in 0..b.ncols() {
                b[[row, k]] -= factor * b[[col, k]];
            }
        }
    }
    Some(b)
}

/// Per-point OLS fits.
struct PointFits {
    /// `p x L`.
    beta: Array2<f64>,
    rss: Vec<f64>,
    n_obs: Vec<usize>,
    /// Diagonal of `(X'X)^-1` per point.
    inv_diag: Vec<Array1<f64>>,
    /// `n x L`, NaN where the outcome was not observed.
    fitted: Array2<f64>,
}

fn fit_points(x: &Array2<f64>, y: &Array2<f64>) -> Result<PointFits> {
    let (n, p) = x.dim();
    let n_points = y.ncols();
    let mut beta = Array2::<f64>::zeros((p, n_points));
    let mut fitted = Array2::<f64>::from_elem((n, n_points), f64::NAN);
    let (mut rss, mut n_obs, mut inv_diag) = (Vec::new(), Vec::new(), Vec::new());
    for l in 0..n_points {
        let rows: Vec<usize> = (0..n).filter(|&i| y[[i, l]].is_finite()).collect();
        if rows.len() <= p {
            return Err(fit_error(format!("point {}: {} observations for {p} coefficients", l + 1, rows.len())));
        }
        let xl = x.select(Axis(0), &rows);
        let yl = y.column(l).select(Axis(0), &rows);
        let xtx = xl.t().dot(&xl);
        let xty = xl.t().dot(&yl).insert_axis(Axis(1));
        let inv = solve(&xtx, &Array2::eye(p))
            .ok_or_else(|| fit_error(format!("point {}: system is computationally singular", l + 1)))?;
        let b = inv.dot(&xty).remove_axis(Axis(1));
        let pred = xl.dot(&b);
        let resid = &yl - &pred;
        for (&i, &v) in rows.iter().zip(pred.iter()) {
            fitted[[i, l]] = v;
        }
        beta.column_mut(l).assign(&b);
        rss.push(resid.dot(&resid));
        n_obs.push(rows.len());
        inv_diag.push(inv.diag().to_owned());
    }
    Ok(PointFits { beta, rss, n_obs, inv_diag, fitted })
}

/// Three-point moving average along the functional domain.
fn smooth_rows(beta: &Array2<f64>) -> Array2<f64> {
    let n_points = beta.ncols();
    let mut out = beta.clone();
    for l in 0..n_points {
        let lo = l.saturating_sub(1);
        let hi = (l + 1).min(n_points - 1);
        let window = beta.slice(ndarray::s![.., lo..=hi]);
        out.column_mut(l).assign(&window.mean_axis(Axis(1)).unwrap_or_else(|| beta.column(l).to_owned()));
    }
    out
}

fn matrix(data: &Array2<f64>, dimnames: Option<Vec<Option<Vec<String>>>>) -> RObject {
    let (nrow, ncol) = data.dim();
    // Column-major.
    let flat: Vec<f64> = data.t().iter().copied().collect();
    let mut v = Vector::new(flat).with_dim(vec![nrow, ncol]);
    if let Some(dn) = dimnames {
        v = v.with_dimnames(dn);
    }
    RObject::Real(v)
}

fn na_to_r(x: f64) -> f64 {
    if x.is_nan() { na_real() } else { x }
}

pub(super) fn fui(formula_text: &str, data: &DataFrame, args: &FitArgs) -> Result<RObject> {
    if args.family != "gaussian" {
        return Err(fit_error(format!("family '{}' is not supported by the in-memory engine", args.family)));
    }
    if !(0..=2).contains(&args.non_neg) {
        return Err(fit_error("non_neg must be 0, 1 or 2"));
    }
    if !(1..=2).contains(&args.mom) {
        return Err(fit_error("MoM must be 1 or 2"));
    }
    let formula = parse_formula(formula_text)?;

    let mut names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    if formula.intercept {
        names.push(INTERCEPT.to_string());
        columns.push(vec![1.0; data.nrow()]);
    }
    for term in &formula.fixed {
        names.push(term.clone());
        columns.push(term_column(data, term)?);
    }
    if names.is_empty() {
        return Err(fit_error("model has no fixed effects"));
    }

    let mut outcome_names = outcome_columns(data, &formula.outcome)?;
    let mut argvals: Vec<usize> = (1..=outcome_names.len()).collect();
    if let Some(selected) = &args.argvals {
        let mut picked = Vec::with_capacity(selected.len());
        for &k in selected {
            let idx = usize::try_from(k)
                .ok()
                .filter(|&k| k >= 1 && k <= outcome_names.len())
                .ok_or_else(|| fit_error(format!("argvals index {k} is outside 1..{}", outcome_names.len())))?;
            picked.push(idx);
        }
        outcome_names = picked.iter().map(|&k| outcome_names[k - 1].clone()).collect();
        argvals = picked;
    }
    let labels: Vec<String> = argvals.iter().map(usize::to_string).collect();

    // Complete cases on the predictors.
    let rows: Vec<usize> = (0..data.nrow()).filter(|&i| columns.iter().all(|c| c[i].is_finite())).collect();
    if rows.is_empty() {
        return Err(fit_error("no complete cases in the predictors"));
    }
    let p = names.len();
    let x = Array2::from_shape_fn((rows.len(), p), |(i, j)| columns[j][rows[i]]);

    let zero_var: Vec<&str> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.as_str() != INTERCEPT)
        .filter(|&(j, _)| {
            let col = x.column(j);
            col.iter().all(|&v| v == col[0])
        })
        .map(|(_, name)| name.as_str())
        .collect();
    if !zero_var.is_empty() && !args.override_zero_var {
        return Err(fit_error(format!(
            "Columns with zero variance: {}. Set override_zero_var = TRUE to fit anyway.",
            zero_var.join(", ")
        )));
    }
    let kept: Vec<usize> = (0..p).filter(|&j| !zero_var.contains(&names[j].as_str())).collect();
    let x_kept = x.select(Axis(1), &kept);

    let mut y = Array2::<f64>::from_elem((rows.len(), outcome_names.len()), f64::NAN);
    for (l, name) in outcome_names.iter().enumerate() {
        let col = numeric_column(data, name)?;
        for (i, &r) in rows.iter().enumerate() {
            y[[i, l]] = col[r];
        }
        if args.impute_outcome {
            let observed: Vec<f64> = y.column(l).iter().copied().filter(|v| v.is_finite()).collect();
            if !observed.is_empty() {
                let mean = observed.iter().sum::<f64>() / observed.len() as f64;
                y.column_mut(l).mapv_inplace(|v| if v.is_finite() { v } else { mean });
            }
        }
    }
    tracing::debug!(n = rows.len(), p, points = outcome_names.len(), "fitting point-wise models");

    let fits = fit_points(&x_kept, &y)?;
    let estimate = |beta: &Array2<f64>| if args.unsmooth { beta.clone() } else { smooth_rows(beta) };
    let n_points = outcome_names.len();

    // Aliased (zero-variance) coefficients are NA, as `lm` reports them.
    let mut beta_hat = Array2::<f64>::from_elem((p, n_points), f64::NAN);
    let kept_beta = estimate(&fits.beta);
    for (k, &j) in kept.iter().enumerate() {
        beta_hat.row_mut(j).assign(&kept_beta.row(k));
    }

    let groups = match &formula.group {
        Some(name) => Some((name.clone(), group_labels(data, name)?)),
        None => None,
    };

    let (beta_var, qn) = if !args.var {
        (RObject::Null, RObject::Null)
    } else if args.analytic {
        let variances: Vec<Array1<f64>> = fits
            .inv_diag
            .iter()
            .zip(fits.rss.iter().zip(&fits.n_obs))
            .map(|(d, (&rss, &n))| d.mapv(|v| v * rss / (n - kept.len()) as f64))
            .collect();
        (covariance_array(&kept, p, n_points, |k, l, m| (variances[l][k] * variances[m][k]).sqrt()), RObject::real(vec![Z_975; p]))
    } else {
        let cluster_of: Vec<String> = match &groups {
            Some((_, labels)) => rows.iter().map(|&r| labels[r].clone()).collect(),
            None => rows.iter().map(|r| r.to_string()).collect(),
        };
        bootstrap(&x_kept, &y, &cluster_of, &kept_beta, &kept, p, args, &estimate)?
    };

    let aic = information_criteria(&fits, kept.len(), args.caic);

    let residuals = if args.residuals {
        let mut resid = Array2::<f64>::from_elem((data.nrow(), n_points), na_real());
        for (i, &r) in rows.iter().enumerate() {
            for l in 0..n_points {
                let v = y[[i, l]] - fits.fitted[[i, l]];
                resid[[r, l]] = na_to_r(v);
            }
        }
        matrix(&resid, None)
    } else {
        RObject::Null
    };

    let design = if args.design_mat {
        let row_labels: Vec<String> = rows.iter().map(|r| (r + 1).to_string()).collect();
        matrix(&x, Some(vec![Some(row_labels), Some(names.clone())]))
    } else {
        RObject::Null
    };

    let randeffs = match (&groups, args.randeffs) {
        (Some((name, labels)), true) => {
            let mut sums: BTreeMap<&str, (Array1<f64>, Array1<f64>)> = BTreeMap::new();
            for (i, &r) in rows.iter().enumerate() {
                let entry = sums
                    .entry(labels[r].as_str())
                    .or_insert_with(|| (Array1::zeros(n_points), Array1::zeros(n_points)));
                for l in 0..n_points {
                    let v = y[[i, l]] - fits.fitted[[i, l]];
                    if v.is_finite() {
                        entry.0[l] += v;
                        entry.1[l] += 1.0;
                    }
                }
            }
            let levels: Vec<String> = sums.keys().map(|k| k.to_string()).collect();
            let means = Array2::from_shape_fn((levels.len(), n_points), |(g, l)| {
                let (s, c) = &sums[levels[g].as_str()];
                if c[l] > 0.0 { s[l] / c[l] } else { na_real() }
            });
            RObject::named_list([(name.clone(), matrix(&means, Some(vec![Some(levels), Some(labels_for(&argvals))])))])
        }
        _ => RObject::Null,
    };

    let n_boots = if args.analytic { 0 } else { args.n_boots };
    let fit_info = RObject::named_list([
        ("n", RObject::integer(vec![rows.len() as i32])),
        ("p", RObject::integer(vec![p as i32])),
        ("L", RObject::integer(vec![n_points as i32])),
        ("n_boots", RObject::integer(vec![n_boots])),
    ]);

    Ok(RObject::named_list([
        ("betaHat", matrix(&beta_hat.mapv(na_to_r), Some(vec![Some(names), Some(labels)]))),
        ("betaHat.var", beta_var),
        ("qn", qn),
        ("aic", aic),
        ("residuals", residuals),
        ("design_mat", design),
        ("randeffs", randeffs),
        ("argvals", RObject::real(argvals.iter().map(|&k| k as f64).collect())),
        ("converged", RObject::logical(vec![Some(true); n_points])),
        ("fit_info", fit_info),
    ]))
}

fn labels_for(argvals: &[usize]) -> Vec<String> {
    argvals.iter().map(usize::to_string).collect()
}

/// `L x L x p` array; coefficients outside `kept` are NA.
fn covariance_array(kept: &[usize], p: usize, n_points: usize, cov: impl Fn(usize, usize, usize) -> f64) -> RObject {
    let mut data = vec![na_real(); n_points * n_points * p];
    for (k, &j) in kept.iter().enumerate() {
        for m in 0..n_points {
            for l in 0..n_points {
                data[l + n_points * m + n_points * n_points * j] = na_to_r(cov(k, l, m));
            }
        }
    }
    RObject::Real(Vector::new(data).with_dim(vec![n_points, n_points, p]))
}

#[allow(clippy::too_many_arguments)]
fn bootstrap(
    x: &Array2<f64>,
    y: &Array2<f64>,
    cluster_of: &[String],
    estimate_full: &Array2<f64>,
    kept: &[usize],
    p: usize,
    args: &FitArgs,
    estimate: &dyn Fn(&Array2<f64>) -> Array2<f64>,
) -> Result<(RObject, RObject)> {
    let mut clusters: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, c) in cluster_of.iter().enumerate() {
        clusters.entry(c.as_str()).or_default().push(i);
    }
    let clusters: Vec<Vec<usize>> = clusters.into_values().collect();
    let mut rng = StdRng::seed_from_u64(args.seed as u64);
    let mut replicates: Vec<Array2<f64>> = Vec::new();
    for _ in 0..args.n_boots.max(0) {
        let rows: Vec<usize> =
            (0..clusters.len()).flat_map(|_| clusters[rng.gen_range(0..clusters.len())].iter().copied()).collect();
        // A degenerate resample is skipped.
        if let Ok(fit) = fit_points(&x.select(Axis(0), &rows), &y.select(Axis(0), &rows)) {
            replicates.push(estimate(&fit.beta));
        }
    }
    if replicates.len() < 2 {
        return Err(fit_error(format!("bootstrap produced {} usable replicates", replicates.len())));
    }
    tracing::debug!(replicates = replicates.len(), "bootstrap finished");
    let n_points = estimate_full.ncols();
    let n_rep = replicates.len() as f64;
    let mean = replicates.iter().fold(Array2::<f64>::zeros(estimate_full.dim()), |acc, r| acc + r) / n_rep;
    let cov = |k: usize, l: usize, m: usize| {
        replicates.iter().map(|r| (r[[k, l]] - mean[[k, l]]) * (r[[k, m]] - mean[[k, m]])).sum::<f64>() / (n_rep - 1.0)
    };
    let beta_var = covariance_array(kept, p, n_points, cov);

    let mut qn = vec![na_real(); p];
    for (k, &j) in kept.iter().enumerate() {
        let sd: Vec<f64> = (0..n_points).map(|l| cov(k, l, l).sqrt()).collect();
        let mut maxima: Vec<f64> = replicates
            .iter()
            .map(|r| {
                (0..n_points)
                    .filter(|&l| sd[l] > 0.0)
                    .map(|l| (r[[k, l]] - estimate_full[[k, l]]).abs() / sd[l])
                    .fold(0.0, f64::max)
            })
            .collect();
        maxima.sort_by(f64::total_cmp);
        let idx = ((maxima.len() as f64) * 0.95).ceil() as usize;
        qn[j] = maxima[idx.saturating_sub(1).min(maxima.len() - 1)];
    }
    Ok((beta_var, RObject::real(qn)))
}

/// `L x 3` matrix with columns `AIC`, `BIC`, `cAIC`.
fn information_criteria(fits: &PointFits, p: usize, caic: bool) -> RObject {
    let n_points = fits.rss.len();
    let k = (p + 1) as f64;
    let crit = Array2::from_shape_fn((n_points, 3), |(l, c)| {
        let n = fits.n_obs[l] as f64;
        let loglik_term = n * (fits.rss[l] / n).ln();
        match c {
            0 => loglik_term + 2.0 * k,
            1 => loglik_term + n.ln() * k,
            _ if caic && n - k - 1.0 > 0.0 => loglik_term + 2.0 * k + 2.0 * k * (k + 1.0) / (n - k - 1.0),
            _ => f64::NAN,
        }
    });
    matrix(&crit.mapv(na_to_r), Some(vec![None, Some(vec!["AIC".into(), "BIC".into(), "cAIC".into()])]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formula_terms() {
        let f = parse_formula("photometry ~ cs + (1 | id)").unwrap();
        assert_eq!(
            f,
            Formula { outcome: "photometry".into(), intercept: true, fixed: vec!["cs".into()], group: Some("id".into()) }
        );
        let f = parse_formula("y ~ 0 + a:b + (1 + a | subj)").unwrap();
        assert!(!f.intercept);
        assert_eq!(f.fixed, vec!["a:b"]);
        assert_eq!(f.group.as_deref(), Some("subj"));
    }

    #[test]
    fn test_formula_without_tilde_is_rejected() {
        assert!(matches!(parse_formula("photometry cs"), Err(Error::Foreign { .. })));
    }

    #[test]
    fn test_solve_recovers_inverse() {
        let a = ndarray::array![[4.0, 1.0], [1.0, 3.0]];
        let inv = solve(&a, &Array2::eye(2)).unwrap();
        let id = a.dot(&inv);
        approx::assert_abs_diff_eq!(id[[0, 0]], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(id[[0, 1]], 0.0, epsilon = 1e-12);
        assert!(solve(&ndarray::array![[1.0, 2.0], [2.0, 4.0]], &Array2::eye(2)).is_none());
    }

    #[test]
    fn test_exact_linear_outcome() {
        // y = 1 + 2 x at every point; OLS must recover it.
        let x: Vec<i32> = (0..8).collect();
        let y1: Vec<f64> = x.iter().map(|&v| 1.0 + 2.0 * f64::from(v)).collect();
        let df = DataFrame {
            columns: vec![
                ("x".into(), RObject::integer(x)),
                ("y.1".into(), RObject::real(y1.clone())),
                ("y.2".into(), RObject::real(y1)),
            ],
            row_names: fmm_core::RowNames::Automatic(8),
        };
        let args = FitArgs::from_args(&HashMap::new()).unwrap();
        let out = fui("y ~ x", &df, &args).unwrap();
        match out.get("betaHat").unwrap() {
            RObject::Real(v) => {
                assert_eq!(v.attrs.dim, Some(vec![2, 2]));
                // Column-major: intercept, slope at point 1, then point 2.
                approx::assert_abs_diff_eq!(v.data[0], 1.0, epsilon = 1e-9);
                approx::assert_abs_diff_eq!(v.data[1], 2.0, epsilon = 1e-9);
                approx::assert_abs_diff_eq!(v.data[3], 2.0, epsilon = 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

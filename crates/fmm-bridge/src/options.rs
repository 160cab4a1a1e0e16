//! `fastFMM::fui` options.
//!
//! Every field maps to one keyword of `fui`. Options that are unset
//! (`None`) are passed as `NULL` so the package applies its own default.

use std::path::Path;

use fmm_core::robject::Vector;
use fmm_core::{Arg, Error, RObject, Result};
use serde::{Deserialize, Serialize};

/// Non-negativity constraint on the variance components (`non_neg`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonNegativity {
    /// No constraint (`0`).
    #[default]
    None,
    /// Every coefficient of the variance term (`1`).
    PerCoefficient,
    /// The average of the coefficients of one variance term (`2`).
    Averaged,
}

impl NonNegativity {
    /// Integer code understood by `fui`.
    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::PerCoefficient => 1,
            Self::Averaged => 2,
        }
    }
}

/// Options forwarded to `fastFMM::fui`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuiOptions {
    /// GLM family (default `"gaussian"`).
    pub family: String,
    /// Analytic inference; bootstrap when `false` (default `true`).
    pub analytic: bool,
    /// Compute the variance of the coefficient estimates (default `true`).
    pub var: bool,
    /// Let the package parallelize the fit (default `true`).
    pub parallel: bool,
    /// Suppress progress output (default `false`).
    pub silent: bool,
    /// Indices of the functional domain to fit; all points when `None`.
    pub argvals: Option<Vec<i32>>,
    /// Minimum knots for coefficient smoothing; `L / 2` when `None`.
    pub nknots_min: Option<i32>,
    /// Minimum knots for covariance smoothing (default 35).
    pub nknots_min_cov: i32,
    /// Smoothing parameter selection (default `"GCV.Cp"`).
    pub smooth_method: String,
    /// Spline basis (default `"tp"`).
    pub splines: String,
    /// Return the design matrix (default `false`).
    pub design_mat: bool,
    /// Return residuals of the unsmoothed fits (default `false`).
    pub residuals: bool,
    /// Bootstrap replicates (default 500).
    pub n_boots: i32,
    /// Bootstrap seed (default 1).
    pub seed: i32,
    /// Name of the subject-ID column.
    pub subj_id: Option<String>,
    /// Worker count; the package picks one when `None`.
    pub n_cores: Option<i32>,
    /// Compute cAIC (default `false`).
    pub caic: bool,
    /// Return random-effect estimates (default `false`).
    pub randeffs: bool,
    /// Non-negativity constraint mode.
    pub non_neg: NonNegativity,
    /// Method-of-moments estimator (default 1); keyword `MoM`.
    pub mom: i32,
    /// Fit a concurrent model (default `false`).
    pub concurrent: bool,
    /// Impute missing outcomes with FPCA (default `false`).
    pub impute_outcome: bool,
    /// Fit even when predictor columns have zero variance (default `false`).
    pub override_zero_var: bool,
    /// Return raw, unsmoothed estimates (default `false`).
    pub unsmooth: bool,
}

impl Default for FuiOptions {
    fn default() -> Self {
        Self {
            family: "gaussian".to_string(),
            analytic: true,
            var: true,
            parallel: true,
            silent: false,
            argvals: None,
            nknots_min: None,
            nknots_min_cov: 35,
            smooth_method: "GCV.Cp".to_string(),
            splines: "tp".to_string(),
            design_mat: false,
            residuals: false,
            n_boots: 500,
            seed: 1,
            subj_id: None,
            n_cores: None,
            caic: false,
            randeffs: false,
            non_neg: NonNegativity::None,
            mom: 1,
            concurrent: false,
            impute_outcome: false,
            override_zero_var: false,
            unsmooth: false,
        }
    }
}

fn flag(b: bool) -> RObject {
    RObject::logical(vec![Some(b)])
}

fn int(x: i32) -> RObject {
    RObject::integer(vec![x])
}

fn opt<T>(value: Option<T>, f: impl FnOnce(T) -> RObject) -> RObject {
    value.map(f).unwrap_or(RObject::Null)
}

impl FuiOptions {
    /// Parse options from JSON; absent keys take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Configuration(format!("invalid fui options: {e}")))
    }

    /// Read options from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Builder: set `analytic`.
    pub fn with_analytic(mut self, analytic: bool) -> Self {
        self.analytic = analytic;
        self
    }

    /// Builder: set `var`.
    pub fn with_var(mut self, var: bool) -> Self {
        self.var = var;
        self
    }

    /// Builder: set `parallel`.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder: set `silent`.
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Builder: restrict the functional domain.
    pub fn with_argvals(mut self, argvals: Vec<i32>) -> Self {
        self.argvals = Some(argvals);
        self
    }

    /// Builder: bootstrap replicate count and seed.
    pub fn with_bootstrap(mut self, n_boots: i32, seed: i32) -> Self {
        self.n_boots = n_boots;
        self.seed = seed;
        self
    }

    /// Builder: set `override_zero_var`.
    pub fn with_override_zero_var(mut self, override_zero_var: bool) -> Self {
        self.override_zero_var = override_zero_var;
        self
    }

    /// Keyword arguments in `fui`'s parameter order.
    pub fn to_args(&self) -> Vec<(&'static str, Arg)> {
        let args: [(&'static str, RObject); 24] = [
            ("family", RObject::string(self.family.clone())),
            ("var", flag(self.var)),
            ("analytic", flag(self.analytic)),
            ("parallel", flag(self.parallel)),
            ("silent", flag(self.silent)),
            ("argvals", opt(self.argvals.clone(), |v| RObject::Integer(Vector::new(v)))),
            ("nknots_min", opt(self.nknots_min, int)),
            ("nknots_min_cov", int(self.nknots_min_cov)),
            ("smooth_method", RObject::string(self.smooth_method.clone())),
            ("splines", RObject::string(self.splines.clone())),
            ("design_mat", flag(self.design_mat)),
            ("residuals", flag(self.residuals)),
            ("n_boots", int(self.n_boots)),
            ("seed", int(self.seed)),
            ("subj_id", opt(self.subj_id.clone(), RObject::string)),
            ("n_cores", opt(self.n_cores, int)),
            ("caic", flag(self.caic)),
            ("randeffs", flag(self.randeffs)),
            ("non_neg", int(self.non_neg.code())),
            ("MoM", int(self.mom)),
            ("concurrent", flag(self.concurrent)),
            ("impute_outcome", flag(self.impute_outcome)),
            ("override_zero_var", flag(self.override_zero_var)),
            ("unsmooth", flag(self.unsmooth)),
        ];
        args.into_iter().map(|(k, v)| (k, Arg::Value(v))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg<'a>(args: &'a [(&'static str, Arg)], key: &str) -> &'a RObject {
        match args.iter().find(|(k, _)| *k == key) {
            Some((_, Arg::Value(v))) => v,
            other => panic!("missing {key}: {other:?}"),
        }
    }

    #[test]
    fn test_defaults_match_fui_signature() {
        let args = FuiOptions::default().to_args();
        assert_eq!(args.len(), 24);
        assert_eq!(arg(&args, "family").as_str(), Some("gaussian"));
        assert_eq!(arg(&args, "parallel"), &RObject::logical(vec![Some(true)]));
        assert_eq!(arg(&args, "n_boots"), &RObject::integer(vec![500]));
        assert_eq!(arg(&args, "seed"), &RObject::integer(vec![1]));
        assert_eq!(arg(&args, "nknots_min_cov"), &RObject::integer(vec![35]));
        assert_eq!(arg(&args, "MoM"), &RObject::integer(vec![1]));
        assert_eq!(arg(&args, "smooth_method").as_str(), Some("GCV.Cp"));
    }

    #[test]
    fn test_unset_options_are_null() {
        let args = FuiOptions::default().to_args();
        for key in ["argvals", "nknots_min", "subj_id", "n_cores"] {
            assert!(arg(&args, key).is_null(), "{key}");
        }
    }

    #[test]
    fn test_argvals_become_integer_vector() {
        let args = FuiOptions::default().with_argvals(vec![1, 3, 5]).to_args();
        assert_eq!(arg(&args, "argvals"), &RObject::integer(vec![1, 3, 5]));
    }

    #[test]
    fn test_non_negativity_codes() {
        let mut opts = FuiOptions::default();
        for (mode, code) in
            [(NonNegativity::None, 0), (NonNegativity::PerCoefficient, 1), (NonNegativity::Averaged, 2)]
        {
            opts.non_neg = mode;
            assert_eq!(arg(&opts.to_args(), "non_neg"), &RObject::integer(vec![code]));
        }
    }

    #[test]
    fn test_json_partial_and_unknown_keys() {
        let opts = FuiOptions::from_json_str(r#"{"analytic": false, "n_boots": 50, "non_neg": "averaged"}"#).unwrap();
        assert!(!opts.analytic);
        assert_eq!(opts.n_boots, 50);
        assert_eq!(opts.non_neg, NonNegativity::Averaged);
        assert_eq!(opts.family, "gaussian");

        let err = FuiOptions::from_json_str(r#"{"nboots": 50}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("nboots")), "{err}");
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opts.json");
        std::fs::write(&path, r#"{"silent": true, "argvals": [2, 4]}"#).unwrap();
        let opts = FuiOptions::from_path(&path).unwrap();
        assert!(opts.silent);
        assert_eq!(opts.argvals, Some(vec![2, 4]));
    }
}

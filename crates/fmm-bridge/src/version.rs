//! Installed R package versions.
//!
//! Two strategies, tried in order:
//!
//! 1. `base::as.character(utils::packageVersion(pkg))`
//! 2. `utils::installed.packages()[pkg, "Version"]`
//!
//! Only when both fail is the version reported as undeterminable.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use fmm_core::{Engine, Error, RCall, RObject, Result};

use crate::session::Session;

/// Name of the fitting package.
pub const FASTFMM: &str = "fastFMM";

/// An R package version: `.`- or `-`-separated non-negative integers.
///
/// Ordering is component-wise; a missing trailing component counts as 0,
/// so `0.4` == `0.4.0`.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    parts: Vec<u32>,
}

impl PackageVersion {
    /// Parse an R version string (`"0.4.0"`, `"1.1-35.5"`).
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let parts = text
            .split(|c: char| c == '.' || c == '-')
            .map(|p| p.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Configuration(format!("invalid package version '{text}': {e}")))?;
        if parts.is_empty() {
            return Err(Error::Configuration(format!("invalid package version '{text}'")));
        }
        Ok(Self { parts })
    }

    /// Numeric components.
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    fn component(&self, i: usize) -> u32 {
        self.parts.get(i).copied().unwrap_or(0)
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(u32::to_string).collect();
        f.write_str(&text.join("."))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let n = self.parts.len().max(other.parts.len());
        (0..n).map(|i| self.component(i).cmp(&other.component(i))).find(|o| o.is_ne()).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

fn first_string(obj: &RObject) -> Option<&str> {
    match obj {
        RObject::Character(v) => v.data.first().and_then(|s| s.as_deref()),
        _ => None,
    }
}

fn query_package_version<E: Engine>(engine: &mut E, package: &str) -> Result<String> {
    let call = RCall::new("base::as.character").arg(RCall::new("utils::packageVersion").arg(RObject::string(package)));
    let obj = engine.call(&call)?;
    first_string(&obj)
        .map(str::to_string)
        .ok_or_else(|| Error::Engine(format!("packageVersion returned {}", obj.type_name())))
}

/// `installed.packages()[package, "Version"]`, read from the returned matrix.
fn query_installed_packages<E: Engine>(engine: &mut E, package: &str) -> Result<String> {
    let obj = engine.call(&RCall::new("utils::installed.packages"))?;
    let RObject::Character(m) = &obj else {
        return Err(Error::Engine(format!("installed.packages returned {}", obj.type_name())));
    };
    let (nrow, dimnames) = match (&m.attrs.dim, &m.attrs.dimnames) {
        (Some(dim), Some(dimnames)) if dim.len() == 2 && dimnames.len() == 2 => (dim[0], dimnames),
        _ => return Err(Error::Engine("installed.packages returned an unlabeled matrix".into())),
    };
    let position = |axis: usize, label: &str| dimnames[axis].as_ref().and_then(|l| l.iter().position(|x| x == label));
    let row = position(0, package).ok_or_else(|| Error::Engine(format!("package '{package}' is not installed")))?;
    let col = position(1, "Version").ok_or_else(|| Error::Engine("no Version column".into()))?;
    m.data
        .get(row + nrow * col)
        .cloned()
        .flatten()
        .ok_or_else(|| Error::Engine(format!("no version recorded for '{package}'")))
}

/// Installed version of `package`.
pub fn package_version<E: Engine>(session: &mut Session<E>, package: &str) -> Result<PackageVersion> {
    let engine = session.engine_mut();
    let text = match query_package_version(engine, package) {
        Ok(text) => text,
        Err(first) => {
            tracing::debug!(package, error = %first, "packageVersion failed, trying installed.packages");
            query_installed_packages(engine, package).map_err(|e| Error::VersionDetection {
                package: package.to_string(),
                reason: e.to_string(),
            })?
        }
    };
    let version = PackageVersion::parse(&text)
        .map_err(|e| Error::VersionDetection { package: package.to_string(), reason: e.to_string() })?;
    tracing::debug!(package, %version, "package version detected");
    Ok(version)
}

/// `true` if the installed `package` satisfies `min <= version <= max`.
/// Either bound may be omitted.
pub fn check_version<E: Engine>(
    session: &mut Session<E>,
    package: &str,
    min: Option<&str>,
    max: Option<&str>,
) -> Result<bool> {
    let current = package_version(session, package)?;
    if let Some(min) = min {
        if current < PackageVersion::parse(min)? {
            return Ok(false);
        }
    }
    if let Some(max) = max {
        if current > PackageVersion::parse(max)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Installed `fastFMM` version.
pub fn fastfmm_version<E: Engine>(session: &mut Session<E>) -> Result<PackageVersion> {
    package_version(session, FASTFMM)
}

/// [`check_version`] for `fastFMM`.
pub fn check_fastfmm_version<E: Engine>(
    session: &mut Session<E>,
    min: Option<&str>,
    max: Option<&str>,
) -> Result<bool> {
    check_version(session, FASTFMM, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;

    fn v(s: &str) -> PackageVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_order() {
        assert_eq!(v("1.1-35.5").parts(), &[1, 1, 35, 5]);
        assert_eq!(v("0.4"), v("0.4.0"));
        assert!(v("0.10.0") > v("0.9.9"));
        assert!(v("0.4.0") < v("0.4.0.1"));
        assert_eq!(v("0.4.0").to_string(), "0.4.0");
        assert!(PackageVersion::parse("0.4.x").is_err());
        assert!(PackageVersion::parse("").is_err());
    }

    #[test]
    fn test_check_bounds_are_inclusive() {
        let mut session = Session::new(InMemoryEngine::new());
        assert!(check_fastfmm_version(&mut session, Some("0.3.0"), Some("0.5.0")).unwrap());
        assert!(!check_fastfmm_version(&mut session, Some("0.5.0"), None).unwrap());
        assert!(check_fastfmm_version(&mut session, Some("0.4.0"), Some("0.4.0")).unwrap());
        assert!(!check_fastfmm_version(&mut session, None, Some("0.3.9")).unwrap());
        assert!(check_fastfmm_version(&mut session, None, None).unwrap());
    }

    #[test]
    fn test_falls_back_to_installed_packages() {
        let mut session = Session::new(InMemoryEngine::new().with_package(FASTFMM, "0.3.1").without_version_query());
        assert_eq!(fastfmm_version(&mut session).unwrap(), v("0.3.1"));
        assert_eq!(session.engine().calls().last().map(String::as_str), Some("utils::installed.packages"));
    }

    #[test]
    fn test_both_strategies_failing() {
        let mut session = Session::new(InMemoryEngine::new().without_package(FASTFMM));
        match fastfmm_version(&mut session).unwrap_err() {
            Error::VersionDetection { package, reason } => {
                assert_eq!(package, FASTFMM);
                assert!(reason.contains("not installed"), "{reason}");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_invalid_bound_is_configuration_error() {
        let mut session = Session::new(InMemoryEngine::new());
        assert!(matches!(check_fastfmm_version(&mut session, Some("latest"), None), Err(Error::Configuration(_))));
    }
}

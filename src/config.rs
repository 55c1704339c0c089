//! Runtime configuration: where data lives and which planner to open.
//!
//! Flags win over environment variables, which win over defaults. Data is
//! stored in `~/.planner` unless told otherwise.

use std::path::PathBuf;

use crate::fields::PlannerKind;

pub const DIR_ENV: &str = "PLANNER_DIR";
pub const KIND_ENV: &str = "PLANNER_KIND";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub planner: PlannerKind,
}

impl Config {
    /// Resolve from CLI flags and the process environment.
    pub fn resolve(data_dir: Option<PathBuf>, planner: Option<PlannerKind>) -> Self {
        Self::resolve_with(data_dir, planner, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        data_dir: Option<PathBuf>,
        planner: Option<PlannerKind>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let data_dir = data_dir
            .or_else(|| env(DIR_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| {
                let home = env("HOME").unwrap_or_else(|| ".".to_string());
                PathBuf::from(home).join(".planner")
            });
        let planner = planner
            .or_else(|| env(KIND_ENV).and_then(|v| parse_kind(&v)))
            .unwrap_or_default();
        Config { data_dir, planner }
    }
}

fn parse_kind(s: &str) -> Option<PlannerKind> {
    match s.trim().to_lowercase().as_str() {
        "smart" => Some(PlannerKind::Smart),
        "weekly" => Some(PlannerKind::Weekly),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_home_dir_and_smart() {
        let cfg = Config::resolve_with(None, None, env(&[("HOME", "/home/ada")]));
        assert_eq!(cfg.data_dir, PathBuf::from("/home/ada/.planner"));
        assert_eq!(cfg.planner, PlannerKind::Smart);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let cfg = Config::resolve_with(
            None,
            None,
            env(&[("HOME", "/home/ada"), (DIR_ENV, "/tmp/plans"), (KIND_ENV, "Weekly")]),
        );
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/plans"));
        assert_eq!(cfg.planner, PlannerKind::Weekly);
    }

    #[test]
    fn test_flags_override_env() {
        let cfg = Config::resolve_with(
            Some(PathBuf::from("./data")),
            Some(PlannerKind::Smart),
            env(&[(DIR_ENV, "/tmp/plans"), (KIND_ENV, "weekly")]),
        );
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert_eq!(cfg.planner, PlannerKind::Smart);
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let cfg = Config::resolve_with(None, None, env(&[(KIND_ENV, "monthly")]));
        assert_eq!(cfg.planner, PlannerKind::Smart);
        assert_eq!(cfg.data_dir, PathBuf::from("./.planner"));
    }
}

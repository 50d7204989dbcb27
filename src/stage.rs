//! Stage registry and keyword template substitution.
//!
//! The pipeline is declared as a fixed map of named stages. Each
//! [`StageSpec`] names its expected input artifact, an optional output
//! structure artifact, an optional checkpoint dependency on a prior stage,
//! and the calculation keywords to merge into the engine configuration.
//!
//! Keyword values and output filenames are template strings with `{root}` /
//! `{nstates}` placeholders. Rendering goes through an explicit
//! [`Substitutions`] map; a template referencing a placeholder that is not
//! in the map is rejected with [`SubstitutionError::UnknownPlaceholder`]
//! rather than being passed through unresolved.
//!
//! The three built-in stages:
//!
//! | stage | input      | checkpoint from | output          |
//! |-------|------------|-----------------|-----------------|
//! | `opt` | `init.xyz` | -               | `opt.xyz`       |
//! | `gs`  | `opt.xyz`  | `opt`           | `gs.xyz`        |
//! | `td`  | `opt.xyz`  | `opt`           | `td-{root}.xyz` |

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while rendering keyword or filename templates.
#[derive(Error, Debug)]
pub enum SubstitutionError {
    /// A template referenced a placeholder with no value in the map
    #[error("template `{template}` references unknown placeholder `{placeholder}`")]
    UnknownPlaceholder {
        /// The template being rendered
        template: String,
        /// The placeholder that had no value
        placeholder: String,
    },
    /// A `{` without a matching `}` in a template
    #[error("template `{0}` has an unterminated placeholder")]
    Unterminated(String),
}

/// Immutable definition of one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// Stage name, also the basename of its `.com`/`.log`/`.chk` artifacts
    pub name: &'static str,
    /// Input structure filename, relative to the base directory
    pub input: &'static str,
    /// Output structure filename template, if the stage writes one
    pub output_template: Option<&'static str>,
    /// Stage whose checkpoint is copied forward before this one runs
    pub checkpoint_source: Option<&'static str>,
    /// Calculation keyword templates, merged into the engine configuration
    pub keywords: &'static [(&'static str, &'static str)],
}

lazy_static! {
    /// The fixed stage registry: optimization, ground state, time-dependent.
    pub static ref STAGES: BTreeMap<&'static str, StageSpec> = {
        let mut map = BTreeMap::new();
        map.insert(
            "opt",
            StageSpec {
                name: "opt",
                input: "init.xyz",
                output_template: Some("opt.xyz"),
                checkpoint_source: None,
                keywords: &[("opt", "opt")],
            },
        );
        map.insert(
            "gs",
            StageSpec {
                name: "gs",
                input: "opt.xyz",
                output_template: Some("gs.xyz"),
                checkpoint_source: Some("opt"),
                keywords: &[
                    ("population", "reg"),
                    ("geom", "allcheck"),
                    ("density", "current"),
                ],
            },
        );
        map.insert(
            "td",
            StageSpec {
                name: "td",
                input: "opt.xyz",
                output_template: Some("td-{root}.xyz"),
                checkpoint_source: Some("opt"),
                keywords: &[
                    ("td", "(root={root},nstates={nstates})"),
                    ("opt", "opt"),
                    ("density", "current"),
                    ("population", "reg"),
                    ("geom", "allcheck"),
                ],
            },
        );
        map
    };
}

/// Placeholders every built-in stage template is allowed to use.
const BUILTIN_PLACEHOLDERS: &[&str] = &["root", "nstates"];

/// Validates that the built-in registry only uses known placeholders.
///
/// Caller overrides can extend the substitution map at run time, but the
/// shipped templates must render with `root` and `nstates` alone. Called
/// once at orchestrator construction so a bad registry fails fast.
pub fn validate_registry() -> Result<(), SubstitutionError> {
    let subs = Substitutions::new(1, 1);
    for spec in STAGES.values() {
        for (_, template) in spec.keywords {
            subs.check_known(template, BUILTIN_PLACEHOLDERS)?;
        }
        if let Some(template) = spec.output_template {
            subs.check_known(template, BUILTIN_PLACEHOLDERS)?;
        }
    }
    Ok(())
}

/// Typed substitution map for keyword and filename templates.
///
/// Holds the `root`/`nstates` values for the invocation plus any caller
/// overrides. Overrides may shadow `root` and `nstates`, which is how
/// `--extras root=2` changes the `td` output filename.
#[derive(Debug, Clone)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    /// Creates a substitution map with the built-in `root`/`nstates` values.
    pub fn new(root: u32, nstates: u32) -> Self {
        let mut values = BTreeMap::new();
        values.insert("root".to_string(), root.to_string());
        values.insert("nstates".to_string(), nstates.to_string());
        Self { values }
    }

    /// Merges caller overrides into the map, shadowing existing entries.
    pub fn extend(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, value) in overrides {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Renders a template, replacing each `{name}` with its mapped value.
    ///
    /// # Errors
    ///
    /// `UnknownPlaceholder` if the template references a name with no value;
    /// `Unterminated` if a `{` has no closing `}`.
    pub fn apply(&self, template: &str) -> Result<String, SubstitutionError> {
        self.render(template, None)
    }

    fn check_known(&self, template: &str, allowed: &[&str]) -> Result<(), SubstitutionError> {
        self.render(template, Some(allowed)).map(|_| ())
    }

    fn render(
        &self,
        template: &str,
        allowed: Option<&[&str]>,
    ) -> Result<String, SubstitutionError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after
                .find('}')
                .ok_or_else(|| SubstitutionError::Unterminated(template.to_string()))?;
            let placeholder = &after[..end];
            let known = match allowed {
                Some(names) => names.contains(&placeholder),
                None => self.values.contains_key(placeholder),
            };
            if !known {
                return Err(SubstitutionError::UnknownPlaceholder {
                    template: template.to_string(),
                    placeholder: placeholder.to_string(),
                });
            }
            if let Some(value) = self.values.get(placeholder) {
                out.push_str(value);
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_three_stages() {
        assert_eq!(STAGES.len(), 3);
        assert!(STAGES.contains_key("opt"));
        assert!(STAGES.contains_key("gs"));
        assert!(STAGES.contains_key("td"));
    }

    #[test]
    fn gs_and_td_depend_on_opt_checkpoint() {
        assert_eq!(STAGES["gs"].checkpoint_source, Some("opt"));
        assert_eq!(STAGES["td"].checkpoint_source, Some("opt"));
        assert_eq!(STAGES["opt"].checkpoint_source, None);
    }

    #[test]
    fn builtin_registry_validates() {
        validate_registry().unwrap();
    }

    #[test]
    fn renders_td_keywords() {
        let subs = Substitutions::new(1, 5);
        assert_eq!(
            subs.apply("(root={root},nstates={nstates})").unwrap(),
            "(root=1,nstates=5)"
        );
        assert_eq!(subs.apply("td-{root}.xyz").unwrap(), "td-1.xyz");
    }

    #[test]
    fn overrides_shadow_builtin_values() {
        let mut subs = Substitutions::new(1, 5);
        let mut overrides = BTreeMap::new();
        overrides.insert("root".to_string(), "3".to_string());
        subs.extend(&overrides);
        assert_eq!(subs.apply("td-{root}.xyz").unwrap(), "td-3.xyz");
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let subs = Substitutions::new(1, 5);
        let err = subs.apply("td-{bogus}.xyz").unwrap_err();
        assert!(matches!(
            err,
            SubstitutionError::UnknownPlaceholder { ref placeholder, .. } if placeholder == "bogus"
        ));
    }

    #[test]
    fn unterminated_placeholder_is_rejected() {
        let subs = Substitutions::new(1, 5);
        assert!(matches!(
            subs.apply("td-{root.xyz"),
            Err(SubstitutionError::Unterminated(_))
        ));
    }

    #[test]
    fn plain_text_passes_through() {
        let subs = Substitutions::new(1, 5);
        assert_eq!(subs.apply("opt").unwrap(), "opt");
    }
}

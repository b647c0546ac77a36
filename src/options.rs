//! Option maps and their merging
//!
//! Options are opaque to vd-agent: they are only merged (global defaults
//! overlaid by per-set overrides) and rendered into engine command-line flags.

use crate::config::SetConfig;
use crate::engine::EngineLogger;
use crate::error::EngineError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Mapping of option name to value, as written in the configuration file
pub type Options = BTreeMap<String, Value>;

/// Overlay `overrides` on top of `defaults`
///
/// Every key present in `overrides` replaces the default value; keys absent
/// from `overrides` keep the default.
pub fn merge_options(defaults: &Options, overrides: &Options) -> Options {
    let mut merged = defaults.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Options for a single set, ready to hand to the download engine
///
/// Built once per set per tick and discarded after the invocation.
#[derive(Debug, Clone)]
pub struct MergedOptions {
    /// Name of the set these options belong to
    pub set_name: String,
    /// Global options overlaid by the set's own options
    pub options: Options,
    /// Logger the engine reports through
    pub logger: EngineLogger,
}

impl MergedOptions {
    /// Merge the set's options over the global defaults and attach a logger
    pub fn for_set(set: &SetConfig, global_options: &Options) -> Self {
        Self {
            set_name: set.name.clone(),
            options: merge_options(global_options, &set.options),
            logger: EngineLogger::new(&set.name),
        }
    }

    /// Look up a merged option value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Render the options as long command-line flags
    ///
    /// - `format_sort: res` → `--format-sort res`
    /// - `true` → bare flag, `false` and `null` → omitted
    /// - sequences repeat the flag once per element
    /// - keys starting with `-` are used verbatim
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidOption`] for mappings or nested sequences,
    /// which have no command-line form.
    pub fn to_cli_args(&self) -> Result<Vec<String>, EngineError> {
        let mut args = Vec::new();
        for (key, value) in &self.options {
            let flag = flag_name(key);
            match value {
                Value::Null | Value::Bool(false) => {}
                Value::Bool(true) => args.push(flag),
                Value::String(s) => {
                    args.push(flag);
                    args.push(s.clone());
                }
                Value::Number(n) => {
                    args.push(flag);
                    args.push(n.to_string());
                }
                Value::Array(items) => {
                    for item in items {
                        args.push(flag.clone());
                        args.push(scalar_arg(key, item)?);
                    }
                }
                Value::Object(_) => {
                    return Err(EngineError::InvalidOption {
                        option: key.clone(),
                        reason: "mappings cannot be passed as command-line flags".into(),
                    });
                }
            }
        }
        Ok(args)
    }
}

fn flag_name(key: &str) -> String {
    if key.starts_with('-') {
        key.to_string()
    } else {
        format!("--{}", key.replace('_', "-"))
    }
}

fn scalar_arg(key: &str, value: &Value) -> Result<String, EngineError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(EngineError::InvalidOption {
            option: key.to_string(),
            reason: "sequence elements must be strings, numbers or booleans".into(),
        }),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Options {
        serde_json::from_value(value).unwrap()
    }

    fn set(name: &str, value: Value) -> SetConfig {
        SetConfig {
            name: name.into(),
            url: format!("https://example.com/{name}"),
            options: options(value),
        }
    }

    #[test]
    fn set_options_override_global_options() {
        let global = options(json!({"quiet": true, "format": "best", "retries": 3}));
        let merged = MergedOptions::for_set(&set("b", json!({"quiet": false})), &global);

        assert_eq!(merged.get("quiet"), Some(&json!(false)));
        assert_eq!(merged.get("format"), Some(&json!("best")));
        assert_eq!(merged.get("retries"), Some(&json!(3)));
        assert_eq!(merged.options.len(), 3);
    }

    #[test]
    fn empty_set_options_keep_globals() {
        let global = options(json!({"quiet": true}));
        let merged = MergedOptions::for_set(&set("a", json!({})), &global);

        assert_eq!(merged.options, global);
        assert_eq!(merged.set_name, "a");
    }

    #[test]
    fn set_only_keys_are_added() {
        let merged = merge_options(
            &options(json!({"quiet": true})),
            &options(json!({"output": "%(title)s.%(ext)s"})),
        );
        assert_eq!(merged.get("quiet"), Some(&json!(true)));
        assert_eq!(merged.get("output"), Some(&json!("%(title)s.%(ext)s")));
    }

    #[test]
    fn merging_does_not_touch_the_defaults() {
        let global = options(json!({"quiet": true}));
        let _ = merge_options(&global, &options(json!({"quiet": false})));
        assert_eq!(global.get("quiet"), Some(&json!(true)));
    }

    #[test]
    fn renders_flags_from_option_values() {
        let merged = MergedOptions::for_set(
            &set(
                "a",
                json!({
                    "add_metadata": true,
                    "quiet": false,
                    "cookies": null,
                    "format": "bestaudio",
                    "retries": 10,
                    "match_filter": ["duration > 60", "!is_live"],
                }),
            ),
            &Options::new(),
        );

        let args = merged.to_cli_args().unwrap();

        assert_eq!(
            args,
            vec![
                "--add-metadata",
                "--format",
                "bestaudio",
                "--match-filter",
                "duration > 60",
                "--match-filter",
                "!is_live",
                "--retries",
                "10",
            ]
        );
    }

    #[test]
    fn dashed_keys_are_used_verbatim() {
        let merged = MergedOptions::for_set(
            &set("a", json!({"-f": "mp4", "--no-playlist": true})),
            &Options::new(),
        );
        assert_eq!(merged.to_cli_args().unwrap(), vec!["--no-playlist", "-f", "mp4"]);
    }

    #[test]
    fn mapping_values_are_rejected() {
        let merged = MergedOptions::for_set(
            &set("a", json!({"postprocessor_args": {"ffmpeg": "-an"}})),
            &Options::new(),
        );

        match merged.to_cli_args() {
            Err(EngineError::InvalidOption { option, .. }) => {
                assert_eq!(option, "postprocessor_args");
            }
            other => panic!("Expected InvalidOption, got: {:?}", other),
        }
    }

    #[test]
    fn nested_sequences_are_rejected() {
        let merged =
            MergedOptions::for_set(&set("a", json!({"sub_langs": [["en"]]})), &Options::new());
        assert!(matches!(
            merged.to_cli_args(),
            Err(EngineError::InvalidOption { .. })
        ));
    }
}

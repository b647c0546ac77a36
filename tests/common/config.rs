//! Configuration fixtures

use std::io::Write;
use tempfile::NamedTempFile;
use vd_agent::Config;

/// Three sets, one hour apart, with a global option overridden by `two`
pub const THREE_SETS: &str = r#"
interval: 3600
global_options:
  quiet: true
  format: bestaudio
sets:
  - name: one
    url: https://example.com/one
  - name: two
    url: https://example.com/two
    options:
      quiet: false
  - name: three
    url: https://example.com/three
"#;

/// Write `contents` to a temporary file that lives as long as the handle
pub fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config file");
    file
}

/// Parse a configuration that is known to be valid
pub fn config_from(contents: &str) -> Config {
    Config::from_yaml_str(contents).expect("Test configuration should be valid")
}

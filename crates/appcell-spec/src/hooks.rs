//! Lifecycle hook entries.
//!
//! Every stage runs the same launcher, told which stage it is in and where
//! the spec lives: `[name, -h, <stage>, -c, <spec path>, -v]`.

use std::path::Path;

use appcell_common::config::GeneratorConfig;
use appcell_common::constants::HOOK_STAGES;
use appcell_common::error::Result;

use crate::builder::SpecBuilder;
use crate::document::Hook;

/// Builds the launcher hook for `stage`.
#[must_use]
pub fn launcher_hook(config: &GeneratorConfig, stage: &str, spec_path: &Path) -> Hook {
    Hook {
        path: config.launcher_path.display().to_string(),
        args: vec![
            config.launcher_name.clone(),
            "-h".into(),
            stage.into(),
            "-c".into(),
            spec_path.display().to_string(),
            "-v".into(),
        ],
    }
}

/// Adds a launcher hook for each of the four lifecycle stages.
///
/// # Errors
///
/// Returns an error if the `hooks` section has the wrong shape.
pub fn apply_hooks(builder: &mut SpecBuilder, config: &GeneratorConfig, spec_path: &Path) -> Result<()> {
    for stage in HOOK_STAGES {
        builder.add_hook(stage, &launcher_hook(config, stage, spec_path))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn hook_arguments_name_stage_and_spec() {
        let config = GeneratorConfig::default();
        let hook = launcher_hook(&config, "poststart", Path::new("/run/a/config.json"));
        assert_eq!(hook.path, "/usr/bin/appcell-hook");
        assert_eq!(
            hook.args,
            ["appcell-hook", "-h", "poststart", "-c", "/run/a/config.json", "-v"]
        );
    }

    #[test]
    fn all_four_stages_are_populated() {
        let mut builder = SpecBuilder::from_template(json!({})).expect("template");
        apply_hooks(&mut builder, &GeneratorConfig::default(), Path::new("/s.json")).expect("hooks");
        let spec = builder.finish();
        let hooks = spec.pointer("/hooks").and_then(|h| h.as_object()).expect("hooks object");
        let mut stages: Vec<_> = hooks.keys().map(String::as_str).collect();
        stages.sort_unstable();
        assert_eq!(stages, ["createContainer", "createRuntime", "poststart", "poststop"]);
    }

    #[test]
    fn malformed_hooks_section_is_an_error() {
        let mut builder = SpecBuilder::from_template(json!({"hooks": []})).expect("template");
        assert!(apply_hooks(&mut builder, &GeneratorConfig::default(), Path::new("/s.json")).is_err());
    }
}

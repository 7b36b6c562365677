//! Incremental construction of a runtime specification.
//!
//! The builder owns the document exclusively until [`SpecBuilder::finish`].
//! Sections missing from the template (or `null` in it) are created on
//! demand; a section of the wrong JSON type is a shape error.

use appcell_common::error::{AppcellError, Result};
use appcell_common::types::DeviceNode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::{DeviceRule, Hook, IdMapping, LinuxDevice, Mount, RuntimeSpec, User};

/// Owns a specification document under construction.
#[derive(Debug)]
pub struct SpecBuilder {
    doc: Map<String, Value>,
}

impl SpecBuilder {
    /// Starts from a base template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not a JSON object.
    pub fn from_template(template: Value) -> Result<Self> {
        match template {
            Value::Object(doc) => Ok(Self { doc }),
            other => Err(AppcellError::config(format!(
                "base template must be an object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Appends a token to `process.args`.
    ///
    /// # Errors
    ///
    /// Returns an error if `process.args` is not a list.
    pub fn push_arg(&mut self, arg: impl Into<String>) -> Result<()> {
        self.array_at(&["process", "args"])?.push(Value::String(arg.into()));
        Ok(())
    }

    /// Appends `KEY=VALUE` to `process.env`.
    ///
    /// # Errors
    ///
    /// Returns an error if `process.env` is not a list.
    pub fn push_env(&mut self, key: &str, value: &str) -> Result<()> {
        self.push_env_entry(format!("{key}={value}"))
    }

    /// Appends a preformatted entry to `process.env`.
    ///
    /// # Errors
    ///
    /// Returns an error if `process.env` is not a list.
    pub fn push_env_entry(&mut self, entry: String) -> Result<()> {
        self.array_at(&["process", "env"])?.push(Value::String(entry));
        Ok(())
    }

    /// Grants a capability.
    ///
    /// The name is added to `linux.capabilities` and to every capability
    /// set the template declares under `process.capabilities`. Names
    /// already present in a list are not repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if `linux.capabilities` is not a list.
    pub fn add_capability(&mut self, name: &str) -> Result<()> {
        push_unique(self.array_at(&["linux", "capabilities"])?, name);

        let sets = self
            .doc
            .get_mut("process")
            .and_then(|p| p.get_mut("capabilities"))
            .and_then(Value::as_object_mut);
        if let Some(sets) = sets {
            for set in sets.values_mut().filter_map(Value::as_array_mut) {
                push_unique(set, name);
            }
        }
        Ok(())
    }

    /// Grants access to a device node.
    ///
    /// Adds the `linux.devices` entry and its `linux.resources.devices`
    /// allow rule together; if either list is malformed neither is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if either list has the wrong shape.
    pub fn add_device(&mut self, node: &DeviceNode) -> Result<()> {
        self.check_list(&["linux", "devices"])?;
        self.check_list(&["linux", "resources", "devices"])?;
        let device = to_value(&LinuxDevice::from(node))?;
        let rule = to_value(&DeviceRule::from(node))?;
        self.array_at(&["linux", "devices"])?.push(device);
        self.array_at(&["linux", "resources", "devices"])?.push(rule);
        Ok(())
    }

    /// Appends an entry to `linux.uidMappings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the list has the wrong shape.
    pub fn add_uid_mapping(&mut self, mapping: IdMapping) -> Result<()> {
        let value = to_value(&mapping)?;
        self.array_at(&["linux", "uidMappings"])?.push(value);
        Ok(())
    }

    /// Appends an entry to `linux.gidMappings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the list has the wrong shape.
    pub fn add_gid_mapping(&mut self, mapping: IdMapping) -> Result<()> {
        let value = to_value(&mapping)?;
        self.array_at(&["linux", "gidMappings"])?.push(value);
        Ok(())
    }

    /// Appends an entry to `mounts`.
    ///
    /// # Errors
    ///
    /// Returns an error if `mounts` is not a list.
    pub fn add_mount(&mut self, mount: &Mount) -> Result<()> {
        let value = to_value(mount)?;
        self.array_at(&["mounts"])?.push(value);
        Ok(())
    }

    /// Appends a hook to `hooks.<stage>`.
    ///
    /// # Errors
    ///
    /// Returns an error if `hooks` or the stage list has the wrong shape.
    pub fn add_hook(&mut self, stage: &str, hook: &Hook) -> Result<()> {
        let value = to_value(hook)?;
        self.array_at(&["hooks", stage])?.push(value);
        Ok(())
    }

    /// Replaces `process.user`.
    ///
    /// # Errors
    ///
    /// Returns an error if `process` is not an object.
    pub fn set_user(&mut self, user: &User) -> Result<()> {
        let value = to_value(user)?;
        let _ = self.object_at(&["process"])?.insert("user".into(), value);
        Ok(())
    }

    /// Replaces `process.cwd`.
    ///
    /// # Errors
    ///
    /// Returns an error if `process` is not an object.
    pub fn set_cwd(&mut self, cwd: &str) -> Result<()> {
        let _ = self
            .object_at(&["process"])?
            .insert("cwd".into(), Value::String(cwd.into()));
        Ok(())
    }

    /// Replaces the container hostname.
    pub fn set_hostname(&mut self, hostname: &str) {
        let _ = self
            .doc
            .insert("hostname".into(), Value::String(hostname.into()));
    }

    /// Replaces `linux.resources.memory.limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if any section on the way has the wrong shape.
    pub fn set_memory_limit(&mut self, bytes: u64) -> Result<()> {
        let _ = self
            .object_at(&["linux", "resources", "memory"])?
            .insert("limit".into(), Value::from(bytes));
        Ok(())
    }

    /// Completes construction.
    #[must_use]
    pub fn finish(self) -> RuntimeSpec {
        RuntimeSpec::new(Value::Object(self.doc))
    }

    /// Checks that `path` is a list or can become one, without touching
    /// the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the list or one of its parents has the wrong
    /// shape.
    pub fn check_list(&self, path: &[&str]) -> Result<()> {
        let mut current = &self.doc;
        for (depth, key) in path.iter().enumerate() {
            let slot = match current.get(*key) {
                None | Some(Value::Null) => return Ok(()),
                Some(slot) => slot,
            };
            if depth + 1 == path.len() {
                return if slot.is_array() {
                    Ok(())
                } else {
                    Err(shape_error(path, "a list", json_kind(slot)))
                };
            }
            current = slot
                .as_object()
                .ok_or_else(|| shape_error(&path[..=depth], "an object", json_kind(slot)))?;
        }
        Err(AppcellError::config("empty document path"))
    }

    fn object_at(&mut self, path: &[&str]) -> Result<&mut Map<String, Value>> {
        let mut current = &mut self.doc;
        for (depth, key) in path.iter().enumerate() {
            let slot = current.entry((*key).to_string()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            let kind = json_kind(slot);
            current = slot
                .as_object_mut()
                .ok_or_else(|| shape_error(&path[..=depth], "an object", kind))?;
        }
        Ok(current)
    }

    fn array_at(&mut self, path: &[&str]) -> Result<&mut Vec<Value>> {
        let Some((last, parents)) = path.split_last() else {
            return Err(AppcellError::config("empty document path"));
        };
        let slot = self
            .object_at(parents)?
            .entry((*last).to_string())
            .or_insert(Value::Null);
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        let kind = json_kind(slot);
        slot.as_array_mut()
            .ok_or_else(|| shape_error(path, "a list", kind))
    }
}

fn push_unique(list: &mut Vec<Value>, name: &str) {
    if !list.iter().any(|v| v.as_str() == Some(name)) {
        list.push(Value::String(name.into()));
    }
}

fn to_value<T: Serialize>(fragment: &T) -> Result<Value> {
    Ok(serde_json::to_value(fragment)?)
}

fn shape_error(path: &[&str], expected: &str, found: &str) -> AppcellError {
    AppcellError::config(format!(
        "`{}` must be {expected}, found {found}",
        path.join(".")
    ))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use appcell_common::types::DeviceKind;
    use serde_json::json;

    use super::*;

    fn builder(template: Value) -> SpecBuilder {
        SpecBuilder::from_template(template).expect("template")
    }

    #[test]
    fn check_list_leaves_document_untouched() {
        let b = builder(json!({"linux": {"devices": {}}}));
        assert!(b.check_list(&["mounts"]).is_ok());
        assert!(b.check_list(&["linux", "resources", "devices"]).is_ok());
        assert!(b.check_list(&["linux", "devices"]).is_err());
        let spec = b.finish();
        assert!(spec.pointer("/mounts").is_none());
        assert!(spec.pointer("/linux/resources").is_none());
    }

    #[test]
    fn non_object_template_is_rejected() {
        assert!(SpecBuilder::from_template(json!([1, 2])).is_err());
    }

    #[test]
    fn args_append_after_template_args() {
        let mut b = builder(json!({"process": {"args": ["/usr/bin/runner"]}}));
        b.push_arg("/bin/app").expect("arg");
        let spec = b.finish();
        assert_eq!(spec.pointer("/process/args"), Some(&json!(["/usr/bin/runner", "/bin/app"])));
    }

    #[test]
    fn null_sections_are_created() {
        let mut b = builder(json!({"hooks": null}));
        b.add_hook("poststop", &Hook { path: "/bin/true".into(), args: vec![] })
            .expect("hook");
        assert!(b.finish().pointer("/hooks/poststop/0/path").is_some());
    }

    #[test]
    fn wrong_shape_is_reported_with_path() {
        let mut b = builder(json!({"process": {"env": "PATH=/bin"}}));
        let err = b.push_env("HOME", "/home/private").expect_err("shape");
        assert!(err.to_string().contains("process.env"));
    }

    #[test]
    fn device_entries_come_in_pairs() {
        let node = DeviceNode {
            path: "/dev/null".into(),
            kind: DeviceKind::Character,
            major: 1,
            minor: 3,
        };
        let mut b = builder(json!({}));
        b.add_device(&node).expect("device");
        let spec = b.finish();
        assert_eq!(spec.pointer("/linux/devices").and_then(Value::as_array).map(Vec::len), Some(1));
        assert_eq!(
            spec.pointer("/linux/resources/devices").and_then(Value::as_array).map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn malformed_rule_list_blocks_device_entry() {
        let node = DeviceNode {
            path: "/dev/null".into(),
            kind: DeviceKind::Character,
            major: 1,
            minor: 3,
        };
        let mut b = builder(json!({"linux": {"resources": {"devices": {}}}}));
        assert!(b.add_device(&node).is_err());
        assert!(b.finish().pointer("/linux/devices").is_none());
    }

    #[test]
    fn capabilities_mirror_into_template_sets() {
        let mut b = builder(json!({
            "process": {"capabilities": {"bounding": ["CAP_KILL"], "effective": []}}
        }));
        b.add_capability("CAP_NET_BIND_SERVICE").expect("cap");
        b.add_capability("CAP_KILL").expect("cap");
        let spec = b.finish();
        assert_eq!(
            spec.pointer("/linux/capabilities"),
            Some(&json!(["CAP_NET_BIND_SERVICE", "CAP_KILL"]))
        );
        assert_eq!(
            spec.pointer("/process/capabilities/bounding"),
            Some(&json!(["CAP_KILL", "CAP_NET_BIND_SERVICE"]))
        );
        assert_eq!(
            spec.pointer("/process/capabilities/effective"),
            Some(&json!(["CAP_NET_BIND_SERVICE", "CAP_KILL"]))
        );
    }

    #[test]
    fn memory_limit_overwrites_template_value() {
        let mut b = builder(json!({"linux": {"resources": {"memory": {"limit": 1}}}}));
        b.set_memory_limit(4096).expect("limit");
        assert_eq!(b.finish().pointer("/linux/resources/memory/limit"), Some(&json!(4096)));
    }
}

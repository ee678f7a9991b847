use serde_json::{Map, Value, json};

/// Dotted-path view over a JSON configuration object.
///
/// [`MindmapConfig::default`] carries the built-in defaults; user overrides are layered on top
/// with [`MindmapConfig::deep_merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MindmapConfig(Value);

impl Default for MindmapConfig {
    fn default() -> Self {
        Self(default_config())
    }
}

fn default_config() -> Value {
    json!({
        "fontFamily": "\"trebuchet ms\", verdana, arial, sans-serif",
        "fontSize": 14,
        "gateway": {
            "baseUrl": "http://127.0.0.1:5000",
            "timeoutMs": 30000
        },
        "tree": {
            "placeholderLabel": "Unnamed Topic",
            "newNodeLabel": "New Subtopic"
        },
        "layout": {
            "levelSeparation": 220,
            "siblingSeparation": 24,
            "maxLabelWidth": 150,
            "nodePadding": 10
        }
    })
}

impl MindmapConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parses a JSON document and layers it over the built-in defaults.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        let overrides: Value = serde_json::from_str(text)?;
        let mut config = Self::default();
        config.deep_merge(&overrides);
        Ok(config)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.lookup(dotted_path)?.as_f64()
    }

    pub fn get_u64(&self, dotted_path: &str) -> Option<u64> {
        self.lookup(dotted_path)?.as_u64()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.lookup(dotted_path)?.as_bool()
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        // `from_value` accepts any JSON value; coerce to an object so this never panics.
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_expose_gateway_and_tree_settings() {
        let config = MindmapConfig::default();
        assert_eq!(
            config.get_str("gateway.baseUrl"),
            Some("http://127.0.0.1:5000")
        );
        assert_eq!(config.get_u64("gateway.timeoutMs"), Some(30000));
        assert_eq!(config.get_str("tree.placeholderLabel"), Some("Unnamed Topic"));
        assert_eq!(config.get_f64("layout.maxLabelWidth"), Some(150.0));
    }

    #[test]
    fn json_overrides_merge_over_defaults() {
        let config =
            MindmapConfig::from_json_str(r#"{"gateway":{"timeoutMs":500},"fontSize":18}"#)
                .unwrap();
        assert_eq!(config.get_u64("gateway.timeoutMs"), Some(500));
        assert_eq!(
            config.get_str("gateway.baseUrl"),
            Some("http://127.0.0.1:5000")
        );
        assert_eq!(config.get_f64("fontSize"), Some(18.0));
    }

    #[test]
    fn set_value_replaces_non_object_segments() {
        let mut config = MindmapConfig::from_value(json!(3));
        config.set_value("layout.levelSeparation", json!(300));
        assert_eq!(config.get_f64("layout.levelSeparation"), Some(300.0));

        config.set_value("layout.levelSeparation.deep", json!(true));
        assert_eq!(config.get_bool("layout.levelSeparation.deep"), Some(true));
    }
}

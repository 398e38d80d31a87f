//! The settings module owns `SettingsTree`, the nested TOML document that Bottlerocket's settings
//! daemon reads from user-data.
//!
//! User-supplied settings arrive as a free-form document and are merged with settings derived
//! from the node group by path.  Kubernetes names such as `node.kubernetes.io/role` legitimately
//! contain dots, so a key is never split on dots; `protect_dotted_keys` wraps such keys in quotes
//! so they stay atomic.
//!
//! Rendering follows the layout Bottlerocket users are used to: simple values before sub-tables,
//! keys in sorted order, a blank line before every table header, and two spaces of indentation per
//! level of nesting.  Entries can be rendered "commented out" to show a setting without making it
//! active.

use crate::model::InlineDocument;
use serde_json::Value;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::mem;
use toml_edit::Key;

/// A nested table of settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTree {
    values: BTreeMap<String, Leaf>,
    tables: BTreeMap<String, SettingsTree>,
}

#[derive(Debug, Clone, PartialEq)]
struct Leaf {
    value: Value,
    commented: bool,
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a free-form document; objects become tables.
    pub fn from_document(document: &InlineDocument) -> Self {
        let mut tree = Self::new();
        for (key, value) in document {
            tree.insert(key, value.clone(), false);
        }
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.tables.is_empty()
    }

    /// Whether the path names an active value or a table.  Commented-out values don't count.
    pub fn has_path<S: AsRef<str>>(&self, path: &[S]) -> bool {
        match path.split_last() {
            None => true,
            Some((last, parents)) => self.table(parents).map_or(false, |tree| {
                let key = last.as_ref();
                tree.tables.contains_key(key) || tree.active_value(key).is_some()
            }),
        }
    }

    /// Returns the table at the path, if there is one.
    pub fn table<S: AsRef<str>>(&self, path: &[S]) -> Option<&SettingsTree> {
        path.iter()
            .try_fold(self, |tree, key| tree.tables.get(key.as_ref()))
    }

    /// Returns the active value at the path, if there is one.
    pub fn get_value<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        self.table(parents)?.active_value(last.as_ref())
    }

    /// Sets the value at the path, creating tables along the way and replacing whatever was
    /// there.  Object values become tables.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        if let Some((last, parents)) = path.split_last() {
            self.table_mut(parents).insert(last.as_ref(), value, false);
        }
    }

    /// Like `set_path`, but the value is rendered commented out, so it documents the setting
    /// without taking effect.
    pub fn set_path_commented<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        if let Some((last, parents)) = path.split_last() {
            self.table_mut(parents).insert(last.as_ref(), value, true);
        }
    }

    /// Returns the table at the path, creating it and any missing parents.  Values in the way are
    /// replaced by tables.
    pub fn table_mut<S: AsRef<str>>(&mut self, path: &[S]) -> &mut SettingsTree {
        let mut tree = self;
        for key in path {
            let key = key.as_ref();
            tree.values.remove(key);
            tree = tree.tables.entry(key.to_string()).or_default();
        }
        tree
    }

    /// Quotes every key that contains a dot, at every depth, so the key is treated as one name
    /// rather than a path.  Keys that are already quoted are left alone.
    pub fn protect_dotted_keys(&mut self) {
        self.values = mem::take(&mut self.values)
            .into_iter()
            .map(|(key, leaf)| (protect_key(key), leaf))
            .collect();
        self.tables = mem::take(&mut self.tables)
            .into_iter()
            .map(|(key, mut table)| {
                table.protect_dotted_keys();
                (protect_key(key), table)
            })
            .collect();
    }

    /// Renders the tree as TOML text.  An empty tree renders as an empty string.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        self.write_table(&mut out, "", 0)?;
        Ok(out)
    }

    fn active_value(&self, key: &str) -> Option<&Value> {
        self.values
            .get(key)
            .filter(|leaf| !leaf.commented)
            .map(|leaf| &leaf.value)
    }

    fn insert(&mut self, key: &str, value: Value, commented: bool) {
        match value {
            Value::Object(map) if !commented => {
                self.values.remove(key);
                self.tables
                    .insert(key.to_string(), SettingsTree::from_document(&map));
            }
            value => {
                self.tables.remove(key);
                self.values
                    .insert(key.to_string(), Leaf { value, commented });
            }
        }
    }

    fn write_table(&self, out: &mut String, name: &str, indent: usize) -> Result<()> {
        let pad = " ".repeat(indent);

        for (key, leaf) in &self.values {
            let value = toml::Value::try_from(&leaf.value).with_context(|_| {
                error::EncodingSnafu {
                    key: join_key(name, key),
                }
            })?;
            out.push_str(&pad);
            if leaf.commented {
                out.push_str("# ");
            }
            out.push_str(&format!("{} = {}\n", key_repr(key), value));
        }

        for (key, table) in &self.tables {
            let full_key = join_key(name, key);
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("{}[{}]\n", pad, full_key));
            table.write_table(out, &full_key, indent + 2)?;
        }

        Ok(())
    }
}

/// The name a stored key stands for.  A key spelled as a single quoted TOML key, which is what
/// protection leaves behind, stands for its unquoted contents.
fn key_name(key: &str) -> String {
    key.parse::<Key>()
        .map(|parsed| parsed.get().to_string())
        .unwrap_or_else(|_| key.to_string())
}

fn key_repr(key: &str) -> String {
    Key::new(key_name(key)).display_repr().into_owned()
}

fn protect_key(key: String) -> String {
    // Dots never appear in bare keys, so a dotted key that parses as one key is already quoted.
    if key.contains('.') && key.parse::<Key>().is_err() {
        Key::new(key).display_repr().into_owned()
    } else {
        key
    }
}

fn join_key(table: &str, key: &str) -> String {
    if table.is_empty() {
        key_repr(key)
    } else {
        format!("{}.{}", table, key_repr(key))
    }
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum Error {
        #[snafu(display("Unable to encode setting '{}' as TOML: {}", key, source))]
        Encoding {
            key: String,
            source: toml::ser::Error,
        },
    }
}

pub use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

// =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=   =^..^=

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> InlineDocument {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn dotted_keys_become_atomic() {
        let mut tree = SettingsTree::from_document(&document(json!({
            "a.b.c": "top",
            "kubernetes": {
                "node-labels": {"alpha.eksctl.io/nodegroup-name": "ng-1"},
                "deep": {"x.y": {"p.q": true}}
            }
        })));
        tree.protect_dotted_keys();

        assert!(!tree.has_path(&["a", "b", "c"]));
        assert!(tree.has_path(&["\"a.b.c\""]));
        assert!(tree.has_path(&[
            "kubernetes",
            "node-labels",
            "\"alpha.eksctl.io/nodegroup-name\""
        ]));
        assert!(tree.has_path(&["kubernetes", "deep", "\"x.y\"", "\"p.q\""]));
        assert!(!tree.has_path(&["kubernetes", "deep", "x", "y"]));
    }

    #[test]
    fn protection_is_idempotent() {
        let mut tree = SettingsTree::from_document(&document(json!({
            "kubernetes": {"node-taints": {"example.com/dedicated": "gpu:NoSchedule"}}
        })));
        tree.protect_dotted_keys();
        let once = tree.clone();
        tree.protect_dotted_keys();
        assert_eq!(tree, once);
        assert!(tree.has_path(&["kubernetes", "node-taints", "\"example.com/dedicated\""]));
    }

    #[test]
    fn rendered_dotted_keys_parse_back_whole() {
        let mut tree = SettingsTree::new();
        tree.set_path(
            &["settings", "kubernetes", "node-labels", "foo.bar/baz"],
            json!("value"),
        );
        tree.protect_dotted_keys();
        let rendered = tree.render().unwrap();
        let parsed: toml::Value = toml::from_str(&rendered).unwrap();
        assert_eq!(
            parsed["settings"]["kubernetes"]["node-labels"]["foo.bar/baz"].as_str(),
            Some("value")
        );
    }

    #[test]
    fn empty_tables_render() {
        let mut tree = SettingsTree::new();
        tree.table_mut(&["settings", "kubernetes"]);
        assert_eq!(
            tree.render().unwrap(),
            "[settings]\n\n  [settings.kubernetes]\n"
        );
    }

    #[test]
    fn layout() {
        let mut tree = SettingsTree::new();
        tree.set_path(&["settings", "motd"], json!("hello world"));
        tree.set_path(&["settings", "kubernetes", "max-pods"], json!(4));
        tree.set_path(
            &["settings", "kubernetes", "cluster-name"],
            json!("unit-test"),
        );
        tree.set_path_commented(
            &["settings", "host-containers", "admin", "enabled"],
            json!(false),
        );
        assert_eq!(
            tree.render().unwrap(),
            r#"[settings]
  motd = "hello world"

  [settings.host-containers]

    [settings.host-containers.admin]
      # enabled = false

  [settings.kubernetes]
    cluster-name = "unit-test"
    max-pods = 4
"#
        );
    }

    #[test]
    fn commented_values_are_inactive() {
        let mut tree = SettingsTree::new();
        let admin_enabled = ["settings", "host-containers", "admin", "enabled"];
        tree.set_path_commented(&admin_enabled, json!(false));
        assert!(!tree.has_path(&admin_enabled));
        assert!(tree.has_path(&["settings", "host-containers", "admin"]));

        let parsed: toml::Value = toml::from_str(&tree.render().unwrap()).unwrap();
        assert!(parsed["settings"]["host-containers"]["admin"]
            .get("enabled")
            .is_none());
    }

    #[test]
    fn set_path_replaces() {
        let mut tree = SettingsTree::from_document(&document(json!({
            "kubernetes": {"node-labels": {"old": "label"}, "max-pods": 10}
        })));
        tree.set_path(&["kubernetes", "node-labels"], json!({"new": "label"}));
        tree.set_path(&["kubernetes", "max-pods"], json!(4));
        assert!(!tree.has_path(&["kubernetes", "node-labels", "old"]));
        assert_eq!(
            tree.get_value(&["kubernetes", "node-labels", "new"]),
            Some(&json!("label"))
        );
        assert_eq!(tree.get_value(&["kubernetes", "max-pods"]), Some(&json!(4)));

        // A value in the way of a table is replaced.
        tree.set_path(&["kubernetes", "max-pods", "nested"], json!(true));
        assert!(tree.table(&["kubernetes", "max-pods"]).is_some());
    }

    #[test]
    fn arrays_and_inline_tables() {
        let mut tree = SettingsTree::new();
        tree.set_path(
            &["settings", "dns", "name-servers"],
            json!(["1.1.1.1", "8.8.8.8"]),
        );
        tree.set_path(
            &["settings", "list"],
            json!([{"a.b": 1, "c": [true, 1.5]}, {}]),
        );
        let parsed: toml::Value = toml::from_str(&tree.render().unwrap()).unwrap();
        let servers = parsed["settings"]["dns"]["name-servers"].as_array().unwrap();
        assert_eq!(servers[1].as_str(), Some("8.8.8.8"));
        assert_eq!(parsed["settings"]["list"][0]["a.b"].as_integer(), Some(1));
        assert_eq!(parsed["settings"]["list"][0]["c"][1].as_float(), Some(1.5));
        assert!(parsed["settings"]["list"][1].as_table().unwrap().is_empty());
    }

    #[test]
    fn null_is_rejected() {
        let tree = SettingsTree::from_document(&document(json!({
            "settings": {"kubernetes": {"cluster-dns-ip": null}}
        })));
        let err = tree.render().unwrap_err();
        assert!(err
            .to_string()
            .contains("settings.kubernetes.cluster-dns-ip"));
    }

    #[test]
    fn integers_beyond_toml_range_are_rejected() {
        let mut tree = SettingsTree::new();
        tree.set_path(&["settings", "big"], json!(u64::MAX));
        let err = tree.render().unwrap_err();
        assert!(err.to_string().contains("settings.big"));

        tree.set_path(&["settings", "big"], json!(i64::MAX));
        let parsed: toml::Value = toml::from_str(&tree.render().unwrap()).unwrap();
        assert_eq!(parsed["settings"]["big"].as_integer(), Some(i64::MAX));
    }

    #[test]
    fn odd_keys_and_strings_parse_back() {
        let mut tree = SettingsTree::new();
        tree.set_path(&["settings", "with space"], json!("x\ty"));
        tree.set_path(&["settings", "motd"], json!("hello \"world\" \\ 'quoted'"));
        let rendered = tree.render().unwrap();
        let parsed: toml::Value = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed["settings"]["with space"].as_str(), Some("x\ty"));
        assert_eq!(
            parsed["settings"]["motd"].as_str(),
            Some("hello \"world\" \\ 'quoted'")
        );
    }

    #[test]
    fn key_that_looks_like_a_path_stays_whole() {
        let mut tree = SettingsTree::new();
        tree.set_path(&["settings", r#""a"."b""#], json!("v"));
        tree.protect_dotted_keys();
        let rendered = tree.render().unwrap();
        let parsed: toml::Value = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed["settings"][r#""a"."b""#].as_str(), Some("v"));
        assert!(parsed["settings"].get("a").is_none());

        // Protecting again doesn't wrap the key a second time.
        let once = tree.clone();
        tree.protect_dotted_keys();
        assert_eq!(tree, once);
    }

    #[test]
    fn empty_tree_renders_empty() {
        assert_eq!(SettingsTree::new().render().unwrap(), "");
    }
}

//! Canvas documents
//!
//! A canvas is a JSON object with a `nodes` array. Nodes tagged
//! `"type": "file"` reference a vault file through their `file` field. The
//! document is held as a generic JSON value with key order preserved, so a
//! rewrite only changes the `file` fields it targets and leaves every other
//! field, and the node order, as they were.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::DocumentError;

mod keys {
    pub const NODES: &str = "nodes";
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const FILE: &str = "file";
    pub const FILE_TYPE: &str = "file";
}

/// A canvas node that references a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    /// Node id, empty if the node has none
    pub id: String,
    /// File path as written in the canvas
    pub file: String,
}

/// A parsed canvas document
#[derive(Debug, Clone)]
pub struct Canvas {
    root: Value,
}

impl Canvas {
    /// Parse canvas JSON
    ///
    /// A canvas without a `nodes` key has no nodes; a `nodes` value that is
    /// not an array is rejected.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let root: Value = serde_json::from_str(text).map_err(DocumentError::InvalidJson)?;
        let Value::Object(ref map) = root else {
            return Err(DocumentError::InvalidCanvas(
                "top-level value is not an object".to_string(),
            ));
        };
        if let Some(nodes) = map.get(keys::NODES) {
            if !nodes.is_array() {
                return Err(DocumentError::InvalidCanvas(
                    "'nodes' is not an array".to_string(),
                ));
            }
        }
        Ok(Self { root })
    }

    /// File nodes in document order
    pub fn file_nodes(&self) -> Vec<FileNode> {
        self.nodes()
            .filter_map(|node| {
                let file = file_field(node)?;
                let id = node
                    .get(keys::ID)
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Some(FileNode {
                    id: id.to_string(),
                    file: file.to_string(),
                })
            })
            .collect()
    }

    /// Rewrite file references
    ///
    /// `retarget` receives each file node's current `file` value and returns
    /// the replacement, or `None` to leave the node alone. Returns the number
    /// of nodes changed.
    pub fn retarget<F>(&mut self, mut retarget: F) -> usize
    where
        F: FnMut(&str) -> Option<String>,
    {
        let Some(nodes) = self
            .root
            .get_mut(keys::NODES)
            .and_then(Value::as_array_mut)
        else {
            return 0;
        };

        let mut changed = 0;
        for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
            let Some(current) = file_field(node) else {
                continue;
            };
            let Some(replacement) = retarget(current) else {
                continue;
            };
            if replacement == current {
                continue;
            }
            node.insert(keys::FILE.to_string(), Value::String(replacement));
            changed += 1;
        }
        changed
    }

    /// Serialize with tab indentation
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        let mut buf = Vec::new();
        {
            let formatter = PrettyFormatter::with_indent(b"\t");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            self.root
                .serialize(&mut ser)
                .map_err(DocumentError::InvalidJson)?;
        }
        String::from_utf8(buf).map_err(|_| DocumentError::NotUtf8)
    }

    fn nodes(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.root
            .get(keys::NODES)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }
}

fn file_field(node: &Map<String, Value>) -> Option<&str> {
    if node.get(keys::TYPE)?.as_str()? != keys::FILE_TYPE {
        return None;
    }
    node.get(keys::FILE)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: &str = r#"{
	"nodes":[
		{"id":"n1","type":"text","text":"hello","x":0,"y":0,"width":250,"height":60},
		{"id":"n2","type":"file","file":"diagram.pdf","x":-10,"y":80,"width":400,"height":400,"color":"4"},
		{"id":"n3","type":"file","file":"img/cat.png","x":500,"y":80,"width":300,"height":300}
	],
	"edges":[{"id":"e1","fromNode":"n1","toNode":"n2"}]
}"#;

    #[test]
    fn test_file_nodes() {
        let canvas = Canvas::parse(CANVAS).unwrap();
        let nodes = canvas.file_nodes();
        assert_eq!(
            nodes,
            vec![
                FileNode {
                    id: "n2".to_string(),
                    file: "diagram.pdf".to_string()
                },
                FileNode {
                    id: "n3".to_string(),
                    file: "img/cat.png".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_retarget_preserves_other_fields_and_order() {
        let mut canvas = Canvas::parse(CANVAS).unwrap();
        let changed = canvas.retarget(|file| (file == "diagram.pdf").then(|| "77aa.pdf".to_string()));
        assert_eq!(changed, 1);

        let json = canvas.to_json_string().unwrap();
        let reparsed: Value = serde_json::from_str(&json).unwrap();
        let original: Value = serde_json::from_str(CANVAS).unwrap();

        let nodes = reparsed["nodes"].as_array().unwrap();
        let before = original["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1]["file"], "77aa.pdf");
        for key in ["id", "type", "x", "y", "width", "height", "color"] {
            assert_eq!(nodes[1][key], before[1][key], "field {key} changed");
        }
        assert_eq!(nodes[0], before[0]);
        assert_eq!(nodes[2], before[2]);
        assert_eq!(reparsed["edges"], original["edges"]);

        let keys: Vec<&String> = nodes[1].as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            ["id", "type", "file", "x", "y", "width", "height", "color"]
        );
    }

    #[test]
    fn test_output_is_tab_indented() {
        let canvas = Canvas::parse(CANVAS).unwrap();
        let json = canvas.to_json_string().unwrap();
        assert!(json.starts_with("{\n\t\"nodes\": ["));
    }

    #[test]
    fn test_retarget_is_idempotent() {
        let mut canvas = Canvas::parse(CANVAS).unwrap();
        canvas.retarget(|file| (file == "diagram.pdf").then(|| "77aa.pdf".to_string()));
        let again = canvas.retarget(|file| (file == "diagram.pdf").then(|| "77aa.pdf".to_string()));
        assert_eq!(again, 0);
    }

    #[test]
    fn test_missing_nodes_is_empty() {
        let canvas = Canvas::parse("{}").unwrap();
        assert!(canvas.file_nodes().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let err = Canvas::parse("{\"nodes\": [").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidJson(_)));
    }

    #[test]
    fn test_nodes_not_array() {
        let err = Canvas::parse(r#"{"nodes": {}}"#).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidCanvas(_)));
    }
}

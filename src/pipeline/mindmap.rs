//! Topic tree → styled XMind archive.
//!
//! An `.xmind` file is a zip holding `content.json`, `manifest.json`, and
//! `metadata.json`. The model hands back a recursive `{title, children,
//! hint?}` tree; this module assigns fresh UUIDs per topic and style,
//! chooses style properties by depth (root / main topic / level 2 /
//! alternating level 3+), and switches a branch into XMind's tree-table
//! structure when the model tagged it with `"hint": "comparison_table"` —
//! children of a tree-table render as column headers and their children as
//! cells.

use crate::error::StudyError;
use crate::pipeline::parse::strip_fences;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One node of the model-produced topic tree.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TopicNode {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub children: Vec<TopicNode>,
    #[serde(default)]
    pub hint: Option<String>,
}

fn untitled() -> String {
    "Untitled".to_string()
}

/// Parse the model's JSON into a topic tree.
pub fn parse_topic_tree(raw: &str) -> Result<TopicNode, StudyError> {
    serde_json::from_str(strip_fences(raw)).map_err(|e| StudyError::MalformedJson {
        detail: format!("topic tree: {e}"),
    })
}

const STRUCTURE_LOGIC_RIGHT: &str = "org.xmind.ui.logic.right";
const STRUCTURE_TREE_RIGHT: &str = "org.xmind.ui.tree.right";
const STRUCTURE_TREETABLE: &str = "org.xmind.ui.treetable";
const STRUCTURE_TREETABLE_TITLE: &str = "org.xmind.ui.treetable.toptitle";

fn root_style() -> Value {
    json!({
        "fo:font-family": "NeverMind", "fo:font-size": "28pt", "fo:font-weight": "600",
        "fo:color": "#ffffff", "svg:fill": "#046562",
        "shape-class": "org.xmind.topicShape.roundedRect",
        "line-color": "#046562", "border-line-width": "0pt"
    })
}

fn main_topic_style() -> Value {
    json!({
        "fo:font-family": "NeverMind", "fo:font-size": "24pt", "fo:font-weight": "600",
        "fo:color": "#FFFFFFFF", "svg:fill": "#06AFA9",
        "shape-class": "org.xmind.topicShape.roundedRect",
        "line-color": "#046562", "border-line-width": "2", "border-line-color": "#046562",
        "line-class": "org.xmind.branchConnection.roundedElbow",
        "border-line-pattern": "handdrawn-solid"
    })
}

fn level2_style() -> Value {
    json!({
        "fo:font-family": "NeverMind", "fo:font-size": "20pt", "fo:font-weight": "700",
        "fo:color": "#046562", "svg:fill": "#A6FEF500",
        "shape-class": "org.xmind.topicShape.roundedRect",
        "line-color": "#046562", "border-line-width": "2", "border-line-color": "#046562",
        "line-class": "org.xmind.branchConnection.roundedfold",
        "border-line-pattern": "dash"
    })
}

fn deep_style_a() -> Value {
    json!({
        "fo:font-family": "NeverMind", "fo:font-size": "18pt", "fo:font-weight": "700",
        "fo:color": "#046562", "svg:fill": "#A6FEF500",
        "shape-class": "org.xmind.topicShape.roundedRect",
        "line-color": "#046562", "border-line-width": "2", "border-line-color": "#046562",
        "line-class": "org.xmind.branchConnection.roundedfold",
        "border-line-pattern": "dash"
    })
}

fn deep_style_b() -> Value {
    json!({
        "fo:font-family": "NeverMind", "fo:font-size": "18pt", "fo:font-weight": "700",
        "fo:color": "#046562", "svg:fill": "#2CD55166",
        "shape-class": "org.xmind.topicShape.roundedRect",
        "line-color": "#046562", "border-line-width": "2", "border-line-color": "#046562",
        "line-class": "org.xmind.branchConnection.roundedfold",
        "border-line-pattern": "dash"
    })
}

fn table_header_style() -> Value {
    json!({
        "fo:font-family": "NeverMind", "fo:font-size": "24pt", "fo:font-weight": "600",
        "fo:color": "#000000FF", "svg:fill": "#06AFA94D",
        "shape-class": "org.xmind.topicShape.roundedRect",
        "line-color": "#046562", "border-line-width": "2", "border-line-color": "#046562",
        "line-class": "org.xmind.branchConnection.roundedfold",
        "border-line-pattern": "handdrawn-solid"
    })
}

/// Recursively build one XMind topic object.
fn build_topic(
    node: &TopicNode,
    level: usize,
    parent_structure: Option<&str>,
    sibling_index: usize,
) -> Value {
    let is_table_header = parent_structure == Some(STRUCTURE_TREETABLE);
    let is_table_cell = parent_structure == Some(STRUCTURE_TREETABLE_TITLE);

    let (style_props, structure_class) = if level == 0 {
        (root_style(), STRUCTURE_LOGIC_RIGHT)
    } else if is_table_header {
        (table_header_style(), STRUCTURE_TREETABLE_TITLE)
    } else if is_table_cell {
        let style = if sibling_index % 2 == 0 {
            deep_style_a()
        } else {
            deep_style_b()
        };
        (style, STRUCTURE_LOGIC_RIGHT)
    } else if level == 1 {
        let structure = if node.hint.as_deref() == Some("comparison_table") {
            debug!(title = %node.title, "using tree-table structure for comparison branch");
            STRUCTURE_TREETABLE
        } else {
            STRUCTURE_TREE_RIGHT
        };
        (main_topic_style(), structure)
    } else if level == 2 {
        (level2_style(), STRUCTURE_LOGIC_RIGHT)
    } else {
        let style = if sibling_index % 2 == 0 {
            deep_style_a()
        } else {
            deep_style_b()
        };
        (style, STRUCTURE_LOGIC_RIGHT)
    };

    let mut topic = json!({
        "id": Uuid::new_v4().to_string(),
        "class": "topic",
        "title": node.title,
        "structureClass": structure_class,
        "style": {
            "id": Uuid::new_v4().to_string(),
            "properties": style_props
        }
    });

    if !node.children.is_empty() {
        let attached: Vec<Value> = node
            .children
            .iter()
            .enumerate()
            .map(|(i, child)| build_topic(child, level + 1, Some(structure_class), i))
            .collect();
        topic["children"] = json!({ "attached": attached });
    }

    topic
}

/// Build the full `content.json` value for one sheet.
fn build_content(tree: &TopicNode, sheet_title: &str) -> Value {
    json!([{
        "id": Uuid::new_v4().to_string(),
        "class": "sheet",
        "title": sheet_title,
        "rootTopic": build_topic(tree, 0, None, 0),
        "theme": {
            "map": {
                "id": Uuid::new_v4().to_string(),
                "properties": {
                    "svg:fill": "#c4fff9",
                    "color-list": "#ffffff #c4fff9 #9ceaef #68d8d6 #06AFA9 #046562"
                }
            },
            "centralTopic": { "id": Uuid::new_v4().to_string() },
            "mainTopic": { "id": Uuid::new_v4().to_string() },
            "subTopic": { "id": Uuid::new_v4().to_string() }
        }
    }])
}

/// Write the `.xmind` archive for a topic tree.
pub fn write_xmind(
    tree: &TopicNode,
    sheet_title: &str,
    output_path: &Path,
) -> Result<(), StudyError> {
    let content = build_content(tree, sheet_title);
    let manifest = json!({ "file-entries": { "content.json": {}, "metadata.json": {} } });
    let metadata = json!({
        "creator": { "name": "pdf2study", "version": env!("CARGO_PKG_VERSION") }
    });

    let file = std::fs::File::create(output_path).map_err(|e| StudyError::OutputWriteFailed {
        path: output_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, value) in [
        ("content.json", &content),
        ("manifest.json", &manifest),
        ("metadata.json", &metadata),
    ] {
        archive
            .start_file(name, options)
            .and_then(|_| {
                let bytes = serde_json::to_vec_pretty(value)
                    .map_err(|e| zip::result::ZipError::Io(std::io::Error::other(e)))?;
                archive.write_all(&bytes).map_err(zip::result::ZipError::Io)
            })
            .map_err(|e| StudyError::Internal(format!("writing {name}: {e}")))?;
    }
    archive
        .finish()
        .map_err(|e| StudyError::Internal(format!("finalising xmind archive: {e}")))?;

    info!(out = %output_path.display(), "mind map written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(title: &str) -> TopicNode {
        TopicNode {
            title: title.into(),
            children: vec![],
            hint: None,
        }
    }

    #[test]
    fn parses_tree_with_hints_and_fences() {
        let raw = r#"```json
{"title": "Root", "children": [
  {"title": "Types", "hint": "comparison_table", "children": [
    {"title": "Type 1", "children": []}
  ]}
]}
```"#;
        let tree = parse_topic_tree(raw).unwrap();
        assert_eq!(tree.title, "Root");
        assert_eq!(tree.children[0].hint.as_deref(), Some("comparison_table"));
    }

    #[test]
    fn missing_title_defaults_to_untitled() {
        let tree = parse_topic_tree(r#"{"children": []}"#).unwrap();
        assert_eq!(tree.title, "Untitled");
    }

    #[test]
    fn non_json_tree_is_malformed() {
        assert!(matches!(
            parse_topic_tree("not json"),
            Err(StudyError::MalformedJson { .. })
        ));
    }

    #[test]
    fn comparison_hint_selects_treetable_structure() {
        let tree = TopicNode {
            title: "Root".into(),
            hint: None,
            children: vec![TopicNode {
                title: "Types".into(),
                hint: Some("comparison_table".into()),
                children: vec![TopicNode {
                    title: "Type 1".into(),
                    hint: None,
                    children: vec![leaf("ANA & ASMA")],
                }],
            }],
        };
        let root = build_topic(&tree, 0, None, 0);
        let types = &root["children"]["attached"][0];
        assert_eq!(types["structureClass"], STRUCTURE_TREETABLE);
        // A tree-table's children become column headers, their children cells.
        let header = &types["children"]["attached"][0];
        assert_eq!(header["structureClass"], STRUCTURE_TREETABLE_TITLE);
        let cell = &header["children"]["attached"][0];
        assert_eq!(cell["structureClass"], STRUCTURE_LOGIC_RIGHT);
    }

    #[test]
    fn plain_level1_uses_tree_right() {
        let tree = TopicNode {
            title: "Root".into(),
            hint: None,
            children: vec![leaf("Branch")],
        };
        let root = build_topic(&tree, 0, None, 0);
        assert_eq!(
            root["children"]["attached"][0]["structureClass"],
            STRUCTURE_TREE_RIGHT
        );
    }

    #[test]
    fn topic_ids_are_unique() {
        let tree = TopicNode {
            title: "Root".into(),
            hint: None,
            children: vec![leaf("A"), leaf("B")],
        };
        let root = build_topic(&tree, 0, None, 0);
        let id_root = root["id"].as_str().unwrap();
        let id_a = root["children"]["attached"][0]["id"].as_str().unwrap();
        let id_b = root["children"]["attached"][1]["id"].as_str().unwrap();
        assert_ne!(id_root, id_a);
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn xmind_archive_contains_three_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.xmind");
        write_xmind(&leaf("Root"), "Lecture", &path).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(archive.len(), 3);
        for expected in ["content.json", "manifest.json", "metadata.json"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}

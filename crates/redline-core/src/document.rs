//! Structured document model.
//!
//! A [`Document`] is an ordered list of [`Block`]s. Each block owns a run of
//! [`InlineNode`]s and, recursively, child blocks. Inline nodes are a closed
//! set: plain text, annotations, and opaque nodes that the engine carries
//! along without interpreting.
//!
//! Documents are treated as copy-on-write values. Operations in this crate
//! never patch a node in place on the caller's document; they build a new
//! block list and hand back a new `Document`.
//!
//! The JSON form follows the block editor's shape:
//!
//! ```json
//! [{ "id": "b1", "type": "paragraph", "props": {},
//!    "content": [{ "type": "text", "text": "Teh fox", "styles": {} }],
//!    "children": [] }]
//! ```

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::error::DocumentError;

/// Inline formatting carried by a text run (bold, italic, colours...).
pub type Styles = Map<String, Value>;

/// Location of a block in the tree: the index chain from the top-level
/// block down through its children.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockPath(Vec<usize>);

impl BlockPath {
    /// Path of a top-level block.
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    /// Path of this block's child at `index`.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Index of the top-level block this path lives under.
    pub fn top_level(&self) -> Option<usize> {
        self.0.first().copied()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<usize>> for BlockPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// How serious a reported issue is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Suggestion,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Suggestion => "suggestion",
        }
    }

    /// Parse the lowercase wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "suggestion" => Some(Self::Suggestion),
            _ => None,
        }
    }
}

/// Which editor marker an annotation is rendered with.
///
/// Check passes insert `issue` markers; the standalone grammar checker
/// inserts `grammar` markers. Both behave identically in the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    #[default]
    Issue,
    Grammar,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Grammar => "grammar",
        }
    }
}

/// A run of plain text with its inline styles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextRun {
    pub content: String,
    pub styles: Styles,
}

impl TextRun {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            styles: Styles::new(),
        }
    }

    pub fn with_styles(mut self, styles: Styles) -> Self {
        self.styles = styles;
        self
    }

    /// Length in chars (Unicode scalar values).
    pub fn len_chars(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// A new run holding `content` with this run's styles.
    pub fn fragment(&self, content: &str) -> Self {
        Self {
            content: content.to_owned(),
            styles: self.styles.clone(),
        }
    }
}

/// An inline marker wrapping a flagged span of text, pending a human
/// accept/reject.
///
/// The wrapped text is `original_text`; the annotation never loses it, so
/// flattening or stripping an annotation always recovers the pre-annotation
/// document.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Unique id, generated when the annotation is inserted.
    pub issue_id: SmolStr,
    /// The pass that inserted this annotation, if any.
    pub pass_id: Option<SmolStr>,
    /// Issue category (e.g. `spelling`) or the pass command (e.g. `brevity`).
    pub kind: SmolStr,
    pub original_text: SmolStr,
    pub suggestion: SmolStr,
    pub message: SmolStr,
    pub severity: Severity,
    pub marker: MarkerKind,
    /// Styles of the text run the annotation was cut from. Restored when
    /// the annotation resolves back to text.
    pub styles: Styles,
}

impl Annotation {
    /// Text that replaces this annotation when its suggestion is applied.
    ///
    /// An empty suggestion falls back to the original text.
    pub fn replacement_text(&self) -> &str {
        if self.suggestion.is_empty() {
            self.original_text.as_str()
        } else {
            self.suggestion.as_str()
        }
    }

    /// Whether this annotation was inserted by `pass_id`.
    pub fn belongs_to(&self, pass_id: &str) -> bool {
        self.pass_id.as_deref() == Some(pass_id)
    }

    fn from_props(marker: MarkerKind, props: &Map<String, Value>, styles: Styles) -> Option<Self> {
        let original_text = props.get("originalText")?.as_str()?;
        let string = |key: &str| props.get(key).and_then(Value::as_str).map(SmolStr::new);

        let suggestion = match props.get("suggestion").or_else(|| props.get("suggestions")) {
            Some(Value::String(s)) => SmolStr::new(s),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                SmolStr::new(parts.join(", "))
            }
            _ => SmolStr::default(),
        };

        Some(Self {
            issue_id: string("issueId").unwrap_or_default(),
            pass_id: string("checkId"),
            kind: string("kind")
                .or_else(|| string("type"))
                .unwrap_or_else(|| SmolStr::new_static("generic")),
            original_text: SmolStr::new(original_text),
            suggestion,
            message: string("message").unwrap_or_default(),
            severity: string("severity")
                .and_then(|s| Severity::parse(&s))
                .unwrap_or_default(),
            marker,
            styles,
        })
    }

    fn to_props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("issueId".into(), Value::from(self.issue_id.as_str()));
        if let Some(pass_id) = &self.pass_id {
            props.insert("checkId".into(), Value::from(pass_id.as_str()));
        }
        let kind_key = match self.marker {
            MarkerKind::Issue => "kind",
            MarkerKind::Grammar => "type",
        };
        props.insert(kind_key.into(), Value::from(self.kind.as_str()));
        props.insert(
            "originalText".into(),
            Value::from(self.original_text.as_str()),
        );
        let suggestion_key = match self.marker {
            MarkerKind::Issue => "suggestion",
            MarkerKind::Grammar => "suggestions",
        };
        props.insert(suggestion_key.into(), Value::from(self.suggestion.as_str()));
        props.insert("message".into(), Value::from(self.message.as_str()));
        props.insert("severity".into(), Value::from(self.severity.as_str()));
        props
    }
}

/// The smallest addressable content unit inside a block.
#[derive(Clone, Debug, PartialEq)]
pub enum InlineNode {
    Text(TextRun),
    Annotation(Annotation),
    /// Any node kind the engine does not interpret (links, mentions, images,
    /// malformed nodes). Passed through unchanged; contributes no text.
    Opaque(Value),
}

impl InlineNode {
    /// Plain text node with no styles.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextRun::new(content))
    }

    /// The text this node contributes when the document is flattened.
    ///
    /// Annotations contribute their original text, not their suggestion.
    pub fn flattened_text(&self) -> Option<&str> {
        match self {
            Self::Text(run) => Some(run.content.as_str()),
            Self::Annotation(annotation) => Some(annotation.original_text.as_str()),
            Self::Opaque(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Self::Text(run) => Some(run),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&Annotation> {
        match self {
            Self::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    /// Decode a node from its JSON form.
    ///
    /// Never fails: anything that is not a well-formed text or marker node
    /// becomes [`InlineNode::Opaque`] holding the original value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(content) => Self::text(content),
            value => {
                let decoded = value.as_object().and_then(Self::decode_object);
                decoded.unwrap_or(Self::Opaque(value))
            }
        }
    }

    fn decode_object(obj: &Map<String, Value>) -> Option<Self> {
        match obj.get("type")?.as_str()? {
            "text" => {
                let content = obj.get("text")?.as_str()?;
                Some(Self::Text(TextRun::new(content).with_styles(styles(obj))))
            }
            "issue" => Annotation::from_props(MarkerKind::Issue, obj.get("props")?.as_object()?, styles(obj))
                .map(Self::Annotation),
            "grammar" => Annotation::from_props(
                MarkerKind::Grammar,
                obj.get("props")?.as_object()?,
                styles(obj),
            )
            .map(Self::Annotation),
            _ => None,
        }
    }

    /// Encode this node in the editor's JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(run) => {
                let mut obj = Map::new();
                obj.insert("type".into(), Value::from("text"));
                obj.insert("text".into(), Value::from(run.content.as_str()));
                obj.insert("styles".into(), Value::Object(run.styles.clone()));
                Value::Object(obj)
            }
            Self::Annotation(annotation) => {
                let mut obj = Map::new();
                obj.insert("type".into(), Value::from(annotation.marker.as_str()));
                obj.insert("props".into(), Value::Object(annotation.to_props()));
                if !annotation.styles.is_empty() {
                    obj.insert("styles".into(), Value::Object(annotation.styles.clone()));
                }
                Value::Object(obj)
            }
            Self::Opaque(value) => value.clone(),
        }
    }
}

fn styles(obj: &Map<String, Value>) -> Styles {
    obj.get("styles")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// A structural unit of the document (paragraph, heading, list item...).
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: Option<SmolStr>,
    /// Block type name, e.g. `paragraph` or `heading`.
    pub kind: SmolStr,
    pub props: Map<String, Value>,
    pub content: Vec<InlineNode>,
    pub children: Vec<Block>,
    /// Non-inline content (tables and similar), kept verbatim.
    pub raw_content: Option<Value>,
}

impl Default for Block {
    fn default() -> Self {
        Self {
            id: None,
            kind: SmolStr::new_static("paragraph"),
            props: Map::new(),
            content: Vec::new(),
            children: Vec::new(),
            raw_content: None,
        }
    }
}

impl Block {
    /// A paragraph holding `content`.
    pub fn paragraph(content: Vec<InlineNode>) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<SmolStr>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    /// Decode a block from its JSON form. Non-object values become an
    /// `unknown` block carrying the value as raw content.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self {
                kind: SmolStr::new_static("unknown"),
                raw_content: Some(value),
                ..Self::default()
            };
        };

        let mut block = Self {
            id: obj.get("id").and_then(Value::as_str).map(SmolStr::new),
            kind: obj
                .get("type")
                .and_then(Value::as_str)
                .map(SmolStr::new)
                .unwrap_or_else(|| SmolStr::new_static("paragraph")),
            props: match obj.remove("props") {
                Some(Value::Object(props)) => props,
                _ => Map::new(),
            },
            ..Self::default()
        };

        match obj.remove("content") {
            Some(Value::Array(nodes)) => {
                block.content = nodes.into_iter().map(InlineNode::from_value).collect();
            }
            Some(Value::String(text)) => block.content = vec![InlineNode::text(text)],
            None | Some(Value::Null) => {}
            Some(other) => block.raw_content = Some(other),
        }

        if let Some(Value::Array(children)) = obj.remove("children") {
            block.children = children.into_iter().map(Block::from_value).collect();
        }

        block
    }

    /// Encode this block in the editor's JSON form.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(id) = &self.id {
            obj.insert("id".into(), Value::from(id.as_str()));
        }
        obj.insert("type".into(), Value::from(self.kind.as_str()));
        obj.insert("props".into(), Value::Object(self.props.clone()));
        let content = match &self.raw_content {
            Some(raw) => raw.clone(),
            None => Value::Array(self.content.iter().map(InlineNode::to_value).collect()),
        };
        obj.insert("content".into(), content);
        obj.insert(
            "children".into(),
            Value::Array(self.children.iter().map(Block::to_value).collect()),
        );
        Value::Object(obj)
    }
}

/// Where an annotation sits in a document.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationLocation<'a> {
    pub block: BlockPath,
    pub node_index: usize,
    pub annotation: &'a Annotation,
}

/// An ordered list of blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by path.
    pub fn block(&self, path: &BlockPath) -> Option<&Block> {
        let (first, rest) = path.indices().split_first()?;
        let mut block = self.blocks.get(*first)?;
        for index in rest {
            block = block.children.get(*index)?;
        }
        Some(block)
    }

    /// Swap in a whole new block list, returning the previous one.
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) -> Vec<Block> {
        std::mem::replace(&mut self.blocks, blocks)
    }

    /// Decode a document from the editor's JSON block list.
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Array(blocks) => Ok(Self::new(
                blocks.into_iter().map(Block::from_value).collect(),
            )),
            other => Err(DocumentError::InvalidRoot {
                found: json_kind(&other),
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.blocks.iter().map(Block::to_value).collect())
    }

    /// Every annotation in depth-first document order.
    pub fn annotations(&self) -> Vec<AnnotationLocation<'_>> {
        fn collect<'a>(
            blocks: &'a [Block],
            parent: Option<&BlockPath>,
            out: &mut Vec<AnnotationLocation<'a>>,
        ) {
            for (index, block) in blocks.iter().enumerate() {
                let path = match parent {
                    Some(parent) => parent.child(index),
                    None => BlockPath::root(index),
                };
                for (node_index, node) in block.content.iter().enumerate() {
                    if let InlineNode::Annotation(annotation) = node {
                        out.push(AnnotationLocation {
                            block: path.clone(),
                            node_index,
                            annotation,
                        });
                    }
                }
                collect(&block.children, Some(&path), out);
            }
        }

        let mut out = Vec::new();
        collect(&self.blocks, None, &mut out);
        out
    }

    /// Find the annotation with the given issue id.
    pub fn find_annotation(&self, issue_id: &str) -> Option<AnnotationLocation<'_>> {
        self.annotations()
            .into_iter()
            .find(|loc| loc.annotation.issue_id == issue_id)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

/// Mutable lookup into a block list being rebuilt.
pub(crate) fn block_at_mut<'a>(blocks: &'a mut [Block], path: &BlockPath) -> Option<&'a mut Block> {
    let (first, rest) = path.indices().split_first()?;
    let mut block = blocks.get_mut(*first)?;
    for index in rest {
        block = block.children.get_mut(*index)?;
    }
    Some(block)
}

/// Visit every block depth-first, parents before children.
pub(crate) fn for_each_block_mut(blocks: &mut [Block], f: &mut dyn FnMut(&mut Block)) {
    for block in blocks {
        f(block);
        for_each_block_mut(&mut block.children, f);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_block_path_display() {
        assert_eq!(BlockPath::root(3).to_string(), "3");
        assert_eq!(BlockPath::root(0).child(2).child(1).to_string(), "0.2.1");
    }

    #[test]
    fn test_decode_text_and_markers() {
        let doc = Document::from_value(json!([
            {
                "id": "b1",
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": "Hello ", "styles": { "bold": true } },
                    { "type": "issue", "props": {
                        "issueId": "iss-1", "checkId": "1", "kind": "brevity",
                        "originalText": "very big", "suggestion": "huge",
                        "message": "Brevity" } },
                    { "type": "grammar", "props": {
                        "issueId": "g-1", "originalText": "teh",
                        "suggestions": ["the", "tea"], "type": "spelling",
                        "severity": "error" } }
                ]
            }
        ]))
        .unwrap();

        let block = &doc.blocks()[0];
        assert_eq!(block.id.as_deref(), Some("b1"));
        assert_eq!(block.content.len(), 3);

        let run = block.content[0].as_text().unwrap();
        assert_eq!(run.content, "Hello ");
        assert_eq!(run.styles.get("bold"), Some(&json!(true)));

        let issue = block.content[1].as_annotation().unwrap();
        assert_eq!(issue.pass_id.as_deref(), Some("1"));
        assert_eq!(issue.kind, "brevity");
        assert_eq!(issue.severity, Severity::Warning);

        let grammar = block.content[2].as_annotation().unwrap();
        assert_eq!(grammar.marker, MarkerKind::Grammar);
        assert_eq!(grammar.suggestion, "the, tea");
        assert_eq!(grammar.kind, "spelling");
        assert_eq!(grammar.severity, Severity::Error);
    }

    #[test]
    fn test_marker_styles_round_trip() {
        let source = json!([{
            "type": "paragraph",
            "content": [
                { "type": "issue", "styles": { "bold": true }, "props": {
                    "issueId": "iss-1", "originalText": "big", "suggestion": "huge" } }
            ]
        }]);
        let doc = Document::from_value(source).unwrap();
        let marker = doc.blocks()[0].content[0].as_annotation().unwrap();
        assert_eq!(marker.styles.get("bold"), Some(&json!(true)));

        let encoded = doc.blocks()[0].content[0].to_value();
        assert_eq!(encoded["styles"], json!({ "bold": true }));
    }

    #[test]
    fn test_malformed_nodes_become_opaque() {
        let doc = Document::from_value(json!([
            { "content": [
                { "type": "text", "text": 42 },
                { "type": "issue", "props": { "suggestion": "x" } },
                { "type": "link", "href": "https://example.com" },
                7
            ] }
        ]))
        .unwrap();

        let content = &doc.blocks()[0].content;
        assert_eq!(content.len(), 4);
        assert!(content.iter().all(|n| matches!(n, InlineNode::Opaque(_))));
        assert_eq!(content[0].to_value(), json!({ "type": "text", "text": 42 }));
    }

    #[test]
    fn test_string_content_and_raw_content() {
        let doc = Document::from_value(json!([
            { "type": "heading", "content": "Title" },
            { "type": "table", "content": { "type": "tableContent", "rows": [] } }
        ]))
        .unwrap();

        assert_eq!(
            doc.blocks()[0].content,
            vec![InlineNode::text("Title")]
        );
        assert!(doc.blocks()[1].content.is_empty());
        assert_eq!(
            doc.to_value()[1]["content"],
            json!({ "type": "tableContent", "rows": [] })
        );
    }

    #[test]
    fn test_invalid_root() {
        let err = Document::from_json_str(r#"{"blocks": []}"#).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidRoot { found: "an object" }));
    }

    #[test]
    fn test_json_round_trip_keeps_shape() {
        let source = json!([
            {
                "id": "b1",
                "type": "paragraph",
                "props": { "textAlignment": "left" },
                "content": [
                    { "type": "text", "text": "Fine", "styles": {} },
                    { "type": "mention", "user": "sam" }
                ],
                "children": [
                    { "id": "b2", "type": "paragraph", "props": {}, "content": [], "children": [] }
                ]
            }
        ]);
        let doc: Document = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), source);
    }

    #[test]
    fn test_block_lookup_and_annotations() {
        let marker = Annotation {
            issue_id: "a".into(),
            pass_id: None,
            kind: "spelling".into(),
            original_text: "wrold".into(),
            suggestion: "world".into(),
            message: SmolStr::default(),
            severity: Severity::Error,
            marker: MarkerKind::Grammar,
            styles: Default::default(),
        };
        let doc = Document::new(vec![
            Block::paragraph(vec![InlineNode::text("x")]).with_children(vec![
                Block::paragraph(vec![
                    InlineNode::text("hello "),
                    InlineNode::Annotation(marker),
                ]),
            ]),
        ]);

        let path = BlockPath::root(0).child(0);
        assert_eq!(doc.block(&path).unwrap().content.len(), 2);
        assert!(doc.block(&BlockPath::root(1)).is_none());

        let found = doc.find_annotation("a").unwrap();
        assert_eq!(found.block, path);
        assert_eq!(found.node_index, 1);
        assert!(doc.find_annotation("missing").is_none());
    }
}

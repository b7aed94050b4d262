//! mermaid 流程图子集的解析器

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DiagramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "TD" | "TB" => Some(Direction::TopDown),
            "BT" => Some(Direction::BottomUp),
            "LR" => Some(Direction::LeftRight),
            "RL" => Some(Direction::RightLeft),
            _ => None,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::LeftRight | Direction::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Rectangle,
    Rounded,
    Diamond,
    Circle,
    Cylinder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Solid,
    Dotted,
    Thick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub label: Option<String>,
    pub style: EdgeStyle,
    /// 是否带箭头
    pub directed: bool,
}

/// 解析后的流程图，节点按首次出现的顺序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flowchart {
    pub direction: Direction,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// 只参与样式或交互、不影响布局的语句
const IGNORED_KEYWORDS: [&str; 8] = [
    "subgraph",
    "end",
    "classDef",
    "class",
    "style",
    "linkStyle",
    "click",
    "direction",
];

static LABELLED_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(--|==|-\.)\s+(.+?)\s+(-{2,}>|-{3,}|={2,}>|={3,}|\.+->|\.+-)")
        .expect("valid regex")
});

static ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-\.+->|-\.+-|-{2,}>|-{3,}|={2,}>|={3,})").expect("valid regex"));

static PIPE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|([^|]*)\|").expect("valid regex"));

/// 解析流程图源码
pub fn parse(source: &str) -> Result<Flowchart, DiagramError> {
    let mut builder = Builder::default();
    let mut header_seen = false;
    let mut last_line = 1;

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let line = strip_comment(raw_line);

        for statement in split_statements(line, line_no)? {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            if !header_seen {
                builder.direction = parse_header(statement, line_no)?;
                header_seen = true;
                continue;
            }
            builder.statement(statement, line_no)?;
        }
    }

    if !header_seen {
        return Err(DiagramError::parse(last_line, "diagram is empty"));
    }
    if builder.nodes.is_empty() {
        return Err(DiagramError::parse(last_line, "diagram declares no nodes"));
    }

    Ok(Flowchart {
        direction: builder.direction,
        nodes: builder.nodes,
        edges: builder.edges,
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(position) => &line[..position],
        None => line,
    }
}

/// 按 `;` 拆分语句，括号与引号内的分号不算
fn split_statements(line: &str, line_no: usize) -> Result<Vec<&str>, DiagramError> {
    let mut statements = Vec::new();
    let mut depth: i32 = 0;
    let mut in_quotes = false;
    let mut start = 0;

    for (position, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' | '(' | '{' if !in_quotes => depth += 1,
            ']' | ')' | '}' if !in_quotes => {
                depth -= 1;
                if depth < 0 {
                    return Err(DiagramError::parse(
                        line_no,
                        format!("unexpected closing bracket `{}`", c),
                    ));
                }
            }
            ';' if depth == 0 && !in_quotes => {
                statements.push(&line[start..position]);
                start = position + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(DiagramError::parse(line_no, "unterminated string"));
    }
    if depth > 0 {
        return Err(DiagramError::parse(line_no, "unbalanced brackets"));
    }
    statements.push(&line[start..]);
    Ok(statements)
}

fn parse_header(statement: &str, line_no: usize) -> Result<Direction, DiagramError> {
    let mut words = statement.split_whitespace();
    let keyword = words.next().unwrap_or_default();
    if keyword != "graph" && keyword != "flowchart" {
        return Err(DiagramError::parse(
            line_no,
            format!("unsupported diagram type `{}`", keyword),
        ));
    }
    let direction = match words.next() {
        Some(word) => Direction::from_keyword(word).ok_or_else(|| {
            DiagramError::parse(line_no, format!("unknown direction `{}`", word))
        })?,
        None => Direction::default(),
    };
    if let Some(extra) = words.next() {
        return Err(DiagramError::parse(
            line_no,
            format!("unexpected `{}` after diagram header", extra),
        ));
    }
    Ok(direction)
}

#[derive(Default)]
struct Builder {
    direction: Direction,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl Builder {
    fn statement(&mut self, statement: &str, line_no: usize) -> Result<(), DiagramError> {
        let keyword = statement.split_whitespace().next().unwrap_or_default();
        if IGNORED_KEYWORDS.contains(&keyword) {
            return Ok(());
        }

        let mut cursor = Cursor::new(statement, line_no);
        if cursor.at_arrow() {
            return Err(cursor.error("edge has no source node"));
        }
        let mut sources = self.node_group(&mut cursor)?;

        loop {
            cursor.skip_whitespace();
            if cursor.is_done() {
                return Ok(());
            }
            let (style, directed, label) = cursor.arrow()?;
            cursor.skip_whitespace();
            if cursor.is_done() {
                return Err(cursor.error("edge has no target node"));
            }
            let targets = self.node_group(&mut cursor)?;
            for &from in &sources {
                for &to in &targets {
                    self.edges.push(Edge {
                        from,
                        to,
                        label: label.clone(),
                        style,
                        directed,
                    });
                }
            }
            sources = targets;
        }
    }

    /// `A & B[Label]` 形式的节点组
    fn node_group(&mut self, cursor: &mut Cursor<'_>) -> Result<Vec<usize>, DiagramError> {
        let mut group = vec![self.node(cursor)?];
        loop {
            let checkpoint = cursor.position;
            cursor.skip_whitespace();
            if cursor.eat("&") {
                cursor.skip_whitespace();
                group.push(self.node(cursor)?);
            } else {
                cursor.position = checkpoint;
                return Ok(group);
            }
        }
    }

    fn node(&mut self, cursor: &mut Cursor<'_>) -> Result<usize, DiagramError> {
        let id = cursor.identifier()?;
        let shape = cursor.shape()?;
        cursor.class_suffix();

        let index = match self.index.get(&id) {
            Some(&index) => index,
            None => {
                let index = self.nodes.len();
                self.nodes.push(Node {
                    id: id.clone(),
                    label: id.clone(),
                    shape: NodeShape::Rectangle,
                });
                self.index.insert(id, index);
                index
            }
        };
        if let Some((shape, label)) = shape {
            let node = &mut self.nodes[index];
            node.shape = shape;
            node.label = label;
        }
        Ok(index)
    }
}

struct Cursor<'a> {
    text: &'a str,
    position: usize,
    line_no: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, line_no: usize) -> Self {
        Self {
            text,
            position: 0,
            line_no,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    fn is_done(&self) -> bool {
        self.rest().trim().is_empty()
    }

    fn error(&self, message: impl Into<String>) -> DiagramError {
        DiagramError::parse(self.line_no, message)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.position += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.position += token.len();
            true
        } else {
            false
        }
    }

    fn at_arrow(&self) -> bool {
        let rest = self.rest().trim_start();
        ARROW.is_match(rest) || LABELLED_ARROW.is_match(rest)
    }

    fn identifier(&mut self) -> Result<String, DiagramError> {
        let rest = self.rest();
        let len: usize = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            let found = rest.chars().next().map(String::from).unwrap_or_default();
            return Err(self.error(format!("expected node identifier, found `{}`", found)));
        }
        self.position += len;
        Ok(rest[..len].to_string())
    }

    /// 节点形状与标签，如 `[Label]`、`((Label))`
    fn shape(&mut self) -> Result<Option<(NodeShape, String)>, DiagramError> {
        const DELIMITERS: [(&str, &str, NodeShape); 5] = [
            ("((", "))", NodeShape::Circle),
            ("[(", ")]", NodeShape::Cylinder),
            ("[", "]", NodeShape::Rectangle),
            ("(", ")", NodeShape::Rounded),
            ("{", "}", NodeShape::Diamond),
        ];

        for (open, close, shape) in DELIMITERS {
            if !self.rest().starts_with(open) {
                continue;
            }
            let body_start = self.position + open.len();
            let body = &self.text[body_start..];
            let Some(end) = find_closing(body, close) else {
                return Err(self.error(format!("unbalanced brackets: missing `{}`", close)));
            };
            let label = unquote(body[..end].trim());
            self.position = body_start + end + close.len();
            return Ok(Some((shape, label)));
        }
        Ok(None)
    }

    /// 跳过 `:::className`
    fn class_suffix(&mut self) {
        if self.eat(":::") {
            let rest = self.rest();
            let len: usize = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .map(char::len_utf8)
                .sum();
            self.position += len;
        }
    }

    fn arrow(&mut self) -> Result<(EdgeStyle, bool, Option<String>), DiagramError> {
        let rest = self.rest();

        if let Some(captures) = LABELLED_ARROW.captures(rest) {
            let whole = captures.get(0).map_or(0, |m| m.end());
            let label = captures.get(2).map(|m| unquote(m.as_str().trim()));
            let tail = captures.get(3).map_or("", |m| m.as_str());
            self.position += whole;
            let (style, directed) = arrow_kind(tail);
            return Ok((style, directed, label));
        }

        if let Some(found) = ARROW.find(rest) {
            let (style, directed) = arrow_kind(found.as_str());
            self.position += found.end();
            let mut label = None;
            if let Some(captures) = PIPE_LABEL.captures(self.rest()) {
                label = captures.get(1).map(|m| unquote(m.as_str().trim()));
                self.position += captures.get(0).map_or(0, |m| m.end());
            }
            return Ok((style, directed, label));
        }

        let found: String = rest.chars().take(8).collect();
        Err(self.error(format!("expected an edge, found `{}`", found)))
    }
}

fn arrow_kind(token: &str) -> (EdgeStyle, bool) {
    let style = if token.contains('.') {
        EdgeStyle::Dotted
    } else if token.contains('=') {
        EdgeStyle::Thick
    } else {
        EdgeStyle::Solid
    };
    (style, token.ends_with('>'))
}

fn find_closing(body: &str, close: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (position, c) in body.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && body[position..].starts_with(close) {
            return Some(position);
        }
    }
    None
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_chain() {
        let chart = parse("graph TD\n  A[Start] --> B(Process) --> C{Done?}").unwrap();
        assert_eq!(chart.direction, Direction::TopDown);
        assert_eq!(chart.nodes.len(), 3);
        assert_eq!(chart.nodes[0].label, "Start");
        assert_eq!(chart.nodes[1].shape, NodeShape::Rounded);
        assert_eq!(chart.nodes[2].shape, NodeShape::Diamond);
        assert_eq!(chart.edges.len(), 2);
        assert_eq!((chart.edges[1].from, chart.edges[1].to), (1, 2));
    }

    #[test]
    fn test_parse_shapes_and_labels() {
        let chart = parse(
            "flowchart LR\nU((Users)) -->|reads| DB[(Database)]\nDB -. sync .-> C[\"Cache; hot\"]",
        )
        .unwrap();
        assert_eq!(chart.direction, Direction::LeftRight);
        assert_eq!(chart.nodes[0].shape, NodeShape::Circle);
        assert_eq!(chart.nodes[1].shape, NodeShape::Cylinder);
        assert_eq!(chart.nodes[2].label, "Cache; hot");
        assert_eq!(chart.edges[0].label.as_deref(), Some("reads"));
        assert_eq!(chart.edges[1].label.as_deref(), Some("sync"));
        assert_eq!(chart.edges[1].style, EdgeStyle::Dotted);
    }

    #[test]
    fn test_parse_edge_variants() {
        let chart = parse("graph TD; A --- B; B ==> C; C -- text --> D; A -.-> D").unwrap();
        let kinds: Vec<(EdgeStyle, bool)> =
            chart.edges.iter().map(|e| (e.style, e.directed)).collect();
        assert_eq!(
            kinds,
            vec![
                (EdgeStyle::Solid, false),
                (EdgeStyle::Thick, true),
                (EdgeStyle::Solid, true),
                (EdgeStyle::Dotted, true),
            ]
        );
        assert_eq!(chart.edges[2].label.as_deref(), Some("text"));
    }

    #[test]
    fn test_ampersand_groups() {
        let chart = parse("graph TD\nA & B --> C").unwrap();
        assert_eq!(chart.edges.len(), 2);
        assert!(chart.edges.iter().all(|e| e.to == 2));
    }

    #[test]
    fn test_ignored_statements_and_comments() {
        let source = "graph TD\n%% a comment\nsubgraph Core\nA --> B %% trailing\nend\nclassDef hot fill:#f00\nclass A hot\nstyle B fill:#0f0\nclick A callback";
        let chart = parse(source).unwrap();
        assert_eq!(chart.nodes.len(), 2);
        assert_eq!(chart.edges.len(), 1);
    }

    #[test]
    fn test_later_definition_updates_label() {
        let chart = parse("graph TD\nA --> B\nB[Second]").unwrap();
        assert_eq!(chart.nodes[1].label, "Second");
        assert_eq!(chart.nodes[0].label, "A");
    }

    #[test]
    fn test_unbalanced_bracket_is_error() {
        let error = parse("graph TD\nA[Start --> B").unwrap_err();
        assert!(matches!(error, DiagramError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_unknown_diagram_type_is_error() {
        let error = parse("sequenceDiagram\nAlice->>Bob: Hi").unwrap_err();
        assert!(matches!(error, DiagramError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_dangling_edge_is_error() {
        assert!(matches!(
            parse("graph TD\nA -->").unwrap_err(),
            DiagramError::Parse { line: 2, .. }
        ));
        assert!(matches!(
            parse("graph TD\n--> B").unwrap_err(),
            DiagramError::Parse { line: 2, .. }
        ));
    }

    #[test]
    fn test_empty_graph_is_error() {
        assert!(parse("").is_err());
        assert!(parse("graph TD\n\n").is_err());
        assert!(parse("graph XY").is_err());
    }
}

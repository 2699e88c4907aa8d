//! Tree notation used by the command console
//!
//! ```text
//! store demo          # chain: `demo` is a child of `store`
//! restore
//! 	demo            # tab indent: child of the last node above
//! \raw text           # data node running to end of line
//! ```
//!
//! Tokens on one line are separated by exactly one space; each token is a
//! child of the one before it. Indentation is tabs only.

use std::fmt;

/// Location of a node in its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub uri: String,
    /// 1-based line
    pub row: usize,
    /// 1-based column
    pub col: usize,
    pub len: usize,
}

impl Span {
    pub fn new(uri: &str, row: usize, col: usize, len: usize) -> Self {
        Self {
            uri: uri.to_string(),
            row,
            col,
            len,
        }
    }

    /// Span for nodes built in code rather than parsed
    pub fn unknown() -> Self {
        Self::new("?", 0, 0, 0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}:{}/{}", self.uri, self.row, self.col, self.len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Bare token
    Struct(String),
    /// Raw text after `\`
    Data(String),
    /// Transparent container; its kids print at its own depth
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub kids: Vec<Node>,
    pub span: Span,
}

impl Node {
    pub fn structure(name: &str, kids: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Struct(name.to_string()),
            kids,
            span: Span::unknown(),
        }
    }

    pub fn data(value: &str) -> Self {
        Self {
            kind: NodeKind::Data(value.to_string()),
            kids: Vec::new(),
            span: Span::unknown(),
        }
    }

    pub fn list(kids: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::List,
            kids,
            span: Span::unknown(),
        }
    }

    /// Token of a struct node
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Struct(name) => Some(name),
            _ => None,
        }
    }

    fn write_to(&self, depth: usize, out: &mut String) {
        match &self.kind {
            NodeKind::List => {
                for kid in &self.kids {
                    kid.write_to(depth, out);
                }
                return;
            }
            NodeKind::Struct(name) => {
                push_indent(depth, out);
                out.push_str(name);
                out.push('\n');
            }
            NodeKind::Data(value) => {
                // Multi-line data is one `\` line per line of text
                for line in value.split('\n') {
                    push_indent(depth, out);
                    out.push('\\');
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }

        for kid in &self.kids {
            kid.write_to(depth + 1, out);
        }
    }
}

fn push_indent(depth: usize, out: &mut String) {
    out.extend(std::iter::repeat('\t').take(depth));
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(0, &mut out);
        f.write_str(&out)
    }
}

/// Malformed notation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

/// Parse `text` into a `List` node holding the top-level nodes
pub fn parse(text: &str, uri: &str) -> Result<Node, SyntaxError> {
    let mut arena = Arena::default();
    let root = arena.push(NodeKind::List, Span::new(uri, 1, 1, text.len()));

    // Last node of the most recent line at each depth
    let mut tails: Vec<usize> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let row = index + 1;
        let err = |col: usize, len: usize, message: &str| SyntaxError {
            message: message.to_string(),
            span: Span::new(uri, row, col, len),
        };

        let depth = line.bytes().take_while(|&b| b == b'\t').count();
        let body = &line[depth..];

        if body.is_empty() {
            return Err(err(1, line.len(), "Empty line"));
        }
        if body.starts_with(' ') {
            return Err(err(depth + 1, 1, "Wrong indent"));
        }
        if depth > tails.len() {
            return Err(err(1, depth, "Too many tabs"));
        }

        let mut parent = if depth == 0 { root } else { tails[depth - 1] };
        let mut col = depth;

        loop {
            let rest = &line[col..];

            if let Some(value) = rest.strip_prefix('\\') {
                let span = Span::new(uri, row, col + 1, rest.len());
                parent = arena.attach(parent, NodeKind::Data(value.to_string()), span);
                break;
            }

            let token_len = rest.find(' ').unwrap_or(rest.len());
            if token_len == 0 {
                return Err(err(col + 1, 1, "Wrong nodes separator"));
            }

            let span = Span::new(uri, row, col + 1, token_len);
            parent = arena.attach(parent, NodeKind::Struct(rest[..token_len].to_string()), span);
            col += token_len;

            if col == line.len() {
                break;
            }
            // Exactly one separating space
            col += 1;
            if col == line.len() {
                return Err(err(col, 1, "Wrong nodes separator"));
            }
        }

        tails.truncate(depth);
        tails.push(parent);
    }

    Ok(arena.build(root))
}

#[derive(Default)]
struct Arena {
    slots: Vec<(NodeKind, Span, Vec<usize>)>,
}

impl Arena {
    fn push(&mut self, kind: NodeKind, span: Span) -> usize {
        self.slots.push((kind, span, Vec::new()));
        self.slots.len() - 1
    }

    fn attach(&mut self, parent: usize, kind: NodeKind, span: Span) -> usize {
        let id = self.push(kind, span);
        self.slots[parent].2.push(id);
        id
    }

    fn build(&self, id: usize) -> Node {
        let (kind, span, kids) = &self.slots[id];
        Node {
            kind: kind.clone(),
            kids: kids.iter().map(|&kid| self.build(kid)).collect(),
            span: span.clone(),
        }
    }
}

//! A small logic-light template language for code emission.
//!
//! - `{{path}}` substitutes a value (`this` is the current item, dotted paths descend),
//! - `{{#if path}} .. {{else}} .. {{/if}}` branches on truthiness,
//! - `{{#each path}} .. {{/each}}` repeats over an array,
//! - `{{! text}}` is a comment.
//!
//! Block tags standing alone on a line swallow that line, so templates can
//! be laid out readably without leaking blank lines into the output.

use serde_json::Value;

use crate::error::BufObjectsError;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    If {
        cond:      String,
        then:      Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        path: String,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Tag(String),
}

impl Piece {
    fn is_block_tag(&self) -> bool {
        match self {
            Piece::Tag(tag) => {
                tag.starts_with('#') || tag.starts_with('/') || tag.starts_with('!') || tag == "else"
            }
            Piece::Text(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name:  String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Template, BufObjectsError> {
        let syntax = |msg: String| BufObjectsError::TemplateSyntax {
            template: name.to_string(),
            msg,
        };

        let mut pieces = split_pieces(source).map_err(syntax)?;
        strip_standalone(&mut pieces);

        // Open blocks; the bottom frame is the template body.
        let mut stack = vec![Frame::root()];

        for piece in pieces {
            let tag = match piece {
                Piece::Text(text) => {
                    if !text.is_empty() {
                        push_node(&mut stack, Node::Text(text));
                    }
                    continue;
                }
                Piece::Tag(tag) => tag,
            };

            if tag.starts_with('!') {
                continue;
            } else if let Some(rest) = tag.strip_prefix('#') {
                let (keyword, arg) = split_keyword(rest);
                let kind = match keyword {
                    "if"   => Block::If,
                    "each" => Block::Each,
                    _ => return Err(syntax(format!("unknown block \"{}\"", keyword))),
                };
                if arg.is_empty() {
                    return Err(syntax(format!("block \"{}\" needs an argument", keyword)));
                }
                stack.push(Frame::open(kind, arg));
            } else if tag == "else" {
                match stack.last_mut() {
                    Some(frame) if frame.block == Some(Block::If) && frame.otherwise.is_none() => {
                        frame.otherwise = Some(Vec::new());
                    }
                    _ => return Err(syntax("\"else\" outside of an if block".to_string())),
                }
            } else if let Some(keyword) = tag.strip_prefix('/') {
                let keyword = keyword.trim();
                let frame = match stack.pop() {
                    Some(frame) if frame.block.map(Block::keyword) == Some(keyword) => frame,
                    _ => return Err(syntax(format!("unexpected closing \"{}\"", keyword))),
                };
                let node = match frame.block {
                    Some(Block::If) => Node::If {
                        cond:      frame.arg,
                        then:      frame.then,
                        otherwise: frame.otherwise.unwrap_or_default(),
                    },
                    _ => Node::Each {
                        path: frame.arg,
                        body: frame.then,
                    },
                };
                push_node(&mut stack, node);
            } else {
                if tag.is_empty() || tag.contains(char::is_whitespace) {
                    return Err(syntax(format!("invalid variable \"{}\"", tag)));
                }
                push_node(&mut stack, Node::Var(tag));
            }
        }

        let root = match stack.pop() {
            Some(frame) if stack.is_empty() => frame,
            Some(frame) => {
                let open = frame.block.map_or("", Block::keyword);
                return Err(syntax(format!("unclosed block \"{}\"", open)));
            }
            None => Frame::root(),
        };

        Ok(Template {
            name:  name.to_string(),
            nodes: root.then,
        })
    }

    pub fn render(&self, context: &Value) -> Result<String, BufObjectsError> {
        let mut out = String::new();
        let mut scopes = vec![context];
        render_nodes(&self.nodes, &mut scopes, &mut out).map_err(|msg| BufObjectsError::TemplateRender {
            template: self.name.clone(),
            msg,
        })?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    If,
    Each,
}

impl Block {
    fn keyword(self) -> &'static str {
        match self {
            Block::If   => "if",
            Block::Each => "each",
        }
    }
}

/// A block being parsed. After `else`, nodes go to `otherwise`.
struct Frame {
    block:     Option<Block>,
    arg:       String,
    then:      Vec<Node>,
    otherwise: Option<Vec<Node>>,
}

impl Frame {
    fn root() -> Self {
        Frame { block: None, arg: String::new(), then: Vec::new(), otherwise: None }
    }

    fn open(block: Block, arg: &str) -> Self {
        Frame { block: Some(block), arg: arg.to_string(), then: Vec::new(), otherwise: None }
    }
}

fn push_node(stack: &mut [Frame], node: Node) {
    if let Some(frame) = stack.last_mut() {
        match &mut frame.otherwise {
            Some(otherwise) => otherwise.push(node),
            None => frame.then.push(node),
        }
    }
}

fn split_keyword(rest: &str) -> (&str, &str) {
    let rest = rest.trim();
    match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    }
}

fn split_pieces(source: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        pieces.push(Piece::Text(rest[..open].to_string()));
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| "unterminated \"{{\"".to_string())?;
        pieces.push(Piece::Tag(after[..close].trim().to_string()));
        rest = &after[close + 2..];
    }
    pieces.push(Piece::Text(rest.to_string()));
    Ok(pieces)
}

fn strip_standalone(pieces: &mut [Piece]) {
    let standalone: Vec<bool> = (0..pieces.len()).map(|i| is_standalone(pieces, i)).collect();

    for (i, alone) in standalone.into_iter().enumerate() {
        if !alone {
            continue;
        }
        if let Some(Piece::Text(text)) = i.checked_sub(1).and_then(|p| pieces.get_mut(p)) {
            let keep = text.rfind('\n').map_or(0, |p| p + 1);
            text.truncate(keep);
        }
        if let Some(Piece::Text(text)) = pieces.get_mut(i + 1) {
            let drop = text.find('\n').map_or(text.len(), |p| p + 1);
            text.drain(..drop);
        }
    }
}

/// A block tag with only whitespace around it on its line.
fn is_standalone(pieces: &[Piece], i: usize) -> bool {
    if !pieces[i].is_block_tag() {
        return false;
    }

    let before_ok = match i.checked_sub(1).map(|p| &pieces[p]) {
        Some(Piece::Text(text)) => {
            let tail = &text[text.rfind('\n').map_or(0, |p| p + 1)..];
            tail.trim().is_empty() && (text.contains('\n') || i == 1)
        }
        Some(Piece::Tag(_)) => false,
        None => true,
    };
    let after_ok = match pieces.get(i + 1) {
        Some(Piece::Text(text)) => {
            let head = &text[..text.find('\n').unwrap_or(text.len())];
            head.trim().is_empty() && (text.contains('\n') || i + 2 == pieces.len())
        }
        Some(Piece::Tag(_)) => false,
        None => true,
    };
    before_ok && after_ok
}

fn render_nodes<'a>(nodes: &[Node], scopes: &mut Vec<&'a Value>, out: &mut String) -> Result<(), String> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => {
                let value = lookup(scopes, path)?;
                out.push_str(&display(value, path)?);
            }
            Node::If { cond, then, otherwise } => {
                let branch = if truthy(lookup(scopes, cond)?) { then } else { otherwise };
                render_nodes(branch, scopes, out)?;
            }
            Node::Each { path, body } => {
                let items = match lookup(scopes, path)? {
                    Value::Array(items) => items.as_slice(),
                    Value::Null => &[],
                    _ => return Err(format!("\"{}\" is not a list", path)),
                };
                for item in items {
                    scopes.push(item);
                    let result = render_nodes(body, scopes, out);
                    scopes.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn lookup<'a>(scopes: &[&'a Value], path: &str) -> Result<&'a Value, String> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or("");

    let mut value = if first == "this" {
        scopes.last().copied().ok_or_else(|| "empty scope".to_string())?
    } else {
        scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(first))
            .ok_or_else(|| format!("unknown variable \"{}\"", path))?
    };

    for segment in segments {
        value = value
            .get(segment)
            .ok_or_else(|| format!("unknown variable \"{}\"", path))?;
    }
    Ok(value)
}

fn display(value: &Value, path: &str) -> Result<String, String> {
    match value {
        Value::Null      => Ok(String::new()),
        Value::Bool(b)   => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(format!("\"{}\" cannot be printed", path)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null      => false,
        Value::Bool(b)   => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a)  => !a.is_empty(),
        Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(source: &str, context: Value) -> String {
        Template::parse("test", source).unwrap().render(&context).unwrap()
    }

    #[test]
    fn test_substitution() {
        let out = render("o.{{name}} = {{size}};", json!({"name": "x", "size": 4}));
        assert_eq!(out, "o.x = 4;");
    }

    #[test]
    fn test_if_else() {
        let source = "{{#if flag}}yes{{else}}no{{/if}}";
        assert_eq!(render(source, json!({"flag": true})), "yes");
        assert_eq!(render(source, json!({"flag": 0})), "no");
        assert_eq!(render(source, json!({"flag": null})), "no");
    }

    #[test]
    fn test_each_with_outer_scope() {
        let source = "{{#each items}}{{prefix}}{{this}};{{/each}}";
        let out = render(source, json!({"prefix": "-", "items": ["a", "b"]}));
        assert_eq!(out, "-a;-b;");
    }

    #[test]
    fn test_dotted_paths() {
        let out = render("{{#each fields}}{{name}}:{{meta.size}} {{/each}}", json!({
            "fields": [{"name": "x", "meta": {"size": 4}}]
        }));
        assert_eq!(out, "x:4 ");
    }

    #[test]
    fn test_standalone_block_lines_are_removed() {
        let source = "start\n{{#each items}}\n  item {{this}}\n{{/each}}\nend\n";
        let out = render(source, json!({"items": [1, 2]}));
        assert_eq!(out, "start\n  item 1\n  item 2\nend\n");
    }

    #[test]
    fn test_consecutive_block_lines() {
        let source = "{{#each rs}}\n{{#if v}}\n  {{n}}\n{{/if}}\n{{/each}}\ndone";
        let out = render(source, json!({"rs": [{"n": 1, "v": true}, {"n": 2, "v": false}]}));
        assert_eq!(out, "  1\ndone");
    }

    #[test]
    fn test_nested_blocks() {
        let source = "{{#each rs}}{{#if v}}[{{n}}]{{else}}({{n}}){{/if}}{{/each}}";
        let out = render(source, json!({"rs": [{"n": 1, "v": true}, {"n": 2, "v": false}]}));
        assert_eq!(out, "[1](2)");
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(render("a{{! ignored }}b", json!({})), "ab");
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["{{#if x}}", "{{/each}}", "{{#each}}{{/each}}", "{{x", "{{#loop x}}{{/loop}}", "{{else}}"] {
            let err = Template::parse("bad", source).unwrap_err();
            assert!(matches!(err, BufObjectsError::TemplateSyntax { .. }), "{source}");
        }
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let template = Template::parse("t", "{{missing}}").unwrap();
        let err = template.render(&json!({})).unwrap_err();
        assert!(matches!(err, BufObjectsError::TemplateRender { ref template, .. } if template == "t"));
    }
}

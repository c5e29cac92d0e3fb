//! Replay scripts
//!
//! A script lists user commands, one per line:
//!
//! ```text
//! # comments and blank lines are ignored
//! expand orders
//! page orders next
//! select orders.amount
//! select "daily sales" total    # ids with spaces are quoted
//! collapse orders
//! clear
//! ```
//!
//! A `#` starts a comment only where a word could start, so `#` inside an
//! id is kept.

use anyhow::{anyhow, Result};
use chumsky::prelude::*;
use std::borrow::Cow;
use std::fmt;

use tributary::{FieldId, NodeId};

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// One scripted user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Expand(NodeId),
    Collapse(NodeId),
    Page(NodeId, i32),
    Select(NodeId, FieldId),
    Clear,
}

/// Quote a word unless it reads back unchanged as a bare word
fn word_text(word: &str) -> Cow<'_, str> {
    let bare = !word.is_empty() && !word.starts_with(['"', '#']) && !word.contains([' ', '\t']);
    if bare {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!(
            "\"{}\"",
            word.replace('\\', "\\\\").replace('"', "\\\"")
        ))
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::Expand(id) => write!(f, "expand {}", word_text(id.as_str())),
            ScriptCommand::Collapse(id) => write!(f, "collapse {}", word_text(id.as_str())),
            ScriptCommand::Page(id, delta) => {
                write!(f, "page {} {:+}", word_text(id.as_str()), delta)
            }
            ScriptCommand::Select(node, field) => {
                let (node, field) = (word_text(node.as_str()), word_text(field.as_str()));
                let dotted = matches!(node, Cow::Borrowed(_))
                    && matches!(field, Cow::Borrowed(_))
                    && !field.contains('.');
                if dotted {
                    write!(f, "select {}.{}", node, field)
                } else {
                    write!(f, "select {} {}", node, field)
                }
            }
            ScriptCommand::Clear => write!(f, "clear"),
        }
    }
}

/// A command with the script line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub line: usize,
    pub command: ScriptCommand,
}

/// Spaces and tabs, possibly none
fn inline_whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    one_of(" \t").repeated().ignored()
}

/// Spaces and tabs separating two words
fn separator<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    one_of(" \t").repeated().at_least(1).ignored()
}

/// `#` to end of line
fn comment<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    just('#').ignore_then(any().repeated()).ignored()
}

/// `"..."` with `\"` and `\\` escapes
fn quoted_word<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escaped = just('\\').ignore_then(any());
    just('"')
        .ignore_then(none_of("\"\\").or(escaped).repeated().collect::<String>())
        .then_ignore(just('"'))
}

/// A run of non-blank characters not opening a quote or a comment
fn bare_word<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    none_of(" \t\"#")
        .then(none_of(" \t").repeated())
        .to_slice()
        .map(|s: &str| s.to_string())
}

fn word<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    quoted_word().or(bare_word())
}

fn page_delta<'src>() -> impl Parser<'src, &'src str, i32, Extra<'src>> + Clone {
    choice((
        just("next").to(1),
        just("previous").to(-1),
        just("prev").to(-1),
        just("+1").to(1),
        just("-1").to(-1),
        just("1").to(1),
    ))
}

fn command<'src>() -> impl Parser<'src, &'src str, ScriptCommand, Extra<'src>> + Clone {
    let expand = just("expand")
        .ignore_then(separator())
        .ignore_then(word())
        .map(|id| ScriptCommand::Expand(NodeId::from(id)));

    let collapse = just("collapse")
        .ignore_then(separator())
        .ignore_then(word())
        .map(|id| ScriptCommand::Collapse(NodeId::from(id)));

    let page = just("page")
        .ignore_then(separator())
        .ignore_then(word())
        .then_ignore(separator())
        .then(page_delta())
        .map(|(id, delta)| ScriptCommand::Page(NodeId::from(id), delta));

    // `select node field` or `select node.field`, split on the last dot
    let select = just("select")
        .ignore_then(separator())
        .ignore_then(word())
        .then(separator().ignore_then(word()).or_not())
        .try_map(|(node, field), span| match field {
            Some(field) => Ok(ScriptCommand::Select(
                NodeId::from(node),
                FieldId::from(field),
            )),
            None => match node.rsplit_once('.') {
                Some((node, field)) => Ok(ScriptCommand::Select(
                    NodeId::from(node),
                    FieldId::from(field),
                )),
                None => Err(Rich::custom(
                    span,
                    format!("expected node.field, got '{}'", node),
                )),
            },
        });

    let clear = just("clear").to(ScriptCommand::Clear);

    choice((expand, collapse, page, select, clear))
}

/// One script line: an optional command and an optional comment
fn line_parser<'src>() -> impl Parser<'src, &'src str, Option<ScriptCommand>, Extra<'src>> {
    inline_whitespace()
        .ignore_then(command().or_not())
        .then_ignore(inline_whitespace())
        .then_ignore(comment().or_not())
        .then_ignore(end())
}

fn parse_line(line: &str) -> Result<Option<ScriptCommand>> {
    line_parser().parse(line).into_result().map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow!("Parse error: {}", messages.join("; "))
    })
}

/// Parse a whole script; errors name the offending line
pub fn parse_script(input: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let command = parse_line(line).map_err(|e| anyhow!("line {}: {}", line_number, e))?;
        if let Some(command) = command {
            steps.push(ScriptStep {
                line: line_number,
                command,
            });
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_commands() {
        let script = "\
# warm-up
expand orders
page orders next
page orders -1
select orders.amount
select daily total   # spaced form
collapse orders

clear
";
        let steps = parse_script(script).unwrap();
        let commands: Vec<_> = steps.iter().map(|s| s.command.clone()).collect();
        assert_eq!(
            commands,
            vec![
                ScriptCommand::Expand("orders".into()),
                ScriptCommand::Page("orders".into(), 1),
                ScriptCommand::Page("orders".into(), -1),
                ScriptCommand::Select("orders".into(), "amount".into()),
                ScriptCommand::Select("daily".into(), "total".into()),
                ScriptCommand::Collapse("orders".into()),
                ScriptCommand::Clear,
            ]
        );
        assert_eq!(steps[0].line, 2);
        assert_eq!(steps[6].line, 9);
    }

    #[test]
    fn test_page_delta_spellings() {
        for (token, delta) in [("next", 1), ("prev", -1), ("previous", -1), ("+1", 1), ("1", 1)] {
            let steps = parse_script(&format!("page a {}", token)).unwrap();
            assert_eq!(steps[0].command, ScriptCommand::Page("a".into(), delta));
        }
    }

    #[test]
    fn test_qualified_select_splits_on_last_dot() {
        let steps = parse_script("select dw.orders.amount").unwrap();
        assert_eq!(
            steps[0].command,
            ScriptCommand::Select("dw.orders".into(), "amount".into())
        );
    }

    #[test]
    fn test_hash_inside_word_is_not_a_comment() {
        let steps = parse_script("expand orders#2   # second copy").unwrap();
        assert_eq!(steps[0].command, ScriptCommand::Expand("orders#2".into()));
    }

    #[test]
    fn test_quoted_words_keep_whitespace() {
        let steps = parse_script(
            "expand \"daily sales\"\nselect \"daily sales\" \"net total\"\ncollapse \"say \\\"hi\\\"\"",
        )
        .unwrap();
        assert_eq!(steps[0].command, ScriptCommand::Expand("daily sales".into()));
        assert_eq!(
            steps[1].command,
            ScriptCommand::Select("daily sales".into(), "net total".into())
        );
        assert_eq!(steps[2].command, ScriptCommand::Collapse("say \"hi\"".into()));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_script("expand a\nexplode b").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        let err = parse_script("page a sideways").unwrap_err();
        assert!(err.to_string().contains("line 1"));
        assert!(parse_script("select nodot").is_err());
        assert!(parse_script("expand").is_err());
        assert!(parse_script("expanded a").is_err());
        assert!(parse_script("clear now").is_err());
        assert!(parse_script("expand \"unterminated").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let commands = [
            ScriptCommand::Expand("a".into()),
            ScriptCommand::Collapse("daily sales".into()),
            ScriptCommand::Page("a".into(), 1),
            ScriptCommand::Page("a".into(), -1),
            ScriptCommand::Select("a".into(), "x".into()),
            ScriptCommand::Select("a b".into(), "x.y".into()),
            ScriptCommand::Expand("#tag".into()),
            ScriptCommand::Clear,
        ];
        for command in commands {
            let steps = parse_script(&command.to_string()).unwrap();
            assert_eq!(steps[0].command, command, "{}", command);
        }
        assert_eq!(ScriptCommand::Page("a".into(), 1).to_string(), "page a +1");
        assert_eq!(ScriptCommand::Select("a".into(), "x".into()).to_string(), "select a.x");
    }
}

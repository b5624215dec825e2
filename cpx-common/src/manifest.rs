// cpx-common/src/manifest.rs
//! Reads the runtime requirements out of a `cpanfile`.
//!
//! Only the declarative subset is understood: `requires` statements at the top
//! level or inside `on 'runtime' => sub { ... }` blocks. Other phases, `feature`
//! blocks and soft relationships are skipped. Trailing `if`/`unless`
//! modifiers are not evaluated, the requirement is always kept. A `requires`
//! whose arguments are not literals is a parse error.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::dependency::definition::{normalize_constraint, to_requirements, Requirement, Requirements};
use crate::error::{CpxError, Result};

static STATEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_]+)\b\s*(.*)$").expect("static regex"));
static ON_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^on\s*\(?\s*['"]?([A-Za-z_]+)['"]?\s*(?:=>|,)\s*sub$"#).expect("static regex")
});
static ARGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:'([^']*)'|"([^"]*)"|([A-Za-z_][\w:]*))(?:\s*(?:,|=>)\s*(?:'([^']*)'|"([^"]*)"|([0-9][0-9._]*)))?$"#,
    )
    .expect("static regex")
});

static BLOCK_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:if|unless|elsif|else)\b").expect("static regex"));

const SKIPPED_KEYWORDS: &[&str] = &[
    "recommends",
    "suggests",
    "conflicts",
    "test_requires",
    "build_requires",
    "configure_requires",
    "author_requires",
];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Statement { text: String, line: usize },
    Open { header: String, line: usize },
    Close { line: usize },
}

pub fn load_manifest(path: &Path) -> Result<Requirements> {
    debug!("Reading manifest {}", path.display());
    let source = fs::read_to_string(path).map_err(|e| {
        CpxError::Config(format!("cannot read manifest {}: {e}", path.display()))
    })?;
    parse_manifest(&source)
}

pub fn parse_manifest(source: &str) -> Result<Requirements> {
    let mut requirements = Vec::new();
    // One entry per open block: whether statements inside it are collected.
    let mut included: Vec<bool> = Vec::new();

    for token in tokenize(source)? {
        let active = included.last().copied().unwrap_or(true);
        match token {
            Token::Open { header, line } => {
                let inside = if let Some(caps) = ON_BLOCK_RE.captures(&header) {
                    active && &caps[1] == "runtime"
                } else if header.starts_with("feature") {
                    false
                } else {
                    debug!("line {}: unrecognised block '{}'", line, header);
                    active
                };
                included.push(inside);
            }
            Token::Close { line } => {
                if included.pop().is_none() {
                    return Err(CpxError::ManifestParse {
                        line,
                        message: "unbalanced '}'".to_string(),
                    });
                }
            }
            Token::Statement { text, line } => {
                if let Some(req) = parse_statement(&text, line)? {
                    if active {
                        requirements.push(req);
                    } else {
                        debug!("line {}: skipping non-runtime requirement '{}'", line, req.name);
                    }
                }
            }
        }
    }

    if !included.is_empty() {
        return Err(CpxError::ManifestParse {
            line: source.lines().count(),
            message: "unterminated block".to_string(),
        });
    }

    Ok(to_requirements(requirements))
}

fn parse_statement(text: &str, line: usize) -> Result<Option<Requirement>> {
    let Some(caps) = STATEMENT_RE.captures(text) else {
        debug!("line {}: ignoring '{}'", line, text);
        return Ok(None);
    };
    let keyword = &caps[1];
    if keyword != "requires" {
        if !SKIPPED_KEYWORDS.contains(&keyword) {
            debug!("line {}: ignoring '{}' statement", line, keyword);
        }
        return Ok(None);
    }

    let (args, modifier) = split_modifier(caps[2].trim());
    if let Some(condition) = modifier {
        debug!("line {}: condition '{}' is not evaluated", line, condition);
    }
    let args = args.trim().trim_start_matches('(').trim_end_matches(')').trim();

    let Some(args) = ARGS_RE.captures(args) else {
        return Err(CpxError::ManifestParse {
            line,
            message: format!("cannot parse 'requires' statement: {text}"),
        });
    };
    let name = args
        .get(1)
        .or_else(|| args.get(2))
        .or_else(|| args.get(3))
        .map(|m| m.as_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| CpxError::ManifestParse {
            line,
            message: format!("'requires' without a module name: {text}"),
        })?;
    let constraint = args
        .get(4)
        .or_else(|| args.get(5))
        .or_else(|| args.get(6))
        .map(|m| normalize_constraint(m.as_str()))
        .unwrap_or_default();
    Ok(Some(Requirement::new(name, constraint)))
}

/// Splits a trailing `if ...` / `unless ...` statement modifier off the
/// arguments. Keywords inside quotes are left alone.
fn split_modifier(args: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    for (i, c) in args.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            c if c.is_whitespace() || c == ')' => {
                let end = i + c.len_utf8();
                let rest = args[end..].trim_start();
                for keyword in ["if", "unless"] {
                    let Some(after) = rest.strip_prefix(keyword) else {
                        continue;
                    };
                    if after.is_empty() || after.starts_with(|a: char| a.is_whitespace() || a == '(') {
                        let kept = if c == ')' { end } else { i };
                        return (&args[..kept], Some(rest));
                    }
                }
            }
            _ => {}
        }
    }
    (args, None)
}

/// Whether a `{` after `header` opens a block rather than belonging to an
/// expression such as `$ENV{HOME}`.
fn opens_block(header: &str) -> bool {
    ON_BLOCK_RE.is_match(header)
        || header == "sub"
        || header.ends_with(" sub")
        || header.starts_with("feature")
        || BLOCK_KEYWORD_RE.is_match(header)
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut line = 1;
    let mut start_line = 1;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    // Braces opened inside the current statement, e.g. `$ENV{X}`.
    let mut inner_braces = 0usize;

    for c in source.chars() {
        if c == '\n' {
            line += 1;
            in_comment = false;
            if quote.is_none() {
                buf.push(' ');
                continue;
            }
        }
        if in_comment {
            continue;
        }
        if buf.trim().is_empty() {
            start_line = line;
        }
        if let Some(q) = quote {
            buf.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                buf.push(c);
            }
            '#' => in_comment = true,
            ';' if inner_braces == 0 => flush_statement(&mut buf, start_line, &mut tokens),
            '{' => {
                let header = buf.split_whitespace().collect::<Vec<_>>().join(" ");
                if inner_braces == 0 && opens_block(&header) {
                    tokens.push(Token::Open {
                        header,
                        line: start_line,
                    });
                    buf.clear();
                } else {
                    inner_braces += 1;
                    buf.push(c);
                }
            }
            '}' if inner_braces > 0 => {
                inner_braces -= 1;
                buf.push(c);
            }
            '}' => {
                flush_statement(&mut buf, start_line, &mut tokens);
                tokens.push(Token::Close { line });
            }
            _ => buf.push(c),
        }
    }

    if quote.is_some() {
        return Err(CpxError::ManifestParse {
            line: start_line,
            message: "unterminated string".to_string(),
        });
    }
    flush_statement(&mut buf, start_line, &mut tokens);
    Ok(tokens)
}

fn flush_statement(buf: &mut String, start: usize, tokens: &mut Vec<Token>) {
    let text = buf.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        tokens.push(Token::Statement { text, line: start });
    }
    buf.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_requires() {
        let reqs = parse_manifest(
            r#"
# runtime deps
requires 'Moo';
requires "Try::Tiny", '>= 0.30';
requires 'JSON::MaybeXS' => '1.004';
requires 'Plack', 0;
"#,
        )
        .unwrap();

        assert_eq!(reqs.len(), 4);
        assert_eq!(reqs["Moo"], "");
        assert_eq!(reqs["Try::Tiny"], ">= 0.30");
        assert_eq!(reqs["JSON::MaybeXS"], "1.004");
        assert_eq!(reqs["Plack"], "");
    }

    #[test]
    fn only_runtime_blocks_are_collected() {
        let reqs = parse_manifest(
            r#"
requires 'Mojolicious', '9.0';
recommends 'EV';

on 'test' => sub {
    requires 'Test::Deep';
};

on develop => sub {
    requires 'Dist::Zilla';
};

on 'runtime' => sub {
    requires 'DBI';
};

test_requires 'Test::Fatal';

feature 'sqlite', 'SQLite support' => sub {
    requires 'DBD::SQLite';
};
"#,
        )
        .unwrap();

        assert_eq!(
            reqs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["DBI", "Mojolicious"]
        );
    }

    #[test]
    fn single_line_blocks_and_parenthesised_calls() {
        let reqs = parse_manifest(
            "on 'test' => sub { requires 'Test2::V0' }; requires('Path::Tiny', '0.1');",
        )
        .unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs["Path::Tiny"], "0.1");
    }

    #[test]
    fn first_occurrence_wins() {
        let reqs = parse_manifest("requires 'Moo', '2';\nrequires 'Moo', '3';\n").unwrap();
        assert_eq!(reqs["Moo"], "2");
    }

    #[test]
    fn requires_without_name_reports_line() {
        let err = parse_manifest("requires 'Moo';\n\nrequires ;\n").unwrap_err();
        match err {
            CpxError::ManifestParse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unbalanced_blocks_are_errors() {
        assert!(matches!(
            parse_manifest("on 'test' => sub {\n requires 'X';\n"),
            Err(CpxError::ManifestParse { .. })
        ));
        assert!(matches!(
            parse_manifest("requires 'X';\n};\n"),
            Err(CpxError::ManifestParse { .. })
        ));
    }

    #[test]
    fn hash_inside_quotes_is_not_a_comment() {
        let reqs = parse_manifest("requires 'Foo', '# not a comment';").unwrap();
        assert_eq!(reqs["Foo"], "# not a comment");
    }

    #[test]
    fn statement_modifiers_are_not_constraints() {
        let reqs = parse_manifest(
            "requires 'Win32::API' if $^O eq 'MSWin32';\nrequires 'Moo', 2 unless $ENV{X};\nrequires 'DBI';\n",
        )
        .unwrap();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs["Win32::API"], "");
        assert_eq!(reqs["Moo"], "2");
        assert_eq!(reqs["DBI"], "");
    }

    #[test]
    fn braces_inside_statements_do_not_open_blocks() {
        let reqs = parse_manifest(
            "on 'runtime' => sub {\n  requires 'Plack', $ENV{PLACK_VERSION} ? '1.0' : '0.9' if 0;\n  requires 'Starman';\n};\n",
        );
        // The first statement is not declarative, so it is rejected with its line.
        match reqs {
            Err(CpxError::ManifestParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }

        let reqs = parse_manifest("requires 'Moo' unless $ENV{NO_MOO};\nrequires 'Starman';\n").unwrap();
        assert_eq!(
            reqs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Moo", "Starman"]
        );
    }

    #[test]
    fn non_literal_constraints_are_rejected() {
        let err = parse_manifest("requires 'Moo';\nrequires 'Foo', $VERSION;\n").unwrap_err();
        match err {
            CpxError::ManifestParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn conditional_blocks_inherit_their_parent() {
        let reqs = parse_manifest(
            "if ($^O eq 'MSWin32') {\n  requires 'Win32::Console';\n}\non 'test' => sub {\n  if (1) { requires 'Test::Deep'; }\n};\n",
        )
        .unwrap();
        assert_eq!(reqs.keys().collect::<Vec<_>>(), vec!["Win32::Console"]);
    }

    #[test]
    fn load_manifest_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpanfile");
        fs::write(&path, "requires 'Moose';\n").unwrap();
        let reqs = load_manifest(&path).unwrap();
        assert!(reqs.contains_key("Moose"));

        let missing = load_manifest(&dir.path().join("absent"));
        assert!(matches!(missing, Err(CpxError::Config(_))));
    }
}

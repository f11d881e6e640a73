//! Fragment highlighting: per-language tokenizing plus match-segment overlay.
//! Rulesets are small greedy regex tables, not a parser.

use crate::types::Segment;
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;

/// Maximum fragment lines shown per extract.
pub const MAX_FRAGMENT_LINES: usize = 6;
/// Lines longer than this (in chars) are cut and marked with an ellipsis.
pub const MAX_LINE_CHARS: usize = 120;

// ── Language detection ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    TypeScript,
    Python,
    Go,
    Rust,
    Java,
    Shell,
    Yaml,
    Json,
    Css,
    Text,
}

/// Pick a ruleset from the file extension (case-insensitive).
pub fn detect_lang(path: &str) -> Lang {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => return Lang::Text,
    };
    match ext.as_str() {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => Lang::TypeScript,
        "py" => Lang::Python,
        "go" => Lang::Go,
        "rs" => Lang::Rust,
        "java" | "kt" => Lang::Java,
        "sh" | "bash" | "zsh" | "fish" => Lang::Shell,
        "yaml" | "yml" => Lang::Yaml,
        "json" => Lang::Json,
        "css" | "scss" | "less" => Lang::Css,
        _ => Lang::Text,
    }
}

// ── Token rules ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStyle {
    Comment,
    Str,
    Keyword,
    Number,
    /// Types, constants, decorators, variables, keys.
    Ident,
    Whitespace,
    /// Identifiers, punctuation and anything unrecognised.
    Plain,
}

impl TokenStyle {
    pub fn paint(self, text: &str) -> String {
        match self {
            TokenStyle::Comment | TokenStyle::Plain => text.dimmed().to_string(),
            TokenStyle::Str => text.green().to_string(),
            TokenStyle::Keyword => text.magenta().to_string(),
            TokenStyle::Number => text.yellow().to_string(),
            TokenStyle::Ident => text.cyan().to_string(),
            TokenStyle::Whitespace => text.to_string(),
        }
    }
}

/// An anchored pattern. When the pattern has a capture group, only group 1
/// is consumed (stands in for look-ahead, which `regex` does not support).
struct TokenRule {
    re: Regex,
    style: TokenStyle,
}

fn rules(specs: &[(&str, TokenStyle)]) -> Vec<TokenRule> {
    specs
        .iter()
        .map(|(pattern, style)| TokenRule {
            re: Regex::new(pattern).expect("valid token regex"),
            style: *style,
        })
        .collect()
}

const TS_KW: &str = r"^(?:const|let|var|function|class|import|export|from|as|return|if|else|while|for|do|switch|case|default|break|continue|new|typeof|instanceof|void|null|undefined|true|false|this|super|async|await|type|interface|extends|implements|public|private|protected|static|readonly|enum|namespace|declare|abstract|override|in|of|try|catch|finally|throw|delete|require|module)\b";
const PY_KW: &str = r"^(?:def|class|import|from|as|return|if|elif|else|while|for|in|not|and|or|is|None|True|False|try|except|finally|raise|with|yield|lambda|pass|break|continue|global|nonlocal|del|assert|async|await)\b";
const GO_KW: &str = r"^(?:func|var|const|type|struct|interface|import|package|return|if|else|for|range|switch|case|default|break|continue|go|chan|select|defer|map|make|new|nil|true|false|iota|fallthrough|goto)\b";
const RS_KW: &str = r"^(?:fn|let|mut|const|static|struct|enum|trait|impl|use|mod|pub|crate|super|self|return|if|else|while|for|in|loop|match|break|continue|type|where|async|await|move|ref|dyn|unsafe|true|false|Some|None|Ok|Err)\b";
const JAVA_KW: &str = r"^(?:public|private|protected|class|interface|enum|extends|implements|import|package|return|if|else|while|for|do|switch|case|default|break|continue|new|null|true|false|static|final|abstract|void|int|long|double|float|boolean|char|byte|short|try|catch|finally|throw|throws|instanceof|this|super|synchronized|volatile|transient|native|strictfp)\b";

const WS: &str = r"^\s+";
const IDENT: &str = r"^[A-Za-z_$][\w$]*";
const DQ_STRING: &str = r#"^"(?:[^"\\]|\\.)*""#;
const SQ_STRING: &str = r"^'(?:[^'\\]|\\.)*'";
const LINE_COMMENT: &str = r"^//[^\n]*";
const BLOCK_COMMENT: &str = r"^/\*[\s\S]*?\*/";
const HASH_COMMENT: &str = r"^#[^\n]*";

use TokenStyle::*;

lazy_static! {
    static ref TS_RULES: Vec<TokenRule> = rules(&[
        (LINE_COMMENT, Comment),
        (BLOCK_COMMENT, Comment),
        (DQ_STRING, Str),
        (SQ_STRING, Str),
        (r"^`(?:[^`\\]|\\.)*`", Str),
        (TS_KW, Keyword),
        (r"^\d+(?:\.\d+)?(?:[eE][+-]?\d+)?n?", Number),
        (r"^[A-Z][A-Za-z0-9_$]*", Ident),
        (IDENT, Plain),
        (WS, Whitespace),
    ]);
    static ref PY_RULES: Vec<TokenRule> = rules(&[
        (HASH_COMMENT, Comment),
        (r#"^"""[\s\S]*?""""#, Str),
        (r"^'''[\s\S]*?'''", Str),
        (DQ_STRING, Str),
        (SQ_STRING, Str),
        (r"^@[A-Za-z_]\w*", Ident),
        (PY_KW, Keyword),
        (r"^\d+(?:\.\d+)?", Number),
        (IDENT, Plain),
        (WS, Whitespace),
    ]);
    static ref GO_RULES: Vec<TokenRule> = rules(&[
        (LINE_COMMENT, Comment),
        (BLOCK_COMMENT, Comment),
        (DQ_STRING, Str),
        (r"^`[^`]*`", Str),
        (GO_KW, Keyword),
        (r"^\d+(?:\.\d+)?", Number),
        (IDENT, Plain),
        (WS, Whitespace),
    ]);
    static ref RS_RULES: Vec<TokenRule> = rules(&[
        (LINE_COMMENT, Comment),
        (BLOCK_COMMENT, Comment),
        (DQ_STRING, Str),
        (RS_KW, Keyword),
        (r"^\d+(?:\.\d+)?", Number),
        (r"^[A-Z][A-Z0-9_]+\b", Ident),
        (IDENT, Plain),
        (WS, Whitespace),
    ]);
    static ref JAVA_RULES: Vec<TokenRule> = rules(&[
        (LINE_COMMENT, Comment),
        (BLOCK_COMMENT, Comment),
        (DQ_STRING, Str),
        (JAVA_KW, Keyword),
        (r"^\d+(?:\.\d+)?[LlFfDd]?", Number),
        (r"^[A-Z][A-Za-z0-9_]*", Ident),
        (IDENT, Plain),
        (WS, Whitespace),
    ]);
    static ref SHELL_RULES: Vec<TokenRule> = rules(&[
        (HASH_COMMENT, Comment),
        (DQ_STRING, Str),
        (r"^'[^']*'", Str),
        (r"^\$\{?[A-Za-z_]\w*\}?", Ident),
        (r"^\d+", Number),
        (r"^(?:if|then|else|elif|fi|for|while|do|done|case|esac|in|function|return|export|local)\b", Keyword),
        (IDENT, Plain),
        (WS, Whitespace),
    ]);
    static ref YAML_RULES: Vec<TokenRule> = rules(&[
        (HASH_COMMENT, Comment),
        (DQ_STRING, Str),
        (r"^'[^']*'", Str),
        (r"^([A-Za-z_][\w-]*)\s*:", Ident),
        (r"^(?:(?:true|false|null)\b|~)", Keyword),
        (r"^\d+(?:\.\d+)?", Number),
        (WS, Whitespace),
    ]);
    static ref JSON_RULES: Vec<TokenRule> = rules(&[
        (r#"^("(?:[^"\\]|\\.)*"\s*):"#, Ident),
        (DQ_STRING, Str),
        (r"^(?:true|false|null)\b", Keyword),
        (r"^-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?", Number),
        (WS, Whitespace),
    ]);
    static ref CSS_RULES: Vec<TokenRule> = rules(&[
        (BLOCK_COMMENT, Comment),
        (DQ_STRING, Str),
        (r"^'[^']*'", Str),
        (r"^#[a-fA-F0-9]{3,8}\b", Number),
        (r"^\d+(?:\.\d+)?(?:px|em|rem|%|vh|vw|s|ms)?", Number),
        (r"^\.[A-Za-z_-][\w-]*", Ident),
        (r"^#[A-Za-z_-][\w-]*", Keyword),
        (WS, Whitespace),
    ]);
    static ref TEXT_RULES: Vec<TokenRule> = rules(&[(WS, Whitespace)]);
}

fn rules_for(lang: Lang) -> &'static [TokenRule] {
    match lang {
        Lang::TypeScript => &TS_RULES,
        Lang::Python => &PY_RULES,
        Lang::Go => &GO_RULES,
        Lang::Rust => &RS_RULES,
        Lang::Java => &JAVA_RULES,
        Lang::Shell => &SHELL_RULES,
        Lang::Yaml => &YAML_RULES,
        Lang::Json => &JSON_RULES,
        Lang::Css => &CSS_RULES,
        Lang::Text => &TEXT_RULES,
    }
}

/// Split `text` into styled tokens. Rules are tried in order against the
/// remaining text; if none matches, one char is emitted as `Plain`.
pub fn tokenize(text: &str, lang: Lang) -> Vec<(TokenStyle, String)> {
    let table = rules_for(lang);
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(first) = rest.chars().next() {
        let hit = table.iter().find_map(|rule| {
            let caps = rule.re.captures(rest)?;
            let m = caps.get(1).or_else(|| caps.get(0))?;
            (!m.as_str().is_empty()).then(|| (rule.style, m.end()))
        });
        let (style, len) = hit.unwrap_or((Plain, first.len_utf8()));
        tokens.push((style, rest[..len].to_string()));
        rest = &rest[len..];
    }
    tokens
}

/// Syntax-colour a span that carries no match highlight.
pub fn syntax_color(text: &str, lang: Lang) -> String {
    tokenize(text, lang)
        .into_iter()
        .map(|(style, tok)| style.paint(&tok))
        .collect()
}

fn emphasis(text: &str) -> String {
    text.bold().yellow().to_string()
}

// ── Fragment rendering ──────────────────────────────────────

/// Number of terminal lines a fragment renders to, including the
/// "more lines" summary line.
pub fn fragment_height(fragment: &str) -> usize {
    let lines = fragment.split('\n').count();
    lines.min(MAX_FRAGMENT_LINES) + usize::from(lines > MAX_FRAGMENT_LINES)
}

/// Render a fragment as terminal lines with syntax colours and the matched
/// segments emphasised. Segments may be unsorted, overlapping or out of
/// bounds; they are clamped to the fragment and to each line's visible part.
pub fn highlight_fragment(fragment: &str, segments: &[Segment], path: &str) -> Vec<String> {
    let lang = detect_lang(path);
    let raw_lines: Vec<&str> = fragment.split('\n').collect();
    let fragment_len = fragment.chars().count();
    let mut result = Vec::with_capacity(MAX_FRAGMENT_LINES + 1);
    let mut offset = 0usize;

    for line in raw_lines.iter().take(MAX_FRAGMENT_LINES) {
        let chars: Vec<char> = line.chars().collect();
        let line_end = offset + chars.len();
        let visible = chars.len().min(MAX_LINE_CHARS);

        let mut local: Vec<(usize, usize)> = segments
            .iter()
            .filter_map(|seg| {
                let start = seg.indices.0.min(fragment_len);
                let end = seg.indices.1.min(fragment_len);
                if start >= end || start >= line_end || end <= offset {
                    return None;
                }
                let local_start = start.saturating_sub(offset);
                let local_end = (end - offset).min(visible);
                (local_start < local_end).then_some((local_start, local_end))
            })
            .collect();
        local.sort_by_key(|(start, _)| *start);

        let span = |from: usize, to: usize| chars[from..to].iter().collect::<String>();
        let mut colored = String::new();
        let mut pos = 0;
        for (start, end) in local {
            let start = start.max(pos);
            if start >= end {
                continue;
            }
            if start > pos {
                colored.push_str(&syntax_color(&span(pos, start), lang));
            }
            colored.push_str(&emphasis(&span(start, end)));
            pos = end;
        }
        if pos < visible {
            colored.push_str(&syntax_color(&span(pos, visible), lang));
        }
        if chars.len() > MAX_LINE_CHARS {
            colored.push_str(&"…".dimmed().to_string());
        }

        result.push(colored);
        offset = line_end + 1;
    }

    if raw_lines.len() > MAX_FRAGMENT_LINES {
        let omitted = raw_lines.len() - MAX_FRAGMENT_LINES;
        result.push(format!("… +{} more lines", omitted).dimmed().to_string());
    }

    result
}

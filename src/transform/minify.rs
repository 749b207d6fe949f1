// src/transform/minify.rs

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::ToolError;
use crate::pipeline::record::FileRecord;
use crate::transform::Transform;

static CSS_STRING_OR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|/\*.*?\*/"#).expect("valid regex")
});
static CSS_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#).expect("valid regex")
});
static CSS_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static CSS_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{};,>])\s*").expect("valid regex"));
static CSS_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s+").expect("valid regex"));

/// Whitespace and comment stripping for `.css` files. Quoted strings are
/// copied untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyCss;

impl MinifyCss {
    pub fn minify(css: &str) -> String {
        let without_comments = CSS_STRING_OR_COMMENT.replace_all(css, |caps: &Captures| {
            let m = &caps[0];
            if m.starts_with("/*") {
                String::new()
            } else {
                m.to_string()
            }
        });

        let mut out = String::with_capacity(without_comments.len());
        let mut last = 0;
        for string in CSS_STRING.find_iter(&without_comments) {
            out.push_str(&compact_css(&without_comments[last..string.start()]));
            out.push_str(string.as_str());
            last = string.end();
        }
        out.push_str(&compact_css(&without_comments[last..]));
        out.trim().to_string()
    }
}

/// Compact a run of CSS that holds no strings or comments.
fn compact_css(code: &str) -> String {
    let code = CSS_WHITESPACE.replace_all(code, " ");
    let code = CSS_PUNCT.replace_all(&code, "$1");
    let code = CSS_COLON.replace_all(&code, ":");
    code.replace(";}", "}")
}

impl Transform for MinifyCss {
    fn name(&self) -> &str {
        "minify_css"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        map_matching(files, "css", self.name(), Self::minify)
    }
}

/// Comment stripping and line trimming for `.js` files.
///
/// This is deliberately not a full minifier: identifiers are not mangled and
/// line breaks survive so automatic semicolon insertion keeps working.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyJs;

impl MinifyJs {
    pub fn minify(js: &str) -> String {
        let stripped = strip_js_comments(js);
        stripped
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Transform for MinifyJs {
    fn name(&self) -> &str {
        "minify_js"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, ToolError> {
        map_matching(files, "js", self.name(), Self::minify)
    }
}

fn map_matching(
    files: Vec<FileRecord>,
    ext: &str,
    adapter: &str,
    f: fn(&str) -> String,
) -> Result<Vec<FileRecord>, ToolError> {
    files
        .into_iter()
        .map(|mut file| {
            if file.has_extension(&[ext]) {
                let out = f(file.text(adapter)?);
                file.contents = out.into_bytes();
            }
            Ok(file)
        })
        .collect()
}

/// Words after which a `/` starts a regular expression, not a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Whether a `/` following `out` opens a regular expression literal.
fn regex_allowed(out: &str) -> bool {
    let before = out.trim_end();
    match before.chars().last() {
        None => true,
        Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
        Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => {
            let word_start = before
                .rfind(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                .map_or(0, |i| i + 1);
            REGEX_KEYWORDS.contains(&&before[word_start..])
        }
        Some(_) => false,
    }
}

/// Remove `//` and `/* */` comments that are not inside string or regular
/// expression literals.
fn strip_js_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            '/' if regex_allowed(&out) => {
                out.push(c);
                let mut in_class = false;
                while let Some(n) = chars.next() {
                    out.push(n);
                    match n {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => break,
                        '\n' => break,
                        _ => {}
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_is_compacted() {
        let css = "/* header */\na > b {\n  color : red;\n  margin: 0 auto;\n}\n\nc, d { x: y; }\n";
        assert_eq!(MinifyCss::minify(css), "a>b{color :red;margin:0 auto}c,d{x:y}");
    }

    #[test]
    fn js_comments_outside_strings_are_removed() {
        let js = "// banner\nvar a = \"http://x\"; /* inline */ var b = 1;\n\n  // trailing\n  run('/* keep */');\n";
        assert_eq!(
            MinifyJs::minify(js),
            "var a = \"http://x\";   var b = 1;\nrun('/* keep */');"
        );
    }

    #[test]
    fn css_strings_keep_their_spacing() {
        let css = "a::before {\n  content : \"a  /* b */ ;}\";\n  font-family: 'Open  Sans', serif;\n}";
        assert_eq!(
            MinifyCss::minify(css),
            "a::before{content :\"a  /* b */ ;}\";font-family:'Open  Sans',serif}"
        );
    }

    #[test]
    fn js_regex_literals_survive() {
        let js = "var re = /^https?:\\/\\//;\nok();";
        assert_eq!(MinifyJs::minify(js), js);

        let js = "x.split(/[/*]/); // split\nreturn /a\\/*b/g.test(s);\nvar half = a / 2; // two";
        assert_eq!(
            MinifyJs::minify(js),
            "x.split(/[/*]/);\nreturn /a\\/*b/g.test(s);\nvar half = a / 2;"
        );
    }

    #[test]
    fn only_matching_extensions_are_touched() {
        let files = vec![
            FileRecord::new("a.js", "a.js", "// x\nf();"),
            FileRecord::new("a.css", "a.css", "a { b: c; }"),
        ];
        let out = MinifyJs.apply(files).unwrap();
        assert_eq!(out[0].contents, b"f();".to_vec());
        assert_eq!(out[1].contents, b"a { b: c; }".to_vec());
    }
}

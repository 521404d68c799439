//! # Go Source Scanning
//!
//! A lightweight scanner for Go source files that extracts exactly what the
//! import-closure resolver needs: the package clause name, declared import
//! paths, `// +build` constraint lines, and `#include` directives from cgo
//! preambles. It is comment- and string-literal-aware but deliberately not a
//! full parser; a file it cannot make sense of simply contributes nothing.
//!
//! Platform filtering follows the Go toolchain's filename convention:
//! `name_GOOS.go`, `name_GOARCH.go`, and `name_GOOS_GOARCH.go` are only
//! scanned when they match the host platform.

use std::fs;
use std::io;
use std::path::Path;

/// The interesting parts of one Go source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoFile {
    /// Name from the `package` clause.
    pub package_name: String,
    /// Declared import paths, in declaration order. Includes `"C"` for cgo
    /// files; the closure resolver filters it out with the rest of the
    /// standard library.
    pub imports: Vec<String>,
    /// Raw `+build` constraint lines from the comment block preceding the
    /// package clause, e.g. `"linux,cgo darwin"`.
    pub build_tags: Vec<String>,
    /// Paths from `#include "..."` directives in the comment group
    /// immediately preceding an `import "C"` spec.
    pub cgo_includes: Vec<String>,
}

/// Known GOOS values, used for filename suffix filtering.
const GOOS_LIST: &[&str] = &[
    "android", "darwin", "dragonfly", "freebsd", "linux", "nacl", "netbsd", "openbsd", "plan9",
    "solaris", "windows",
];

/// Known GOARCH values, used for filename suffix filtering.
const GOARCH_LIST: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "ppc64", "ppc64le", "mips",
    "mipsle", "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "s390", "s390x", "sparc",
    "sparc64",
];

/// The GOOS name of the host platform.
pub fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// The GOARCH name of the host platform.
pub fn host_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Whether `file_name` names a test file.
pub fn is_test_file(file_name: &str) -> bool {
    file_name.ends_with("_test.go")
}

/// Whether a file name's platform suffix (if any) matches the host.
///
/// Applied only under `--native-only`; a file with no recognized suffix
/// always matches.
pub fn matches_host_platform(file_name: &str) -> bool {
    let parts: Vec<&str> = file_name.split('_').collect();
    if parts.len() == 1 {
        return true;
    }

    // *_GOOS.go, *_GOARCH.go, *_GOOS_GOARCH.go
    let last = parts[parts.len() - 1].trim_end_matches(".go");
    if GOOS_LIST.contains(&last) && last != host_goos() {
        return false;
    }
    if GOARCH_LIST.contains(&last) && last != host_goarch() {
        return false;
    }
    if GOARCH_LIST.contains(&last) {
        let prev = parts[parts.len() - 2];
        if GOOS_LIST.contains(&prev) && prev != host_goos() {
            return false;
        }
    }

    true
}

/// Whether any individual tag token in `tags` matches a filter.
///
/// A `+build` line is an OR of space-separated groups, each an AND of
/// comma-separated tokens; matching is on the individual tokens, so a file
/// tagged `// +build linux,exotic` is skipped when `exotic` is filtered.
pub fn has_filtered_build_tag(tags: &[String], filters: &[String]) -> bool {
    for tagline in tags {
        for group in tagline.split_whitespace() {
            for tag in group.split(',') {
                if filters.iter().any(|f| f == tag) {
                    return true;
                }
            }
        }
    }
    false
}

/// Read and scan one Go source file.
///
/// Returns `Ok(None)` when the file has no recognizable package clause;
/// callers treat both that and `Err` as "this file contributes no imports".
pub fn parse_file(path: &Path) -> io::Result<Option<GoFile>> {
    let bytes = fs::read(path)?;
    let src = String::from_utf8_lossy(&bytes);
    Ok(parse_source(&src))
}

/// Scan Go source text. Returns `None` when no package clause is found.
pub fn parse_source(src: &str) -> Option<GoFile> {
    let stripped = strip_comments(src);

    // Package clause: first code line of the form `package <name>`.
    let (package_line, package_name) = stripped.code.iter().enumerate().find_map(|(i, line)| {
        let mut toks = line.split_whitespace();
        if toks.next() == Some("package") {
            toks.next()
                .map(|name| (i, name.trim_end_matches(';').to_string()))
        } else {
            None
        }
    })?;
    if package_name.is_empty() {
        return None;
    }

    // Build tags live in comments above the package clause.
    let mut build_tags = Vec::new();
    for comment in stripped.comments.iter().take(package_line).flatten() {
        let text = comment.trim();
        if let Some(rest) = text.strip_prefix("+build") {
            build_tags.push(rest.trim().to_string());
        }
    }

    let mut file = GoFile {
        package_name,
        build_tags,
        ..GoFile::default()
    };

    let mut in_block = false;
    for i in package_line + 1..stripped.code.len() {
        let line = stripped.code[i].trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            if let Some(path) = first_quoted(line) {
                record_import(&stripped, i, path, &mut file);
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("import") else {
            continue;
        };
        let rest = rest.trim_start();
        match rest.chars().next() {
            Some('(') => {
                let inline = rest[1..].trim();
                if let Some(path) = first_quoted(inline) {
                    record_import(&stripped, i, path, &mut file);
                }
                in_block = !rest.contains(')');
            }
            Some('"') | Some('.') | Some('_') => {
                if let Some(path) = first_quoted(rest) {
                    record_import(&stripped, i, path, &mut file);
                }
            }
            Some(c) if c.is_alphabetic() => {
                // Aliased single import: `import alias "path"`.
                if let Some(path) = first_quoted(rest) {
                    record_import(&stripped, i, path, &mut file);
                }
            }
            _ => {}
        }
    }

    Some(file)
}

/// Record one import spec; `"C"` pulls `#include` directives out of the
/// directly preceding comment group instead.
fn record_import(stripped: &Stripped, line: usize, path: &str, file: &mut GoFile) {
    if path != "C" {
        file.imports.push(path.to_string());
        return;
    }
    for comment in preceding_comment_group(stripped, line) {
        let text = comment.trim();
        if let Some(rest) = text.strip_prefix("#include \"") {
            if let Some(end) = rest.find('"') {
                file.cgo_includes.push(rest[..end].to_string());
            }
        }
    }
}

/// The contiguous run of comment-only lines directly above `line`, in
/// source order.
fn preceding_comment_group(stripped: &Stripped, line: usize) -> Vec<String> {
    let mut group = Vec::new();
    let mut i = line;
    while i > 0 {
        i -= 1;
        let is_comment_only =
            stripped.comments[i].is_some() && stripped.code[i].trim().is_empty();
        if !is_comment_only {
            break;
        }
        group.push(stripped.comments[i].clone().unwrap_or_default());
    }
    group.reverse();
    group
}

/// The first double-quoted string on a line, if any.
fn first_quoted(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let end = line[start..].find('"')? + start;
    Some(&line[start..end])
}

/// Source text split into per-line code and comment channels.
struct Stripped {
    /// Code with comments blanked out, one entry per source line.
    code: Vec<String>,
    /// Comment text (sans markers) per source line, `None` where there is
    /// no comment. Block comments contribute one entry per spanned line.
    comments: Vec<Option<String>>,
}

/// Separate comments from code, preserving line structure. String, raw
/// string, and character literals are honored so that comment markers inside
/// them do not derail the scan.
fn strip_comments(src: &str) -> Stripped {
    enum State {
        Code,
        LineComment,
        BlockComment,
        DQuote,
        Backtick,
        SQuote,
    }

    let mut code = Vec::new();
    let mut comments = Vec::new();
    let mut code_buf = String::new();
    let mut comment_buf: Option<String> = None;
    let mut state = State::Code;

    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            code.push(std::mem::take(&mut code_buf));
            comments.push(comment_buf.take());
            if let State::LineComment | State::DQuote | State::SQuote = state {
                state = State::Code;
            }
            continue;
        }
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    comment_buf = Some(String::new());
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    comment_buf.get_or_insert_with(String::new);
                    state = State::BlockComment;
                }
                '"' => {
                    code_buf.push(c);
                    state = State::DQuote;
                }
                '`' => {
                    code_buf.push(c);
                    state = State::Backtick;
                }
                '\'' => {
                    code_buf.push(c);
                    state = State::SQuote;
                }
                _ => code_buf.push(c),
            },
            State::LineComment => {
                if let Some(buf) = comment_buf.as_mut() {
                    buf.push(c);
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                } else if let Some(buf) = comment_buf.as_mut() {
                    buf.push(c);
                } else {
                    comment_buf = Some(c.to_string());
                }
            }
            State::DQuote => match c {
                '\\' => {
                    code_buf.push(c);
                    if let Some(&next) = chars.peek() {
                        code_buf.push(next);
                        chars.next();
                    }
                }
                '"' => {
                    code_buf.push(c);
                    state = State::Code;
                }
                _ => code_buf.push(c),
            },
            State::Backtick => {
                code_buf.push(c);
                if c == '`' {
                    state = State::Code;
                }
            }
            State::SQuote => match c {
                '\\' => {
                    code_buf.push(c);
                    if let Some(&next) = chars.peek() {
                        code_buf.push(next);
                        chars.next();
                    }
                }
                '\'' => {
                    code_buf.push(c);
                    state = State::Code;
                }
                _ => code_buf.push(c),
            },
        }
    }
    if !code_buf.is_empty() || comment_buf.is_some() {
        code.push(code_buf);
        comments.push(comment_buf);
    }

    Stripped { code, comments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_imports() {
        let src = r#"
package demo

import "host.example/org/a"
import alias "host.example/org/b"
import _ "host.example/org/c"
import . "host.example/org/d"
"#;
        let file = parse_source(src).unwrap();
        assert_eq!(file.package_name, "demo");
        assert_eq!(
            file.imports,
            vec![
                "host.example/org/a",
                "host.example/org/b",
                "host.example/org/c",
                "host.example/org/d"
            ]
        );
    }

    #[test]
    fn test_parse_import_block() {
        let src = r#"
package demo

import (
    "fmt"
    x "host.example/org/a"
    _ "host.example/org/b"
)
"#;
        let file = parse_source(src).unwrap();
        assert_eq!(
            file.imports,
            vec!["fmt", "host.example/org/a", "host.example/org/b"]
        );
    }

    #[test]
    fn test_build_tags_before_package_clause() {
        let src = "// +build linux,cgo darwin\n// +build !windows\n\npackage demo\n";
        let file = parse_source(src).unwrap();
        assert_eq!(file.build_tags, vec!["linux,cgo darwin", "!windows"]);
    }

    #[test]
    fn test_build_tags_after_package_clause_ignored() {
        let src = "package demo\n\n// +build ignore\n";
        let file = parse_source(src).unwrap();
        assert!(file.build_tags.is_empty());
    }

    #[test]
    fn test_cgo_line_comment_preamble() {
        let src = r#"
package demo

// #include "lib/native.h"
// #include <stdio.h>
import "C"
"#;
        let file = parse_source(src).unwrap();
        assert_eq!(file.cgo_includes, vec!["lib/native.h"]);
        assert!(file.imports.is_empty());
    }

    #[test]
    fn test_cgo_block_comment_preamble() {
        let src = r#"
package demo

import (
    /*
    #include "native.h"
    */
    "C"
    "host.example/org/a"
)
"#;
        let file = parse_source(src).unwrap();
        assert_eq!(file.cgo_includes, vec!["native.h"]);
        assert_eq!(file.imports, vec!["host.example/org/a"]);
    }

    #[test]
    fn test_comment_markers_inside_strings() {
        let src = "package demo\n\nvar u = \"https://host.example\"\nvar v = `/* raw */`\n\nimport \"host.example/org/a\"\n";
        let file = parse_source(src).unwrap();
        assert_eq!(file.imports, vec!["host.example/org/a"]);
    }

    #[test]
    fn test_no_package_clause() {
        assert!(parse_source("// just a comment\n").is_none());
        assert!(parse_source("").is_none());
    }

    #[test]
    fn test_has_filtered_build_tag() {
        let tags = vec!["linux,exotic darwin".to_string()];
        assert!(has_filtered_build_tag(&tags, &["exotic".to_string()]));
        assert!(has_filtered_build_tag(&tags, &["darwin".to_string()]));
        assert!(!has_filtered_build_tag(&tags, &["windows".to_string()]));
        // Negated tags do not match their positive filter.
        let negated = vec!["!ignore".to_string()];
        assert!(!has_filtered_build_tag(&negated, &["ignore".to_string()]));
        assert!(!has_filtered_build_tag(&[], &["ignore".to_string()]));
    }

    #[test]
    fn test_matches_host_platform() {
        // No suffix always matches.
        assert!(matches_host_platform("plain.go"));
        assert!(matches_host_platform("many_words_here.go"));

        let native_os = format!("file_{}.go", host_goos());
        assert!(matches_host_platform(&native_os));
        let native_both = format!("file_{}_{}.go", host_goos(), host_goarch());
        assert!(matches_host_platform(&native_both));

        let foreign_os = if host_goos() == "plan9" { "linux" } else { "plan9" };
        assert!(!matches_host_platform(&format!("file_{}.go", foreign_os)));
        assert!(!matches_host_platform(&format!(
            "file_{}_{}.go",
            foreign_os,
            host_goarch()
        )));

        let foreign_arch = if host_goarch() == "sparc64" { "amd64" } else { "sparc64" };
        assert!(!matches_host_platform(&format!("file_{}.go", foreign_arch)));
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file("lib_test.go"));
        assert!(!is_test_file("lib.go"));
        assert!(!is_test_file("test.go"));
    }
}

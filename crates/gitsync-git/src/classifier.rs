//! Content classification: is a blob text, and what language is it.

use std::path::Path;

/// Language label used when nothing more specific is known.
pub const FALLBACK_LANGUAGE: &str = "Text";

/// Bytes inspected by the binary check, matching git's own heuristic.
const BINARY_CHECK_LEN: usize = 8000;

/// Decides whether blob content is text and names its language.
pub trait ContentClassifier: Send + Sync {
    /// Best-effort check that the bytes are human-readable text.
    fn is_probably_text(&self, data: &[u8]) -> bool;

    /// Language name for display and faceting.
    fn detect_language(&self, path: &str, data: &[u8]) -> String;
}

/// Classifier using a NUL-byte scan and file name / extension tables.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ContentClassifier for HeuristicClassifier {
    fn is_probably_text(&self, data: &[u8]) -> bool {
        let head = &data[..data.len().min(BINARY_CHECK_LEN)];
        !head.contains(&0)
    }

    fn detect_language(&self, path: &str, data: &[u8]) -> String {
        if let Some(language) = language_for_path(path) {
            return language.to_string();
        }
        if let Some(language) = language_for_shebang(data) {
            return language.to_string();
        }
        FALLBACK_LANGUAGE.to_string()
    }
}

fn language_for_path(path: &str) -> Option<&'static str> {
    let path = Path::new(path);
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let by_name = match filename.as_str() {
        "makefile" | "gnumakefile" => Some("Makefile"),
        "dockerfile" => Some("Dockerfile"),
        "rakefile" | "gemfile" | "guardfile" | "capfile" | "podfile" => Some("Ruby"),
        "cmakelists.txt" => Some("CMake"),
        "cargo.lock" => Some("TOML"),
        _ => None,
    };
    if by_name.is_some() {
        return by_name;
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let language = match ext.as_str() {
        "rs" => "Rust",
        "py" => "Python",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" => "TypeScript",
        "tsx" => "TSX",
        "jsx" => "JSX",
        "go" => "Go",
        "java" => "Java",
        "c" => "C",
        "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "C++",
        "cs" => "C#",
        "rb" | "rake" | "gemspec" | "ru" => "Ruby",
        "erb" => "HTML+ERB",
        "haml" => "Haml",
        "php" => "PHP",
        "swift" => "Swift",
        "kt" | "kts" => "Kotlin",
        "scala" => "Scala",
        "r" => "R",
        "lua" => "Lua",
        "sh" | "bash" | "zsh" => "Shell",
        "fish" => "fish",
        "ps1" => "PowerShell",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "less" => "Less",
        "coffee" => "CoffeeScript",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "xml" => "XML",
        "md" | "markdown" => "Markdown",
        "rst" => "reStructuredText",
        "tex" => "TeX",
        "proto" => "Protocol Buffer",
        "graphql" | "gql" => "GraphQL",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "ex" | "exs" => "Elixir",
        "erl" => "Erlang",
        "hs" => "Haskell",
        "ml" | "mli" => "OCaml",
        "clj" | "cljs" => "Clojure",
        "el" => "Emacs Lisp",
        "vim" => "Vim script",
        "tf" | "hcl" => "HCL",
        "nix" => "Nix",
        "zig" => "Zig",
        "dart" => "Dart",
        "nim" => "Nim",
        "jl" => "Julia",
        _ => return None,
    };
    Some(language)
}

fn language_for_shebang(data: &[u8]) -> Option<&'static str> {
    let first_line = data.split(|b| *b == b'\n').next()?;
    let line = std::str::from_utf8(first_line).ok()?;
    let interpreter = line.strip_prefix("#!")?;

    if interpreter.contains("ruby") {
        Some("Ruby")
    } else if interpreter.contains("python") {
        Some("Python")
    } else if interpreter.contains("node") {
        Some("JavaScript")
    } else if interpreter.contains("perl") {
        Some("Perl")
    } else if interpreter.contains("sh") {
        Some("Shell")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_detection() {
        let classifier = HeuristicClassifier::new();
        assert!(classifier.is_probably_text(b"def project_name_regex\nend\n"));
        assert!(classifier.is_probably_text(b""));
        assert!(!classifier.is_probably_text(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
    }

    #[test]
    fn test_nul_after_check_window_is_text() {
        let classifier = HeuristicClassifier::new();
        let mut data = vec![b'a'; BINARY_CHECK_LEN];
        data.push(0);
        assert!(classifier.is_probably_text(&data));
    }

    #[test]
    fn test_language_by_extension() {
        let classifier = HeuristicClassifier::new();
        assert_eq!(classifier.detect_language("app/models/user.rb", b""), "Ruby");
        assert_eq!(classifier.detect_language("src/lib.RS", b""), "Rust");
        assert_eq!(classifier.detect_language("Gemfile", b""), "Ruby");
        assert_eq!(classifier.detect_language("docs/notes", b""), "Text");
    }

    #[test]
    fn test_language_by_shebang() {
        let classifier = HeuristicClassifier::new();
        assert_eq!(
            classifier.detect_language("bin/setup", b"#!/usr/bin/env ruby\nputs 1\n"),
            "Ruby"
        );
        assert_eq!(
            classifier.detect_language("bin/run", b"#!/bin/bash\necho hi\n"),
            "Shell"
        );
    }
}

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntectTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::models::Theme;

/// Language tag used when a fence has no annotation or an unknown one
pub const PLAIN_TEXT_LANGUAGE: &str = "text";

/// Global syntax set for language definitions (initialized once)
static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Global theme set for syntax highlighting themes (initialized once)
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Plain RGB so front ends can map it onto their own color type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<syntect::highlighting::Color> for Rgb {
    fn from(color: syntect::highlighting::Color) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

/// A span of highlighted text with styling information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightedSpan {
    pub text: String,
    pub color: Rgb,
}

/// Normalize language names to match syntect's syntax definitions
pub fn normalize_language(lang: &str) -> String {
    match lang.trim().to_lowercase().as_str() {
        "py" => "python".to_string(),
        "js" | "jsx" => "javascript".to_string(),
        "ts" | "tsx" => "typescript".to_string(),
        "rs" => "rust".to_string(),
        "sh" | "shell" | "zsh" => "bash".to_string(),
        "yml" => "yaml".to_string(),
        "md" => "markdown".to_string(),
        "cpp" | "c++" => "c++".to_string(),
        "cs" => "c#".to_string(),
        "rb" => "ruby".to_string(),
        "golang" => "go".to_string(),
        other => other.to_string(),
    }
}

fn find_syntax(normalized: &str) -> Option<&'static SyntaxReference> {
    SYNTAX_SET
        .find_syntax_by_extension(normalized)
        .or_else(|| SYNTAX_SET.find_syntax_by_name(normalized))
        .or_else(|| SYNTAX_SET.find_syntax_by_token(normalized))
}

/// Canonical language tag for a fence annotation.
///
/// Returns the normalized name when the highlighter knows it, otherwise
/// [`PLAIN_TEXT_LANGUAGE`].
pub fn resolve_language(annotation: Option<&str>) -> String {
    annotation
        .map(normalize_language)
        .filter(|lang| !lang.is_empty() && find_syntax(lang).is_some())
        .unwrap_or_else(|| PLAIN_TEXT_LANGUAGE.to_string())
}

fn syntect_theme(theme: Theme) -> Option<&'static SyntectTheme> {
    let name = if theme.is_dark() {
        "Solarized (dark)"
    } else {
        "Solarized (light)"
    };
    THEME_SET.themes.get(name)
}

fn fallback_foreground(theme: Theme) -> Rgb {
    if theme.is_dark() {
        Rgb { r: 236, g: 236, b: 236 }
    } else {
        Rgb { r: 33, g: 33, b: 33 }
    }
}

/// Highlight `code` line by line.
///
/// Each returned entry is one source line without its line terminator. An
/// unknown language yields single plain spans in the theme foreground.
pub fn highlight_lines(code: &str, language: &str, theme: Theme) -> Vec<Vec<HighlightedSpan>> {
    let syntect_theme = syntect_theme(theme);
    let foreground = syntect_theme
        .and_then(|t| t.settings.foreground)
        .map(Rgb::from)
        .unwrap_or_else(|| fallback_foreground(theme));

    let plain = |line: &str| {
        vec![HighlightedSpan {
            text: line.trim_end_matches(['\r', '\n']).to_string(),
            color: foreground,
        }]
    };

    let syntax = if language == PLAIN_TEXT_LANGUAGE {
        None
    } else {
        find_syntax(&normalize_language(language))
    };

    let (Some(syntax), Some(syntect_theme)) = (syntax, syntect_theme) else {
        return LinesWithEndings::from(code).map(plain).collect();
    };

    let mut highlighter = HighlightLines::new(syntax, syntect_theme);
    LinesWithEndings::from(code)
        .map(|line| match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => ranges
                .into_iter()
                .map(|(style, text)| HighlightedSpan {
                    text: text.trim_end_matches(['\r', '\n']).to_string(),
                    color: style.foreground.into(),
                })
                .filter(|span| !span.text.is_empty())
                .collect(),
            Err(_) => plain(line),
        })
        .collect()
}

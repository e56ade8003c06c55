//! This module implements the pattern-based layout.
//!
//! The pattern grammar understands the conversion characters `%c %d %m %p
//! %n %r %a %f %%`, optional padding/truncation specifiers (`%-20c`,
//! `%.10m`) and a date sub-format mini-language (`y M d H m s S` plus the
//! named presets `ISO8601`, `ABSOLUTE` and `DATE`). Unrecognized
//! characters pass through literally.
use std::time::Instant;

use crate::event::LoggingEvent;
use crate::layout::Layout;

/// The pattern used when none is given: message parts plus a newline.
pub const DEFAULT_CONVERSION_PATTERN: &str = "%m%n";

/// Pattern preset for `%d` without a sub-format.
const ISO8601_FORMAT: &str = "yyyy-MM-dd HH:mm:ss,SSS";
const ABSOLUTE_FORMAT: &str = "HH:mm:ss,SSS";
const DATE_FORMAT: &str = "dd MMM yyyy HH:mm:ss,SSS";

/// A layout which formats events according to a conversion pattern.
pub struct PatternLayout {
    tokens: Vec<Token>,
    custom_fields: Vec<(String, String)>,
    created: Instant,
}

#[derive(Debug)]
enum Token {
    Literal(String),
    Conversion(Conversion),
}

#[derive(Debug)]
struct Conversion {
    kind: char,
    left_justify: bool,
    min_width: Option<usize>,
    precision: Option<usize>,
    /// Raw `{...}` sub-specifier, already translated for `%d`.
    spec: Option<String>,
}

impl Default for PatternLayout {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSION_PATTERN)
    }
}

impl PatternLayout {
    /// Creates a layout for the given conversion pattern.
    ///
    /// The pattern is parsed once, in a single left-to-right scan.
    pub fn new(pattern: &str) -> Self {
        Self {
            tokens: parse_pattern(pattern),
            custom_fields: Vec::new(),
            created: Instant::now(),
        }
    }

    /// Adds a custom field, addressable from the pattern via `%f{index}`.
    pub fn add_custom_field(&mut self, name: &str, value: &str) {
        self.custom_fields.push((name.to_string(), value.to_string()));
    }

    fn format_conversion(&self, conv: &Conversion, event: &LoggingEvent) -> String {
        match conv.kind {
            'c' => {
                let name = event.logger_name.as_deref().unwrap_or("");
                let depth = conv
                    .spec
                    .as_deref()
                    .map(|s| s.parse::<usize>().unwrap_or(0))
                    .unwrap_or(0);
                if depth == 0 {
                    name.to_string()
                } else {
                    let segments: Vec<&str> = name.split('.').collect();
                    let skip = segments.len().saturating_sub(depth);
                    segments[skip..].join(".")
                }
            }
            'd' => {
                let format = conv.spec.as_deref().unwrap_or("");
                event.timestamp.format(format).to_string()
            }
            'm' => event.message_parts.join(" "),
            'a' => format!("[{}]", event.message_parts.join(", ")),
            'p' => event.level.name().to_string(),
            'n' => "\n".to_string(),
            'r' => self.created.elapsed().as_millis().to_string(),
            'f' => {
                let index = conv
                    .spec
                    .as_deref()
                    .map(|s| s.parse::<usize>().unwrap_or(0))
                    .unwrap_or(0);
                self.custom_fields
                    .get(index)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default()
            }
            other => other.to_string(),
        }
    }
}

impl Layout for PatternLayout {
    fn format(&self, event: &LoggingEvent) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Conversion(conv) => {
                    let mut field = self.format_conversion(conv, event);
                    if let Some(precision) = conv.precision {
                        if precision > 0 && field.chars().count() > precision {
                            // Truncate from the front, keeping the tail.
                            let skip = field.chars().count() - precision;
                            field = field.chars().skip(skip).collect();
                        }
                    }
                    if let Some(width) = conv.min_width {
                        let len = field.chars().count();
                        if len < width {
                            let padding = " ".repeat(width - len);
                            if conv.left_justify {
                                field.push_str(&padding);
                            } else {
                                field.insert_str(0, &padding);
                            }
                        }
                    }
                    out.push_str(&field);
                }
            }
        }
        out
    }
}

fn parse_pattern(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            literal.push(ch);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            literal.push('%');
            continue;
        }

        let left_justify = if chars.peek() == Some(&'-') {
            chars.next();
            true
        } else {
            false
        };
        let min_width = read_number(&mut chars);
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            // A dot without digits degrades to no truncation.
            read_number(&mut chars)
        } else {
            None
        };

        let Some(kind) = chars.next() else {
            literal.push('%');
            break;
        };
        if !matches!(kind, 'c' | 'd' | 'm' | 'p' | 'n' | 'r' | 'a' | 'f') {
            // Unrecognized conversion character: pass through literally.
            literal.push('%');
            literal.push(kind);
            continue;
        }

        let mut spec = None;
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut inner = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                inner.push(c);
            }
            spec = Some(inner);
        }
        if kind == 'd' {
            let raw = spec.as_deref().unwrap_or(ISO8601_FORMAT);
            spec = Some(translate_date_format(raw));
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(Token::Conversion(Conversion {
            kind,
            left_justify,
            min_width,
            precision,
            spec,
        }));
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    digits.parse().ok()
}

/// Translates the `y M d H m s S` date mini-language into a chrono format
/// string. Named presets resolve to their full pattern first; characters
/// outside the mini-language are kept verbatim.
fn translate_date_format(spec: &str) -> String {
    let spec = match spec {
        "" | "ISO8601" => ISO8601_FORMAT,
        "ABSOLUTE" => ABSOLUTE_FORMAT,
        "DATE" => DATE_FORMAT,
        other => other,
    };

    let mut out = String::new();
    let mut chars = spec.chars().peekable();
    while let Some(ch) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&ch) {
            chars.next();
            run += 1;
        }
        match ch {
            'y' => out.push_str(if run == 2 { "%y" } else { "%Y" }),
            'M' => out.push_str(match run {
                1 => "%-m",
                2 => "%m",
                _ => "%b",
            }),
            'd' => out.push_str(if run >= 2 { "%d" } else { "%-d" }),
            'H' => out.push_str(if run >= 2 { "%H" } else { "%-H" }),
            'm' => out.push_str(if run >= 2 { "%M" } else { "%-M" }),
            's' => out.push_str(if run >= 2 { "%S" } else { "%-S" }),
            'S' => out.push_str("%3f"),
            '%' => {
                for _ in 0..run {
                    out.push_str("%%");
                }
            }
            other => {
                for _ in 0..run {
                    out.push(other);
                }
            }
        }
    }
    out
}

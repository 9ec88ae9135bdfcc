//! Random strings that match a regular expression.
//!
//! The pattern is parsed into `regex_syntax` HIR and the tree is walked,
//! emitting one random choice per node. Patterns follow XML Schema syntax:
//! `^` and `$` are ordinary characters, `\i` `\c` are name classes. Output is
//! limited to characters that are legal in XML 1.0 text so the strings can be
//! dropped into documents.

use crate::core::rnd::Rnd;
use crate::utils::error::{DiceError, Result};
use regex_syntax::hir::{Class, ClassBytes, ClassUnicode, Hir, HirKind, Repetition};
use regex_syntax::Parser;

#[derive(Debug, Clone)]
pub struct RegexOptions {
    /// Upper bound of extra repetitions for `*`, `+` and `{n,}`.
    pub max_extra: u32,
    /// Rate of the exponential draw for extra repetitions.
    pub repeat_rate: f64,
    /// Draws per class before giving up on finding an XML-safe character.
    pub max_char_attempts: usize,
    /// Largest repetition count a pattern may demand, e.g. the 8 in `a{8}`.
    pub max_count: u32,
}

impl Default for RegexOptions {
    fn default() -> Self {
        Self {
            max_extra: 16,
            repeat_rate: 0.2,
            max_char_attempts: 32,
            max_count: 1024,
        }
    }
}

pub fn generate(rnd: &mut Rnd, pattern: &str, options: &RegexOptions) -> Result<String> {
    let translated = translate_xsd_escapes(pattern);
    let hir = Parser::new()
        .parse(&translated)
        .map_err(|e| DiceError::PatternError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

    let mut out = String::new();
    emit(&hir, rnd, options, pattern, &mut out)?;
    Ok(out)
}

/// XML Schema 的 `\i` `\c` 不是一般 regex 語法，先換成等價的字元類別；
/// 類別外的 `^` `$` 在 XSD 裡是普通字元，要跳脫
pub fn translate_xsd_escapes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut class_depth = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {}
            '[' => {
                out.push(c);
                class_depth += 1;
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                continue;
            }
            ']' if class_depth > 0 => {
                out.push(c);
                class_depth -= 1;
                continue;
            }
            '^' | '$' if class_depth == 0 => {
                out.push('\\');
                out.push(c);
                continue;
            }
            _ => {
                out.push(c);
                continue;
            }
        }
        match chars.next() {
            Some('i') => out.push_str("[_:A-Za-z]"),
            Some('I') => out.push_str("[^_:A-Za-z]"),
            Some('c') => out.push_str("[-._:A-Za-z0-9]"),
            Some('C') => out.push_str("[^-._:A-Za-z0-9]"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn emit(
    hir: &Hir,
    rnd: &mut Rnd,
    options: &RegexOptions,
    pattern: &str,
    out: &mut String,
) -> Result<()> {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(literal) => out.push_str(&String::from_utf8_lossy(&literal.0)),
        HirKind::Class(Class::Unicode(class)) => {
            out.push(pick_unicode(class, rnd, options, pattern)?)
        }
        HirKind::Class(Class::Bytes(class)) => out.push(pick_byte(class, rnd, pattern)?),
        HirKind::Repetition(rep) => {
            let count = repetition_count(rep, rnd, options, pattern)?;
            for _ in 0..count {
                emit(&rep.sub, rnd, options, pattern, out)?;
            }
        }
        HirKind::Capture(capture) => emit(&capture.sub, rnd, options, pattern, out)?,
        HirKind::Concat(subs) => {
            for sub in subs {
                emit(sub, rnd, options, pattern, out)?;
            }
        }
        HirKind::Alternation(subs) => {
            if let Some(branch) = rnd.choice(subs) {
                emit(branch, rnd, options, pattern, out)?;
            }
        }
    }
    Ok(())
}

fn repetition_count(
    rep: &Repetition,
    rnd: &mut Rnd,
    options: &RegexOptions,
    pattern: &str,
) -> Result<u32> {
    if rep.min > options.max_count {
        return Err(DiceError::PatternError {
            pattern: pattern.to_string(),
            message: format!(
                "repetition of at least {} exceeds the limit of {}",
                rep.min, options.max_count
            ),
        });
    }

    // 上界太寬時和 `*` 一樣只多長 max_extra 次
    let ceiling = rep.min.saturating_add(options.max_extra);
    let count = match rep.max {
        Some(max) if max <= ceiling => rnd.randint(rep.min as i64, max as i64) as u32,
        _ => {
            let extra = (rnd.expovariate(options.repeat_rate) as u32).min(options.max_extra);
            rep.min.saturating_add(extra)
        }
    };
    Ok(count)
}

fn pick_unicode(
    class: &ClassUnicode,
    rnd: &mut Rnd,
    options: &RegexOptions,
    pattern: &str,
) -> Result<char> {
    let ranges = class.ranges();
    let total: u64 = ranges
        .iter()
        .map(|r| r.end() as u64 - r.start() as u64 + 1)
        .sum();
    if total == 0 {
        return Err(empty_class(pattern));
    }

    for _ in 0..options.max_char_attempts {
        let mut offset = (rnd.random() * total as f64) as u64;
        for range in ranges {
            let size = range.end() as u64 - range.start() as u64 + 1;
            if offset < size {
                if let Some(c) = char::from_u32(range.start() as u32 + offset as u32) {
                    if is_xml_char(c) {
                        return Ok(c);
                    }
                }
                break;
            }
            offset -= size;
        }
    }

    // 隨機抽不到就找第一個合法字元
    ranges
        .iter()
        .flat_map(|r| r.start()..=r.end())
        .take(0x1_0000)
        .find(|c| is_xml_char(*c))
        .ok_or_else(|| DiceError::PatternError {
            pattern: pattern.to_string(),
            message: "character class has no XML-safe characters".to_string(),
        })
}

fn pick_byte(class: &ClassBytes, rnd: &mut Rnd, pattern: &str) -> Result<char> {
    let ascii: Vec<char> = class
        .ranges()
        .iter()
        .flat_map(|r| r.start()..=r.end())
        .filter(|b| b.is_ascii())
        .map(char::from)
        .filter(|c| is_xml_char(*c))
        .collect();
    rnd.choice(&ascii).copied().ok_or_else(|| empty_class(pattern))
}

fn empty_class(pattern: &str) -> DiceError {
    DiceError::PatternError {
        pattern: pattern.to_string(),
        message: "character class matches nothing".to_string(),
    }
}

pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

//! Presentational MathML emission for a LaTeX expression subset.
//!
//! Supports the constructs that show up in typical documentation math:
//! identifiers, numbers, operators, `^`/`_` scripts, `\frac`, `\sqrt`,
//! `\text`, and a table of symbol commands (Greek letters, arrows,
//! comparison operators). Anything outside the subset makes conversion
//! fail, and the caller degrades to an `<mtext>` fallback of the raw
//! expression — a malformed formula must never fail a document render.

use std::fmt::Write;

use crate::escape::escape_html;

/// Render an expression to a `<math>` element.
///
/// Never fails: conversion errors produce a fallback rendering with the
/// raw expression as text.
#[must_use]
pub(crate) fn render_math(expr: &str, display: bool) -> String {
    let body = compile(expr)
        .unwrap_or_else(|_| format!("<mtext>{}</mtext>", escape_html(expr)));
    format!(
        r#"<math xmlns="http://www.w3.org/1998/Math/MathML" display="{}"><mrow>{body}</mrow></math>"#,
        if display { "block" } else { "inline" }
    )
}

#[derive(Debug)]
enum MathError {
    UnknownCommand,
    UnbalancedBraces,
    MissingArgument,
}

/// Symbol commands mapped to their glyph and element kind.
///
/// `true` marks identifiers (`<mi>`), `false` marks operators (`<mo>`).
const SYMBOLS: &[(&str, &str, bool)] = &[
    ("alpha", "α", true),
    ("beta", "β", true),
    ("gamma", "γ", true),
    ("delta", "δ", true),
    ("epsilon", "ε", true),
    ("zeta", "ζ", true),
    ("eta", "η", true),
    ("theta", "θ", true),
    ("lambda", "λ", true),
    ("mu", "μ", true),
    ("pi", "π", true),
    ("rho", "ρ", true),
    ("sigma", "σ", true),
    ("tau", "τ", true),
    ("phi", "φ", true),
    ("chi", "χ", true),
    ("psi", "ψ", true),
    ("omega", "ω", true),
    ("Gamma", "Γ", true),
    ("Delta", "Δ", true),
    ("Theta", "Θ", true),
    ("Lambda", "Λ", true),
    ("Pi", "Π", true),
    ("Sigma", "Σ", true),
    ("Phi", "Φ", true),
    ("Psi", "Ψ", true),
    ("Omega", "Ω", true),
    ("infty", "∞", true),
    ("partial", "∂", true),
    ("nabla", "∇", true),
    ("pm", "±", false),
    ("mp", "∓", false),
    ("times", "×", false),
    ("cdot", "⋅", false),
    ("div", "÷", false),
    ("leq", "≤", false),
    ("geq", "≥", false),
    ("neq", "≠", false),
    ("approx", "≈", false),
    ("equiv", "≡", false),
    ("to", "→", false),
    ("rightarrow", "→", false),
    ("leftarrow", "←", false),
    ("Rightarrow", "⇒", false),
    ("Leftarrow", "⇐", false),
    ("sum", "∑", false),
    ("prod", "∏", false),
    ("int", "∫", false),
    ("in", "∈", false),
    ("notin", "∉", false),
    ("subset", "⊂", false),
    ("subseteq", "⊆", false),
    ("cup", "∪", false),
    ("cap", "∩", false),
    ("forall", "∀", false),
    ("exists", "∃", false),
    ("ldots", "…", false),
    ("cdots", "⋯", false),
];

struct Parser<'a> {
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self { rest: expr }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.rest = &self.rest[ch.len_utf8()..];
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Parse a full group sequence until `}` or end of input.
    fn parse_sequence(&mut self, in_group: bool) -> Result<String, MathError> {
        let mut out = String::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    if in_group {
                        return Err(MathError::UnbalancedBraces);
                    }
                    return Ok(out);
                }
                Some('}') => {
                    if !in_group {
                        return Err(MathError::UnbalancedBraces);
                    }
                    self.bump();
                    return Ok(out);
                }
                _ => {
                    let atom = self.parse_atom()?;
                    out.push_str(&self.parse_scripts(atom)?);
                }
            }
        }
    }

    /// Parse one atom: a group, command, number, identifier or operator.
    fn parse_atom(&mut self) -> Result<String, MathError> {
        self.skip_whitespace();
        match self.peek().ok_or(MathError::MissingArgument)? {
            '{' => {
                self.bump();
                let inner = self.parse_sequence(true)?;
                Ok(format!("<mrow>{inner}</mrow>"))
            }
            '\\' => {
                self.bump();
                self.parse_command()
            }
            ch if ch.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(format!("<mn>{number}</mn>"))
            }
            ch if ch.is_alphabetic() => {
                self.bump();
                Ok(format!("<mi>{ch}</mi>"))
            }
            ch => {
                self.bump();
                Ok(format!("<mo>{}</mo>", escape_html(&ch.to_string())))
            }
        }
    }

    /// Attach `^` and `_` scripts to a base atom.
    fn parse_scripts(&mut self, base: String) -> Result<String, MathError> {
        let mut sup = None;
        let mut sub = None;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('^') if sup.is_none() => {
                    self.bump();
                    sup = Some(self.parse_atom()?);
                }
                Some('_') if sub.is_none() => {
                    self.bump();
                    sub = Some(self.parse_atom()?);
                }
                _ => break,
            }
        }
        Ok(match (sub, sup) {
            (Some(sub), Some(sup)) => format!("<msubsup>{base}{sub}{sup}</msubsup>"),
            (Some(sub), None) => format!("<msub>{base}{sub}</msub>"),
            (None, Some(sup)) => format!("<msup>{base}{sup}</msup>"),
            (None, None) => base,
        })
    }

    /// Parse a command after the backslash has been consumed.
    fn parse_command(&mut self) -> Result<String, MathError> {
        // Escaped single characters: `\$`, `\{`, `\\`, ...
        if let Some(ch) = self.peek() {
            if !ch.is_alphabetic() {
                self.bump();
                return Ok(format!("<mo>{}</mo>", escape_html(&ch.to_string())));
            }
        }

        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphabetic() {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(MathError::MissingArgument);
        }

        match name.as_str() {
            "frac" => {
                let numerator = self.parse_braced_group()?;
                let denominator = self.parse_braced_group()?;
                Ok(format!(
                    "<mfrac><mrow>{numerator}</mrow><mrow>{denominator}</mrow></mfrac>"
                ))
            }
            "sqrt" => {
                let radicand = self.parse_braced_group()?;
                Ok(format!("<msqrt><mrow>{radicand}</mrow></msqrt>"))
            }
            "text" => {
                let text = self.parse_braced_text()?;
                Ok(format!("<mtext>{}</mtext>", escape_html(&text)))
            }
            _ => SYMBOLS
                .iter()
                .find(|(cmd, _, _)| *cmd == name)
                .map(|(_, glyph, is_ident)| {
                    let mut out = String::new();
                    let tag = if *is_ident { "mi" } else { "mo" };
                    write!(out, "<{tag}>{glyph}</{tag}>").unwrap();
                    out
                })
                .ok_or(MathError::UnknownCommand),
        }
    }

    /// Parse a `{...}` argument as a sub-expression.
    fn parse_braced_group(&mut self) -> Result<String, MathError> {
        self.skip_whitespace();
        if self.peek() != Some('{') {
            return Err(MathError::MissingArgument);
        }
        self.bump();
        self.parse_sequence(true)
    }

    /// Parse a `{...}` argument as literal text (for `\text`).
    fn parse_braced_text(&mut self) -> Result<String, MathError> {
        self.skip_whitespace();
        if self.peek() != Some('{') {
            return Err(MathError::MissingArgument);
        }
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(MathError::UnbalancedBraces),
                Some('}') => return Ok(text),
                Some(ch) => text.push(ch),
            }
        }
    }
}

fn compile(expr: &str) -> Result<String, MathError> {
    Parser::new(expr).parse_sequence(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sum() {
        let html = render_math("x+y", false);
        assert!(html.contains(r#"display="inline""#));
        assert!(html.contains("<mi>x</mi><mo>+</mo><mi>y</mi>"));
    }

    #[test]
    fn test_display_mode_attribute() {
        let html = render_math("x", true);
        assert!(html.contains(r#"display="block""#));
    }

    #[test]
    fn test_numbers_group_digits() {
        let html = render_math("3.14", false);
        assert!(html.contains("<mn>3.14</mn>"));
    }

    #[test]
    fn test_superscript() {
        let html = render_math("x^2", false);
        assert!(html.contains("<msup><mi>x</mi><mn>2</mn></msup>"));
    }

    #[test]
    fn test_subscript_and_superscript_combined() {
        let html = render_math("x_i^2", false);
        assert!(html.contains("<msubsup><mi>x</mi><mi>i</mi><mn>2</mn></msubsup>"));
    }

    #[test]
    fn test_fraction() {
        let html = render_math(r"\frac{a}{b}", false);
        assert!(html.contains("<mfrac><mrow><mi>a</mi></mrow><mrow><mi>b</mi></mrow></mfrac>"));
    }

    #[test]
    fn test_sqrt_with_group_argument() {
        let html = render_math(r"\sqrt{x+1}", false);
        assert!(html.contains("<msqrt><mrow><mi>x</mi><mo>+</mo><mn>1</mn></mrow></msqrt>"));
    }

    #[test]
    fn test_greek_symbol() {
        let html = render_math(r"\alpha", false);
        assert!(html.contains("<mi>α</mi>"));
    }

    #[test]
    fn test_operator_symbol() {
        let html = render_math(r"a \leq b", false);
        assert!(html.contains("<mo>≤</mo>"));
    }

    #[test]
    fn test_text_command_escapes() {
        let html = render_math(r"\text{a<b}", false);
        assert!(html.contains("<mtext>a&lt;b</mtext>"));
    }

    #[test]
    fn test_escaped_dollar() {
        let html = render_math(r"\$5", false);
        assert!(html.contains("<mo>$</mo><mn>5</mn>"));
    }

    #[test]
    fn test_unknown_command_falls_back_to_raw_text() {
        let html = render_math(r"\unsupported{x}", false);
        assert!(html.contains(r"<mtext>\unsupported{x}</mtext>"));
    }

    #[test]
    fn test_unbalanced_braces_fall_back() {
        let html = render_math("{x", false);
        assert!(html.contains("<mtext>{x</mtext>"));
    }

    #[test]
    fn test_operator_is_escaped() {
        let html = render_math("a<b", false);
        assert!(html.contains("<mo>&lt;</mo>"));
    }
}

//! Arithmetic Expression Grammar
//!
//! A PEG grammar (pest) over integers, `+ - * /` and parentheses with
//! optional whitespace. A parse succeeds only if the whole input matches;
//! the result lists the number and operator tokens in source order.

use pest::Parser;
use pest_derive::Parser;

use super::{arg_str, OwnedBuffer, WrapperCategory, WrapperRegistry};

#[derive(Parser)]
#[grammar_inline = r#"
WHITESPACE = _{ " " | "\t" | "\r" | "\n" }

number   = @{ ASCII_DIGIT+ }
add      = { "+" }
subtract = { "-" }
multiply = { "*" }
divide   = { "/" }

factor     = { number | "(" ~ expression ~ ")" }
term       = { factor ~ ((multiply | divide) ~ factor)* }
expression = { term ~ ((add | subtract) ~ term)* }

input = { SOI ~ expression ~ EOI }
"#]
struct ArithmeticParser;

/// Result of parsing one expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub success: bool,
    pub tokens: Vec<String>,
    pub error: Option<String>,
}

impl ParseOutcome {
    /// `SUCCESS\nTokens: NUM:1, OP:+, ...` or `ERROR: <message>`
    pub fn render(&self) -> String {
        match &self.error {
            Some(message) if !self.success => format!("ERROR: {}", message),
            _ => format!("SUCCESS\nTokens: {}", self.tokens.join(", ")),
        }
    }
}

/// Parse `text`, collecting tokens
pub fn parse(text: &str) -> ParseOutcome {
    match ArithmeticParser::parse(Rule::input, text) {
        Ok(pairs) => {
            let tokens = pairs
                .flatten()
                .filter_map(|pair| match pair.as_rule() {
                    Rule::number => Some(format!("NUM:{}", pair.as_str())),
                    Rule::add | Rule::subtract | Rule::multiply | Rule::divide => {
                        Some(format!("OP:{}", pair.as_str()))
                    }
                    _ => None,
                })
                .collect();
            ParseOutcome {
                success: true,
                tokens,
                error: None,
            }
        }
        Err(e) => {
            tracing::debug!(%e, "expression rejected");
            let (line, col) = match e.line_col {
                pest::error::LineColLocation::Pos(pos) => pos,
                pest::error::LineColLocation::Span(start, _) => start,
            };
            ParseOutcome {
                success: false,
                tokens: Vec::new(),
                error: Some(format!("parse error at {}:{}: {}", line, col, e.variant.message())),
            }
        }
    }
}

/// Check whether `text` is a complete expression
pub fn validate(text: &str) -> bool {
    ArithmeticParser::parse(Rule::input, text).is_ok()
}

// =============================================================================
// Registration
// =============================================================================

/// Register the expression parser with the registry
pub fn register(registry: &mut WrapperRegistry) {
    registry.register_wrapper(
        "expr_parse",
        "Parse an arithmetic expression and list its tokens",
        WrapperCategory::Text,
        1,
        |args| Ok(OwnedBuffer::from_string(parse(arg_str(args, 0, "expression")?).render())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_in_source_order() {
        let outcome = parse("1 + 2 * (30 - 4) / 5");
        assert!(outcome.success);
        assert_eq!(
            outcome.tokens,
            vec!["NUM:1", "OP:+", "NUM:2", "OP:*", "NUM:30", "OP:-", "NUM:4", "OP:/", "NUM:5"]
        );
        assert_eq!(
            outcome.render(),
            "SUCCESS\nTokens: NUM:1, OP:+, NUM:2, OP:*, NUM:30, OP:-, NUM:4, OP:/, NUM:5"
        );
    }

    #[test]
    fn test_whitespace_is_optional() {
        assert_eq!(parse("7*8").tokens, parse("  7 *\t8\n").tokens);
    }

    #[test]
    fn test_rejects_incomplete_input() {
        for bad in ["", "1 +", "(1 + 2", "1 2", "a + 1", "1 + 2)"] {
            let outcome = parse(bad);
            assert!(!outcome.success, "{:?} should fail", bad);
            assert!(outcome.render().starts_with("ERROR: "));
            assert!(!validate(bad));
        }
    }

    #[test]
    fn test_validate_accepts_nested_parentheses() {
        assert!(validate("((1))"));
        assert!(validate("(1 + (2 * (3 - 4)))"));
    }
}

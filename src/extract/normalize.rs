use anyhow::{Context, Result};
use regex::{Captures, Regex};

const SUPERSCRIPTS: &[char] = &['²', '³'];
const RADICAL: char = '√';

const SYMBOL_TABLE: &[(char, &str)] = &[
    ('π', r"\pi"),
    ('α', r"\alpha"),
    ('β', r"\beta"),
    ('θ', r"\theta"),
    ('Δ', r"\Delta"),
    ('Σ', r"\Sigma"),
    ('∑', r"\sum"),
    ('×', r"\times"),
    ('÷', r"\div"),
    ('≥', r"\geq"),
    ('≤', r"\leq"),
    ('≠', r"\neq"),
    ('≈', r"\approx"),
    ('∞', r"\infty"),
];

/// Rewrites math glyphs in extracted text as inline LaTeX.
#[derive(Debug)]
pub(crate) struct MathNormalizer {
    superscript: Regex,
    radical_number: Regex,
    radical_group: Regex,
    fraction: Regex,
}

impl MathNormalizer {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            superscript: Regex::new(r"(\d+)([²³])")
                .context("failed to compile superscript regex")?,
            radical_number: Regex::new(r"√(\d+)").context("failed to compile radical regex")?,
            radical_group: Regex::new(r"√\(([^)]+)\)")
                .context("failed to compile grouped radical regex")?,
            fraction: Regex::new(r"(\d+)/(\d+)").context("failed to compile fraction regex")?,
        })
    }

    pub(crate) fn normalize(&self, text: &str) -> String {
        let has_digits = text.chars().any(|character| character.is_ascii_digit());
        if !has_digits && !contains_math_symbol(text) {
            return text.to_string();
        }

        // `$` in the input means someone already marked it up; fractions stay as written.
        let had_markup = text.contains('$');
        let mut output = text.to_string();

        if output.contains('%') && !output.contains(r"\%") {
            output = output.replace('%', r"\%");
        }

        output = outside_math(&output, |plain| {
            self.radical_group
                .replace_all(plain, |captures: &Captures| {
                    format!(r"$\sqrt{{{}}}$", self.latex_body(&captures[1], !had_markup))
                })
                .into_owned()
        });
        output = outside_math(&output, |plain| {
            self.radical_number
                .replace_all(plain, |captures: &Captures| {
                    format!(r"$\sqrt{{{}}}$", &captures[1])
                })
                .into_owned()
        });
        output = outside_math(&output, |plain| {
            self.superscript
                .replace_all(plain, |captures: &Captures| {
                    format!("${}^{}$", &captures[1], exponent(&captures[2]))
                })
                .into_owned()
        });
        if !had_markup {
            output = outside_math(&output, |plain| {
                self.fraction
                    .replace_all(plain, |captures: &Captures| {
                        format!(r"$\frac{{{}}}{{{}}}$", &captures[1], &captures[2])
                    })
                    .into_owned()
            });
        }
        output = outside_math(&output, |plain| {
            let mut plain = plain.to_string();
            for (symbol, command) in SYMBOL_TABLE {
                if plain.contains(*symbol) {
                    plain = plain.replace(*symbol, &format!("${command}$"));
                }
            }
            plain
        });

        output
    }

    /// LaTeX for the inside of an existing math span, without delimiters.
    fn latex_body(&self, text: &str, fractions: bool) -> String {
        let mut body = self
            .radical_number
            .replace_all(text, r"\sqrt{$1}")
            .into_owned();
        body = self
            .superscript
            .replace_all(&body, |captures: &Captures| {
                format!("{}^{}", &captures[1], exponent(&captures[2]))
            })
            .into_owned();
        if fractions {
            body = self
                .fraction
                .replace_all(&body, r"\frac{$1}{$2}")
                .into_owned();
        }
        for (symbol, command) in SYMBOL_TABLE {
            if body.contains(*symbol) {
                body = body.replace(*symbol, &format!("{command} "));
            }
        }
        body.trim_end().to_string()
    }
}

fn exponent(superscript: &str) -> u8 {
    if superscript == "²" { 2 } else { 3 }
}

/// Applies `rewrite` to the text between `$...$` spans and copies the spans
/// through untouched. An unpaired trailing `$` leaves the rest as is.
fn outside_math(text: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(open) = rest.find('$') else {
            output.push_str(&rewrite(rest));
            return output;
        };
        let Some(close) = rest[open + 1..].find('$').map(|offset| open + 1 + offset) else {
            output.push_str(&rewrite(&rest[..open]));
            output.push_str(&rest[open..]);
            return output;
        };
        output.push_str(&rewrite(&rest[..open]));
        output.push_str(&rest[open..=close]);
        rest = &rest[close + 1..];
    }
}

fn contains_math_symbol(text: &str) -> bool {
    text.chars().any(|character| {
        SUPERSCRIPTS.contains(&character)
            || character == RADICAL
            || SYMBOL_TABLE.iter().any(|(symbol, _)| *symbol == character)
    })
}

//! Weighted-sum stat formulas such as `treasury*0.5 + population*0.5`.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when a formula string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("term '{0}' is empty")]
    EmptyTerm(String),
    #[error("term '{term}' is not a resource, number, or product of one of each")]
    InvalidTerm { term: String },
}

/// One signed `weight * resource` term; `resource == None` is a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub resource: Option<String>,
    pub weight: f64,
}

/// Parsed formula: a signed sum of weighted resource terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    terms: Vec<Term>,
}

impl Formula {
    /// Parse a formula of the form `a*0.5 + 0.25*b - 3`.
    ///
    /// # Errors
    ///
    /// Returns an error if the formula is empty or any term is neither a
    /// resource id, a number, nor a product of one resource and numbers.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        if source.trim().is_empty() {
            return Err(FormulaError::Empty);
        }

        let mut terms = Vec::new();
        for (sign, raw) in split_signed_terms(source) {
            let term = parse_term(raw)?;
            terms.push(Term {
                weight: term.weight * sign,
                ..term
            });
        }
        Ok(Self { terms })
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Evaluate against resource values; missing resources count as zero.
    #[must_use]
    pub fn evaluate(&self, values: &BTreeMap<String, i32>) -> f64 {
        self.terms
            .iter()
            .map(|term| {
                let base = term
                    .resource
                    .as_ref()
                    .map_or(1.0, |id| values.get(id).copied().map_or(0.0, f64::from));
                base * term.weight
            })
            .sum()
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, term) in self.terms.iter().enumerate() {
            let sign = if term.weight < 0.0 { "-" } else { "+" };
            if idx == 0 {
                if term.weight < 0.0 {
                    f.write_str("-")?;
                }
            } else {
                write!(f, " {sign} ")?;
            }
            match &term.resource {
                Some(id) => write!(f, "{id}*{}", term.weight.abs())?,
                None => write!(f, "{}", term.weight.abs())?,
            }
        }
        Ok(())
    }
}

/// Split on top-level `+`/`-`, keeping a leading sign with its term. A sign
/// directly after `*` or at the start belongs to a number, not a new term.
fn split_signed_terms(source: &str) -> Vec<(f64, &str)> {
    let mut parts = Vec::new();
    let mut sign = 1.0;
    let mut start = 0;
    let mut previous_significant: Option<char> = None;

    for (idx, ch) in source.char_indices() {
        let is_sign = ch == '+' || ch == '-';
        if is_sign && previous_significant.is_none() {
            sign = if ch == '-' { -1.0 } else { 1.0 };
            start = idx + ch.len_utf8();
        } else if is_sign
            && !matches!(previous_significant, Some('*' | '+' | '-'))
            && !ends_with_exponent(&source[start..idx])
        {
            parts.push((sign, &source[start..idx]));
            sign = if ch == '-' { -1.0 } else { 1.0 };
            start = idx + ch.len_utf8();
        }
        if !ch.is_whitespace() {
            previous_significant = Some(ch);
        }
    }
    parts.push((sign, &source[start..]));
    parts
}

fn parse_term(raw: &str) -> Result<Term, FormulaError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FormulaError::EmptyTerm(raw.to_string()));
    }

    let mut weight = 1.0;
    let mut resource: Option<String> = None;
    let invalid = || FormulaError::InvalidTerm {
        term: trimmed.to_string(),
    };
    for factor in trimmed.split('*').map(str::trim) {
        if is_identifier(factor) {
            if resource.is_some() {
                return Err(invalid());
            }
            resource = Some(factor.to_string());
        } else {
            let number = factor.parse::<f64>().map_err(|_| invalid())?;
            weight *= number;
        }
    }
    if !weight.is_finite() {
        return Err(invalid());
    }
    Ok(Term { resource, weight })
}

/// `true` when the text so far ends in a number's exponent marker, as in the
/// `1e` of `1e-3`, so the following sign belongs to the exponent.
fn ends_with_exponent(text: &str) -> bool {
    let factor = text.rsplit('*').next().unwrap_or(text).trim();
    let Some(mantissa) = factor
        .strip_suffix('e')
        .or_else(|| factor.strip_suffix('E'))
    else {
        return false;
    };
    mantissa
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_digit() || first == '.')
        && mantissa.parse::<f64>().is_ok()
}

fn is_identifier(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, i32)]) -> BTreeMap<String, i32> {
        pairs
            .iter()
            .map(|(id, value)| ((*id).to_string(), *value))
            .collect()
    }

    #[test]
    fn evaluates_weighted_sum() {
        let formula = Formula::parse("resource1*0.5 + resource2*0.5").unwrap();
        let result = formula.evaluate(&values(&[("resource1", 60), ("resource2", 40)]));
        assert!((result - 50.0).abs() < 1e-9);
    }

    #[test]
    fn supports_leading_weights_constants_and_subtraction() {
        let formula = Formula::parse("0.25 * gold - church*0.5 + 10").unwrap();
        assert_eq!(formula.terms().len(), 3);
        let result = formula.evaluate(&values(&[("gold", 40), ("church", 20)]));
        assert!((result - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_resources_count_as_zero() {
        let formula = Formula::parse("gold*0.5 + ghosts*0.5").unwrap();
        let result = formula.evaluate(&values(&[("gold", 80)]));
        assert!((result - 40.0).abs() < 1e-9);
    }

    #[test]
    fn negative_weights_after_multiplication_stay_in_term() {
        let formula = Formula::parse("-gold * -2").unwrap();
        assert_eq!(formula.terms().len(), 1);
        let result = formula.evaluate(&values(&[("gold", 3)]));
        assert!((result - 6.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Formula::parse("  "), Err(FormulaError::Empty));
        assert!(matches!(
            Formula::parse("gold*church"),
            Err(FormulaError::InvalidTerm { .. })
        ));
        assert!(matches!(
            Formula::parse("gold + "),
            Err(FormulaError::EmptyTerm(_))
        ));
        assert!(matches!(
            Formula::parse("gold ^ 2"),
            Err(FormulaError::InvalidTerm { .. })
        ));
    }

    #[test]
    fn number_like_names_are_resources() {
        let formula = Formula::parse("nan*0.5 + inf*0.25 + infinity").unwrap();
        let names: Vec<Option<&str>> = formula
            .terms()
            .iter()
            .map(|term| term.resource.as_deref())
            .collect();
        assert_eq!(names, vec![Some("nan"), Some("inf"), Some("infinity")]);
        let result = formula.evaluate(&values(&[("nan", 40), ("inf", 40), ("infinity", 5)]));
        assert!((result - 35.0).abs() < 1e-9);
    }

    #[test]
    fn exponent_signs_stay_with_their_number() {
        let formula = Formula::parse("gold*1e-1 + 2E+1*church - 5e-1").unwrap();
        assert_eq!(formula.terms().len(), 3);
        let result = formula.evaluate(&values(&[("gold", 50), ("church", 1)]));
        assert!((result - 24.5).abs() < 1e-9);
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        assert!(matches!(
            Formula::parse("gold*1e999"),
            Err(FormulaError::InvalidTerm { .. })
        ));
        assert!(matches!(
            Formula::parse("gold*-1e999"),
            Err(FormulaError::InvalidTerm { .. })
        ));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let formula = Formula::parse("a*0.5 - b*2").unwrap();
        let reparsed: Formula = formula.to_string().parse().unwrap();
        assert_eq!(formula, reparsed);
    }
}

//! Word-character classification driven by the `iskeyword` option.
//!
//! The option value is a comma-separated list of tokens:
//!
//! - `c`        a single character
//! - `48`       a decimal code point (1-3 digits)
//! - `a-z`      a range; either bound may be numeric (`48-57`)
//! - `^token`   exclude what `token` covers
//! - `@`        every Unicode letter
//!
//! Specs are kept in reverse input order and the first spec covering a
//! character decides, so a later token overrides an earlier overlapping one.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use super::{OptionChange, OptionError, OptionScope, OptionService, OptionValue};

pub const OPTION_NAME: &str = "iskeyword";

/// Code points at or above this are always keyword characters
const ALWAYS_KEYWORD: u32 = 0x100;

pub type SharedClassifier = Arc<RwLock<KeywordClassifier>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("E474: Invalid argument: {0}")]
    InvalidToken(String),
    #[error("E474: Invalid argument: empty keyword token")]
    EmptyToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coverage {
    AllLetters,
    Range(u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeywordSpec {
    token: String,
    negate: bool,
    coverage: Coverage,
}

impl KeywordSpec {
    fn parse(token: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidToken(token.to_string());
        let (negate, body) = match token.strip_prefix('^') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, token),
        };
        if body.is_empty() {
            return Err(ParseError::EmptyToken);
        }

        let coverage = if body == "@" {
            Coverage::AllLetters
        } else {
            let chars: Vec<char> = body.chars().collect();
            // A range dash needs something on both sides
            let dash = (1..chars.len().saturating_sub(1)).find(|&i| chars[i] == '-');
            match dash {
                Some(i) => {
                    let low = parse_bound(&chars[..i]).ok_or_else(invalid)?;
                    let high = parse_bound(&chars[i + 1..]).ok_or_else(invalid)?;
                    if low > high {
                        return Err(invalid());
                    }
                    Coverage::Range(low, high)
                }
                None => {
                    let code = parse_bound(&chars).ok_or_else(invalid)?;
                    Coverage::Range(code, code)
                }
            }
        };

        Ok(Self {
            token: token.to_string(),
            negate,
            coverage,
        })
    }

    fn contains(&self, code: u32) -> bool {
        match self.coverage {
            Coverage::AllLetters => char::from_u32(code).is_some_and(char::is_alphabetic),
            Coverage::Range(low, high) => (low..=high).contains(&code),
        }
    }
}

/// 1-3 digits are a code point, anything else must be exactly one character
fn parse_bound(chars: &[char]) -> Option<u32> {
    if !chars.is_empty() && chars.len() <= 3 && chars.iter().all(char::is_ascii_digit) {
        return chars.iter().collect::<String>().parse().ok();
    }
    match chars {
        [c] => Some(u32::from(*c)),
        _ => None,
    }
}

/// Split an option value into tokens.
///
/// A comma is a separator except as the first character of a token or
/// right after a range dash, where it stands for itself.
pub fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut at_start = true;
    let mut after_dash = false;

    for c in text.chars() {
        if c == ',' && !at_start && !after_dash {
            tokens.push(std::mem::take(&mut token));
            at_start = true;
            continue;
        }
        token.push(c);
        if c == '^' && token.len() == 1 {
            continue;
        }
        after_dash = c == '-' && !at_start;
        at_start = false;
    }
    if !token.is_empty() {
        tokens.push(token);
    }
    tokens
}

/// [`split_tokens`] in the shape option declarations expect
pub fn tokenize(text: &str) -> Option<Vec<String>> {
    Some(split_tokens(text))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordClassifier {
    specs: Vec<KeywordSpec>,
}

impl KeywordClassifier {
    /// Validate every token first; one bad token rejects the whole list
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::from_tokens(&split_tokens(text))
    }

    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ParseError> {
        let mut specs = tokens
            .iter()
            .map(|token| KeywordSpec::parse(token.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        specs.reverse();
        Ok(Self { specs })
    }

    pub fn is_keyword(&self, c: char) -> bool {
        let code = u32::from(c);
        if code >= ALWAYS_KEYWORD {
            return true;
        }
        self.specs
            .iter()
            .find(|spec| spec.contains(code))
            .is_some_and(|spec| !spec.negate)
    }

    /// Tokens in their original input order
    pub fn tokens(&self) -> Vec<String> {
        self.specs.iter().rev().map(|spec| spec.token.clone()).collect()
    }

    pub fn to_option_string(&self) -> String {
        self.tokens().join(",")
    }

    /// One regex fragment per spec, in matching order, for hosts that search
    /// by word class. Negation is not encoded; `^` specs yield the class they
    /// exclude.
    pub fn to_regex_classes(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| match spec.coverage {
                Coverage::AllLetters => r"\p{L}".to_string(),
                Coverage::Range(low, high) if low == high => escaped(low),
                Coverage::Range(low, high) => format!("[{}-{}]", escaped(low), escaped(high)),
            })
            .collect()
    }
}

fn escaped(code: u32) -> String {
    let c = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
    if r"\^$.|?*+()[]{}-".contains(c) {
        format!("\\{c}")
    } else {
        c.to_string()
    }
}

/// Validator for the option declaration
pub fn validate(value: &OptionValue) -> Result<(), String> {
    match value {
        OptionValue::StringList(tokens) => KeywordClassifier::from_tokens(tokens)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        other => Err(format!("expected a token list, got {}", other.option_type().name())),
    }
}

/// Build the classifier from the current option value and keep it in sync.
///
/// The listener parses the new value completely before swapping it in, so
/// a failure leaves the previous classifier in place.
pub fn attach(options: &mut OptionService) -> Result<SharedClassifier, OptionError> {
    let current = options.get(OptionScope::Global, OPTION_NAME)?;
    let initial = classifier_for(&current)?;
    let shared = Arc::new(RwLock::new(initial));

    let target = Arc::clone(&shared);
    options.add_listener(
        OPTION_NAME,
        Arc::new(move |change: &OptionChange| {
            let rebuilt = classifier_for(&change.new)?;
            let mut classifier = target.write().unwrap_or_else(PoisonError::into_inner);
            *classifier = rebuilt;
            tracing::debug!(tokens = %classifier.to_option_string(), "keyword classifier rebuilt");
            Ok(())
        }),
    )?;
    Ok(shared)
}

fn classifier_for(value: &OptionValue) -> Result<KeywordClassifier, OptionError> {
    let rejected = |reason: String| OptionError::Rejected {
        name: OPTION_NAME.to_string(),
        value: value.to_string(),
        reason,
    };
    match value {
        OptionValue::StringList(tokens) => {
            KeywordClassifier::from_tokens(tokens).map_err(|e| rejected(e.to_string()))
        }
        other => Err(rejected(format!("not a token list: {other}"))),
    }
}

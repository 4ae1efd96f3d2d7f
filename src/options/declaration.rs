use std::fmt;
use std::sync::Arc;

use super::{OptionKind, OptionType, OptionValue};

/// Custom check a candidate value must pass before it is committed
pub type Validator = Arc<dyn Fn(&OptionValue) -> Result<(), String> + Send + Sync>;

/// Splits the textual form of a list option into tokens, None if malformed
pub type Tokenizer = fn(&str) -> Option<Vec<String>>;

/// Static description of one option
#[derive(Clone)]
pub struct OptionDeclaration {
    pub name: String,
    pub abbreviation: Option<String>,
    pub kind: OptionKind,
    pub default: OptionValue,
    validator: Option<Validator>,
    tokenizer: Tokenizer,
}

impl OptionDeclaration {
    fn new(name: &str, abbreviation: &str, default: OptionValue) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: (!abbreviation.is_empty()).then(|| abbreviation.to_string()),
            kind: OptionKind::Global,
            default,
            validator: None,
            tokenizer: split_commas,
        }
    }

    pub fn boolean(name: &str, abbreviation: &str, default: bool) -> Self {
        Self::new(name, abbreviation, OptionValue::Boolean(default))
    }

    pub fn number(name: &str, abbreviation: &str, default: i64) -> Self {
        Self::new(name, abbreviation, OptionValue::Number(default))
    }

    pub fn string(name: &str, abbreviation: &str, default: &str) -> Self {
        Self::new(name, abbreviation, OptionValue::String(default.to_string()))
    }

    pub fn list(name: &str, abbreviation: &str, default: &str) -> Self {
        let items = split_commas(default).unwrap_or_default();
        Self::new(name, abbreviation, OptionValue::StringList(items))
    }

    pub fn local(mut self) -> Self {
        self.kind = OptionKind::Local;
        self
    }

    pub fn validate_with(
        mut self,
        validator: impl Fn(&OptionValue) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Replace the default comma splitter, and re-split the default with it
    pub fn tokenize_with(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        if let OptionValue::StringList(items) = &self.default {
            let joined = items.join(",");
            self.default = OptionValue::StringList(tokenizer(&joined).unwrap_or_default());
        }
        self
    }

    /// Numbers must fall within `min..=max`
    pub fn bounded(self, min: i64, max: i64) -> Self {
        self.validate_with(move |value| match value {
            OptionValue::Number(n) if (min..=max).contains(n) => Ok(()),
            OptionValue::Number(n) => Err(format!("{n} is outside {min}..={max}")),
            _ => Ok(()),
        })
    }

    /// The value (or each list token) must be one of `allowed`
    pub fn one_of(self, allowed: &'static [&'static str]) -> Self {
        self.validate_with(move |value| {
            let check = |token: &str| {
                if allowed.contains(&token) {
                    Ok(())
                } else {
                    Err(format!("'{token}' is not one of {}", allowed.join(", ")))
                }
            };
            match value {
                OptionValue::String(s) => check(s.as_str()),
                OptionValue::StringList(items) => items.iter().try_for_each(|item| check(item.as_str())),
                _ => Ok(()),
            }
        })
    }

    pub fn option_type(&self) -> OptionType {
        self.default.option_type()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.abbreviation.as_deref() == Some(name)
    }

    pub fn tokenize(&self, text: &str) -> Option<Vec<String>> {
        (self.tokenizer)(text)
    }

    pub fn run_validator(&self, value: &OptionValue) -> Result<(), String> {
        match &self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for OptionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDeclaration")
            .field("name", &self.name)
            .field("abbreviation", &self.abbreviation)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Plain comma splitting; empty text is an empty list
pub fn split_commas(text: &str) -> Option<Vec<String>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    let items: Vec<String> = text.split(',').map(str::to_string).collect();
    if items.iter().any(String::is_empty) {
        return None;
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviation_matches() {
        let decl = OptionDeclaration::number("scrolljump", "sj", 1);
        assert!(decl.matches("sj"));
        assert!(decl.matches("scrolljump"));
        assert!(!decl.matches("scroll"));
    }

    #[test]
    fn list_default_is_split() {
        let decl = OptionDeclaration::list("viminfo", "vi", "'100,<50,s10,h");
        assert_eq!(
            decl.default,
            OptionValue::StringList(vec![
                "'100".to_string(),
                "<50".to_string(),
                "s10".to_string(),
                "h".to_string()
            ])
        );
    }

    #[test]
    fn bounded_rejects_out_of_range() {
        let decl = OptionDeclaration::number("history", "hi", 50).bounded(0, 10_000);
        assert!(decl.run_validator(&OptionValue::Number(20)).is_ok());
        assert!(decl.run_validator(&OptionValue::Number(-1)).is_err());
    }

    #[test]
    fn one_of_checks_every_token() {
        let decl = OptionDeclaration::list("nrformats", "nf", "hex").one_of(&["octal", "hex", "alpha"]);
        let ok = OptionValue::StringList(vec!["hex".to_string(), "alpha".to_string()]);
        let bad = OptionValue::StringList(vec!["hex".to_string(), "bin".to_string()]);
        assert!(decl.run_validator(&ok).is_ok());
        assert!(decl.run_validator(&bad).is_err());
    }

    #[test]
    fn empty_items_are_malformed() {
        assert_eq!(split_commas(""), Some(vec![]));
        assert_eq!(split_commas("a,,b"), None);
    }
}

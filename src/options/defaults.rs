use super::keyword;
use super::{OptionDeclaration, OptionValue};

/// Every option the engine knows about out of the box
pub fn builtin_options() -> Vec<OptionDeclaration> {
    vec![
        // Words
        OptionDeclaration::list(keyword::OPTION_NAME, "isk", "@,48-57,_")
            .tokenize_with(keyword::tokenize)
            .validate_with(keyword::validate),

        // Search
        OptionDeclaration::boolean("ignorecase", "ic", false),
        OptionDeclaration::boolean("smartcase", "scs", false),
        OptionDeclaration::boolean("incsearch", "is", false),
        OptionDeclaration::boolean("hlsearch", "hls", false),
        OptionDeclaration::boolean("wrapscan", "ws", true),

        // Display, per editor
        OptionDeclaration::boolean("number", "nu", false).local(),
        OptionDeclaration::boolean("relativenumber", "rnu", false).local(),
        OptionDeclaration::number("shiftwidth", "sw", 8).local().bounded(0, 999),
        OptionDeclaration::number("tabstop", "ts", 8).local().bounded(1, 999),
        OptionDeclaration::boolean("expandtab", "et", false).local(),

        // Scrolling
        OptionDeclaration::number("scrolljump", "sj", 1).bounded(-100, 999),
        OptionDeclaration::number("scrolloff", "so", 0).bounded(0, 999),

        // Timing and history
        OptionDeclaration::number("history", "hi", 50).bounded(0, 10_000),
        OptionDeclaration::boolean("timeout", "to", true),
        OptionDeclaration::number("timeoutlen", "tm", 1000).bounded(0, i64::MAX),
        OptionDeclaration::number("undolevels", "ul", 1000),
        OptionDeclaration::number("maxfuncdepth", "mfd", 100).bounded(1, i64::MAX),

        // Editing
        OptionDeclaration::string("selection", "sel", "inclusive").one_of(&["old", "inclusive", "exclusive"]),
        OptionDeclaration::list("viminfo", "vi", "'100,<50,s10,h"),
        OptionDeclaration::list("clipboard", "cb", "").one_of(&["unnamed", "unnamedplus"]),
        OptionDeclaration::list("nrformats", "nf", "hex").one_of(&["octal", "hex", "alpha", "bin"]),
        OptionDeclaration::list("matchpairs", "mps", "(:),{:},[:]").validate_with(validate_pairs),
    ]
}

/// Each token must be `x:y` with single characters on both sides
fn validate_pairs(value: &OptionValue) -> Result<(), String> {
    let OptionValue::StringList(items) = value else {
        return Ok(());
    };
    items.iter().try_for_each(|item| {
        let chars: Vec<char> = item.chars().collect();
        match chars.as_slice() {
            [_, ':', _] => Ok(()),
            _ => Err(format!("'{item}' is not a character pair")),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionKind, OptionType};

    #[test]
    fn names_and_abbreviations_are_unique() {
        let options = builtin_options();
        let mut seen = std::collections::HashSet::new();
        for decl in &options {
            assert!(seen.insert(decl.name.clone()), "duplicate {}", decl.name);
            if let Some(abbreviation) = &decl.abbreviation {
                assert!(seen.insert(abbreviation.clone()), "duplicate {abbreviation}");
            }
        }
    }

    #[test]
    fn defaults_pass_their_own_validators() {
        for decl in builtin_options() {
            assert!(decl.run_validator(&decl.default).is_ok(), "{} default rejected", decl.name);
        }
    }

    #[test]
    fn iskeyword_default_is_tokenized() {
        let options = builtin_options();
        let isk = options.iter().find(|d| d.matches("isk")).unwrap();
        assert_eq!(isk.option_type(), OptionType::StringList);
        assert_eq!(
            isk.default,
            OptionValue::StringList(vec!["@".into(), "48-57".into(), "_".into()])
        );
    }

    #[test]
    fn display_options_are_local() {
        let options = builtin_options();
        let number = options.iter().find(|d| d.name == "number").unwrap();
        assert_eq!(number.kind, OptionKind::Local);
        let ignorecase = options.iter().find(|d| d.name == "ignorecase").unwrap();
        assert_eq!(ignorecase.kind, OptionKind::Global);
    }

    #[test]
    fn matchpairs_rejects_malformed_pairs() {
        let ok = OptionValue::StringList(vec!["<:>".into()]);
        let bad = OptionValue::StringList(vec!["<>".into()]);
        assert!(validate_pairs(&ok).is_ok());
        assert!(validate_pairs(&bad).is_err());
    }
}

use lazy_static::lazy_static;
use lettre::message::Mailbox;
use regex::Regex;

lazy_static! {
    static ref LETTER_RE: Regex = Regex::new(r"\p{L}").unwrap();
    // Tab, CR and LF are functionally separators in form text, but Unicode
    // puts them in Cc rather than Z.
    static ref SEPARATOR_RE: Regex = Regex::new(r"[\p{Z}\t\r\n]").unwrap();
    static ref PUNCTUATION_RE: Regex = Regex::new(r"\p{P}").unwrap();
    // Control is the complement set: anything that is not a letter, separator,
    // mark, number, symbol or punctuation. This also catches format,
    // private-use and unassigned code points, which plain \p{Cc} would miss.
    static ref CONTROL_RE: Regex = Regex::new(r"[^\p{L}\p{Z}\p{M}\p{N}\p{S}\p{P}\t\r\n]").unwrap();
    static ref MARK_RE: Regex = Regex::new(r"\p{M}").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"\p{N}").unwrap();
    static ref SYMBOL_RE: Regex = Regex::new(r"\p{S}").unwrap();
}

/// One flag per Unicode general category the gateway cares about.
///
/// The same struct serves two roles: the classifier output (which categories
/// occur in a string) and a validation policy (`true` = at least one character
/// from this category is required, `false` = the category is forbidden).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySet {
    pub letter: bool,
    pub separator: bool,
    pub punctuation: bool,
    pub control: bool,
    pub mark: bool,
    pub number: bool,
    pub symbol: bool,
}

/// Letters, separators and punctuation only. Suitable for names and subjects.
pub const RESTRICTED_TEXT: CategorySet = CategorySet {
    letter: true,
    separator: true,
    punctuation: true,
    control: false,
    mark: false,
    number: false,
    symbol: false,
};

/// Everything except control characters. Suitable for free-form message text.
pub const UNRESTRICTED_TEXT: CategorySet = CategorySet {
    letter: true,
    separator: true,
    punctuation: true,
    control: false,
    mark: true,
    number: true,
    symbol: true,
};

impl CategorySet {
    /// Classify `s`: each flag is set iff at least one character of `s`
    /// belongs to that category. The empty string has no categories present.
    pub fn present(s: &str) -> CategorySet {
        CategorySet {
            letter: LETTER_RE.is_match(s),
            separator: SEPARATOR_RE.is_match(s),
            punctuation: PUNCTUATION_RE.is_match(s),
            control: CONTROL_RE.is_match(s),
            mark: MARK_RE.is_match(s),
            number: NUMBER_RE.is_match(s),
            symbol: SYMBOL_RE.is_match(s),
        }
    }

    fn flags(&self) -> [bool; 7] {
        [
            self.letter,
            self.separator,
            self.punctuation,
            self.control,
            self.mark,
            self.number,
            self.symbol,
        ]
    }
}

/// Accept `s` only if it contains at least one character from a required
/// category and no character from any forbidden one. An empty string never
/// validates: nothing is present to satisfy the required side.
pub fn evaluate(s: &str, policy: &CategorySet) -> bool {
    let present = CategorySet::present(s);
    let mut accept = false;
    let mut reject_ok = true;
    for (required, has) in policy.flags().into_iter().zip(present.flags()) {
        if required {
            accept = accept || has;
        } else {
            reject_ok = reject_ok && !has;
        }
    }
    accept && reject_ok
}

pub fn validate_as_restricted_text(s: &str) -> bool {
    evaluate(s, &RESTRICTED_TEXT)
}

pub fn validate_as_unrestricted_text(s: &str) -> bool {
    evaluate(s, &UNRESTRICTED_TEXT)
}

/// Email fields bypass the category evaluator and must parse as an
/// RFC 5322 mailbox.
pub fn validate_as_email(s: &str) -> bool {
    match s.parse::<Mailbox>() {
        Ok(_) => true,
        Err(e) => {
            log::debug!("could not parse email address {s:?}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_accepts_punctuation() {
        assert!(validate_as_restricted_text("%,.?!\"&(*"));
    }

    #[test]
    fn test_restricted_accepts_ascii_letters() {
        assert!(validate_as_restricted_text("ABCdef"));
    }

    #[test]
    fn test_restricted_accepts_unicode_letters() {
        assert!(validate_as_restricted_text("\u{65e5}\u{672c}\u{8a9e}"));
    }

    #[test]
    fn test_restricted_accepts_separators() {
        // tab, CR and LF count as separators, not control
        assert!(validate_as_restricted_text("\n\t\r "));
    }

    #[test]
    fn test_restricted_rejects_numbers() {
        assert!(!validate_as_restricted_text("123"));
        assert!(!validate_as_restricted_text("ABC ! 123"));
    }

    #[test]
    fn test_restricted_rejects_control() {
        assert!(!validate_as_restricted_text("\u{c}"));
        assert!(!validate_as_restricted_text("ABC \u{7} !"));
    }

    #[test]
    fn test_restricted_rejects_symbols() {
        assert!(!validate_as_restricted_text("$"));
        assert!(!validate_as_restricted_text("+"));
        assert!(!validate_as_restricted_text("ABC ! \n 123 = \u{a3}"));
    }

    #[test]
    fn test_restricted_rejects_marks() {
        // U+0301 is a combining acute accent
        assert!(!validate_as_restricted_text("e\u{301}"));
    }

    #[test]
    fn test_empty_string_never_validates() {
        assert!(!validate_as_restricted_text(""));
        assert!(!validate_as_unrestricted_text(""));
    }

    #[test]
    fn test_unrestricted_accepts_everything_but_control() {
        assert!(validate_as_unrestricted_text(
            "%,.?!\"&(* += $\u{a3} ABCdef    1234 \t"
        ));
    }

    #[test]
    fn test_unrestricted_rejects_control() {
        assert!(!validate_as_unrestricted_text(
            "\u{c} \t %,.?!\"&(* += $\u{a3} ABCdef    1234"
        ));
    }

    #[test]
    fn test_present_empty_string() {
        assert_eq!(CategorySet::present(""), CategorySet::default());
    }

    #[test]
    fn test_present_mixed() {
        let present = CategorySet::present("a 1!");
        assert!(present.letter);
        assert!(present.separator);
        assert!(present.number);
        assert!(present.punctuation);
        assert!(!present.control);
        assert!(!present.symbol);
        assert!(!present.mark);
    }

    #[test]
    fn test_valid_email_addresses() {
        assert!(validate_as_email("joe@example.com"));
        assert!(validate_as_email("Joe Blogs <joe@example.com>"));
    }

    #[test]
    fn test_invalid_email_addresses() {
        assert!(!validate_as_email("not-an-address"));
        assert!(!validate_as_email(""));
        assert!(!validate_as_email("joe@"));
    }
}

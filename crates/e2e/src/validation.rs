//! Local sanity checks applied before form submission, and XPath quoting

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("static email regex")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
        .expect("static domain regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= 253 && DOMAIN_RE.is_match(domain)
}

/// Quote `value` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// emitted as a `concat()` of pieces.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{}\"", part))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("admin@cempal.example", true ; "plain address")]
    #[test_case("first.last+qa@sub.cempal.io", true ; "plus and subdomain")]
    #[test_case("no-at-sign.example", false ; "missing at")]
    #[test_case("user@localhost", false ; "no tld")]
    #[test_case("user name@cempal.example", false ; "space")]
    #[test_case("", false ; "empty")]
    fn test_email(input: &str, expected: bool) {
        assert_eq!(is_valid_email(input), expected);
    }

    #[test_case("cempal.example", true ; "simple")]
    #[test_case("tenant-1.cempal.io", true ; "hyphen and subdomain")]
    #[test_case("-bad.example", false ; "leading hyphen")]
    #[test_case("@#$%", false ; "symbols")]
    #[test_case("nodot", false ; "no dot")]
    fn test_domain(input: &str, expected: bool) {
        assert_eq!(is_valid_domain(input), expected);
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "\"plain\"");
        assert_eq!(xpath_literal("o'brien"), "\"o'brien\"");
        assert_eq!(xpath_literal("say \"hi\""), "'say \"hi\"'");
        assert_eq!(
            xpath_literal("it's \"x\""),
            "concat(\"it's \", '\"', \"x\", '\"', \"\")"
        );
    }
}

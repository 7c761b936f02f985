//! Replacement template expansion.
//!
//! Templates use the host's dollar syntax rather than the regex crate's:
//!
//! | token        | inserts                                   |
//! |--------------|-------------------------------------------|
//! | `$1`..`$99`  | numbered group (two digits if that group exists) |
//! | `$<name>`    | named group                               |
//! | `$&`, `{{match}}` | the whole match                      |
//! | `` $` ``     | text before the match                     |
//! | `$'`         | text after the match                      |
//! | `$$`         | a literal `$`                             |
//!
//! Anything else is copied through unchanged.

use fancy_regex::Captures;

const MATCH_MACRO: &str = "{{match}}";

/// Expand `template` for one match.
///
/// `haystack` is the full text being rewritten. Every `trim` string is
/// removed from inserted group values.
pub fn expand_replacement(template: &str, caps: &Captures<'_>, haystack: &str, trim: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let whole = caps.get(0);
    let group_count = caps.len().saturating_sub(1);

    let mut rest = template;
    while let Some(pos) = rest.find(['$', '{']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix(MATCH_MACRO) {
            push_trimmed(&mut out, whole.map_or("", |m| m.as_str()), trim);
            rest = after;
            continue;
        }
        if rest.starts_with('{') {
            out.push('{');
            rest = &rest[1..];
            continue;
        }

        // rest starts with '$'
        let tail = &rest[1..];
        let mut chars = tail.chars();
        match chars.next() {
            Some('$') => {
                out.push('$');
                rest = &tail[1..];
            }
            Some('&') => {
                push_trimmed(&mut out, whole.map_or("", |m| m.as_str()), trim);
                rest = &tail[1..];
            }
            Some('`') => {
                let start = whole.map_or(0, |m| m.start());
                out.push_str(&haystack[..start]);
                rest = &tail[1..];
            }
            Some('\'') => {
                let end = whole.map_or(haystack.len(), |m| m.end());
                out.push_str(&haystack[end..]);
                rest = &tail[1..];
            }
            Some('<') => match tail[1..].find('>') {
                Some(close) => {
                    let name = &tail[1..1 + close];
                    push_trimmed(&mut out, caps.name(name).map_or("", |m| m.as_str()), trim);
                    rest = &tail[close + 2..];
                }
                None => {
                    out.push('$');
                    rest = tail;
                }
            },
            Some(d) if d.is_ascii_digit() => {
                let (group, consumed) = group_reference(tail, group_count);
                match group {
                    Some(index) => {
                        push_trimmed(&mut out, caps.get(index).map_or("", |m| m.as_str()), trim);
                        rest = &tail[consumed..];
                    }
                    None => {
                        out.push('$');
                        rest = tail;
                    }
                }
            }
            _ => {
                out.push('$');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolve `$NN` against the number of groups in the pattern.
///
/// Prefers a two-digit group when it exists, then a one-digit group. `$0`
/// and references past the last group are not references.
fn group_reference(digits: &str, group_count: usize) -> (Option<usize>, usize) {
    let bytes = digits.as_bytes();
    let first = usize::from(bytes[0] - b'0');

    if let Some(&second) = bytes.get(1)
        && second.is_ascii_digit()
    {
        let two = first * 10 + usize::from(second - b'0');
        if two >= 1 && two <= group_count {
            return (Some(two), 2);
        }
    }

    if first >= 1 && first <= group_count {
        (Some(first), 1)
    } else {
        (None, 0)
    }
}

fn push_trimmed(out: &mut String, value: &str, trim: &[String]) {
    if trim.is_empty() {
        out.push_str(value);
        return;
    }
    let mut value = value.to_string();
    for needle in trim {
        value = value.replace(needle.as_str(), "");
    }
    out.push_str(&value);
}

#[cfg(test)]
mod tests {
    use fancy_regex::Regex;

    use super::*;

    fn expand(pattern: &str, text: &str, template: &str) -> String {
        let re = Regex::new(pattern).unwrap();
        let caps = re.captures(text).unwrap().unwrap();
        expand_replacement(template, &caps, text, &[])
    }

    #[test]
    fn test_numbered_groups() {
        assert_eq!(expand(r"(\w+) (\w+)", "hello world", "$2 $1"), "world hello");
        // `$1a` is group 1 followed by a literal `a`
        assert_eq!(expand(r"(\w+)", "x", "$1a"), "xa");
    }

    #[test]
    fn test_two_digit_group_falls_back_to_one_digit() {
        // Only one group: `$12` is group 1 then `2`
        assert_eq!(expand(r"(a)", "a", "$12"), "a2");
    }

    #[test]
    fn test_missing_group_is_literal() {
        assert_eq!(expand(r"a", "a", "$1"), "$1");
        assert_eq!(expand(r"(a)", "a", "$0"), "$0");
    }

    #[test]
    fn test_whole_match_forms() {
        assert_eq!(expand(r"b+", "abbbc", "[$&]"), "[bbb]");
        assert_eq!(expand(r"b+", "abbbc", "<{{match}}>"), "<bbb>");
    }

    #[test]
    fn test_context_and_dollar() {
        assert_eq!(expand(r"b", "abc", "$`|$'"), "a|c");
        assert_eq!(expand(r"b", "abc", "$$5"), "$5");
        assert_eq!(expand(r"b", "abc", "cost: $"), "cost: $");
    }

    #[test]
    fn test_named_group() {
        assert_eq!(expand(r"(?P<word>\w+)!", "hey!", "<$<word>>"), "<hey>");
        assert_eq!(expand(r"(?P<word>\w+)!", "hey!", "$<nope>."), ".");
        assert_eq!(expand(r"x", "x", "$<open"), "$<open");
    }

    #[test]
    fn test_braces_pass_through() {
        assert_eq!(expand(r"x", "x", "{a} {{user}}"), "{a} {{user}}");
    }

    #[test]
    fn test_trim_strings() {
        let re = Regex::new(r"\*(.+?)\*").unwrap();
        let text = "*hello there*";
        let caps = re.captures(text).unwrap().unwrap();
        let trim = vec!["there".to_string()];
        assert_eq!(expand_replacement("<i>$1</i>", &caps, text, &trim), "<i>hello </i>");
    }
}

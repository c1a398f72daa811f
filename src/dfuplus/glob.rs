use regex::Regex;

use crate::error::{Error, Result};

/* Translates a dfuplus file mask (`*`, `?`, `[...]`, `[!...]`) into a regex source */
fn translate(mask: &str) -> String {
    let chars: Vec<char> = mask.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let close = chars[i + 1..].iter().position(|c| *c == ']').map(|p| p + i + 1);
                match close {
                    Some(end) if end > i + 1 => {
                        out.push('[');
                        let mut j = i + 1;
                        if chars[j] == '!' {
                            out.push('^');
                            j += 1;
                        }
                        for c in &chars[j..end] {
                            match c {
                                '\\' | '[' | '^' => {
                                    out.push('\\');
                                    out.push(*c);
                                },
                                _ => out.push(*c),
                            }
                        }
                        out.push(']');
                        i = end;
                    },
                    _ => out.push_str("\\["),
                }
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

pub fn compile(mask: &str) -> Result<Regex> {
    Regex::new(&translate(mask)).map_err(|source| Error::InvalidMask {
        mask: String::from(mask),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_suffix() {
        let glob = compile("zzlc*").unwrap();
        assert!(glob.is_match("zzlc::csv::farm_data_rel"));
        assert!(glob.is_match("zzlc"));
        assert!(!glob.is_match("myzzlc::csv::farm_data_rel"));
    }

    #[test]
    fn leading_and_trailing_star() {
        let glob = compile("*zzlc*").unwrap();
        assert!(glob.is_match("myzzlc::csv::farm_data_rel"));
        assert!(glob.is_match("zzlc::csv::farm_data_rel"));
        assert!(!glob.is_match("zzl::csv"));
    }

    #[test]
    fn question_mark_is_one_character() {
        let glob = compile("zzlc::???::farm_data_rel").unwrap();
        assert!(glob.is_match("zzlc::csv::farm_data_rel"));
        assert!(!glob.is_match("zzlc::json::farm_data_rel"));
    }

    #[test]
    fn regex_characters_are_literal() {
        let glob = compile("~a.b+(c)").unwrap();
        assert!(glob.is_match("~a.b+(c)"));
        assert!(!glob.is_match("~aXb+(c)"));
    }

    #[test]
    fn character_classes() {
        let glob = compile("file[0-9]").unwrap();
        assert!(glob.is_match("file7"));
        assert!(!glob.is_match("filex"));

        let negated = compile("file[!0-9]").unwrap();
        assert!(negated.is_match("filex"));
        assert!(!negated.is_match("file7"));
    }

    #[test]
    fn unterminated_class_is_literal() {
        let glob = compile("odd[name").unwrap();
        assert!(glob.is_match("odd[name"));
    }
}

// ********* Cell values ***********

use std::fmt::Display;

/// The content of one cell of a submission table.
///
/// Form submissions are entered by humans, so every accessor is total: numbers
/// fall back to zero and text is normalized before use.
#[derive(PartialEq, Debug, Clone, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Infers a typed value from the raw text of a cell, as found in CSV exports.
    pub fn parse(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() => CellValue::Number(x),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => normalize_text(s).is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Always finite, zero when the cell does not hold a number.
    pub fn as_number(&self) -> f64 {
        self.as_finite_number().unwrap_or(0.0)
    }

    /// The number held by this cell, if any.
    pub fn as_finite_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(x) if x.is_finite() => Some(*x),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => normalize_text(s),
            CellValue::Number(x) => x.to_string(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    pub fn as_flag(&self) -> bool {
        match self {
            CellValue::Bool(b) => *b,
            CellValue::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// List view of a multi-select answer.
    ///
    /// Depending on the version of the form, a list arrives comma separated, one item per
    /// line, or space separated. In the last case the names listed in `multi_word_names`
    /// are kept whole.
    pub fn as_list(&self, multi_word_names: &[String]) -> Vec<String> {
        let raw = match self {
            CellValue::Empty => return vec![],
            CellValue::Text(s) => s.clone(),
            other => other.as_text(),
        };
        let cleaned: String = raw
            .chars()
            .map(|c| if c == '\u{00A0}' { ' ' } else { c })
            .filter(|c| *c == '\n' || !c.is_control() || c.is_whitespace())
            .collect();
        if cleaned.contains(',') {
            split_items(&cleaned, ',')
        } else if cleaned.contains('\n') {
            split_items(&cleaned, '\n')
        } else {
            split_words(&normalize_text(&cleaned), multi_word_names)
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(x) => write!(f, "{}", x),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Trims, replaces hidden characters with spaces and collapses whitespace runs.
pub fn normalize_text(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c == '\u{00A0}' || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

fn split_items(s: &str, delim: char) -> Vec<String> {
    s.split(delim)
        .map(normalize_text)
        .filter(|item| !item.is_empty())
        .collect()
}

fn split_words(s: &str, multi_word_names: &[String]) -> Vec<String> {
    let words: Vec<&str> = s.split(' ').filter(|w| !w.is_empty()).collect();
    // Longest names first so that overlapping names resolve to the longest match.
    let mut names: Vec<Vec<&str>> = multi_word_names
        .iter()
        .map(|n| n.split_whitespace().collect::<Vec<&str>>())
        .filter(|n| n.len() > 1)
        .collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));

    let mut res: Vec<String> = Vec::new();
    let mut idx = 0;
    while idx < words.len() {
        let found = names
            .iter()
            .find(|n| words.len() >= idx + n.len() && words[idx..idx + n.len()] == n[..]);
        match found {
            Some(n) => {
                res.push(n.join(" "));
                idx += n.len();
            }
            None => {
                res.push(words[idx].to_string());
                idx += 1;
            }
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["St. Clair".to_string(), "African American".to_string()]
    }

    #[test]
    fn numbers_default_to_zero() {
        assert_eq!(CellValue::Empty.as_number(), 0.0);
        assert_eq!(CellValue::Text("".to_string()).as_number(), 0.0);
        assert_eq!(CellValue::Text("n/a".to_string()).as_number(), 0.0);
        assert_eq!(CellValue::Text(" 12.5 ".to_string()).as_number(), 12.5);
        assert_eq!(CellValue::Number(-40.0).as_number(), -40.0);
        assert_eq!(CellValue::Number(f64::NAN).as_number(), 0.0);
        assert_eq!(CellValue::Bool(true).as_number(), 0.0);
    }

    #[test]
    fn parse_infers_types() {
        assert_eq!(CellValue::parse(""), CellValue::Empty);
        assert_eq!(CellValue::parse("  "), CellValue::Empty);
        assert_eq!(CellValue::parse("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::parse("150"), CellValue::Number(150.0));
        assert_eq!(
            CellValue::parse("Acme Org"),
            CellValue::Text("Acme Org".to_string())
        );
        assert_eq!(CellValue::parse("NaN"), CellValue::Text("NaN".to_string()));
    }

    #[test]
    fn text_is_normalized() {
        let s = "  Acme\u{00A0}\u{00A0}Org \t\n";
        assert_eq!(normalize_text(s), "Acme Org");
        assert_eq!(CellValue::Text(s.to_string()).as_text(), "Acme Org");
    }

    #[test]
    fn lists_split_on_commas_first() {
        let c = CellValue::Text("Jefferson, St. Clair ,, Mobile".to_string());
        assert_eq!(c.as_list(&names()), vec!["Jefferson", "St. Clair", "Mobile"]);
    }

    #[test]
    fn lists_split_on_lines() {
        let c = CellValue::Text("VAN\nPDI \n\nSpreadsheet  tool".to_string());
        assert_eq!(c.as_list(&names()), vec!["VAN", "PDI", "Spreadsheet tool"]);
    }

    #[test]
    fn lists_keep_multi_word_names() {
        let c = CellValue::Text("Jefferson St. Clair  Mobile".to_string());
        assert_eq!(c.as_list(&names()), vec!["Jefferson", "St. Clair", "Mobile"]);
        let c = CellValue::Text("African American Latino".to_string());
        assert_eq!(c.as_list(&names()), vec!["African American", "Latino"]);
    }

    #[test]
    fn empty_lists() {
        assert!(CellValue::Empty.as_list(&names()).is_empty());
        assert!(CellValue::Text(" \u{00A0} ".to_string())
            .as_list(&names())
            .is_empty());
    }

    #[test]
    fn flags() {
        assert!(CellValue::Bool(true).as_flag());
        assert!(CellValue::Text("True".to_string()).as_flag());
        assert!(!CellValue::Empty.as_flag());
        assert!(!CellValue::Number(1.0).as_flag());
    }
}

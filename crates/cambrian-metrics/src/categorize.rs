//! Keyword-based tool categorization
//!
//! Tools are bucketed into coarse functional categories by keyword matches
//! over their name and description. Deliberately crude; the metrics layer
//! only needs a stable partition, not semantic truth.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Math,
    Text,
    Data,
    File,
    Web,
    Validation,
    Logic,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Math => "math",
            Category::Text => "text",
            Category::Data => "data",
            Category::File => "file",
            Category::Web => "web",
            Category::Validation => "validation",
            Category::Logic => "logic",
            Category::Other => "other",
        }
    }
}

const KEYWORDS: [(Category, &[&str]); 7] = [
    (
        Category::Math,
        &[
            "math", "calc", "add", "subtract", "multiply", "divide", "square", "sum", "average",
            "number", "count",
        ],
    ),
    (
        Category::Text,
        &[
            "text", "string", "word", "char", "format", "concat", "upper", "lower", "reverse",
        ],
    ),
    (
        Category::Data,
        &["data", "list", "sort", "filter", "array", "json", "merge", "group"],
    ),
    (
        Category::File,
        &["file", "read", "write", "path", "save", "load", "directory"],
    ),
    (
        Category::Web,
        &["http", "url", "web", "fetch", "request", "api"],
    ),
    (
        Category::Validation,
        &["valid", "check", "verify", "assert"],
    ),
    (
        Category::Logic,
        &["logic", "condition", "bool", "compare", "decide", "choose"],
    ),
];

/// Categorize a tool from its name and description. First matching category
/// in a fixed order wins; nothing matching is [`Category::Other`].
pub fn categorize(name: &str, description: &str) -> Category {
    let haystack = format!("{} {}", name.to_lowercase(), description.to_lowercase());
    for (category, words) in KEYWORDS {
        if words.iter().any(|w| haystack.contains(w)) {
            return category;
        }
    }
    Category::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_keywords_drive_the_bucket() {
        assert_eq!(categorize("square", "raises to the power of two"), Category::Math);
        assert_eq!(categorize("sorter", "orders a list"), Category::Data);
        assert_eq!(categorize("fetcher", "pulls a url"), Category::Web);
    }

    #[test]
    fn description_is_consulted_too() {
        assert_eq!(categorize("helper", "concat two strings"), Category::Text);
    }

    #[test]
    fn earlier_categories_win_ties() {
        // "count words" matches both math and text; math is checked first.
        assert_eq!(categorize("counter", "count words"), Category::Math);
    }

    #[test]
    fn unmatched_falls_to_other() {
        assert_eq!(categorize("zzz", "does something odd"), Category::Other);
    }
}

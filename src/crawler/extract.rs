//! Attribute extraction rules
//!
//! Extraction is a table of independent rules, one per attribute: a selector
//! plus a normalizer. Each rule runs on its own and yields None on any
//! failure, so a missing attribute never aborts the rest of the extraction.
//! The rule set itself is domain data; the engine only cares that exactly one
//! field is designated required.

use crate::fetch::PageHandle;
use std::collections::BTreeMap;

/// Cleans a raw text read into a stored attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Trim surrounding whitespace
    Trim,

    /// Drop parentheses and commas, then trim
    StripMarks,

    /// Drop parentheses, commas and all whitespace
    StripMarksAndSpace,

    /// Keep digits and plus signs only
    PhoneDigits,
}

impl Normalizer {
    /// Applies the normalization; empty results become None
    pub fn apply(&self, raw: &str) -> Option<String> {
        let value = match self {
            Self::Trim => raw.trim().to_string(),
            Self::StripMarks => raw
                .chars()
                .filter(|c| !matches!(c, '(' | ')' | ','))
                .collect::<String>()
                .trim()
                .to_string(),
            Self::StripMarksAndSpace => raw
                .chars()
                .filter(|c| !matches!(c, '(' | ')' | ',') && !c.is_whitespace())
                .collect(),
            Self::PhoneDigits => raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect(),
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// One attribute extraction rule
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub selector: &'static str,
    pub normalizer: Normalizer,
}

/// The attribute whose absence classifies a whole detail task as failed
pub const REQUIRED_FIELD: &str = "name";

/// Default rule table for place detail pages
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: "name",
        selector: "h1.DUwDvf",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "local_name",
        selector: "h2.bwoZTb span",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "category",
        selector: "button[jsaction=\"pane.wfvdle18.category\"]",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "rating",
        selector: "div.F7nice span[aria-hidden=\"true\"]",
        normalizer: Normalizer::StripMarks,
    },
    FieldRule {
        field: "review_count",
        selector: "div.F7nice span[aria-label*=\"review\"]",
        normalizer: Normalizer::StripMarksAndSpace,
    },
    FieldRule {
        field: "price_range",
        selector: "div[aria-label*=\"per person\"]",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "phone",
        selector: "button[data-item-id^=\"phone\"] .Io6YTe",
        normalizer: Normalizer::PhoneDigits,
    },
    FieldRule {
        field: "website",
        selector: "a[data-item-id=\"authority\"] .Io6YTe",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "address",
        selector: "button[data-item-id=\"address\"] .Io6YTe",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "plus_code",
        selector: "button[data-item-id=\"oloc\"] .Io6YTe",
        normalizer: Normalizer::Trim,
    },
    FieldRule {
        field: "price_per_person",
        selector: "div.MNVeJb .BfVpR",
        normalizer: Normalizer::Trim,
    },
];

/// Runs every rule against the page and merges the successful reads.
///
/// A rule that errors or matches nothing contributes no entry; the others
/// still run.
pub async fn extract_fields(
    page: &dyn PageHandle,
    rules: &[FieldRule],
) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for rule in rules {
        match page.query(rule.selector).await {
            Ok(Some(element)) => {
                if let Some(value) = rule.normalizer.apply(element.text()) {
                    values.insert(rule.field.to_string(), value);
                }
            }
            Ok(None) => {
                tracing::debug!(field = rule.field, "Attribute not present");
            }
            Err(e) => {
                tracing::debug!(field = rule.field, error = %e, "Attribute read failed");
            }
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Element, FetchError, FetchResult};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct RigidPage {
        elements: HashMap<&'static str, Element>,
        failing_selectors: Vec<&'static str>,
    }

    #[async_trait]
    impl PageHandle for RigidPage {
        async fn query(&self, selector: &str) -> FetchResult<Option<Element>> {
            if self.failing_selectors.iter().any(|s| *s == selector) {
                return Err(FetchError::Selector(selector.to_string()));
            }
            Ok(self.elements.get(selector).cloned())
        }

        async fn query_all(&self, _selector: &str) -> FetchResult<Vec<Element>> {
            Ok(vec![])
        }

        async fn evaluate_growth(&self, container_selector: &str) -> FetchResult<u64> {
            Err(FetchError::MissingContainer(container_selector.to_string()))
        }

        async fn close(self: Box<Self>) {}
    }

    fn text_element(text: &str) -> Element {
        Element::new(text, HashMap::new())
    }

    #[test]
    fn test_trim_normalizer() {
        assert_eq!(
            Normalizer::Trim.apply("  Cafe Azure \n"),
            Some("Cafe Azure".to_string())
        );
        assert_eq!(Normalizer::Trim.apply("   "), None);
    }

    #[test]
    fn test_strip_marks_normalizer() {
        assert_eq!(
            Normalizer::StripMarks.apply("(4.5)"),
            Some("4.5".to_string())
        );
        assert_eq!(
            Normalizer::StripMarksAndSpace.apply("(1,234 reviews)"),
            Some("1234reviews".to_string())
        );
    }

    #[test]
    fn test_phone_normalizer() {
        assert_eq!(
            Normalizer::PhoneDigits.apply("+91 80-1234 5678"),
            Some("+918012345678".to_string())
        );
        assert_eq!(Normalizer::PhoneDigits.apply("call us"), None);
    }

    #[tokio::test]
    async fn test_rules_are_independent() {
        let rules: &[FieldRule] = &[
            FieldRule {
                field: "name",
                selector: "h1",
                normalizer: Normalizer::Trim,
            },
            FieldRule {
                field: "rating",
                selector: "span.rating",
                normalizer: Normalizer::StripMarks,
            },
            FieldRule {
                field: "phone",
                selector: "span.phone",
                normalizer: Normalizer::PhoneDigits,
            },
        ];

        let mut elements = HashMap::new();
        elements.insert("h1", text_element(" Cafe Azure "));
        elements.insert("span.phone", text_element("+91 1234"));
        let page = RigidPage {
            elements,
            // The rating read fails outright; the others must still land
            failing_selectors: vec!["span.rating"],
        };

        let values = extract_fields(&page, rules).await;
        assert_eq!(values.get("name").map(String::as_str), Some("Cafe Azure"));
        assert_eq!(values.get("phone").map(String::as_str), Some("+911234"));
        assert!(!values.contains_key("rating"));
    }
}

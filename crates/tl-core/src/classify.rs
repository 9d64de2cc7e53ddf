//! Keyword-based life-area classification for extracted drafts.

use serde::{Deserialize, Serialize};

use crate::event::LifeArea;
use crate::types::AreaId;

/// One classification rule: any keyword match routes to the named area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRule {
    /// Lowercase keywords matched against the draft title.
    pub keywords: Vec<String>,
    /// Target area name, matched case-insensitively against configured areas.
    pub area_name: String,
}

impl ClassifierRule {
    pub fn new(keywords: &[&str], area_name: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| (*k).to_lowercase()).collect(),
            area_name: area_name.to_string(),
        }
    }
}

/// An ordered rule table for assigning a life area to a draft title.
///
/// Resolution order: direct area-name containment in the title, then the
/// rules in table order, then the first configured area as the fallback.
/// Rules that name an unconfigured area are skipped, so a shared default
/// table works for users with different area sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaClassifier {
    rules: Vec<ClassifierRule>,
}

impl Default for AreaClassifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassifierRule::new(&["meeting", "call", "conference"], "Work"),
                ClassifierRule::new(&["gym", "doctor", "workout"], "Health"),
                ClassifierRule::new(&["lunch", "dinner", "family"], "Personal"),
            ],
        }
    }
}

impl AreaClassifier {
    #[must_use]
    pub const fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Pick the life area for a draft title, if any areas are configured.
    #[must_use]
    pub fn classify<'a>(&self, title: &str, areas: &'a [LifeArea]) -> Option<AreaId> {
        if areas.is_empty() {
            return None;
        }
        let title = title.to_lowercase();

        // An area whose own name appears in the title always wins.
        for area in areas {
            if title.contains(&area.name.to_lowercase()) {
                return Some(area.id.clone());
            }
        }

        for rule in &self.rules {
            if rule.keywords.iter().any(|k| title.contains(k.as_str())) {
                if let Some(area) = areas
                    .iter()
                    .find(|a| a.name.eq_ignore_ascii_case(&rule.area_name))
                {
                    return Some(area.id.clone());
                }
            }
        }

        areas.first().map(|a| a.id.clone())
    }
}

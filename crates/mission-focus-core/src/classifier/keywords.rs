//! Local keyword tier of the classifier.
//!
//! Matching is plain substring search over the lowercased title and
//! description, so "react" also matches "reactive". Recall matters more than
//! precision here; the remote tier only runs on a miss.

use super::VideoMetadata;
use crate::accounting::Category;

/// Built-in topic buckets that always count as productive.
pub const KEYWORD_BUCKETS: &[(&str, &[&str])] = &[
    (
        "programming",
        &[
            "code", "coding", "developer", "software", "javascript", "python", "java", "react",
            "vue", "angular", "node", "api", "algorithm", "typescript", "html", "css",
            "database", "sql", "git", "programming", "nextjs", "next.js",
        ],
    ),
    (
        "web_development",
        &[
            "html", "css", "javascript", "react", "vue", "angular", "website", "web app",
            "frontend", "backend", "fullstack", "responsive", "nextjs", "next.js",
        ],
    ),
    (
        "education",
        &[
            "learn", "tutorial", "lesson", "course", "teach", "study", "guide", "how to",
            "explained", "lecture", "class",
        ],
    ),
];

/// Split the options page's comma-separated focus areas into terms.
pub fn parse_focus_areas(raw: &str) -> Vec<String> {
    normalize_focus_areas(raw.split(','))
}

/// Trim and lowercase focus-area terms, dropping empty ones.
pub fn normalize_focus_areas<I, S>(areas: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    areas
        .into_iter()
        .map(|a| a.as_ref().trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}

/// `Some(Productive)` when a focus area or built-in keyword appears in the
/// metadata, `None` otherwise.
pub fn keyword_category(metadata: &VideoMetadata, focus_areas: &[String]) -> Option<Category> {
    let text = metadata.normalized_text();

    let focus_hit = focus_areas
        .iter()
        .map(|f| f.trim().to_lowercase())
        .any(|f| !f.is_empty() && text.contains(&f));
    if focus_hit {
        return Some(Category::Productive);
    }

    let keyword_hit = KEYWORD_BUCKETS
        .iter()
        .flat_map(|(_, words)| words.iter())
        .any(|kw| text.contains(kw));
    keyword_hit.then_some(Category::Productive)
}

/// Keyword tier with a definite answer: a miss reads as unproductive.
pub fn keyword_verdict(metadata: &VideoMetadata, focus_areas: &[String]) -> Category {
    keyword_category(metadata, focus_areas).unwrap_or(Category::Unproductive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str, description: &str) -> VideoMetadata {
        VideoMetadata::new(title, description)
    }

    #[test]
    fn focus_area_match_is_case_insensitive_substring() {
        let areas = parse_focus_areas("Chess, Woodworking ,");
        assert_eq!(areas, vec!["chess", "woodworking"]);
        let meta = video("Grandmaster CHESS blunders", "");
        assert_eq!(keyword_category(&meta, &areas), Some(Category::Productive));
    }

    #[test]
    fn builtin_keywords_match_description() {
        let meta = video("My week", "in this lecture we cover graphs");
        assert_eq!(keyword_category(&meta, &[]), Some(Category::Productive));
    }

    #[test]
    fn miss_returns_none_and_verdict_unproductive() {
        let meta = video("Funny cats compilation", "cats being cats");
        assert_eq!(keyword_category(&meta, &[]), None);
        assert_eq!(keyword_verdict(&meta, &[]), Category::Unproductive);
    }

    #[test]
    fn blank_focus_areas_never_match_everything() {
        let meta = video("Funny cats compilation", "");
        let areas = vec!["   ".to_string()];
        assert_eq!(keyword_category(&meta, &areas), None);
    }
}

//! Search query formation from a slide's extracted content.

use crate::domain::{SearchQuery, Slide};

use super::text::truncate_chars;

/// Queries for one slide, most specific context last
pub fn plan_queries(slide: &Slide) -> Vec<SearchQuery> {
    let title = slide.title.trim();
    let body = slide.body_text.trim();
    let mut queries = Vec::new();

    if !title.is_empty() {
        queries.push(SearchQuery::new(title, "title"));

        if !body.is_empty() {
            queries.push(SearchQuery::new(
                format!("{} {}", title, truncate_chars(body, 80)),
                "title+text",
            ));
        }

        if let Some(header) = slide.table_header() {
            let head = header.iter().take(5).cloned().collect::<Vec<_>>().join(" ");
            queries.push(SearchQuery::new(format!("{} {}", title, head), "title+table"));
        }

        if !slide.image_paths.is_empty() {
            let names = slide
                .image_paths
                .iter()
                .take(2)
                .filter_map(|p| p.file_stem())
                .map(|s| s.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            queries.push(SearchQuery::new(format!("{} {}", title, names), "title+image"));
        }
    }

    if queries.is_empty() && !body.is_empty() {
        queries.push(SearchQuery::new(truncate_chars(body, 100), "text_only"));
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_full_slide_queries() {
        let slide = Slide {
            title: "Ownership".to_string(),
            body_text: "Each value has a single owner.".to_string(),
            table_rows: vec![vec![vec!["Rule".to_string(), "Effect".to_string()]]],
            image_paths: vec![PathBuf::from("/media/slide1_img_1.png")],
            ..Default::default()
        };
        let queries = plan_queries(&slide);
        let contexts: Vec<&str> = queries.iter().map(|q| q.context.as_str()).collect();

        assert_eq!(contexts, vec!["title", "title+text", "title+table", "title+image"]);
        assert_eq!(queries[2].text, "Ownership Rule Effect");
        assert_eq!(queries[3].text, "Ownership slide1_img_1");
    }

    #[test]
    fn test_text_only_when_untitled() {
        let slide = Slide {
            body_text: "b".repeat(150),
            ..Default::default()
        };
        let queries = plan_queries(&slide);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].context, "text_only");
        assert_eq!(queries[0].text.len(), 100);
    }

    #[test]
    fn test_empty_slide_has_no_queries() {
        assert!(plan_queries(&Slide::default()).is_empty());
    }
}

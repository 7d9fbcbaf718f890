use std::ops::Range;

use regex::Regex;

use super::category_ops::list_categories;
use super::task_ops::list_tasks;
use crate::model::document::Document;

/// Which field of a record matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    CategoryName,
    TaskTitle,
}

/// A search hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Id of the matching record
    pub id: String,
    /// Owning category (the category itself for category hits)
    pub category_id: String,
    pub field: MatchField,
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search category names and task titles.
///
/// Categories come first in listing order, then tasks in listing order.
/// If `category_filter` is `Some`, only that category and its tasks are
/// searched.
pub fn search_document(doc: &Document, re: &Regex, category_filter: Option<&str>) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    for category in list_categories(doc) {
        if category_filter.is_some_and(|f| f != category.id) {
            continue;
        }
        let spans = find_matches(re, &category.name);
        if !spans.is_empty() {
            hits.push(SearchHit {
                id: category.id.clone(),
                category_id: category.id.clone(),
                field: MatchField::CategoryName,
                text: category.name.clone(),
                spans,
            });
        }
    }

    for task in list_tasks(doc) {
        if category_filter.is_some_and(|f| f != task.category_id) {
            continue;
        }
        let spans = find_matches(re, &task.title);
        if !spans.is_empty() {
            hits.push(SearchHit {
                id: task.id.clone(),
                category_id: task.category_id.clone(),
                field: MatchField::TaskTitle,
                text: task.title.clone(),
                spans,
            });
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::CategoryGroup;
    use crate::model::task::Priority;
    use crate::ops::category_ops::create_category;
    use crate::ops::task_ops::create_task;

    fn sample() -> (Document, String, String) {
        let mut doc = Document::empty();
        let work = create_category(&mut doc, "Work reports", CategoryGroup::Work, None).unwrap();
        let home = create_category(&mut doc, "Home", CategoryGroup::Personal, None).unwrap();
        create_task(&mut doc, "Quarterly report", 2, &work.id, Priority::High).unwrap();
        create_task(&mut doc, "Fix the report printer", 1, &home.id, Priority::Low).unwrap();
        create_task(&mut doc, "Water plants", 1, &home.id, Priority::Low).unwrap();
        (doc, work.id, home.id)
    }

    #[test]
    fn test_search_names_and_titles() {
        let (doc, work, _) = sample();
        let re = Regex::new("(?i)report").unwrap();
        let hits = search_document(&doc, &re, None);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].field, MatchField::CategoryName);
        assert_eq!(hits[0].id, work);
        assert_eq!(hits[0].spans, vec![5..11]);
        assert!(hits[1..].iter().all(|h| h.field == MatchField::TaskTitle));
    }

    #[test]
    fn test_search_category_filter() {
        let (doc, _, home) = sample();
        let re = Regex::new("report").unwrap();
        let hits = search_document(&doc, &re, Some(&home));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "Fix the report printer");
        assert_eq!(hits[0].category_id, home);
    }

    #[test]
    fn test_search_no_match() {
        let (doc, _, _) = sample();
        let re = Regex::new("^zzz$").unwrap();
        assert!(search_document(&doc, &re, None).is_empty());
    }
}

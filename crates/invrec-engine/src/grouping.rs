//! Article grouping: one index over a session's lines, built once per run.

use std::collections::BTreeMap;

use invrec_records::Session;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArticleKey {
    pub article: String,
    pub site: String,
}

/// Line indexes per (article, site), each list in file order. Groups span
/// the session's inventory lists.
pub fn group_by_article(session: &Session) -> BTreeMap<ArticleKey, Vec<usize>> {
    let mut groups: BTreeMap<ArticleKey, Vec<usize>> = BTreeMap::new();
    for (i, line) in session.lines.iter().enumerate() {
        groups
            .entry(ArticleKey {
                article: line.article().to_string(),
                site: line.site().to_string(),
            })
            .or_default()
            .push(i);
    }
    groups
}

//! SQL for the listing query. Filters, order and range are all applied by
//! Postgres so the window count and the page come from one statement.

use domains::{IdeaQuery, SortOrder};
use sqlx::{Postgres, QueryBuilder};

pub(crate) const IDEA_COLUMNS: &str = "i.id, i.title, i.short_description, i.full_description, \
     i.difficulty, i.upvotes, i.status, i.user_id, i.created_at, i.updated_at";

/// Escapes `%`, `_` and `\` so the search term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Titles compare bytewise (`COLLATE "C"`) to match the in-memory order.
pub(crate) fn order_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Newest => "i.created_at DESC, i.id ASC",
        SortOrder::Oldest => "i.created_at ASC, i.id ASC",
        SortOrder::MostUpvoted => "i.upvotes DESC, i.id ASC",
        SortOrder::TitleAsc => "i.title COLLATE \"C\" ASC, i.id ASC",
        SortOrder::TitleDesc => "i.title COLLATE \"C\" DESC, i.id ASC",
    }
}

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, query: &IdeaQuery) {
    qb.push(" WHERE i.status = 'published'");

    if let Some(difficulty) = query.difficulty {
        qb.push(" AND i.difficulty = ").push_bind(difficulty.as_str());
    }

    if let Some(term) = &query.search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (i.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.short_description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.full_description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if !query.tag_ids.is_empty() {
        let ids: Vec<i64> = query.tag_ids.iter().copied().collect();
        qb.push(" AND EXISTS (SELECT 1 FROM idea_tags it WHERE it.idea_id = i.id AND it.tag_id = ANY(")
            .push_bind(ids)
            .push("))");
    }

    if !query.tech_stack_names.is_empty() {
        let names: Vec<String> = query.tech_stack_names.iter().cloned().collect();
        qb.push(
            " AND EXISTS (SELECT 1 FROM idea_tech_stacks its \
             JOIN tech_stacks ts ON ts.id = its.tech_stack_id \
             WHERE its.idea_id = i.id AND ts.name = ANY(",
        )
        .push_bind(names)
        .push("))");
    }
}

/// One page of rows, each carrying the full filtered count.
pub(crate) fn listing_query(query: &IdeaQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {IDEA_COLUMNS}, COUNT(*) OVER () AS total_count FROM ideas i"
    ));
    push_filters(&mut qb, query);
    qb.push(" ORDER BY ").push(order_clause(query.sort));
    qb.push(" LIMIT ")
        .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
    qb
}

/// Used only when the requested page is past the end.
pub(crate) fn count_query(query: &IdeaQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ideas i");
    push_filters(&mut qb, query);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Difficulty, IdeaFilter};
    use std::collections::BTreeSet;

    fn query(filter: IdeaFilter) -> IdeaQuery {
        IdeaQuery::for_page(&filter, 6).unwrap()
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("weather"), "weather");
    }

    #[test]
    fn test_unfiltered_listing_only_restricts_status() {
        let qb = listing_query(&query(IdeaFilter::default()));
        let sql = qb.sql();
        assert!(sql.contains("WHERE i.status = 'published' ORDER BY i.created_at DESC, i.id ASC"));
        assert!(sql.ends_with("LIMIT $1 OFFSET $2"));
        assert!(!sql.contains("EXISTS"));
    }

    #[test]
    fn test_relation_filters_become_exists_subqueries() {
        let qb = listing_query(&query(IdeaFilter {
            search: "Chat".into(),
            difficulty: Some(Difficulty::Advanced),
            tag_ids: BTreeSet::from([1, 2]),
            tech_stack_names: BTreeSet::from(["Rust".to_string()]),
            ..Default::default()
        }));
        let sql = qb.sql();
        assert!(sql.contains("i.difficulty = $1"));
        assert!(sql.contains("i.title ILIKE $2 OR i.short_description ILIKE $3 OR i.full_description ILIKE $4"));
        assert!(sql.contains("it.tag_id = ANY($5)"));
        assert!(sql.contains("ts.name = ANY($6)"));
        assert!(sql.ends_with("LIMIT $7 OFFSET $8"));
    }

    #[test]
    fn test_count_query_has_no_range() {
        let qb = count_query(&query(IdeaFilter::default()));
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM ideas i WHERE i.status = 'published'");
    }

    #[test]
    fn test_every_sort_breaks_ties_on_id() {
        for sort in [
            SortOrder::Newest,
            SortOrder::Oldest,
            SortOrder::MostUpvoted,
            SortOrder::TitleAsc,
            SortOrder::TitleDesc,
        ] {
            assert!(order_clause(sort).ends_with("i.id ASC"));
        }
    }
}

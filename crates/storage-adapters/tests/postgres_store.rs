//! `PgStore` against a real Postgres started in Docker. Each test gets its
//! own container so the schema starts empty.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    Difficulty, DomainError, Idea, IdeaFilter, IdeaQuery, IdeaRelations, IdeaRepository,
    IdeaStatus, Report, ReportReason, ReportRepository, ReportStatus, SortOrder, TagRepository,
    TechStackRepository, UserId, VoteAction, VoteOutcome, VoteRepository,
};
use storage_adapters::PgStore;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

struct TestDb {
    store: PgStore,
    // dropped last; stops the container
    _node: ContainerAsync<Postgres>,
}

async fn test_db() -> TestDb {
    let node = Postgres::default().start().await.unwrap();
    let host = node.get_host().await.unwrap();
    let port = node.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let store = PgStore::connect(&url, 16).await.unwrap();
    store.migrate().await.unwrap();
    TestDb { store, _node: node }
}

fn idea(title: &str, difficulty: Difficulty, age_mins: i64) -> Idea {
    let now = Utc::now();
    Idea {
        id: Uuid::now_v7(),
        title: title.to_string(),
        short_description: format!("{title} summary"),
        full_description: format!("{title} body"),
        difficulty,
        upvotes: 0,
        status: IdeaStatus::Published,
        user_id: Uuid::now_v7(),
        created_at: now - Duration::minutes(age_mins),
        updated_at: now,
    }
}

fn report(idea_id: Uuid, user_id: UserId) -> Report {
    let now = Utc::now();
    Report {
        id: Uuid::now_v7(),
        idea_id,
        user_id,
        reason: ReportReason::Spam,
        description: None,
        status: ReportStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

async fn seeded(store: &PgStore) -> Vec<Idea> {
    let web = store.insert_tag("Web", "#3b82f6").await.unwrap();
    let ai = store.insert_tag("AI", "#ec4899").await.unwrap();
    let tech = store
        .upsert_tech_stacks(&["React".into(), "Rust".into()])
        .await
        .unwrap();

    let rows = vec![
        (idea("Weather App", Difficulty::Beginner, 50), vec![web.id], vec![tech[0].id]),
        (idea("Chat Bot", Difficulty::Advanced, 40), vec![ai.id], vec![tech[1].id]),
        (idea("Todo List", Difficulty::Beginner, 30), vec![web.id], vec![]),
        (idea("Rate Limiter", Difficulty::Intermediate, 20), vec![], vec![tech[1].id]),
        (idea("Photo Tagger", Difficulty::Advanced, 10), vec![ai.id], vec![tech[0].id]),
    ];
    let mut ideas = Vec::new();
    for (idea, tag_ids, tech_stack_ids) in rows {
        store
            .insert_idea(idea.clone(), IdeaRelations { tag_ids, tech_stack_ids })
            .await
            .unwrap();
        ideas.push(idea);
    }
    ideas
}

fn query(filter: IdeaFilter, page_size: u32) -> IdeaQuery {
    IdeaQuery::for_page(&filter, page_size).unwrap()
}

async fn vote_rows(store: &PgStore, idea_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE idea_id = $1")
        .bind(idea_id)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_toggle_twice_restores_counter() {
    let db = test_db().await;
    let ideas = seeded(&db.store).await;
    let (user, target) = (Uuid::now_v7(), ideas[0].id);

    let added = db.store.toggle_vote(user, target).await.unwrap();
    assert_eq!(added, VoteOutcome { action: VoteAction::Added, upvotes: 1 });
    assert!(db.store.find_vote(user, target).await.unwrap().is_some());
    let removed = db.store.toggle_vote(user, target).await.unwrap();
    assert_eq!(removed, VoteOutcome { action: VoteAction::Removed, upvotes: 0 });
    assert!(db.store.find_vote(user, target).await.unwrap().is_none());
}

#[tokio::test]
async fn test_toggle_on_missing_idea_or_foreign_draft_is_not_found() {
    let db = test_db().await;
    let mut draft = idea("Secret", Difficulty::Beginner, 0);
    draft.status = IdeaStatus::Draft;
    let (id, author) = (draft.id, draft.user_id);
    db.store.insert_idea(draft, IdeaRelations::default()).await.unwrap();

    let stranger = Uuid::now_v7();
    let missing = db.store.toggle_vote(stranger, Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(missing, DomainError::NotFound(..)));
    let hidden = db.store.toggle_vote(stranger, id).await.unwrap_err();
    assert!(matches!(hidden, DomainError::NotFound(..)));
    assert_eq!(vote_rows(&db.store, id).await, 0);

    let own = db.store.toggle_vote(author, id).await.unwrap();
    assert_eq!(own.upvotes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_keep_counter_equal_to_votes() {
    let db = test_db().await;
    let store = Arc::new(db.store.clone());
    let target = idea("Hot", Difficulty::Beginner, 0);
    let id = target.id;
    store.insert_idea(target, IdeaRelations::default()).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..48 {
        let store = store.clone();
        let user = Uuid::now_v7();
        // every third user double-clicks
        let clicks = if n % 3 == 0 { 2 } else { 1 };
        handles.push(tokio::spawn(async move {
            for _ in 0..clicks {
                store.toggle_vote(user, id).await.unwrap();
            }
        }));
    }
    for h in futures_util::future::join_all(handles).await {
        h.unwrap();
    }

    let stored = store.find_idea(id).await.unwrap().unwrap();
    assert_eq!(i64::from(stored.upvotes), vote_rows(&store, id).await);
    assert_eq!(stored.upvotes, 48 - 16);
}

#[tokio::test]
async fn test_reconcile_repairs_drift() {
    let db = test_db().await;
    let ideas = seeded(&db.store).await;
    let id = ideas[1].id;
    db.store.toggle_vote(Uuid::now_v7(), id).await.unwrap();
    sqlx::query("UPDATE ideas SET upvotes = 7 WHERE id = $1")
        .bind(id)
        .execute(db.store.pool())
        .await
        .unwrap();

    let outcome = db.store.reconcile_upvotes(id).await.unwrap();
    assert_eq!((outcome.previous, outcome.actual), (7, 1));
    assert_eq!(db.store.find_idea(id).await.unwrap().unwrap().upvotes, 1);

    let missing = db.store.reconcile_upvotes(Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(missing, DomainError::NotFound(..)));
}

#[tokio::test]
async fn test_pages_cover_the_filtered_set_exactly_once() {
    let db = test_db().await;
    seeded(&db.store).await;
    for sort in [SortOrder::Newest, SortOrder::MostUpvoted, SortOrder::TitleDesc] {
        let mut seen = Vec::new();
        for page in 1..=3 {
            let result = db
                .store
                .query_ideas(&query(IdeaFilter { sort, page, ..Default::default() }, 2))
                .await
                .unwrap();
            assert_eq!(result.total_count, 5);
            seen.extend(result.rows.into_iter().map(|i| i.id));
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(seen.iter().collect::<BTreeSet<_>>().len(), 5);
    }
}

#[tokio::test]
async fn test_page_past_the_end_still_reports_total() {
    let db = test_db().await;
    seeded(&db.store).await;
    let page = db
        .store
        .query_ideas(&query(IdeaFilter { page: 9, ..Default::default() }, 2))
        .await
        .unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total_count, 5);
}

#[tokio::test]
async fn test_relation_filters_match_the_memory_store() {
    let db = test_db().await;
    seeded(&db.store).await;
    let tags = db.store.list_tags().await.unwrap();
    let web = tags.iter().find(|t| t.name == "Web").map(|t| t.id).unwrap();

    let filter = IdeaFilter {
        search: "a".into(),
        tag_ids: BTreeSet::from([web]),
        tech_stack_names: BTreeSet::from(["React".to_string()]),
        ..Default::default()
    };
    let page = db.store.query_ideas(&query(filter, 6)).await.unwrap();
    let titles: Vec<_> = page.rows.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Weather App"]);
}

#[tokio::test]
async fn test_delete_cascades_votes_relations_and_reports() {
    let db = test_db().await;
    let ideas = seeded(&db.store).await;
    let id = ideas[0].id;
    let user = Uuid::now_v7();
    db.store.toggle_vote(user, id).await.unwrap();
    db.store.insert_report(report(id, user)).await.unwrap();

    assert!(db.store.delete_idea(id).await.unwrap());
    assert!(!db.store.delete_idea(id).await.unwrap());
    assert!(db.store.find_vote(user, id).await.unwrap().is_none());
    assert!(db.store.tag_ids_for_idea(id).await.unwrap().is_empty());
    assert!(db.store.tech_stack_ids_for_idea(id).await.unwrap().is_empty());
    let reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE idea_id = $1")
        .bind(id)
        .fetch_one(db.store.pool())
        .await
        .unwrap();
    assert_eq!(reports, 0);
}

#[tokio::test]
async fn test_report_on_missing_idea_is_not_found() {
    let db = test_db().await;
    let err = db
        .store
        .insert_report(report(Uuid::now_v7(), Uuid::now_v7()))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(..)));
}

#[tokio::test]
async fn test_constraint_violations_map_to_conflict() {
    let db = test_db().await;
    db.store.insert_tag("Web", "#3b82f6").await.unwrap();
    let dup_tag = db.store.insert_tag("Web", "#000000").await.unwrap_err();
    assert!(matches!(dup_tag, DomainError::Conflict(_)));

    let row = idea("Twice", Difficulty::Beginner, 0);
    db.store.insert_idea(row.clone(), IdeaRelations::default()).await.unwrap();
    let dup_idea = db.store.insert_idea(row, IdeaRelations::default()).await.unwrap_err();
    assert!(matches!(dup_idea, DomainError::Conflict(_)));
    assert!(!dup_idea.is_retryable());
}

#[tokio::test]
async fn test_upsert_reuses_existing_names() {
    let db = test_db().await;
    let first = db.store.upsert_tech_stacks(&["Go".into()]).await.unwrap();
    let second = db
        .store
        .upsert_tech_stacks(&["Go".into(), "Vue".into(), "Go".into()])
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(db.store.list_tech_stacks().await.unwrap().len(), 2);
}

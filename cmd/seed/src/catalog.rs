//! Demo catalog: the standard tag palette, common tech stacks and a handful
//! of ideas owned by one demo profile.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{Clock, Difficulty, Result, UserProfile, Viewer};
use services::{IdeaInput, Ports, ReconcileReport, ReferenceDataService, RetryPolicy, SubmissionService, VoteService};
use tracing::info;
use uuid::Uuid;

/// Below this many ideas the demo ideas are (re)inserted.
pub const MIN_IDEAS: u64 = 6;

pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x0190_0000_0000_7000_8000_00de_0000_0001);

pub const TAG_PALETTE: [(&str, &str); 17] = [
    ("Web", "#3b82f6"),
    ("Mobile", "#10b981"),
    ("API", "#f59e0b"),
    ("Database", "#8b5cf6"),
    ("AI", "#ec4899"),
    ("DevOps", "#6366f1"),
    ("Game", "#ef4444"),
    ("E-commerce", "#0ea5e9"),
    ("Social Media", "#f97316"),
    ("Productivity", "#14b8a6"),
    ("Finance", "#84cc16"),
    ("Health", "#06b6d4"),
    ("Education", "#a855f7"),
    ("Food", "#f43f5e"),
    ("Travel", "#0284c7"),
    ("Analytics", "#7c3aed"),
    ("Communication", "#22c55e"),
];

pub const TECH_STACKS: [&str; 16] = [
    "React", "Next.js", "Vue", "Svelte", "TypeScript", "Node.js", "Python", "Django",
    "Rust", "Go", "PostgreSQL", "MongoDB", "Redis", "Docker", "Flutter", "Tailwind CSS",
];

struct DemoIdea {
    title: &'static str,
    short: &'static str,
    full: &'static str,
    difficulty: Difficulty,
    tags: &'static [&'static str],
    tech: &'static [&'static str],
}

const DEMO_IDEAS: [DemoIdea; 6] = [
    DemoIdea {
        title: "Recipe Finder",
        short: "Suggest recipes from whatever is left in the fridge.",
        full: "# Recipe Finder\n\nEnter ingredients, get ranked recipes. Start with a public recipe API and a simple match score.",
        difficulty: Difficulty::Beginner,
        tags: &["Web", "Food", "API"],
        tech: &["React", "Node.js"],
    },
    DemoIdea {
        title: "Habit Tracker",
        short: "Daily streaks with reminders and a weekly summary.",
        full: "# Habit Tracker\n\nTrack habits as check-ins, show streaks and send a push reminder when a day is about to be missed.",
        difficulty: Difficulty::Beginner,
        tags: &["Mobile", "Productivity", "Health"],
        tech: &["Flutter"],
    },
    DemoIdea {
        title: "Split the Bill",
        short: "Shared expenses for trips and flatmates, settled in as few transfers as possible.",
        full: "# Split the Bill\n\nRecord who paid what, then compute the minimal set of transfers that settles every balance.",
        difficulty: Difficulty::Intermediate,
        tags: &["Finance", "Mobile", "Travel"],
        tech: &["TypeScript", "PostgreSQL"],
    },
    DemoIdea {
        title: "Study Buddy Matcher",
        short: "Pair students taking the same course for study sessions.",
        full: "# Study Buddy Matcher\n\nMatch by course, availability and preferred format. Add a lightweight chat once a pair is made.",
        difficulty: Difficulty::Intermediate,
        tags: &["Education", "Social Media", "Communication"],
        tech: &["Next.js", "PostgreSQL", "Tailwind CSS"],
    },
    DemoIdea {
        title: "Log Anomaly Detector",
        short: "Flag unusual spikes in service logs before users notice.",
        full: "# Log Anomaly Detector\n\nStream logs, bucket them by template and alert when a bucket's rate leaves its rolling baseline.",
        difficulty: Difficulty::Advanced,
        tags: &["DevOps", "AI", "Analytics"],
        tech: &["Rust", "Redis", "Docker"],
    },
    DemoIdea {
        title: "Multiplayer Trivia",
        short: "Real-time quiz rooms with a shared leaderboard.",
        full: "# Multiplayer Trivia\n\nRooms of up to twenty players, questions pushed over websockets, scores weighted by answer time.",
        difficulty: Difficulty::Advanced,
        tags: &["Game", "Web"],
        tech: &["Go", "Svelte", "Redis"],
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub tags_created: usize,
    pub ideas_created: usize,
    pub reconcile: ReconcileReport,
}

/// Idempotent: tags are matched by name and ideas are only inserted while the
/// store holds fewer than `MIN_IDEAS`.
pub async fn seed(ports: Ports, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    // 1. Tags
    let mut tag_ids: HashMap<String, i64> = ports
        .tags
        .list_tags()
        .await?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();
    for (name, color) in TAG_PALETTE {
        if !tag_ids.contains_key(name) {
            let tag = ports.tags.insert_tag(name, color).await?;
            tag_ids.insert(tag.name, tag.id);
            summary.tags_created += 1;
        }
    }

    // 2. Tech stacks
    let names: Vec<String> = TECH_STACKS.iter().map(|s| s.to_string()).collect();
    ports.tech_stacks.upsert_tech_stacks(&names).await?;

    // 3. Demo profile
    if ports.profiles.find_profile(DEMO_USER_ID).await?.is_none() {
        let profile = UserProfile::new(DEMO_USER_ID, Some("Demo Builder".into()), clock.now());
        ports.profiles.upsert_profile(profile).await?;
    }

    // 4. Ideas
    if ports.ideas.count_ideas().await? < MIN_IDEAS {
        let reference = Arc::new(ReferenceDataService::new(
            ports.tags.clone(),
            ports.tech_stacks.clone(),
            retry,
            std::time::Duration::ZERO,
            clock.clone(),
        ));
        let submission = SubmissionService::new(ports.clone(), reference, clock, retry);
        let demo = Viewer::user(DEMO_USER_ID);
        for idea in &DEMO_IDEAS {
            let input = IdeaInput {
                title: idea.title.into(),
                short_description: idea.short.into(),
                full_description: idea.full.into(),
                difficulty: idea.difficulty,
                tag_ids: idea.tags.iter().filter_map(|t| tag_ids.get(*t).copied()).collect(),
                tech_stack: idea.tech.iter().map(|t| t.to_string()).collect(),
                status: None,
            };
            submission.submit_idea(Some(&demo), input).await?;
            summary.ideas_created += 1;
        }
    }

    // 5. Counters
    summary.reconcile = VoteService::new(ports.ideas, ports.votes, retry)
        .reconcile_all()
        .await?;

    info!(
        tags_created = summary.tags_created,
        ideas_created = summary.ideas_created,
        repaired = summary.reconcile.repaired.len(),
        "seed finished"
    );
    Ok(summary)
}

//! State behind the browse page's filter bar.
//!
//! Holds the current [`IdeaFilter`] and notifies a single listener whenever
//! it changes. Narrowing the result set (search, difficulty, tags, tech)
//! sends the user back to page 1; re-sorting keeps the page.
//!
//! The same module owns the URL form of a filter so the front end and the
//! HTTP adapter agree on it: `search`, `difficulty`, `tags` (comma-joined
//! ids), `tech_stack` (comma-joined names), `sort`, `page`.

use std::fmt;

use domains::{Difficulty, DomainError, IdeaFilter, Result, SortOrder, TagId};

pub type FilterListener = Box<dyn Fn(&IdeaFilter) + Send + Sync>;

#[derive(Default)]
pub struct FilterBarState {
    filter: IdeaFilter,
    listener: Option<FilterListener>,
}

impl fmt::Debug for FilterBarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBarState")
            .field("filter", &self.filter)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl FilterBarState {
    pub fn new(initial: IdeaFilter) -> Self {
        Self {
            filter: initial,
            listener: None,
        }
    }

    /// Replaces any previously registered listener.
    pub fn on_change(&mut self, listener: impl Fn(&IdeaFilter) + Send + Sync + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn filter(&self) -> &IdeaFilter {
        &self.filter
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.search = search.into();
        self.narrowed();
    }

    /// `None` is "All".
    pub fn set_difficulty(&mut self, difficulty: Option<Difficulty>) {
        self.filter.difficulty = difficulty;
        self.narrowed();
    }

    pub fn toggle_tag(&mut self, tag_id: TagId) {
        if !self.filter.tag_ids.remove(&tag_id) {
            self.filter.tag_ids.insert(tag_id);
        }
        self.narrowed();
    }

    pub fn toggle_tech(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.filter.tech_stack_names.remove(&name) {
            self.filter.tech_stack_names.insert(name);
        }
        self.narrowed();
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.filter.sort = sort;
        self.notify();
    }

    pub fn set_page(&mut self, page: u32) {
        self.filter.page = page.max(1);
        self.notify();
    }

    /// Back to defaults, keeping the listener.
    pub fn clear(&mut self) {
        self.filter = IdeaFilter::default();
        self.notify();
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        to_query_pairs(&self.filter)
    }

    fn narrowed(&mut self) {
        self.filter.page = 1;
        self.notify();
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener(&self.filter);
        }
    }
}

/// Joins set-valued keys in the URL form. Tech names may not contain it.
pub const LIST_SEPARATOR: char = ',';

/// URL form of a filter. Empty values are omitted.
pub fn to_query_pairs(filter: &IdeaFilter) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if !filter.search.is_empty() {
        pairs.push(("search", filter.search.clone()));
    }
    if let Some(d) = filter.difficulty {
        pairs.push(("difficulty", d.as_str().to_string()));
    }
    if !filter.tag_ids.is_empty() {
        let ids: Vec<String> = filter.tag_ids.iter().map(ToString::to_string).collect();
        pairs.push(("tags", ids.join(&LIST_SEPARATOR.to_string())));
    }
    if !filter.tech_stack_names.is_empty() {
        let names: Vec<&str> = filter.tech_stack_names.iter().map(String::as_str).collect();
        pairs.push(("tech_stack", names.join(&LIST_SEPARATOR.to_string())));
    }
    pairs.push(("sort", filter.sort.as_str().to_string()));
    pairs.push(("page", filter.page.to_string()));
    pairs
}

/// Parses URL pairs back into a validated filter. Set-valued keys accept
/// both comma-joined values and repeated keys; unknown keys are ignored.
pub fn parse_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<IdeaFilter>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut filter = IdeaFilter::default();
    for (key, value) in pairs {
        let value = value.as_ref();
        match key.as_ref() {
            "search" => filter.search = value.to_string(),
            "difficulty" => {
                filter.difficulty = match value.trim() {
                    "" | "All" | "all" => None,
                    other => Some(other.parse()?),
                }
            }
            "tags" => {
                for part in split_list(value) {
                    let id = part
                        .parse::<TagId>()
                        .map_err(|_| DomainError::validation(format!("invalid tag id '{part}'")))?;
                    filter.tag_ids.insert(id);
                }
            }
            "tech_stack" | "techStack" => {
                filter
                    .tech_stack_names
                    .extend(split_list(value).map(str::to_string));
            }
            "sort" if !value.is_empty() => filter.sort = value.parse()?,
            "page" if !value.is_empty() => {
                filter.page = value
                    .parse()
                    .map_err(|_| DomainError::validation(format!("invalid page '{value}'")))?;
            }
            _ => {}
        }
    }
    filter.validate()?;
    Ok(filter)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(LIST_SEPARATOR).map(str::trim).filter(|s| !s.is_empty())
}

pub const SORT_BY_RELEVANCE: &str = "relevance";
pub const SORT_BY_MODIFIED: &str = "most-recently-modified";

/// Which sort order applies when the query names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDefault {
    /// The query has free text or keywords, so results are ranked.
    Relevance,
    /// Most recently modified items first.
    Modified,
}

impl SortDefault {
    pub fn from_allowance(relevance_allowed: bool) -> Self {
        if relevance_allowed { SortDefault::Relevance } else { SortDefault::Modified }
    }

    pub fn field(self) -> &'static str {
        match self {
            SortDefault::Relevance => SORT_BY_RELEVANCE,
            SortDefault::Modified => SORT_BY_MODIFIED,
        }
    }
}

/// Where the results came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// A single collection, identified by its site URL.
    Site(String),
    /// A shared search across all contributing sites. `detail` selects the
    /// wording for the detail layout ("field") versus table layouts ("column").
    AllSites { detail: bool },
}

impl SearchScope {
    pub fn describe(&self) -> String {
        match self {
            SearchScope::Site(url) => url.clone(),
            SearchScope::AllSites { detail } => {
                let place = if *detail { "field" } else { "column" };
                format!("all sites (contributor ID appears in Identifier {})", place)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSummary {
    pub total_results: usize,
    pub filter_description_parts: Vec<String>,
    pub sort_field: String,
    pub images_only: bool,
    pub scope: SearchScope,
}

impl FilterSummary {
    pub fn new(
        total_results: usize,
        raw_filter_text: &str,
        sort_field: Option<&str>,
        images_only: bool,
        sort_default: SortDefault,
        scope: SearchScope,
    ) -> Self {
        let filter_description_parts = raw_filter_text
            .lines()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect();

        let sort_field = sort_field
            .map(str::trim)
            .filter(|sort| !sort.is_empty())
            .unwrap_or(sort_default.field())
            .to_string();

        Self {
            total_results,
            filter_description_parts,
            sort_field,
            images_only,
            scope,
        }
    }

    /// Filters, sort order and image restriction on one line.
    pub fn filter_line(&self) -> String {
        let mut parts = self.filter_description_parts.clone();
        parts.push(format!("sorted by {}", self.sort_field));
        let mut line = parts.join(", ");
        if self.images_only {
            line.push_str(", only items with images");
        }
        line
    }

    pub fn render(&self) -> String {
        format!(
            "{} search results from {}\nFilters: {}",
            self.total_results,
            self.scope.describe(),
            self.filter_line()
        )
    }
}

/// Build the header text of a search results report.
pub fn build_summary(
    total_results: usize,
    raw_filter_text: &str,
    sort_field: Option<&str>,
    images_only: bool,
    sort_default: SortDefault,
    scope: SearchScope,
) -> String {
    FilterSummary::new(total_results, raw_filter_text, sort_field, images_only, sort_default, scope).render()
}

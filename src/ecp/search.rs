//! Outbound content-search requests for the `/search/browse` endpoint.
//! Absent fields are omitted from the query string entirely.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Content category filter for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchKind {
    Movie,
    TvShow,
    Person,
    Channel,
    Game,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Movie => "movie",
            SearchKind::TvShow => "tv-show",
            SearchKind::Person => "person",
            SearchKind::Channel => "channel",
            SearchKind::Game => "game",
        }
    }
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(SearchKind::Movie),
            "tv-show" => Ok(SearchKind::TvShow),
            "person" => Ok(SearchKind::Person),
            "channel" => Ok(SearchKind::Channel),
            "game" => Ok(SearchKind::Game),
            _ => Err(format!("unknown search type: {s}")),
        }
    }
}

/// A content search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    /// Exact-match variant of `keyword`.
    pub title: Option<String>,
    pub kind: Option<SearchKind>,
    pub tmsid: Option<String>,
    pub season: Option<u32>,
    pub show_unavailable: Option<bool>,
    pub match_any: Option<bool>,
    pub provider_ids: Vec<String>,
    pub providers: Vec<String>,
    pub launch: Option<bool>,
}

impl SearchQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    /// Wire query pairs, in a stable order, with absent fields omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = &self.keyword {
            pairs.push(("keyword", keyword.clone()));
        }
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(kind) = self.kind {
            pairs.push(("type", kind.as_str().to_string()));
        }
        if let Some(tmsid) = &self.tmsid {
            pairs.push(("tmsid", tmsid.clone()));
        }
        if let Some(season) = self.season {
            pairs.push(("season", season.to_string()));
        }
        if let Some(show_unavailable) = self.show_unavailable {
            pairs.push(("show-unavailable", show_unavailable.to_string()));
        }
        if let Some(match_any) = self.match_any {
            pairs.push(("match-any", match_any.to_string()));
        }
        if !self.provider_ids.is_empty() {
            pairs.push(("provider-id", self.provider_ids.join(",")));
        }
        if !self.providers.is_empty() {
            pairs.push(("provider", self.providers.join(",")));
        }
        if let Some(launch) = self.launch {
            pairs.push(("launch", launch.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_produces_no_pairs() {
        assert!(SearchQuery::default().query_pairs().is_empty());
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let query = SearchQuery::keyword("stranger things");
        let pairs = query.query_pairs();
        assert_eq!(pairs, vec![("keyword", "stranger things".to_string())]);
    }

    #[test]
    fn test_full_query_encoding() {
        let query = SearchQuery {
            keyword: Some("office".to_string()),
            title: None,
            kind: Some(SearchKind::TvShow),
            tmsid: None,
            season: Some(2),
            show_unavailable: Some(false),
            match_any: Some(true),
            provider_ids: vec!["12".to_string(), "13".to_string()],
            providers: Vec::new(),
            launch: Some(true),
        };
        assert_eq!(
            query.query_pairs(),
            vec![
                ("keyword", "office".to_string()),
                ("type", "tv-show".to_string()),
                ("season", "2".to_string()),
                ("show-unavailable", "false".to_string()),
                ("match-any", "true".to_string()),
                ("provider-id", "12,13".to_string()),
                ("launch", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_kind_parse() {
        assert_eq!("tv-show".parse::<SearchKind>(), Ok(SearchKind::TvShow));
        assert!("sitcom".parse::<SearchKind>().is_err());
    }
}

//! Group alias resolution.
//!
//! Coaches refer to groups loosely in plan text ("LS", "long sprinters",
//! "Throwers"). [`AliasTable`] maps those tokens to the ids of groups the
//! coach actually owns. The table is built once per build operation from,
//! in precedence order:
//!
//! 1. the coach's group slugs, verbatim. Slugs are lowercase by schema,
//!    so a token in any case that normalizes to the slug matches it;
//! 2. the coach's group display names, case-folded, plus the same with
//!    spaces removed and with spaces hyphenated;
//! 3. a domain vocabulary ([`AliasVocabulary`]), registered only for
//!    canonical slugs the coach owns.
//!
//! An earlier source always wins over a later one for the same key.

use std::collections::HashMap;

use uuid::Uuid;

use stride_db::models::AthleteGroup;

/// A static vocabulary of group nicknames.
///
/// Each entry maps a normalized alias to candidate canonical slugs, most
/// specific first. The first candidate the coach owns is used.
pub trait AliasVocabulary: Send + Sync {
    fn entries(&self) -> &'static [(&'static str, &'static [&'static str])];
}

/// Track-and-field event-group nicknames.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackAndFieldVocabulary;

const TRACK_AND_FIELD: &[(&str, &[&str])] = &[
    // sprints
    ("ls", &["long-sprints", "sprints"]),
    ("long sprint", &["long-sprints", "sprints"]),
    ("long sprinters", &["long-sprints", "sprints"]),
    ("400", &["long-sprints", "sprints"]),
    ("400m", &["long-sprints", "sprints"]),
    ("quarter milers", &["long-sprints", "sprints"]),
    ("ss", &["short-sprints", "sprints"]),
    ("short sprint", &["short-sprints", "sprints"]),
    ("short sprinters", &["short-sprints", "sprints"]),
    ("100/200", &["short-sprints", "sprints"]),
    ("sprint", &["sprints", "short-sprints", "long-sprints"]),
    ("sprinters", &["sprints", "short-sprints", "long-sprints"]),
    // hurdles
    ("h", &["hurdles"]),
    ("hurdle", &["hurdles"]),
    ("hurdlers", &["hurdles"]),
    ("hurdle group", &["hurdles"]),
    // jumps
    ("j", &["jumps"]),
    ("jump", &["jumps", "horizontal-jumps", "vertical-jumps"]),
    ("jumpers", &["jumps", "horizontal-jumps", "vertical-jumps"]),
    ("hj", &["high-jump", "vertical-jumps", "jumps"]),
    ("high jumpers", &["high-jump", "vertical-jumps", "jumps"]),
    ("pv", &["pole-vault", "vertical-jumps", "jumps"]),
    ("vault", &["pole-vault", "vertical-jumps", "jumps"]),
    ("vaulters", &["pole-vault", "vertical-jumps", "jumps"]),
    ("horizontals", &["horizontal-jumps", "jumps"]),
    ("lj/tj", &["horizontal-jumps", "jumps"]),
    ("verticals", &["vertical-jumps", "jumps"]),
    // throws
    ("t", &["throws"]),
    ("throw", &["throws"]),
    ("throwers", &["throws"]),
    ("shot/disc", &["throws"]),
    // distance
    ("d", &["distance"]),
    ("distance runners", &["distance"]),
    ("xc", &["distance"]),
    ("cross country", &["distance"]),
    ("md", &["middle-distance", "distance"]),
    ("mid d", &["middle-distance", "distance"]),
    ("mid-d", &["middle-distance", "distance"]),
    ("middle distance", &["middle-distance", "distance"]),
    ("milers", &["middle-distance", "distance"]),
    // multi-events
    ("multis", &["multi-events", "multis"]),
    ("multi", &["multi-events", "multis"]),
    ("multi events", &["multi-events", "multis"]),
    ("combined events", &["multi-events", "multis"]),
    ("hep", &["multi-events", "multis"]),
    ("heptathletes", &["multi-events", "multis"]),
    ("dec", &["multi-events", "multis"]),
    ("decathletes", &["multi-events", "multis"]),
];

impl AliasVocabulary for TrackAndFieldVocabulary {
    fn entries(&self) -> &'static [(&'static str, &'static [&'static str])] {
        TRACK_AND_FIELD
    }
}

/// Trim, collapse internal whitespace, and case-fold a token.
pub fn normalize_token(token: &str) -> String {
    token
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether a parsed group list actually names anyone.
///
/// `None`, an empty list, and a list of blank strings all mean "everyone".
pub fn names_groups(tokens: Option<&[String]>) -> bool {
    tokens.is_some_and(|t| t.iter().any(|s| !s.trim().is_empty()))
}

/// Outcome of resolving one token list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Distinct resolved group ids, in first-mention order.
    pub group_ids: Vec<Uuid>,
    /// Normalized tokens that matched nothing.
    pub unresolved: Vec<String>,
}

/// Normalized token to group id lookup for one coach.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, Uuid>,
}

impl AliasTable {
    pub fn build(groups: &[AthleteGroup], vocabulary: &dyn AliasVocabulary) -> Self {
        let mut entries = HashMap::new();

        for group in groups {
            entries.entry(group.slug.clone()).or_insert(group.id);
        }

        for group in groups {
            let name = normalize_token(&group.name);
            if name.is_empty() {
                continue;
            }
            let squashed = name.replace(' ', "");
            let hyphenated = name.replace(' ', "-");
            for key in [name, squashed, hyphenated] {
                entries.entry(key).or_insert(group.id);
            }
        }

        let by_slug: HashMap<&str, Uuid> =
            groups.iter().map(|g| (g.slug.as_str(), g.id)).collect();
        for (alias, candidates) in vocabulary.entries() {
            let owned = candidates.iter().find_map(|slug| by_slug.get(slug).copied());
            if let Some(id) = owned {
                entries.entry(normalize_token(alias)).or_insert(id);
            }
        }

        Self { entries }
    }

    pub fn lookup(&self, token: &str) -> Option<Uuid> {
        self.entries.get(&normalize_token(token)).copied()
    }

    /// Resolve a token list. Blank tokens are ignored.
    pub fn resolve(&self, tokens: &[String]) -> Resolution {
        let mut resolution = Resolution::default();
        for token in tokens {
            let key = normalize_token(token);
            if key.is_empty() {
                continue;
            }
            match self.entries.get(&key) {
                Some(id) => {
                    if !resolution.group_ids.contains(id) {
                        resolution.group_ids.push(*id);
                    }
                }
                None => {
                    if !resolution.unresolved.contains(&key) {
                        resolution.unresolved.push(key);
                    }
                }
            }
        }
        resolution
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn group(name: &str, slug: &str) -> AthleteGroup {
        AthleteGroup {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: name.to_string(),
            slug: slug.to_string(),
            color: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    struct OneAlias;

    const ONE_ALIAS: &[(&str, &[&str])] = &[("speed", &["sprints"])];

    impl AliasVocabulary for OneAlias {
        fn entries(&self) -> &'static [(&'static str, &'static [&'static str])] {
            ONE_ALIAS
        }
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_token("  Long   Sprints "), "long sprints");
        assert_eq!(normalize_token("LS"), "ls");
        assert_eq!(normalize_token("   "), "");
    }

    #[test]
    fn blank_group_lists_mean_everyone() {
        assert!(!names_groups(None));
        assert!(!names_groups(Some(&[])));
        assert!(!names_groups(Some(&tokens(&["", "  "]))));
        assert!(names_groups(Some(&tokens(&["LS"]))));
    }

    #[test]
    fn static_alias_maps_to_owned_slug() {
        let ls = group("Long Sprints", "long-sprints");
        let table = AliasTable::build(std::slice::from_ref(&ls), &TrackAndFieldVocabulary);

        let res = table.resolve(&tokens(&["LS"]));
        assert_eq!(res.group_ids, vec![ls.id]);
        assert!(res.unresolved.is_empty());
    }

    #[test]
    fn aliases_never_invent_groups() {
        let throws = group("Throws", "throws");
        let table = AliasTable::build(&[throws], &TrackAndFieldVocabulary);

        let res = table.resolve(&tokens(&["LS", "hurdlers"]));
        assert!(res.group_ids.is_empty());
        assert_eq!(res.unresolved, vec!["ls".to_string(), "hurdlers".to_string()]);
    }

    #[test]
    fn display_name_variants_resolve() {
        let ls = group("Long Sprints", "ls-group");
        let table = AliasTable::build(std::slice::from_ref(&ls), &OneAlias);

        for token in ["long sprints", "LONG SPRINTS", "longsprints", "long-sprints", "ls-group"] {
            assert_eq!(table.lookup(token), Some(ls.id), "token {token:?}");
        }
    }

    #[test]
    fn slug_beats_display_name_and_alias() {
        // One group's slug equals another group's display name.
        let a = group("Team A", "sprints");
        let b = group("Sprints", "b-squad");
        let table = AliasTable::build(&[a.clone(), b.clone()], &OneAlias);

        assert_eq!(table.lookup("sprints"), Some(a.id));
        assert_eq!(table.lookup("speed"), Some(a.id));
        assert_eq!(table.lookup("b-squad"), Some(b.id));
    }

    #[test]
    fn slug_matches_exactly_and_tokens_fold_to_it() {
        let ls = group("Sprint Squad", "long-sprints-2");
        let table = AliasTable::build(std::slice::from_ref(&ls), &TrackAndFieldVocabulary);

        assert_eq!(table.lookup("long-sprints-2"), Some(ls.id));
        assert_eq!(table.lookup(" Long-Sprints-2 "), Some(ls.id));
        assert_eq!(table.lookup("long sprints 2"), None);
    }

    #[test]
    fn first_owned_candidate_wins() {
        let sprints = group("Sprint Crew", "sprints");
        let table = AliasTable::build(std::slice::from_ref(&sprints), &TrackAndFieldVocabulary);
        // "ls" prefers long-sprints, which the coach does not own.
        assert_eq!(table.lookup("ls"), Some(sprints.id));
    }

    #[test]
    fn resolve_collapses_duplicates_and_skips_blanks() {
        let ls = group("Long Sprints", "long-sprints");
        let table = AliasTable::build(std::slice::from_ref(&ls), &TrackAndFieldVocabulary);

        let res = table.resolve(&tokens(&["LS", "long sprints", " ", "ls", "ghosts", "Ghosts"]));
        assert_eq!(res.group_ids, vec![ls.id]);
        assert_eq!(res.unresolved, vec!["ghosts".to_string()]);
    }

    #[test]
    fn empty_directory_builds_empty_table() {
        let table = AliasTable::build(&[], &TrackAndFieldVocabulary);
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }
}

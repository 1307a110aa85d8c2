use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// A catalog title as the server reports it. Identity is the `id` alone;
/// `title` is display text and the sort key, never an identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    #[serde(deserialize_with = "id_from_wire")]
    pub id: String,
    pub title: String,
}

impl Game {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

// gogrepoc sends numeric ids for catalog entries and md5 strings for
// already-downloaded ones; both collapse to a string key.
fn id_from_wire<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Ordered collection of games with no duplicate ids. The backing vec is
/// kept sorted ascending by title at all times, so `ordered()` is just the
/// slice; ties keep their arrival order (stable sort over a stable vec).
#[derive(Debug, Clone, Default)]
pub struct GameSet {
    games: Vec<Game>,
}

impl GameSet {
    pub fn from_games(games: Vec<Game>) -> Self {
        let mut set = Self::default();
        set.insert(games);
        set
    }

    /// Idempotent union: a game whose id is already present is dropped
    /// silently, never an error.
    pub fn insert(&mut self, games: Vec<Game>) {
        for game in games {
            if !self.contains(&game.id) {
                self.games.push(game);
            }
        }
        self.resort();
    }

    /// Removes every entry whose id is in `ids` and returns the removed
    /// games in their current order. Absent ids are no-ops.
    pub fn remove(&mut self, ids: &HashSet<String>) -> Vec<Game> {
        let (removed, kept): (Vec<Game>, Vec<Game>) = self
            .games
            .drain(..)
            .partition(|game| ids.contains(&game.id));
        self.games = kept;
        self.resort();
        removed
    }

    /// Discards prior contents and installs `games`. Used on every manifest
    /// refresh; the server payload wins wholesale, no merging.
    pub fn replace_all(&mut self, games: Vec<Game>) {
        self.games.clear();
        self.insert(games);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.games.iter().any(|game| game.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Game> {
        self.games.get(index)
    }

    /// Canonical title-ascending view.
    pub fn ordered(&self) -> &[Game] {
        &self.games
    }

    pub fn ids(&self) -> Vec<String> {
        self.games.iter().map(|game| game.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    fn resort(&mut self) {
        self.games.sort_by(|a, b| a.title.cmp(&b.title));
    }
}

/// Multi-select state for exactly one owning [`GameSet`]. Stores ids only;
/// the owning set keeps the `Game` records.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<String>,
}

impl Selection {
    /// Adds or removes `id`. Adding is guarded against ids not present in
    /// the owning set, so a click that raced a refresh is a no-op.
    pub fn toggle(&mut self, id: &str, owner: &GameSet) {
        if self.ids.contains(id) {
            self.ids.remove(id);
        } else if owner.contains(id) {
            self.ids.insert(id.to_string());
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids no longer present in the owning set. Called in the same
    /// step as any structural mutation of the owner, so no dangling ids
    /// survive a refresh.
    pub fn prune(&mut self, owner: &GameSet) {
        self.ids.retain(|id| owner.contains(id));
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Moves every selected game out of `source` into `dest`, then clears the
/// consumed selection. Direction-agnostic; the caller picks which set is
/// which. An empty selection is accepted and ignored.
pub fn transfer(source: &mut GameSet, dest: &mut GameSet, selection: &mut Selection) {
    if selection.is_empty() {
        return;
    }
    let moved = source.remove(selection.ids());
    dest.insert(moved);
    selection.clear();
}

/// The three disjoint sets of one screen state plus the two transfer
/// selections. Disjointness holds between available/queued/downloaded,
/// except transiently while an add-without-download is in flight (server
/// semantics; the next manifest refresh resolves it).
#[derive(Debug, Clone, Default)]
pub struct Shelf {
    pub available: GameSet,
    pub queued: GameSet,
    pub downloaded: GameSet,
    pub available_selection: Selection,
    pub queued_selection: Selection,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Game> {
        vec![
            Game::new("2", "Beneath a Steel Sky"),
            Game::new("1", "Anachronox"),
            Game::new("3", "Freespace 2"),
        ]
    }

    fn id_set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn ordered_is_sorted_by_title() {
        let set = GameSet::from_games(sample());
        let titles: Vec<&str> = set.ordered().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Anachronox", "Beneath a Steel Sky", "Freespace 2"]
        );
    }

    #[test]
    fn insert_ignores_duplicate_ids() {
        let mut set = GameSet::from_games(sample());
        set.insert(vec![Game::new("2", "Renamed Entry")]);
        assert_eq!(set.len(), 3);
        assert!(set.ordered().iter().all(|g| g.title != "Renamed Entry"));
    }

    #[test]
    fn title_ties_keep_arrival_order() {
        let mut set = GameSet::default();
        set.insert(vec![Game::new("a", "Same Title"), Game::new("b", "Same Title")]);
        let ids: Vec<&str> = set.ordered().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn remove_absent_ids_is_noop() {
        let mut set = GameSet::from_games(sample());
        let removed = set.remove(&id_set(&["99"]));
        assert!(removed.is_empty());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn replace_all_discards_prior_contents() {
        let mut set = GameSet::from_games(sample());
        set.replace_all(vec![Game::new("7", "Outcast")]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("7"));
        assert!(!set.contains("1"));
    }

    #[test]
    fn ordered_is_stable_across_noop_mutations() {
        let mut set = GameSet::from_games(sample());
        let before: Vec<Game> = set.ordered().to_vec();
        set.remove(&id_set(&["missing"]));
        set.insert(vec![Game::new("1", "Anachronox")]);
        assert_eq!(set.ordered(), before.as_slice());
    }

    #[test]
    fn toggle_guards_against_stale_ids() {
        let set = GameSet::from_games(sample());
        let mut selection = Selection::default();
        selection.toggle("1", &set);
        selection.toggle("99", &set);
        assert!(selection.is_selected("1"));
        assert!(!selection.is_selected("99"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn toggle_never_mutates_owner() {
        let set = GameSet::from_games(sample());
        let before: Vec<Game> = set.ordered().to_vec();
        let mut selection = Selection::default();
        selection.toggle("1", &set);
        selection.toggle("1", &set);
        assert_eq!(set.ordered(), before.as_slice());
    }

    #[test]
    fn prune_drops_dangling_ids() {
        let mut set = GameSet::from_games(sample());
        let mut selection = Selection::default();
        selection.toggle("1", &set);
        selection.toggle("2", &set);
        set.remove(&id_set(&["1"]));
        selection.prune(&set);
        assert!(!selection.is_selected("1"));
        assert!(selection.is_selected("2"));
    }

    #[test]
    fn transfer_moves_selection_between_sets() {
        let mut available = GameSet::from_games(sample());
        let mut queued = GameSet::default();
        let mut selection = Selection::default();
        selection.toggle("1", &available);
        selection.toggle("3", &available);

        transfer(&mut available, &mut queued, &mut selection);

        assert_eq!(available.len(), 1);
        assert_eq!(queued.len(), 2);
        assert!(!available.contains("1"));
        assert!(!available.contains("3"));
        assert!(queued.contains("1"));
        assert!(queued.contains("3"));
        assert!(selection.is_empty());
    }

    #[test]
    fn transfer_with_empty_selection_changes_nothing() {
        let mut available = GameSet::from_games(sample());
        let mut queued = GameSet::from_games(vec![Game::new("9", "Xenon")]);
        let mut selection = Selection::default();
        let available_before: Vec<Game> = available.ordered().to_vec();
        let queued_before: Vec<Game> = queued.ordered().to_vec();

        transfer(&mut available, &mut queued, &mut selection);

        assert_eq!(available.ordered(), available_before.as_slice());
        assert_eq!(queued.ordered(), queued_before.as_slice());
    }

    #[test]
    fn transfer_reorders_destination_by_title() {
        // available = [{2,"B"},{1,"A"}], select both, move to queued.
        let mut available =
            GameSet::from_games(vec![Game::new("2", "B"), Game::new("1", "A")]);
        let mut queued = GameSet::default();
        let mut selection = Selection::default();
        selection.toggle("1", &available);
        selection.toggle("2", &available);

        transfer(&mut available, &mut queued, &mut selection);

        assert!(available.is_empty());
        let queued_view: Vec<(&str, &str)> = queued
            .ordered()
            .iter()
            .map(|g| (g.id.as_str(), g.title.as_str()))
            .collect();
        assert_eq!(queued_view, vec![("1", "A"), ("2", "B")]);
        assert!(selection.is_empty());
    }

    #[test]
    fn game_id_decodes_from_number_or_string() {
        let numeric: Game = serde_json::from_str(r#"{"id": 1207658924, "title": "Sacrifice"}"#)
            .expect("numeric id");
        assert_eq!(numeric.id, "1207658924");

        let text: Game = serde_json::from_str(r#"{"id": "d41d8cd9", "title": "Gorky 17"}"#)
            .expect("string id");
        assert_eq!(text.id, "d41d8cd9");
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connectivity::{ConnectivityProbe, OnlineStatus};
use crate::model::{PlayList, Show};
use crate::store::PlaylistStore;

const SHOW_PLAYLIST_LABEL: &str = "Show Playlist";
const SHOW_ALL_LABEL: &str = "Show All";

/// What the listing looked like before switching to the playlist-only view
#[derive(Debug, Clone, Default)]
struct ViewSnapshot {
    filter: String,
    shows: Vec<Show>,
    last_show_number: Option<i32>,
}

/// A playlist being created or edited. Nothing is committed until
/// [`Session::submit_draft`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistDraft {
    Adding(PlayList),
    Editing(PlayList),
}

impl PlaylistDraft {
    pub fn playlist(&self) -> &PlayList {
        match self {
            PlaylistDraft::Adding(p) | PlaylistDraft::Editing(p) => p,
        }
    }

    pub fn playlist_mut(&mut self) -> &mut PlayList {
        match self {
            PlaylistDraft::Adding(p) | PlaylistDraft::Editing(p) => p,
        }
    }
}

/// Everything the client knows for the lifetime of the application.
///
/// One instance is created at startup and handed by reference to the pager,
/// the playback engine and the front end. Playlists are flushed to the
/// store after every committing mutation.
pub struct Session {
    store: PlaylistStore,
    playlists: Vec<PlayList>,
    selected: Option<Uuid>,
    playlist_only: bool,
    /// Only meaningful while `playlist_only` is set
    backup: ViewSnapshot,
    all_shows: Vec<Show>,
    show_numbers: Vec<i32>,
    last_show_number: Option<i32>,
    filter: String,
    online: OnlineStatus,
    draft: Option<PlaylistDraft>,
}

impl Session {
    /// Create a session and load the stored playlists.
    ///
    /// An unreadable playlist file is logged and the session starts with no
    /// playlists.
    pub fn open(store: PlaylistStore, online: OnlineStatus) -> Self {
        let playlists = match store.load() {
            Ok(playlists) => {
                debug!("Loaded {} playlists", playlists.len());
                playlists
            }
            Err(e) => {
                warn!("Starting without playlists: {}", e);
                Vec::new()
            }
        };

        Self {
            store,
            playlists,
            selected: None,
            playlist_only: false,
            backup: ViewSnapshot::default(),
            all_shows: Vec::new(),
            show_numbers: Vec::new(),
            last_show_number: None,
            filter: String::new(),
            online,
            draft: None,
        }
    }

    pub fn playlists(&self) -> &[PlayList] {
        &self.playlists
    }

    pub fn playlist(&self, id: Uuid) -> Option<&PlayList> {
        self.playlists.iter().find(|p| p.id == id)
    }

    pub fn find_playlist_by_name(&self, name: &str) -> Option<&PlayList> {
        self.playlists
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }

    /// The selected playlist, if the selection still refers to one
    pub fn selected_playlist(&self) -> Option<&PlayList> {
        self.selected.and_then(|id| self.playlist(id))
    }

    fn selected_playlist_mut(&mut self) -> Option<&mut PlayList> {
        let id = self.selected?;
        self.playlists.iter_mut().find(|p| p.id == id)
    }

    /// Shows currently displayed in the listing
    pub fn all_shows(&self) -> &[Show] {
        &self.all_shows
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn show_numbers(&self) -> &[i32] {
        &self.show_numbers
    }

    /// Exclusive upper bound of the next unfiltered batch; `None` before the first batch
    pub fn last_show_number(&self) -> Option<i32> {
        self.last_show_number
    }

    pub fn is_playlist_only(&self) -> bool {
        self.playlist_only
    }

    /// Text for the button that toggles the playlist-only view
    pub fn playlist_only_label(&self) -> &'static str {
        if self.playlist_only {
            SHOW_ALL_LABEL
        } else {
            SHOW_PLAYLIST_LABEL
        }
    }

    pub fn online(&self) -> &OnlineStatus {
        &self.online
    }

    pub fn is_online(&self) -> bool {
        self.online.is_online()
    }

    pub async fn refresh_online_status<P: ConnectivityProbe + ?Sized>(&self, probe: &P) -> bool {
        self.online.refresh(probe).await
    }

    // === Listing state, driven by the pager ===

    pub(crate) fn append_shows(&mut self, shows: Vec<Show>) {
        self.all_shows.extend(shows);
    }

    pub(crate) fn set_filter_text(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    pub(crate) fn set_show_numbers(&mut self, numbers: Vec<i32>) {
        self.show_numbers = numbers;
    }

    pub(crate) fn set_last_show_number(&mut self, number: i32) {
        self.last_show_number = Some(number);
    }

    /// Empty the listing and rewind the pagination cursor
    pub(crate) fn reset_listing(&mut self) {
        self.all_shows.clear();
        self.last_show_number = None;
    }

    pub(crate) fn clear_show_numbers(&mut self) {
        self.show_numbers.clear();
    }

    /// Drop out of the playlist-only view without restoring the snapshot.
    /// Used when the listing is about to be rebuilt anyway.
    pub(crate) fn discard_playlist_only_view(&mut self) {
        self.playlist_only = false;
    }

    // === Playlist selection and editing ===

    /// Select a playlist by identity. An unknown id clears the selection.
    ///
    /// Selecting from the playlist list always returns to the full listing.
    pub fn select_playlist(&mut self, id: Uuid) {
        self.selected = self.playlist(id).map(|p| p.id);
        if self.playlist_only {
            self.toggle_show_playlist_only();
        }
    }

    pub fn add_playlist(&mut self, playlist: PlayList) {
        info!("Adding playlist '{}'", playlist.name);
        let id = playlist.id;
        self.playlists.push(playlist);
        self.selected = Some(id);
        self.persist();
    }

    /// Replace the playlist with identity `id` by `edited` and select it.
    /// Does nothing when no playlist has that identity.
    pub fn edit_playlist(&mut self, id: Uuid, edited: PlayList) {
        let Some(slot) = self.playlists.iter_mut().find(|p| p.id == id) else {
            debug!("Ignoring edit of unknown playlist {}", id);
            return;
        };

        let new_id = edited.id;
        *slot = edited;
        self.selected = Some(new_id);
        self.persist();
    }

    /// Remove the selected playlist. Leaves the playlist-only view if it
    /// was active. Returns false when nothing was selected.
    pub fn delete_playlist(&mut self) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };

        self.playlists.retain(|p| p.id != id);
        self.persist();

        if self.playlist_only {
            self.toggle_show_playlist_only();
        }
        true
    }

    pub fn selected_contains_show(&self, show: &Show) -> bool {
        self.selected_playlist()
            .is_some_and(|playlist| playlist.contains_show(show))
    }

    /// Append a show to the selected playlist. No-op without a selection or
    /// if the show is already in it.
    pub fn add_show_to_playlist(&mut self, show: &Show) {
        let Some(playlist) = self.selected_playlist_mut() else {
            return;
        };
        if playlist.contains_show(show) {
            return;
        }

        playlist.shows.push(show.without_details());
        self.persist();
    }

    /// Remove a show (matched by id) from the selected playlist
    pub fn remove_show_from_playlist(&mut self, show: &Show) {
        let Some(playlist) = self.selected_playlist_mut() else {
            return;
        };
        let Some(index) = playlist.position_of(show) else {
            return;
        };

        playlist.shows.remove(index);
        self.persist();
    }

    /// Add every displayed show to the selected playlist.
    ///
    /// Refused while the playlist-only view is active. Returns the number of
    /// shows added.
    pub fn add_all_to_playlist(&mut self) -> usize {
        if self.playlist_only {
            return 0;
        }
        let Some(id) = self.selected else {
            return 0;
        };
        let Some(playlist) = self.playlists.iter_mut().find(|p| p.id == id) else {
            return 0;
        };

        let mut added = 0;
        for show in &self.all_shows {
            if !playlist.contains_show(show) {
                playlist.shows.push(show.without_details());
                added += 1;
            }
        }

        self.persist();
        added
    }

    /// Remove every displayed show from the selected playlist.
    ///
    /// Refused while the playlist-only view is active. Returns the number of
    /// shows removed.
    pub fn remove_all_from_playlist(&mut self) -> usize {
        if self.playlist_only {
            return 0;
        }
        let Some(id) = self.selected else {
            return 0;
        };
        let Some(playlist) = self.playlists.iter_mut().find(|p| p.id == id) else {
            return 0;
        };

        let before = playlist.shows.len();
        playlist
            .shows
            .retain(|s| !self.all_shows.iter().any(|shown| shown.id == s.id));
        let removed = before - playlist.shows.len();

        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Switch the listing between all shows and the selected playlist's shows.
    ///
    /// Entering the playlist-only view saves the filter, the listing and the
    /// pagination cursor; leaving it puts them back. Entering is refused
    /// (returns false) when no playlist is selected.
    pub fn toggle_show_playlist_only(&mut self) -> bool {
        if self.playlist_only {
            self.filter = self.backup.filter.clone();
            self.all_shows = self.backup.shows.clone();
            self.last_show_number = self.backup.last_show_number;
            self.playlist_only = false;
            return true;
        }

        let Some(shows) = self.selected_playlist().map(|p| p.shows.clone()) else {
            debug!("Playlist-only view requested without a selected playlist");
            return false;
        };

        self.backup = ViewSnapshot {
            filter: std::mem::take(&mut self.filter),
            shows: std::mem::replace(&mut self.all_shows, shows),
            last_show_number: self.last_show_number,
        };
        self.last_show_number = None;
        self.playlist_only = true;
        true
    }

    // === Add/edit drafts ===

    pub fn draft(&self) -> Option<&PlaylistDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut PlayList> {
        self.draft.as_mut().map(PlaylistDraft::playlist_mut)
    }

    /// Start creating a new playlist
    pub fn begin_add(&mut self, name: &str) -> &mut PlayList {
        self.draft
            .insert(PlaylistDraft::Adding(PlayList::new(name)))
            .playlist_mut()
    }

    /// Start editing a copy of the selected playlist
    pub fn begin_edit(&mut self) -> Option<&mut PlayList> {
        let copy = self.selected_playlist()?.clone();
        Some(self.draft.insert(PlaylistDraft::Editing(copy)).playlist_mut())
    }

    /// Commit the draft. Returns false if there was none.
    pub fn submit_draft(&mut self) -> bool {
        match self.draft.take() {
            Some(PlaylistDraft::Adding(playlist)) => {
                self.add_playlist(playlist);
                true
            }
            Some(PlaylistDraft::Editing(playlist)) => {
                self.edit_playlist(playlist.id, playlist);
                true
            }
            None => false,
        }
    }

    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.playlists) {
            warn!("Playlists kept in memory only: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::make_show;
    use tempfile::{TempDir, tempdir};

    fn open_session() -> (Session, TempDir) {
        let dir = tempdir().unwrap();
        let session = Session::open(PlaylistStore::in_dir(dir.path()), OnlineStatus::default());
        (session, dir)
    }

    fn reopen(dir: &TempDir) -> Session {
        Session::open(PlaylistStore::in_dir(dir.path()), OnlineStatus::default())
    }

    fn playlist_with(name: &str, numbers: &[i32]) -> PlayList {
        let mut playlist = PlayList::new(name);
        playlist.shows = numbers.iter().map(|&n| make_show(n)).collect();
        playlist
    }

    /// Session browsing shows 10..=6 with a filter and a cursor in flight
    fn browsing_session() -> (Session, TempDir) {
        let (mut session, dir) = open_session();
        session.append_shows((6..=10).rev().map(make_show).collect());
        session.set_filter_text("rust");
        session.set_last_show_number(6);
        (session, dir)
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("playlists.json"), "[{").unwrap();

        let session = reopen(&dir);
        assert!(session.playlists().is_empty());
    }

    #[test]
    fn add_playlist_selects_and_persists() {
        let (mut session, dir) = open_session();
        let playlist = playlist_with("Commute", &[3, 2]);
        let id = playlist.id;

        session.add_playlist(playlist);

        assert_eq!(session.selected_id(), Some(id));
        let reloaded = reopen(&dir);
        assert_eq!(reloaded.playlists().len(), 1);
        assert_eq!(reloaded.playlists()[0].name, "Commute");
    }

    #[test]
    fn edit_playlist_replaces_by_identity() {
        let (mut session, dir) = open_session();
        session.add_playlist(playlist_with("a", &[1]));
        let target = playlist_with("b", &[2]);
        let id = target.id;
        session.add_playlist(target);
        session.add_playlist(playlist_with("c", &[3]));

        let mut edited = session.playlist(id).unwrap().clone();
        edited.name = "b renamed".to_string();
        edited.shows.push(make_show(4));
        session.edit_playlist(id, edited);

        assert_eq!(session.selected_id(), Some(id));
        let names: Vec<&str> = session.playlists().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b renamed", "c"]);
        assert_eq!(reopen(&dir).playlist(id).unwrap().shows.len(), 2);
    }

    #[test]
    fn edit_of_unknown_playlist_is_ignored() {
        let (mut session, _dir) = open_session();
        session.add_playlist(playlist_with("a", &[1]));

        session.edit_playlist(Uuid::new_v4(), playlist_with("ghost", &[]));

        assert_eq!(session.playlists().len(), 1);
        assert_eq!(session.playlists()[0].name, "a");
    }

    #[test]
    fn select_unknown_playlist_clears_selection() {
        let (mut session, _dir) = open_session();
        session.add_playlist(playlist_with("a", &[1]));

        session.select_playlist(Uuid::new_v4());

        assert!(session.selected_playlist().is_none());
    }

    #[test]
    fn delete_playlist_clears_selection_and_persists() {
        let (mut session, dir) = open_session();
        session.add_playlist(playlist_with("keep", &[1]));
        session.add_playlist(playlist_with("drop", &[2]));

        assert!(session.delete_playlist());

        assert!(session.selected_id().is_none());
        assert!(!session.delete_playlist());
        let reloaded = reopen(&dir);
        assert_eq!(reloaded.playlists().len(), 1);
        assert_eq!(reloaded.playlists()[0].name, "keep");
    }

    #[test]
    fn show_membership_is_by_id() {
        let (mut session, dir) = open_session();
        session.add_playlist(PlayList::new("p"));
        let show = make_show(5);

        session.add_show_to_playlist(&show);
        session.add_show_to_playlist(&show);
        assert_eq!(session.selected_playlist().unwrap().shows.len(), 1);

        let mut same_id = make_show(99);
        same_id.id = show.id;
        assert!(session.selected_contains_show(&same_id));

        session.remove_show_from_playlist(&same_id);
        assert!(session.selected_playlist().unwrap().shows.is_empty());
        assert!(reopen(&dir).playlists()[0].shows.is_empty());
    }

    #[test]
    fn show_mutations_without_selection_are_noops() {
        let (mut session, dir) = open_session();
        let show = make_show(1);

        session.add_show_to_playlist(&show);
        session.remove_show_from_playlist(&show);

        assert!(!session.selected_contains_show(&show));
        assert!(!dir.path().join("playlists.json").exists());
    }

    #[test]
    fn details_are_not_stored_in_playlists() {
        let (mut session, _dir) = open_session();
        session.add_playlist(PlayList::new("p"));
        let mut show = make_show(1);
        show.show_details = Some(Default::default());

        session.add_show_to_playlist(&show);

        assert!(session.selected_playlist().unwrap().shows[0].show_details.is_none());
    }

    #[test]
    fn add_all_and_remove_all() {
        let (mut session, _dir) = browsing_session();
        let mut playlist = PlayList::new("p");
        playlist.shows.push(make_show(8));
        playlist.shows.push(make_show(42));
        session.add_playlist(playlist);

        assert_eq!(session.add_all_to_playlist(), 4);
        assert_eq!(session.selected_playlist().unwrap().shows.len(), 6);

        assert_eq!(session.remove_all_from_playlist(), 5);
        let remaining: Vec<i32> = session
            .selected_playlist()
            .unwrap()
            .shows
            .iter()
            .map(|s| s.show_number)
            .collect();
        assert_eq!(remaining, vec![42]);
    }

    #[test]
    fn bulk_changes_refused_in_playlist_only_view() {
        let (mut session, _dir) = browsing_session();
        session.add_playlist(playlist_with("p", &[1]));
        session.toggle_show_playlist_only();

        assert_eq!(session.add_all_to_playlist(), 0);
        assert_eq!(session.remove_all_from_playlist(), 0);
    }

    #[test]
    fn toggle_swaps_listing_and_restores_it() {
        let (mut session, _dir) = browsing_session();
        session.add_playlist(playlist_with("p", &[3, 2, 1]));

        assert!(session.toggle_show_playlist_only());
        assert!(session.is_playlist_only());
        assert_eq!(session.filter(), "");
        assert_eq!(session.last_show_number(), None);
        let numbers: Vec<i32> = session.all_shows().iter().map(|s| s.show_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert_eq!(session.playlist_only_label(), "Show All");

        assert!(session.toggle_show_playlist_only());
        assert!(!session.is_playlist_only());
        assert_eq!(session.filter(), "rust");
        assert_eq!(session.last_show_number(), Some(6));
        assert_eq!(session.all_shows().len(), 5);
        assert_eq!(session.playlist_only_label(), "Show Playlist");
    }

    #[test]
    fn even_number_of_toggles_is_identity() {
        let (mut session, _dir) = browsing_session();
        session.add_playlist(playlist_with("p", &[1, 2]));
        let shows = session.all_shows().to_vec();

        for _ in 0..6 {
            session.toggle_show_playlist_only();
        }

        assert_eq!(session.all_shows(), shows.as_slice());
        assert_eq!(session.filter(), "rust");
        assert_eq!(session.last_show_number(), Some(6));
        assert!(!session.is_playlist_only());
    }

    #[test]
    fn toggle_without_selection_is_refused() {
        let (mut session, _dir) = browsing_session();

        assert!(!session.toggle_show_playlist_only());
        assert!(!session.is_playlist_only());
        assert_eq!(session.all_shows().len(), 5);
    }

    #[test]
    fn deleting_while_playlist_only_restores_listing() {
        let (mut session, _dir) = browsing_session();
        session.add_playlist(playlist_with("p", &[1]));
        session.toggle_show_playlist_only();

        session.delete_playlist();

        assert!(!session.is_playlist_only());
        assert_eq!(session.filter(), "rust");
        assert_eq!(session.all_shows().len(), 5);
        assert_eq!(session.last_show_number(), Some(6));
    }

    #[test]
    fn reselecting_leaves_playlist_only_view() {
        let (mut session, _dir) = browsing_session();
        let playlist = playlist_with("p", &[1]);
        let id = playlist.id;
        session.add_playlist(playlist);
        session.toggle_show_playlist_only();

        session.select_playlist(id);

        assert!(!session.is_playlist_only());
        assert_eq!(session.all_shows().len(), 5);
        assert_eq!(session.selected_id(), Some(id));
    }

    #[test]
    fn add_draft_commits_on_submit() {
        let (mut session, dir) = open_session();

        session.begin_add("Weekend").shows.push(make_show(7));
        assert!(session.playlists().is_empty());

        assert!(session.submit_draft());
        assert!(session.draft().is_none());
        assert_eq!(session.selected_playlist().unwrap().name, "Weekend");
        assert_eq!(reopen(&dir).playlists()[0].shows.len(), 1);
    }

    #[test]
    fn edit_draft_does_not_touch_committed_copy_until_submit() {
        let (mut session, _dir) = open_session();
        session.add_playlist(playlist_with("p", &[3, 2, 1]));

        let draft = session.begin_edit().unwrap();
        draft.name = "renamed".to_string();
        let second = draft.shows[1].clone();
        draft.move_show_up(&second);

        assert_eq!(session.selected_playlist().unwrap().name, "p");

        assert!(session.submit_draft());
        let committed = session.selected_playlist().unwrap();
        assert_eq!(committed.name, "renamed");
        let numbers: Vec<i32> = committed.shows.iter().map(|s| s.show_number).collect();
        assert_eq!(numbers, vec![2, 3, 1]);
    }

    #[test]
    fn cancelled_draft_changes_nothing() {
        let (mut session, _dir) = open_session();
        session.add_playlist(playlist_with("p", &[1]));

        session.begin_edit().unwrap().name = "nope".to_string();
        session.cancel_draft();

        assert!(!session.submit_draft());
        assert_eq!(session.selected_playlist().unwrap().name, "p");
    }

    #[test]
    fn begin_edit_requires_selection() {
        let (mut session, _dir) = open_session();
        assert!(session.begin_edit().is_none());
    }
}

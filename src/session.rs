use crate::api::Manifest;
use crate::catalog::{Selection, Shelf};

pub const UPDATE_PENDING: &str = "Updating game list. Please watch the server console for details...";
pub const DOWNLOAD_PENDING: &str =
    "Starting download. Please watch the server console for details...";

/// Auth/message/error state shared by every remote action. `message` and
/// `error` are write-once per action: the next action's outcome replaces
/// them, nothing accumulates.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub authenticated: bool,
    pub downloading: bool,
    pub busy: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl SyncState {
    /// Entering UpdateCatalog's InFlight: transient message until the
    /// terminal outcome overwrites it.
    pub fn begin_update(&mut self) {
        self.busy = true;
        self.message = Some(UPDATE_PENDING.to_string());
    }

    /// Entering SubmitDownload's InFlight: the downloading flag gates the
    /// trigger at the boundary until the outcome arrives.
    pub fn begin_download(&mut self) {
        self.busy = true;
        self.downloading = true;
        self.message = Some(DOWNLOAD_PENDING.to_string());
    }
}

/// The add-without-download workflow: a picker over *available* with its
/// own selection. Stays open on failure so the user can retry without
/// re-selecting.
#[derive(Debug, Clone, Default)]
pub struct AddWorkflow {
    pub open: bool,
    pub selection: Selection,
}

/// One terminal outcome per remote action class, as sent back by the
/// worker thread that ran the call. Errors cross the channel as strings.
#[derive(Debug)]
pub enum SyncMessage {
    AuthChecked(Result<(), String>),
    LoggedIn(Result<String, String>),
    ManifestFetched(Result<Manifest, String>),
    CatalogUpdated(Result<String, String>),
    DownloadSubmitted(Result<String, String>),
    GamesAdded(Result<String, String>),
}

/// A chained action the caller must start after reconciliation. Returned
/// instead of being fired from inside `apply` so the chain is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    CheckAuth,
    FetchManifest,
}

/// Reconciles one resolved action against local state and reports what to
/// run next. Successes apply their documented effect and clear any prior
/// error; failures set the error and leave everything else as it was.
pub fn apply(
    state: &mut SyncState,
    shelf: &mut Shelf,
    add: &mut AddWorkflow,
    message: SyncMessage,
) -> Option<FollowUp> {
    state.busy = false;
    match message {
        SyncMessage::AuthChecked(Ok(())) => {
            state.authenticated = true;
            state.error = None;
            Some(FollowUp::FetchManifest)
        }
        SyncMessage::AuthChecked(Err(error)) => {
            state.authenticated = false;
            state.error = Some(error);
            None
        }
        SyncMessage::LoggedIn(Ok(message)) => {
            state.message = Some(message);
            state.error = None;
            Some(FollowUp::CheckAuth)
        }
        SyncMessage::LoggedIn(Err(error)) => {
            state.error = Some(error);
            None
        }
        SyncMessage::ManifestFetched(Ok(manifest)) => {
            // The server payload is the authority: both server-backed sets
            // are replaced wholesale, the local queue and its selections
            // are dropped. Stale selection ids vanish with them.
            shelf.available.replace_all(manifest.available_games);
            shelf.downloaded.replace_all(manifest.downloaded_games);
            shelf.queued.replace_all(Vec::new());
            shelf.available_selection.clear();
            shelf.queued_selection.clear();
            add.selection.prune(&shelf.available);
            state.error = None;
            None
        }
        SyncMessage::ManifestFetched(Err(error)) => {
            state.error = Some(error);
            None
        }
        SyncMessage::CatalogUpdated(Ok(message)) => {
            state.message = Some(message);
            state.error = None;
            Some(FollowUp::FetchManifest)
        }
        SyncMessage::CatalogUpdated(Err(error)) => {
            state.error = Some(error);
            None
        }
        SyncMessage::DownloadSubmitted(outcome) => {
            // Completion is not observable synchronously, so the manifest
            // is re-fetched no matter how the submission ended.
            state.downloading = false;
            match outcome {
                Ok(message) => {
                    state.message = Some(message);
                    state.error = None;
                }
                Err(error) => state.error = Some(error),
            }
            Some(FollowUp::FetchManifest)
        }
        SyncMessage::GamesAdded(Ok(message)) => {
            state.message = Some(message);
            state.error = None;
            add.open = false;
            add.selection.clear();
            Some(FollowUp::FetchManifest)
        }
        SyncMessage::GamesAdded(Err(error)) => {
            state.error = Some(error);
            None
        }
    }
}

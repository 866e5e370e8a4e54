use crate::error::Result;
use crate::session::PageRequest;
use crate::types::{CloneEvent, PageFetch};

#[derive(Debug)]
pub enum Action {
    Quit,
    Back,
    ScrollUp,
    ScrollDown,
    GoToTop,
    GoToBottom,
    Tick,

    // Search form
    NextField,
    PrevField,
    CycleNext,
    CyclePrev,
    Input(char),
    Backspace,
    Search,
    NewSearch,

    // Paging
    NextPage,
    PrevPage,
    PageLoaded(PageRequest, Result<PageFetch>),

    // Selection
    ToggleSelected,
    SelectAllPage,
    SelectAllLoaded,
    ShowBranchSelect,

    // Popup navigation
    PopupUp,
    PopupDown,
    PopupSelect,

    // Cloning
    StartClone,
    ConfirmClone,
    CloneProgress(CloneEvent),
    /// The batch never started, e.g. the destination could not be created.
    CloneAborted(String),

    OpenInBrowser,
    YankUrl,

    None,
}

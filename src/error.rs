use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("GitHub API {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid search: {0}")]
    InvalidQuery(String),

    #[error("A search is already in progress")]
    Busy,

    #[error("Branch '{branch}' does not exist in {repo}")]
    InvalidBranch { repo: String, branch: String },

    #[error("No repositories selected")]
    NoSelection,

    #[error("Clone failed: {0}")]
    CloneTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GrabError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GrabError::Decode(err.to_string())
        } else {
            GrabError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, GrabError>;

use std::path::PathBuf;

use crate::clock::{Clock, SystemClock};
use crate::db::Store;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
    pub clock: Box<dyn Clock>,
}

impl AppState {
    pub fn new() -> Self {
        AppState::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        AppState {
            workspace: None,
            store: None,
            clock,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}

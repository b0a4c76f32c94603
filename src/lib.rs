//! The core library of the siteline field-service app.
//!
//! Everything the UI shell needs that isn't a widget lives here: the domain
//! records (sites, conveyor assets, technicians, reports, quotes), the
//! document-store seam and its in-memory implementation, the sync context
//! that reconciles local state against store notifications, and per-scope
//! edit sessions with undo support.

#[macro_use]
extern crate serde_derive;

#[macro_use]
mod util;

mod consts;
mod undo;

pub mod certification;
pub mod data;
pub mod edit_session;
pub mod entity;
pub mod filters;
pub mod quote;
pub mod report;
pub mod site;
pub mod store;
pub mod sync;

pub use consts::{collections, CACHE_FILE_NAME};
pub use edit_session::{EditSession, SessionId};
pub use undo::{Action, ActionResult, UndoStack};

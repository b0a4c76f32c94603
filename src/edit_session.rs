//! Editing sessions.
//!
//! A session wraps the shared workspace handle with its own undo history.
//! Each mutating method applies the edit immediately, then records an
//! [`Action`] whose closures capture the record ids and the old and new
//! values, so stepping backward and forward never depends on state that
//! might have moved underneath it.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use chrono::NaiveDate;

use crate::data::Workspace;
use crate::entity::RecordId;
use crate::quote::QuoteLine;
use crate::site::AssetStatus;
use crate::undo::{Action, ActionResult, UndoStack};

/// A unique identifier for a session. A session keeps the same identifier
/// even if the record it is editing is renamed.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SessionId(usize);

impl SessionId {
    pub(crate) fn next() -> SessionId {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        SessionId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The editing state of one logical scope (a site page, a quote form).
pub struct EditSession {
    pub id: SessionId,
    workspace: Rc<RefCell<Workspace>>,
    history: UndoStack,
}

impl EditSession {
    pub fn new(workspace: Rc<RefCell<Workspace>>) -> EditSession {
        EditSession {
            id: SessionId::next(),
            workspace,
            history: UndoStack::new(),
        }
    }

    /// A session with a custom history depth.
    pub fn with_history_depth(workspace: Rc<RefCell<Workspace>>, depth: usize) -> EditSession {
        EditSession {
            id: SessionId::next(),
            workspace,
            history: UndoStack::new_sized(depth),
        }
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    /// Call once the current state has been durably saved.
    pub fn checkpoint(&mut self) {
        self.history.mark_clean();
    }

    /// Forget all history, e.g. when the editing scope closes.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn rename_site(&mut self, site_id: &RecordId, new_name: impl Into<String>) {
        let new_name = new_name.into();
        let old_name = bail!(
            self.workspace.borrow().site(site_id).map(|s| s.name.clone()),
            "rename: no site {}",
            site_id
        );
        if old_name == new_name {
            return;
        }
        if let Err(err) = set_site_name(&self.workspace, site_id, &new_name) {
            log::warn!("rename of {} failed: {}", site_id, err);
            return;
        }

        let description = format!("rename {} to {}", old_name, new_name);
        let undo_ws = Rc::clone(&self.workspace);
        let redo_ws = Rc::clone(&self.workspace);
        let undo_id = site_id.clone();
        let redo_id = site_id.clone();
        self.history.record(Action::new(
            description,
            move || set_site_name(&undo_ws, &undo_id, &old_name),
            move || set_site_name(&redo_ws, &redo_id, &new_name),
        ));
    }

    pub fn set_asset_status(
        &mut self,
        site_id: &RecordId,
        asset_id: &RecordId,
        status: AssetStatus,
    ) {
        let (name, old) = bail!(
            self.workspace
                .borrow()
                .asset(site_id, asset_id)
                .map(|a| (a.name.clone(), a.status)),
            "set status: no asset {}",
            asset_id
        );
        if old == status {
            return;
        }
        if let Err(err) = set_asset_status(&self.workspace, site_id, asset_id, status) {
            log::warn!("set status of {} failed: {}", asset_id, err);
            return;
        }

        let description = format!("set {} to {}", name, status);
        let undo_ws = Rc::clone(&self.workspace);
        let redo_ws = Rc::clone(&self.workspace);
        let (undo_site, undo_asset) = (site_id.clone(), asset_id.clone());
        let (redo_site, redo_asset) = (site_id.clone(), asset_id.clone());
        self.history.record(Action::new(
            description,
            move || set_asset_status(&undo_ws, &undo_site, &undo_asset, old),
            move || set_asset_status(&redo_ws, &redo_site, &redo_asset, status),
        ));
    }

    pub fn set_last_serviced(
        &mut self,
        site_id: &RecordId,
        asset_id: &RecordId,
        date: Option<NaiveDate>,
    ) {
        let (name, old) = bail!(
            self.workspace
                .borrow()
                .asset(site_id, asset_id)
                .map(|a| (a.name.clone(), a.last_serviced)),
            "set last serviced: no asset {}",
            asset_id
        );
        if old == date {
            return;
        }
        if let Err(err) = set_last_serviced(&self.workspace, site_id, asset_id, date) {
            log::warn!("set last serviced of {} failed: {}", asset_id, err);
            return;
        }

        let description = format!("set {} service date", name);
        let undo_ws = Rc::clone(&self.workspace);
        let redo_ws = Rc::clone(&self.workspace);
        let (undo_site, undo_asset) = (site_id.clone(), asset_id.clone());
        let (redo_site, redo_asset) = (site_id.clone(), asset_id.clone());
        self.history.record(Action::new(
            description,
            move || set_last_serviced(&undo_ws, &undo_site, &undo_asset, old),
            move || set_last_serviced(&redo_ws, &redo_site, &redo_asset, date),
        ));
    }

    pub fn add_quote_line(&mut self, quote_id: &RecordId, line: QuoteLine) {
        let index = bail!(
            self.workspace
                .borrow()
                .quotes
                .get(quote_id)
                .map(|q| q.lines.len()),
            "add line: no quote {}",
            quote_id
        );
        if let Err(err) = insert_quote_line(&self.workspace, quote_id, index, &line) {
            log::warn!("add line to {} failed: {}", quote_id, err);
            return;
        }

        let description = format!("add '{}'", line.description);
        let undo_ws = Rc::clone(&self.workspace);
        let redo_ws = Rc::clone(&self.workspace);
        let undo_id = quote_id.clone();
        let redo_id = quote_id.clone();
        self.history.record(Action::new(
            description,
            move || remove_quote_line(&undo_ws, &undo_id, index).map(|_| ()),
            move || insert_quote_line(&redo_ws, &redo_id, index, &line),
        ));
    }

    pub fn remove_quote_line(&mut self, quote_id: &RecordId, index: usize) {
        let line = bail!(
            self.workspace
                .borrow()
                .quotes
                .get(quote_id)
                .and_then(|q| q.lines.get(index))
                .cloned(),
            "remove line: no line {} on quote {}",
            index,
            quote_id
        );
        if let Err(err) = remove_quote_line(&self.workspace, quote_id, index) {
            log::warn!("remove line from {} failed: {}", quote_id, err);
            return;
        }

        let description = format!("remove '{}'", line.description);
        let undo_ws = Rc::clone(&self.workspace);
        let redo_ws = Rc::clone(&self.workspace);
        let undo_id = quote_id.clone();
        let redo_id = quote_id.clone();
        self.history.record(Action::new(
            description,
            move || insert_quote_line(&undo_ws, &undo_id, index, &line),
            move || remove_quote_line(&redo_ws, &redo_id, index).map(|_| ()),
        ));
    }

    pub fn set_quote_markup(&mut self, quote_id: &RecordId, index: usize, markup_percent: f64) {
        let old = bail!(
            self.workspace
                .borrow()
                .quotes
                .get(quote_id)
                .and_then(|q| q.lines.get(index))
                .map(|l| l.markup_percent),
            "set markup: no line {} on quote {}",
            index,
            quote_id
        );
        if (old - markup_percent).abs() < f64::EPSILON {
            return;
        }
        if let Err(err) = set_quote_markup(&self.workspace, quote_id, index, markup_percent) {
            log::warn!("set markup on {} failed: {}", quote_id, err);
            return;
        }

        let description = format!("set line {} markup to {}%", index + 1, markup_percent);
        let undo_ws = Rc::clone(&self.workspace);
        let redo_ws = Rc::clone(&self.workspace);
        let undo_id = quote_id.clone();
        let redo_id = quote_id.clone();
        self.history.record(Action::new(
            description,
            move || set_quote_markup(&undo_ws, &undo_id, index, old),
            move || set_quote_markup(&redo_ws, &redo_id, index, markup_percent),
        ));
    }
}

fn missing(what: &str, id: &RecordId) -> Box<dyn Error> {
    format!("no {} {}", what, id).into()
}

fn set_site_name(
    workspace: &Rc<RefCell<Workspace>>,
    id: &RecordId,
    name: &str,
) -> ActionResult {
    let mut ws = workspace.borrow_mut();
    let site = ws.site_mut(id).ok_or_else(|| missing("site", id))?;
    site.name = name.to_string();
    Ok(())
}

fn set_asset_status(
    workspace: &Rc<RefCell<Workspace>>,
    site: &RecordId,
    asset: &RecordId,
    status: AssetStatus,
) -> ActionResult {
    let mut ws = workspace.borrow_mut();
    let asset = ws
        .asset_mut(site, asset)
        .ok_or_else(|| missing("asset", asset))?;
    asset.status = status;
    Ok(())
}

fn set_last_serviced(
    workspace: &Rc<RefCell<Workspace>>,
    site: &RecordId,
    asset: &RecordId,
    date: Option<NaiveDate>,
) -> ActionResult {
    let mut ws = workspace.borrow_mut();
    let asset = ws
        .asset_mut(site, asset)
        .ok_or_else(|| missing("asset", asset))?;
    asset.last_serviced = date;
    Ok(())
}

fn insert_quote_line(
    workspace: &Rc<RefCell<Workspace>>,
    id: &RecordId,
    index: usize,
    line: &QuoteLine,
) -> ActionResult {
    let mut ws = workspace.borrow_mut();
    let quote = ws.quotes.get_mut(id).ok_or_else(|| missing("quote", id))?;
    if index > quote.lines.len() {
        return Err(format!("line index {} out of range on {}", index, id).into());
    }
    quote.lines.insert(index, line.clone());
    Ok(())
}

fn remove_quote_line(
    workspace: &Rc<RefCell<Workspace>>,
    id: &RecordId,
    index: usize,
) -> Result<QuoteLine, Box<dyn Error>> {
    let mut ws = workspace.borrow_mut();
    let quote = ws.quotes.get_mut(id).ok_or_else(|| missing("quote", id))?;
    if index >= quote.lines.len() {
        return Err(format!("line index {} out of range on {}", index, id).into());
    }
    Ok(quote.lines.remove(index))
}

fn set_quote_markup(
    workspace: &Rc<RefCell<Workspace>>,
    id: &RecordId,
    index: usize,
    markup_percent: f64,
) -> ActionResult {
    let mut ws = workspace.borrow_mut();
    let quote = ws.quotes.get_mut(id).ok_or_else(|| missing("quote", id))?;
    let line = quote
        .lines
        .get_mut(index)
        .ok_or_else(|| -> Box<dyn Error> {
            format!("line index {} out of range on {}", index, id).into()
        })?;
    line.markup_percent = markup_percent;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::Quote;
    use crate::site::{ConveyorAsset, Site};

    fn workspace_with_site() -> (Rc<RefCell<Workspace>>, RecordId, RecordId) {
        let mut site = Site::new("North Quarry", "Aggregate Co");
        let asset = ConveyorAsset::new("CV-101", 900, 42.0);
        let site_id = site.id.clone();
        let asset_id = asset.id.clone();
        site.assets.push(asset);

        let mut ws = Workspace::default();
        ws.upsert_site(site);
        (Rc::new(RefCell::new(ws)), site_id, asset_id)
    }

    fn workspace_with_quote() -> (Rc<RefCell<Workspace>>, RecordId) {
        let quote = Quote::new(
            RecordId::new("site-a"),
            "Q-2026-0001",
            NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
        );
        let quote_id = quote.id.clone();
        let mut ws = Workspace::default();
        ws.upsert_quote(quote);
        (Rc::new(RefCell::new(ws)), quote_id)
    }

    #[test]
    fn rename_round_trip() {
        let (ws, site_id, _) = workspace_with_site();
        let mut session = EditSession::new(Rc::clone(&ws));

        session.rename_site(&site_id, "North Quarry Stage 2");
        assert_eq!(ws.borrow().site(&site_id).unwrap().name, "North Quarry Stage 2");
        assert!(session.is_dirty());
        assert_eq!(
            session.undo_description(),
            Some("rename North Quarry to North Quarry Stage 2")
        );

        assert!(session.undo());
        assert_eq!(ws.borrow().site(&site_id).unwrap().name, "North Quarry");
        assert!(session.redo());
        assert_eq!(ws.borrow().site(&site_id).unwrap().name, "North Quarry Stage 2");
    }

    #[test]
    fn noop_edit_records_nothing() {
        let (ws, site_id, asset_id) = workspace_with_site();
        let mut session = EditSession::new(Rc::clone(&ws));

        session.rename_site(&site_id, "North Quarry");
        session.set_asset_status(&site_id, &asset_id, AssetStatus::Operational);
        assert!(!session.can_undo());
        assert!(!session.is_dirty());
    }

    #[test]
    fn status_change_round_trip() {
        let (ws, site_id, asset_id) = workspace_with_site();
        let mut session = EditSession::new(Rc::clone(&ws));

        session.set_asset_status(&site_id, &asset_id, AssetStatus::Critical);
        assert_eq!(session.undo_description(), Some("set CV-101 to critical"));

        assert!(session.undo());
        assert_eq!(
            ws.borrow().asset(&site_id, &asset_id).unwrap().status,
            AssetStatus::Operational
        );
    }

    #[test]
    fn quote_line_add_remove_round_trip() {
        let (ws, quote_id) = workspace_with_quote();
        let mut session = EditSession::new(Rc::clone(&ws));

        session.add_quote_line(&quote_id, QuoteLine::new("impact bed", 2, 48_000));
        session.add_quote_line(&quote_id, QuoteLine::new("skirting rubber", 10, 2_150));
        assert_eq!(ws.borrow().quotes[&quote_id].lines.len(), 2);

        session.remove_quote_line(&quote_id, 0);
        assert_eq!(ws.borrow().quotes[&quote_id].lines.len(), 1);
        assert_eq!(
            ws.borrow().quotes[&quote_id].lines[0].description,
            "skirting rubber"
        );

        // undo the removal puts the impact bed back at the front
        assert!(session.undo());
        assert_eq!(
            ws.borrow().quotes[&quote_id].lines[0].description,
            "impact bed"
        );

        // undo both adds
        assert!(session.undo());
        assert!(session.undo());
        assert!(ws.borrow().quotes[&quote_id].lines.is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn markup_change_round_trip() {
        let (ws, quote_id) = workspace_with_quote();
        let mut session = EditSession::new(Rc::clone(&ws));
        session.add_quote_line(&quote_id, QuoteLine::new("impact bed", 2, 48_000));

        session.set_quote_markup(&quote_id, 0, 25.0);
        assert_eq!(ws.borrow().quotes[&quote_id].lines[0].markup_percent, 25.0);
        assert!(session.undo());
        assert_eq!(ws.borrow().quotes[&quote_id].lines[0].markup_percent, 0.0);
    }

    #[test]
    fn undo_fails_cleanly_when_target_vanished() {
        let (ws, site_id, _) = workspace_with_site();
        let mut session = EditSession::new(Rc::clone(&ws));

        session.rename_site(&site_id, "North Quarry Stage 2");
        session.checkpoint();

        // a sync removal yanks the site out from under the session
        ws.borrow_mut().sites.remove(&site_id);

        assert!(!session.undo());
        assert!(!session.is_dirty());
        // the action stays queued; it works again if the site comes back
        assert!(session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn checkpoint_clears_dirty_only() {
        let (ws, site_id, _) = workspace_with_site();
        let mut session = EditSession::new(Rc::clone(&ws));

        session.rename_site(&site_id, "Renamed");
        session.checkpoint();
        assert!(!session.is_dirty());
        assert!(session.can_undo());

        session.clear_history();
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let (ws, _, _) = workspace_with_site();
        let a = EditSession::new(Rc::clone(&ws));
        let b = EditSession::new(Rc::clone(&ws));
        assert_ne!(a.id, b.id);
    }
}

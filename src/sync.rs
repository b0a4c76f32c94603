//! Keeping the workspace in step with the document store.
//!
//! Local writes are applied to the workspace immediately, then issued to the
//! store; the store's push notifications overwrite the local copy
//! unconditionally. Last writer wins; there is no merge and no detection of
//! lost concurrent edits. The optimistic write exists only so the UI doesn't
//! wait on the network.

use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

use crate::certification::Technician;
use crate::consts::collections;
use crate::data::Workspace;
use crate::entity::RecordId;
use crate::quote::Quote;
use crate::report::{ReportStatus, ServiceReport};
use crate::site::Site;
use crate::store::{BatchOp, ChangeEvent, ChangeKind, DocumentStore, StoreError, SubscriptionId};

/// Owns the store handle and the shared workspace the rest of the app reads.
pub struct SiteSync<S> {
    store: S,
    workspace: Rc<RefCell<Workspace>>,
    cache_path: Option<PathBuf>,
    subscriptions: Vec<SubscriptionId>,
}

impl<S: DocumentStore> SiteSync<S> {
    pub fn new(store: S) -> SiteSync<S> {
        SiteSync {
            store,
            workspace: Rc::new(RefCell::new(Workspace::default())),
            cache_path: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn with_cache(store: S, cache_path: impl Into<PathBuf>) -> SiteSync<S> {
        let mut sync = SiteSync::new(store);
        sync.cache_path = Some(cache_path.into());
        sync
    }

    /// A handle to the shared workspace; edit sessions hold clones of this.
    pub fn workspace(&self) -> Rc<RefCell<Workspace>> {
        Rc::clone(&self.workspace)
    }

    /// Direct access to the store, for plumbing the crate doesn't wrap.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Pre-fill the workspace from the local cache, if one exists.
    ///
    /// This is the offline fallback: the next store snapshot overwrites
    /// whatever the cache held.
    pub fn hydrate(&mut self) {
        let path = match &self.cache_path {
            Some(path) => path.clone(),
            None => return,
        };
        match Workspace::load_cache(&path) {
            Ok(Some(cached)) => {
                log::info!("hydrated workspace from cache {:?}", path);
                *self.workspace.borrow_mut() = cached;
            }
            Ok(None) => {}
            Err(err) => log::warn!("could not read cache {:?}: {}", path, err),
        }
    }

    /// Subscribe to every mirrored collection.
    ///
    /// The store replays a snapshot on subscribe, so attaching both fills
    /// the workspace and keeps it current from then on.
    pub fn attach(&mut self) {
        for collection in collections::ALL {
            let ws = Rc::clone(&self.workspace);
            let sub = self
                .store
                .subscribe(collection, Box::new(move |event| apply_event(&ws, event)));
            self.subscriptions.push(sub);
        }
    }

    pub fn detach(&mut self) {
        for sub in self.subscriptions.drain(..) {
            self.store.unsubscribe(sub);
        }
    }

    /// Rewrite the local cache from the current workspace.
    pub fn persist_cache(&self) -> Result<(), Box<dyn Error>> {
        if let Some(path) = &self.cache_path {
            self.workspace.borrow().save_cache(path)?;
        }
        Ok(())
    }

    pub fn upsert_site(&mut self, site: Site) -> Result<(), StoreError> {
        let id = site.id.clone();
        let doc = serde_json::to_value(&site)?;
        self.workspace.borrow_mut().upsert_site(site);
        self.store.set(collections::SITES, &id, doc)
    }

    pub fn upsert_technician(&mut self, technician: Technician) -> Result<(), StoreError> {
        let id = technician.id.clone();
        let doc = serde_json::to_value(&technician)?;
        self.workspace.borrow_mut().upsert_technician(technician);
        self.store.set(collections::TECHNICIANS, &id, doc)
    }

    pub fn upsert_report(&mut self, report: ServiceReport) -> Result<(), StoreError> {
        let id = report.id.clone();
        let doc = serde_json::to_value(&report)?;
        self.workspace.borrow_mut().upsert_report(report);
        self.store.set(collections::REPORTS, &id, doc)
    }

    pub fn upsert_quote(&mut self, quote: Quote) -> Result<(), StoreError> {
        let id = quote.id.clone();
        let doc = serde_json::to_value(&quote)?;
        self.workspace.borrow_mut().upsert_quote(quote);
        self.store.set(collections::QUOTES, &id, doc)
    }

    pub fn remove_site(&mut self, id: &RecordId) -> Result<(), StoreError> {
        self.workspace
            .borrow_mut()
            .remove_document(collections::SITES, id);
        self.store.delete(collections::SITES, id)
    }

    pub fn remove_quote(&mut self, id: &RecordId) -> Result<(), StoreError> {
        self.workspace
            .borrow_mut()
            .remove_document(collections::QUOTES, id);
        self.store.delete(collections::QUOTES, id)
    }

    /// Submit a draft report and stamp the serviced asset's last-serviced
    /// date, committed to the store as one batch.
    ///
    /// Returns `Ok(false)` if the report is missing or isn't a draft.
    pub fn submit_report(&mut self, report_id: &RecordId) -> Result<bool, StoreError> {
        let (report_doc, site_update) = {
            let mut ws = self.workspace.borrow_mut();
            let report = match ws.reports.get_mut(report_id) {
                Some(report) => report,
                None => return Ok(false),
            };
            if !report.advance_to(ReportStatus::Submitted) {
                return Ok(false);
            }
            let date = report.date;
            let site_id = report.site.clone();
            let asset_id = report.asset.clone();
            let report_doc = serde_json::to_value(&*report)?;

            let mut site_update = None;
            if let Some(asset_id) = asset_id {
                if let Some(asset) = ws.asset_mut(&site_id, &asset_id) {
                    asset.last_serviced = Some(date);
                    if let Some(site) = ws.site(&site_id) {
                        site_update = Some((site_id.clone(), serde_json::to_value(site)?));
                    }
                } else {
                    log::warn!("report {} names missing asset {}", report_id, asset_id);
                }
            }
            (report_doc, site_update)
        };

        let mut ops = vec![BatchOp::Set {
            collection: collections::REPORTS.to_string(),
            id: report_id.clone(),
            doc: report_doc,
        }];
        if let Some((site_id, doc)) = site_update {
            ops.push(BatchOp::Set {
                collection: collections::SITES.to_string(),
                id: site_id,
                doc,
            });
        }
        self.store.batch(ops)?;
        Ok(true)
    }
}

/// Apply one push notification to the shared workspace.
fn apply_event(workspace: &Rc<RefCell<Workspace>>, event: &ChangeEvent) {
    let mut ws = workspace.borrow_mut();
    match event.kind {
        ChangeKind::Removed => ws.remove_document(&event.collection, &event.id),
        ChangeKind::Added | ChangeKind::Modified => match &event.doc {
            Some(doc) => {
                if let Err(err) = ws.apply_document(&event.collection, &event.id, doc) {
                    log::warn!(
                        "ignoring malformed {} document {}: {}",
                        event.collection,
                        event.id,
                        err
                    );
                }
            }
            None => log::warn!(
                "{} change for {} carried no document",
                event.collection,
                event.id
            ),
        },
    }
}

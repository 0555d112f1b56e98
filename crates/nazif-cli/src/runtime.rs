// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use nazif_app::{
    ArchiveFilter, ArchiveRecord, ArchiveView, DraftState, FormSession, QuoteDraft, QuoteId,
    QuoteTotals, SessionCommand, SessionEvent, export_csv, filter_records, validate_for_archive,
};
use nazif_archive::{Client, ListFilters};
use nazif_store::DraftStore;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

/// Glues the draft store, the archive client and the form session together.
/// The archive client is optional; local drafting works without it.
pub struct QuoteRuntime<'a> {
    store: &'a DraftStore,
    archive: Option<Client>,
    session: FormSession,
    default_draft: QuoteDraft,
}

impl<'a> QuoteRuntime<'a> {
    pub fn new(
        store: &'a DraftStore,
        archive: Option<Client>,
        default_draft: QuoteDraft,
    ) -> Result<Self> {
        let session = FormSession::from_edit_id(store.load_edit_id()?);
        Ok(Self {
            store,
            archive,
            session,
            default_draft,
        })
    }

    pub fn state(&self) -> DraftState {
        self.session.state()
    }

    /// The saved draft, or a fresh one with the configured defaults.
    pub fn current_draft(&self) -> Result<QuoteDraft> {
        Ok(self
            .store
            .load_draft()?
            .unwrap_or_else(|| self.default_draft.clone()))
    }

    pub fn save_local(&self, draft: &QuoteDraft) -> Result<()> {
        self.store.save_draft(draft)
    }

    /// Re-saves after a successful archive write. A local hiccup here must
    /// not mask the archive outcome, so the failure is logged and swallowed.
    pub fn save_local_best_effort(&self, draft: &QuoteDraft) {
        self.store.save_draft_best_effort(draft);
    }

    /// Discards the working draft and leaves editing mode.
    pub fn start_new(&mut self) -> Result<QuoteDraft> {
        self.store.clear_draft()?;
        self.store.clear_edit_id()?;
        self.session.dispatch(SessionCommand::StartNew);
        Ok(self.default_draft.clone())
    }

    /// Sends the draft to the archive: insert when composing a new quote,
    /// update when editing an archived one. Afterwards the form stays in
    /// editing mode on the stored row, so a second save updates it.
    pub fn archive_save(&mut self, draft: &QuoteDraft) -> Result<ArchiveRecord> {
        validate_for_archive(draft)?;
        let client = require_client(&self.archive)?;

        let events = self.session.dispatch(SessionCommand::BeginArchiveSave);
        if events.contains(&SessionEvent::SaveRejected) {
            bail!("an archive save is already in progress");
        }

        let totals = QuoteTotals::compute(
            draft.subtotal,
            draft.discount,
            draft.discount_type,
            draft.tax_rate,
            draft.tax_mode,
        );
        let mut record = draft.to_archive_record(totals.total);

        let outcome = match self.session.state() {
            DraftState::New => {
                record.created_at = now_rfc3339().ok();
                client.insert(&record)
            }
            DraftState::Editing(id) => client.update(id, &record),
        };

        match outcome {
            Ok(stored) => {
                let id = stored
                    .id
                    .ok_or_else(|| anyhow!("archive returned a row without an id"))?;
                self.session.dispatch(SessionCommand::FinishArchiveSave(id));
                self.store.save_edit_id(id)?;
                info!(id = id.get(), "quote archived");
                Ok(stored)
            }
            Err(error) => {
                self.session.dispatch(SessionCommand::AbortArchiveSave);
                Err(error).context("archive save failed")
            }
        }
    }

    /// Pulls an archived quote into the form for editing. The row becomes
    /// the working draft and the edit marker survives restarts.
    pub fn open_for_edit(&mut self, id: QuoteId) -> Result<QuoteDraft> {
        let client = require_client(&self.archive)?;
        let record = client
            .get_by_id(id)?
            .ok_or_else(|| anyhow!("no archived quote with id {}", id.get()))?;

        let draft = QuoteDraft::from_archive_record(&record);
        self.store.save_draft(&draft)?;
        self.store.save_edit_id(id)?;
        self.session.dispatch(SessionCommand::OpenForEdit(id));
        Ok(draft)
    }

    /// Deletes an archived quote. Deleting the row currently open for edit
    /// drops the form back to composing a new quote.
    pub fn delete(&mut self, id: QuoteId) -> Result<()> {
        let client = require_client(&self.archive)?;
        client.delete(id)?;

        if self.session.state() == DraftState::Editing(id) {
            self.store.clear_edit_id()?;
            self.session.dispatch(SessionCommand::StartNew);
        }
        Ok(())
    }

    /// Fetches the rows matching the filter, newest first. Filters are
    /// pushed down to the archive and re-applied locally, so rows a stale
    /// server result sneaks in are still screened out.
    pub fn fetch_filtered(&self, filter: &ArchiveFilter) -> Result<Vec<ArchiveRecord>> {
        let client = require_client(&self.archive)?;
        let rows = client.list(&to_list_filters(filter))?;
        Ok(filter_records(&rows, filter).into_iter().cloned().collect())
    }

    /// One page of the filtered listing plus the total match count.
    pub fn list_page(&self, view: &ArchiveView) -> Result<(Vec<ArchiveRecord>, usize)> {
        let rows = self.fetch_filtered(view.filter())?;
        let total = rows.len();
        let page = view.page_of(&rows).into_iter().cloned().collect();
        Ok((page, total))
    }

    /// Renders every row matching the filter as CSV, ignoring pagination.
    pub fn export_filtered(&self, filter: &ArchiveFilter) -> Result<String> {
        let rows = self.fetch_filtered(filter)?;
        let refs: Vec<&ArchiveRecord> = rows.iter().collect();
        Ok(export_csv(&refs))
    }

}

fn require_client(archive: &Option<Client>) -> Result<&Client> {
    archive.as_ref().ok_or_else(|| {
        anyhow!("archive is not configured; set [archive] url, api_key and tenant in the config")
    })
}

fn to_list_filters(filter: &ArchiveFilter) -> ListFilters {
    let non_empty = |value: &str| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    };
    ListFilters {
        eq_date: non_empty(&filter.day),
        eq_month: non_empty(&filter.month),
        like_text: non_empty(&filter.text),
        limit: None,
        offset: None,
    }
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

#[cfg(test)]
mod tests {
    use super::{QuoteRuntime, to_list_filters};
    use anyhow::Result;
    use nazif_app::{ArchiveFilter, DraftState, QuoteDraft, QuoteId};
    use nazif_store::DraftStore;

    fn store() -> Result<DraftStore> {
        let store = DraftStore::open_memory()?;
        store.bootstrap()?;
        Ok(store)
    }

    #[test]
    fn filter_maps_onto_query_parameters() {
        let filters = to_list_filters(&ArchiveFilter {
            text: " villa ".to_owned(),
            day: String::new(),
            month: "2026-03".to_owned(),
        });
        assert_eq!(filters.like_text.as_deref(), Some("villa"));
        assert_eq!(filters.eq_date, None);
        assert_eq!(filters.eq_month.as_deref(), Some("2026-03"));
    }

    #[test]
    fn runtime_restores_editing_mode_from_the_store() -> Result<()> {
        let store = store()?;
        store.save_edit_id(QuoteId::new(12))?;

        let runtime = QuoteRuntime::new(&store, None, QuoteDraft::default())?;
        assert_eq!(runtime.state(), DraftState::Editing(QuoteId::new(12)));
        Ok(())
    }

    #[test]
    fn current_draft_falls_back_to_configured_defaults() -> Result<()> {
        let store = store()?;
        let mut defaults = QuoteDraft::default();
        defaults.currency = "USD".to_owned();

        let runtime = QuoteRuntime::new(&store, None, defaults)?;
        assert_eq!(runtime.current_draft()?.currency, "USD");

        let mut saved = QuoteDraft::default();
        saved.client = "Acme".to_owned();
        runtime.save_local(&saved)?;
        assert_eq!(runtime.current_draft()?.client, "Acme");
        Ok(())
    }

    #[test]
    fn start_new_clears_draft_and_edit_marker() -> Result<()> {
        let store = store()?;
        store.save_draft(&QuoteDraft::default())?;
        store.save_edit_id(QuoteId::new(3))?;

        let mut runtime = QuoteRuntime::new(&store, None, QuoteDraft::default())?;
        runtime.start_new()?;
        assert_eq!(runtime.state(), DraftState::New);
        assert!(store.load_draft()?.is_none());
        assert!(store.load_edit_id()?.is_none());
        Ok(())
    }

    #[test]
    fn archive_operations_without_a_client_fail_with_guidance() -> Result<()> {
        let store = store()?;
        let mut runtime = QuoteRuntime::new(&store, None, QuoteDraft::default())?;

        let draft = QuoteDraft {
            client: "Acme".to_owned(),
            place: "Riyadh".to_owned(),
            subtotal: 100.0,
            ..QuoteDraft::default()
        };
        let error = runtime
            .archive_save(&draft)
            .expect_err("save without client should fail");
        assert!(error.to_string().contains("archive is not configured"));

        let error = runtime
            .open_for_edit(QuoteId::new(1))
            .expect_err("open without client should fail");
        assert!(error.to_string().contains("archive is not configured"));
        Ok(())
    }

    #[test]
    fn invalid_draft_never_reaches_the_archive() -> Result<()> {
        let store = store()?;
        let mut runtime = QuoteRuntime::new(&store, None, QuoteDraft::default())?;

        // Invalid draft fails validation before the missing client matters.
        let error = runtime
            .archive_save(&QuoteDraft::default())
            .expect_err("empty draft should fail validation");
        assert!(error.to_string().contains("validation failed"));
        Ok(())
    }
}

//! The editing session for one financial year's target grid.
//!
//! [`GridEditor`] owns the committed grid, the edit buffer and the dirty
//! flag, and is the only thing that mutates them. Hosts drive it with
//! cell edits, navigation and year switches, then read back cell text,
//! totals, focus requests and notices to render.

use std::collections::VecDeque;

use target_core::calendar::month_index;
use target_core::grid::{CellKey, CommitOutcome, TargetGrid, TargetGridStore};
use target_core::guard::{ExitGuard, Guarded, Resolution, Resolved};
use target_core::navigation::{CellAddress, Direction, GridShape, step};
use target_core::sync::{LoadedGrid, PersistenceSync, SaveSummary, SyncError};
use target_core::{FinancialYear, RepositoryError, Service, StaffMember, TargetRepository};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Everything the editor needs to know up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContext {
    pub financial_year: FinancialYear,
    pub staff: Vec<StaffMember>,
    pub services: Vec<Service>,
}

/// Move focus to `address` once the host has rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusRequest {
    pub address: CellAddress,
    pub select_all: bool,
}

/// What the editor is waiting on. Set by [`GridEditor::begin_load`] and
/// [`GridEditor::begin_save`], cleared by the matching `finish_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorStatus {
    #[default]
    Idle,
    Loading,
    Saving,
}

/// Message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Cleared by the next change to the grid.
    Saved,
    /// Stays until dismissed or replaced.
    Error(String),
}

/// Outcome of asking to change financial year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSwitch {
    /// The new year is selected and loaded.
    Applied,
    /// Unsaved changes; the switch waits on [`GridEditor::resolve_prompt`].
    Prompted,
    /// The operator cancelled; nothing changed.
    Stayed,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("no staff member with id {0}")]
    UnknownStaff(i64),

    #[error("no service named '{0}'")]
    UnknownService(String),

    #[error("{0} is not a calendar month")]
    UnknownMonth(u32),

    #[error("a load or save is already running")]
    Busy,
}

/// A save taken from the editor by [`GridEditor::begin_save`].
///
/// Holds its own copy of the grid, so the editor stays readable (and
/// editable) while [`SaveJob::run`] is pending.
#[derive(Debug, Clone)]
pub struct SaveJob {
    financial_year: FinancialYear,
    grid: TargetGrid,
    services: Vec<Service>,
    revision: u64,
}

impl SaveJob {
    pub async fn run<R>(
        &self,
        repo: &R,
    ) -> Result<SaveSummary, SyncError>
    where
        R: TargetRepository + ?Sized,
    {
        PersistenceSync::save(repo, &self.financial_year, &self.grid, &self.services).await
    }
}

/// A load taken from the editor by [`GridEditor::begin_load`].
#[derive(Debug, Clone)]
pub struct LoadJob {
    financial_year: FinancialYear,
    staff: Vec<StaffMember>,
    services: Vec<Service>,
}

impl LoadJob {
    pub async fn run<R>(
        &self,
        repo: &R,
    ) -> Result<LoadedGrid, SyncError>
    where
        R: TargetRepository + ?Sized,
    {
        PersistenceSync::load(repo, &self.financial_year, &self.staff, &self.services).await
    }
}

pub struct GridEditor {
    context: EditorContext,
    store: TargetGridStore,
    guard: ExitGuard<FinancialYear>,
    focus_queue: VecDeque<FocusRequest>,
    status: EditorStatus,
    notice: Option<Notice>,
    /// Bumped on every changed commit.
    revision: u64,
}

impl GridEditor {
    /// An editor with an unpopulated grid. Call [`GridEditor::load`] to
    /// fill it.
    pub fn new(context: EditorContext) -> Self {
        Self {
            context,
            store: TargetGridStore::default(),
            guard: ExitGuard::new(),
            focus_queue: VecDeque::new(),
            status: EditorStatus::Idle,
            notice: None,
            revision: 0,
        }
    }

    /// An editor over an already built grid, e.g. one hydrated from an
    /// imported file.
    pub fn with_grid(
        context: EditorContext,
        grid: TargetGrid,
    ) -> Self {
        let mut editor = Self::new(context);
        editor.store.replace(grid);
        editor
    }

    pub fn financial_year(&self) -> &FinancialYear {
        &self.context.financial_year
    }

    pub fn staff(&self) -> &[StaffMember] {
        &self.context.staff
    }

    pub fn services(&self) -> &[Service] {
        &self.context.services
    }

    pub fn grid(&self) -> &TargetGrid {
        self.store.grid()
    }

    pub fn status(&self) -> EditorStatus {
        self.status
    }

    pub fn is_saving(&self) -> bool {
        self.status == EditorStatus::Saving
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// For the host's page-exit hook.
    pub fn has_unsaved_changes(&self) -> bool {
        self.guard.has_unsaved_changes()
    }

    pub fn is_prompting(&self) -> bool {
        self.guard.is_prompting()
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.context.staff.len(), self.context.services.len())
    }

    // ── cells ────────────────────────────────────────────────────────────

    /// Identity of the cell at a grid position.
    pub fn key_at(
        &self,
        address: CellAddress,
    ) -> Option<CellKey> {
        let member = self.context.staff.get(address.staff)?;
        let service = self.context.services.get(address.service)?;
        Some(CellKey::new(
            member.staff_id,
            address.calendar_month()?,
            service.service_name.clone(),
        ))
    }

    /// Grid position of a cell named by staff id, service name and
    /// calendar month.
    pub fn address_of(
        &self,
        staff_id: i64,
        service_name: &str,
        month: u32,
    ) -> Result<CellAddress, EditorError> {
        let staff = self
            .context
            .staff
            .iter()
            .position(|m| m.staff_id == staff_id)
            .ok_or(EditorError::UnknownStaff(staff_id))?;
        let service = self
            .context
            .services
            .iter()
            .position(|s| s.service_name == service_name)
            .ok_or_else(|| EditorError::UnknownService(service_name.to_string()))?;
        let month_idx = month_index(month).ok_or(EditorError::UnknownMonth(month))?;
        Ok(CellAddress::new(staff, service, month_idx))
    }

    pub fn read_cell(
        &self,
        key: &CellKey,
    ) -> Option<String> {
        self.store.read_cell(key)
    }

    pub fn stage_edit(
        &mut self,
        key: CellKey,
        raw: impl Into<String>,
    ) {
        self.store.stage_edit(key, raw);
    }

    /// Commit `raw` into the grid. A changed value marks the grid dirty and
    /// clears a [`Notice::Saved`].
    pub fn commit_edit(
        &mut self,
        key: &CellKey,
        raw: &str,
    ) -> CommitOutcome {
        let outcome = self.store.commit_edit(key, raw);
        match outcome {
            CommitOutcome::Changed { .. } => {
                self.revision += 1;
                self.guard.mark_dirty();
                if self.notice == Some(Notice::Saved) {
                    self.notice = None;
                }
            }
            CommitOutcome::Rejected => warn!(?key, raw, "cell input reverted"),
            CommitOutcome::Unchanged => {}
        }
        outcome
    }

    /// Commit whatever is buffered for `key`, if anything.
    pub fn commit_pending(
        &mut self,
        key: &CellKey,
    ) -> Option<CommitOutcome> {
        let raw = self.store.buffer().get(key)?.to_string();
        Some(self.commit_edit(key, &raw))
    }

    /// Leave the cell at `from` in `direction`.
    ///
    /// The buffered text of the cell being left is committed first. The
    /// target cell is returned and a [`FocusRequest`] for it is queued.
    pub fn navigate(
        &mut self,
        from: CellAddress,
        direction: Direction,
    ) -> Option<CellAddress> {
        if let Some(key) = self.key_at(from) {
            self.commit_pending(&key);
        }

        let target = step(from, direction, self.shape())?;
        self.focus_queue.push_back(FocusRequest {
            address: target,
            select_all: true,
        });
        Some(target)
    }

    /// Focus requests raised since the last call, oldest first.
    pub fn take_focus_requests(&mut self) -> Vec<FocusRequest> {
        self.focus_queue.drain(..).collect()
    }

    // ── totals ───────────────────────────────────────────────────────────

    pub fn monthly_total(
        &self,
        staff_id: i64,
        month: u32,
    ) -> u64 {
        self.store.grid().monthly_total(staff_id, month)
    }

    pub fn annual_total(
        &self,
        staff_id: i64,
        service_name: &str,
    ) -> u64 {
        self.store.grid().annual_total(staff_id, service_name)
    }

    pub fn staff_annual_total(
        &self,
        staff_id: i64,
    ) -> u64 {
        self.store.grid().staff_annual_total(staff_id)
    }

    // ── persistence ──────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<(), EditorError> {
        match self.status {
            EditorStatus::Idle => Ok(()),
            _ => Err(EditorError::Busy),
        }
    }

    /// Start loading the current year; status becomes
    /// [`EditorStatus::Loading`] until [`GridEditor::finish_load`].
    pub fn begin_load(&mut self) -> Result<LoadJob, EditorError> {
        self.ensure_idle()?;
        self.status = EditorStatus::Loading;
        Ok(LoadJob {
            financial_year: self.context.financial_year.clone(),
            staff: self.context.staff.clone(),
            services: self.context.services.clone(),
        })
    }

    /// Install the result of a [`LoadJob`]. Returns the number of stored
    /// rows left out of the grid.
    ///
    /// On failure the grid is left empty and an error notice is raised.
    /// Either way the edit buffer is dropped and the grid is clean.
    pub fn finish_load(
        &mut self,
        result: Result<LoadedGrid, SyncError>,
    ) -> Result<usize, EditorError> {
        self.status = EditorStatus::Idle;
        self.guard.mark_clean();

        match result {
            Ok(loaded) => {
                let rejected = loaded.rejected.len();
                self.store.replace(loaded.grid);
                Ok(rejected)
            }
            Err(e) => {
                self.store.clear();
                self.notice = Some(Notice::Error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Replace the grid with the stored targets for the current year.
    pub async fn load<R>(
        &mut self,
        repo: &R,
    ) -> Result<usize, EditorError>
    where
        R: TargetRepository + ?Sized,
    {
        let job = self.begin_load()?;
        let result = job.run(repo).await;
        self.finish_load(result)
    }

    /// Start saving the grid as it stands; status becomes
    /// [`EditorStatus::Saving`] until [`GridEditor::finish_save`].
    pub fn begin_save(&mut self) -> Result<SaveJob, EditorError> {
        self.ensure_idle()?;
        self.status = EditorStatus::Saving;
        Ok(SaveJob {
            financial_year: self.context.financial_year.clone(),
            grid: self.store.grid().clone(),
            services: self.context.services.clone(),
            revision: self.revision,
        })
    }

    /// Install the result of a [`SaveJob`].
    ///
    /// Success raises [`Notice::Saved`] and clears the dirty flag, unless
    /// the grid changed after the job was taken. Failure raises an error
    /// notice and leaves the dirty flag set so the save can be retried.
    pub fn finish_save(
        &mut self,
        job: &SaveJob,
        result: Result<SaveSummary, SyncError>,
    ) -> Result<SaveSummary, EditorError> {
        self.status = EditorStatus::Idle;

        match result {
            Ok(summary) => {
                if job.revision == self.revision {
                    self.guard.mark_clean();
                }
                self.notice = Some(Notice::Saved);
                Ok(summary)
            }
            Err(e) => {
                self.notice = Some(Notice::Error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Write the grid for the current year.
    pub async fn save<R>(
        &mut self,
        repo: &R,
    ) -> Result<SaveSummary, EditorError>
    where
        R: TargetRepository + ?Sized,
    {
        let job = self.begin_save()?;
        let result = job.run(repo).await;
        self.finish_save(&job, result)
    }

    // ── financial year ───────────────────────────────────────────────────

    /// Ask to move to `fy`. With no unsaved changes the switch happens at
    /// once; otherwise it is parked until the prompt is resolved.
    pub async fn request_year_switch<R>(
        &mut self,
        repo: &R,
        fy: FinancialYear,
    ) -> Result<YearSwitch, EditorError>
    where
        R: TargetRepository + ?Sized,
    {
        match self.guard.request(fy) {
            Guarded::Proceed(fy) => {
                self.apply_year(repo, fy).await?;
                Ok(YearSwitch::Applied)
            }
            Guarded::Prompt => {
                debug!("year switch waiting on unsaved-changes prompt");
                Ok(YearSwitch::Prompted)
            }
        }
    }

    /// Settle a pending year switch.
    ///
    /// With [`Resolution::SaveAndContinue`] a failed save drops the
    /// pending switch, keeps the current year and returns the save error.
    pub async fn resolve_prompt<R>(
        &mut self,
        repo: &R,
        resolution: Resolution,
    ) -> Result<YearSwitch, EditorError>
    where
        R: TargetRepository + ?Sized,
    {
        match self.guard.resolve(resolution) {
            Resolved::SaveThen(fy) => {
                self.save(repo).await?;
                self.apply_year(repo, fy).await?;
                Ok(YearSwitch::Applied)
            }
            Resolved::Apply(fy) => {
                info!(%fy, "discarding unsaved changes");
                self.apply_year(repo, fy).await?;
                Ok(YearSwitch::Applied)
            }
            Resolved::Stay => Ok(YearSwitch::Stayed),
        }
    }

    async fn apply_year<R>(
        &mut self,
        repo: &R,
        fy: FinancialYear,
    ) -> Result<(), EditorError>
    where
        R: TargetRepository + ?Sized,
    {
        debug!(from = %self.context.financial_year, to = %fy, "switching financial year");
        self.context.financial_year = fy;
        self.load(repo).await?;
        Ok(())
    }
}

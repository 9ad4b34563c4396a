//! Unsaved-changes tracking and the confirmation flow that guards actions
//! which would throw those changes away.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyState {
    #[default]
    Clean,
    Dirty,
}

/// How the operator answered the unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    SaveAndContinue,
    Discard,
    Cancel,
}

/// Answer to a guarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<A> {
    /// Nothing unsaved; carry out the action now.
    Proceed(A),
    /// The action was parked and a prompt must be shown.
    Prompt,
}

/// What to do once the prompt is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<A> {
    /// Save first; carry out the action only if the save succeeds.
    SaveThen(A),
    /// Carry out the action without saving.
    Apply(A),
    /// Stay where we are.
    Stay,
}

/// Dirty flag plus at most one parked action of type `A`.
#[derive(Debug, Clone)]
pub struct ExitGuard<A> {
    state: DirtyState,
    pending: Option<A>,
}

impl<A> Default for ExitGuard<A> {
    fn default() -> Self {
        Self {
            state: DirtyState::Clean,
            pending: None,
        }
    }
}

impl<A> ExitGuard<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DirtyState {
        self.state
    }

    /// What a page-unload hook should consult.
    pub fn has_unsaved_changes(&self) -> bool {
        self.state == DirtyState::Dirty
    }

    pub fn mark_dirty(&mut self) {
        if self.state == DirtyState::Clean {
            debug!("grid now has unsaved changes");
        }
        self.state = DirtyState::Dirty;
    }

    /// Called after a successful save or a fresh load.
    pub fn mark_clean(&mut self) {
        self.state = DirtyState::Clean;
    }

    pub fn pending(&self) -> Option<&A> {
        self.pending.as_ref()
    }

    pub fn is_prompting(&self) -> bool {
        self.pending.is_some()
    }

    /// Ask to carry out `action`. While dirty the action is parked,
    /// replacing any action already waiting.
    pub fn request(
        &mut self,
        action: A,
    ) -> Guarded<A> {
        match self.state {
            DirtyState::Clean => Guarded::Proceed(action),
            DirtyState::Dirty => {
                self.pending = Some(action);
                Guarded::Prompt
            }
        }
    }

    /// Settle the prompt. The parked action is always taken out; with no
    /// parked action every answer is [`Resolved::Stay`].
    pub fn resolve(
        &mut self,
        resolution: Resolution,
    ) -> Resolved<A> {
        let Some(action) = self.pending.take() else {
            return Resolved::Stay;
        };
        match resolution {
            Resolution::SaveAndContinue => Resolved::SaveThen(action),
            Resolution::Discard => Resolved::Apply(action),
            Resolution::Cancel => Resolved::Stay,
        }
    }
}

//! Loop routing: continue with the next slide or go merge.

use crate::domain::PipelineRunState;

/// Outcome of routing after a slide is accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// More slides remain
    Continue,
    /// Every slide has been visited
    Done,
}

/// `Done` iff the cursor has reached the slide count. Pure.
pub fn route(state: &PipelineRunState) -> Route {
    if state.cursor() >= state.total() {
        Route::Done
    } else {
        Route::Continue
    }
}

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::flow::MAIN_STREAM;
use crate::step::Step;

/// A return address for a sub-stream descent: the stream and index at which
/// to resume once the descended-into stream is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub stream_name: String,
    pub step_index: usize,
}

impl StackFrame {
    pub fn new(stream_name: impl Into<String>, step_index: usize) -> Self {
        Self {
            stream_name: stream_name.into(),
            step_index,
        }
    }
}

/// The per-turn position record: which step of which stream is in focus,
/// plus the suspended return addresses of sub-stream descents.
///
/// Cursors are immutable by convention. Every transition produces a new
/// value; no cursor is shared mutably across recursive engine calls.
#[derive(Clone)]
pub struct Cursor {
    pub stream_name: String,
    pub step_index: usize,
    /// True only during the turn's first engine pass, where unsatisfied
    /// steps extract information instead of prompting.
    pub is_first_run: bool,
    /// Routing hint: run the step's fallback instead of its prompt.
    pub run_fallback: bool,
    /// Set by the engine when a fallback actually ran.
    pub ran_fallback: bool,
    /// The unsatisfied step recorded by the first pass, if any.
    pub currently_active_step: Option<Rc<Step>>,
    pub stream_stack: Vec<StackFrame>,
}

impl Cursor {
    /// The entry position: the `main` stream, first step, first run.
    pub fn initial() -> Self {
        Self {
            stream_name: MAIN_STREAM.to_string(),
            step_index: 0,
            is_first_run: true,
            run_fallback: false,
            ran_fallback: false,
            currently_active_step: None,
            stream_stack: Vec::new(),
        }
    }

    /// Moves to the start of another stream, keeping all flags and the
    /// return stack. Used for pointer resolution and in-prompt redirects.
    pub fn at_stream(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = stream_name.into();
        self.step_index = 0;
        self
    }

    /// A routing decision: jump to the start of a stream for execution.
    /// Clears the first-run flag.
    pub fn routed_to(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = stream_name.into();
        self.step_index = 0;
        self.is_first_run = false;
        self
    }

    /// Advances to the next step of the current stream.
    pub fn advanced(mut self) -> Self {
        self.step_index += 1;
        self
    }

    /// Descends into `target`, pushing a frame that resumes after the
    /// current step.
    pub fn descended(mut self, target: impl Into<String>) -> Self {
        self.stream_stack.push(StackFrame {
            stream_name: std::mem::take(&mut self.stream_name),
            step_index: self.step_index + 1,
        });
        self.stream_name = target.into();
        self.step_index = 0;
        self
    }

    pub fn with_first_run(mut self, is_first_run: bool) -> Self {
        self.is_first_run = is_first_run;
        self
    }

    pub fn with_fallback_request(mut self) -> Self {
        self.run_fallback = true;
        self
    }

    pub fn with_ran_fallback(mut self) -> Self {
        self.ran_fallback = true;
        self
    }

    pub fn with_active_step(mut self, step: Rc<Step>) -> Self {
        self.currently_active_step = Some(step);
        self
    }

    pub fn with_stack(mut self, stream_stack: Vec<StackFrame>) -> Self {
        self.stream_stack = stream_stack;
        self
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("stream_name", &self.stream_name)
            .field("step_index", &self.step_index)
            .field("is_first_run", &self.is_first_run)
            .field("run_fallback", &self.run_fallback)
            .field("ran_fallback", &self.ran_fallback)
            .field(
                "currently_active_step",
                &self.currently_active_step.as_ref().map(Rc::as_ptr),
            )
            .field("stream_stack", &self.stream_stack)
            .finish()
    }
}

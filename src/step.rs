use std::fmt;
use std::rc::Rc;

use crate::message::MessagePart;

/// The instruction a prompt hands back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Advance past the current step and keep running.
    Proceed,
    /// Restart execution at the start of the named stream.
    Route(String),
}

/// The callback a suspending prompt must invoke, exactly once, to resume
/// engine execution. Passing `None` ends the turn without advancement.
pub type Continuation = Box<dyn FnOnce(Option<Signal>)>;

/// A step's prompting capability.
///
/// The two variants make the suspension point explicit instead of sniffing
/// function arity at call time: a `Sync` prompt returns its signal
/// immediately, a `Suspending` prompt receives the continuation and may
/// invoke it at any later point. The engine never blocks on a suspension;
/// it returns control to its caller and resumes inside the continuation.
pub enum Prompt {
    Sync(Box<dyn Fn() -> Option<Signal>>),
    Suspending(Box<dyn Fn(Continuation)>),
}

/// A unit of conversational logic.
///
/// Steps are authored against a fixed capability set; [`StepBuilder`]
/// supplies defaults for everything left out. The engine treats steps as
/// opaque beyond this contract and never mutates them. Identity is object
/// identity: share a step between streams by cloning its `Rc`.
pub struct Step {
    extract_info: Box<dyn Fn(&MessagePart)>,
    satisfied: Box<dyn Fn() -> bool>,
    prompt: Prompt,
    next: Box<dyn Fn() -> Option<String>>,
    expects: Box<dyn Fn() -> Vec<String>>,
    fallback: Option<Box<dyn Fn()>>,
}

impl Step {
    pub fn builder() -> StepBuilder {
        StepBuilder::new()
    }

    /// Pulls slot values out of the current message part.
    pub fn extract_info(&self, part: &MessagePart) {
        (self.extract_info)(part)
    }

    pub fn is_satisfied(&self) -> bool {
        (self.satisfied)()
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// The stream this step redirects to after it is satisfied, if any.
    pub fn next_stream(&self) -> Option<String> {
        (self.next)()
    }

    /// Classification displays this step claims for itself while active.
    pub fn expects(&self) -> Vec<String> {
        (self.expects)()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Runs the fallback if one is defined. Returns whether it ran.
    pub fn run_fallback(&self) -> bool {
        match &self.fallback {
            Some(fallback) => {
                fallback();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("has_fallback", &self.has_fallback())
            .finish_non_exhaustive()
    }
}

/// Builds a [`Step`], filling in the default behavior for every capability
/// not overridden: satisfied, silent, promptless and with no redirect.
pub struct StepBuilder {
    extract_info: Box<dyn Fn(&MessagePart)>,
    satisfied: Box<dyn Fn() -> bool>,
    prompt: Prompt,
    next: Box<dyn Fn() -> Option<String>>,
    expects: Box<dyn Fn() -> Vec<String>>,
    fallback: Option<Box<dyn Fn()>>,
}

impl StepBuilder {
    pub fn new() -> Self {
        Self {
            extract_info: Box::new(|_| {}),
            satisfied: Box::new(|| true),
            prompt: Prompt::Sync(Box::new(|| None)),
            next: Box::new(|| None),
            expects: Box::new(Vec::new),
            fallback: None,
        }
    }

    pub fn extract_info(mut self, f: impl Fn(&MessagePart) + 'static) -> Self {
        self.extract_info = Box::new(f);
        self
    }

    pub fn satisfied(mut self, f: impl Fn() -> bool + 'static) -> Self {
        self.satisfied = Box::new(f);
        self
    }

    /// A synchronous prompt: its return value is processed immediately.
    pub fn prompt(mut self, f: impl Fn() -> Option<Signal> + 'static) -> Self {
        self.prompt = Prompt::Sync(Box::new(f));
        self
    }

    /// A suspending prompt: the engine hands it the continuation and
    /// returns control to the caller until the continuation is invoked.
    pub fn prompt_suspending(mut self, f: impl Fn(Continuation) + 'static) -> Self {
        self.prompt = Prompt::Suspending(Box::new(f));
        self
    }

    pub fn next(mut self, f: impl Fn() -> Option<String> + 'static) -> Self {
        self.next = Box::new(f);
        self
    }

    pub fn expects(mut self, f: impl Fn() -> Vec<String> + 'static) -> Self {
        self.expects = Box::new(f);
        self
    }

    pub fn fallback(mut self, f: impl Fn() + 'static) -> Self {
        self.fallback = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Rc<Step> {
        Rc::new(Step {
            extract_info: self.extract_info,
            satisfied: self.satisfied,
            prompt: self.prompt,
            next: self.next,
            expects: self.expects,
            fallback: self.fallback,
        })
    }
}

impl Default for StepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use std::{error::Error, time::Duration};

use tracing::{debug, warn};

use crate::addon::InstallRequest;

/// Result of a lifecycle hook
pub type HookResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Input the cluster understands, already mapped from buttons or touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Back,
    OpenSettings,
    ToggleTelemetryMode,
    Install(InstallRequest),
    /// Console address typed by the user, validated by the screen that takes it
    SetConsoleIp(String),
}

/// Where screens draw. Rendering proper lives behind this.
pub trait Surface {
    fn clear(&mut self);
    /// Place `text` in the named slot of the current screen layout
    fn put_text(&mut self, slot: &str, text: &str);
}

/// A navigation request made by the top screen
pub enum Transition {
    Push(Box<dyn Screen>),
    Replace(Box<dyn Screen>),
    Pop,
}

pub enum InputOutcome {
    Ignored,
    Consumed,
    /// Consumed, and the screen asks to navigate
    Navigate(Transition),
}

/// One full screen UI state.
///
/// Lifecycle is `enter`, then any number of input/update/draw calls while the
/// screen is on top, then `exit`. A screen that is covered and later uncovered
/// is entered again.
pub trait Screen {
    fn name(&self) -> &str;

    fn enter(&mut self) -> HookResult {
        Ok(())
    }

    fn exit(&mut self) -> HookResult {
        Ok(())
    }

    fn handle_input(&mut self, event: &InputEvent) -> InputOutcome;

    fn update(&mut self, _dt: Duration) -> Option<Transition> {
        None
    }

    fn draw(&mut self, surface: &mut dyn Surface);
}

/// Stack of screens where only the top is live.
///
/// Every operation leaves exactly one outstanding `enter` (the top's) and never
/// lets a failing hook stop the navigation.
#[derive(Default)]
pub struct ScreenStack {
    stack: Vec<Box<dyn Screen>>,
}

impl ScreenStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(screen: Box<dyn Screen>) -> Self {
        let mut stack = Self::new();
        stack.push(screen);
        stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn top_name(&self) -> Option<&str> {
        self.stack.last().map(|screen| screen.name())
    }

    /// Cover the current top with `screen`
    pub fn push(&mut self, mut screen: Box<dyn Screen>) {
        if let Some(top) = self.stack.last_mut() {
            exit_screen(top.as_mut());
        }
        enter_screen(screen.as_mut());
        self.stack.push(screen);
    }

    /// Swap the current top for `screen`
    pub fn replace(&mut self, mut screen: Box<dyn Screen>) {
        if let Some(mut top) = self.stack.pop() {
            exit_screen(top.as_mut());
        }
        enter_screen(screen.as_mut());
        self.stack.push(screen);
    }

    /// Remove the top and re-enter whatever it uncovers. No-op when empty.
    pub fn pop(&mut self) {
        let Some(mut top) = self.stack.pop() else {
            return;
        };
        exit_screen(top.as_mut());
        if let Some(next) = self.stack.last_mut() {
            enter_screen(next.as_mut());
        }
    }

    /// Exit the top and drop every screen
    pub fn clear(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            exit_screen(top.as_mut());
        }
        self.stack.clear();
    }

    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Push(screen) => self.push(screen),
            Transition::Replace(screen) => self.replace(screen),
            Transition::Pop => self.pop(),
        }
    }

    /// Deliver `event` to the top screen only. Returns whether it was consumed.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        let Some(top) = self.stack.last_mut() else {
            return false;
        };
        match top.handle_input(event) {
            InputOutcome::Ignored => false,
            InputOutcome::Consumed => true,
            InputOutcome::Navigate(transition) => {
                self.apply(transition);
                true
            }
        }
    }

    pub fn update(&mut self, dt: Duration) {
        let transition = match self.stack.last_mut() {
            Some(top) => top.update(dt),
            None => return,
        };
        if let Some(transition) = transition {
            self.apply(transition);
        }
    }

    pub fn draw(&mut self, surface: &mut dyn Surface) {
        if let Some(top) = self.stack.last_mut() {
            top.draw(surface);
        }
    }
}

fn enter_screen(screen: &mut dyn Screen) {
    debug!("Entering {}", screen.name());
    if let Err(err) = screen.enter() {
        warn!("{} failed to enter: {}", screen.name(), err);
    }
}

fn exit_screen(screen: &mut dyn Screen) {
    debug!("Exiting {}", screen.name());
    if let Err(err) = screen.exit() {
        warn!("{} failed to exit cleanly: {}", screen.name(), err);
    }
}

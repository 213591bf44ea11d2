//! Command-style history entries.
//!
//! Instead of supplying undo/redo data payloads for the caller to replay,
//! a caller may hand the engine an executable command: a pair of zero-argument
//! operations closing over caller-owned state. The engine invokes `backward()`
//! on undo and `forward()` on redo directly.

/// A reversible operation carried by a command-mode history entry.
pub trait Command {
    /// Apply the forward effect.
    fn forward(&mut self);

    /// Apply the inverse effect.
    fn backward(&mut self);
}

/// A command built from two closures.
pub struct FnCommand {
    forward: Box<dyn FnMut()>,
    backward: Box<dyn FnMut()>,
}

impl FnCommand {
    pub fn new(forward: impl FnMut() + 'static, backward: impl FnMut() + 'static) -> Self {
        Self {
            forward: Box::new(forward),
            backward: Box::new(backward),
        }
    }
}

impl Command for FnCommand {
    fn forward(&mut self) {
        (self.forward)();
    }

    fn backward(&mut self) {
        (self.backward)();
    }
}

/// An ordered sequence of commands undone/redone as one step.
///
/// `forward()` applies the sequence front-to-back; `backward()` applies
/// inverses strictly back-to-front. The reversal is required whenever
/// sub-commands are not independent (e.g. "add track" then "add clip to
/// track": undoing must remove the clip before the track).
#[derive(Default)]
pub struct BatchCommand {
    commands: Vec<Box<dyn Command>>,
}

impl BatchCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sub-command to the end of the sequence.
    pub fn push(&mut self, command: impl Command + 'static) {
        self.commands.push(Box::new(command));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for BatchCommand {
    fn forward(&mut self) {
        for command in &mut self.commands {
            command.forward();
        }
    }

    fn backward(&mut self) {
        for command in self.commands.iter_mut().rev() {
            command.backward();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fn_command_invokes_closures() {
        let value = Rc::new(RefCell::new(0));
        let (fwd, bwd) = (value.clone(), value.clone());
        let mut command = FnCommand::new(
            move || *fwd.borrow_mut() += 1,
            move || *bwd.borrow_mut() -= 1,
        );

        command.forward();
        command.forward();
        assert_eq!(*value.borrow(), 2);

        command.backward();
        assert_eq!(*value.borrow(), 1);
    }

    #[test]
    fn batch_forward_applies_in_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut batch = BatchCommand::new();
        for name in ["a", "b", "c"] {
            let (fwd, bwd) = (log.clone(), log.clone());
            batch.push(FnCommand::new(
                move || fwd.borrow_mut().push(format!("+{name}")),
                move || bwd.borrow_mut().push(format!("-{name}")),
            ));
        }
        assert_eq!(batch.len(), 3);

        batch.forward();
        assert_eq!(*log.borrow(), vec!["+a", "+b", "+c"]);
    }

    #[test]
    fn batch_backward_applies_in_strict_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut batch = BatchCommand::new();
        for name in ["a", "b", "c"] {
            let (fwd, bwd) = (log.clone(), log.clone());
            batch.push(FnCommand::new(
                move || fwd.borrow_mut().push(format!("+{name}")),
                move || bwd.borrow_mut().push(format!("-{name}")),
            ));
        }

        batch.backward();
        assert_eq!(*log.borrow(), vec!["-c", "-b", "-a"]);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut batch = BatchCommand::new();
        assert!(batch.is_empty());
        batch.forward();
        batch.backward();
    }
}

//! Action programs executed by Normal units.
//!
//! A program is an ordered list of action groups, each an ordered list of
//! commands. The unit walks the flattened command sequence with a
//! [`ProgramCursor`] and loops back to the start after the last group.

use serde::{Deserialize, Serialize};

use crate::signal::is_readiness_signal;
use crate::time::Ticks;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A single program step. The command set is closed; anything richer
/// (jumps, waits, routing) belongs to the scripting layer that compiles
/// down to these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Set one of the owning unit's signals. Instantaneous.
    SetSignal { signal: String, value: bool },
    /// Suspend the owning unit for `duration` ticks.
    Delay {
        duration: Ticks,
        /// Carried through from the authoring layer; does not change
        /// execution.
        affects_previous: bool,
        description: String,
    },
}

impl Command {
    pub fn set_signal(signal: impl Into<String>, value: bool) -> Self {
        Command::SetSignal {
            signal: signal.into(),
            value,
        }
    }

    pub fn delay(duration: Ticks) -> Self {
        Command::Delay {
            duration,
            affects_previous: false,
            description: String::new(),
        }
    }

    pub fn described_delay(duration: Ticks, description: impl Into<String>) -> Self {
        Command::Delay {
            duration,
            affects_previous: false,
            description: description.into(),
        }
    }

    /// True for `SetSignal(<x>_load_enable, true)`: the one command a unit
    /// may run while waiting for a product.
    pub fn is_readiness_assertion(&self) -> bool {
        matches!(self, Command::SetSignal { signal, value: true } if is_readiness_signal(signal))
    }
}

// ---------------------------------------------------------------------------
// Action groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub id: String,
    pub name: String,
    pub commands: Vec<Command>,
}

impl ActionGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            commands,
        }
    }
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

/// An immutable, ordered list of action groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionProgram {
    groups: Vec<ActionGroup>,
}

impl ActionProgram {
    pub fn new(groups: Vec<ActionGroup>) -> Self {
        Self { groups }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Start a program from scratch; group ids are assigned sequentially.
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    pub fn groups(&self) -> &[ActionGroup] {
        &self.groups
    }

    /// Number of action groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The command the cursor points at, if any.
    pub fn command_at(&self, cursor: ProgramCursor) -> Option<&Command> {
        self.groups
            .get(cursor.action)
            .and_then(|g| g.commands.get(cursor.command))
    }

    /// Move the cursor past any group whose commands are exhausted. Leaves the
    /// cursor either on a runnable command or at `action == len()`.
    pub fn skip_exhausted(&self, cursor: &mut ProgramCursor) {
        while let Some(group) = self.groups.get(cursor.action) {
            if cursor.command < group.commands.len() {
                break;
            }
            cursor.action += 1;
            cursor.command = 0;
        }
    }

    /// The commands of the first group, applied when priming initial signals.
    pub fn first_group_commands(&self) -> &[Command] {
        self.groups
            .first()
            .map(|g| g.commands.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate every command in execution order.
    pub fn commands(&self) -> impl Iterator<Item = (&ActionGroup, &Command)> {
        self.groups
            .iter()
            .flat_map(|g| g.commands.iter().map(move |c| (g, c)))
    }
}

/// Fluent construction of an [`ActionProgram`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    groups: Vec<ActionGroup>,
}

impl ProgramBuilder {
    pub fn group(mut self, name: impl Into<String>, commands: Vec<Command>) -> Self {
        let id = format!("ag_{}", self.groups.len());
        self.groups.push(ActionGroup::new(id, name, commands));
        self
    }

    pub fn build(self) -> ActionProgram {
        ActionProgram::new(self.groups)
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Program counter `(action group, command)` into an [`ActionProgram`].
///
/// `action` is either a valid group index or exactly the number of groups,
/// meaning the program is complete and about to wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramCursor {
    pub action: usize,
    pub command: usize,
}

impl ProgramCursor {
    pub const START: ProgramCursor = ProgramCursor {
        action: 0,
        command: 0,
    };

    pub fn is_at_start(&self) -> bool {
        *self == Self::START
    }

    pub fn reset(&mut self) {
        *self = Self::START;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ActionProgram {
        ActionProgram::builder()
            .group("ready", vec![Command::set_signal("U1_load_enable", true)])
            .group(
                "load",
                vec![Command::set_signal("U1_load_enable", false), Command::delay(5)],
            )
            .group("process", vec![Command::described_delay(10, "machining")])
            .build()
    }

    #[test]
    fn builder_assigns_sequential_group_ids() {
        let program = sample();
        let ids: Vec<&str> = program.groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["ag_0", "ag_1", "ag_2"]);
    }

    #[test]
    fn command_at_follows_cursor() {
        let program = sample();
        let cursor = ProgramCursor { action: 1, command: 1 };
        assert_eq!(program.command_at(cursor), Some(&Command::delay(5)));
        assert_eq!(program.command_at(ProgramCursor { action: 3, command: 0 }), None);
    }

    #[test]
    fn skip_exhausted_moves_to_next_group() {
        let program = sample();
        let mut cursor = ProgramCursor { action: 0, command: 1 };
        program.skip_exhausted(&mut cursor);
        assert_eq!(cursor, ProgramCursor { action: 1, command: 0 });
    }

    #[test]
    fn skip_exhausted_passes_over_empty_groups() {
        let program = ActionProgram::builder()
            .group("a", vec![Command::delay(1)])
            .group("empty", vec![])
            .group("also empty", vec![])
            .group("b", vec![Command::delay(2)])
            .build();
        let mut cursor = ProgramCursor { action: 0, command: 1 };
        program.skip_exhausted(&mut cursor);
        assert_eq!(cursor, ProgramCursor { action: 3, command: 0 });
    }

    #[test]
    fn skip_exhausted_stops_at_program_end() {
        let program = sample();
        let mut cursor = ProgramCursor { action: 2, command: 1 };
        program.skip_exhausted(&mut cursor);
        assert_eq!(cursor.action, program.len());
    }

    #[test]
    fn readiness_assertion_detection() {
        assert!(Command::set_signal("Press_load_enable", true).is_readiness_assertion());
        assert!(!Command::set_signal("Press_load_enable", false).is_readiness_assertion());
        assert!(!Command::set_signal("Press_done", true).is_readiness_assertion());
        assert!(!Command::delay(1).is_readiness_assertion());
    }

    #[test]
    fn first_group_commands_of_empty_program() {
        assert!(ActionProgram::empty().first_group_commands().is_empty());
        assert_eq!(sample().first_group_commands().len(), 1);
    }
}

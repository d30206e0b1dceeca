//! Units and their per-variant state machines.
//!
//! Every micro-step the executor hands each unit a mutable reference to
//! itself and to its successor (if any) and calls [`Unit::tick`]. A unit
//! never touches any other unit.
//!
//! - **Input** creates products, holds each for `input_time` ticks, then
//!   pushes it downstream.
//! - **Normal** runs its action program in a loop and forwards its product
//!   when the program completes.
//! - **Output** discharges products, at most one per `discharge_interval`.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{UnitConfig, UnitKindConfig};
use crate::event::{EventLog, SimEvent};
use crate::id::{ProductId, UnitId};
use crate::product::Product;
use crate::program::{ActionProgram, Command, ProgramCursor};
use crate::signal::{ReadinessSignal, SignalStore};
use crate::time::{Ticks, delay_end, interval_elapsed};
use crate::transfer::{can_transfer, transfer};

// ---------------------------------------------------------------------------
// Kind and status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Input,
    Normal,
    Output,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitKind::Input => "input",
            UnitKind::Normal => "normal",
            UnitKind::Output => "output",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    #[default]
    Idle,
    /// Input unit holding a new product until its input time elapses.
    ProcessingDelay,
    /// Normal unit suspended by a `Delay` command.
    ProcessingDelayCommand,
}

impl UnitStatus {
    pub fn is_delaying(self) -> bool {
        !matches!(self, UnitStatus::Idle)
    }
}

// ---------------------------------------------------------------------------
// Behavior (immutable per-variant configuration)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Input {
        input_time: Ticks,
        total_quantity: Option<u64>,
    },
    Normal {
        program: ActionProgram,
    },
    Output {
        discharge_interval: Ticks,
    },
}

/// Simulation-wide state a unit may touch while ticking.
pub(crate) struct TickContext<'a> {
    pub now: Ticks,
    pub next_product_id: &'a mut u64,
    pub discharged: &'a mut u64,
    pub events: &'a mut EventLog,
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// A station on the line.
#[derive(Debug, Clone)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) name: String,
    pub(crate) behavior: Behavior,
    /// `None` is unbounded.
    pub(crate) max_capacity: Option<usize>,
    pub(crate) next_unit: Option<UnitId>,
    /// Absent for Output units, which accept without a handshake.
    pub(crate) readiness: Option<ReadinessSignal>,
    pub(crate) products: VecDeque<Product>,
    /// Products transferred in during the current micro-step. Merged into
    /// `products` once every unit has been visited.
    pub(crate) inbound: Vec<Product>,
    pub(crate) signals: SignalStore,
    pub(crate) status: UnitStatus,
    pub(crate) cursor: ProgramCursor,
    pub(crate) delay_end_time: Ticks,
    pub(crate) last_input_time: Option<Ticks>,
    pub(crate) last_discharge_time: Option<Ticks>,
}

impl Unit {
    /// Build a fresh unit from validated configuration.
    pub(crate) fn from_config(config: &UnitConfig) -> Self {
        let (behavior, max_capacity) = match &config.kind {
            UnitKindConfig::Input {
                input_time,
                total_quantity,
                max_capacity,
                ..
            } => (
                Behavior::Input {
                    input_time: *input_time,
                    total_quantity: *total_quantity,
                },
                *max_capacity,
            ),
            UnitKindConfig::Normal {
                max_capacity,
                program,
                ..
            } => (
                Behavior::Normal {
                    program: program.clone(),
                },
                Some(*max_capacity),
            ),
            UnitKindConfig::Output {
                discharge_interval,
                max_capacity,
            } => (
                Behavior::Output {
                    discharge_interval: *discharge_interval,
                },
                *max_capacity,
            ),
        };
        let readiness = match behavior {
            Behavior::Output { .. } => None,
            _ => Some(ReadinessSignal::for_unit(config.id, &config.name)),
        };

        Self {
            id: config.id,
            name: config.name.clone(),
            behavior,
            max_capacity,
            next_unit: config.next_unit(),
            readiness,
            products: VecDeque::new(),
            inbound: Vec::new(),
            signals: SignalStore::new(),
            status: UnitStatus::Idle,
            cursor: ProgramCursor::START,
            delay_end_time: 0,
            last_input_time: None,
            last_discharge_time: None,
        }
    }

    /// Apply the first action group's signal writes, or assert readiness for
    /// a unit with no program. The cursor is left at the start.
    pub(crate) fn prime_signals(&mut self) {
        let Behavior::Normal { program } = &self.behavior else {
            return;
        };
        if program.is_empty() {
            if let Some(signal) = &self.readiness {
                self.signals.set(signal.name(), true);
            }
            return;
        }
        for command in program.first_group_commands() {
            if let Command::SetSignal { signal, value } = command {
                trace!(unit = %self.name, signal = %signal, value, "priming signal");
                self.signals.set(signal, *value);
            }
        }
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    /// Move products received this micro-step into the queue.
    pub(crate) fn settle_inbound(&mut self) {
        self.products.extend(self.inbound.drain(..));
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Configuration-assigned id.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Current display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which variant this unit is.
    pub fn kind(&self) -> UnitKind {
        match self.behavior {
            Behavior::Input { .. } => UnitKind::Input,
            Behavior::Normal { .. } => UnitKind::Normal,
            Behavior::Output { .. } => UnitKind::Output,
        }
    }

    /// Current processing status.
    pub fn status(&self) -> UnitStatus {
        self.status
    }

    /// Products held, head first.
    pub fn products(&self) -> &VecDeque<Product> {
        &self.products
    }

    /// The unit's own signal store.
    pub fn signals(&self) -> &SignalStore {
        &self.signals
    }

    /// Successor products are handed to, if any.
    pub fn next_unit(&self) -> Option<UnitId> {
        self.next_unit
    }

    /// Queue bound. `None` means unbounded.
    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    /// The `_load_enable` signal gating transfers into this unit. Output
    /// units have none.
    pub fn readiness(&self) -> Option<&ReadinessSignal> {
        self.readiness.as_ref()
    }

    /// Position in the action program.
    pub fn cursor(&self) -> ProgramCursor {
        self.cursor
    }

    /// Tick at which the current delay ends. Stale once the unit is idle.
    pub fn delay_end_time(&self) -> Ticks {
        self.delay_end_time
    }

    /// Tick of the last product creation, `None` before the first.
    pub fn last_input_time(&self) -> Option<Ticks> {
        self.last_input_time
    }

    /// Tick of the last discharge, `None` before the first.
    pub fn last_discharge_time(&self) -> Option<Ticks> {
        self.last_discharge_time
    }

    /// Action program of a Normal unit.
    pub fn program(&self) -> Option<&ActionProgram> {
        match &self.behavior {
            Behavior::Normal { program } => Some(program),
            _ => None,
        }
    }

    /// Production cap of an Input unit.
    pub fn total_quantity(&self) -> Option<u64> {
        match self.behavior {
            Behavior::Input { total_quantity, .. } => total_quantity,
            _ => None,
        }
    }

    /// Whether an Input unit with a cap has reserved its last product id.
    pub fn quota_exhausted(&self, next_product_id: u64) -> bool {
        self.total_quantity().is_some_and(|q| next_product_id > q)
    }

    /// Queued plus in-flight products.
    pub fn occupancy(&self) -> usize {
        self.products.len() + self.inbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    /// Whether occupancy is below the capacity bound.
    pub fn has_room(&self) -> bool {
        self.max_capacity.is_none_or(|cap| self.occupancy() < cap)
    }

    /// Whether this unit's readiness handshake currently admits a product.
    pub fn is_ready_to_receive(&self) -> bool {
        match &self.readiness {
            None => true,
            Some(signal) => self.signals.is_true(signal.name()),
        }
    }

    /// An Input unit with no input delay transfers products it never queued.
    pub(crate) fn creates_in_place(&self) -> bool {
        matches!(self.behavior, Behavior::Input { input_time: 0, .. })
    }

    // -----------------------------------------------------------------------
    // Tick dispatch
    // -----------------------------------------------------------------------

    pub(crate) fn tick(&mut self, next: Option<&mut Unit>, ctx: &mut TickContext<'_>) {
        match self.behavior {
            Behavior::Input { .. } => self.tick_input(next, ctx),
            Behavior::Normal { .. } => self.tick_normal(next, ctx),
            Behavior::Output { .. } => self.tick_output(ctx),
        }
    }

    /// Transfer `product` to `next` and record the move.
    fn hand_off(&mut self, product: Product, next: Option<&mut Unit>, ctx: &mut TickContext<'_>) -> bool {
        let Some(target) = next else {
            return false;
        };
        let was_ready = target.readiness.is_some() && target.is_ready_to_receive();
        if !transfer(product, self, Some(&mut *target)) {
            return false;
        }
        ctx.events.push(SimEvent::ProductTransferred {
            product: product.id,
            from: self.id,
            to: target.id,
            time: ctx.now,
        });
        if let (true, Some(signal)) = (was_ready, &target.readiness) {
            ctx.events.push(SimEvent::SignalChanged {
                unit: target.id,
                signal: signal.name().to_owned(),
                value: false,
                time: ctx.now,
            });
        }
        true
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    fn tick_input(&mut self, next: Option<&mut Unit>, ctx: &mut TickContext<'_>) {
        let Behavior::Input {
            input_time,
            total_quantity,
        } = self.behavior
        else {
            return;
        };
        let now = ctx.now;

        // Holding a product: release it once the input delay is over. A
        // blocked successor is retried on the next tick without a new delay.
        if let Some(&product) = self.products.front() {
            if now >= self.delay_end_time {
                if can_transfer(self, next.as_deref()) {
                    if self.hand_off(product, next, ctx) {
                        self.last_input_time = Some(now);
                    }
                } else {
                    debug!(unit = %self.name, product = %product.id, time = now, "input waiting for successor");
                }
                self.status = UnitStatus::Idle;
            } else {
                trace!(unit = %self.name, until = self.delay_end_time, "input delay running");
            }
            return;
        }

        if total_quantity.is_some_and(|q| *ctx.next_product_id > q) {
            trace!(unit = %self.name, "quota reached");
            return;
        }
        let Some(target) = next else {
            trace!(unit = %self.name, "input has no successor");
            return;
        };
        if !interval_elapsed(self.last_input_time, input_time, now) || self.status != UnitStatus::Idle {
            return;
        }
        if !can_transfer(self, Some(&*target)) {
            debug!(unit = %self.name, target = %target.name, time = now, "successor not ready for a new product");
            return;
        }

        // Ids are reserved when creation starts, not when the product leaves.
        let product = Product::new(ProductId(*ctx.next_product_id), now);
        *ctx.next_product_id += 1;
        ctx.events.push(SimEvent::ProductCreated {
            unit: self.id,
            product: product.id,
            time: now,
        });
        info!(unit = %self.name, product = %product.id, time = now, "product created");

        if input_time == 0 {
            if self.hand_off(product, Some(target), ctx) {
                self.last_input_time = Some(now);
            }
        } else {
            self.products.push_back(product);
            self.status = UnitStatus::ProcessingDelay;
            self.delay_end_time = delay_end(now, input_time);
        }
    }

    // -----------------------------------------------------------------------
    // Normal
    // -----------------------------------------------------------------------

    fn tick_normal(&mut self, next: Option<&mut Unit>, ctx: &mut TickContext<'_>) {
        let now = ctx.now;

        if self.status.is_delaying() {
            if now < self.delay_end_time {
                trace!(unit = %self.name, until = self.delay_end_time, "delay running");
                return;
            }
            self.status = UnitStatus::Idle;
            ctx.events.push(SimEvent::DelayCompleted { unit: self.id, time: now });
            debug!(unit = %self.name, time = now, "delay completed");
        }

        let Behavior::Normal { program } = &self.behavior else {
            return;
        };

        // Without a product only the very first command, or a readiness
        // assertion, may run.
        let holding = self.products.front().copied();
        let bootstrap = program
            .command_at(self.cursor)
            .is_some_and(Command::is_readiness_assertion);
        if holding.is_none() && !self.cursor.is_at_start() && !bootstrap {
            trace!(unit = %self.name, "waiting for a product");
            return;
        }

        if program.is_empty() {
            self.pass_through(holding, next, ctx);
            return;
        }

        program.skip_exhausted(&mut self.cursor);

        if self.cursor.action >= program.len() {
            if let Some(product) = holding {
                if can_transfer(self, next.as_deref()) {
                    self.hand_off(product, next, ctx);
                } else {
                    debug!(unit = %self.name, product = %product.id, time = now, "program done, successor not ready");
                }
            }
            self.cursor.reset();
            trace!(unit = %self.name, "program wrapped");
            return;
        }

        let Some(command) = program.command_at(self.cursor) else {
            self.cursor.reset();
            return;
        };
        match command {
            Command::SetSignal { signal, value } => {
                if self.signals.set(signal, *value) {
                    ctx.events.push(SimEvent::SignalChanged {
                        unit: self.id,
                        signal: signal.clone(),
                        value: *value,
                        time: now,
                    });
                }
                debug!(unit = %self.name, signal = %signal, value = *value, time = now, "signal set");
            }
            Command::Delay {
                duration,
                description,
                ..
            } => {
                debug_assert!(!self.status.is_delaying());
                self.status = UnitStatus::ProcessingDelayCommand;
                self.delay_end_time = delay_end(now, *duration);
                ctx.events.push(SimEvent::DelayStarted {
                    unit: self.id,
                    until: self.delay_end_time,
                    time: now,
                });
                debug!(unit = %self.name, duration = *duration, description = %description, time = now, "delay started");
            }
        }
        // A delay advances the cursor when it starts; expiry is picked up by
        // the status check on a later tick.
        self.cursor.command += 1;
    }

    /// A Normal unit with no program forwards whatever it holds and keeps
    /// its own readiness asserted while it has room.
    fn pass_through(&mut self, holding: Option<Product>, next: Option<&mut Unit>, ctx: &mut TickContext<'_>) {
        if let Some(product) = holding {
            if can_transfer(self, next.as_deref()) {
                self.hand_off(product, next, ctx);
            } else {
                debug!(unit = %self.name, product = %product.id, "pass-through blocked");
            }
        }
        if self.has_room() && !self.is_ready_to_receive() {
            let Some(signal) = &self.readiness else {
                return;
            };
            if self.signals.set(signal.name(), true) {
                ctx.events.push(SimEvent::SignalChanged {
                    unit: self.id,
                    signal: signal.name().to_owned(),
                    value: true,
                    time: ctx.now,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    fn tick_output(&mut self, ctx: &mut TickContext<'_>) {
        let Behavior::Output { discharge_interval } = self.behavior else {
            return;
        };
        if self.products.is_empty() {
            return;
        }
        if !interval_elapsed(self.last_discharge_time, discharge_interval, ctx.now) {
            trace!(unit = %self.name, "waiting for discharge interval");
            return;
        }
        let Some(product) = self.products.pop_front() else {
            return;
        };
        *ctx.discharged += 1;
        self.last_discharge_time = Some(ctx.now);
        ctx.events.push(SimEvent::ProductDischarged {
            unit: self.id,
            product: product.id,
            time: ctx.now,
        });
        info!(unit = %self.name, product = %product.id, total = *ctx.discharged, time = ctx.now, "product discharged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn context<'a>(now: Ticks, next_id: &'a mut u64, discharged: &'a mut u64, events: &'a mut EventLog) -> TickContext<'a> {
        TickContext {
            now,
            next_product_id: next_id,
            discharged,
            events,
        }
    }

    #[test]
    fn readiness_resolved_from_registered_name() {
        let unit = Unit::from_config(&UnitConfig::normal(4, " Press\n", 1, ActionProgram::empty()));
        assert_eq!(unit.readiness().unwrap().name(), "Press_load_enable");
        assert_eq!(unit.readiness().unwrap().unit(), UnitId(4));
        let out = Unit::from_config(&output(5, 0));
        assert!(out.readiness().is_none());
        assert!(out.is_ready_to_receive());
    }

    #[test]
    fn kinds_and_capacities() {
        let unit = Unit::from_config(&input(1, 2));
        assert_eq!(unit.kind(), UnitKind::Input);
        assert_eq!(unit.max_capacity(), None);
        assert!(unit.has_room());

        let unit = Unit::from_config(&normal(2, 3, ActionProgram::empty()));
        assert_eq!(unit.kind(), UnitKind::Normal);
        assert_eq!(unit.max_capacity(), Some(3));
        assert_eq!(unit.status(), UnitStatus::Idle);
    }

    #[test]
    fn priming_empty_program_asserts_readiness() {
        let mut unit = Unit::from_config(&normal(2, 1, ActionProgram::empty()));
        assert!(!unit.is_ready_to_receive());
        unit.prime_signals();
        assert!(unit.is_ready_to_receive());
    }

    #[test]
    fn priming_leaves_cursor_at_start() {
        let mut unit = Unit::from_config(&normal(2, 1, station_program("N2", 4)));
        unit.prime_signals();
        assert!(unit.is_ready_to_receive());
        assert!(unit.cursor().is_at_start());
    }

    #[test]
    fn quota_is_exhausted_past_last_id() {
        let unit = Unit::from_config(&input(1, 1).with_quota(2));
        assert!(!unit.quota_exhausted(1));
        assert!(!unit.quota_exhausted(2));
        assert!(unit.quota_exhausted(3));
        let unlimited = Unit::from_config(&input(1, 1));
        assert!(!unlimited.quota_exhausted(1_000));
    }

    #[test]
    fn output_respects_discharge_interval() {
        let mut out = Unit::from_config(&output(3, 2));
        for id in 1..=3 {
            out.products.push_back(Product::new(ProductId(id), 0));
        }
        let (mut next_id, mut discharged, mut events) = (4, 0, EventLog::new(16));

        out.tick(None, &mut context(1, &mut next_id, &mut discharged, &mut events));
        assert_eq!(discharged, 1);
        out.tick(None, &mut context(2, &mut next_id, &mut discharged, &mut events));
        assert_eq!(discharged, 1);
        out.tick(None, &mut context(3, &mut next_id, &mut discharged, &mut events));
        assert_eq!(discharged, 2);
        assert_eq!(out.last_discharge_time(), Some(3));
        assert_eq!(out.products().front().map(|p| p.id), Some(ProductId(3)));
    }

    #[test]
    fn input_waits_for_delay_before_handing_off() {
        let mut source = Unit::from_config(&input(1, 3).feeding(2));
        let mut target = Unit::from_config(&normal(2, 1, ActionProgram::empty()));
        target.prime_signals();
        let (mut next_id, mut discharged, mut events) = (1, 0, EventLog::new(16));

        source.tick(Some(&mut target), &mut context(1, &mut next_id, &mut discharged, &mut events));
        assert_eq!(source.status(), UnitStatus::ProcessingDelay);
        assert_eq!(source.delay_end_time(), 4);
        assert_eq!(next_id, 2);

        source.tick(Some(&mut target), &mut context(3, &mut next_id, &mut discharged, &mut events));
        assert_eq!(source.products().len(), 1);

        source.tick(Some(&mut target), &mut context(4, &mut next_id, &mut discharged, &mut events));
        assert!(source.products().is_empty());
        assert_eq!(source.status(), UnitStatus::Idle);
        assert_eq!(source.last_input_time(), Some(4));
        assert_eq!(target.inbound.len(), 1);
        assert!(!target.is_ready_to_receive());
    }

    #[test]
    fn input_without_successor_creates_nothing() {
        let mut source = Unit::from_config(&input(1, 0));
        let (mut next_id, mut discharged, mut events) = (1, 0, EventLog::new(16));
        source.tick(None, &mut context(1, &mut next_id, &mut discharged, &mut events));
        assert_eq!(next_id, 1);
        assert!(events.is_empty());
    }
}

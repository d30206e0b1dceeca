//! The `_load_enable` handshake between a unit and its successor.
//!
//! A target accepts a product when it has room and, unless it is an Output
//! unit, when its readiness signal is `true`. Accepting clears that signal,
//! so each assertion admits exactly one product. Capacity counts products
//! received earlier in the same micro-step, which the target only sees once
//! the micro-step completes.

use tracing::{debug, trace, warn};

use crate::product::Product;
use crate::unit::Unit;

/// Whether `source` may hand a product to `target` right now.
pub fn can_transfer(source: &Unit, target: Option<&Unit>) -> bool {
    let Some(target) = target else {
        trace!(source = %source.name(), "no successor");
        return false;
    };
    if !target.has_room() {
        trace!(source = %source.name(), target = %target.name(), "successor full");
        return false;
    }
    if !target.is_ready_to_receive() {
        trace!(source = %source.name(), target = %target.name(), "successor not ready");
        return false;
    }
    true
}

/// Move `product` from `source` into `target`'s inbound buffer and clear the
/// target's readiness signal.
///
/// Returns `false` only when there is no target. A product missing from the
/// source queue is still delivered: a zero-delay Input hands products over
/// without queueing them first.
pub fn transfer(product: Product, source: &mut Unit, target: Option<&mut Unit>) -> bool {
    let Some(target) = target else {
        warn!(source = %source.name(), product = %product.id, "transfer without a target");
        return false;
    };

    match source.products.iter().position(|p| p.id == product.id) {
        Some(index) => {
            source.products.remove(index);
        }
        None if source.creates_in_place() => {}
        None => {
            warn!(source = %source.name(), product = %product.id, "transferred product was not queued at source");
        }
    }

    target.inbound.push(product);
    if let Some(signal) = &target.readiness {
        target.signals.set(signal.name(), false);
    }
    debug!(
        product = %product.id,
        from = %source.name(),
        to = %target.name(),
        "product transferred"
    );
    true
}

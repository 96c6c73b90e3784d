//! Rule evaluation ordering
//!
//! The enforcement layer is first-match-wins, so rules are listed in the order
//! they will be evaluated. Comparators apply in strict precedence until one
//! discriminates:
//!
//! 1. deny/reject before allow
//! 2. fewer wildcards first (an any-port rule counts one)
//! 3. inbound before outbound; bidirectional ties with both
//! 4. custom before template
//! 5. input order
//!
//! Because bidirectional ties with both inbound and outbound, step 3 is not a
//! total order and `slice::sort_by` cannot be used. Ordering is a stable
//! topological pass instead: the next rule emitted is the earliest remaining one
//! that no other remaining rule strictly precedes.

use crate::core::firewall::{Origin, RuleFacts};
use crate::core::ports::is_wildcard;
use crate::core::vocabulary::{Action, Direction};
use std::cmp::Ordering;

/// Unknown actions rank with allow.
fn restrictiveness_rank<R: RuleFacts + ?Sized>(rule: &R) -> u8 {
    match Action::from_term(rule.action_term()) {
        Some(action) if action.is_restrictive() => 0,
        _ => 1,
    }
}

/// Number of unconstrained fields
pub fn wildcard_count<R: RuleFacts + ?Sized>(rule: &R) -> u32 {
    u32::from(is_wildcard(&rule.port_spec()))
}

fn direction_rank<R: RuleFacts + ?Sized>(rule: &R) -> Option<u8> {
    match Direction::from_term(rule.direction_term()) {
        Some(Direction::Inbound) => Some(0),
        Some(Direction::Outbound) => Some(1),
        _ => None,
    }
}

fn origin_rank(origin: Origin) -> u8 {
    match origin {
        Origin::Custom => 0,
        Origin::Template => 1,
    }
}

/// Compares two rules by evaluation precedence.
///
/// `Equal` means "no preference"; callers keep input order.
pub fn compare_rules<A, B>(a: &A, b: &B) -> Ordering
where
    A: RuleFacts + ?Sized,
    B: RuleFacts + ?Sized,
{
    restrictiveness_rank(a)
        .cmp(&restrictiveness_rank(b))
        .then_with(|| wildcard_count(a).cmp(&wildcard_count(b)))
        .then_with(|| match (direction_rank(a), direction_rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        })
        .then_with(|| origin_rank(a.origin()).cmp(&origin_rank(b.origin())))
}

/// Input indexes in evaluation order.
///
/// Quadratic in the number of rules, which stays bounded by the per-scope limit.
pub fn evaluation_order<R: RuleFacts>(rules: &[R]) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..rules.len()).collect();
    let mut order = Vec::with_capacity(rules.len());

    while !remaining.is_empty() {
        let pick = remaining
            .iter()
            .position(|&candidate| {
                remaining.iter().all(|&other| {
                    compare_rules(&rules[other], &rules[candidate]) != Ordering::Less
                })
            })
            // Strict precedence has no cycles; fall back to input order regardless
            .unwrap_or(0);
        order.push(remaining.remove(pick));
    }
    order
}

/// Sorts rules in place into evaluation order.
pub fn sort_rules_in_place<R: RuleFacts>(rules: &mut [R]) {
    let order = evaluation_order(rules);
    for (slot, &first) in order.iter().enumerate() {
        let mut source = first;
        while source < slot {
            source = order[source];
        }
        rules.swap(slot, source);
    }
}

/// Returns the rules in evaluation order, leaving the input untouched.
pub fn sort_rules_by_priority<R: RuleFacts + Clone>(rules: &[R]) -> Vec<R> {
    evaluation_order(rules)
        .into_iter()
        .map(|i| rules[i].clone())
        .collect()
}

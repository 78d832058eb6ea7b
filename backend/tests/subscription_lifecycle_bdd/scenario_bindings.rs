//! Scenario bindings for subscription lifecycle BDD tests.

use super::*;
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "Confirming the disclaimer starts a trial"
)]
fn confirming_the_disclaimer_starts_a_trial(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "Silent users are warned"
)]
fn silent_users_are_warned(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "Warned users who stay silent are cancelled"
)]
fn warned_users_who_stay_silent_are_cancelled(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "The sweep reminds users whose trial is ending"
)]
fn the_sweep_reminds_users_whose_trial_is_ending(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "The sweep removes users who never paid"
)]
fn the_sweep_removes_users_who_never_paid(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "A late payment restores a removed user"
)]
fn a_late_payment_restores_a_removed_user(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "A matching payment activates the subscription"
)]
fn a_matching_payment_activates_the_subscription(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "A repeated payment notification is a duplicate"
)]
fn a_repeated_payment_notification_is_a_duplicate(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "Payments from unknown buyers are ignored"
)]
fn payments_from_unknown_buyers_are_ignored(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "Payments for another product are ignored"
)]
fn payments_for_another_product_are_ignored(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "A cancellation removes a paying subscriber"
)]
fn a_cancellation_removes_a_paying_subscriber(world: SubscriptionLifecycleWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/subscription_lifecycle.feature",
    name = "Delivery failures do not block transitions"
)]
fn delivery_failures_do_not_block_transitions(world: SubscriptionLifecycleWorld) {
    drop(world);
}

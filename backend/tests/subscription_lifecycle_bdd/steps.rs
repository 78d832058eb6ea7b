//! Step definitions for subscription lifecycle BDD tests.

use super::*;
use chrono::TimeDelta;
use rstest_bdd_macros::{given, then, when};
use subscription_backend::domain::lifecycle::ConfirmationOutcome;
use subscription_backend::domain::{TimerKey, TimerPurpose, UserId};
use subscription_backend::test_support::Notification;

#[given("a lifecycle engine selling product {product}")]
fn a_lifecycle_engine_selling_product(world: &SubscriptionLifecycleWorld, product: String) {
    world.setup_engine(&product);
}

#[given("user {user_id} has started onboarding")]
fn user_has_started_onboarding(world: &SubscriptionLifecycleWorld, user_id: i64) {
    world.start(UserId::new(user_id));
}

#[given("user {user_id} is on a trial as {email}")]
fn user_is_on_a_trial_as(world: &SubscriptionLifecycleWorld, user_id: i64, email: String) {
    let user_id = UserId::new(user_id);
    world.start(user_id);
    let outcome = world.confirm(user_id, &email);
    assert!(matches!(outcome, ConfirmationOutcome::TrialStarted { .. }));
}

#[given("the payment reminder has gone out")]
fn the_payment_reminder_has_gone_out(world: &SubscriptionLifecycleWorld) {
    world.advance(TimeDelta::days(6));
    world.sweep();
}

#[given("{email} has paid with sale {sale_id}")]
fn has_paid_with_sale(world: &SubscriptionLifecycleWorld, email: String, sale_id: String) {
    world.pay(&email, &sale_id, &world.product(), false);
}

#[given("the chat platform is unreachable")]
fn the_chat_platform_is_unreachable(world: &SubscriptionLifecycleWorld) {
    world.notifier().set_failing(true);
}

#[when("{hours} hours pass")]
fn hours_pass(world: &SubscriptionLifecycleWorld, hours: i64) {
    world.advance(TimeDelta::hours(hours));
}

#[when("{days} days pass")]
fn days_pass(world: &SubscriptionLifecycleWorld, days: i64) {
    world.advance(TimeDelta::days(days));
}

#[when("user {user_id} confirms the disclaimer with {email}")]
fn user_confirms_the_disclaimer_with(
    world: &SubscriptionLifecycleWorld,
    user_id: i64,
    email: String,
) {
    world.confirm(UserId::new(user_id), &email);
}

#[when("the disclaimer warning for user {user_id} fires")]
fn the_disclaimer_warning_fires(world: &SubscriptionLifecycleWorld, user_id: i64) {
    world.fire(UserId::new(user_id), TimerPurpose::DisclaimerWarning);
}

#[when("the final cancel for user {user_id} fires")]
fn the_final_cancel_fires(world: &SubscriptionLifecycleWorld, user_id: i64) {
    world.fire(UserId::new(user_id), TimerPurpose::FinalCancel);
}

#[when("the daily sweep runs")]
fn the_daily_sweep_runs(world: &SubscriptionLifecycleWorld) {
    world.sweep();
}

#[when("a payment for {email} arrives with sale {sale_id}")]
fn a_payment_arrives_with_sale(world: &SubscriptionLifecycleWorld, email: String, sale_id: String) {
    world.pay(&email, &sale_id, &world.product(), false);
}

#[when("a payment for {email} arrives for product {product}")]
fn a_payment_arrives_for_product(
    world: &SubscriptionLifecycleWorld,
    email: String,
    product: String,
) {
    world.pay(&email, "sale-other", &product, false);
}

#[when("a cancellation for {email} arrives")]
fn a_cancellation_arrives(world: &SubscriptionLifecycleWorld, email: String) {
    world.pay(&email, "sale-1", &world.product(), true);
}

#[then("user {user_id} is in stage {stage}")]
fn user_is_in_stage(world: &SubscriptionLifecycleWorld, user_id: i64, stage: String) {
    assert_eq!(world.stage(UserId::new(user_id)).as_str(), stage);
}

#[then("user {user_id} received a single-use invite")]
fn user_received_a_single_use_invite(world: &SubscriptionLifecycleWorld, user_id: i64) {
    let invites = world.notifier().invites();
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].member_limit, 1);
    assert!(invites[0].name.contains(&user_id.to_string()));
}

#[then("no timers are pending for user {user_id}")]
fn no_timers_are_pending(world: &SubscriptionLifecycleWorld, user_id: i64) {
    let user_id = UserId::new(user_id);
    let pending: Vec<TimerKey> = world
        .timers()
        .pending_keys()
        .into_iter()
        .filter(|key| key.user_id == user_id)
        .collect();
    assert!(pending.is_empty(), "unexpected timers: {pending:?}");
}

#[then("a final cancel is pending for user {user_id}")]
fn a_final_cancel_is_pending(world: &SubscriptionLifecycleWorld, user_id: i64) {
    let key = TimerKey::new(UserId::new(user_id), TimerPurpose::FinalCancel);
    assert!(world.timers().pending_delay(&key).is_some());
}

#[then("the timer was applied")]
fn the_timer_was_applied(world: &SubscriptionLifecycleWorld) {
    let outcome = world.last_timer.get().expect("timer outcome should be set");
    assert!(matches!(outcome, TimerOutcome::Applied { .. }), "{outcome:?}");
}

#[then("the sweep reported {count} reminders")]
fn the_sweep_reported_reminders(world: &SubscriptionLifecycleWorld, count: usize) {
    let report = world.last_report.get().expect("sweep report should be set");
    assert_eq!(report.reminded, count);
}

#[then("the sweep reported {count} removals")]
fn the_sweep_reported_removals(world: &SubscriptionLifecycleWorld, count: usize) {
    let report = world.last_report.get().expect("sweep report should be set");
    assert_eq!(report.removed, count);
}

#[then("the sweep reported {count} warnings")]
fn the_sweep_reported_warnings(world: &SubscriptionLifecycleWorld, count: usize) {
    let report = world.last_report.get().expect("sweep report should be set");
    assert_eq!(report.warned, count);
}

#[then("the payment outcome is {label}")]
fn the_payment_outcome_is(world: &SubscriptionLifecycleWorld, label: String) {
    let outcome = world.last_payment.get().expect("payment outcome should be set");
    assert_eq!(outcome.label(), label);
}

#[then("user {user_id} was removed from the channel")]
fn user_was_removed_from_the_channel(world: &SubscriptionLifecycleWorld, user_id: i64) {
    let user_id = UserId::new(user_id);
    let calls = world.notifier().calls();
    assert!(calls.contains(&Notification::Ban(user_id)));
    assert!(calls.contains(&Notification::Unban(user_id)));
}

#[then("user {user_id} was sent {count} messages")]
fn user_was_sent_messages(world: &SubscriptionLifecycleWorld, user_id: i64, count: usize) {
    assert_eq!(world.notifier().messages_to(UserId::new(user_id)).len(), count);
}

#[then("the record store is empty")]
fn the_record_store_is_empty(world: &SubscriptionLifecycleWorld) {
    assert!(world.store().is_empty());
}

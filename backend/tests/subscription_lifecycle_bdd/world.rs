//! Scenario-world methods for subscription lifecycle BDD tests.

use std::future::Future;
use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use subscription_backend::domain::lifecycle::{
    ConfirmationOutcome, LifecycleConfig, LifecycleEngine, LifecyclePorts, PaymentEvent,
    StartOutcome,
};
use subscription_backend::domain::{LifecycleStage, TimerKey, TimerPurpose, UserId};
use subscription_backend::test_support::{
    InMemoryRecordStore, MutableClock, RecordingNotifier, RecordingTimerRegistry,
};

use crate::{RuntimeHandle, SubscriptionLifecycleWorld};

impl SubscriptionLifecycleWorld {
    /// Wire an engine over in-memory adapters, starting at a fixed instant.
    pub fn setup_engine(&self, product: &str) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        let start = Utc
            .with_ymd_and_hms(2026, 3, 2, 10, 0, 0)
            .single()
            .expect("valid timestamp");

        let store = Arc::new(InMemoryRecordStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let timers = Arc::new(RecordingTimerRegistry::default());
        let clock = Arc::new(MutableClock::new(start));
        let mut config = LifecycleConfig::new(product);
        config.channel_name = "PeakTrade VIP".to_owned();
        config.payment_link = Some("https://pay.example.com/vip".to_owned());
        let engine = LifecycleEngine::new(
            LifecyclePorts::new(store.clone(), notifier.clone(), timers.clone()),
            clock.clone(),
            config,
        );

        self.runtime.set(RuntimeHandle(Arc::new(runtime)));
        self.engine.set(Arc::new(engine));
        self.store.set(store);
        self.notifier.set(notifier);
        self.timers.set(timers);
        self.clock.set(clock);
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        let runtime = self.runtime.get().expect("runtime should be set");
        runtime.0.block_on(future)
    }

    fn engine(&self) -> Arc<LifecycleEngine> {
        self.engine.get().expect("engine should be set")
    }

    pub fn store(&self) -> Arc<InMemoryRecordStore> {
        self.store.get().expect("store should be set")
    }

    pub fn notifier(&self) -> Arc<RecordingNotifier> {
        self.notifier.get().expect("notifier should be set")
    }

    pub fn timers(&self) -> Arc<RecordingTimerRegistry> {
        self.timers.get().expect("timers should be set")
    }

    pub fn advance(&self, delta: TimeDelta) {
        self.clock.get().expect("clock should be set").advance(delta);
    }

    pub fn start(&self, user_id: UserId) {
        let engine = self.engine();
        let outcome = self
            .block_on(engine.start_onboarding(user_id, format!("user{user_id}")))
            .expect("start succeeds");
        assert_eq!(outcome, StartOutcome::DisclaimerSent);
    }

    pub fn confirm(&self, user_id: UserId, email: &str) -> ConfirmationOutcome {
        let engine = self.engine();
        let reply = format!("{email} {}", engine.config().confirmation_keyword);
        self.block_on(engine.confirm_disclaimer(user_id, &reply))
            .expect("confirmation handled")
    }

    pub fn pay(&self, email: &str, sale_id: &str, product: &str, cancelled: bool) {
        let engine = self.engine();
        let event = PaymentEvent {
            email: email.to_owned(),
            sale_id: sale_id.to_owned(),
            subscription_id: Some("sub-1".to_owned()),
            product_id: Some(product.to_owned()),
            cancelled,
        };
        let outcome = self
            .block_on(engine.apply_payment(event))
            .expect("payment handled");
        self.last_payment.set(outcome);
    }

    /// Deliver the pending timer for `purpose` as the dispatcher would.
    pub fn fire(&self, user_id: UserId, purpose: TimerPurpose) {
        let fired = self
            .timers()
            .take(&TimerKey::new(user_id, purpose))
            .expect("timer should be pending");
        let engine = self.engine();
        let outcome = self
            .block_on(engine.handle_timer(fired))
            .expect("timer handled");
        self.last_timer.set(outcome);
    }

    pub fn sweep(&self) {
        let engine = self.engine();
        let report = self.block_on(engine.run_sweep()).expect("sweep runs");
        self.last_report.set(report);
    }

    pub fn stage(&self, user_id: UserId) -> LifecycleStage {
        LifecycleStage::of(self.store().record(user_id).as_ref())
    }

    pub fn product(&self) -> String {
        self.engine().config().expected_product_id.clone()
    }
}

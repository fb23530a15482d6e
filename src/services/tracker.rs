use super::clipboard::Clipboard;
use super::clock::{Clock, SystemClock};
use super::session::{Completion, PaymentSession, TrackerSnapshot};
use crate::client::PaymentApi;
use crate::config::Config;
use crate::error::{ApiError, CopyError, FetchError, FetchKind};
use crate::models::{display::format_amount, NewPayment, Payment, PaymentId};
use futures::future::{BoxFuture, FutureExt, OptionFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentSource {
    Existing(PaymentId),
    Create(NewPayment),
}

impl PaymentSource {
    fn kind(&self) -> FetchKind {
        match self {
            PaymentSource::Existing(_) => FetchKind::Lookup,
            PaymentSource::Create(_) => FetchKind::Create,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub default_expiry: Duration,
    pub pay_currency: String,
}

impl From<&Config> for TrackerSettings {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout,
            poll_interval: config.poll_interval,
            tick_interval: config.tick_interval,
            default_expiry: config.default_expiry,
            pay_currency: config.pay_currency.clone(),
        }
    }
}

pub struct PaymentTracker<A, C = SystemClock> {
    api: Arc<A>,
    clock: Arc<C>,
    settings: TrackerSettings,
    id: Uuid,
}

impl<A: PaymentApi + 'static> PaymentTracker<A, SystemClock> {
    pub fn new(api: Arc<A>, settings: TrackerSettings) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
            settings,
            id: Uuid::new_v4(),
        }
    }
}

impl<A: PaymentApi + 'static, C: Clock> PaymentTracker<A, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> PaymentTracker<A, C2> {
        PaymentTracker {
            api: self.api,
            clock: Arc::new(clock),
            settings: self.settings,
            id: self.id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spawn(self, source: PaymentSource) -> TrackerHandle {
        let initial = PaymentSession::new(
            self.settings.default_expiry,
            self.settings.pay_currency.clone(),
            self.clock.now(),
        );
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.snapshot());
        let (completion_tx, completion_rx) = oneshot::channel();
        let id = self.id;

        let task = tokio::spawn(self.run(source, initial, snapshot_tx, completion_tx));

        TrackerHandle {
            id,
            snapshots: snapshot_rx,
            completion: Some(completion_rx),
            task,
        }
    }

    async fn run(
        self,
        source: PaymentSource,
        mut session: PaymentSession,
        snapshots: watch::Sender<TrackerSnapshot>,
        completion: oneshot::Sender<Completion>,
    ) {
        session.begin_loading();
        snapshots.send_replace(session.snapshot());

        let payment = match self.load(&source).await {
            Ok(payment) => payment,
            Err(err) => {
                tracing::warn!(tracker = %self.id, timeout = err.is_timeout(), "Payment load failed: {}", err);
                session.fail(err);
                snapshots.send_replace(session.snapshot());
                return;
            }
        };

        tracing::info!(
            tracker = %self.id,
            payment_id = ?payment.payment_id,
            status = ?payment.payment_status,
            "Payment loaded"
        );

        let done = session.start(payment, self.clock.now());
        snapshots.send_replace(session.snapshot());
        if let Some(done) = done {
            completion.send(done).ok();
            return;
        }

        let mut completion = Some(completion);
        let payment_id = session.payment_id();
        if payment_id.is_none() {
            tracing::warn!(tracker = %self.id, "Payment has no payment_id, status polling disabled");
        }

        let start = Instant::now();
        let mut tick = time::interval_at(start + self.settings.tick_interval, self.settings.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll = time::interval_at(start + self.settings.poll_interval, self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // At most one lookup outstanding; the poll branch is disabled while it runs.
        // A lookup that outlives `request_timeout` counts as a failed poll.
        let mut in_flight: Option<BoxFuture<'static, Result<Payment, ApiError>>> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    session.tick(self.clock.now());
                    snapshots.send_replace(session.snapshot());
                }
                _ = poll.tick(), if in_flight.is_none() && payment_id.is_some() => {
                    if let Some(id) = payment_id.clone() {
                        tracing::debug!(tracker = %self.id, payment_id = %id, "Polling payment status");
                        let api = self.api.clone();
                        let limit = self.settings.request_timeout;
                        in_flight = Some(
                            async move {
                                time::timeout(limit, api.get_payment(&id))
                                    .await
                                    .unwrap_or(Err(ApiError::Timeout))
                            }
                            .boxed(),
                        );
                    }
                }
                Some(result) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    match result {
                        Ok(remote) => {
                            let done = session.apply_poll(remote, self.clock.now());
                            snapshots.send_replace(session.snapshot());
                            if let Some(done) = done {
                                if let Some(completion) = completion.take() {
                                    completion.send(done).ok();
                                }
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(tracker = %self.id, "Payment poll failed, retrying next interval: {}", err);
                        }
                    }
                }
            }
        }

        tracing::debug!(tracker = %self.id, "Payment tracker stopped");
    }

    async fn load(&self, source: &PaymentSource) -> Result<Payment, FetchError> {
        let call = async {
            match source {
                PaymentSource::Existing(id) => self.api.get_payment(id).await,
                PaymentSource::Create(order) => {
                    let request = order.request();
                    self.api.create_payment(&request).await
                }
            }
        };

        match time::timeout(self.settings.request_timeout, call).await {
            Ok(Ok(payment)) => Ok(payment),
            Ok(Err(err)) => Err(FetchError::from_api(source.kind(), &err)),
            Err(_) => Err(FetchError::Timeout),
        }
    }
}

/// Owner of a running tracker. Dropping it stops both timers and any
/// in-flight request.
pub struct TrackerHandle {
    id: Uuid,
    snapshots: watch::Receiver<TrackerSnapshot>,
    completion: Option<oneshot::Receiver<Completion>>,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshots.clone()
    }

    /// Resolves when the payment turns terminal. Yields `None` if the
    /// tracker stopped without completing or the completion was already taken.
    pub async fn completion(&mut self) -> Option<Completion> {
        let receiver = self.completion.take()?;
        receiver.await.ok()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub async fn copy_pay_address(&self, clipboard: &Clipboard) -> Result<(), CopyError> {
        let address = self.snapshot().pay_address().to_string();
        if address.is_empty() {
            return Ok(());
        }

        if clipboard.copy(&address).await {
            Ok(())
        } else {
            Err(CopyError::Address)
        }
    }

    pub async fn copy_pay_amount(&self, clipboard: &Clipboard) -> Result<(), CopyError> {
        let Some(amount) = self.snapshot().pay_amount() else {
            return Ok(());
        };

        if clipboard.copy(&format_amount(Some(amount))).await {
            Ok(())
        } else {
            Err(CopyError::Amount)
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

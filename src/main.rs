use anyhow::{bail, Result};
use payment_tracker::{
    client::PaymentClient,
    config::{self, Config},
    models::display::{price_line, title_line},
    services::*,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let source = config::payment_source_from_env(&config)?;
    let copy_address = config::copy_address_requested()?;

    tracing::info!("Starting payment tracker v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Backend: {}", config.api_base_url);

    match &source {
        PaymentSource::Create(order) => {
            println!("{}", title_line(order.title.as_deref(), &order.order_id));
            println!("{}", price_line(order.amount, &order.price_currency));
        }
        PaymentSource::Existing(id) => println!("Payment {}", id),
    }
    println!();

    let api = Arc::new(PaymentClient::new(&config)?);
    let mut handle = PaymentTracker::new(api, TrackerSettings::from(&config)).spawn(source);
    let mut updates = handle.subscribe();
    let clipboard = Clipboard::system();
    let mut printer = Printer::new(config.qr_service_url.clone());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                // Sender dropped: the tracker finished.
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                printer.print(&snapshot);

                if copy_address && !printer.address_copied && !snapshot.pay_address().is_empty() {
                    printer.address_copied = true;
                    match handle.copy_pay_address(&clipboard).await {
                        Ok(()) => println!("Address copied to clipboard"),
                        Err(e) => eprintln!("{}", e),
                    }
                }
            }
            _ = &mut shutdown => {
                handle.shutdown();
                break;
            }
        }
    }

    let snapshot = handle.snapshot();
    if let Some(error) = &snapshot.error {
        if snapshot.can_retry() {
            eprintln!("Run the command again to retry.");
        }
        bail!("{}", error);
    }

    match handle.completion().await {
        Some(completion) if completion.success => println!("Payment complete."),
        Some(_) => bail!("Payment was not completed"),
        None => tracing::info!("Tracker stopped before the payment completed"),
    }

    Ok(())
}

struct Printer {
    qr_service_url: String,
    last_label: Option<&'static str>,
    details_shown: bool,
    last_minute: Option<u64>,
    address_copied: bool,
}

impl Printer {
    fn new(qr_service_url: String) -> Self {
        Self {
            qr_service_url,
            last_label: None,
            details_shown: false,
            last_minute: None,
            address_copied: false,
        }
    }

    fn print(&mut self, snapshot: &TrackerSnapshot) {
        match snapshot.phase {
            Phase::Uninitialized | Phase::Error => return,
            Phase::Loading => {
                if self.last_label.is_none() {
                    println!("Preparing payment...");
                    self.last_label = Some("");
                }
                return;
            }
            _ => {}
        }

        let view = snapshot.status_view();
        if self.last_label != Some(view.label) {
            println!("{} {}", view.icon, view.label);
            self.last_label = Some(view.label);
        }

        if !self.details_shown && !snapshot.pay_address().is_empty() {
            self.details_shown = true;
            println!("Send ONLY {} to this address.", snapshot.pay_currency_label());
            println!("Amount:  {} {}", snapshot.pay_amount_text(), snapshot.pay_currency_label());
            println!("Address: {}", snapshot.pay_address());
            println!("Wallet:  {}", snapshot.wallet_uri());
            if let Some(qr) = snapshot.qr_url(&self.qr_service_url) {
                println!("QR code: {}", qr);
            }
        }

        if snapshot.shows_timer() {
            let minute = snapshot.seconds_remaining / 60;
            if self.last_minute != Some(minute) {
                self.last_minute = Some(minute);
                println!("Payment timer: {}", snapshot.formatted_timer());
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}

pub mod clipboard;
pub mod clock;
pub mod session;
pub mod tracker;

pub use clipboard::{Clipboard, ClipboardProvider, CommandClipboard, Osc52Clipboard};
pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{compute_expiry, Completion, PaymentSession, Phase, TrackerSnapshot};
pub use tracker::{PaymentSource, PaymentTracker, TrackerHandle, TrackerSettings};

pub mod payment;

pub use payment::PaymentClient;

use crate::error::ApiError;
use crate::models::{CreatePaymentRequest, Payment, PaymentId};
use async_trait::async_trait;

#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment, ApiError>;

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<Payment, ApiError>;
}

#![allow(dead_code)]

use async_trait::async_trait;
use payment_tracker::client::PaymentApi;
use payment_tracker::error::ApiError;
use payment_tracker::models::{CreatePaymentRequest, Payment, PaymentId};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub enum Reply {
    Payment(Value),
    Status(u16, Option<&'static str>),
    Transport,
    Hang,
}

impl Reply {
    async fn resolve(self) -> Result<Payment, ApiError> {
        match self {
            Reply::Payment(value) => Ok(serde_json::from_value(value)?),
            Reply::Status(code, detail) => Err(ApiError::Status {
                status: StatusCode::from_u16(code).unwrap(),
                detail: detail.map(str::to_string),
            }),
            Reply::Transport => Err(ApiError::Transport("connection reset".to_string())),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Scripted backend. Lookups replay their queue and then repeat the last reply.
pub struct FakeApi {
    create: Reply,
    lookups: Mutex<VecDeque<Reply>>,
    create_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    last_request: Mutex<Option<CreatePaymentRequest>>,
}

impl FakeApi {
    pub fn new(create: Reply, lookups: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            create,
            lookups: Mutex::new(lookups.into()),
            create_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CreatePaymentRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn next_lookup(&self) -> Reply {
        let mut lookups = self.lookups.lock().unwrap();
        if lookups.len() > 1 {
            lookups.pop_front().unwrap()
        } else {
            lookups.front().cloned().unwrap_or(Reply::Transport)
        }
    }
}

#[async_trait]
impl PaymentApi for FakeApi {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<Payment, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.create.clone().resolve().await
    }

    async fn get_payment(&self, _payment_id: &PaymentId) -> Result<Payment, ApiError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.next_lookup();
        reply.resolve().await
    }
}

#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use costume_common::{Vnd, VndConversionError};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for fieldless enums that are stored in the database by variant name.
macro_rules! named_variants {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("{s} is not a valid {}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches('#');
        s.parse::<i64>().map(Self).map_err(|e| ConversionError(format!("{s} is not a valid order id. {e}")))
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The payment reference used for the (single) manual bank transfer intent of this order.
    pub fn bank_transfer_reference(&self) -> String {
        format!("BANK-{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed but not yet accepted.
    Pending,
    /// The order has been accepted, usually because it has been paid for.
    Confirmed,
    /// The costumes are on their way to the customer.
    Shipped,
    /// Rented costumes have come back.
    Returned,
    Completed,
    Cancelled,
}

named_variants!(OrderStatusType { Pending, Confirmed, Shipped, Returned, Completed, Cancelled });

impl OrderStatusType {
    /// Whether an administrator may move an order from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Returned)
                | (Shipped, Completed)
                | (Returned, Completed)
        )
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: i64,
    /// The amount the customer must pay. Legacy orders may not carry a total.
    pub total_price: Option<Vnd>,
    pub is_paid: bool,
    pub status: OrderStatusType,
    pub rent_start: Option<DateTime<Utc>>,
    pub rent_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// An order is a rental order when it has a complete rental window.
    pub fn is_rental(&self) -> bool {
        self.rent_start.is_some() && self.rent_end.is_some()
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    /// The order total. When absent, the sum of the line totals is used.
    #[serde(default)]
    pub total_price: Option<Vnd>,
    #[serde(default)]
    pub rent_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rent_end: Option<DateTime<Utc>>,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewOrder {
    pub fn new(customer_id: i64, items: Vec<NewOrderItem>) -> Self {
        Self { customer_id, total_price: None, rent_start: None, rent_end: None, items, note: None }
    }

    pub fn with_total(mut self, total: Vnd) -> Self {
        self.total_price = Some(total);
        self
    }

    pub fn with_rental_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.rent_start = Some(start);
        self.rent_end = Some(end);
        self
    }

    pub fn items_total(&self) -> Result<Vnd, VndConversionError> {
        self.items.iter().try_fold(Vnd::default(), |total, item| total.checked_add(item.line_total()?))
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

//--------------------------------------      OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub costume_id: i64,
    pub quantity: i64,
    /// Unit price charged for this line
    pub price: Vnd,
}

impl OrderItem {
    pub fn line_total(&self) -> Result<Vnd, VndConversionError> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub costume_id: i64,
    pub quantity: i64,
    pub price: Vnd,
}

impl NewOrderItem {
    pub fn new(costume_id: i64, quantity: i64, price: Vnd) -> Self {
        Self { costume_id, quantity, price }
    }

    pub fn line_total(&self) -> Result<Vnd, VndConversionError> {
        self.price.checked_mul(self.quantity)
    }
}

//--------------------------------------       Costume        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Costume {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub rental_price: Vnd,
    pub sale_price: Vnd,
}

//--------------------------------------     UserAccount       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Collaborator,
    Platform,
}

named_variants!(Role { Customer, Collaborator, Platform });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

//--------------------------------------   PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Card and bank redirect gateway
    VnPay,
    /// E-wallet gateway
    Momo,
    /// QR aggregator gateway
    PayOs,
    /// Manually reported bank transfer
    BankTransfer,
}

named_variants!(PaymentMethod { VnPay, Momo, PayOs, BankTransfer });

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

named_variants!(PaymentStatus { Pending, Paid, Failed });

//--------------------------------------        Payment       ---------------------------------------------------------
/// A payment intent. One is created every time a customer starts a checkout.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Vnd,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_reference: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentIntent {
    pub order_id: OrderId,
    pub amount: Vnd,
    pub method: PaymentMethod,
    pub transaction_reference: String,
}

impl NewPaymentIntent {
    pub fn new(order_id: OrderId, amount: Vnd, method: PaymentMethod, transaction_reference: String) -> Self {
        Self { order_id, amount, method, transaction_reference }
    }
}

//--------------------------------------       Deposit        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DepositStatus {
    Pending,
    Paid,
    Refunded,
    Held,
    Cancelled,
}

named_variants!(DepositStatus { Pending, Paid, Refunded, Held, Cancelled });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Deposit {
    pub order_id: OrderId,
    pub amount: Vnd,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bulk orders (more than this many units in total) get their deposit halved.
pub const BULK_DEPOSIT_THRESHOLD: i64 = 10;

/// Calculates the deposit for an order from `(sale_price, quantity)` pairs.
///
/// The deposit is the sale-price value of everything in the order. If more than [`BULK_DEPOSIT_THRESHOLD`] units are
/// ordered, it is halved. The result is rounded to the nearest whole dong.
pub fn calculate_deposit<I>(lines: I) -> Result<Vnd, VndConversionError>
where I: IntoIterator<Item = (Vnd, i64)> {
    let mut value = Vnd::default();
    let mut units = 0i64;
    for (price, qty) in lines {
        value = value.checked_add(price.checked_mul(qty)?)?;
        units = units.saturating_add(qty);
    }
    if units > BULK_DEPOSIT_THRESHOLD {
        Ok(value.scale_to_dong(1, 2))
    } else {
        Ok(value.round_to_dong())
    }
}

//--------------------------------------  BankTransferRecord  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

named_variants!(TransferStatus { Pending, Completed, Failed });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BankTransferRecord {
    pub id: i64,
    pub order_id: OrderId,
    /// The bank's transaction id. Unique across all orders.
    pub transaction_id: String,
    pub amount: Vnd,
    pub transfer_date: DateTime<Utc>,
    pub status: TransferStatus,
    pub note: Option<String>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    StatusHistory     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatusHistory {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub note: String,
    pub changed_at: DateTime<Utc>,
}

//--------------------------------------  CollaboratorEarning  --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EarningStatus {
    Pending,
    Paid,
    Cancelled,
}

named_variants!(EarningStatus { Pending, Paid, Cancelled });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CollaboratorEarning {
    pub id: i64,
    pub order_item_id: i64,
    pub user_id: i64,
    pub amount: Vnd,
    pub status: EarningStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEarning {
    pub order_item_id: i64,
    pub user_id: i64,
    pub amount: Vnd,
    pub status: EarningStatus,
}

//--------------------------------------   RejectedCallback   ---------------------------------------------------------
/// An inbound callback that failed its authenticity check. Kept for forensics; never touches payment state.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RejectedCallback {
    pub id: i64,
    pub provider: PaymentMethod,
    pub transaction_reference: Option<String>,
    pub provider_status: Option<String>,
    pub reason: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRejectedCallback {
    pub provider: PaymentMethod,
    pub transaction_reference: Option<String>,
    pub provider_status: Option<String>,
    pub reason: String,
    pub payload: String,
}

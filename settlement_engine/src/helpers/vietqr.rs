//! VietQR (NAPAS 247) merchant-presented QR payloads.
//!
//! The payload is a sequence of EMV-QR segments, `{tag:02}{length:02}{value}`, followed by a CRC-16/CCITT-FALSE
//! checksum over everything up to and including the checksum tag and length (`6304`).
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::Vnd;

const NAPAS_GUID: &str = "A000000727";
const SERVICE_CODE_ACCOUNT_TRANSFER: &str = "QRIBFTTA";
const COUNTRY_CODE: &str = "VN";
/// Costume and clothing rental
const MERCHANT_CATEGORY: &str = "7296";
const MAX_VALUE_LENGTH: usize = 99;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VietQrError {
    #[error("Field {tag} is longer than 99 bytes ({len})")]
    ValueTooLong { tag: &'static str, len: usize },
    #[error("Field {tag} contains characters that cannot be carried in a VietQR payload")]
    InvalidCharacters { tag: &'static str },
    #[error("Field {0} may not be empty")]
    EmptyValue(&'static str),
    #[error("VietQR amounts must be a positive whole number of dong. Got {0}")]
    InvalidAmount(Vnd),
}

/// CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF, no reflection, no final XOR.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFFu16, |crc, &byte| {
        let mut crc = crc ^ (u16::from(byte) << 8);
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x1021 } else { crc << 1 };
        }
        crc
    })
}

fn segment(tag: &'static str, value: &str) -> Result<String, VietQrError> {
    if value.is_empty() {
        return Err(VietQrError::EmptyValue(tag));
    }
    if !value.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return Err(VietQrError::InvalidCharacters { tag });
    }
    if value.len() > MAX_VALUE_LENGTH {
        return Err(VietQrError::ValueTooLong { tag, len: value.len() });
    }
    Ok(format!("{tag}{:02}{value}", value.len()))
}

/// The beneficiary and payment details encoded in a VietQR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransferDetails {
    /// Short bank name, e.g. "VCB"
    pub bank_name: String,
    /// The bank's 6-digit NAPAS BIN. Without it only the legacy display string can be produced.
    pub bank_bin: Option<String>,
    pub account_number: String,
    pub account_name: String,
    pub amount: Option<Vnd>,
    pub transfer_content: String,
}

/// The QR payload handed to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "payload")]
pub enum TransferQr {
    /// A standards-compliant VietQR payload.
    VietQr(String),
    /// `BANK|account|name|amount|content`. Not scannable by banking apps, only meant for display.
    Legacy(String),
}

impl TransferQr {
    pub fn payload(&self) -> &str {
        match self {
            TransferQr::VietQr(s) | TransferQr::Legacy(s) => s.as_str(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, TransferQr::Legacy(_))
    }
}

#[derive(Debug, Clone)]
pub struct VietQrBuilder {
    bank_bin: String,
    account_number: String,
    merchant_name: String,
    amount: Option<Vnd>,
    transfer_content: Option<String>,
}

impl VietQrBuilder {
    pub fn new<S: Into<String>>(bank_bin: S, account_number: S, merchant_name: S) -> Self {
        Self {
            bank_bin: bank_bin.into(),
            account_number: account_number.into(),
            merchant_name: merchant_name.into(),
            amount: None,
            transfer_content: None,
        }
    }

    pub fn with_amount(mut self, amount: Vnd) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_transfer_content<S: Into<String>>(mut self, content: S) -> Self {
        self.transfer_content = Some(content.into());
        self
    }

    /// Produces the complete payload, checksum included.
    pub fn build(&self) -> Result<String, VietQrError> {
        let beneficiary = segment("00", &self.bank_bin)? + &segment("01", &self.account_number)?;
        let merchant_account = segment("00", NAPAS_GUID)?
            + &segment("01", &beneficiary)?
            + &segment("02", SERVICE_CODE_ACCOUNT_TRANSFER)?;
        let point_of_initiation = if self.amount.is_some() { "12" } else { "11" };

        let mut payload = segment("00", "01")?;
        payload += &segment("01", point_of_initiation)?;
        payload += &segment("38", &merchant_account)?;
        payload += &segment("52", MERCHANT_CATEGORY)?;
        payload += &segment("53", costume_common::VND_NUMERIC_CODE)?;
        if let Some(amount) = self.amount {
            let dong = amount.whole_dong().filter(|d| *d > 0).ok_or(VietQrError::InvalidAmount(amount))?;
            payload += &segment("54", &dong.to_string())?;
        }
        payload += &segment("58", COUNTRY_CODE)?;
        payload += &segment("59", &self.merchant_name)?;
        if let Some(content) = self.transfer_content.as_deref().filter(|c| !c.is_empty()) {
            payload += &segment("62", &segment("08", content)?)?;
        }
        payload += "6304";
        let crc = crc16_ccitt_false(payload.as_bytes());
        payload += &format!("{crc:04X}");
        trace!("🏦️ VietQR payload built for account ending {}", last_digits(&self.account_number));
        Ok(payload)
    }
}

fn last_digits(account: &str) -> &str {
    let start = account.len().saturating_sub(4);
    account.get(start..).unwrap_or_default()
}

/// Builds the QR payload for a manual bank transfer.
///
/// A real VietQR payload is produced whenever the bank's BIN is known. Otherwise, the legacy pipe-delimited display
/// string is returned instead and a warning is logged.
pub fn transfer_qr(details: &BankTransferDetails) -> Result<TransferQr, VietQrError> {
    match details.bank_bin.as_deref().filter(|b| !b.is_empty()) {
        Some(bin) => {
            let mut builder = VietQrBuilder::new(bin, details.account_number.as_str(), details.account_name.as_str())
                .with_transfer_content(details.transfer_content.clone());
            if let Some(amount) = details.amount {
                builder = builder.with_amount(amount);
            }
            builder.build().map(TransferQr::VietQr)
        },
        None => {
            warn!(
                "🏦️ No BIN is configured for bank {}. Falling back to the legacy transfer string, which banking apps \
                 cannot scan.",
                details.bank_name
            );
            let amount = details.amount.and_then(|a| a.round_to_dong().whole_dong()).unwrap_or_default();
            Ok(TransferQr::Legacy(format!(
                "{}|{}|{}|{amount}|{}",
                details.bank_name, details.account_number, details.account_name, details.transfer_content
            )))
        },
    }
}

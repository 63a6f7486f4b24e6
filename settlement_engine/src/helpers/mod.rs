mod reference;
pub mod signature;
pub mod vietqr;

pub use reference::{new_transaction_reference, vietnam_time};
pub use signature::{canonical_query, ordered_canonical, raw_canonical, sign, verify, HashAlgorithm, SignatureError};
pub use vietqr::{crc16_ccitt_false, transfer_qr, BankTransferDetails, TransferQr, VietQrBuilder, VietQrError};

//! Base64 engines tolerant of the padding variations senders produce.
//!
//! WebCrypto exports JWK coordinates as unpadded base64url, while signatures
//! and ciphertexts travel as padded standard base64. Decoding accepts either
//! padding style; encoding emits what a browser would.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

/// Standard alphabet, padded on encode, padding-indifferent on decode.
pub const STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// URL-safe alphabet, unpadded on encode, padding-indifferent on decode.
pub const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

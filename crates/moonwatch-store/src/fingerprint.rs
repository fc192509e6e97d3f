// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Credential fingerprints: SHA-256 digests that stand in for API keys in
// logs and audit records.

use sha2::{Digest, Sha256};

/// SHA-256 of `secret` as lowercase hex.
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// First 12 hex digits of [`fingerprint`], enough to tell keys apart in a log.
pub fn short_fingerprint(secret: &str) -> String {
    let mut full = fingerprint(secret);
    full.truncate(12);
    full
}

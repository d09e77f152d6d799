//! Cryptographic primitives backing pyrit's compute cores and cracker:
//! PMK derivation (PBKDF2-HMAC-SHA1), PTK/KCK expansion and EAPOL MIC
//! verification.

mod mic;
mod pmk;

pub use mic::{compute_mic, derive_kck, verify_pmk, KeyScheme};
pub use pmk::{compute_pmk, test_vector_table, TEST_VECTOR_ESSID, TEST_VECTOR_PASSWORD, TEST_VECTOR_PMK};

//! Cross-crate test suite for the Octra wallet.
//!
//! Property tests, adversarial inputs and end-to-end flows that exercise
//! oct-core and oct-wallet together. Nothing here ships.

pub mod helpers;

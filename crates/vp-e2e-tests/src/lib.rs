//! End-to-end tests for VoicePilot live under `tests/`.
//!
//! They drive the real interpreter (against a wiremock Gemini endpoint),
//! the dispatcher, and the listening session, with a recording flight
//! controller in place of a vehicle.

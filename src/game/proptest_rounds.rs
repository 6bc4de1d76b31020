//! Property tests over random operation sequences.
//!
//! Drives a small lottery (2 picks of 1..=6, so rounds regularly have
//! winners) with arbitrary interleavings of purchases, seeding, draws,
//! callbacks, claims, kills and fee withdrawals, and checks after every step:
//!
//! 1. **Conservation**: the lottery's prize balance covers the three pools.
//! 2. **All-or-nothing**: a failed operation leaves the state hash and every
//!    balance untouched.
//! 3. **Round monotonicity**: the round id only ever moves forward by one.
//! 4. **Winner bound**: no round has more winners than tickets.
//!
//! The finished run must also export a transcript that verifies.

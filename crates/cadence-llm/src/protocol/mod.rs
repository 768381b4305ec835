//! Wire format types for upstream chat APIs
//!
//! Pure serde structs matching the upstream JSON format. They only exist at
//! the transport boundary.

pub mod openai;

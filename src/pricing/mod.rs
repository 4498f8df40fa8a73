//! Court pricing engine.
//!
//! Resolves the price of a candidate court booking from an institution's
//! pricing catalog: special dates first, then the most specific ordinary
//! rule, then the sport's base rate with night/weekend surcharges.

pub mod audit;
pub mod calculators;
pub mod clock;
pub mod migration;
pub mod models;
pub mod payment;
pub mod requests;
pub mod resolver;
pub mod responses;
pub mod routes;
pub mod services;
pub mod settings;
pub mod validation;

// Re-export commonly used items
pub use calculators::{round_money, round_to_increment};
pub use migration::{migrate, StoredCatalog, StoredRule};
pub use models::{BookingCandidate, PriceQuote, PricingCatalog};
pub use payment::apply_payment_adjustment;
pub use resolver::quote;
pub use routes::router;
pub use services::PricingError;
pub use settings::{BaseRates, QuoteSettings};
pub use validation::{detect_conflicts, sort_blocks, validate_block};

pub mod interest_submitted;

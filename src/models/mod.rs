pub mod answer;
pub mod checkout;
pub mod frequency;
pub mod license;
pub mod question;
pub mod quiz_response;
pub mod session;
pub mod tier;
pub mod user;

// Protected handlers: everything behind the auth gate. The gate establishes
// identity only; none of these apply further role checks.

pub mod entities;
pub mod session;
pub mod users;
